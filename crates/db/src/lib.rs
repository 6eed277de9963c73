pub mod connection;
pub mod family;
pub mod fixtures;
pub mod locks;
pub mod migrations;
pub mod repositories;
pub mod service;

pub use connection::{connect, connect_with_config, connect_with_settings, DbPool};
pub use family::FamilyResolver;
pub use fixtures::{FinanceSnapshot, ProviderType, SnapshotError, Unit};
pub use locks::{HeadOfFamilyGuard, HeadOfFamilyLocks};
pub use service::{DecisionGenerator, FinanceSources, GenerationReport, GenerationRun};
