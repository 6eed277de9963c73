pub mod clock;
pub mod config;
pub mod domain;
pub mod errors;
pub mod family;
pub mod fees;
pub mod generator;
pub mod period;
pub mod placements;
pub mod reconcile;

pub use clock::{Clock, FixedClock, SystemClock};
pub use domain::decision::{
    DecisionId, DecisionKind, DecisionStatus, FeeDecision, FinanceDecision, FinanceDecisionPart,
    VoucherValueDecision,
};
pub use domain::family::FridgeFamily;
pub use domain::person::{ChildRef, PersonId, UnitId};
pub use errors::{ApplicationError, DomainError};
pub use generator::{generate_drafts, ChildPlacements, GenerationInput};
pub use period::Period;
pub use reconcile::{update_existing_decisions, Reconciliation};
