use std::collections::HashSet;

use async_trait::async_trait;
use thiserror::Error;

use evaka_finance_core::domain::decision::{DecisionId, DecisionStatus};
use evaka_finance_core::domain::family::{Parentship, Partner};
use evaka_finance_core::domain::fee_alteration::FeeAlteration;
use evaka_finance_core::domain::income::Income;
use evaka_finance_core::domain::person::{PersonId, UnitId};
use evaka_finance_core::domain::placement::{Placement, ServiceNeed};
use evaka_finance_core::domain::pricing::PricingRow;
use evaka_finance_core::errors::ApplicationError;
use evaka_finance_core::period::Period;

pub mod decision;
pub mod memory;

pub use decision::SqlDecisionRepository;
pub use memory::{InMemoryDecisionRepository, InMemoryFinanceSource};

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
}

impl From<RepositoryError> for ApplicationError {
    fn from(error: RepositoryError) -> Self {
        ApplicationError::Persistence(error.to_string())
    }
}

/// Partnership and parentship history. Conflicting relations are returned as
/// well; callers decide whether to ignore them.
#[async_trait]
pub trait FamilyRepository: Send + Sync {
    async fn partners_of(&self, person: PersonId) -> Result<Vec<Partner>, RepositoryError>;
    async fn parentships_by_head(
        &self,
        head_of_child: PersonId,
    ) -> Result<Vec<Parentship>, RepositoryError>;
    async fn parentships_by_child(&self, child: PersonId)
        -> Result<Vec<Parentship>, RepositoryError>;
}

#[async_trait]
pub trait IncomeRepository: Send + Sync {
    /// Incomes of `persons` overlapping `window`.
    async fn incomes_for(
        &self,
        persons: &[PersonId],
        window: &Period,
    ) -> Result<Vec<Income>, RepositoryError>;
}

#[async_trait]
pub trait PlacementRepository: Send + Sync {
    async fn placements_for(
        &self,
        children: &[PersonId],
        window: &Period,
    ) -> Result<Vec<Placement>, RepositoryError>;
    async fn service_needs_for(
        &self,
        children: &[PersonId],
        window: &Period,
    ) -> Result<Vec<ServiceNeed>, RepositoryError>;
}

#[async_trait]
pub trait PricingRepository: Send + Sync {
    async fn pricing_for(&self, window: &Period) -> Result<Vec<PricingRow>, RepositoryError>;
}

#[async_trait]
pub trait FeeAlterationRepository: Send + Sync {
    async fn fee_alterations_for(
        &self,
        children: &[PersonId],
        window: &Period,
    ) -> Result<Vec<FeeAlteration>, RepositoryError>;
}

#[async_trait]
pub trait UnitRepository: Send + Sync {
    async fn invoiced_units(&self) -> Result<HashSet<UnitId>, RepositoryError>;
    /// Service voucher units that the municipality does not invoice itself.
    async fn service_voucher_units(&self) -> Result<HashSet<UnitId>, RepositoryError>;
}

/// Storage of one decision kind.
#[async_trait]
pub trait DecisionRepository<D>: Send + Sync {
    async fn find_by_id(&self, id: &DecisionId) -> Result<Option<D>, RepositoryError>;

    /// Decisions of `head_of_family` in any of `statuses`, ordered by start date.
    async fn find_for_head_of_family(
        &self,
        head_of_family: PersonId,
        statuses: &[DecisionStatus],
    ) -> Result<Vec<D>, RepositoryError>;

    async fn save(&self, decision: D) -> Result<(), RepositoryError>;

    /// Deletes every stored draft of `head_of_family` and upserts `decisions` in
    /// their place, as one atomic step.
    async fn replace_drafts(
        &self,
        head_of_family: PersonId,
        decisions: Vec<D>,
    ) -> Result<(), RepositoryError>;
}
