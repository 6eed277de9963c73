use std::collections::{HashMap, HashSet};

use tokio::sync::RwLock;

use evaka_finance_core::domain::decision::{DecisionId, DecisionStatus, FinanceDecision};
use evaka_finance_core::domain::family::{Parentship, Partner};
use evaka_finance_core::domain::fee_alteration::FeeAlteration;
use evaka_finance_core::domain::income::Income;
use evaka_finance_core::domain::person::{PersonId, UnitId};
use evaka_finance_core::domain::placement::{Placement, ServiceNeed};
use evaka_finance_core::domain::pricing::PricingRow;
use evaka_finance_core::period::Period;

use super::{
    DecisionRepository, FamilyRepository, FeeAlterationRepository, IncomeRepository,
    PlacementRepository, PricingRepository, RepositoryError, UnitRepository,
};
use crate::fixtures::FinanceSnapshot;

/// Serves every source query from one [`FinanceSnapshot`].
#[derive(Default)]
pub struct InMemoryFinanceSource {
    snapshot: RwLock<FinanceSnapshot>,
}

impl InMemoryFinanceSource {
    pub fn new(snapshot: FinanceSnapshot) -> Self {
        Self { snapshot: RwLock::new(snapshot) }
    }

    pub async fn update<F>(&self, change: F)
    where
        F: FnOnce(&mut FinanceSnapshot) + Send,
    {
        let mut snapshot = self.snapshot.write().await;
        change(&mut snapshot);
    }
}

#[async_trait::async_trait]
impl FamilyRepository for InMemoryFinanceSource {
    async fn partners_of(&self, person: PersonId) -> Result<Vec<Partner>, RepositoryError> {
        let snapshot = self.snapshot.read().await;
        Ok(snapshot
            .partnerships
            .iter()
            .filter_map(|partnership| partnership.partner_of(person))
            .collect())
    }

    async fn parentships_by_head(
        &self,
        head_of_child: PersonId,
    ) -> Result<Vec<Parentship>, RepositoryError> {
        let snapshot = self.snapshot.read().await;
        Ok(snapshot
            .parentships
            .iter()
            .filter(|parentship| parentship.head_of_child == head_of_child)
            .cloned()
            .collect())
    }

    async fn parentships_by_child(
        &self,
        child: PersonId,
    ) -> Result<Vec<Parentship>, RepositoryError> {
        let snapshot = self.snapshot.read().await;
        Ok(snapshot
            .parentships
            .iter()
            .filter(|parentship| parentship.child.id == child)
            .cloned()
            .collect())
    }
}

#[async_trait::async_trait]
impl IncomeRepository for InMemoryFinanceSource {
    async fn incomes_for(
        &self,
        persons: &[PersonId],
        window: &Period,
    ) -> Result<Vec<Income>, RepositoryError> {
        let snapshot = self.snapshot.read().await;
        Ok(snapshot
            .incomes
            .iter()
            .filter(|income| persons.contains(&income.person_id) && income.period.overlaps(window))
            .cloned()
            .collect())
    }
}

#[async_trait::async_trait]
impl PlacementRepository for InMemoryFinanceSource {
    async fn placements_for(
        &self,
        children: &[PersonId],
        window: &Period,
    ) -> Result<Vec<Placement>, RepositoryError> {
        let snapshot = self.snapshot.read().await;
        Ok(snapshot
            .placements
            .iter()
            .filter(|placement| {
                children.contains(&placement.child_id) && placement.period.overlaps(window)
            })
            .cloned()
            .collect())
    }

    async fn service_needs_for(
        &self,
        children: &[PersonId],
        window: &Period,
    ) -> Result<Vec<ServiceNeed>, RepositoryError> {
        let snapshot = self.snapshot.read().await;
        Ok(snapshot
            .service_needs
            .iter()
            .filter(|need| children.contains(&need.child_id) && need.period.overlaps(window))
            .cloned()
            .collect())
    }
}

#[async_trait::async_trait]
impl PricingRepository for InMemoryFinanceSource {
    async fn pricing_for(&self, window: &Period) -> Result<Vec<PricingRow>, RepositoryError> {
        let snapshot = self.snapshot.read().await;
        Ok(snapshot.pricing.iter().filter(|row| row.period.overlaps(window)).cloned().collect())
    }
}

#[async_trait::async_trait]
impl FeeAlterationRepository for InMemoryFinanceSource {
    async fn fee_alterations_for(
        &self,
        children: &[PersonId],
        window: &Period,
    ) -> Result<Vec<FeeAlteration>, RepositoryError> {
        let snapshot = self.snapshot.read().await;
        Ok(snapshot
            .fee_alterations
            .iter()
            .filter(|alteration| {
                children.contains(&alteration.person_id) && alteration.period.overlaps(window)
            })
            .cloned()
            .collect())
    }
}

#[async_trait::async_trait]
impl UnitRepository for InMemoryFinanceSource {
    async fn invoiced_units(&self) -> Result<HashSet<UnitId>, RepositoryError> {
        let snapshot = self.snapshot.read().await;
        Ok(snapshot
            .units
            .iter()
            .filter(|unit| unit.bills_fee_decisions())
            .map(|unit| unit.id)
            .collect())
    }

    async fn service_voucher_units(&self) -> Result<HashSet<UnitId>, RepositoryError> {
        let snapshot = self.snapshot.read().await;
        Ok(snapshot
            .units
            .iter()
            .filter(|unit| unit.bills_voucher_value_decisions())
            .map(|unit| unit.id)
            .collect())
    }
}

pub struct InMemoryDecisionRepository<D> {
    decisions: RwLock<HashMap<DecisionId, D>>,
}

impl<D> Default for InMemoryDecisionRepository<D> {
    fn default() -> Self {
        Self { decisions: RwLock::new(HashMap::new()) }
    }
}

#[async_trait::async_trait]
impl<D: FinanceDecision> DecisionRepository<D> for InMemoryDecisionRepository<D> {
    async fn find_by_id(&self, id: &DecisionId) -> Result<Option<D>, RepositoryError> {
        let decisions = self.decisions.read().await;
        Ok(decisions.get(id).cloned())
    }

    async fn find_for_head_of_family(
        &self,
        head_of_family: PersonId,
        statuses: &[DecisionStatus],
    ) -> Result<Vec<D>, RepositoryError> {
        let decisions = self.decisions.read().await;
        let mut found: Vec<D> = decisions
            .values()
            .filter(|decision| {
                decision.head_of_family() == head_of_family && statuses.contains(&decision.status())
            })
            .cloned()
            .collect();
        found.sort_by_key(|decision| decision.validity().start());
        Ok(found)
    }

    async fn save(&self, decision: D) -> Result<(), RepositoryError> {
        let mut decisions = self.decisions.write().await;
        decisions.insert(decision.id(), decision);
        Ok(())
    }

    async fn replace_drafts(
        &self,
        head_of_family: PersonId,
        replacements: Vec<D>,
    ) -> Result<(), RepositoryError> {
        let mut decisions = self.decisions.write().await;
        decisions.retain(|_, decision| {
            decision.head_of_family() != head_of_family
                || decision.status() != DecisionStatus::Draft
        });
        for decision in replacements {
            decisions.insert(decision.id(), decision);
        }
        Ok(())
    }
}
