//! Regenerates the decisions of every household a data change touches.
//!
//! Each trigger resolves the affected heads of family and the date to generate
//! from. Generation then reads a fresh snapshot of each household, computes the
//! drafts, takes the head-of-family lock, re-reads the stored decisions and
//! replaces the drafts with the reconciled result.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{debug, info};

use evaka_finance_core::clock::Clock;
use evaka_finance_core::config::FinanceConfig;
use evaka_finance_core::domain::decision::{
    DecisionKind, DecisionStatus, FeeDecision, FinanceDecision, VoucherValueDecision,
};
use evaka_finance_core::domain::family::FridgeFamily;
use evaka_finance_core::domain::person::{PersonId, UnitId};
use evaka_finance_core::errors::ApplicationError;
use evaka_finance_core::fees::echa_fee_alterations;
use evaka_finance_core::generator::{generate_drafts, ChildPlacements, GenerationInput};
use evaka_finance_core::period::Period;
use evaka_finance_core::placements::permanent_placements;
use evaka_finance_core::reconcile::update_existing_decisions;

use crate::family::FamilyResolver;
use crate::locks::HeadOfFamilyLocks;
use crate::repositories::{
    DecisionRepository, FamilyRepository, FeeAlterationRepository, IncomeRepository,
    PlacementRepository, PricingRepository, UnitRepository,
};

/// The collaborators decision generation reads from.
#[derive(Clone)]
pub struct FinanceSources {
    pub family: Arc<dyn FamilyRepository>,
    pub incomes: Arc<dyn IncomeRepository>,
    pub placements: Arc<dyn PlacementRepository>,
    pub pricing: Arc<dyn PricingRepository>,
    pub fee_alterations: Arc<dyn FeeAlterationRepository>,
    pub units: Arc<dyn UnitRepository>,
}

impl FinanceSources {
    /// Uses one source for every query.
    pub fn shared<S>(source: Arc<S>) -> Self
    where
        S: FamilyRepository
            + IncomeRepository
            + PlacementRepository
            + PricingRepository
            + FeeAlterationRepository
            + UnitRepository
            + 'static,
    {
        Self {
            family: source.clone(),
            incomes: source.clone(),
            placements: source.clone(),
            pricing: source.clone(),
            fee_alterations: source.clone(),
            units: source,
        }
    }
}

/// What one generation run did to one head of family's decisions of one kind.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GenerationRun {
    pub head_of_family: PersonId,
    pub kind: DecisionKind,
    pub from: NaiveDate,
    pub drafts: usize,
    pub updated_actives: usize,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GenerationReport {
    pub runs: Vec<GenerationRun>,
}

impl GenerationReport {
    pub fn heads_of_family(&self) -> Vec<PersonId> {
        let mut heads: Vec<PersonId> = self.runs.iter().map(|run| run.head_of_family).collect();
        heads.sort();
        heads.dedup();
        heads
    }
}

/// Start dates of one head of family's regeneration.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Regeneration {
    head_of_family: PersonId,
    fee_decisions_from: NaiveDate,
    voucher_value_decisions_from: NaiveDate,
}

pub struct DecisionGenerator {
    sources: FinanceSources,
    families: FamilyResolver,
    fee_decisions: Arc<dyn DecisionRepository<FeeDecision>>,
    voucher_value_decisions: Arc<dyn DecisionRepository<VoucherValueDecision>>,
    locks: Arc<HeadOfFamilyLocks>,
    config: FinanceConfig,
    clock: Arc<dyn Clock>,
}

impl DecisionGenerator {
    pub fn new(
        sources: FinanceSources,
        fee_decisions: Arc<dyn DecisionRepository<FeeDecision>>,
        voucher_value_decisions: Arc<dyn DecisionRepository<VoucherValueDecision>>,
        config: FinanceConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            families: FamilyResolver::new(Arc::clone(&sources.family)),
            sources,
            fee_decisions,
            voucher_value_decisions,
            locks: Arc::new(HeadOfFamilyLocks::default()),
            config,
            clock,
        }
    }

    /// Shares a lock registry with other generators working on the same store.
    pub fn with_locks(mut self, locks: Arc<HeadOfFamilyLocks>) -> Self {
        self.locks = locks;
        self
    }

    pub async fn handle_placement(
        &self,
        child: PersonId,
        period: Period,
    ) -> Result<GenerationReport, ApplicationError> {
        debug!(event_name = "finance.trigger.placement", child_id = %child, period = %period);
        let families = self.families.by_child(child, &period).await?;
        self.regenerate(&families, &period).await
    }

    pub async fn handle_service_need(
        &self,
        child: PersonId,
        period: Period,
    ) -> Result<GenerationReport, ApplicationError> {
        debug!(event_name = "finance.trigger.service_need", child_id = %child, period = %period);
        let families = self.families.by_child(child, &period).await?;
        self.regenerate(&families, &period).await
    }

    pub async fn handle_fee_alteration_change(
        &self,
        child: PersonId,
        period: Period,
    ) -> Result<GenerationReport, ApplicationError> {
        debug!(event_name = "finance.trigger.fee_alteration", child_id = %child, period = %period);
        let families = self.families.by_child(child, &period).await?;
        self.regenerate(&families, &period).await
    }

    pub async fn handle_family_update(
        &self,
        adult: PersonId,
        period: Period,
    ) -> Result<GenerationReport, ApplicationError> {
        debug!(event_name = "finance.trigger.family", person_id = %adult, period = %period);
        let families = self.families_of_adult(adult, &period).await?;
        self.regenerate(&families, &period).await
    }

    pub async fn handle_income_change(
        &self,
        person: PersonId,
        period: Period,
    ) -> Result<GenerationReport, ApplicationError> {
        debug!(event_name = "finance.trigger.income", person_id = %person, period = %period);
        let families = self.families_of_adult(person, &period).await?;
        self.regenerate(&families, &period).await
    }

    /// Regenerates both decision kinds of `head_of_family` from `from`, including
    /// dates before the configured minimum fee decision date.
    pub async fn recompute_from(
        &self,
        head_of_family: PersonId,
        from: NaiveDate,
    ) -> Result<GenerationReport, ApplicationError> {
        debug!(
            event_name = "finance.trigger.recompute",
            head_of_family_id = %head_of_family,
            from = %from
        );
        let families = self.families.by_head_of_family(head_of_family, &Period::open(from)).await?;
        let Some(start) = families.iter().map(|family| family.period.start()).min() else {
            return Ok(GenerationReport::default());
        };
        let start = start.max(from);
        self.run(vec![Regeneration {
            head_of_family,
            fee_decisions_from: start,
            voucher_value_decisions_from: start,
        }])
        .await
    }

    async fn families_of_adult(
        &self,
        adult: PersonId,
        period: &Period,
    ) -> Result<Vec<FridgeFamily>, ApplicationError> {
        let mut families = self.families.by_head_of_family(adult, period).await?;
        families.extend(self.families.by_partner(adult, period).await?);
        Ok(families)
    }

    async fn regenerate(
        &self,
        families: &[FridgeFamily],
        period: &Period,
    ) -> Result<GenerationReport, ApplicationError> {
        let mut regenerations: Vec<Regeneration> = Vec::new();
        for family in families.iter().filter(|family| family.period.overlaps(period)) {
            let start = period.start().max(family.period.start());
            let fee_decisions_from = start.max(self.config.fee_decision_min_date);
            match regenerations
                .iter_mut()
                .find(|regeneration| regeneration.head_of_family == family.head_of_family)
            {
                Some(existing) => {
                    existing.fee_decisions_from =
                        existing.fee_decisions_from.min(fee_decisions_from);
                    existing.voucher_value_decisions_from =
                        existing.voucher_value_decisions_from.min(start);
                }
                None => regenerations.push(Regeneration {
                    head_of_family: family.head_of_family,
                    fee_decisions_from,
                    voucher_value_decisions_from: start,
                }),
            }
        }
        self.run(regenerations).await
    }

    async fn run(
        &self,
        regenerations: Vec<Regeneration>,
    ) -> Result<GenerationReport, ApplicationError> {
        let mut report = GenerationReport::default();
        if regenerations.is_empty() {
            return Ok(report);
        }

        let invoiced_units = self.sources.units.invoiced_units().await?;
        let voucher_units = self.sources.units.service_voucher_units().await?;

        for regeneration in regenerations {
            report.runs.push(
                self.generate_for_head::<FeeDecision>(
                    regeneration.head_of_family,
                    regeneration.fee_decisions_from,
                    &invoiced_units,
                    self.fee_decisions.as_ref(),
                )
                .await?,
            );
            report.runs.push(
                self.generate_for_head::<VoucherValueDecision>(
                    regeneration.head_of_family,
                    regeneration.voucher_value_decisions_from,
                    &voucher_units,
                    self.voucher_value_decisions.as_ref(),
                )
                .await?,
            );
        }
        Ok(report)
    }

    async fn generate_for_head<D>(
        &self,
        head_of_family: PersonId,
        from: NaiveDate,
        qualifying_units: &HashSet<UnitId>,
        decisions: &dyn DecisionRepository<D>,
    ) -> Result<GenerationRun, ApplicationError>
    where
        D: FinanceDecision,
    {
        let families = self.families.by_head_of_family(head_of_family, &Period::open(from)).await?;

        let mut new_drafts: Vec<D> = Vec::new();
        for family in &families {
            let input = self.generation_input(family, from).await?;
            let drafts = generate_drafts::<D>(&input, qualifying_units)?;
            new_drafts.extend(drafts.into_iter().filter_map(|draft| {
                let validity = draft.validity().intersection(&family.period)?;
                Some(draft.with_validity(validity))
            }));
        }

        let _guard = self.locks.acquire(head_of_family).await;
        let existing_drafts =
            decisions.find_for_head_of_family(head_of_family, &[DecisionStatus::Draft]).await?;
        let actives =
            decisions.find_for_head_of_family(head_of_family, &DecisionStatus::ACTIVE).await?;

        let reconciliation = update_existing_decisions(
            from,
            new_drafts,
            existing_drafts,
            &actives,
            self.clock.today(),
        );
        let run = GenerationRun {
            head_of_family,
            kind: D::KIND,
            from,
            drafts: reconciliation.drafts.len(),
            updated_actives: reconciliation.updated_actives.len(),
        };

        let mut stored = reconciliation.drafts;
        stored.extend(reconciliation.updated_actives);
        decisions.replace_drafts(head_of_family, stored).await?;

        info!(
            event_name = "finance.generation.reconciled",
            head_of_family_id = %head_of_family,
            decision_kind = D::KIND.as_str(),
            from = %from,
            drafts = run.drafts,
            updated_actives = run.updated_actives,
            "decisions regenerated"
        );
        Ok(run)
    }

    /// Reads everything one household's drafts depend on, from the later of
    /// `from` and the household start until the household ends. Pricing is read
    /// without an end since drafts are priced up to an open end before they are
    /// cut to the household period.
    async fn generation_input(
        &self,
        family: &FridgeFamily,
        from: NaiveDate,
    ) -> Result<GenerationInput, ApplicationError> {
        let start = from.max(family.period.start());
        let window = Period::new(start, family.period.end())?;
        let adults = family.adults();
        let child_ids: Vec<PersonId> = family.children.iter().map(|child| child.id).collect();

        let incomes = self.sources.incomes.incomes_for(&adults, &window).await?;
        let placements = self.sources.placements.placements_for(&child_ids, &window).await?;
        let service_needs =
            self.sources.placements.service_needs_for(&child_ids, &window).await?;
        let mut fee_alterations =
            self.sources.fee_alterations.fee_alterations_for(&child_ids, &window).await?;
        fee_alterations.extend(echa_fee_alterations(&family.children, &incomes));

        let mut input = GenerationInput::new(start, family.head_of_family);
        input.partner = family.partner;
        input.children = family.children.clone();
        input.prices = self.sources.pricing.pricing_for(&Period::open(start)).await?;
        input.placements = family
            .children
            .iter()
            .map(|child| ChildPlacements {
                child: *child,
                placements: permanent_placements(child, &placements, &service_needs),
            })
            .collect();
        input.incomes = incomes;
        input.fee_alterations = fee_alterations;
        Ok(input)
    }
}
