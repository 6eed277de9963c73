//! Draft generation for one household from one start date onwards.
//!
//! Every input that can change over time contributes its validity to
//! [`distinct_periods`]; each resulting slice is priced independently and the
//! slices are folded back together with [`merge_periods`] whenever two
//! neighbouring drafts turn out to have the same content. Fee decisions and
//! voucher value decisions share this pipeline and differ only in the decision
//! type produced and in which units qualify.

use std::collections::HashSet;

use chrono::NaiveDate;
use tracing::error;

use crate::domain::decision::{DecisionBasis, FinanceDecision, PartCalculation};
use crate::domain::fee_alteration::FeeAlteration;
use crate::domain::income::{DecisionIncome, Income};
use crate::domain::person::{ChildRef, PersonId, UnitId};
use crate::domain::placement::PermanentPlacement;
use crate::domain::pricing::PricingRow;
use crate::errors::DomainError;
use crate::fees::{
    calculate_base_fee, calculate_fee_before_fee_alterations, sibling_discount_percent,
    to_fee_alterations_with_effects,
};
use crate::period::{distinct_periods, merge_periods, Period};

/// Everything a household's drafts are computed from, already narrowed to the
/// household. Fee alterations include the synthetic ECHA increases.
#[derive(Clone, Debug)]
pub struct GenerationInput {
    pub from: NaiveDate,
    pub head_of_family: PersonId,
    pub partner: Option<PersonId>,
    pub children: Vec<ChildRef>,
    pub prices: Vec<PricingRow>,
    pub incomes: Vec<Income>,
    pub fee_alterations: Vec<FeeAlteration>,
    pub placements: Vec<ChildPlacements>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChildPlacements {
    pub child: ChildRef,
    pub placements: Vec<(Period, PermanentPlacement)>,
}

impl GenerationInput {
    pub fn new(from: NaiveDate, head_of_family: PersonId) -> Self {
        Self {
            from,
            head_of_family,
            partner: None,
            children: Vec::new(),
            prices: Vec::new(),
            incomes: Vec::new(),
            fee_alterations: Vec::new(),
            placements: Vec::new(),
        }
    }

    pub fn family_size(&self) -> usize {
        1 + usize::from(self.partner.is_some()) + self.children.len()
    }

    fn income_of(&self, person: PersonId, period: &Period) -> Option<DecisionIncome> {
        self.incomes
            .iter()
            .find(|income| income.person_id == person && income.period.contains(period))
            .map(Income::to_decision_income)
    }

    fn boundaries(&self) -> Vec<Period> {
        self.incomes
            .iter()
            .map(|income| income.period)
            .chain(self.prices.iter().map(|row| row.period))
            .chain(
                self.placements
                    .iter()
                    .flat_map(|child| child.placements.iter().map(|(period, _)| *period)),
            )
            .chain(self.fee_alterations.iter().map(|alteration| alteration.period))
            .collect()
    }
}

/// Computes the draft timeline of `D` from `input.from` onwards, with `qualifying_units`
/// deciding which placements are billed on this kind of decision.
///
/// Fails with [`DomainError::MissingPricing`] when a slice has no pricing row; no
/// drafts are returned in that case.
pub fn generate_drafts<D: FinanceDecision>(
    input: &GenerationInput,
    qualifying_units: &HashSet<UnitId>,
) -> Result<Vec<D>, DomainError> {
    let head_of_family = input.head_of_family;
    let family_size = input.family_size();
    let boundaries = input.boundaries();

    let mut drafts = Vec::new();
    for period in distinct_periods(&boundaries, &Period::open(input.from)) {
        let Some(pricing) =
            input.prices.iter().find(|row| row.period.contains(&period)).map(|row| &row.pricing)
        else {
            error!(
                event_name = "finance.generation.missing_pricing",
                head_of_family_id = %head_of_family,
                decision_kind = D::KIND.as_str(),
                period = %period,
                "no pricing row covers the period"
            );
            return Err(DomainError::MissingPricing { start: period.start(), end: period.end() });
        };

        let head_of_family_income = input.income_of(head_of_family, &period);
        let partner_income = input.partner.and_then(|partner| input.income_of(partner, &period));

        let mut placed: Vec<(&ChildRef, &PermanentPlacement)> = input
            .placements
            .iter()
            .filter_map(|child| {
                child
                    .placements
                    .iter()
                    .find(|(placement_period, _)| placement_period.contains(&period))
                    .map(|(_, placement)| (&child.child, placement))
            })
            .collect();

        let parts = if placed.is_empty() {
            Vec::new()
        } else {
            let incomes: Vec<Option<&DecisionIncome>> = match input.partner {
                Some(_) => vec![head_of_family_income.as_ref(), partner_income.as_ref()],
                None => vec![head_of_family_income.as_ref()],
            };
            let base_amount = calculate_base_fee(pricing, family_size, &incomes);

            // oldest first; every placed child takes a rank, billed or not
            placed.sort_by_key(|(child, _)| child.date_of_birth);
            placed
                .into_iter()
                .enumerate()
                .filter(|(_, (_, placement))| qualifying_units.contains(&placement.unit))
                .filter(|(_, (_, placement))| !placement.service_need.is_free())
                .map(|(index, (child, placement))| {
                    let sibling_discount = sibling_discount_percent(index + 1);
                    let amount_before_alterations = calculate_fee_before_fee_alterations(
                        base_amount,
                        placement,
                        sibling_discount,
                    );
                    let alterations: Vec<FeeAlteration> = input
                        .fee_alterations
                        .iter()
                        .filter(|alteration| {
                            alteration.person_id == child.id && alteration.period.contains(&period)
                        })
                        .cloned()
                        .collect();
                    PartCalculation {
                        child: *child,
                        placement: *placement,
                        base_amount,
                        sibling_discount,
                        amount_before_alterations,
                        fee_alterations: to_fee_alterations_with_effects(
                            amount_before_alterations,
                            &alterations,
                        ),
                    }
                })
                .collect()
        };

        let basis = DecisionBasis {
            head_of_family,
            partner: input.partner,
            head_of_family_income,
            partner_income,
            family_size,
            pricing: pricing.clone(),
        };
        drafts.push((period, D::draft(basis, parts, period)));
    }

    Ok(merge_periods(drafts, |a: &D, b: &D| a.content_equals(b))
        .into_iter()
        .map(|(period, draft)| draft.with_validity(period))
        .collect())
}
