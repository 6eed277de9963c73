//! Monetary rules shared by fee decisions and voucher value decisions. All
//! amounts are integer cents.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};

use crate::domain::fee_alteration::{FeeAlteration, FeeAlterationWithEffect};
use crate::domain::income::{DecisionIncome, Income, IncomeEffect};
use crate::domain::person::ChildRef;
use crate::domain::placement::PermanentPlacement;
use crate::domain::pricing::Pricing;

/// Fees below this many cents are not charged at all.
pub const MIN_FEE: i32 = 2_700;

/// Rounds a cent amount to whole euros, halves away from zero.
pub fn round_to_euros(cents: Decimal) -> i32 {
    let euros = (cents / Decimal::ONE_HUNDRED)
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);
    saturating_i32(euros * Decimal::ONE_HUNDRED)
}

fn saturating_i32(value: Decimal) -> i32 {
    value.to_i32().unwrap_or(if value.is_sign_negative() { i32::MIN } else { i32::MAX })
}

pub fn max_fee(pricing: &Pricing) -> i32 {
    round_to_euros(pricing.multiplier * Decimal::from(pricing.max_threshold_difference))
}

/// Base fee of the household. `incomes` holds one entry per adult; a missing
/// income or any effect other than [`IncomeEffect::Income`] means the maximum fee.
pub fn calculate_base_fee(
    pricing: &Pricing,
    family_size: usize,
    incomes: &[Option<&DecisionIncome>],
) -> i32 {
    let max_fee = max_fee(pricing);
    let declared: Option<Vec<i32>> = incomes
        .iter()
        .map(|income| income.filter(|income| income.effect == IncomeEffect::Income))
        .map(|income| income.map(|income| income.total))
        .collect();

    let Some(totals) = declared else {
        return max_fee;
    };

    let total_income: i64 = totals.iter().map(|total| i64::from(*total)).sum();
    let over_threshold = total_income - i64::from(pricing.min_threshold(family_size));
    let fee = round_to_euros(pricing.multiplier * Decimal::from(over_threshold));
    fee.clamp(0, max_fee)
}

/// Discount percentage by sibling rank, where rank 1 is the child paying full price.
pub fn sibling_discount_percent(rank: usize) -> i32 {
    match rank {
        0 | 1 => 0,
        2 => 50,
        _ => 80,
    }
}

pub fn calculate_fee_before_fee_alterations(
    base_fee: i32,
    placement: &PermanentPlacement,
    sibling_discount: i32,
) -> i32 {
    let discount_multiplier =
        (Decimal::ONE_HUNDRED - Decimal::from(sibling_discount)) / Decimal::ONE_HUNDRED;
    let fee = round_to_euros(
        Decimal::from(base_fee) * discount_multiplier * placement.service_need.fee_coefficient(),
    );
    if fee < MIN_FEE {
        0
    } else {
        fee
    }
}

/// Applies `alterations` in order. Percentages are taken of `fee`, and no effect
/// may push the running total below zero.
pub fn to_fee_alterations_with_effects(
    fee: i32,
    alterations: &[FeeAlteration],
) -> Vec<FeeAlterationWithEffect> {
    let mut running = fee;
    alterations
        .iter()
        .map(|alteration| {
            let magnitude = if alteration.is_absolute {
                alteration.amount.saturating_mul(100)
            } else {
                round_to_euros(
                    Decimal::from(fee) * Decimal::from(alteration.amount) / Decimal::ONE_HUNDRED,
                )
            };
            let effect = (alteration.kind.sign() * magnitude).max(-running);
            running = running.saturating_add(effect);
            FeeAlterationWithEffect {
                kind: alteration.kind,
                amount: alteration.amount,
                is_absolute: alteration.is_absolute,
                effect,
            }
        })
        .collect()
}

pub fn final_fee(fee: i32, alterations: &[FeeAlterationWithEffect]) -> i32 {
    alterations.iter().fold(fee, |sum, alteration| sum.saturating_add(alteration.effect)).max(0)
}

/// One synthetic increase per child for every adult income flagged as ECHA work.
pub fn echa_fee_alterations(children: &[ChildRef], incomes: &[Income]) -> Vec<FeeAlteration> {
    incomes
        .iter()
        .filter(|income| income.works_at_echa)
        .flat_map(|income| {
            children.iter().map(|child| FeeAlteration::echa_increase(child.id, income.period))
        })
        .collect()
}
