use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::period::Period;

/// Municipal fee parameters. Thresholds are monthly gross incomes in cents.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pricing {
    pub multiplier: Decimal,
    pub max_threshold_difference: i32,
    pub min_threshold_2: i32,
    pub min_threshold_3: i32,
    pub min_threshold_4: i32,
    pub min_threshold_5: i32,
    pub min_threshold_6: i32,
    pub threshold_increase_6_plus: i32,
}

impl Pricing {
    /// Income below which no fee is charged for a household of `family_size`.
    pub fn min_threshold(&self, family_size: usize) -> i32 {
        match family_size {
            0..=2 => self.min_threshold_2,
            3 => self.min_threshold_3,
            4 => self.min_threshold_4,
            5 => self.min_threshold_5,
            6 => self.min_threshold_6,
            larger => {
                let extra = i32::try_from(larger - 6).unwrap_or(i32::MAX);
                self.min_threshold_6
                    .saturating_add(self.threshold_increase_6_plus.saturating_mul(extra))
            }
        }
    }
}

/// A pricing record together with the period it is valid for.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricingRow {
    pub period: Period,
    pub pricing: Pricing,
}
