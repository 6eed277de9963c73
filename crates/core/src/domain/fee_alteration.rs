use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::person::PersonId;
use crate::period::Period;

/// Absolute increase, in euros, added for children of parents working at ECHA.
pub const ECHA_INCREASE_EUROS: i32 = 93;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FeeAlterationType {
    Discount,
    Increase,
    Relief,
}

impl FeeAlterationType {
    pub fn sign(&self) -> i32 {
        match self {
            Self::Discount | Self::Relief => -1,
            Self::Increase => 1,
        }
    }
}

/// A per-child adjustment. `amount` is a percentage, or whole euros when
/// `is_absolute` is set.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeAlteration {
    pub id: Option<Uuid>,
    pub person_id: PersonId,
    #[serde(rename = "type")]
    pub kind: FeeAlterationType,
    pub amount: i32,
    pub is_absolute: bool,
    pub period: Period,
    #[serde(default)]
    pub notes: String,
}

impl FeeAlteration {
    /// The synthetic increase derived from a parent's ECHA income record.
    pub fn echa_increase(child: PersonId, period: Period) -> Self {
        Self {
            id: None,
            person_id: child,
            kind: FeeAlterationType::Increase,
            amount: ECHA_INCREASE_EUROS,
            is_absolute: true,
            period,
            notes: "ECHA".to_string(),
        }
    }
}

/// An alteration as applied to one decision part, with its effect in cents.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeAlterationWithEffect {
    #[serde(rename = "type")]
    pub kind: FeeAlterationType,
    pub amount: i32,
    pub is_absolute: bool,
    pub effect: i32,
}
