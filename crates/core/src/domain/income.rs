use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::person::PersonId;
use crate::period::Period;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IncomeEffect {
    MaxFeeAccepted,
    Incomplete,
    Income,
    NotAvailable,
}

/// A person's income over one validity period. Amounts are in cents.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Income {
    pub id: Uuid,
    pub person_id: PersonId,
    pub effect: IncomeEffect,
    #[serde(default)]
    pub data: BTreeMap<String, i32>,
    pub total: i32,
    #[serde(default)]
    pub works_at_echa: bool,
    pub period: Period,
}

impl Income {
    pub fn to_decision_income(&self) -> DecisionIncome {
        DecisionIncome { effect: self.effect, data: self.data.clone(), total: self.total }
    }
}

/// The income snapshot stored on a decision.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecisionIncome {
    pub effect: IncomeEffect,
    pub data: BTreeMap<String, i32>,
    pub total: i32,
}
