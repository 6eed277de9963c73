use chrono::NaiveDate;
use thiserror::Error;

use crate::domain::decision::DecisionStatus;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("invalid period: start {start} is after end {end}")]
    InvalidPeriod { start: NaiveDate, end: NaiveDate },
    #[error("invalid decision transition from {from:?} to {to:?}")]
    InvalidDecisionTransition { from: DecisionStatus, to: DecisionStatus },
    #[error(
        "missing price for period {start} - {}, cannot generate decision",
        end.map(|date| date.to_string()).unwrap_or_default()
    )]
    MissingPricing { start: NaiveDate, end: Option<NaiveDate> },
    #[error("domain invariant violation: {0}")]
    InvariantViolation(String),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ApplicationError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error("persistence failure: {0}")]
    Persistence(String),
    #[error("configuration failure: {0}")]
    Configuration(String),
}

impl ApplicationError {
    /// Missing pricing rows and configuration problems are operator issues, not
    /// something a later trigger will fix on its own.
    pub fn is_configuration_issue(&self) -> bool {
        matches!(
            self,
            Self::Configuration(_) | Self::Domain(DomainError::MissingPricing { .. })
        )
    }
}
