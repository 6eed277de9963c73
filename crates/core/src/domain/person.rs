use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PersonId(pub Uuid);

impl std::fmt::Display for PersonId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UnitId(pub Uuid);

/// A child as it appears on a decision: identity plus the birth date that drives
/// sibling ranking, the adulthood cutoff and the five-year-old term.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChildRef {
    pub id: PersonId,
    pub date_of_birth: NaiveDate,
}

impl ChildRef {
    /// The 18th birthday. Feb 29 birthdays roll back to Feb 28 in common years.
    pub fn adulthood_date(&self) -> NaiveDate {
        self.date_of_birth
            .checked_add_months(chrono::Months::new(18 * 12))
            .unwrap_or(NaiveDate::MAX)
    }
}
