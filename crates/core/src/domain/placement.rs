use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::person::{PersonId, UnitId};
use crate::period::Period;

/// Weekly hours of a five-year-old's daycare that are free of charge.
pub const FREE_HOURS_FOR_FIVE_YEAR_OLDS: i64 = 20;

/// Placement type as recorded on the placement row.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PlacementType {
    Club,
    Daycare,
    DaycarePartTime,
    Preschool,
    PreschoolDaycare,
    Preparatory,
    PreparatoryDaycare,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Placement {
    pub id: Uuid,
    pub child_id: PersonId,
    pub unit_id: UnitId,
    #[serde(rename = "type")]
    pub kind: PlacementType,
    pub period: Period,
}

/// A child's agreed weekly service hours over a period.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceNeed {
    pub id: Uuid,
    pub child_id: PersonId,
    pub period: Period,
    pub hours_per_week: Decimal,
    #[serde(default)]
    pub temporary: bool,
}

/// Placement type as it appears on a decision, after the five-year-old promotion.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DecisionPlacementType {
    Club,
    Daycare,
    FiveYearsOldDaycare,
    Preschool,
    PreschoolWithDaycare,
    Preparatory,
    PreparatoryWithDaycare,
}

impl DecisionPlacementType {
    pub fn from_placement(kind: PlacementType, is_five_year_old: bool) -> Self {
        match kind {
            PlacementType::Club => Self::Club,
            PlacementType::Daycare | PlacementType::DaycarePartTime if is_five_year_old => {
                Self::FiveYearsOldDaycare
            }
            PlacementType::Daycare | PlacementType::DaycarePartTime => Self::Daycare,
            PlacementType::Preschool => Self::Preschool,
            PlacementType::PreschoolDaycare => Self::PreschoolWithDaycare,
            PlacementType::Preparatory => Self::Preparatory,
            PlacementType::PreparatoryDaycare => Self::PreparatoryWithDaycare,
        }
    }
}

/// Billable service-need tier.
///
/// Thresholds are in weekly hours: `Gte35` is 35 or more, `Gt25Lt35` above 25 and
/// below 35, `Gte25` 25 or more, `Gt15Lte25` above 15 up to 25, `Lte15` up to 15
/// and `Lte0` nothing billable.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ServiceNeedTier {
    Gte35,
    Gt25Lt35,
    Gte25,
    Gt15Lte25,
    Lte15,
    Lte0,
}

impl ServiceNeedTier {
    /// Derives the tier from the placement type and the agreed weekly hours.
    /// Missing hours mean the full-time tier of the placement type.
    pub fn for_placement(kind: DecisionPlacementType, hours_per_week: Option<Decimal>) -> Self {
        match kind {
            DecisionPlacementType::Club
            | DecisionPlacementType::Preschool
            | DecisionPlacementType::Preparatory => Self::Lte0,
            DecisionPlacementType::Daycare => match hours_per_week {
                None => Self::Gte35,
                Some(hours) => daycare_tier(hours),
            },
            DecisionPlacementType::FiveYearsOldDaycare => match hours_per_week {
                None => Self::Gte25,
                Some(hours) => {
                    connected_daycare_tier(hours - Decimal::from(FREE_HOURS_FOR_FIVE_YEAR_OLDS))
                }
            },
            DecisionPlacementType::PreschoolWithDaycare
            | DecisionPlacementType::PreparatoryWithDaycare => match hours_per_week {
                None => Self::Gte25,
                Some(hours) => connected_daycare_tier(hours),
            },
        }
    }

    /// Share of the fee charged for this tier.
    pub fn fee_coefficient(&self) -> Decimal {
        match self {
            Self::Gte35 => Decimal::ONE,
            Self::Gt25Lt35 | Self::Gte25 => Decimal::new(80, 2),
            Self::Gt15Lte25 => Decimal::new(60, 2),
            Self::Lte15 => Decimal::new(35, 2),
            Self::Lte0 => Decimal::ZERO,
        }
    }

    pub fn is_free(&self) -> bool {
        matches!(self, Self::Lte0)
    }
}

fn daycare_tier(hours: Decimal) -> ServiceNeedTier {
    if hours >= Decimal::from(35) {
        ServiceNeedTier::Gte35
    } else if hours > Decimal::from(25) {
        ServiceNeedTier::Gt25Lt35
    } else if hours > Decimal::from(15) {
        ServiceNeedTier::Gt15Lte25
    } else if hours > Decimal::ZERO {
        ServiceNeedTier::Lte15
    } else {
        ServiceNeedTier::Lte0
    }
}

fn connected_daycare_tier(hours: Decimal) -> ServiceNeedTier {
    if hours >= Decimal::from(25) {
        ServiceNeedTier::Gte25
    } else if hours > Decimal::from(15) {
        ServiceNeedTier::Gt15Lte25
    } else if hours > Decimal::ZERO {
        ServiceNeedTier::Lte15
    } else {
        ServiceNeedTier::Lte0
    }
}

/// The billable view of a placement over one slice of its period.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PermanentPlacement {
    pub unit: UnitId,
    #[serde(rename = "type")]
    pub kind: DecisionPlacementType,
    pub service_need: ServiceNeedTier,
}
