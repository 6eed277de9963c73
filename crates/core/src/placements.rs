use chrono::{Datelike, NaiveDate};

use crate::domain::person::ChildRef;
use crate::domain::placement::{
    DecisionPlacementType, PermanentPlacement, Placement, PlacementType, ServiceNeed,
    ServiceNeedTier,
};
use crate::period::{distinct_periods, merge_equal_periods, Period};

/// 1 August of the year the child turns five through 31 July of the next year.
pub fn five_year_old_term(child: &ChildRef) -> Option<Period> {
    let year = child.date_of_birth.year() + 5;
    let start = NaiveDate::from_ymd_opt(year, 8, 1)?;
    let end = NaiveDate::from_ymd_opt(year + 1, 7, 31)?;
    Period::closed(start, end).ok()
}

/// Splits the child's billable placements by service need and the five-year-old
/// term. Club placements and slices under a temporary service need are left out.
pub fn permanent_placements(
    child: &ChildRef,
    placements: &[Placement],
    service_needs: &[ServiceNeed],
) -> Vec<(Period, PermanentPlacement)> {
    let service_needs: Vec<&ServiceNeed> =
        service_needs.iter().filter(|need| need.child_id == child.id).collect();
    let term = five_year_old_term(child);

    let mut boundaries: Vec<Period> = service_needs.iter().map(|need| need.period).collect();
    boundaries.extend(term);

    placements
        .iter()
        .filter(|placement| placement.child_id == child.id)
        .filter(|placement| placement.kind != PlacementType::Club)
        .flat_map(|placement| {
            let slices = distinct_periods(&boundaries, &placement.period)
                .into_iter()
                .filter_map(|period| {
                    let need = service_needs.iter().find(|need| need.period.contains(&period));
                    if need.is_some_and(|need| need.temporary) {
                        return None;
                    }
                    let is_five_year_old = term.is_some_and(|term| term.contains(&period));
                    let kind =
                        DecisionPlacementType::from_placement(placement.kind, is_five_year_old);
                    let service_need =
                        ServiceNeedTier::for_placement(kind, need.map(|need| need.hours_per_week));
                    let permanent =
                        PermanentPlacement { unit: placement.unit_id, kind, service_need };
                    Some((period, permanent))
                })
                .collect();
            merge_equal_periods(slices)
        })
        .collect()
}
