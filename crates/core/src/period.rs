//! Date interval algebra shared by every stage of decision generation.
//!
//! A [`Period`] is a closed date range whose end may be open (`None`), meaning the
//! range continues indefinitely. [`distinct_periods`] reduces any number of
//! independently changing validity ranges to one common timeline, and
//! [`merge_periods`] folds that timeline back together wherever adjacent values
//! turn out to be equal.

use std::cmp::{max, min};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::errors::DomainError;

/// Treats an open end as the largest representable date.
pub fn or_max(date: Option<NaiveDate>) -> NaiveDate {
    date.unwrap_or(NaiveDate::MAX)
}

/// The earlier of two end dates, where `None` means open-ended.
pub fn min_end_date(first: Option<NaiveDate>, second: Option<NaiveDate>) -> Option<NaiveDate> {
    match (first, second) {
        (None, other) | (other, None) => other,
        (Some(first), Some(second)) => Some(min(first, second)),
    }
}

/// The later of two end dates; an open end dominates.
pub fn max_end_date(first: Option<NaiveDate>, second: Option<NaiveDate>) -> Option<NaiveDate> {
    match (first, second) {
        (Some(first), Some(second)) => Some(max(first, second)),
        _ => None,
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawPeriod")]
pub struct Period {
    start: NaiveDate,
    end: Option<NaiveDate>,
}

#[derive(Deserialize)]
struct RawPeriod {
    start: NaiveDate,
    end: Option<NaiveDate>,
}

impl TryFrom<RawPeriod> for Period {
    type Error = DomainError;

    fn try_from(raw: RawPeriod) -> Result<Self, Self::Error> {
        Period::new(raw.start, raw.end)
    }
}

impl Period {
    /// Fails when `end` is before `start`.
    pub fn new(start: NaiveDate, end: Option<NaiveDate>) -> Result<Self, DomainError> {
        match end {
            Some(end) if end < start => Err(DomainError::InvalidPeriod { start, end }),
            _ => Ok(Self { start, end }),
        }
    }

    pub fn closed(start: NaiveDate, end: NaiveDate) -> Result<Self, DomainError> {
        Self::new(start, Some(end))
    }

    pub fn open(start: NaiveDate) -> Self {
        Self { start, end: None }
    }

    /// Callers must already know that `start <= end`.
    fn unchecked(start: NaiveDate, end: Option<NaiveDate>) -> Self {
        debug_assert!(start <= or_max(end));
        Self { start, end }
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> Option<NaiveDate> {
        self.end
    }

    pub fn is_open_ended(&self) -> bool {
        self.end.is_none()
    }

    pub fn contains(&self, other: &Period) -> bool {
        self.start <= other.start && or_max(other.end) <= or_max(self.end)
    }

    pub fn includes(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= or_max(self.end)
    }

    pub fn overlaps(&self, other: &Period) -> bool {
        self.start <= or_max(other.end) && other.start <= or_max(self.end)
    }

    /// True when one period ends on the day before the other starts.
    pub fn adjacent_to(&self, other: &Period) -> bool {
        let follows = |first: &Period, second: &Period| {
            first.end.and_then(|end| end.succ_opt()) == Some(second.start)
        };
        follows(self, other) || follows(other, self)
    }

    pub fn intersection(&self, other: &Period) -> Option<Period> {
        let start = max(self.start, other.start);
        let end = min_end_date(self.end, other.end);
        (start <= or_max(end)).then(|| Period::unchecked(start, end))
    }

    /// The smallest period covering both inputs, gaps included.
    pub fn minimal_cover(&self, other: &Period) -> Period {
        Period::unchecked(min(self.start, other.start), max_end_date(self.end, other.end))
    }

    pub fn with_start(&self, start: NaiveDate) -> Result<Period, DomainError> {
        Period::new(start, self.end)
    }

    pub fn with_end(&self, end: Option<NaiveDate>) -> Result<Period, DomainError> {
        Period::new(self.start, end)
    }
}

impl std::fmt::Display for Period {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.end {
            Some(end) => write!(f, "{} - {}", self.start, end),
            None => write!(f, "{} -", self.start),
        }
    }
}

fn can_merge(first: &Period, second: &Period) -> bool {
    first.overlaps(second) || first.end.and_then(|end| end.succ_opt()) == Some(second.start)
}

/// Partitions `spanning` so that no boundary of any period in `periods` falls
/// strictly inside an output slice.
///
/// Candidate starts are every period start, every day after a period end and the
/// span's own start. Candidate ends mirror them. Each start is paired with the
/// nearest end on or after it. Periods outside the span contribute nothing, and an
/// empty input yields the span itself.
pub fn distinct_periods(periods: &[Period], spanning: &Period) -> Vec<Period> {
    let span_end = or_max(spanning.end);

    let mut starts: Vec<NaiveDate> = periods
        .iter()
        .flat_map(|period| [Some(period.start), period.end.and_then(|end| end.succ_opt())])
        .chain(std::iter::once(Some(spanning.start)))
        .flatten()
        .filter(|date| spanning.start <= *date && *date <= span_end)
        .collect();
    starts.sort();
    starts.dedup();

    let mut ends: Vec<Option<NaiveDate>> = periods
        .iter()
        .flat_map(|period| [period.end, period.start.pred_opt()])
        .chain(std::iter::once(spanning.end))
        .filter(|date| spanning.start <= or_max(*date) && or_max(*date) <= span_end)
        .collect();
    ends.sort_by_key(|date| or_max(*date));
    ends.dedup_by_key(|date| or_max(*date));

    starts
        .into_iter()
        .filter_map(|start| {
            ends.iter()
                .find(|end| start <= or_max(**end))
                .map(|end| Period::unchecked(start, *end))
        })
        .collect()
}

/// Sorts by start date and merges overlapping or adjacent entries whose values
/// compare equal under `equals`. A merged entry keeps the later value and the
/// minimal cover of both periods.
pub fn merge_periods<T, F>(values: Vec<(Period, T)>, equals: F) -> Vec<(Period, T)>
where
    F: Fn(&T, &T) -> bool,
{
    let mut sorted = values;
    sorted.sort_by_key(|(period, _)| period.start);

    let mut merged: Vec<(Period, T)> = Vec::with_capacity(sorted.len());
    for (period, value) in sorted {
        if let Some((last_period, last_value)) = merged.last_mut() {
            if equals(last_value, &value) && can_merge(last_period, &period) {
                *last_period = last_period.minimal_cover(&period);
                *last_value = value;
                continue;
            }
        }
        merged.push((period, value));
    }
    merged
}

/// [`merge_periods`] with plain structural equality.
pub fn merge_equal_periods<T: PartialEq>(values: Vec<(Period, T)>) -> Vec<(Period, T)> {
    merge_periods(values, |a, b| a == b)
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::{distinct_periods, merge_equal_periods, merge_periods, or_max, Period};
    use crate::errors::DomainError;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    fn closed(start: NaiveDate, end: NaiveDate) -> Period {
        Period::closed(start, end).expect("valid period")
    }

    #[test]
    fn rejects_end_before_start() {
        let error = Period::closed(date(2024, 2, 1), date(2024, 1, 31)).expect_err("invalid");
        assert_eq!(
            error,
            DomainError::InvalidPeriod { start: date(2024, 2, 1), end: date(2024, 1, 31) }
        );
    }

    #[test]
    fn single_day_period_is_valid() {
        let period = closed(date(2024, 1, 1), date(2024, 1, 1));
        assert!(period.includes(date(2024, 1, 1)));
        assert!(!period.includes(date(2024, 1, 2)));
    }

    #[test]
    fn deserialization_enforces_the_period_invariant() {
        let valid: Period =
            serde_json::from_str(r#"{"start":"2024-01-01","end":null}"#).expect("valid period");
        assert_eq!(valid, Period::open(date(2024, 1, 1)));

        let invalid =
            serde_json::from_str::<Period>(r#"{"start":"2024-02-01","end":"2024-01-01"}"#);
        assert!(invalid.is_err());
    }

    #[test]
    fn open_end_contains_everything_after_start() {
        let outer = Period::open(date(2024, 1, 1));
        assert!(outer.contains(&closed(date(2024, 3, 1), date(2030, 12, 31))));
        assert!(outer.contains(&Period::open(date(2025, 1, 1))));
        assert!(!closed(date(2024, 1, 1), date(2030, 1, 1)).contains(&outer));
        assert_eq!(or_max(None), NaiveDate::MAX);
    }

    #[test]
    fn overlap_is_inclusive_of_boundary_days() {
        let january = closed(date(2024, 1, 1), date(2024, 1, 31));
        let february = closed(date(2024, 2, 1), date(2024, 2, 29));
        let last_of_january = closed(date(2024, 1, 31), date(2024, 2, 10));

        assert!(!january.overlaps(&february));
        assert!(january.overlaps(&last_of_january));
        assert!(january.adjacent_to(&february));
        assert!(february.adjacent_to(&january));
        assert!(!january.adjacent_to(&last_of_january));
    }

    #[test]
    fn intersection_of_disjoint_periods_is_none() {
        let january = closed(date(2024, 1, 1), date(2024, 1, 31));
        let march = Period::open(date(2024, 3, 1));
        assert_eq!(january.intersection(&march), None);
        assert_eq!(
            Period::open(date(2024, 1, 15)).intersection(&january),
            Some(closed(date(2024, 1, 15), date(2024, 1, 31)))
        );
    }

    #[test]
    fn distinct_periods_without_candidates_is_the_span() {
        let span = Period::open(date(2024, 1, 1));
        assert_eq!(distinct_periods(&[], &span), vec![span]);
    }

    #[test]
    fn distinct_periods_splits_on_every_boundary() {
        let span = Period::open(date(2024, 1, 1));
        let periods = [
            closed(date(2023, 6, 1), date(2024, 2, 29)),
            Period::open(date(2024, 3, 1)),
            closed(date(2024, 5, 1), date(2024, 5, 31)),
        ];

        assert_eq!(
            distinct_periods(&periods, &span),
            vec![
                closed(date(2024, 1, 1), date(2024, 2, 29)),
                closed(date(2024, 3, 1), date(2024, 4, 30)),
                closed(date(2024, 5, 1), date(2024, 5, 31)),
                Period::open(date(2024, 6, 1)),
            ]
        );
    }

    #[test]
    fn distinct_periods_fills_gaps_between_candidates() {
        let span = closed(date(2024, 1, 1), date(2024, 12, 31));
        let periods = [closed(date(2024, 3, 1), date(2024, 3, 31))];

        assert_eq!(
            distinct_periods(&periods, &span),
            vec![
                closed(date(2024, 1, 1), date(2024, 2, 29)),
                closed(date(2024, 3, 1), date(2024, 3, 31)),
                closed(date(2024, 4, 1), date(2024, 12, 31)),
            ]
        );
    }

    #[test]
    fn distinct_periods_ignores_candidates_outside_the_span() {
        let span = closed(date(2024, 1, 1), date(2024, 1, 31));
        let periods = [closed(date(2023, 1, 1), date(2023, 6, 30)), Period::open(date(2025, 1, 1))];

        assert_eq!(distinct_periods(&periods, &span), vec![span]);
    }

    #[test]
    fn merge_joins_adjacent_equal_values() {
        let merged = merge_equal_periods(vec![
            (closed(date(2024, 3, 1), date(2024, 3, 31)), "a"),
            (closed(date(2024, 1, 1), date(2024, 2, 29)), "a"),
            (Period::open(date(2024, 4, 1)), "b"),
        ]);

        assert_eq!(
            merged,
            vec![
                (closed(date(2024, 1, 1), date(2024, 3, 31)), "a"),
                (Period::open(date(2024, 4, 1)), "b"),
            ]
        );
    }

    #[test]
    fn merge_keeps_gaps_apart() {
        let values = vec![
            (closed(date(2024, 1, 1), date(2024, 1, 31)), 1),
            (closed(date(2024, 2, 2), date(2024, 2, 29)), 1),
        ];
        assert_eq!(merge_equal_periods(values.clone()), values);
    }

    #[test]
    fn merge_end_is_open_only_when_a_member_is_open() {
        let merged = merge_equal_periods(vec![
            (closed(date(2024, 1, 1), date(2024, 1, 31)), ()),
            (closed(date(2024, 2, 1), date(2024, 2, 29)), ()),
        ]);
        assert_eq!(merged[0].0.end(), Some(date(2024, 2, 29)));

        let with_open = merge_equal_periods(vec![
            (closed(date(2024, 1, 1), date(2024, 1, 31)), ()),
            (Period::open(date(2024, 2, 1)), ()),
        ]);
        assert_eq!(with_open, vec![(Period::open(date(2024, 1, 1)), ())]);
    }

    #[test]
    fn merge_uses_the_supplied_predicate() {
        let merged = merge_periods(
            vec![
                (closed(date(2024, 1, 1), date(2024, 1, 31)), (1, "first")),
                (Period::open(date(2024, 2, 1)), (1, "second")),
            ],
            |a, b| a.0 == b.0,
        );

        assert_eq!(merged, vec![(Period::open(date(2024, 1, 1)), (1, "second"))]);
    }
}
