//! Reconciles freshly generated drafts with what is already stored for a head of
//! family.
//!
//! Stored drafts are always replaceable. Active decisions are never regenerated:
//! they can only have their end date moved when a new draft with identical content
//! starts on the same day, and new drafts are elided where they would only repeat
//! an active decision or carry nothing to send.

use chrono::NaiveDate;

use crate::domain::decision::FinanceDecision;
use crate::period::{distinct_periods, max_end_date, merge_periods, or_max, Period};

/// Outcome of one reconciliation run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Reconciliation<D> {
    /// Active decisions whose validity end changed.
    pub updated_actives: Vec<D>,
    /// The complete draft set that replaces every stored draft.
    pub drafts: Vec<D>,
}

impl<D> Reconciliation<D> {
    pub fn is_empty(&self) -> bool {
        self.updated_actives.is_empty() && self.drafts.is_empty()
    }
}

pub fn update_existing_decisions<D: FinanceDecision>(
    from: NaiveDate,
    new_drafts: Vec<D>,
    existing_drafts: Vec<D>,
    actives: &[D],
    today: NaiveDate,
) -> Reconciliation<D> {
    let mut drafts = new_drafts;
    drafts.extend(filter_or_update_stale_drafts(existing_drafts, &Period::open(from)));

    let (updated_actives, drafts) =
        update_decision_end_dates_and_merge_drafts(actives, drafts, today);
    Reconciliation { updated_actives, drafts }
}

/// Clips stored drafts to the parts outside `window`. Clipped fragments get new ids;
/// drafts that do not touch the window are returned as they are.
pub fn filter_or_update_stale_drafts<D: FinanceDecision>(
    drafts: Vec<D>,
    window: &Period,
) -> Vec<D> {
    drafts
        .into_iter()
        .flat_map(|draft| {
            let validity = draft.validity();
            if !validity.overlaps(window) {
                return vec![draft];
            }

            let before = (validity.start() < window.start())
                .then(|| window.start().pred_opt())
                .flatten()
                .and_then(|end| validity.with_end(Some(end)).ok());
            let after = window
                .end()
                .filter(|end| or_max(validity.end()) > *end)
                .and_then(|end| end.succ_opt())
                .and_then(|start| validity.with_start(start).ok());

            before
                .into_iter()
                .chain(after)
                .map(|period| draft.with_validity(period).with_random_id())
                .collect()
        })
        .collect()
}

/// Coalesces content-equal, touching decisions and gives every result a new id.
pub fn merge_decisions<D: FinanceDecision>(decisions: Vec<D>) -> Vec<D> {
    let keyed = decisions.into_iter().map(|decision| (decision.validity(), decision)).collect();
    merge_periods(keyed, |a: &D, b: &D| a.content_equals(b))
        .into_iter()
        .map(|(period, decision)| decision.with_validity(period).with_random_id())
        .collect()
}

/// Moves the end date of an active decision to that of a content-equal draft
/// starting on the same day, as long as neither has ended before `today`. The
/// draft is consumed by the extension. Returns the changed actives and the
/// remaining drafts after elision.
pub fn update_decision_end_dates_and_merge_drafts<D: FinanceDecision>(
    actives: &[D],
    drafts: Vec<D>,
    today: NaiveDate,
) -> (Vec<D>, Vec<D>) {
    let mut kept = merge_decisions(drafts);
    let mut all_actives: Vec<D> = actives.to_vec();
    let mut updated = Vec::new();

    for active in all_actives.iter_mut() {
        let validity = active.validity();
        let Some(position) = kept.iter().position(|draft| {
            draft.validity().start() == validity.start() && active.content_equals(draft)
        }) else {
            continue;
        };

        let draft_validity = kept[position].validity();
        if or_max(validity.end()) < today || or_max(draft_validity.end()) < today {
            continue;
        }

        kept.remove(position);
        if draft_validity != validity {
            *active = active.with_validity(draft_validity);
            updated.push(active.clone());
        }
    }

    let drafts = merge_and_filter_unnecessary_drafts(kept, &all_actives);
    (updated, drafts)
}

/// A draft adds nothing when it is empty and has no active decision to override,
/// or when it repeats the active decision and no draft has been kept before it.
pub fn draft_is_unnecessary<D: FinanceDecision>(
    draft: &D,
    active: Option<&D>,
    generated_any: bool,
) -> bool {
    match active {
        None => draft.parts().is_empty(),
        Some(active) => !generated_any && draft.content_equals(active),
    }
}

/// Re-slices `drafts` against the active timeline and drops every slice that
/// [`draft_is_unnecessary`] rejects, then merges what is left.
pub fn merge_and_filter_unnecessary_drafts<D: FinanceDecision>(
    drafts: Vec<D>,
    actives: &[D],
) -> Vec<D> {
    let Some(start) = drafts.iter().map(|draft| draft.validity().start()).min() else {
        return drafts;
    };
    let end = drafts
        .iter()
        .map(|draft| draft.validity().end())
        .reduce(max_end_date)
        .flatten();
    let Ok(span) = Period::new(start, end) else {
        return merge_decisions(drafts);
    };

    let boundaries: Vec<Period> =
        drafts.iter().chain(actives.iter()).map(|decision| decision.validity()).collect();

    let mut kept: Vec<D> = Vec::new();
    for slice in distinct_periods(&boundaries, &span) {
        let Some(draft) = drafts.iter().find(|draft| draft.validity().contains(&slice)) else {
            continue;
        };
        let active = actives.iter().find(|active| active.validity().contains(&slice));
        let generated_any = !kept.is_empty();
        if draft_is_unnecessary(draft, active, generated_any) {
            continue;
        }
        kept.push(draft.with_validity(slice));
    }

    merge_decisions(kept)
}
