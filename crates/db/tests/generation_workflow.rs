use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use uuid::Uuid;

use evaka_finance_core::clock::FixedClock;
use evaka_finance_core::config::FinanceConfig;
use evaka_finance_core::domain::decision::{
    DecisionStatus, FeeDecision, FinanceDecision, FinanceDecisionPart, VoucherValueDecision,
};
use evaka_finance_core::domain::family::{Parentship, Partnership};
use evaka_finance_core::domain::income::{Income, IncomeEffect};
use evaka_finance_core::domain::person::{ChildRef, PersonId, UnitId};
use evaka_finance_core::domain::placement::{Placement, PlacementType};
use evaka_finance_core::domain::pricing::{Pricing, PricingRow};
use evaka_finance_core::errors::{ApplicationError, DomainError};
use evaka_finance_core::period::Period;
use evaka_finance_db::repositories::{
    DecisionRepository, InMemoryDecisionRepository, InMemoryFinanceSource, SqlDecisionRepository,
};
use evaka_finance_db::{
    connect_with_settings, migrations, DecisionGenerator, FinanceSnapshot, FinanceSources,
    ProviderType, Unit,
};

type WorkflowResult<T = ()> = Result<T, String>;

macro_rules! require {
    ($cond:expr) => {
        if !$cond {
            return Err(format!("assertion failed: `{}`", stringify!($cond)));
        }
    };
    ($cond:expr, $($arg:tt)*) => {
        if !$cond {
            return Err(format!($($arg)*));
        }
    };
}

macro_rules! require_eq {
    ($left:expr, $right:expr) => {
        if $left != $right {
            return Err(format!(
                "assertion failed: `left == right` (`{:?}` != `{:?}`)",
                $left,
                $right
            ));
        }
    };
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap_or(NaiveDate::MIN)
}

fn closed(start: NaiveDate, end: NaiveDate) -> WorkflowResult<Period> {
    Period::closed(start, end).map_err(|error| error.to_string())
}

fn person() -> PersonId {
    PersonId(Uuid::new_v4())
}

fn pricing_from(start: NaiveDate) -> PricingRow {
    PricingRow {
        period: Period::open(start),
        pricing: Pricing {
            multiplier: Decimal::new(107, 3),
            max_threshold_difference: 269_700,
            min_threshold_2: 210_200,
            min_threshold_3: 271_300,
            min_threshold_4: 308_000,
            min_threshold_5: 344_700,
            min_threshold_6: 381_300,
            threshold_increase_6_plus: 14_200,
        },
    }
}

/// A single parent earning 4 000 € a month with one child, born 2016, placed in a
/// municipal daycare from 2024.
struct Household {
    head: PersonId,
    unit: UnitId,
    first_child: ChildRef,
    snapshot: FinanceSnapshot,
}

impl Household {
    fn new() -> Self {
        let head = person();
        let unit = UnitId(Uuid::new_v4());
        let first_child = ChildRef { id: person(), date_of_birth: date(2016, 3, 1) };
        let mut household = Self {
            head,
            unit,
            first_child,
            snapshot: FinanceSnapshot {
                units: vec![Unit {
                    id: unit,
                    name: "Kuusikon päiväkoti".to_string(),
                    provider_type: ProviderType::Municipal,
                    invoiced_by_municipality: true,
                }],
                incomes: vec![Income {
                    id: Uuid::new_v4(),
                    person_id: head,
                    effect: IncomeEffect::Income,
                    data: BTreeMap::from([("MAIN_INCOME".to_string(), 400_000)]),
                    total: 400_000,
                    works_at_echa: false,
                    period: Period::open(date(2024, 1, 1)),
                }],
                pricing: vec![pricing_from(date(2020, 3, 1))],
                ..FinanceSnapshot::default()
            },
        };
        household.add_child(first_child, Period::open(date(2024, 1, 1)));
        household
    }

    /// Moves a partner earning `total` cents a month in from 2024.
    fn add_partner(&mut self, total: i32) -> PersonId {
        let partner = person();
        self.snapshot.partnerships.push(Partnership {
            id: Uuid::new_v4(),
            first: self.head,
            second: partner,
            period: Period::open(date(2024, 1, 1)),
            conflict: false,
        });
        self.snapshot.incomes.push(Income {
            id: Uuid::new_v4(),
            person_id: partner,
            effect: IncomeEffect::Income,
            data: BTreeMap::from([("MAIN_INCOME".to_string(), total)]),
            total,
            works_at_echa: false,
            period: Period::open(date(2024, 1, 1)),
        });
        partner
    }

    fn add_child(&mut self, child: ChildRef, placement: Period) {
        self.snapshot.parentships.push(Parentship {
            id: Uuid::new_v4(),
            head_of_child: self.head,
            child,
            period: Period::open(child.date_of_birth),
            conflict: false,
        });
        self.snapshot.placements.push(Placement {
            id: Uuid::new_v4(),
            child_id: child.id,
            unit_id: self.unit,
            kind: PlacementType::Daycare,
            period: placement,
        });
    }
}

struct Harness {
    source: Arc<InMemoryFinanceSource>,
    fee_decisions: Arc<InMemoryDecisionRepository<FeeDecision>>,
    voucher_value_decisions: Arc<InMemoryDecisionRepository<VoucherValueDecision>>,
    generator: DecisionGenerator,
}

fn harness(snapshot: FinanceSnapshot, today: NaiveDate) -> Harness {
    let source = Arc::new(InMemoryFinanceSource::new(snapshot));
    let fee_decisions = Arc::new(InMemoryDecisionRepository::<FeeDecision>::default());
    let voucher_value_decisions =
        Arc::new(InMemoryDecisionRepository::<VoucherValueDecision>::default());
    let generator = DecisionGenerator::new(
        FinanceSources::shared(Arc::clone(&source)),
        fee_decisions.clone(),
        voucher_value_decisions.clone(),
        FinanceConfig::default(),
        Arc::new(FixedClock(today)),
    );
    Harness { source, fee_decisions, voucher_value_decisions, generator }
}

async fn fee_decisions_in(
    harness: &Harness,
    head: PersonId,
    statuses: &[DecisionStatus],
) -> WorkflowResult<Vec<FeeDecision>> {
    harness.fee_decisions.find_for_head_of_family(head, statuses).await.map_err(|e| e.to_string())
}

async fn send_all_drafts(harness: &Harness, head: PersonId) -> WorkflowResult {
    for draft in fee_decisions_in(harness, head, &[DecisionStatus::Draft]).await? {
        let sent = draft
            .transition_to(DecisionStatus::WaitingForSending)
            .and_then(|waiting| waiting.transition_to(DecisionStatus::Sent))
            .map_err(|e| e.to_string())?;
        harness.fee_decisions.save(sent).await.map_err(|e| e.to_string())?;
    }
    Ok(())
}

#[tokio::test]
async fn single_child_gets_one_draft_at_the_base_fee() -> WorkflowResult {
    let household = Household::new();
    let harness = harness(household.snapshot.clone(), date(2024, 1, 15));

    let report = harness
        .generator
        .handle_placement(household.first_child.id, Period::open(date(2024, 1, 1)))
        .await
        .map_err(|e| e.to_string())?;
    require_eq!(report.heads_of_family(), vec![household.head]);

    let drafts = fee_decisions_in(&harness, household.head, &[DecisionStatus::Draft]).await?;
    require_eq!(drafts.len(), 1);
    // the household ends when the child comes of age
    require_eq!(drafts[0].validity, closed(date(2024, 1, 1), date(2034, 2, 28))?);
    require_eq!(drafts[0].parts.len(), 1);
    require_eq!(drafts[0].parts[0].child, household.first_child);
    require_eq!(drafts[0].parts[0].sibling_discount, 0);
    require_eq!(drafts[0].parts[0].fee, 20_300);
    require_eq!(drafts[0].family_size, 2);
    Ok(())
}

#[tokio::test]
async fn second_child_splits_the_timeline_with_a_sibling_discount() -> WorkflowResult {
    let mut household = Household::new();
    let second_child = ChildRef { id: person(), date_of_birth: date(2017, 9, 15) };
    household.add_child(second_child, Period::open(date(2024, 3, 1)));
    let harness = harness(household.snapshot.clone(), date(2024, 1, 15));

    harness
        .generator
        .recompute_from(household.head, date(2024, 1, 1))
        .await
        .map_err(|e| e.to_string())?;

    let drafts = fee_decisions_in(&harness, household.head, &[DecisionStatus::Draft]).await?;
    require!(drafts.len() >= 2, "expected at least two drafts, got {}", drafts.len());
    require_eq!(drafts[0].validity, closed(date(2024, 1, 1), date(2024, 2, 29))?);
    require_eq!(drafts[0].parts.len(), 1);
    require_eq!(drafts[0].total_fee(), 13_800);

    require_eq!(drafts[1].validity.start(), date(2024, 3, 1));
    require_eq!(drafts[1].parts.len(), 2);
    require_eq!(drafts[1].parts[0].child, household.first_child);
    require_eq!(drafts[1].parts[0].sibling_discount, 0);
    require_eq!(drafts[1].parts[1].child, second_child);
    require_eq!(drafts[1].parts[1].sibling_discount, 50);
    require_eq!(drafts[1].parts[1].final_amount(), 6_900);
    Ok(())
}

#[tokio::test]
async fn regeneration_without_changes_is_idempotent() -> WorkflowResult {
    let mut household = Household::new();
    household.add_child(
        ChildRef { id: person(), date_of_birth: date(2017, 9, 15) },
        Period::open(date(2024, 3, 1)),
    );
    let harness = harness(household.snapshot.clone(), date(2024, 1, 15));

    harness
        .generator
        .recompute_from(household.head, date(2024, 1, 1))
        .await
        .map_err(|e| e.to_string())?;
    let first = fee_decisions_in(&harness, household.head, &[DecisionStatus::Draft]).await?;

    harness
        .generator
        .recompute_from(household.head, date(2024, 1, 1))
        .await
        .map_err(|e| e.to_string())?;
    let second = fee_decisions_in(&harness, household.head, &[DecisionStatus::Draft]).await?;

    require_eq!(first.len(), second.len());
    for (before, after) in first.iter().zip(&second) {
        require!(before.content_equals(after), "draft content changed: {:?}", after);
        require_eq!(before.validity, after.validity);
    }
    Ok(())
}

#[tokio::test]
async fn sent_decision_with_identical_content_needs_no_new_draft() -> WorkflowResult {
    let household = Household::new();
    let harness = harness(household.snapshot.clone(), date(2024, 2, 1));

    harness
        .generator
        .recompute_from(household.head, date(2024, 1, 1))
        .await
        .map_err(|e| e.to_string())?;
    send_all_drafts(&harness, household.head).await?;
    let sent = fee_decisions_in(&harness, household.head, &DecisionStatus::ACTIVE).await?;

    let report = harness
        .generator
        .handle_income_change(household.head, Period::open(date(2024, 1, 1)))
        .await
        .map_err(|e| e.to_string())?;

    require!(report.runs.iter().all(|run| run.drafts == 0 && run.updated_actives == 0));
    let drafts = fee_decisions_in(&harness, household.head, &[DecisionStatus::Draft]).await?;
    require!(drafts.is_empty());
    require_eq!(fee_decisions_in(&harness, household.head, &DecisionStatus::ACTIVE).await?, sent);
    Ok(())
}

#[tokio::test]
async fn ending_placement_truncates_the_sent_decision() -> WorkflowResult {
    let household = Household::new();
    let harness = harness(household.snapshot.clone(), date(2024, 5, 15));

    harness
        .generator
        .recompute_from(household.head, date(2024, 1, 1))
        .await
        .map_err(|e| e.to_string())?;
    send_all_drafts(&harness, household.head).await?;

    let ended = closed(date(2024, 1, 1), date(2024, 6, 30))?;
    harness
        .source
        .update(|snapshot| {
            for placement in &mut snapshot.placements {
                placement.period = ended;
            }
        })
        .await;
    harness
        .generator
        .handle_placement(household.first_child.id, ended)
        .await
        .map_err(|e| e.to_string())?;

    let actives = fee_decisions_in(&harness, household.head, &DecisionStatus::ACTIVE).await?;
    require_eq!(actives.len(), 1);
    require_eq!(actives[0].validity, ended);
    require_eq!(actives[0].status, DecisionStatus::Sent);
    let drafts = fee_decisions_in(&harness, household.head, &[DecisionStatus::Draft]).await?;
    require!(drafts.is_empty());
    Ok(())
}

#[tokio::test]
async fn placement_ended_in_the_past_is_overridden_with_an_empty_draft() -> WorkflowResult {
    let household = Household::new();
    let harness = harness(household.snapshot.clone(), date(2024, 8, 20));

    harness
        .generator
        .recompute_from(household.head, date(2024, 1, 1))
        .await
        .map_err(|e| e.to_string())?;
    send_all_drafts(&harness, household.head).await?;

    let ended = closed(date(2024, 1, 1), date(2024, 6, 30))?;
    harness
        .source
        .update(|snapshot| {
            for placement in &mut snapshot.placements {
                placement.period = ended;
            }
        })
        .await;
    harness
        .generator
        .recompute_from(household.head, date(2024, 1, 1))
        .await
        .map_err(|e| e.to_string())?;

    let drafts = fee_decisions_in(&harness, household.head, &[DecisionStatus::Draft]).await?;
    require_eq!(drafts.len(), 1);
    require_eq!(drafts[0].validity, closed(date(2024, 7, 1), date(2034, 2, 28))?);
    require!(drafts[0].parts.is_empty());

    let actives = fee_decisions_in(&harness, household.head, &DecisionStatus::ACTIVE).await?;
    require_eq!(actives[0].validity, closed(date(2024, 1, 1), date(2034, 2, 28))?);
    Ok(())
}

#[tokio::test]
async fn partner_income_change_regenerates_the_head_of_family() -> WorkflowResult {
    let mut household = Household::new();
    let partner = household.add_partner(100_000);
    let harness = harness(household.snapshot.clone(), date(2024, 1, 15));

    harness
        .generator
        .recompute_from(household.head, date(2024, 1, 1))
        .await
        .map_err(|e| e.to_string())?;
    let before = fee_decisions_in(&harness, household.head, &[DecisionStatus::Draft]).await?;
    require_eq!(before.len(), 1);
    require_eq!(before[0].partner, Some(partner));
    require_eq!(before[0].family_size, 3);
    require_eq!(before[0].total_fee(), 24_500);

    harness
        .source
        .update(|snapshot| {
            for income in &mut snapshot.incomes {
                if income.person_id == partner {
                    income.period = Period::closed(date(2024, 1, 1), date(2024, 4, 30))
                        .unwrap_or(income.period);
                }
            }
            snapshot.incomes.push(Income {
                id: Uuid::new_v4(),
                person_id: partner,
                effect: IncomeEffect::Income,
                data: BTreeMap::from([("MAIN_INCOME".to_string(), 120_000)]),
                total: 120_000,
                works_at_echa: false,
                period: Period::open(date(2024, 5, 1)),
            });
        })
        .await;
    let report = harness
        .generator
        .handle_income_change(partner, Period::open(date(2024, 5, 1)))
        .await
        .map_err(|e| e.to_string())?;
    require!(report.heads_of_family().contains(&household.head));

    let drafts = fee_decisions_in(&harness, household.head, &[DecisionStatus::Draft]).await?;
    require_eq!(drafts.len(), 2);
    require_eq!(drafts[0].validity, closed(date(2024, 1, 1), date(2024, 4, 30))?);
    require_eq!(drafts[0].total_fee(), 24_500);
    require_eq!(drafts[1].validity, closed(date(2024, 5, 1), date(2034, 2, 28))?);
    require_eq!(drafts[1].total_fee(), 26_600);
    Ok(())
}

#[tokio::test]
async fn ended_partnership_removes_the_partner_from_later_drafts() -> WorkflowResult {
    let mut household = Household::new();
    let partner = household.add_partner(100_000);
    let harness = harness(household.snapshot.clone(), date(2024, 1, 15));

    harness
        .generator
        .recompute_from(household.head, date(2024, 1, 1))
        .await
        .map_err(|e| e.to_string())?;

    let ended = closed(date(2024, 1, 1), date(2024, 6, 30))?;
    harness
        .source
        .update(|snapshot| {
            for partnership in &mut snapshot.partnerships {
                partnership.period = ended;
            }
        })
        .await;
    let report = harness
        .generator
        .handle_family_update(partner, Period::open(date(2024, 7, 1)))
        .await
        .map_err(|e| e.to_string())?;
    require!(
        report.heads_of_family().contains(&household.head),
        "head of family was not regenerated: {:?}",
        report.runs
    );

    let drafts = fee_decisions_in(&harness, household.head, &[DecisionStatus::Draft]).await?;
    require_eq!(drafts.len(), 2);
    require_eq!(drafts[0].validity, ended);
    require_eq!(drafts[0].partner, Some(partner));
    require_eq!(drafts[0].family_size, 3);
    require_eq!(drafts[1].validity, closed(date(2024, 7, 1), date(2034, 2, 28))?);
    require_eq!(drafts[1].partner, None::<PersonId>);
    require_eq!(drafts[1].family_size, 2);
    require_eq!(drafts[1].total_fee(), 20_300);
    Ok(())
}

#[tokio::test]
async fn voucher_units_produce_value_decisions_only() -> WorkflowResult {
    let snapshot = FinanceSnapshot::sample().map_err(|e| e.to_string())?;
    let head = snapshot.parentships[0].head_of_child;
    let younger = snapshot.parentships[1].child;
    let harness = harness(snapshot, date(2024, 1, 15));

    harness.generator.recompute_from(head, date(2024, 1, 1)).await.map_err(|e| e.to_string())?;

    let fee_drafts = fee_decisions_in(&harness, head, &[DecisionStatus::Draft]).await?;
    require_eq!(fee_drafts.len(), 1);
    require_eq!(fee_drafts[0].validity, closed(date(2024, 1, 1), date(2025, 7, 31))?);
    require_eq!(fee_drafts[0].parts.len(), 1);
    require_eq!(fee_drafts[0].total_fee(), 13_800);

    let voucher_drafts = harness
        .voucher_value_decisions
        .find_for_head_of_family(head, &[DecisionStatus::Draft])
        .await
        .map_err(|e| e.to_string())?;
    require_eq!(voucher_drafts.len(), 1);
    require_eq!(voucher_drafts[0].validity, closed(date(2024, 3, 1), date(2025, 7, 31))?);
    require_eq!(voucher_drafts[0].parts[0].child, younger);
    require_eq!(voucher_drafts[0].parts[0].sibling_discount, 50);
    require_eq!(voucher_drafts[0].total_co_payment(), 5_500);
    Ok(())
}

#[tokio::test]
async fn fee_decisions_start_no_earlier_than_the_minimum_date() -> WorkflowResult {
    let mut household = Household::new();
    household.snapshot.pricing = vec![pricing_from(date(2000, 1, 1))];
    let harness = harness(household.snapshot.clone(), date(2024, 1, 15));

    let report = harness
        .generator
        .handle_family_update(household.head, Period::open(date(2019, 1, 1)))
        .await
        .map_err(|e| e.to_string())?;

    let fee_run = report
        .runs
        .iter()
        .find(|run| run.kind == FeeDecision::KIND)
        .ok_or("fee decision run missing")?;
    let voucher_run = report
        .runs
        .iter()
        .find(|run| run.kind == VoucherValueDecision::KIND)
        .ok_or("voucher value decision run missing")?;
    require_eq!(fee_run.from, FinanceConfig::default().fee_decision_min_date);
    require_eq!(voucher_run.from, date(2019, 1, 1));
    Ok(())
}

#[tokio::test]
async fn missing_pricing_fails_without_storing_anything() -> WorkflowResult {
    let mut household = Household::new();
    household.snapshot.pricing.clear();
    let harness = harness(household.snapshot.clone(), date(2024, 1, 15));

    let result = harness.generator.recompute_from(household.head, date(2024, 1, 1)).await;

    require!(matches!(
        result,
        Err(ApplicationError::Domain(DomainError::MissingPricing { .. }))
    ));
    let drafts = fee_decisions_in(&harness, household.head, &[DecisionStatus::Draft]).await?;
    require!(drafts.is_empty());
    Ok(())
}

#[tokio::test]
async fn concurrent_triggers_for_one_household_leave_a_consistent_result() -> WorkflowResult {
    let household = Household::new();
    let harness = harness(household.snapshot.clone(), date(2024, 1, 15));
    let period = Period::open(date(2024, 1, 1));

    let (placement, income) = tokio::join!(
        harness.generator.handle_placement(household.first_child.id, period),
        harness.generator.handle_income_change(household.head, period),
    );
    placement.map_err(|e| e.to_string())?;
    income.map_err(|e| e.to_string())?;

    let drafts = fee_decisions_in(&harness, household.head, &[DecisionStatus::Draft]).await?;
    require_eq!(drafts.len(), 1);
    require_eq!(drafts[0].total_fee(), 20_300);
    Ok(())
}

#[tokio::test]
async fn sqlite_store_round_trips_a_generation_run() -> WorkflowResult {
    let household = Household::new();
    let pool =
        connect_with_settings("sqlite::memory:", 1, 30).await.map_err(|e| e.to_string())?;
    migrations::run_pending(&pool).await.map_err(|e| e.to_string())?;

    let store = Arc::new(SqlDecisionRepository::new(pool));
    let source = Arc::new(InMemoryFinanceSource::new(household.snapshot.clone()));
    let generator = DecisionGenerator::new(
        FinanceSources::shared(source),
        store.clone(),
        store.clone(),
        FinanceConfig::default(),
        Arc::new(FixedClock(date(2024, 1, 15))),
    );

    generator.recompute_from(household.head, date(2024, 1, 1)).await.map_err(|e| e.to_string())?;
    generator.recompute_from(household.head, date(2024, 1, 1)).await.map_err(|e| e.to_string())?;

    let drafts = DecisionRepository::<FeeDecision>::find_for_head_of_family(
        store.as_ref(),
        household.head,
        &[DecisionStatus::Draft],
    )
    .await
    .map_err(|e| e.to_string())?;
    require_eq!(drafts.len(), 1);
    require_eq!(drafts[0].parts[0].fee, 20_300);
    Ok(())
}
