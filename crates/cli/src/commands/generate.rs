use std::path::PathBuf;
use std::sync::Arc;

use chrono::NaiveDate;
use clap::{Args, ValueEnum};
use serde_json::{json, Value};
use tracing::info;
use uuid::Uuid;

use evaka_finance_core::clock::SystemClock;
use evaka_finance_core::config::AppConfig;
use evaka_finance_core::domain::person::PersonId;
use evaka_finance_core::period::Period;
use evaka_finance_db::repositories::{InMemoryFinanceSource, SqlDecisionRepository};
use evaka_finance_db::{
    connect_with_config, migrations, DecisionGenerator, FinanceSnapshot, FinanceSources,
    GenerationReport,
};

use crate::commands::{load_config, runtime, CommandResult, StepFailure};

/// The change that triggers regeneration.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
#[value(rename_all = "snake_case")]
pub enum TriggerEvent {
    Placement,
    ServiceNeed,
    FeeAlteration,
    Family,
    Income,
    /// Regenerate a head of family from `--from`, ignoring the minimum fee decision date.
    Recompute,
}

#[derive(Clone, Debug, Args)]
pub struct GenerateArgs {
    #[arg(long, help = "JSON finance snapshot with families, incomes, placements and pricing")]
    pub snapshot: PathBuf,
    #[arg(long, value_enum)]
    pub event: TriggerEvent,
    #[arg(long, help = "Child, adult or head of family the event concerns")]
    pub person: Uuid,
    #[arg(long, help = "First day affected by the change (YYYY-MM-DD)")]
    pub from: NaiveDate,
    #[arg(long, help = "Last day affected by the change, open-ended when omitted")]
    pub to: Option<NaiveDate>,
}

pub fn run(args: GenerateArgs) -> CommandResult {
    match generate(&args) {
        Ok(report) => {
            let heads = report.heads_of_family().len();
            CommandResult::success_with_data(
                "generate",
                format!("regenerated decisions for {heads} head(s) of family"),
                Some(report_json(&report)),
            )
        }
        Err(failure) => CommandResult::from_step("generate", failure),
    }
}

fn generate(args: &GenerateArgs) -> Result<GenerationReport, StepFailure> {
    let config = load_config()?;
    let snapshot = FinanceSnapshot::load(&args.snapshot)
        .map_err(|error| ("snapshot", error.to_string(), 2))?;
    let period = match args.to {
        Some(to) => Period::closed(args.from, to)
            .map_err(|error| ("invalid_period", error.to_string(), 2))?,
        None => Period::open(args.from),
    };

    runtime()?.block_on(async {
        let report = trigger(&config, snapshot, args.event, PersonId(args.person), period).await?;
        info!(
            event_name = "cli.generate.completed",
            trigger = ?args.event,
            person_id = %args.person,
            heads_of_family = report.heads_of_family().len(),
            "generation finished"
        );
        Ok(report)
    })
}

async fn trigger(
    config: &AppConfig,
    snapshot: FinanceSnapshot,
    event: TriggerEvent,
    person: PersonId,
    period: Period,
) -> Result<GenerationReport, StepFailure> {
    let pool = connect_with_config(&config.database)
        .await
        .map_err(|error| ("db_connectivity", error.to_string(), 4))?;
    migrations::run_pending(&pool).await.map_err(|error| ("migration", error.to_string(), 5))?;

    let store = Arc::new(SqlDecisionRepository::new(pool.clone()));
    let generator = DecisionGenerator::new(
        FinanceSources::shared(Arc::new(InMemoryFinanceSource::new(snapshot))),
        store.clone(),
        store,
        config.finance,
        Arc::new(SystemClock),
    );

    let result = match event {
        TriggerEvent::Placement => generator.handle_placement(person, period).await,
        TriggerEvent::ServiceNeed => generator.handle_service_need(person, period).await,
        TriggerEvent::FeeAlteration => generator.handle_fee_alteration_change(person, period).await,
        TriggerEvent::Family => generator.handle_family_update(person, period).await,
        TriggerEvent::Income => generator.handle_income_change(person, period).await,
        TriggerEvent::Recompute => generator.recompute_from(person, period.start()).await,
    };
    pool.close().await;
    result.map_err(|error| ("generation", error.to_string(), 6))
}

fn report_json(report: &GenerationReport) -> Value {
    let runs: Vec<Value> = report
        .runs
        .iter()
        .map(|run| {
            json!({
                "head_of_family_id": run.head_of_family.to_string(),
                "kind": run.kind.as_str(),
                "from": run.from.to_string(),
                "drafts": run.drafts,
                "updated_actives": run.updated_actives,
            })
        })
        .collect();
    json!({ "runs": runs })
}
