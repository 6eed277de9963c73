use serde_json::{json, Value};
use uuid::Uuid;

use evaka_finance_core::domain::decision::{
    DecisionStatus, FeeDecision, FinanceDecision, VoucherValueDecision,
};
use evaka_finance_core::domain::person::PersonId;
use evaka_finance_db::repositories::{DecisionRepository, SqlDecisionRepository};
use evaka_finance_db::{connect_with_config, migrations};

use crate::commands::{load_config, runtime, CommandResult, StepFailure};

const ALL_STATUSES: [DecisionStatus; 4] = [
    DecisionStatus::Draft,
    DecisionStatus::WaitingForSending,
    DecisionStatus::WaitingForManualSending,
    DecisionStatus::Sent,
];

pub fn run(head_of_family: Uuid) -> CommandResult {
    match list(PersonId(head_of_family)) {
        Ok((fee_decisions, voucher_value_decisions)) => {
            let message = format!(
                "{} fee decision(s), {} voucher value decision(s)",
                fee_decisions.len(),
                voucher_value_decisions.len()
            );
            let data = json!({
                "fee_decisions": fee_decisions
                    .iter()
                    .map(|decision| summary(decision, decision.total_fee()))
                    .collect::<Vec<_>>(),
                "voucher_value_decisions": voucher_value_decisions
                    .iter()
                    .map(|decision| summary(decision, decision.total_co_payment()))
                    .collect::<Vec<_>>(),
            });
            CommandResult::success_with_data("decisions", message, Some(data))
        }
        Err(failure) => CommandResult::from_step("decisions", failure),
    }
}

fn list(
    head_of_family: PersonId,
) -> Result<(Vec<FeeDecision>, Vec<VoucherValueDecision>), StepFailure> {
    let config = load_config()?;
    runtime()?.block_on(async {
        let pool = connect_with_config(&config.database)
            .await
            .map_err(|error| ("db_connectivity", error.to_string(), 4))?;
        migrations::run_pending(&pool)
            .await
            .map_err(|error| ("migration", error.to_string(), 5))?;

        let store = SqlDecisionRepository::new(pool.clone());
        let fee_decisions = DecisionRepository::<FeeDecision>::find_for_head_of_family(
            &store,
            head_of_family,
            &ALL_STATUSES,
        )
        .await
        .map_err(|error| ("persistence", error.to_string(), 6))?;
        let voucher_value_decisions =
            DecisionRepository::<VoucherValueDecision>::find_for_head_of_family(
                &store,
                head_of_family,
                &ALL_STATUSES,
            )
            .await
            .map_err(|error| ("persistence", error.to_string(), 6))?;
        pool.close().await;
        Ok((fee_decisions, voucher_value_decisions))
    })
}

fn summary<D: FinanceDecision>(decision: &D, total: i32) -> Value {
    let validity = decision.validity();
    json!({
        "id": decision.id().0.to_string(),
        "status": decision.status().as_str(),
        "valid_from": validity.start().to_string(),
        "valid_to": validity.end().map(|end| end.to_string()),
        "parts": decision.parts().len(),
        "total": total,
    })
}
