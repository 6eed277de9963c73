use evaka_finance_db::{connect_with_config, migrations};

use crate::commands::{load_config, runtime, CommandResult, StepFailure};

pub fn run() -> CommandResult {
    match apply() {
        Ok(()) => CommandResult::success("migrate", "applied pending migrations"),
        Err(failure) => CommandResult::from_step("migrate", failure),
    }
}

fn apply() -> Result<(), StepFailure> {
    let config = load_config()?;
    runtime()?.block_on(async {
        let pool = connect_with_config(&config.database)
            .await
            .map_err(|error| ("db_connectivity", error.to_string(), 4))?;
        migrations::run_pending(&pool)
            .await
            .map_err(|error| ("migration", error.to_string(), 5))?;
        pool.close().await;
        Ok(())
    })
}
