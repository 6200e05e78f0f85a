use orderdesk_db::migrations;

use crate::commands::{run_with_pool, CommandFailure, CommandResult};

pub fn run() -> CommandResult {
    let result = run_with_pool("migrate", |pool| async move {
        migrations::run_pending(&pool)
            .await
            .map_err(|error| CommandFailure::infrastructure("migration", error.to_string(), 5))
    });

    match result {
        Ok(()) => CommandResult::success("migrate", "applied pending migrations"),
        Err(failure) => failure,
    }
}
