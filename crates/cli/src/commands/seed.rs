use orderdesk_db::{migrations, seed_demo_org, SeedSummary};

use crate::commands::{run_with_pool, CommandFailure, CommandResult};

pub fn run() -> CommandResult {
    let result = run_with_pool("seed", |pool| async move {
        migrations::run_pending(&pool)
            .await
            .map_err(|error| CommandFailure::infrastructure("migration", error.to_string(), 5))?;

        seed_demo_org(&pool)
            .await
            .map_err(|error| CommandFailure::infrastructure("seed_execution", error.to_string(), 6))
    });

    match result {
        Ok(summary) => CommandResult::success("seed", render_summary(&summary)),
        Err(failure) => failure,
    }
}

fn render_summary(summary: &SeedSummary) -> String {
    format!(
        "demo org loaded: {} departments, {} users ({} active), {} routing rules",
        summary.departments, summary.users, summary.active_users, summary.routing_rules
    )
}

#[cfg(test)]
mod tests {
    use orderdesk_db::SeedSummary;

    use super::render_summary;

    #[test]
    fn summary_message_counts_inactive_users_separately() {
        let summary = SeedSummary { departments: 4, users: 8, active_users: 7, routing_rules: 3 };

        assert_eq!(
            render_summary(&summary),
            "demo org loaded: 4 departments, 8 users (7 active), 3 routing rules"
        );
    }
}
