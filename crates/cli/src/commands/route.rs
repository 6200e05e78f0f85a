use clap::Args;
use orderdesk_core::domain::ids::{BranchId, DepartmentId, OfficeId, OrderTypeId, OtdelId, UserId};
use orderdesk_core::{ApplicationError, OrderRoutingContext, RoutingEngine, RoutingResult};
use orderdesk_db::repositories::SqlRoutingDirectory;

use crate::commands::{run_with_pool, CommandFailure, CommandResult};

#[derive(Clone, Debug, Default, Args)]
pub struct RouteArgs {
    #[arg(long, help = "Order type of the new or transferred order")]
    pub order_type: i64,
    #[arg(long)]
    pub department: Option<i64>,
    #[arg(long)]
    pub otdel: Option<i64>,
    #[arg(long)]
    pub branch: Option<i64>,
    #[arg(long)]
    pub office: Option<i64>,
    #[arg(long, help = "Explicitly chosen executor; skips rules and hierarchy")]
    pub executor: Option<i64>,
}

impl RouteArgs {
    fn context(&self) -> OrderRoutingContext {
        OrderRoutingContext {
            order_type_id: OrderTypeId(self.order_type),
            department_id: self.department.map(DepartmentId),
            otdel_id: self.otdel.map(OtdelId),
            branch_id: self.branch.map(BranchId),
            office_id: self.office.map(OfficeId),
        }
    }
}

pub fn run(args: RouteArgs) -> CommandResult {
    let ctx = args.context();
    let explicit = args.executor.map(UserId);

    let result = run_with_pool("route", |pool| async move {
        let mut tx = pool.begin().await.map_err(persistence)?;
        let mut engine = RoutingEngine::new(SqlRoutingDirectory::new(&mut *tx));
        let resolved =
            engine.resolve_executor(&ctx, explicit).await.map_err(ApplicationError::from);
        drop(engine);
        tx.commit().await.map_err(persistence)?;
        Ok::<_, CommandFailure>(resolved?)
    });

    match result {
        Ok(routed) => CommandResult::success_with_data(
            "route",
            describe(&routed),
            serde_json::to_value(&routed).ok(),
        ),
        Err(failure) => failure,
    }
}

fn describe(routed: &RoutingResult) -> String {
    if routed.rule_found {
        format!("executor {} assigned by routing rule", routed.executor.id)
    } else {
        format!("executor {} assigned without a routing rule", routed.executor.id)
    }
}

pub(crate) fn persistence(error: impl std::fmt::Display) -> CommandFailure {
    CommandFailure::Application(ApplicationError::Persistence(error.to_string()))
}
