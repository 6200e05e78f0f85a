use clap::Args;
use orderdesk_core::domain::ids::OrderTypeId;
use orderdesk_core::{ApplicationError, RoutingEngine};
use orderdesk_db::repositories::SqlRoutingDirectory;

use crate::commands::route::persistence;
use crate::commands::{run_with_pool, CommandFailure, CommandResult};

#[derive(Clone, Debug, Args)]
pub struct PredefinedRouteArgs {
    #[arg(long)]
    pub order_type: i64,
}

pub fn run(args: PredefinedRouteArgs) -> CommandResult {
    let order_type_id = OrderTypeId(args.order_type);

    let result = run_with_pool("predefined-route", |pool| async move {
        let mut conn = pool.acquire().await.map_err(persistence)?;
        let mut engine = RoutingEngine::new(SqlRoutingDirectory::new(&mut conn));
        let route =
            engine.get_predefined_route(order_type_id).await.map_err(ApplicationError::from)?;
        Ok::<_, CommandFailure>(route)
    });

    match result {
        Ok(Some(route)) => CommandResult::success_with_data(
            "predefined-route",
            format!("order type {order_type_id} has a predefined route"),
            serde_json::to_value(&route).ok(),
        ),
        Ok(None) => CommandResult::success(
            "predefined-route",
            format!("order type {order_type_id} has no predefined route"),
        ),
        Err(failure) => failure,
    }
}
