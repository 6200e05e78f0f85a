use clap::Args;
use orderdesk_core::domain::ids::{BranchId, DepartmentId, OfficeId, OtdelId, UserId};
use orderdesk_core::{
    can_do, ApplicationError, AuthzContext, DomainError, OrderTarget, Permission,
    PermissionSetProvider, Target, UserTarget,
};
use orderdesk_db::repositories::{SqlPermissionSetProvider, SqlRoutingDirectory};
use serde_json::json;

use crate::commands::route::persistence;
use crate::commands::{run_with_pool, CommandFailure, CommandResult};

#[derive(Clone, Debug, Default, Args)]
pub struct CanArgs {
    #[arg(long, help = "Acting user")]
    pub user: i64,
    #[arg(long, help = "Permission token such as orders:update or users:view:email")]
    pub permission: String,
    #[arg(long, help = "Check against an unowned reference row")]
    pub simple: bool,
    #[arg(long, help = "Check against another employee's record")]
    pub target_user: Option<i64>,
    #[arg(long, help = "Order ownership; needs --order-creator and --order-executor too")]
    pub order_department: Option<i64>,
    #[arg(long)]
    pub order_otdel: Option<i64>,
    #[arg(long)]
    pub order_branch: Option<i64>,
    #[arg(long)]
    pub order_office: Option<i64>,
    #[arg(long)]
    pub order_creator: Option<i64>,
    #[arg(long)]
    pub order_executor: Option<i64>,
}

impl CanArgs {
    fn mentions_order(&self) -> bool {
        [
            self.order_department,
            self.order_otdel,
            self.order_branch,
            self.order_office,
            self.order_creator,
            self.order_executor,
        ]
        .iter()
        .any(Option::is_some)
    }

    fn order_target(&self) -> Option<OrderTarget> {
        Some(OrderTarget {
            department_id: DepartmentId(self.order_department?),
            otdel_id: self.order_otdel.map(OtdelId),
            branch_id: self.order_branch.map(BranchId),
            office_id: self.order_office.map(OfficeId),
            creator_id: UserId(self.order_creator?),
            executor_id: UserId(self.order_executor?),
        })
    }
}

pub fn run(args: CanArgs) -> CommandResult {
    let permission = match args.permission.parse::<Permission>() {
        Ok(permission) => permission,
        Err(error) => return bad_request(error.to_string()),
    };
    if args.mentions_order() && args.order_target().is_none() {
        return bad_request(
            "an order target needs --order-department, --order-creator and --order-executor",
        );
    }
    let actor_id = UserId(args.user);
    let requested = permission.clone();

    let result = run_with_pool("can", |pool| async move {
        let mut conn = pool.acquire().await.map_err(persistence)?;
        let mut directory = SqlRoutingDirectory::new(&mut conn);

        let actor = directory
            .load_active_user(actor_id)
            .await
            .map_err(persistence)?
            .ok_or_else(|| not_found(actor_id))?;

        let target = if let Some(target_id) = args.target_user.map(UserId) {
            let user = directory
                .load_active_user(target_id)
                .await
                .map_err(persistence)?
                .ok_or_else(|| not_found(target_id))?;
            Some(Target::User(UserTarget::from(&user)))
        } else if let Some(order) = args.order_target() {
            Some(Target::Order(order))
        } else if args.simple {
            Some(Target::Simple)
        } else {
            None
        };
        drop(directory);
        drop(conn);

        let permissions = SqlPermissionSetProvider::new(pool.clone())
            .permission_set_for(actor_id)
            .await
            .map_err(persistence)?;

        let mut ctx = AuthzContext::new(actor, permissions);
        ctx.target = target;
        Ok::<_, CommandFailure>(can_do(&requested, &ctx))
    });

    match result {
        Ok(allowed) => {
            tracing::info!(
                event_name = "cli.can.evaluated",
                user_id = actor_id.0,
                permission = %permission,
                allowed,
                "permission evaluated"
            );
            CommandResult::success_with_data(
                "can",
                if allowed { "allowed" } else { "denied" },
                Some(json!({
                    "user_id": actor_id.0,
                    "permission": permission.to_string(),
                    "allowed": allowed,
                })),
            )
        }
        Err(failure) => failure,
    }
}

fn not_found(user_id: UserId) -> CommandFailure {
    CommandFailure::Application(ApplicationError::from(DomainError::NotFound(format!(
        "user {user_id} does not exist or is inactive"
    ))))
}

fn bad_request(message: impl Into<String>) -> CommandResult {
    CommandResult::from_application_error(
        "can",
        ApplicationError::from(DomainError::BadRequest(message.into())),
    )
}

#[cfg(test)]
mod tests {
    use orderdesk_core::domain::ids::{DepartmentId, UserId};

    use super::CanArgs;

    #[test]
    fn order_target_needs_department_creator_and_executor() {
        let partial = CanArgs {
            order_department: Some(10),
            order_creator: Some(1),
            ..CanArgs::default()
        };
        assert!(partial.mentions_order());
        assert!(partial.order_target().is_none());

        let complete = CanArgs { order_executor: Some(2), ..partial };
        let target = complete.order_target().expect("complete order target");
        assert_eq!(target.department_id, DepartmentId(10));
        assert_eq!(target.executor_id, UserId(2));
    }

    #[test]
    fn plain_args_describe_a_collection_check() {
        let args = CanArgs { user: 1, permission: "orders:view".to_string(), ..CanArgs::default() };

        assert!(!args.mentions_order());
        assert!(args.order_target().is_none());
    }
}
