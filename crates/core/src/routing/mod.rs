//! Executor resolution for new and transferred orders.
//!
//! Resolution is a three-step decision per call: an explicit executor wins
//! outright, then the best matching routing rule, then a search for the head
//! of the most significant org unit on the order. All reads go through the
//! [`RoutingDirectory`] the engine wraps.

pub mod hierarchy;
pub mod matcher;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::directory::{DirectoryError, RoutingDirectory};
use crate::domain::ids::{DepartmentId, OrderTypeId, OtdelId, PositionId, RuleId, StatusId, UserId};
use crate::domain::order::OrderRoutingContext;
use crate::domain::org::{Actor, PositionType};

pub use hierarchy::{resolve_by_hierarchy, target_position_type, HierarchyQuery, OrgPredicate};
pub use matcher::{select_holder, select_rule};

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum RoutingError {
    #[error("executor {user_id} does not exist or is inactive")]
    ExecutorNotFound { user_id: UserId },
    #[error("no organizational unit selected")]
    NoOrganizationalUnit,
    #[error("no employee holds position {position_type} in the requested unit")]
    NoHolderForPositionType { position_type: PositionType },
    #[error("position found but no matching active employee (rule {rule_id}, position {position_id})")]
    NoHolderForPosition { rule_id: RuleId, position_id: PositionId },
    #[error(transparent)]
    Directory(#[from] DirectoryError),
}

/// Outcome of [`RoutingEngine::resolve_executor`].
///
/// `status_id` is only set when a rule matched; otherwise the caller applies
/// its default initial status.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutingResult {
    pub executor: Actor,
    pub status_id: Option<StatusId>,
    pub rule_found: bool,
}

/// Units a hard rule pins for an order type, used to pre-fill order forms.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PredefinedRoute {
    pub department_id: Option<DepartmentId>,
    pub otdel_id: Option<OtdelId>,
}

#[derive(Debug)]
pub struct RoutingEngine<D> {
    directory: D,
}

impl<D> RoutingEngine<D>
where
    D: RoutingDirectory,
{
    pub fn new(directory: D) -> Self {
        Self { directory }
    }

    pub fn into_inner(self) -> D {
        self.directory
    }

    pub async fn resolve_executor(
        &mut self,
        ctx: &OrderRoutingContext,
        explicit_executor_id: Option<UserId>,
    ) -> Result<RoutingResult, RoutingError> {
        if let Some(user_id) = explicit_executor_id {
            let executor = self
                .directory
                .find_active_user(user_id)
                .await?
                .ok_or(RoutingError::ExecutorNotFound { user_id })?;
            tracing::info!(
                event_name = "routing.resolve.explicit",
                order_type_id = ctx.order_type_id.0,
                executor_id = executor.id.0,
                "executor supplied explicitly"
            );
            return Ok(RoutingResult { executor, status_id: None, rule_found: false });
        }

        let candidates = self.directory.matching_rules(ctx).await?;
        if let Some(rule) = select_rule(&candidates, ctx) {
            let holders = self.directory.position_holders(rule.assign_to_position_id).await?;
            let executor = select_holder(rule, ctx, &holders).cloned().ok_or(
                RoutingError::NoHolderForPosition {
                    rule_id: rule.id,
                    position_id: rule.assign_to_position_id,
                },
            )?;
            tracing::info!(
                event_name = "routing.resolve.rule_matched",
                order_type_id = ctx.order_type_id.0,
                rule_id = rule.id.0,
                position_id = rule.assign_to_position_id.0,
                executor_id = executor.id.0,
                "executor resolved by routing rule"
            );
            return Ok(RoutingResult {
                executor,
                status_id: Some(rule.status_id),
                rule_found: true,
            });
        }

        let executor = resolve_by_hierarchy(&mut self.directory, ctx).await?;
        tracing::info!(
            event_name = "routing.resolve.hierarchy",
            order_type_id = ctx.order_type_id.0,
            executor_id = executor.id.0,
            "executor resolved by org hierarchy"
        );
        Ok(RoutingResult { executor, status_id: None, rule_found: false })
    }

    /// `Ok(None)` when no rule keyed on `order_type_id` pins a unit.
    pub async fn get_predefined_route(
        &mut self,
        order_type_id: OrderTypeId,
    ) -> Result<Option<PredefinedRoute>, RoutingError> {
        let rules = self.directory.rules_for_order_type(order_type_id).await?;
        let keyed: Vec<_> =
            rules.into_iter().filter(|rule| rule.order_type_id == Some(order_type_id)).collect();

        Ok(matcher::predefined_unit(&keyed)
            .map(|(department_id, otdel_id)| PredefinedRoute { department_id, otdel_id }))
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use crate::directory::{DirectoryError, RoutingDirectory};
    use crate::domain::ids::{
        DepartmentId, OrderTypeId, OtdelId, PositionId, RuleId, StatusId, UserId,
    };
    use crate::domain::order::{OrderRoutingContext, OrderRoutingRule};
    use crate::domain::org::{Actor, PositionType};

    use super::{HierarchyQuery, PredefinedRoute, RoutingEngine, RoutingError};

    #[derive(Default)]
    struct FakeDirectory {
        users: Vec<(Actor, Option<PositionType>)>,
        rules: Vec<OrderRoutingRule>,
        fail_lookups: bool,
    }

    impl FakeDirectory {
        fn check(&self) -> Result<(), DirectoryError> {
            if self.fail_lookups {
                return Err(DirectoryError::Unavailable("connection reset".to_string()));
            }
            Ok(())
        }
    }

    #[async_trait]
    impl RoutingDirectory for FakeDirectory {
        async fn find_active_user(
            &mut self,
            user_id: UserId,
        ) -> Result<Option<Actor>, DirectoryError> {
            self.check()?;
            Ok(self.users.iter().map(|(actor, _)| actor).find(|actor| actor.id == user_id).cloned())
        }

        async fn matching_rules(
            &mut self,
            _ctx: &OrderRoutingContext,
        ) -> Result<Vec<OrderRoutingRule>, DirectoryError> {
            self.check()?;
            Ok(self.rules.clone())
        }

        async fn rules_for_order_type(
            &mut self,
            _order_type_id: OrderTypeId,
        ) -> Result<Vec<OrderRoutingRule>, DirectoryError> {
            self.check()?;
            Ok(self.rules.clone())
        }

        async fn position_holders(
            &mut self,
            position_id: PositionId,
        ) -> Result<Vec<Actor>, DirectoryError> {
            self.check()?;
            Ok(self
                .users
                .iter()
                .map(|(actor, _)| actor)
                .filter(|actor| actor.position_id == Some(position_id))
                .cloned()
                .collect())
        }

        async fn find_by_hierarchy(
            &mut self,
            query: &HierarchyQuery,
        ) -> Result<Option<Actor>, DirectoryError> {
            self.check()?;
            Ok(self
                .users
                .iter()
                .filter(|(actor, position_type)| {
                    position_type.map_or(false, |position_type| query.accepts(actor, position_type))
                })
                .map(|(actor, _)| actor.clone())
                .min_by_key(|actor| actor.id))
        }
    }

    fn user(id: i64, department: i64, position: i64) -> Actor {
        let mut actor = Actor::new(UserId(id), DepartmentId(department));
        actor.position_id = Some(PositionId(position));
        actor
    }

    fn rule(id: i64, order_type: i64, department: Option<i64>, position: i64) -> OrderRoutingRule {
        OrderRoutingRule {
            id: RuleId(id),
            order_type_id: Some(OrderTypeId(order_type)),
            department_id: department.map(DepartmentId),
            otdel_id: None,
            branch_id: None,
            office_id: None,
            assign_to_position_id: PositionId(position),
            status_id: StatusId(id * 10),
        }
    }

    fn directory() -> FakeDirectory {
        FakeDirectory {
            users: vec![
                (user(101, 9, 1), Some(PositionType::HeadOfDepartment)),
                (user(111, 10, 11), Some(PositionType::Specialist)),
                (user(122, 10, 22), Some(PositionType::Specialist)),
            ],
            rules: vec![rule(1, 3, None, 11), rule(2, 3, Some(10), 22)],
            fail_lookups: false,
        }
    }

    #[tokio::test]
    async fn explicit_executor_short_circuits_rules() {
        let mut engine = RoutingEngine::new(directory());
        let ctx = OrderRoutingContext::new(OrderTypeId(3)).with_department(DepartmentId(10));

        let result = engine.resolve_executor(&ctx, Some(UserId(101))).await.expect("explicit");

        assert_eq!(result.executor.id, UserId(101));
        assert!(!result.rule_found);
        assert_eq!(result.status_id, None);
    }

    #[tokio::test]
    async fn unknown_explicit_executor_is_rejected() {
        let mut engine = RoutingEngine::new(directory());
        let ctx = OrderRoutingContext::new(OrderTypeId(3));

        let error = engine.resolve_executor(&ctx, Some(UserId(404))).await.expect_err("missing");
        assert_eq!(error, RoutingError::ExecutorNotFound { user_id: UserId(404) });
    }

    #[tokio::test]
    async fn most_specific_rule_assigns_position_holder_and_status() {
        let mut engine = RoutingEngine::new(directory());
        let ctx = OrderRoutingContext::new(OrderTypeId(3)).with_department(DepartmentId(10));

        let result = engine.resolve_executor(&ctx, None).await.expect("rule match");

        assert!(result.rule_found);
        assert_eq!(result.executor.id, UserId(122));
        assert_eq!(result.status_id, Some(StatusId(20)));
    }

    #[tokio::test]
    async fn wildcard_rule_routes_to_holder_in_order_department() {
        let mut directory = directory();
        directory.rules = vec![rule(1, 3, None, 11)];
        directory.users.push((user(105, 20, 11), Some(PositionType::Specialist)));
        let mut engine = RoutingEngine::new(directory);
        let ctx = OrderRoutingContext::new(OrderTypeId(3)).with_department(DepartmentId(10));

        let result = engine.resolve_executor(&ctx, None).await.expect("rule match");

        assert_eq!(result.executor.id, UserId(111));
        assert_eq!(result.executor.department_id, DepartmentId(10));
    }

    #[tokio::test]
    async fn repeated_resolution_is_stable() {
        let mut engine = RoutingEngine::new(directory());
        let ctx = OrderRoutingContext::new(OrderTypeId(3)).with_department(DepartmentId(10));

        let first = engine.resolve_executor(&ctx, None).await.expect("first");
        let second = engine.resolve_executor(&ctx, None).await.expect("second");
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn matched_rule_without_holder_is_not_a_fallback() {
        let mut directory = directory();
        directory.users.retain(|(actor, _)| actor.id != UserId(122));
        let mut engine = RoutingEngine::new(directory);
        let ctx = OrderRoutingContext::new(OrderTypeId(3)).with_department(DepartmentId(10));

        let error = engine.resolve_executor(&ctx, None).await.expect_err("no holder");
        assert_eq!(
            error,
            RoutingError::NoHolderForPosition { rule_id: RuleId(2), position_id: PositionId(22) }
        );
    }

    #[tokio::test]
    async fn unmatched_order_falls_back_to_department_head() {
        let mut engine = RoutingEngine::new(directory());
        let ctx = OrderRoutingContext::new(OrderTypeId(8))
            .with_department(DepartmentId(9))
            .with_otdel(OtdelId(90));

        let result = engine.resolve_executor(&ctx, None).await.expect("hierarchy");

        assert_eq!(result.executor.id, UserId(101));
        assert!(!result.rule_found);
        assert_eq!(result.status_id, None);
    }

    #[tokio::test]
    async fn fallback_without_head_reports_position_type() {
        let mut engine = RoutingEngine::new(directory());
        let ctx = OrderRoutingContext::new(OrderTypeId(8)).with_department(DepartmentId(30));

        let error = engine.resolve_executor(&ctx, None).await.expect_err("no head");
        assert_eq!(
            error,
            RoutingError::NoHolderForPositionType { position_type: PositionType::HeadOfDepartment }
        );
        assert_eq!(
            error.to_string(),
            "no employee holds position HEAD_OF_DEPARTMENT in the requested unit"
        );
    }

    #[tokio::test]
    async fn directory_failures_propagate() {
        let mut directory = directory();
        directory.fail_lookups = true;
        let mut engine = RoutingEngine::new(directory);
        let ctx = OrderRoutingContext::new(OrderTypeId(3));

        let error = engine.resolve_executor(&ctx, None).await.expect_err("lookup fails");
        assert!(matches!(error, RoutingError::Directory(DirectoryError::Unavailable(_))));
    }

    #[tokio::test]
    async fn predefined_route_reports_pinned_department() {
        let mut engine = RoutingEngine::new(directory());

        let route = engine.get_predefined_route(OrderTypeId(3)).await.expect("lookup");
        assert_eq!(
            route,
            Some(PredefinedRoute { department_id: Some(DepartmentId(10)), otdel_id: None })
        );
    }

    #[tokio::test]
    async fn predefined_route_is_absent_for_unrouted_type() {
        let mut directory = directory();
        directory.rules = vec![rule(5, 3, None, 11)];
        let mut engine = RoutingEngine::new(directory);

        assert_eq!(engine.get_predefined_route(OrderTypeId(3)).await.expect("lookup"), None);
        assert_eq!(engine.get_predefined_route(OrderTypeId(4)).await.expect("lookup"), None);
    }
}
