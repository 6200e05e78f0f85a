//! Scope-based permission evaluation.
//!
//! `can_do` is a pure function of its arguments. Callers resolve the actor's
//! [`PermissionSet`] up front and attach a [`Target`] whenever the operation
//! touches one specific row; omitting the target turns the check into a
//! collection check.

pub mod permission;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::ids::{BranchId, DepartmentId, OfficeId, OtdelId, UserId};
use crate::domain::org::Actor;

pub use permission::{Action, Permission, PermissionParseError, PermissionSet, Resource, Scope};

/// Ownership fields of an order row.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderTarget {
    pub department_id: DepartmentId,
    pub otdel_id: Option<OtdelId>,
    pub branch_id: Option<BranchId>,
    pub office_id: Option<OfficeId>,
    pub creator_id: UserId,
    pub executor_id: UserId,
}

/// Another employee as the object of an action.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserTarget {
    pub id: UserId,
    pub department_id: DepartmentId,
    pub branch_id: Option<BranchId>,
    pub otdel_id: Option<OtdelId>,
    pub office_id: Option<OfficeId>,
}

impl From<&Actor> for UserTarget {
    fn from(actor: &Actor) -> Self {
        Self {
            id: actor.id,
            department_id: actor.department_id,
            branch_id: actor.branch_id,
            otdel_id: actor.otdel_id,
            office_id: actor.office_id,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Target {
    /// Reference/catalog row without ownership.
    Simple,
    Order(OrderTarget),
    User(UserTarget),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuthzContext {
    pub actor: Actor,
    pub permissions: PermissionSet,
    pub target: Option<Target>,
}

impl AuthzContext {
    pub fn new(actor: Actor, permissions: PermissionSet) -> Self {
        Self { actor, permissions, target: None }
    }

    pub fn with_target(mut self, target: Target) -> Self {
        self.target = Some(target);
        self
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("actor {actor_id} is not allowed to `{permission}`")]
pub struct AccessDenied {
    pub actor_id: UserId,
    pub permission: String,
}

pub fn can_do(permission: &Permission, ctx: &AuthzContext) -> bool {
    let granted = &ctx.permissions;

    if granted.is_superuser() {
        return true;
    }
    if !granted.contains(permission) {
        return false;
    }
    // Nothing exists yet to scope a creation against.
    if permission.action == Action::Create {
        return true;
    }

    if permission.resource.is_simple() {
        return match permission.action {
            Action::View => true,
            Action::Create | Action::Update | Action::Delete => granted.has_scope(Scope::All),
        };
    }

    if granted.has_scope(Scope::All) {
        return true;
    }

    match &ctx.target {
        None => granted.has_any_scope(&Scope::NARROW),
        Some(target) => target_in_scope(&ctx.actor, granted, target),
    }
}

/// [`can_do`] for callers that need an error to propagate.
pub fn authorize(permission: &Permission, ctx: &AuthzContext) -> Result<(), AccessDenied> {
    if can_do(permission, ctx) {
        return Ok(());
    }

    tracing::debug!(
        event_name = "access.denied",
        actor_id = ctx.actor.id.0,
        permission = %permission,
        has_target = ctx.target.is_some(),
        "permission check denied"
    );
    Err(AccessDenied { actor_id: ctx.actor.id, permission: permission.to_string() })
}

fn target_in_scope(actor: &Actor, granted: &PermissionSet, target: &Target) -> bool {
    match target {
        Target::Simple => false,
        Target::Order(order) => {
            (granted.has_scope(Scope::Department) && actor.department_id == order.department_id)
                || (granted.has_scope(Scope::Otdel) && same_unit(actor.otdel_id, order.otdel_id))
                || (granted.has_scope(Scope::Branch) && same_unit(actor.branch_id, order.branch_id))
                || (granted.has_scope(Scope::Office) && same_unit(actor.office_id, order.office_id))
                || (granted.has_scope(Scope::Own)
                    && (actor.id == order.creator_id || actor.id == order.executor_id))
        }
        Target::User(user) => {
            (granted.has_scope(Scope::Department) && actor.department_id == user.department_id)
                || (granted.has_scope(Scope::Otdel) && same_unit(actor.otdel_id, user.otdel_id))
                || (granted.has_scope(Scope::Branch) && same_unit(actor.branch_id, user.branch_id))
                || (granted.has_scope(Scope::Office) && same_unit(actor.office_id, user.office_id))
                || (granted.has_scope(Scope::Own) && actor.id == user.id)
        }
    }
}

fn same_unit<T: PartialEq>(actor_unit: Option<T>, target_unit: Option<T>) -> bool {
    matches!((actor_unit, target_unit), (Some(left), Some(right)) if left == right)
}

#[cfg(test)]
mod tests {
    use crate::domain::ids::{DepartmentId, OtdelId, UserId};
    use crate::domain::org::Actor;

    use super::{
        authorize, can_do, Action, AuthzContext, OrderTarget, Permission, PermissionSet, Resource,
        Target, UserTarget,
    };

    fn actor() -> Actor {
        let mut actor = Actor::new(UserId(1), DepartmentId(5));
        actor.otdel_id = Some(OtdelId(50));
        actor
    }

    fn order_in(department: i64) -> Target {
        Target::Order(OrderTarget {
            department_id: DepartmentId(department),
            otdel_id: None,
            branch_id: None,
            office_id: None,
            creator_id: UserId(900),
            executor_id: UserId(901),
        })
    }

    fn perm(token: &str) -> Permission {
        token.parse().expect("valid permission token")
    }

    fn ctx(tokens: &[&str]) -> AuthzContext {
        AuthzContext::new(actor(), PermissionSet::from_tokens(tokens.iter().copied()))
    }

    #[test]
    fn superuser_bypasses_every_check() {
        let ctx = ctx(&["superuser"]).with_target(order_in(7));

        for token in ["orders:view", "orders:delete", "statuses:update", "users:update:role"] {
            assert!(can_do(&perm(token), &ctx), "superuser should be allowed `{token}`");
        }
    }

    #[test]
    fn missing_base_grant_denies_regardless_of_scope() {
        let ctx = ctx(&["scope:all", "scope:own", "scope:department"]).with_target(order_in(5));

        assert!(!can_do(&perm("orders:view"), &ctx));
        assert!(!can_do(&perm("orders:create"), &ctx));
        assert!(!can_do(&perm("statuses:view"), &ctx));
    }

    #[test]
    fn create_depends_only_on_the_base_grant() {
        assert!(can_do(&perm("orders:create"), &ctx(&["orders:create"])));
        assert!(can_do(&perm("orders:create"), &ctx(&["orders:create"]).with_target(order_in(7))));
        assert!(!can_do(&perm("orders:create"), &ctx(&["scope:all"])));
    }

    #[test]
    fn simple_entity_view_needs_no_scope() {
        let ctx = ctx(&["statuses:view"]).with_target(Target::Simple);
        assert!(can_do(&perm("statuses:view"), &ctx));
    }

    #[test]
    fn simple_entity_update_requires_scope_all() {
        let without_all = ctx(&["catalogs:update", "scope:department"]).with_target(Target::Simple);
        assert!(!can_do(&perm("catalogs:update"), &without_all));

        let with_all = ctx(&["catalogs:update", "scope:all"]).with_target(Target::Simple);
        assert!(can_do(&perm("catalogs:update"), &with_all));
    }

    #[test]
    fn department_scope_matches_same_department_order() {
        let ctx = ctx(&["orders:view", "scope:department"]);

        assert!(can_do(&perm("orders:view"), &ctx.clone().with_target(order_in(5))));
        assert!(!can_do(&perm("orders:view"), &ctx.with_target(order_in(7))));
    }

    #[test]
    fn own_scope_matches_creator_or_executor() {
        let ctx = ctx(&["orders:update", "scope:own"]);
        let mut order = OrderTarget {
            department_id: DepartmentId(7),
            otdel_id: None,
            branch_id: None,
            office_id: None,
            creator_id: UserId(1),
            executor_id: UserId(901),
        };

        assert!(can_do(
            &perm("orders:update"),
            &ctx.clone().with_target(Target::Order(order.clone()))
        ));

        order.creator_id = UserId(900);
        order.executor_id = UserId(1);
        assert!(can_do(
            &perm("orders:update"),
            &ctx.clone().with_target(Target::Order(order.clone()))
        ));

        order.executor_id = UserId(902);
        assert!(!can_do(&perm("orders:update"), &ctx.with_target(Target::Order(order))));
    }

    #[test]
    fn otdel_scope_requires_both_sides_present() {
        let ctx = ctx(&["orders:view", "scope:otdel"]);
        let mut order = OrderTarget {
            department_id: DepartmentId(7),
            otdel_id: Some(OtdelId(50)),
            branch_id: None,
            office_id: None,
            creator_id: UserId(900),
            executor_id: UserId(901),
        };
        assert!(can_do(&perm("orders:view"), &ctx.clone().with_target(Target::Order(order.clone()))));

        order.otdel_id = None;
        assert!(!can_do(&perm("orders:view"), &ctx.with_target(Target::Order(order))));
    }

    #[test]
    fn user_target_uses_department_or_self() {
        let other = UserTarget {
            id: UserId(2),
            department_id: DepartmentId(5),
            branch_id: None,
            otdel_id: None,
            office_id: None,
        };
        let department = ctx(&["users:view", "scope:department"]);
        assert!(can_do(&perm("users:view"), &department.with_target(Target::User(other.clone()))));

        let own = ctx(&["users:update", "scope:own"]);
        assert!(!can_do(&perm("users:update"), &own.clone().with_target(Target::User(other))));
        let me = UserTarget::from(&actor());
        assert!(can_do(&perm("users:update"), &own.with_target(Target::User(me))));
    }

    #[test]
    fn collection_check_accepts_any_narrow_scope() {
        assert!(can_do(&perm("orders:view"), &ctx(&["orders:view", "scope:own"])));
        assert!(can_do(&perm("orders:view"), &ctx(&["orders:view", "scope:branch"])));
        assert!(!can_do(&perm("orders:view"), &ctx(&["orders:view"])));
    }

    #[test]
    fn scope_all_opens_owned_rows() {
        let ctx = ctx(&["orders:delete", "scope:all"]).with_target(order_in(99));
        assert!(can_do(&perm("orders:delete"), &ctx));
    }

    #[test]
    fn simple_target_on_owned_resource_is_denied() {
        let ctx = ctx(&["orders:view", "scope:department", "scope:own"]).with_target(Target::Simple);
        assert!(!can_do(&perm("orders:view"), &ctx));
    }

    #[test]
    fn field_permission_needs_its_exact_grant() {
        let ctx = ctx(&["orders:update", "scope:all"]);
        assert!(!can_do(&perm("orders:update:status"), &ctx));
        assert!(can_do(&Permission::new(Resource::Orders, Action::Update), &ctx));
    }

    #[test]
    fn authorize_reports_denied_permission() {
        let ctx = ctx(&["orders:view", "scope:department"]).with_target(order_in(7));

        let denied = authorize(&perm("orders:view"), &ctx).expect_err("other department");
        assert_eq!(denied.permission, "orders:view");
        assert_eq!(denied.actor_id, UserId(1));

        let ctx = ctx.with_target(order_in(5));
        assert!(authorize(&perm("orders:view"), &ctx).is_ok());
    }

    #[test]
    fn targets_serialize_with_kind_tag() {
        let value = serde_json::to_value(order_in(7)).expect("serialize target");

        assert_eq!(value["kind"], "order");
        assert_eq!(value["department_id"], 7);
        assert_eq!(value["otdel_id"], serde_json::Value::Null);
        let simple = serde_json::to_value(Target::Simple).expect("serialize simple target");
        assert_eq!(simple, serde_json::json!({ "kind": "simple" }));
    }
}
