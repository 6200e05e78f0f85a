use async_trait::async_trait;
use thiserror::Error;

use crate::access::PermissionSet;
use crate::domain::ids::{OrderTypeId, PositionId, UserId};
use crate::domain::order::{OrderRoutingContext, OrderRoutingRule};
use crate::domain::org::Actor;
use crate::routing::hierarchy::HierarchyQuery;

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum DirectoryError {
    #[error("directory lookup failed: {0}")]
    Unavailable(String),
}

/// Read access to routing rules and the org structure.
///
/// Methods take `&mut self` so an implementation can run every read on the
/// caller's open transaction.
#[async_trait]
pub trait RoutingDirectory: Send {
    /// Active (non-deleted) user by id.
    async fn find_active_user(&mut self, user_id: UserId) -> Result<Option<Actor>, DirectoryError>;

    /// Rules that may match `ctx`. Implementations may return a superset.
    async fn matching_rules(
        &mut self,
        ctx: &OrderRoutingContext,
    ) -> Result<Vec<OrderRoutingRule>, DirectoryError>;

    async fn rules_for_order_type(
        &mut self,
        order_type_id: OrderTypeId,
    ) -> Result<Vec<OrderRoutingRule>, DirectoryError>;

    /// Active users currently assigned to `position_id`.
    async fn position_holders(
        &mut self,
        position_id: PositionId,
    ) -> Result<Vec<Actor>, DirectoryError>;

    /// First active user (lowest id) satisfying `query`.
    async fn find_by_hierarchy(
        &mut self,
        query: &HierarchyQuery,
    ) -> Result<Option<Actor>, DirectoryError>;
}

/// Aggregates roles, direct grants and denials into one [`PermissionSet`].
#[async_trait]
pub trait PermissionSetProvider: Send + Sync {
    async fn permission_set_for(&self, user_id: UserId) -> Result<PermissionSet, DirectoryError>;
}
