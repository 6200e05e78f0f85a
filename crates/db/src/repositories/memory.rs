use std::collections::HashMap;

use tokio::sync::RwLock;

use orderdesk_core::domain::ids::{OrderTypeId, PositionId, UserId};
use orderdesk_core::routing::HierarchyQuery;
use orderdesk_core::{
    Actor, DirectoryError, OrderRoutingContext, OrderRoutingRule, PermissionSet,
    PermissionSetProvider, PositionType, RoutingDirectory,
};

#[derive(Clone, Debug)]
struct DirectoryEntry {
    actor: Actor,
    position_type: Option<PositionType>,
    active: bool,
}

/// Process-local directory with the same visibility rules as the SQL one:
/// deactivated users are never returned.
#[derive(Clone, Debug, Default)]
pub struct InMemoryRoutingDirectory {
    users: Vec<DirectoryEntry>,
    rules: Vec<OrderRoutingRule>,
}

impl InMemoryRoutingDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_user(mut self, actor: Actor, position_type: Option<PositionType>) -> Self {
        self.users.push(DirectoryEntry { actor, position_type, active: true });
        self
    }

    pub fn with_rule(mut self, rule: OrderRoutingRule) -> Self {
        self.rules.push(rule);
        self
    }

    pub fn deactivate(&mut self, user_id: UserId) {
        for entry in self.users.iter_mut().filter(|entry| entry.actor.id == user_id) {
            entry.active = false;
        }
    }

    fn active(&self) -> impl Iterator<Item = &DirectoryEntry> {
        self.users.iter().filter(|entry| entry.active)
    }
}

#[async_trait::async_trait]
impl RoutingDirectory for InMemoryRoutingDirectory {
    async fn find_active_user(&mut self, user_id: UserId) -> Result<Option<Actor>, DirectoryError> {
        Ok(self.active().find(|entry| entry.actor.id == user_id).map(|entry| entry.actor.clone()))
    }

    async fn matching_rules(
        &mut self,
        ctx: &OrderRoutingContext,
    ) -> Result<Vec<OrderRoutingRule>, DirectoryError> {
        Ok(self.rules.iter().filter(|rule| rule.matches(ctx)).cloned().collect())
    }

    async fn rules_for_order_type(
        &mut self,
        order_type_id: OrderTypeId,
    ) -> Result<Vec<OrderRoutingRule>, DirectoryError> {
        Ok(self
            .rules
            .iter()
            .filter(|rule| rule.order_type_id == Some(order_type_id))
            .cloned()
            .collect())
    }

    async fn position_holders(
        &mut self,
        position_id: PositionId,
    ) -> Result<Vec<Actor>, DirectoryError> {
        let mut holders: Vec<Actor> = self
            .active()
            .filter(|entry| entry.actor.position_id == Some(position_id))
            .map(|entry| entry.actor.clone())
            .collect();
        holders.sort_by_key(|actor| actor.id);
        Ok(holders)
    }

    async fn find_by_hierarchy(
        &mut self,
        query: &HierarchyQuery,
    ) -> Result<Option<Actor>, DirectoryError> {
        Ok(self
            .active()
            .filter(|entry| {
                entry
                    .position_type
                    .map_or(false, |position_type| query.accepts(&entry.actor, position_type))
            })
            .map(|entry| entry.actor.clone())
            .min_by_key(|actor| actor.id))
    }
}

#[derive(Default)]
pub struct InMemoryPermissionSetProvider {
    sets: RwLock<HashMap<UserId, PermissionSet>>,
}

impl InMemoryPermissionSetProvider {
    pub async fn insert(&self, user_id: UserId, permissions: PermissionSet) {
        let mut sets = self.sets.write().await;
        sets.insert(user_id, permissions);
    }
}

#[async_trait::async_trait]
impl PermissionSetProvider for InMemoryPermissionSetProvider {
    async fn permission_set_for(&self, user_id: UserId) -> Result<PermissionSet, DirectoryError> {
        let sets = self.sets.read().await;
        Ok(sets.get(&user_id).cloned().unwrap_or_default())
    }
}
