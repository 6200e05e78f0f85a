use std::collections::BTreeSet;

use async_trait::async_trait;
use sqlx::Row;

use orderdesk_core::domain::ids::UserId;
use orderdesk_core::{DirectoryError, PermissionSet, PermissionSetProvider};

use super::RepositoryError;
use crate::DbPool;

/// Builds a user's [`PermissionSet`] from role grants plus per-user
/// overrides. A direct denial removes a token even when a role grants it.
pub struct SqlPermissionSetProvider {
    pool: DbPool,
}

impl SqlPermissionSetProvider {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub async fn load_tokens(&self, user_id: UserId) -> Result<BTreeSet<String>, RepositoryError> {
        let role_rows = sqlx::query(
            "SELECT DISTINCT rp.permission
             FROM user_roles ur
             JOIN role_permissions rp ON rp.role_id = ur.role_id
             WHERE ur.user_id = ?",
        )
        .bind(user_id.0)
        .fetch_all(&self.pool)
        .await?;

        let override_rows =
            sqlx::query("SELECT permission, granted FROM user_permissions WHERE user_id = ?")
                .bind(user_id.0)
                .fetch_all(&self.pool)
                .await?;

        let mut tokens = BTreeSet::new();
        for row in &role_rows {
            tokens.insert(row.try_get::<String, _>("permission")?);
        }

        let mut denied = Vec::new();
        for row in &override_rows {
            let permission: String = row.try_get("permission")?;
            if row.try_get::<i64, _>("granted")? == 1 {
                tokens.insert(permission);
            } else {
                denied.push(permission);
            }
        }
        for permission in &denied {
            tokens.remove(permission);
        }

        Ok(tokens)
    }
}

#[async_trait]
impl PermissionSetProvider for SqlPermissionSetProvider {
    async fn permission_set_for(&self, user_id: UserId) -> Result<PermissionSet, DirectoryError> {
        let tokens = self.load_tokens(user_id).await?;
        tracing::debug!(
            event_name = "access.permission_set.loaded",
            user_id = user_id.0,
            tokens = tokens.len(),
            "permission set aggregated"
        );
        Ok(PermissionSet::from_tokens(tokens.iter().map(String::as_str)))
    }
}

#[cfg(test)]
mod tests {
    use orderdesk_core::config::DatabaseConfig;
    use orderdesk_core::domain::ids::UserId;
    use orderdesk_core::{Action, Permission, PermissionSetProvider, Resource, Scope};

    use super::SqlPermissionSetProvider;
    use crate::{connect, migrations, seed_demo_org, DbPool};

    async fn seeded_pool() -> DbPool {
        let pool = connect(&DatabaseConfig::in_memory()).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrate");
        seed_demo_org(&pool).await.expect("seed demo org");
        pool
    }

    #[tokio::test]
    async fn role_tokens_merge_with_direct_grants_and_denials() {
        let provider = SqlPermissionSetProvider::new(seeded_pool().await);

        let tokens = provider.load_tokens(UserId(111)).await.expect("tokens");
        let tokens: Vec<&str> = tokens.iter().map(String::as_str).collect();

        assert_eq!(tokens, vec!["orders:create", "orders:update", "orders:view", "scope:own"]);
    }

    #[tokio::test]
    async fn aggregated_set_is_typed() {
        let provider = SqlPermissionSetProvider::new(seeded_pool().await);

        let set = provider.permission_set_for(UserId(111)).await.expect("permission set");

        assert!(!set.is_superuser());
        assert!(set.contains(&Permission::new(Resource::Orders, Action::Update)));
        assert!(!set.contains(&Permission::new(Resource::Statuses, Action::View)));
        assert!(set.has_scope(Scope::Own));
        assert!(!set.has_scope(Scope::All));
    }

    #[tokio::test]
    async fn user_without_roles_gets_empty_set() {
        let provider = SqlPermissionSetProvider::new(seeded_pool().await);

        let set = provider.permission_set_for(UserId(102)).await.expect("permission set");

        assert!(set.tokens().is_empty());
    }

    #[tokio::test]
    async fn superuser_token_survives_aggregation() {
        let pool = seeded_pool().await;
        sqlx::query(
            "INSERT INTO user_permissions (user_id, permission, granted) VALUES (101, 'superuser', 1)",
        )
        .execute(&pool)
        .await
        .expect("grant superuser");
        let provider = SqlPermissionSetProvider::new(pool);

        let set = provider.permission_set_for(UserId(101)).await.expect("permission set");

        assert!(set.is_superuser());
    }
}
