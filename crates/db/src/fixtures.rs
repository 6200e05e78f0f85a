use chrono::Utc;
use sqlx::{Sqlite, Transaction};

use crate::connection::DbPool;
use crate::repositories::RepositoryError;

/// Demo org: four departments (Logistics has no head), one otdel per
/// IT/Finance, one branch with one office, and a specialist pool in IT.
const DEMO_ORG_SQL: &str = "
INSERT INTO departments (id, name) VALUES
    (10, 'IT'), (20, 'Finance'), (30, 'Logistics'), (40, 'Regions');
INSERT INTO otdels (id, name, department_id) VALUES
    (100, 'Service Desk', 10), (200, 'Accounting', 20);
INSERT INTO branches (id, name) VALUES (5, 'North Branch');
INSERT INTO offices (id, name, branch_id) VALUES (7, 'Harbor Office', 5);
INSERT INTO positions (id, name, position_type, department_id, otdel_id, branch_id, office_id) VALUES
    (1, 'Head of IT', 'HEAD_OF_DEPARTMENT', 10, NULL, NULL, NULL),
    (2, 'Head of Finance', 'HEAD_OF_DEPARTMENT', 20, NULL, NULL, NULL),
    (3, 'Service Desk Manager', 'MANAGER_OF_OTDEL', 10, 100, NULL, NULL),
    (4, 'North Branch Director', 'BRANCH_DIRECTOR', 40, NULL, 5, NULL),
    (5, 'Harbor Office Head', 'HEAD_OF_OFFICE', 40, NULL, 5, 7),
    (11, 'IT Specialist', 'SPECIALIST', 10, NULL, NULL, NULL),
    (22, 'Service Desk Specialist', 'SPECIALIST', 10, 100, NULL, NULL);
INSERT INTO users (id, fio, department_id, otdel_id, branch_id, office_id, position_id) VALUES
    (101, 'Irina Head', 10, NULL, NULL, NULL, 1),
    (102, 'Fedor Head', 20, NULL, NULL, NULL, 2),
    (103, 'Sergei Manager', 10, 100, NULL, NULL, 3),
    (104, 'Nadia Director', 40, NULL, 5, NULL, 4),
    (105, 'Oleg Office', 40, NULL, 5, 7, 5),
    (111, 'Ivan Specialist', 10, NULL, NULL, NULL, 11),
    (112, 'Daria Specialist', 10, 100, NULL, NULL, 22),
    (113, 'Pavel Specialist', 10, 100, NULL, NULL, 22);
INSERT INTO order_routing_rules
    (id, order_type_id, department_id, otdel_id, branch_id, office_id, assign_to_position_id, status_id)
VALUES
    (1, 3, NULL, NULL, NULL, NULL, 11, 1),
    (2, 3, 10, NULL, NULL, NULL, 22, 2),
    (3, 4, NULL, 100, NULL, NULL, 22, 2);
INSERT INTO roles (id, name) VALUES (1, 'operator');
INSERT INTO role_permissions (role_id, permission) VALUES
    (1, 'orders:view'), (1, 'orders:create'), (1, 'scope:own'), (1, 'statuses:view');
INSERT INTO user_roles (user_id, role_id) VALUES (111, 1);
INSERT INTO user_permissions (user_id, permission, granted) VALUES
    (111, 'orders:update', 1), (111, 'statuses:view', 0);
";

const DEMO_TABLES: &[&str] = &[
    "user_permissions",
    "user_roles",
    "role_permissions",
    "roles",
    "order_routing_rules",
    "users",
    "positions",
    "offices",
    "branches",
    "otdels",
    "departments",
];

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SeedSummary {
    pub departments: i64,
    pub users: i64,
    pub active_users: i64,
    pub routing_rules: i64,
}

/// Loads the demo org into an empty schema. Re-running replaces the data.
pub async fn seed_demo_org(pool: &DbPool) -> Result<SeedSummary, RepositoryError> {
    let mut tx = pool.begin().await?;

    clear(&mut tx).await?;
    sqlx::raw_sql(DEMO_ORG_SQL).execute(&mut *tx).await?;
    sqlx::query("UPDATE users SET deleted_at = ? WHERE id = 113")
        .bind(Utc::now().to_rfc3339())
        .execute(&mut *tx)
        .await?;

    let summary = summarize(&mut tx).await?;
    tx.commit().await?;

    tracing::info!(
        event_name = "db.seed.demo_org",
        departments = summary.departments,
        users = summary.users,
        routing_rules = summary.routing_rules,
        "demo org seeded"
    );
    Ok(summary)
}

async fn clear(tx: &mut Transaction<'_, Sqlite>) -> Result<(), RepositoryError> {
    for table in DEMO_TABLES {
        sqlx::query(&format!("DELETE FROM {table}")).execute(&mut **tx).await?;
    }
    Ok(())
}

async fn summarize(tx: &mut Transaction<'_, Sqlite>) -> Result<SeedSummary, RepositoryError> {
    let count = |sql: &'static str| sqlx::query_scalar::<Sqlite, i64>(sql);

    Ok(SeedSummary {
        departments: count("SELECT COUNT(*) FROM departments").fetch_one(&mut **tx).await?,
        users: count("SELECT COUNT(*) FROM users").fetch_one(&mut **tx).await?,
        active_users: count("SELECT COUNT(*) FROM users WHERE deleted_at IS NULL")
            .fetch_one(&mut **tx)
            .await?,
        routing_rules: count("SELECT COUNT(*) FROM order_routing_rules")
            .fetch_one(&mut **tx)
            .await?,
    })
}
