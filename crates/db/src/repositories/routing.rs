use async_trait::async_trait;
use sqlx::sqlite::SqliteRow;
use sqlx::{QueryBuilder, Row, Sqlite, SqliteConnection};

use orderdesk_core::domain::ids::{
    BranchId, DepartmentId, OfficeId, OrderTypeId, OtdelId, PositionId, RuleId, StatusId, UserId,
};
use orderdesk_core::routing::{HierarchyQuery, OrgPredicate};
use orderdesk_core::{
    Actor, DirectoryError, OrderRoutingContext, OrderRoutingRule, PositionType, RoutingDirectory,
};

use super::RepositoryError;

const ACTOR_SELECT: &str = "SELECT u.id, u.department_id, u.otdel_id, u.branch_id, u.office_id,
        u.position_id, p.position_type
 FROM users u
 LEFT JOIN positions p ON p.id = u.position_id";

const RULE_SELECT: &str = "SELECT id, order_type_id, department_id, otdel_id, branch_id, office_id,
        assign_to_position_id, status_id
 FROM order_routing_rules";

// Mirrors the in-process tie-break: OrderType, Otdel, Office, Department, Branch.
const RULE_PRECEDENCE_ORDER: &str = " ORDER BY order_type_id IS NULL, otdel_id IS NULL,
    office_id IS NULL, department_id IS NULL, branch_id IS NULL, id";

/// Routing reads bound to one connection, typically the caller's open
/// transaction (`SqlRoutingDirectory::new(&mut *tx)`).
pub struct SqlRoutingDirectory<'c> {
    conn: &'c mut SqliteConnection,
}

impl<'c> SqlRoutingDirectory<'c> {
    pub fn new(conn: &'c mut SqliteConnection) -> Self {
        Self { conn }
    }

    pub async fn load_active_user(
        &mut self,
        user_id: UserId,
    ) -> Result<Option<Actor>, RepositoryError> {
        let row = sqlx::query(&format!("{ACTOR_SELECT} WHERE u.id = ? AND u.deleted_at IS NULL"))
            .bind(user_id.0)
            .fetch_optional(&mut *self.conn)
            .await?;

        row.as_ref().map(row_to_actor).transpose()
    }

    pub async fn load_matching_rules(
        &mut self,
        ctx: &OrderRoutingContext,
    ) -> Result<Vec<OrderRoutingRule>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "{RULE_SELECT}
             WHERE (order_type_id IS NULL OR order_type_id = ?)
               AND (department_id IS NULL OR department_id = ?)
               AND (otdel_id IS NULL OR otdel_id = ?)
               AND (branch_id IS NULL OR branch_id = ?)
               AND (office_id IS NULL OR office_id = ?)
             {RULE_PRECEDENCE_ORDER}"
        ))
        .bind(ctx.order_type_id.0)
        .bind(ctx.department_id.map(|id| id.0))
        .bind(ctx.otdel_id.map(|id| id.0))
        .bind(ctx.branch_id.map(|id| id.0))
        .bind(ctx.office_id.map(|id| id.0))
        .fetch_all(&mut *self.conn)
        .await?;

        rows.iter().map(row_to_rule).collect()
    }

    pub async fn load_rules_for_order_type(
        &mut self,
        order_type_id: OrderTypeId,
    ) -> Result<Vec<OrderRoutingRule>, RepositoryError> {
        let rows =
            sqlx::query(&format!("{RULE_SELECT} WHERE order_type_id = ? {RULE_PRECEDENCE_ORDER}"))
                .bind(order_type_id.0)
                .fetch_all(&mut *self.conn)
                .await?;

        rows.iter().map(row_to_rule).collect()
    }

    pub async fn load_position_holders(
        &mut self,
        position_id: PositionId,
    ) -> Result<Vec<Actor>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "{ACTOR_SELECT} WHERE u.position_id = ? AND u.deleted_at IS NULL ORDER BY u.id"
        ))
        .bind(position_id.0)
        .fetch_all(&mut *self.conn)
        .await?;

        rows.iter().map(row_to_actor).collect()
    }

    pub async fn search_hierarchy(
        &mut self,
        query: &HierarchyQuery,
    ) -> Result<Option<Actor>, RepositoryError> {
        let mut builder = QueryBuilder::<Sqlite>::new(ACTOR_SELECT);
        builder.push(" WHERE u.deleted_at IS NULL AND p.position_type = ");
        builder.push_bind(query.position_type.as_str());

        for predicate in &query.predicates {
            match *predicate {
                OrgPredicate::Department(id) => {
                    builder.push(" AND u.department_id = ");
                    builder.push_bind(id.0);
                }
                OrgPredicate::Otdel(id) => {
                    builder.push(" AND u.otdel_id = ");
                    builder.push_bind(id.0);
                }
                OrgPredicate::Branch(id) => {
                    builder.push(" AND u.branch_id = ");
                    builder.push_bind(id.0);
                }
                OrgPredicate::Office(id) => {
                    builder.push(" AND u.office_id = ");
                    builder.push_bind(id.0);
                }
            }
        }
        builder.push(" ORDER BY u.id LIMIT 1");

        let row = builder.build().fetch_optional(&mut *self.conn).await?;
        row.as_ref().map(row_to_actor).transpose()
    }
}

#[async_trait]
impl<'c> RoutingDirectory for SqlRoutingDirectory<'c> {
    async fn find_active_user(&mut self, user_id: UserId) -> Result<Option<Actor>, DirectoryError> {
        Ok(self.load_active_user(user_id).await?)
    }

    async fn matching_rules(
        &mut self,
        ctx: &OrderRoutingContext,
    ) -> Result<Vec<OrderRoutingRule>, DirectoryError> {
        Ok(self.load_matching_rules(ctx).await?)
    }

    async fn rules_for_order_type(
        &mut self,
        order_type_id: OrderTypeId,
    ) -> Result<Vec<OrderRoutingRule>, DirectoryError> {
        Ok(self.load_rules_for_order_type(order_type_id).await?)
    }

    async fn position_holders(
        &mut self,
        position_id: PositionId,
    ) -> Result<Vec<Actor>, DirectoryError> {
        Ok(self.load_position_holders(position_id).await?)
    }

    async fn find_by_hierarchy(
        &mut self,
        query: &HierarchyQuery,
    ) -> Result<Option<Actor>, DirectoryError> {
        Ok(self.search_hierarchy(query).await?)
    }
}

fn decode<'r, T>(row: &'r SqliteRow, column: &str) -> Result<T, RepositoryError>
where
    T: sqlx::Decode<'r, Sqlite> + sqlx::Type<Sqlite>,
{
    row.try_get(column).map_err(|e| RepositoryError::Decode(e.to_string()))
}

fn row_to_actor(row: &SqliteRow) -> Result<Actor, RepositoryError> {
    let position_type: Option<String> = decode(row, "position_type")?;
    let position_type = position_type
        .map(|raw| raw.parse::<PositionType>())
        .transpose()
        .map_err(|e| RepositoryError::Decode(e.to_string()))?;

    Ok(Actor {
        id: UserId(decode(row, "id")?),
        department_id: DepartmentId(decode(row, "department_id")?),
        otdel_id: decode::<Option<i64>>(row, "otdel_id")?.map(OtdelId),
        branch_id: decode::<Option<i64>>(row, "branch_id")?.map(BranchId),
        office_id: decode::<Option<i64>>(row, "office_id")?.map(OfficeId),
        position_id: decode::<Option<i64>>(row, "position_id")?.map(PositionId),
        is_head: position_type.map_or(false, PositionType::is_head),
    })
}

fn row_to_rule(row: &SqliteRow) -> Result<OrderRoutingRule, RepositoryError> {
    Ok(OrderRoutingRule {
        id: RuleId(decode(row, "id")?),
        order_type_id: decode::<Option<i64>>(row, "order_type_id")?.map(OrderTypeId),
        department_id: decode::<Option<i64>>(row, "department_id")?.map(DepartmentId),
        otdel_id: decode::<Option<i64>>(row, "otdel_id")?.map(OtdelId),
        branch_id: decode::<Option<i64>>(row, "branch_id")?.map(BranchId),
        office_id: decode::<Option<i64>>(row, "office_id")?.map(OfficeId),
        assign_to_position_id: PositionId(decode(row, "assign_to_position_id")?),
        status_id: StatusId(decode(row, "status_id")?),
    })
}
