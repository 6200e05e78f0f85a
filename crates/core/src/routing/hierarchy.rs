use serde::{Deserialize, Serialize};

use crate::directory::RoutingDirectory;
use crate::domain::ids::{BranchId, DepartmentId, OfficeId, OtdelId};
use crate::domain::order::OrderRoutingContext;
use crate::domain::org::{Actor, OrgLevel, PositionType};
use crate::routing::RoutingError;

/// Optional equality filter on a holder's org unit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "unit", content = "id", rename_all = "snake_case")]
pub enum OrgPredicate {
    Department(DepartmentId),
    Otdel(OtdelId),
    Branch(BranchId),
    Office(OfficeId),
}

impl OrgPredicate {
    pub fn accepts(&self, actor: &Actor) -> bool {
        match *self {
            Self::Department(id) => actor.department_id == id,
            Self::Otdel(id) => actor.otdel_id == Some(id),
            Self::Branch(id) => actor.branch_id == Some(id),
            Self::Office(id) => actor.office_id == Some(id),
        }
    }
}

/// Position-holder search used when no routing rule matched.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HierarchyQuery {
    pub position_type: PositionType,
    pub predicates: Vec<OrgPredicate>,
}

impl HierarchyQuery {
    pub fn for_context(ctx: &OrderRoutingContext) -> Result<Self, RoutingError> {
        let position_type = target_position_type(ctx)?;
        let level = position_type.org_level();
        let mut predicates = Vec::new();

        if let (Some(OrgLevel::Department), Some(id)) = (level, ctx.department_id) {
            predicates.push(OrgPredicate::Department(id));
        }
        if let (Some(OrgLevel::Otdel), Some(id)) = (level, ctx.otdel_id) {
            predicates.push(OrgPredicate::Otdel(id));
        }
        // Department heads are found by department alone.
        if let Some(id) = ctx.branch_id {
            if level != Some(OrgLevel::Department) {
                predicates.push(OrgPredicate::Branch(id));
            }
        }
        if let (Some(OrgLevel::Office), Some(id)) = (level, ctx.office_id) {
            predicates.push(OrgPredicate::Office(id));
        }

        Ok(Self { position_type, predicates })
    }

    pub fn accepts(&self, actor: &Actor, position_type: PositionType) -> bool {
        position_type == self.position_type
            && self.predicates.iter().all(|predicate| predicate.accepts(actor))
    }
}

/// The first org unit present on the order decides whose head is responsible.
pub fn target_position_type(ctx: &OrderRoutingContext) -> Result<PositionType, RoutingError> {
    if ctx.department_id.is_some() {
        Ok(PositionType::HeadOfDepartment)
    } else if ctx.otdel_id.is_some() {
        Ok(PositionType::ManagerOfOtdel)
    } else if ctx.branch_id.is_some() {
        Ok(PositionType::BranchDirector)
    } else if ctx.office_id.is_some() {
        Ok(PositionType::HeadOfOffice)
    } else {
        Err(RoutingError::NoOrganizationalUnit)
    }
}

pub async fn resolve_by_hierarchy<D>(
    directory: &mut D,
    ctx: &OrderRoutingContext,
) -> Result<Actor, RoutingError>
where
    D: RoutingDirectory + ?Sized,
{
    let query = HierarchyQuery::for_context(ctx)?;
    tracing::debug!(
        event_name = "routing.hierarchy.query",
        position_type = %query.position_type,
        predicates = query.predicates.len(),
        "searching position holder by hierarchy"
    );

    directory
        .find_by_hierarchy(&query)
        .await?
        .ok_or(RoutingError::NoHolderForPositionType { position_type: query.position_type })
}

#[cfg(test)]
mod tests {
    use crate::domain::ids::{BranchId, DepartmentId, OfficeId, OrderTypeId, OtdelId};
    use crate::domain::order::OrderRoutingContext;
    use crate::domain::org::PositionType;
    use crate::routing::RoutingError;

    use super::{target_position_type, HierarchyQuery, OrgPredicate};

    fn ctx() -> OrderRoutingContext {
        OrderRoutingContext::new(OrderTypeId(1))
    }

    #[test]
    fn department_wins_over_otdel() {
        let ctx = ctx().with_department(DepartmentId(9)).with_otdel(OtdelId(90));
        assert_eq!(target_position_type(&ctx), Ok(PositionType::HeadOfDepartment));
    }

    #[test]
    fn precedence_walks_down_the_units() {
        assert_eq!(
            target_position_type(&ctx().with_otdel(OtdelId(1)).with_branch(BranchId(2))),
            Ok(PositionType::ManagerOfOtdel)
        );
        assert_eq!(
            target_position_type(&ctx().with_branch(BranchId(2)).with_office(OfficeId(3))),
            Ok(PositionType::BranchDirector)
        );
        assert_eq!(
            target_position_type(&ctx().with_office(OfficeId(3))),
            Ok(PositionType::HeadOfOffice)
        );
    }

    #[test]
    fn no_unit_is_a_bad_request() {
        assert_eq!(target_position_type(&ctx()), Err(RoutingError::NoOrganizationalUnit));
        assert!(HierarchyQuery::for_context(&ctx()).is_err());
    }

    #[test]
    fn department_head_is_not_filtered_by_branch() {
        let query = HierarchyQuery::for_context(
            &ctx().with_department(DepartmentId(9)).with_branch(BranchId(2)),
        )
        .expect("department selected");

        assert_eq!(query.position_type, PositionType::HeadOfDepartment);
        assert_eq!(query.predicates, vec![OrgPredicate::Department(DepartmentId(9))]);
    }

    #[test]
    fn otdel_manager_is_narrowed_by_branch_when_present() {
        let query =
            HierarchyQuery::for_context(&ctx().with_otdel(OtdelId(4)).with_branch(BranchId(2)))
                .expect("otdel selected");

        assert_eq!(
            query.predicates,
            vec![OrgPredicate::Otdel(OtdelId(4)), OrgPredicate::Branch(BranchId(2))]
        );
    }

    #[test]
    fn office_head_uses_office_filter() {
        let query = HierarchyQuery::for_context(&ctx().with_office(OfficeId(3)))
            .expect("office selected");

        assert_eq!(query.position_type, PositionType::HeadOfOffice);
        assert_eq!(query.predicates, vec![OrgPredicate::Office(OfficeId(3))]);
    }
}
