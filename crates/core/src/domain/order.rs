use serde::{Deserialize, Serialize};

use crate::domain::ids::{
    BranchId, DepartmentId, OfficeId, OrderTypeId, OtdelId, PositionId, RuleId, StatusId,
};

/// Organizational attributes of an order that drive executor selection.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderRoutingContext {
    pub order_type_id: OrderTypeId,
    pub department_id: Option<DepartmentId>,
    pub otdel_id: Option<OtdelId>,
    pub branch_id: Option<BranchId>,
    pub office_id: Option<OfficeId>,
}

impl OrderRoutingContext {
    pub fn new(order_type_id: OrderTypeId) -> Self {
        Self { order_type_id, department_id: None, otdel_id: None, branch_id: None, office_id: None }
    }

    pub fn with_department(mut self, department_id: DepartmentId) -> Self {
        self.department_id = Some(department_id);
        self
    }

    pub fn with_otdel(mut self, otdel_id: OtdelId) -> Self {
        self.otdel_id = Some(otdel_id);
        self
    }

    pub fn with_branch(mut self, branch_id: BranchId) -> Self {
        self.branch_id = Some(branch_id);
        self
    }

    pub fn with_office(mut self, office_id: OfficeId) -> Self {
        self.office_id = Some(office_id);
        self
    }
}

/// Wildcard routing pattern; every `None` column matches any order value.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderRoutingRule {
    pub id: RuleId,
    pub order_type_id: Option<OrderTypeId>,
    pub department_id: Option<DepartmentId>,
    pub otdel_id: Option<OtdelId>,
    pub branch_id: Option<BranchId>,
    pub office_id: Option<OfficeId>,
    pub assign_to_position_id: PositionId,
    pub status_id: StatusId,
}
