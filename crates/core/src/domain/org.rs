use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::ids::{BranchId, DepartmentId, OfficeId, OtdelId, PositionId, UserId};

/// Organizational tier a position type is responsible for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrgLevel {
    Department,
    Otdel,
    Branch,
    Office,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PositionType {
    HeadOfDepartment,
    DeputyHeadOfDepartment,
    ManagerOfOtdel,
    BranchDirector,
    DeputyBranchDirector,
    HeadOfOffice,
    DeputyHeadOfOffice,
    Specialist,
}

impl PositionType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::HeadOfDepartment => "HEAD_OF_DEPARTMENT",
            Self::DeputyHeadOfDepartment => "DEPUTY_HEAD_OF_DEPARTMENT",
            Self::ManagerOfOtdel => "MANAGER_OF_OTDEL",
            Self::BranchDirector => "BRANCH_DIRECTOR",
            Self::DeputyBranchDirector => "DEPUTY_BRANCH_DIRECTOR",
            Self::HeadOfOffice => "HEAD_OF_OFFICE",
            Self::DeputyHeadOfOffice => "DEPUTY_HEAD_OF_OFFICE",
            Self::Specialist => "SPECIALIST",
        }
    }

    /// `None` for specialists, who are not responsible for a unit.
    pub fn org_level(self) -> Option<OrgLevel> {
        match self {
            Self::HeadOfDepartment | Self::DeputyHeadOfDepartment => Some(OrgLevel::Department),
            Self::ManagerOfOtdel => Some(OrgLevel::Otdel),
            Self::BranchDirector | Self::DeputyBranchDirector => Some(OrgLevel::Branch),
            Self::HeadOfOffice | Self::DeputyHeadOfOffice => Some(OrgLevel::Office),
            Self::Specialist => None,
        }
    }

    /// Head positions admit a single active holder per unit.
    pub fn is_head(self) -> bool {
        matches!(
            self,
            Self::HeadOfDepartment | Self::ManagerOfOtdel | Self::BranchDirector | Self::HeadOfOffice
        )
    }
}

impl fmt::Display for PositionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("unknown position type `{0}`")]
pub struct UnknownPositionType(pub String);

impl FromStr for PositionType {
    type Err = UnknownPositionType;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_uppercase().as_str() {
            "HEAD_OF_DEPARTMENT" => Ok(Self::HeadOfDepartment),
            "DEPUTY_HEAD_OF_DEPARTMENT" => Ok(Self::DeputyHeadOfDepartment),
            "MANAGER_OF_OTDEL" => Ok(Self::ManagerOfOtdel),
            "BRANCH_DIRECTOR" => Ok(Self::BranchDirector),
            "DEPUTY_BRANCH_DIRECTOR" => Ok(Self::DeputyBranchDirector),
            "HEAD_OF_OFFICE" => Ok(Self::HeadOfOffice),
            "DEPUTY_HEAD_OF_OFFICE" => Ok(Self::DeputyHeadOfOffice),
            "SPECIALIST" => Ok(Self::Specialist),
            _ => Err(UnknownPositionType(value.to_string())),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub id: PositionId,
    pub position_type: PositionType,
    pub department_id: Option<DepartmentId>,
    pub otdel_id: Option<OtdelId>,
    pub branch_id: Option<BranchId>,
    pub office_id: Option<OfficeId>,
}

/// An employee as seen by scope comparisons and routing.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: UserId,
    pub department_id: DepartmentId,
    pub branch_id: Option<BranchId>,
    pub otdel_id: Option<OtdelId>,
    pub office_id: Option<OfficeId>,
    pub position_id: Option<PositionId>,
    pub is_head: bool,
}

impl Actor {
    pub fn new(id: UserId, department_id: DepartmentId) -> Self {
        Self {
            id,
            department_id,
            branch_id: None,
            otdel_id: None,
            office_id: None,
            position_id: None,
            is_head: false,
        }
    }
}
