use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

const SUPERUSER_TOKEN: &str = "superuser";
const SCOPE_PREFIX: &str = "scope";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resource {
    Orders,
    Users,
    Roles,
    Permissions,
    Statuses,
    Priorities,
    Departments,
    Otdels,
    Branches,
    Offices,
    Equipments,
    EquipmentTypes,
    Positions,
    Catalogs,
    Structure,
}

impl Resource {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Orders => "orders",
            Self::Users => "users",
            Self::Roles => "roles",
            Self::Permissions => "permissions",
            Self::Statuses => "statuses",
            Self::Priorities => "priorities",
            Self::Departments => "departments",
            Self::Otdels => "otdels",
            Self::Branches => "branches",
            Self::Offices => "offices",
            Self::Equipments => "equipments",
            Self::EquipmentTypes => "equipment_types",
            Self::Positions => "positions",
            Self::Catalogs => "catalogs",
            Self::Structure => "structure",
        }
    }

    /// Reference rows carry no creator/executor ownership.
    pub fn is_simple(self) -> bool {
        !matches!(self, Self::Orders | Self::Users)
    }
}

impl FromStr for Resource {
    type Err = PermissionParseError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "orders" => Ok(Self::Orders),
            "users" => Ok(Self::Users),
            "roles" => Ok(Self::Roles),
            "permissions" => Ok(Self::Permissions),
            "statuses" => Ok(Self::Statuses),
            "priorities" => Ok(Self::Priorities),
            "departments" => Ok(Self::Departments),
            "otdels" => Ok(Self::Otdels),
            "branches" => Ok(Self::Branches),
            "offices" => Ok(Self::Offices),
            "equipments" => Ok(Self::Equipments),
            "equipment_types" => Ok(Self::EquipmentTypes),
            "positions" => Ok(Self::Positions),
            "catalogs" => Ok(Self::Catalogs),
            "structure" => Ok(Self::Structure),
            other => Err(PermissionParseError::UnknownResource(other.to_string())),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    View,
    Create,
    Update,
    Delete,
}

impl Action {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::View => "view",
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }
}

impl FromStr for Action {
    type Err = PermissionParseError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "view" => Ok(Self::View),
            "create" => Ok(Self::Create),
            "update" => Ok(Self::Update),
            "delete" => Ok(Self::Delete),
            other => Err(PermissionParseError::UnknownAction(other.to_string())),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scope {
    Own,
    Department,
    Otdel,
    Branch,
    Office,
    All,
}

impl Scope {
    /// Scopes narrower than `All`, any of which admits a collection read.
    pub const NARROW: [Scope; 5] =
        [Scope::Own, Scope::Department, Scope::Otdel, Scope::Branch, Scope::Office];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Own => "own",
            Self::Department => "department",
            Self::Otdel => "otdel",
            Self::Branch => "branch",
            Self::Office => "office",
            Self::All => "all",
        }
    }

    pub fn token(self) -> String {
        format!("{SCOPE_PREFIX}:{}", self.as_str())
    }
}

impl FromStr for Scope {
    type Err = PermissionParseError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let Some(name) = value.strip_prefix(SCOPE_PREFIX).and_then(|rest| rest.strip_prefix(':'))
        else {
            return Err(PermissionParseError::UnknownScope(value.to_string()));
        };
        match name {
            "own" => Ok(Self::Own),
            "department" => Ok(Self::Department),
            "otdel" => Ok(Self::Otdel),
            "branch" => Ok(Self::Branch),
            "office" => Ok(Self::Office),
            "all" => Ok(Self::All),
            other => Err(PermissionParseError::UnknownScope(other.to_string())),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum PermissionParseError {
    #[error("permission token `{0}` must look like `<resource>:<action>[:<field>]`")]
    Malformed(String),
    #[error("unknown permission resource `{0}`")]
    UnknownResource(String),
    #[error("unknown permission action `{0}`")]
    UnknownAction(String),
    #[error("unknown scope `{0}`")]
    UnknownScope(String),
}

/// A `<resource>:<action>[:<field>]` grant.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Permission {
    pub resource: Resource,
    pub action: Action,
    pub field: Option<String>,
}

impl Permission {
    pub fn new(resource: Resource, action: Action) -> Self {
        Self { resource, action, field: None }
    }

    pub fn on_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.resource.as_str(), self.action.as_str())?;
        if let Some(field) = &self.field {
            write!(f, ":{field}")?;
        }
        Ok(())
    }
}

impl FromStr for Permission {
    type Err = PermissionParseError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        let mut segments = trimmed.split(':');
        let (Some(resource), Some(action)) = (segments.next(), segments.next()) else {
            return Err(PermissionParseError::Malformed(value.to_string()));
        };
        let field = segments.next().map(str::to_string);
        if segments.next().is_some() || field.as_deref() == Some("") {
            return Err(PermissionParseError::Malformed(value.to_string()));
        }

        Ok(Self { resource: resource.parse()?, action: action.parse()?, field })
    }
}

/// Effective grants of one actor for one request.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PermissionSet {
    superuser: bool,
    permissions: HashSet<Permission>,
    scopes: HashSet<Scope>,
}

impl PermissionSet {
    pub fn superuser() -> Self {
        Self { superuser: true, ..Self::default() }
    }

    /// Builds a set from raw tokens; unrecognised tokens are skipped.
    pub fn from_tokens<I, S>(tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut set = Self::default();
        for token in tokens {
            let token = token.as_ref().trim();
            if let Err(error) = set.insert_token(token) {
                tracing::warn!(
                    event_name = "access.permission_set.token_skipped",
                    token,
                    error = %error,
                    "skipping unrecognised permission token"
                );
            }
        }
        set
    }

    pub fn insert_token(&mut self, token: &str) -> Result<(), PermissionParseError> {
        if token == SUPERUSER_TOKEN {
            self.superuser = true;
        } else if token.starts_with("scope:") {
            self.scopes.insert(token.parse()?);
        } else {
            self.permissions.insert(token.parse()?);
        }
        Ok(())
    }

    pub fn grant(mut self, permission: Permission) -> Self {
        self.permissions.insert(permission);
        self
    }

    pub fn with_scope(mut self, scope: Scope) -> Self {
        self.scopes.insert(scope);
        self
    }

    pub fn is_superuser(&self) -> bool {
        self.superuser
    }

    pub fn contains(&self, permission: &Permission) -> bool {
        self.permissions.contains(permission)
    }

    pub fn has_scope(&self, scope: Scope) -> bool {
        self.scopes.contains(&scope)
    }

    pub fn has_any_scope(&self, scopes: &[Scope]) -> bool {
        scopes.iter().any(|scope| self.scopes.contains(scope))
    }

    /// Canonical token form, sorted.
    pub fn tokens(&self) -> Vec<String> {
        let mut tokens: Vec<String> = self
            .permissions
            .iter()
            .map(ToString::to_string)
            .chain(self.scopes.iter().map(|scope| scope.token()))
            .collect();
        if self.superuser {
            tokens.push(SUPERUSER_TOKEN.to_string());
        }
        tokens.sort();
        tokens
    }
}

#[cfg(test)]
mod tests {
    use super::{Action, Permission, PermissionParseError, PermissionSet, Resource, Scope};

    #[test]
    fn parses_field_level_permission() {
        let permission: Permission = "orders:update:status".parse().expect("valid token");

        assert_eq!(permission.resource, Resource::Orders);
        assert_eq!(permission.action, Action::Update);
        assert_eq!(permission.field.as_deref(), Some("status"));
        assert_eq!(permission.to_string(), "orders:update:status");
    }

    #[test]
    fn rejects_tokens_without_action() {
        assert_eq!(
            "orders".parse::<Permission>(),
            Err(PermissionParseError::Malformed("orders".to_string()))
        );
        assert!("orders:update:status:extra".parse::<Permission>().is_err());
    }

    #[test]
    fn rejects_unknown_resource_and_action() {
        assert_eq!(
            "invoices:view".parse::<Permission>(),
            Err(PermissionParseError::UnknownResource("invoices".to_string()))
        );
        assert_eq!(
            "orders:approve".parse::<Permission>(),
            Err(PermissionParseError::UnknownAction("approve".to_string()))
        );
    }

    #[test]
    fn equipment_types_is_a_simple_resource() {
        let permission: Permission = "equipment_types:delete".parse().expect("valid token");
        assert!(permission.resource.is_simple());
        assert!(!Resource::Users.is_simple());
    }

    #[test]
    fn token_set_separates_scopes_permissions_and_superuser() {
        let set = PermissionSet::from_tokens([
            "orders:view",
            "scope:department",
            "scope:own",
            "not-a-permission",
            "superuser",
        ]);

        assert!(set.is_superuser());
        assert!(set.contains(&Permission::new(Resource::Orders, Action::View)));
        assert!(set.has_scope(Scope::Department));
        assert!(set.has_scope(Scope::Own));
        assert!(!set.has_scope(Scope::All));
        assert_eq!(
            set.tokens(),
            vec!["orders:view", "scope:department", "scope:own", "superuser"]
        );
    }

    #[test]
    fn unknown_scope_token_is_skipped() {
        let set = PermissionSet::from_tokens(["scope:galaxy"]);
        assert!(!set.has_any_scope(&Scope::NARROW));
        assert!(set.tokens().is_empty());
    }

    #[test]
    fn scope_parsing_requires_prefixed_token() {
        assert_eq!("scope:own".parse::<Scope>(), Ok(Scope::Own));
        assert_eq!("scope:all".parse::<Scope>(), Ok(Scope::All));
        assert_eq!(
            "own".parse::<Scope>(),
            Err(PermissionParseError::UnknownScope("own".to_string()))
        );
        assert!("scopeown".parse::<Scope>().is_err());

        for scope in Scope::NARROW {
            assert_eq!(scope.token().parse::<Scope>(), Ok(scope));
        }
    }
}
