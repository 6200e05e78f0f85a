pub mod access;
pub mod config;
pub mod directory;
pub mod domain;
pub mod errors;
pub mod routing;

pub use access::{
    authorize, can_do, AccessDenied, Action, AuthzContext, OrderTarget, Permission,
    PermissionParseError, PermissionSet, Resource, Scope, Target, UserTarget,
};
pub use directory::{DirectoryError, PermissionSetProvider, RoutingDirectory};
pub use domain::org::{Actor, OrgLevel, Position, PositionType};
pub use domain::order::{OrderRoutingContext, OrderRoutingRule};
pub use errors::{ApplicationError, DomainError, InterfaceError};
pub use routing::{PredefinedRoute, RoutingEngine, RoutingError, RoutingResult};
