use thiserror::Error;

use crate::access::AccessDenied;
use crate::routing::RoutingError;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error(transparent)]
    Forbidden(#[from] AccessDenied),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ApplicationError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error("persistence failure: {0}")]
    Persistence(String),
    #[error("configuration failure: {0}")]
    Configuration(String),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum InterfaceError {
    #[error("bad request: {message}")]
    BadRequest { message: String, correlation_id: String },
    #[error("not found: {message}")]
    NotFound { message: String, correlation_id: String },
    #[error("forbidden")]
    Forbidden { correlation_id: String },
    #[error("internal error: {message}")]
    Internal { message: String, correlation_id: String },
}

impl InterfaceError {
    pub fn user_message(&self) -> String {
        match self {
            Self::BadRequest { message, .. } | Self::NotFound { message, .. } => message.clone(),
            Self::Forbidden { .. } => "You do not have permission to perform this action.".to_owned(),
            Self::Internal { .. } => "An unexpected internal error occurred.".to_owned(),
        }
    }

    pub fn correlation_id(&self) -> &str {
        match self {
            Self::BadRequest { correlation_id, .. }
            | Self::NotFound { correlation_id, .. }
            | Self::Forbidden { correlation_id }
            | Self::Internal { correlation_id, .. } => correlation_id,
        }
    }
}

impl From<AccessDenied> for ApplicationError {
    fn from(value: AccessDenied) -> Self {
        Self::Domain(DomainError::Forbidden(value))
    }
}

impl From<RoutingError> for ApplicationError {
    fn from(value: RoutingError) -> Self {
        match &value {
            RoutingError::ExecutorNotFound { .. } => {
                Self::Domain(DomainError::NotFound(value.to_string()))
            }
            RoutingError::NoOrganizationalUnit
            | RoutingError::NoHolderForPositionType { .. }
            | RoutingError::NoHolderForPosition { .. } => {
                Self::Domain(DomainError::BadRequest(value.to_string()))
            }
            RoutingError::Directory(error) => Self::Persistence(error.to_string()),
        }
    }
}

impl ApplicationError {
    pub fn into_interface(self, correlation_id: impl Into<String>) -> InterfaceError {
        let correlation_id = correlation_id.into();
        let mut mapped = InterfaceError::from(self);
        match &mut mapped {
            InterfaceError::BadRequest { correlation_id: id, .. }
            | InterfaceError::NotFound { correlation_id: id, .. }
            | InterfaceError::Forbidden { correlation_id: id }
            | InterfaceError::Internal { correlation_id: id, .. } => *id = correlation_id,
        }
        mapped
    }
}

impl From<ApplicationError> for InterfaceError {
    fn from(value: ApplicationError) -> Self {
        let correlation_id = "unassigned".to_owned();
        match value {
            ApplicationError::Domain(DomainError::BadRequest(message)) => {
                Self::BadRequest { message, correlation_id }
            }
            ApplicationError::Domain(DomainError::NotFound(message)) => {
                Self::NotFound { message, correlation_id }
            }
            ApplicationError::Domain(DomainError::Forbidden(_)) => Self::Forbidden { correlation_id },
            ApplicationError::Persistence(message) | ApplicationError::Configuration(message) => {
                Self::Internal { message, correlation_id }
            }
        }
    }
}
