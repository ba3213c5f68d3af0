//! Error types for drift-core

use std::path::PathBuf;

/// Result type for drift-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Result type returned by [`ResourceClient`](crate::ResourceClient) implementations
pub type ClientResult<T> = std::result::Result<T, ClientError>;

/// Errors that can occur in drift-core operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Configuration document not found at expected path
    #[error("Configuration not found at {path}")]
    ConfigNotFound { path: PathBuf },

    /// Configuration document could not be parsed
    #[error("Invalid configuration document: {0}")]
    ConfigParse(#[from] serde_yaml::Error),

    /// The mandatory `default` profile is absent
    #[error("Configuration has no 'default' profile")]
    MissingDefaultProfile,

    /// A profile references an approval rule that is not in the catalogue
    #[error("Profile '{profile}' references unknown approval rule '{rule}'")]
    UnknownApprovalRule { profile: String, rule: String },

    /// Approval rules are managed but no group was named to resolve approvers
    #[error("APPROVERS_GROUP must be set when approval_rules are managed")]
    MissingApproversGroup,

    /// A seed group could not be resolved
    #[error("Group not found: {group}")]
    GroupNotFound { group: String },

    /// A project could not be resolved
    #[error("Project not found: {project}")]
    ProjectNotFound { project: String },

    /// A configured approver is not a member of the approvers group
    #[error("Approver '{username}' is not a member of the approvers group")]
    UnknownApprover { username: String },

    /// Configured value does not match the kind of the field
    #[error("Field '{field}' expects {expected}, got {found}")]
    FieldType {
        field: String,
        expected: &'static str,
        found: String,
    },

    /// Configured value is outside the set allowed for the field
    #[error("Field '{field}' does not accept '{value}' (allowed: {allowed})")]
    InvalidFieldValue {
        field: String,
        value: String,
        allowed: String,
    },

    /// Branch protection state cannot be reconciled
    #[error("Branch protection for '{project}': {message}")]
    BranchProtection { project: String, message: String },

    /// Error reported by the resource client
    #[error(transparent)]
    Client(#[from] ClientError),

    /// Standard I/O error
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Errors surfaced by a resource client adapter
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClientError {
    /// The requested resource does not exist
    #[error("Resource not found: {resource}")]
    NotFound { resource: String },

    /// The remote answered with a non-success status
    #[error("Request failed with status {status}: {message}")]
    Status { status: u16, message: String },

    /// The request never completed (connection, timeout)
    #[error("Transport error: {message}")]
    Transport { message: String },

    /// The response body could not be decoded
    #[error("Could not decode response: {message}")]
    Decode { message: String },
}

impl ClientError {
    /// Create a not-found error for the given resource description
    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::NotFound {
            resource: resource.into(),
        }
    }

    /// Whether this error means the resource does not exist
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}
