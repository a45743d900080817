//! Structured error types for apply and preview operations.

use serde::Serialize;
use std::fmt;

/// Error codes for programmatic error handling.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Precondition failures
    ProjectNotFound,
    TenantMismatch,
    TemplateSetNotAccessible,
    PresetNotFound,
    EmptyResolution,

    // Graph errors
    DependencyCycle,

    // Validation errors
    InvalidTask,
    InvalidOptions,

    // Internal errors
    DatabaseError,
    InternalError,
}

impl ErrorCode {
    /// HTTP status an API layer should answer with.
    pub fn http_status(&self) -> u16 {
        match self {
            ErrorCode::ProjectNotFound
            | ErrorCode::TemplateSetNotAccessible
            | ErrorCode::PresetNotFound => 404,
            ErrorCode::TenantMismatch => 409,
            ErrorCode::EmptyResolution
            | ErrorCode::DependencyCycle
            | ErrorCode::InvalidTask
            | ErrorCode::InvalidOptions => 422,
            ErrorCode::DatabaseError | ErrorCode::InternalError => 500,
        }
    }
}

/// Structured error returned by the apply service.
#[derive(Debug, Serialize)]
pub struct ApplyError {
    pub code: ErrorCode,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

impl ApplyError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            field: None,
        }
    }

    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    // Convenience constructors

    pub fn project_not_found(project_id: i64) -> Self {
        Self::new(
            ErrorCode::ProjectNotFound,
            format!("Project not found: {}", project_id),
        )
        .with_field("project_id")
    }

    pub fn tenant_mismatch(project_id: i64, tenant_id: i64) -> Self {
        Self::new(
            ErrorCode::TenantMismatch,
            format!(
                "Project {} does not belong to tenant {}",
                project_id, tenant_id
            ),
        )
        .with_field("tenant_id")
    }

    pub fn set_not_accessible(set_id: i64, tenant_id: i64) -> Self {
        Self::new(
            ErrorCode::TemplateSetNotAccessible,
            format!(
                "Template set {} is not accessible to tenant {}",
                set_id, tenant_id
            ),
        )
        .with_field("set_id")
    }

    pub fn preset_not_found(preset_id: i64, set_id: i64) -> Self {
        Self::new(
            ErrorCode::PresetNotFound,
            format!("Preset {} not found in template set {}", preset_id, set_id),
        )
        .with_field("preset_id")
    }

    pub fn empty_resolution(set_id: i64) -> Self {
        Self::new(
            ErrorCode::EmptyResolution,
            format!("No template tasks of set {} match the selection", set_id),
        )
    }

    pub fn dependency_cycle(codes: &[String]) -> Self {
        Self::new(
            ErrorCode::DependencyCycle,
            format!("Dependency cycle among template tasks: {}", codes.join(", ")),
        )
    }

    pub fn invalid_task(code: &str, reason: &str) -> Self {
        Self::new(
            ErrorCode::InvalidTask,
            format!("Template task {} cannot be materialized: {}", code, reason),
        )
    }

    pub fn invalid_options(field: &str, reason: &str) -> Self {
        Self::new(ErrorCode::InvalidOptions, reason).with_field(field)
    }

    pub fn database(err: impl fmt::Display) -> Self {
        Self::new(ErrorCode::DatabaseError, err.to_string())
    }

    pub fn internal(err: impl fmt::Display) -> Self {
        Self::new(ErrorCode::InternalError, err.to_string())
    }
}

impl fmt::Display for ApplyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ApplyError {}

// Storage errors travel as anyhow; recover our own error if one was wrapped.
impl From<anyhow::Error> for ApplyError {
    fn from(err: anyhow::Error) -> Self {
        match err.downcast::<ApplyError>() {
            Ok(apply_err) => apply_err,
            Err(err) => match err.downcast::<rusqlite::Error>() {
                Ok(db_err) => ApplyError::database(db_err),
                Err(err) => ApplyError::internal(err),
            },
        }
    }
}

impl From<rusqlite::Error> for ApplyError {
    fn from(err: rusqlite::Error) -> Self {
        ApplyError::database(err)
    }
}

/// Result type for apply operations.
pub type ApplyResult<T> = std::result::Result<T, ApplyError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preconditions_map_to_client_statuses() {
        assert_eq!(ApplyError::project_not_found(1).code.http_status(), 404);
        assert_eq!(ApplyError::tenant_mismatch(1, 2).code.http_status(), 409);
        assert_eq!(ApplyError::empty_resolution(3).code.http_status(), 422);
    }

    #[test]
    fn anyhow_round_trip_keeps_code() {
        let wrapped = anyhow::Error::new(ApplyError::invalid_task("T1", "name too long"));
        let err: ApplyError = wrapped.into();
        assert_eq!(err.code, ErrorCode::InvalidTask);
    }

    #[test]
    fn serializes_screaming_snake_code() {
        let json = serde_json::to_string(&ApplyError::dependency_cycle(&["A".into()])).unwrap();
        assert!(json.contains("DEPENDENCY_CYCLE"));
        assert!(!json.contains("field"));
    }
}
