//! # Orchestrator Errors
//!
//! Structured error type shared by every orchestration component.
//!
//! Errors fall into three categories that drive how a failure is surfaced:
//!
//! - **Data** errors (missing configuration, unknown product, unusable season)
//!   fail the job with a descriptive message.
//! - **Environment** errors (filesystem, catalog, external program exit codes)
//!   are logged where they occur and only propagate when the artifact they
//!   concern is mandatory.
//! - **Programming** errors (a task graph referencing an unknown parent, an
//!   unregistered processor) are fatal and propagate unchanged.

use crate::config::error::ConfigurationError;
use crate::models::{JobId, SeasonId, SiteId, TaskId};
use chrono::NaiveDate;
use std::path::Path;
use thiserror::Error;

/// Failure class used by the job-submission boundary and by callers deciding
/// whether a failure can be tolerated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    Data,
    Environment,
    Programming,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Data => write!(f, "data"),
            Self::Environment => write!(f, "environment"),
            Self::Programming => write!(f, "programming"),
        }
    }
}

#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// A configuration key the operation cannot proceed without
    #[error("Missing required configuration '{key}': {context}")]
    MissingConfiguration { key: String, context: String },

    #[error("Invalid value '{value}' for parameter '{name}': {reason}")]
    InvalidParameter {
        name: String,
        value: String,
        reason: String,
    },

    #[error("Product not found: {reference}")]
    ProductNotFound { reference: String },

    #[error("No season could be resolved for site {site_id} on {date}")]
    SeasonResolution { site_id: SiteId, date: NaiveDate },

    /// An explicitly requested season exists but is disabled
    #[error("Season {season_id} requested for site {site_id} is disabled")]
    InvalidSeasonOverride { site_id: SiteId, season_id: SeasonId },

    #[error("No input products available for job {job_id}: {reason}")]
    NoInputProducts { job_id: JobId, reason: String },

    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error("I/O error on '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Catalog operation '{operation}' failed: {message}")]
    Catalog { operation: String, message: String },

    #[error("External program '{program}' failed: {reason}")]
    ExternalProgram { program: String, reason: String },

    #[error("JSON error in {context}: {message}")]
    Json { context: String, message: String },

    #[error("Task {task_id} references unknown parent task {parent_id}")]
    UnknownParentTask { task_id: TaskId, parent_id: TaskId },

    #[error("Task {task_id} does not exist in the task graph")]
    UnknownTask { task_id: TaskId },

    #[error("No handler registered for processor '{processor}'")]
    UnknownProcessor { processor: String },

    #[error("Invalid job state transition from '{from}' on event '{event}'")]
    InvalidStateTransition { from: String, event: String },
}

impl OrchestratorError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::MissingConfiguration { .. }
            | Self::InvalidParameter { .. }
            | Self::ProductNotFound { .. }
            | Self::SeasonResolution { .. }
            | Self::InvalidSeasonOverride { .. }
            | Self::NoInputProducts { .. }
            | Self::Configuration(_)
            | Self::Json { .. } => ErrorCategory::Data,
            Self::Io { .. } | Self::Catalog { .. } | Self::ExternalProgram { .. } => {
                ErrorCategory::Environment
            }
            Self::UnknownParentTask { .. }
            | Self::UnknownTask { .. }
            | Self::UnknownProcessor { .. }
            | Self::InvalidStateTransition { .. } => ErrorCategory::Programming,
        }
    }

    pub fn is_fatal(&self) -> bool {
        self.category() == ErrorCategory::Programming
    }

    pub fn missing_configuration(key: impl Into<String>, context: impl Into<String>) -> Self {
        Self::MissingConfiguration {
            key: key.into(),
            context: context.into(),
        }
    }

    pub fn invalid_parameter(
        name: impl Into<String>,
        value: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidParameter {
            name: name.into(),
            value: value.into(),
            reason: reason.into(),
        }
    }

    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().display().to_string(),
            source,
        }
    }

    pub fn catalog(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Catalog {
            operation: operation.into(),
            message: message.into(),
        }
    }

    pub fn json(context: impl Into<String>, error: impl std::fmt::Display) -> Self {
        Self::Json {
            context: context.into(),
            message: error.to_string(),
        }
    }
}

impl From<serde_json::Error> for OrchestratorError {
    fn from(error: serde_json::Error) -> Self {
        Self::json("serde_json", error)
    }
}

impl From<std::io::Error> for OrchestratorError {
    fn from(source: std::io::Error) -> Self {
        Self::Io {
            path: "<unknown>".to_string(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, OrchestratorError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_categories() {
        let err = OrchestratorError::missing_configuration("archiver.archive_path", "site 3");
        assert_eq!(err.category(), ErrorCategory::Data);
        assert!(!err.is_fatal());

        let err = OrchestratorError::ExternalProgram {
            program: "gdal_translate".to_string(),
            reason: "exit code 1".to_string(),
        };
        assert_eq!(err.category(), ErrorCategory::Environment);

        let err = OrchestratorError::UnknownParentTask {
            task_id: 4,
            parent_id: 17,
        };
        assert_eq!(err.category(), ErrorCategory::Programming);
        assert!(err.is_fatal());
    }

    #[test]
    fn test_error_messages_carry_context() {
        let err = OrchestratorError::InvalidSeasonOverride {
            site_id: 2,
            season_id: 9,
        };
        assert_eq!(err.to_string(), "Season 9 requested for site 2 is disabled");

        let err = OrchestratorError::io(
            "/tmp/missing",
            std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        );
        assert!(err.to_string().contains("/tmp/missing"));
    }

    #[test]
    fn test_conversions_keep_category() {
        let err: OrchestratorError = serde_json::from_str::<serde_json::Value>("{")
            .unwrap_err()
            .into();
        assert_eq!(err.category(), ErrorCategory::Data);

        let err: OrchestratorError = std::io::Error::other("disk").into();
        assert_eq!(err.category(), ErrorCategory::Environment);
    }
}
