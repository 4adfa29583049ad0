//! Error types for the chartwave plan engine.
//!
//! This module provides the error hierarchy for all operations in the
//! planning lifecycle: declaration parsing, repository registry,
//! chart resolution, plan building, and diffing.
//!
//! Every error maps to an [`ErrorKind`], so callers can branch on the
//! condition ("is this a not-found?") without inspecting message text
//! or caring which call produced the value.

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for the chartwave plan engine.
#[derive(Debug, Error)]
pub enum ChartwaveError {
    /// Declaration/configuration errors.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Repository registry errors.
    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    /// Chart resolution errors.
    #[error("Chart error: {0}")]
    Chart(#[from] ChartError),

    /// Plan building/persistence errors.
    #[error("Plan error: {0}")]
    Plan(#[from] PlanError),

    /// Diff computation errors.
    #[error("Diff error: {0}")]
    Diff(#[from] DiffError),

    /// IO errors.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// The condition an error represents, independent of which call
/// produced it or how many layers wrapped it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Empty or malformed field, or an unknown serialized shape.
    Validation,
    /// A name that already exists where uniqueness is required.
    Duplicate,
    /// A named entry that does not exist.
    NotFound,
    /// A repository URL that fails the syntactic check.
    InvalidUrl,
    /// Chart could not be located (network, auth, missing).
    Resolution,
    /// Chart contents could not be loaded or are malformed.
    Load,
    /// A declared chart dependency is missing or failed to download.
    Dependency,
    /// Plan artifact could not be persisted or imported.
    Persistence,
    /// Underlying IO failure.
    Io,
    /// Anything else.
    Internal,
}

/// Declaration/configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The declaration file was not found.
    #[error("Declaration file not found: {path}")]
    FileNotFound {
        /// Path to the missing file.
        path: PathBuf,
    },

    /// The declaration could not be parsed.
    #[error("Failed to parse declaration: {message}")]
    ParseError {
        /// Description of the parse error, including the source
        /// position when the decoder provides one.
        message: String,
        /// Optional source location (file path).
        location: Option<String>,
    },

    /// Validation failed.
    #[error("Declaration validation failed: {message}")]
    ValidationError {
        /// Description of the validation error.
        message: String,
        /// Field that failed validation.
        field: Option<String>,
    },
}

/// Repository registry errors.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// The repository name is blank.
    #[error("repository name is empty")]
    NameEmpty,

    /// The repository URL is blank.
    #[error("repository url is empty")]
    UrlEmpty,

    /// The repository URL fails the syntactic check.
    #[error("invalid URL: {url}")]
    InvalidUrl {
        /// The rejected URL.
        url: String,
    },

    /// A repository with this name is already registered.
    #[error("repository duplicate: {name}")]
    Duplicate {
        /// The duplicated name.
        name: String,
    },

    /// No repository with this name is registered.
    #[error("repository not found: {name}")]
    NotFound {
        /// The missing name.
        name: String,
    },
}

/// Chart resolution errors.
#[derive(Debug, Error)]
pub enum ChartError {
    /// Chart reference decoded to an empty name.
    #[error("chart name is empty")]
    NameEmpty,

    /// Chart could not be located.
    #[error("failed to locate chart {name}: {reason}")]
    Locate {
        /// Name of the chart.
        name: String,
        /// Underlying failure.
        reason: String,
    },

    /// Chart contents could not be loaded.
    #[error("failed to load chart {name}: {reason}")]
    Load {
        /// Name of the chart.
        name: String,
        /// Underlying failure.
        reason: String,
    },

    /// Declared dependencies are missing from the chart.
    #[error("failed to check chart {name} dependencies: missing {missing:?}")]
    MissingDependencies {
        /// Name of the chart.
        name: String,
        /// Names of the missing dependencies.
        missing: Vec<String>,
    },

    /// Dependency download failed.
    #[error("failed to update {name} chart dependencies: {reason}")]
    DependencyUpdate {
        /// Name of the chart.
        name: String,
        /// Underlying failure.
        reason: String,
    },

    /// Chart could not be exported into the destination directory.
    #[error("failed to export chart {name}: {reason}")]
    Export {
        /// Name of the chart.
        name: String,
        /// Underlying failure.
        reason: String,
    },
}

/// Plan building/persistence errors.
#[derive(Debug, Error)]
pub enum PlanError {
    /// Two surviving releases share the same unique name.
    #[error("release duplicate: {uniq}")]
    DuplicateRelease {
        /// The duplicated `name@namespace` pair.
        uniq: String,
    },

    /// No planfile exists at the plan directory.
    #[error("planfile not found: {path}")]
    NotFound {
        /// Path to the missing planfile.
        path: PathBuf,
    },

    /// The planfile could not be decoded.
    #[error("failed to decode planfile: {message}")]
    Decode {
        /// Description of the decode error.
        message: String,
    },

    /// The plan could not be encoded for persistence.
    #[error("failed to encode planfile: {message}")]
    Encode {
        /// Description of the encode error.
        message: String,
    },
}

/// Diff computation errors.
#[derive(Debug, Error)]
pub enum DiffError {
    /// A persisted manifest could not be parsed for comparison.
    #[error("failed to parse manifest for {uniq}: {reason}")]
    ManifestParse {
        /// Unique name of the release.
        uniq: String,
        /// Underlying failure.
        reason: String,
    },

    /// The live-manifest provider failed.
    #[error("live manifest provider failed for {uniq}: {reason}")]
    Provider {
        /// Unique name of the release.
        uniq: String,
        /// Underlying failure.
        reason: String,
    },
}

/// Result type alias for chartwave operations.
pub type Result<T> = std::result::Result<T, ChartwaveError>;

impl ChartwaveError {
    /// Creates a new internal error with the given message.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Returns the kind of condition this error represents.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Config(e) => e.kind(),
            Self::Registry(e) => e.kind(),
            Self::Chart(e) => e.kind(),
            Self::Plan(e) => e.kind(),
            Self::Diff(_) => ErrorKind::Load,
            Self::Io(_) => ErrorKind::Io,
            Self::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Returns true if this error represents a not-found condition.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self.kind(), ErrorKind::NotFound)
    }

    /// Returns true if this error represents a duplicate condition.
    #[must_use]
    pub const fn is_duplicate(&self) -> bool {
        matches!(self.kind(), ErrorKind::Duplicate)
    }
}

impl ConfigError {
    /// Returns the kind of condition this error represents.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::FileNotFound { .. } => ErrorKind::NotFound,
            Self::ParseError { .. } | Self::ValidationError { .. } => ErrorKind::Validation,
        }
    }

    /// Creates a validation error for a specific field.
    #[must_use]
    pub fn validation(message: impl Into<String>, field: impl Into<String>) -> Self {
        Self::ValidationError {
            message: message.into(),
            field: Some(field.into()),
        }
    }
}

impl RegistryError {
    /// Returns the kind of condition this error represents.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::NameEmpty | Self::UrlEmpty => ErrorKind::Validation,
            Self::InvalidUrl { .. } => ErrorKind::InvalidUrl,
            Self::Duplicate { .. } => ErrorKind::Duplicate,
            Self::NotFound { .. } => ErrorKind::NotFound,
        }
    }
}

impl ChartError {
    /// Returns the kind of condition this error represents.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::NameEmpty => ErrorKind::Validation,
            Self::Locate { .. } => ErrorKind::Resolution,
            Self::Load { .. } | Self::Export { .. } => ErrorKind::Load,
            Self::MissingDependencies { .. } | Self::DependencyUpdate { .. } => {
                ErrorKind::Dependency
            }
        }
    }

    /// Creates a locate error wrapping an underlying failure.
    #[must_use]
    pub fn locate(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Locate {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Creates a load error wrapping an underlying failure.
    #[must_use]
    pub fn load(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Load {
            name: name.into(),
            reason: reason.into(),
        }
    }
}

impl PlanError {
    /// Returns the kind of condition this error represents.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::DuplicateRelease { .. } => ErrorKind::Duplicate,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::Decode { .. } | Self::Encode { .. } => ErrorKind::Persistence,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_matches_regardless_of_wrapping() {
        let direct = RegistryError::NotFound {
            name: String::from("stable"),
        };
        let wrapped = ChartwaveError::from(RegistryError::NotFound {
            name: String::from("stable"),
        });

        assert_eq!(direct.kind(), ErrorKind::NotFound);
        assert_eq!(wrapped.kind(), ErrorKind::NotFound);
        assert!(wrapped.is_not_found());
    }

    #[test]
    fn duplicate_kind_is_shared_by_registry_and_plan() {
        let repo = ChartwaveError::from(RegistryError::Duplicate {
            name: String::from("stable"),
        });
        let release = ChartwaveError::from(PlanError::DuplicateRelease {
            uniq: String::from("nginx@default"),
        });

        assert!(repo.is_duplicate());
        assert!(release.is_duplicate());
    }

    #[test]
    fn resolution_errors_carry_chart_name() {
        let err = ChartError::locate("bitnami/nginx", "connection refused");
        assert!(err.to_string().contains("bitnami/nginx"));
        assert_eq!(err.kind(), ErrorKind::Resolution);
    }
}
