//! Error types for the Swapstack deployment accelerator.
//!
//! This module provides the error hierarchy for all operations in the hotswap
//! lifecycle: override configuration, apply execution, and asset bundling.
//! Classification itself is error-free by construction; a change that cannot
//! be hotswapped is data (a [`crate::classify::Verdict`]), not an error.

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for the Swapstack deployment accelerator.
#[derive(Debug, Error)]
pub enum SwapstackError {
    /// Override-configuration errors.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Apply-phase errors.
    #[error("Apply error: {0}")]
    Apply(#[from] ApplyError),

    /// Asset bundling errors.
    #[error("Bundle error: {0}")]
    Bundle(#[from] BundleError),

    /// IO errors.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Override-configuration errors.
///
/// These are fatal and raised at construction, before any classification or
/// apply work begins. They are never retried.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A percentage bound was negative.
    #[error("Invalid value for {field}: {value} (must be non-negative)")]
    NegativeBound {
        /// Name of the offending field.
        field: String,
        /// The rejected value.
        value: i64,
    },

    /// A bound pair is inconsistent.
    #[error("Invalid bounds: minimum {minimum} exceeds maximum {maximum}")]
    InvertedBounds {
        /// Configured minimum.
        minimum: i64,
        /// Configured maximum.
        maximum: i64,
    },
}

/// Apply-phase errors.
#[derive(Debug, Error)]
pub enum ApplyError {
    /// A single resource's apply action failed against the control plane.
    #[error("Failed to apply hotswap for '{resource}': {cause}")]
    ResourceApplyFailed {
        /// Name of the resource whose apply failed.
        resource: String,
        /// Underlying cause.
        cause: String,
    },

    /// One or more resources failed while siblings succeeded.
    #[error("Hotswap partially failed: {failed} of {total} resources failed ({resources})")]
    PartialFailure {
        /// Number of failed resources.
        failed: usize,
        /// Total number of resources applied.
        total: usize,
        /// Comma-separated names of the failed resources.
        resources: String,
    },

    /// An apply task panicked or was cancelled before settling.
    #[error("Apply task for '{resource}' did not settle: {cause}")]
    TaskFailed {
        /// Name of the resource whose task failed.
        resource: String,
        /// Underlying cause.
        cause: String,
    },
}

/// Asset bundling errors.
#[derive(Debug, Error)]
pub enum BundleError {
    /// The source directory does not exist or is not a directory.
    #[error("Bundle source not found: {path}")]
    SourceNotFound {
        /// Path to the missing source directory.
        path: PathBuf,
    },

    /// The atomic-publish rename kept failing with a transient busy error.
    #[error("Failed to publish archive after {attempts} attempts: {path}")]
    RenameRetriesExhausted {
        /// Number of rename attempts made.
        attempts: u32,
        /// Destination path that could not be published.
        path: PathBuf,
    },

    /// A filesystem operation failed while building the archive.
    #[error("Archive IO failed at {path}: {message}")]
    ArchiveIo {
        /// Path involved in the failed operation.
        path: PathBuf,
        /// Description of the failure.
        message: String,
    },
}

/// Result type alias for Swapstack operations.
pub type Result<T> = std::result::Result<T, SwapstackError>;

impl SwapstackError {
    /// Creates a new internal error with the given message.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Returns true if this error aborts the whole deployment run.
    ///
    /// Per-resource apply failures are collected and reported rather than
    /// aborting; configuration and exhausted-retry bundler errors are fatal.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        !matches!(self, Self::Apply(_))
    }
}

impl ConfigError {
    /// Creates a negative-bound error for a specific field.
    #[must_use]
    pub fn negative_bound(field: impl Into<String>, value: i64) -> Self {
        Self::NegativeBound {
            field: field.into(),
            value,
        }
    }
}

impl ApplyError {
    /// Creates a per-resource apply failure.
    #[must_use]
    pub fn resource_failed(resource: impl Into<String>, cause: impl Into<String>) -> Self {
        Self::ResourceApplyFailed {
            resource: resource.into(),
            cause: cause.into(),
        }
    }
}

impl BundleError {
    /// Creates an archive IO error for the given path.
    #[must_use]
    pub fn archive_io(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::ArchiveIo {
            path: path.into(),
            message: message.into(),
        }
    }
}
