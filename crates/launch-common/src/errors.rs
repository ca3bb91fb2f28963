//! Error types shared by the launch crates.
//!
//! Descriptor handling (loading, parsing, validating, serializing) reports
//! [`Error`]. Anything that happens once a descriptor is turned into a real
//! process reports [`LaunchError`].

use std::time::Duration;
use thiserror::Error;

/// Result type alias for descriptor operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for descriptor operations.
#[derive(Debug, Error)]
pub enum Error {
    /// A requested resource (file, app) was not found.
    #[error("Not found: {resource}")]
    NotFound {
        resource: String,
    },

    /// The content could not be parsed in the given format.
    #[error("Failed to parse {format}: {message}")]
    Parse {
        format: String,
        message: String,
    },

    /// The content parsed but violates a descriptor rule.
    #[error("Validation error: {message}")]
    Validation {
        message: String,
    },

    /// File extension does not map to a known format.
    #[error("Unsupported config format: {extension}")]
    UnsupportedFormat {
        extension: String,
    },

    /// Serialization into the given format failed.
    #[error("Failed to serialize {format}: {message}")]
    Serialize {
        format: String,
        message: String,
    },

    /// I/O error (wraps std::io::Error).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error with context.
    #[error("{message}: {source}")]
    WithContext {
        message: String,
        source: Box<Error>,
    },
}

impl Error {
    /// Creates a NotFound error.
    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::NotFound {
            resource: resource.into(),
        }
    }

    /// Creates a Validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Creates a Parse error for the named format.
    pub fn parse(format: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Parse {
            format: format.into(),
            message: message.into(),
        }
    }

    /// Creates a Serialize error for the named format.
    pub fn serialize(format: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Serialize {
            format: format.into(),
            message: message.into(),
        }
    }

    /// Adds context to an error.
    ///
    /// # Example
    /// ```
    /// use launch_common::{Error, Result};
    ///
    /// fn inner() -> Result<()> {
    ///     Err(Error::not_found("ecosystem.config.js"))
    /// }
    ///
    /// fn outer() -> Result<()> {
    ///     inner().map_err(|e| e.context("Failed to load config"))
    /// }
    ///
    /// assert!(outer().unwrap_err().to_string().starts_with("Failed to load config"));
    /// ```
    pub fn context(self, message: impl Into<String>) -> Self {
        Self::WithContext {
            message: message.into(),
            source: Box::new(self),
        }
    }

    /// Returns the innermost error, skipping context layers.
    pub fn root(&self) -> &Error {
        match self {
            Self::WithContext { source, .. } => source.root(),
            other => other,
        }
    }
}

pub trait ResultExt<T> {
    /// Adds context to an error result.
    fn context(self, message: impl Into<String>) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, message: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.context(message))
    }
}

// ==============================================================================
// Launch Errors
// ==============================================================================

/// Errors raised while turning a descriptor into a running process.
#[derive(Error, Debug, Clone)]
pub enum LaunchError {
    #[error("Process spawn failed: {name} - {reason}")]
    SpawnFailed { name: String, reason: String },

    #[error("Script not found for {name}: {path}")]
    ScriptMissing { name: String, path: String },

    #[error("Process exited: {name} - exit code {code}")]
    Exited { name: String, code: i32 },

    #[error("Process terminated by signal: {name}")]
    Signalled { name: String },

    #[error("Process not ready: {name} - {address} did not accept connections within {waited:?}")]
    NotReady {
        name: String,
        address: String,
        waited: Duration,
    },

    #[error("Invalid launch descriptor: {name} - {reason}")]
    InvalidDescriptor { name: String, reason: String },
}

impl LaunchError {
    pub fn spawn_failed(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::SpawnFailed {
            name: name.into(),
            reason: reason.into(),
        }
    }

    pub fn script_missing(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self::ScriptMissing {
            name: name.into(),
            path: path.into(),
        }
    }

    pub fn invalid_descriptor(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidDescriptor {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Exit code the CLI should return for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Exited { code, .. } => *code,
            Self::Signalled { .. } => 130,
            _ => 1,
        }
    }
}

/// Result type for launch operations.
pub type LaunchResult<T> = std::result::Result<T, LaunchError>;
