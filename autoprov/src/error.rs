//! Hierarchical error types for the provisioning daemon.
//!
//! Errors are categorized by where they surface:
//! - [`MountError`]: OS mount/unmount failures
//! - [`ValidationError`]: descriptor file problems
//! - [`ToolError`]: external compile/program tool failures
//! - [`ConfigError`]: startup configuration issues
//!
//! Everything except [`ConfigError`] is recoverable at the monitor or
//! pipeline boundary: it becomes a status message and the daemon returns
//! to idle to await the next event.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

pub type AutoprovResult<T> = Result<T, AutoprovError>;

// ============================================================================
// Top-Level Error
// ============================================================================

/// Errors that can occur during daemon operations.
#[derive(Debug, Error)]
pub enum AutoprovError {
    /// OS mount or unmount failed.
    #[error("mount: {0}")]
    Mount(#[from] MountError),

    /// Descriptor file missing, malformed, or not matching the profile.
    #[error("validation: {0}")]
    Validation(#[from] ValidationError),

    /// External compile/program tool failed.
    #[error("tool: {0}")]
    Tool(#[from] ToolError),

    /// Configuration could not be loaded or is invalid.
    #[error("config: {0}")]
    Config(#[from] ConfigError),

    /// Generic IO error (catch-all).
    #[error("io: {0}")]
    Io(#[from] io::Error),
}

// ============================================================================
// Mount Errors
// ============================================================================

/// Errors during mount-point management.
#[derive(Debug, Error)]
pub enum MountError {
    /// Filesystem type is not a supported removable-media filesystem.
    #[error("unsupported filesystem '{fstype}' for removable media")]
    UnsupportedFilesystem { fstype: String },

    /// The OS mount call reported a non-zero status.
    #[error("mounting {device} ({fstype}) on {mount_point}: {source}")]
    Mount {
        device: String,
        fstype: String,
        mount_point: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The OS unmount call reported a non-zero status.
    #[error("unmounting {mount_point}: {source}")]
    Unmount {
        mount_point: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Mount point directory could not be created.
    #[error("creating mount point {path}: {source}")]
    CreateMountPoint {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

// ============================================================================
// Validation Errors
// ============================================================================

/// Errors raised while validating a task descriptor against the
/// required instrument profile.
///
/// Display texts double as the operator-visible status messages, so they
/// name the file and instrument involved.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    /// The descriptor file is absent from the mounted media.
    #[error("could not find expected task file {path}")]
    MissingDescriptor { path: PathBuf },

    /// The descriptor file is not well-formed markup.
    #[error("could not parse the task file {path}: {reason}")]
    Parse { path: PathBuf, reason: String },

    /// A required instrument identifier never appears in the descriptor.
    #[error("did not find {part} in the task file {path}")]
    MissingInstrument { part: String, path: PathBuf },

    /// A required instrument appears, but not the required number of times.
    #[error("expected {required} instance(s) of {part} in the task file {path}, found {observed}")]
    InstrumentCountMismatch {
        part: String,
        required: u32,
        observed: u32,
        path: PathBuf,
    },
}

// ============================================================================
// Tool Errors
// ============================================================================

/// Errors from invoking the external compile/program tool.
#[derive(Debug, Error)]
pub enum ToolError {
    /// Tool binary could not be started.
    #[error("failed to start {tool}: {source}")]
    Spawn {
        tool: String,
        #[source]
        source: io::Error,
    },

    /// Waiting on the tool failed at the OS level.
    #[error("waiting on {tool}: {source}")]
    Wait {
        tool: String,
        #[source]
        source: io::Error,
    },

    /// Tool exceeded the configured deadline and was killed.
    #[error("{tool} did not finish within {timeout_secs}s and was killed")]
    Timeout { tool: String, timeout_secs: u64 },

    /// Tool ran to completion with a failure status.
    #[error("{tool} failed ({status}): {detail}")]
    Failed {
        tool: String,
        status: String,
        detail: String,
    },
}

// ============================================================================
// Config Errors
// ============================================================================

/// Startup configuration problems. These are the only fatal errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Configuration file could not be read.
    #[error("reading {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Configuration file is not valid JSON.
    #[error("parsing {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// The required-instrument profile is empty.
    #[error("required instrument profile is empty")]
    EmptyProfile,

    /// A profile entry requires zero occurrences, which can never match.
    #[error("instrument {part} has a required count of zero")]
    ZeroCount { part: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_text_names_the_file() {
        let err = ValidationError::MissingDescriptor {
            path: PathBuf::from("/mnt/usbkey/allswi101.xidml"),
        };
        let text = err.to_string();
        assert!(text.contains("could not find expected task file"));
        assert!(text.contains("allswi101.xidml"));
    }

    #[test]
    fn test_count_mismatch_text_carries_both_counts() {
        let err = ValidationError::InstrumentCountMismatch {
            part: "NET/SWI/101/B/SB2".into(),
            required: 3,
            observed: 2,
            path: PathBuf::from("task.xidml"),
        };
        let text = err.to_string();
        assert!(text.contains("expected 3"));
        assert!(text.contains("found 2"));
        assert!(text.contains("NET/SWI/101/B/SB2"));
    }

    #[test]
    fn test_umbrella_conversion() {
        let err: AutoprovError = ConfigError::EmptyProfile.into();
        assert!(matches!(err, AutoprovError::Config(_)));
    }
}
