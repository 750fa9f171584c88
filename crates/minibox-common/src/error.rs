//! Unified error types for the minibox workspace.
//!
//! Every crate in the workspace reports failures through [`MiniboxError`].
//! Mandatory preconditions (a missing rootfs, a rejected identity mapping)
//! abort the operation with a typed error; hardening steps (optional limit
//! writes, residual unmounts) log a warning and continue instead.

use std::path::PathBuf;

use thiserror::Error;

/// Top-level error type shared across the workspace.
#[derive(Debug, Error)]
pub enum MiniboxError {
    /// A memory allocation required by the runtime failed.
    #[error("memory allocation failed: {message}")]
    Memory {
        /// Description of the failed allocation.
        message: String,
    },

    /// Creation or entry of an isolation namespace failed.
    #[error("namespace operation failed: {message}")]
    Namespace {
        /// Description of the failed namespace operation.
        message: String,
    },

    /// A cgroup subtree, limit, metrics, or cleanup operation failed.
    #[error("cgroup operation failed: {message}")]
    Cgroup {
        /// Description of the failed cgroup operation.
        message: String,
    },

    /// Root isolation or an essential mount failed.
    #[error("filesystem isolation failed at {path}: {message}")]
    Filesystem {
        /// Path involved in the failed operation.
        path: PathBuf,
        /// Description of the failure.
        message: String,
    },

    /// A process could not be spawned, waited on, or signaled.
    #[error("process operation failed: {message}")]
    Process {
        /// Description of the failed process operation.
        message: String,
    },

    /// The caller lacks the privilege required for the operation.
    #[error("permission denied: {message}")]
    PermissionDenied {
        /// Description of the denied operation.
        message: String,
    },

    /// A container or target process is absent.
    #[error("{kind} not found: {id}")]
    NotFound {
        /// Type of the missing resource.
        kind: &'static str,
        /// Identifier of the missing resource.
        id: String,
    },

    /// An operation was requested in a state that does not permit it.
    #[error("invalid argument: {message}")]
    InvalidArgument {
        /// Description of the invalid request.
        message: String,
    },

    /// A container with this identifier already exists.
    #[error("container already exists: {id}")]
    AlreadyExists {
        /// Identifier of the conflicting container.
        id: String,
    },

    /// An I/O operation failed.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// Path where the I/O error occurred.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
}

/// Convenience alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, MiniboxError>;
