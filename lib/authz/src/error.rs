//! Authorization error types.

use std::fmt;

/// Authorization errors.
#[derive(Debug)]
pub enum AuthzError {
    /// Permission denied.
    PermissionDenied {
        /// The permission that was requested.
        permission: String,
    },
    /// Fetching the permission snapshot failed.
    FetchFailed {
        /// Error details.
        details: String,
    },
}

impl fmt::Display for AuthzError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PermissionDenied { permission } => {
                write!(f, "permission '{}' denied", permission)
            }
            Self::FetchFailed { details } => {
                write!(f, "failed to fetch permissions: {}", details)
            }
        }
    }
}

impl std::error::Error for AuthzError {}
