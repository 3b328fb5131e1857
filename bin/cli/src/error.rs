//! Error types for the command-line front-end.

use std::fmt;

/// Command errors.
#[derive(Debug)]
pub enum CliError {
    /// Configuration could not be loaded.
    Config { details: String },
    /// A session operation failed.
    Session { details: String },
    /// A permission operation failed.
    Authz { details: String },
    /// The command line was inconsistent.
    InvalidArgument { details: String },
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config { details } => write!(f, "configuration error: {}", details),
            Self::Session { details } => write!(f, "session error: {}", details),
            Self::Authz { details } => write!(f, "authorization error: {}", details),
            Self::InvalidArgument { details } => write!(f, "invalid argument: {}", details),
        }
    }
}

impl std::error::Error for CliError {}
