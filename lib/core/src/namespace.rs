//! Namespace partition keys.
//!
//! A namespace partitions everything the client keeps locally (session
//! token, status flags, authorization snapshot) so that several independent
//! sessions can coexist in one process. The default namespace stores its
//! keys without a prefix.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Name of the namespace used when the caller does not choose one.
pub const DEFAULT_NAMESPACE: &str = "default";

/// Separator between the namespace and the key name in storage keys.
const KEY_SEPARATOR: char = ':';

/// Error returned when parsing a namespace from a string fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseNamespaceError {
    /// The rejected input.
    pub input: String,
    /// The reason the input was rejected.
    pub reason: &'static str,
}

impl fmt::Display for ParseNamespaceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid namespace '{}': {}", self.input, self.reason)
    }
}

impl std::error::Error for ParseNamespaceError {}

/// A caller-chosen partition key for local session state.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Namespace(String);

impl Namespace {
    /// Creates a namespace, validating the name.
    ///
    /// # Errors
    ///
    /// Returns an error if the name is empty or contains the key separator.
    pub fn new(name: impl Into<String>) -> Result<Self, ParseNamespaceError> {
        let name = name.into();
        if name.is_empty() {
            return Err(ParseNamespaceError {
                input: name,
                reason: "namespace must not be empty",
            });
        }
        if name.contains(KEY_SEPARATOR) {
            return Err(ParseNamespaceError {
                input: name,
                reason: "namespace must not contain ':'",
            });
        }
        Ok(Self(name))
    }

    /// Returns the namespace name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns true for the default namespace.
    #[must_use]
    pub fn is_default(&self) -> bool {
        self.0 == DEFAULT_NAMESPACE
    }

    /// Returns the prefix prepended to storage keys in this namespace.
    ///
    /// Empty for the default namespace.
    #[must_use]
    pub fn prefix(&self) -> String {
        if self.is_default() {
            String::new()
        } else {
            format!("{}{KEY_SEPARATOR}", self.0)
        }
    }

    /// Returns the fully qualified storage key for `name`.
    #[must_use]
    pub fn key(&self, name: &str) -> String {
        format!("{}{name}", self.prefix())
    }
}

impl Default for Namespace {
    fn default() -> Self {
        Self(DEFAULT_NAMESPACE.to_string())
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Namespace {
    type Err = ParseNamespaceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for Namespace {
    type Error = ParseNamespaceError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<Namespace> for String {
    fn from(namespace: Namespace) -> Self {
        namespace.0
    }
}
