//! Core types shared by the headless-auth crates.
//!
//! All session and authorization state is partitioned by [`Namespace`].

pub mod namespace;

pub use namespace::{DEFAULT_NAMESPACE, Namespace, ParseNamespaceError};
