//! Role and permission evaluation for headless-auth.
//!
//! The evaluator holds the last `{roles, permissions}` snapshot fetched from
//! the server and answers queries against it. It never refreshes on its own.

mod error;
mod evaluator;
mod policy;
mod source;
mod types;

pub use error::AuthzError;
pub use evaluator::AuthorizationEvaluator;
pub use policy::FullAccessPolicy;
pub use source::{DEFAULT_PERMISSIONS_PATH, PermissionSource, RemotePermissionSource};
pub use types::{AuthorizationSnapshot, PermissionKey};
