//! The permission cache (C3): TTL-cached per-token permissions fetched from
//! the control plane's auth source, plus the read/write/override guards
//! every handler wraps its route with.

pub mod cache;
pub mod error;
pub mod guard;

pub use cache::{AuthSource, PermissionCache, Permissions};
pub use error::AuthError;
pub use guard::{require_override, require_read, require_write, resolve_credential, AuthzToken};
