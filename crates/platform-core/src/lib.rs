//! The model lifecycle manager (C4) and durable update log (C5) — the
//! control plane's orchestration core.

pub mod artifact;
pub mod error;
pub mod license;
pub mod lifecycle;
pub mod logs;
pub mod sweeper;
pub mod updatelog;
pub mod validate;
pub mod vault;

pub use error::LifecycleError;
pub use lifecycle::{LifecycleConfig, LifecycleManager};
