//! Typed query functions, one module per entity family.
//!
//! Each function owns exactly one statement (or one transaction where several
//! statements must be atomic). Nothing outside this module constructs SQL.

mod audit;
mod deployments;
mod models;
mod questions;
mod reports;
mod secrets;
mod sessions;
mod teams;
mod users;

pub use audit::*;
pub use deployments::*;
pub use models::*;
pub use questions::*;
pub use reports::*;
pub use secrets::*;
pub use sessions::*;
pub use teams::*;
pub use users::*;
