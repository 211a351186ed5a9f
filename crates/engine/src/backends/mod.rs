//! Database Backend Abstractions
//!
//! The engine reaches the target database only through the traits in
//! [`core`]; [`any`] provides the sqlx implementation used by the CLI and
//! the integration tests.

pub mod any;
pub mod core;

pub use self::any::{AnyDatabasePool, AnyDatabaseRow, AnyDatabaseTransaction};
pub use self::core::*;
