//! SQL module - validation and execution

pub mod executor;
pub mod validate;

pub use executor::{QueryExecutor, SqliteExecutor};
pub use validate::{validate_sql, ValidationReport};
