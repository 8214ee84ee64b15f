//! Data models for the entity repository.
//!
//! This module re-exports all model types used throughout the crate.

pub mod query;
pub mod value;

// Re-export commonly used types
pub use query::{ChangeSet, FilterSet, PageSpec, Param};
pub use value::{FromSqlValue, SqlValue};
