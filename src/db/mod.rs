//! Database abstraction layer.
//!
//! This module provides database access functionality:
//! - SQL dialect differences (placeholders, paging)
//! - Statement construction with bound parameters
//! - Connection pool management
//! - Connection acquisition and statement execution
//! - Type mappings into driver-neutral rows

pub mod dialect;
pub mod pool;
pub mod provider;
pub mod row;
pub mod statement;
pub mod types;

pub use dialect::DatabaseType;
pub use pool::DbPool;
pub use provider::{Connection, ConnectionProvider, SqlxProvider};
pub use row::Row;
pub use statement::{Statement, StatementBuilder, validate_identifier};
