//! Entity Repository Library
//!
//! A generic repository that performs parameterized CRUD, conjunctive
//! filtering and pagination over one table per entity type, on PostgreSQL,
//! MySQL or SQLite. Every value is bound as a parameter; only validated
//! identifiers reach SQL text.

pub mod cli;
pub mod config;
pub mod db;
pub mod employees;
pub mod error;
pub mod models;
pub mod repository;

pub use config::Config;
pub use db::{Connection, ConnectionProvider, DatabaseType, Row, SqlxProvider};
pub use error::{RepoError, RepoResult};
pub use models::{ChangeSet, FilterSet, PageSpec, SqlValue};
pub use repository::{Entity, Repository};
