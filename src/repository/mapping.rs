//! Row-to-entity and entity-to-parameter mapping.

use crate::db::Row;
use crate::error::RepoResult;
use crate::models::SqlValue;
use std::sync::Arc;

/// Converts one fetched row into an entity.
pub type RowMapper<T> = Arc<dyn Fn(&Row) -> RepoResult<T> + Send + Sync>;

/// Lists an entity's columns and values for insertion, in column order.
pub type ParamMapper<T> = Arc<dyn Fn(&T) -> Vec<(String, SqlValue)> + Send + Sync>;

/// An entity type stored in one table.
///
/// Implementing this lets [`Repository::for_entity`](super::Repository::for_entity)
/// build a repository without passing closures by hand.
pub trait Entity: Sized + Send + Sync + 'static {
    const TABLE_NAME: &'static str;
    const PRIMARY_KEY: &'static str;

    fn from_row(row: &Row) -> RepoResult<Self>;

    fn to_params(&self) -> Vec<(String, SqlValue)>;
}
