//! Query-shaping models: bound parameters, filters, change sets and paging.

use crate::error::{RepoError, RepoResult};
use crate::models::SqlValue;
use std::collections::BTreeMap;

/// Column name to value, combined with AND in a WHERE clause.
///
/// A `BTreeMap` keeps clause generation ordered by column name, so the
/// produced SQL is reproducible.
pub type FilterSet = BTreeMap<String, SqlValue>;

/// Column name to new value, used for partial updates.
pub type ChangeSet = BTreeMap<String, SqlValue>;

/// A named value bound into a statement.
#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub name: String,
    pub value: SqlValue,
}

impl Param {
    /// Create a new parameter.
    pub fn new(name: impl Into<String>, value: impl Into<SqlValue>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// One page of a result ordered by primary key.
///
/// `index` is 1-based. Both fields are validated on construction, so a
/// `PageSpec` in hand always describes a real window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageSpec {
    index: i64,
    size: i64,
}

impl PageSpec {
    /// Create a page spec, rejecting a non-positive index or size.
    pub fn new(index: i64, size: i64) -> RepoResult<Self> {
        if index <= 0 {
            return Err(RepoError::invalid_argument(format!(
                "page index must be >= 1, got {}",
                index
            )));
        }
        if size <= 0 {
            return Err(RepoError::invalid_argument(format!(
                "page size must be > 0, got {}",
                size
            )));
        }
        Ok(Self { index, size })
    }

    /// Build an optional page spec from two optional parts.
    ///
    /// Both absent means no paging. Exactly one present is rejected instead of
    /// silently returning an unpaged result.
    pub fn from_parts(index: Option<i64>, size: Option<i64>) -> RepoResult<Option<Self>> {
        match (index, size) {
            (None, None) => Ok(None),
            (Some(index), Some(size)) => Self::new(index, size).map(Some),
            (Some(_), None) => Err(RepoError::invalid_argument(
                "page index was given without a page size",
            )),
            (None, Some(_)) => Err(RepoError::invalid_argument(
                "page size was given without a page index",
            )),
        }
    }

    pub fn size(&self) -> i64 {
        self.size
    }

    /// Number of rows skipped before this page: `(index - 1) * size`.
    pub fn offset(&self) -> RepoResult<i64> {
        (self.index - 1).checked_mul(self.size).ok_or_else(|| {
            RepoError::invalid_argument(format!(
                "page {} of size {} overflows the row offset",
                self.index, self.size
            ))
        })
    }
}
