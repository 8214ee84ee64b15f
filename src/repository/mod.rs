//! Generic entity repository.
//!
//! One [`Repository`] serves one table whose rows map to one entity type. It
//! builds parameterized statements for the dialect its provider speaks,
//! acquires a connection per operation and maps rows back with the configured
//! [`RowMapper`].
//!
//! ```ignore
//! let repo = Repository::<Employee>::for_entity(provider)?;
//! let mut filters = FilterSet::new();
//! filters.insert("JobTitle".into(), "Engineer".into());
//! let page = PageSpec::new(2, 10)?;
//! let engineers = repo.get_all_paged(&filters, Some(page)).await?;
//! ```

pub mod mapping;

pub use mapping::{Entity, ParamMapper, RowMapper};

use crate::db::{ConnectionProvider, Row, Statement, StatementBuilder, validate_identifier};
use crate::error::RepoResult;
use crate::models::{ChangeSet, FilterSet, PageSpec, SqlValue};
use std::sync::Arc;
use tracing::{debug, warn};

/// Repository for entities of type `T` in a single table.
///
/// Cloning is cheap; clones share configuration and provider.
pub struct Repository<T> {
    inner: Arc<Inner<T>>,
}

struct Inner<T> {
    provider: Arc<dyn ConnectionProvider>,
    table_name: String,
    primary_key: String,
    row_to_entity: RowMapper<T>,
    entity_to_params: ParamMapper<T>,
}

impl<T> Clone for Repository<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> std::fmt::Debug for Repository<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Repository")
            .field("table_name", &self.inner.table_name)
            .field("primary_key", &self.inner.primary_key)
            .field("db_type", &self.inner.provider.database_type())
            .finish()
    }
}

impl<T: Send + 'static> Repository<T> {
    /// Create a repository over `table_name` keyed by `primary_key`.
    ///
    /// Both names must be valid SQL identifiers.
    pub fn new<R, P>(
        provider: Arc<dyn ConnectionProvider>,
        table_name: impl Into<String>,
        primary_key: impl Into<String>,
        row_to_entity: R,
        entity_to_params: P,
    ) -> RepoResult<Self>
    where
        R: Fn(&Row) -> RepoResult<T> + Send + Sync + 'static,
        P: Fn(&T) -> Vec<(String, SqlValue)> + Send + Sync + 'static,
    {
        let table_name = table_name.into();
        let primary_key = primary_key.into();
        validate_identifier("table name", &table_name)?;
        validate_identifier("primary key", &primary_key)?;

        Ok(Self {
            inner: Arc::new(Inner {
                provider,
                table_name,
                primary_key,
                row_to_entity: Arc::new(row_to_entity),
                entity_to_params: Arc::new(entity_to_params),
            }),
        })
    }

    pub fn table_name(&self) -> &str {
        &self.inner.table_name
    }

    pub fn primary_key(&self) -> &str {
        &self.inner.primary_key
    }

    /// Insert one entity.
    pub async fn add(&self, entity: &T) -> RepoResult<()> {
        let columns = (self.inner.entity_to_params)(entity);
        let statement = self.builder().insert(&columns)?;
        self.execute(&statement, "add").await?;
        Ok(())
    }

    /// Fetch the entity with primary key `id`, or `None` if there is none.
    pub async fn get_by_id(&self, id: impl Into<SqlValue>) -> RepoResult<Option<T>> {
        let statement = self.builder().select_by_id(id.into())?;
        let rows = self.fetch(&statement, "get_by_id").await?;
        rows.first().map(|row| self.map_row(row)).transpose()
    }

    /// Fetch every row, unordered.
    pub async fn get_all(&self) -> RepoResult<Vec<T>> {
        self.get_all_paged(&FilterSet::new(), None).await
    }

    /// Fetch rows matching every filter.
    pub async fn get_all_filtered(&self, filters: &FilterSet) -> RepoResult<Vec<T>> {
        self.get_all_paged(filters, None).await
    }

    /// Fetch rows matching every filter, one page at a time when `page` is set.
    ///
    /// Paged results are ordered by primary key ascending.
    pub async fn get_all_paged(
        &self,
        filters: &FilterSet,
        page: Option<PageSpec>,
    ) -> RepoResult<Vec<T>> {
        let statement = self.builder().select(filters, page.as_ref())?;
        let rows = self.fetch(&statement, "get_all").await?;
        rows.iter().map(|row| self.map_row(row)).collect()
    }

    /// Count rows matching every filter.
    pub async fn count(&self, filters: &FilterSet) -> RepoResult<u64> {
        let statement = self.builder().count(filters)?;
        let rows = self.fetch(&statement, "count").await?;
        match rows.first() {
            Some(row) => row.get_as::<u64>("total"),
            None => Ok(0),
        }
    }

    /// Apply `changes` to the row with primary key `id`.
    ///
    /// Returns the number of rows changed. An empty change set touches nothing
    /// and returns 0.
    pub async fn update(&self, id: impl Into<SqlValue>, changes: &ChangeSet) -> RepoResult<u64> {
        if changes.is_empty() {
            warn!(table = %self.inner.table_name, "Update with no changes skipped");
            return Ok(0);
        }
        let statement = self.builder().update(id.into(), changes)?;
        self.execute(&statement, "update").await
    }

    /// Delete the row with primary key `id`. Returns the number of rows removed.
    pub async fn delete(&self, id: impl Into<SqlValue>) -> RepoResult<u64> {
        let statement = self.builder().delete(id.into())?;
        self.execute(&statement, "delete").await
    }

    fn builder(&self) -> StatementBuilder<'_> {
        StatementBuilder::new(
            self.inner.provider.database_type(),
            &self.inner.table_name,
            &self.inner.primary_key,
        )
    }

    fn map_row(&self, row: &Row) -> RepoResult<T> {
        (self.inner.row_to_entity)(row)
    }

    async fn fetch(&self, statement: &Statement, operation: &str) -> RepoResult<Vec<Row>> {
        debug!(
            table = %self.inner.table_name,
            operation,
            sql = %statement.sql(),
            params = ?statement.param_names(),
            "Running query"
        );
        let mut conn = self.inner.provider.acquire().await?;
        let result = conn.fetch(statement).await;
        drop(conn);
        result.inspect_err(|e| {
            warn!(table = %self.inner.table_name, operation, error = %e, "Query failed");
        })
    }

    async fn execute(&self, statement: &Statement, operation: &str) -> RepoResult<u64> {
        debug!(
            table = %self.inner.table_name,
            operation,
            sql = %statement.sql(),
            params = ?statement.param_names(),
            "Running command"
        );
        let mut conn = self.inner.provider.acquire().await?;
        let result = conn.execute(statement).await;
        drop(conn);
        result.inspect_err(|e| {
            warn!(table = %self.inner.table_name, operation, error = %e, "Command failed");
        })
    }
}

impl<E: Entity> Repository<E> {
    /// Create a repository from `E`'s table mapping.
    pub fn for_entity(provider: Arc<dyn ConnectionProvider>) -> RepoResult<Self> {
        Self::new(
            provider,
            E::TABLE_NAME,
            E::PRIMARY_KEY,
            E::from_row,
            E::to_params,
        )
    }
}
