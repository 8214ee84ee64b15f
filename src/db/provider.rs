//! Connection acquisition and statement execution.
//!
//! The repository never holds a pool or a connection string. It asks a
//! [`ConnectionProvider`] for one [`Connection`] per operation and drops it
//! when the operation ends, which returns it to the pool on every exit path.
//!
//! # Architecture
//!
//! [`SqlxProvider`] wraps a [`DbPool`]. Execution is split into
//! database-specific submodules with parallel structure (`mysql`, `postgres`,
//! `sqlite`), each binding [`SqlValue`]s in placeholder order and decoding
//! rows through [`DecodeRow`].

use crate::db::pool::DbPool;
use crate::db::row::Row;
use crate::db::statement::Statement;
use crate::db::types::DecodeRow;
use crate::db::DatabaseType;
use crate::error::{RepoError, RepoResult};
use crate::models::SqlValue;
use async_trait::async_trait;
use futures_util::{TryStreamExt, future};
use sqlx::pool::PoolConnection;
use std::time::Duration;
use tokio::time::timeout;
use tracing::debug;

/// Source of connections for repository operations.
#[async_trait]
pub trait ConnectionProvider: Send + Sync + 'static {
    /// Check out one connection. Dropping it releases it.
    async fn acquire(&self) -> RepoResult<Box<dyn Connection>>;

    /// SQL dialect spoken by the connections this provider hands out.
    fn database_type(&self) -> DatabaseType;
}

/// One checked-out connection.
#[async_trait]
pub trait Connection: Send {
    /// Run a query and return every row.
    async fn fetch(&mut self, statement: &Statement) -> RepoResult<Vec<Row>>;

    /// Run a command and return the affected row count.
    async fn execute(&mut self, statement: &Statement) -> RepoResult<u64>;
}

/// Provider backed by an sqlx connection pool.
#[derive(Debug, Clone)]
pub struct SqlxProvider {
    pool: DbPool,
    acquire_timeout: Duration,
    statement_timeout: Duration,
}

impl SqlxProvider {
    /// Wrap an existing pool.
    pub fn new(pool: DbPool, acquire_timeout: Duration, statement_timeout: Duration) -> Self {
        Self {
            pool,
            acquire_timeout,
            statement_timeout,
        }
    }

    /// Open a pool for `config` and wrap it.
    pub async fn connect(
        config: &crate::config::DatabaseConfig,
        statement_timeout: Duration,
    ) -> RepoResult<Self> {
        let pool = DbPool::connect(config).await?;
        let acquire_timeout =
            Duration::from_secs(config.pool_options.acquire_timeout_or_default());
        Ok(Self::new(pool, acquire_timeout, statement_timeout))
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    fn acquire_error(&self, err: sqlx::Error) -> RepoError {
        match err {
            sqlx::Error::PoolTimedOut => {
                RepoError::timeout("connection pool acquire", self.acquire_timeout.as_secs())
            }
            other => RepoError::from(other),
        }
    }
}

#[async_trait]
impl ConnectionProvider for SqlxProvider {
    async fn acquire(&self) -> RepoResult<Box<dyn Connection>> {
        let inner = match &self.pool {
            DbPool::MySql(p) => {
                PooledConnection::MySql(p.acquire().await.map_err(|e| self.acquire_error(e))?)
            }
            DbPool::Postgres(p) => {
                PooledConnection::Postgres(p.acquire().await.map_err(|e| self.acquire_error(e))?)
            }
            DbPool::SQLite(p) => {
                PooledConnection::SQLite(p.acquire().await.map_err(|e| self.acquire_error(e))?)
            }
        };
        debug!(db_type = %self.pool.db_type(), "Acquired connection");
        Ok(Box::new(SqlxConnection {
            inner,
            statement_timeout: self.statement_timeout,
        }))
    }

    fn database_type(&self) -> DatabaseType {
        self.pool.db_type()
    }
}

enum PooledConnection {
    MySql(PoolConnection<sqlx::MySql>),
    Postgres(PoolConnection<sqlx::Postgres>),
    SQLite(PoolConnection<sqlx::Sqlite>),
}

/// A pooled sqlx connection; returned to its pool on drop.
struct SqlxConnection {
    inner: PooledConnection,
    statement_timeout: Duration,
}

#[async_trait]
impl Connection for SqlxConnection {
    async fn fetch(&mut self, statement: &Statement) -> RepoResult<Vec<Row>> {
        let limit = self.statement_timeout;
        match &mut self.inner {
            PooledConnection::MySql(conn) => mysql::fetch(conn, statement, limit).await,
            PooledConnection::Postgres(conn) => postgres::fetch(conn, statement, limit).await,
            PooledConnection::SQLite(conn) => sqlite::fetch(conn, statement, limit).await,
        }
    }

    async fn execute(&mut self, statement: &Statement) -> RepoResult<u64> {
        let limit = self.statement_timeout;
        match &mut self.inner {
            PooledConnection::MySql(conn) => mysql::execute(conn, statement, limit).await,
            PooledConnection::Postgres(conn) => postgres::execute(conn, statement, limit).await,
            PooledConnection::SQLite(conn) => sqlite::execute(conn, statement, limit).await,
        }
    }
}

fn timeout_error(operation: &str, limit: Duration) -> RepoError {
    RepoError::timeout(operation, limit.as_secs())
}

// =============================================================================
// Database-Specific Implementations
// =============================================================================
//
// Each module below provides the same interface adapted to its database type.

mod mysql {
    use super::*;
    use sqlx::MySql;
    use sqlx::mysql::MySqlArguments;
    use sqlx::query::Query;

    pub async fn fetch(
        conn: &mut PoolConnection<MySql>,
        statement: &Statement,
        limit: Duration,
    ) -> RepoResult<Vec<Row>> {
        let mut query = sqlx::query(statement.sql());
        for param in statement.params() {
            query = bind_param(query, &param.value);
        }
        let rows = query
            .fetch(&mut **conn)
            .map_err(RepoError::from)
            .and_then(|row| future::ready(row.decode_row()))
            .try_collect::<Vec<_>>();

        match timeout(limit, rows).await {
            Ok(result) => result,
            Err(_) => Err(timeout_error("statement execution", limit)),
        }
    }

    pub async fn execute(
        conn: &mut PoolConnection<MySql>,
        statement: &Statement,
        limit: Duration,
    ) -> RepoResult<u64> {
        let mut query = sqlx::query(statement.sql());
        for param in statement.params() {
            query = bind_param(query, &param.value);
        }
        match timeout(limit, query.execute(&mut **conn)).await {
            Ok(Ok(r)) => Ok(r.rows_affected()),
            Ok(Err(e)) => Err(RepoError::from(e)),
            Err(_) => Err(timeout_error("statement execution", limit)),
        }
    }

    fn bind_param<'q>(
        query: Query<'q, MySql, MySqlArguments>,
        value: &'q SqlValue,
    ) -> Query<'q, MySql, MySqlArguments> {
        match value {
            SqlValue::Null => query.bind(None::<String>),
            SqlValue::Bool(v) => query.bind(*v),
            SqlValue::Int(v) => query.bind(*v),
            SqlValue::Float(v) => query.bind(*v),
            SqlValue::Text(v) => query.bind(v.as_str()),
            SqlValue::Bytes(v) => query.bind(v.as_slice()),
        }
    }
}

mod postgres {
    use super::*;
    use sqlx::Postgres;
    use sqlx::postgres::PgArguments;
    use sqlx::query::Query;

    pub async fn fetch(
        conn: &mut PoolConnection<Postgres>,
        statement: &Statement,
        limit: Duration,
    ) -> RepoResult<Vec<Row>> {
        let mut query = sqlx::query(statement.sql());
        for param in statement.params() {
            query = bind_param(query, &param.value);
        }
        let rows = query
            .fetch(&mut **conn)
            .map_err(RepoError::from)
            .and_then(|row| future::ready(row.decode_row()))
            .try_collect::<Vec<_>>();

        match timeout(limit, rows).await {
            Ok(result) => result,
            Err(_) => Err(timeout_error("statement execution", limit)),
        }
    }

    pub async fn execute(
        conn: &mut PoolConnection<Postgres>,
        statement: &Statement,
        limit: Duration,
    ) -> RepoResult<u64> {
        let mut query = sqlx::query(statement.sql());
        for param in statement.params() {
            query = bind_param(query, &param.value);
        }
        match timeout(limit, query.execute(&mut **conn)).await {
            Ok(Ok(r)) => Ok(r.rows_affected()),
            Ok(Err(e)) => Err(RepoError::from(e)),
            Err(_) => Err(timeout_error("statement execution", limit)),
        }
    }

    fn bind_param<'q>(
        query: Query<'q, Postgres, PgArguments>,
        value: &'q SqlValue,
    ) -> Query<'q, Postgres, PgArguments> {
        match value {
            SqlValue::Null => query.bind(None::<String>),
            SqlValue::Bool(v) => query.bind(*v),
            SqlValue::Int(v) => query.bind(*v),
            SqlValue::Float(v) => query.bind(*v),
            SqlValue::Text(v) => query.bind(v.as_str()),
            SqlValue::Bytes(v) => query.bind(v.as_slice()),
        }
    }
}

mod sqlite {
    use super::*;
    use sqlx::Sqlite;
    use sqlx::query::Query;
    use sqlx::sqlite::SqliteArguments;

    pub async fn fetch(
        conn: &mut PoolConnection<Sqlite>,
        statement: &Statement,
        limit: Duration,
    ) -> RepoResult<Vec<Row>> {
        let mut query = sqlx::query(statement.sql());
        for param in statement.params() {
            query = bind_param(query, &param.value);
        }
        let rows = query
            .fetch(&mut **conn)
            .map_err(RepoError::from)
            .and_then(|row| future::ready(row.decode_row()))
            .try_collect::<Vec<_>>();

        match timeout(limit, rows).await {
            Ok(result) => result,
            Err(_) => Err(timeout_error("statement execution", limit)),
        }
    }

    pub async fn execute(
        conn: &mut PoolConnection<Sqlite>,
        statement: &Statement,
        limit: Duration,
    ) -> RepoResult<u64> {
        let mut query = sqlx::query(statement.sql());
        for param in statement.params() {
            query = bind_param(query, &param.value);
        }
        match timeout(limit, query.execute(&mut **conn)).await {
            Ok(Ok(r)) => Ok(r.rows_affected()),
            Ok(Err(e)) => Err(RepoError::from(e)),
            Err(_) => Err(timeout_error("statement execution", limit)),
        }
    }

    fn bind_param<'q>(
        query: Query<'q, Sqlite, SqliteArguments<'q>>,
        value: &'q SqlValue,
    ) -> Query<'q, Sqlite, SqliteArguments<'q>> {
        match value {
            SqlValue::Null => query.bind(None::<String>),
            SqlValue::Bool(v) => query.bind(*v),
            SqlValue::Int(v) => query.bind(*v),
            SqlValue::Float(v) => query.bind(*v),
            SqlValue::Text(v) => query.bind(v.as_str()),
            SqlValue::Bytes(v) => query.bind(v.as_slice()),
        }
    }
}

/// In-memory provider that records statements and connection lifetimes.
#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    /// Scripted outcome for the next fetch or execute.
    pub(crate) enum Reply {
        Rows(Vec<Row>),
        Affected(u64),
        Fail(RepoError),
    }

    #[derive(Default)]
    struct State {
        acquired: usize,
        released: usize,
        statements: Vec<Statement>,
        replies: VecDeque<Reply>,
        fail_acquire: bool,
    }

    #[derive(Clone)]
    pub(crate) struct FakeProvider {
        dialect: DatabaseType,
        state: Arc<Mutex<State>>,
    }

    impl FakeProvider {
        pub(crate) fn new(dialect: DatabaseType) -> Self {
            Self {
                dialect,
                state: Arc::new(Mutex::new(State::default())),
            }
        }

        pub(crate) fn reply(&self, reply: Reply) -> &Self {
            self.state.lock().unwrap().replies.push_back(reply);
            self
        }

        pub(crate) fn fail_acquire(&self) {
            self.state.lock().unwrap().fail_acquire = true;
        }

        pub(crate) fn acquired(&self) -> usize {
            self.state.lock().unwrap().acquired
        }

        pub(crate) fn released(&self) -> usize {
            self.state.lock().unwrap().released
        }

        pub(crate) fn statements(&self) -> Vec<Statement> {
            self.state.lock().unwrap().statements.clone()
        }

        pub(crate) fn last_statement(&self) -> Statement {
            self.statements()
                .pop()
                .expect("no statement was executed")
        }
    }

    #[async_trait]
    impl ConnectionProvider for FakeProvider {
        async fn acquire(&self) -> RepoResult<Box<dyn Connection>> {
            let mut state = self.state.lock().unwrap();
            if state.fail_acquire {
                return Err(RepoError::connection("pool closed", "reconnect"));
            }
            state.acquired += 1;
            Ok(Box::new(FakeConnection {
                state: Arc::clone(&self.state),
            }))
        }

        fn database_type(&self) -> DatabaseType {
            self.dialect
        }
    }

    struct FakeConnection {
        state: Arc<Mutex<State>>,
    }

    impl FakeConnection {
        fn next(&self, statement: &Statement) -> Option<Reply> {
            let mut state = self.state.lock().unwrap();
            state.statements.push(statement.clone());
            state.replies.pop_front()
        }
    }

    #[async_trait]
    impl Connection for FakeConnection {
        async fn fetch(&mut self, statement: &Statement) -> RepoResult<Vec<Row>> {
            match self.next(statement) {
                Some(Reply::Rows(rows)) => Ok(rows),
                Some(Reply::Fail(err)) => Err(err),
                Some(Reply::Affected(_)) | None => Ok(Vec::new()),
            }
        }

        async fn execute(&mut self, statement: &Statement) -> RepoResult<u64> {
            match self.next(statement) {
                Some(Reply::Affected(n)) => Ok(n),
                Some(Reply::Fail(err)) => Err(err),
                Some(Reply::Rows(_)) | None => Ok(0),
            }
        }
    }

    impl Drop for FakeConnection {
        fn drop(&mut self) {
            if let Ok(mut state) = self.state.lock() {
                state.released += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DatabaseConfig;
    use crate::db::StatementBuilder;
    use crate::models::FilterSet;

    async fn sqlite_provider(dir: &tempfile::TempDir) -> SqlxProvider {
        let url = format!("sqlite:{}", dir.path().join("provider.db").display());
        let config = DatabaseConfig::parse(&url).unwrap();
        SqlxProvider::connect(&config, Duration::from_secs(5))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_execute_and_fetch_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let provider = sqlite_provider(&dir).await;
        assert_eq!(provider.database_type(), DatabaseType::SQLite);

        let mut conn = provider.acquire().await.unwrap();
        let mut ddl = Statement::new(DatabaseType::SQLite);
        ddl.push_sql("CREATE TABLE t (id INTEGER PRIMARY KEY, label TEXT, score REAL, raw BLOB)");
        conn.execute(&ddl).await.unwrap();

        let builder = StatementBuilder::new(DatabaseType::SQLite, "t", "id");
        let insert = builder
            .insert(&[
                ("id".to_string(), SqlValue::Int(1)),
                ("label".to_string(), SqlValue::Null),
                ("score".to_string(), SqlValue::Float(2.5)),
                ("raw".to_string(), SqlValue::Bytes(vec![1, 2])),
            ])
            .unwrap();
        assert_eq!(conn.execute(&insert).await.unwrap(), 1);

        let rows = conn
            .fetch(&builder.select(&FilterSet::new(), None).unwrap())
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("id").unwrap(), &SqlValue::Int(1));
        assert_eq!(rows[0].get("label").unwrap(), &SqlValue::Null);
        assert_eq!(rows[0].get("score").unwrap(), &SqlValue::Float(2.5));
        assert_eq!(rows[0].get("raw").unwrap(), &SqlValue::Bytes(vec![1, 2]));
    }

    #[tokio::test]
    async fn test_store_error_is_classified() {
        let dir = tempfile::tempdir().unwrap();
        let provider = sqlite_provider(&dir).await;
        let mut conn = provider.acquire().await.unwrap();

        let mut stmt = Statement::new(DatabaseType::SQLite);
        stmt.push_sql("SELECT * FROM missing_table");
        let err = conn.fetch(&stmt).await.unwrap_err();
        assert!(matches!(err, RepoError::Store { .. }));
    }

    #[tokio::test]
    async fn test_dropped_connection_returns_to_pool() {
        let dir = tempfile::tempdir().unwrap();
        // Single-connection SQLite pool: a leaked connection would block forever.
        let provider = sqlite_provider(&dir).await;
        for _ in 0..3 {
            let mut conn = provider.acquire().await.unwrap();
            let mut stmt = Statement::new(DatabaseType::SQLite);
            stmt.push_sql("SELECT 1 AS one");
            let rows = conn.fetch(&stmt).await.unwrap();
            assert_eq!(rows[0].get_as::<i64>("one").unwrap(), 1);
        }
    }
}
