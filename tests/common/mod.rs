//! Shared setup for SQLite-backed integration tests.

#![allow(dead_code)]

use entity_repository::config::DatabaseConfig;
use entity_repository::db::{DbPool, SqlxProvider};
use entity_repository::employees::{Employee, EmployeeService};
use entity_repository::repository::Repository;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

pub const CREATE_EMPLOYEES: &str = "CREATE TABLE Employees (
    EmployeeID INTEGER PRIMARY KEY,
    Name TEXT NOT NULL,
    JobTitle TEXT NOT NULL
)";

/// A SQLite database in a temporary directory. The directory (and the
/// database file) is removed when this is dropped.
pub struct TestDb {
    pub provider: Arc<SqlxProvider>,
    _dir: TempDir,
}

impl TestDb {
    /// Create a database with an empty `Employees` table. `options` is
    /// appended to the URL query string, e.g. `"max_connections=4"`.
    pub async fn new(options: &str) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let mut url = format!("sqlite:{}", dir.path().join("test.db").display());
        if !options.is_empty() {
            url.push('?');
            url.push_str(options);
        }
        let config = DatabaseConfig::parse(&url).unwrap();
        let provider = SqlxProvider::connect(&config, Duration::from_secs(10))
            .await
            .unwrap();

        let db = Self {
            provider: Arc::new(provider),
            _dir: dir,
        };
        db.exec(CREATE_EMPLOYEES).await;
        db
    }

    /// Run raw DDL or seed SQL directly on the pool.
    pub async fn exec(&self, sql: &str) {
        match self.provider.pool() {
            DbPool::SQLite(pool) => {
                sqlx::query(sql).execute(pool).await.unwrap();
            }
            other => panic!("expected a SQLite pool, got {:?}", other.db_type()),
        }
    }

    pub fn employees(&self) -> Repository<Employee> {
        Repository::for_entity(self.provider.clone()).unwrap()
    }

    pub fn service(&self) -> EmployeeService {
        EmployeeService::from_provider(self.provider.clone()).unwrap()
    }
}

/// Insert `count` employees with ids `first..first + count`, all with `title`.
pub async fn seed(repo: &Repository<Employee>, first: i64, count: i64, title: &str) {
    for id in first..first + count {
        repo.add(&Employee::new(id, format!("Employee {}", id), title))
            .await
            .unwrap();
    }
}
