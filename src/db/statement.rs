//! SQL statement construction for repository operations.
//!
//! Identifiers (table and column names) are validated and written into the SQL
//! text. Every value is bound as a parameter. Parameter names are namespaced
//! per clause so that a filter on the primary-key column can never collide
//! with the primary-key parameter itself. Column parameters also carry their
//! 1-based position in the clause, so `e.Name` and `e_Name` stay distinct:
//!
//! | Clause            | Parameter name   |
//! |-------------------|------------------|
//! | primary key       | `pk`             |
//! | WHERE filters     | `w<n>_<column>`  |
//! | UPDATE SET        | `s<n>_<column>`  |
//! | INSERT VALUES     | `v<n>_<column>`  |
//! | paging window     | `page_offset`, `page_size` |
//!
//! Binding is positional in placeholder order; the names travel with the
//! values for uniqueness checks and logging.

use crate::db::DatabaseType;
use crate::error::{RepoError, RepoResult};
use crate::models::{ChangeSet, FilterSet, PageSpec, Param, SqlValue};

const PK_PARAM: &str = "pk";
const PAGE_OFFSET_PARAM: &str = "page_offset";
const PAGE_SIZE_PARAM: &str = "page_size";

/// A SQL statement with its bound parameters, in placeholder order.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    dialect: DatabaseType,
    sql: String,
    params: Vec<Param>,
}

impl Statement {
    /// Create an empty statement for a dialect.
    pub fn new(dialect: DatabaseType) -> Self {
        Self {
            dialect,
            sql: String::new(),
            params: Vec::new(),
        }
    }

    /// Append raw SQL text. Callers must only pass validated identifiers and
    /// keywords here, never values.
    pub fn push_sql(&mut self, sql: &str) -> &mut Self {
        self.sql.push_str(sql);
        self
    }

    /// Bind a value under a unique name and return its placeholder.
    pub fn bind(&mut self, name: impl Into<String>, value: SqlValue) -> RepoResult<String> {
        let name = name.into();
        if self.params.iter().any(|p| p.name == name) {
            return Err(RepoError::invalid_argument(format!(
                "parameter '{}' is bound twice in one statement",
                name
            )));
        }
        self.params.push(Param { name, value });
        Ok(self.dialect.placeholder(self.params.len()))
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn params(&self) -> &[Param] {
        &self.params
    }

    /// Parameter names in bind order (safe to log, unlike the values).
    pub fn param_names(&self) -> Vec<&str> {
        self.params.iter().map(|p| p.name.as_str()).collect()
    }
}

/// Check that `name` is a plain or dotted SQL identifier.
///
/// Identifiers end up in SQL text, so anything outside
/// `[A-Za-z_][A-Za-z0-9_]*(\.[A-Za-z_][A-Za-z0-9_]*)*` is rejected. This does not
/// check that the table or column exists.
pub fn validate_identifier(kind: &str, name: &str) -> RepoResult<()> {
    if name.is_empty() {
        return Err(RepoError::invalid_argument(format!(
            "{} must not be empty",
            kind
        )));
    }
    let valid = name.split('.').all(|segment| {
        let mut chars = segment.chars();
        match chars.next() {
            Some(c) if c.is_ascii_alphabetic() || c == '_' => {
                chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
            }
            _ => false,
        }
    });
    if !valid {
        return Err(RepoError::invalid_argument(format!(
            "{} '{}' is not a valid SQL identifier",
            kind, name
        )));
    }
    Ok(())
}

fn column_param(prefix: &str, position: usize, column: &str) -> String {
    format!("{}{}_{}", prefix, position + 1, column.replace('.', "_"))
}

/// Builds statements against one table with a fixed primary key.
#[derive(Debug, Clone, Copy)]
pub struct StatementBuilder<'a> {
    dialect: DatabaseType,
    table: &'a str,
    primary_key: &'a str,
}

impl<'a> StatementBuilder<'a> {
    /// Create a builder. `table` and `primary_key` must already be validated.
    pub fn new(dialect: DatabaseType, table: &'a str, primary_key: &'a str) -> Self {
        Self {
            dialect,
            table,
            primary_key,
        }
    }

    /// `INSERT INTO t (c1, c2) VALUES (:v1_c1, :v2_c2)`
    pub fn insert(&self, columns: &[(String, SqlValue)]) -> RepoResult<Statement> {
        if columns.is_empty() {
            return Err(RepoError::invalid_argument(format!(
                "cannot insert into {} without any columns",
                self.table
            )));
        }

        let mut stmt = Statement::new(self.dialect);
        let mut names = Vec::with_capacity(columns.len());
        let mut placeholders = Vec::with_capacity(columns.len());
        for (position, (column, value)) in columns.iter().enumerate() {
            validate_identifier("insert column", column)?;
            placeholders.push(stmt.bind(column_param("v", position, column), value.clone())?);
            names.push(column.as_str());
        }

        stmt.push_sql(&format!(
            "INSERT INTO {} ({}) VALUES ({})",
            self.table,
            names.join(", "),
            placeholders.join(", ")
        ));
        Ok(stmt)
    }

    /// `SELECT * FROM t WHERE pk = :pk`
    pub fn select_by_id(&self, id: SqlValue) -> RepoResult<Statement> {
        let mut stmt = Statement::new(self.dialect);
        let pk = stmt.bind(PK_PARAM, id)?;
        stmt.push_sql(&format!(
            "SELECT * FROM {} WHERE {} = {}",
            self.table, self.primary_key, pk
        ));
        Ok(stmt)
    }

    /// `SELECT * FROM t [WHERE ...] [ORDER BY pk ASC <window>]`
    pub fn select(&self, filters: &FilterSet, page: Option<&PageSpec>) -> RepoResult<Statement> {
        let mut stmt = Statement::new(self.dialect);
        stmt.push_sql(&format!("SELECT * FROM {}", self.table));
        self.push_where(&mut stmt, filters)?;

        if let Some(page) = page {
            let offset = SqlValue::Int(page.offset()?);
            let size = SqlValue::Int(page.size());
            let window = if self.dialect.offset_first() {
                let offset = stmt.bind(PAGE_OFFSET_PARAM, offset)?;
                let size = stmt.bind(PAGE_SIZE_PARAM, size)?;
                self.dialect.window_clause(&offset, &size)
            } else {
                let size = stmt.bind(PAGE_SIZE_PARAM, size)?;
                let offset = stmt.bind(PAGE_OFFSET_PARAM, offset)?;
                self.dialect.window_clause(&offset, &size)
            };
            stmt.push_sql(&format!(" ORDER BY {} ASC {}", self.primary_key, window));
        }
        Ok(stmt)
    }

    /// `SELECT COUNT(*) AS total FROM t [WHERE ...]`
    pub fn count(&self, filters: &FilterSet) -> RepoResult<Statement> {
        let mut stmt = Statement::new(self.dialect);
        stmt.push_sql(&format!("SELECT COUNT(*) AS total FROM {}", self.table));
        self.push_where(&mut stmt, filters)?;
        Ok(stmt)
    }

    /// `UPDATE t SET c1 = :s1_c1, ... WHERE pk = :pk`
    ///
    /// An empty change set is rejected here; an UPDATE with an empty SET list
    /// is never produced.
    pub fn update(&self, id: SqlValue, changes: &ChangeSet) -> RepoResult<Statement> {
        if changes.is_empty() {
            return Err(RepoError::invalid_argument(format!(
                "cannot update {} with an empty change set",
                self.table
            )));
        }

        let mut stmt = Statement::new(self.dialect);
        let mut assignments = Vec::with_capacity(changes.len());
        for (position, (column, value)) in changes.iter().enumerate() {
            validate_identifier("update column", column)?;
            let placeholder = stmt.bind(column_param("s", position, column), value.clone())?;
            assignments.push(format!("{} = {}", column, placeholder));
        }
        let pk = stmt.bind(PK_PARAM, id)?;

        stmt.push_sql(&format!(
            "UPDATE {} SET {} WHERE {} = {}",
            self.table,
            assignments.join(", "),
            self.primary_key,
            pk
        ));
        Ok(stmt)
    }

    /// `DELETE FROM t WHERE pk = :pk`
    pub fn delete(&self, id: SqlValue) -> RepoResult<Statement> {
        let mut stmt = Statement::new(self.dialect);
        let pk = stmt.bind(PK_PARAM, id)?;
        stmt.push_sql(&format!(
            "DELETE FROM {} WHERE {} = {}",
            self.table, self.primary_key, pk
        ));
        Ok(stmt)
    }

    fn push_where(&self, stmt: &mut Statement, filters: &FilterSet) -> RepoResult<()> {
        if filters.is_empty() {
            return Ok(());
        }
        let mut clauses = Vec::with_capacity(filters.len());
        for (position, (column, value)) in filters.iter().enumerate() {
            validate_identifier("filter column", column)?;
            let placeholder = stmt.bind(column_param("w", position, column), value.clone())?;
            clauses.push(format!("{} = {}", column, placeholder));
        }
        stmt.push_sql(" WHERE ");
        stmt.push_sql(&clauses.join(" AND "));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn builder(dialect: DatabaseType) -> StatementBuilder<'static> {
        StatementBuilder::new(dialect, "Employees", "EmployeeID")
    }

    fn filters(pairs: &[(&str, SqlValue)]) -> FilterSet {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_insert_sql() {
        let stmt = builder(DatabaseType::PostgreSQL)
            .insert(&[
                ("EmployeeID".to_string(), SqlValue::Int(1)),
                ("Name".to_string(), "Ann".into()),
            ])
            .unwrap();
        assert_eq!(
            stmt.sql(),
            "INSERT INTO Employees (EmployeeID, Name) VALUES ($1, $2)"
        );
        assert_eq!(stmt.param_names(), vec!["v1_EmployeeID", "v2_Name"]);
    }

    #[test]
    fn test_insert_requires_columns() {
        let result = builder(DatabaseType::SQLite).insert(&[]);
        assert!(matches!(result, Err(RepoError::InvalidArgument { .. })));
    }

    #[test]
    fn test_select_by_id_sql() {
        let stmt = builder(DatabaseType::SQLite)
            .select_by_id(SqlValue::Int(7))
            .unwrap();
        assert_eq!(stmt.sql(), "SELECT * FROM Employees WHERE EmployeeID = ?");
        assert_eq!(stmt.params(), &[Param::new("pk", 7i64)]);
    }

    #[test]
    fn test_select_without_filters_has_no_where_or_order() {
        let stmt = builder(DatabaseType::MySQL)
            .select(&FilterSet::new(), None)
            .unwrap();
        assert_eq!(stmt.sql(), "SELECT * FROM Employees");
        assert!(stmt.params().is_empty());
    }

    #[test]
    fn test_select_filters_sorted_conjunction() {
        let stmt = builder(DatabaseType::PostgreSQL)
            .select(
                &filters(&[("Name", "Ann".into()), ("JobTitle", "Eng".into())]),
                None,
            )
            .unwrap();
        assert_eq!(
            stmt.sql(),
            "SELECT * FROM Employees WHERE JobTitle = $1 AND Name = $2"
        );
        assert_eq!(stmt.param_names(), vec!["w1_JobTitle", "w2_Name"]);
    }

    #[test]
    fn test_select_paged_postgres() {
        let page = PageSpec::new(3, 10).unwrap();
        let stmt = builder(DatabaseType::PostgreSQL)
            .select(&filters(&[("JobTitle", "Eng".into())]), Some(&page))
            .unwrap();
        assert_eq!(
            stmt.sql(),
            "SELECT * FROM Employees WHERE JobTitle = $1 ORDER BY EmployeeID ASC OFFSET $2 ROWS FETCH NEXT $3 ROWS ONLY"
        );
        assert_eq!(
            stmt.params(),
            &[
                Param::new("w1_JobTitle", "Eng"),
                Param::new("page_offset", 20i64),
                Param::new("page_size", 10i64),
            ]
        );
    }

    #[test]
    fn test_select_paged_sqlite_binds_size_first() {
        let page = PageSpec::new(2, 5).unwrap();
        let stmt = builder(DatabaseType::SQLite)
            .select(&FilterSet::new(), Some(&page))
            .unwrap();
        assert_eq!(
            stmt.sql(),
            "SELECT * FROM Employees ORDER BY EmployeeID ASC LIMIT ? OFFSET ?"
        );
        assert_eq!(
            stmt.params(),
            &[Param::new("page_size", 5i64), Param::new("page_offset", 5i64)]
        );
    }

    #[test]
    fn test_filter_on_primary_key_does_not_collide() {
        let changes = filters(&[("EmployeeID", SqlValue::Int(2)), ("Name", "Bob".into())]);
        let stmt = builder(DatabaseType::SQLite)
            .update(SqlValue::Int(1), &changes)
            .unwrap();
        assert_eq!(
            stmt.sql(),
            "UPDATE Employees SET EmployeeID = ?, Name = ? WHERE EmployeeID = ?"
        );
        assert_eq!(stmt.param_names(), vec!["s1_EmployeeID", "s2_Name", "pk"]);

        let stmt = builder(DatabaseType::SQLite)
            .select(&filters(&[("EmployeeID", SqlValue::Int(1))]), None)
            .unwrap();
        assert_eq!(stmt.param_names(), vec!["w1_EmployeeID"]);
    }

    #[test]
    fn test_dotted_and_underscored_filters_get_distinct_names() {
        let stmt = builder(DatabaseType::PostgreSQL)
            .select(
                &filters(&[("e.Name", "Ann".into()), ("e_Name", "Bob".into())]),
                None,
            )
            .unwrap();
        assert_eq!(
            stmt.sql(),
            "SELECT * FROM Employees WHERE e.Name = $1 AND e_Name = $2"
        );
        assert_eq!(stmt.param_names(), vec!["w1_e_Name", "w2_e_Name"]);

        let stmt = builder(DatabaseType::SQLite)
            .update(
                SqlValue::Int(1),
                &filters(&[("e.Name", "Ann".into()), ("e_Name", "Bob".into())]),
            )
            .unwrap();
        assert_eq!(stmt.param_names(), vec!["s1_e_Name", "s2_e_Name", "pk"]);
    }

    #[test]
    fn test_update_rejects_empty_changes() {
        let result = builder(DatabaseType::PostgreSQL).update(SqlValue::Int(1), &ChangeSet::new());
        assert!(matches!(result, Err(RepoError::InvalidArgument { .. })));
    }

    #[test]
    fn test_update_postgres_numbering() {
        let stmt = builder(DatabaseType::PostgreSQL)
            .update(SqlValue::Int(9), &filters(&[("JobTitle", "Lead".into())]))
            .unwrap();
        assert_eq!(
            stmt.sql(),
            "UPDATE Employees SET JobTitle = $1 WHERE EmployeeID = $2"
        );
    }

    #[test]
    fn test_delete_and_count_sql() {
        let stmt = builder(DatabaseType::MySQL)
            .delete(SqlValue::Int(4))
            .unwrap();
        assert_eq!(stmt.sql(), "DELETE FROM Employees WHERE EmployeeID = ?");

        let stmt = builder(DatabaseType::PostgreSQL)
            .count(&filters(&[("Name", "Ann".into())]))
            .unwrap();
        assert_eq!(
            stmt.sql(),
            "SELECT COUNT(*) AS total FROM Employees WHERE Name = $1"
        );
    }

    #[test]
    fn test_values_never_reach_sql_text() {
        let hostile = "x'; DROP TABLE Employees; --";
        let stmt = builder(DatabaseType::SQLite)
            .select(&filters(&[("Name", hostile.into())]), None)
            .unwrap();
        assert!(!stmt.sql().contains("DROP"));
        assert_eq!(stmt.params()[0].value, SqlValue::from(hostile));
    }

    #[test]
    fn test_invalid_identifiers_rejected() {
        assert!(validate_identifier("table name", "").is_err());
        assert!(validate_identifier("table name", "Employees; DROP").is_err());
        assert!(validate_identifier("table name", "1abc").is_err());
        assert!(validate_identifier("table name", "dbo.").is_err());
        assert!(validate_identifier("table name", "dbo.Employees").is_ok());
        assert!(validate_identifier("column", "_private_1").is_ok());

        let result = builder(DatabaseType::SQLite)
            .select(&filters(&[("Name = 1 OR 1", SqlValue::Int(1))]), None);
        assert!(matches!(result, Err(RepoError::InvalidArgument { .. })));
    }

    #[test]
    fn test_duplicate_param_rejected() {
        let mut stmt = Statement::new(DatabaseType::SQLite);
        stmt.bind("pk", SqlValue::Int(1)).unwrap();
        assert!(stmt.bind("pk", SqlValue::Int(2)).is_err());
    }
}
