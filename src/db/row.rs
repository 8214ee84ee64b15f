//! Driver-neutral fetched rows with read-by-column-name access.

use crate::error::{RepoError, RepoResult};
use crate::models::{FromSqlValue, SqlValue};

/// One fetched row: column names and their decoded values, in select order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    columns: Vec<String>,
    values: Vec<SqlValue>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a row from `(column, value)` pairs.
    pub fn from_pairs<I, C, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (C, V)>,
        C: Into<String>,
        V: Into<SqlValue>,
    {
        let mut row = Self::new();
        for (column, value) in pairs {
            row.push(column, value);
        }
        row
    }

    /// Append a column.
    pub fn push(&mut self, column: impl Into<String>, value: impl Into<SqlValue>) {
        self.columns.push(column.into());
        self.values.push(value.into());
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Read a column by name.
    ///
    /// An exact match wins; otherwise the first ASCII case-insensitive match is
    /// used, since PostgreSQL folds unquoted identifiers to lower case and MySQL
    /// compares them case-insensitively.
    pub fn get(&self, column: &str) -> RepoResult<&SqlValue> {
        let idx = self
            .columns
            .iter()
            .position(|c| c == column)
            .or_else(|| {
                self.columns
                    .iter()
                    .position(|c| c.eq_ignore_ascii_case(column))
            })
            .ok_or_else(|| RepoError::mapping(column, "column not present in row"))?;
        Ok(&self.values[idx])
    }

    /// Read a column and convert it, reporting failures as mapping errors.
    pub fn get_as<V: FromSqlValue>(&self, column: &str) -> RepoResult<V> {
        let value = self.get(column)?;
        V::from_sql_value(value).map_err(|message| RepoError::mapping(column, message))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Row {
        Row::from_pairs([
            ("employeeid", SqlValue::Int(1)),
            ("name", SqlValue::from("Ann")),
            ("jobtitle", SqlValue::Null),
        ])
    }

    #[test]
    fn test_get_case_insensitive() {
        let row = sample();
        assert_eq!(row.get("EmployeeID").unwrap(), &SqlValue::Int(1));
        assert_eq!(row.get_as::<String>("Name").unwrap(), "Ann");
        assert_eq!(row.len(), 3);
    }

    #[test]
    fn test_exact_match_preferred() {
        let row = Row::from_pairs([("ID", SqlValue::Int(1)), ("id", SqlValue::Int(2))]);
        assert_eq!(row.get_as::<i64>("id").unwrap(), 2);
        assert_eq!(row.get_as::<i64>("ID").unwrap(), 1);
    }

    #[test]
    fn test_missing_column_is_mapping_error() {
        let err = sample().get("Salary").unwrap_err();
        assert!(matches!(err, RepoError::Mapping { ref column, .. } if column == "Salary"));
    }

    #[test]
    fn test_null_in_non_nullable_is_mapping_error() {
        let row = sample();
        assert!(matches!(
            row.get_as::<String>("JobTitle"),
            Err(RepoError::Mapping { .. })
        ));
        assert_eq!(row.get_as::<Option<String>>("JobTitle").unwrap(), None);
    }
}
