//! SQL dialect differences between the supported backends.
//!
//! Only the pieces the repository actually emits vary by backend: the
//! placeholder syntax and the windowing clause used for paging.

use serde::Serialize;

/// Supported database types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseType {
    PostgreSQL,
    /// Includes MariaDB
    MySQL,
    SQLite,
}

impl DatabaseType {
    /// Parse database type from a connection string.
    pub fn from_connection_string(connection_string: &str) -> Option<Self> {
        let lower = connection_string.to_lowercase();
        if lower.starts_with("postgres://") || lower.starts_with("postgresql://") {
            Some(Self::PostgreSQL)
        } else if lower.starts_with("mysql://") || lower.starts_with("mariadb://") {
            Some(Self::MySQL)
        } else if lower.starts_with("sqlite://") || lower.starts_with("sqlite:") {
            Some(Self::SQLite)
        } else {
            None
        }
    }

    /// Get the display name for this database type.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::PostgreSQL => "PostgreSQL",
            Self::MySQL => "MySQL",
            Self::SQLite => "SQLite",
        }
    }

    /// Render the placeholder for the 1-based bind position.
    pub fn placeholder(&self, position: usize) -> String {
        match self {
            Self::PostgreSQL => format!("${}", position),
            Self::MySQL | Self::SQLite => "?".to_string(),
        }
    }

    /// Whether the windowing clause binds the offset before the page size.
    pub fn offset_first(&self) -> bool {
        matches!(self, Self::PostgreSQL)
    }

    /// Render the windowing clause from already-rendered placeholders.
    pub fn window_clause(&self, offset: &str, size: &str) -> String {
        match self {
            Self::PostgreSQL => format!("OFFSET {} ROWS FETCH NEXT {} ROWS ONLY", offset, size),
            Self::MySQL | Self::SQLite => format!("LIMIT {} OFFSET {}", size, offset),
        }
    }
}

impl std::fmt::Display for DatabaseType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}
