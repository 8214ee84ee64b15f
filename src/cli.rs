//! Command-line operations on the `Employees` table.

use crate::employees::{Employee, EmployeeService};
use crate::error::{RepoError, RepoResult};
use crate::models::PageSpec;
use clap::Subcommand;
use serde_json::{Value, json};

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Insert an employee
    Add {
        #[arg(long)]
        id: i64,
        #[arg(long)]
        name: String,
        #[arg(long)]
        title: String,
    },
    /// Fetch one employee by id
    Get { id: i64 },
    /// List employees, optionally filtered and paged
    List {
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        title: Option<String>,
        /// 1-based page number; requires --page-size
        #[arg(long)]
        page: Option<i64>,
        #[arg(long)]
        page_size: Option<i64>,
    },
    /// Change an employee's name or title
    Update {
        id: i64,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        title: Option<String>,
    },
    /// Delete an employee by id
    Delete { id: i64 },
    /// Count employees matching the filters
    Count {
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        title: Option<String>,
    },
}

/// Run one command and return its JSON result.
pub async fn run(command: &Command, service: &EmployeeService) -> RepoResult<Value> {
    match command {
        Command::Add { id, name, title } => {
            let employee = Employee::new(*id, name.as_str(), title.as_str());
            service.add(&employee).await?;
            to_json(&employee)
        }
        Command::Get { id } => match service.get_by_id(*id).await? {
            Some(employee) => to_json(&employee),
            None => Ok(json!({ "error": "not found", "id": id })),
        },
        Command::List {
            name,
            title,
            page,
            page_size,
        } => {
            let page = PageSpec::from_parts(*page, *page_size)?;
            let employees = service
                .get_all(name.as_deref(), title.as_deref(), page)
                .await?;
            to_json(&employees)
        }
        Command::Update { id, name, title } => {
            let updated = service
                .update(*id, name.as_deref(), title.as_deref())
                .await?;
            Ok(json!({ "updated": updated }))
        }
        Command::Delete { id } => {
            let deleted = service.delete(*id).await?;
            Ok(json!({ "deleted": deleted }))
        }
        Command::Count { name, title } => {
            let total = service.count(name.as_deref(), title.as_deref()).await?;
            Ok(json!({ "total": total }))
        }
    }
}

fn to_json<T: serde::Serialize>(value: &T) -> RepoResult<Value> {
    serde_json::to_value(value).map_err(|e| RepoError::internal(e.to_string()))
}
