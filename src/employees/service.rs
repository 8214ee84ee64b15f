//! Business rules on top of the employee repository.

use super::entity::{Employee, JOB_TITLE, NAME};
use crate::db::ConnectionProvider;
use crate::error::{RepoError, RepoResult};
use crate::models::{ChangeSet, FilterSet, PageSpec};
use crate::repository::Repository;
use std::sync::Arc;
use tracing::info;

/// Employee operations with input validation.
#[derive(Debug, Clone)]
pub struct EmployeeService {
    repository: Repository<Employee>,
}

impl EmployeeService {
    pub fn new(repository: Repository<Employee>) -> Self {
        Self { repository }
    }

    /// Build the service over the `Employees` table.
    pub fn from_provider(provider: Arc<dyn ConnectionProvider>) -> RepoResult<Self> {
        Ok(Self::new(Repository::for_entity(provider)?))
    }

    /// Insert an employee. Name and job title must not be blank.
    pub async fn add(&self, employee: &Employee) -> RepoResult<()> {
        if employee.name.trim().is_empty() {
            return Err(RepoError::invalid_argument("employee name must not be blank"));
        }
        if employee.job_title.trim().is_empty() {
            return Err(RepoError::invalid_argument(
                "employee job title must not be blank",
            ));
        }
        self.repository.add(employee).await?;
        info!(employee_id = employee.employee_id, "Employee added");
        Ok(())
    }

    pub async fn get_by_id(&self, id: i64) -> RepoResult<Option<Employee>> {
        self.repository.get_by_id(id).await
    }

    /// List employees, filtering on whichever of `name` and `job_title` are
    /// non-blank.
    pub async fn get_all(
        &self,
        name: Option<&str>,
        job_title: Option<&str>,
        page: Option<PageSpec>,
    ) -> RepoResult<Vec<Employee>> {
        let filters = non_blank_columns(name, job_title);
        self.repository.get_all_paged(&filters, page).await
    }

    /// Change whichever of `name` and `job_title` are non-blank.
    pub async fn update(
        &self,
        id: i64,
        name: Option<&str>,
        job_title: Option<&str>,
    ) -> RepoResult<u64> {
        let changes: ChangeSet = non_blank_columns(name, job_title);
        self.repository.update(id, &changes).await
    }

    pub async fn delete(&self, id: i64) -> RepoResult<u64> {
        self.repository.delete(id).await
    }

    pub async fn count(&self, name: Option<&str>, job_title: Option<&str>) -> RepoResult<u64> {
        self.repository
            .count(&non_blank_columns(name, job_title))
            .await
    }
}

fn non_blank_columns(name: Option<&str>, job_title: Option<&str>) -> FilterSet {
    [(NAME, name), (JOB_TITLE, job_title)]
        .into_iter()
        .filter_map(|(column, value)| {
            value
                .filter(|v| !v.trim().is_empty())
                .map(|v| (column.to_string(), v.into()))
        })
        .collect()
}
