use crate::db::Row;
use crate::error::RepoResult;
use crate::models::SqlValue;
use crate::repository::Entity;
use serde::Serialize;

pub const TABLE: &str = "Employees";
pub const EMPLOYEE_ID: &str = "EmployeeID";
pub const NAME: &str = "Name";
pub const JOB_TITLE: &str = "JobTitle";

/// One row of `Employees`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Employee {
    pub employee_id: i64,
    pub name: String,
    pub job_title: String,
}

impl Employee {
    pub fn new(employee_id: i64, name: impl Into<String>, job_title: impl Into<String>) -> Self {
        Self {
            employee_id,
            name: name.into(),
            job_title: job_title.into(),
        }
    }
}

impl Entity for Employee {
    const TABLE_NAME: &'static str = TABLE;
    const PRIMARY_KEY: &'static str = EMPLOYEE_ID;

    fn from_row(row: &Row) -> RepoResult<Self> {
        Ok(Self {
            employee_id: row.get_as(EMPLOYEE_ID)?,
            name: row.get_as(NAME)?,
            job_title: row.get_as(JOB_TITLE)?,
        })
    }

    fn to_params(&self) -> Vec<(String, SqlValue)> {
        vec![
            (EMPLOYEE_ID.to_string(), SqlValue::Int(self.employee_id)),
            (NAME.to_string(), SqlValue::from(self.name.as_str())),
            (JOB_TITLE.to_string(), SqlValue::from(self.job_title.as_str())),
        ]
    }
}
