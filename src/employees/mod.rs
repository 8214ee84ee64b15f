//! The `Employees` table and its service layer.

pub mod entity;
pub mod service;

pub use entity::Employee;
pub use service::EmployeeService;
