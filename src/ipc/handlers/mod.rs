pub mod core;
pub mod grades;
pub mod plan;
pub mod reports;
pub mod students;
pub mod subjects;
