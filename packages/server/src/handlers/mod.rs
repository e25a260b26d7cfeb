pub mod problem;
pub mod submission;
