pub mod catalog;
pub mod complexity;
pub mod config;
pub mod event;
pub mod feedback;
pub mod hook;
pub mod problem;
pub mod report;
pub mod submission;
pub mod submission_status;

pub use catalog::{Catalog, CatalogError};
pub use complexity::ComplexityClass;
pub use config::{EngineConfig, Isolation, SandboxBackend, SandboxConfig};
pub use feedback::{FeedbackAssessment, OverallRating};
pub use problem::{ComplexityReference, Difficulty, Example, Problem, TestCase};
pub use report::{CaseOutcome, CaseResult, SubmissionReport};
pub use submission::{NewSubmission, Submission};
pub use submission_status::SubmissionState;
