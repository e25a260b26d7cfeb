use thiserror::Error;

#[derive(Error, Debug)]
pub enum SandboxError {
    /// The execution context could not be prepared. Aborts the submission.
    #[error("Environment initialization failed: {0}")]
    Initialization(String),

    /// A single run failed for reasons unrelated to the candidate's program.
    #[error("execution error: {0}")]
    Execution(String),

    #[error("unsupported language: {0}")]
    UnsupportedLanguage(String),

    #[error("execution cancelled")]
    Cancelled,

    #[error("teardown failed: {0}")]
    Teardown(String),
}
