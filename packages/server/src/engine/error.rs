use thiserror::Error;
use uuid::Uuid;

use common::CatalogError;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    #[error("invalid submission: {0}")]
    InvalidSubmission(String),

    #[error("submission queue is full (capacity {capacity})")]
    CapacityExceeded { capacity: usize },

    #[error("not found: {0}")]
    NotFound(String),

    #[error("report for submission {0} is already finalized")]
    AlreadyFinalized(Uuid),

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<CatalogError> for EngineError {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::NotFound(id) => EngineError::NotFound(format!("Problem '{id}' not found")),
        }
    }
}
