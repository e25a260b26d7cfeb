use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

use crate::problem::Problem;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CatalogError {
    #[error("problem not found: {0}")]
    NotFound(String),
}

/// Read-only supplier of published problems.
#[async_trait]
pub trait Catalog: Send + Sync {
    /// Look up a problem by id.
    async fn get_problem(&self, problem_id: &str) -> Result<Arc<Problem>, CatalogError>;

    /// All published problems, ordered by id.
    async fn list_problems(&self) -> Vec<Arc<Problem>>;
}
