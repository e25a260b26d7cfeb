use std::sync::Arc;

use common::Catalog;

use crate::config::AppConfig;
use crate::engine::Engine;

#[derive(Clone)]
pub struct AppState {
    pub engine: Engine,
    pub catalog: Arc<dyn Catalog>,
    pub config: AppConfig,
}
