pub mod cost_model;
pub mod rubric;

pub use cost_model::{CodeSignals, SourceFamily};
pub use rubric::assess;
