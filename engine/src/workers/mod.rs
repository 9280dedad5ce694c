//! Workers
//!
//! The capabilities registered by default: retrieval of a web table,
//! SQL-backed analysis of the working dataset, and chart rendering.

pub mod analysis;
pub mod chart;
pub mod html_table;
pub mod retrieval;
pub mod visualization;

pub use analysis::AnalysisWorker;
pub use retrieval::RetrievalWorker;
pub use visualization::VisualizationWorker;

use std::sync::Arc;

use crate::conductor::CapabilityRegistry;
use crate::config::WorkersConfig;
use crate::llm::LLMProvider;
use sdk::errors::EngineError;

/// Registry holding the three default workers
///
/// `llm` is shared with the analysis worker, which generates its own queries.
pub fn default_registry(
    llm: Arc<dyn LLMProvider>,
    config: &WorkersConfig,
) -> Result<CapabilityRegistry, EngineError> {
    Ok(CapabilityRegistry::builder()
        .register(Arc::new(RetrievalWorker::new(&config.retrieval)))?
        .register(Arc::new(AnalysisWorker::new(llm, &config.analysis)))?
        .register(Arc::new(VisualizationWorker::new(&config.visualization)))?
        .build())
}
