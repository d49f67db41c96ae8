use std::sync::Arc;

use crate::catalog::VehicleCatalog;
use crate::contract::{ContractPipeline, Views};

/// Shared, read-only application state handed to every handler.
pub struct AppState {
    pub catalog: Arc<VehicleCatalog>,
    pub pipeline: ContractPipeline,
    pub views: Views,
}

impl AppState {
    pub fn new(pipeline: ContractPipeline) -> Result<Self, tera::Error> {
        Ok(Self {
            catalog: pipeline.catalog(),
            pipeline,
            views: Views::new()?,
        })
    }
}
