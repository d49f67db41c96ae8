//! Contract module - the rental form and the pipeline behind it.

pub mod handlers;
pub mod models;
pub mod multipart_parser;
pub mod pipeline;
pub mod views;

pub use models::{
    build_render_context, ContractOutcome, ContractSubmission, DeliveryStatus, RentalPeriod,
    RentalRequest, UserInputError,
};
pub use pipeline::{ContractPipeline, PipelineError, PipelineSettings, PreparedDocuments};
pub use views::Views;
