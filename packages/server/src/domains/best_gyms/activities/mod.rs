//! Best-gyms domain activities - page generation and dispatch

pub mod dispatch;
pub mod generate_batch;
pub mod generate_page;

pub use dispatch::{
    dispatch_batches, dispatch_per_location, resolve_request_locations, DispatchSummary, GenerationRequest,
    DEFAULT_BATCH_SIZE,
};
pub use generate_batch::generate_batch;
pub use generate_page::{generate_page, GenerationOutcome, RankingSource};
