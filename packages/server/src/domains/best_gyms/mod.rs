//! "Best Gyms in ..." pages: ranking, assembly, storage and the jobs that
//! generate them.

pub mod activities;
pub mod assembler;
pub mod fallback;
pub mod jobs;
pub mod models;
pub mod prompts;
pub mod ranking;
pub mod store;

pub use activities::{
    dispatch_batches, dispatch_per_location, generate_batch, generate_page, DispatchSummary, GenerationOutcome,
    GenerationRequest, RankingSource,
};
pub use fallback::fallback_rank;
pub use jobs::{register_best_gyms_jobs, BatchGenerateBestGymsPagesJob, GenerateBestGymsPageJob};
pub use models::{BestGymsPage, IntroSection, PageFilter, PagePayload, UpsertOutcome};
pub use ranking::{BatchRankingInput, RankedResult, RankingClient, RankingKey, RankingTimeouts, MAX_RANKED_GYMS};
pub use store::PgPageStore;
