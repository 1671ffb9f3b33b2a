//! Read-only view over gyms, their addresses and reviews.

pub mod candidates;
pub mod models;
pub mod reader;
pub mod snapshot;
pub mod store;

pub use candidates::{aggregate_candidates, apply_gate, CandidateGym, QualityGate, RankingCandidate, RatingSummary};
pub use models::{Location, LocationKind};
pub use reader::{ranking_pool, DirectoryReader, LocationFilter};
pub use snapshot::{AddressSnapshot, GymSnapshot, MediaSnapshot};
pub use store::PgDirectory;
