//! Kernel module - server infrastructure and dependencies.

pub mod deps;
pub mod gemini_ranker;
pub mod jobs;
pub mod openai_ranker;
pub mod test_dependencies;
pub mod traits;

pub use deps::{ranking_client, ServerDeps};
pub use gemini_ranker::{GeminiRanker, GEMINI_2_5_PRO};
pub use openai_ranker::{OpenAiRanker, GPT_4O_MINI};
pub use test_dependencies::{InMemoryDirectory, InMemoryPageStore, MockRankingProvider, TestDependencies};
pub use traits::*;
