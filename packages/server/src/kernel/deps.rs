//! Server dependencies for jobs and handlers (using traits for testability)
//!
//! This module provides the central dependency container used by the
//! best-gyms pipeline. All external services use trait abstractions to
//! enable testing.

use std::sync::Arc;

use sqlx::PgPool;
use tracing::{info, warn};

use crate::config::{Config, RankingConfig, RankingProviderKind};
use crate::domains::best_gyms::store::PgPageStore;
use crate::domains::best_gyms::RankingClient;
use crate::domains::directory::{DirectoryReader, PgDirectory, QualityGate};
use crate::kernel::{BaseDirectory, BasePageStore, BaseRankingProvider, GeminiRanker, OpenAiRanker, RankingError};

// =============================================================================
// ServerDeps
// =============================================================================

/// Dependencies accessible to jobs and HTTP handlers
#[derive(Clone)]
pub struct ServerDeps {
    pub directory: Arc<dyn BaseDirectory>,
    pub pages: Arc<dyn BasePageStore>,
    pub ranking: Arc<RankingClient>,
    pub quality_gate: QualityGate,
}

impl ServerDeps {
    pub fn new(
        directory: Arc<dyn BaseDirectory>,
        pages: Arc<dyn BasePageStore>,
        ranking: Arc<RankingClient>,
        quality_gate: QualityGate,
    ) -> Self {
        Self {
            directory,
            pages,
            ranking,
            quality_gate,
        }
    }

    /// Wire Postgres-backed stores and the configured ranking provider.
    pub fn from_config(config: &Config, pool: PgPool) -> Self {
        Self::new(
            Arc::new(PgDirectory::new(pool.clone())),
            Arc::new(PgPageStore::new(pool)),
            Arc::new(ranking_client(&config.ranking)),
            config.quality_gate,
        )
    }

    /// Candidate and profile reads with this deployment's quality gate.
    pub fn reader(&self) -> DirectoryReader<'_> {
        DirectoryReader::new(self.directory.as_ref(), self.quality_gate)
    }
}

/// Build the ranking client; missing or unusable credentials disable ranking.
pub fn ranking_client(config: &RankingConfig) -> RankingClient {
    let Some(api_key) = config.api_key.as_deref() else {
        info!(provider = ?config.provider, "no ranking API key configured, pages will use local rating order");
        return RankingClient::disabled();
    };

    match ranking_provider(config.provider, api_key, config.model.as_deref()) {
        Ok(provider) => {
            info!(provider = provider.name(), "ranking provider configured");
            RankingClient::new(provider, config.timeouts)
        }
        Err(e) => {
            warn!(error = %e, "ranking provider unavailable, pages will use local rating order");
            RankingClient::disabled()
        }
    }
}

fn ranking_provider(
    kind: RankingProviderKind,
    api_key: &str,
    model: Option<&str>,
) -> Result<Arc<dyn BaseRankingProvider>, RankingError> {
    let provider: Arc<dyn BaseRankingProvider> = match kind {
        RankingProviderKind::OpenAi => {
            let ranker = OpenAiRanker::new(api_key)?;
            Arc::new(match model {
                Some(model) => ranker.with_model(model),
                None => ranker,
            })
        }
        RankingProviderKind::Gemini => {
            let ranker = GeminiRanker::new(api_key)?;
            Arc::new(match model {
                Some(model) => ranker.with_model(model),
                None => ranker,
            })
        }
    };
    Ok(provider)
}
