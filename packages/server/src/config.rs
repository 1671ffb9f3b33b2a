use anyhow::{bail, Context, Result};
use dotenvy::dotenv;
use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::domains::best_gyms::RankingTimeouts;
use crate::domains::directory::QualityGate;

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    pub ranking: RankingConfig,
    pub quality_gate: QualityGate,
    /// Queue that CLI dispatchers target when `--queue-name` is not given
    pub job_queue_name: String,
}

/// Which text-generation backend ranks candidates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RankingProviderKind {
    OpenAi,
    Gemini,
}

impl FromStr for RankingProviderKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "openai" | "open_ai" => Ok(Self::OpenAi),
            "gemini" | "google" => Ok(Self::Gemini),
            other => bail!("unknown RANKING_PROVIDER '{}' (expected openai or gemini)", other),
        }
    }
}

/// Ranking service settings.
///
/// `api_key` is `None` when no credential is configured; the pipeline then
/// skips the external call and ranks by local rating.
#[derive(Debug, Clone)]
pub struct RankingConfig {
    pub provider: RankingProviderKind,
    pub api_key: Option<String>,
    pub model: Option<String>,
    pub timeouts: RankingTimeouts,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (development)
        let _ = dotenv();

        let provider: RankingProviderKind = env::var("RANKING_PROVIDER")
            .unwrap_or_else(|_| "openai".to_string())
            .parse()?;

        let api_key = match provider {
            RankingProviderKind::OpenAi => non_empty_var("OPENAI_API_KEY")
                .or_else(|| non_empty_var("OPEN_AI_KEY")),
            RankingProviderKind::Gemini => non_empty_var("GEMINI_API_KEY"),
        };

        let defaults = RankingTimeouts::default();
        let timeouts = RankingTimeouts {
            single: parse_secs("RANKING_TIMEOUT_SECS", defaults.single)?,
            batch: parse_secs("RANKING_BATCH_TIMEOUT_SECS", defaults.batch)?,
        };

        let gate_enabled = env::var("BEST_GYMS_QUALITY_GATE")
            .map(|v| !matches!(v.trim().to_ascii_lowercase().as_str(), "0" | "false" | "off" | "no"))
            .unwrap_or(true);

        let quality_gate = if gate_enabled {
            QualityGate::Threshold {
                min_reviews: parse_or("BEST_GYMS_MIN_REVIEWS", QualityGate::STANDARD_MIN_REVIEWS)?,
                min_rating: parse_or("BEST_GYMS_MIN_RATING", QualityGate::STANDARD_MIN_RATING)?,
            }
        } else {
            QualityGate::Disabled
        };

        Ok(Self {
            database_url: env::var("DATABASE_URL").context("DATABASE_URL must be set")?,
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .context("PORT must be a valid number")?,
            ranking: RankingConfig {
                provider,
                api_key,
                model: non_empty_var("RANKING_MODEL"),
                timeouts,
            },
            quality_gate,
            job_queue_name: non_empty_var("JOB_QUEUE_NAME").unwrap_or_else(|| "default".to_string()),
        })
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_or<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match non_empty_var(key) {
        Some(raw) => raw
            .parse()
            .with_context(|| format!("{} must be a valid number", key)),
        None => Ok(default),
    }
}

fn parse_secs(key: &str, default: Duration) -> Result<Duration> {
    parse_or(key, default.as_secs()).map(Duration::from_secs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_kind_parsing() {
        assert_eq!("openai".parse::<RankingProviderKind>().unwrap(), RankingProviderKind::OpenAi);
        assert_eq!(" Gemini ".parse::<RankingProviderKind>().unwrap(), RankingProviderKind::Gemini);
        assert!("claude".parse::<RankingProviderKind>().is_err());
    }
}
