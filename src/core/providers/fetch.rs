use anyhow::Context;
use serde::Serialize;
use std::time::Duration;

use crate::core::config::{GeminiConfig, SupabaseConfig};
use crate::core::models::quota::QuotaSummary;
use crate::core::models::usage::{UsageSummary, Window};
use crate::core::providers::{gemini, supabase, synthetic, DataSource};

const HTTP_TIMEOUT: Duration = Duration::from_secs(15);

/// How a reported figure was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Origin {
    Live,
    Synthetic,
    /// Live source failed; zeroed defaults were substituted
    Fallback,
}

impl Origin {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Live => "live",
            Self::Synthetic => "synthetic",
            Self::Fallback => "unavailable",
        }
    }
}

/// Result of a platform fetch operation.
#[derive(Debug, Clone)]
pub struct FetchResult<T> {
    pub data: T,
    pub origin: Origin,
}

/// Validate that a resolved endpoint URL uses HTTPS.
///
/// Plain HTTP is only accepted for loopback hosts, so credentials never leave
/// the machine unencrypted.
pub fn validate_endpoint(url: &str, name: &str) -> anyhow::Result<()> {
    let parsed = reqwest::Url::parse(url)
        .with_context(|| format!("{}: invalid endpoint URL: {}", name, url))?;
    match parsed.scheme() {
        "https" => Ok(()),
        "http" if matches!(parsed.host_str(), Some("localhost" | "127.0.0.1" | "[::1]")) => Ok(()),
        _ => anyhow::bail!("{}: endpoint must use HTTPS, got: {}", name, url),
    }
}

pub fn http_client() -> anyhow::Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(HTTP_TIMEOUT)
        .build()
        .context("Failed to build HTTP client")
}

/// Gemini usage for `window` from the configured (or overridden) source.
///
/// Never fails: a live source that cannot be reached yields a zeroed summary.
pub async fn gemini_usage(
    window: Window,
    config: &GeminiConfig,
    source_override: Option<DataSource>,
) -> FetchResult<UsageSummary> {
    let source = source_override
        .unwrap_or(config.source)
        .resolve(config.has_credentials());

    match source {
        DataSource::Synthetic => FetchResult {
            data: synthetic::generate_usage_summary(window, config.budget_limit, &config.rates()),
            origin: Origin::Synthetic,
        },
        DataSource::Live | DataSource::Auto => match gemini::fetch(window, config).await {
            Ok(data) => FetchResult {
                data,
                origin: Origin::Live,
            },
            Err(e) => {
                tracing::warn!("Gemini usage ({}) unavailable, reporting zeroed summary: {:#}", window, e);
                FetchResult {
                    data: UsageSummary::zeroed(config.budget_limit),
                    origin: Origin::Fallback,
                }
            }
        },
    }
}

/// Supabase free-tier consumption from the configured (or overridden) source.
///
/// Never fails: a live source that cannot be reached yields a zeroed summary.
pub async fn supabase_quota(
    config: &SupabaseConfig,
    source_override: Option<DataSource>,
) -> FetchResult<QuotaSummary> {
    let source = source_override
        .unwrap_or(config.source)
        .resolve(config.has_credentials());

    match source {
        DataSource::Synthetic => FetchResult {
            data: synthetic::quota_summary(),
            origin: Origin::Synthetic,
        },
        DataSource::Live | DataSource::Auto => match supabase::fetch(config).await {
            Ok(data) => FetchResult {
                data,
                origin: Origin::Live,
            },
            Err(e) => {
                tracing::warn!("Supabase usage unavailable, reporting zeroed summary: {:#}", e);
                FetchResult {
                    data: QuotaSummary::zeroed(),
                    origin: Origin::Fallback,
                }
            }
        },
    }
}
