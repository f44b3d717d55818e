use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Deserialize;

use crate::core::config::GeminiConfig;
use crate::core::cost::aggregator::compute_usage_summary;
use crate::core::models::usage::{Sample, UsageSummary, Window};
use crate::core::providers::fetch::{http_client, validate_endpoint};
use crate::core::providers::google_auth::{self, ServiceAccountKey};

const RESPONSE_COUNT_FILTER: &str =
    r#"metric.type="aiplatform.googleapis.com/prediction/online/response_count""#;
const ALIGNMENT_PERIOD: &str = "3600s";
const PER_SERIES_ALIGNER: &str = "ALIGN_RATE";

// --- API response ---

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListTimeSeriesResponse {
    #[serde(default)]
    time_series: Vec<TimeSeries>,
    next_page_token: Option<String>,
}

#[derive(Deserialize)]
struct TimeSeries {
    #[serde(default)]
    points: Vec<Point>,
}

#[derive(Deserialize)]
struct Point {
    interval: Option<TimeInterval>,
    value: Option<TypedValue>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TimeInterval {
    start_time: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TypedValue {
    double_value: Option<f64>,
    /// int64 values arrive as JSON strings
    int64_value: Option<String>,
}

fn point_to_sample(point: &Point) -> Sample {
    let value = point.value.as_ref().and_then(|v| {
        v.double_value.or_else(|| {
            v.int64_value
                .as_deref()
                .and_then(|s| s.parse::<i64>().ok())
                .map(|n| n as f64)
        })
    });
    let interval_start = point
        .interval
        .as_ref()
        .and_then(|i| i.start_time.as_deref())
        .and_then(|s| s.parse::<DateTime<Utc>>().ok())
        .map(|t| t.timestamp());

    Sample {
        value,
        interval_start,
    }
}

fn samples_from(response: &ListTimeSeriesResponse) -> impl Iterator<Item = Sample> + '_ {
    response
        .time_series
        .iter()
        .flat_map(|series| series.points.iter().map(point_to_sample))
}

fn rfc3339(t: DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Secs, true)
}

async fn resolve_access_token(client: &reqwest::Client, config: &GeminiConfig, now: DateTime<Utc>) -> Result<String> {
    if let Some(token) = &config.access_token {
        return Ok(token.clone());
    }
    let raw = config
        .credentials_json
        .as_deref()
        .context("Google Cloud credentials not configured")?;
    let key = ServiceAccountKey::parse(raw)?;
    if key.project_id.as_deref().map_or(true, str::is_empty) {
        anyhow::bail!("Google Cloud credentials not configured: key has no project_id");
    }
    google_auth::exchange(client, &key, now).await
}

/// Page through the hourly response-count rates for `window` ending at `now`.
async fn fetch_samples(
    client: &reqwest::Client,
    config: &GeminiConfig,
    project_id: &str,
    token: &str,
    window: Window,
    now: DateTime<Utc>,
) -> Result<Vec<Sample>> {
    let url = format!(
        "{}/v3/projects/{}/timeSeries",
        config.monitoring_url.trim_end_matches('/'),
        project_id
    );
    validate_endpoint(&url, "Cloud Monitoring")?;

    let start = rfc3339(now - window.duration());
    let end = rfc3339(now);
    let mut samples = Vec::new();
    let mut page_token: Option<String> = None;

    loop {
        let mut query: Vec<(&str, &str)> = vec![
            ("filter", RESPONSE_COUNT_FILTER),
            ("interval.startTime", start.as_str()),
            ("interval.endTime", end.as_str()),
            ("aggregation.alignmentPeriod", ALIGNMENT_PERIOD),
            ("aggregation.perSeriesAligner", PER_SERIES_ALIGNER),
        ];
        if let Some(page) = page_token.as_deref() {
            query.push(("pageToken", page));
        }

        let response = client
            .get(&url)
            .bearer_auth(token)
            .query(&query)
            .send()
            .await
            .context("Failed to send request to Cloud Monitoring")?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            anyhow::bail!("HTTP {}: check the service account's monitoring.viewer role", status.as_u16());
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("HTTP {}: {}", status.as_u16(), body);
        }

        let page: ListTimeSeriesResponse = response
            .json()
            .await
            .context("Failed to parse Cloud Monitoring time series")?;
        samples.extend(samples_from(&page));

        match page.next_page_token.filter(|t| !t.is_empty()) {
            Some(next) => page_token = Some(next),
            None => break,
        }
    }

    tracing::debug!(count = samples.len(), %window, "Fetched Cloud Monitoring samples");
    Ok(samples)
}

/// Fetch live Gemini usage for `window` and roll it up.
pub async fn fetch(window: Window, config: &GeminiConfig) -> Result<UsageSummary> {
    let project_id = config
        .project_id
        .as_deref()
        .filter(|p| !p.is_empty())
        .context("Google Cloud credentials not configured: missing project id")?;

    let client = http_client()?;
    let now = Utc::now();
    let token = resolve_access_token(&client, config, now).await?;
    let samples = fetch_samples(&client, config, project_id, &token, window, now).await?;

    Ok(compute_usage_summary(
        window,
        &samples,
        config.budget_limit,
        &config.rates(),
    ))
}
