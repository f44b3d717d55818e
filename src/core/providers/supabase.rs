use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::core::config::SupabaseConfig;
use crate::core::cost::quota::quota_summary_from;
use crate::core::models::quota::{QuotaSummary, ResourceCounts};
use crate::core::providers::fetch::{http_client, validate_endpoint};

/// Objects returned per storage listing call.
const OBJECT_LIST_LIMIT: u32 = 100;

#[derive(Deserialize)]
struct Bucket {
    name: String,
}

#[derive(Deserialize, Default)]
struct UsersPage {
    #[serde(default)]
    users: Vec<serde_json::Value>,
}

struct AdminClient<'a> {
    http: reqwest::Client,
    base_url: &'a str,
    service_key: &'a str,
}

impl<'a> AdminClient<'a> {
    fn new(base_url: &'a str, service_key: &'a str) -> Result<Self> {
        validate_endpoint(base_url, "Supabase")?;
        Ok(Self {
            http: http_client()?,
            base_url: base_url.trim_end_matches('/'),
            service_key,
        })
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        self.authorized(self.http.request(method, format!("{}{}", self.base_url, path)))
    }

    fn authorized(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        builder
            .header("apikey", self.service_key)
            .bearer_auth(self.service_key)
            .header("Accept", "application/json")
    }

    /// Object listing endpoint for `bucket`, with the name percent-encoded as one segment.
    fn object_list_url(&self, bucket: &str) -> Result<reqwest::Url> {
        let mut url = reqwest::Url::parse(self.base_url)
            .with_context(|| format!("Invalid Supabase URL: {}", self.base_url))?;
        url.path_segments_mut()
            .map_err(|_| anyhow::anyhow!("Supabase URL cannot carry a path: {}", self.base_url))?
            .pop_if_empty()
            .extend(["storage", "v1", "object", "list", bucket]);
        Ok(url)
    }

    /// Decode a successful response; a rejected sub-query contributes an empty value.
    async fn json_or_default<T: DeserializeOwned + Default>(
        response: reqwest::Response,
        what: &str,
    ) -> Result<T> {
        let status = response.status();
        if !status.is_success() {
            tracing::debug!(status = status.as_u16(), what, "Supabase query rejected, counting as zero");
            return Ok(T::default());
        }
        response
            .json()
            .await
            .with_context(|| format!("Failed to parse Supabase {} response", what))
    }

    async fn count_public_tables(&self) -> Result<u64> {
        let response = self
            .request(reqwest::Method::GET, "/rest/v1/tables")
            .header("Accept-Profile", "information_schema")
            .query(&[("select", "table_name"), ("table_schema", "eq.public")])
            .send()
            .await
            .context("Failed to query Supabase tables")?;
        let tables: Vec<serde_json::Value> = Self::json_or_default(response, "tables").await?;
        Ok(tables.len() as u64)
    }

    async fn count_files(&self) -> Result<u64> {
        let response = self
            .request(reqwest::Method::GET, "/storage/v1/bucket")
            .send()
            .await
            .context("Failed to list Supabase storage buckets")?;
        let buckets: Vec<Bucket> = Self::json_or_default(response, "buckets").await?;

        let mut total = 0u64;
        for bucket in &buckets {
            let url = self.object_list_url(&bucket.name)?;
            let response = self
                .authorized(self.http.post(url))
                .json(&serde_json::json!({
                    "prefix": "",
                    "limit": OBJECT_LIST_LIMIT,
                    "offset": 0,
                }))
                .send()
                .await
                .with_context(|| format!("Failed to list objects in bucket '{}'", bucket.name))?;
            let objects: Vec<serde_json::Value> = Self::json_or_default(response, "objects").await?;
            total += objects.len() as u64;
        }
        Ok(total)
    }

    async fn count_users(&self) -> Result<u64> {
        let response = self
            .request(reqwest::Method::GET, "/auth/v1/admin/users")
            .send()
            .await
            .context("Failed to list Supabase auth users")?;
        let page: UsersPage = Self::json_or_default(response, "users").await?;
        Ok(page.users.len() as u64)
    }
}

/// Read the raw resource counts from a Supabase project.
pub async fn fetch_counts(config: &SupabaseConfig) -> Result<ResourceCounts> {
    let (Some(url), Some(key)) = (config.url.as_deref(), config.service_role_key.as_deref()) else {
        anyhow::bail!("Supabase credentials not configured");
    };
    let client = AdminClient::new(url, key)?;

    let (table_count, file_count, user_count) = tokio::try_join!(
        client.count_public_tables(),
        client.count_files(),
        client.count_users(),
    )?;

    let counts = ResourceCounts {
        table_count,
        file_count,
        user_count,
    };
    tracing::debug!(?counts, "Fetched Supabase resource counts");
    Ok(counts)
}

/// Fetch live Supabase counts and estimate free-tier consumption.
pub async fn fetch(config: &SupabaseConfig) -> Result<QuotaSummary> {
    let counts = fetch_counts(config).await?;
    Ok(quota_summary_from(&counts))
}
