use anyhow::{Context, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};

use crate::core::providers::fetch::validate_endpoint;

const MONITORING_READ_SCOPE: &str = "https://www.googleapis.com/auth/monitoring.read";
const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const ASSERTION_LIFETIME_SECS: i64 = 3600;

/// The fields of a Google service-account key file this crate needs.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceAccountKey {
    #[serde(default)]
    pub project_id: Option<String>,
    pub client_email: String,
    pub private_key: String,
    #[serde(default)]
    pub private_key_id: Option<String>,
    #[serde(default)]
    pub token_uri: Option<String>,
}

impl ServiceAccountKey {
    /// Parse a key given either as raw JSON or as base64-encoded JSON.
    pub fn parse(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        let json = if trimmed.starts_with('{') {
            trimmed.to_string()
        } else {
            let bytes = STANDARD
                .decode(trimmed)
                .context("Service account key is neither JSON nor base64")?;
            String::from_utf8(bytes).context("Decoded service account key is not UTF-8")?
        };
        serde_json::from_str(&json).context("Failed to parse service account key")
    }

    pub fn token_uri(&self) -> &str {
        self.token_uri.as_deref().unwrap_or(DEFAULT_TOKEN_URI)
    }
}

#[derive(Serialize)]
struct AssertionClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[allow(dead_code)]
    expires_in: Option<u64>,
}

/// Build the signed RS256 assertion exchanged for a monitoring access token.
pub fn build_assertion(key: &ServiceAccountKey, now: DateTime<Utc>) -> Result<String> {
    let mut header = Header::new(Algorithm::RS256);
    header.kid = key.private_key_id.clone();

    let iat = now.timestamp();
    let claims = AssertionClaims {
        iss: &key.client_email,
        scope: MONITORING_READ_SCOPE,
        aud: key.token_uri(),
        iat,
        exp: iat + ASSERTION_LIFETIME_SECS,
    };

    let encoding_key = EncodingKey::from_rsa_pem(key.private_key.as_bytes())
        .context("Service account private_key is not a valid RSA PEM")?;
    jsonwebtoken::encode(&header, &claims, &encoding_key).context("Failed to sign token assertion")
}

/// Exchange a service-account assertion for an OAuth access token.
pub async fn exchange(client: &reqwest::Client, key: &ServiceAccountKey, now: DateTime<Utc>) -> Result<String> {
    let token_uri = key.token_uri();
    validate_endpoint(token_uri, "Google token endpoint")?;
    let assertion = build_assertion(key, now)?;

    tracing::debug!(token_uri, client_email = %key.client_email, "Exchanging service account assertion");
    let response = client
        .post(token_uri)
        .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
        .send()
        .await
        .context("Failed to send token request to Google")?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        anyhow::bail!("Token exchange failed (HTTP {}): {}", status.as_u16(), body);
    }

    let token: TokenResponse = response
        .json()
        .await
        .context("Failed to parse token response")?;
    Ok(token.access_token)
}
