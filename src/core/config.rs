use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::core::cost::pricing::{
    MeteringRates, AVG_TOKENS_PER_REQUEST, COST_PER_THOUSAND_TOKENS, DEFAULT_BUDGET_LIMIT,
};
use crate::core::providers::fetch::validate_endpoint;
use crate::core::providers::DataSource;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    ReadError(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("Failed to serialize config: {0}")]
    SerializeError(#[from] toml::ser::Error),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "default_format")]
    pub default_format: String,
    #[serde(default = "default_color")]
    pub color: String,
    #[serde(default = "default_bind")]
    pub bind: String,
}

fn default_format() -> String {
    "text".to_string()
}
fn default_color() -> String {
    "auto".to_string()
}
fn default_bind() -> String {
    "127.0.0.1:3000".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            default_format: default_format(),
            color: default_color(),
            bind: default_bind(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeminiConfig {
    #[serde(default)]
    pub source: DataSource,
    #[serde(default = "default_budget_limit")]
    pub budget_limit: f64,
    pub project_id: Option<String>,
    /// Service-account key, raw JSON or base64 of it
    pub credentials_json: Option<String>,
    /// Pre-minted OAuth access token; skips the service-account exchange
    pub access_token: Option<String>,
    #[serde(default = "default_avg_tokens")]
    pub avg_tokens_per_request: f64,
    #[serde(default = "default_cost_per_thousand")]
    pub cost_per_thousand_tokens: f64,
    #[serde(default = "default_monitoring_url")]
    pub monitoring_url: String,
}

fn default_budget_limit() -> f64 {
    DEFAULT_BUDGET_LIMIT
}
fn default_avg_tokens() -> f64 {
    AVG_TOKENS_PER_REQUEST
}
fn default_cost_per_thousand() -> f64 {
    COST_PER_THOUSAND_TOKENS
}
fn default_monitoring_url() -> String {
    "https://monitoring.googleapis.com".to_string()
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            source: DataSource::default(),
            budget_limit: default_budget_limit(),
            project_id: None,
            credentials_json: None,
            access_token: None,
            avg_tokens_per_request: default_avg_tokens(),
            cost_per_thousand_tokens: default_cost_per_thousand(),
            monitoring_url: default_monitoring_url(),
        }
    }
}

impl GeminiConfig {
    pub fn rates(&self) -> MeteringRates {
        MeteringRates {
            avg_tokens_per_request: self.avg_tokens_per_request,
            cost_per_thousand_tokens: self.cost_per_thousand_tokens,
        }
    }

    pub fn has_credentials(&self) -> bool {
        self.project_id.is_some() && (self.credentials_json.is_some() || self.access_token.is_some())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SupabaseConfig {
    #[serde(default)]
    pub source: DataSource,
    pub url: Option<String>,
    pub service_role_key: Option<String>,
}

impl SupabaseConfig {
    pub fn has_credentials(&self) -> bool {
        self.url.is_some() && self.service_role_key.is_some()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub settings: Settings,
    #[serde(default)]
    pub gemini: GeminiConfig,
    #[serde(default)]
    pub supabase: SupabaseConfig,
}

impl AppConfig {
    /// Get the config file path, respecting XDG_CONFIG_HOME
    pub fn config_path() -> PathBuf {
        let config_dir = std::env::var("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| {
                dirs::home_dir()
                    .unwrap_or_else(|| PathBuf::from("~"))
                    .join(".config")
            });
        config_dir.join("usagedeck").join("config.toml")
    }

    /// Load config from `path` (or the default path), then apply environment overrides.
    /// A missing file yields defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let default_path = Self::config_path();
        let path = path.unwrap_or(&default_path);
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path)?;
            toml::from_str(&content)?
        } else {
            Self::default()
        };
        config.apply_env_with(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Overlay values from the environment. Empty values count as unset.
    pub fn apply_env_with<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(budget) = var("MONTHLY_BUDGET_USD") {
            match budget.trim().parse::<f64>() {
                Ok(value) if value.is_finite() => self.gemini.budget_limit = value,
                _ => tracing::warn!(value = %budget, "Ignoring unparsable MONTHLY_BUDGET_USD"),
            }
        }
        if let Some(project) = var("GOOGLE_CLOUD_PROJECT_ID") {
            self.gemini.project_id = Some(project);
        }
        if let Some(creds) = var("GOOGLE_APPLICATION_CREDENTIALS_JSON") {
            self.gemini.credentials_json = Some(creds);
        }
        if let Some(token) = var("GOOGLE_OAUTH_ACCESS_TOKEN") {
            self.gemini.access_token = Some(token);
        }
        if let Some(url) = var("SUPABASE_URL").or_else(|| var("NEXT_PUBLIC_SUPABASE_URL")) {
            self.supabase.url = Some(url);
        }
        if let Some(key) = var("SUPABASE_SERVICE_ROLE_KEY") {
            self.supabase.service_role_key = Some(key);
        }
    }

    /// Serialize and write this config to `path`.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Copy with secrets masked, for display.
    pub fn redacted(&self) -> Self {
        let mask = |v: &Option<String>| v.as_ref().map(|_| "********".to_string());
        let mut copy = self.clone();
        copy.gemini.credentials_json = mask(&self.gemini.credentials_json);
        copy.gemini.access_token = mask(&self.gemini.access_token);
        copy.supabase.service_role_key = mask(&self.supabase.service_role_key);
        copy
    }

    /// Validate the config
    pub fn validate(&self) -> Vec<String> {
        let mut issues = Vec::new();
        if !["text", "json"].contains(&self.settings.default_format.as_str()) {
            issues.push(format!(
                "Invalid default_format: '{}' (must be 'text' or 'json')",
                self.settings.default_format
            ));
        }
        if !["auto", "always", "never"].contains(&self.settings.color.as_str()) {
            issues.push(format!(
                "Invalid color: '{}' (must be 'auto', 'always', or 'never')",
                self.settings.color
            ));
        }
        if self.settings.bind.parse::<std::net::SocketAddr>().is_err() {
            issues.push(format!("Invalid bind address: '{}'", self.settings.bind));
        }
        if !(self.gemini.budget_limit.is_finite() && self.gemini.budget_limit > 0.0) {
            issues.push(format!(
                "gemini.budget_limit must be positive, got {}",
                self.gemini.budget_limit
            ));
        }
        if !(self.gemini.avg_tokens_per_request > 0.0) {
            issues.push("gemini.avg_tokens_per_request must be positive".to_string());
        }
        if !(self.gemini.cost_per_thousand_tokens > 0.0) {
            issues.push("gemini.cost_per_thousand_tokens must be positive".to_string());
        }
        if let Err(e) = validate_endpoint(&self.gemini.monitoring_url, "gemini.monitoring_url") {
            issues.push(e.to_string());
        }
        if self.gemini.source == DataSource::Live && !self.gemini.has_credentials() {
            issues.push("gemini.source is 'live' but project_id/credentials are missing".to_string());
        }
        if let Some(url) = &self.supabase.url {
            if let Err(e) = validate_endpoint(url, "supabase.url") {
                issues.push(e.to_string());
            }
        }
        if self.supabase.source == DataSource::Live && !self.supabase.has_credentials() {
            issues.push("supabase.source is 'live' but url/service_role_key are missing".to_string());
        }
        issues
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn default_config_is_valid() {
        let config = AppConfig::default();
        let issues = config.validate();
        assert!(issues.is_empty(), "Default config should be valid, got: {:?}", issues);
    }

    #[test]
    fn default_budget_and_rates() {
        let config = AppConfig::default();
        assert_eq!(config.gemini.budget_limit, 100.0);
        assert_eq!(config.gemini.rates(), MeteringRates::default());
        assert_eq!(config.gemini.source, DataSource::Auto);
        assert_eq!(config.supabase.source, DataSource::Auto);
    }

    #[test]
    fn validate_catches_invalid_format() {
        let mut config = AppConfig::default();
        config.settings.default_format = "xml".to_string();
        let issues = config.validate();
        assert!(issues.iter().any(|i| i.contains("default_format")));
    }

    #[test]
    fn validate_catches_invalid_color() {
        let mut config = AppConfig::default();
        config.settings.color = "blue".to_string();
        let issues = config.validate();
        assert!(issues.iter().any(|i| i.contains("color")));
    }

    #[test]
    fn validate_catches_bad_bind() {
        let mut config = AppConfig::default();
        config.settings.bind = "localhost".to_string();
        assert!(config.validate().iter().any(|i| i.contains("bind")));
    }

    #[test]
    fn validate_catches_non_positive_budget() {
        let mut config = AppConfig::default();
        config.gemini.budget_limit = 0.0;
        assert!(config.validate().iter().any(|i| i.contains("budget_limit")));
    }

    #[test]
    fn validate_catches_plain_http_supabase_url() {
        let mut config = AppConfig::default();
        config.supabase.url = Some("http://example.supabase.co".to_string());
        assert!(config.validate().iter().any(|i| i.contains("HTTPS")));
    }

    #[test]
    fn validate_catches_live_without_credentials() {
        let mut config = AppConfig::default();
        config.gemini.source = DataSource::Live;
        config.supabase.source = DataSource::Live;
        let issues = config.validate();
        assert!(issues.iter().any(|i| i.starts_with("gemini.source")));
        assert!(issues.iter().any(|i| i.starts_with("supabase.source")));
    }

    #[test]
    fn parse_minimal_toml() {
        let toml = r#"
[settings]
default_format = "json"
color = "always"

[gemini]
source = "synthetic"
budget_limit = 25.5
"#;
        let config: AppConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.settings.default_format, "json");
        assert_eq!(config.settings.bind, "127.0.0.1:3000");
        assert_eq!(config.gemini.source, DataSource::Synthetic);
        assert_eq!(config.gemini.budget_limit, 25.5);
        assert_eq!(config.gemini.avg_tokens_per_request, 1500.0);
        assert!(config.supabase.url.is_none());
    }

    #[test]
    fn parse_empty_toml_gives_defaults() {
        let config: AppConfig = toml::from_str("").unwrap();
        assert_eq!(config.settings.default_format, "text");
        assert_eq!(config.settings.color, "auto");
        assert_eq!(config.gemini.monitoring_url, "https://monitoring.googleapis.com");
    }

    #[test]
    fn env_overrides_apply() {
        let mut config = AppConfig::default();
        config.apply_env_with(env(&[
            ("MONTHLY_BUDGET_USD", "42.5"),
            ("GOOGLE_CLOUD_PROJECT_ID", "demo"),
            ("GOOGLE_APPLICATION_CREDENTIALS_JSON", "{}"),
            ("NEXT_PUBLIC_SUPABASE_URL", "https://abc.supabase.co"),
            ("SUPABASE_SERVICE_ROLE_KEY", "secret"),
        ]));
        assert_eq!(config.gemini.budget_limit, 42.5);
        assert_eq!(config.gemini.project_id.as_deref(), Some("demo"));
        assert!(config.gemini.has_credentials());
        assert_eq!(config.supabase.url.as_deref(), Some("https://abc.supabase.co"));
        assert!(config.supabase.has_credentials());
    }

    #[test]
    fn supabase_url_prefers_server_variable() {
        let mut config = AppConfig::default();
        config.apply_env_with(env(&[
            ("SUPABASE_URL", "https://server.supabase.co"),
            ("NEXT_PUBLIC_SUPABASE_URL", "https://public.supabase.co"),
        ]));
        assert_eq!(config.supabase.url.as_deref(), Some("https://server.supabase.co"));
    }

    #[test]
    fn bad_or_empty_env_values_are_ignored() {
        let mut config = AppConfig::default();
        config.apply_env_with(env(&[
            ("MONTHLY_BUDGET_USD", "lots"),
            ("GOOGLE_CLOUD_PROJECT_ID", "  "),
        ]));
        assert_eq!(config.gemini.budget_limit, 100.0);
        assert!(config.gemini.project_id.is_none());
    }

    #[test]
    fn access_token_counts_as_credentials() {
        let mut config = AppConfig::default();
        config.gemini.project_id = Some("demo".to_string());
        assert!(!config.gemini.has_credentials());
        config.gemini.access_token = Some("ya29.token".to_string());
        assert!(config.gemini.has_credentials());
    }

    #[test]
    fn redacted_masks_secrets() {
        let mut config = AppConfig::default();
        config.gemini.credentials_json = Some("{\"private_key\":\"x\"}".to_string());
        config.supabase.service_role_key = Some("secret".to_string());
        let shown = config.redacted();
        assert_eq!(shown.gemini.credentials_json.as_deref(), Some("********"));
        assert_eq!(shown.supabase.service_role_key.as_deref(), Some("********"));
        assert!(shown.gemini.access_token.is_none());
    }

    #[test]
    fn save_then_load_roundtrip() {
        let dir = std::env::temp_dir().join(format!("usagedeck-config-{}", std::process::id()));
        let path = dir.join("config.toml");
        let mut config = AppConfig::default();
        config.gemini.budget_limit = 12.0;
        config.supabase.source = DataSource::Synthetic;
        config.save(&path).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let loaded: AppConfig = toml::from_str(&content).unwrap();
        assert_eq!(loaded.gemini.budget_limit, 12.0);
        assert_eq!(loaded.supabase.source, DataSource::Synthetic);
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn config_path_uses_xdg_when_set() {
        std::env::set_var("XDG_CONFIG_HOME", "/tmp/test_xdg_config");
        let path = AppConfig::config_path();
        std::env::remove_var("XDG_CONFIG_HOME");
        assert_eq!(path, PathBuf::from("/tmp/test_xdg_config/usagedeck/config.toml"));
    }
}
