pub mod fetch;
pub mod gemini;
pub mod google_auth;
pub mod supabase;
pub mod synthetic;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    Gemini,
    Supabase,
}

impl Platform {
    pub fn from_id(id: &str) -> Option<Self> {
        match id.to_lowercase().as_str() {
            "gemini" | "google-cloud" | "google_cloud" | "gcp" => Some(Self::Gemini),
            "supabase" => Some(Self::Supabase),
            _ => None,
        }
    }

    pub fn id(&self) -> &'static str {
        match self {
            Self::Gemini => "gemini",
            Self::Supabase => "supabase",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Gemini => "Gemini API",
            Self::Supabase => "Supabase",
        }
    }

    pub fn all() -> &'static [Platform] {
        &[Platform::Gemini, Platform::Supabase]
    }

    pub fn auth_hint(&self) -> &'static str {
        match self {
            Self::Gemini => "GOOGLE_CLOUD_PROJECT_ID + GOOGLE_APPLICATION_CREDENTIALS_JSON",
            Self::Supabase => "SUPABASE_URL + SUPABASE_SERVICE_ROLE_KEY",
        }
    }
}

/// Where a platform's figures come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataSource {
    /// Live when credentials are configured, synthetic otherwise
    #[default]
    Auto,
    Live,
    Synthetic,
}

impl DataSource {
    pub fn from_id(id: &str) -> Option<Self> {
        match id.to_lowercase().as_str() {
            "auto" => Some(Self::Auto),
            "live" => Some(Self::Live),
            "synthetic" | "mock" | "demo" => Some(Self::Synthetic),
            _ => None,
        }
    }

    pub fn id(&self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::Live => "live",
            Self::Synthetic => "synthetic",
        }
    }

    /// Collapse `Auto` to a concrete source.
    pub fn resolve(self, has_credentials: bool) -> Self {
        match self {
            Self::Auto if has_credentials => Self::Live,
            Self::Auto => Self::Synthetic,
            other => other,
        }
    }
}
