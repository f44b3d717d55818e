//! Metering constants used to turn raw platform observations into cost and
//! free-tier estimates.

/// Expected token volume of a single Gemini request for this workload.
pub const AVG_TOKENS_PER_REQUEST: f64 = 1500.0;
/// Input price, dollars per thousand tokens ($0.25 per million).
pub const COST_PER_THOUSAND_TOKENS: f64 = 0.00025;
/// Month length used for projections.
pub const DAYS_PER_MONTH: u32 = 30;
/// Monthly spend ceiling in dollars when none is configured.
pub const DEFAULT_BUDGET_LIMIT: f64 = 100.0;

const MIB: u64 = 1024 * 1024;
const GIB: u64 = 1024 * MIB;

/// Assumed on-disk footprint of one public table.
pub const BYTES_PER_TABLE: u64 = 10 * MIB;
/// Assumed size of one stored object.
pub const BYTES_PER_FILE: u64 = MIB;

/// Free-tier ceilings of the backend platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FreeTierLimits {
    pub database: u64,
    pub bandwidth: u64,
    pub storage: u64,
    pub auth_users: u64,
    pub api_requests: u64,
}

pub const FREE_TIER: FreeTierLimits = FreeTierLimits {
    database: 500 * MIB,
    bandwidth: 2 * GIB,
    storage: GIB,
    auth_users: 50_000,
    api_requests: 500_000,
};

/// Rates applied to every request sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeteringRates {
    pub avg_tokens_per_request: f64,
    pub cost_per_thousand_tokens: f64,
}

impl Default for MeteringRates {
    fn default() -> Self {
        Self {
            avg_tokens_per_request: AVG_TOKENS_PER_REQUEST,
            cost_per_thousand_tokens: COST_PER_THOUSAND_TOKENS,
        }
    }
}

impl MeteringRates {
    pub fn tokens_for(&self, requests: f64) -> f64 {
        requests * self.avg_tokens_per_request
    }

    pub fn cost_for(&self, tokens: f64) -> f64 {
        (tokens / 1000.0) * self.cost_per_thousand_tokens
    }
}
