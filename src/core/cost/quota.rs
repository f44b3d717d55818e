use crate::core::cost::pricing::{BYTES_PER_FILE, BYTES_PER_TABLE};
use crate::core::models::quota::{QuotaSummary, Resource, ResourceCounts, ResourceUsage};

/// Estimate free-tier consumption from raw platform counts.
///
/// Database and storage sizes are proxies (fixed bytes per table / per file).
/// Bandwidth and API requests are not observable from the platform and are
/// always reported as zero used.
pub fn compute_quota_summary(table_count: u64, file_count: u64, user_count: u64) -> QuotaSummary {
    let usage = |resource: Resource, used: u64| ResourceUsage::new(used, resource.free_tier_limit());

    QuotaSummary {
        database: usage(Resource::Database, table_count.saturating_mul(BYTES_PER_TABLE)),
        bandwidth: usage(Resource::Bandwidth, 0),
        storage: usage(Resource::Storage, file_count.saturating_mul(BYTES_PER_FILE)),
        auth_users: usage(Resource::AuthUsers, user_count),
        api_requests: usage(Resource::ApiRequests, 0),
    }
}

pub fn quota_summary_from(counts: &ResourceCounts) -> QuotaSummary {
    compute_quota_summary(counts.table_count, counts.file_count, counts.user_count)
}
