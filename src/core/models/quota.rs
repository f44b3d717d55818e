use serde::ser::{SerializeMap, SerializeStruct};
use serde::{Deserialize, Serialize, Serializer};

use crate::core::cost::pricing::FREE_TIER;

/// A metered platform resource with a free-tier ceiling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resource {
    Database,
    Bandwidth,
    Storage,
    AuthUsers,
    ApiRequests,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unit {
    Bytes,
    Count,
}

impl Resource {
    pub fn all() -> &'static [Resource] {
        &[
            Resource::Database,
            Resource::Bandwidth,
            Resource::Storage,
            Resource::AuthUsers,
            Resource::ApiRequests,
        ]
    }

    /// Key of this resource in the dashboard payload.
    pub fn key(&self) -> &'static str {
        match self {
            Self::Database => "database",
            Self::Bandwidth => "bandwidth",
            Self::Storage => "storage",
            Self::AuthUsers => "authUsers",
            Self::ApiRequests => "apiRequests",
        }
    }

    /// Name of the field carrying the consumed amount in the dashboard payload.
    pub fn measure_key(&self) -> &'static str {
        match self {
            Self::Database => "size",
            Self::Bandwidth | Self::Storage => "used",
            Self::AuthUsers | Self::ApiRequests => "count",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Database => "Database",
            Self::Bandwidth => "Bandwidth",
            Self::Storage => "Storage",
            Self::AuthUsers => "Auth users",
            Self::ApiRequests => "API requests",
        }
    }

    pub fn unit(&self) -> Unit {
        match self {
            Self::Database | Self::Bandwidth | Self::Storage => Unit::Bytes,
            Self::AuthUsers | Self::ApiRequests => Unit::Count,
        }
    }

    pub fn free_tier_limit(&self) -> u64 {
        match self {
            Self::Database => FREE_TIER.database,
            Self::Bandwidth => FREE_TIER.bandwidth,
            Self::Storage => FREE_TIER.storage,
            Self::AuthUsers => FREE_TIER.auth_users,
            Self::ApiRequests => FREE_TIER.api_requests,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResourceUsage {
    /// Consumed amount, in bytes or as a count depending on the resource
    pub used: u64,
    pub limit: u64,
    /// `used / limit * 100`; not capped, so overuse reads above 100
    pub percentage: f64,
}

impl ResourceUsage {
    pub fn new(used: u64, limit: u64) -> Self {
        let percentage = if limit == 0 {
            0.0
        } else {
            (used as f64 / limit as f64 * 100.0).max(0.0)
        };
        Self {
            used,
            limit,
            percentage,
        }
    }

    /// Usage with an explicit percentage, for illustrative figures.
    pub fn with_percentage(used: u64, limit: u64, percentage: f64) -> Self {
        Self {
            used,
            limit,
            percentage: percentage.max(0.0),
        }
    }
}

/// Raw platform counts the quota estimate is derived from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceCounts {
    pub table_count: u64,
    pub file_count: u64,
    pub user_count: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct QuotaSummary {
    pub database: ResourceUsage,
    pub bandwidth: ResourceUsage,
    pub storage: ResourceUsage,
    pub auth_users: ResourceUsage,
    pub api_requests: ResourceUsage,
}

impl QuotaSummary {
    /// Summary reported when the platform cannot be reached.
    pub fn zeroed() -> Self {
        let empty = |r: Resource| ResourceUsage::new(0, r.free_tier_limit());
        Self {
            database: empty(Resource::Database),
            bandwidth: empty(Resource::Bandwidth),
            storage: empty(Resource::Storage),
            auth_users: empty(Resource::AuthUsers),
            api_requests: empty(Resource::ApiRequests),
        }
    }

    pub fn get(&self, resource: Resource) -> &ResourceUsage {
        match resource {
            Resource::Database => &self.database,
            Resource::Bandwidth => &self.bandwidth,
            Resource::Storage => &self.storage,
            Resource::AuthUsers => &self.auth_users,
            Resource::ApiRequests => &self.api_requests,
        }
    }

    /// Entries in display order.
    pub fn iter(&self) -> impl Iterator<Item = (Resource, &ResourceUsage)> {
        Resource::all().iter().map(move |r| (*r, self.get(*r)))
    }
}

struct MeteredEntry<'a> {
    resource: Resource,
    usage: &'a ResourceUsage,
}

impl Serialize for MeteredEntry<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("ResourceUsage", 3)?;
        state.serialize_field(self.resource.measure_key(), &self.usage.used)?;
        state.serialize_field("limit", &self.usage.limit)?;
        state.serialize_field("percentage", &self.usage.percentage)?;
        state.end()
    }
}

impl Serialize for QuotaSummary {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(Resource::all().len()))?;
        for (resource, usage) in self.iter() {
            map.serialize_entry(resource.key(), &MeteredEntry { resource, usage })?;
        }
        map.end()
    }
}
