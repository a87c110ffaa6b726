//! Helpers shared by the drivers

use scaleway_core::locality::{Region, Scope, Zone};
use scaleway_core::resource::{ResourceData, Value};
use scaleway_core::{ProviderError, ProviderResult};

const BYTES_PER_GB: u64 = 1_000_000_000;

/// Zone of a zonal scope
pub fn zone_of(scope: &Scope) -> ProviderResult<&Zone> {
    scope
        .zone()
        .ok_or_else(|| ProviderError::MissingScope("zone".to_string()))
}

/// Region of a regional or zonal scope
pub fn region_of(scope: &Scope) -> ProviderResult<Region> {
    scope
        .region()
        .ok_or_else(|| ProviderError::MissingScope("region".to_string()))
}

/// Owner attribute (`project_id`, `organization_id`) the create call needs
pub fn owner(data: &ResourceData, attribute: &str) -> ProviderResult<String> {
    data.get_str(attribute)
        .map(str::to_string)
        .ok_or_else(|| ProviderError::MissingScope(attribute.to_string()))
}

/// Sizes are whole, positive gigabytes
pub fn gb_to_bytes(gb: i64) -> ProviderResult<u64> {
    u64::try_from(gb)
        .ok()
        .filter(|gb| *gb > 0)
        .and_then(|gb| gb.checked_mul(BYTES_PER_GB))
        .ok_or_else(|| ProviderError::validation("size_in_gb", format!("{} GB is not a valid size", gb)))
}

pub fn bytes_to_gb(bytes: u64) -> i64 {
    i64::try_from(bytes / BYTES_PER_GB).unwrap_or(i64::MAX)
}

pub fn tags_value(tags: &[String]) -> Value {
    Value::string_list(tags.iter().cloned())
}
