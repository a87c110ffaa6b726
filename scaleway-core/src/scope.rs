//! Scope extraction - Decide where an object lives from its configuration,
//! its parents and the provider defaults

use crate::config::ProviderMeta;
use crate::error::{ProviderError, ProviderResult};
use crate::id::CompositeId;
use crate::locality::{Locality, Region, Scope, Zone};
use crate::resource::AttributeMap;

/// Scope encoded in a sibling attribute holding a composite ID, if any
fn inherited_scope(attributes: &AttributeMap, attribute: &str) -> Option<Scope> {
    let value = attributes.get_str(attribute)?;
    if !value.contains('/') {
        return None;
    }
    CompositeId::parse(value)
        .ok()
        .map(|id| id.scope)
        .filter(|scope| *scope != Scope::Global)
}

/// Resolve the scope of a resource.
///
/// In order: the explicit `zone`/`region` attribute, the scope of the first
/// `sources` attribute holding a composite ID, the provider default.
/// Deprecated aliases come back canonical.
pub fn extract_scope(
    locality: Locality,
    attributes: &AttributeMap,
    meta: &ProviderMeta,
    sources: &[&str],
) -> ProviderResult<Scope> {
    match locality {
        Locality::Global => Ok(Scope::Global),
        Locality::Zonal => extract_zone(attributes, meta, sources).map(Scope::Zonal),
        Locality::Regional => extract_region(attributes, meta, sources).map(Scope::Regional),
    }
}

pub fn extract_zone(
    attributes: &AttributeMap,
    meta: &ProviderMeta,
    sources: &[&str],
) -> ProviderResult<Zone> {
    if let Some(zone) = attributes.get_str("zone") {
        return Zone::parse(zone).map_err(|e| ProviderError::validation("zone", e.to_string()));
    }
    let inherited = sources
        .iter()
        .filter_map(|attr| inherited_scope(attributes, attr))
        .find_map(|scope| scope.zone().cloned());
    if let Some(zone) = inherited {
        return Ok(zone);
    }
    meta.default_zone()
        .cloned()
        .ok_or_else(|| ProviderError::MissingScope("zone".to_string()))
}

pub fn extract_region(
    attributes: &AttributeMap,
    meta: &ProviderMeta,
    sources: &[&str],
) -> ProviderResult<Region> {
    if let Some(region) = attributes.get_str("region") {
        return Region::parse(region)
            .map_err(|e| ProviderError::validation("region", e.to_string()));
    }
    let inherited = sources
        .iter()
        .filter_map(|attr| inherited_scope(attributes, attr))
        .find_map(|scope| scope.region());
    if let Some(region) = inherited {
        return Ok(region);
    }
    meta.default_region()
        .cloned()
        .ok_or_else(|| ProviderError::MissingScope("region".to_string()))
}

/// `project_id` attribute, else the provider default
pub fn extract_project_id(attributes: &AttributeMap, meta: &ProviderMeta) -> ProviderResult<String> {
    attributes
        .get_str("project_id")
        .or(meta.default_project_id())
        .map(str::to_string)
        .ok_or_else(|| ProviderError::MissingScope("project_id".to_string()))
}

/// `organization_id` attribute, else the provider default
pub fn extract_organization_id(
    attributes: &AttributeMap,
    meta: &ProviderMeta,
) -> ProviderResult<String> {
    attributes
        .get_str("organization_id")
        .or(meta.default_organization_id())
        .map(str::to_string)
        .ok_or_else(|| ProviderError::MissingScope("organization_id".to_string()))
}

/// Reject configurations whose locality attribute and composite-ID siblings
/// point at different places. Zones are compared when both sides have one,
/// regions otherwise.
pub fn check_scope_consistency(
    locality: Locality,
    attributes: &AttributeMap,
    sources: &[&str],
) -> ProviderResult<()> {
    let mut seen: Vec<(String, Scope)> = Vec::new();

    if let Some(attribute) = locality.attribute()
        && let Some(token) = attributes.get_str(attribute)
    {
        // malformed values are reported by the validators
        let scope = match locality {
            Locality::Zonal => Zone::parse(token).ok().map(Scope::Zonal),
            _ => Region::parse(token).ok().map(Scope::Regional),
        };
        if let Some(scope) = scope {
            seen.push((attribute.to_string(), scope));
        }
    }
    for attr in sources {
        if let Some(scope) = inherited_scope(attributes, attr) {
            seen.push((attr.to_string(), scope));
        }
    }

    for (i, (first_attribute, first)) in seen.iter().enumerate() {
        for (second_attribute, second) in &seen[i + 1..] {
            let same = match (first.zone(), second.zone()) {
                (Some(a), Some(b)) => a == b,
                _ => first.region() == second.region(),
            };
            if !same {
                return Err(ProviderError::ScopeMismatch {
                    first_attribute: first_attribute.clone(),
                    first: first.to_string(),
                    second_attribute: second_attribute.clone(),
                    second: second.to_string(),
                });
            }
        }
    }
    Ok(())
}
