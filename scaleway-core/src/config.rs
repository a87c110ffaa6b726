//! Provider configuration and the immutable context shared by every callback

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ProviderError, ProviderResult};
use crate::locality::{Region, Zone};
use crate::resource::{AttributeMap, Value};
use crate::validation::{self, Diagnostics};
use crate::wait::DEFAULT_POLL_INTERVAL;

pub const ENV_ACCESS_KEY: &str = "SCW_ACCESS_KEY";
pub const ENV_SECRET_KEY: &str = "SCW_SECRET_KEY";
pub const ENV_PROJECT_ID: &str = "SCW_DEFAULT_PROJECT_ID";
pub const ENV_ORGANIZATION_ID: &str = "SCW_DEFAULT_ORGANIZATION_ID";
pub const ENV_REGION: &str = "SCW_DEFAULT_REGION";
pub const ENV_ZONE: &str = "SCW_DEFAULT_ZONE";
pub const ENV_API_URL: &str = "SCW_API_URL";

/// Options of the provider block
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    pub access_key: Option<String>,
    pub secret_key: Option<String>,
    pub project_id: Option<String>,
    pub organization_id: Option<String>,
    pub region: Option<String>,
    pub zone: Option<String>,
    pub api_url: Option<String>,
}

impl ProviderConfig {
    /// Build from the host's provider block. Empty strings count as unset.
    pub fn from_attributes(attributes: &AttributeMap) -> ProviderResult<Self> {
        let cleaned: AttributeMap = attributes
            .iter()
            .filter(|(_, v)| !v.is_empty())
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect();
        let json = serde_json::to_value(&cleaned)
            .map_err(|e| ProviderError::validation("provider", e.to_string()))?;
        serde_json::from_value(json).map_err(|e| ProviderError::validation("provider", e.to_string()))
    }

    /// Fill unset options from the standard `SCW_*` variables
    pub fn with_env_fallback<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let fill = |slot: &mut Option<String>, var: &str| {
            if slot.as_deref().is_none_or(str::is_empty) {
                *slot = lookup(var).filter(|v| !v.is_empty());
            }
        };
        fill(&mut self.access_key, ENV_ACCESS_KEY);
        fill(&mut self.secret_key, ENV_SECRET_KEY);
        fill(&mut self.project_id, ENV_PROJECT_ID);
        fill(&mut self.organization_id, ENV_ORGANIZATION_ID);
        fill(&mut self.region, ENV_REGION);
        fill(&mut self.zone, ENV_ZONE);
        fill(&mut self.api_url, ENV_API_URL);
        self
    }

    /// Fallback to the process environment
    pub fn with_process_env(self) -> Self {
        self.with_env_fallback(|var| std::env::var(var).ok())
    }

    pub fn validate(&self) -> Diagnostics {
        let mut diags = Diagnostics::new();
        let mut check = |attribute: &str, value: &Option<String>, validator: validation::Validator| {
            if let Some(v) = value {
                diags.extend(validator.validate(&Value::from(v.as_str()), attribute));
            }
        };
        check("project_id", &self.project_id, validation::uuid());
        check("organization_id", &self.organization_id, validation::uuid());
        check("region", &self.region, validation::region());
        check("zone", &self.zone, validation::zone());

        if let Some(url) = &self.api_url
            && !(url.starts_with("https://") || url.starts_with("http://"))
        {
            diags.error("api_url", format!("'{}' must be an http or https URL", url));
        }
        diags
    }
}

impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("access_key", &self.access_key)
            .field("secret_key", &self.secret_key.as_ref().map(|_| "<redacted>"))
            .field("project_id", &self.project_id)
            .field("organization_id", &self.organization_id)
            .field("region", &self.region)
            .field("zone", &self.zone)
            .field("api_url", &self.api_url)
            .finish()
    }
}

/// Context built once at provider init and shared read-only by every callback
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderMeta {
    default_region: Option<Region>,
    default_zone: Option<Zone>,
    default_project_id: Option<String>,
    default_organization_id: Option<String>,
    poll_interval: Duration,
}

impl Default for ProviderMeta {
    fn default() -> Self {
        Self {
            default_region: None,
            default_zone: None,
            default_project_id: None,
            default_organization_id: None,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

impl ProviderMeta {
    /// Canonicalise the defaults of a validated config
    pub fn from_config(config: &ProviderConfig) -> ProviderResult<Self> {
        let diags = config.validate();
        if diags.has_errors() {
            return Err(ProviderError::Validation(diags.errors));
        }

        let mut meta = Self::default();
        if let Some(zone) = &config.zone {
            let zone = Zone::parse(zone).map_err(|e| ProviderError::validation("zone", e.to_string()))?;
            meta = meta.with_zone(zone);
        }
        if let Some(region) = &config.region {
            let region =
                Region::parse(region).map_err(|e| ProviderError::validation("region", e.to_string()))?;
            meta.default_region = Some(region);
        }
        meta.default_project_id = config.project_id.clone();
        meta.default_organization_id = config.organization_id.clone();
        Ok(meta)
    }

    /// Default zone; also the default region unless one is already set
    pub fn with_zone(mut self, zone: Zone) -> Self {
        if self.default_region.is_none() {
            self.default_region = Some(zone.region());
        }
        self.default_zone = Some(zone);
        self
    }

    pub fn with_region(mut self, region: Region) -> Self {
        self.default_region = Some(region);
        self
    }

    pub fn with_project_id(mut self, project_id: impl Into<String>) -> Self {
        self.default_project_id = Some(project_id.into());
        self
    }

    pub fn with_organization_id(mut self, organization_id: impl Into<String>) -> Self {
        self.default_organization_id = Some(organization_id.into());
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn default_region(&self) -> Option<&Region> {
        self.default_region.as_ref()
    }

    pub fn default_zone(&self) -> Option<&Zone> {
        self.default_zone.as_ref()
    }

    pub fn default_project_id(&self) -> Option<&str> {
        self.default_project_id.as_deref()
    }

    pub fn default_organization_id(&self) -> Option<&str> {
        self.default_organization_id.as_deref()
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }
}
