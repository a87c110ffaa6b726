//! Name lookups behind the data sources
//!
//! The list endpoints filter names by substring, so every lookup returns
//! loose candidates and [`DataSource`](scaleway_core::datasource::DataSource)
//! keeps only the exact match.

use std::sync::Arc;

use async_trait::async_trait;

use scaleway_core::ApiError;
use scaleway_core::datasource::{Candidate, ListScope, LookupDriver};
use scaleway_core::locality::Scope;

use crate::api::{AccountApi, InstanceApi, ListByNameRequest, VpcApi};

fn request(owner: &str, name: &str) -> ListByNameRequest {
    ListByNameRequest {
        owner: owner.to_string(),
        name: name.to_string(),
    }
}

fn wrong_scope(scope: &Scope, expected: &str) -> ApiError {
    ApiError::http(400, format!("{} lookup needs a {} scope, got '{}'", expected, expected, scope))
}

pub struct VolumeLookup {
    api: Arc<dyn InstanceApi>,
}

impl VolumeLookup {
    pub fn new(api: Arc<dyn InstanceApi>) -> Self {
        Self { api }
    }
}

#[async_trait]
impl LookupDriver for VolumeLookup {
    fn entity(&self) -> &'static str {
        "volume"
    }

    async fn list_by_name(
        &self,
        scope: &Scope,
        owner: &str,
        name: &str,
    ) -> Result<Vec<Candidate>, ApiError> {
        let zone = scope.zone().ok_or_else(|| wrong_scope(scope, "zone"))?;
        let volumes = self.api.list_volumes(zone, request(owner, name)).await?;
        Ok(volumes
            .into_iter()
            .map(|v| Candidate { id: v.id, name: v.name })
            .collect())
    }
}

pub struct ProjectLookup {
    api: Arc<dyn AccountApi>,
}

impl ProjectLookup {
    pub fn new(api: Arc<dyn AccountApi>) -> Self {
        Self { api }
    }
}

#[async_trait]
impl LookupDriver for ProjectLookup {
    fn entity(&self) -> &'static str {
        "project"
    }

    fn list_scope(&self) -> ListScope {
        ListScope::Organization
    }

    async fn list_by_name(
        &self,
        _scope: &Scope,
        owner: &str,
        name: &str,
    ) -> Result<Vec<Candidate>, ApiError> {
        let projects = self.api.list_projects(request(owner, name)).await?;
        Ok(projects
            .into_iter()
            .map(|p| Candidate { id: p.id, name: p.name })
            .collect())
    }
}

pub struct PrivateNetworkLookup {
    api: Arc<dyn VpcApi>,
}

impl PrivateNetworkLookup {
    pub fn new(api: Arc<dyn VpcApi>) -> Self {
        Self { api }
    }
}

#[async_trait]
impl LookupDriver for PrivateNetworkLookup {
    fn entity(&self) -> &'static str {
        "private_network"
    }

    async fn list_by_name(
        &self,
        scope: &Scope,
        owner: &str,
        name: &str,
    ) -> Result<Vec<Candidate>, ApiError> {
        let region = scope.region().ok_or_else(|| wrong_scope(scope, "region"))?;
        let networks = self
            .api
            .list_private_networks(&region, request(owner, name))
            .await?;
        Ok(networks
            .into_iter()
            .map(|n| Candidate { id: n.id, name: n.name })
            .collect())
    }
}
