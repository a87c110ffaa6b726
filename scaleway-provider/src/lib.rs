//! Scaleway Provider
//!
//! Concrete resources and data sources on top of `scaleway-core`.
//!
//! ## Module Structure
//!
//! - `api` - Vendor models and the client traits the drivers call
//! - `resources` - One driver per resource type
//! - `datasources` - Name lookups backing the data sources
//! - `utils` - Helpers shared by the drivers

pub mod api;
pub mod datasources;
pub mod resources;
pub mod utils;

#[cfg(test)]
mod testing;

use std::sync::Arc;

use log::{info, warn};

use scaleway_core::ProviderResult;
use scaleway_core::config::{ProviderConfig, ProviderMeta};
use scaleway_core::datasource::DataSource;
use scaleway_core::lifecycle::ManagedResource;
use scaleway_core::provider::{Provider, ResourceHandler};
use scaleway_core::resource::AttributeMap;

use api::{AccountApi, InstanceApi, VpcApi};
use datasources::{PrivateNetworkLookup, ProjectLookup, VolumeLookup};
use resources::{AccountProject, InstanceIp, InstanceSnapshot, InstanceVolume, VpcPrivateNetwork};

pub const PROVIDER_NAME: &str = "scaleway";

/// API clients the drivers talk through
#[derive(Clone)]
pub struct Clients {
    pub instance: Arc<dyn InstanceApi>,
    pub account: Arc<dyn AccountApi>,
    pub vpc: Arc<dyn VpcApi>,
}

/// Turn the host's provider block into the shared context, falling back to
/// the `SCW_*` environment for anything left unset
pub fn configure(attributes: &AttributeMap) -> ProviderResult<Arc<ProviderMeta>> {
    let config = ProviderConfig::from_attributes(attributes)?.with_process_env();
    configure_from(&config)
}

fn configure_from(config: &ProviderConfig) -> ProviderResult<Arc<ProviderMeta>> {
    for warning in config.validate().warnings {
        warn!("provider: {}", warning);
    }
    let meta = ProviderMeta::from_config(config)?;
    info!(
        "provider: default zone {:?}, region {:?}",
        meta.default_zone().map(|z| z.as_str()),
        meta.default_region().map(|r| r.as_str())
    );
    Ok(Arc::new(meta))
}

/// Register every resource and data source
pub fn new_provider(meta: Arc<ProviderMeta>, clients: Clients) -> Provider {
    let ip = Arc::new(ManagedResource::new(
        InstanceIp::new(clients.instance.clone()),
        meta.clone(),
    ));
    let volume: Arc<dyn ResourceHandler> = Arc::new(ManagedResource::new(
        InstanceVolume::new(clients.instance.clone()),
        meta.clone(),
    ));
    let snapshot = Arc::new(ManagedResource::new(
        InstanceSnapshot::new(clients.instance.clone()),
        meta.clone(),
    ));
    let project: Arc<dyn ResourceHandler> = Arc::new(ManagedResource::new(
        AccountProject::new(clients.account.clone()),
        meta.clone(),
    ));
    let network: Arc<dyn ResourceHandler> = Arc::new(ManagedResource::new(
        VpcPrivateNetwork::new(clients.vpc.clone()),
        meta.clone(),
    ));

    let volume_lookup = DataSource::new(VolumeLookup::new(clients.instance), volume.clone(), meta.clone());
    let project_lookup = DataSource::new(ProjectLookup::new(clients.account), project.clone(), meta.clone());
    let network_lookup = DataSource::new(PrivateNetworkLookup::new(clients.vpc), network.clone(), meta);

    let mut provider = Provider::new(PROVIDER_NAME);
    provider
        .register_resource(ip)
        .register_resource(volume)
        .register_resource(snapshot)
        .register_resource(project)
        .register_resource(network)
        .register_data_source(Arc::new(volume_lookup))
        .register_data_source(Arc::new(project_lookup))
        .register_data_source(Arc::new(network_lookup));
    provider
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeCloud, ORGANIZATION, PROJECT, meta};
    use scaleway_core::resource::ResourceData;
    use scaleway_core::{CancellationToken, ProviderError};

    fn provider(cloud: &FakeCloud) -> Provider {
        let clients = Clients {
            instance: Arc::new(cloud.clone()),
            account: Arc::new(cloud.clone()),
            vpc: Arc::new(cloud.clone()),
        };
        new_provider(meta(), clients)
    }

    #[test]
    fn registered_types() {
        let provider = provider(&FakeCloud::new());
        assert_eq!(provider.name(), "scaleway");
        assert_eq!(
            provider.resource_types().collect::<Vec<_>>(),
            vec![
                "scaleway_account_project",
                "scaleway_instance_ip",
                "scaleway_instance_snapshot",
                "scaleway_instance_volume",
                "scaleway_vpc_private_network",
            ]
        );
        assert_eq!(
            provider.data_source_types().collect::<Vec<_>>(),
            vec![
                "scaleway_account_project",
                "scaleway_instance_volume",
                "scaleway_vpc_private_network",
            ]
        );
    }

    #[test]
    fn schemas_are_well_formed() {
        let provider = provider(&FakeCloud::new());
        assert_eq!(provider.check_schemas(), Ok(()));
    }

    #[test]
    fn configure_from_block() {
        let config = ProviderConfig {
            zone: Some("ams1".to_string()),
            project_id: Some(PROJECT.to_string()),
            organization_id: Some(ORGANIZATION.to_string()),
            ..ProviderConfig::default()
        };
        let meta = configure_from(&config).unwrap();
        assert_eq!(meta.default_zone().unwrap().as_str(), "nl-ams-1");
        assert_eq!(meta.default_region().unwrap().as_str(), "nl-ams");
        assert_eq!(meta.default_project_id(), Some(PROJECT));
    }

    #[test]
    fn configure_rejects_bad_project() {
        let config = ProviderConfig {
            project_id: Some("nope".to_string()),
            ..ProviderConfig::default()
        };
        assert!(matches!(configure_from(&config), Err(ProviderError::Validation(_))));
    }

    #[tokio::test]
    async fn volume_round_trip_through_registry() {
        let cloud = FakeCloud::new();
        let provider = provider(&cloud);
        let cancel = CancellationToken::new();
        let volume = provider.resource("scaleway_instance_volume").unwrap();

        let config = AttributeMap::new()
            .with("name", "data")
            .with("type", "b_ssd")
            .with("size_in_gb", 20);
        assert!(volume.validate(&config).is_clean());

        let mut data = ResourceData::new(config);
        volume.create(&cancel, &mut data).await.unwrap();
        let id = data.id().to_string();

        let lookup = provider.data_source("scaleway_instance_volume").unwrap();
        let found = lookup
            .read(&cancel, &AttributeMap::new().with("name", "data"))
            .await
            .unwrap();
        assert_eq!(found.id(), id);

        volume.delete(&cancel, &mut data).await.unwrap();
        let err = lookup
            .read(&cancel, &AttributeMap::new().with("volume_id", id.as_str()))
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }
}
