//! scaleway_instance_ip

use std::sync::Arc;

use async_trait::async_trait;

use scaleway_core::ProviderResult;
use scaleway_core::id::CompositeId;
use scaleway_core::lifecycle::ResourceDriver;
use scaleway_core::locality::{Locality, Scope};
use scaleway_core::resource::ResourceData;
use scaleway_core::schema::{AttributeSchema, AttributeType, ResourceSchema, types};

use crate::api::{CreateIpRequest, InstanceApi, Ip, UpdateIpRequest};
use crate::utils::{owner, tags_value, zone_of};

pub const TYPE_NAME: &str = "scaleway_instance_ip";

pub struct InstanceIp {
    api: Arc<dyn InstanceApi>,
}

impl InstanceIp {
    pub fn new(api: Arc<dyn InstanceApi>) -> Self {
        Self { api }
    }
}

fn flatten(ip: &Ip, data: &mut ResourceData) {
    data.set("address", ip.address.as_str());
    data.set("reverse", ip.reverse.clone().unwrap_or_default());
    data.set("tags", tags_value(&ip.tags));
    data.set("project_id", ip.project.as_str());
    data.set("organization_id", ip.organization.as_str());
}

#[async_trait]
impl ResourceDriver for InstanceIp {
    fn type_name(&self) -> &'static str {
        TYPE_NAME
    }

    fn schema(&self) -> ResourceSchema {
        ResourceSchema::new(TYPE_NAME)
            .with_description("Flexible IP attached to an instance zone")
            .attribute(
                AttributeSchema::new("address", AttributeType::String)
                    .computed()
                    .with_description("The IP address"),
            )
            .attribute(
                AttributeSchema::new("reverse", AttributeType::String)
                    .optional()
                    .with_description("The reverse DNS for this IP"),
            )
            .attribute(types::tags())
            .attribute(types::zone())
            .attribute(types::project_id())
            .attribute(types::organization_id())
    }

    fn locality(&self) -> Locality {
        Locality::Zonal
    }

    /// Deleted IPs answer 403 instead of 404
    fn forbidden_means_gone(&self) -> bool {
        true
    }

    async fn create(&self, scope: &Scope, data: &ResourceData) -> ProviderResult<String> {
        let zone = zone_of(scope)?;
        let req = CreateIpRequest {
            project: owner(data, "project_id")?,
            tags: data.get_string_list("tags"),
        };
        let ip = self.api.create_ip(zone, req).await?;
        Ok(ip.id)
    }

    /// Reverse can only be set once the address exists
    async fn after_create(&self, id: &CompositeId, data: &ResourceData) -> ProviderResult<()> {
        let Some(reverse) = data.get_str("reverse") else {
            return Ok(());
        };
        let req = UpdateIpRequest {
            reverse: Some(reverse.to_string()),
            tags: None,
        };
        self.api.update_ip(zone_of(&id.scope)?, &id.uuid, req).await?;
        Ok(())
    }

    async fn read(&self, id: &CompositeId, data: &mut ResourceData) -> ProviderResult<()> {
        let ip = self.api.get_ip(zone_of(&id.scope)?, &id.uuid).await?;
        flatten(&ip, data);
        Ok(())
    }

    async fn update(&self, id: &CompositeId, data: &ResourceData) -> ProviderResult<()> {
        let req = UpdateIpRequest {
            reverse: data.patch_string("reverse"),
            tags: data.patch_string_list("tags"),
        };
        if req == UpdateIpRequest::default() {
            return Ok(());
        }
        self.api.update_ip(zone_of(&id.scope)?, &id.uuid, req).await?;
        Ok(())
    }

    async fn delete(&self, id: &CompositeId) -> ProviderResult<()> {
        self.api.delete_ip(zone_of(&id.scope)?, &id.uuid).await?;
        Ok(())
    }
}
