//! scaleway_vpc_private_network

use std::sync::Arc;

use async_trait::async_trait;

use scaleway_core::ProviderResult;
use scaleway_core::id::CompositeId;
use scaleway_core::lifecycle::ResourceDriver;
use scaleway_core::locality::{Locality, Scope};
use scaleway_core::resource::{ResourceData, flatten_time};
use scaleway_core::schema::{AttributeSchema, AttributeType, ResourceSchema, types};

use crate::api::{CreatePrivateNetworkRequest, PrivateNetwork, UpdatePrivateNetworkRequest, VpcApi};
use crate::utils::{owner, region_of, tags_value};

pub const TYPE_NAME: &str = "scaleway_vpc_private_network";

pub struct VpcPrivateNetwork {
    api: Arc<dyn VpcApi>,
}

impl VpcPrivateNetwork {
    pub fn new(api: Arc<dyn VpcApi>) -> Self {
        Self { api }
    }
}

fn flatten(network: &PrivateNetwork, data: &mut ResourceData) {
    data.set("name", network.name.as_str());
    data.set("tags", tags_value(&network.tags));
    data.set("project_id", network.project_id.as_str());
    data.set("organization_id", network.organization_id.as_str());
    data.set("created_at", flatten_time(network.created_at));
    data.set("updated_at", flatten_time(network.updated_at));
}

#[async_trait]
impl ResourceDriver for VpcPrivateNetwork {
    fn type_name(&self) -> &'static str {
        TYPE_NAME
    }

    fn schema(&self) -> ResourceSchema {
        ResourceSchema::new(TYPE_NAME)
            .attribute(
                AttributeSchema::new("name", AttributeType::String)
                    .optional()
                    .computed()
                    .with_description("The name of the private network"),
            )
            .attribute(types::tags())
            .attribute(types::region())
            .attribute(types::project_id())
            .attribute(types::organization_id())
            .attribute(types::timestamp("created_at"))
            .attribute(types::timestamp("updated_at"))
    }

    fn locality(&self) -> Locality {
        Locality::Regional
    }

    fn name_prefix(&self) -> Option<&'static str> {
        Some("tf-pn")
    }

    async fn create(&self, scope: &Scope, data: &ResourceData) -> ProviderResult<String> {
        let req = CreatePrivateNetworkRequest {
            name: data.get_str("name").unwrap_or_default().to_string(),
            project_id: owner(data, "project_id")?,
            tags: data.get_string_list("tags"),
        };
        let network = self.api.create_private_network(&region_of(scope)?, req).await?;
        Ok(network.id)
    }

    async fn read(&self, id: &CompositeId, data: &mut ResourceData) -> ProviderResult<()> {
        let network = self
            .api
            .get_private_network(&region_of(&id.scope)?, &id.uuid)
            .await?;
        flatten(&network, data);
        Ok(())
    }

    async fn update(&self, id: &CompositeId, data: &ResourceData) -> ProviderResult<()> {
        let req = UpdatePrivateNetworkRequest {
            name: data.patch_string("name"),
            tags: data.patch_string_list("tags"),
        };
        if req == UpdatePrivateNetworkRequest::default() {
            return Ok(());
        }
        self.api
            .update_private_network(&region_of(&id.scope)?, &id.uuid, req)
            .await?;
        Ok(())
    }

    async fn delete(&self, id: &CompositeId) -> ProviderResult<()> {
        self.api
            .delete_private_network(&region_of(&id.scope)?, &id.uuid)
            .await?;
        Ok(())
    }
}
