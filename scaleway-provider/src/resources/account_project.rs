//! scaleway_account_project

use std::sync::Arc;

use async_trait::async_trait;

use scaleway_core::ProviderResult;
use scaleway_core::id::CompositeId;
use scaleway_core::lifecycle::ResourceDriver;
use scaleway_core::locality::{Locality, Scope};
use scaleway_core::resource::{ResourceData, flatten_time};
use scaleway_core::schema::{AttributeSchema, AttributeType, ResourceSchema, types};
use scaleway_core::validation;

use crate::api::{AccountApi, CreateProjectRequest, Project, UpdateProjectRequest};
use crate::utils::owner;

pub const TYPE_NAME: &str = "scaleway_account_project";

pub struct AccountProject {
    api: Arc<dyn AccountApi>,
}

impl AccountProject {
    pub fn new(api: Arc<dyn AccountApi>) -> Self {
        Self { api }
    }
}

fn flatten(project: &Project, data: &mut ResourceData) {
    data.set("name", project.name.as_str());
    data.set("description", project.description.as_str());
    data.set("organization_id", project.organization_id.as_str());
    data.set("created_at", flatten_time(project.created_at));
    data.set("updated_at", flatten_time(project.updated_at));
}

#[async_trait]
impl ResourceDriver for AccountProject {
    fn type_name(&self) -> &'static str {
        TYPE_NAME
    }

    fn schema(&self) -> ResourceSchema {
        ResourceSchema::new(TYPE_NAME)
            .attribute(
                AttributeSchema::new("name", AttributeType::String)
                    .optional()
                    .computed()
                    .with_description("The name of the project"),
            )
            .attribute(
                AttributeSchema::new("description", AttributeType::String)
                    .optional()
                    .with_description("The description of the project"),
            )
            .attribute(
                AttributeSchema::new("organization_id", AttributeType::String)
                    .optional()
                    .computed()
                    .force_new()
                    .with_validator(validation::uuid())
                    .with_description("The organization_id you want to attach the resource to"),
            )
            .attribute(types::timestamp("created_at"))
            .attribute(types::timestamp("updated_at"))
    }

    fn locality(&self) -> Locality {
        Locality::Global
    }

    fn name_prefix(&self) -> Option<&'static str> {
        Some("tf-project")
    }

    async fn create(&self, _scope: &Scope, data: &ResourceData) -> ProviderResult<String> {
        let req = CreateProjectRequest {
            name: data.get_str("name").unwrap_or_default().to_string(),
            organization_id: owner(data, "organization_id")?,
            description: data.get_str("description").unwrap_or_default().to_string(),
        };
        let project = self.api.create_project(req).await?;
        Ok(project.id)
    }

    async fn read(&self, id: &CompositeId, data: &mut ResourceData) -> ProviderResult<()> {
        let project = self.api.get_project(&id.uuid).await?;
        flatten(&project, data);
        Ok(())
    }

    async fn update(&self, id: &CompositeId, data: &ResourceData) -> ProviderResult<()> {
        let req = UpdateProjectRequest {
            name: data.patch_string("name"),
            description: data.patch_string("description"),
        };
        if req == UpdateProjectRequest::default() {
            return Ok(());
        }
        self.api.update_project(&id.uuid, req).await?;
        Ok(())
    }

    async fn delete(&self, id: &CompositeId) -> ProviderResult<()> {
        self.api.delete_project(&id.uuid).await?;
        Ok(())
    }
}
