//! Data source - Look an object up by ID or by exact name, then read it
//! through the matching resource's Read

use std::sync::Arc;

use async_trait::async_trait;
use log::debug;
use tokio_util::sync::CancellationToken;

use crate::config::ProviderMeta;
use crate::error::{ApiError, ProviderError, ProviderResult};
use crate::finder::find_exact;
use crate::id::CompositeId;
use crate::lifecycle::Timeouts;
use crate::locality::Scope;
use crate::provider::{BoxFuture, DataSourceHandler, ResourceHandler};
use crate::resource::{AttributeMap, ResourceData};
use crate::schema::ResourceSchema;
use crate::scope;
use crate::validation::{Diagnostics, check_uuid};

/// Attribute a name lookup is scoped by
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListScope {
    Project,
    Organization,
}

impl ListScope {
    pub fn attribute(self) -> &'static str {
        match self {
            ListScope::Project => "project_id",
            ListScope::Organization => "organization_id",
        }
    }
}

/// One element of a list response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub id: String,
    pub name: String,
}

/// Name lookups for one entity kind
#[async_trait]
pub trait LookupDriver: Send + Sync {
    /// Entity name; the ID selector is `<entity>_id`
    fn entity(&self) -> &'static str;

    fn list_scope(&self) -> ListScope {
        ListScope::Project
    }

    /// List objects whose name matches `name`. The backend may match loosely.
    async fn list_by_name(
        &self,
        scope: &Scope,
        owner: &str,
        name: &str,
    ) -> Result<Vec<Candidate>, ApiError>;
}

/// Data source backed by a resource's Read
pub struct DataSource<L> {
    lookup: L,
    resource: Arc<dyn ResourceHandler>,
    schema: ResourceSchema,
    meta: Arc<ProviderMeta>,
    timeouts: Timeouts,
}

impl<L: LookupDriver> DataSource<L> {
    pub fn new(lookup: L, resource: Arc<dyn ResourceHandler>, meta: Arc<ProviderMeta>) -> Self {
        let mut lookup_keys = vec![lookup.list_scope().attribute()];
        lookup_keys.extend(resource.locality().attribute());
        let schema = resource
            .schema()
            .to_datasource(&lookup_keys)
            .with_lookup_fields(lookup.entity());
        Self {
            lookup,
            resource,
            schema,
            meta,
            timeouts: Timeouts::default(),
        }
    }

    pub fn id_attribute(&self) -> String {
        format!("{}_id", self.lookup.entity())
    }

    /// Composite ID selected by the configuration
    async fn resolve(&self, cancel: &CancellationToken, config: &AttributeMap) -> ProviderResult<String> {
        let id_attribute = self.id_attribute();
        let locality = self.resource.locality();

        if let Some(raw) = config.get_str(&id_attribute) {
            if raw.contains('/') {
                return Ok(CompositeId::parse_for(locality, raw)?.encode());
            }
            check_uuid(raw).map_err(|reason| ProviderError::MalformedId {
                id: raw.to_string(),
                reason,
            })?;
            let scope = scope::extract_scope(locality, config, &self.meta, &[])?;
            return Ok(CompositeId::new(scope, raw).encode());
        }

        let Some(name) = config.get_str("name") else {
            return Err(ProviderError::MissingSelector { id_attribute });
        };
        let scope = scope::extract_scope(locality, config, &self.meta, &[])?;
        let owner = match self.lookup.list_scope() {
            ListScope::Project => scope::extract_project_id(config, &self.meta)?,
            ListScope::Organization => scope::extract_organization_id(config, &self.meta)?,
        };

        let what = format!("list {} named {}", self.lookup.entity(), name);
        let candidates = crate::wait::guard(
            cancel,
            self.timeouts.read,
            &what,
            self.lookup.list_by_name(&scope, &owner, name),
        )
        .await?;
        debug!("{}: {} candidate(s) for name {}", self.type_name(), candidates.len(), name);

        let found = find_exact(candidates, |c| c.name == name, name)?;
        Ok(CompositeId::new(scope, found.id).encode())
    }

    async fn read_inner(
        &self,
        cancel: &CancellationToken,
        config: &AttributeMap,
    ) -> ProviderResult<ResourceData> {
        let id = self.resolve(cancel, config).await?;
        let mut data = ResourceData::from_state(id.clone(), config.clone());
        self.resource.read(cancel, &mut data).await?;
        if data.id().is_empty() {
            return Err(ProviderError::NotFound(format!("{} {}", self.lookup.entity(), id)));
        }
        let resolved = data.id().to_string();
        data.set(self.id_attribute(), resolved);
        Ok(data)
    }

    pub async fn read(
        &self,
        cancel: &CancellationToken,
        config: &AttributeMap,
    ) -> ProviderResult<ResourceData> {
        self.read_inner(cancel, config)
            .await
            .map_err(|e| e.for_resource(self.type_name()))
    }

    fn type_name(&self) -> &str {
        self.resource.type_name()
    }
}

impl<L: LookupDriver> DataSourceHandler for DataSource<L> {
    fn type_name(&self) -> &str {
        DataSource::type_name(self)
    }

    fn schema(&self) -> &ResourceSchema {
        &self.schema
    }

    fn validate(&self, config: &AttributeMap) -> Diagnostics {
        self.schema.validate(config)
    }

    fn read<'a>(
        &'a self,
        cancel: &'a CancellationToken,
        config: &'a AttributeMap,
    ) -> BoxFuture<'a, ProviderResult<ResourceData>> {
        Box::pin(DataSource::read(self, cancel, config))
    }
}
