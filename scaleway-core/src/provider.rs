//! Provider - Registry of resource and data-source handlers
//!
//! The host looks handlers up by type name (`scaleway_instance_ip`, ...) and
//! drives their callbacks. Handlers are object-safe so drivers of different
//! types can sit in the same registry.

use std::collections::BTreeMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::differ::Diff;
use crate::error::{ProviderError, ProviderResult};
use crate::locality::Locality;
use crate::resource::{AttributeMap, ResourceData};
use crate::schema::{ResourceSchema, SchemaError};
use crate::validation::Diagnostics;

/// Return type for async operations
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Managed resource as seen by the host
pub trait ResourceHandler: Send + Sync {
    /// Resource type name (e.g., "scaleway_instance_ip")
    fn type_name(&self) -> &str;

    fn schema(&self) -> &ResourceSchema;

    fn locality(&self) -> Locality;

    /// Plan-time validation of a configuration
    fn validate(&self, config: &AttributeMap) -> Diagnostics;

    /// Decide between create, update and replace
    fn plan(&self, prior: Option<&AttributeMap>, desired: &AttributeMap) -> ProviderResult<Diff>;

    fn create<'a>(
        &'a self,
        cancel: &'a CancellationToken,
        data: &'a mut ResourceData,
    ) -> BoxFuture<'a, ProviderResult<()>>;

    /// Refresh `data`; an object that is gone leaves the ID empty
    fn read<'a>(
        &'a self,
        cancel: &'a CancellationToken,
        data: &'a mut ResourceData,
    ) -> BoxFuture<'a, ProviderResult<()>>;

    fn update<'a>(
        &'a self,
        cancel: &'a CancellationToken,
        data: &'a mut ResourceData,
    ) -> BoxFuture<'a, ProviderResult<()>>;

    fn delete<'a>(
        &'a self,
        cancel: &'a CancellationToken,
        data: &'a mut ResourceData,
    ) -> BoxFuture<'a, ProviderResult<()>>;
}

/// Read-only data source as seen by the host
pub trait DataSourceHandler: Send + Sync {
    fn type_name(&self) -> &str;

    fn schema(&self) -> &ResourceSchema;

    fn validate(&self, config: &AttributeMap) -> Diagnostics;

    /// Resolve the object selected by `config` and read it
    fn read<'a>(
        &'a self,
        cancel: &'a CancellationToken,
        config: &'a AttributeMap,
    ) -> BoxFuture<'a, ProviderResult<ResourceData>>;
}

/// Handlers registered under a provider name
pub struct Provider {
    name: String,
    resources: BTreeMap<String, Arc<dyn ResourceHandler>>,
    data_sources: BTreeMap<String, Arc<dyn DataSourceHandler>>,
}

impl Provider {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            resources: BTreeMap::new(),
            data_sources: BTreeMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn register_resource(&mut self, handler: Arc<dyn ResourceHandler>) -> &mut Self {
        self.resources.insert(handler.type_name().to_string(), handler);
        self
    }

    pub fn register_data_source(&mut self, handler: Arc<dyn DataSourceHandler>) -> &mut Self {
        self.data_sources
            .insert(handler.type_name().to_string(), handler);
        self
    }

    pub fn resource(&self, type_name: &str) -> ProviderResult<Arc<dyn ResourceHandler>> {
        self.resources
            .get(type_name)
            .cloned()
            .ok_or_else(|| ProviderError::UnknownType(type_name.to_string()))
    }

    pub fn data_source(&self, type_name: &str) -> ProviderResult<Arc<dyn DataSourceHandler>> {
        self.data_sources
            .get(type_name)
            .cloned()
            .ok_or_else(|| ProviderError::UnknownType(type_name.to_string()))
    }

    /// Registered resource type names, sorted
    pub fn resource_types(&self) -> impl Iterator<Item = &str> {
        self.resources.keys().map(String::as_str)
    }

    /// Registered data-source type names, sorted
    pub fn data_source_types(&self) -> impl Iterator<Item = &str> {
        self.data_sources.keys().map(String::as_str)
    }

    /// Run the definition checks of every registered schema
    pub fn check_schemas(&self) -> Result<(), Vec<(String, SchemaError)>> {
        let schemas = self
            .resources
            .values()
            .map(|h| (h.type_name(), h.schema()))
            .chain(self.data_sources.values().map(|h| (h.type_name(), h.schema())));

        let mut errors = Vec::new();
        for (type_name, schema) in schemas {
            if let Err(found) = schema.check_definition() {
                errors.extend(found.into_iter().map(|e| (type_name.to_string(), e)));
            }
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProviderMeta;
    use crate::datasource::DataSource;
    use crate::lifecycle::ManagedResource;
    use crate::testing::{WidgetCloud, WidgetDriver, WidgetLookup};

    fn provider() -> Provider {
        let cloud = WidgetCloud::new();
        let meta = Arc::new(ProviderMeta::default());
        let widget: Arc<dyn ResourceHandler> =
            Arc::new(ManagedResource::new(WidgetDriver::new(cloud.clone()), meta.clone()));
        let lookup = DataSource::new(WidgetLookup::new(cloud), widget.clone(), meta);

        let mut provider = Provider::new("scaleway");
        provider
            .register_resource(widget)
            .register_data_source(Arc::new(lookup));
        provider
    }

    #[test]
    fn lookup_by_type_name() {
        let provider = provider();
        assert_eq!(provider.name(), "scaleway");
        assert_eq!(
            provider.resource("scaleway_test_widget").unwrap().type_name(),
            "scaleway_test_widget"
        );
        assert!(provider.data_source("scaleway_test_widget").is_ok());
        assert_eq!(
            provider.resource_types().collect::<Vec<_>>(),
            vec!["scaleway_test_widget"]
        );
    }

    #[test]
    fn unknown_type_is_an_error() {
        let provider = provider();
        match provider.resource("scaleway_nope") {
            Err(ProviderError::UnknownType(name)) => assert_eq!(name, "scaleway_nope"),
            Err(other) => panic!("Expected UnknownType, got {:?}", other),
            Ok(_) => panic!("Expected UnknownType"),
        }
        assert!(provider.data_source("scaleway_nope").is_err());
    }

    #[test]
    fn registered_schemas_are_well_formed() {
        assert!(provider().check_schemas().is_ok());
    }
}
