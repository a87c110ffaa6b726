//! In-memory widget backend used by the skeleton tests

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use uuid::Uuid;

use crate::datasource::{Candidate, ListScope, LookupDriver};
use crate::error::{ApiError, ProviderResult};
use crate::id::CompositeId;
use crate::lifecycle::{ObjectStatus, ResourceDriver};
use crate::locality::{Locality, Scope};
use crate::resource::ResourceData;
use crate::schema::{AttributeSchema, AttributeType, ResourceSchema, types};
use crate::validation;

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

#[derive(Debug, Clone)]
struct Widget {
    zone: String,
    name: String,
    size: i64,
    colour: String,
    organization_id: String,
    pending: u32,
}

#[derive(Debug, Default)]
struct Inner {
    widgets: BTreeMap<String, Widget>,
    /// Deleted widgets still reported as `deleting` for this many polls
    lingering: BTreeMap<String, u32>,
    settle_after: u32,
    linger: u32,
    failed_status: Option<String>,
    create_delay: Duration,
    read_error: Option<ApiError>,
    create_calls: usize,
    delete_calls: usize,
    last_update_fields: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct WidgetCloud(Arc<Mutex<Inner>>);

impl WidgetCloud {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.0.lock().unwrap()
    }

    /// A UUID no widget ever gets
    pub fn missing_uuid() -> &'static str {
        "00000000-0000-0000-0000-000000000000"
    }

    pub fn insert(&self, zone: &str, name: &str, organization_id: &str) -> String {
        let uuid = Uuid::new_v4().to_string();
        self.lock().widgets.insert(
            uuid.clone(),
            Widget {
                zone: zone.to_string(),
                name: name.to_string(),
                size: 1,
                colour: "blue".to_string(),
                organization_id: organization_id.to_string(),
                pending: 0,
            },
        );
        uuid
    }

    /// New widgets report `creating` for `polls` status calls
    pub fn settle_after(&self, polls: u32) {
        self.lock().settle_after = polls;
    }

    /// Create calls take this long to answer
    pub fn delay_creates(&self, delay: Duration) {
        self.lock().create_delay = delay;
    }

    pub fn fail_after_create(&self, status: &str) {
        self.lock().failed_status = Some(status.to_string());
    }

    pub fn fail_reads_with(&self, err: ApiError) {
        self.lock().read_error = Some(err);
    }

    pub fn linger_after_delete(&self, polls: u32) {
        self.lock().linger = polls;
    }

    pub fn create_calls(&self) -> usize {
        self.lock().create_calls
    }

    pub fn delete_calls(&self) -> usize {
        self.lock().delete_calls
    }

    pub fn last_update_fields(&self) -> Vec<String> {
        self.lock().last_update_fields.clone()
    }
}

pub struct WidgetDriver {
    cloud: WidgetCloud,
}

impl WidgetDriver {
    pub fn new(cloud: WidgetCloud) -> Self {
        Self { cloud }
    }
}

#[async_trait]
impl ResourceDriver for WidgetDriver {
    fn type_name(&self) -> &'static str {
        "scaleway_test_widget"
    }

    fn schema(&self) -> ResourceSchema {
        ResourceSchema::new("scaleway_test_widget")
            .attribute(types::zone())
            .attribute(AttributeSchema::new("name", AttributeType::String).optional().computed())
            .attribute(AttributeSchema::new("size", AttributeType::Int).required())
            .attribute(
                AttributeSchema::new("colour", AttributeType::String)
                    .optional()
                    .with_default("blue"),
            )
            .attribute(
                AttributeSchema::new("parent_id", AttributeType::String)
                    .optional()
                    .with_validator(validation::uuid_or_localized()),
            )
            .attribute(
                AttributeSchema::new("organization_id", AttributeType::String)
                    .optional()
                    .computed(),
            )
            .attribute(AttributeSchema::new("status", AttributeType::String).computed())
    }

    fn locality(&self) -> Locality {
        Locality::Zonal
    }

    fn scope_sources(&self) -> &'static [&'static str] {
        &["parent_id"]
    }

    fn name_prefix(&self) -> Option<&'static str> {
        Some("tf-widget")
    }

    fn has_async_state(&self) -> bool {
        true
    }

    fn wait_after_delete(&self) -> bool {
        true
    }

    async fn create(&self, scope: &Scope, data: &ResourceData) -> ProviderResult<String> {
        let delay = self.cloud.lock().create_delay;
        tokio::time::sleep(delay).await;
        let mut inner = self.cloud.lock();
        inner.create_calls += 1;
        let uuid = Uuid::new_v4().to_string();
        let widget = Widget {
            zone: scope.to_string(),
            name: data.get_str("name").unwrap_or_default().to_string(),
            size: data.get_int("size").unwrap_or_default(),
            colour: data.get_str("colour").unwrap_or_default().to_string(),
            organization_id: data.get_str("organization_id").unwrap_or_default().to_string(),
            pending: inner.settle_after,
        };
        inner.widgets.insert(uuid.clone(), widget);
        Ok(uuid)
    }

    async fn read(&self, id: &CompositeId, data: &mut ResourceData) -> ProviderResult<()> {
        let inner = self.cloud.lock();
        if let Some(err) = &inner.read_error {
            return Err(err.clone().into());
        }
        let widget = inner
            .widgets
            .get(&id.uuid)
            .ok_or_else(|| ApiError::not_found(format!("widget {}", id.uuid)))?;
        data.set("name", widget.name.as_str());
        data.set("size", widget.size);
        data.set("colour", widget.colour.as_str());
        data.set("organization_id", widget.organization_id.as_str());
        data.set("status", if widget.pending > 0 { "creating" } else { "ready" });
        Ok(())
    }

    async fn update(&self, id: &CompositeId, data: &ResourceData) -> ProviderResult<()> {
        let mut inner = self.cloud.lock();
        let mut fields = Vec::new();
        let widget = inner
            .widgets
            .get_mut(&id.uuid)
            .ok_or_else(|| ApiError::not_found(format!("widget {}", id.uuid)))?;
        if let Some(name) = data.patch_string("name") {
            widget.name = name;
            fields.push("name".to_string());
        }
        if data.has_change("size") {
            widget.size = data.get_int("size").unwrap_or_default();
            fields.push("size".to_string());
        }
        if let Some(colour) = data.patch_string("colour") {
            widget.colour = colour;
            fields.push("colour".to_string());
        }
        inner.last_update_fields = fields;
        Ok(())
    }

    async fn delete(&self, id: &CompositeId) -> ProviderResult<()> {
        let mut inner = self.cloud.lock();
        inner.delete_calls += 1;
        if inner.widgets.remove(&id.uuid).is_none() {
            return Err(ApiError::not_found(format!("widget {}", id.uuid)).into());
        }
        let linger = inner.linger;
        if linger > 0 {
            inner.lingering.insert(id.uuid.clone(), linger);
        }
        Ok(())
    }

    async fn status(&self, id: &CompositeId) -> Result<ObjectStatus, ApiError> {
        let mut inner = self.cloud.lock();
        let failed = inner.failed_status.clone();
        if let Some(widget) = inner.widgets.get_mut(&id.uuid) {
            if let Some(status) = failed {
                return Ok(ObjectStatus::Failed(status));
            }
            if widget.pending > 0 {
                widget.pending -= 1;
                return Ok(ObjectStatus::Transient("creating".to_string()));
            }
            return Ok(ObjectStatus::Stable);
        }
        let left = inner.lingering.get(&id.uuid).copied().unwrap_or(0);
        if left > 0 {
            inner.lingering.insert(id.uuid.clone(), left - 1);
            Ok(ObjectStatus::Transient("deleting".to_string()))
        } else {
            inner.lingering.remove(&id.uuid);
            Err(ApiError::not_found(format!("widget {}", id.uuid)))
        }
    }
}

pub struct WidgetLookup {
    cloud: WidgetCloud,
}

impl WidgetLookup {
    pub fn new(cloud: WidgetCloud) -> Self {
        Self { cloud }
    }
}

#[async_trait]
impl LookupDriver for WidgetLookup {
    fn entity(&self) -> &'static str {
        "widget"
    }

    fn list_scope(&self) -> ListScope {
        ListScope::Organization
    }

    async fn list_by_name(
        &self,
        scope: &Scope,
        owner: &str,
        name: &str,
    ) -> Result<Vec<Candidate>, ApiError> {
        let zone = scope.to_string();
        Ok(self
            .cloud
            .lock()
            .widgets
            .iter()
            .filter(|(_, w)| w.zone == zone && w.organization_id == owner && w.name.contains(name))
            .map(|(id, w)| Candidate {
                id: id.clone(),
                name: w.name.clone(),
            })
            .collect())
    }
}
