//! scaleway_instance_snapshot
//!
//! Lives in the zone of the volume it was taken from.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use scaleway_core::error::{ApiError, ProviderResult};
use scaleway_core::id::{self, CompositeId};
use scaleway_core::lifecycle::{ObjectStatus, ResourceDriver, Timeouts};
use scaleway_core::locality::{Locality, Scope};
use scaleway_core::resource::{ResourceData, flatten_time};
use scaleway_core::schema::{AttributeSchema, AttributeType, ResourceSchema, types};
use scaleway_core::validation;

use crate::api::{CreateSnapshotRequest, InstanceApi, Snapshot, SnapshotState, UpdateSnapshotRequest};
use crate::utils::{bytes_to_gb, owner, tags_value, zone_of};

pub const TYPE_NAME: &str = "scaleway_instance_snapshot";

pub struct InstanceSnapshot {
    api: Arc<dyn InstanceApi>,
}

impl InstanceSnapshot {
    pub fn new(api: Arc<dyn InstanceApi>) -> Self {
        Self { api }
    }
}

fn snapshot_status(state: SnapshotState) -> ObjectStatus {
    match state {
        SnapshotState::Available => ObjectStatus::Stable,
        SnapshotState::Snapshotting | SnapshotState::Importing | SnapshotState::Exporting => {
            ObjectStatus::Transient(format!("{:?}", state).to_lowercase())
        }
        SnapshotState::Error | SnapshotState::Invalid => {
            ObjectStatus::Failed(format!("{:?}", state).to_lowercase())
        }
    }
}

fn flatten(snapshot: &Snapshot, scope: &Scope, data: &mut ResourceData) {
    data.set("name", snapshot.name.as_str());
    data.set("type", snapshot.volume_type.as_str());
    data.set("size_in_gb", bytes_to_gb(snapshot.size));
    // keep the form the user wrote, bare or zoned, while it names the same volume
    let volume_id = match (snapshot.base_volume_id.as_deref(), data.get_str("volume_id")) {
        (Some(base), Some(current)) if id::strip_scope(current) == base => Some(current.to_string()),
        (base, _) => base.map(|volume| id::encode(scope, volume)),
    };
    data.set("volume_id", volume_id);
    data.set("tags", tags_value(&snapshot.tags));
    data.set("project_id", snapshot.project.as_str());
    data.set("organization_id", snapshot.organization.as_str());
    data.set("created_at", flatten_time(snapshot.creation_date));
    data.set("updated_at", flatten_time(snapshot.modification_date));
}

#[async_trait]
impl ResourceDriver for InstanceSnapshot {
    fn type_name(&self) -> &'static str {
        TYPE_NAME
    }

    fn schema(&self) -> ResourceSchema {
        ResourceSchema::new(TYPE_NAME)
            .with_description("Snapshot of an instance volume")
            .attribute(
                AttributeSchema::new("name", AttributeType::String)
                    .optional()
                    .computed()
                    .with_description("The name of the snapshot"),
            )
            .attribute(
                AttributeSchema::new("volume_id", AttributeType::String)
                    .required()
                    .force_new()
                    .with_validator(validation::uuid_or_localized())
                    .with_description("ID of the volume to take a snapshot from"),
            )
            .attribute(
                AttributeSchema::new("type", AttributeType::String)
                    .computed()
                    .with_description("The volume type of the snapshot"),
            )
            .attribute(
                AttributeSchema::new("size_in_gb", AttributeType::Int)
                    .computed()
                    .with_description("The size of the snapshot in gigabytes"),
            )
            .attribute(types::tags())
            .attribute(types::zone())
            .attribute(types::project_id())
            .attribute(types::organization_id())
            .attribute(types::timestamp("created_at"))
            .attribute(types::timestamp("updated_at"))
    }

    fn locality(&self) -> Locality {
        Locality::Zonal
    }

    fn scope_sources(&self) -> &'static [&'static str] {
        &["volume_id"]
    }

    fn name_prefix(&self) -> Option<&'static str> {
        Some("tf-snap")
    }

    fn timeouts(&self) -> Timeouts {
        Timeouts {
            delete: Duration::from_secs(20 * 60),
            ..Timeouts::default()
        }
    }

    fn has_async_state(&self) -> bool {
        true
    }

    /// The backend rejects deleting a snapshot that is still being taken
    fn wait_before_delete(&self) -> bool {
        true
    }

    fn wait_after_delete(&self) -> bool {
        true
    }

    async fn create(&self, scope: &Scope, data: &ResourceData) -> ProviderResult<String> {
        let req = CreateSnapshotRequest {
            name: data.get_str("name").unwrap_or_default().to_string(),
            volume_id: id::strip_scope(data.get_str("volume_id").unwrap_or_default()).to_string(),
            project: owner(data, "project_id")?,
            tags: data.get_string_list("tags"),
        };
        let snapshot = self.api.create_snapshot(zone_of(scope)?, req).await?;
        Ok(snapshot.id)
    }

    async fn read(&self, id: &CompositeId, data: &mut ResourceData) -> ProviderResult<()> {
        let snapshot = self.api.get_snapshot(zone_of(&id.scope)?, &id.uuid).await?;
        flatten(&snapshot, &id.scope, data);
        Ok(())
    }

    async fn update(&self, id: &CompositeId, data: &ResourceData) -> ProviderResult<()> {
        let req = UpdateSnapshotRequest {
            name: data.patch_string("name"),
            tags: data.patch_string_list("tags"),
        };
        if req == UpdateSnapshotRequest::default() {
            return Ok(());
        }
        self.api.update_snapshot(zone_of(&id.scope)?, &id.uuid, req).await?;
        Ok(())
    }

    async fn delete(&self, id: &CompositeId) -> ProviderResult<()> {
        self.api.delete_snapshot(zone_of(&id.scope)?, &id.uuid).await?;
        Ok(())
    }

    async fn status(&self, id: &CompositeId) -> Result<ObjectStatus, ApiError> {
        let zone = zone_of(&id.scope).map_err(|e| ApiError::http(400, e.to_string()))?;
        let snapshot = self.api.get_snapshot(zone, &id.uuid).await?;
        Ok(snapshot_status(snapshot.state))
    }
}
