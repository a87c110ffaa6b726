//! scaleway_instance_volume

use std::sync::Arc;

use async_trait::async_trait;

use scaleway_core::error::{ApiError, ProviderError, ProviderResult};
use scaleway_core::id::CompositeId;
use scaleway_core::lifecycle::{ObjectStatus, ResourceDriver};
use scaleway_core::locality::{Locality, Scope};
use scaleway_core::resource::{ResourceData, flatten_time};
use scaleway_core::schema::{AttributeSchema, AttributeType, ResourceSchema, types};
use scaleway_core::validation;

use crate::api::{CreateVolumeRequest, InstanceApi, UpdateVolumeRequest, Volume, VolumeState};
use crate::utils::{bytes_to_gb, gb_to_bytes, owner, tags_value, zone_of};

pub const TYPE_NAME: &str = "scaleway_instance_volume";

pub const MAX_SIZE_GB: i64 = 10_000;

pub const VOLUME_TYPES: &[&str] = &["b_ssd", "l_ssd", "scratch"];

pub struct InstanceVolume {
    api: Arc<dyn InstanceApi>,
}

impl InstanceVolume {
    pub fn new(api: Arc<dyn InstanceApi>) -> Self {
        Self { api }
    }
}

pub(crate) fn volume_status(state: VolumeState) -> ObjectStatus {
    match state {
        VolumeState::Available => ObjectStatus::Stable,
        VolumeState::Error => ObjectStatus::Failed("error".to_string()),
        other => ObjectStatus::Transient(format!("{:?}", other).to_lowercase()),
    }
}

fn flatten(volume: &Volume, data: &mut ResourceData) {
    data.set("name", volume.name.as_str());
    data.set("type", volume.volume_type.as_str());
    data.set("size_in_gb", bytes_to_gb(volume.size));
    data.set("tags", tags_value(&volume.tags));
    data.set("project_id", volume.project.as_str());
    data.set("organization_id", volume.organization.as_str());
    data.set("created_at", flatten_time(volume.creation_date));
    data.set("updated_at", flatten_time(volume.modification_date));
}

#[async_trait]
impl ResourceDriver for InstanceVolume {
    fn type_name(&self) -> &'static str {
        TYPE_NAME
    }

    fn schema(&self) -> ResourceSchema {
        ResourceSchema::new(TYPE_NAME)
            .with_description("Block volume of an instance zone")
            .attribute(
                AttributeSchema::new("name", AttributeType::String)
                    .optional()
                    .computed()
                    .with_description("The name of the volume"),
            )
            .attribute(
                AttributeSchema::new(
                    "type",
                    AttributeType::Enum(VOLUME_TYPES.iter().map(|t| t.to_string()).collect()),
                )
                .required()
                .force_new()
                .with_description("The volume type"),
            )
            .attribute(
                AttributeSchema::new("size_in_gb", AttributeType::Int)
                    .required()
                    .with_validator(validation::int_between(1, MAX_SIZE_GB))
                    .with_description("The size of the volume in gigabytes"),
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

    fn name_prefix(&self) -> Option<&'static str> {
        Some("tf-vol")
    }

    fn has_async_state(&self) -> bool {
        true
    }

    fn wait_after_delete(&self) -> bool {
        true
    }

    async fn create(&self, scope: &Scope, data: &ResourceData) -> ProviderResult<String> {
        let req = CreateVolumeRequest {
            name: data.get_str("name").unwrap_or_default().to_string(),
            project: owner(data, "project_id")?,
            volume_type: data.get_str("type").unwrap_or_default().to_string(),
            size: gb_to_bytes(data.get_int("size_in_gb").unwrap_or_default())?,
            tags: data.get_string_list("tags"),
        };
        let volume = self.api.create_volume(zone_of(scope)?, req).await?;
        Ok(volume.id)
    }

    async fn read(&self, id: &CompositeId, data: &mut ResourceData) -> ProviderResult<()> {
        let volume = self.api.get_volume(zone_of(&id.scope)?, &id.uuid).await?;
        flatten(&volume, data);
        Ok(())
    }

    async fn update(&self, id: &CompositeId, data: &ResourceData) -> ProviderResult<()> {
        let mut req = UpdateVolumeRequest {
            name: data.patch_string("name"),
            tags: data.patch_string_list("tags"),
            size: None,
        };
        if data.has_change("size_in_gb") {
            let wanted = data.get_int("size_in_gb").unwrap_or_default();
            let current = data
                .prior()
                .and_then(|p| p.get("size_in_gb"))
                .and_then(|v| v.as_int())
                .unwrap_or_default();
            if wanted < current {
                return Err(ProviderError::validation(
                    "size_in_gb",
                    format!("volumes can only grow: {} GB is less than {} GB", wanted, current),
                ));
            }
            req.size = Some(gb_to_bytes(wanted)?);
        }
        if req == UpdateVolumeRequest::default() {
            return Ok(());
        }
        self.api.update_volume(zone_of(&id.scope)?, &id.uuid, req).await?;
        Ok(())
    }

    async fn delete(&self, id: &CompositeId) -> ProviderResult<()> {
        self.api.delete_volume(zone_of(&id.scope)?, &id.uuid).await?;
        Ok(())
    }

    async fn status(&self, id: &CompositeId) -> Result<ObjectStatus, ApiError> {
        let zone = zone_of(&id.scope).map_err(|e| ApiError::http(400, e.to_string()))?;
        let volume = self.api.get_volume(zone, &id.uuid).await?;
        Ok(volume_status(volume.state))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeCloud, meta};
    use scaleway_core::CancellationToken;
    use scaleway_core::lifecycle::ManagedResource;
    use scaleway_core::resource::AttributeMap;
    use std::time::Duration;
    use tokio::time::Instant;

    fn resource(cloud: &FakeCloud) -> ManagedResource<InstanceVolume> {
        ManagedResource::new(InstanceVolume::new(Arc::new(cloud.clone())), meta())
    }

    fn config() -> AttributeMap {
        AttributeMap::new().with("type", "b_ssd").with("size_in_gb", 20)
    }

    #[test]
    fn status_mapping() {
        assert_eq!(volume_status(VolumeState::Available), ObjectStatus::Stable);
        assert_eq!(
            volume_status(VolumeState::Hotsyncing),
            ObjectStatus::Transient("hotsyncing".to_string())
        );
        assert!(matches!(volume_status(VolumeState::Error), ObjectStatus::Failed(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn create_waits_for_available() {
        let cloud = FakeCloud::new();
        cloud.transient_polls(3);
        let volume = resource(&cloud);
        let started = Instant::now();

        let mut data = ResourceData::new(config());
        volume.create(&CancellationToken::new(), &mut data).await.unwrap();

        assert!(data.get_str("name").unwrap().starts_with("tf-vol-"));
        assert_eq!(data.get_int("size_in_gb"), Some(20));
        assert!(data.get_str("created_at").unwrap().ends_with('Z'));
        assert_eq!(started.elapsed(), Duration::from_secs(15));
    }

    #[tokio::test]
    async fn read_on_not_found_clears_id() {
        let cloud = FakeCloud::new();
        let volume = resource(&cloud);
        let id = format!("fr-par-1/{}", FakeCloud::unknown_uuid());
        let mut data = ResourceData::from_state(id, config());

        volume.read(&CancellationToken::new(), &mut data).await.unwrap();
        assert!(data.id().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn shrinking_is_refused() {
        let cloud = FakeCloud::new();
        let volume = resource(&cloud);
        let cancel = CancellationToken::new();

        let mut data = ResourceData::new(config());
        volume.create(&cancel, &mut data).await.unwrap();
        let prior = data.attributes().clone();

        let desired = AttributeMap::new().with("type", "b_ssd").with("size_in_gb", 10);
        let mut data = ResourceData::for_update(data.id(), prior.clone(), desired);
        let err = volume.update(&cancel, &mut data).await.unwrap_err();
        assert!(err.to_string().contains("only grow"));

        let desired = AttributeMap::new().with("type", "b_ssd").with("size_in_gb", 50);
        let mut data = ResourceData::for_update(data.id(), prior, desired);
        volume.update(&cancel, &mut data).await.unwrap();
        assert_eq!(data.get_int("size_in_gb"), Some(50));
    }

    #[test]
    fn size_must_be_positive() {
        let volume = resource(&FakeCloud::new());
        for gb in [0, -1, i64::MAX] {
            let config = AttributeMap::new().with("type", "b_ssd").with("size_in_gb", gb);
            assert!(volume.validate(&config).has_errors(), "{}", gb);
        }
        assert!(volume.validate(&config()).is_clean());
    }

    #[tokio::test]
    async fn oversized_create_is_refused_before_calling_the_api() {
        let cloud = FakeCloud::new();
        let volume = resource(&cloud);

        let config = AttributeMap::new().with("type", "b_ssd").with("size_in_gb", i64::MAX);
        let mut data = ResourceData::new(config);
        let err = volume.create(&CancellationToken::new(), &mut data).await.unwrap_err();
        assert!(matches!(err.root(), ProviderError::Validation(_)));
        assert!(data.id().is_empty());
        assert_eq!(cloud.volume_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn unchanged_tags_are_not_sent() {
        let cloud = FakeCloud::new();
        let volume = resource(&cloud);
        let cancel = CancellationToken::new();

        let mut data = ResourceData::new(config().with("tags", scaleway_core::resource::Value::string_list(["a"])));
        volume.create(&cancel, &mut data).await.unwrap();
        let prior = data.attributes().clone();

        let desired = config()
            .with("name", "renamed")
            .with("tags", scaleway_core::resource::Value::string_list(["a"]));
        let mut data = ResourceData::for_update(data.id(), prior, desired);
        volume.update(&cancel, &mut data).await.unwrap();

        let sent = cloud.last_volume_update().unwrap();
        assert_eq!(sent.name.as_deref(), Some("renamed"));
        assert_eq!(sent.tags, None);
        assert_eq!(sent.size, None);
    }

    #[tokio::test(start_paused = true)]
    async fn delete_is_idempotent() {
        let cloud = FakeCloud::new();
        let volume = resource(&cloud);
        let cancel = CancellationToken::new();

        let mut data = ResourceData::new(config());
        volume.create(&cancel, &mut data).await.unwrap();
        let id = data.id().to_string();

        volume.delete(&cancel, &mut data).await.unwrap();
        let mut again = ResourceData::from_state(id, AttributeMap::new());
        volume.delete(&cancel, &mut again).await.unwrap();
        assert!(again.id().is_empty());
    }
}
