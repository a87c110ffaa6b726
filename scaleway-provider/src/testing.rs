//! In-memory Scaleway backend for driver tests

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use scaleway_core::ApiError;
use scaleway_core::config::ProviderMeta;
use scaleway_core::locality::{Region, Zone};

use crate::api::*;

pub const PROJECT: &str = "11111111-1111-1111-1111-111111111111";
pub const ORGANIZATION: &str = "22222222-2222-2222-2222-222222222222";

/// Provider defaults the driver tests run with
pub fn meta() -> Arc<ProviderMeta> {
    let _ = env_logger::builder().is_test(true).try_init();
    Arc::new(
        ProviderMeta::default()
            .with_zone(Zone::parse("fr-par-1").unwrap())
            .with_project_id(PROJECT)
            .with_organization_id(ORGANIZATION),
    )
}

#[derive(Debug, Default)]
struct Inner {
    ips: BTreeMap<String, Ip>,
    /// Released IPs answer 403 from then on
    released_ips: Vec<String>,
    volumes: BTreeMap<String, (Volume, u32)>,
    snapshots: BTreeMap<String, (Snapshot, u32)>,
    projects: BTreeMap<String, Project>,
    networks: BTreeMap<String, PrivateNetwork>,
    failures: BTreeMap<String, ApiError>,
    transient_polls: u32,
    rejected_busy_deletes: usize,
    last_ip_update: Option<UpdateIpRequest>,
    last_volume_update: Option<UpdateVolumeRequest>,
    next_address: u32,
}

impl Inner {
    fn fail(&mut self, op: &str) -> Result<(), ApiError> {
        match self.failures.remove(op) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct FakeCloud(Arc<Mutex<Inner>>);

impl FakeCloud {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.0.lock().unwrap()
    }

    /// A UUID nothing ever gets
    pub fn unknown_uuid() -> &'static str {
        "00000000-0000-0000-0000-000000000000"
    }

    /// The next call of `op` fails with `err`
    pub fn fail_next(&self, op: &str, err: ApiError) {
        self.lock().failures.insert(op.to_string(), err);
    }

    /// New volumes and snapshots stay transient for this many polls
    pub fn transient_polls(&self, polls: u32) {
        self.lock().transient_polls = polls;
    }

    pub fn last_ip_update(&self) -> Option<UpdateIpRequest> {
        self.lock().last_ip_update.clone()
    }

    pub fn last_volume_update(&self) -> Option<UpdateVolumeRequest> {
        self.lock().last_volume_update.clone()
    }

    pub fn volume_count(&self) -> usize {
        self.lock().volumes.len()
    }

    pub fn rejected_busy_deletes(&self) -> usize {
        self.lock().rejected_busy_deletes
    }

    /// A settled 20 GB b_ssd volume
    pub fn insert_volume(&self, zone: &str, name: &str, project: &str) -> String {
        let id = Uuid::new_v4().to_string();
        let volume = Volume {
            id: id.clone(),
            name: name.to_string(),
            volume_type: "b_ssd".to_string(),
            size: 20_000_000_000,
            state: VolumeState::Available,
            zone: zone.to_string(),
            project: project.to_string(),
            organization: ORGANIZATION.to_string(),
            tags: Vec::new(),
            creation_date: Some(Utc::now()),
            modification_date: None,
        };
        self.lock().volumes.insert(id.clone(), (volume, 0));
        id
    }

    /// Put a snapshot, by composite ID, into `exporting` for `polls` polls
    pub fn make_snapshot_busy(&self, id: &str, polls: u32) {
        let uuid = id.rsplit('/').next().unwrap_or(id);
        if let Some((snapshot, pending)) = self.lock().snapshots.get_mut(uuid) {
            snapshot.state = SnapshotState::Exporting;
            *pending = polls;
        }
    }

    pub fn insert_project(&self, name: &str, organization_id: &str) -> String {
        let id = Uuid::new_v4().to_string();
        let project = Project {
            id: id.clone(),
            name: name.to_string(),
            organization_id: organization_id.to_string(),
            description: String::new(),
            created_at: Some(Utc::now()),
            updated_at: None,
        };
        self.lock().projects.insert(id.clone(), project);
        id
    }

    pub fn insert_private_network(&self, region: &str, name: &str, project_id: &str) -> String {
        let id = Uuid::new_v4().to_string();
        let network = PrivateNetwork {
            id: id.clone(),
            name: name.to_string(),
            region: region.to_string(),
            project_id: project_id.to_string(),
            organization_id: ORGANIZATION.to_string(),
            tags: Vec::new(),
            created_at: Some(Utc::now()),
            updated_at: None,
        };
        self.lock().networks.insert(id.clone(), network);
        id
    }
}

fn not_found(kind: &str, id: &str) -> ApiError {
    ApiError::not_found(format!("{} {}", kind, id))
}

#[async_trait]
impl InstanceApi for FakeCloud {
    async fn create_ip(&self, zone: &Zone, req: CreateIpRequest) -> Result<Ip, ApiError> {
        let mut inner = self.lock();
        inner.fail("create_ip")?;
        inner.next_address += 1;
        let n = inner.next_address;
        let ip = Ip {
            id: Uuid::new_v4().to_string(),
            address: format!("51.15.{}.{}", n / 256, n % 256),
            reverse: None,
            zone: zone.to_string(),
            project: req.project,
            organization: ORGANIZATION.to_string(),
            tags: req.tags,
        };
        inner.ips.insert(ip.id.clone(), ip.clone());
        Ok(ip)
    }

    async fn get_ip(&self, _zone: &Zone, id: &str) -> Result<Ip, ApiError> {
        let mut inner = self.lock();
        inner.fail("get_ip")?;
        if inner.released_ips.iter().any(|r| r == id) {
            return Err(ApiError::http(403, "insufficient permissions"));
        }
        inner.ips.get(id).cloned().ok_or_else(|| not_found("ip", id))
    }

    async fn update_ip(&self, _zone: &Zone, id: &str, req: UpdateIpRequest) -> Result<Ip, ApiError> {
        let mut inner = self.lock();
        inner.fail("update_ip")?;
        inner.last_ip_update = Some(req.clone());
        let ip = inner.ips.get_mut(id).ok_or_else(|| not_found("ip", id))?;
        if let Some(reverse) = req.reverse {
            ip.reverse = (!reverse.is_empty()).then_some(reverse);
        }
        if let Some(tags) = req.tags {
            ip.tags = tags;
        }
        Ok(ip.clone())
    }

    async fn delete_ip(&self, _zone: &Zone, id: &str) -> Result<(), ApiError> {
        let mut inner = self.lock();
        inner.fail("delete_ip")?;
        if inner.released_ips.iter().any(|r| r == id) {
            return Err(ApiError::http(403, "insufficient permissions"));
        }
        inner.ips.remove(id).ok_or_else(|| not_found("ip", id))?;
        inner.released_ips.push(id.to_string());
        Ok(())
    }

    async fn create_volume(&self, zone: &Zone, req: CreateVolumeRequest) -> Result<Volume, ApiError> {
        let mut inner = self.lock();
        inner.fail("create_volume")?;
        let pending = inner.transient_polls;
        let volume = Volume {
            id: Uuid::new_v4().to_string(),
            name: req.name,
            volume_type: req.volume_type,
            size: req.size,
            state: if pending > 0 { VolumeState::Fetching } else { VolumeState::Available },
            zone: zone.to_string(),
            project: req.project,
            organization: ORGANIZATION.to_string(),
            tags: req.tags,
            creation_date: Some(Utc::now()),
            modification_date: None,
        };
        inner.volumes.insert(volume.id.clone(), (volume.clone(), pending));
        Ok(volume)
    }

    async fn get_volume(&self, zone: &Zone, id: &str) -> Result<Volume, ApiError> {
        let mut inner = self.lock();
        inner.fail("get_volume")?;
        let (volume, pending) = inner
            .volumes
            .get_mut(id)
            .filter(|(v, _)| v.zone == zone.as_str())
            .ok_or_else(|| not_found("volume", id))?;
        if *pending > 0 {
            *pending -= 1;
            return Ok(volume.clone());
        }
        volume.state = VolumeState::Available;
        Ok(volume.clone())
    }

    async fn update_volume(
        &self,
        _zone: &Zone,
        id: &str,
        req: UpdateVolumeRequest,
    ) -> Result<Volume, ApiError> {
        let mut inner = self.lock();
        inner.fail("update_volume")?;
        inner.last_volume_update = Some(req.clone());
        let (volume, _) = inner.volumes.get_mut(id).ok_or_else(|| not_found("volume", id))?;
        if let Some(name) = req.name {
            volume.name = name;
        }
        if let Some(size) = req.size {
            volume.size = size;
        }
        if let Some(tags) = req.tags {
            volume.tags = tags;
        }
        volume.modification_date = Some(Utc::now());
        Ok(volume.clone())
    }

    async fn delete_volume(&self, _zone: &Zone, id: &str) -> Result<(), ApiError> {
        let mut inner = self.lock();
        inner.fail("delete_volume")?;
        inner
            .volumes
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| not_found("volume", id))
    }

    async fn list_volumes(&self, zone: &Zone, req: ListByNameRequest) -> Result<Vec<Volume>, ApiError> {
        let mut inner = self.lock();
        inner.fail("list_volumes")?;
        Ok(inner
            .volumes
            .values()
            .map(|(v, _)| v)
            .filter(|v| v.zone == zone.as_str() && v.project == req.owner && v.name.contains(&req.name))
            .cloned()
            .collect())
    }

    async fn create_snapshot(
        &self,
        zone: &Zone,
        req: CreateSnapshotRequest,
    ) -> Result<Snapshot, ApiError> {
        let mut inner = self.lock();
        inner.fail("create_snapshot")?;
        let (base, _) = inner
            .volumes
            .get(&req.volume_id)
            .filter(|(v, _)| v.zone == zone.as_str())
            .ok_or_else(|| not_found("volume", &req.volume_id))?;
        let pending = inner.transient_polls;
        let snapshot = Snapshot {
            id: Uuid::new_v4().to_string(),
            name: req.name,
            volume_type: base.volume_type.clone(),
            size: base.size,
            state: if pending > 0 { SnapshotState::Snapshotting } else { SnapshotState::Available },
            base_volume_id: Some(req.volume_id),
            zone: zone.to_string(),
            project: req.project,
            organization: ORGANIZATION.to_string(),
            tags: req.tags,
            creation_date: Some(Utc::now()),
            modification_date: None,
        };
        inner.snapshots.insert(snapshot.id.clone(), (snapshot.clone(), pending));
        Ok(snapshot)
    }

    async fn get_snapshot(&self, zone: &Zone, id: &str) -> Result<Snapshot, ApiError> {
        let mut inner = self.lock();
        inner.fail("get_snapshot")?;
        let (snapshot, pending) = inner
            .snapshots
            .get_mut(id)
            .filter(|(s, _)| s.zone == zone.as_str())
            .ok_or_else(|| not_found("snapshot", id))?;
        if *pending > 0 {
            *pending -= 1;
            return Ok(snapshot.clone());
        }
        snapshot.state = SnapshotState::Available;
        Ok(snapshot.clone())
    }

    async fn update_snapshot(
        &self,
        _zone: &Zone,
        id: &str,
        req: UpdateSnapshotRequest,
    ) -> Result<Snapshot, ApiError> {
        let mut inner = self.lock();
        inner.fail("update_snapshot")?;
        let (snapshot, _) = inner.snapshots.get_mut(id).ok_or_else(|| not_found("snapshot", id))?;
        if let Some(name) = req.name {
            snapshot.name = name;
        }
        if let Some(tags) = req.tags {
            snapshot.tags = tags;
        }
        Ok(snapshot.clone())
    }

    async fn delete_snapshot(&self, _zone: &Zone, id: &str) -> Result<(), ApiError> {
        let mut inner = self.lock();
        inner.fail("delete_snapshot")?;
        let busy = match inner.snapshots.get(id) {
            Some((snapshot, _)) => snapshot.state != SnapshotState::Available,
            None => return Err(not_found("snapshot", id)),
        };
        if busy {
            inner.rejected_busy_deletes += 1;
            return Err(ApiError::http(409, "snapshot is in a transient state"));
        }
        inner.snapshots.remove(id);
        Ok(())
    }
}

#[async_trait]
impl AccountApi for FakeCloud {
    async fn create_project(&self, req: CreateProjectRequest) -> Result<Project, ApiError> {
        let mut inner = self.lock();
        inner.fail("create_project")?;
        let project = Project {
            id: Uuid::new_v4().to_string(),
            name: req.name,
            organization_id: req.organization_id,
            description: req.description,
            created_at: Some(Utc::now()),
            updated_at: Some(Utc::now()),
        };
        inner.projects.insert(project.id.clone(), project.clone());
        Ok(project)
    }

    async fn get_project(&self, id: &str) -> Result<Project, ApiError> {
        let mut inner = self.lock();
        inner.fail("get_project")?;
        inner.projects.get(id).cloned().ok_or_else(|| not_found("project", id))
    }

    async fn update_project(&self, id: &str, req: UpdateProjectRequest) -> Result<Project, ApiError> {
        let mut inner = self.lock();
        inner.fail("update_project")?;
        let project = inner.projects.get_mut(id).ok_or_else(|| not_found("project", id))?;
        if let Some(name) = req.name {
            project.name = name;
        }
        if let Some(description) = req.description {
            project.description = description;
        }
        project.updated_at = Some(Utc::now());
        Ok(project.clone())
    }

    async fn delete_project(&self, id: &str) -> Result<(), ApiError> {
        let mut inner = self.lock();
        inner.fail("delete_project")?;
        inner
            .projects
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| not_found("project", id))
    }

    async fn list_projects(&self, req: ListByNameRequest) -> Result<Vec<Project>, ApiError> {
        let mut inner = self.lock();
        inner.fail("list_projects")?;
        Ok(inner
            .projects
            .values()
            .filter(|p| p.organization_id == req.owner && p.name.contains(&req.name))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl VpcApi for FakeCloud {
    async fn create_private_network(
        &self,
        region: &Region,
        req: CreatePrivateNetworkRequest,
    ) -> Result<PrivateNetwork, ApiError> {
        let mut inner = self.lock();
        inner.fail("create_private_network")?;
        let network = PrivateNetwork {
            id: Uuid::new_v4().to_string(),
            name: req.name,
            region: region.to_string(),
            project_id: req.project_id,
            organization_id: ORGANIZATION.to_string(),
            tags: req.tags,
            created_at: Some(Utc::now()),
            updated_at: Some(Utc::now()),
        };
        inner.networks.insert(network.id.clone(), network.clone());
        Ok(network)
    }

    async fn get_private_network(&self, region: &Region, id: &str) -> Result<PrivateNetwork, ApiError> {
        let mut inner = self.lock();
        inner.fail("get_private_network")?;
        inner
            .networks
            .get(id)
            .filter(|n| n.region == region.as_str())
            .cloned()
            .ok_or_else(|| not_found("private network", id))
    }

    async fn update_private_network(
        &self,
        _region: &Region,
        id: &str,
        req: UpdatePrivateNetworkRequest,
    ) -> Result<PrivateNetwork, ApiError> {
        let mut inner = self.lock();
        inner.fail("update_private_network")?;
        let network = inner
            .networks
            .get_mut(id)
            .ok_or_else(|| not_found("private network", id))?;
        if let Some(name) = req.name {
            network.name = name;
        }
        if let Some(tags) = req.tags {
            network.tags = tags;
        }
        network.updated_at = Some(Utc::now());
        Ok(network.clone())
    }

    async fn delete_private_network(&self, _region: &Region, id: &str) -> Result<(), ApiError> {
        let mut inner = self.lock();
        inner.fail("delete_private_network")?;
        inner
            .networks
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| not_found("private network", id))
    }

    async fn list_private_networks(
        &self,
        region: &Region,
        req: ListByNameRequest,
    ) -> Result<Vec<PrivateNetwork>, ApiError> {
        let mut inner = self.lock();
        inner.fail("list_private_networks")?;
        Ok(inner
            .networks
            .values()
            .filter(|n| {
                n.region == region.as_str() && n.project_id == req.owner && n.name.contains(&req.name)
            })
            .cloned()
            .collect())
    }
}
