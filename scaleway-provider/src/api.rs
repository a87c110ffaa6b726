//! Vendor API surface consumed by the drivers
//!
//! Models mirror the JSON the Scaleway APIs return. Transport is left to
//! whoever implements the traits; the drivers only see [`ApiError`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use scaleway_core::ApiError;
use scaleway_core::locality::{Region, Zone};

// =============================================================================
// Instance
// =============================================================================

/// Flexible IP
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ip {
    pub id: String,
    pub address: String,
    #[serde(default)]
    pub reverse: Option<String>,
    pub zone: String,
    pub project: String,
    pub organization: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CreateIpRequest {
    pub project: String,
    pub tags: Vec<String>,
}

/// `None` leaves a field alone; `Some("")` clears the reverse
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UpdateIpRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reverse: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VolumeState {
    Available,
    Fetching,
    Resizing,
    Snapshotting,
    Saving,
    Hotsyncing,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Volume {
    pub id: String,
    pub name: String,
    pub volume_type: String,
    /// Bytes
    pub size: u64,
    pub state: VolumeState,
    pub zone: String,
    pub project: String,
    pub organization: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub creation_date: Option<DateTime<Utc>>,
    pub modification_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreateVolumeRequest {
    pub name: String,
    pub project: String,
    pub volume_type: String,
    pub size: u64,
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UpdateVolumeRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SnapshotState {
    Available,
    Snapshotting,
    Importing,
    Exporting,
    Error,
    Invalid,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub id: String,
    pub name: String,
    pub volume_type: String,
    pub size: u64,
    pub state: SnapshotState,
    pub base_volume_id: Option<String>,
    pub zone: String,
    pub project: String,
    pub organization: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub creation_date: Option<DateTime<Utc>>,
    pub modification_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreateSnapshotRequest {
    pub name: String,
    pub volume_id: String,
    pub project: String,
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UpdateSnapshotRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
}

/// Name filter of list calls; the backend matches substrings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ListByNameRequest {
    pub owner: String,
    pub name: String,
}

#[async_trait]
pub trait InstanceApi: Send + Sync {
    async fn create_ip(&self, zone: &Zone, req: CreateIpRequest) -> Result<Ip, ApiError>;
    async fn get_ip(&self, zone: &Zone, id: &str) -> Result<Ip, ApiError>;
    async fn update_ip(&self, zone: &Zone, id: &str, req: UpdateIpRequest) -> Result<Ip, ApiError>;
    async fn delete_ip(&self, zone: &Zone, id: &str) -> Result<(), ApiError>;

    async fn create_volume(&self, zone: &Zone, req: CreateVolumeRequest) -> Result<Volume, ApiError>;
    async fn get_volume(&self, zone: &Zone, id: &str) -> Result<Volume, ApiError>;
    async fn update_volume(
        &self,
        zone: &Zone,
        id: &str,
        req: UpdateVolumeRequest,
    ) -> Result<Volume, ApiError>;
    async fn delete_volume(&self, zone: &Zone, id: &str) -> Result<(), ApiError>;
    /// Volumes of `req.owner` (a project) whose name contains `req.name`
    async fn list_volumes(&self, zone: &Zone, req: ListByNameRequest) -> Result<Vec<Volume>, ApiError>;

    async fn create_snapshot(
        &self,
        zone: &Zone,
        req: CreateSnapshotRequest,
    ) -> Result<Snapshot, ApiError>;
    async fn get_snapshot(&self, zone: &Zone, id: &str) -> Result<Snapshot, ApiError>;
    async fn update_snapshot(
        &self,
        zone: &Zone,
        id: &str,
        req: UpdateSnapshotRequest,
    ) -> Result<Snapshot, ApiError>;
    async fn delete_snapshot(&self, zone: &Zone, id: &str) -> Result<(), ApiError>;
}

// =============================================================================
// Account
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub id: String,
    pub name: String,
    pub organization_id: String,
    #[serde(default)]
    pub description: String,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreateProjectRequest {
    pub name: String,
    pub organization_id: String,
    pub description: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UpdateProjectRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[async_trait]
pub trait AccountApi: Send + Sync {
    async fn create_project(&self, req: CreateProjectRequest) -> Result<Project, ApiError>;
    async fn get_project(&self, id: &str) -> Result<Project, ApiError>;
    async fn update_project(&self, id: &str, req: UpdateProjectRequest) -> Result<Project, ApiError>;
    async fn delete_project(&self, id: &str) -> Result<(), ApiError>;
    /// Projects of `req.owner` (an organization) whose name contains `req.name`
    async fn list_projects(&self, req: ListByNameRequest) -> Result<Vec<Project>, ApiError>;
}

// =============================================================================
// VPC
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrivateNetwork {
    pub id: String,
    pub name: String,
    pub region: String,
    pub project_id: String,
    pub organization_id: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreatePrivateNetworkRequest {
    pub name: String,
    pub project_id: String,
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UpdatePrivateNetworkRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
}

#[async_trait]
pub trait VpcApi: Send + Sync {
    async fn create_private_network(
        &self,
        region: &Region,
        req: CreatePrivateNetworkRequest,
    ) -> Result<PrivateNetwork, ApiError>;
    async fn get_private_network(&self, region: &Region, id: &str) -> Result<PrivateNetwork, ApiError>;
    async fn update_private_network(
        &self,
        region: &Region,
        id: &str,
        req: UpdatePrivateNetworkRequest,
    ) -> Result<PrivateNetwork, ApiError>;
    async fn delete_private_network(&self, region: &Region, id: &str) -> Result<(), ApiError>;
    /// Private networks of `req.owner` (a project) whose name contains `req.name`
    async fn list_private_networks(
        &self,
        region: &Region,
        req: ListByNameRequest,
    ) -> Result<Vec<PrivateNetwork>, ApiError>;
}
