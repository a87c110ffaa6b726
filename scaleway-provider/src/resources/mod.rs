//! Resource drivers, one module per resource type

pub mod account_project;
pub mod instance_ip;
pub mod instance_snapshot;
pub mod instance_volume;
pub mod vpc_private_network;

pub use account_project::AccountProject;
pub use instance_ip::InstanceIp;
pub use instance_snapshot::InstanceSnapshot;
pub use instance_volume::InstanceVolume;
pub use vpc_private_network::VpcPrivateNetwork;
