//! Scaleway Core
//!
//! Reconciliation and identification layer shared by every Scaleway resource:
//! composite IDs, scope resolution, schema derivation, exact-match lookups,
//! wait loops and the generic resource / data-source lifecycles.

pub mod config;
pub mod datasource;
pub mod differ;
pub mod error;
pub mod finder;
pub mod id;
pub mod lifecycle;
pub mod locality;
pub mod provider;
pub mod resource;
pub mod schema;
pub mod scope;
pub mod validation;
pub mod wait;

#[cfg(test)]
mod testing;

pub use error::{ApiError, ErrorKind, ProviderError, ProviderResult};
pub use tokio_util::sync::CancellationToken;
