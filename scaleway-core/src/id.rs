//! Composite identifiers stored in state: `<zone-or-region>/<uuid>`, or a
//! bare `<uuid>` for global objects.
//!
//! The format is written into every user's state file and must not change.

use std::fmt;
use std::str::FromStr;

use crate::error::ProviderError;
use crate::locality::{Locality, LocalityError, Scope};
use crate::validation::check_uuid;

/// A parsed composite identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CompositeId {
    pub scope: Scope,
    pub uuid: String,
}

impl CompositeId {
    pub fn new(scope: Scope, uuid: impl Into<String>) -> Self {
        Self {
            scope,
            uuid: uuid.into(),
        }
    }

    /// Split on the first `/`. Without one the whole string is a global UUID.
    pub fn parse(id: &str) -> Result<Self, ProviderError> {
        Self::parse_with(id, Scope::from_token)
    }

    /// Like [`CompositeId::parse`], reading the token as the scope kind the
    /// resource lives in
    pub fn parse_for(locality: Locality, id: &str) -> Result<Self, ProviderError> {
        Self::parse_with(id, |token| Scope::from_token_for(locality, token))
    }

    fn parse_with<F>(id: &str, scope_of: F) -> Result<Self, ProviderError>
    where
        F: Fn(&str) -> Result<Scope, LocalityError>,
    {
        let (scope, uuid) = match id.split_once('/') {
            Some((token, uuid)) => {
                let scope = scope_of(token).map_err(|e| ProviderError::MalformedId {
                    id: id.to_string(),
                    reason: e.to_string(),
                })?;
                (scope, uuid)
            }
            None => (Scope::Global, id),
        };
        check_uuid(uuid).map_err(|reason| ProviderError::MalformedId {
            id: id.to_string(),
            reason,
        })?;
        Ok(Self::new(scope, uuid))
    }

    pub fn encode(&self) -> String {
        encode(&self.scope, &self.uuid)
    }
}

impl fmt::Display for CompositeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.scope.token() {
            Some(token) => write!(f, "{}/{}", token, self.uuid),
            None => f.write_str(&self.uuid),
        }
    }
}

impl FromStr for CompositeId {
    type Err = ProviderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// `<token>/<uuid>` for regional and zonal scopes, `<uuid>` for global
pub fn encode(scope: &Scope, uuid: &str) -> String {
    match scope.token() {
        Some(token) => format!("{}/{}", token, uuid),
        None => uuid.to_string(),
    }
}

/// Bare UUID of an ID, dropping any scope. Lossy.
pub fn strip_scope(id: &str) -> &str {
    id.split_once('/').map(|(_, uuid)| uuid).unwrap_or(id)
}
