//! Locality - Regions, zones and the scope an object lives in
//!
//! Codes are only checked for shape here. Whether a code is actually served
//! by the cloud is a warning-level question answered by the validators, so
//! a new region never breaks an existing provider binary.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use log::warn;
use regex::Regex;
use thiserror::Error;

/// Regions served today
pub const KNOWN_REGIONS: &[&str] = &["fr-par", "nl-ams", "pl-waw"];

/// Zones served today
pub const KNOWN_ZONES: &[&str] = &[
    "fr-par-1", "fr-par-2", "fr-par-3", "nl-ams-1", "nl-ams-2", "nl-ams-3", "pl-waw-1",
    "pl-waw-2", "pl-waw-3",
];

/// Legacy region codes and their canonical replacement
const DEPRECATED_REGIONS: &[(&str, &str)] = &[("par1", "fr-par"), ("ams1", "nl-ams")];

/// Legacy zone codes and their canonical replacement
const DEPRECATED_ZONES: &[(&str, &str)] = &[("par1", "fr-par-1"), ("ams1", "nl-ams-1")];

static REGION_SHAPE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z]{2}-[a-z]{3}$").expect("static regex"));

static ZONE_SHAPE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([a-z]{2}-[a-z]{3})-[0-9]+$").expect("static regex"));

/// Locality parse error
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LocalityError {
    #[error("invalid region '{0}': expected a code like fr-par")]
    InvalidRegion(String),

    #[error("invalid zone '{0}': expected a code like fr-par-1")]
    InvalidZone(String),

    #[error("invalid locality '{0}': expected a region (fr-par) or a zone (fr-par-1)")]
    InvalidToken(String),
}

/// Canonical replacement for a deprecated region code
pub fn deprecated_region(code: &str) -> Option<&'static str> {
    DEPRECATED_REGIONS
        .iter()
        .find(|(old, _)| *old == code)
        .map(|(_, new)| *new)
}

/// Canonical replacement for a deprecated zone code
pub fn deprecated_zone(code: &str) -> Option<&'static str> {
    DEPRECATED_ZONES
        .iter()
        .find(|(old, _)| *old == code)
        .map(|(_, new)| *new)
}

/// Region code such as `fr-par`. Always canonical: aliases are rewritten on parse.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Region(String);

impl Region {
    pub fn parse(code: &str) -> Result<Self, LocalityError> {
        let code = match deprecated_region(code) {
            Some(canonical) => {
                warn!("region '{}' is deprecated, using '{}'", code, canonical);
                canonical
            }
            None => code,
        };
        if REGION_SHAPE.is_match(code) {
            Ok(Self(code.to_string()))
        } else {
            Err(LocalityError::InvalidRegion(code.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_known(&self) -> bool {
        KNOWN_REGIONS.contains(&self.0.as_str())
    }
}

impl FromStr for Region {
    type Err = LocalityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Zone code such as `fr-par-1`. Always canonical: aliases are rewritten on parse.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Zone(String);

impl Zone {
    pub fn parse(code: &str) -> Result<Self, LocalityError> {
        let code = match deprecated_zone(code) {
            Some(canonical) => {
                warn!("zone '{}' is deprecated, using '{}'", code, canonical);
                canonical
            }
            None => code,
        };
        if ZONE_SHAPE.is_match(code) {
            Ok(Self(code.to_string()))
        } else {
            Err(LocalityError::InvalidZone(code.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Region this zone belongs to (`fr-par-1` -> `fr-par`)
    pub fn region(&self) -> Region {
        let region = self
            .0
            .rsplit_once('-')
            .map(|(region, _)| region)
            .unwrap_or(&self.0);
        Region(region.to_string())
    }

    pub fn is_known(&self) -> bool {
        KNOWN_ZONES.contains(&self.0.as_str())
    }
}

impl FromStr for Zone {
    type Err = LocalityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Zone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Kind of locality a resource type lives in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Locality {
    Global,
    Regional,
    Zonal,
}

impl Locality {
    /// Attribute holding the locality in resource schemas
    pub fn attribute(self) -> Option<&'static str> {
        match self {
            Locality::Global => None,
            Locality::Regional => Some("region"),
            Locality::Zonal => Some("zone"),
        }
    }
}

/// Where a remote object lives
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Scope {
    Global,
    Regional(Region),
    Zonal(Zone),
}

impl Scope {
    /// Parse the token in front of a composite ID. Zones are tried first;
    /// a bare legacy alias such as `par1` therefore resolves to its zone.
    pub fn from_token(token: &str) -> Result<Self, LocalityError> {
        if let Ok(zone) = Zone::parse(token) {
            return Ok(Scope::Zonal(zone));
        }
        Region::parse(token)
            .map(Scope::Regional)
            .map_err(|_| LocalityError::InvalidToken(token.to_string()))
    }

    /// Parse a token for a resource of known locality. Regional resources
    /// read `par1` as the region `fr-par`; a zone token is narrowed to its
    /// region.
    pub fn from_token_for(locality: Locality, token: &str) -> Result<Self, LocalityError> {
        match locality {
            Locality::Global => Self::from_token(token),
            Locality::Zonal => Zone::parse(token)
                .map(Scope::Zonal)
                .map_err(|_| LocalityError::InvalidToken(token.to_string())),
            Locality::Regional => Region::parse(token)
                .or_else(|_| Zone::parse(token).map(|zone| zone.region()))
                .map(Scope::Regional)
                .map_err(|_| LocalityError::InvalidToken(token.to_string())),
        }
    }

    /// Token written in front of composite IDs; None for global objects
    pub fn token(&self) -> Option<&str> {
        match self {
            Scope::Global => None,
            Scope::Regional(region) => Some(region.as_str()),
            Scope::Zonal(zone) => Some(zone.as_str()),
        }
    }

    pub fn locality(&self) -> Locality {
        match self {
            Scope::Global => Locality::Global,
            Scope::Regional(_) => Locality::Regional,
            Scope::Zonal(_) => Locality::Zonal,
        }
    }

    /// Region of a regional or zonal scope
    pub fn region(&self) -> Option<Region> {
        match self {
            Scope::Global => None,
            Scope::Regional(region) => Some(region.clone()),
            Scope::Zonal(zone) => Some(zone.region()),
        }
    }

    pub fn zone(&self) -> Option<&Zone> {
        match self {
            Scope::Zonal(zone) => Some(zone),
            _ => None,
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token().unwrap_or("global"))
    }
}
