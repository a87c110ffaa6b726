//! Validation - Pure predicates over scalar configuration values
//!
//! Every validator takes `(value, attribute name)` and returns
//! [`Diagnostics`]: warnings and errors, both empty on success.

use std::fmt;
use std::net::Ipv4Addr;
use std::sync::{Arc, LazyLock};

use regex::Regex;

use crate::locality::{self, KNOWN_REGIONS, KNOWN_ZONES, Region, Zone};
use crate::resource::Value;

/// Length of a canonical UUID
pub const UUID_LEN: usize = 36;

/// Byte offsets of the dashes in a canonical UUID
const UUID_DASHES: [usize; 4] = [8, 13, 18, 23];

static EMAIL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("static regex"));

/// Validation error
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub path: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

impl std::error::Error for ValidationError {}

/// Warnings and errors collected while validating configuration
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Diagnostics {
    pub warnings: Vec<String>,
    pub errors: Vec<ValidationError>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn warn(&mut self, path: &str, message: impl fmt::Display) {
        self.warnings.push(format!("{}: {}", path, message));
    }

    pub fn error(&mut self, path: &str, message: impl Into<String>) {
        self.errors.push(ValidationError::new(path, message));
    }

    pub fn extend(&mut self, other: Diagnostics) {
        self.warnings.extend(other.warnings);
        self.errors.extend(other.errors);
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty() && self.errors.is_empty()
    }
}

type ValidateFn = dyn Fn(&Value, &str) -> Diagnostics + Send + Sync;

/// Named validator attached to a schema attribute
#[derive(Clone)]
pub struct Validator {
    name: &'static str,
    func: Arc<ValidateFn>,
}

impl Validator {
    pub fn new<F>(name: &'static str, func: F) -> Self
    where
        F: Fn(&Value, &str) -> Diagnostics + Send + Sync + 'static,
    {
        Self {
            name,
            func: Arc::new(func),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn validate(&self, value: &Value, attribute: &str) -> Diagnostics {
        (self.func)(value, attribute)
    }
}

impl fmt::Debug for Validator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Validator({})", self.name)
    }
}

/// Run `check` on a string value, reporting non-strings as errors
fn string_validator<F>(value: &Value, attribute: &str, check: F) -> Diagnostics
where
    F: FnOnce(&str, &mut Diagnostics),
{
    let mut diags = Diagnostics::new();
    match value {
        Value::String(s) => check(s, &mut diags),
        other => diags.error(
            attribute,
            format!("expected type of {} to be string, got {}", attribute, other.type_name()),
        ),
    }
    diags
}

/// Check the canonical `xxxxxxxx-xxxx-xxxx-xxxx-xxxxxxxxxxxx` shape
pub fn check_uuid(s: &str) -> Result<(), String> {
    if s.len() != UUID_LEN {
        return Err(format!(
            "'{}' is not a UUID: expected length {}, got {}",
            s,
            UUID_LEN,
            s.len()
        ));
    }
    for (i, b) in s.bytes().enumerate() {
        if UUID_DASHES.contains(&i) {
            if b != b'-' {
                return Err(format!("'{}' is not a UUID: expected '-' at position {}", s, i));
            }
        } else if !b.is_ascii_hexdigit() {
            return Err(format!(
                "'{}' is not a UUID: non-hex character at position {}",
                s, i
            ));
        }
    }
    Ok(())
}

pub fn is_uuid(s: &str) -> bool {
    check_uuid(s).is_ok()
}

/// Drop an optional `<scope>/` prefix
pub fn strip_locality(s: &str) -> &str {
    s.split_once('/').map(|(_, rest)| rest).unwrap_or(s)
}

/// Value must be a canonical UUID
pub fn uuid() -> Validator {
    Validator::new("uuid", |value, attribute| {
        string_validator(value, attribute, |s, diags| {
            if let Err(msg) = check_uuid(s) {
                diags.error(attribute, msg);
            }
        })
    })
}

/// Value must be a UUID, optionally prefixed with `<zone-or-region>/`
pub fn uuid_or_localized() -> Validator {
    Validator::new("uuid_or_localized", |value, attribute| {
        string_validator(value, attribute, |s, diags| {
            if let Err(msg) = check_uuid(strip_locality(s)) {
                diags.error(attribute, msg);
            }
        })
    })
}

/// Value must look like `local@domain.tld`
pub fn email() -> Validator {
    Validator::new("email", |value, attribute| {
        string_validator(value, attribute, |s, diags| {
            if !EMAIL.is_match(s) {
                diags.error(attribute, format!("'{}' is not a valid email address", s));
            }
        })
    })
}

/// Value should be a known zone. Unknown or deprecated codes only warn.
pub fn zone() -> Validator {
    Validator::new("zone", |value, attribute| {
        string_validator(value, attribute, |s, diags| {
            if let Some(canonical) = locality::deprecated_zone(s) {
                diags.warn(
                    attribute,
                    format!("zone '{}' is deprecated, use '{}' instead", s, canonical),
                );
                return;
            }
            let known = Zone::parse(s).is_ok_and(|z| z.is_known());
            if !known {
                diags.warn(
                    attribute,
                    format!("unknown zone '{}', known zones: {}", s, KNOWN_ZONES.join(", ")),
                );
            }
        })
    })
}

/// Value should be a known region. Unknown or deprecated codes only warn.
pub fn region() -> Validator {
    Validator::new("region", |value, attribute| {
        string_validator(value, attribute, |s, diags| {
            if let Some(canonical) = locality::deprecated_region(s) {
                diags.warn(
                    attribute,
                    format!("region '{}' is deprecated, use '{}' instead", s, canonical),
                );
                return;
            }
            let known = Region::parse(s).is_ok_and(|r| r.is_known());
            if !known {
                diags.warn(
                    attribute,
                    format!(
                        "unknown region '{}', known regions: {}",
                        s,
                        KNOWN_REGIONS.join(", ")
                    ),
                );
            }
        })
    })
}

/// Value must be a dotted-quad IPv4 address
pub fn ipv4_address() -> Validator {
    Validator::new("ipv4_address", |value, attribute| {
        string_validator(value, attribute, |s, diags| {
            if s.parse::<Ipv4Addr>().is_err() {
                diags.error(attribute, format!("'{}' is not a valid IPv4 address", s));
            }
        })
    })
}

/// Value must not be one of `invalid`
pub fn string_not_in(invalid: &[&str], ignore_case: bool) -> Validator {
    let invalid: Vec<String> = invalid.iter().map(|s| s.to_string()).collect();
    Validator::new("string_not_in", move |value, attribute| {
        string_validator(value, attribute, |s, diags| {
            let banned = invalid.iter().any(|v| {
                if ignore_case {
                    v.eq_ignore_ascii_case(s)
                } else {
                    v == s
                }
            });
            if banned {
                diags.error(
                    attribute,
                    format!(
                        "expected {} not to be any of [{}], got '{}'",
                        attribute,
                        invalid.join(", "),
                        s
                    ),
                );
            }
        })
    })
}

/// Integer within `min..=max`
pub fn int_between(min: i64, max: i64) -> Validator {
    Validator::new("int_between", move |value, attribute| {
        let mut diags = Diagnostics::new();
        match value {
            Value::Int(n) if (min..=max).contains(n) => {}
            Value::Int(n) => diags.error(
                attribute,
                format!("expected {} to be in the range ({} - {}), got {}", attribute, min, max, n),
            ),
            other => diags.error(
                attribute,
                format!("expected type of {} to be integer, got {}", attribute, other.type_name()),
            ),
        }
        diags
    })
}
