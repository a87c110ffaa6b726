//! Differ - Compare desired configuration with stored state
//!
//! Decides whether a resource needs creating, updating in place, or
//! replacing because a force-new attribute changed.

use crate::resource::{AttributeMap, Value};
use crate::schema::ResourceSchema;

/// Result of a diff operation
#[derive(Debug, Clone, PartialEq)]
pub enum Diff {
    /// No stored state -> needs creation
    Create,
    /// Stored state matches
    NoChange,
    /// Changes can be applied in place
    Update { changed: Vec<String> },
    /// A force-new attribute changed -> destroy then create
    Replace {
        changed: Vec<String>,
        forced_by: Vec<String>,
    },
}

impl Diff {
    /// Returns whether this Diff involves a change
    pub fn is_change(&self) -> bool {
        !matches!(self, Diff::NoChange)
    }
}

/// Compare `desired` with `prior`; `None` means the resource does not exist
pub fn diff(schema: &ResourceSchema, prior: Option<&AttributeMap>, desired: &AttributeMap) -> Diff {
    let Some(prior) = prior else {
        return Diff::Create;
    };

    let changed = find_changed_attributes(schema, prior, desired);
    if changed.is_empty() {
        return Diff::NoChange;
    }

    let forced_by: Vec<String> = changed
        .iter()
        .filter(|name| schema.get(name).is_some_and(|a| a.force_new))
        .cloned()
        .collect();
    if forced_by.is_empty() {
        Diff::Update { changed }
    } else {
        Diff::Replace { changed, forced_by }
    }
}

/// Attributes whose desired value differs from the stored one, in schema order
fn find_changed_attributes(
    schema: &ResourceSchema,
    prior: &AttributeMap,
    desired: &AttributeMap,
) -> Vec<String> {
    let mut changed = Vec::new();

    for attr in schema.attributes() {
        let wanted = desired.get(&attr.name).filter(|v| !v.is_empty());
        let stored = prior.get(&attr.name).filter(|v| !v.is_empty());

        // Unset computed attributes keep whatever the server assigned
        if attr.computed && wanted.is_none() {
            continue;
        }
        if attr.is_read_only() {
            continue;
        }

        let wanted = wanted.or(attr.default.as_ref().filter(|v| !v.is_empty()));
        if !same(wanted, stored) {
            changed.push(attr.name.clone());
        }
    }

    changed
}

fn same(a: Option<&Value>, b: Option<&Value>) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}
