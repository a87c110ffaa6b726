//! Exact-match selection: the only way data sources turn a human name into
//! a backend ID

use crate::error::{ProviderError, ProviderResult};

/// Return the single item matching `predicate`.
///
/// Zero matches is `NotFound(label)`, more than one is `Ambiguous(label, n)`.
pub fn find_exact<I, T, P>(items: I, predicate: P, label: &str) -> ProviderResult<T>
where
    I: IntoIterator<Item = T>,
    P: Fn(&T) -> bool,
{
    let mut matches: Vec<T> = items.into_iter().filter(|item| predicate(item)).collect();
    match matches.len() {
        0 => Err(ProviderError::NotFound(label.to_string())),
        1 => Ok(matches.remove(0)),
        count => Err(ProviderError::Ambiguous {
            label: label.to_string(),
            count,
        }),
    }
}
