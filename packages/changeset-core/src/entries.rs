//! Ordered `{key, value}` views of the changes and errors buffers.

use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;

use crate::validation::{ErrorRecord, Validation};

/// One `{key, value}` pair of a mapping.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Entry<V> {
    pub key: String,
    pub value: V,
}

/// One error of the errors buffer, as listed to consumers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorEntry {
    pub key: String,
    pub value: Value,
    pub validation: Validation,
}

/// Lists `pairs` as entries, keeping their order.
pub fn to_entries<'a, V, I>(pairs: I) -> Vec<Entry<V>>
where
    V: Clone + 'a,
    I: IntoIterator<Item = (&'a String, &'a V)>,
{
    pairs
        .into_iter()
        .map(|(key, value)| Entry {
            key: key.clone(),
            value: value.clone(),
        })
        .collect()
}

/// Lists error records with their key alongside value and validation.
pub fn error_entries(errors: &IndexMap<String, ErrorRecord>) -> Vec<ErrorEntry> {
    errors
        .iter()
        .map(|(key, record)| ErrorEntry {
            key: key.clone(),
            value: record.value.clone(),
            validation: record.validation.clone(),
        })
        .collect()
}
