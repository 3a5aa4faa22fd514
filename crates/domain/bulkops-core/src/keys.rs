use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Stable identity of one item within a bulk run.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemKey(String);

impl ItemKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ItemKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for ItemKey {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for ItemKey {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

pub type KeyFn<T> = Arc<dyn Fn(&T) -> ItemKey + Send + Sync>;

pub fn key_fn<T, F, K>(f: F) -> KeyFn<T>
where
    F: Fn(&T) -> K + Send + Sync + 'static,
    K: Into<ItemKey>,
{
    Arc::new(move |item| f(item).into())
}

/// Keys a JSON resource by its `id` field. Numeric and string ids are accepted.
/// A missing `id` yields an empty key, which `BulkRun::new` rejects.
pub fn id_key_fn(item: &Value) -> ItemKey {
    field_key(item, "id")
}

/// Keys a JSON resource by its `name` field.
pub fn name_key_fn(item: &Value) -> ItemKey {
    field_key(item, "name")
}

fn field_key(item: &Value, field: &str) -> ItemKey {
    match item.get(field) {
        Some(Value::String(s)) => ItemKey::new(s.clone()),
        Some(Value::Number(n)) => ItemKey::new(n.to_string()),
        Some(Value::Bool(b)) => ItemKey::new(b.to_string()),
        _ => ItemKey::new(String::new()),
    }
}

/// Case-insensitive ordering for display names, falling back to a byte-wise
/// comparison so that the order stays total.
pub fn compare_strings(l: &str, r: &str) -> Ordering {
    l.to_lowercase()
        .cmp(&r.to_lowercase())
        .then_with(|| l.cmp(r))
}
