use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// Parameters for list/query operations.
#[derive(Debug, Clone, Deserialize)]
pub struct ListParams {
    /// Maximum number of results to return.
    #[serde(default = "default_limit")]
    pub limit: usize,

    /// Offset for pagination.
    #[serde(default)]
    pub offset: usize,
}

fn default_limit() -> usize {
    50
}

impl Default for ListParams {
    fn default() -> Self {
        Self {
            limit: default_limit(),
            offset: 0,
        }
    }
}

/// Result wrapper for list operations.
#[derive(Debug, Clone, Serialize)]
pub struct ListResult<T: Serialize> {
    pub items: Vec<T>,
    pub total: usize,
}

/// Generate a new random ID (UUIDv4, no dashes).
pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string().replace('-', "")
}

/// Get the current time as an RFC 3339 string.
pub fn now_rfc3339() -> String {
    format_rfc3339(Utc::now())
}

/// Format a timestamp as fixed-width RFC 3339 (microseconds, `Z` suffix),
/// so that stored values sort lexicographically in time order.
pub fn format_rfc3339(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Parse an RFC 3339 timestamp. Returns `None` for empty or malformed input.
pub fn parse_rfc3339(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s.trim())
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Merge a JSON patch into a base value.
///
/// For each key in `patch`:
/// - If the value is `null`, the key is removed from `base`.
/// - Otherwise, the key is set to the patch value.
///
/// This follows RFC 7386 (JSON Merge Patch) semantics.
pub fn merge_patch(
    base: &mut serde_json::Value,
    patch: &serde_json::Value,
) {
    if let (Some(base_obj), Some(patch_obj)) = (base.as_object_mut(), patch.as_object()) {
        for (key, value) in patch_obj {
            if value.is_null() {
                base_obj.remove(key);
            } else if value.is_object() {
                let entry = base_obj
                    .entry(key.clone())
                    .or_insert_with(|| serde_json::Value::Object(serde_json::Map::new()));
                merge_patch(entry, value);
            } else {
                base_obj.insert(key.clone(), value.clone());
            }
        }
    } else {
        *base = patch.clone();
    }
}
