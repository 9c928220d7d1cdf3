// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Forward-only snapshot schema migrations
//!
//! Each migration lifts version N to N+1 on the raw JSON value, before
//! deserialization. Never edit an existing migration; append a new one.

use serde_json::Value;
use thiserror::Error;

/// Version written by this build.
pub const CURRENT_SNAPSHOT_VERSION: u32 = 3;

#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("snapshot has no version field")]
    MissingVersion,
    #[error("snapshot version {0} is newer than this build supports ({CURRENT_SNAPSHOT_VERSION})")]
    FromTheFuture(u32),
    #[error("snapshot migration {from}->{to} failed: {reason}")]
    Failed { from: u32, to: u32, reason: String },
}

/// Migrate a raw snapshot value up to [`CURRENT_SNAPSHOT_VERSION`].
pub fn migrate(mut value: Value) -> Result<Value, MigrationError> {
    let mut version = value
        .get("version")
        .and_then(Value::as_u64)
        .ok_or(MigrationError::MissingVersion)? as u32;
    if version > CURRENT_SNAPSHOT_VERSION {
        return Err(MigrationError::FromTheFuture(version));
    }
    while version < CURRENT_SNAPSHOT_VERSION {
        value = match version {
            1 => migrate_v1_to_v2(value)?,
            2 => migrate_v2_to_v3(value)?,
            other => {
                return Err(MigrationError::Failed {
                    from: other,
                    to: other + 1,
                    reason: "no migration registered".to_string(),
                })
            }
        };
        version += 1;
        if let Some(v) = value.get_mut("version") {
            *v = Value::from(version);
        }
    }
    Ok(value)
}

/// v1 items predate the durable hash kind; anything with a content hash
/// was quickxor.
fn migrate_v1_to_v2(mut value: Value) -> Result<Value, MigrationError> {
    let items = value
        .pointer_mut("/baseline/items")
        .and_then(Value::as_object_mut)
        .ok_or(MigrationError::Failed {
            from: 1,
            to: 2,
            reason: "missing baseline.items".to_string(),
        })?;
    for item in items.values_mut() {
        let has_hash = item
            .get("content_hash")
            .map(|h| !h.is_null())
            .unwrap_or(false);
        if has_hash && item.get("hash_kind").is_none() {
            item["hash_kind"] = Value::from("quickxor");
        }
    }
    Ok(value)
}

/// v2 stored conflicts as an array; v3 keys them by id.
fn migrate_v2_to_v3(mut value: Value) -> Result<Value, MigrationError> {
    let baseline = value
        .pointer_mut("/baseline")
        .and_then(Value::as_object_mut)
        .ok_or(MigrationError::Failed {
            from: 2,
            to: 3,
            reason: "missing baseline".to_string(),
        })?;
    let old = baseline
        .remove("conflicts")
        .unwrap_or(Value::Array(Vec::new()));
    let mut map = serde_json::Map::new();
    if let Value::Array(records) = old {
        for record in records {
            let Some(id) = record.get("id").and_then(Value::as_str).map(String::from) else {
                return Err(MigrationError::Failed {
                    from: 2,
                    to: 3,
                    reason: "conflict record without id".to_string(),
                });
            };
            map.insert(id, record);
        }
    } else {
        // Already a map (snapshot written by a v3 build before the version
        // bump shipped); keep it.
        baseline.insert("conflicts".to_string(), old);
        return Ok(value);
    }
    baseline.insert("conflicts".to_string(), Value::Object(map));
    Ok(value)
}

#[cfg(test)]
#[path = "migration_tests.rs"]
mod tests;
