// src/appliance/wire.rs
//
// JSON bodies returned by the appliance's /php API. Identifiers and sizes
// arrive as numbers on some firmware versions and as strings on others.

use serde::de::Error as _;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// The `{"success": ..., "results": ...}` wrapper shared by most calls.
#[derive(Deserialize, Debug)]
pub(crate) struct Envelope<T> {
    #[serde(default)]
    pub success: bool,
    pub results: Option<T>,
    #[serde(default, rename = "errorMessage")]
    pub error_message: Option<String>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SessionResults {
    #[serde(deserialize_with = "string_or_number")]
    pub session: String,
    #[serde(deserialize_with = "string_or_number")]
    pub user_id: String,
    #[serde(default)]
    pub matd_version: String,
}

#[derive(Deserialize, Debug)]
pub(crate) struct HeartbeatResults {
    #[serde(rename = "heartBeat")]
    pub heart_beat: Value,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub(crate) struct UploadResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default, deserialize_with = "opt_string_or_number")]
    pub sub_id: Option<String>,
    #[serde(default)]
    pub mime_type: Option<String>,
    #[serde(default)]
    pub results: Vec<UploadedFile>,
    #[serde(default)]
    pub error_message: Option<String>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub(crate) struct UploadedFile {
    #[serde(deserialize_with = "string_or_number")]
    pub task_id: String,
    #[serde(default)]
    pub file: String,
    #[serde(default)]
    pub md5: String,
    #[serde(default, deserialize_with = "u64_from_string_or_number")]
    pub size: u64,
}

#[derive(Deserialize, Debug)]
pub(crate) struct StatusResults {
    #[serde(deserialize_with = "i64_from_string_or_number")]
    pub istate: i64,
    #[serde(default)]
    pub status: String,
}

#[derive(Deserialize, Debug)]
pub(crate) struct ProfileEntry {
    #[serde(rename = "vmProfileid", deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, rename = "vmDesc")]
    pub description: String,
}

fn string_or_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(D::Error::custom(format!("expected string or number, got {}", other))),
    }
}

fn opt_string_or_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    match Value::deserialize(deserializer)? {
        Value::Null => Ok(None),
        Value::String(s) => Ok(Some(s)),
        Value::Number(n) => Ok(Some(n.to_string())),
        other => Err(D::Error::custom(format!("expected string or number, got {}", other))),
    }
}

fn u64_from_string_or_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
    match Value::deserialize(deserializer)? {
        Value::Number(n) => n
            .as_u64()
            .ok_or_else(|| D::Error::custom(format!("expected unsigned integer, got {}", n))),
        Value::String(s) => s.trim().parse().map_err(D::Error::custom),
        other => Err(D::Error::custom(format!("expected string or number, got {}", other))),
    }
}

fn i64_from_string_or_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
    match Value::deserialize(deserializer)? {
        Value::Number(n) => n
            .as_i64()
            .ok_or_else(|| D::Error::custom(format!("expected integer, got {}", n))),
        Value::String(s) => s.trim().parse().map_err(D::Error::custom),
        other => Err(D::Error::custom(format!("expected string or number, got {}", other))),
    }
}
