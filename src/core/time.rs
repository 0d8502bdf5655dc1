//! `created_at` stamps for datastore rows and the envelope around
//! `--format json` output.

use serde::Serialize;
use serde_json::{Map, Value};
use std::time::{SystemTime, UNIX_EPOCH};
use ulid::Ulid;

pub const ENVELOPE_VERSION: &str = "1.0.0";

/// Value stored in every `created_at` column: epoch seconds plus `Z`
/// (`1771220592Z`). Sorts lexically for the lifetime of the format.
pub fn created_at_now() -> String {
    let secs = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    format!("{secs}Z")
}

/// One JSON document per CLI invocation. Body keys sit beside the header keys.
#[derive(Debug, Serialize)]
pub struct Envelope<'a> {
    pub envelope_version: &'static str,
    pub ts: String,
    /// ULID, unique per invocation.
    pub event_id: String,
    pub cmd: &'a str,
    pub status: &'a str,
    #[serde(flatten)]
    pub body: Map<String, Value>,
}

impl<'a> Envelope<'a> {
    pub fn ok(cmd: &'a str, body: Value) -> Self {
        let body = match body {
            Value::Object(map) => map,
            // Anything else is nested so it cannot shadow a header key.
            other => Map::from_iter([("result".to_string(), other)]),
        };
        Self {
            envelope_version: ENVELOPE_VERSION,
            ts: created_at_now(),
            event_id: Ulid::new().to_string(),
            cmd,
            status: "ok",
            body,
        }
    }
}
