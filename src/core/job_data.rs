//! Normalization of raw `job_data.json` contents into [`JobData`].
//!
//! Manifests written by different generations of the job runner disagree on
//! key names and value types. `parse_job_data` is the single place that knows
//! about those variants; everything downstream sees the canonical struct.

use crate::core::error::DatastoreError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

const STATUS_DEFAULT: &str = "imported";

/// Canonical job description, ready for `api::add_job`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobData {
    pub id: String,
    pub project: Option<String>,
    pub path: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: String,
    pub flowchart_id: Option<String>,
    pub command_line: Option<String>,
    pub submitted: Option<String>,
    pub started: Option<String>,
    pub finished: Option<String>,
    /// Manifest keys not mapped to a field above, kept verbatim.
    pub extra: Map<String, Value>,
}

/// Normalize a parsed manifest. Pure: no I/O, no datastore access.
pub fn parse_job_data(raw: &Value) -> Result<JobData, DatastoreError> {
    let obj = raw.as_object().ok_or_else(|| {
        DatastoreError::JobData(format!("expected a JSON object, found {}", type_name(raw)))
    })?;
    let mut rest = obj.clone();

    let id = match rest.remove("id") {
        Some(Value::String(s)) if !s.trim().is_empty() => s.trim().to_string(),
        Some(Value::Number(n)) => n.to_string(),
        Some(other) => {
            return Err(DatastoreError::JobData(format!(
                "'id' must be a non-empty string or a number, found {}",
                type_name(&other)
            )));
        }
        None => return Err(DatastoreError::JobData("missing required key 'id'".into())),
    };

    // Older manifests carry a single "project"; newer ones a "projects" list.
    let project = match rest.remove("projects") {
        Some(Value::Array(items)) => items.iter().find_map(|v| v.as_str().map(str::to_string)),
        Some(Value::String(s)) => Some(s),
        _ => None,
    }
    .or_else(|| take_string(&mut rest, "project"));

    let flowchart_id = take_string(&mut rest, "flowchart_digest")
        .or_else(|| take_string(&mut rest, "flowchart_id"));

    Ok(JobData {
        id,
        project,
        path: take_string(&mut rest, "working directory"),
        title: take_string(&mut rest, "title"),
        description: take_string(&mut rest, "description"),
        status: take_string(&mut rest, "status").unwrap_or_else(|| STATUS_DEFAULT.to_string()),
        flowchart_id,
        command_line: take_command_line(&mut rest),
        submitted: take_string(&mut rest, "submitted time"),
        started: take_string(&mut rest, "start time"),
        finished: take_string(&mut rest, "end time"),
        extra: rest,
    })
}

fn take_string(map: &mut Map<String, Value>, key: &str) -> Option<String> {
    if !matches!(map.get(key)?, Value::String(_) | Value::Number(_)) {
        return None;
    }
    match map.remove(key)? {
        Value::String(s) => Some(s),
        other => Some(other.to_string()),
    }
}

// "command line" is either a string or an argv array.
fn take_command_line(map: &mut Map<String, Value>) -> Option<String> {
    if let Some(Value::Array(argv)) = map.get("command line") {
        let joined = argv
            .iter()
            .map(|v| v.as_str().map(str::to_string).unwrap_or_else(|| v.to_string()))
            .collect::<Vec<_>>()
            .join(" ");
        map.remove("command line");
        return Some(joined);
    }
    take_string(map, "command line")
}

fn type_name(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
