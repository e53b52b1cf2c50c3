use super::error::{DeskError, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

/// Keys the ledger owns; guest-supplied values under these names are replaced.
pub const RESERVED_FIELDS: [&str; 5] = ["id", "request_number", "at", "status", "status_updated_at"];

/// Lifecycle of a guest request as shown on the staff dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    #[default]
    Sent,
    Read,
    OnTheWay,
    Completed,
}

impl RequestStatus {
    pub const ALL: [RequestStatus; 4] = [
        RequestStatus::Sent,
        RequestStatus::Read,
        RequestStatus::OnTheWay,
        RequestStatus::Completed,
    ];

    pub const fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::Sent => "sent",
            RequestStatus::Read => "read",
            RequestStatus::OnTheWay => "on_the_way",
            RequestStatus::Completed => "completed",
        }
    }

    /// Lowercases and collapses every whitespace run into a single underscore,
    /// so `"On The Way"` becomes `"on_the_way"`.
    pub fn normalize(raw: &str) -> String {
        let mut out = String::with_capacity(raw.len());
        let mut in_space = false;
        for ch in raw.chars() {
            if ch.is_whitespace() {
                if !in_space {
                    out.push('_');
                }
                in_space = true;
            } else {
                out.extend(ch.to_lowercase());
                in_space = false;
            }
        }
        out
    }

    pub const fn is_terminal(&self) -> bool {
        matches!(self, RequestStatus::Completed)
    }
}

impl FromStr for RequestStatus {
    type Err = DeskError;

    fn from_str(raw: &str) -> Result<Self> {
        let normalized = Self::normalize(raw);
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == normalized)
            .ok_or_else(|| DeskError::validation(format!("unknown status '{raw}'")))
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A stored guest request.
///
/// Everything the guest sent besides the reserved keys is kept in `fields`
/// and serialized back flat, next to the ledger-owned keys.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GuestRequest {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,
    #[serde(default)]
    pub request_number: u64,
    #[serde(default)]
    pub at: String,
    #[serde(default)]
    pub status: RequestStatus,
    #[serde(default)]
    pub status_updated_at: String,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl GuestRequest {
    /// Decodes one record of a stored snapshot.
    ///
    /// Older writers spread the guest body straight into the record, so any
    /// ledger-owned key may hold an odd value. Those fall back to defaults:
    /// an unknown or missing status becomes `sent`, a non-string `at` is kept
    /// as its JSON text. Only a record without a usable id yields `None`.
    pub fn from_stored(value: Value) -> Option<Self> {
        let Value::Object(mut fields) = value else {
            return None;
        };

        let id = match fields.remove("id") {
            Some(Value::String(id)) if !id.is_empty() => id,
            Some(Value::Number(id)) => id.to_string(),
            _ => return None,
        };
        let request_number = fields
            .remove("request_number")
            .as_ref()
            .and_then(lenient_u64)
            .unwrap_or(0);
        let at = fields.remove("at").map(stored_text).unwrap_or_default();
        let status = match fields.remove("status") {
            Some(Value::String(raw)) => raw.parse().unwrap_or_default(),
            _ => RequestStatus::default(),
        };
        let status_updated_at = fields
            .remove("status_updated_at")
            .map(stored_text)
            .unwrap_or_default();

        let mut record = Self {
            id,
            request_number,
            at,
            status,
            status_updated_at,
            fields,
        };
        record.backfill();
        Some(record)
    }

    /// Fills in what older snapshots may lack.
    pub(crate) fn backfill(&mut self) {
        if self.status_updated_at.is_empty() {
            self.status_updated_at = self.at.clone();
        }
    }
}

fn stored_text(value: Value) -> String {
    match value {
        Value::String(text) => text,
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Reads a counter that may have been written as an integer, a float or a string.
pub(crate) fn lenient_u64(value: &Value) -> Option<u64> {
    match value {
        Value::Number(number) => number.as_u64().or_else(|| {
            number
                .as_f64()
                .filter(|n| n.is_finite() && *n >= 0.0)
                .map(|n| n as u64)
        }),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}

fn deserialize_id<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(id) => Ok(id),
        Value::Number(id) => Ok(id.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "request id must be a string or number, got {other}"
        ))),
    }
}

/// Guest payload accepted by the submit operation, split into the optional
/// caller-controlled keys and the opaque remainder.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Submission {
    pub id: Option<String>,
    pub at: Option<String>,
    pub fields: Map<String, Value>,
}

impl Submission {
    pub fn from_slice(body: &[u8]) -> Result<Self> {
        let value: Value =
            serde_json::from_slice(body).map_err(|_| DeskError::malformed("Invalid JSON"))?;
        Self::from_json(value)
    }

    pub fn from_json(value: Value) -> Result<Self> {
        let Value::Object(mut fields) = value else {
            return Err(DeskError::malformed("Invalid JSON"));
        };

        let id = match fields.remove("id") {
            Some(Value::String(id)) if !id.is_empty() => Some(id),
            Some(Value::Number(id)) => Some(id.to_string()),
            _ => None,
        };
        let at = match fields.remove("at") {
            Some(Value::String(at)) if !at.is_empty() => Some(at),
            _ => None,
        };
        for key in RESERVED_FIELDS {
            fields.remove(key);
        }

        Ok(Self { id, at, fields })
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }
}

/// ISO-8601 UTC timestamp with millisecond precision, e.g. `2026-10-17T09:30:00.000Z`.
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub fn now_timestamp() -> String {
    format_timestamp(Utc::now())
}
