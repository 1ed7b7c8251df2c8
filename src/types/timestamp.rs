//! Millisecond timestamps with lenient decoding.
//!
//! Stored records always carry integer milliseconds, but imported documents may
//! hold numbers, `{seconds, nanoseconds}` objects, RFC 3339 strings or garbage.
//! Every shape is coerced to an epoch value; unreadable ones become `0` so a bad
//! timestamp sorts last instead of failing the whole document.

use std::fmt;

use chrono::Utc;

use rusqlite::types::{FromSql, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

/// Milliseconds since the UNIX epoch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp(i64);

impl Timestamp {
    pub fn from_millis(millis: i64) -> Self {
        Self(millis)
    }

    /// Returns the current wall-clock time.
    pub fn now() -> Self {
        Self(Utc::now().timestamp_millis())
    }

    pub fn millis(self) -> i64 {
        self.0
    }

    /// Coerces an arbitrary JSON value into a timestamp, falling back to `0`.
    pub fn coerce(value: &Value) -> Self {
        match value {
            Value::Number(n) => n
                .as_i64()
                .or_else(|| n.as_f64().map(|f| f as i64))
                .map(Self)
                .unwrap_or_default(),
            Value::String(s) => Self::parse_str(s).unwrap_or_default(),
            Value::Object(map) => {
                let seconds = map
                    .get("seconds")
                    .or_else(|| map.get("_seconds"))
                    .and_then(Value::as_i64);
                let nanos = map
                    .get("nanoseconds")
                    .or_else(|| map.get("_nanoseconds"))
                    .and_then(Value::as_i64)
                    .unwrap_or(0);
                seconds
                    .and_then(|s| s.checked_mul(1000))
                    .and_then(|ms| ms.checked_add(nanos / 1_000_000))
                    .map(Self)
                    .unwrap_or_default()
            }
            _ => Self::default(),
        }
    }

    fn parse_str(s: &str) -> Option<Self> {
        let s = s.trim();
        if let Ok(millis) = s.parse::<i64>() {
            return Some(Self(millis));
        }
        chrono::DateTime::parse_from_rfc3339(s)
            .ok()
            .map(|dt| Self(dt.timestamp_millis()))
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Serialize for Timestamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i64(self.0)
    }
}

impl<'de> Deserialize<'de> for Timestamp {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Ok(Self::coerce(&value))
    }
}

impl ToSql for Timestamp {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.0))
    }
}

impl FromSql for Timestamp {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        i64::column_result(value).map(Self)
    }
}
