use std::collections::BTreeMap;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

pub mod sink;

pub use sink::{RecordSink, StdoutSink};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f UTC";

/// Outcome classification of a probe record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProbeStatus {
    Ok,
    Failed,
}

/// One JSON line describing a completed probe invocation.
///
/// Build it with [`LogRecord::ok`] or [`LogRecord::failed`]; those keep
/// `error` present exactly when the result is `failed`, and make
/// `durationMs` equal to `end - start` at millisecond precision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogRecord {
    pub start: String,
    pub end: String,
    pub duration_ms: i64,
    pub test_type: String,
    pub result: ProbeStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extra: Option<BTreeMap<String, serde_json::Value>>,
}

impl LogRecord {
    /// A successful record. An empty `extra` map is dropped from the output.
    pub fn ok(
        test_type: &str,
        started_at: DateTime<Utc>,
        elapsed: Duration,
        extra: BTreeMap<String, serde_json::Value>,
    ) -> Self {
        let extra = (!extra.is_empty()).then_some(extra);
        Self::build(test_type, started_at, elapsed, ProbeStatus::Ok, None, extra)
    }

    /// A failed record carrying the error description.
    pub fn failed(
        test_type: &str,
        started_at: DateTime<Utc>,
        elapsed: Duration,
        error: impl Into<String>,
    ) -> Self {
        Self::build(
            test_type,
            started_at,
            elapsed,
            ProbeStatus::Failed,
            Some(error.into()),
            None,
        )
    }

    fn build(
        test_type: &str,
        started_at: DateTime<Utc>,
        elapsed: Duration,
        result: ProbeStatus,
        error: Option<String>,
        extra: Option<BTreeMap<String, serde_json::Value>>,
    ) -> Self {
        let elapsed = TimeDelta::from_std(elapsed).unwrap_or_else(|_| TimeDelta::zero());
        let ended_at = started_at.checked_add_signed(elapsed).unwrap_or(started_at);

        Self {
            start: format_timestamp(&started_at),
            end: format_timestamp(&ended_at),
            duration_ms: ended_at.timestamp_millis() - started_at.timestamp_millis(),
            test_type: test_type.to_string(),
            result,
            error,
            extra,
        }
    }

    pub fn is_ok(&self) -> bool {
        self.result == ProbeStatus::Ok
    }
}

/// `YYYY-MM-DD HH:MM:SS.mmm UTC`
pub fn format_timestamp(at: &DateTime<Utc>) -> String {
    at.format(TIMESTAMP_FORMAT).to_string()
}
