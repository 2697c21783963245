use std::collections::BTreeMap;

use reqwest::StatusCode;
use serde_json::{Value, json};

use super::ProbeOutcome;
use crate::record::LogRecord;

const BODY_LENGTH_KIB: &str = "bodyLengthKiB";
const SPEED_KIBS: &str = "speedKiBs";

pub(super) fn latency(test_type: &str, outcome: ProbeOutcome) -> LogRecord {
    let ProbeOutcome {
        started_at,
        elapsed,
        result,
    } = outcome;

    // TODO: decide whether a 5xx from the reference endpoint should count as unreachable.
    match result {
        Ok(_) => LogRecord::ok(test_type, started_at, elapsed, BTreeMap::new()),
        Err(e) => LogRecord::failed(test_type, started_at, elapsed, e.to_string()),
    }
}

pub(super) fn bandwidth(test_type: &str, outcome: ProbeOutcome) -> LogRecord {
    let ProbeOutcome {
        started_at,
        elapsed,
        result,
    } = outcome;

    let response = match result {
        Ok(response) => response,
        Err(e) => return LogRecord::failed(test_type, started_at, elapsed, e.to_string()),
    };

    if response.status != StatusCode::OK {
        return LogRecord::failed(
            test_type,
            started_at,
            elapsed,
            format!("got status code {}", response.status.as_u16()),
        );
    }

    let body_kib = response.body.len() as f64 / 1024.0;

    let mut extra: BTreeMap<String, Value> = BTreeMap::new();
    extra.insert(BODY_LENGTH_KIB.to_string(), json!(body_kib));
    if let Some(speed) = speed_kibs(body_kib, elapsed.as_secs_f64()) {
        extra.insert(SPEED_KIBS.to_string(), json!(speed));
    }

    LogRecord::ok(test_type, started_at, elapsed, extra)
}

/// Whole KiB per second, or `None` when no time was measured.
fn speed_kibs(body_kib: f64, elapsed_secs: f64) -> Option<i64> {
    if elapsed_secs <= 0.0 {
        return None;
    }
    let speed = body_kib / elapsed_secs;
    speed.is_finite().then_some(speed as i64)
}
