use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::config::ProbeSpec;
use crate::http_probe::{Fetch, FetchError, FetchResponse};
use crate::record::LogRecord;

mod normalize;

/// How a probe's raw outcome is judged and which extras it reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProbeKind {
    /// Reachability: ok whenever the request completes, whatever the status code.
    Latency,
    /// Bulk download: requires a 200 and reports body size and throughput.
    Bandwidth,
}

impl ProbeKind {
    pub fn normalize(self, test_type: &str, outcome: ProbeOutcome) -> LogRecord {
        match self {
            ProbeKind::Latency => normalize::latency(test_type, outcome),
            ProbeKind::Bandwidth => normalize::bandwidth(test_type, outcome),
        }
    }
}

impl std::fmt::Display for ProbeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProbeKind::Latency => write!(f, "latency"),
            ProbeKind::Bandwidth => write!(f, "bandwidth"),
        }
    }
}

/// Raw result of one probe invocation, consumed by the normalizer.
#[derive(Debug)]
pub struct ProbeOutcome {
    pub started_at: DateTime<Utc>,
    pub elapsed: Duration,
    pub result: Result<FetchResponse, FetchError>,
}

/// Run one probe and turn whatever happened into a record. Never fails.
pub async fn run_probe(spec: &ProbeSpec, fetcher: &dyn Fetch) -> LogRecord {
    let request = spec.request();

    let started_at = Utc::now();
    let start = Instant::now();
    let result = fetcher.fetch(&request).await;
    let elapsed = start.elapsed();

    spec.kind.normalize(
        &spec.name,
        ProbeOutcome {
            started_at,
            elapsed,
            result,
        },
    )
}
