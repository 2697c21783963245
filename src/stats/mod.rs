//! Summaries over previously emitted records, one JSON object per line.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::io::BufRead;

use unicode_truncate::UnicodeTruncateStr;

use crate::record::LogRecord;

const MAX_NAME_WIDTH: usize = 32;

/// Aggregates for one `testType`.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct TestTypeStats {
    pub total: usize,
    pub ok: usize,
    pub failed: usize,
    pub min_duration_ms: Option<i64>,
    pub max_duration_ms: Option<i64>,
    duration_sum_ms: i64,
    speed_sum_kibs: f64,
    speed_samples: usize,
}

impl TestTypeStats {
    fn add(&mut self, record: &LogRecord) {
        self.total += 1;
        if record.is_ok() {
            self.ok += 1;
        } else {
            self.failed += 1;
        }

        let d = record.duration_ms;
        self.min_duration_ms = Some(self.min_duration_ms.map_or(d, |m| m.min(d)));
        self.max_duration_ms = Some(self.max_duration_ms.map_or(d, |m| m.max(d)));
        self.duration_sum_ms += d;

        if let Some(speed) = record
            .extra
            .as_ref()
            .and_then(|extra| extra.get("speedKiBs"))
            .and_then(|v| v.as_f64())
        {
            self.speed_sum_kibs += speed;
            self.speed_samples += 1;
        }
    }

    pub fn avg_duration_ms(&self) -> Option<f64> {
        (self.total > 0).then(|| self.duration_sum_ms as f64 / self.total as f64)
    }

    pub fn avg_speed_kibs(&self) -> Option<f64> {
        (self.speed_samples > 0).then(|| self.speed_sum_kibs / self.speed_samples as f64)
    }
}

#[derive(Debug, Default)]
pub struct Summary {
    pub by_test_type: BTreeMap<String, TestTypeStats>,
    /// Lines that were not a record.
    pub skipped: usize,
}

/// Read records line by line. Blank lines are ignored, unparseable ones counted as skipped.
pub fn summarize<R: BufRead>(reader: R) -> std::io::Result<Summary> {
    let mut summary = Summary::default();

    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        match serde_json::from_str::<LogRecord>(line) {
            Ok(record) => summary
                .by_test_type
                .entry(record.test_type.clone())
                .or_default()
                .add(&record),
            Err(e) => {
                log::warn!("Skipping line {}: {}", idx + 1, e);
                summary.skipped += 1;
            }
        }
    }

    Ok(summary)
}

fn to_fixed_width(input: &str, width: usize) -> String {
    let (truncated, _) = input.unicode_truncate(width);
    format!("{:<width$}", truncated, width = width)
}

fn fmt_opt(value: Option<f64>) -> String {
    value.map_or_else(|| "-".to_string(), |v| format!("{v:.0}"))
}

impl Summary {
    /// Aligned plain-text table, one row per test type.
    pub fn render(&self) -> String {
        let name_width = self
            .by_test_type
            .keys()
            .map(|name| name.len())
            .max()
            .unwrap_or(0)
            .clamp("testType".len(), MAX_NAME_WIDTH);

        let mut out = String::new();
        let _ = writeln!(
            out,
            "{} {:>7} {:>7} {:>7} {:>8} {:>8} {:>8} {:>12}",
            to_fixed_width("testType", name_width),
            "total",
            "ok",
            "failed",
            "minMs",
            "avgMs",
            "maxMs",
            "avgSpeedKiBs"
        );

        for (name, stats) in &self.by_test_type {
            let _ = writeln!(
                out,
                "{} {:>7} {:>7} {:>7} {:>8} {:>8} {:>8} {:>12}",
                to_fixed_width(name, name_width),
                stats.total,
                stats.ok,
                stats.failed,
                fmt_opt(stats.min_duration_ms.map(|v| v as f64)),
                fmt_opt(stats.avg_duration_ms()),
                fmt_opt(stats.max_duration_ms.map(|v| v as f64)),
                fmt_opt(stats.avg_speed_kibs()),
            );
        }

        if self.skipped > 0 {
            let _ = writeln!(out, "({} unparseable line(s) skipped)", self.skipped);
        }
        out
    }
}
