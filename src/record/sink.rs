use std::io::Write;

use super::LogRecord;

/// Destination for finished records. Shared by every probe task.
pub trait RecordSink: Send + Sync {
    fn emit(&self, record: &LogRecord);
}

/// Writes one JSON object per line to stdout.
///
/// The line is rendered into a single buffer first and written with one
/// `write_all` on the locked handle, so concurrent probes never interleave
/// partial records.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdoutSink;

impl RecordSink for StdoutSink {
    fn emit(&self, record: &LogRecord) {
        let line = match render_line(record) {
            Ok(line) => line,
            Err(e) => {
                log::error!("Failed to serialize record for {}: {}", record.test_type, e);
                return;
            }
        };

        let mut out = std::io::stdout().lock();
        if let Err(e) = out.write_all(&line).and_then(|_| out.flush()) {
            log::error!("Failed to write record for {}: {}", record.test_type, e);
        }
    }
}

fn render_line(record: &LogRecord) -> serde_json::Result<Vec<u8>> {
    let mut line = serde_json::to_vec(record)?;
    line.push(b'\n');
    Ok(line)
}

/// Collects records in memory; used by the engine tests.
#[cfg(test)]
#[derive(Debug, Default)]
pub struct MemorySink {
    records: std::sync::Mutex<Vec<LogRecord>>,
}

#[cfg(test)]
impl MemorySink {
    pub fn records(&self) -> Vec<LogRecord> {
        self.records.lock().unwrap().clone()
    }

    pub fn count_for(&self, test_type: &str) -> usize {
        self.records
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.test_type == test_type)
            .count()
    }
}

#[cfg(test)]
impl RecordSink for MemorySink {
    fn emit(&self, record: &LogRecord) {
        self.records.lock().unwrap().push(record.clone());
    }
}
