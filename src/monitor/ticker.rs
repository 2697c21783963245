use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tokio::time::{MissedTickBehavior, interval, sleep};

use super::MonitorError;
use super::shutdown::Shutdown;
use crate::config::ProbeSpec;
use crate::http_probe::Fetch;
use crate::probe::run_probe;
use crate::record::RecordSink;

/// Periodic launcher for a single probe.
///
/// Each tick spawns one probe task and moves on; the loop never waits for a
/// probe to finish, so a hung request cannot delay the next tick.
pub struct ProbeLoop {
    spec: Arc<ProbeSpec>,
    fetcher: Arc<dyn Fetch>,
    sink: Arc<dyn RecordSink>,
    align_to_second: bool,
}

impl ProbeLoop {
    pub fn new(spec: ProbeSpec, fetcher: Arc<dyn Fetch>, sink: Arc<dyn RecordSink>) -> Self {
        Self {
            spec: Arc::new(spec),
            fetcher,
            sink,
            align_to_second: true,
        }
    }

    /// Start ticking right away instead of on the next whole second.
    pub fn without_alignment(mut self) -> Self {
        self.align_to_second = false;
        self
    }

    /// Tick until `shutdown` fires. Only setup problems are returned as errors.
    pub async fn run(self, mut shutdown: Shutdown) -> Result<(), MonitorError> {
        let name = self.spec.name.as_str();
        if self.spec.period.is_zero() {
            return Err(MonitorError::ZeroPeriod(name.to_string()));
        }

        if self.align_to_second {
            // Only to make the log timestamps line up.
            let delay = delay_to_next_second(SystemTime::now())?;
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => {
                    log::info!("Probe {} stopped before its first tick", name);
                    return Ok(());
                }
                _ = sleep(delay) => {}
            }
        }

        log::info!(
            "Starting {} probe {} every {:?} against {}",
            self.spec.kind,
            name,
            self.spec.period,
            self.spec.url
        );

        let mut ticker = interval(self.spec.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let mut launched: u64 = 0;
        loop {
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => {
                    launched += 1;
                    self.launch(launched);
                }
            }
        }

        log::info!("Probe {} stopped after {} launches", name, launched);
        Ok(())
    }

    fn launch(&self, seq: u64) {
        let spec = Arc::clone(&self.spec);
        let fetcher = Arc::clone(&self.fetcher);
        let sink = Arc::clone(&self.sink);

        log::debug!("Launching {} #{}", spec.name, seq);
        tokio::spawn(async move {
            let record = run_probe(&spec, fetcher.as_ref()).await;
            sink.emit(&record);
        });
    }
}

/// Time left until the next whole second of the wall clock.
fn delay_to_next_second(now: SystemTime) -> Result<Duration, MonitorError> {
    let since_epoch = now.duration_since(UNIX_EPOCH)?;
    Ok(Duration::from_secs(1) - Duration::from_nanos(u64::from(since_epoch.subsec_nanos())))
}
