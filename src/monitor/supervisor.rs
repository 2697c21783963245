use std::sync::Arc;

use tokio::task::JoinSet;

use super::MonitorError;
use super::shutdown::Shutdown;
use super::ticker::ProbeLoop;
use crate::config::ProbeSpec;
use crate::http_probe::Fetch;
use crate::record::RecordSink;

/// Runs one [`ProbeLoop`] per configured probe until shutdown.
pub struct Monitor {
    probes: Vec<ProbeSpec>,
    fetcher: Arc<dyn Fetch>,
    sink: Arc<dyn RecordSink>,
    align_to_second: bool,
}

impl Monitor {
    pub fn new(probes: Vec<ProbeSpec>, fetcher: Arc<dyn Fetch>, sink: Arc<dyn RecordSink>) -> Self {
        Self {
            probes,
            fetcher,
            sink,
            align_to_second: true,
        }
    }

    #[cfg(test)]
    pub fn without_alignment(mut self) -> Self {
        self.align_to_second = false;
        self
    }

    /// Returns as soon as `shutdown` fires, or once every loop has ended.
    ///
    /// Shutdown is watched here directly rather than through the loops, so a
    /// loop that is slow to notice it cannot hold the whole monitor up.
    pub async fn run(self, shutdown: Shutdown) -> Result<(), MonitorError> {
        if shutdown.is_triggered() {
            log::info!("Shutdown requested before the monitor started");
            return Ok(());
        }

        let mut loops = JoinSet::new();
        for spec in self.probes {
            let mut probe_loop =
                ProbeLoop::new(spec, Arc::clone(&self.fetcher), Arc::clone(&self.sink));
            if !self.align_to_second {
                probe_loop = probe_loop.without_alignment();
            }
            loops.spawn(probe_loop.run(shutdown.clone()));
        }
        log::info!("Monitor started with {} probe loop(s)", loops.len());

        let mut shutdown = shutdown;
        tokio::select! {
            biased;
            _ = shutdown.cancelled() => {
                log::info!("Shutdown requested, monitor stopping");
                Ok(())
            }
            result = wait_for_all(&mut loops) => result,
        }
    }
}

async fn wait_for_all(loops: &mut JoinSet<Result<(), MonitorError>>) -> Result<(), MonitorError> {
    while let Some(joined) = loops.join_next().await {
        match joined {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                log::error!("Probe loop failed: {}", e);
                return Err(e);
            }
            Err(e) => log::error!("Probe loop terminated abnormally: {}", e),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::monitor::shutdown;
    use crate::monitor::testing::{Behaviour, FakeFetcher, spec};
    use crate::probe::ProbeKind;
    use crate::record::ProbeStatus;
    use crate::record::sink::MemorySink;
    use async_trait::async_trait;
    use reqwest::StatusCode;
    use std::time::Duration;
    use tokio::time::{sleep, timeout};

    use crate::http_probe::{FetchError, FetchRequest, FetchResponse};

    /// Routes each probe to its own fake by target host.
    struct PerProbe {
        reach: FakeFetcher,
        download: FakeFetcher,
    }

    #[async_trait]
    impl Fetch for PerProbe {
        async fn fetch(&self, request: &FetchRequest) -> Result<FetchResponse, FetchError> {
            match request.url.host_str() {
                Some("reach.test") => self.reach.fetch(request).await,
                _ => self.download.fetch(request).await,
            }
        }
    }

    fn spec_at(name: &str, kind: ProbeKind, period_ms: u64, url: &str) -> ProbeSpec {
        let mut spec = spec(name, kind, period_ms);
        spec.url = url.parse().unwrap();
        spec
    }

    #[tokio::test(start_paused = true)]
    async fn test_probe_kinds_run_independently() {
        let fetcher = Arc::new(PerProbe {
            reach: FakeFetcher::new(Behaviour::Refuse),
            download: FakeFetcher::new(Behaviour::Respond(StatusCode::OK, 10_485_760)),
        });
        let sink = Arc::new(MemorySink::default());
        let (trigger, shutdown) = shutdown::channel();

        let monitor = Monitor::new(
            vec![
                spec_at("reachGoogle", ProbeKind::Latency, 100, "http://reach.test/"),
                spec_at("downloadFile", ProbeKind::Bandwidth, 250, "http://download.test/f"),
            ],
            fetcher.clone(),
            sink.clone(),
        )
        .without_alignment();
        let handle = tokio::spawn(monitor.run(shutdown));

        sleep(Duration::from_millis(990)).await;
        trigger.trigger();
        handle.await.unwrap().unwrap();
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }

        let reach = sink.count_for("reachGoogle");
        let download = sink.count_for("downloadFile");
        assert!((9..=11).contains(&reach), "reachGoogle produced {reach} records");
        assert!((3..=5).contains(&download), "downloadFile produced {download} records");

        for record in sink.records() {
            match record.test_type.as_str() {
                "reachGoogle" => {
                    assert_eq!(record.result, ProbeStatus::Failed);
                    assert_eq!(record.error.as_deref(), Some("connection refused"));
                    assert!(record.extra.is_none());
                }
                "downloadFile" => {
                    assert_eq!(record.result, ProbeStatus::Ok);
                    assert!(record.error.is_none());
                    let extra = record.extra.unwrap();
                    assert_eq!(extra["bodyLengthKiB"], serde_json::json!(10240.0));
                }
                other => panic!("unexpected test type {other}"),
            }
            assert!(record.duration_ms >= 0);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_returns_promptly_with_hung_probes() {
        let fetcher = Arc::new(FakeFetcher::new(Behaviour::Hang));
        let sink = Arc::new(MemorySink::default());
        let (trigger, shutdown) = shutdown::channel();

        let monitor = Monitor::new(
            vec![
                spec("reachGoogle", ProbeKind::Latency, 100),
                spec("downloadFile", ProbeKind::Bandwidth, 250),
            ],
            fetcher.clone(),
            sink.clone(),
        )
        .without_alignment();
        let handle = tokio::spawn(monitor.run(shutdown));

        sleep(Duration::from_millis(300)).await;
        let launched = fetcher.calls();
        assert!(launched > 0);

        trigger.trigger();
        timeout(Duration::from_millis(50), handle)
            .await
            .expect("monitor returns while probes are still hanging")
            .unwrap()
            .unwrap();

        sleep(Duration::from_secs(1)).await;
        assert_eq!(fetcher.calls(), launched);
        assert!(sink.records().is_empty());
    }

    #[tokio::test]
    async fn test_setup_error_is_returned() {
        let (_trigger, shutdown) = shutdown::channel();
        let monitor = Monitor::new(
            vec![
                spec("reachGoogle", ProbeKind::Latency, 100),
                spec("broken", ProbeKind::Latency, 0),
            ],
            Arc::new(FakeFetcher::new(Behaviour::Refuse)),
            Arc::new(MemorySink::default()),
        )
        .without_alignment();

        let err = timeout(Duration::from_secs(5), monitor.run(shutdown))
            .await
            .unwrap()
            .unwrap_err();
        assert!(matches!(err, MonitorError::ZeroPeriod(name) if name == "broken"));
    }

    #[tokio::test]
    async fn test_no_probes_returns_immediately() {
        let (_trigger, shutdown) = shutdown::channel();
        let monitor = Monitor::new(
            Vec::new(),
            Arc::new(FakeFetcher::new(Behaviour::Refuse)),
            Arc::new(MemorySink::default()),
        );

        timeout(Duration::from_secs(1), monitor.run(shutdown))
            .await
            .unwrap()
            .unwrap();
    }
}
