use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method};
use url::Url;

use super::report;
use super::result::{FetchError, FetchResponse};

const USER_AGENT: &str = "netpulse/1.0";

/// One bounded HTTP operation: method, target and the dial (connect) timeout.
#[derive(Debug, Clone)]
pub struct FetchRequest {
    pub method: Method,
    pub url: Url,
    pub dial_timeout: Duration,
}

/// Performs a single request and returns the status and the full body.
///
/// No retries. Every failure is returned as-is so the caller can turn it into a record.
#[async_trait]
pub trait Fetch: Send + Sync {
    async fn fetch(&self, request: &FetchRequest) -> Result<FetchResponse, FetchError>;
}

/// reqwest backed fetcher.
///
/// A new client is built for every request so each probe dials a fresh
/// connection; pooled connections would hide the connect time from latency probes.
/// Only the connect phase is bounded, a slow body transfer is allowed to take as long as it takes.
#[derive(Debug, Default, Clone)]
pub struct HttpFetcher;

impl HttpFetcher {
    pub fn new() -> Self {
        Self
    }

    fn client(&self, dial_timeout: Duration) -> Result<Client, FetchError> {
        Client::builder()
            .connect_timeout(dial_timeout)
            .pool_max_idle_per_host(0)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| FetchError::Request(report(&e)))
    }
}

#[async_trait]
impl Fetch for HttpFetcher {
    async fn fetch(&self, request: &FetchRequest) -> Result<FetchResponse, FetchError> {
        let client = self.client(request.dial_timeout)?;

        let response = client
            .request(request.method.clone(), request.url.clone())
            .send()
            .await
            .map_err(|e| classify(e, request.dial_timeout))?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| FetchError::Body(report(&e)))?;

        log::trace!(
            "{} {} -> {} ({} bytes)",
            request.method,
            request.url,
            status,
            body.len()
        );

        Ok(FetchResponse { status, body })
    }
}

/// Map a failed `send()` to a fetch error. Only a timeout while connecting is a dial timeout.
fn classify(e: reqwest::Error, dial_timeout: Duration) -> FetchError {
    if e.is_connect() && e.is_timeout() {
        FetchError::DialTimeout {
            timeout: dial_timeout,
        }
    } else {
        FetchError::Request(report(&e))
    }
}
