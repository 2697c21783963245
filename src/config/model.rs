use std::collections::BTreeMap;
use std::time::Duration;

use reqwest::Method;
use serde::Deserialize;
use url::Url;

use super::app_config::ConfigError;
use crate::http_probe::FetchRequest;
use crate::probe::ProbeKind;

/// One probe entry of the configuration file, keyed by its test type name.
#[derive(Debug, Clone, Deserialize)]
pub struct ProbeConfig {
    /// How the outcome is judged: `latency` or `bandwidth`.
    pub kind: ProbeKind,

    /// The URL to request on every tick.
    pub url: String,

    /// Seconds between two probe launches.
    pub polling_interval_seconds: u64,

    /// Maximum time to establish the connection.
    /// Defaults to 3 seconds if not specified.
    #[serde(default = "default_dial_timeout_seconds")]
    pub dial_timeout_seconds: u64,

    /// HTTP method, defaults to GET.
    #[serde(default = "default_method")]
    pub method: String,
}

fn default_dial_timeout_seconds() -> u64 {
    3
}

fn default_method() -> String {
    "GET".to_string()
}

pub type Config = BTreeMap<String, ProbeConfig>;

impl ProbeConfig {
    pub fn into_spec(self, name: &str) -> Result<ProbeSpec, ConfigError> {
        let url = Url::parse(&self.url).map_err(|source| ConfigError::InvalidUrl {
            probe: name.to_string(),
            url: self.url.clone(),
            source,
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::UnsupportedScheme {
                probe: name.to_string(),
                scheme: url.scheme().to_string(),
            });
        }

        let method = Method::from_bytes(self.method.to_ascii_uppercase().as_bytes()).map_err(
            |_| ConfigError::InvalidMethod {
                probe: name.to_string(),
                method: self.method.clone(),
            },
        )?;

        if self.polling_interval_seconds == 0 {
            return Err(ConfigError::ZeroInterval(name.to_string()));
        }

        Ok(ProbeSpec {
            name: name.to_string(),
            kind: self.kind,
            method,
            url,
            period: Duration::from_secs(self.polling_interval_seconds),
            dial_timeout: Duration::from_secs(self.dial_timeout_seconds),
        })
    }
}

/// Fixed configuration of one probe kind, read-only while the monitor runs.
#[derive(Debug, Clone)]
pub struct ProbeSpec {
    /// Reported as `testType` in every record.
    pub name: String,
    pub kind: ProbeKind,
    pub method: Method,
    pub url: Url,
    pub period: Duration,
    pub dial_timeout: Duration,
}

impl ProbeSpec {
    /// A GET probe.
    pub fn new(
        name: impl Into<String>,
        kind: ProbeKind,
        url: Url,
        period: Duration,
        dial_timeout: Duration,
    ) -> Self {
        Self {
            name: name.into(),
            kind,
            method: Method::GET,
            url,
            period,
            dial_timeout,
        }
    }

    pub fn request(&self) -> FetchRequest {
        FetchRequest {
            method: self.method.clone(),
            url: self.url.clone(),
            dial_timeout: self.dial_timeout,
        }
    }
}

#[cfg(test)]
pub mod test {
    use super::*;

    #[test]
    fn test_defaults() {
        assert_eq!(default_dial_timeout_seconds(), 3);
        assert_eq!(default_method(), "GET");
    }

    #[test]
    fn test_probe_config_deserialization() {
        let yaml = r#"
                    reachGoogle:
                        kind: latency
                        url: http://google.com
                        polling_interval_seconds: 1

                    downloadFile:
                        kind: bandwidth
                        url: https://example.com/zero-file-10MiB
                        polling_interval_seconds: 300
                        dial_timeout_seconds: 5
                        method: head
                                    "#;

        let config: Config = serde_yaml::from_str(yaml).expect("Invalid YAML");
        assert_eq!(config.len(), 2);

        let reach = config["reachGoogle"].clone().into_spec("reachGoogle").unwrap();
        assert_eq!(reach.kind, ProbeKind::Latency);
        assert_eq!(reach.method, Method::GET);
        assert_eq!(reach.period, Duration::from_secs(1));
        assert_eq!(reach.dial_timeout, Duration::from_secs(3));
        assert_eq!(reach.url.as_str(), "http://google.com/");

        let download = config["downloadFile"].clone().into_spec("downloadFile").unwrap();
        assert_eq!(download.kind, ProbeKind::Bandwidth);
        assert_eq!(download.method, Method::HEAD);
        assert_eq!(download.period, Duration::from_secs(300));
        assert_eq!(download.dial_timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_unknown_kind_is_rejected() {
        let yaml = r#"
                    reach:
                        kind: icmp
                        url: http://google.com
                        polling_interval_seconds: 1
                    "#;

        assert!(serde_yaml::from_str::<Config>(yaml).is_err());
    }

    fn entry(url: &str, interval: u64, method: &str) -> ProbeConfig {
        ProbeConfig {
            kind: ProbeKind::Latency,
            url: url.to_string(),
            polling_interval_seconds: interval,
            dial_timeout_seconds: 3,
            method: method.to_string(),
        }
    }

    #[test]
    fn test_invalid_entries() {
        assert!(matches!(
            entry("not a url", 1, "GET").into_spec("p"),
            Err(ConfigError::InvalidUrl { .. })
        ));
        assert!(matches!(
            entry("ftp://example.com/file", 1, "GET").into_spec("p"),
            Err(ConfigError::UnsupportedScheme { .. })
        ));
        assert!(matches!(
            entry("http://example.com", 0, "GET").into_spec("p"),
            Err(ConfigError::ZeroInterval(_))
        ));
        assert!(matches!(
            entry("http://example.com", 1, "GE T").into_spec("p"),
            Err(ConfigError::InvalidMethod { .. })
        ));
    }

    #[test]
    fn test_request_carries_dial_timeout() {
        let spec = ProbeSpec::new(
            "reach",
            ProbeKind::Latency,
            Url::parse("http://localhost:8080/").unwrap(),
            Duration::from_millis(100),
            Duration::from_millis(250),
        );

        let request = spec.request();
        assert_eq!(request.method, Method::GET);
        assert_eq!(request.url, spec.url);
        assert_eq!(request.dial_timeout, Duration::from_millis(250));
    }
}
