use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;
use url::Url;

use super::model::{Config, ProbeSpec};
use crate::probe::ProbeKind;

const DEFAULT_CONFIG_FILE: &str = "config.yml";

const LATENCY_TEST_NAME: &str = "reachGoogle";
const BANDWIDTH_TEST_NAME: &str = "downloadFile";

const LATENCY_TEST_PERIOD: Duration = Duration::from_secs(1);
const BANDWIDTH_TEST_PERIOD: Duration = Duration::from_secs(5 * 60);
const LATENCY_DIAL_TIMEOUT: Duration = Duration::from_secs(3);
const BANDWIDTH_DIAL_TIMEOUT: Duration = Duration::from_secs(3);

const LATENCY_TEST_URL: &str = "http://google.com";
const BANDWIDTH_TEST_URL: &str = "https://bcap-public-389518.s3.amazonaws.com/zero-file-50MiB";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid YAML in {path}: {source}")]
    Yaml {
        path: PathBuf,
        source: serde_yaml::Error,
    },

    #[error("probe {probe}: invalid url {url:?}: {source}")]
    InvalidUrl {
        probe: String,
        url: String,
        source: url::ParseError,
    },

    #[error("probe {probe}: unsupported scheme {scheme:?}, expected http or https")]
    UnsupportedScheme { probe: String, scheme: String },

    #[error("probe {probe}: invalid HTTP method {method:?}")]
    InvalidMethod { probe: String, method: String },

    #[error("probe {0}: polling_interval_seconds must be greater than zero")]
    ZeroInterval(String),

    #[error("no probes configured in {0}")]
    Empty(PathBuf),
}

pub struct AppConfig {
    pub probes: Vec<ProbeSpec>,
    /// Where the probes came from, `None` for the built-in set.
    pub source: Option<PathBuf>,
}

/// Load the probe configuration.
///
/// Reads `.env` if present, then the file named by `CONFIG_FILE`. Without
/// `CONFIG_FILE` a `config.yml` in the working directory is used when it
/// exists, otherwise the built-in latency and bandwidth probes.
pub fn load_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();

    let path = match env::var("CONFIG_FILE") {
        Ok(path) => PathBuf::from(path),
        Err(_) => {
            let fallback = PathBuf::from(DEFAULT_CONFIG_FILE);
            if !fallback.exists() {
                log::info!("No {} found, using built-in probes", DEFAULT_CONFIG_FILE);
                return Ok(AppConfig {
                    probes: default_probes(),
                    source: None,
                });
            }
            fallback
        }
    };

    let probes = load_probes_from(&path)?;
    log::info!("Loaded {} probe(s) from {}", probes.len(), path.display());

    Ok(AppConfig {
        probes,
        source: Some(path),
    })
}

/// Parse and validate a YAML probe file.
pub fn load_probes_from(path: &Path) -> Result<Vec<ProbeSpec>, ConfigError> {
    let config_str = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    let config: Config = serde_yaml::from_str(&config_str).map_err(|source| ConfigError::Yaml {
        path: path.to_path_buf(),
        source,
    })?;

    if config.is_empty() {
        return Err(ConfigError::Empty(path.to_path_buf()));
    }

    config
        .into_iter()
        .map(|(name, probe)| probe.into_spec(&name))
        .collect()
}

/// A latency probe against google.com every second and a 50 MiB download every five minutes.
pub fn default_probes() -> Vec<ProbeSpec> {
    vec![
        ProbeSpec::new(
            LATENCY_TEST_NAME,
            ProbeKind::Latency,
            builtin_url(LATENCY_TEST_URL),
            LATENCY_TEST_PERIOD,
            LATENCY_DIAL_TIMEOUT,
        ),
        ProbeSpec::new(
            BANDWIDTH_TEST_NAME,
            ProbeKind::Bandwidth,
            builtin_url(BANDWIDTH_TEST_URL),
            BANDWIDTH_TEST_PERIOD,
            BANDWIDTH_DIAL_TIMEOUT,
        ),
    ]
}

fn builtin_url(url: &str) -> Url {
    Url::parse(url).expect("built-in probe URLs are valid")
}
