use std::net::IpAddr;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use chrono::NaiveDateTime;
use serde::Deserialize;

use super::{
    CleanerConfig, Config, HttpConfig, OperationsConfig, ServerConfig, SrtConfig,
    StoreConfig, StreamOperationConfig, StreamSynchronizerConfig, SynchronizerConfig,
    SynchronizersConfig,
};

fn default_server_host() -> IpAddr {
    "0.0.0.0".parse().unwrap()
}
fn default_server_port() -> u16 {
    7000
}
fn default_store_path() -> PathBuf {
    PathBuf::from("scheduler.json")
}
#[allow(clippy::unnecessary_wraps)]
fn default_stream_timeout() -> Duration {
    humantime::parse_duration("1h").unwrap()
}
fn default_stream_window() -> Duration {
    humantime::parse_duration("60days").unwrap()
}
fn default_cleaner_reference() -> NaiveDateTime {
    NaiveDateTime::parse_from_str("2000-01-01T00:00:00", "%Y-%m-%dT%H:%M:%S").unwrap()
}
fn default_cleaner_interval() -> Duration {
    humantime::parse_duration("1day").unwrap()
}
fn default_synchronizer_reference() -> NaiveDateTime {
    default_cleaner_reference()
}
fn default_synchronizer_interval() -> Duration {
    humantime::parse_duration("1min").unwrap()
}
fn default_stream_synchronizer_window() -> Duration {
    default_stream_window()
}
fn default_http_scheme() -> String {
    "http".to_owned()
}
fn default_http_path() -> String {
    String::new()
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct NotValidatedServerConfig {
    pub host: Option<IpAddr>,
    pub port: Option<u16>,
    pub trusted: Vec<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct NotValidatedStoreConfig {
    pub path: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct NotValidatedStreamOperationConfig {
    #[serde(with = "humantime_serde::option")]
    pub timeout: Option<Duration>,
    #[serde(with = "humantime_serde::option")]
    pub window: Option<Duration>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct NotValidatedOperationsConfig {
    pub stream: NotValidatedStreamOperationConfig,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct NotValidatedCleanerConfig {
    pub reference: Option<NaiveDateTime>,
    #[serde(with = "humantime_serde::option")]
    pub interval: Option<Duration>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct NotValidatedStreamSynchronizerConfig {
    #[serde(with = "humantime_serde::option")]
    pub window: Option<Duration>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct NotValidatedSynchronizersConfig {
    pub stream: NotValidatedStreamSynchronizerConfig,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct NotValidatedSynchronizerConfig {
    pub reference: Option<NaiveDateTime>,
    #[serde(with = "humantime_serde::option")]
    pub interval: Option<Duration>,
    pub synchronizers: NotValidatedSynchronizersConfig,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct NotValidatedHttpConfig {
    pub scheme: Option<String>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub path: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct NotValidatedSrtConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
}

/// Raw shape of the TOML configuration file: every field is optional so
/// `[server]`, `[store]`, ... sections can be omitted entirely and picked
/// up by their defaults. [validate](NotValidatedConfig::validate) turns
/// this into a fully-populated [Config].
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct NotValidatedConfig {
    pub server: NotValidatedServerConfig,
    pub store: NotValidatedStoreConfig,
    pub operations: NotValidatedOperationsConfig,
    pub cleaner: NotValidatedCleanerConfig,
    pub synchronizer: NotValidatedSynchronizerConfig,
    pub emishows: NotValidatedHttpConfig,
    pub emirecords: NotValidatedHttpConfig,
    pub datarecords: NotValidatedHttpConfig,
    pub emistream: NotValidatedHttpConfig,
    pub emistream_srt: NotValidatedSrtConfig,
}

fn validate_http(name: &str, raw: NotValidatedHttpConfig, default_port: u16) -> Result<HttpConfig> {
    let host = raw.host.ok_or_else(|| anyhow!("missing `{name}.host`"))?;
    if host.is_empty() {
        return Err(anyhow!("`{name}.host` must not be empty"));
    }
    Ok(HttpConfig {
        scheme: raw.scheme.unwrap_or_else(default_http_scheme),
        host,
        port: raw.port.unwrap_or(default_port),
        path: raw.path.unwrap_or_else(default_http_path),
    })
}

impl NotValidatedConfig {
    /// Check the raw configuration and turn it into a [Config], failing
    /// with a description of the first invalid setting found.
    pub fn validate(self) -> Result<Config> {
        let server = ServerConfig {
            host: self.server.host.unwrap_or_else(default_server_host),
            port: self.server.port.unwrap_or_else(default_server_port),
            trusted: self.server.trusted,
        };

        let store = StoreConfig { path: self.store.path.unwrap_or_else(default_store_path) };

        let operations = OperationsConfig {
            stream: StreamOperationConfig {
                timeout: self.operations.stream.timeout.unwrap_or_else(default_stream_timeout),
                window: self.operations.stream.window.unwrap_or_else(default_stream_window),
            },
        };
        if operations.stream.timeout.is_zero() {
            return Err(anyhow!("`operations.stream.timeout` must be greater than zero"));
        }

        let cleaner = CleanerConfig {
            reference: self.cleaner.reference.unwrap_or_else(default_cleaner_reference),
            interval: self.cleaner.interval.unwrap_or_else(default_cleaner_interval),
        };
        if cleaner.interval.is_zero() {
            return Err(anyhow!("`cleaner.interval` must be greater than zero"));
        }

        let synchronizer = SynchronizerConfig {
            reference: self.synchronizer.reference.unwrap_or_else(default_synchronizer_reference),
            interval: self.synchronizer.interval.unwrap_or_else(default_synchronizer_interval),
            synchronizers: SynchronizersConfig {
                stream: StreamSynchronizerConfig {
                    window: self
                        .synchronizer
                        .synchronizers
                        .stream
                        .window
                        .unwrap_or_else(default_stream_synchronizer_window),
                },
            },
        };
        if synchronizer.interval.is_zero() {
            return Err(anyhow!("`synchronizer.interval` must be greater than zero"));
        }

        let emishows = validate_http("emishows", self.emishows, 80).context("emishows config")?;
        let emirecords = validate_http("emirecords", self.emirecords, 80).context("emirecords config")?;
        let datarecords = validate_http("datarecords", self.datarecords, 80).context("datarecords config")?;
        let emistream = validate_http("emistream", self.emistream, 80).context("emistream config")?;

        let emistream_srt = SrtConfig {
            host: self
                .emistream_srt
                .host
                .ok_or_else(|| anyhow!("missing `emistream_srt.host`"))?,
            port: self.emistream_srt.port.unwrap_or(8890),
        };

        Ok(Config {
            server,
            store,
            operations,
            cleaner,
            synchronizer,
            emishows,
            emirecords,
            datarecords,
            emistream,
            emistream_srt,
        })
    }
}
