mod not_validated;

use std::net::IpAddr;
use std::path::PathBuf;
use std::time::Duration;

pub use not_validated::NotValidatedConfig;

/// HTTP address the scheduler's own API listens on.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: IpAddr,
    pub port: u16,
    /// Origins allowed by the CORS layer.
    pub trusted: Vec<String>,
}

/// Where the JSON state file lives.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub path: PathBuf,
}

/// Scheme/host/port/path quadruple shared by every external HTTP dependency.
#[derive(Debug, Clone)]
pub struct HttpConfig {
    pub scheme: String,
    pub host: String,
    pub port: u16,
    pub path: String,
}

impl HttpConfig {
    pub fn url(&self) -> String {
        format!("{}://{}:{}{}", self.scheme, self.host, self.port, self.path)
    }
}

#[derive(Debug, Clone)]
pub struct SrtConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone)]
pub struct StreamOperationConfig {
    /// How long the `stream` operation is allowed to run before it is
    /// considered stuck and fails itself.
    pub timeout: Duration,
    /// How far back/forward of an event's instance the operation will
    /// still look for a usable record.
    pub window: Duration,
}

#[derive(Debug, Clone)]
pub struct OperationsConfig {
    pub stream: StreamOperationConfig,
}

#[derive(Debug, Clone)]
pub struct CleanerConfig {
    /// Anchor timestamp the tick-alignment formula measures from.
    pub reference: chrono::NaiveDateTime,
    pub interval: Duration,
}

#[derive(Debug, Clone)]
pub struct StreamSynchronizerConfig {
    /// How far ahead of `now` the synchronizer schedules `stream` tasks.
    pub window: Duration,
}

#[derive(Debug, Clone)]
pub struct SynchronizersConfig {
    pub stream: StreamSynchronizerConfig,
}

#[derive(Debug, Clone)]
pub struct SynchronizerConfig {
    pub reference: chrono::NaiveDateTime,
    pub interval: Duration,
    pub synchronizers: SynchronizersConfig,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub store: StoreConfig,
    pub operations: OperationsConfig,
    pub cleaner: CleanerConfig,
    pub synchronizer: SynchronizerConfig,
    pub emishows: HttpConfig,
    pub emirecords: HttpConfig,
    pub datarecords: HttpConfig,
    pub emistream: HttpConfig,
    pub emistream_srt: SrtConfig,
}
