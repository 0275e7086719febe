use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The only container format the stream operation currently pushes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    Ogg,
}

impl Format {
    /// The tag ffmpeg's `-f` demuxer/muxer option and the downloader's
    /// `Content-Type` mapping both use.
    pub fn as_str(self) -> &'static str {
        match self {
            Format::Ogg => "ogg",
        }
    }
}

/// The one-shot token authorizing an SRT push for a single reservation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credentials {
    pub token: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Availability {
    Disabled,
    Busy,
    Available,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReserveRequest {
    pub event: Uuid,
    pub format: Format,
    pub record: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReserveResponse {
    pub credentials: Credentials,
    pub port: u16,
}

/// Server-sent events emitted while we hold (or wait for) a reservation.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ReserveEvent {
    AvailabilityChanged { availability: Availability },
}
