use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures::StreamExt;
use tokio::io::AsyncWriteExt;

use crate::clients::Clients;
use crate::models::reserve::Format;

use super::errors::StreamError;
use super::models::Take;

/// A take streamed to disk, tagged with the container format ffmpeg
/// needs to be told to demux it as.
pub struct Downloaded {
    pub path: PathBuf,
    pub format: Format,
}

/// Streams a [Take]'s media bytes to a file inside the task's scoped
/// temp directory.
pub struct Downloader {
    clients: Arc<Clients>,
}

impl Downloader {
    pub fn new(clients: Arc<Clients>) -> Self {
        Self { clients }
    }

    pub async fn download(&self, take: &Take, event: uuid::Uuid, into: &Path) -> anyhow::Result<Downloaded> {
        let response = match take {
            Take::Record(record) => self.clients.records.download(record.event, record.start).await,
            Take::Prerecording(prerecording) => {
                self.clients.prerecordings.download(prerecording.event, prerecording.start).await
            }
        }
        .map_err(|_| StreamError::DownloadUnavailable(event))?;

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default()
            .to_owned();
        let format = match content_type.split(';').next().unwrap_or_default().trim() {
            "audio/ogg" => Format::Ogg,
            _ => return Err(StreamError::UnexpectedFormat(event).into()),
        };

        let destination = into.join(format!("take.{}", format.as_str()));
        let mut file = tokio::fs::File::create(&destination).await?;
        let mut bytes = response.bytes_stream();
        while let Some(chunk) = bytes.next().await {
            file.write_all(&chunk?).await?;
        }
        file.flush().await?;
        Ok(Downloaded { path: destination, format })
    }
}
