use std::sync::Arc;

use futures::StreamExt;
use reqwest::StatusCode;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::clients::reserve::ReserveClient;
use crate::clients::Clients;
use crate::models::reserve::{Credentials, Format, ReserveRequest};

use super::errors::StreamError;

/// Obtains a streaming slot, retrying across `409 Conflict` responses
/// until a slot frees up or `deadline` passes.
///
/// The availability event stream is subscribed to *before* the first
/// reservation attempt, so an availability change that races the first
/// `409` is never missed. Dropping the returned future (e.g. on
/// cancellation) drops that subscription along with it.
pub struct Reserver {
    clients: Arc<Clients>,
}

impl Reserver {
    pub fn new(clients: Arc<Clients>) -> Self {
        Self { clients }
    }

    pub async fn reserve(
        &self,
        event: Uuid,
        format: Format,
        deadline: Instant,
        cancel: &CancellationToken,
    ) -> anyhow::Result<Credentials> {
        let mut events = Box::pin(self.clients.reserve.subscribe_events());
        let request = ReserveRequest { event, format, record: false };

        loop {
            let response = self.clients.reserve.reserve(&request).await?;
            match response.status() {
                StatusCode::CONFLICT => {
                    tokio::select! {
                        _ = cancel.cancelled() => return Err(anyhow::anyhow!("cancelled while waiting for a reservation")),
                        _ = tokio::time::sleep_until(deadline) => return Err(StreamError::ReservationFailed.into()),
                        event = events.next() => match event {
                            Some(Ok(_)) => continue,
                            Some(Err(err)) => return Err(err),
                            None => return Err(StreamError::ReservationFailed.into()),
                        },
                    }
                }
                status if status.is_success() => {
                    let parsed = ReserveClient::parse_reserved(response).await?;
                    return Ok(parsed.credentials);
                }
                status => return Err(anyhow::anyhow!("reservation request failed with status {status}")),
            }
        }
    }
}
