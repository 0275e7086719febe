use eventsource_stream::Eventsource;
use futures::{Stream, StreamExt};

use crate::config::HttpConfig;
use crate::models::reserve::{ReserveEvent, ReserveRequest, ReserveResponse};

use super::http::post_json;

/// Client for the streaming-slot reservation ("emistream") service.
pub struct ReserveClient {
    http: reqwest::Client,
    config: HttpConfig,
}

impl ReserveClient {
    pub fn new(http: reqwest::Client, config: HttpConfig) -> Self {
        Self { http, config }
    }

    /// Issues a reservation request. The caller is expected to have
    /// already subscribed to [subscribe_events] so a `409 Conflict`
    /// here can be paired with the availability event that will
    /// eventually unblock the slot.
    pub async fn reserve(&self, request: &ReserveRequest) -> anyhow::Result<reqwest::Response> {
        let url = format!("{}/reserve", self.config.url());
        post_json(&self.http, &url, request).await
    }

    pub async fn parse_reserved(response: reqwest::Response) -> anyhow::Result<ReserveResponse> {
        Ok(response.json().await?)
    }

    /// Subscribes to the availability event stream, ahead of calling
    /// [reserve], so no `AvailabilityChanged` event is missed between
    /// a `409` and the retry.
    pub fn subscribe_events(&self) -> impl Stream<Item = anyhow::Result<ReserveEvent>> {
        let url = format!("{}/sse", self.config.url());
        let http = self.http.clone();
        async_stream::stream! {
            let response = match http.get(&url).send().await {
                Ok(response) => response,
                Err(err) => {
                    yield Err(err.into());
                    return;
                }
            };
            let mut events = response.bytes_stream().eventsource();
            while let Some(event) = events.next().await {
                match event {
                    Ok(event) => match serde_json::from_str::<ReserveEvent>(&event.data) {
                        Ok(parsed) => yield Ok(parsed),
                        Err(_) => continue,
                    },
                    Err(err) => {
                        yield Err(anyhow::anyhow!(err));
                        return;
                    }
                }
            }
        }
    }
}
