use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;

/// Retry a fallible request a bounded number of times with a growing
/// delay between attempts, mirroring a `delay=1, max_attempts=3,
/// delay_modifier=2` backoff policy: 1s, then 2s, then give up.
pub async fn with_retry<F, Fut, T>(mut attempt: F) -> anyhow::Result<T>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = anyhow::Result<T>>,
{
    const MAX_ATTEMPTS: u32 = 3;
    let mut delay = Duration::from_secs(1);
    let mut last_error = None;
    for attempt_number in 1..=MAX_ATTEMPTS {
        match attempt().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                tracing::warn!(attempt_number, error = %err, "request attempt failed");
                last_error = Some(err);
                if attempt_number < MAX_ATTEMPTS {
                    tokio::time::sleep(delay).await;
                    delay *= 2;
                }
            }
        }
    }
    Err(last_error.unwrap())
}

pub async fn get_json<T: DeserializeOwned>(client: &reqwest::Client, url: &str) -> anyhow::Result<T> {
    let response = client.get(url).send().await?.error_for_status()?;
    Ok(response.json().await?)
}

pub async fn post_json<B: Serialize + Sync, T: DeserializeOwned>(
    client: &reqwest::Client,
    url: &str,
    body: &B,
) -> anyhow::Result<reqwest::Response> {
    Ok(client.post(url).json(body).send().await?)
}
