use async_trait::async_trait;
use chrono::NaiveDateTime;
use serde::Deserialize;
use serde_json::Value;

use common::time::{clamped_delta, naive_utc_now};

use std::sync::Arc;

use super::{Condition, ConditionRegistry};

/// Runs immediately.
pub struct NowCondition;

#[async_trait]
impl Condition for NowCondition {
    async fn wait(&self, _parameters: &Value) -> anyhow::Result<()> {
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct AtParameters {
    datetime: NaiveDateTime,
}

/// Runs once a fixed point in time has passed.
pub struct AtCondition;

#[async_trait]
impl Condition for AtCondition {
    async fn wait(&self, parameters: &Value) -> anyhow::Result<()> {
        let params: AtParameters = serde_json::from_value(parameters.clone())?;
        let delay = clamped_delta(params.datetime, naive_utc_now());
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        Ok(())
    }
}

/// Builds the registry of every `Condition` type the scheduler knows
/// how to wait on.
pub fn build() -> ConditionRegistry {
    let mut registry = ConditionRegistry::new();
    registry.register("now", Arc::new(NowCondition));
    registry.register("at", Arc::new(AtCondition));
    registry
}
