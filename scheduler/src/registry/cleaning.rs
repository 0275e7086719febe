use chrono::{NaiveDateTime, TimeDelta};
use serde::Deserialize;
use serde_json::Value;

use std::sync::Arc;

use crate::models::task::FinishedTask;

use super::{CleaningStrategy, CleaningStrategyRegistry};

/// Removes every finished task unconditionally.
pub struct AllStrategy;

impl CleaningStrategy for AllStrategy {
    fn should_remove(&self, _task: &FinishedTask, _parameters: &Value, _now: NaiveDateTime) -> bool {
        true
    }
}

#[derive(Debug, Deserialize)]
struct TimedeltaParameters {
    #[serde(with = "humantime_serde")]
    delta: std::time::Duration,
}

/// Removes finished tasks older than a configured age.
pub struct TimedeltaStrategy;

impl CleaningStrategy for TimedeltaStrategy {
    fn should_remove(&self, task: &FinishedTask, parameters: &Value, now: NaiveDateTime) -> bool {
        let params: TimedeltaParameters = match serde_json::from_value(parameters.clone()) {
            Ok(params) => params,
            Err(_) => return false,
        };
        let delta = match TimeDelta::from_std(params.delta) {
            Ok(delta) => delta,
            Err(_) => return false,
        };
        now - task.finished_at() > delta
    }
}

/// Builds the registry of every `CleaningStrategy` type the cleaner
/// knows how to evaluate.
pub fn build() -> CleaningStrategyRegistry {
    let mut registry = CleaningStrategyRegistry::new();
    registry.register("all", Arc::new(AllStrategy));
    registry.register("timedelta", Arc::new(TimedeltaStrategy));
    registry
}
