use std::path::PathBuf;

use anyhow::Context;

use crate::models::state::State;

/// Persists [State] to a single JSON file, writing atomically by
/// staging the new contents in a sibling temp file, fsyncing it, and
/// renaming it over the real path, so a crash mid-write never leaves a
/// truncated or partially-written state file behind.
pub struct Store {
    path: PathBuf,
}

impl Store {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Loads the current state, or an empty one if the file does not
    /// exist yet (first run).
    pub async fn load(&self) -> anyhow::Result<State> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => {
                serde_json::from_slice(&bytes).with_context(|| format!("parsing {}", self.path.display()))
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(State::default()),
            Err(err) => Err(err).with_context(|| format!("reading {}", self.path.display())),
        }
    }

    pub async fn save(&self, state: &State) -> anyhow::Result<()> {
        let serialized = serde_json::to_vec_pretty(state)?;
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || -> anyhow::Result<()> {
            use std::io::Write;
            let parent = path.parent().unwrap_or_else(|| std::path::Path::new("."));
            let mut tmp = tempfile::NamedTempFile::new_in(parent)
                .with_context(|| format!("creating temp file next to {}", path.display()))?;
            tmp.write_all(&serialized)?;
            tmp.as_file_mut().sync_all()?;
            tmp.persist(&path).with_context(|| format!("renaming into {}", path.display()))?;
            Ok(())
        })
        .await??;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::task::{PendingTask, Spec, Status, Task};
    use common::time::naive_utc_now;
    use std::collections::HashMap;
    use tokio_test::assert_ok;
    use uuid::Uuid;

    #[tokio::test]
    async fn round_trips_state_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::new(dir.path().join("state.json"));

        let mut state = State::default();
        let id = Uuid::new_v4();
        let task = Task {
            id,
            operation: Spec { kind: "test".to_owned(), parameters: serde_json::json!({}) },
            condition: Spec { kind: "now".to_owned(), parameters: serde_json::json!({}) },
            dependencies: HashMap::new(),
        };
        state.tasks.pending.insert(
            id,
            PendingTask { task, scheduled: naive_utc_now() },
        );
        state.statuses.insert(id, Status::Pending);

        assert_ok!(store.save(&state).await);
        let loaded = assert_ok!(store.load().await);
        assert!(loaded.tasks.pending.contains_key(&id));
        assert_eq!(loaded.statuses[&id], Status::Pending);
    }

    #[tokio::test]
    async fn missing_file_loads_as_empty_state() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::new(dir.path().join("does-not-exist.json"));
        let state = assert_ok!(store.load().await);
        assert!(state.tasks.pending.is_empty());
    }
}
