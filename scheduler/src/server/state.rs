use crate::scheduler::Scheduler;

/// Shared state handed to every request handler via axum's `State`
/// extractor.
#[derive(Clone)]
pub struct ServerState {
    pub scheduler: Scheduler,
}
