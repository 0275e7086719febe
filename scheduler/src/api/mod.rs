pub mod error;
pub mod ping;
pub mod tasks;

use axum::Router;

use crate::server::state::ServerState;

pub fn router(state: ServerState) -> Router {
    Router::new().merge(ping::routes(state.clone())).merge(tasks::routes(state))
}
