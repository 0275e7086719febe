use axum::http::StatusCode;
use axum::routing::get;
use axum::Router;

use crate::server::state::ServerState;

pub fn routes(state: ServerState) -> Router {
    Router::new().route("/ping", get(ping)).with_state(state)
}

async fn ping() -> StatusCode {
    StatusCode::OK
}
