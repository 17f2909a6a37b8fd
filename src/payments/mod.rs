pub mod dto;
pub mod gateway;
pub mod handlers;
pub mod services;
pub mod signature;
pub mod split;

use crate::state::AppState;
use axum::Router;

pub fn router() -> Router<AppState> {
    Router::new()
        .merge(handlers::payer_routes())
        .merge(handlers::webhook_routes())
}
