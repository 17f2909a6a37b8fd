use crate::state::AppState;
use axum::Router;

mod claims;
pub mod cookies;
mod dto;
pub mod extractors;
pub mod handlers;
pub mod jwt;
pub mod services;

pub fn router() -> Router<AppState> {
    Router::new()
        .merge(handlers::magic_link_routes())
        .merge(handlers::session_routes())
}
