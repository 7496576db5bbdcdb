mod dto;
pub mod handlers;
mod repo;
pub mod repo_types;
mod services;
mod validate;

use crate::state::AppState;
use axum::Router;

pub fn router() -> Router<AppState> {
    handlers::router()
}
