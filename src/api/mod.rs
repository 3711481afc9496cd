/// API routes and handlers
pub mod accounts;
pub mod login;
pub mod menu;
pub mod views;

use crate::context::AppContext;
use axum::Router;

/// Build API routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .merge(login::routes())
        .merge(menu::routes())
        .merge(accounts::routes())
}
