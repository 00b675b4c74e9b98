mod admin;
mod auth;
mod content;
mod meta;

use axum::{middleware, Router};

use crate::middleware::require_auth;
use crate::AppState;

pub fn routes(state: AppState) -> Router<AppState> {
    let protected = Router::new()
        .merge(auth::protected_routes())
        .merge(content::routes())
        .merge(admin::routes())
        .route_layer(middleware::from_fn_with_state(state, require_auth));

    Router::new()
        .merge(meta::routes())
        .merge(auth::public_routes())
        .merge(protected)
}
