pub mod assets;
pub mod auth;
pub mod home;
pub mod posts;

use axum::extract::DefaultBodyLimit;
use axum::routing::get;
use axum::Router;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// The whole HTTP surface, ready to serve.
pub fn app(state: AppState) -> Router {
    let uploads = ServeDir::new(state.config.uploads_path());
    let body_limit = state.config.storage.max_upload_bytes;

    Router::new()
        .route("/", get(home::index))
        .route("/about", get(home::about))
        .route("/assets/{*path}", get(assets::serve))
        .nest_service("/static", uploads)
        .merge(auth::router())
        .merge(posts::router())
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
