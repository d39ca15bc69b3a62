use axum::routing::get;
use axum::Router;

use crate::auth::handlers;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/signUp", get(handlers::sign_up_page).post(handlers::sign_up))
        .route("/logIn", get(handlers::log_in_page).post(handlers::log_in))
        .route("/logOut", get(handlers::log_out))
}
