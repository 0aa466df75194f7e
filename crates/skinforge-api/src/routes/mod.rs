pub mod generate;
pub mod health;

use axum::routing::post;
use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /generate/url            POST   generate from a remote image URL
/// /generate/upload         POST   generate from an uploaded PNG (multipart)
/// /generate/user/{uuid}    GET|POST  generate from an existing user
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/generate/url", post(generate::from_url))
        .route("/generate/upload", post(generate::from_upload))
        .route(
            "/generate/user/{uuid}",
            axum::routing::get(generate::from_user).post(generate::from_user),
        )
}
