//! Handlers for the three generation entry points.
//!
//! Routes:
//! - `POST /generate/url`          — JSON `{url, name?, variant?, visibility?}`
//! - `POST /generate/upload`       — multipart `{file, name?, variant?, visibility?}`
//! - `GET|POST /generate/user/{uuid}` — options via query string
//!
//! The handlers only parse; every semantic lives in the engine.

use axum::extract::{Multipart, Path, Query, State};
use axum::http::HeaderMap;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use skinforge_core::types::{SkinVariant, SkinVisibility};
use uuid::Uuid;

use crate::engine::{ClientInfo, GenerateOptions};
use crate::error::{ApiFailure, AppError, AppResult};
use crate::response::GenerateResponse;
use crate::state::AppState;

/// Shared option fields accepted by every entry point.
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct OptionsQuery {
    pub name: String,
    pub variant: SkinVariant,
    pub visibility: SkinVisibility,
}

impl OptionsQuery {
    fn into_options(self) -> GenerateOptions {
        GenerateOptions {
            name: self.name,
            variant: self.variant,
            visibility: self.visibility,
        }
    }
}

/// Body of `POST /generate/url`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateUrlRequest {
    pub url: String,
    #[serde(flatten)]
    pub options: OptionsQuery,
}

/// POST /api/v1/generate/url
pub async fn from_url(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(input): Json<GenerateUrlRequest>,
) -> AppResult<impl IntoResponse> {
    let options = input.options.into_options();
    let client = client_info(&headers);
    let next_request = state.scheduler.next_request_epoch().await;

    match state.generator.from_url(&input.url, &options, &client).await {
        Ok(outcome) => Ok(Json(GenerateResponse::new(outcome, next_request))),
        Err(e) => Err(ApiFailure::from(e).with_next_request(next_request)),
    }
}

/// POST /api/v1/generate/upload
pub async fn from_upload(
    State(state): State<AppState>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> AppResult<impl IntoResponse> {
    let mut file: Option<Vec<u8>> = None;
    let mut options = GenerateOptions::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.to_string()))?
    {
        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "file" => {
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::BadRequest(e.to_string()))?;
                file = Some(data.to_vec());
            }
            "name" => {
                options.name = field
                    .text()
                    .await
                    .map_err(|e| AppError::BadRequest(e.to_string()))?;
            }
            "variant" => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| AppError::BadRequest(e.to_string()))?;
                options.variant = text.parse::<SkinVariant>().map_err(AppError::BadRequest)?;
            }
            "visibility" => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| AppError::BadRequest(e.to_string()))?;
                options.visibility = text
                    .parse::<SkinVisibility>()
                    .map_err(AppError::BadRequest)?;
            }
            _ => {}
        }
    }

    let Some(bytes) = file else {
        return Err(AppError::BadRequest("missing 'file' field".to_string()).into());
    };

    let client = client_info(&headers);
    let next_request = state.scheduler.next_request_epoch().await;

    match state.generator.from_upload(&bytes, &options, &client).await {
        Ok(outcome) => Ok(Json(GenerateResponse::new(outcome, next_request))),
        Err(e) => Err(ApiFailure::from(e).with_next_request(next_request)),
    }
}

/// GET|POST /api/v1/generate/user/{uuid}
pub async fn from_user(
    State(state): State<AppState>,
    Path(uuid): Path<String>,
    Query(options): Query<OptionsQuery>,
    headers: HeaderMap,
) -> AppResult<impl IntoResponse> {
    let user = Uuid::parse_str(&uuid)
        .map_err(|_| AppError::BadRequest(format!("'{uuid}' is not a valid UUID")))?;

    let options = options.into_options();
    let client = client_info(&headers);
    let next_request = state.scheduler.next_request_epoch().await;

    match state.generator.from_user(user, &options, &client).await {
        Ok(outcome) => Ok(Json(GenerateResponse::new(outcome, next_request))),
        Err(e) => Err(ApiFailure::from(e).with_next_request(next_request)),
    }
}

/// Request provenance from the incoming headers.
fn client_info(headers: &HeaderMap) -> ClientInfo {
    let user_agent = headers
        .get(axum::http::header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();

    // First hop of X-Forwarded-For, else the realip header.
    let ip = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .or_else(|| {
            headers
                .get("x-real-ip")
                .and_then(|v| v.to_str().ok())
                .map(|v| v.to_string())
        });

    ClientInfo {
        user_agent,
        via: "api".to_string(),
        ip,
    }
}
