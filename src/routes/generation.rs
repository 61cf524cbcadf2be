use axum::{Json, Router, extract::State, routing::post};

use crate::{
    dto::generation::{
        GenerateRequest, GenerationResponse, RegionEditRequest, RegionEditResponse,
    },
    error::AppResult,
    middleware::auth::AuthUser,
    response::ApiResponse,
    services::generation_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(generate_pattern))
        .route("/edit-region", post(edit_region))
}

#[utoipa::path(
    post,
    path = "/api/generation",
    request_body = GenerateRequest,
    responses(
        (status = 200, description = "Generated pattern as a data URI", body = ApiResponse<GenerationResponse>),
        (status = 502, description = "Provider failed or returned no image"),
    ),
    security(("bearer_auth" = [])),
    tag = "Generation"
)]
pub async fn generate_pattern(
    State(state): State<AppState>,
    _auth: AuthUser,
    Json(payload): Json<GenerateRequest>,
) -> AppResult<Json<ApiResponse<GenerationResponse>>> {
    let resp = generation_service::generate_pattern(&state, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/generation/edit-region",
    request_body = RegionEditRequest,
    responses(
        (status = 200, description = "Edited image; fallback=true when regenerated instead of edited", body = ApiResponse<RegionEditResponse>),
        (status = 422, description = "Invalid base64 payload"),
        (status = 502, description = "Provider failed"),
    ),
    security(("bearer_auth" = [])),
    tag = "Generation"
)]
pub async fn edit_region(
    State(state): State<AppState>,
    _auth: AuthUser,
    Json(payload): Json<RegionEditRequest>,
) -> AppResult<Json<ApiResponse<RegionEditResponse>>> {
    let resp = generation_service::edit_region(&state, payload).await?;
    Ok(Json(resp))
}
