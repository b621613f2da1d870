use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{get, patch},
};
use uuid::Uuid;

use crate::{
    dto::promotions::{
        CreatePromotionRequest, PromotionList, PromotionStatusRequest, UpdatePromotionRequest,
    },
    error::AppResult,
    middleware::auth::AuthUser,
    models::Promotion,
    response::ApiResponse,
    routes::params::Pagination,
    services::promotion_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_promotions).post(create_promotion))
        .route("/{id}", patch(update_promotion).delete(delete_promotion))
        .route("/status/{id}", patch(set_promotion_status))
}

#[utoipa::path(
    get,
    path = "/api/promotion",
    params(
        ("page" = Option<i64>, Query, description = "Page number, default 1"),
        ("per_page" = Option<i64>, Query, description = "Items per page, default 20"),
    ),
    responses(
        (status = 200, description = "Enabled promotions", body = ApiResponse<PromotionList>),
        (status = 401, description = "Unauthorized"),
    ),
    security(("bearer_auth" = [])),
    tag = "Promotions"
)]
pub async fn list_promotions(
    State(state): State<AppState>,
    user: AuthUser,
    Query(pagination): Query<Pagination>,
) -> AppResult<Json<ApiResponse<PromotionList>>> {
    let resp = promotion_service::list_promotions(&state, &user, pagination).await?;
    Ok(Json(resp))
}

/// Percentage and fixed promotions take `discount`; weighted ones take `slabs`.
#[utoipa::path(
    post,
    path = "/api/promotion",
    request_body = CreatePromotionRequest,
    responses(
        (status = 200, description = "Create promotion", body = ApiResponse<Promotion>),
        (status = 400, description = "Validation failed"),
        (status = 404, description = "Unknown or disabled product"),
        (status = 409, description = "Overlapping promotion with the same title"),
    ),
    security(("bearer_auth" = [])),
    tag = "Promotions"
)]
pub async fn create_promotion(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreatePromotionRequest>,
) -> AppResult<Json<ApiResponse<Promotion>>> {
    let resp = promotion_service::create_promotion(&state, &user, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    patch,
    path = "/api/promotion/{id}",
    params(
        ("id" = Uuid, Path, description = "Promotion ID")
    ),
    request_body = UpdatePromotionRequest,
    responses(
        (status = 200, description = "Updated promotion", body = ApiResponse<Promotion>),
        (status = 404, description = "Promotion not found"),
        (status = 409, description = "Overlapping promotion with the same title"),
    ),
    security(("bearer_auth" = [])),
    tag = "Promotions"
)]
pub async fn update_promotion(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdatePromotionRequest>,
) -> AppResult<Json<ApiResponse<Promotion>>> {
    let resp = promotion_service::update_promotion(&state, &user, id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    patch,
    path = "/api/promotion/status/{id}",
    params(
        ("id" = Uuid, Path, description = "Promotion ID")
    ),
    request_body = PromotionStatusRequest,
    responses(
        (status = 200, description = "Promotion status changed", body = ApiResponse<Promotion>),
        (status = 404, description = "Promotion not found"),
        (status = 409, description = "Overlapping promotion with the same title"),
    ),
    security(("bearer_auth" = [])),
    tag = "Promotions"
)]
pub async fn set_promotion_status(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<PromotionStatusRequest>,
) -> AppResult<Json<ApiResponse<Promotion>>> {
    let resp = promotion_service::set_promotion_status(&state, &user, id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    delete,
    path = "/api/promotion/{id}",
    params(
        ("id" = Uuid, Path, description = "Promotion ID")
    ),
    responses(
        (status = 200, description = "Deleted promotion"),
        (status = 404, description = "Promotion not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Promotions"
)]
pub async fn delete_promotion(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    let resp = promotion_service::delete_promotion(&state, &user, id).await?;
    Ok(Json(resp))
}
