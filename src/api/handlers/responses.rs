use crate::api::error::AppError;
use crate::entities::{responses, users};
use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

#[derive(Deserialize, ToSchema, Validate)]
pub struct CreateResponseRequest {
    #[validate(length(min = 1, max = 255, message = "Response must be 1-255 characters"))]
    pub content: String,
}

#[derive(Serialize, ToSchema)]
pub struct ResponseDto {
    pub id: String,
    pub post_id: String,
    pub author_id: String,
    pub content: String,
    pub is_accepted: bool,
    pub created_at: chrono::DateTime<Utc>,
}

impl From<responses::Model> for ResponseDto {
    fn from(m: responses::Model) -> Self {
        Self {
            id: m.id,
            post_id: m.post_id,
            author_id: m.author_id,
            content: m.content,
            is_accepted: m.is_accepted,
            created_at: m.created_at,
        }
    }
}

#[derive(Deserialize)]
pub struct MyResponsesQuery {
    /// Narrow to responses on one of the caller's posts, by slug
    pub post: Option<String>,
}

#[utoipa::path(
    post,
    path = "/posts/{slug}/responses",
    params(
        ("slug" = String, Path, description = "Post slug")
    ),
    request_body = CreateResponseRequest,
    responses(
        (status = 200, description = "Response created", body = ResponseDto),
        (status = 404, description = "Post not found"),
        (status = 409, description = "Already responded to this post")
    ),
    security(
        ("jwt" = [])
    )
)]
pub async fn create_response(
    State(state): State<crate::AppState>,
    Extension(user): Extension<users::Model>,
    Path(slug): Path<String>,
    Json(req): Json<CreateResponseRequest>,
) -> Result<Json<ResponseDto>, AppError> {
    req.validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let response = state
        .response_service
        .create_response(&user, &slug, &req.content)
        .await?;

    Ok(Json(response.into()))
}

#[utoipa::path(
    post,
    path = "/responses/{id}/accept",
    params(
        ("id" = String, Path, description = "Response ID")
    ),
    responses(
        (status = 200, description = "Response accepted", body = ResponseDto),
        (status = 403, description = "Not the post's author"),
        (status = 404, description = "Response not found")
    ),
    security(
        ("jwt" = [])
    )
)]
pub async fn accept_response(
    State(state): State<crate::AppState>,
    Extension(user): Extension<users::Model>,
    Path(id): Path<String>,
) -> Result<Json<ResponseDto>, AppError> {
    let response = state.response_service.accept(&id, &user.id).await?;
    Ok(Json(response.into()))
}

#[utoipa::path(
    post,
    path = "/responses/{id}/reject",
    params(
        ("id" = String, Path, description = "Response ID")
    ),
    responses(
        (status = 200, description = "Response rejected", body = ResponseDto),
        (status = 403, description = "Not the post's author"),
        (status = 404, description = "Response not found")
    ),
    security(
        ("jwt" = [])
    )
)]
pub async fn reject_response(
    State(state): State<crate::AppState>,
    Extension(user): Extension<users::Model>,
    Path(id): Path<String>,
) -> Result<Json<ResponseDto>, AppError> {
    let response = state.response_service.reject(&id, &user.id).await?;
    Ok(Json(response.into()))
}

#[utoipa::path(
    delete,
    path = "/responses/{id}",
    params(
        ("id" = String, Path, description = "Response ID")
    ),
    responses(
        (status = 204, description = "Response deleted"),
        (status = 403, description = "Not the post's author"),
        (status = 404, description = "Response not found")
    ),
    security(
        ("jwt" = [])
    )
)]
pub async fn delete_response(
    State(state): State<crate::AppState>,
    Extension(user): Extension<users::Model>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    state.response_service.delete(&id, &user.id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/my/responses",
    params(
        ("post" = Option<String>, Query, description = "Filter by post slug")
    ),
    responses(
        (status = 200, description = "Responses across the caller's posts", body = Vec<ResponseDto>)
    ),
    security(
        ("jwt" = [])
    )
)]
pub async fn my_responses(
    State(state): State<crate::AppState>,
    Extension(user): Extension<users::Model>,
    Query(query): Query<MyResponsesQuery>,
) -> Result<Json<Vec<ResponseDto>>, AppError> {
    let responses = state
        .response_service
        .list_for_owner(&user.id, query.post.as_deref())
        .await?;

    Ok(Json(responses.into_iter().map(Into::into).collect()))
}
