use crate::api::error::AppError;
use crate::utils::auth::Claims;
use axum::{
    Extension,
    extract::{Path, State},
    http::StatusCode,
};

#[utoipa::path(
    delete,
    path = "/media/{id}",
    params(
        ("id" = String, Path, description = "Media ID")
    ),
    responses(
        (status = 204, description = "Media deleted; blob cleanup is best-effort"),
        (status = 403, description = "Not the post's author"),
        (status = 404, description = "Media not found")
    ),
    security(
        ("jwt" = [])
    )
)]
pub async fn delete_media(
    State(state): State<crate::AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    state.post_service.delete_media(&id, &claims.sub).await?;
    Ok(StatusCode::NO_CONTENT)
}
