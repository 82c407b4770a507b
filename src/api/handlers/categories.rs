use crate::api::error::AppError;
use crate::entities::{categories, posts, prelude::*};
use crate::utils::auth::Claims;
use crate::utils::slug::slugify;
use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, Set};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

#[derive(Serialize, ToSchema)]
pub struct CategoryDto {
    pub id: String,
    pub name: String,
    pub slug: String,
}

impl From<categories::Model> for CategoryDto {
    fn from(model: categories::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            slug: model.slug,
        }
    }
}

#[derive(Deserialize, ToSchema, Validate)]
pub struct CreateCategoryRequest {
    #[validate(length(min = 1, max = 50, message = "Name must be 1-50 characters"))]
    pub name: String,
    /// URL slug; derived from the name when omitted
    pub slug: Option<String>,
}

#[utoipa::path(
    get,
    path = "/categories",
    responses(
        (status = 200, description = "All categories", body = Vec<CategoryDto>)
    )
)]
pub async fn list_categories(
    State(state): State<crate::AppState>,
) -> Result<Json<Vec<CategoryDto>>, AppError> {
    let categories = Categories::find().all(&state.db).await?;
    Ok(Json(categories.into_iter().map(CategoryDto::from).collect()))
}

#[utoipa::path(
    post,
    path = "/categories",
    request_body = CreateCategoryRequest,
    responses(
        (status = 200, description = "Category created", body = CategoryDto),
        (status = 409, description = "Slug already in use")
    ),
    security(
        ("jwt" = [])
    )
)]
pub async fn create_category(
    State(state): State<crate::AppState>,
    Extension(_claims): Extension<Claims>,
    Json(req): Json<CreateCategoryRequest>,
) -> Result<Json<CategoryDto>, AppError> {
    req.validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let slug = match req.slug {
        Some(s) if !s.trim().is_empty() => s,
        _ => slugify(&req.name),
    };
    if slug.is_empty() {
        return Err(AppError::Validation("slug must not be empty".into()));
    }

    let taken = Categories::find()
        .filter(categories::Column::Slug.eq(&slug))
        .one(&state.db)
        .await?
        .is_some();
    if taken {
        return Err(AppError::Conflict("category slug already in use".into()));
    }

    let category = categories::ActiveModel {
        id: Set(Uuid::new_v4().to_string()),
        name: Set(req.name),
        slug: Set(slug),
    }
    .insert(&state.db)
    .await?;

    Ok(Json(category.into()))
}

#[utoipa::path(
    delete,
    path = "/categories/{id}",
    params(
        ("id" = String, Path, description = "Category ID")
    ),
    responses(
        (status = 204, description = "Category deleted"),
        (status = 404, description = "Category not found"),
        (status = 409, description = "Category still referenced by posts")
    ),
    security(
        ("jwt" = [])
    )
)]
pub async fn delete_category(
    State(state): State<crate::AppState>,
    Extension(_claims): Extension<Claims>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    let category = Categories::find_by_id(id.as_str())
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("category not found".into()))?;

    // Protect-on-delete: reference data cannot vanish under live posts.
    let in_use = Posts::find()
        .filter(posts::Column::CategoryId.eq(&category.id))
        .count(&state.db)
        .await?;
    if in_use > 0 {
        return Err(AppError::Conflict(format!(
            "category is referenced by {in_use} post(s)"
        )));
    }

    Categories::delete_by_id(category.id.as_str()).exec(&state.db).await?;

    Ok(StatusCode::NO_CONTENT)
}
