use crate::api::error::AppError;
use crate::api::handlers::responses::ResponseDto;
use crate::entities::{post_media, posts};
use crate::services::post_service::{NewPost, PostFilters, PostPage, PostUpdate, UploadedFile};
use crate::utils::auth::Claims;
use axum::{
    Extension, Json,
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Serialize, ToSchema)]
pub struct PostResponse {
    pub id: String,
    pub author_id: String,
    pub category_id: String,
    pub title: String,
    pub content: String,
    pub price: i64,
    pub post_type: posts::PostType,
    pub is_active: bool,
    pub slug: String,
    pub created_at: chrono::DateTime<Utc>,
    pub updated_at: chrono::DateTime<Utc>,
}

impl From<posts::Model> for PostResponse {
    fn from(m: posts::Model) -> Self {
        Self {
            id: m.id,
            author_id: m.author_id,
            category_id: m.category_id,
            title: m.title,
            content: m.content,
            price: m.price,
            post_type: m.post_type,
            is_active: m.is_active,
            slug: m.slug,
            created_at: m.created_at,
            updated_at: m.updated_at,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct MediaResponse {
    pub id: String,
    pub storage_key: String,
    pub sequence: i32,
    pub content_type: Option<String>,
    pub size: i64,
    pub uploaded_at: chrono::DateTime<Utc>,
}

impl From<post_media::Model> for MediaResponse {
    fn from(m: post_media::Model) -> Self {
        Self {
            id: m.id,
            storage_key: m.storage_key,
            sequence: m.sequence,
            content_type: m.content_type,
            size: m.size,
            uploaded_at: m.uploaded_at,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct PostListResponse {
    pub posts: Vec<PostResponse>,
    pub total: u64,
    pub page: u64,
    pub per_page: u64,
}

impl From<PostPage> for PostListResponse {
    fn from(p: PostPage) -> Self {
        Self {
            posts: p.posts.into_iter().map(Into::into).collect(),
            total: p.total,
            page: p.page,
            per_page: p.per_page,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct PostDetailResponse {
    pub post: PostResponse,
    pub media: Vec<MediaResponse>,
    pub accepted_responses: Vec<ResponseDto>,
}

/// Result of a create/edit, including how many submitted files were
/// skipped by the best-effort upload policy.
#[derive(Serialize, ToSchema)]
pub struct PostMutationResponse {
    pub post: PostResponse,
    pub media: Vec<MediaResponse>,
    pub rejected_files: usize,
}

#[derive(Deserialize)]
pub struct ListPostsQuery {
    pub category: Option<String>,
    pub post_type: Option<String>,
    pub price_min: Option<i64>,
    pub price_max: Option<i64>,
    pub page: Option<u64>,
    pub per_page: Option<u64>,
}

#[derive(Deserialize)]
pub struct MyPostsQuery {
    pub page: Option<u64>,
}

fn parse_post_type(value: &str) -> Result<posts::PostType, AppError> {
    match value {
        "wts" => Ok(posts::PostType::Sell),
        "wtb" => Ok(posts::PostType::Buy),
        other => Err(AppError::BadRequest(format!(
            "unknown post type '{other}', expected 'wts' or 'wtb'"
        ))),
    }
}

/// Text fields and files pulled out of a multipart post form. Files keep
/// their submission order.
#[derive(Default)]
struct PostForm {
    title: Option<String>,
    content: Option<String>,
    price: Option<i64>,
    post_type: Option<String>,
    category_id: Option<String>,
    is_active: Option<bool>,
    files: Vec<UploadedFile>,
}

async fn read_post_form(mut multipart: Multipart) -> Result<PostForm, AppError> {
    let mut form = PostForm::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("malformed multipart body: {e}")))?
    {
        let name = field.name().unwrap_or("").to_string();

        if name == "media" {
            let file_name = field.file_name().unwrap_or("").to_string();
            let content_type = field.content_type().map(|s| s.to_string());
            let data = field
                .bytes()
                .await
                .map_err(|e| AppError::BadRequest(format!("failed to read file: {e}")))?
                .to_vec();
            form.files.push(UploadedFile {
                name: file_name,
                content_type,
                data,
            });
            continue;
        }

        let value = field
            .text()
            .await
            .map_err(|e| AppError::BadRequest(format!("failed to read field '{name}': {e}")))?;

        match name.as_str() {
            "title" => form.title = Some(value),
            "content" => form.content = Some(value),
            "price" => {
                let price = value
                    .parse::<i64>()
                    .map_err(|_| AppError::BadRequest("price must be an integer".into()))?;
                form.price = Some(price);
            }
            "post_type" => form.post_type = Some(value),
            "category_id" => form.category_id = Some(value),
            "is_active" => {
                let flag = matches!(value.as_str(), "true" | "1" | "on");
                form.is_active = Some(flag);
            }
            _ => {}
        }
    }

    Ok(form)
}

#[utoipa::path(
    get,
    path = "/posts",
    params(
        ("category" = Option<String>, Query, description = "Category ID"),
        ("post_type" = Option<String>, Query, description = "'wts' or 'wtb'"),
        ("price_min" = Option<i64>, Query, description = "Inclusive lower price bound"),
        ("price_max" = Option<i64>, Query, description = "Inclusive upper price bound"),
        ("page" = Option<u64>, Query, description = "Page number (1-based)")
    ),
    responses(
        (status = 200, description = "Active posts, most recently updated first", body = PostListResponse)
    )
)]
pub async fn list_posts(
    State(state): State<crate::AppState>,
    Query(query): Query<ListPostsQuery>,
) -> Result<Json<PostListResponse>, AppError> {
    let post_type = query
        .post_type
        .as_deref()
        .map(parse_post_type)
        .transpose()?;

    let page = state
        .post_service
        .list_active(PostFilters {
            category_id: query.category,
            post_type,
            price_min: query.price_min,
            price_max: query.price_max,
            page: query.page,
            per_page: query.per_page,
        })
        .await?;

    Ok(Json(page.into()))
}

#[utoipa::path(
    get,
    path = "/posts/{slug}",
    params(
        ("slug" = String, Path, description = "Post slug")
    ),
    responses(
        (status = 200, description = "Post detail with media and accepted responses", body = PostDetailResponse),
        (status = 404, description = "Post not found")
    )
)]
pub async fn get_post(
    State(state): State<crate::AppState>,
    Path(slug): Path<String>,
) -> Result<Json<PostDetailResponse>, AppError> {
    let post = state.post_service.find_by_slug(&slug).await?;
    let media = state.post_service.media_for_post(&post.id).await?;
    let accepted = state.response_service.list_accepted(&post.id).await?;

    Ok(Json(PostDetailResponse {
        post: post.into(),
        media: media.into_iter().map(Into::into).collect(),
        accepted_responses: accepted.into_iter().map(Into::into).collect(),
    }))
}

#[utoipa::path(
    post,
    path = "/posts",
    request_body(content = Vec<u8>, description = "Post fields plus repeated 'media' file parts", content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Post created; rejected files are counted, not fatal", body = PostMutationResponse),
        (status = 422, description = "Validation failure")
    ),
    security(
        ("jwt" = [])
    )
)]
pub async fn create_post(
    State(state): State<crate::AppState>,
    Extension(claims): Extension<Claims>,
    multipart: Multipart,
) -> Result<Json<PostMutationResponse>, AppError> {
    let form = read_post_form(multipart).await?;

    let new = NewPost {
        title: form
            .title
            .ok_or_else(|| AppError::BadRequest("title is required".into()))?,
        content: form
            .content
            .ok_or_else(|| AppError::BadRequest("content is required".into()))?,
        price: form
            .price
            .ok_or_else(|| AppError::BadRequest("price is required".into()))?,
        post_type: parse_post_type(
            &form
                .post_type
                .ok_or_else(|| AppError::BadRequest("post_type is required".into()))?,
        )?,
        category_id: form
            .category_id
            .ok_or_else(|| AppError::BadRequest("category_id is required".into()))?,
    };

    let (post, media, rejected) = state
        .post_service
        .create_post(&claims.sub, new, form.files)
        .await?;

    Ok(Json(PostMutationResponse {
        post: post.into(),
        media: media.into_iter().map(Into::into).collect(),
        rejected_files: rejected,
    }))
}

#[utoipa::path(
    put,
    path = "/posts/{slug}",
    params(
        ("slug" = String, Path, description = "Post slug")
    ),
    request_body(content = Vec<u8>, description = "Changed fields plus repeated 'media' file parts", content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Post updated", body = PostMutationResponse),
        (status = 403, description = "Not the post's author"),
        (status = 404, description = "Post not found")
    ),
    security(
        ("jwt" = [])
    )
)]
pub async fn update_post(
    State(state): State<crate::AppState>,
    Extension(claims): Extension<Claims>,
    Path(slug): Path<String>,
    multipart: Multipart,
) -> Result<Json<PostMutationResponse>, AppError> {
    let form = read_post_form(multipart).await?;

    let update = PostUpdate {
        title: form.title,
        content: form.content,
        price: form.price,
        category_id: form.category_id,
        is_active: form.is_active,
    };

    let (post, media, rejected) = state
        .post_service
        .edit_post(&slug, &claims.sub, update, form.files)
        .await?;

    Ok(Json(PostMutationResponse {
        post: post.into(),
        media: media.into_iter().map(Into::into).collect(),
        rejected_files: rejected,
    }))
}

#[utoipa::path(
    delete,
    path = "/posts/{slug}",
    params(
        ("slug" = String, Path, description = "Post slug")
    ),
    responses(
        (status = 204, description = "Post, media, and responses deleted"),
        (status = 403, description = "Not the post's author"),
        (status = 404, description = "Post not found")
    ),
    security(
        ("jwt" = [])
    )
)]
pub async fn delete_post(
    State(state): State<crate::AppState>,
    Extension(claims): Extension<Claims>,
    Path(slug): Path<String>,
) -> Result<StatusCode, AppError> {
    state.post_service.delete_post(&slug, &claims.sub).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/my/posts",
    params(
        ("page" = Option<u64>, Query, description = "Page number (1-based)")
    ),
    responses(
        (status = 200, description = "The caller's posts, active or not", body = PostListResponse)
    ),
    security(
        ("jwt" = [])
    )
)]
pub async fn my_posts(
    State(state): State<crate::AppState>,
    Extension(claims): Extension<Claims>,
    Query(query): Query<MyPostsQuery>,
) -> Result<Json<PostListResponse>, AppError> {
    let page = state
        .post_service
        .list_by_author(&claims.sub, query.page)
        .await?;

    Ok(Json(page.into()))
}
