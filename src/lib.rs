pub mod api;
pub mod config;
pub mod entities;
pub mod infrastructure;
pub mod services;
pub mod utils;

use crate::config::AppConfig;
use crate::services::notify::Notifier;
use crate::services::post_service::PostService;
use crate::services::response_service::ResponseService;
use crate::services::storage::StorageService;
use axum::{
    Router,
    http::HeaderValue,
    middleware::from_fn_with_state,
    routing::{delete, get, post, put},
};
use sea_orm::DatabaseConnection;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    paths(
        api::handlers::auth::register,
        api::handlers::auth::login,
        api::handlers::health::health_check,
        api::handlers::categories::list_categories,
        api::handlers::categories::create_category,
        api::handlers::categories::delete_category,
        api::handlers::posts::list_posts,
        api::handlers::posts::get_post,
        api::handlers::posts::create_post,
        api::handlers::posts::update_post,
        api::handlers::posts::delete_post,
        api::handlers::posts::my_posts,
        api::handlers::media::delete_media,
        api::handlers::responses::create_response,
        api::handlers::responses::accept_response,
        api::handlers::responses::reject_response,
        api::handlers::responses::delete_response,
        api::handlers::responses::my_responses,
    ),
    components(
        schemas(
            api::handlers::auth::RegisterRequest,
            api::handlers::auth::LoginRequest,
            api::handlers::auth::AuthResponse,
            api::handlers::health::HealthResponse,
            api::handlers::categories::CategoryDto,
            api::handlers::categories::CreateCategoryRequest,
            api::handlers::posts::PostResponse,
            api::handlers::posts::MediaResponse,
            api::handlers::posts::PostListResponse,
            api::handlers::posts::PostDetailResponse,
            api::handlers::posts::PostMutationResponse,
            api::handlers::responses::CreateResponseRequest,
            api::handlers::responses::ResponseDto,
            entities::posts::PostType,
        )
    ),
    tags(
        (name = "auth", description = "Authentication endpoints"),
        (name = "posts", description = "Marketplace listings"),
        (name = "responses", description = "Buyer responses and moderation")
    )
)]
pub struct ApiDoc;

#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub storage: Arc<dyn StorageService>,
    pub notifier: Arc<dyn Notifier>,
    pub post_service: Arc<PostService>,
    pub response_service: Arc<ResponseService>,
    pub config: AppConfig,
}

pub fn create_app(state: AppState) -> Router {
    let origins: Vec<HeaderValue> = state
        .config
        .allowed_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    let public = Router::new()
        .route("/health", get(api::handlers::health::health_check))
        .route("/register", post(api::handlers::auth::register))
        .route("/login", post(api::handlers::auth::login))
        .route("/categories", get(api::handlers::categories::list_categories))
        .route("/posts", get(api::handlers::posts::list_posts))
        .route("/posts/:slug", get(api::handlers::posts::get_post));

    let protected = Router::new()
        .route("/categories", post(api::handlers::categories::create_category))
        .route(
            "/categories/:id",
            delete(api::handlers::categories::delete_category),
        )
        .route("/posts", post(api::handlers::posts::create_post))
        .route("/posts/:slug", put(api::handlers::posts::update_post))
        .route("/posts/:slug", delete(api::handlers::posts::delete_post))
        .route("/my/posts", get(api::handlers::posts::my_posts))
        .route("/media/:id", delete(api::handlers::media::delete_media))
        .route(
            "/posts/:slug/responses",
            post(api::handlers::responses::create_response),
        )
        .route(
            "/responses/:id/accept",
            post(api::handlers::responses::accept_response),
        )
        .route(
            "/responses/:id/reject",
            post(api::handlers::responses::reject_response),
        )
        .route(
            "/responses/:id",
            delete(api::handlers::responses::delete_response),
        )
        .route("/my/responses", get(api::handlers::responses::my_responses))
        .route_layer(from_fn_with_state(
            state.clone(),
            api::middleware::auth::auth_middleware,
        ));

    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(public)
        .merge(protected)
        .layer(
            CorsLayer::new()
                .allow_origin(AllowOrigin::list(origins))
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
