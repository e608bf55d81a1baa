mod api;
mod error;
mod state;
mod types;

use std::sync::Arc;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::services::ServeDir;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub use self::state::*;

#[derive(OpenApi)]
#[openapi(
    paths(api::generate_handler, api::search_handler, api::build_handler),
    components(schemas(
        types::GenerateForm,
        types::GenerateResponse,
        types::SearchForm,
        types::SearchResponse,
        types::BuildResponse,
    ))
)]
pub struct ApiDoc;

/// 构建API服务器
pub fn create_app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/generate-image", post(api::generate_handler))
        .route("/cbir/search", post(api::search_handler))
        .route("/cbir/build-index", post(api::build_handler))
        .route("/metrics", get(api::metrics_handler))
        // 语料库同时作为静态文件目录暴露，生成的图片也从这里访问
        .nest_service("/cbir/image_db", ServeDir::new(&state.image_db))
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(DefaultBodyLimit::disable())
        // 上传限制：10M
        .layer(RequestBodyLimitLayer::new(1024 * 1024 * 10))
        // 允许前端跨域访问
        .layer(CorsLayer::permissive())
        .with_state(state)
}
