use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use axum::Json;
use axum::extract::State;
use axum_typed_multipart::TypedMultipart;
use log::info;
use prometheus::TextEncoder;
use serde_json::{Value, json};
use tokio::task::block_in_place;

use super::error::Result;
use super::state::AppState;
use super::types::*;
use crate::{metrics, utils};

/// 根据提示词生成一张图片并写入语料库目录
#[utoipa::path(
    post,
    path = "/generate-image",
    request_body(content = GenerateForm, content_type = "multipart/form-data"),
    responses(
        (status = 200, body = GenerateResponse),
    )
)]
pub async fn generate_handler(
    State(state): State<Arc<AppState>>,
    data: TypedMultipart<GenerateRequest>,
) -> Result<Json<Value>> {
    info!("正在生成图片: {}", data.prompt);

    let name = utils::random_filename("png");
    let output = state.image_db.join(&name);

    let start = Instant::now();
    block_in_place(|| -> crate::error::Result<()> {
        let image = state.generator.generate(&data.prompt)?;
        std::fs::create_dir_all(&state.image_db)?;
        std::fs::write(&output, image)?;
        Ok(())
    })?;
    let elapsed = start.elapsed().as_secs_f64();
    metrics::observe_generate_duration(elapsed);

    Ok(Json(json!({
        "image_url": format!("/cbir/image_db/{name}"),
        "time_taken": utils::round2(elapsed),
    })))
}

/// 以图搜图
#[utoipa::path(
    post,
    path = "/cbir/search",
    request_body(content = SearchForm, content_type = "multipart/form-data"),
    responses(
        (status = 200, body = SearchResponse),
    )
)]
pub async fn search_handler(
    State(state): State<Arc<AppState>>,
    data: TypedMultipart<SearchRequest>,
) -> Result<Json<Value>> {
    info!("正在搜索上传图片");
    let count = data.count.unwrap_or(state.search.count);

    let start = Instant::now();
    let results = block_in_place(|| -> crate::error::Result<Vec<String>> {
        // 上传内容先落盘成临时文件再走提取流程
        let mut tmp = tempfile::Builder::new().suffix(".jpg").tempfile()?;
        tmp.write_all(&data.file)?;
        tmp.flush()?;
        state.cbir.search_similar(tmp.path(), count)
    })?;
    let elapsed = start.elapsed().as_secs_f64();
    metrics::observe_search_duration(elapsed);

    // 语料库内的绝对路径映射成静态文件地址
    let results = results
        .iter()
        .filter_map(|p| Path::new(p).file_name())
        .map(|name| format!("/cbir/image_db/{}", name.to_string_lossy()))
        .collect::<Vec<_>>();

    Ok(Json(json!({
        "results": results,
        "time_taken": utils::round2(elapsed),
    })))
}

/// 全量重建 CBIR 索引
#[utoipa::path(
    post,
    path = "/cbir/build-index",
    responses(
        (status = 200, body = BuildResponse),
    )
)]
pub async fn build_handler(State(state): State<Arc<AppState>>) -> Result<Json<Value>> {
    info!("正在重建索引");
    let count = block_in_place(|| state.cbir.build_index(&state.image_db))?;
    metrics::set_index_size(count);

    Ok(Json(json!({
        "message": format!("CBIR index built successfully, {count} images indexed"),
    })))
}

/// Prometheus 指标
pub async fn metrics_handler() -> Result<String> {
    let encoder = TextEncoder::new();
    Ok(encoder.encode_to_string(&prometheus::gather())?)
}
