use axum::body::Bytes;
use axum_typed_multipart::TryFromMultipart;
use utoipa::ToSchema;

/// 生成请求参数
#[derive(TryFromMultipart)]
pub struct GenerateRequest {
    pub prompt: String,
}

/// 生成表单（用于API文档）
#[derive(Debug, ToSchema)]
#[allow(unused)]
pub struct GenerateForm {
    /// 提示词
    pub prompt: String,
}

/// 生成响应
#[derive(Debug, ToSchema)]
#[allow(unused)]
pub struct GenerateResponse {
    /// 生成图片的访问路径
    pub image_url: String,
    /// 生成耗时，单位为秒
    pub time_taken: f64,
}

/// 搜索请求参数
#[derive(TryFromMultipart)]
pub struct SearchRequest {
    pub file: Bytes,
    pub count: Option<usize>,
}

/// 搜索表单（用于API文档）
#[derive(Debug, ToSchema)]
#[allow(unused)]
pub struct SearchForm {
    /// 上传的查询图片
    #[schema(format = Binary, content_media_type = "application/octet-stream")]
    pub file: String,
    /// 返回的结果数量
    pub count: Option<usize>,
}

/// 搜索响应
#[derive(Debug, ToSchema)]
#[allow(unused)]
pub struct SearchResponse {
    /// 相似图片的访问路径，按相似度降序排列
    pub results: Vec<String>,
    /// 搜索耗时，单位为秒
    pub time_taken: f64,
}

/// 构建索引响应
#[derive(Debug, ToSchema)]
#[allow(unused)]
pub struct BuildResponse {
    /// 结果信息
    pub message: String,
}
