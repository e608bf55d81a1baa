use std::path::PathBuf;
use std::sync::Arc;

use crate::Cbir;
use crate::cli::server::ServerCommand;
use crate::config::SearchOptions;
use crate::diffusion::ImageGenerator;

/// 应用状态
pub struct AppState {
    /// CBIR 管理器
    pub cbir: Cbir,
    /// 文生图客户端
    pub generator: Box<dyn ImageGenerator>,
    /// 语料库目录，生成的图片也写入这里
    pub image_db: PathBuf,
    /// 搜索配置选项
    pub search: SearchOptions,
}

impl AppState {
    /// 创建新的应用状态
    pub fn new(
        cbir: Cbir,
        generator: Box<dyn ImageGenerator>,
        image_db: PathBuf,
        opts: &ServerCommand,
    ) -> Arc<Self> {
        Arc::new(AppState { cbir, generator, image_db, search: opts.search.clone() })
    }
}
