use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use log::info;
use tokio::net::TcpListener;
use tokio::task::block_in_place;

use crate::cli::SubCommandExtend;
use crate::config::{DiffusionOptions, ExtractOptions, Opts, SearchOptions};
use crate::diffusion::{ImageGenerator, SdWebuiClient};
use crate::extract::FastEmbedExtractor;
use crate::{Cbir, server};

#[derive(Parser, Debug, Clone)]
pub struct ServerCommand {
    #[command(flatten)]
    pub extract: ExtractOptions,
    #[command(flatten)]
    pub search: SearchOptions,
    #[command(flatten)]
    pub diffusion: DiffusionOptions,
    /// 监听地址
    #[arg(long, default_value = "127.0.0.1:8000")]
    pub addr: String,
    /// 语料库目录，默认为配置目录下的 image_db
    #[arg(long, value_name = "DIR")]
    pub corpus: Option<PathBuf>,
}

impl SubCommandExtend for ServerCommand {
    async fn run(&self, opts: &Opts) -> Result<()> {
        let (cbir, generator) = block_in_place(|| -> Result<_> {
            let extractor = FastEmbedExtractor::new(&self.extract, &opts.conf_dir.models())?;
            let cbir = Cbir::new(opts.conf_dir.clone(), Arc::new(extractor));
            let generator = SdWebuiClient::new(self.diffusion.clone())?;
            Ok((cbir, Box::new(generator) as Box<dyn ImageGenerator>))
        })?;

        let image_db = self.corpus.clone().unwrap_or_else(|| opts.conf_dir.image_db());
        std::fs::create_dir_all(&image_db)?;

        // 创建应用状态
        let state = server::AppState::new(cbir, generator, image_db, self);

        // 创建应用
        let app = server::create_app(state);

        // 启动服务器
        info!("服务器启动：http://{}", &self.addr);
        let listener = TcpListener::bind(&self.addr).await?;
        axum::serve(listener, app).await?;

        Ok(())
    }
}
