use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use log::info;
use tokio::task::block_in_place;

use crate::Cbir;
use crate::cli::SubCommandExtend;
use crate::config::{ExtractOptions, Opts};
use crate::extract::FastEmbedExtractor;

#[derive(Parser, Debug, Clone)]
pub struct BuildCommand {
    #[command(flatten)]
    pub extract: ExtractOptions,
    /// 图片所在目录，默认为配置目录下的 image_db
    pub path: Option<PathBuf>,
}

impl SubCommandExtend for BuildCommand {
    async fn run(&self, opts: &Opts) -> Result<()> {
        let corpus = self.path.clone().unwrap_or_else(|| opts.conf_dir.image_db());

        let count = block_in_place(|| {
            let extractor = FastEmbedExtractor::new(&self.extract, &opts.conf_dir.models())?;
            let cbir = Cbir::new(opts.conf_dir.clone(), Arc::new(extractor));
            cbir.build_index(&corpus)
        })?;

        info!("索引构建成功，共 {count} 张图片");
        Ok(())
    }
}
