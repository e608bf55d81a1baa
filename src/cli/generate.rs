use std::fs;
use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use log::info;
use tokio::task::block_in_place;

use crate::cli::SubCommandExtend;
use crate::config::{DiffusionOptions, Opts};
use crate::diffusion::{ImageGenerator, SdWebuiClient};
use crate::utils;

#[derive(Parser, Debug, Clone)]
pub struct GenerateCommand {
    #[command(flatten)]
    pub diffusion: DiffusionOptions,
    /// 提示词
    pub prompt: String,
    /// 输出文件，默认写入语料库目录下的随机文件名
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,
}

impl SubCommandExtend for GenerateCommand {
    async fn run(&self, opts: &Opts) -> Result<()> {
        let output = match &self.output {
            Some(path) => path.clone(),
            None => opts.conf_dir.image_db().join(utils::random_filename("png")),
        };

        let image = block_in_place(|| {
            let client = SdWebuiClient::new(self.diffusion.clone())?;
            client.generate(&self.prompt)
        })?;

        if let Some(parent) = output.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&output, image)?;

        info!("图片已保存: {}", output.display());
        Ok(())
    }
}
