use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, ValueEnum};
use tokio::task::block_in_place;

use crate::Cbir;
use crate::cli::SubCommandExtend;
use crate::config::{ExtractOptions, Opts, SearchOptions};
use crate::extract::FastEmbedExtractor;

#[derive(Parser, Debug, Clone)]
pub struct SearchCommand {
    #[command(flatten)]
    pub extract: ExtractOptions,
    #[command(flatten)]
    pub search: SearchOptions,
    /// 被搜索的图片路径
    pub image: PathBuf,
    /// 输出格式
    #[arg(long, value_name = "FORMAT", value_enum, default_value_t = OutputFormat::Table)]
    pub output_format: OutputFormat,
}

impl SubCommandExtend for SearchCommand {
    async fn run(&self, opts: &Opts) -> Result<()> {
        let results = block_in_place(|| {
            let extractor = FastEmbedExtractor::new(&self.extract, &opts.conf_dir.models())?;
            let cbir = Cbir::new(opts.conf_dir.clone(), Arc::new(extractor));
            cbir.search_similar(&self.image, self.search.count)
        })?;

        match self.output_format {
            OutputFormat::Json => {
                println!("{}", serde_json::to_string_pretty(&results)?)
            }
            OutputFormat::Table => {
                for path in &results {
                    println!("{path}");
                }
            }
        }
        Ok(())
    }
}

#[derive(ValueEnum, Debug, Clone, Copy)]
pub enum OutputFormat {
    Json,
    Table,
}
