use std::convert::Infallible;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::LazyLock;

use clap::{Parser, Subcommand, ValueEnum};
use directories::ProjectDirs;
use fastembed::ImageEmbeddingModel;

use crate::cli::*;

static CONF_DIR: LazyLock<ConfDir> = LazyLock::new(|| {
    let proj_dirs = ProjectDirs::from("", "aloxaf", "imstudio").expect("failed to get project dir");
    ConfDir { path: proj_dirs.config_dir().to_path_buf() }
});

fn default_config_dir() -> &'static str {
    CONF_DIR.path().to_str().unwrap()
}

#[derive(Parser, Debug, Clone)]
pub struct ExtractOptions {
    /// 特征提取使用的 ONNX 模型
    #[arg(long, value_enum, value_name = "MODEL", default_value_t = EmbedModel::Resnet50)]
    pub embed_model: EmbedModel,
}

/// fastembed 提供的图片向量化模型
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmbedModel {
    /// ResNet-50，2048 维
    Resnet50,
    /// CLIP ViT-B/32，512 维
    ClipVitB32,
    /// Unicom ViT-B/16，768 维
    UnicomVitB16,
}

impl EmbedModel {
    /// 输出向量的维度
    pub fn dim(&self) -> usize {
        match self {
            Self::Resnet50 => 2048,
            Self::ClipVitB32 => 512,
            Self::UnicomVitB16 => 768,
        }
    }

    pub fn to_fastembed(&self) -> ImageEmbeddingModel {
        match self {
            Self::Resnet50 => ImageEmbeddingModel::Resnet50,
            Self::ClipVitB32 => ImageEmbeddingModel::ClipVitB32,
            Self::UnicomVitB16 => ImageEmbeddingModel::UnicomVitB16,
        }
    }
}

#[derive(Parser, Debug, Clone)]
pub struct SearchOptions {
    /// 返回的结果数量
    #[arg(long, value_name = "COUNT", default_value_t = 12)]
    pub count: usize,
}

#[derive(Parser, Debug, Clone)]
pub struct DiffusionOptions {
    /// stable-diffusion-webui 兼容推理端的地址
    #[arg(long, value_name = "URL", default_value = "http://127.0.0.1:7860")]
    pub sd_url: String,
    /// 采样步数
    #[arg(long, value_name = "N", default_value_t = 20)]
    pub sd_steps: u32,
    /// 生成图片的宽度
    #[arg(long, value_name = "PX", default_value_t = 512)]
    pub sd_width: u32,
    /// 生成图片的高度
    #[arg(long, value_name = "PX", default_value_t = 512)]
    pub sd_height: u32,
}

#[derive(Parser, Debug, Clone)]
#[command(name = "imstudio", version)]
pub struct Opts {
    #[command(subcommand)]
    pub subcmd: SubCommand,
    /// imstudio 配置文件目录
    #[arg(short, long, default_value = default_config_dir())]
    pub conf_dir: ConfDir,
}

#[derive(Subcommand, Debug, Clone)]
pub enum SubCommand {
    /// 扫描图片目录并构建索引
    Build(BuildCommand),
    /// 以图搜图
    Search(SearchCommand),
    /// 根据提示词生成图片
    Generate(GenerateCommand),
    /// 启动 HTTP 服务
    Server(ServerCommand),
}

#[derive(Debug, Clone)]
pub struct ConfDir {
    path: PathBuf,
}

impl ConfDir {
    pub fn path(&self) -> &Path {
        self.path.as_path()
    }

    /// 返回索引文件的路径
    pub fn index(&self) -> PathBuf {
        self.path.join("index.flat")
    }

    /// 返回索引文件的临时路径
    pub fn index_tmp(&self) -> PathBuf {
        self.path.join("index.flat.tmp")
    }

    /// 返回路径列表文件的路径
    pub fn index_paths(&self) -> PathBuf {
        self.path.join("index.flat.paths")
    }

    /// 返回路径列表文件的临时路径
    pub fn index_paths_tmp(&self) -> PathBuf {
        self.path.join("index.flat.paths.tmp")
    }

    /// 返回默认的语料库目录
    pub fn image_db(&self) -> PathBuf {
        self.path.join("image_db")
    }

    /// 返回模型权重的缓存目录
    pub fn models(&self) -> PathBuf {
        self.path.join("models")
    }
}

impl FromStr for ConfDir {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self { path: PathBuf::from(s) })
    }
}
