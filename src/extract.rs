use std::path::{Path, PathBuf};
use std::sync::Mutex;

use fastembed::{ImageEmbedding, ImageInitOptions};
use log::info;

use crate::config::ExtractOptions;
use crate::error::{Error, Result};

/// 图片到定长特征向量的抽象
///
/// 实现必须保证维度固定，批量提取的输出顺序与输入一致。
/// 服务启动时构造一次，之后注入到需要的地方
pub trait FeatureExtractor: Send + Sync {
    /// 输出向量的维度
    fn dimension(&self) -> usize;

    /// 提取单张图片的特征向量
    fn extract(&self, image: &Path) -> Result<Vec<f32>>;

    /// 批量提取
    fn extract_batch(&self, images: &[PathBuf]) -> Result<Vec<Vec<f32>>>;
}

/// 基于 fastembed ONNX 模型的特征提取器
pub struct FastEmbedExtractor {
    model: Mutex<ImageEmbedding>,
    dim: usize,
}

impl FastEmbedExtractor {
    /// 加载 ONNX 模型，首次运行时会把权重下载到 `cache_dir`
    pub fn new(opts: &ExtractOptions, cache_dir: &Path) -> Result<Self> {
        info!("正在加载特征提取模型: {:?}", opts.embed_model);
        let init = ImageInitOptions::new(opts.embed_model.to_fastembed())
            .with_cache_dir(cache_dir.to_path_buf())
            .with_show_download_progress(true);
        let model = ImageEmbedding::try_new(init).map_err(|e| Error::Extraction(e.to_string()))?;
        Ok(Self { model: Mutex::new(model), dim: opts.embed_model.dim() })
    }
}

impl FeatureExtractor for FastEmbedExtractor {
    fn dimension(&self) -> usize {
        self.dim
    }

    fn extract(&self, image: &Path) -> Result<Vec<f32>> {
        let mut vectors = self.extract_batch(std::slice::from_ref(&image.to_path_buf()))?;
        vectors.pop().ok_or_else(|| Error::Extraction("模型未返回向量".to_owned()))
    }

    fn extract_batch(&self, images: &[PathBuf]) -> Result<Vec<Vec<f32>>> {
        if images.is_empty() {
            return Ok(vec![]);
        }
        let mut model =
            self.model.lock().map_err(|_| Error::Extraction("模型锁中毒".to_owned()))?;
        let vectors =
            model.embed(images.to_vec(), None).map_err(|e| Error::Extraction(e.to_string()))?;
        if vectors.len() != images.len() {
            return Err(Error::Extraction(format!(
                "模型返回了 {} 个向量，期望 {}",
                vectors.len(),
                images.len()
            )));
        }
        Ok(vectors)
    }
}
