use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use log::info;
use serde::Deserialize;
use serde_json::json;

use crate::config::DiffusionOptions;
use crate::error::{Error, Result};

/// 文生图的抽象：一次阻塞调用，要么返回 PNG 字节，要么失败
///
/// 不重试，不超时，排队和取消都交给推理端处理
pub trait ImageGenerator: Send + Sync {
    fn generate(&self, prompt: &str) -> Result<Vec<u8>>;
}

/// stable-diffusion-webui 兼容接口的客户端
pub struct SdWebuiClient {
    http: reqwest::blocking::Client,
    opts: DiffusionOptions,
}

#[derive(Deserialize)]
struct Txt2ImgResponse {
    images: Vec<String>,
}

impl SdWebuiClient {
    pub fn new(opts: DiffusionOptions) -> Result<Self> {
        // 生成耗时完全由推理端决定，客户端不设超时
        let http = reqwest::blocking::Client::builder()
            .timeout(None)
            .build()
            .map_err(|e| Error::Generation(e.to_string()))?;
        Ok(Self { http, opts })
    }
}

impl ImageGenerator for SdWebuiClient {
    fn generate(&self, prompt: &str) -> Result<Vec<u8>> {
        let url = format!("{}/sdapi/v1/txt2img", self.opts.sd_url.trim_end_matches('/'));
        info!("正在请求推理端生成图片");

        let resp = self
            .http
            .post(&url)
            .json(&json!({
                "prompt": prompt,
                "steps": self.opts.sd_steps,
                "width": self.opts.sd_width,
                "height": self.opts.sd_height,
            }))
            .send()
            .map_err(|e| Error::Generation(e.to_string()))?
            .error_for_status()
            .map_err(|e| Error::Generation(e.to_string()))?;

        let body: Txt2ImgResponse = resp.json().map_err(|e| Error::Generation(e.to_string()))?;
        let image = body
            .images
            .first()
            .ok_or_else(|| Error::Generation("推理端未返回图片".to_owned()))?;
        // 部分实现会带上 data URI 前缀
        let image = image.rsplit(',').next().unwrap_or(image);
        STANDARD.decode(image).map_err(|e| Error::Generation(e.to_string()))
    }
}
