use rand::distr::{Alphanumeric, SampleString};

/// 生成一个随机文件名，例如 `q3x8pv0kma71fh2z.png`
pub fn random_filename(ext: &str) -> String {
    let stem = Alphanumeric.sample_string(&mut rand::rng(), 16).to_lowercase();
    format!("{stem}.{ext}")
}

/// 保留两位小数
pub fn round2(secs: f64) -> f64 {
    (secs * 100.0).round() / 100.0
}
