use std::sync::LazyLock;

use prometheus::*;

static METRIC_SEARCH_DURATION: LazyLock<Histogram> = LazyLock::new(|| {
    register_histogram!("im_cbir_search_duration", "duration of the cbir search in seconds")
        .unwrap()
});

static METRIC_GENERATE_DURATION: LazyLock<Histogram> = LazyLock::new(|| {
    register_histogram!(
        "im_generate_duration",
        "duration of the text-to-image generation in seconds",
        (1..=12).map(|x| (x * 5) as f64).collect()
    )
    .unwrap()
});

static METRIC_INDEX_SIZE: LazyLock<IntGauge> = LazyLock::new(|| {
    register_int_gauge!("im_index_size", "number of vectors in the current index").unwrap()
});

/// 记录一次搜索耗时
pub fn observe_search_duration(duration: f64) {
    METRIC_SEARCH_DURATION.observe(duration);
}

/// 记录一次生成耗时
pub fn observe_generate_duration(duration: f64) {
    METRIC_GENERATE_DURATION.observe(duration);
}

/// 更新索引大小指标
pub fn set_index_size(size: usize) {
    METRIC_INDEX_SIZE.set(size as i64);
}
