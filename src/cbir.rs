use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use log::info;
use regex::Regex;
use walkdir::WalkDir;

use crate::config::ConfDir;
use crate::error::{Error, Result};
use crate::extract::FeatureExtractor;
use crate::index::FlatIndex;
use crate::snapshot::Snapshot;

/// CBIR 管理器
///
/// 负责扫描语料库、调用特征提取、维护磁盘上的索引快照，
/// 以及查询时把索引位置映射回图片路径
pub struct Cbir {
    conf_dir: ConfDir,
    extractor: Arc<dyn FeatureExtractor>,
    /// 保护快照文件：重建持写锁，查询持读锁
    snapshot_lock: RwLock<()>,
}

impl Cbir {
    pub fn new(conf_dir: ConfDir, extractor: Arc<dyn FeatureExtractor>) -> Self {
        Self { conf_dir, extractor, snapshot_lock: RwLock::new(()) }
    }

    /// 全量重建索引并持久化快照，返回入库的图片数量
    ///
    /// 任意一张图片提取失败都会中止整个重建，旧快照保持原样
    pub fn build_index(&self, corpus: &Path) -> Result<usize> {
        let _guard = self.snapshot_lock.write().expect("failed to acquire rw lock");

        let files = scan_corpus(corpus)?;
        info!("扫描到 {} 张图片", files.len());

        let vectors = self.extractor.extract_batch(&files)?;
        let mut index = FlatIndex::new(self.extractor.dimension())?;
        for vector in &vectors {
            index.add(vector)?;
        }

        let paths = files.iter().map(|p| p.to_string_lossy().into_owned()).collect();
        Snapshot::new(index, paths)?.save(&self.conf_dir)?;

        info!("索引重建完成，共 {} 张图片", files.len());
        Ok(files.len())
    }

    /// 以图搜图，返回最相似的 `top_k` 张图片路径，按相似度降序
    ///
    /// `top_k` 超过语料库大小时返回全部结果。距离只参与排序，不对外返回
    pub fn search_similar(&self, image: &Path, top_k: usize) -> Result<Vec<String>> {
        let _guard = self.snapshot_lock.read().expect("failed to acquire rw lock");

        let snapshot = Snapshot::load(&self.conf_dir)?;
        let query = self.extractor.extract(image)?;
        let hits = snapshot.index.search(&query, top_k)?;

        hits.into_iter()
            .map(|(pos, _)| {
                snapshot.paths.get(pos).cloned().ok_or_else(|| {
                    Error::SnapshotCorrupt(format!("位置 {pos} 超出路径列表范围"))
                })
            })
            .collect()
    }
}

/// 枚举语料库目录下的图片文件，其余后缀直接忽略
///
/// 结果按路径排序，保证重建出的快照可复现
fn scan_corpus(corpus: &Path) -> Result<Vec<PathBuf>> {
    let re = Regex::new("(?i)^(jpg|jpeg|png)$").expect("failed to build regex");
    let mut files = vec![];
    for entry in WalkDir::new(corpus).max_depth(1) {
        let entry = entry.map_err(std::io::Error::from)?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.into_path();
        if path.extension().map(|s| re.is_match(&s.to_string_lossy())) == Some(true) {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::str::FromStr;

    use tempfile::TempDir;

    use super::*;

    /// 测试用提取器：把图片文件内容按空白分隔解析成 f32 向量
    struct StubExtractor {
        dim: usize,
    }

    impl FeatureExtractor for StubExtractor {
        fn dimension(&self) -> usize {
            self.dim
        }

        fn extract(&self, image: &Path) -> Result<Vec<f32>> {
            let text = fs::read_to_string(image)?;
            text.split_whitespace()
                .map(|s| s.parse::<f32>().map_err(|e| Error::Extraction(e.to_string())))
                .collect()
        }

        fn extract_batch(&self, images: &[PathBuf]) -> Result<Vec<Vec<f32>>> {
            images.iter().map(|p| self.extract(p)).collect()
        }
    }

    fn cbir_in(tmp: &TempDir) -> Cbir {
        let conf_dir = ConfDir::from_str(tmp.path().join("conf").to_str().unwrap()).unwrap();
        Cbir::new(conf_dir, Arc::new(StubExtractor { dim: 2 }))
    }

    fn corpus_in(tmp: &TempDir, files: &[(&str, &str)]) -> PathBuf {
        let corpus = tmp.path().join("image_db");
        fs::create_dir_all(&corpus).unwrap();
        for (name, content) in files {
            fs::write(corpus.join(name), content).unwrap();
        }
        corpus
    }

    #[test]
    fn test_build_filters_extensions() {
        // jpg / jpeg / png 大小写不敏感，其余后缀忽略
        let tmp = TempDir::new().unwrap();
        let cbir = cbir_in(&tmp);
        let corpus = corpus_in(
            &tmp,
            &[
                ("a.jpg", "0 0"),
                ("b.txt", "not an image"),
                ("c.PNG", "1 1"),
                ("d.jpeg", "2 2"),
                ("e.webp", "3 3"),
            ],
        );

        assert_eq!(cbir.build_index(&corpus).unwrap(), 3);
    }

    #[test]
    fn test_build_missing_corpus() {
        let tmp = TempDir::new().unwrap();
        let cbir = cbir_in(&tmp);
        let err = cbir.build_index(&tmp.path().join("nonexistent")).unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_search_before_build() {
        let tmp = TempDir::new().unwrap();
        let cbir = cbir_in(&tmp);
        let query = tmp.path().join("q.jpg");
        fs::write(&query, "0 0").unwrap();

        assert!(matches!(cbir.search_similar(&query, 3), Err(Error::SnapshotMissing)));
    }

    #[test]
    fn test_empty_corpus_then_search() {
        // 空语料库可以构建出零条目的快照，之后的查询报索引为空
        let tmp = TempDir::new().unwrap();
        let cbir = cbir_in(&tmp);
        let corpus = corpus_in(&tmp, &[]);

        assert_eq!(cbir.build_index(&corpus).unwrap(), 0);

        let query = tmp.path().join("q.jpg");
        fs::write(&query, "0 0").unwrap();
        assert!(matches!(cbir.search_similar(&query, 3), Err(Error::EmptyIndex)));
    }

    #[test]
    fn test_search_ranked_by_distance() {
        let tmp = TempDir::new().unwrap();
        let cbir = cbir_in(&tmp);
        let corpus =
            corpus_in(&tmp, &[("far.jpg", "10 10"), ("mid.jpg", "3 3"), ("near.jpg", "1 1")]);
        cbir.build_index(&corpus).unwrap();

        let query = tmp.path().join("q.jpg");
        fs::write(&query, "0 0").unwrap();

        let results = cbir.search_similar(&query, 3).unwrap();
        let names: Vec<_> = results
            .iter()
            .map(|p| Path::new(p).file_name().unwrap().to_str().unwrap().to_owned())
            .collect();
        assert_eq!(names, vec!["near.jpg", "mid.jpg", "far.jpg"]);
    }

    #[test]
    fn test_search_top_k_exceeds_corpus() {
        let tmp = TempDir::new().unwrap();
        let cbir = cbir_in(&tmp);
        let corpus = corpus_in(&tmp, &[("a.jpg", "0 0"), ("b.jpg", "1 1")]);
        cbir.build_index(&corpus).unwrap();

        let query = tmp.path().join("q.jpg");
        fs::write(&query, "0 0").unwrap();

        assert_eq!(cbir.search_similar(&query, 100).unwrap().len(), 2);
    }

    #[test]
    fn test_search_duplicate_vectors_both_returned() {
        // 特征完全相同的两张图片必须同时出现在结果里
        let tmp = TempDir::new().unwrap();
        let cbir = cbir_in(&tmp);
        let corpus =
            corpus_in(&tmp, &[("one.jpg", "5 5"), ("two.jpg", "5 5"), ("other.jpg", "9 9")]);
        cbir.build_index(&corpus).unwrap();

        let query = tmp.path().join("q.jpg");
        fs::write(&query, "5 5").unwrap();

        let results = cbir.search_similar(&query, 2).unwrap();
        assert!(results.iter().any(|p| p.ends_with("one.jpg")));
        assert!(results.iter().any(|p| p.ends_with("two.jpg")));
    }

    #[test]
    fn test_failed_rebuild_keeps_old_snapshot() {
        // 重建中途提取失败时，旧快照必须逐字节保持原样
        let tmp = TempDir::new().unwrap();
        let cbir = cbir_in(&tmp);
        let corpus = corpus_in(&tmp, &[("a.jpg", "0 0"), ("b.jpg", "1 1")]);
        cbir.build_index(&corpus).unwrap();

        let index_before = fs::read(cbir.conf_dir.index()).unwrap();
        let paths_before = fs::read(cbir.conf_dir.index_paths()).unwrap();

        fs::write(corpus.join("bad.jpg"), "not a number").unwrap();
        assert!(matches!(cbir.build_index(&corpus), Err(Error::Extraction(_))));

        assert_eq!(fs::read(cbir.conf_dir.index()).unwrap(), index_before);
        assert_eq!(fs::read(cbir.conf_dir.index_paths()).unwrap(), paths_before);
    }

    #[test]
    fn test_rebuild_replaces_snapshot() {
        let tmp = TempDir::new().unwrap();
        let cbir = cbir_in(&tmp);
        let corpus = corpus_in(&tmp, &[("a.jpg", "0 0")]);
        cbir.build_index(&corpus).unwrap();

        fs::write(corpus.join("b.jpg"), "1 1").unwrap();
        assert_eq!(cbir.build_index(&corpus).unwrap(), 2);

        let query = tmp.path().join("q.jpg");
        fs::write(&query, "1 1").unwrap();
        let results = cbir.search_similar(&query, 1).unwrap();
        assert!(results[0].ends_with("b.jpg"));
    }
}
