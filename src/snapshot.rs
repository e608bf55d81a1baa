use std::fs;
use std::io::ErrorKind;

use log::debug;

use crate::config::ConfDir;
use crate::error::{Error, Result};
use crate::index::FlatIndex;

/// 持久化的索引快照：索引本体加上按位置一一对应的图片路径列表
///
/// 两个文件必须成对读写。路径列表为每行一条的纯文本，行数必须等于
/// 索引中的向量数量，不一致视为快照损坏
pub struct Snapshot {
    pub index: FlatIndex,
    pub paths: Vec<String>,
}

impl Snapshot {
    pub fn new(index: FlatIndex, paths: Vec<String>) -> Result<Self> {
        if index.len() != paths.len() {
            return Err(Error::SnapshotCorrupt(format!(
                "路径数量 ({}) 与向量数量 ({}) 不一致",
                paths.len(),
                index.len()
            )));
        }
        Ok(Self { index, paths })
    }

    /// 写入磁盘：先写临时文件再原子重命名，中途失败不影响旧快照
    pub fn save(&self, conf_dir: &ConfDir) -> Result<()> {
        fs::create_dir_all(conf_dir.path())?;

        let index_tmp = conf_dir.index_tmp();
        let paths_tmp = conf_dir.index_paths_tmp();
        fs::write(&index_tmp, self.index.to_bytes()?)?;

        let mut text = self.paths.join("\n");
        if !text.is_empty() {
            text.push('\n');
        }
        fs::write(&paths_tmp, text)?;

        fs::rename(&index_tmp, conf_dir.index())?;
        fs::rename(&paths_tmp, conf_dir.index_paths())?;
        debug!("快照已写入: {} 个向量", self.index.len());
        Ok(())
    }

    /// 从磁盘读取并校验两个文件的配对关系
    pub fn load(conf_dir: &ConfDir) -> Result<Self> {
        let index_file = conf_dir.index();
        if !index_file.exists() {
            return Err(Error::SnapshotMissing);
        }

        let index = FlatIndex::from_bytes(&fs::read(&index_file)?)?;
        let paths = match fs::read_to_string(conf_dir.index_paths()) {
            Ok(text) => text.lines().map(str::to_owned).collect::<Vec<_>>(),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(Error::SnapshotCorrupt("路径列表文件缺失".to_owned()));
            }
            Err(e) => return Err(e.into()),
        };

        Self::new(index, paths)
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use tempfile::TempDir;

    use super::*;

    fn conf_dir(tmp: &TempDir) -> ConfDir {
        ConfDir::from_str(tmp.path().to_str().unwrap()).unwrap()
    }

    fn sample_snapshot() -> Snapshot {
        let mut index = FlatIndex::new(2).unwrap();
        index.add(&[0.0, 1.0]).unwrap();
        index.add(&[2.0, 3.0]).unwrap();
        Snapshot::new(index, vec!["a.jpg".to_owned(), "b.png".to_owned()]).unwrap()
    }

    #[test]
    fn test_new_rejects_length_mismatch() {
        let index = FlatIndex::new(2).unwrap();
        let err = Snapshot::new(index, vec!["a.jpg".to_owned()]).unwrap_err();
        assert!(matches!(err, Error::SnapshotCorrupt(_)));
    }

    #[test]
    fn test_save_load_roundtrip() {
        let tmp = TempDir::new().unwrap();
        let conf = conf_dir(&tmp);
        sample_snapshot().save(&conf).unwrap();

        let loaded = Snapshot::load(&conf).unwrap();
        assert_eq!(loaded.paths, vec!["a.jpg", "b.png"]);
        assert_eq!(loaded.index.search(&[0.0, 1.0], 1).unwrap(), vec![(0, 0.0)]);

        // 路径列表是一行一条的纯文本
        let text = fs::read_to_string(conf.index_paths()).unwrap();
        assert_eq!(text, "a.jpg\nb.png\n");
    }

    #[test]
    fn test_save_load_empty() {
        let tmp = TempDir::new().unwrap();
        let conf = conf_dir(&tmp);
        Snapshot::new(FlatIndex::new(2).unwrap(), vec![]).unwrap().save(&conf).unwrap();

        let loaded = Snapshot::load(&conf).unwrap();
        assert_eq!(loaded.paths.len(), 0);
        assert!(loaded.index.is_empty());
    }

    #[test]
    fn test_load_missing() {
        let tmp = TempDir::new().unwrap();
        assert!(matches!(Snapshot::load(&conf_dir(&tmp)), Err(Error::SnapshotMissing)));
    }

    #[test]
    fn test_load_paths_file_missing() {
        let tmp = TempDir::new().unwrap();
        let conf = conf_dir(&tmp);
        sample_snapshot().save(&conf).unwrap();
        fs::remove_file(conf.index_paths()).unwrap();

        assert!(matches!(Snapshot::load(&conf), Err(Error::SnapshotCorrupt(_))));
    }

    #[test]
    fn test_load_length_mismatch() {
        let tmp = TempDir::new().unwrap();
        let conf = conf_dir(&tmp);
        sample_snapshot().save(&conf).unwrap();

        // 向路径列表追加一行，制造长度不一致
        let mut text = fs::read_to_string(conf.index_paths()).unwrap();
        text.push_str("c.jpg\n");
        fs::write(conf.index_paths(), text).unwrap();

        assert!(matches!(Snapshot::load(&conf), Err(Error::SnapshotCorrupt(_))));
    }

    #[test]
    fn test_load_corrupt_index_blob() {
        let tmp = TempDir::new().unwrap();
        let conf = conf_dir(&tmp);
        sample_snapshot().save(&conf).unwrap();
        fs::write(conf.index(), b"garbage").unwrap();

        assert!(matches!(Snapshot::load(&conf), Err(Error::SnapshotCorrupt(_))));
    }
}
