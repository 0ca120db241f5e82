//! Directory-backed container store
//!
//! Layout of a container at `path`:
//!
//! ```text
//! path/container.json     format marker and version
//! path/<name>.json        DatasetMeta for each dataset
//! path/<name>.bin         raw little-endian row-major element data
//! ```
//!
//! Writes go straight to the data file; `flush` (on file close) syncs them.

use crate::{Container, DatasetMeta, EngineError, EngineResult, OpenMode, Store};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

const HEADER_FILE: &str = "container.json";
const FORMAT_NAME: &str = "hyperslab-dir";
const FORMAT_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct ContainerHeader {
    format: String,
    version: u32,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DirectoryStore;

impl Store for DirectoryStore {
    type Container = DirectoryContainer;

    fn open(&self, path: &Path, mode: OpenMode) -> EngineResult<DirectoryContainer> {
        let header_path = path.join(HEADER_FILE);
        if !header_path.is_file() {
            return Err(EngineError::NotFound(path.display().to_string()));
        }
        let header: ContainerHeader = serde_json::from_slice(&fs::read(&header_path)?)
            .map_err(|e| EngineError::Corrupt(format!("{}: {}", header_path.display(), e)))?;
        if header.format != FORMAT_NAME || header.version != FORMAT_VERSION {
            return Err(EngineError::Corrupt(format!(
                "unsupported container format {} v{}",
                header.format, header.version
            )));
        }
        Ok(DirectoryContainer::new(path, mode))
    }

    fn create(&self, path: &Path) -> EngineResult<DirectoryContainer> {
        if path.exists() {
            return Err(EngineError::AlreadyExists(path.display().to_string()));
        }
        fs::create_dir_all(path)?;
        let header = ContainerHeader {
            format: FORMAT_NAME.to_string(),
            version: FORMAT_VERSION,
        };
        let bytes = serde_json::to_vec_pretty(&header)
            .map_err(|e| EngineError::Corrupt(e.to_string()))?;
        fs::write(path.join(HEADER_FILE), bytes)?;
        debug!(path = %path.display(), "directory container created");
        Ok(DirectoryContainer::new(path, OpenMode::ReadWrite))
    }
}

/// An open directory container; data files are opened lazily and kept open.
///
/// In `ReadOnly` mode data files are opened without write access.
pub struct DirectoryContainer {
    root: PathBuf,
    mode: OpenMode,
    data_files: HashMap<String, File>,
}

impl DirectoryContainer {
    fn new(root: &Path, mode: OpenMode) -> Self {
        Self {
            root: root.to_path_buf(),
            mode,
            data_files: HashMap::new(),
        }
    }

    fn paths(&self, name: &str) -> EngineResult<(PathBuf, PathBuf)> {
        let valid = !name.is_empty()
            && !name.starts_with('.')
            && !name.contains(['/', '\\'])
            && name != HEADER_FILE.trim_end_matches(".json");
        if !valid {
            return Err(EngineError::InvalidName(name.to_string()));
        }
        Ok((
            self.root.join(format!("{}.json", name)),
            self.root.join(format!("{}.bin", name)),
        ))
    }

    fn data_file(&mut self, name: &str) -> EngineResult<&mut File> {
        if !self.data_files.contains_key(name) {
            let (meta_path, data_path) = self.paths(name)?;
            if !meta_path.is_file() {
                return Err(EngineError::NotFound(name.to_string()));
            }
            let file = OpenOptions::new()
                .read(true)
                .write(self.mode.is_writable())
                .open(data_path)?;
            self.data_files.insert(name.to_string(), file);
        }
        self.data_files
            .get_mut(name)
            .ok_or_else(|| EngineError::NotFound(name.to_string()))
    }
}

impl Container for DirectoryContainer {
    fn contains(&self, name: &str) -> EngineResult<bool> {
        let (meta_path, _) = self.paths(name)?;
        Ok(meta_path.is_file())
    }

    fn metadata(&self, name: &str) -> EngineResult<DatasetMeta> {
        let (meta_path, _) = self.paths(name)?;
        if !meta_path.is_file() {
            return Err(EngineError::NotFound(name.to_string()));
        }
        serde_json::from_slice(&fs::read(&meta_path)?)
            .map_err(|e| EngineError::Corrupt(format!("{}: {}", meta_path.display(), e)))
    }

    fn create(&mut self, name: &str, meta: &DatasetMeta) -> EngineResult<()> {
        let (meta_path, data_path) = self.paths(name)?;
        let data = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(&data_path)?;
        data.set_len(meta.byte_len()?)?;
        let bytes =
            serde_json::to_vec_pretty(meta).map_err(|e| EngineError::Corrupt(e.to_string()))?;
        // Metadata last: a dataset without a header does not exist.
        fs::write(&meta_path, bytes)?;
        self.data_files.insert(name.to_string(), data);
        Ok(())
    }

    fn remove(&mut self, name: &str) -> EngineResult<()> {
        let (meta_path, data_path) = self.paths(name)?;
        if !meta_path.is_file() {
            return Err(EngineError::NotFound(name.to_string()));
        }
        self.data_files.remove(name);
        fs::remove_file(meta_path)?;
        if data_path.exists() {
            fs::remove_file(data_path)?;
        }
        Ok(())
    }

    fn read_at(&mut self, name: &str, offset: u64, buf: &mut [u8]) -> EngineResult<()> {
        let file = self.data_file(name)?;
        file.seek(SeekFrom::Start(offset))?;
        file.read_exact(buf)?;
        Ok(())
    }

    fn write_at(&mut self, name: &str, offset: u64, data: &[u8]) -> EngineResult<()> {
        let file = self.data_file(name)?;
        file.seek(SeekFrom::Start(offset))?;
        file.write_all(data)?;
        Ok(())
    }

    fn flush(&mut self) -> EngineResult<()> {
        for file in self.data_files.values_mut() {
            file.flush()?;
            file.sync_all()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use array_types::{Shape, TypeDescriptor};
    use tempfile::tempdir;

    fn meta() -> DatasetMeta {
        DatasetMeta {
            dtype: TypeDescriptor::uint16(),
            shape: Shape::new([3, 2]).unwrap(),
            max_shape: Some(Shape::new([10, 2]).unwrap()),
        }
    }

    #[test]
    fn test_create_and_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("c");
        {
            let mut c = DirectoryStore.create(&path).unwrap();
            c.create("ds", &meta()).unwrap();
            c.write_at("ds", 2, &[1, 2]).unwrap();
            c.flush().unwrap();
        }
        let mut c = DirectoryStore.open(&path, OpenMode::ReadWrite).unwrap();
        assert_eq!(c.metadata("ds").unwrap(), meta());
        let mut buf = [0u8; 4];
        c.read_at("ds", 0, &mut buf).unwrap();
        assert_eq!(buf, [0, 0, 1, 2]);
    }

    #[test]
    fn test_read_only_data_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("c");
        {
            let mut c = DirectoryStore.create(&path).unwrap();
            c.create("ds", &meta()).unwrap();
            c.write_at("ds", 0, &[9, 8]).unwrap();
            c.flush().unwrap();
        }
        let data_path = path.join("ds.bin");
        let mut perms = fs::metadata(&data_path).unwrap().permissions();
        perms.set_readonly(true);
        fs::set_permissions(&data_path, perms).unwrap();

        let mut c = DirectoryStore.open(&path, OpenMode::ReadOnly).unwrap();
        let mut buf = [0u8; 2];
        c.read_at("ds", 0, &mut buf).unwrap();
        assert_eq!(buf, [9, 8]);
        // The handle itself lacks write access, whatever the process may do
        assert!(matches!(c.write_at("ds", 0, &[1]), Err(EngineError::Io(_))));
    }

    #[test]
    fn test_read_after_create() {
        let dir = tempdir().unwrap();
        let mut c = DirectoryStore.create(&dir.path().join("c")).unwrap();
        c.create("ds", &meta()).unwrap();
        c.write_at("ds", 4, &[5, 6]).unwrap();
        let mut buf = [0u8; 2];
        c.read_at("ds", 4, &mut buf).unwrap();
        assert_eq!(buf, [5, 6]);
    }

    #[test]
    fn test_open_missing() {
        let dir = tempdir().unwrap();
        assert!(matches!(
            DirectoryStore.open(&dir.path().join("nope"), OpenMode::ReadOnly),
            Err(EngineError::NotFound(_))
        ));
    }

    #[test]
    fn test_invalid_names() {
        let dir = tempdir().unwrap();
        let c = DirectoryStore.create(&dir.path().join("c")).unwrap();
        for name in ["", ".hidden", "a/b", "container"] {
            assert!(
                matches!(c.contains(name), Err(EngineError::InvalidName(_))),
                "{name}"
            );
        }
    }

    #[test]
    fn test_remove() {
        let dir = tempdir().unwrap();
        let mut c = DirectoryStore.create(&dir.path().join("c")).unwrap();
        c.create("ds", &meta()).unwrap();
        assert!(c.contains("ds").unwrap());
        c.remove("ds").unwrap();
        assert!(!c.contains("ds").unwrap());
        assert!(matches!(c.remove("ds"), Err(EngineError::NotFound(_))));
    }

    #[test]
    fn test_read_past_end_is_io_error() {
        let dir = tempdir().unwrap();
        let mut c = DirectoryStore.create(&dir.path().join("c")).unwrap();
        c.create("ds", &meta()).unwrap();
        let mut buf = [0u8; 4];
        assert!(matches!(c.read_at("ds", 10, &mut buf), Err(EngineError::Io(_))));
    }

    #[test]
    fn test_bad_header() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("c");
        fs::create_dir_all(&path).unwrap();
        fs::write(path.join(HEADER_FILE), b"{\"format\":\"other\",\"version\":1}").unwrap();
        assert!(matches!(
            DirectoryStore.open(&path, OpenMode::ReadWrite),
            Err(EngineError::Corrupt(_))
        ));
    }
}
