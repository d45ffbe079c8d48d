//! File system collaborator interface.
//!
//! The core reads files only through this trait, which keeps the scan logic
//! hermetic under test and pins down the read-only contract: the extractor
//! never writes to the tree it analyzes.

use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileStat {
    pub size: u64,
    pub is_file: bool,
    pub is_dir: bool,
}

/// Read-only view of the tree under analysis.
pub trait FileSystem: Send + Sync {
    fn read_file(&self, path: &Path) -> io::Result<String>;
    fn stat(&self, path: &Path) -> io::Result<FileStat>;
    fn list_dir(&self, path: &Path) -> io::Result<Vec<String>>;

    fn exists(&self, path: &Path) -> bool {
        self.stat(path).is_ok()
    }

    fn is_file(&self, path: &Path) -> bool {
        self.stat(path).map(|s| s.is_file).unwrap_or(false)
    }
}

impl<T: FileSystem + ?Sized> FileSystem for std::sync::Arc<T> {
    fn read_file(&self, path: &Path) -> io::Result<String> {
        (**self).read_file(path)
    }

    fn stat(&self, path: &Path) -> io::Result<FileStat> {
        (**self).stat(path)
    }

    fn list_dir(&self, path: &Path) -> io::Result<Vec<String>> {
        (**self).list_dir(path)
    }
}

/// The real thing.
#[derive(Debug, Default)]
pub struct OsFileSystem;

impl FileSystem for OsFileSystem {
    fn read_file(&self, path: &Path) -> io::Result<String> {
        std::fs::read_to_string(path)
    }

    fn stat(&self, path: &Path) -> io::Result<FileStat> {
        let meta = std::fs::metadata(path)?;
        Ok(FileStat {
            size: meta.len(),
            is_file: meta.is_file(),
            is_dir: meta.is_dir(),
        })
    }

    fn list_dir(&self, path: &Path) -> io::Result<Vec<String>> {
        let mut names = Vec::new();
        for entry in std::fs::read_dir(path)? {
            let entry = entry?;
            if let Some(name) = entry.file_name().to_str() {
                names.push(name.to_string());
            }
        }
        names.sort();
        Ok(names)
    }
}

/// In-memory file system for hermetic tests. Paths are stored normalized to
/// forward slashes; directories are implied by file paths.
#[derive(Debug, Default)]
pub struct MemoryFileSystem {
    files: Mutex<BTreeMap<String, String>>,
}

impl MemoryFileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_file(&self, path: impl Into<String>, content: impl Into<String>) {
        let key = crate::utils::normalize_path(&path.into());
        self.files.lock().unwrap().insert(key, content.into());
    }

    pub fn remove_file(&self, path: &str) {
        let key = crate::utils::normalize_path(path);
        self.files.lock().unwrap().remove(&key);
    }

    pub fn paths(&self) -> Vec<PathBuf> {
        self.files
            .lock()
            .unwrap()
            .keys()
            .map(PathBuf::from)
            .collect()
    }

    fn key_of(path: &Path) -> String {
        crate::utils::normalize_path(&path.to_string_lossy())
    }
}

impl FileSystem for MemoryFileSystem {
    fn read_file(&self, path: &Path) -> io::Result<String> {
        let key = Self::key_of(path);
        self.files
            .lock()
            .unwrap()
            .get(&key)
            .cloned()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, format!("no such file: {key}")))
    }

    fn stat(&self, path: &Path) -> io::Result<FileStat> {
        let key = Self::key_of(path);
        let files = self.files.lock().unwrap();
        if let Some(content) = files.get(&key) {
            return Ok(FileStat {
                size: content.len() as u64,
                is_file: true,
                is_dir: false,
            });
        }
        let dir_prefix = format!("{key}/");
        if files.keys().any(|k| k.starts_with(&dir_prefix)) {
            return Ok(FileStat {
                size: 0,
                is_file: false,
                is_dir: true,
            });
        }
        Err(io::Error::new(
            io::ErrorKind::NotFound,
            format!("no such path: {key}"),
        ))
    }

    fn list_dir(&self, path: &Path) -> io::Result<Vec<String>> {
        let key = Self::key_of(path);
        let prefix = if key == "." || key.is_empty() {
            String::new()
        } else {
            format!("{key}/")
        };
        let files = self.files.lock().unwrap();
        let mut names: Vec<String> = files
            .keys()
            .filter_map(|k| k.strip_prefix(&prefix))
            .map(|rest| rest.split('/').next().unwrap_or(rest).to_string())
            .collect();
        names.sort();
        names.dedup();
        if names.is_empty() {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("no such directory: {key}"),
            ));
        }
        Ok(names)
    }
}
