//! Read-only filesystem access used by the resolvers.
//!
//! The engine never touches `std::fs` directly so it can be driven by
//! [`MemoryFileSystem`] in tests, which also counts reads per path.

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::io;
use std::path::{Path, PathBuf};
use std::rc::Rc;

pub trait FileSystem {
    fn read_to_string(&self, path: &Path) -> io::Result<String>;

    fn is_file(&self, path: &Path) -> bool;

    fn is_dir(&self, path: &Path) -> bool;

    /// Names of the regular files directly inside `dir`, sorted by name.
    fn list_files(&self, dir: &Path) -> io::Result<Vec<String>>;

    /// Absolute path with symlinks followed.
    fn canonicalize(&self, path: &Path) -> io::Result<PathBuf>;
}

/// `std::fs` backed [`FileSystem`].
#[derive(Debug, Clone, Copy, Default)]
pub struct RealFileSystem;

impl FileSystem for RealFileSystem {
    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        std::fs::read_to_string(path)
    }

    fn is_file(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn is_dir(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn list_files(&self, dir: &Path) -> io::Result<Vec<String>> {
        let mut names = Vec::new();
        for entry in std::fs::read_dir(dir)? {
            let entry = entry?;
            if entry.file_type()?.is_dir() {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                names.push(name.to_string());
            }
        }
        names.sort();
        Ok(names)
    }

    fn canonicalize(&self, path: &Path) -> io::Result<PathBuf> {
        std::fs::canonicalize(path)
    }
}

/// In-memory [`FileSystem`]. Clones share the same files and read counters.
#[derive(Debug, Clone, Default)]
pub struct MemoryFileSystem {
    files: Rc<RefCell<BTreeMap<PathBuf, String>>>,
    reads: Rc<RefCell<HashMap<PathBuf, usize>>>,
}

impl MemoryFileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(self, path: impl Into<PathBuf>, contents: impl Into<String>) -> Self {
        self.insert(path, contents);
        self
    }

    pub fn insert(&self, path: impl Into<PathBuf>, contents: impl Into<String>) {
        self.files.borrow_mut().insert(path.into(), contents.into());
    }

    /// Number of successful and failed reads of `path` so far.
    pub fn reads_of(&self, path: impl AsRef<Path>) -> usize {
        self.reads
            .borrow()
            .get(path.as_ref())
            .copied()
            .unwrap_or(0)
    }

    pub fn total_reads(&self) -> usize {
        self.reads.borrow().values().sum()
    }
}

impl FileSystem for MemoryFileSystem {
    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        *self
            .reads
            .borrow_mut()
            .entry(path.to_path_buf())
            .or_insert(0) += 1;
        self.files.borrow().get(path).cloned().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("{} not found", path.display()),
            )
        })
    }

    fn is_file(&self, path: &Path) -> bool {
        self.files.borrow().contains_key(path)
    }

    fn is_dir(&self, path: &Path) -> bool {
        self.files
            .borrow()
            .keys()
            .any(|file| file != path && file.starts_with(path))
    }

    fn list_files(&self, dir: &Path) -> io::Result<Vec<String>> {
        if !self.is_dir(dir) {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("{} not found", dir.display()),
            ));
        }
        Ok(self
            .files
            .borrow()
            .keys()
            .filter(|file| file.parent() == Some(dir))
            .filter_map(|file| file.file_name()?.to_str().map(str::to_string))
            .collect())
    }

    /// No symlinks in memory: paths are returned unchanged.
    fn canonicalize(&self, path: &Path) -> io::Result<PathBuf> {
        Ok(path.to_path_buf())
    }
}
