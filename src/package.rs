//! Mapping file paths to the installed package that owns them.

use std::path::{Component, Path, PathBuf};

use tracing::warn;

use crate::fs::FileSystem;
use crate::models::ModuleReference;

pub const MODULES_DIR: &str = "node_modules";

/// Derives package identities from file paths under a set of module roots.
///
/// Pure path computation: nothing is read from disk and existence is not checked.
#[derive(Debug, Clone, Default)]
pub struct PackageNameResolver {
    roots: Vec<PathBuf>,
}

impl PackageNameResolver {
    /// Roots are tried in the given order; the first one containing a path wins.
    pub fn new<I, P>(roots: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let roots = roots
            .into_iter()
            .filter_map(|root| {
                let root = root.as_ref();
                let normalized = normalize_path(root);
                if normalized.is_none() {
                    warn!(root = %root.display(), "ignoring module root above the filesystem root");
                }
                normalized
            })
            .collect();
        Self { roots }
    }

    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    /// Resolve the package owning `path`, or `None` when the path is outside every
    /// root or sits directly inside one (stray files belong to no package).
    pub fn resolve(&self, path: &Path) -> Option<ModuleReference> {
        let path = normalize_path(path)?;
        let root = self.roots.iter().find(|root| path.starts_with(root))?;
        let rest = path.strip_prefix(root).ok()?;

        let segments = rest
            .components()
            .map(|c| match c {
                Component::Normal(s) => s.to_str(),
                _ => None,
            })
            .collect::<Option<Vec<&str>>>()?;

        if segments.len() < 2 {
            return None;
        }

        let (name, directory) = if segments[0].starts_with('@') {
            (
                format!("{}/{}", segments[0], segments[1]),
                root.join(segments[0]).join(segments[1]),
            )
        } else {
            (segments[0].to_string(), root.join(segments[0]))
        };

        Some(ModuleReference { name, directory })
    }
}

/// Lexically resolve `.` and `..` components.
///
/// Returns `None` when `..` would climb above the filesystem root. Leading `..`
/// in a relative path is kept as is.
pub fn normalize_path(path: &Path) -> Option<PathBuf> {
    let mut parts: Vec<Component> = Vec::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match parts.last() {
                Some(Component::Normal(_)) => {
                    parts.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => return None,
                _ => parts.push(component),
            },
            other => parts.push(other),
        }
    }
    Some(parts.iter().collect())
}

/// Locate the directory holding the project's `node_modules`.
///
/// A start path already inside `node_modules` yields the directory before it;
/// otherwise parents are searched upwards. `None` once the filesystem root is passed.
pub fn find_build_root(fs: &dyn FileSystem, start: &Path) -> Option<PathBuf> {
    let start = normalize_path(start)?;

    if let Some(index) = start
        .components()
        .position(|c| c.as_os_str() == MODULES_DIR)
    {
        return Some(start.components().take(index).collect());
    }

    let mut current = start.as_path();
    loop {
        if fs.is_dir(&current.join(MODULES_DIR)) {
            return Some(current.to_path_buf());
        }
        current = current.parent()?;
    }
}
