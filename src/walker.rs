// Local side of an upload: expanding user supplied paths and walking a
// directory tree into root-relative, `/`-separated entries.

use std::path::{Component, Path, PathBuf};

use log::warn;
use walkdir::WalkDir;

use crate::error::{Result, StorageError};

/// Directories and files below a walked root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalTree {
    /// Absolute root the entries are relative to.
    pub root: PathBuf,
    /// Relative directory paths, sorted; a parent always precedes its children.
    pub directories: Vec<String>,
    /// Relative file paths, sorted.
    pub files: Vec<String>,
}

impl LocalTree {
    /// Walk `root` recursively. The root itself is not listed.
    ///
    /// Symlinks to files are listed as files. Symlinked directories are
    /// not descended and are skipped with a warning.
    pub fn walk(root: &Path) -> Result<Self> {
        let mut directories = Vec::new();
        let mut files = Vec::new();

        for entry in WalkDir::new(root).min_depth(1).follow_links(false) {
            let entry = entry.map_err(|e| {
                let path = e.path().unwrap_or(root).to_path_buf();
                let source = e
                    .into_io_error()
                    .unwrap_or_else(|| std::io::Error::new(std::io::ErrorKind::Other, "filesystem loop"));
                StorageError::io(path, source)
            })?;

            let relative = relative_posix(entry.path(), root)?;
            if entry.file_type().is_dir() {
                directories.push(relative);
            } else if entry.path().is_file() {
                files.push(relative);
            } else {
                warn!("skipping {}: not a regular file or directory", entry.path().display());
            }
        }

        directories.sort();
        files.sort();
        Ok(LocalTree {
            root: root.to_path_buf(),
            directories,
            files,
        })
    }

    /// Absolute local path of a relative file entry.
    pub fn local_path(&self, relative: &str) -> PathBuf {
        relative
            .split('/')
            .fold(self.root.clone(), |path, segment| path.join(segment))
    }
}

/// `path` relative to `root`, joined with `/`. Non UTF-8 names are rejected
/// since they cannot be used as remote names.
fn relative_posix(path: &Path, root: &Path) -> Result<String> {
    let relative = path
        .strip_prefix(root)
        .map_err(|_| StorageError::InvalidPath(path.display().to_string()))?;
    let mut segments = Vec::new();
    for component in relative.components() {
        let segment = component
            .as_os_str()
            .to_str()
            .ok_or_else(|| StorageError::InvalidPath(path.display().to_string()))?;
        segments.push(segment);
    }
    Ok(segments.join("/"))
}

/// Expand a leading `~` to the home directory and make the path absolute,
/// resolving `.` and `..` lexically.
pub fn expand_local(path: &Path) -> Result<PathBuf> {
    let expanded = match path.strip_prefix("~") {
        Ok(rest) => {
            let home = dirs::home_dir()
                .ok_or_else(|| StorageError::InvalidPath("cannot determine home directory".into()))?;
            home.join(rest)
        }
        Err(_) => path.to_path_buf(),
    };
    let absolute = if expanded.is_absolute() {
        expanded
    } else {
        std::env::current_dir()
            .map_err(|e| StorageError::io(&expanded, e))?
            .join(&expanded)
    };
    Ok(lexical_normalize(&absolute))
}

fn lexical_normalize(path: &Path) -> PathBuf {
    let mut components: Vec<Component> = Vec::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if matches!(components.last(), Some(Component::Normal(_))) {
                    components.pop();
                } else if !matches!(components.last(), Some(Component::RootDir | Component::Prefix(_))) {
                    components.push(component);
                }
            }
            _ => components.push(component),
        }
    }
    components.iter().collect()
}
