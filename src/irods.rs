// The storage facade. Wraps one open store session and exposes the small
// set of operations the CLI needs: look things up, create collections,
// move single files either way and mirror a whole local tree.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use log::{debug, info};

use crate::api::HttpStore;
use crate::config::ConnectionConfig;
use crate::error::{Result, StorageError};
use crate::store::{AccessEntry, Collection, DataObject, Entry, RemoteStore};
use crate::target::{join_target, normalize_target};
use crate::walker::{expand_local, LocalTree};

/// Receives progress while `recursive_upload` runs. All methods default to
/// doing nothing.
pub trait UploadObserver {
    /// Called once before any remote call with the amount of work planned.
    fn planned(&mut self, _collections: usize, _files: usize, _bytes: u64) {}

    fn collection_created(&mut self, _path: &str) {}

    fn file_uploaded(&mut self, _path: &str, _bytes: u64) {}

    fn finished(&mut self, _summary: &UploadSummary) {}
}

/// Observer that ignores every event.
pub struct NoProgress;

impl UploadObserver for NoProgress {}

/// What a completed upload created, in creation order.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct UploadSummary {
    pub collections: Vec<String>,
    pub data_objects: Vec<String>,
    pub bytes: u64,
}

/// Facade over one remote store session.
///
/// Every remote path argument is normalized before it reaches the store.
pub struct CyVerseIrods<S> {
    store: S,
    user_dir: String,
}

impl CyVerseIrods<HttpStore> {
    /// Open a session with the HTTP API and wrap it.
    pub fn connect(config: &ConnectionConfig) -> Result<Self> {
        info!("connecting to {} as {}", config.api_url, config.user);
        let store = HttpStore::connect(config)?;
        Ok(Self::with_store(store, config.home_collection()))
    }
}

impl<S: RemoteStore> CyVerseIrods<S> {
    /// Wrap an already open store. `user_dir` is the home collection.
    pub fn with_store(store: S, user_dir: impl Into<String>) -> Self {
        CyVerseIrods {
            store,
            user_dir: user_dir.into(),
        }
    }

    pub fn user_dir(&self) -> &str {
        &self.user_dir
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Resolve a user supplied remote path: absolute paths are normalized,
    /// relative ones are placed under the home collection.
    pub fn resolve_remote(&self, path: &str) -> Result<String> {
        if path.starts_with('/') {
            normalize_target(path)
        } else {
            join_target(&self.user_dir, path)
        }
    }

    /// Data object at `path` if there is one, else the collection.
    pub fn get(&self, path: &str) -> Result<Entry> {
        let path = normalize_target(path)?;
        if self.store.data_object_exists(&path)? {
            return Ok(Entry::DataObject(self.store.get_data_object(&path)?));
        }
        if self.store.collection_exists(&path)? {
            return Ok(Entry::Collection(self.store.get_collection(&path)?));
        }
        Err(StorageError::NotFound(path))
    }

    /// List a collection. With `check_exists` an absent collection yields
    /// `Ok(None)` instead of `NotFound`.
    pub fn list_collection(&self, path: &str, check_exists: bool) -> Result<Option<Collection>> {
        let path = normalize_target(path)?;
        if check_exists && !self.store.collection_exists(&path)? {
            return Ok(None);
        }
        self.store.get_collection(&path).map(Some)
    }

    /// Stat a data object. With `check_exists` an absent object yields
    /// `Ok(None)` instead of `NotFound`.
    pub fn list_data_object(&self, path: &str, check_exists: bool) -> Result<Option<DataObject>> {
        let path = normalize_target(path)?;
        if check_exists && !self.store.data_object_exists(&path)? {
            return Ok(None);
        }
        self.store.get_data_object(&path).map(Some)
    }

    /// Create a collection, then apply `perm` if given. A collection that
    /// already exists counts as created.
    pub fn make_collection(&self, path: &str, perm: Option<&AccessEntry>) -> Result<String> {
        let path = normalize_target(path)?;
        match self.store.create_collection(&path) {
            Ok(()) => info!("Collection: {}", path),
            Err(StorageError::AlreadyExists(_)) => debug!("collection {} already exists", path),
            Err(e) => return Err(e),
        }
        if let Some(perm) = perm {
            self.store.set_collection_permission(&path, perm)?;
        }
        Ok(path)
    }

    /// Upload one local file to the data object at `remote`, replacing it,
    /// then apply `perm` if given.
    pub fn upload_file(&self, local: &Path, remote: &str, perm: Option<&AccessEntry>) -> Result<DataObject> {
        if !local.is_file() {
            return Err(StorageError::LocalNotFound(local.to_path_buf()));
        }
        let remote = normalize_target(remote)?;
        info!("File: {}", remote);
        let object = self.store.put(local, &remote)?;
        if let Some(perm) = perm {
            self.store.set_data_object_permission(&remote, perm)?;
        }
        Ok(object)
    }

    /// Copy a data object into `local_dest` (created if needed) under its
    /// remote name. Returns the written file path.
    pub fn download_file(&self, object: &DataObject, local_dest: &Path) -> Result<PathBuf> {
        let dest = expand_local(local_dest)?;
        fs::create_dir_all(&dest).map_err(|e| StorageError::io(&dest, e))?;

        let file_dest = dest.join(object.name());
        let file = File::create(&file_dest).map_err(|e| StorageError::io(&file_dest, e))?;
        let mut writer = BufWriter::new(file);
        let bytes = self.store.read(object, &mut writer)?;
        writer.flush().map_err(|e| StorageError::io(&file_dest, e))?;
        info!("downloaded {} ({} bytes) to {}", object.path, bytes, file_dest.display());
        Ok(file_dest)
    }

    /// Mirror `local` under the remote collection `dest`.
    ///
    /// A file is uploaded into `dest`. For a directory every sub-collection
    /// is created first, in sorted order, and then every file is written to
    /// its mirrored path. Nothing is rolled back if a call fails midway.
    pub fn recursive_upload(
        &self,
        local: &Path,
        dest: &str,
        perm: Option<&AccessEntry>,
        observer: &mut dyn UploadObserver,
    ) -> Result<UploadSummary> {
        let local = expand_local(local)?;
        let dest = normalize_target(dest)?;
        let mut summary = UploadSummary::default();

        if local.is_file() {
            let name = local
                .file_name()
                .and_then(|n| n.to_str())
                .ok_or_else(|| StorageError::InvalidPath(local.display().to_string()))?;
            let size = file_size(&local)?;
            observer.planned(1, 1, size);

            let created = self.make_collection(&dest, perm)?;
            observer.collection_created(&created);
            summary.collections.push(created);

            let object = self.upload_file(&local, &join_target(&dest, name)?, perm)?;
            observer.file_uploaded(&object.path, object.size);
            summary.bytes += object.size;
            summary.data_objects.push(object.path);
        } else if local.is_dir() {
            let tree = LocalTree::walk(&local)?;
            let mut total = 0;
            for f in &tree.files {
                total += file_size(&tree.local_path(f))?;
            }
            debug!(
                "walked {}: {} directories, {} files",
                local.display(),
                tree.directories.len(),
                tree.files.len()
            );
            observer.planned(tree.directories.len() + 1, tree.files.len(), total);

            let created = self.make_collection(&dest, perm)?;
            observer.collection_created(&created);
            summary.collections.push(created);

            for d in &tree.directories {
                let created = self.make_collection(&join_target(&dest, d)?, perm)?;
                observer.collection_created(&created);
                summary.collections.push(created);
            }
            for f in &tree.files {
                let object = self.upload_file(&tree.local_path(f), &join_target(&dest, f)?, perm)?;
                observer.file_uploaded(&object.path, object.size);
                summary.bytes += object.size;
                summary.data_objects.push(object.path);
            }
        } else {
            return Err(StorageError::LocalNotFound(local));
        }

        observer.finished(&summary);
        Ok(summary)
    }
}

fn file_size(path: &Path) -> Result<u64> {
    fs::metadata(path)
        .map(|m| m.len())
        .map_err(|e| StorageError::io(path, e))
}
