// In-memory `RemoteStore` that records every call, shared by the
// integration tests.
#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::io::Write;
use std::path::Path;

use cyverse_irods::{AccessEntry, Collection, DataObject, RemoteStore, Result, StorageError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Exists(String),
    Get(String),
    Create(String),
    Put(String),
    Read(String),
    Permission(String, String),
}

#[derive(Default)]
pub struct MemoryStore {
    pub collections: RefCell<BTreeSet<String>>,
    pub objects: RefCell<BTreeMap<String, Vec<u8>>>,
    pub calls: RefCell<Vec<Call>>,
}

impl MemoryStore {
    pub fn with_home(home: &str) -> Self {
        let store = MemoryStore::default();
        store.collections.borrow_mut().insert(home.to_string());
        store
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.borrow().clone()
    }

    fn record(&self, call: Call) {
        self.calls.borrow_mut().push(call);
    }
}

impl RemoteStore for MemoryStore {
    fn collection_exists(&self, path: &str) -> Result<bool> {
        self.record(Call::Exists(path.to_string()));
        Ok(self.collections.borrow().contains(path))
    }

    fn data_object_exists(&self, path: &str) -> Result<bool> {
        self.record(Call::Exists(path.to_string()));
        Ok(self.objects.borrow().contains_key(path))
    }

    fn get_collection(&self, path: &str) -> Result<Collection> {
        self.record(Call::Get(path.to_string()));
        if !self.collections.borrow().contains(path) {
            return Err(StorageError::NotFound(path.to_string()));
        }
        let prefix = format!("{}/", path);
        let child = |p: &&String| p.starts_with(&prefix) && !p[prefix.len()..].contains('/');
        Ok(Collection {
            path: path.to_string(),
            subcollections: self.collections.borrow().iter().filter(child).cloned().collect(),
            data_objects: self.objects.borrow().keys().filter(child).cloned().collect(),
        })
    }

    fn get_data_object(&self, path: &str) -> Result<DataObject> {
        self.record(Call::Get(path.to_string()));
        let objects = self.objects.borrow();
        let data = objects
            .get(path)
            .ok_or_else(|| StorageError::NotFound(path.to_string()))?;
        Ok(DataObject {
            path: path.to_string(),
            size: data.len() as u64,
            checksum: None,
        })
    }

    fn create_collection(&self, path: &str) -> Result<()> {
        self.record(Call::Create(path.to_string()));
        if !self.collections.borrow_mut().insert(path.to_string()) {
            return Err(StorageError::AlreadyExists(path.to_string()));
        }
        Ok(())
    }

    fn put(&self, local: &Path, path: &str) -> Result<DataObject> {
        self.record(Call::Put(path.to_string()));
        let data = fs::read(local).map_err(|e| StorageError::io(local, e))?;
        let size = data.len() as u64;
        self.objects.borrow_mut().insert(path.to_string(), data);
        Ok(DataObject {
            path: path.to_string(),
            size,
            checksum: None,
        })
    }

    fn read(&self, object: &DataObject, sink: &mut dyn Write) -> Result<u64> {
        self.record(Call::Read(object.path.clone()));
        let objects = self.objects.borrow();
        let data = objects
            .get(&object.path)
            .ok_or_else(|| StorageError::NotFound(object.path.clone()))?;
        sink.write_all(data)
            .map_err(|e| StorageError::io(object.name(), e))?;
        Ok(data.len() as u64)
    }

    fn set_collection_permission(&self, path: &str, entry: &AccessEntry) -> Result<()> {
        self.record(Call::Permission(path.to_string(), entry.to_string()));
        Ok(())
    }

    fn set_data_object_permission(&self, path: &str, entry: &AccessEntry) -> Result<()> {
        self.record(Call::Permission(path.to_string(), entry.to_string()));
        Ok(())
    }
}
