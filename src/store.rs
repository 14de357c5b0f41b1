// The remote store boundary. `CyVerseIrods` only ever talks to the data
// grid through this trait; `api::HttpStore` is the implementation used by
// the binary and tests substitute an in-memory one.

use std::fmt;
use std::io::Write;
use std::path::Path;
use std::str::FromStr;

use crate::error::{Result, StorageError};
use crate::target::target_name;

/// A remote directory and its immediate children.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Collection {
    pub path: String,
    pub subcollections: Vec<String>,
    pub data_objects: Vec<String>,
}

impl Collection {
    pub fn name(&self) -> &str {
        target_name(&self.path)
    }
}

/// A remote file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataObject {
    pub path: String,
    pub size: u64,
    pub checksum: Option<String>,
}

impl DataObject {
    pub fn name(&self) -> &str {
        target_name(&self.path)
    }
}

/// Result of `CyVerseIrods::get`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Entry {
    Collection(Collection),
    DataObject(DataObject),
}

/// Permission level of an access entry. `Null` removes access.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessLevel {
    Null,
    Read,
    Write,
    Own,
}

impl AccessLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccessLevel::Null => "null",
            AccessLevel::Read => "read",
            AccessLevel::Write => "write",
            AccessLevel::Own => "own",
        }
    }
}

/// Access-control entry: grants `level` on a path to `name` in `zone`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessEntry {
    pub level: AccessLevel,
    pub name: String,
    pub zone: Option<String>,
}

impl AccessEntry {
    /// The principal as the HTTP API expects it, `name` or `name#zone`.
    pub fn entity(&self) -> String {
        match &self.zone {
            Some(zone) => format!("{}#{}", self.name, zone),
            None => self.name.clone(),
        }
    }
}

impl fmt::Display for AccessEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.level.as_str(), self.entity())
    }
}

/// Parses `<level>:<user>[#zone]`, e.g. `read:public` or `own:bob#iplant`.
impl FromStr for AccessEntry {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || StorageError::InvalidAcl(s.to_string());
        let (level, principal) = s.split_once(':').ok_or_else(invalid)?;
        let level = match level.to_ascii_lowercase().as_str() {
            "null" => AccessLevel::Null,
            "read" => AccessLevel::Read,
            "write" => AccessLevel::Write,
            "own" => AccessLevel::Own,
            _ => return Err(invalid()),
        };
        let (name, zone) = match principal.split_once('#') {
            Some((name, zone)) if !zone.is_empty() => (name, Some(zone.to_string())),
            Some(_) => return Err(invalid()),
            None => (principal, None),
        };
        if name.is_empty() {
            return Err(invalid());
        }
        Ok(AccessEntry {
            level,
            name: name.to_string(),
            zone,
        })
    }
}

/// Operations the data grid must provide. All paths are normalized
/// absolute remote paths.
pub trait RemoteStore {
    fn collection_exists(&self, path: &str) -> Result<bool>;

    fn data_object_exists(&self, path: &str) -> Result<bool>;

    /// List a collection. Fails with `NotFound` when absent.
    fn get_collection(&self, path: &str) -> Result<Collection>;

    /// Stat a data object. Fails with `NotFound` when absent.
    fn get_data_object(&self, path: &str) -> Result<DataObject>;

    /// Create a collection. Fails with `AlreadyExists` when present.
    fn create_collection(&self, path: &str) -> Result<()>;

    /// Write the bytes of `local` to the data object at `path`, replacing it.
    fn put(&self, local: &Path, path: &str) -> Result<DataObject>;

    /// Copy the bytes of a data object into `sink`, returning the count.
    fn read(&self, object: &DataObject, sink: &mut dyn Write) -> Result<u64>;

    fn set_collection_permission(&self, path: &str, entry: &AccessEntry) -> Result<()>;

    fn set_data_object_permission(&self, path: &str, entry: &AccessEntry) -> Result<()>;
}
