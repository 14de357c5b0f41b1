// Library root
// -----------
// Uploads local files and directory trees to a CyVerse iRODS data store,
// mirroring directories as collections. The `cyrods` binary (`main.rs`)
// is a thin layer over these modules.
//
// Module responsibilities:
// - `target`: remote path normalisation applied before every store call.
// - `config`: immutable connection parameters from flags and environment.
// - `store`: the `RemoteStore` trait and the collection/data object types.
// - `api`: `RemoteStore` over the iRODS HTTP API (blocking reqwest).
// - `walker`: local path expansion and directory tree walking.
// - `irods`: the `CyVerseIrods` facade (get, list, create, upload,
//   download, recursive upload).
// - `ui`: progress bar, password prompt and listing output.
// - `cli`: flag parsing and dispatch for the binary.
pub mod api;
pub mod cli;
pub mod config;
pub mod error;
pub mod irods;
pub mod store;
pub mod target;
pub mod ui;
pub mod walker;

pub use config::ConnectionConfig;
pub use error::{Result, StorageError};
pub use irods::{CyVerseIrods, NoProgress, UploadObserver, UploadSummary};
pub use store::{AccessEntry, AccessLevel, Collection, DataObject, Entry, RemoteStore};
pub use target::normalize_target;
