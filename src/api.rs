// HTTP client for the iRODS HTTP API. It is a small blocking client: one
// request per store operation (per chunk for file transfers), no retries,
// no connection juggling beyond what reqwest does on its own.

use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use log::debug;
use reqwest::blocking::{multipart, Client, RequestBuilder, Response};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::config::ConnectionConfig;
use crate::error::{Result, StorageError};
use crate::store::{AccessEntry, Collection, DataObject, RemoteStore};

/// iRODS status codes the store maps to typed errors.
pub const CAT_NO_ROWS_FOUND: i64 = -808000;
pub const CATALOG_ALREADY_HAS_ITEM_BY_THAT_NAME: i64 = -809000;
pub const OBJ_PATH_DOES_NOT_EXIST: i64 = -1800000;
pub const NOT_A_COLLECTION: i64 = -1811000;
pub const NOT_A_DATA_OBJECT: i64 = -1812000;

/// Error names that mean "exists, but is the other kind of entry".
const WRONG_KIND_NAMES: [&str; 2] = ["NOT_A_COLLECTION", "NOT_A_DATA_OBJECT"];

/// Blocking client holding the reqwest client, the API base URL and the
/// bearer token returned by `/authenticate`.
pub struct HttpStore {
    client: Client,
    base_url: String,
    token: String,
    chunk_size: usize,
}

/// The `irods_response` object every endpoint returns.
#[derive(Deserialize, Debug)]
struct IrodsStatus {
    status_code: i64,
    #[serde(default)]
    status_message: Option<String>,
}

#[derive(Deserialize, Debug)]
struct Envelope<T> {
    irods_response: IrodsStatus,
    #[serde(flatten)]
    body: T,
}

#[derive(Deserialize, Debug)]
struct StatBody {
    #[serde(rename = "type", default)]
    kind: Option<String>,
    #[serde(default)]
    size: Option<u64>,
    #[serde(default)]
    checksum: Option<String>,
}

#[derive(Deserialize, Debug)]
struct ListBody {
    #[serde(default)]
    entries: Vec<String>,
}

#[derive(Deserialize, Debug)]
struct Empty {}

impl HttpStore {
    /// Build the HTTP client and authenticate with basic credentials. The
    /// returned store carries the bearer token for every later call.
    pub fn connect(config: &ConnectionConfig) -> Result<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build()?;

        let url = format!("{}/authenticate", config.api_url);
        debug!("authenticating {} against {}", config.user, url);
        let res = client
            .post(&url)
            .basic_auth(&config.user, Some(&config.password))
            .send()?;
        if !res.status().is_success() {
            let status = res.status();
            let txt = res.text().unwrap_or_default();
            return Err(StorageError::Api {
                status_code: i64::from(status.as_u16()),
                message: format!("authentication failed: {}", txt.trim()),
            });
        }
        let token = res.text()?.trim().to_string();

        Ok(HttpStore {
            client,
            base_url: config.api_url.clone(),
            token,
            chunk_size: config.chunk_size.max(1),
        })
    }

    fn endpoint(&self, name: &str) -> String {
        format!("{}/{}", self.base_url, name)
    }

    fn get(&self, endpoint: &str, query: &[(&str, &str)]) -> RequestBuilder {
        self.client
            .get(self.endpoint(endpoint))
            .bearer_auth(&self.token)
            .query(query)
    }

    fn post(&self, endpoint: &str, form: &[(&str, &str)]) -> RequestBuilder {
        self.client
            .post(self.endpoint(endpoint))
            .bearer_auth(&self.token)
            .form(form)
    }

    /// Send a request and decode the JSON envelope, turning iRODS status
    /// codes into typed errors for `path`.
    fn call<T: DeserializeOwned>(&self, req: RequestBuilder, path: &str) -> Result<T> {
        let res = req.send()?;
        let status = res.status();
        if status == StatusCode::NOT_FOUND {
            return Err(StorageError::NotFound(path.to_string()));
        }
        let txt = res.text()?;
        let envelope: Envelope<T> = match serde_json::from_str(&txt) {
            Ok(envelope) => envelope,
            Err(_) if !status.is_success() => {
                return Err(StorageError::Api {
                    status_code: i64::from(status.as_u16()),
                    message: txt.trim().to_string(),
                })
            }
            Err(e) => return Err(e.into()),
        };
        check_status(envelope.irods_response, path)?;
        Ok(envelope.body)
    }

    fn stat(&self, endpoint: &str, path: &str) -> Result<StatBody> {
        debug!("stat {} {}", endpoint, path);
        self.call(self.get(endpoint, &[("op", "stat"), ("lpath", path)]), path)
    }

    fn exists(&self, endpoint: &str, path: &str) -> Result<bool> {
        match self.stat(endpoint, path) {
            Ok(_) => Ok(true),
            Err(StorageError::NotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    fn set_permission(&self, endpoint: &str, path: &str, entry: &AccessEntry) -> Result<()> {
        let entity = entry.entity();
        debug!("set permission {} on {}", entry, path);
        let _: Empty = self.call(
            self.post(
                endpoint,
                &[
                    ("op", "set_permission"),
                    ("lpath", path),
                    ("entity-name", entity.as_str()),
                    ("permission", entry.level.as_str()),
                ],
            ),
            path,
        )?;
        Ok(())
    }

    /// Write one chunk at `offset`. Only the first chunk truncates.
    fn write_chunk(&self, path: &str, file_name: &str, chunk: Vec<u8>, offset: u64) -> Result<()> {
        debug!("write {} bytes at {} to {}", chunk.len(), offset, path);
        let part = multipart::Part::bytes(chunk)
            .file_name(file_name.to_string())
            .mime_str("application/octet-stream")?;
        let form = multipart::Form::new()
            .text("op", "write")
            .text("lpath", path.to_string())
            .text("offset", offset.to_string())
            .text("truncate", if offset == 0 { "1" } else { "0" })
            .part("bytes", part);

        let req = self
            .client
            .post(self.endpoint("data-objects"))
            .bearer_auth(&self.token)
            .multipart(form);
        let _: Empty = self.call(req, path)?;
        Ok(())
    }

    fn read_response(res: Response, path: &str) -> Result<Response> {
        match res.status() {
            StatusCode::NOT_FOUND => Err(StorageError::NotFound(path.to_string())),
            status if !status.is_success() => {
                let txt = res.text().unwrap_or_default();
                Err(StorageError::Api {
                    status_code: i64::from(status.as_u16()),
                    message: txt.trim().to_string(),
                })
            }
            _ => Ok(res),
        }
    }
}

/// Map an `irods_response` to a typed error. A stat of the wrong kind
/// (collection vs data object) counts as not found for that kind.
fn check_status(status: IrodsStatus, path: &str) -> Result<()> {
    let message = status.status_message.unwrap_or_default();
    match status.status_code {
        0 => Ok(()),
        CAT_NO_ROWS_FOUND | OBJ_PATH_DOES_NOT_EXIST | NOT_A_COLLECTION | NOT_A_DATA_OBJECT => {
            Err(StorageError::NotFound(path.to_string()))
        }
        CATALOG_ALREADY_HAS_ITEM_BY_THAT_NAME => Err(StorageError::AlreadyExists(path.to_string())),
        _ if WRONG_KIND_NAMES.iter().any(|name| message.contains(name)) => {
            Err(StorageError::NotFound(path.to_string()))
        }
        code => Err(StorageError::Api {
            status_code: code,
            message,
        }),
    }
}

impl RemoteStore for HttpStore {
    fn collection_exists(&self, path: &str) -> Result<bool> {
        self.exists("collections", path)
    }

    fn data_object_exists(&self, path: &str) -> Result<bool> {
        self.exists("data-objects", path)
    }

    fn get_collection(&self, path: &str) -> Result<Collection> {
        debug!("list collection {}", path);
        let body: ListBody = self.call(self.get("collections", &[("op", "list"), ("lpath", path)]), path)?;

        // `list` returns bare paths, so stat each entry as a collection to
        // sort them into sub-collections and data objects
        let mut collection = Collection {
            path: path.to_string(),
            subcollections: Vec::new(),
            data_objects: Vec::new(),
        };
        for entry in body.entries {
            match self.stat("collections", &entry) {
                Ok(_) => collection.subcollections.push(entry),
                Err(StorageError::NotFound(_)) => collection.data_objects.push(entry),
                Err(e) => return Err(e),
            }
        }
        collection.subcollections.sort();
        collection.data_objects.sort();
        Ok(collection)
    }

    fn get_data_object(&self, path: &str) -> Result<DataObject> {
        let stat = self.stat("data-objects", path)?;
        if stat.kind.as_deref().is_some_and(|k| k != "data_object") {
            return Err(StorageError::NotFound(path.to_string()));
        }
        Ok(DataObject {
            path: path.to_string(),
            size: stat.size.unwrap_or(0),
            checksum: stat.checksum.filter(|c| !c.is_empty()),
        })
    }

    fn create_collection(&self, path: &str) -> Result<()> {
        debug!("create collection {}", path);
        let _: Empty = self.call(
            self.post(
                "collections",
                &[("op", "create"), ("lpath", path), ("create-intermediates", "1")],
            ),
            path,
        )?;
        Ok(())
    }

    /// Writes in `chunk_size` pieces. An empty file still sends one
    /// truncating write so the data object exists afterwards.
    fn put(&self, local: &Path, path: &str) -> Result<DataObject> {
        let mut file = File::open(local).map_err(|e| StorageError::io(local, e))?;
        let file_name = local
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("data")
            .to_string();
        debug!("put {} -> {}", local.display(), path);

        let chunk_size = self.chunk_size as u64;
        let mut offset = 0u64;
        loop {
            let mut chunk = Vec::new();
            (&mut file)
                .take(chunk_size)
                .read_to_end(&mut chunk)
                .map_err(|e| StorageError::io(local, e))?;
            let len = chunk.len() as u64;
            if len == 0 && offset > 0 {
                break;
            }
            self.write_chunk(path, &file_name, chunk, offset)?;
            offset += len;
            if len < chunk_size {
                break;
            }
        }

        Ok(DataObject {
            path: path.to_string(),
            size: offset,
            checksum: None,
        })
    }

    /// Reads `chunk_size` bytes per request until a short read or the
    /// known size is reached.
    fn read(&self, object: &DataObject, sink: &mut dyn Write) -> Result<u64> {
        debug!("read {} ({} bytes)", object.path, object.size);
        let chunk_size = self.chunk_size as u64;
        let count = chunk_size.to_string();
        let mut offset = 0u64;
        loop {
            let start = offset.to_string();
            let res = self
                .get(
                    "data-objects",
                    &[
                        ("op", "read"),
                        ("lpath", object.path.as_str()),
                        ("offset", start.as_str()),
                        ("count", count.as_str()),
                    ],
                )
                .send()?;
            let mut res = Self::read_response(res, &object.path)?;
            let n = std::io::copy(&mut res, sink).map_err(|e| StorageError::io(object.name(), e))?;
            offset += n;
            if n < chunk_size || (object.size > 0 && offset >= object.size) {
                break;
            }
        }
        Ok(offset)
    }

    fn set_collection_permission(&self, path: &str, entry: &AccessEntry) -> Result<()> {
        self.set_permission("collections", path, entry)
    }

    fn set_data_object_permission(&self, path: &str, entry: &AccessEntry) -> Result<()> {
        self.set_permission("data-objects", path, entry)
    }
}
