// Connection parameters. Built once from explicit values and the process
// environment, then passed by reference to whoever opens a session.

use std::time::Duration;

use log::warn;

use crate::error::{Result, StorageError};

pub const ENV_USER: &str = "CYVERSE_IRODS_USER";
pub const ENV_PASSWORD: &str = "CYVERSE_IRODS_PASS";
pub const ENV_API_URL: &str = "CYVERSE_IRODS_HTTP_API";

pub const DEFAULT_ZONE: &str = "iplant";
pub const DEFAULT_API_URL: &str = "https://data.cyverse.org/irods-http-api/0.4.0";

/// Bytes sent per `write` and requested per `read`. The HTTP API rejects
/// request bodies above 8 MiB with its default settings.
pub const DEFAULT_CHUNK_SIZE: usize = 4 * 1024 * 1024;

/// Immutable connection parameters for one session.
#[derive(Clone)]
pub struct ConnectionConfig {
    pub zone: String,
    pub user: String,
    pub password: String,
    pub api_url: String,
    pub timeout: Option<Duration>,
    pub chunk_size: usize,
}

/// Optional overrides collected from the command line.
#[derive(Debug, Default, Clone)]
pub struct ConfigOverrides {
    pub user: Option<String>,
    pub password: Option<String>,
    pub zone: Option<String>,
    pub api_url: Option<String>,
    pub timeout: Option<Duration>,
}

impl ConnectionConfig {
    /// Resolve a configuration from the real process environment.
    pub fn from_env(overrides: ConfigOverrides) -> Result<Self> {
        Self::resolve(overrides, |key| std::env::var(key).ok())
    }

    /// Resolve a configuration using `lookup` for environment values.
    ///
    /// Explicit credentials are used only when both user and password are
    /// given; otherwise both come from `CYVERSE_IRODS_USER` and
    /// `CYVERSE_IRODS_PASS`, and a missing one is a `MissingCredential`.
    pub fn resolve<F>(overrides: ConfigOverrides, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(flag) = unpaired_credential(&overrides.user, &overrides.password) {
            warn!(
                "{} ignored: --user and --password are only used together, reading {} and {}",
                flag, ENV_USER, ENV_PASSWORD
            );
        }
        let (user, password) = match (overrides.user, overrides.password) {
            (Some(user), Some(password)) => (user, password),
            _ => {
                let user = lookup(ENV_USER).ok_or(StorageError::MissingCredential(ENV_USER))?;
                let password =
                    lookup(ENV_PASSWORD).ok_or(StorageError::MissingCredential(ENV_PASSWORD))?;
                (user, password)
            }
        };
        if user.is_empty() {
            return Err(StorageError::MissingCredential(ENV_USER));
        }

        let api_url = overrides
            .api_url
            .or_else(|| lookup(ENV_API_URL))
            .unwrap_or_else(|| DEFAULT_API_URL.to_string());

        Ok(ConnectionConfig {
            zone: overrides.zone.unwrap_or_else(|| DEFAULT_ZONE.to_string()),
            user,
            password,
            api_url: api_url.trim_end_matches('/').to_string(),
            timeout: overrides.timeout,
            chunk_size: DEFAULT_CHUNK_SIZE,
        })
    }

    /// The user's home collection, `/<zone>/home/<user>`.
    pub fn home_collection(&self) -> String {
        format!("/{}/home/{}", self.zone, self.user)
    }
}

/// The credential flag given without its partner, if any.
fn unpaired_credential(user: &Option<String>, password: &Option<String>) -> Option<&'static str> {
    match (user, password) {
        (Some(_), None) => Some("--user"),
        (None, Some(_)) => Some("--password"),
        _ => None,
    }
}

// Keep the password out of debug output and logs.
impl std::fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionConfig")
            .field("zone", &self.zone)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("api_url", &self.api_url)
            .field("timeout", &self.timeout)
            .field("chunk_size", &self.chunk_size)
            .finish()
    }
}
