// Command line surface of `cyrods`. Parsing lives here so it can be tested
// without a terminal; `main.rs` only wires logging and error output.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use clap::Parser;
use log::info;

use crate::config::{ConfigOverrides, ConnectionConfig};
use crate::irods::{CyVerseIrods, UploadObserver};
use crate::store::{AccessEntry, RemoteStore};
use crate::ui::{self, ProgressReporter};

/// Prefix of the remote destination generated when none is given.
pub const DEFAULT_DESTINATION_PREFIX: &str = "G-OnRamp_Hub";

#[derive(Parser, Debug, Default)]
#[command(name = "cyrods", version, about = "CyVerse/iRODS interaction")]
pub struct Cli {
    /// Upload --localsource to --remotedestination
    #[arg(long, requires = "localsource")]
    pub upload: bool,

    /// Local file or directory to upload
    #[arg(long)]
    pub localsource: Option<PathBuf>,

    /// Remote collection; relative paths are placed under the home collection
    #[arg(long)]
    pub remotedestination: Option<String>,

    /// iRODS user, used together with --password
    #[arg(long)]
    pub user: Option<String>,

    /// iRODS password, used together with --user
    #[arg(long)]
    pub password: Option<String>,

    /// Prompt for the password of --user
    #[arg(long, requires = "user", conflicts_with = "password")]
    pub ask_password: bool,

    /// Upload to G-OnRamp_Hub_<UTC timestamp> even when --remotedestination is given
    #[arg(long)]
    pub timestamp: bool,

    /// Access entry applied to everything uploaded, <null|read|write|own>:<user>[#zone]
    #[arg(long)]
    pub acl: Option<AccessEntry>,

    /// Print a remote collection listing or data object
    #[arg(long, value_name = "REMOTE")]
    pub get: Option<String>,

    /// Download a remote data object
    #[arg(long, value_name = "REMOTE")]
    pub download: Option<String>,

    /// Local directory downloads are written to
    #[arg(long, default_value = ".")]
    pub localdestination: PathBuf,

    /// Base URL of the iRODS HTTP API
    #[arg(long)]
    pub api_url: Option<String>,

    /// iRODS zone
    #[arg(long)]
    pub zone: Option<String>,

    /// Request timeout in seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Do not draw a progress bar
    #[arg(short, long)]
    pub quiet: bool,
}

impl Cli {
    /// Overrides for `ConnectionConfig`, prompting for the password when
    /// `--ask-password` is set.
    pub fn overrides(&self) -> Result<ConfigOverrides> {
        let password = match (&self.user, &self.password) {
            (Some(user), None) if self.ask_password => Some(ui::prompt_password(user)?),
            _ => self.password.clone(),
        };
        Ok(ConfigOverrides {
            user: self.user.clone(),
            password,
            zone: self.zone.clone(),
            api_url: self.api_url.clone(),
            timeout: self.timeout.map(Duration::from_secs),
        })
    }

    /// Remote destination for an upload started at `now`.
    ///
    /// `G-OnRamp_Hub_<timestamp>` when --remotedestination is absent or
    /// --timestamp is set, otherwise the given destination as is.
    pub fn destination(&self, now: DateTime<Utc>) -> String {
        match &self.remotedestination {
            Some(dest) if !self.timestamp => dest.clone(),
            _ => format!("{}{}", DEFAULT_DESTINATION_PREFIX, now.format("_%Y%m%dT%H%M%S")),
        }
    }
}

/// Resolve configuration, connect and run the requested operations.
pub fn run(cli: Cli) -> Result<()> {
    let config = ConnectionConfig::from_env(cli.overrides()?)?;

    let spinner = (!cli.quiet).then(|| ui::spinner("Connecting..."));
    let conn = CyVerseIrods::connect(&config);
    if let Some(spinner) = spinner {
        spinner.finish_and_clear();
    }
    let conn = conn.with_context(|| format!("connecting to {}", config.api_url))?;

    let mut reporter = if cli.quiet {
        ProgressReporter::hidden()
    } else {
        ProgressReporter::new()
    };
    execute(&cli, &conn, Utc::now(), &mut reporter)
}

/// Run the operations selected by `cli` against an open facade.
pub fn execute<S: RemoteStore>(
    cli: &Cli,
    conn: &CyVerseIrods<S>,
    now: DateTime<Utc>,
    observer: &mut dyn UploadObserver,
) -> Result<()> {
    if let Some(remote) = &cli.get {
        let remote = conn.resolve_remote(remote)?;
        let entry = conn.get(&remote).with_context(|| format!("looking up {}", remote))?;
        print!("{}", ui::render_entry(&entry));
    }

    if let Some(remote) = &cli.download {
        let remote = conn.resolve_remote(remote)?;
        let object = conn
            .list_data_object(&remote, true)?
            .with_context(|| format!("data object {} not found", remote))?;
        let written = conn
            .download_file(&object, &cli.localdestination)
            .with_context(|| format!("downloading {}", remote))?;
        println!("{}", written.display());
    }

    if cli.upload {
        let Some(source) = &cli.localsource else {
            bail!("--upload requires --localsource, --remotedestination optional");
        };
        let dest = conn.resolve_remote(&cli.destination(now))?;
        info!("uploading {} to {}", source.display(), dest);
        let summary = conn
            .recursive_upload(source, &dest, cli.acl.as_ref(), observer)
            .with_context(|| format!("uploading {} to {}", source.display(), dest))?;
        println!(
            "{}: {} collections, {} files, {} bytes",
            dest,
            summary.collections.len(),
            summary.data_objects.len(),
            summary.bytes
        );
    }
    Ok(())
}
