// Terminal side of the CLI: progress display, the password prompt and
// rendering of lookups. The library never prints; the binary goes through
// these helpers.

use std::fmt::Write as _;
use std::time::Duration;

use anyhow::Result;
use dialoguer::Password;
use indicatif::{ProgressBar, ProgressStyle};

use crate::irods::{UploadObserver, UploadSummary};
use crate::store::Entry;

const BAR_TEMPLATE: &str = "{spinner} [{elapsed_precise}] {wide_bar} {bytes}/{total_bytes} {msg}";

/// Spinner shown while a single blocking call runs (connect, lookups).
pub fn spinner(message: &str) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner} {msg}") {
        spinner.set_style(style);
    }
    spinner.set_message(message.to_string());
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner
}

/// Byte progress bar for `recursive_upload`.
pub struct ProgressReporter {
    bar: ProgressBar,
}

impl ProgressReporter {
    pub fn new() -> Self {
        ProgressReporter {
            bar: ProgressBar::new(0),
        }
    }

    /// A reporter that draws nothing, for `--quiet`.
    pub fn hidden() -> Self {
        ProgressReporter {
            bar: ProgressBar::hidden(),
        }
    }
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl UploadObserver for ProgressReporter {
    fn planned(&mut self, collections: usize, files: usize, bytes: u64) {
        if let Ok(style) = ProgressStyle::with_template(BAR_TEMPLATE) {
            self.bar.set_style(style);
        }
        self.bar.set_length(bytes);
        self.bar
            .set_message(format!("{} collections, {} files", collections, files));
    }

    fn collection_created(&mut self, path: &str) {
        self.bar.set_message(format!("collection {}", path));
    }

    fn file_uploaded(&mut self, path: &str, bytes: u64) {
        self.bar.inc(bytes);
        self.bar.set_message(format!("file {}", path));
    }

    fn finished(&mut self, summary: &UploadSummary) {
        self.bar.finish_with_message(format!(
            "{} collections, {} files",
            summary.collections.len(),
            summary.data_objects.len()
        ));
    }
}

/// Ask for the password of `user` without echoing it.
pub fn prompt_password(user: &str) -> Result<String> {
    let password = Password::new()
        .with_prompt(format!("iRODS password for {}", user))
        .interact()?;
    Ok(password)
}

/// Render a collection listing or data object stat for the terminal.
pub fn render_entry(entry: &Entry) -> String {
    let mut out = String::new();
    match entry {
        Entry::Collection(collection) => {
            let _ = writeln!(out, "C- {}", collection.path);
            for sub in &collection.subcollections {
                let _ = writeln!(out, "  C- {}", sub);
            }
            for object in &collection.data_objects {
                let _ = writeln!(out, "  {}", object);
            }
        }
        Entry::DataObject(object) => {
            let _ = write!(out, "{}  {} bytes", object.path, object.size);
            if let Some(checksum) = &object.checksum {
                let _ = write!(out, "  {}", checksum);
            }
            out.push('\n');
        }
    }
    out
}
