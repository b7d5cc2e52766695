// src/runtime.rs

//! Runtime acquisition
//!
//! Downloads the pinned runtime archive for the host platform and extracts it
//! into the runtime directory. The archive is streamed straight through the
//! gzip decoder into the tar reader; nothing is buffered on disk.
//!
//! Network and HTTP failures are fatal and never retried.

use crate::error::{Error, Result};
use crate::layout::reset_dir;
use crate::platform::RuntimeRelease;
use crate::progress::Reporter;
use flate2::read::GzDecoder;
use reqwest::blocking::Client;
use reqwest::redirect::Policy;
use std::io::Read;
use std::path::{Component, Path, PathBuf};
use tar::{Archive, EntryType};
use tracing::{debug, info};

/// Maximum redirects followed for a runtime download
const MAX_REDIRECTS: usize = 10;

/// Downloads and installs runtime releases
pub struct RuntimeAcquirer {
    client: Client,
    mirror: String,
}

impl RuntimeAcquirer {
    /// Create an acquirer downloading from the given mirror
    pub fn new(mirror: &str) -> Result<Self> {
        let client = Client::builder()
            .redirect(Policy::limited(MAX_REDIRECTS))
            .timeout(None)
            .user_agent(concat!("dekun/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::NetworkError(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            mirror: mirror.to_string(),
        })
    }

    /// Download `release` and install it into `runtime_dir`
    ///
    /// Any previous content of `runtime_dir` is deleted first.
    pub fn install(
        &self,
        release: &RuntimeRelease,
        runtime_dir: &Path,
        reporter: &dyn Reporter,
    ) -> Result<usize> {
        let url = release.download_url(&self.mirror);
        info!("Fetching runtime from {}", url);

        let response = self
            .client
            .get(&url)
            .send()
            .map_err(|e| Error::NetworkError(format!("Failed to fetch {}: {}", url, e)))?;

        if !response.status().is_success() {
            return Err(Error::NetworkError(format!(
                "HTTP {} from {}",
                response.status(),
                url
            )));
        }

        let bar = reporter.transfer(response.content_length(), &release.archive_name());
        let reader = bar.wrap_read(response);

        reset_dir(runtime_dir)?;
        let count = extract_archive(reader, runtime_dir);
        bar.finish_and_clear();

        let count = count?;
        info!("Extracted {} runtime entries into {}", count, runtime_dir.display());
        Ok(count)
    }
}

/// Extract a gzip-compressed tar stream into `dest`
///
/// The single top-level directory of the archive is stripped. Entries that
/// would land outside `dest` are rejected.
pub fn extract_archive<R: Read>(reader: R, dest: &Path) -> Result<usize> {
    let mut archive = Archive::new(GzDecoder::new(reader));
    archive.set_preserve_permissions(true);

    let entries = archive
        .entries()
        .map_err(|e| Error::ArchiveError(format!("Failed to read archive entries: {e}")))?;

    let mut count = 0;
    for entry in entries {
        let mut entry =
            entry.map_err(|e| Error::ArchiveError(format!("Failed to read archive entry: {e}")))?;

        let path = entry
            .path()
            .map_err(|e| Error::ArchiveError(format!("Failed to get entry path: {e}")))?
            .into_owned();

        let Some(relative) = strip_top_level(&path)? else {
            continue;
        };

        if matches!(entry.header().entry_type(), EntryType::XGlobalHeader | EntryType::XHeader) {
            continue;
        }

        let target = dest.join(&relative);
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
        }

        debug!("Extracting {}", relative.display());
        if entry.header().entry_type() == EntryType::Link {
            link_entry(&entry, dest, &target)?;
            count += 1;
            continue;
        }

        entry.unpack(&target).map_err(|e| {
            Error::ArchiveError(format!("Failed to extract {}: {}", relative.display(), e))
        })?;
        count += 1;
    }

    Ok(count)
}

/// Hard links name their source by archive path, so it needs the same stripping
fn link_entry<R: Read>(entry: &tar::Entry<'_, R>, dest: &Path, target: &Path) -> Result<()> {
    let source = entry
        .link_name()
        .map_err(|e| Error::ArchiveError(format!("Failed to read link name: {e}")))?
        .ok_or_else(|| Error::ArchiveError(format!("Hard link without source: {}", target.display())))?;

    let source = strip_top_level(&source)?.ok_or_else(|| {
        Error::ArchiveError(format!("Hard link to archive root: {}", target.display()))
    })?;

    std::fs::hard_link(dest.join(source), target).map_err(|e| Error::io(target, e))
}

/// Drop the first path component; `None` for the top-level entry itself
fn strip_top_level(path: &Path) -> Result<Option<PathBuf>> {
    let mut components = path.components().skip_while(|c| matches!(c, Component::CurDir));
    components.next();

    let mut relative = PathBuf::new();
    for component in components {
        match component {
            Component::Normal(part) => relative.push(part),
            Component::CurDir => {}
            _ => {
                return Err(Error::ArchiveError(format!(
                    "Refusing unsafe archive path: {}",
                    path.display()
                )));
            }
        }
    }

    if relative.as_os_str().is_empty() {
        Ok(None)
    } else {
        Ok(Some(relative))
    }
}
