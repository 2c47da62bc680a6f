//! Plugin installer: download, verify and place plugin binaries
//!
//! Binaries are streamed into a `.part` file next to their target and only
//! renamed into place once their digest matches. A failed or cancelled
//! download never leaves a file at the target path.

use crate::types::{BinaryInfo, BuildFlavor};
use crate::verifier;
use sdk::errors::HostError;
use sdk::platform::library_filename;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

/// Places plugin binaries under the plugin directory
pub struct Installer {
    http: reqwest::Client,
    plugin_dir: PathBuf,
}

impl Installer {
    /// Create an installer for `plugin_dir`; downloads give up after `timeout`
    pub fn new(plugin_dir: impl Into<PathBuf>, timeout: Duration) -> Result<Self, HostError> {
        let http = reqwest::Client::builder()
            .user_agent(crate::index::user_agent())
            .timeout(timeout)
            .build()
            .map_err(|e| HostError::Network(e.to_string()))?;

        Ok(Self {
            http,
            plugin_dir: plugin_dir.into(),
        })
    }

    /// Directory holding everything installed for `plugin_id`
    pub fn install_path(&self, plugin_id: &str) -> PathBuf {
        self.plugin_dir.join(plugin_id)
    }

    /// Final location of one binary
    ///
    /// The matrix build sits directly in the plugin's directory where the
    /// loader looks for it; the desktop build goes into `preview/`.
    pub fn binary_target(&self, plugin_id: &str, flavor: BuildFlavor) -> PathBuf {
        let dir = match flavor {
            BuildFlavor::Matrix => self.install_path(plugin_id),
            BuildFlavor::Desktop => self.install_path(plugin_id).join("preview"),
        };
        dir.join(library_filename(plugin_id))
    }

    /// Create `dir` and its missing parents
    ///
    /// Returns the outermost directory that did not exist before, so the
    /// caller can remove exactly what it created.
    pub async fn ensure_dir(&self, dir: &Path) -> Result<Option<PathBuf>, HostError> {
        let mut outermost_missing = None;
        for ancestor in dir.ancestors() {
            if ancestor.as_os_str().is_empty() || ancestor.exists() {
                break;
            }
            outermost_missing = Some(ancestor.to_path_buf());
        }

        tokio::fs::create_dir_all(dir).await?;
        Ok(outermost_missing)
    }

    /// Download `binary` next to `target` and verify it
    ///
    /// Returns the verified `.part` file. `on_progress` receives the fraction
    /// of the file received so far.
    pub async fn fetch_binary<F>(
        &self,
        plugin_id: &str,
        binary: &BinaryInfo,
        target: &Path,
        cancel: &AtomicBool,
        on_progress: F,
    ) -> Result<PathBuf, HostError>
    where
        F: FnMut(f64),
    {
        let part = part_path(target);

        if let Err(e) = self
            .download(plugin_id, &binary.url, &part, binary.size, cancel, on_progress)
            .await
        {
            remove_quietly(&part).await;
            return Err(e);
        }

        // Deletes the part file on mismatch
        verifier::verify_file_async(part.clone(), binary.sha512.clone()).await?;
        debug!("Verified {} for {}", part.display(), plugin_id);
        Ok(part)
    }

    /// Stream `url` into `dest`, returning the number of bytes written
    ///
    /// The cancel flag is checked between chunks.
    pub async fn download<F>(
        &self,
        plugin_id: &str,
        url: &str,
        dest: &Path,
        expected_size: u64,
        cancel: &AtomicBool,
        mut on_progress: F,
    ) -> Result<u64, HostError>
    where
        F: FnMut(f64),
    {
        info!("Downloading {} for {}", url, plugin_id);

        let mut response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| HostError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(HostError::HttpStatus {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let total = response
            .content_length()
            .filter(|len| *len > 0)
            .unwrap_or(expected_size);

        let mut file = tokio::fs::File::create(dest).await?;
        let mut received: u64 = 0;

        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| HostError::Network(e.to_string()))?
        {
            if cancel.load(Ordering::SeqCst) {
                return Err(HostError::Cancelled(plugin_id.to_string()));
            }

            file.write_all(&chunk).await?;
            received += chunk.len() as u64;

            if total > 0 {
                on_progress((received as f64 / total as f64).min(1.0));
            }
        }

        file.flush().await?;
        debug!("Downloaded {} bytes to {}", received, dest.display());
        Ok(received)
    }

    /// Move a verified part file to its target, replacing any old binary
    pub async fn commit(&self, part: &Path, target: &Path) -> Result<(), HostError> {
        tokio::fs::rename(part, target).await?;
        info!("Installed {}", target.display());
        Ok(())
    }

    /// Remove a plugin's directory, best effort
    ///
    /// Returns whether anything was removed.
    pub async fn remove_install_dir(&self, plugin_id: &str) -> bool {
        remove_dir_quietly(&self.install_path(plugin_id)).await
    }
}

/// Sibling path used while a binary is downloading
pub fn part_path(target: &Path) -> PathBuf {
    let mut name = target
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".part");
    target.with_file_name(name)
}

pub(crate) async fn remove_quietly(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => debug!("Removed {}", path.display()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!("Failed to remove {}: {}", path.display(), e),
    }
}

pub(crate) async fn remove_dir_quietly(dir: &Path) -> bool {
    match tokio::fs::remove_dir_all(dir).await {
        Ok(()) => {
            info!("Removed {}", dir.display());
            true
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => false,
        Err(e) => {
            warn!("Failed to remove {}: {}", dir.display(), e);
            false
        }
    }
}
