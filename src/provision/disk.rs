//! Free-space queries for the volume holding the model store

use crate::errors::{ProvisionError, Result};
use std::path::{Path, PathBuf};
use sysinfo::{Disk, Disks};

/// Free bytes on the volume containing `path`.
///
/// tmpfs and network mounts (NFS, CIFS) are listed too, so a model store on
/// a shared volume reports that volume rather than `/`. Fails with
/// `Filesystem` only when the path cannot be resolved or no mounted volume
/// covers it; a full disk is `Ok(0)`.
pub fn get_available_disk_space(path: &Path) -> Result<u64> {
    let resolved = path.canonicalize().map_err(|e| {
        ProvisionError::Filesystem(format!("Cannot access {}: {}", path.display(), e))
    })?;

    let disks = Disks::new_with_refreshed_list();
    covering_disk(&disks, &resolved)
        .map(Disk::available_space)
        .ok_or_else(|| {
            ProvisionError::Filesystem(format!(
                "No mounted volume contains {}",
                resolved.display()
            ))
        })
}

/// Most specific mount containing `path` (e.g. /home over /)
fn covering_disk<'a>(disks: &'a Disks, path: &Path) -> Option<&'a Disk> {
    disks
        .iter()
        .filter(|disk| path.starts_with(disk.mount_point()))
        .max_by_key(|disk| disk.mount_point().as_os_str().len())
}

/// Where Ollama keeps model blobs: `$OLLAMA_MODELS` or `~/.ollama/models`
pub fn default_models_dir() -> PathBuf {
    if let Some(dir) = std::env::var_os("OLLAMA_MODELS").filter(|v| !v.is_empty()) {
        return PathBuf::from(dir);
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".ollama")
        .join("models")
}

/// Nearest existing ancestor of `path`, so a not-yet-created model store
/// still resolves to the volume it will live on
pub fn nearest_existing(path: &Path) -> Option<&Path> {
    path.ancestors().find(|p| !p.as_os_str().is_empty() && p.exists())
}
