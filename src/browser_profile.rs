//! Chrome profile directory management for browser legs
//!
//! Every browser leg gets its own UUID-named profile directory so several
//! legs can run side by side without fighting over `SingletonLock`.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use uuid::Uuid;

/// RAII wrapper for a Chrome profile directory
///
/// Removes the directory on drop unless `into_path()` is called.
#[derive(Debug)]
pub struct BrowserProfile {
    path: PathBuf,
    cleanup_on_drop: bool,
}

impl BrowserProfile {
    /// Create a fresh `{prefix}_{uuid}` directory under the system temp dir
    pub fn create(prefix: &str) -> Result<Self> {
        Self::create_in(&std::env::temp_dir(), prefix)
    }

    /// Create a fresh `{prefix}_{uuid}` directory under `parent`
    pub fn create_in(parent: &Path, prefix: &str) -> Result<Self> {
        let path = parent.join(format!("{prefix}_{}", Uuid::new_v4()));

        // create_dir (not create_dir_all) so an existing directory is an error
        std::fs::create_dir(&path)
            .with_context(|| format!("Failed to create profile directory: {}", path.display()))?;

        debug!("Created Chrome profile directory: {}", path.display());
        Ok(Self {
            path,
            cleanup_on_drop: true,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Consume the profile and return the path, disabling auto-cleanup
    pub fn into_path(mut self) -> PathBuf {
        self.cleanup_on_drop = false;
        std::mem::take(&mut self.path)
    }
}

impl Drop for BrowserProfile {
    fn drop(&mut self) {
        if self.cleanup_on_drop {
            remove_profile_dir(&self.path);
        }
    }
}

/// Best-effort removal of a profile directory
pub fn remove_profile_dir(path: &Path) {
    if !path.exists() {
        return;
    }
    debug!("Removing Chrome profile directory: {}", path.display());
    if let Err(e) = std::fs::remove_dir_all(path) {
        warn!("Failed to remove profile directory {}: {}", path.display(), e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn profile_is_removed_on_drop() {
        let parent = tempfile::tempdir().unwrap();
        let profile = BrowserProfile::create_in(parent.path(), "leg").unwrap();
        let path = profile.path().to_path_buf();
        assert!(path.exists());
        assert!(path.file_name().unwrap().to_string_lossy().starts_with("leg_"));

        drop(profile);
        assert!(!path.exists());
    }

    #[test]
    fn into_path_keeps_directory() {
        let parent = tempfile::tempdir().unwrap();
        let path = BrowserProfile::create_in(parent.path(), "leg")
            .unwrap()
            .into_path();
        assert!(path.exists());

        remove_profile_dir(&path);
        assert!(!path.exists());
    }

    #[test]
    fn profiles_never_collide() {
        let parent = tempfile::tempdir().unwrap();
        let a = BrowserProfile::create_in(parent.path(), "leg").unwrap();
        let b = BrowserProfile::create_in(parent.path(), "leg").unwrap();
        assert_ne!(a.path(), b.path());
    }
}
