/*
    Copyright 2025 TII (SSRC) and the contributors
    SPDX-License-Identifier: Apache-2.0
*/
use std::io;
use std::path::{Path, PathBuf};

use log::{debug, trace, warn};
use tokio::fs;

use crate::error::{Error, Result};

pub const DEVCONTAINER_DIR: &str = ".devcontainer";
pub const DEVCONTAINER_FILE: &str = "devcontainer.json";

/// Candidate locations in lookup order.
pub fn candidates(workspace: &Path) -> [PathBuf; 2] {
    [
        workspace.join(DEVCONTAINER_DIR).join(DEVCONTAINER_FILE),
        workspace.join(DEVCONTAINER_FILE),
    ]
}

/// Where a newly created `devcontainer.json` goes.
pub fn canonical_location(workspace: &Path) -> PathBuf {
    workspace.join(DEVCONTAINER_DIR).join(DEVCONTAINER_FILE)
}

/// Backing storage of `devcontainer.json`.
#[allow(async_fn_in_trait)]
pub trait DocumentStore {
    async fn exists(&self, location: &Path) -> bool;

    async fn read(&self, location: &Path) -> Result<String>;

    /// Replace the whole content of `location`, creating parent directories.
    async fn write(&self, location: &Path, text: &str) -> Result<()>;

    async fn resolve(&self, workspace: &Path) -> Option<PathBuf> {
        for candidate in candidates(workspace) {
            if self.exists(&candidate).await {
                trace!("resolved {}", candidate.display());
                return Some(candidate);
            }
        }
        None
    }
}

/// Local file system.
#[derive(Clone, Copy, Default, Debug)]
pub struct FsStore;

impl DocumentStore for FsStore {
    async fn exists(&self, location: &Path) -> bool {
        fs::metadata(location).await.is_ok_and(|m| m.is_file())
    }

    async fn read(&self, location: &Path) -> Result<String> {
        match fs::read_to_string(location).await {
            Ok(text) => Ok(text),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Err(Error::NotFound),
            Err(e) => Err(Error::io(location, e)),
        }
    }

    async fn write(&self, location: &Path, text: &str) -> Result<()> {
        // A symlinked file is replaced at its target, the link stays.
        let target = fs::canonicalize(location)
            .await
            .unwrap_or_else(|_| location.to_path_buf());
        let parent = target.parent().unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(parent)
            .await
            .map_err(|e| Error::io(parent, e))?;

        let file_name = target
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| DEVCONTAINER_FILE.into());
        let tmp = parent.join(format!(".{file_name}.tmp.{}", std::process::id()));

        fs::write(&tmp, text).await.map_err(|e| Error::io(&tmp, e))?;
        if let Ok(meta) = fs::metadata(&target).await
            && let Err(e) = fs::set_permissions(&tmp, meta.permissions()).await
        {
            warn!("Could not copy permissions of {}: {e}", target.display());
        }
        if let Err(e) = fs::rename(&tmp, &target).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(Error::io(location, e));
        }

        debug!("wrote {} bytes to {}", text.len(), target.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn prefers_devcontainer_dir() {
        let dir = tempfile::tempdir().unwrap();
        let ws = dir.path();
        assert_eq!(FsStore.resolve(ws).await, None);

        std::fs::write(ws.join(DEVCONTAINER_FILE), "{}").unwrap();
        assert_eq!(FsStore.resolve(ws).await, Some(ws.join(DEVCONTAINER_FILE)));

        std::fs::create_dir(ws.join(DEVCONTAINER_DIR)).unwrap();
        assert_eq!(FsStore.resolve(ws).await, Some(ws.join(DEVCONTAINER_FILE)));

        std::fs::write(canonical_location(ws), "{}").unwrap();
        assert_eq!(FsStore.resolve(ws).await, Some(canonical_location(ws)));
    }

    #[tokio::test]
    async fn write_creates_parents_and_replaces() {
        let dir = tempfile::tempdir().unwrap();
        let location = canonical_location(dir.path());

        FsStore.write(&location, "{\n    \"a\": 1\n}").await.unwrap();
        FsStore.write(&location, "{}").await.unwrap();

        assert_eq!(FsStore.read(&location).await.unwrap(), "{}");
        let leftovers: Vec<_> = std::fs::read_dir(location.parent().unwrap())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(leftovers, [DEVCONTAINER_FILE]);
    }

    #[tokio::test]
    async fn missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = FsStore
            .read(&dir.path().join(DEVCONTAINER_FILE))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn write_follows_symlink_and_keeps_mode() {
        use std::os::unix::fs::{PermissionsExt, symlink};

        let dir = tempfile::tempdir().unwrap();
        let ws = dir.path();
        let shared = ws.join("shared.json");
        std::fs::write(&shared, "{}").unwrap();
        std::fs::set_permissions(&shared, std::fs::Permissions::from_mode(0o640)).unwrap();
        let link = ws.join(DEVCONTAINER_FILE);
        symlink(&shared, &link).unwrap();

        FsStore.write(&link, "{\"image\": \"debian\"}").await.unwrap();

        assert!(std::fs::symlink_metadata(&link).unwrap().file_type().is_symlink());
        assert_eq!(std::fs::read_to_string(&shared).unwrap(), "{\"image\": \"debian\"}");
        let mode = std::fs::metadata(&shared).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o640);
    }
}
