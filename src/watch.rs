/*
    Copyright 2025 TII (SSRC) and the contributors
    SPDX-License-Identifier: Apache-2.0
*/
use std::path::{Path, PathBuf};

use log::{debug, trace, warn};
use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::controller::Event;
use crate::store::DEVCONTAINER_DIR;

/// Watches the workspace root and its `.devcontainer` directory, both
/// non-recursively.
pub struct WorkspaceWatcher {
    watcher: RecommendedWatcher,
    raw: mpsc::UnboundedReceiver<notify::Result<notify::Event>>,
    devcontainer_dir: PathBuf,
    watching_dir: bool,
}

impl WorkspaceWatcher {
    pub fn new(workspace: &Path) -> notify::Result<Self> {
        let (tx, raw) = mpsc::unbounded_channel();
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<notify::Event>| {
            let _ = tx.send(res);
        })?;
        watcher.watch(workspace, RecursiveMode::NonRecursive)?;
        debug!("watching {}", workspace.display());

        let mut this = Self {
            watcher,
            raw,
            devcontainer_dir: workspace.join(DEVCONTAINER_DIR),
            watching_dir: false,
        };
        this.watch_devcontainer_dir();

        Ok(this)
    }

    // The directory may appear later, e.g. after a create request.
    fn watch_devcontainer_dir(&mut self) {
        if self.watching_dir || !self.devcontainer_dir.is_dir() {
            return;
        }

        match self
            .watcher
            .watch(&self.devcontainer_dir, RecursiveMode::NonRecursive)
        {
            Ok(()) => {
                debug!("watching {}", self.devcontainer_dir.display());
                self.watching_dir = true;
            }
            Err(e) => warn!("Could not watch {}: {e}", self.devcontainer_dir.display()),
        }
    }

    /// Turn file system notifications into [`Event::FileChanged`] until the
    /// receiving side is dropped.
    pub async fn forward(mut self, events: mpsc::UnboundedSender<Event>) {
        while let Some(res) = self.raw.recv().await {
            let event = match res {
                Ok(event) => event,
                Err(e) => {
                    warn!("File watcher error: {e}");
                    continue;
                }
            };
            trace!("{event:?}");

            if matches!(event.kind, EventKind::Access(_)) {
                continue;
            }

            for path in event.paths {
                if path == self.devcontainer_dir {
                    if matches!(event.kind, EventKind::Remove(_)) {
                        self.watching_dir = false;
                    } else {
                        self.watch_devcontainer_dir();
                    }
                }

                if events.send(Event::FileChanged(path)).is_err() {
                    return;
                }
            }
        }
    }
}

/// Watch the first workspace root in the background, if there is one.
/// Failing to set up the watcher only costs automatic reloads.
pub fn spawn(workspaces: &[PathBuf], events: &mpsc::UnboundedSender<Event>) {
    let Some(workspace) = workspaces.first() else {
        return;
    };

    match WorkspaceWatcher::new(workspace) {
        Ok(watcher) => {
            tokio::spawn(watcher.forward(events.clone()));
        }
        Err(e) => warn!("Not watching {} for changes: {e}", workspace.display()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::canonical_location;
    use std::time::Duration;

    #[tokio::test]
    async fn reports_file_in_new_devcontainer_dir() {
        let dir = tempfile::tempdir().unwrap();
        let workspace = dir.path().canonicalize().unwrap();
        let (tx, mut rx) = mpsc::unbounded_channel();
        tokio::spawn(WorkspaceWatcher::new(&workspace).unwrap().forward(tx));

        let target = canonical_location(&workspace);
        std::fs::create_dir(target.parent().unwrap()).unwrap();
        // Give the watcher a chance to pick up the new directory.
        let seen_dir = tokio::time::timeout(Duration::from_secs(10), async {
            while let Some(Event::FileChanged(path)) = rx.recv().await {
                if path == workspace.join(DEVCONTAINER_DIR) {
                    return true;
                }
            }
            false
        })
        .await;
        assert_eq!(seen_dir, Ok(true));

        std::fs::write(&target, "{}").unwrap();
        let seen_file = tokio::time::timeout(Duration::from_secs(10), async {
            while let Some(Event::FileChanged(path)) = rx.recv().await {
                if path == target {
                    return true;
                }
            }
            false
        })
        .await;
        assert_eq!(seen_file, Ok(true));
    }
}
