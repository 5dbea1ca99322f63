/*
    Copyright 2025 TII (SSRC) and the contributors
    SPDX-License-Identifier: Apache-2.0
*/
use std::path::{Path, PathBuf};

use log::{debug, error, info, trace};
use serde_json::json;
use tokio::sync::mpsc;

use crate::error::{Error, Result};
use crate::extract::extract;
use crate::jsonc::{self, Document};
use crate::lint::{Diagnostics, Severity};
use crate::merge::merge;
use crate::protocol::*;
use crate::rebuild::Rebuild;
use crate::settings::DevcontainerSettings;
use crate::store::{self, DocumentStore};

pub const UPDATED: &str = "Dev container configuration updated successfully.";
pub const REBUILD_PROMPT: &str =
    "Dev container configuration updated. Would you like to rebuild the container now?";
pub const SAVED_WITH_ERRORS: &str =
    "devcontainer.json saved with validation errors. Please check the file.";
pub const NOT_FOUND: &str = "devcontainer.json not found. Create one first.";
pub const CREATED: &str = "Created new devcontainer.json with default configuration.";
pub const REBUILDING: &str = "Rebuilding Dev Container...";

#[derive(Clone, PartialEq, Eq, Debug)]
pub enum SyncState {
    NoDocument,
    Synced,
    /// An apply is between reading and persisting the document.
    Dirty,
    Error(String),
}

/// Everything the controller reacts to.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum Event {
    Inbound(Inbound),
    FileChanged(PathBuf),
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ApplyOutcome {
    Saved,
    /// Persisted, but the diagnostics source reported errors.
    SavedWithErrors(usize),
}

/// The form and the surrounding application.
pub trait Host {
    fn post(&mut self, message: Outbound);

    fn notify(&mut self, notice: Notice);

    /// Offer a rebuild after a clean save. Accepting it is signalled by
    /// sending [`Inbound::RebuildContainer`] back.
    fn offer_rebuild(&mut self, prompt: &str);
}

/// Minimal descriptor written by a create request.
pub fn scaffold() -> Document {
    let value = json!({
        "$schema": "https://containers.dev/implementors/json_schema/devContainerSchema.json",
        "name": "Project Development",
        "image": "mcr.microsoft.com/devcontainers/base:ubuntu",
        "runArgs": [],
        "settings": {
            "terminal.integrated.shell.linux": "/bin/bash"
        }
    });

    match value {
        serde_json::Value::Object(doc) => doc,
        _ => Document::new(),
    }
}

/// Keeps the form, the file on disk and the diagnostics in step.
///
/// Only the location of the document is remembered between events, the
/// content is read again every time it is needed.
pub struct SyncController<S, D, R, H> {
    workspace: Option<PathBuf>,
    location: Option<PathBuf>,
    state: SyncState,
    store: S,
    diagnostics: D,
    rebuilder: R,
    host: H,
}

impl<S, D, R, H> SyncController<S, D, R, H>
where
    S: DocumentStore,
    D: Diagnostics,
    R: Rebuild,
    H: Host,
{
    /// Only the first of `workspaces` is ever looked at.
    pub fn new(workspaces: &[PathBuf], store: S, diagnostics: D, rebuilder: R, host: H) -> Self {
        if workspaces.len() > 1 {
            debug!(
                "{} workspace roots given, only {} is used",
                workspaces.len(),
                workspaces[0].display()
            );
        }

        Self {
            workspace: workspaces.first().cloned(),
            location: None,
            state: SyncState::NoDocument,
            store,
            diagnostics,
            rebuilder,
            host,
        }
    }

    pub fn state(&self) -> &SyncState {
        &self.state
    }

    pub fn location(&self) -> Option<&Path> {
        self.location.as_deref()
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    /// Handle events one after another until every sender is gone.
    pub async fn run(mut self, mut events: mpsc::UnboundedReceiver<Event>) {
        while let Some(event) = events.recv().await {
            self.handle(event).await;
        }
        debug!("event channel closed");
    }

    pub async fn handle(&mut self, event: Event) {
        trace!("event {event:?} in state {:?}", self.state);

        match event {
            Event::Inbound(Inbound::Init) => self.load().await,
            Event::Inbound(Inbound::ApplyConfig { config }) => self.apply(config).await,
            Event::Inbound(Inbound::CreateDevcontainer) => self.create().await,
            Event::Inbound(Inbound::RebuildContainer) => self.rebuild(),
            Event::FileChanged(path) => self.file_changed(&path).await,
        }
    }

    /// Resolve, read and push the current settings to the form.
    pub async fn load(&mut self) {
        match self.try_load().await {
            Ok(Some(config)) => {
                self.state = SyncState::Synced;
                self.host.post(Outbound::LoadConfig { config });
            }
            Ok(None) | Err(Error::NotFound) => {
                self.location = None;
                self.state = SyncState::NoDocument;
                self.host.post(Outbound::NoDevcontainer);
            }
            Err(e) => {
                error!("Failed to load devcontainer.json: {e}");
                self.state = SyncState::Error(e.to_string());
                self.host
                    .notify(Notice::error(format!("Failed to load devcontainer.json: {e}")));
            }
        }
    }

    async fn try_load(&mut self) -> Result<Option<DevcontainerSettings>> {
        self.location = self.resolve().await;
        let Some(location) = &self.location else {
            return Ok(None);
        };

        let text = self.store.read(location).await?;
        let doc = jsonc::parse(&text)?;
        Ok(Some(extract(&doc)))
    }

    pub async fn apply(&mut self, settings: DevcontainerSettings) {
        if let Err(reason) = settings.check() {
            self.host
                .notify(Notice::error(format!("Failed to update devcontainer.json: {reason}")));
            return;
        }

        self.state = SyncState::Dirty;

        match self.try_apply(&settings).await {
            Ok(ApplyOutcome::Saved) => {
                self.state = SyncState::Synced;
                info!("{UPDATED}");
                self.host.notify(Notice::info(UPDATED));
                self.host.offer_rebuild(REBUILD_PROMPT);
            }
            Ok(ApplyOutcome::SavedWithErrors(count)) => {
                self.state = SyncState::Synced;
                info!("devcontainer.json saved, {count} validation error(s)");
                self.host.notify(Notice::warning(SAVED_WITH_ERRORS));
            }
            Err(Error::NotFound) => {
                self.location = None;
                self.state = SyncState::NoDocument;
                self.host.notify(Notice::error(NOT_FOUND));
                self.host.post(Outbound::NoDevcontainer);
            }
            Err(e) => {
                error!("Failed to update devcontainer.json: {e}");
                self.state = SyncState::Error(e.to_string());
                self.host
                    .notify(Notice::error(format!("Failed to update devcontainer.json: {e}")));
            }
        }
    }

    async fn try_apply(&mut self, settings: &DevcontainerSettings) -> Result<ApplyOutcome> {
        // Resolve and read again, the file may have been edited since the last load.
        let location = self.resolve().await.ok_or(Error::NotFound)?;
        self.location = Some(location.clone());

        let text = self.store.read(&location).await?;
        let doc = merge(jsonc::parse(&text)?, settings)?;
        self.store.write(&location, &jsonc::to_string(&doc)?).await?;

        let found = self.diagnostics.diagnostics(&location).await;
        for d in &found {
            debug!("{}: {:?}: {}", location.display(), d.severity, d.message);
        }

        let errors = found
            .iter()
            .filter(|d| d.severity == Severity::Error)
            .count();
        Ok(match errors {
            0 => ApplyOutcome::Saved,
            n => ApplyOutcome::SavedWithErrors(n),
        })
    }

    pub async fn create(&mut self) {
        match self.try_create().await {
            Ok((location, created)) => {
                if created {
                    info!("Created {}", location.display());
                    self.host.notify(Notice::info(CREATED));
                }
                self.location = Some(location);
                self.load().await;
            }
            Err(Error::NoWorkspace) => {
                self.host.notify(Notice::error("No workspace folder is open."));
            }
            Err(e) => {
                error!("Failed to create devcontainer.json: {e}");
                self.state = SyncState::Error(e.to_string());
                self.host
                    .notify(Notice::error(format!("Failed to create devcontainer.json: {e}")));
            }
        }
    }

    /// Returns the location and whether a new file was written.
    async fn try_create(&self) -> Result<(PathBuf, bool)> {
        let workspace = self.workspace.as_ref().ok_or(Error::NoWorkspace)?;
        let location = store::canonical_location(workspace);

        if self.store.exists(&location).await {
            debug!("{} already exists, not overwriting", location.display());
            return Ok((location, false));
        }

        self.store
            .write(&location, &jsonc::to_string(&scaffold())?)
            .await?;
        Ok((location, true))
    }

    pub fn rebuild(&mut self) {
        let Some(workspace) = &self.workspace else {
            self.host.notify(Notice::error("No workspace folder is open."));
            return;
        };

        match self.rebuilder.rebuild(workspace) {
            Ok(()) => self.host.notify(Notice::info(REBUILDING)),
            Err(e) => {
                error!("Failed to start container rebuild: {e}");
                self.host
                    .notify(Notice::error(format!("Failed to start container rebuild: {e}")));
            }
        }
    }

    /// Reload when the tracked file changed, or when a candidate file shows
    /// up while nothing is tracked.
    pub async fn file_changed(&mut self, path: &Path) {
        let relevant = match &self.location {
            Some(location) => location == path,
            None => self
                .workspace
                .as_deref()
                .is_some_and(|ws| store::candidates(ws).iter().any(|c| c == path)),
        };

        if relevant {
            debug!("{} changed, reloading", path.display());
            self.load().await;
        } else {
            trace!("ignoring change of {}", path.display());
        }
    }

    async fn resolve(&self) -> Option<PathBuf> {
        match &self.workspace {
            Some(workspace) => self.store.resolve(workspace).await,
            None => None,
        }
    }
}
