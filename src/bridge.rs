/*
    Copyright 2025 TII (SSRC) and the contributors
    SPDX-License-Identifier: Apache-2.0
*/
use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::{Context, bail};
use log::{debug, error, info, warn};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

use crate::cli::RebuildPolicy;
use crate::controller::{Event, Host, SyncController, SyncState};
use crate::lint::Lint;
use crate::protocol::{Inbound, Notice, NoticeLevel, Outbound};
use crate::rebuild::DevcontainerCli;
use crate::store::FsStore;
use crate::watch;

/// Host speaking JSON lines. Form messages go to `out`, notices to the log.
pub struct StdioHost<W> {
    out: W,
    events: mpsc::UnboundedSender<Event>,
    policy: RebuildPolicy,
}

impl<W: Write> StdioHost<W> {
    pub fn new(out: W, events: mpsc::UnboundedSender<Event>, policy: RebuildPolicy) -> Self {
        Self {
            out,
            events,
            policy,
        }
    }

    fn write_line(&mut self, message: &Outbound) -> io::Result<()> {
        serde_json::to_writer(&mut self.out, message)?;
        self.out.write_all(b"\n")?;
        self.out.flush()
    }
}

impl<W: Write> Host for StdioHost<W> {
    fn post(&mut self, message: Outbound) {
        if let Err(e) = self.write_line(&message) {
            error!("Could not send {message:?}: {e}");
        }
    }

    fn notify(&mut self, notice: Notice) {
        match notice.level {
            NoticeLevel::Info => info!("{}", notice.message),
            NoticeLevel::Warning => warn!("{}", notice.message),
            NoticeLevel::Error => error!("{}", notice.message),
        }
    }

    fn offer_rebuild(&mut self, prompt: &str) {
        match self.policy {
            RebuildPolicy::Always => {
                info!("{prompt} Rebuilding.");
                if self
                    .events
                    .send(Event::Inbound(Inbound::RebuildContainer))
                    .is_err()
                {
                    warn!("Rebuild request dropped, event loop is gone");
                }
            }
            RebuildPolicy::Never => {
                info!("{prompt} Send {{\"command\":\"rebuildContainer\"}} to rebuild.");
            }
        }
    }
}

fn parse_inbound(line: &str) -> Option<Inbound> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }

    match serde_json::from_str(line) {
        Ok(message) => Some(message),
        Err(e) => {
            warn!("Ignoring malformed message {line:?}: {e}");
            None
        }
    }
}

/// Serve form messages read from stdin until it is closed.
pub async fn serve(
    workspaces: &[PathBuf],
    rebuild_program: &str,
    policy: RebuildPolicy,
) -> anyhow::Result<()> {
    let (tx, mut rx) = mpsc::unbounded_channel();
    watch::spawn(workspaces, &tx);

    let host = StdioHost::new(io::stdout(), tx, policy);
    let mut controller = SyncController::new(
        workspaces,
        FsStore,
        Lint,
        DevcontainerCli::new(rebuild_program),
        host,
    );

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            // Queued events first, so a rebuild queued by an apply is not
            // lost when stdin closes right after it.
            biased;
            Some(event) = rx.recv() => controller.handle(event).await,
            line = lines.next_line() => match line.context("Could not read stdin")? {
                Some(line) => {
                    if let Some(message) = parse_inbound(&line) {
                        controller.handle(Event::Inbound(message)).await;
                    }
                }
                None => break,
            },
        }
    }

    debug!("stdin closed");
    Ok(())
}

/// Print the settings of the workspace as a `loadConfig` message.
pub async fn show(workspaces: &[PathBuf]) -> anyhow::Result<()> {
    let (tx, _rx) = mpsc::unbounded_channel();
    let host = StdioHost::new(io::stdout(), tx, RebuildPolicy::Never);
    let mut controller =
        SyncController::new(workspaces, FsStore, Lint, DevcontainerCli::default(), host);

    controller.load().await;
    match controller.state() {
        SyncState::Error(e) => bail!("{e}"),
        SyncState::NoDocument => bail!("No devcontainer.json found"),
        _ => Ok(()),
    }
}
