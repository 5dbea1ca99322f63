/*
    Copyright 2025 TII (SSRC) and the contributors
    SPDX-License-Identifier: Apache-2.0
*/
use std::io;
use std::path::Path;
use std::process::Stdio;

use log::info;
use tokio::process::Command;

use crate::error::{Error, Result};

/// Triggers a rebuild of the dev container. Fire and forget.
pub trait Rebuild {
    fn rebuild(&self, workspace: &Path) -> Result<()>;
}

/// Runs `<program> up --workspace-folder <root> --remove-existing-container`.
#[derive(Clone, Debug)]
pub struct DevcontainerCli {
    program: String,
}

impl DevcontainerCli {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Default for DevcontainerCli {
    fn default() -> Self {
        Self::new("devcontainer")
    }
}

impl Rebuild for DevcontainerCli {
    fn rebuild(&self, workspace: &Path) -> Result<()> {
        // Stdout may carry the form protocol, so the CLI output goes to stderr.
        let child = Command::new(&self.program)
            .arg("up")
            .arg("--workspace-folder")
            .arg(workspace)
            .arg("--remove-existing-container")
            .stdin(Stdio::null())
            .stdout(Stdio::from(io::stderr()))
            .spawn()
            .map_err(|source| Error::Rebuild {
                program: self.program.clone(),
                source,
            })?;

        info!(
            "Started `{} up` for {} (pid {:?})",
            self.program,
            workspace.display(),
            child.id()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_program_is_reported() {
        let cli = DevcontainerCli::new("devcontainer-editor-no-such-program");
        let err = cli.rebuild(Path::new(".")).unwrap_err();
        assert!(matches!(err, Error::Rebuild { .. }));
        assert!(err.to_string().contains("devcontainer-editor-no-such-program"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn does_not_wait_for_completion() {
        assert!(DevcontainerCli::new("true").rebuild(Path::new(".")).is_ok());
    }
}
