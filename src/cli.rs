/*
    Copyright 2025 TII (SSRC) and the contributors
    SPDX-License-Identifier: Apache-2.0
*/
use clap::Parser;
use clap::Subcommand;
use clap::ValueEnum;
use lazy_static::lazy_static;
use std::path::PathBuf;

lazy_static! {
    static ref CLI_ARGS: Args = Args::parse();
    static ref WORKSPACES: Vec<PathBuf> = resolve_workspaces(&CLI_ARGS.workspaces);
}

#[derive(ValueEnum, Default, Debug, Clone, Copy, PartialEq)]
pub enum LogOutput {
    Syslog,
    /// Stdout is reserved for form messages.
    #[default]
    Stderr,
}

/// What happens after a clean apply when no form is around to answer the
/// rebuild offer.
#[derive(ValueEnum, Default, Debug, Clone, Copy, PartialEq)]
pub enum RebuildPolicy {
    #[default]
    Never,
    Always,
}

#[derive(Subcommand, Default, Debug, Clone, Copy, PartialEq)]
pub enum Command {
    /// Exchange form messages as JSON lines over stdin/stdout
    #[default]
    Serve,
    /// Print the settings found in the workspace and exit
    Show,
    /// Open the settings form in a window
    #[cfg(feature = "gui")]
    Gui,
}

/// devcontainer.json settings editor
#[derive(Parser, Debug)]
#[command(name = "devcontainer-editor")]
#[command(about = "Edit network and GPU settings of a devcontainer.json")]
#[command(long_about = None)]
struct Args {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Workspace root, only the first one is used
    #[arg(long = "workspace", short = 'w')]
    pub workspaces: Vec<PathBuf>,

    /// Log severity
    #[arg(long, default_value_t = log::Level::Info)]
    pub log_level: log::Level,

    /// Log output
    #[arg(long, value_enum, default_value_t)]
    pub log_output: LogOutput,

    /// Dev container CLI used for rebuilds
    #[arg(long, default_value = "devcontainer")]
    pub rebuild_program: String,

    /// Answer to the rebuild offer in serve mode
    #[arg(long, value_enum, default_value_t)]
    pub rebuild_after_apply: RebuildPolicy,
}

fn resolve_workspaces(given: &[PathBuf]) -> Vec<PathBuf> {
    let given = if given.is_empty() {
        std::env::current_dir().map(|dir| vec![dir]).unwrap_or_default()
    } else {
        given.to_vec()
    };

    // Watcher events carry absolute paths.
    given
        .into_iter()
        .map(|path| path.canonicalize().unwrap_or(path))
        .collect()
}

pub fn get_command() -> Command {
    CLI_ARGS.command.unwrap_or_default()
}

pub fn get_workspaces() -> &'static [PathBuf] {
    &WORKSPACES
}

pub fn get_log_level() -> &'static log::Level {
    &CLI_ARGS.log_level
}

pub fn get_log_output() -> &'static LogOutput {
    &CLI_ARGS.log_output
}

pub fn get_rebuild_program() -> &'static str {
    &CLI_ARGS.rebuild_program
}

pub fn get_rebuild_policy() -> RebuildPolicy {
    CLI_ARGS.rebuild_after_apply
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let args = Args::try_parse_from(["devcontainer-editor"]).unwrap();
        assert_eq!(args.command, None);
        assert!(args.workspaces.is_empty());
        assert_eq!(args.log_level, log::Level::Info);
        assert_eq!(args.log_output, LogOutput::Stderr);
        assert_eq!(args.rebuild_program, "devcontainer");
        assert_eq!(args.rebuild_after_apply, RebuildPolicy::Never);
    }

    #[test]
    fn repeated_workspaces_keep_order() {
        let args = Args::try_parse_from([
            "devcontainer-editor",
            "--workspace",
            "/a",
            "-w",
            "/b",
            "--rebuild-after-apply",
            "always",
            "show",
        ])
        .unwrap();
        assert_eq!(args.command, Some(Command::Show));
        assert_eq!(args.workspaces, [PathBuf::from("/a"), PathBuf::from("/b")]);
        assert_eq!(args.rebuild_after_apply, RebuildPolicy::Always);
    }

    #[test]
    fn existing_workspace_is_made_absolute() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing");
        let resolved = resolve_workspaces(&[dir.path().to_path_buf(), missing.clone()]);
        assert!(resolved[0].is_absolute());
        assert_eq!(resolved[0], dir.path().canonicalize().unwrap());
        assert_eq!(resolved[1], missing);
    }
}
