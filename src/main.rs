/*
    Copyright 2025 TII (SSRC) and the contributors
    SPDX-License-Identifier: Apache-2.0
*/
use anyhow::Context;
use devcontainer_editor::bridge;
use devcontainer_editor::cli::{self, Command, LogOutput};
use log::debug;
use syslog::Facility;

fn init_logger() -> anyhow::Result<()> {
    let level = cli::get_log_level().to_level_filter();

    match cli::get_log_output() {
        LogOutput::Syslog => syslog::init(Facility::LOG_USER, level, Some("devcontainer-editor"))
            .map_err(|e| anyhow::anyhow!("Could not connect to syslog: {e}"))?,
        LogOutput::Stderr => env_logger::Builder::new()
            .filter_level(level)
            .parse_default_env()
            .target(env_logger::Target::Stderr)
            .try_init()
            .context("Could not set up logging")?,
    }

    Ok(())
}

fn runtime() -> anyhow::Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Could not start tokio runtime")
}

fn main() -> anyhow::Result<()> {
    init_logger()?;

    let workspaces = cli::get_workspaces();
    debug!("workspaces: {workspaces:?}");

    match cli::get_command() {
        Command::Serve => runtime()?.block_on(bridge::serve(
            workspaces,
            cli::get_rebuild_program(),
            cli::get_rebuild_policy(),
        )),
        Command::Show => runtime()?.block_on(bridge::show(workspaces)),
        #[cfg(feature = "gui")]
        Command::Gui => {
            devcontainer_editor::panel::run(devcontainer_editor::panel::PanelInit {
                workspaces: workspaces.to_vec(),
                rebuild_program: cli::get_rebuild_program().to_owned(),
            });
            Ok(())
        }
    }
}
