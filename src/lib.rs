/*
    Copyright 2025 TII (SSRC) and the contributors
    SPDX-License-Identifier: Apache-2.0
*/
/// Stdin/stdout host speaking the form messages as JSON lines.
pub mod bridge;
/// Command line arguments.
pub mod cli;
/// Event loop keeping form, file and diagnostics in step.
pub mod controller;
pub mod error;
/// Turns a devcontainer.json into form settings.
pub mod extract;
/// JSON with comments and trailing commas.
pub mod jsonc;
/// Problems in a devcontainer.json, reported after every save.
pub mod lint;
/// Applies form settings to a devcontainer.json, leaving everything else alone.
pub mod merge;
/// Settings window.
#[cfg(feature = "gui")]
pub mod panel;
/// Messages exchanged with the form.
pub mod protocol;
/// Container rebuild through the dev container CLI.
pub mod rebuild;
/// Form state.
pub mod settings;
/// Locating, reading and writing devcontainer.json.
pub mod store;
#[cfg(feature = "gui")]
pub mod toast;
/// File system notifications for the workspace.
pub mod watch;
