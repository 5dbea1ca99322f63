/*
    Copyright 2025 TII (SSRC) and the contributors
    SPDX-License-Identifier: Apache-2.0
*/
use std::path::Path;

use serde_json::Value;
use tokio::fs;

use crate::extract::{GPUS_FLAG, NETWORK_FLAG};
use crate::jsonc::{self, Document};

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug)]
pub enum Severity {
    Error,
    Warning,
    Information,
    Hint,
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
}

impl Diagnostic {
    fn error(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            message: message.into(),
        }
    }

    fn warning(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            message: message.into(),
        }
    }
}

/// Source of problems reported for a persisted `devcontainer.json`.
#[allow(async_fn_in_trait)]
pub trait Diagnostics {
    async fn diagnostics(&self, location: &Path) -> Vec<Diagnostic>;
}

/// Structural checks of the fields a devcontainer tool relies on.
///
/// This is not a schema validator, it only looks at the shapes that would
/// break the container launch.
#[derive(Clone, Copy, Default, Debug)]
pub struct Lint;

impl Diagnostics for Lint {
    async fn diagnostics(&self, location: &Path) -> Vec<Diagnostic> {
        match fs::read_to_string(location).await {
            Ok(text) => lint_text(&text),
            Err(e) => vec![Diagnostic::error(format!(
                "Could not read {}: {e}",
                location.display()
            ))],
        }
    }
}

pub fn lint_text(text: &str) -> Vec<Diagnostic> {
    match jsonc::parse(text) {
        Ok(doc) => lint(&doc),
        Err(e) => vec![Diagnostic::error(e.to_string())],
    }
}

pub fn lint(doc: &Document) -> Vec<Diagnostic> {
    let mut found = vec![];

    match doc.get("runArgs") {
        None => (),
        Some(Value::Array(args)) => {
            if args.iter().any(|a| !a.is_string()) {
                found.push(Diagnostic::error("`runArgs` must only contain strings."));
            }
            if let Some(last) = args.last().and_then(Value::as_str)
                && (last == NETWORK_FLAG || last == GPUS_FLAG)
            {
                found.push(Diagnostic::warning(format!(
                    "`{last}` at the end of `runArgs` has no value."
                )));
            }
        }
        Some(_) => found.push(Diagnostic::error("`runArgs` must be an array.")),
    }

    match doc.get("remoteEnv") {
        None => (),
        Some(Value::Object(env)) => {
            for (name, value) in env {
                if !(value.is_string() || value.is_null()) {
                    found.push(Diagnostic::error(format!(
                        "`remoteEnv.{name}` must be a string or null."
                    )));
                }
            }
        }
        Some(_) => found.push(Diagnostic::error("`remoteEnv` must be an object.")),
    }

    match doc.get("hostRequirements") {
        None => (),
        Some(Value::Object(reqs)) => match reqs.get("gpu") {
            None | Some(Value::Bool(_) | Value::Object(_)) => (),
            Some(Value::String(s)) if s == "optional" => (),
            Some(_) => found.push(Diagnostic::error(
                "`hostRequirements.gpu` must be a boolean, \"optional\" or an object.",
            )),
        },
        Some(_) => found.push(Diagnostic::error("`hostRequirements` must be an object.")),
    }

    if !["image", "build", "dockerFile", "dockerComposeFile"]
        .iter()
        .any(|key| doc.contains_key(*key))
    {
        found.push(Diagnostic::warning(
            "None of `image`, `build`, `dockerFile` or `dockerComposeFile` is set.",
        ));
    }

    found
}
