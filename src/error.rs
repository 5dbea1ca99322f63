/*
    Copyright 2025 TII (SSRC) and the contributors
    SPDX-License-Identifier: Apache-2.0
*/
use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::jsonc::ParseError;
use crate::merge::ShapeError;

#[derive(Error, Debug)]
pub enum Error {
    /// No `devcontainer.json` at any candidate location.
    #[error("devcontainer.json not found")]
    NotFound,
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Shape(#[from] ShapeError),
    #[error("could not serialize devcontainer.json: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("{path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("No workspace folder is open")]
    NoWorkspace,
    #[error("could not launch `{program}`: {source}")]
    Rebuild {
        program: String,
        #[source]
        source: io::Error,
    },
}

impl Error {
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
