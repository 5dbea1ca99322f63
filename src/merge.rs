/*
    Copyright 2025 TII (SSRC) and the contributors
    SPDX-License-Identifier: Apache-2.0
*/
use log::trace;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::extract::{CUDA_VISIBLE_DEVICES, GPUS_FLAG, NETWORK_FLAG, NVIDIA_VISIBLE_DEVICES};
use crate::jsonc::Document;
use crate::settings::DevcontainerSettings;

/// A section the merge has to edit holds a value of the wrong type.
#[derive(Error, Clone, PartialEq, Eq, Debug)]
#[error("`{key}` must be {expected}, found {found}")]
pub struct ShapeError {
    pub key: &'static str,
    pub expected: &'static str,
    pub found: &'static str,
}

/// Write the form state back into a parsed `devcontainer.json`.
///
/// Only the `--network`/`--gpus` pairs of `runArgs`, `hostRequirements.gpu`
/// and the two CUDA variables of `remoteEnv` are touched. Everything else,
/// including key order, is carried over. Missing or `null` sections are
/// created, sections of any other wrong type fail the merge.
pub fn merge(mut doc: Document, settings: &DevcontainerSettings) -> Result<Document, ShapeError> {
    let args = array_entry(&mut doc, "runArgs")?;
    remove_flag(args, NETWORK_FLAG);
    if let Some(network) = settings.network_arg() {
        args.extend([Value::from(NETWORK_FLAG), Value::from(network)]);
    }

    remove_flag(args, GPUS_FLAG);
    if let Some(spec) = settings.gpu_spec() {
        args.extend([Value::from(GPUS_FLAG), Value::from(spec)]);
    }

    if settings.gpu_enabled {
        object_entry(&mut doc, "hostRequirements")?.insert("gpu".into(), Value::Bool(true));

        match settings.visible_devices() {
            Some(devices) => {
                let env = object_entry(&mut doc, "remoteEnv")?;
                env.insert(CUDA_VISIBLE_DEVICES.into(), Value::from(devices.clone()));
                env.insert(NVIDIA_VISIBLE_DEVICES.into(), Value::from(devices));
            }
            None => remove_cuda_env(&mut doc),
        }
    } else {
        if let Some(gpu) = doc
            .get_mut("hostRequirements")
            .and_then(|reqs| reqs.get_mut("gpu"))
            && requires_gpu(gpu)
        {
            *gpu = Value::Bool(false);
        }
        remove_cuda_env(&mut doc);
    }

    trace!("merged: {settings:?}");
    Ok(doc)
}

/// Drop every `flag` token together with the token right after it.
fn remove_flag(args: &mut Vec<Value>, flag: &str) {
    let is_flag: Vec<bool> = args.iter().map(|a| a.as_str() == Some(flag)).collect();
    let mut i = 0;
    args.retain(|_| {
        let keep = !(is_flag[i] || (i > 0 && is_flag[i - 1]));
        i += 1;
        keep
    });
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

fn array_entry<'a>(doc: &'a mut Document, key: &'static str) -> Result<&'a mut Vec<Value>, ShapeError> {
    let value = doc.entry(key).or_insert(Value::Null);
    if value.is_null() {
        *value = Value::Array(Vec::new());
    }

    match value {
        Value::Array(args) => Ok(args),
        other => Err(ShapeError {
            key,
            expected: "an array",
            found: kind(other),
        }),
    }
}

fn object_entry<'a>(
    doc: &'a mut Document,
    key: &'static str,
) -> Result<&'a mut Map<String, Value>, ShapeError> {
    let value = doc.entry(key).or_insert(Value::Null);
    if value.is_null() {
        *value = Value::Object(Map::new());
    }

    match value {
        Value::Object(map) => Ok(map),
        other => Err(ShapeError {
            key,
            expected: "an object",
            found: kind(other),
        }),
    }
}

fn remove_cuda_env(doc: &mut Document) {
    if let Some(env) = doc.get_mut("remoteEnv").and_then(Value::as_object_mut) {
        env.shift_remove(CUDA_VISIBLE_DEVICES);
        env.shift_remove(NVIDIA_VISIBLE_DEVICES);
    }
}

// `gpu` may also be "optional" or a `{ cores, memory }` object.
fn requires_gpu(gpu: &Value) -> bool {
    match gpu {
        Value::Bool(b) => *b,
        Value::String(s) => !s.is_empty(),
        Value::Object(_) => true,
        _ => false,
    }
}
