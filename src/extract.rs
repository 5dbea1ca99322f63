/*
    Copyright 2025 TII (SSRC) and the contributors
    SPDX-License-Identifier: Apache-2.0
*/
use log::{trace, warn};
use serde_json::Value;

use crate::jsonc::Document;
use crate::settings::*;

pub const NETWORK_FLAG: &str = "--network";
pub const GPUS_FLAG: &str = "--gpus";
pub const CUDA_VISIBLE_DEVICES: &str = "CUDA_VISIBLE_DEVICES";
pub const NVIDIA_VISIBLE_DEVICES: &str = "NVIDIA_VISIBLE_DEVICES";

/// Derive the form state from a parsed `devcontainer.json`.
///
/// Missing or malformed fields fall back to the defaults of
/// [`DevcontainerSettings`].
pub fn extract(doc: &Document) -> DevcontainerSettings {
    let mut settings = DevcontainerSettings::default();
    let run_args = doc.get("runArgs").and_then(Value::as_array);

    if let Some(network) = run_args.and_then(|args| flag_value(args, NETWORK_FLAG)) {
        match network {
            "host" => settings.network_mode = NetworkMode::Host,
            "none" => settings.network_mode = NetworkMode::None,
            custom => {
                settings.network_mode = NetworkMode::Custom;
                settings.custom_network = custom.into();
            }
        }
    }

    if let Some(spec) = run_args.and_then(|args| flag_value(args, GPUS_FLAG)) {
        settings.gpu_enabled = true;
        apply_gpu_spec(&mut settings, spec);
    }

    settings.set_cuda_env = doc
        .get("remoteEnv")
        .and_then(Value::as_object)
        .is_some_and(|env| {
            [CUDA_VISIBLE_DEVICES, NVIDIA_VISIBLE_DEVICES]
                .iter()
                .any(|key| env.get(*key).and_then(Value::as_str).is_some_and(|v| !v.is_empty()))
        });

    trace!("extracted: {settings:?}");
    settings
}

/// Token following the first occurrence of `flag`.
fn flag_value<'a>(args: &'a [Value], flag: &str) -> Option<&'a str> {
    let pos = args.iter().position(|a| a.as_str() == Some(flag))?;
    args.get(pos + 1).and_then(Value::as_str)
}

fn unquote(s: &str) -> &str {
    let s = s.strip_prefix('"').unwrap_or(s);
    s.strip_suffix('"').unwrap_or(s)
}

fn apply_gpu_spec(settings: &mut DevcontainerSettings, spec: &str) {
    let bare = unquote(spec.trim());

    if bare == "all" {
        settings.gpu_mode = GpuMode::All;
    } else if let Some(devices) = bare.strip_prefix("device=") {
        settings.gpu_mode = GpuMode::Devices;
        settings.gpu_devices = unquote(devices).into();
    } else if let Some(count) = bare.parse::<u32>().ok().filter(|c| *c > 0) {
        settings.gpu_mode = GpuMode::Count;
        settings.gpu_count = count;
    } else {
        // Kept enabled with the default mode; the next apply rewrites it.
        warn!("Unrecognized `{GPUS_FLAG}` value {spec:?}, treating it as `all`");
    }
}
