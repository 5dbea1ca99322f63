/*
    Copyright 2025 TII (SSRC) and the contributors
    SPDX-License-Identifier: Apache-2.0
*/
use serde::{Deserialize, Serialize};

/// Largest GPU count accepted from the form.
pub const MAX_GPU_COUNT: u32 = 64;

/// Container network selected through `--network`.
#[derive(Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default, Debug)]
#[serde(rename_all = "lowercase")]
pub enum NetworkMode {
    /// No `--network` flag, docker picks the bridge network.
    #[default]
    Default,
    Host,
    None,
    /// User supplied network name, see [`DevcontainerSettings::custom_network`].
    Custom,
}

impl NetworkMode {
    pub const ALL: [NetworkMode; 4] = [
        NetworkMode::Default,
        NetworkMode::Host,
        NetworkMode::None,
        NetworkMode::Custom,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            NetworkMode::Default => "default",
            NetworkMode::Host => "host",
            NetworkMode::None => "none",
            NetworkMode::Custom => "custom",
        }
    }
}

/// How GPUs are handed to the container through `--gpus`.
#[derive(Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default, Debug)]
#[serde(rename_all = "lowercase")]
pub enum GpuMode {
    #[default]
    All,
    Count,
    Devices,
}

impl GpuMode {
    pub const ALL: [GpuMode; 3] = [GpuMode::All, GpuMode::Count, GpuMode::Devices];

    pub fn as_str(self) -> &'static str {
        match self {
            GpuMode::All => "all",
            GpuMode::Count => "count",
            GpuMode::Devices => "devices",
        }
    }
}

/// Normalized form state derived from a `devcontainer.json`.
///
/// Always fully populated. Fields that only matter for a particular mode keep
/// their defaults otherwise.
#[derive(Serialize, Deserialize, Clone, PartialEq, Eq, Debug)]
#[serde(rename_all = "camelCase", default)]
pub struct DevcontainerSettings {
    pub network_mode: NetworkMode,
    pub custom_network: String,
    #[serde(alias = "enableGpu")]
    pub gpu_enabled: bool,
    pub gpu_mode: GpuMode,
    pub gpu_count: u32,
    pub gpu_devices: String,
    pub set_cuda_env: bool,
}

impl Default for DevcontainerSettings {
    fn default() -> Self {
        Self {
            network_mode: NetworkMode::Default,
            custom_network: String::new(),
            gpu_enabled: false,
            gpu_mode: GpuMode::All,
            gpu_count: 1,
            gpu_devices: String::new(),
            set_cuda_env: false,
        }
    }
}

impl DevcontainerSettings {
    /// Value passed after `--network`, `None` for the default network.
    pub fn network_arg(&self) -> Option<&str> {
        match self.network_mode {
            NetworkMode::Default => None,
            NetworkMode::Custom => Some(&self.custom_network),
            mode => Some(mode.as_str()),
        }
    }

    /// Value passed after `--gpus`, `None` when GPUs are disabled.
    pub fn gpu_spec(&self) -> Option<String> {
        if !self.gpu_enabled {
            return None;
        }

        Some(match self.gpu_mode {
            GpuMode::All => "all".into(),
            GpuMode::Count => self.gpu_count.to_string(),
            GpuMode::Devices => format!("\"device={}\"", self.gpu_devices),
        })
    }

    /// Device list mirrored into `CUDA_VISIBLE_DEVICES`/`NVIDIA_VISIBLE_DEVICES`.
    pub fn visible_devices(&self) -> Option<String> {
        if !self.gpu_enabled || !self.set_cuda_env {
            return None;
        }

        Some(match self.gpu_mode {
            GpuMode::All => "all".into(),
            GpuMode::Count => (0..self.gpu_count)
                .map(|i| i.to_string())
                .collect::<Vec<_>>()
                .join(","),
            GpuMode::Devices => self.gpu_devices.clone(),
        })
    }

    /// Reject values docker would refuse at container start, and custom
    /// network names that would read back as a different mode.
    pub fn check(&self) -> Result<(), String> {
        if self.network_mode == NetworkMode::Custom {
            match self.custom_network.as_str() {
                name if name.trim().is_empty() => {
                    return Err("custom network name is empty".into());
                }
                name @ ("host" | "none") => {
                    return Err(format!(
                        "custom network name `{name}` is reserved, select the {name} mode instead"
                    ));
                }
                _ => (),
            }
        }
        if self.gpu_enabled {
            match self.gpu_mode {
                GpuMode::Count if !(1..=MAX_GPU_COUNT).contains(&self.gpu_count) => {
                    return Err(format!("GPU count must be between 1 and {MAX_GPU_COUNT}"));
                }
                GpuMode::Devices if self.gpu_devices.trim().is_empty() => {
                    return Err("GPU device list is empty".into());
                }
                _ => (),
            }
        }
        Ok(())
    }

    /// Reset fields that are meaningless for the selected modes to their defaults.
    pub fn normalized(mut self) -> Self {
        let defaults = Self::default();

        if self.network_mode != NetworkMode::Custom {
            self.custom_network = defaults.custom_network;
        }

        if !self.gpu_enabled {
            self.gpu_mode = defaults.gpu_mode;
            self.set_cuda_env = false;
        }
        if self.gpu_mode != GpuMode::Count {
            self.gpu_count = defaults.gpu_count;
        }
        if self.gpu_mode != GpuMode::Devices {
            self.gpu_devices = defaults.gpu_devices;
        }

        self
    }
}
