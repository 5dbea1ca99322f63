/*
    Copyright 2025 TII (SSRC) and the contributors
    SPDX-License-Identifier: Apache-2.0
*/
use std::path::PathBuf;

use log::{debug, error, trace};
use relm4::adw;
use relm4::{gtk::prelude::*, prelude::*};
use relm4_components::alert::*;
use tokio::sync::mpsc;

use crate::controller::{Event, Host, SyncController};
use crate::lint::Lint;
use crate::protocol::{Inbound, Notice, Outbound};
use crate::rebuild::DevcontainerCli;
use crate::settings::{DevcontainerSettings, GpuMode, MAX_GPU_COUNT, NetworkMode};
use crate::store::FsStore;
use crate::toast::ToastManager;
use crate::watch;

const NETWORK_LABELS: [&str; 4] = ["Default", "Host", "None", "Custom"];
const GPU_MODE_LABELS: [&str; 3] = ["All GPUs", "Specific count", "Specific devices"];

pub struct PanelInit {
    pub workspaces: Vec<PathBuf>,
    pub rebuild_program: String,
}

/// Forwards controller output to the panel on the GTK main loop.
struct PanelHost {
    sender: relm4::Sender<PanelInput>,
}

impl Host for PanelHost {
    fn post(&mut self, message: Outbound) {
        self.sender.emit(PanelInput::Show(message));
    }

    fn notify(&mut self, notice: Notice) {
        self.sender.emit(PanelInput::Notify(notice));
    }

    fn offer_rebuild(&mut self, prompt: &str) {
        self.sender.emit(PanelInput::OfferRebuild(prompt.to_owned()));
    }
}

pub struct PanelModel {
    settings: DevcontainerSettings,
    has_document: bool,
    /// Set while handling a `loadConfig`, fields are only rewritten then.
    reloaded: bool,
    events: mpsc::UnboundedSender<Event>,
    toaster: ToastManager,
    rebuild_alert: Controller<Alert>,
}

impl PanelModel {
    fn send(&self, message: Inbound) {
        trace!("sending {message:?}");
        if self.events.send(Event::Inbound(message)).is_err() {
            error!("Controller is not running");
        }
    }
}

#[derive(Debug)]
pub enum PanelInput {
    Show(Outbound),
    Notify(Notice),
    OfferRebuild(String),
    SetNetworkMode(NetworkMode),
    SetCustomNetwork(String),
    SetGpuEnabled(bool),
    SetGpuMode(GpuMode),
    SetGpuCount(u32),
    SetGpuDevices(String),
    SetCudaEnv(bool),
    Apply,
    Create,
    Rebuild,
    Ignore,
}

fn network_index(mode: NetworkMode) -> u32 {
    NetworkMode::ALL.iter().position(|m| *m == mode).unwrap_or(0) as u32
}

fn gpu_mode_index(mode: GpuMode) -> u32 {
    GpuMode::ALL.iter().position(|m| *m == mode).unwrap_or(0) as u32
}

#[relm4::component(pub)]
impl SimpleComponent for PanelModel {
    type Init = PanelInit;
    type Input = PanelInput;
    type Output = ();

    view! {
        gtk::Window {
            set_title: Some("Dev Container Settings"),
            set_default_size: (460, 380),

            #[local_ref]
            toast_overlay -> adw::ToastOverlay {
                #[wrap(Some)]
                set_child = &gtk::Box {
                    set_orientation: gtk::Orientation::Vertical,
                    set_margin_all: 10,
                    set_spacing: 10,

                    gtk::Box {
                        set_orientation: gtk::Orientation::Vertical,
                        set_spacing: 10,
                        set_valign: gtk::Align::Center,
                        set_vexpand: true,
                        #[watch]
                        set_visible: !model.has_document,

                        gtk::Label {
                            set_label: "No devcontainer.json found in this workspace.",
                        },
                        gtk::Button {
                            set_label: "Create devcontainer.json",
                            set_halign: gtk::Align::Center,
                            connect_clicked => PanelInput::Create,
                        },
                    },

                    gtk::Box {
                        set_orientation: gtk::Orientation::Vertical,
                        set_spacing: 10,
                        #[watch]
                        set_visible: model.has_document,

                        gtk::Frame::new(Some("Network:")) {
                            gtk::Grid {
                                set_row_spacing: 5,
                                set_column_spacing: 5,
                                set_margin_all: 5,

                                attach[0, 0, 1, 1] = &gtk::Label {
                                    set_label: "Mode:",
                                    set_halign: gtk::Align::Start,
                                },
                                attach[1, 0, 1, 1] = &gtk::DropDown::from_strings(&NETWORK_LABELS) {
                                    set_hexpand: true,
                                    #[track(model.reloaded)]
                                    #[block_signal(network_handler)]
                                    set_selected: network_index(model.settings.network_mode),
                                    connect_selected_notify[sender] => move |d| {
                                        let mode = NetworkMode::ALL.get(d.selected() as usize).copied().unwrap_or_default();
                                        sender.input(PanelInput::SetNetworkMode(mode));
                                    } @network_handler,
                                },

                                attach[0, 1, 1, 1] = &gtk::Label {
                                    set_label: "Network name:",
                                    set_halign: gtk::Align::Start,
                                },
                                attach[1, 1, 1, 1] = &gtk::Entry {
                                    set_placeholder_text: Some("my-network"),
                                    #[watch]
                                    set_sensitive: model.settings.network_mode == NetworkMode::Custom,
                                    #[track(model.reloaded)]
                                    #[block_signal(custom_network_handler)]
                                    set_text: &model.settings.custom_network,
                                    connect_changed[sender] => move |e| {
                                        sender.input(PanelInput::SetCustomNetwork(e.text().trim().into()));
                                    } @custom_network_handler,
                                },
                            },
                        },

                        gtk::Frame::new(Some("GPU:")) {
                            gtk::Grid {
                                set_row_spacing: 5,
                                set_column_spacing: 5,
                                set_margin_all: 5,

                                attach[0, 0, 2, 1] = &gtk::CheckButton {
                                    set_label: Some("Enable GPU access"),
                                    #[track(model.reloaded)]
                                    #[block_signal(gpu_enabled_handler)]
                                    set_active: model.settings.gpu_enabled,
                                    connect_toggled[sender] => move |b| {
                                        sender.input(PanelInput::SetGpuEnabled(b.is_active()));
                                    } @gpu_enabled_handler,
                                },

                                attach[0, 1, 1, 1] = &gtk::Label {
                                    set_label: "GPUs:",
                                    set_halign: gtk::Align::Start,
                                },
                                attach[1, 1, 1, 1] = &gtk::DropDown::from_strings(&GPU_MODE_LABELS) {
                                    set_hexpand: true,
                                    #[watch]
                                    set_sensitive: model.settings.gpu_enabled,
                                    #[track(model.reloaded)]
                                    #[block_signal(gpu_mode_handler)]
                                    set_selected: gpu_mode_index(model.settings.gpu_mode),
                                    connect_selected_notify[sender] => move |d| {
                                        let mode = GpuMode::ALL.get(d.selected() as usize).copied().unwrap_or_default();
                                        sender.input(PanelInput::SetGpuMode(mode));
                                    } @gpu_mode_handler,
                                },

                                attach[0, 2, 1, 1] = &gtk::Label {
                                    set_label: "Count:",
                                    set_halign: gtk::Align::Start,
                                },
                                attach[1, 2, 1, 1] = &gtk::SpinButton::with_range(1.0, MAX_GPU_COUNT as f64, 1.0) {
                                    #[watch]
                                    set_sensitive: model.settings.gpu_enabled && model.settings.gpu_mode == GpuMode::Count,
                                    #[track(model.reloaded)]
                                    #[block_signal(gpu_count_handler)]
                                    set_value: model.settings.gpu_count as f64,
                                    connect_value_changed[sender] => move |s| {
                                        sender.input(PanelInput::SetGpuCount(s.value_as_int().max(1) as u32));
                                    } @gpu_count_handler,
                                },

                                attach[0, 3, 1, 1] = &gtk::Label {
                                    set_label: "Devices:",
                                    set_halign: gtk::Align::Start,
                                },
                                attach[1, 3, 1, 1] = &gtk::Entry {
                                    set_placeholder_text: Some("0,1"),
                                    #[watch]
                                    set_sensitive: model.settings.gpu_enabled && model.settings.gpu_mode == GpuMode::Devices,
                                    #[track(model.reloaded)]
                                    #[block_signal(gpu_devices_handler)]
                                    set_text: &model.settings.gpu_devices,
                                    connect_changed[sender] => move |e| {
                                        sender.input(PanelInput::SetGpuDevices(e.text().trim().into()));
                                    } @gpu_devices_handler,
                                },

                                attach[0, 4, 2, 1] = &gtk::CheckButton {
                                    set_label: Some("Set CUDA_VISIBLE_DEVICES and NVIDIA_VISIBLE_DEVICES"),
                                    #[watch]
                                    set_sensitive: model.settings.gpu_enabled,
                                    #[track(model.reloaded)]
                                    #[block_signal(cuda_env_handler)]
                                    set_active: model.settings.set_cuda_env,
                                    connect_toggled[sender] => move |b| {
                                        sender.input(PanelInput::SetCudaEnv(b.is_active()));
                                    } @cuda_env_handler,
                                },
                            },
                        },

                        gtk::CenterBox {
                            #[wrap(Some)]
                            set_end_widget = &gtk::Box {
                                set_spacing: 5,

                                gtk::Button {
                                    set_label: "Rebuild Container",
                                    connect_clicked => PanelInput::Rebuild,
                                },
                                gtk::Button {
                                    set_label: "Apply",
                                    add_css_class: "suggested-action",
                                    connect_clicked => PanelInput::Apply,
                                },
                            },
                        },
                    },
                },
            },
        }
    }

    fn init(
        init: Self::Init,
        root: Self::Root,
        sender: ComponentSender<Self>,
    ) -> ComponentParts<Self> {
        let (events, rx) = mpsc::unbounded_channel();
        spawn_controller(
            init,
            PanelHost {
                sender: sender.input_sender().clone(),
            },
            events.clone(),
            rx,
        );

        let rebuild_alert = Alert::builder()
            .transient_for(&root)
            .launch(AlertSettings {
                text: Some(String::from("Rebuild container?")),
                confirm_label: Some(String::from("Rebuild")),
                cancel_label: Some(String::from("Later")),
                is_modal: true,
                ..Default::default()
            })
            .forward(sender.input_sender(), |response| match response {
                AlertResponse::Confirm => PanelInput::Rebuild,
                _ => PanelInput::Ignore,
            });

        let model = Self {
            settings: DevcontainerSettings::default(),
            has_document: false,
            reloaded: false,
            events,
            toaster: ToastManager::default(),
            rebuild_alert,
        };
        model.send(Inbound::Init);

        let toast_overlay = model.toaster.overlay_widget();
        let widgets = view_output!();

        ComponentParts { model, widgets }
    }

    fn update(&mut self, msg: Self::Input, _sender: ComponentSender<Self>) {
        trace!("panel {msg:?}");
        self.reloaded = false;

        match msg {
            PanelInput::Show(Outbound::LoadConfig { config }) => {
                self.settings = config;
                self.has_document = true;
                self.reloaded = true;
            }
            PanelInput::Show(Outbound::NoDevcontainer) => self.has_document = false,
            PanelInput::Notify(notice) => self.toaster.show(&notice),
            PanelInput::OfferRebuild(prompt) => {
                self.rebuild_alert
                    .state()
                    .get_mut()
                    .model
                    .settings
                    .secondary_text = Some(prompt);
                self.rebuild_alert.emit(AlertMsg::Show);
            }
            PanelInput::SetNetworkMode(mode) => self.settings.network_mode = mode,
            PanelInput::SetCustomNetwork(name) => self.settings.custom_network = name,
            PanelInput::SetGpuEnabled(enabled) => self.settings.gpu_enabled = enabled,
            PanelInput::SetGpuMode(mode) => self.settings.gpu_mode = mode,
            PanelInput::SetGpuCount(count) => self.settings.gpu_count = count,
            PanelInput::SetGpuDevices(devices) => self.settings.gpu_devices = devices,
            PanelInput::SetCudaEnv(enabled) => self.settings.set_cuda_env = enabled,
            PanelInput::Apply => self.send(Inbound::ApplyConfig {
                config: self.settings.clone().normalized(),
            }),
            PanelInput::Create => self.send(Inbound::CreateDevcontainer),
            PanelInput::Rebuild => self.send(Inbound::RebuildContainer),
            PanelInput::Ignore => (),
        }
    }
}

/// The controller gets its own thread and runtime, the GTK main loop keeps
/// the main thread.
fn spawn_controller(
    init: PanelInit,
    host: PanelHost,
    events: mpsc::UnboundedSender<Event>,
    rx: mpsc::UnboundedReceiver<Event>,
) {
    let spawned = std::thread::Builder::new()
        .name("controller".into())
        .spawn(move || {
            let runtime = match tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
            {
                Ok(runtime) => runtime,
                Err(e) => {
                    error!("Could not start controller runtime: {e}");
                    return;
                }
            };

            runtime.block_on(async move {
                watch::spawn(&init.workspaces, &events);
                drop(events);

                SyncController::new(
                    &init.workspaces,
                    FsStore,
                    Lint,
                    DevcontainerCli::new(init.rebuild_program),
                    host,
                )
                .run(rx)
                .await;
            });
            debug!("controller thread finished");
        });

    if let Err(e) = spawned {
        error!("Could not start controller thread: {e}");
    }
}

/// Open the settings window and block until it is closed.
pub fn run(init: PanelInit) {
    let app = RelmApp::new("org.devcontainers.editor").with_args(Vec::new());
    app.run::<PanelModel>(init);
}
