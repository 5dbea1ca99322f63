/*
    Copyright 2025 TII (SSRC) and the contributors
    SPDX-License-Identifier: Apache-2.0
*/
use relm4::abstractions::Toaster;
use relm4::adw;
use relm4::gtk;
use relm4::gtk::pango;

use crate::protocol::{Notice, NoticeLevel};

#[derive(Default)]
pub struct ToastManager {
    toaster: Toaster,
}

impl ToastManager {
    fn create_label(&self, msg: &str, icon_text: &str, icon_color: &str) -> gtk::Label {
        gtk::Label::builder()
            .selectable(true)
            .wrap(true)
            .wrap_mode(pango::WrapMode::WordChar)
            .max_width_chars(70)
            .xalign(0.5)
            .halign(gtk::Align::Center)
            .justify(gtk::Justification::Center)
            .margin_start(12)
            .use_markup(true)
            .label(format!(
                "<span foreground='{}' font='20'><b>{}</b></span> <span foreground='white' font='13'><b>{}</b></span>",
                icon_color,
                icon_text,
                gtk::glib::markup_escape_text(msg)
            ))
            .build()
    }

    /// Errors stay until dismissed, everything else times out.
    pub fn show(&self, notice: &Notice) {
        let (icon_text, icon_color, timeout, priority) = match notice.level {
            NoticeLevel::Error => ("✖", "red", 0, adw::ToastPriority::High),
            NoticeLevel::Warning => ("!", "orange", 5, adw::ToastPriority::High),
            NoticeLevel::Info => ("✓", "lime", 2, adw::ToastPriority::Normal),
        };

        let label = self.create_label(&notice.message, icon_text, icon_color);

        let toast = adw::Toast::builder()
            .custom_title(&label)
            .timeout(timeout)
            .priority(priority)
            .build();

        self.toaster.add_toast(toast);
    }

    pub fn overlay_widget(&self) -> &adw::ToastOverlay {
        self.toaster.overlay_widget()
    }
}
