//! Read-only log area used by the collection and Agitel panels

use crate::gui::theme::AppTheme;
use eframe::egui::{self, RichText};
use std::collections::VecDeque;

/// Lines kept per buffer; older ones are dropped
pub const MAX_LOG_LINES: usize = 5000;

/// Append-only text log with a line cap
#[derive(Debug, Clone)]
pub struct LogBuffer {
    lines: VecDeque<String>,
    cap: usize,
    placeholder: &'static str,
    /// Set on append, cleared once the view scrolled to the new bottom
    pub scroll_to_bottom: bool,
}

impl LogBuffer {
    pub fn new(placeholder: &'static str) -> Self {
        Self::with_cap(placeholder, MAX_LOG_LINES)
    }

    pub fn with_cap(placeholder: &'static str, cap: usize) -> Self {
        Self {
            lines: VecDeque::new(),
            cap: cap.max(1),
            placeholder,
            scroll_to_bottom: false,
        }
    }

    /// Multi-line messages are split so the cap counts real lines
    pub fn append(&mut self, message: &str) {
        for line in message.lines() {
            self.lines.push_back(line.to_string());
        }
        if message.is_empty() {
            self.lines.push_back(String::new());
        }
        while self.lines.len() > self.cap {
            self.lines.pop_front();
        }
        self.scroll_to_bottom = true;
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.lines.iter().map(String::as_str)
    }

    pub fn text(&self) -> String {
        self.lines.iter().map(String::as_str).collect::<Vec<_>>().join("\n")
    }

    /// Render inside a surface frame, following new lines
    pub fn show(&mut self, ui: &mut egui::Ui, theme: &AppTheme, id: &str, height: f32) {
        let scroll_to_bottom = self.scroll_to_bottom;
        theme.frame_surface().show(ui, |ui| {
            ui.set_min_height(height);
            egui::ScrollArea::vertical()
                .id_source(id)
                .auto_shrink([false, false])
                .max_height(height)
                .show(ui, |ui| {
                    ui.set_min_width(ui.available_width());
                    if self.lines.is_empty() {
                        ui.label(RichText::new(self.placeholder).italics().color(theme.text_secondary));
                    } else {
                        ui.monospace(self.text());
                    }

                    if scroll_to_bottom {
                        let bottom = ui.label("");
                        bottom.scroll_to_me(Some(egui::Align::BOTTOM));
                    }
                });
        });
        self.scroll_to_bottom = false;
    }
}
