//! Blocking message boxes.
//!
//! Dialogs are queued and shown one at a time as a modal window; while one is
//! open the panels underneath are disabled.

use super::theme::AppTheme;
use eframe::egui;
use std::collections::VecDeque;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DialogKind {
    Warning,
    Error,
    Info,
}

impl DialogKind {
    pub fn title(self) -> &'static str {
        match self {
            DialogKind::Warning => "Aviso",
            DialogKind::Error => "Erro",
            DialogKind::Info => "Informação",
        }
    }

    fn marker(self) -> &'static str {
        match self {
            DialogKind::Warning => "[!]",
            DialogKind::Error => "[X]",
            DialogKind::Info => "[i]",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Dialog {
    pub kind: DialogKind,
    pub message: String,
}

#[derive(Debug, Default)]
pub struct DialogQueue {
    pending: VecDeque<Dialog>,
}

impl DialogQueue {
    pub fn push(&mut self, kind: DialogKind, message: impl Into<String>) {
        let message = message.into();
        tracing::debug!("{} dialog: {}", kind.title(), message);
        self.pending.push_back(Dialog { kind, message });
    }

    pub fn warning(&mut self, message: impl Into<String>) {
        self.push(DialogKind::Warning, message);
    }

    pub fn error(&mut self, message: impl Into<String>) {
        self.push(DialogKind::Error, message);
    }

    pub fn info(&mut self, message: impl Into<String>) {
        self.push(DialogKind::Info, message);
    }

    pub fn current(&self) -> Option<&Dialog> {
        self.pending.front()
    }

    pub fn is_open(&self) -> bool {
        !self.pending.is_empty()
    }

    pub fn dismiss(&mut self) -> Option<Dialog> {
        self.pending.pop_front()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Draw the front dialog; "OK" dismisses it
    pub fn show(&mut self, ctx: &egui::Context, theme: &AppTheme) {
        let Some(dialog) = self.current().cloned() else {
            return;
        };

        // Dim everything behind the dialog
        let screen = ctx.screen_rect();
        egui::Area::new(egui::Id::new("dialog_backdrop"))
            .fixed_pos(screen.min)
            .order(egui::Order::Middle)
            .show(ctx, |ui| {
                ui.allocate_rect(screen, egui::Sense::click());
                ui.painter()
                    .rect_filled(screen, 0.0, egui::Color32::from_black_alpha(120));
            });

        let color = match dialog.kind {
            DialogKind::Warning => theme.warning,
            DialogKind::Error => theme.error,
            DialogKind::Info => theme.primary,
        };

        let mut dismissed = false;
        egui::Window::new(dialog.kind.title())
            .id(egui::Id::new("dialog_window"))
            .collapsible(false)
            .resizable(false)
            .order(egui::Order::Foreground)
            .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
            .show(ctx, |ui| {
                ui.set_min_width(320.0);
                ui.horizontal(|ui| {
                    ui.label(egui::RichText::new(dialog.kind.marker()).color(color).strong());
                    ui.label(&dialog.message);
                });
                ui.add_space(theme.spacing_md);
                ui.vertical_centered(|ui| {
                    if ui.add(theme.button_small("OK")).clicked() {
                        dismissed = true;
                    }
                });
            });

        if dismissed || ctx.input(|i| i.key_pressed(egui::Key::Enter)) {
            self.dismiss();
        }
    }
}
