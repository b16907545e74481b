//! Home screen: one tile per group of panels

use crate::gui::app::CollectionApp;
use crate::gui::helpers::shorten_path;
use crate::gui::navigation::TILES;
use crate::gui::theme::SurfaceId;
use eframe::egui::{self, RichText};

const TILE_HINTS: [&str; 3] = [
    "Coleta de faturas nos portais das operadoras",
    "Organização, Agitel, mesclagem e substituição",
    "Em breve",
];

impl CollectionApp {
    pub(crate) fn view_home(&mut self, ui: &mut egui::Ui) {
        let theme = self.surface_theme(SurfaceId::Home);

        ui.add_space(theme.spacing_lg);
        ui.vertical_centered(|ui| {
            ui.label(RichText::new("LE - Automação de Coleta").size(26.0).strong().color(theme.text_primary));
            ui.label(RichText::new(format!("v{}", env!("CARGO_PKG_VERSION"))).small().color(theme.text_secondary));
        });
        ui.add_space(theme.spacing_lg * 2.0);

        let tile_width = theme.button_large.x;
        let total = tile_width * TILES.len() as f32 + theme.spacing_lg * (TILES.len() - 1) as f32;
        let mut clicked = None;
        ui.horizontal(|ui| {
            ui.add_space(((ui.available_width() - total) / 2.0).max(0.0));
            for (i, title) in TILES.iter().enumerate() {
                ui.vertical(|ui| {
                    ui.set_width(tile_width);
                    if ui.add(theme.button_tile(title)).on_hover_text(TILE_HINTS[i]).clicked() {
                        clicked = Some(i);
                    }
                    ui.label(RichText::new(TILE_HINTS[i]).small().color(theme.text_secondary));
                });
                ui.add_space(theme.spacing_lg);
            }
        });

        if let Some(tile) = clicked {
            let panel = self.navigator.select_tile(tile);
            tracing::debug!("Tile {} opened {:?}", tile, panel);
        }

        ui.add_space(theme.spacing_lg * 2.0);
        let settings_path = self.settings.path_display();
        let log_path = crate::operation_log::log_file_path();
        ui.vertical_centered(|ui| {
            for (label, path) in [("Configurações", &settings_path), ("Histórico", &log_path)] {
                ui.label(
                    RichText::new(format!("{}: {}", label, shorten_path(path, 70)))
                        .small()
                        .color(theme.text_secondary),
                )
                .on_hover_text(path.as_str());
            }
        });
    }
}
