//! Folder organization panel

use crate::gui::app::CollectionApp;
use crate::gui::async_job::{spawn_job, AsyncJob};
use crate::gui::helpers::{existing_dir, plural};
use crate::gui::notifications::{poll_operation_state, OperationState};
use crate::gui::theme::SurfaceId;
use crate::organize::{apply_plan, plan_organization, OrganizeStrategy, OrganizeSummary, PlannedMove};
use eframe::egui::{self, RichText};
use std::path::PathBuf;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StrategyChoice {
    Extension,
    Month,
    Prefix,
}

impl StrategyChoice {
    const ALL: [StrategyChoice; 3] = [StrategyChoice::Extension, StrategyChoice::Month, StrategyChoice::Prefix];
}

pub struct OrganizeState {
    pub root: Option<PathBuf>,
    pub choice: StrategyChoice,
    pub separator: String,
    pub plan: Vec<PlannedMove>,
    pub job: Option<AsyncJob<OrganizeSummary>>,
    pub status: Option<String>,
}

impl Default for OrganizeState {
    fn default() -> Self {
        Self {
            root: None,
            choice: StrategyChoice::Extension,
            separator: "-".to_string(),
            plan: Vec::new(),
            job: None,
            status: None,
        }
    }
}

impl OrganizeState {
    pub fn strategy(&self) -> OrganizeStrategy {
        match self.choice {
            StrategyChoice::Extension => OrganizeStrategy::ByExtension,
            StrategyChoice::Month => OrganizeStrategy::ByModifiedMonth,
            StrategyChoice::Prefix => OrganizeStrategy::ByPrefix {
                separator: self.separator.clone(),
            },
        }
    }

    /// Recompute the preview for the chosen folder
    pub fn refresh_plan(&mut self) {
        self.plan.clear();
        let Some(root) = &self.root else {
            return;
        };
        match plan_organization(root, &self.strategy()) {
            Ok(plan) => {
                self.status = Some(format!("{} para mover.", plural(plan.len(), "arquivo", "arquivos")));
                self.plan = plan;
            }
            Err(e) => self.status = Some(format!("[!!] Falha: {:#}", e)),
        }
    }

    /// Run the previewed plan in the background
    pub fn start(&mut self) -> bool {
        if self.plan.is_empty() || self.job.is_some() {
            return false;
        }
        let plan = std::mem::take(&mut self.plan);
        self.status = Some("Organizando...".to_string());
        self.job = Some(spawn_job("organize", move || apply_plan(&plan)));
        true
    }
}

impl OperationState for OrganizeState {
    type Output = OrganizeSummary;

    fn job_mut(&mut self) -> &mut Option<AsyncJob<OrganizeSummary>> {
        &mut self.job
    }

    fn status_mut(&mut self) -> &mut Option<String> {
        &mut self.status
    }

    fn operation(&self) -> &'static str {
        "Organização de pastas"
    }

    fn describe(&self, summary: &OrganizeSummary) -> String {
        format!(
            "{} movidos para {}",
            plural(summary.moved, "arquivo", "arquivos"),
            plural(summary.folders, "pasta", "pastas")
        )
    }
}

impl CollectionApp {
    pub(crate) fn poll_organize(&mut self) {
        if let Some(line) = poll_operation_state(&mut self.organize, &mut self.notifications) {
            let root = self.organize.root.as_ref().map(|r| r.display().to_string()).unwrap_or_default();
            self.record_operation("organizacao", format!("Pasta: {}\n{}", root, line));
        }
    }

    pub(crate) fn view_organize(&mut self, ui: &mut egui::Ui) {
        let theme = self.surface_theme(SurfaceId::FolderOrganization);

        self.render_section_header(ui, &theme, "Organização de Pastas");
        ui.add_space(theme.spacing_md);

        let running = self.organize.job.is_some();
        theme.frame_panel().show(ui, |ui| {
            ui.horizontal(|ui| {
                if ui.add_enabled(!running, theme.button_secondary("Selecionar Pasta")).clicked() {
                    let mut dialog = rfd::FileDialog::new().set_title("Selecionar Pasta para Organizar");
                    if let Some(dir) = existing_dir(&self.settings.last_save_dir) {
                        dialog = dialog.set_directory(dir);
                    }
                    if let Some(dir) = dialog.pick_folder() {
                        self.organize.root = Some(dir);
                        self.organize.refresh_plan();
                    }
                }
                let root = self
                    .organize
                    .root
                    .as_ref()
                    .map(|r| r.display().to_string())
                    .unwrap_or_else(|| "Nenhuma pasta selecionada".to_string());
                ui.label(RichText::new(root).color(theme.text_secondary));
            });

            ui.add_space(theme.spacing_sm);
            let mut changed = false;
            ui.horizontal(|ui| {
                ui.label("Agrupar:");
                for choice in StrategyChoice::ALL {
                    let label = match choice {
                        StrategyChoice::Extension => OrganizeStrategy::ByExtension.to_string(),
                        StrategyChoice::Month => OrganizeStrategy::ByModifiedMonth.to_string(),
                        StrategyChoice::Prefix => OrganizeStrategy::ByPrefix {
                            separator: String::new(),
                        }
                        .to_string(),
                    };
                    changed |= ui.radio_value(&mut self.organize.choice, choice, label).changed();
                }
                if self.organize.choice == StrategyChoice::Prefix {
                    ui.label("Separador:");
                    changed |= ui
                        .add(egui::TextEdit::singleline(&mut self.organize.separator).desired_width(40.0))
                        .changed();
                }
            });
            if changed && !running {
                self.organize.refresh_plan();
            }

            ui.add_space(theme.spacing_sm);
            let can_start = !running && !self.organize.plan.is_empty();
            if ui.add_enabled(can_start, theme.button_primary("Organizar")).clicked() {
                self.organize.start();
            }
            if running {
                ui.spinner();
            }
            if let Some(status) = &self.organize.status {
                let color = if status.starts_with("[!!]") { theme.error } else { theme.text_secondary };
                ui.label(RichText::new(status).color(color));
            }
        });

        ui.add_space(theme.spacing_md);
        if !self.organize.plan.is_empty() {
            ui.label(RichText::new("Pré-visualização").strong());
            theme.frame_surface().show(ui, |ui| {
                egui::ScrollArea::vertical()
                    .id_source("organize_plan")
                    .auto_shrink([false, false])
                    .show(ui, |ui| {
                        egui::Grid::new("organize_plan_grid").striped(true).show(ui, |ui| {
                            for planned in &self.organize.plan {
                                let name = planned
                                    .from
                                    .file_name()
                                    .map(|n| n.to_string_lossy().to_string())
                                    .unwrap_or_default();
                                ui.label(name);
                                ui.label(RichText::new(format!("→ {}", planned.folder())).color(theme.primary));
                                ui.end_row();
                            }
                        });
                    });
            });
        }
    }
}
