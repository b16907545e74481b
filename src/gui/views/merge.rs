//! Spreadsheet merge panel

use crate::gui::app::CollectionApp;
use crate::gui::async_job::{spawn_job, AsyncJob};
use crate::gui::helpers::{existing_dir, plural};
use crate::gui::notifications::{poll_operation_state, OperationState};
use crate::gui::theme::SurfaceId;
use crate::merge::{merge_spreadsheets, MergeOptions, MergeSummary, INPUT_EXTENSIONS};
use eframe::egui::{self, RichText};
use std::path::{Path, PathBuf};

#[derive(Default)]
pub struct MergeState {
    pub inputs: Vec<PathBuf>,
    pub add_source_column: bool,
    pub job: Option<AsyncJob<MergeSummary>>,
    pub status: Option<String>,
    pub last_output: Option<PathBuf>,
}

impl MergeState {
    /// Add files not already listed, keeping selection order
    pub fn add_inputs(&mut self, paths: impl IntoIterator<Item = PathBuf>) {
        for path in paths {
            if !self.inputs.contains(&path) {
                self.inputs.push(path);
            }
        }
    }

    pub fn start(&mut self, output: PathBuf) -> bool {
        if self.job.is_some() {
            return false;
        }
        let inputs = self.inputs.clone();
        let options = MergeOptions {
            add_source_column: self.add_source_column,
        };
        self.status = Some("Mesclando...".to_string());
        self.job = Some(spawn_job("merge", move || {
            Ok(merge_spreadsheets(&inputs, &output, &options)?)
        }));
        true
    }
}

impl OperationState for MergeState {
    type Output = MergeSummary;

    fn job_mut(&mut self) -> &mut Option<AsyncJob<MergeSummary>> {
        &mut self.job
    }

    fn status_mut(&mut self) -> &mut Option<String> {
        &mut self.status
    }

    fn operation(&self) -> &'static str {
        "Mesclagem de planilhas"
    }

    fn describe(&self, summary: &MergeSummary) -> String {
        format!(
            "{} mescladas em {} ({}, {})",
            plural(summary.files, "planilha", "planilhas"),
            summary.output.display(),
            plural(summary.rows, "linha", "linhas"),
            plural(summary.columns, "coluna", "colunas")
        )
    }

    fn finished(&mut self, summary: &MergeSummary) {
        self.last_output = Some(summary.output.clone());
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}

impl CollectionApp {
    pub(crate) fn poll_merge(&mut self) {
        if let Some(line) = poll_operation_state(&mut self.merge, &mut self.notifications) {
            let inputs: Vec<String> = self.merge.inputs.iter().map(|p| p.display().to_string()).collect();
            self.record_operation("mesclagem", format!("Entradas:\n{}\n{}", inputs.join("\n"), line));
        }
    }

    pub(crate) fn view_merge(&mut self, ui: &mut egui::Ui) {
        let theme = self.surface_theme(SurfaceId::SpreadsheetMerge);

        self.render_section_header(ui, &theme, "Mesclagem de Planilhas");
        ui.add_space(theme.spacing_md);

        let running = self.merge.job.is_some();
        theme.frame_panel().show(ui, |ui| {
            ui.horizontal(|ui| {
                if ui.add_enabled(!running, theme.button_secondary("Adicionar Planilhas")).clicked() {
                    let mut dialog = rfd::FileDialog::new()
                        .set_title("Selecionar Planilhas")
                        .add_filter("Planilhas", INPUT_EXTENSIONS);
                    if let Some(dir) = existing_dir(&self.settings.last_open_dir) {
                        dialog = dialog.set_directory(dir);
                    }
                    if let Some(paths) = dialog.pick_files() {
                        self.merge.add_inputs(paths);
                    }
                }
                if ui
                    .add_enabled(!running && !self.merge.inputs.is_empty(), theme.button_secondary("Limpar"))
                    .clicked()
                {
                    self.merge.inputs.clear();
                }
            });
            ui.add_enabled(
                !running,
                egui::Checkbox::new(&mut self.merge.add_source_column, "Adicionar coluna ARQUIVO ORIGEM"),
            );

            ui.add_space(theme.spacing_sm);
            if ui.add_enabled(!running, theme.button_primary("Mesclar")).clicked() {
                if self.merge.inputs.is_empty() {
                    self.dialogs.warning("Selecione ao menos uma planilha para mesclar.");
                } else {
                    let mut dialog = rfd::FileDialog::new()
                        .set_title("Salvar Planilha Mesclada")
                        .set_file_name("mesclado.xlsx")
                        .add_filter("Arquivos Excel", &["xlsx"]);
                    if let Some(dir) = existing_dir(&self.settings.last_save_dir) {
                        dialog = dialog.set_directory(dir);
                    }
                    if let Some(output) = dialog.save_file() {
                        self.merge.start(output.with_extension("xlsx"));
                    }
                }
            }
            if running {
                ui.spinner();
            }
            if let Some(status) = &self.merge.status {
                let color = if status.starts_with("[!!]") { theme.error } else { theme.text_secondary };
                ui.label(RichText::new(status).color(color));
            }
            if let Some(output) = self.merge.last_output.clone() {
                if ui.link(RichText::new("Abrir planilha mesclada").color(theme.primary)).clicked() {
                    if let Err(e) = open::that(&output) {
                        self.dialogs.error(format!("Não foi possível abrir o arquivo: {}", e));
                    }
                }
            }
        });

        ui.add_space(theme.spacing_md);
        ui.label(RichText::new(format!("Planilhas ({})", self.merge.inputs.len())).strong());
        let mut remove = None;
        theme.frame_surface().show(ui, |ui| {
            egui::ScrollArea::vertical()
                .id_source("merge_inputs")
                .auto_shrink([false, false])
                .show(ui, |ui| {
                    if self.merge.inputs.is_empty() {
                        ui.label(RichText::new("Nenhuma planilha adicionada").italics().color(theme.text_secondary));
                    }
                    for (i, path) in self.merge.inputs.iter().enumerate() {
                        ui.horizontal(|ui| {
                            if ui.add_enabled(!running, egui::Button::new("✕").small()).clicked() {
                                remove = Some(i);
                            }
                            ui.label(file_name(path)).on_hover_text(path.display().to_string());
                        });
                    }
                });
        });
        if let Some(i) = remove {
            self.merge.inputs.remove(i);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::time::{Duration, Instant};

    #[test]
    fn test_add_inputs_skips_duplicates() {
        let mut state = MergeState::default();
        state.add_inputs(vec![PathBuf::from("a.xlsx"), PathBuf::from("b.csv")]);
        state.add_inputs(vec![PathBuf::from("a.xlsx"), PathBuf::from("c.xls")]);
        assert_eq!(
            state.inputs,
            vec![PathBuf::from("a.xlsx"), PathBuf::from("b.csv"), PathBuf::from("c.xls")]
        );
    }

    #[test]
    fn test_merge_job_reports_summary() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.csv");
        let b = dir.path().join("b.csv");
        std::fs::write(&a, "NOME;VALOR\nx;1\n").unwrap();
        std::fs::write(&b, "NOME;CIDADE\ny;Natal\nz;Recife\n").unwrap();
        let output = dir.path().join("saida.xlsx");
        let mut state = MergeState::default();
        state.add_inputs(vec![a, b]);

        assert!(state.start(output.clone()));
        assert!(!state.start(output.clone()));

        let mut notifications = VecDeque::new();
        let deadline = Instant::now() + Duration::from_secs(5);
        let line = loop {
            if let Some(line) = poll_operation_state(&mut state, &mut notifications) {
                break line;
            }
            assert!(Instant::now() < deadline, "merge did not finish");
            std::thread::sleep(Duration::from_millis(5));
        };

        assert!(line.starts_with("2 planilhas mescladas em"));
        assert!(line.ends_with("(3 linhas, 3 colunas)"));
        assert_eq!(state.last_output, Some(output.clone()));
        assert!(output.exists());
    }

    #[test]
    fn test_merge_failure_sets_status() {
        let dir = tempfile::tempdir().unwrap();
        let mut state = MergeState::default();
        state.add_inputs(vec![dir.path().join("sumiu.csv")]);
        state.start(dir.path().join("saida.xlsx"));

        let mut notifications = VecDeque::new();
        let deadline = Instant::now() + Duration::from_secs(5);
        while poll_operation_state(&mut state, &mut notifications).is_none() {
            assert!(Instant::now() < deadline, "merge did not finish");
            std::thread::sleep(Duration::from_millis(5));
        }

        assert!(state.status.unwrap().starts_with("[!!] Falha"));
        assert!(state.last_output.is_none());
    }
}
