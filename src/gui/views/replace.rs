//! Simple find/replace panel

use crate::gui::app::CollectionApp;
use crate::gui::async_job::{spawn_job, AsyncJob};
use crate::gui::helpers::{existing_dir, plural};
use crate::gui::notifications::{poll_operation_state, OperationState};
use crate::gui::theme::SurfaceId;
use crate::replace::{self, MatchMode, ReplaceError, ReplaceHit, ReplaceJob, ReplaceSummary, ReplaceTarget, DEFAULT_EXTENSIONS};
use eframe::egui::{self, RichText};
use std::path::PathBuf;

pub struct ReplaceState {
    pub root: Option<PathBuf>,
    pub find: String,
    pub replace: String,
    pub use_regex: bool,
    pub target: ReplaceTarget,
    pub recursive: bool,
    pub extensions: String,
    pub hits: Vec<ReplaceHit>,
    pub preview_job: Option<AsyncJob<Vec<ReplaceHit>>>,
    pub job: Option<AsyncJob<ReplaceSummary>>,
    pub status: Option<String>,
}

impl Default for ReplaceState {
    fn default() -> Self {
        Self {
            root: None,
            find: String::new(),
            replace: String::new(),
            use_regex: false,
            target: ReplaceTarget::Contents,
            recursive: false,
            extensions: DEFAULT_EXTENSIONS.join(", "),
            hits: Vec::new(),
            preview_job: None,
            job: None,
            status: None,
        }
    }
}

impl ReplaceState {
    pub fn is_running(&self) -> bool {
        self.job.is_some() || self.preview_job.is_some()
    }

    /// Form contents as a job, or the warning to show
    pub fn build_job(&self) -> Result<ReplaceJob, String> {
        let root = self.root.clone().ok_or_else(|| "Selecione uma pasta.".to_string())?;
        if self.find.is_empty() {
            return Err(ReplaceError::EmptyFind.to_string());
        }
        let mut job = ReplaceJob::new(root, self.find.clone(), self.replace.clone());
        job.mode = if self.use_regex { MatchMode::Regex } else { MatchMode::Literal };
        job.target = self.target;
        job.recursive = self.recursive;
        job.extensions = ReplaceJob::parse_extensions(&self.extensions);
        Ok(job)
    }

    pub fn start_preview(&mut self) -> Result<(), String> {
        let job = self.build_job()?;
        self.hits.clear();
        self.status = Some("Buscando...".to_string());
        self.preview_job = Some(spawn_job("replace-preview", move || Ok(replace::preview(&job)?)));
        Ok(())
    }

    pub fn start_apply(&mut self) -> Result<(), String> {
        let job = self.build_job()?;
        self.status = Some("Substituindo...".to_string());
        self.job = Some(spawn_job("replace", move || Ok(replace::apply(&job)?)));
        Ok(())
    }

    /// Collect a finished preview
    pub fn poll_preview(&mut self) -> bool {
        let Some(res) = self.preview_job.as_mut().and_then(AsyncJob::poll) else {
            return false;
        };
        self.preview_job = None;
        match res {
            Ok(hits) => {
                let occurrences: usize = hits.iter().map(|h| h.occurrences).sum();
                let renames = hits.iter().filter(|h| h.new_name.is_some()).count();
                self.status = Some(format!(
                    "{} com alterações: {}, {}.",
                    plural(hits.len(), "arquivo", "arquivos"),
                    plural(occurrences, "ocorrência", "ocorrências"),
                    plural(renames, "renomeação", "renomeações")
                ));
                self.hits = hits;
            }
            Err(e) => self.status = Some(format!("[!!] Falha: {:#}", e)),
        }
        true
    }
}

impl OperationState for ReplaceState {
    type Output = ReplaceSummary;

    fn job_mut(&mut self) -> &mut Option<AsyncJob<ReplaceSummary>> {
        &mut self.job
    }

    fn status_mut(&mut self) -> &mut Option<String> {
        &mut self.status
    }

    fn operation(&self) -> &'static str {
        "Substituição simples"
    }

    fn describe(&self, summary: &ReplaceSummary) -> String {
        let mut text = format!(
            "{} ({}), {}",
            plural(summary.files_rewritten, "arquivo alterado", "arquivos alterados"),
            plural(summary.occurrences, "ocorrência", "ocorrências"),
            plural(summary.files_renamed, "renomeado", "renomeados")
        );
        if summary.skipped_non_utf8 > 0 {
            text.push_str(&format!(
                ", {} ignorados (não UTF-8)",
                summary.skipped_non_utf8
            ));
        }
        for error in &summary.errors {
            text.push_str(&format!("\n{}", error));
        }
        text
    }

    fn finished(&mut self, _summary: &ReplaceSummary) {
        self.hits.clear();
    }
}

impl CollectionApp {
    pub(crate) fn poll_replace(&mut self) {
        self.replace.poll_preview();
        if let Some(line) = poll_operation_state(&mut self.replace, &mut self.notifications) {
            let root = self.replace.root.as_ref().map(|r| r.display().to_string()).unwrap_or_default();
            self.record_operation(
                "substituicao",
                format!("Pasta: {}\nLocalizar: {}\nSubstituir: {}\n{}", root, self.replace.find, self.replace.replace, line),
            );
        }
    }

    pub(crate) fn view_replace(&mut self, ui: &mut egui::Ui) {
        let theme = self.surface_theme(SurfaceId::SimpleReplace);

        self.render_section_header(ui, &theme, "Substituição Simples");
        ui.add_space(theme.spacing_md);

        let running = self.replace.is_running();
        let mut warning = None;
        theme.frame_panel().show(ui, |ui| {
            ui.add_enabled_ui(!running, |ui| {
                ui.horizontal(|ui| {
                    if ui.add(theme.button_secondary("Selecionar Pasta")).clicked() {
                        let mut dialog = rfd::FileDialog::new().set_title("Selecionar Pasta");
                        if let Some(dir) = existing_dir(&self.settings.last_save_dir) {
                            dialog = dialog.set_directory(dir);
                        }
                        if let Some(dir) = dialog.pick_folder() {
                            self.replace.root = Some(dir);
                            self.replace.hits.clear();
                        }
                    }
                    let root = self
                        .replace
                        .root
                        .as_ref()
                        .map(|r| r.display().to_string())
                        .unwrap_or_else(|| "Nenhuma pasta selecionada".to_string());
                    ui.label(RichText::new(root).color(theme.text_secondary));
                });

                egui::Grid::new("replace_form")
                    .num_columns(2)
                    .spacing([theme.spacing_md, theme.spacing_sm])
                    .show(ui, |ui| {
                        ui.label("Localizar:");
                        ui.add(egui::TextEdit::singleline(&mut self.replace.find).desired_width(320.0));
                        ui.end_row();

                        ui.label("Substituir por:");
                        ui.add(egui::TextEdit::singleline(&mut self.replace.replace).desired_width(320.0));
                        ui.end_row();

                        ui.label("Aplicar em:");
                        ui.horizontal(|ui| {
                            ui.radio_value(&mut self.replace.target, ReplaceTarget::Contents, "Conteúdo");
                            ui.radio_value(&mut self.replace.target, ReplaceTarget::FileNames, "Nomes de arquivo");
                            ui.radio_value(&mut self.replace.target, ReplaceTarget::Both, "Ambos");
                        });
                        ui.end_row();

                        ui.label("Extensões:");
                        ui.add(egui::TextEdit::singleline(&mut self.replace.extensions).desired_width(320.0));
                        ui.end_row();
                    });

                ui.horizontal(|ui| {
                    ui.checkbox(&mut self.replace.use_regex, "Expressão regular");
                    ui.checkbox(&mut self.replace.recursive, "Incluir subpastas");
                });

                ui.add_space(theme.spacing_sm);
                ui.horizontal(|ui| {
                    if ui.add(theme.button_secondary("Pré-visualizar")).clicked() {
                        warning = self.replace.start_preview().err();
                    }
                    if ui.add(theme.button_primary("Substituir")).clicked() {
                        warning = self.replace.start_apply().err();
                    }
                });
            });
            if running {
                ui.spinner();
            }
            if let Some(status) = &self.replace.status {
                let color = if status.starts_with("[!!]") { theme.error } else { theme.text_secondary };
                ui.label(RichText::new(status).color(color));
            }
        });
        if let Some(warning) = warning {
            self.dialogs.warning(warning);
        }

        if !self.replace.hits.is_empty() {
            ui.add_space(theme.spacing_md);
            ui.label(RichText::new("Pré-visualização").strong());
            let root = self.replace.root.clone().unwrap_or_default();
            theme.frame_surface().show(ui, |ui| {
                egui::ScrollArea::vertical()
                    .id_source("replace_hits")
                    .auto_shrink([false, false])
                    .show(ui, |ui| {
                        egui::Grid::new("replace_hits_grid").striped(true).show(ui, |ui| {
                            for hit in &self.replace.hits {
                                let shown = hit.path.strip_prefix(&root).unwrap_or(&hit.path);
                                ui.label(shown.display().to_string());
                                ui.label(plural(hit.occurrences, "ocorrência", "ocorrências"));
                                match &hit.new_name {
                                    Some(name) => ui.label(RichText::new(format!("→ {}", name)).color(theme.primary)),
                                    None => ui.label(""),
                                };
                                ui.end_row();
                            }
                        });
                    });
            });
        }
    }
}
