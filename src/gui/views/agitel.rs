//! Agitel report processing panel

use crate::agitel::{AgitelEvent, AgitelProcessor};
use crate::automation::WorkerPool;
use crate::gui::app::CollectionApp;
use crate::gui::helpers::existing_dir;
use crate::gui::notifications::notify;
use crate::gui::theme::SurfaceId;
use crate::gui::widgets::LogBuffer;
use eframe::egui::{self, RichText};
use std::path::PathBuf;
use tokio::sync::mpsc::error::TryRecvError;
use tokio::sync::mpsc::UnboundedReceiver;

/// How a run ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AgitelOutcome {
    Finished(PathBuf),
    Failed(String),
}

pub struct AgitelState {
    pub input: Option<PathBuf>,
    pub equalize: bool,
    pub progress: u8,
    pub log: LogBuffer,
    pub error: Option<String>,
    pub output: Option<PathBuf>,
    receiver: Option<UnboundedReceiver<AgitelEvent>>,
}

impl Default for AgitelState {
    fn default() -> Self {
        Self {
            input: None,
            equalize: false,
            progress: 0,
            log: LogBuffer::new("Log do processamento"),
            error: None,
            output: None,
            receiver: None,
        }
    }
}

impl AgitelState {
    pub fn is_running(&self) -> bool {
        self.receiver.is_some()
    }

    /// Reset the panel and start watching a new run
    pub fn begin(&mut self, receiver: UnboundedReceiver<AgitelEvent>) {
        self.progress = 0;
        self.error = None;
        self.output = None;
        self.log.clear();
        self.receiver = Some(receiver);
    }

    pub fn start(&mut self, pool: &WorkerPool) -> Option<String> {
        if self.is_running() {
            return None;
        }
        let Some(input) = self.input.clone() else {
            return Some("Selecione um arquivo Excel.".to_string());
        };
        let receiver = AgitelProcessor::new(input, self.equalize).spawn(pool);
        self.begin(receiver);
        None
    }

    /// Apply every queued event; returns the outcome once the run ends
    pub fn poll(&mut self) -> Option<AgitelOutcome> {
        let receiver = self.receiver.as_mut()?;
        let mut outcome = None;
        loop {
            match receiver.try_recv() {
                Ok(AgitelEvent::Progress(p)) => self.progress = p,
                Ok(AgitelEvent::Log(line)) => self.log.append(&line),
                Ok(AgitelEvent::Error(e)) => {
                    self.error = Some(e.clone());
                    outcome = Some(AgitelOutcome::Failed(e));
                    break;
                }
                Ok(AgitelEvent::Finished(path)) => {
                    self.progress = 100;
                    self.output = Some(path.clone());
                    outcome = Some(AgitelOutcome::Finished(path));
                    break;
                }
                Err(TryRecvError::Empty) => return None,
                Err(TryRecvError::Disconnected) => {
                    let e = "O processamento foi interrompido.".to_string();
                    self.error = Some(e.clone());
                    outcome = Some(AgitelOutcome::Failed(e));
                    break;
                }
            }
        }
        self.receiver = None;
        outcome
    }
}

impl CollectionApp {
    pub(crate) fn poll_agitel(&mut self) {
        if let Some(outcome) = self.agitel.poll() {
            let input = self.agitel.input.as_ref().map(|p| p.display().to_string()).unwrap_or_default();
            let line = match &outcome {
                AgitelOutcome::Finished(path) => format!("Arquivo gerado: {}", path.display()),
                AgitelOutcome::Failed(e) => format!("Falha: {}", e),
            };
            notify(&mut self.notifications, format!("Processamento Agitel: {}", line));
            self.record_operation("agitel", format!("Entrada: {}\n{}", input, line));
        }
    }

    pub(crate) fn view_agitel(&mut self, ui: &mut egui::Ui) {
        let theme = self.surface_theme(SurfaceId::AgitelProcessing);

        self.render_section_header(ui, &theme, "Processamento Agitel");
        ui.add_space(theme.spacing_md);

        let running = self.agitel.is_running();
        theme.frame_panel().show(ui, |ui| {
            ui.horizontal(|ui| {
                if ui.add_enabled(!running, theme.button_secondary("Selecionar Arquivo")).clicked() {
                    let mut dialog = rfd::FileDialog::new()
                        .set_title("Selecionar Relatório Agitel")
                        .add_filter("Arquivos Excel", &["xlsx", "xlsm", "xls"]);
                    if let Some(dir) = existing_dir(&self.settings.last_open_dir) {
                        dialog = dialog.set_directory(dir);
                    }
                    if let Some(path) = dialog.pick_file() {
                        self.agitel.input = Some(path);
                    }
                }
                let input = self
                    .agitel
                    .input
                    .as_ref()
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|| "Nenhum arquivo selecionado".to_string());
                ui.label(RichText::new(input).color(theme.text_secondary));
            });
            ui.add_enabled(
                !running,
                egui::Checkbox::new(&mut self.agitel.equalize, "Equalizar valores entre as linhas"),
            );

            ui.add_space(theme.spacing_sm);
            if ui.add_enabled(!running, theme.button_primary("Processar")).clicked() {
                if let Some(warning) = self.agitel.start(&self.pool) {
                    self.dialogs.warning(warning);
                }
            }

            ui.add_space(theme.spacing_sm);
            ui.add(
                egui::ProgressBar::new(self.agitel.progress as f32 / 100.0)
                    .show_percentage()
                    .animate(running),
            );

            if let Some(output) = self.agitel.output.clone() {
                ui.horizontal(|ui| {
                    ui.label(RichText::new(format!("[OK] {}", output.display())).color(theme.success));
                    if ui.add(theme.button_small("Abrir")).clicked() {
                        if let Err(e) = open::that(&output) {
                            self.dialogs.error(format!("Não foi possível abrir o arquivo: {}", e));
                        }
                    }
                });
            }
        });

        ui.add_space(theme.spacing_md);
        if let Some(error) = &self.agitel.error {
            egui::Frame::none()
                .fill(theme.surface)
                .stroke(egui::Stroke::new(1.0, theme.error))
                .rounding(6.0)
                .inner_margin(theme.spacing_sm)
                .show(ui, |ui| {
                    ui.set_min_width(ui.available_width());
                    ui.label(RichText::new(format!("[XX] {}", error)).color(theme.error));
                });
            ui.add_space(theme.spacing_sm);
        }

        let height = (ui.available_height() - theme.spacing_lg).max(120.0);
        self.agitel.log.show(ui, &theme, "agitel_log", height);
    }
}
