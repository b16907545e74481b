//! Invoice collection panel
//!
//! Save folder and spreadsheet pickers, the carrier selector, the start button
//! and the two log areas fed by the running automation.

use crate::automation::{
    dispatch, log_channel, DispatchError, DispatchRequest, Dispatched, LogReceiver, LogSink, LogSurface,
};
use crate::gui::app::CollectionApp;
use crate::gui::helpers::existing_dir;
use crate::gui::theme::SurfaceId;
use crate::gui::widgets::LogBuffer;
use crate::invoices::{InvoiceTable, LoadError};
use crate::settings::Settings;
use eframe::egui::{self, RichText};
use std::path::Path;

pub const NO_CARRIERS_PLACEHOLDER: &str = "Selecione uma planilha primeiro";

pub struct CollectionState {
    pub table: InvoiceTable,
    pub carriers: Vec<String>,
    pub selected_carrier: Option<String>,
    pub technical_log: LogBuffer,
    pub invoice_log: LogBuffer,
    log_sink: LogSink,
    log_receiver: LogReceiver,
}

impl Default for CollectionState {
    fn default() -> Self {
        let (log_sink, log_receiver) = log_channel();
        Self {
            table: InvoiceTable::empty(),
            carriers: Vec::new(),
            selected_carrier: None,
            technical_log: LogBuffer::new(LogSurface::Technical.placeholder()),
            invoice_log: LogBuffer::new(LogSurface::Invoices.placeholder()),
            log_sink,
            log_receiver,
        }
    }
}

impl CollectionState {
    /// Replace the table with `path`, or empty it on failure.
    /// A successful load becomes the remembered spreadsheet.
    pub fn load_data_file(&mut self, path: &Path, settings: &mut Settings) -> Result<usize, LoadError> {
        match InvoiceTable::load(path) {
            Ok(table) => {
                self.carriers = table.carriers();
                self.selected_carrier = self.carriers.first().cloned();
                self.table = table;
                if let Err(e) = settings.set_data_path(path) {
                    tracing::warn!("Failed to save settings: {}", e);
                }
                Ok(self.table.len())
            }
            Err(e) => {
                tracing::warn!("Failed to load {}: {}", path.display(), e);
                self.table = InvoiceTable::empty();
                self.carriers.clear();
                self.selected_carrier = None;
                Err(e)
            }
        }
    }

    /// Move pending worker messages into the log areas
    pub fn drain_logs(&mut self) -> usize {
        let events = self.log_receiver.drain();
        for event in &events {
            let line = format!("[{}] {}", event.timestamp.format("%H:%M:%S"), event.message);
            match event.surface {
                LogSurface::Technical => self.technical_log.append(&line),
                LogSurface::Invoices => self.invoice_log.append(&line),
            }
        }
        events.len()
    }

    pub fn log_sink(&self) -> LogSink {
        self.log_sink.clone()
    }
}

impl CollectionApp {
    /// Load the remembered spreadsheet, if any
    pub(crate) fn restore_data_file(&mut self) {
        if self.settings.has_data_path() {
            let path = self.settings.data_path.clone();
            self.load_data_file(Path::new(&path));
        }
    }

    pub(crate) fn load_data_file(&mut self, path: &Path) {
        match self.collection.load_data_file(path, &mut self.settings) {
            Ok(rows) => {
                self.collection
                    .technical_log
                    .append(&format!("Planilha carregada: {} ({} faturas pendentes)", path.display(), rows));
            }
            Err(e) => self.dialogs.error(e.user_message()),
        }
    }

    fn pick_data_file(&mut self) {
        let mut dialog = rfd::FileDialog::new()
            .set_title("Selecionar Planilha de Dados")
            .add_filter("Arquivos Excel", &["xlsx", "xlsm"]);
        if let Some(dir) = existing_dir(&self.settings.last_open_dir) {
            dialog = dialog.set_directory(dir);
        }
        if let Some(path) = dialog.pick_file() {
            self.load_data_file(&path);
        }
    }

    fn pick_save_directory(&mut self) {
        let mut dialog = rfd::FileDialog::new().set_title("Selecionar Diretório de Salvamento");
        if let Some(dir) = existing_dir(&self.settings.last_save_dir) {
            dialog = dialog.set_directory(dir);
        }
        if let Some(dir) = dialog.pick_folder() {
            if let Err(e) = self.settings.set_save_directory(&dir) {
                tracing::warn!("Failed to save settings: {}", e);
                self.dialogs.error(format!("Erro ao salvar as configurações: {}", e));
            }
        }
    }

    /// Validate the form and hand the rows to the worker pool
    pub(crate) fn start_automation(&mut self) -> Result<Dispatched, DispatchError> {
        let request = DispatchRequest {
            save_directory: &self.settings.save_directory,
            carrier: self.collection.selected_carrier.as_deref(),
            data_path: &self.settings.data_path,
            table: &self.collection.table,
        };
        let dispatched = dispatch(
            request,
            &self.registry,
            &self.config,
            &self.pool,
            self.collection.log_sink(),
        )?;

        self.collection.technical_log.append(&format!(
            "Automação {} iniciada com {} fatura(s).",
            dispatched.carrier, dispatched.rows
        ));
        if let Err(e) = crate::operation_log::append_log(
            "coleta",
            format!(
                "Operadora: {}\nFaturas: {}\nDestino: {}",
                dispatched.carrier, dispatched.rows, self.settings.save_directory
            ),
        ) {
            tracing::warn!("Failed to write operation log: {}", e);
        }
        self.started.push(dispatched.automator.clone());
        Ok(dispatched)
    }

    pub(crate) fn view_collection(&mut self, ui: &mut egui::Ui) {
        let theme = self.surface_theme(SurfaceId::CollectionAutomation);

        self.render_section_header(ui, &theme, "Automação da Coleta");
        ui.add_space(theme.spacing_md);

        let field_width = (ui.available_width() - 360.0).max(200.0);
        egui::Grid::new("collection_form")
            .num_columns(3)
            .spacing([theme.spacing_md, theme.spacing_sm])
            .show(ui, |ui| {
                ui.label("Local de Salvamento:");
                let mut save_dir = self.settings.save_directory.clone();
                ui.add(egui::TextEdit::singleline(&mut save_dir).interactive(false).desired_width(field_width));
                if ui.add(theme.button_secondary("Selecionar Pasta")).clicked() {
                    self.pick_save_directory();
                }
                ui.end_row();

                ui.label("Planilha de dados:");
                let mut data_path = self.settings.data_path.clone();
                ui.add(egui::TextEdit::singleline(&mut data_path).interactive(false).desired_width(field_width));
                if ui.add(theme.button_secondary("Selecionar Planilha")).clicked() {
                    self.pick_data_file();
                }
                ui.end_row();

                ui.label("Selecionar Operadora:");
                let shown = self
                    .collection
                    .selected_carrier
                    .clone()
                    .unwrap_or_else(|| NO_CARRIERS_PLACEHOLDER.to_string());
                egui::ComboBox::from_id_source("carrier_combo")
                    .selected_text(shown)
                    .width(field_width)
                    .show_ui(ui, |ui| {
                        for carrier in &self.collection.carriers {
                            ui.selectable_value(
                                &mut self.collection.selected_carrier,
                                Some(carrier.clone()),
                                carrier,
                            );
                        }
                    });
                if ui.add(theme.button_primary("Iniciar automação")).clicked() {
                    match self.start_automation() {
                        Ok(_) => {}
                        Err(e) => self.dialogs.warning(e.to_string()),
                    }
                }
                ui.end_row();
            });

        ui.add_space(theme.spacing_sm);
        if !self.started.is_empty() && !self.settings.save_directory.is_empty() {
            if ui.link(RichText::new("Abrir pasta de salvamento").color(theme.primary)).clicked() {
                if let Err(e) = open::that(&self.settings.save_directory) {
                    self.dialogs.error(format!("Não foi possível abrir a pasta: {}", e));
                }
            }
        }
        ui.add_space(theme.spacing_sm);

        let height = (ui.available_height() - theme.spacing_lg).max(160.0);
        let column_width = (ui.available_width() - theme.spacing_md) / 2.0;
        ui.horizontal_top(|ui| {
            ui.vertical(|ui| {
                ui.set_width(column_width);
                self.collection.technical_log.show(ui, &theme, "technical_log", height);
            });
            ui.vertical(|ui| {
                ui.set_width(column_width);
                self.collection.invoice_log.show(ui, &theme, "invoice_log", height);
            });
        });
    }
}
