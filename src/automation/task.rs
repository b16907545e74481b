use super::{CollectionSummary, InvoiceAutomator, LogSink};
use crate::invoices::InvoiceRow;
use std::sync::Arc;

/// One collection run. Owns its row snapshot, so the UI's table is never shared with the worker.
pub struct AutomationTask {
    automator: Arc<dyn InvoiceAutomator>,
    rows: Vec<InvoiceRow>,
    log: LogSink,
}

impl AutomationTask {
    pub fn new(automator: Arc<dyn InvoiceAutomator>, rows: Vec<InvoiceRow>, log: LogSink) -> Self {
        Self { automator, rows, log }
    }

    pub fn carrier(&self) -> &str {
        self.automator.carrier()
    }

    pub fn rows(&self) -> &[InvoiceRow] {
        &self.rows
    }

    /// Run to completion on a worker; errors go to the technical log, never back to the caller
    pub async fn run(self) -> Option<CollectionSummary> {
        let carrier = self.automator.carrier().to_string();
        self.log.technical(format!(
            "Iniciando automação {} com {} fatura(s) pendente(s).",
            carrier,
            self.rows.len()
        ));

        match self.automator.collect(&self.rows, &self.log).await {
            Ok(summary) => {
                self.log.technical(format!(
                    "Automação {} finalizada: {} coletada(s), {} com falha, {} ignorada(s).",
                    carrier, summary.collected, summary.failed, summary.skipped
                ));
                Some(summary)
            }
            Err(e) => {
                tracing::error!("Automation for {} aborted: {:#}", carrier, e);
                self.log.technical(format!("Erro na automação {}: {:#}", carrier, e));
                None
            }
        }
    }
}
