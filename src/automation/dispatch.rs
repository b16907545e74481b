//! Start-button handling for the collection panel.
//!
//! Every precondition has its own error so the UI can show a specific warning;
//! nothing is submitted unless all of them pass.

use super::{AutomationTask, AutomatorContext, AutomatorRegistry, InvoiceAutomator, LogSink, TaskSubmitter};
use crate::config::AutomationConfig;
use crate::invoices::{carrier_key, InvoiceTable};
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    #[error("Selecione um diretório de salvamento primeiro.")]
    NoSaveDirectory,
    #[error("Selecione uma operadora.")]
    NoCarrierSelected,
    #[error("Selecione uma planilha de dados primeiro.")]
    NoDataFile,
    #[error("A planilha de dados ainda não foi carregada.")]
    TableNotLoaded,
    #[error("Nenhum dado encontrado para a operadora {0}.")]
    NoRowsForCarrier(String),
    #[error("Automação para a operadora {0} não está implementada.")]
    NotImplemented(String),
}

/// What the collection panel knows when the start button is clicked
#[derive(Debug, Clone, Copy)]
pub struct DispatchRequest<'a> {
    pub save_directory: &'a str,
    pub carrier: Option<&'a str>,
    pub data_path: &'a str,
    pub table: &'a InvoiceTable,
}

/// A task that was accepted by the pool
pub struct Dispatched {
    /// Kept by the UI so browser sessions can be released on exit
    pub automator: Arc<dyn InvoiceAutomator>,
    pub carrier: String,
    pub rows: usize,
}

/// Validate, build the automator and task, and submit it
pub fn dispatch(
    request: DispatchRequest<'_>,
    registry: &AutomatorRegistry,
    config: &AutomationConfig,
    submitter: &dyn TaskSubmitter,
    log: LogSink,
) -> Result<Dispatched, DispatchError> {
    if request.save_directory.trim().is_empty() {
        return Err(DispatchError::NoSaveDirectory);
    }
    let carrier = match request.carrier.map(str::trim) {
        Some(c) if !c.is_empty() => c,
        _ => return Err(DispatchError::NoCarrierSelected),
    };
    if request.data_path.trim().is_empty() {
        return Err(DispatchError::NoDataFile);
    }
    if request.table.is_empty() {
        return Err(DispatchError::TableNotLoaded);
    }

    let rows = request.table.rows_for_carrier(carrier);
    if rows.is_empty() {
        return Err(DispatchError::NoRowsForCarrier(carrier.to_string()));
    }

    let ctx = AutomatorContext {
        save_directory: PathBuf::from(request.save_directory.trim()),
        config: config.clone(),
    };
    let automator = registry
        .build(carrier, &ctx)
        .ok_or_else(|| DispatchError::NotImplemented(carrier.to_string()))?;

    let row_count = rows.len();
    let task = AutomationTask::new(automator.clone(), rows, log);
    submitter.submit(task);
    tracing::info!("Dispatched {} automation with {} row(s)", carrier_key(carrier), row_count);

    Ok(Dispatched {
        automator,
        carrier: carrier.to_string(),
        rows: row_count,
    })
}
