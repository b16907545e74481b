//! Pending-invoice table loaded from the operations spreadsheet.

use crate::sheet::{self, CellValue, SheetData, SheetError};
use chrono::NaiveDate;
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const COLUMN_STATUS: &str = "STATUS";
pub const COLUMN_DUE_DATE: &str = "VENCIMENTO";
pub const COLUMN_CARRIER: &str = "OPERADORA";

/// Columns every invoice spreadsheet must carry
pub const REQUIRED_COLUMNS: [&str; 3] = [COLUMN_STATUS, COLUMN_DUE_DATE, COLUMN_CARRIER];

/// Status written by the automation once an invoice has been collected
pub const STATUS_COLLECTED: &str = "COLETADO IA";

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("Coluna '{0}' ausente.")]
    MissingColumn(String),
    #[error(transparent)]
    Sheet(#[from] SheetError),
}

impl LoadError {
    /// Text for the blocking error dialog
    pub fn user_message(&self) -> String {
        format!("Erro ao carregar a planilha: {}", self)
    }
}

/// Normalized carrier key used for comparisons (`" Blume "` → `"BLUME"`)
pub fn carrier_key(carrier: &str) -> String {
    carrier.trim().to_uppercase()
}

/// One pending invoice
#[derive(Debug, Clone, PartialEq)]
pub struct InvoiceRow {
    pub carrier: Option<String>,
    pub due_date: Option<NaiveDate>,
    pub status: Option<String>,
    /// Every column of the row by header, including the three above
    pub fields: BTreeMap<String, CellValue>,
}

impl InvoiceRow {
    pub fn field(&self, name: &str) -> Option<&CellValue> {
        self.fields.get(name).or_else(|| {
            let wanted = name.trim().to_uppercase();
            self.fields
                .iter()
                .find(|(k, _)| k.trim().to_uppercase() == wanted)
                .map(|(_, v)| v)
        })
    }

    /// Non-empty text of a field
    pub fn text(&self, name: &str) -> Option<String> {
        self.field(name).and_then(CellValue::as_text)
    }

    pub fn is_carrier(&self, carrier: &str) -> bool {
        self.carrier
            .as_deref()
            .map(|c| carrier_key(c) == carrier_key(carrier))
            .unwrap_or(false)
    }
}

/// Rows without a due date go last, like an unparseable cell in a date sort
fn compare_due(a: &Option<NaiveDate>, b: &Option<NaiveDate>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.cmp(b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// The loaded spreadsheet after filtering and sorting
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InvoiceTable {
    source: Option<PathBuf>,
    rows: Vec<InvoiceRow>,
}

impl InvoiceTable {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Read the whole workbook at once and build the table
    pub fn load(path: &Path) -> Result<Self, LoadError> {
        let sheet = sheet::read_first_sheet(path)?;
        let table = Self::from_sheet(sheet)?;
        tracing::info!("Loaded {} pending invoice(s) from {:?}", table.len(), path);
        Ok(table)
    }

    /// Validate required columns, drop collected rows and sort by due date
    pub fn from_sheet(sheet: SheetData) -> Result<Self, LoadError> {
        let mut indexes = [0usize; 3];
        for (slot, column) in indexes.iter_mut().zip(REQUIRED_COLUMNS) {
            *slot = sheet
                .column_index(column)
                .ok_or_else(|| LoadError::MissingColumn(column.to_string()))?;
        }
        let [status_idx, due_idx, carrier_idx] = indexes;

        let mut rows = Vec::with_capacity(sheet.len());
        let mut collected = 0usize;
        for r in 0..sheet.len() {
            let status = sheet.cell(r, status_idx).as_text();
            if status.as_deref() == Some(STATUS_COLLECTED) {
                collected += 1;
                continue;
            }
            let fields = sheet
                .headers
                .iter()
                .enumerate()
                .map(|(c, h)| (h.clone(), sheet.cell(r, c).clone()))
                .collect();
            rows.push(InvoiceRow {
                carrier: sheet.cell(r, carrier_idx).as_text(),
                due_date: sheet.cell(r, due_idx).as_date(),
                status,
                fields,
            });
        }
        if collected > 0 {
            tracing::debug!("Skipped {} row(s) already marked '{}'", collected, STATUS_COLLECTED);
        }

        // stable: rows sharing a due date keep spreadsheet order
        rows.sort_by(|a, b| compare_due(&a.due_date, &b.due_date));

        Ok(Self {
            source: sheet.source,
            rows,
        })
    }

    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    pub fn rows(&self) -> &[InvoiceRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Distinct non-empty carriers in table order
    pub fn carriers(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        self.rows
            .iter()
            .filter_map(|r| r.carrier.clone())
            .filter(|c| seen.insert(c.clone()))
            .collect()
    }

    /// Owned snapshot of the rows belonging to `carrier`
    pub fn rows_for_carrier(&self, carrier: &str) -> Vec<InvoiceRow> {
        self.rows.iter().filter(|r| r.is_carrier(carrier)).cloned().collect()
    }
}
