//! Spreadsheet merging: many tables in, one `Mesclado` sheet out.

use crate::sheet::{read_table, write_cell, CellValue, SheetData, SheetError};
use rust_xlsxwriter::{Format, Workbook, XlsxError};
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const SOURCE_COLUMN: &str = "ARQUIVO ORIGEM";
pub const MERGED_SHEET: &str = "Mesclado";

/// Extensions offered in the file picker
pub const INPUT_EXTENSIONS: &[&str] = &["xlsx", "xlsm", "xls", "csv"];

#[derive(Debug, Error)]
pub enum MergeError {
    #[error("Selecione ao menos uma planilha para mesclar.")]
    NoInputs,
    #[error(transparent)]
    Sheet(#[from] SheetError),
    #[error("Erro ao gravar a planilha mesclada: {0}")]
    Write(#[from] XlsxError),
}

#[derive(Debug, Clone, Default)]
pub struct MergeOptions {
    pub add_source_column: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeSummary {
    pub files: usize,
    pub rows: usize,
    pub columns: usize,
    pub output: PathBuf,
}

/// Union of headers, first appearance wins; matching ignores case and spaces
fn merged_headers(sheets: &[SheetData]) -> Vec<String> {
    let mut headers: Vec<String> = Vec::new();
    for sheet in sheets {
        for header in &sheet.headers {
            let key = header.trim().to_uppercase();
            if !headers.iter().any(|h| h.trim().to_uppercase() == key) {
                headers.push(header.trim().to_string());
            }
        }
    }
    headers
}

/// Merge the given tables into rows aligned on the merged headers
pub fn merge_sheets(sheets: &[SheetData], options: &MergeOptions) -> SheetData {
    let mut headers = merged_headers(sheets);
    let data_columns = headers.len();
    if options.add_source_column {
        headers.push(SOURCE_COLUMN.to_string());
    }

    let mut rows = Vec::new();
    for sheet in sheets {
        let mapping: Vec<Option<usize>> = headers[..data_columns]
            .iter()
            .map(|h| sheet.column_index(h))
            .collect();
        let source_name = sheet
            .source
            .as_deref()
            .and_then(Path::file_name)
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();

        for r in 0..sheet.len() {
            let mut row: Vec<CellValue> = mapping
                .iter()
                .map(|c| c.map(|c| sheet.cell(r, c).clone()).unwrap_or_default())
                .collect();
            if options.add_source_column {
                row.push(CellValue::from_text(&source_name));
            }
            rows.push(row);
        }
    }
    SheetData::new(headers, rows)
}

fn write_merged(path: &Path, merged: &SheetData) -> Result<(), XlsxError> {
    let mut workbook = Workbook::new();
    let header = Format::new().set_bold();
    let date_format = Format::new().set_num_format("dd/mm/yyyy");
    let worksheet = workbook.add_worksheet();
    worksheet.set_name(MERGED_SHEET)?;

    for (c, title) in merged.headers.iter().enumerate() {
        worksheet.write_string_with_format(0, c as u16, title, &header)?;
    }
    for (r, row) in merged.rows.iter().enumerate() {
        for (c, cell) in row.iter().enumerate() {
            write_cell(worksheet, r as u32 + 1, c as u16, cell, &date_format)?;
        }
    }
    workbook.save(path)?;
    Ok(())
}

/// Read every input (Excel or CSV), merge and write `output`
pub fn merge_spreadsheets(inputs: &[PathBuf], output: &Path, options: &MergeOptions) -> Result<MergeSummary, MergeError> {
    if inputs.is_empty() {
        return Err(MergeError::NoInputs);
    }
    let sheets = inputs
        .iter()
        .map(|p| read_table(p))
        .collect::<Result<Vec<_>, _>>()?;

    let merged = merge_sheets(&sheets, options);
    write_merged(output, &merged)?;
    tracing::info!(
        "Merged {} file(s) into {} ({} rows)",
        inputs.len(),
        output.display(),
        merged.len()
    );

    Ok(MergeSummary {
        files: inputs.len(),
        rows: merged.len(),
        columns: merged.headers.len(),
        output: output.to_path_buf(),
    })
}
