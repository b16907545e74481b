//! Tabular file access shared by the invoice loader, the merge tool and the
//! Agitel processor.
//!
//! Reading goes through `calamine` (Excel) or `csv`; every cell is normalized
//! into a [`CellValue`] so callers never touch the backend types.

use calamine::{open_workbook_auto, Data, Reader};
use chrono::{Duration, NaiveDate, NaiveDateTime};
use rust_xlsxwriter::{Format, Worksheet, XlsxError};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Extensions the Excel reader accepts
pub const EXCEL_EXTENSIONS: &[&str] = &["xlsx", "xlsm", "xls", "xlsb", "ods"];

#[derive(Debug, Error)]
pub enum SheetError {
    #[error("não foi possível abrir '{path}': {message}")]
    Open { path: PathBuf, message: String },
    #[error("o arquivo '{0}' não possui planilhas")]
    NoWorksheet(PathBuf),
    #[error("formato de arquivo não suportado: '{0}'")]
    UnsupportedFormat(PathBuf),
    #[error("erro ao ler CSV '{path}': {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// A single normalized cell
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Empty,
    Text(String),
    Number(f64),
    Bool(bool),
    Date(NaiveDateTime),
}

impl CellValue {
    pub fn from_data(data: &Data) -> Self {
        match data {
            Data::Empty => CellValue::Empty,
            Data::String(s) => CellValue::from_text(s),
            Data::Float(f) => CellValue::Number(*f),
            Data::Int(i) => CellValue::Number(*i as f64),
            Data::Bool(b) => CellValue::Bool(*b),
            Data::DateTime(dt) => dt
                .as_datetime()
                .map(CellValue::Date)
                .unwrap_or(CellValue::Number(dt.as_f64())),
            Data::DateTimeIso(s) => parse_datetime_text(s)
                .map(CellValue::Date)
                .unwrap_or_else(|| CellValue::from_text(s)),
            Data::DurationIso(s) => CellValue::from_text(s),
            Data::Error(e) => {
                tracing::debug!("Cell error {:?} read as empty", e);
                CellValue::Empty
            }
        }
    }

    /// Trimmed text; blank text is `Empty`
    pub fn from_text(s: &str) -> Self {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            CellValue::Empty
        } else {
            CellValue::Text(trimmed.to_string())
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, CellValue::Empty)
    }

    /// Display text, `None` for empty cells
    pub fn as_text(&self) -> Option<String> {
        if self.is_empty() {
            None
        } else {
            Some(self.to_string())
        }
    }

    /// Interpret the cell as a calendar date.
    /// Accepts date cells, Excel serial numbers and `dd/mm/yyyy` or ISO text.
    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            CellValue::Date(dt) => Some(dt.date()),
            CellValue::Number(n) => excel_serial_to_datetime(*n).map(|dt| dt.date()),
            CellValue::Text(s) => parse_datetime_text(s).map(|dt| dt.date()),
            CellValue::Empty | CellValue::Bool(_) => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CellValue::Number(n) => Some(*n),
            CellValue::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }
}

impl Default for CellValue {
    fn default() -> Self {
        CellValue::Empty
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Empty => Ok(()),
            CellValue::Text(s) => write!(f, "{}", s),
            // Integral numbers show without the trailing ".0" (account numbers, ids)
            CellValue::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => write!(f, "{}", *n as i64),
            CellValue::Number(n) => write!(f, "{}", n),
            CellValue::Bool(b) => write!(f, "{}", if *b { "VERDADEIRO" } else { "FALSO" }),
            CellValue::Date(dt) if dt.time() == chrono::NaiveTime::MIN => write!(f, "{}", dt.format("%d/%m/%Y")),
            CellValue::Date(dt) => write!(f, "{}", dt.format("%d/%m/%Y %H:%M:%S")),
        }
    }
}

fn excel_epoch() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(1899, 12, 30)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .unwrap_or_default()
}

/// Convert an Excel serial date (1900 system) into a timestamp
pub fn excel_serial_to_datetime(serial: f64) -> Option<NaiveDateTime> {
    // 1 = 1900-01-01, 2958465 = 9999-12-31
    if !(1.0..2_958_466.0).contains(&serial) {
        return None;
    }
    let millis = (serial * 86_400_000.0).round() as i64;
    excel_epoch().checked_add_signed(Duration::milliseconds(millis))
}

/// Convert a timestamp into an Excel serial date
pub fn datetime_to_excel_serial(dt: &NaiveDateTime) -> f64 {
    (*dt - excel_epoch()).num_milliseconds() as f64 / 86_400_000.0
}

const DATETIME_FORMATS: &[&str] = &[
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
];

const DATE_FORMATS: &[&str] = &["%d/%m/%Y", "%Y-%m-%d", "%d-%m-%Y", "%d.%m.%Y"];

/// Parse date text in the formats the team's spreadsheets use
pub fn parse_datetime_text(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim();
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(text, fmt) {
            return Some(dt);
        }
    }
    for fmt in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(text, fmt) {
            return d.and_hms_opt(0, 0, 0);
        }
    }
    None
}

/// Header row plus data rows of one worksheet
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SheetData {
    pub source: Option<PathBuf>,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<CellValue>>,
}

impl SheetData {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<CellValue>>) -> Self {
        Self {
            source: None,
            headers,
            rows,
        }
    }

    /// Index of a column by header, ignoring case and surrounding spaces
    pub fn column_index(&self, name: &str) -> Option<usize> {
        let wanted = name.trim().to_uppercase();
        self.headers.iter().position(|h| h.trim().to_uppercase() == wanted)
    }

    /// Cell at (row, column); short rows read as empty
    pub fn cell(&self, row: usize, column: usize) -> &CellValue {
        static EMPTY: CellValue = CellValue::Empty;
        self.rows
            .get(row)
            .and_then(|r| r.get(column))
            .unwrap_or(&EMPTY)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

fn header_names(cells: impl Iterator<Item = CellValue>) -> Vec<String> {
    cells
        .enumerate()
        .map(|(i, c)| match c.as_text() {
            Some(t) => t,
            None => format!("COLUNA_{}", i + 1),
        })
        .collect()
}

fn is_blank_row(row: &[CellValue]) -> bool {
    row.iter().all(CellValue::is_empty)
}

/// Read the first worksheet of an Excel workbook. The first row is the header.
pub fn read_first_sheet(path: &Path) -> Result<SheetData, SheetError> {
    let mut workbook = open_workbook_auto(path).map_err(|e| SheetError::Open {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| SheetError::NoWorksheet(path.to_path_buf()))?
        .map_err(|e| SheetError::Open {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

    let mut rows = range.rows();
    let headers = match rows.next() {
        Some(first) => header_names(first.iter().map(CellValue::from_data)),
        None => Vec::new(),
    };
    let rows = rows
        .map(|r| r.iter().map(CellValue::from_data).collect::<Vec<_>>())
        .filter(|r| !is_blank_row(r))
        .collect();

    Ok(SheetData {
        source: Some(path.to_path_buf()),
        headers,
        rows,
    })
}

/// Guess the CSV delimiter from the header line (`;` is common in pt-BR exports)
fn sniff_delimiter(content: &str) -> u8 {
    let first_line = content.lines().next().unwrap_or_default();
    let semicolons = first_line.matches(';').count();
    let commas = first_line.matches(',').count();
    if semicolons > commas {
        b';'
    } else {
        b','
    }
}

/// Read a CSV file. The first record is the header.
pub fn read_csv(path: &Path) -> Result<SheetData, SheetError> {
    let content = fs::read_to_string(path)?;
    let content = content.strip_prefix('\u{FEFF}').unwrap_or(&content);
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(sniff_delimiter(content))
        .flexible(true)
        .from_reader(content.as_bytes());

    let csv_err = |source| SheetError::Csv {
        path: path.to_path_buf(),
        source,
    };
    let headers = header_names(reader.headers().map_err(csv_err)?.iter().map(CellValue::from_text));
    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(csv_err)?;
        let row: Vec<CellValue> = record.iter().map(CellValue::from_text).collect();
        if !is_blank_row(&row) {
            rows.push(row);
        }
    }

    Ok(SheetData {
        source: Some(path.to_path_buf()),
        headers,
        rows,
    })
}

/// Read a CSV or Excel file, chosen by extension
pub fn read_table(path: &Path) -> Result<SheetData, SheetError> {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    if ext == "csv" {
        read_csv(path)
    } else if EXCEL_EXTENSIONS.contains(&ext.as_str()) {
        read_first_sheet(path)
    } else {
        Err(SheetError::UnsupportedFormat(path.to_path_buf()))
    }
}

/// Write one normalized cell. Dates are written as serials with `date_format`.
pub fn write_cell(
    worksheet: &mut Worksheet,
    row: u32,
    column: u16,
    value: &CellValue,
    date_format: &Format,
) -> Result<(), XlsxError> {
    match value {
        CellValue::Empty => {}
        CellValue::Text(s) => {
            worksheet.write_string(row, column, s)?;
        }
        CellValue::Number(n) => {
            worksheet.write_number(row, column, *n)?;
        }
        CellValue::Bool(b) => {
            worksheet.write_boolean(row, column, *b)?;
        }
        CellValue::Date(dt) => {
            worksheet.write_number_with_format(row, column, datetime_to_excel_serial(dt), date_format)?;
        }
    }
    Ok(())
}


#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    // ==================== CellValue tests ====================

    #[test]
    fn test_from_text_trims_and_blanks_to_empty() {
        assert_eq!(CellValue::from_text("  BLUME "), text("BLUME"));
        assert_eq!(CellValue::from_text("   "), CellValue::Empty);
    }

    #[test]
    fn test_display_integral_number_has_no_decimals() {
        assert_eq!(CellValue::Number(123456.0).to_string(), "123456");
        assert_eq!(CellValue::Number(12.5).to_string(), "12.5");
    }

    #[test]
    fn test_as_date_from_text_formats() {
        assert_eq!(text("10/03/2024").as_date(), Some(date(2024, 3, 10)));
        assert_eq!(text("2024-03-10").as_date(), Some(date(2024, 3, 10)));
        assert_eq!(text("10/03/2024 14:30:00").as_date(), Some(date(2024, 3, 10)));
        assert_eq!(text("março").as_date(), None);
    }

    #[test]
    fn test_as_date_from_excel_serial() {
        // 45361 is 2024-03-10 in the 1900 date system
        assert_eq!(CellValue::Number(45361.0).as_date(), Some(date(2024, 3, 10)));
        assert_eq!(CellValue::Number(-3.0).as_date(), None);
    }

    #[test]
    fn test_excel_serial_conversion_is_reversible() {
        let dt = date(2023, 12, 31).and_hms_opt(12, 0, 0).unwrap();
        let serial = datetime_to_excel_serial(&dt);
        assert_eq!(excel_serial_to_datetime(serial), Some(dt));
    }

    // ==================== SheetData tests ====================

    #[test]
    fn test_column_index_ignores_case_and_spaces() {
        let sheet = SheetData::new(vec![" Status ".into(), "VENCIMENTO".into()], vec![]);
        assert_eq!(sheet.column_index("STATUS"), Some(0));
        assert_eq!(sheet.column_index("vencimento"), Some(1));
        assert_eq!(sheet.column_index("OPERADORA"), None);
    }

    #[test]
    fn test_cell_out_of_range_is_empty() {
        let sheet = SheetData::new(vec!["A".into(), "B".into()], vec![vec![text("x")]]);
        assert_eq!(sheet.cell(0, 0), &text("x"));
        assert_eq!(sheet.cell(0, 1), &CellValue::Empty);
        assert_eq!(sheet.cell(5, 0), &CellValue::Empty);
    }

    // ==================== file reading tests ====================

    #[test]
    fn test_read_first_sheet_skips_blank_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dados.xlsx");
        write_workbook(
            &path,
            &["OPERADORA", "VALOR"],
            &[
                vec![text("BLUME"), CellValue::Number(10.0)],
                vec![CellValue::Empty, CellValue::Empty],
                vec![text("VIVO"), CellValue::Number(20.5)],
            ],
        );

        let sheet = read_first_sheet(&path).unwrap();

        assert_eq!(sheet.headers, vec!["OPERADORA", "VALOR"]);
        assert_eq!(sheet.len(), 2);
        assert_eq!(sheet.cell(1, 0), &text("VIVO"));
        assert_eq!(sheet.cell(1, 1), &CellValue::Number(20.5));
    }

    #[test]
    fn test_read_first_sheet_missing_file_is_open_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_first_sheet(&dir.path().join("nada.xlsx")).unwrap_err();
        assert!(matches!(err, SheetError::Open { .. }));
    }

    #[test]
    fn test_read_csv_sniffs_semicolon_delimiter() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dados.csv");
        fs::write(&path, "\u{FEFF}LINHA;VALOR\n1001;10,50\n\n1002;3,00\n").unwrap();

        let sheet = read_csv(&path).unwrap();

        assert_eq!(sheet.headers, vec!["LINHA", "VALOR"]);
        assert_eq!(sheet.len(), 2);
        assert_eq!(sheet.cell(0, 1), &text("10,50"));
    }

    #[test]
    fn test_read_table_rejects_unknown_extension() {
        let err = read_table(Path::new("notas.pdf")).unwrap_err();
        assert!(matches!(err, SheetError::UnsupportedFormat(_)));
    }

    #[test]
    fn test_blank_header_gets_positional_name() {
        let headers = header_names(vec![text("A"), CellValue::Empty].into_iter());
        assert_eq!(headers, vec!["A", "COLUNA_2"]);
    }
}
