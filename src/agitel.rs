//! Agitel usage-report processing.
//!
//! Reads the report, sums the amounts per line, optionally spreads the grand
//! total evenly across all lines, and writes `<name>_processado.xlsx` next to
//! the input. Progress and the outcome are streamed as [`AgitelEvent`]s.

use crate::automation::WorkerPool;
use crate::sheet::{read_first_sheet, CellValue, SheetData, SheetError};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use rust_xlsxwriter::{Format, Workbook, XlsxError};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

pub const COLUMN_LINE: &str = "LINHA";
pub const COLUMN_AMOUNT: &str = "VALOR";
pub const COLUMN_COST_CENTER: &str = "CENTRO DE CUSTO";

const OUTPUT_SUFFIX: &str = "_processado";
const SHEET_LINES: &str = "Linhas";
const SHEET_SUMMARY: &str = "Resumo";

/// Share of the progress bar spent reading rows; the rest covers writing
const READ_PROGRESS_SHARE: usize = 90;

#[derive(Debug, Clone, PartialEq)]
pub enum AgitelEvent {
    Progress(u8),
    Log(String),
    Error(String),
    Finished(PathBuf),
}

#[derive(Debug, Error)]
pub enum AgitelError {
    #[error(transparent)]
    Sheet(#[from] SheetError),
    #[error("Coluna '{0}' ausente.")]
    MissingColumn(String),
    #[error("Valor inválido na linha {row}: '{value}'")]
    InvalidAmount { row: usize, value: String },
    #[error("Nenhuma linha com dados encontrada.")]
    NoLines,
    #[error("Erro ao gravar o arquivo processado: {0}")]
    Write(#[from] XlsxError),
}

/// Aggregated amounts of one phone line
#[derive(Debug, Clone, PartialEq)]
pub struct AgitelLine {
    pub line: String,
    pub cost_center: Option<String>,
    pub original: Decimal,
    pub final_value: Decimal,
}

pub struct AgitelProcessor {
    input: PathBuf,
    equalize: bool,
}

impl AgitelProcessor {
    pub fn new(input: impl Into<PathBuf>, equalize: bool) -> Self {
        Self {
            input: input.into(),
            equalize,
        }
    }

    pub fn input(&self) -> &Path {
        &self.input
    }

    /// `<stem>_processado.xlsx` in the input's folder
    pub fn output_path(&self) -> PathBuf {
        let stem = self
            .input
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "agitel".to_string());
        self.input.with_file_name(format!("{}{}.xlsx", stem, OUTPUT_SUFFIX))
    }

    /// Run on the pool's blocking threads; events arrive on the returned receiver
    pub fn spawn(self, pool: &WorkerPool) -> UnboundedReceiver<AgitelEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        pool.spawn_blocking(move || self.execute(&tx));
        rx
    }

    /// Run and finish with exactly one `Finished` or `Error` event
    pub fn execute(&self, events: &UnboundedSender<AgitelEvent>) {
        match self.run(events) {
            Ok(output) => {
                tracing::info!("Agitel report written to {}", output.display());
                let _ = events.send(AgitelEvent::Finished(output));
            }
            Err(e) => {
                tracing::error!("Agitel processing of {} failed: {}", self.input.display(), e);
                let _ = events.send(AgitelEvent::Error(e.to_string()));
            }
        }
    }

    /// Processing core; sends progress and log events but never a terminal one
    pub fn run(&self, events: &UnboundedSender<AgitelEvent>) -> Result<PathBuf, AgitelError> {
        let mut progress = ProgressReporter::new(events);
        let log = |msg: String| {
            let _ = events.send(AgitelEvent::Log(msg));
        };

        log(format!("Lendo {}...", self.input.display()));
        let sheet = read_first_sheet(&self.input)?;
        progress.report(0);

        let mut lines = aggregate_lines(&sheet, &log, |done, total| {
            progress.report(done * READ_PROGRESS_SHARE / total.max(1));
        })?;
        log(format!("{} linha(s) encontrada(s).", lines.len()));

        if self.equalize {
            equalize(&mut lines);
            log(format!("Valores equalizados: {} por linha.", lines[0].final_value));
        }
        progress.report(95);

        let output = self.output_path();
        write_output(&output, &lines, self.equalize)?;
        log(format!("Arquivo gerado: {}", output.display()));
        progress.report(100);
        Ok(output)
    }
}

/// Emits `Progress` only when the percentage grows
struct ProgressReporter<'a> {
    events: &'a UnboundedSender<AgitelEvent>,
    last: Option<u8>,
}

impl<'a> ProgressReporter<'a> {
    fn new(events: &'a UnboundedSender<AgitelEvent>) -> Self {
        Self { events, last: None }
    }

    fn report(&mut self, percent: usize) {
        let percent = percent.min(100) as u8;
        if self.last.map_or(true, |last| percent > last) {
            self.last = Some(percent);
            let _ = self.events.send(AgitelEvent::Progress(percent));
        }
    }
}

/// Parse an amount cell: numbers as-is, text in Brazilian format (`R$ 1.234,56`)
pub fn parse_amount(value: &CellValue) -> Option<Decimal> {
    match value {
        CellValue::Number(n) => Decimal::try_from(*n).ok().map(|d| d.round_dp(2)),
        CellValue::Text(s) => parse_amount_text(s),
        _ => None,
    }
}

fn parse_amount_text(text: &str) -> Option<Decimal> {
    let cleaned: String = text
        .trim()
        .trim_start_matches("R$")
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();
    if cleaned.is_empty() {
        return None;
    }
    let normalized = if cleaned.contains(',') {
        cleaned.replace('.', "").replace(',', ".")
    } else if is_thousands_grouped(&cleaned) {
        cleaned.replace('.', "")
    } else {
        cleaned
    };
    Decimal::from_str(&normalized).ok().map(|d| d.round_dp(2))
}

/// `1.234` or `12.345.678`: dots as thousand separators, no decimal part
fn is_thousands_grouped(s: &str) -> bool {
    let digits = s.trim_start_matches('-');
    let mut parts = digits.split('.');
    let head = parts.next().unwrap_or_default();
    let rest: Vec<&str> = parts.collect();
    !rest.is_empty()
        && (1..=3).contains(&head.len())
        && rest.iter().all(|p| p.len() == 3 && p.chars().all(|c| c.is_ascii_digit()))
}

/// Sum amounts per line, in first-appearance order
pub fn aggregate_lines(
    sheet: &SheetData,
    log: impl Fn(String),
    mut on_row: impl FnMut(usize, usize),
) -> Result<Vec<AgitelLine>, AgitelError> {
    let column = |name: &str| {
        sheet
            .column_index(name)
            .ok_or_else(|| AgitelError::MissingColumn(name.to_string()))
    };
    let line_col = column(COLUMN_LINE)?;
    let amount_col = column(COLUMN_AMOUNT)?;
    let cost_col = sheet.column_index(COLUMN_COST_CENTER);

    let mut lines: Vec<AgitelLine> = Vec::new();
    for row in 0..sheet.len() {
        // header is spreadsheet row 1
        let sheet_row = row + 2;
        let Some(line) = sheet.cell(row, line_col).as_text() else {
            log(format!("Linha {} ignorada: {} vazia.", sheet_row, COLUMN_LINE));
            on_row(row + 1, sheet.len());
            continue;
        };
        let amount_cell = sheet.cell(row, amount_col);
        let amount = if amount_cell.is_empty() {
            Decimal::ZERO
        } else {
            parse_amount(amount_cell).ok_or_else(|| AgitelError::InvalidAmount {
                row: sheet_row,
                value: amount_cell.to_string(),
            })?
        };
        let cost_center = cost_col.and_then(|c| sheet.cell(row, c).as_text());

        match lines.iter_mut().find(|l| l.line == line) {
            Some(existing) => {
                existing.original += amount;
                if existing.cost_center.is_none() {
                    existing.cost_center = cost_center;
                }
            }
            None => lines.push(AgitelLine {
                line,
                cost_center,
                original: amount,
                final_value: Decimal::ZERO,
            }),
        }
        on_row(row + 1, sheet.len());
    }

    if lines.is_empty() {
        return Err(AgitelError::NoLines);
    }
    for line in &mut lines {
        line.final_value = line.original;
    }
    Ok(lines)
}

/// Spread the grand total evenly; leftover cents go one by one to the first lines
pub fn equalize(lines: &mut [AgitelLine]) {
    if lines.is_empty() {
        return;
    }
    let total: Decimal = lines.iter().map(|l| l.original).sum();
    let count = Decimal::from(lines.len() as u64);
    let share = (total / count).round_dp_with_strategy(2, RoundingStrategy::ToNegativeInfinity);
    let cent = Decimal::new(1, 2);
    let mut remainder = total - share * count;
    for line in lines.iter_mut() {
        line.final_value = share;
        if remainder >= cent {
            line.final_value += cent;
            remainder -= cent;
        }
    }
}

fn money(value: Decimal) -> f64 {
    value.to_f64().unwrap_or_default()
}

fn write_output(path: &Path, lines: &[AgitelLine], equalized: bool) -> Result<(), XlsxError> {
    let mut workbook = Workbook::new();
    let header = Format::new().set_bold();
    let currency = Format::new().set_num_format("#,##0.00");

    let sheet = workbook.add_worksheet();
    sheet.set_name(SHEET_LINES)?;
    for (c, title) in [COLUMN_LINE, COLUMN_COST_CENTER, "VALOR ORIGINAL", "VALOR FINAL"]
        .iter()
        .enumerate()
    {
        sheet.write_string_with_format(0, c as u16, *title, &header)?;
    }
    for (i, line) in lines.iter().enumerate() {
        let row = i as u32 + 1;
        sheet.write_string(row, 0, &line.line)?;
        if let Some(cost_center) = &line.cost_center {
            sheet.write_string(row, 1, cost_center)?;
        }
        sheet.write_number_with_format(row, 2, money(line.original), &currency)?;
        sheet.write_number_with_format(row, 3, money(line.final_value), &currency)?;
    }

    let original_total: Decimal = lines.iter().map(|l| l.original).sum();
    let final_total: Decimal = lines.iter().map(|l| l.final_value).sum();
    let summary = workbook.add_worksheet();
    summary.set_name(SHEET_SUMMARY)?;
    summary.write_string_with_format(0, 0, "Linhas", &header)?;
    summary.write_number(0, 1, lines.len() as f64)?;
    summary.write_string_with_format(1, 0, "Total original", &header)?;
    summary.write_number_with_format(1, 1, money(original_total), &currency)?;
    summary.write_string_with_format(2, 0, "Total final", &header)?;
    summary.write_number_with_format(2, 1, money(final_total), &currency)?;
    summary.write_string_with_format(3, 0, "Equalizado", &header)?;
    summary.write_string(3, 1, if equalized { "Sim" } else { "Não" })?;

    workbook.save(path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sheet::fixtures::{text, write_workbook};
    use calamine::{open_workbook_auto, Reader};

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn line(name: &str, amount: &str) -> AgitelLine {
        AgitelLine {
            line: name.into(),
            cost_center: None,
            original: dec(amount),
            final_value: dec(amount),
        }
    }

    fn run_file(path: &Path, equalize: bool) -> Vec<AgitelEvent> {
        let (tx, mut rx) = mpsc::unbounded_channel();
        AgitelProcessor::new(path, equalize).execute(&tx);
        drop(tx);
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    fn is_terminal(event: &AgitelEvent) -> bool {
        matches!(event, AgitelEvent::Finished(_) | AgitelEvent::Error(_))
    }

    fn report(dir: &Path) -> PathBuf {
        let path = dir.join("agitel_marco.xlsx");
        write_workbook(
            &path,
            &["LINHA", "CENTRO DE CUSTO", "VALOR"],
            &[
                vec![text("11999990001"), text("FINANCEIRO"), CellValue::Number(10.0)],
                vec![text("11999990002"), CellValue::Empty, text("R$ 1.234,50")],
                vec![text("11999990001"), text("OUTRO"), text("5,25")],
                vec![CellValue::Empty, CellValue::Empty, CellValue::Number(99.0)],
                vec![text("11999990003"), text("TI"), CellValue::Number(0.26)],
            ],
        );
        path
    }

    // ==================== amount parsing ====================

    #[test]
    fn test_parse_amount_formats() {
        assert_eq!(parse_amount(&text("1.234,56")), Some(dec("1234.56")));
        assert_eq!(parse_amount(&text("R$ 12,5")), Some(dec("12.50")));
        assert_eq!(parse_amount(&text("-3,10")), Some(dec("-3.10")));
        assert_eq!(parse_amount(&text("1.234")), Some(dec("1234")));
        assert_eq!(parse_amount(&text("12.34")), Some(dec("12.34")));
        assert_eq!(parse_amount(&CellValue::Number(0.1 + 0.2)), Some(dec("0.30")));
        assert_eq!(parse_amount(&text("abc")), None);
        assert_eq!(parse_amount(&CellValue::Bool(true)), None);
    }

    // ==================== equalize ====================

    #[test]
    fn test_equalize_distributes_remainder_cents_to_first_lines() {
        let mut lines = vec![line("a", "10.00"), line("b", "0.00"), line("c", "0.01")];

        equalize(&mut lines);

        let finals: Vec<_> = lines.iter().map(|l| l.final_value).collect();
        assert_eq!(finals, vec![dec("3.34"), dec("3.34"), dec("3.33")]);
        assert_eq!(finals.iter().copied().sum::<Decimal>(), dec("10.01"));
    }

    #[test]
    fn test_equalize_keeps_total_for_awkward_amounts() {
        let mut lines: Vec<_> = (0..7).map(|i| line(&i.to_string(), "13.37")).collect();
        lines.push(line("x", "0.05"));
        let original: Decimal = lines.iter().map(|l| l.original).sum();

        equalize(&mut lines);

        let total: Decimal = lines.iter().map(|l| l.final_value).sum();
        assert_eq!(total, original);
        let max = lines.iter().map(|l| l.final_value).max().unwrap();
        let min = lines.iter().map(|l| l.final_value).min().unwrap();
        assert!(max - min <= dec("0.01"));
    }

    #[test]
    fn test_equalize_negative_total() {
        let mut lines = vec![line("a", "-1.00"), line("b", "0.00"), line("c", "0.00")];
        equalize(&mut lines);
        let total: Decimal = lines.iter().map(|l| l.final_value).sum();
        assert_eq!(total, dec("-1.00"));
    }

    // ==================== aggregation ====================

    #[test]
    fn test_aggregate_sums_per_line_in_order() {
        let sheet = SheetData::new(
            vec!["LINHA".into(), "VALOR".into()],
            vec![
                vec![text("B"), text("1,00")],
                vec![text("A"), text("2,00")],
                vec![text("B"), text("0,50")],
            ],
        );

        let lines = aggregate_lines(&sheet, |_| {}, |_, _| {}).unwrap();

        assert_eq!(lines.len(), 2);
        assert_eq!((lines[0].line.as_str(), lines[0].original), ("B", dec("1.50")));
        assert_eq!((lines[1].line.as_str(), lines[1].original), ("A", dec("2.00")));
        assert_eq!(lines[0].final_value, lines[0].original);
    }

    #[test]
    fn test_aggregate_rejects_invalid_amount() {
        let sheet = SheetData::new(vec!["LINHA".into(), "VALOR".into()], vec![vec![text("A"), text("dez")]]);

        let err = aggregate_lines(&sheet, |_| {}, |_, _| {}).unwrap_err();

        assert_eq!(err.to_string(), "Valor inválido na linha 2: 'dez'");
    }

    #[test]
    fn test_aggregate_without_lines_is_error() {
        let sheet = SheetData::new(vec!["LINHA".into(), "VALOR".into()], vec![vec![CellValue::Empty, text("1")]]);
        assert!(matches!(aggregate_lines(&sheet, |_| {}, |_, _| {}), Err(AgitelError::NoLines)));
    }

    // ==================== processor runs ====================

    #[test]
    fn test_run_writes_processed_workbook() {
        let dir = tempfile::tempdir().unwrap();
        let input = report(dir.path());

        let events = run_file(&input, false);

        let expected = dir.path().join("agitel_marco_processado.xlsx");
        assert_eq!(events.last(), Some(&AgitelEvent::Finished(expected.clone())));
        assert_eq!(events.iter().filter(|e| is_terminal(e)).count(), 1);

        let mut workbook = open_workbook_auto(&expected).unwrap();
        assert_eq!(workbook.sheet_names(), vec![SHEET_LINES.to_string(), SHEET_SUMMARY.to_string()]);
        let range = workbook.worksheet_range(SHEET_LINES).unwrap();
        let rows: Vec<Vec<CellValue>> = range
            .rows()
            .map(|r| r.iter().map(CellValue::from_data).collect())
            .collect();
        assert_eq!(rows.len(), 4);
        assert_eq!(rows[1][0], text("11999990001"));
        assert_eq!(rows[1][1], text("FINANCEIRO"));
        assert_eq!(rows[1][2], CellValue::Number(15.25));
        assert_eq!(rows[2][3], CellValue::Number(1234.5));
    }

    #[test]
    fn test_equalized_run_preserves_total() {
        let dir = tempfile::tempdir().unwrap();
        let input = report(dir.path());

        let events = run_file(&input, true);

        let Some(AgitelEvent::Finished(output)) = events.last() else {
            panic!("expected Finished, got {:?}", events.last());
        };
        let mut workbook = open_workbook_auto(output).unwrap();
        let range = workbook.worksheet_range(SHEET_LINES).unwrap();
        let finals: Vec<Decimal> = range
            .rows()
            .skip(1)
            .filter_map(|r| parse_amount(&CellValue::from_data(&r[3])))
            .collect();
        assert_eq!(finals.iter().copied().sum::<Decimal>(), dec("1250.01"));
        assert_eq!(finals, vec![dec("416.67"), dec("416.67"), dec("416.67")]);
    }

    #[test]
    fn test_progress_is_monotonic_and_ends_at_100_before_finish() {
        let dir = tempfile::tempdir().unwrap();
        let events = run_file(&report(dir.path()), false);

        let progress: Vec<u8> = events
            .iter()
            .filter_map(|e| match e {
                AgitelEvent::Progress(p) => Some(*p),
                _ => None,
            })
            .collect();
        assert!(progress.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(progress.last(), Some(&100));
        assert!(matches!(events[events.len() - 2], AgitelEvent::Log(_) | AgitelEvent::Progress(100)));
    }

    #[test]
    fn test_missing_amount_column_ends_with_error() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("sem_valor.xlsx");
        write_workbook(&input, &["LINHA"], &[vec![text("1199")]]);

        let events = run_file(&input, true);

        assert_eq!(events.last(), Some(&AgitelEvent::Error("Coluna 'VALOR' ausente.".into())));
        assert_eq!(events.iter().filter(|e| is_terminal(e)).count(), 1);
        assert!(!dir.path().join("sem_valor_processado.xlsx").exists());
    }

    #[test]
    fn test_unreadable_input_ends_with_error() {
        let dir = tempfile::tempdir().unwrap();
        let events = run_file(&dir.path().join("nao_existe.xlsx"), false);
        assert!(matches!(events.last(), Some(AgitelEvent::Error(_))));
    }

    #[test]
    fn test_spawn_on_pool_delivers_terminal_event() {
        let dir = tempfile::tempdir().unwrap();
        let input = report(dir.path());
        let pool = WorkerPool::new(1).unwrap();

        let mut rx = AgitelProcessor::new(&input, false).spawn(&pool);
        let events = pool.block_on(async move {
            let mut events = Vec::new();
            while let Some(event) = rx.recv().await {
                events.push(event);
            }
            events
        });

        assert!(matches!(events.last(), Some(AgitelEvent::Finished(_))));
    }

    #[test]
    fn test_output_path_next_to_input() {
        let processor = AgitelProcessor::new("/dados/agitel.xls", false);
        assert_eq!(processor.output_path(), PathBuf::from("/dados/agitel_processado.xlsx"));
        assert_eq!(processor.input(), Path::new("/dados/agitel.xls"));
    }
}
