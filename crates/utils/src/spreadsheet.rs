//! Shared helpers for the XLSX statement readers.
//!
//! Row and column numbers below are 1-based, matching how the bank layouts are described
//! (column A = 1).

use std::io::{Seek, SeekFrom};
use std::str::FromStr;

use calamine::{Data, DataType, Range, Reader, Xlsx};
use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveDateTime};
use models::{Error, Result, StatementSource};
use rust_decimal::Decimal;
use tracing::debug;

use crate::locale::Locale;
use crate::text::normalize_whitespace;

/// Opens the workbook and returns the used range of its first sheet.
pub fn open_first_sheet(source: &mut dyn StatementSource, source_name: &str) -> Result<Range<Data>> {
    let len = source.seek(SeekFrom::End(0))?;
    source.seek(SeekFrom::Start(0))?;
    if len == 0 {
        return Err(Error::format(source_name, "empty spreadsheet"));
    }

    let mut workbook = Xlsx::new(source)
        .map_err(|e| Error::format(source_name, format!("cannot open workbook: {e}")))?;

    let sheet_name = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| Error::format(source_name, "workbook has no sheets"))?;
    debug!(source_name, sheet = %sheet_name, "reading first worksheet");

    workbook
        .worksheet_range(&sheet_name)
        .map_err(|e| Error::format(source_name, format!("cannot read sheet '{sheet_name}': {e}")))
}

/// Number of the last populated row, or 0 for an empty range.
pub fn last_row(range: &Range<Data>) -> usize {
    range.end().map(|(row, _)| row as usize + 1).unwrap_or(0)
}

pub fn cell(range: &Range<Data>, row: usize, col: usize) -> Option<&Data> {
    if row == 0 || col == 0 {
        return None;
    }
    range.get_value(((row - 1) as u32, (col - 1) as u32))
}

/// Cell rendered as whitespace-normalized text; empty when missing.
pub fn cell_text(range: &Range<Data>, row: usize, col: usize) -> String {
    let raw = match cell(range, row, col) {
        None | Some(Data::Empty) => return String::new(),
        Some(Data::String(s)) => s.clone(),
        Some(Data::Float(f)) => f.to_string(),
        Some(Data::Int(i)) => i.to_string(),
        Some(Data::Bool(b)) => b.to_string(),
        Some(other) => other.to_string(),
    };
    normalize_whitespace(&raw)
}

/// Reads a timestamp from a date cell, an Excel serial number, or text in the locale's pattern.
pub fn cell_datetime(
    range: &Range<Data>,
    row: usize,
    col: usize,
    locale: &Locale,
) -> Option<DateTime<FixedOffset>> {
    let value = cell(range, row, col)?;
    let naive = match value {
        Data::Empty => None,
        Data::DateTime(_) => value.as_datetime(),
        Data::Float(f) => excel_serial_to_datetime(*f),
        Data::Int(i) => excel_serial_to_datetime(*i as f64),
        Data::String(s) => return locale.parse_datetime(s),
        Data::DateTimeIso(s) => NaiveDateTime::from_str(s.trim()).ok(),
        _ => None,
    }?;
    locale.localize(naive)
}

/// Reads an amount from a numeric cell or text in the locale's decimal convention.
pub fn cell_decimal(range: &Range<Data>, row: usize, col: usize, locale: &Locale) -> Option<Decimal> {
    match cell(range, row, col)? {
        Data::Float(f) => Decimal::from_str(&f.to_string()).ok(),
        Data::Int(i) => Some(Decimal::from(*i)),
        Data::String(s) => locale.parse_amount(s),
        _ => None,
    }
}

/// First of the given columns whose cell holds a spreadsheet error such as `#VALUE!`.
pub fn error_cell(range: &Range<Data>, row: usize, cols: &[usize]) -> Option<(usize, String)> {
    cols.iter().find_map(|&col| match cell(range, row, col) {
        Some(Data::Error(e)) => Some((col, e.to_string())),
        _ => None,
    })
}

/// Excel serial date conversion using the 1899-12-30 base; the fraction is the time of day.
fn excel_serial_to_datetime(value: f64) -> Option<NaiveDateTime> {
    if !value.is_finite() {
        return None;
    }
    let base = NaiveDate::from_ymd_opt(1899, 12, 30)?.and_hms_opt(0, 0, 0)?;
    // saturates for absurd serials; try_seconds rejects those
    let seconds = (value * 86_400.0).round() as i64;
    base.checked_add_signed(Duration::try_seconds(seconds)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::locale::DecimalConvention;
    use chrono::{Datelike, Timelike};
    use std::io::Cursor;

    const LOCALE: Locale = Locale::new("%d/%m/%Y %H:%M:%S", DecimalConvention::Point, 4);

    fn sample() -> Range<Data> {
        let mut range = Range::new((0, 0), (2, 3));
        range.set_value((0, 0), Data::String("  Document\n number ".into()));
        range.set_value((1, 0), Data::String("15/03/2025 10:30:00".into()));
        range.set_value((1, 1), Data::Float(-12.5));
        range.set_value((1, 2), Data::Int(40));
        range.set_value((2, 0), Data::Float(45731.5));
        range.set_value((2, 1), Data::String("1,250.75".into()));
        range
    }

    #[test]
    fn test_cell_text_normalizes() {
        let range = sample();
        assert_eq!(cell_text(&range, 1, 1), "Document number");
        assert_eq!(cell_text(&range, 1, 4), "");
        assert_eq!(cell_text(&range, 9, 9), "");
        assert_eq!(last_row(&range), 3);
    }

    #[test]
    fn test_cell_datetime_text_and_serial() {
        let range = sample();
        let from_text = cell_datetime(&range, 2, 1, &LOCALE).unwrap();
        assert_eq!((from_text.day(), from_text.month(), from_text.hour()), (15, 3, 10));
        assert_eq!(from_text.offset().local_minus_utc(), 4 * 3600);

        // 45731.5 is 2025-03-15 12:00
        let from_serial = cell_datetime(&range, 3, 1, &LOCALE).unwrap();
        assert_eq!((from_serial.day(), from_serial.month(), from_serial.hour()), (15, 3, 12));

        assert!(cell_datetime(&range, 1, 4, &LOCALE).is_none());
    }

    #[test]
    fn test_out_of_range_serial_is_unreadable() {
        let mut range = sample();
        range.set_value((2, 0), Data::Float(1e20));
        range.set_value((2, 1), Data::Float(-1e20));
        range.set_value((2, 2), Data::Float(f64::NAN));
        assert!(cell_datetime(&range, 3, 1, &LOCALE).is_none());
        assert!(cell_datetime(&range, 3, 2, &LOCALE).is_none());
        assert!(cell_datetime(&range, 3, 3, &LOCALE).is_none());
    }

    #[test]
    fn test_cell_decimal() {
        let range = sample();
        assert_eq!(cell_decimal(&range, 2, 2, &LOCALE), Decimal::from_str("-12.5").ok());
        assert_eq!(cell_decimal(&range, 2, 3, &LOCALE), Some(Decimal::from(40)));
        assert_eq!(cell_decimal(&range, 3, 2, &LOCALE), Decimal::from_str("1250.75").ok());
        assert_eq!(cell_decimal(&range, 1, 1, &LOCALE), None);
    }

    #[test]
    fn test_error_cell_reports_column() {
        let mut range = sample();
        range.set_value((1, 3), Data::Error(calamine::CellErrorType::Value));
        assert_eq!(error_cell(&range, 2, &[1, 2, 3]), None);
        let (col, _) = error_cell(&range, 2, &[1, 4]).unwrap();
        assert_eq!(col, 4);
    }

    #[test]
    fn test_open_empty_spreadsheet_is_format_error() {
        let mut source = Cursor::new(Vec::new());
        let err = open_first_sheet(&mut source, "idbank").unwrap_err();
        assert!(matches!(err, Error::Format { .. }));
    }

    #[test]
    fn test_open_garbage_is_format_error() {
        let mut source = Cursor::new(b"definitely not a zip archive".to_vec());
        let err = open_first_sheet(&mut source, "bbva").unwrap_err();
        assert!(matches!(err, Error::Format { .. }));
    }
}
