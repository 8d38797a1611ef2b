use calamine::{Data, Range};
use models::{
    CancellationToken, Error, Result, StatementSource, Transaction, TransactionsConverter,
};
use rust_decimal::Decimal;
use tracing::{debug, warn};
use utils::spreadsheet::{cell_datetime, cell_decimal, cell_text, error_cell, last_row, open_first_sheet};
use utils::{contains_ignore_case, DecimalConvention, Locale};

pub const PARSER_NAME: &str = "bbva";

const LOCALE: Locale = Locale::new("%m/%d/%Y", DecimalConvention::Point, 1);
const DEFAULT_CURRENCY: &str = "EUR";

/// Header sits on row 5.
const DATA_START_ROW: usize = 6;

const COL_EFFECTIVE_DATE: usize = 2; // B
const COL_DATE: usize = 3;
const COL_PAYEE: usize = 4;
const COL_AMOUNT: usize = 6;
const COL_CURRENCY: usize = 7;
const COL_COMMENTS: usize = 10;

/// BBVA (Spain) account movements workbook.
#[derive(Debug, Default, Clone, Copy)]
pub struct BbvaXlsxParser;

impl BbvaXlsxParser {
    pub fn new() -> Self {
        Self
    }

    pub fn convert_sheet(
        &self,
        range: &Range<Data>,
        account: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<Transaction>> {
        let last = last_row(range);
        if last < DATA_START_ROW {
            return Err(Error::format(
                PARSER_NAME,
                format!("expected data from row {DATA_START_ROW}, sheet has {last} rows"),
            ));
        }

        let mut out = Vec::new();

        for row in DATA_START_ROW..=last {
            cancel.check()?;
            match parse_row(range, row, account) {
                Ok(Some(txn)) => out.push(txn),
                Ok(None) => debug!(parser = PARSER_NAME, row, "row is not a transaction"),
                Err(reason) => warn!(parser = PARSER_NAME, row, %reason, "skipping row"),
            }
        }

        debug!(parser = PARSER_NAME, count = out.len(), "parsed statement");
        Ok(out)
    }
}

fn parse_row(
    range: &Range<Data>,
    row: usize,
    account: &str,
) -> std::result::Result<Option<Transaction>, String> {
    if let Some((col, err)) = error_cell(range, row, &[COL_DATE, COL_PAYEE, COL_AMOUNT]) {
        return Err(format!("column {col} holds {err}"));
    }

    let date_col = if cell_text(range, row, COL_DATE).is_empty() {
        COL_EFFECTIVE_DATE
    } else {
        COL_DATE
    };
    let Some(date) = cell_datetime(range, row, date_col, &LOCALE) else {
        return Ok(None);
    };

    let payee = cell_text(range, row, COL_PAYEE);
    if payee.is_empty() {
        return Ok(None);
    }

    let amount = cell_decimal(range, row, COL_AMOUNT, &LOCALE).unwrap_or(Decimal::ZERO);

    let currency = cell_text(range, row, COL_CURRENCY);
    let currency = if currency.is_empty() {
        DEFAULT_CURRENCY.to_string()
    } else {
        currency
    };

    let description = cell_text(range, row, COL_COMMENTS);
    let is_transfer = contains_ignore_case(&payee, "transfer");

    Ok(Some(Transaction {
        bank: PARSER_NAME.to_string(),
        account: account.to_string(),
        payee,
        amount,
        category: None,
        description: Some(description).filter(|d| !d.is_empty()),
        date,
        currency,
        is_transfer,
    }))
}

impl TransactionsConverter for BbvaXlsxParser {
    fn key(&self) -> &'static str {
        PARSER_NAME
    }

    fn convert(
        &self,
        source: &mut dyn StatementSource,
        account: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<Transaction>> {
        let range = open_first_sheet(source, PARSER_NAME)?;
        self.convert_sheet(&range, account, cancel)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};
    use std::str::FromStr;

    fn sheet(rows: &[&[&str]]) -> Range<Data> {
        let width = rows.iter().map(|r| r.len()).max().unwrap_or(1).max(1);
        let mut range = Range::new((0, 0), (rows.len() as u32 - 1, width as u32 - 1));
        for (r, row) in rows.iter().enumerate() {
            for (c, value) in row.iter().enumerate() {
                if !value.is_empty() {
                    range.set_value((r as u32, c as u32), Data::String(value.to_string()));
                }
            }
        }
        range
    }

    fn statement() -> Range<Data> {
        sheet(&[
            &["Account movements"],
            &[""],
            &["", "Account", "ES00 0182 0000 0000 0000"],
            &[""],
            &["", "Eff. date", "Date", "Item", "Transaction", "Amount", "Currency", "Available", "Currency", "Comments"],
            &["", "03/14/2025", "03/15/2025", "Mercadona", "Card payment", "-45.20", "EUR", "954.80", "EUR", "Groceries week 11"],
            &["", "03/16/2025", "", "Transfer received", "Transfer", "1200.00", "", "2154.80", "EUR", ""],
            &["", "03/17/2025", "03/17/2025", "Amazon", "Card payment", "n/a", "USD", "2154.80", "EUR", ""],
            &["", "", "", "Orphan", "", "10.00", "EUR", "", "", ""],
            &["", "03/18/2025", "03/18/2025", "", "Fee", "-1.00", "EUR", "", "", ""],
        ])
    }

    #[test]
    fn test_parse_statement() {
        let txns = BbvaXlsxParser::new()
            .convert_sheet(&statement(), "bbva-main", &CancellationToken::new())
            .unwrap();

        assert_eq!(txns.len(), 3);

        let first = &txns[0];
        assert_eq!(first.payee, "Mercadona");
        assert_eq!(first.amount, Decimal::from_str("-45.20").unwrap());
        assert_eq!(first.description.as_deref(), Some("Groceries week 11"));
        assert_eq!((first.date.month(), first.date.day(), first.date.hour()), (3, 15, 0));
        assert_eq!(first.date.offset().local_minus_utc(), 3600);
        assert!(!first.is_transfer);

        // date falls back to the effective date, currency to EUR
        let second = &txns[1];
        assert_eq!(second.date.day(), 16);
        assert_eq!(second.currency, "EUR");
        assert!(second.is_transfer);

        // unparseable amount reads as zero
        assert_eq!(txns[2].amount, Decimal::ZERO);
        assert_eq!(txns[2].currency, "USD");
    }

    #[test]
    fn test_absurd_serial_date_skips_row() {
        let mut range = sheet(&[
            &["Account movements"],
            &[""],
            &[""],
            &[""],
            &["", "Eff. date", "Date", "Item", "Transaction", "Amount", "Currency"],
            &["", "", "", "Broken", "Card payment", "-3.00", "EUR"],
            &["", "03/15/2025", "03/15/2025", "Mercadona", "Card payment", "-45.20", "EUR"],
        ]);
        range.set_value((5, 2), Data::Float(1e20));

        let txns = BbvaXlsxParser
            .convert_sheet(&range, "bbva-main", &CancellationToken::new())
            .unwrap();

        assert_eq!(txns.len(), 1);
        assert_eq!(txns[0].payee, "Mercadona");
    }

    #[test]
    fn test_short_sheet_is_format_error() {
        let range = sheet(&[&["Account movements"], &[""], &["", "Eff. date", "Date"]]);
        let err = BbvaXlsxParser
            .convert_sheet(&range, "bbva-main", &CancellationToken::new())
            .unwrap_err();
        assert!(matches!(err, Error::Format { .. }));
    }

    #[test]
    fn test_conversion_is_idempotent() {
        let cancel = CancellationToken::new();
        let range = statement();
        let first = BbvaXlsxParser.convert_sheet(&range, "bbva-main", &cancel).unwrap();
        let second = BbvaXlsxParser.convert_sheet(&range, "bbva-main", &cancel).unwrap();
        assert_eq!(first, second);
    }
}
