use csv::{ReaderBuilder, StringRecord};
use models::{
    CancellationToken, Error, Result, StatementSource, Transaction, TransactionsConverter,
};
use tracing::debug;
use utils::{DecimalConvention, Locale};

pub const PARSER_NAME: &str = "revolut";

const LOCALE: Locale = Locale::new("%Y-%m-%d %H:%M:%S", DecimalConvention::Point, 0);

/// Revolut account statement export (comma separated, one header row).
#[derive(Debug, Default, Clone, Copy)]
pub struct RevolutCsvParser;

impl RevolutCsvParser {
    pub fn new() -> Self {
        Self
    }

    pub fn parse_str(
        &self,
        content: &str,
        account: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<Transaction>> {
        if content.trim().is_empty() {
            return Ok(Vec::new());
        }

        let mut rdr = ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_reader(content.as_bytes());

        let headers = rdr
            .headers()
            .map_err(|e| Error::format(PARSER_NAME, format!("cannot read header: {e}")))?
            .clone();

        let idx_type = find_col(&headers, "Type")?;
        let idx_date = find_col(&headers, "Started Date")?;
        let idx_amount = find_col(&headers, "Amount")?;
        let idx_currency = find_col(&headers, "Currency")?;
        let idx_description = find_col(&headers, "Description")?;

        let mut out = Vec::new();

        for (row_idx, rec) in rdr.records().enumerate() {
            cancel.check()?;
            let line = row_idx + 2;
            let rec = rec.map_err(|e| Error::format(PARSER_NAME, format!("row {line}: {e}")))?;

            let raw_date = field(&rec, idx_date, line)?;
            let date = LOCALE.parse_datetime(raw_date).ok_or_else(|| {
                Error::format(PARSER_NAME, format!("row {line}: invalid date '{raw_date}'"))
            })?;

            let raw_amount = field(&rec, idx_amount, line)?;
            let amount = LOCALE.parse_amount(raw_amount).ok_or_else(|| {
                Error::format(PARSER_NAME, format!("row {line}: invalid amount '{raw_amount}'"))
            })?;

            let txn_type = field(&rec, idx_type, line)?;

            out.push(Transaction {
                bank: PARSER_NAME.to_string(),
                account: account.to_string(),
                payee: field(&rec, idx_description, line)?.to_string(),
                amount,
                category: None,
                description: None,
                date,
                currency: field(&rec, idx_currency, line)?.to_string(),
                is_transfer: txn_type.eq_ignore_ascii_case("TRANSFER"),
            });
        }

        debug!(parser = PARSER_NAME, count = out.len(), "parsed statement");
        Ok(out)
    }
}

impl TransactionsConverter for RevolutCsvParser {
    fn key(&self) -> &'static str {
        PARSER_NAME
    }

    fn convert(
        &self,
        source: &mut dyn StatementSource,
        account: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<Transaction>> {
        let content = utils::read_text(source)?;
        self.parse_str(&content, account, cancel)
    }
}

fn find_col(headers: &StringRecord, name: &str) -> Result<usize> {
    headers
        .iter()
        .position(|h| h.trim() == name)
        .ok_or_else(|| Error::format(PARSER_NAME, format!("missing required column '{name}'")))
}

fn field<'r>(rec: &'r StringRecord, idx: usize, line: usize) -> Result<&'r str> {
    rec.get(idx)
        .ok_or_else(|| Error::format(PARSER_NAME, format!("row {line}: missing field {}", idx + 1)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};
    use rust_decimal::Decimal;
    use std::io::Cursor;
    use std::str::FromStr;

    const SAMPLE: &str = "Type,Product,Started Date,Completed Date,Description,Amount,Fee,Currency,State,Balance\n\
CARD_PAYMENT,Current,2025-03-01 18:00:02,2025-03-02 09:12:44,Mercadona,-23.45,0.00,EUR,COMPLETED,976.55\n\
TOPUP,Current,2025-03-03 10:00:00,2025-03-03 10:00:01,Top-Up by *1234,500.00,0.00,EUR,COMPLETED,1476.55\n\
TRANSFER,Current,2025-03-04 08:30:00,2025-03-04 08:30:05,To EUR Savings,-200.00,0.00,EUR,COMPLETED,1276.55\n";

    #[test]
    fn test_parse_sample() {
        let txns = RevolutCsvParser::new()
            .parse_str(SAMPLE, "main", &CancellationToken::new())
            .unwrap();

        assert_eq!(txns.len(), 3);
        let first = &txns[0];
        assert_eq!(first.bank, "revolut");
        assert_eq!(first.account, "main");
        assert_eq!(first.payee, "Mercadona");
        assert_eq!(first.amount, Decimal::from_str("-23.45").unwrap());
        assert_eq!(first.currency, "EUR");
        assert_eq!(first.category, None);
        assert_eq!(first.description, None);
        assert_eq!((first.date.day(), first.date.hour(), first.date.second()), (1, 18, 2));
        assert_eq!(first.date.offset().local_minus_utc(), 0);

        let flags: Vec<bool> = txns.iter().map(|t| t.is_transfer).collect();
        assert_eq!(flags, vec![false, false, true]);
    }

    #[test]
    fn test_transfer_type_is_case_insensitive() {
        let csv = "Type,Started Date,Amount,Currency,Description\ntransfer,2025-03-04 08:30:00,-1.00,EUR,Savings\n";
        let txns = RevolutCsvParser
            .parse_str(csv, "main", &CancellationToken::new())
            .unwrap();
        assert!(txns[0].is_transfer);
    }

    #[test]
    fn test_empty_file_returns_empty() {
        let txns = RevolutCsvParser
            .convert(&mut Cursor::new(Vec::new()), "main", &CancellationToken::new())
            .unwrap();
        assert!(txns.is_empty());
    }

    #[test]
    fn test_missing_column_is_format_error() {
        let err = RevolutCsvParser
            .parse_str("Invalid,CSV,Content\n1,2,3\n", "main", &CancellationToken::new())
            .unwrap_err();
        assert!(matches!(err, Error::Format { .. }));
    }

    #[test]
    fn test_bad_amount_is_fatal() {
        let csv = "Type,Started Date,Amount,Currency,Description\nCARD_PAYMENT,2025-03-01 18:00:02,abc,EUR,Shop\n";
        let err = RevolutCsvParser
            .parse_str(csv, "main", &CancellationToken::new())
            .unwrap_err();
        assert!(err.to_string().contains("row 2"));
    }

    #[test]
    fn test_cancellation_propagates() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = RevolutCsvParser.parse_str(SAMPLE, "main", &cancel).unwrap_err();
        assert!(err.is_cancelled());
    }

    #[test]
    fn test_conversion_is_idempotent() {
        let cancel = CancellationToken::new();
        let first = RevolutCsvParser.parse_str(SAMPLE, "main", &cancel).unwrap();
        let second = RevolutCsvParser
            .convert(&mut Cursor::new(SAMPLE.as_bytes().to_vec()), "main", &cancel)
            .unwrap();
        assert_eq!(first, second);
    }
}
