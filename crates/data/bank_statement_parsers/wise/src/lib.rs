use csv::{ReaderBuilder, StringRecord};
use models::{
    CancellationToken, Error, Result, StatementSource, Transaction, TransactionsConverter,
};
use tracing::debug;
use utils::{remove_last_word, DecimalConvention, Locale};

pub const PARSER_NAME: &str = "wise";

/// `%.f` accepts the millisecond suffix Wise writes as well as its absence.
const LOCALE: Locale = Locale::new("%d-%m-%Y %H:%M:%S%.f", DecimalConvention::Point, 0);

const TRANSFER_ID_PREFIX: &str = "transfer-";

/// Wise statement export. Merchant names end with a location token that is dropped.
#[derive(Debug, Default, Clone, Copy)]
pub struct WiseCsvParser;

impl WiseCsvParser {
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

        let idx_id = find_col(&headers, "TransferWise ID")?;
        let idx_date = find_col(&headers, "Date Time")?;
        let idx_amount = find_col(&headers, "Amount")?;
        let idx_currency = find_col(&headers, "Currency")?;
        let idx_description = find_col(&headers, "Description")?;
        let idx_merchant = find_col(&headers, "Merchant")?;

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

            let id = field(&rec, idx_id, line)?;
            let description = field(&rec, idx_description, line)?;

            out.push(Transaction {
                bank: PARSER_NAME.to_string(),
                account: account.to_string(),
                payee: remove_last_word(field(&rec, idx_merchant, line)?),
                amount,
                category: None,
                description: Some(description.to_string()),
                date,
                currency: field(&rec, idx_currency, line)?.to_string(),
                is_transfer: id.to_lowercase().starts_with(TRANSFER_ID_PREFIX),
            });
        }

        debug!(parser = PARSER_NAME, count = out.len(), "parsed statement");
        Ok(out)
    }
}

impl TransactionsConverter for WiseCsvParser {
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
    use std::str::FromStr;

    const HEADER: &str = "\"TransferWise ID\",Date,\"Date Time\",Amount,Currency,Description,\"Payment Reference\",\"Running Balance\",Merchant,\"Total fees\"";

    fn sample() -> String {
        [
            HEADER,
            "CARD-2410023513,01-03-2025,01-03-2025 18:00:02.198,-29.90,EUR,\"Card transaction of 29.90 EUR issued by Department Store\",,970.10,\"Department Store\",0.00",
            "BALANCE-1183745901,02-03-2025,02-03-2025 09:15:40.001,15.00,EUR,\"Received money from John Smith\",,985.10,,0.00",
            "TRANSFER-1476230915,03-03-2025,03-03-2025 12:00:00.000,-1900.00,EUR,\"Sent money to Own Account\",rent,-914.90,,0.00",
        ]
        .join("\n")
    }

    #[test]
    fn test_transfer_flags_follow_id_prefix() {
        let txns = WiseCsvParser::new()
            .parse_str(&sample(), "wise-eur", &CancellationToken::new())
            .unwrap();

        let amounts: Vec<Decimal> = txns.iter().map(|t| t.amount).collect();
        assert_eq!(
            amounts,
            vec![
                Decimal::from_str("-29.90").unwrap(),
                Decimal::from_str("15.00").unwrap(),
                Decimal::from_str("-1900.00").unwrap(),
            ]
        );
        let flags: Vec<bool> = txns.iter().map(|t| t.is_transfer).collect();
        assert_eq!(flags, vec![false, false, true]);
    }

    #[test]
    fn test_merchant_loses_last_word() {
        let txns = WiseCsvParser
            .parse_str(&sample(), "wise-eur", &CancellationToken::new())
            .unwrap();

        let first = &txns[0];
        assert_eq!(first.payee, "Department");
        assert_eq!(
            first.description.as_deref(),
            Some("Card transaction of 29.90 EUR issued by Department Store")
        );
        assert_eq!((first.date.day(), first.date.month(), first.date.hour()), (1, 3, 18));
        assert_eq!(first.date.timestamp_subsec_millis(), 198);

        assert_eq!(txns[1].payee, "");
    }

    #[test]
    fn test_timestamp_without_fraction() {
        let content = format!(
            "{HEADER}\nCARD-1,04-03-2025,04-03-2025 07:45:10,-3.20,EUR,\"Card transaction\",,981.90,\"Bakery Madrid\",0.00"
        );
        let txns = WiseCsvParser
            .parse_str(&content, "wise-eur", &CancellationToken::new())
            .unwrap();

        let date = txns[0].date;
        assert_eq!((date.day(), date.hour(), date.minute(), date.second()), (4, 7, 45, 10));
        assert_eq!(date.timestamp_subsec_millis(), 0);
    }

    #[test]
    fn test_empty_file_returns_empty() {
        let txns = WiseCsvParser
            .parse_str("", "wise-eur", &CancellationToken::new())
            .unwrap();
        assert!(txns.is_empty());
    }

    #[test]
    fn test_invalid_header_is_format_error() {
        let err = WiseCsvParser
            .parse_str("Invalid,CSV,Content", "wise-eur", &CancellationToken::new())
            .unwrap_err();
        assert!(matches!(err, Error::Format { .. }));
    }

    #[test]
    fn test_short_row_is_fatal() {
        let content = format!("{HEADER}\n\nID,01-03-2025,01-03-2025 18:00:02.198,-61.13,");
        let err = WiseCsvParser
            .parse_str(&content, "wise-eur", &CancellationToken::new())
            .unwrap_err();
        assert!(matches!(err, Error::Format { .. }));
    }
}
