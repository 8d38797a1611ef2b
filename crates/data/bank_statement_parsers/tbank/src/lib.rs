//! T-Bank statements, either the semicolon separated CSV export (often windows-1251) or the
//! OFX export.

use std::str::FromStr;

use chrono::NaiveDateTime;
use csv::{ReaderBuilder, StringRecord};
use models::{
    CancellationToken, Error, Result, StatementSource, Transaction, TransactionsConverter,
};
use rust_decimal::Decimal;
use tracing::debug;
use utils::ofx::{Element, OfxDocument};
use utils::{contains_ignore_case, DecimalConvention, Locale};

pub const PARSER_NAME: &str = "tbank";

const LOCALE: Locale = Locale::new("%d.%m.%Y %H:%M:%S", DecimalConvention::Comma, 3);
const OFX_DATE_FORMAT: &str = "%Y%m%d%H%M%S";
const DEFAULT_CURRENCY: &str = "RUB";

const TRANSFER_CATEGORY: &str = "Переводы";
const CSV_TRANSFER_MARKER: &str = "Перевод между счетами";
const OFX_TRANSFER_MARKER: &str = "Между своими счетами";

/// Number of leading characters inspected to tell OFX from CSV.
const SNIFF_CHARS: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementFormat {
    Csv,
    Ofx,
}

/// OFX when the text opens with an XML declaration or mentions OFX early on.
pub fn detect_format(content: &str) -> StatementFormat {
    let start: String = content.chars().take(SNIFF_CHARS).collect();
    let lowered = start.to_lowercase();
    if lowered.starts_with("<?xml") || lowered.contains("ofx") {
        StatementFormat::Ofx
    } else {
        StatementFormat::Csv
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct TBankParser;

impl TBankParser {
    pub fn new() -> Self {
        Self
    }

    pub fn parse_str(
        &self,
        content: &str,
        account: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<Transaction>> {
        let format = detect_format(content);
        debug!(parser = PARSER_NAME, ?format, "detected statement format");
        match format {
            StatementFormat::Csv => self.parse_csv(content, account, cancel),
            StatementFormat::Ofx => self.parse_ofx(content, account, cancel),
        }
    }

    pub fn parse_csv(
        &self,
        content: &str,
        account: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<Transaction>> {
        if content.trim().is_empty() {
            return Ok(Vec::new());
        }

        let mut rdr = ReaderBuilder::new()
            .delimiter(b';')
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_reader(content.as_bytes());

        let headers = rdr
            .headers()
            .map_err(|e| Error::format(PARSER_NAME, format!("cannot read header: {e}")))?
            .clone();

        let idx_date = find_col(&headers, "Дата операции")?;
        let idx_amount = find_col(&headers, "Сумма операции")?;
        let idx_category = find_col(&headers, "Категория")?;
        let idx_description = find_col(&headers, "Описание")?;

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

            let category = Some(field(&rec, idx_category, line)?)
                .filter(|c| !c.is_empty())
                .map(str::to_string);
            let description = field(&rec, idx_description, line)?.to_string();

            let is_transfer = category
                .as_deref()
                .is_some_and(|c| c.to_lowercase() == TRANSFER_CATEGORY.to_lowercase())
                && contains_ignore_case(&description, CSV_TRANSFER_MARKER);

            out.push(Transaction {
                bank: PARSER_NAME.to_string(),
                account: account.to_string(),
                payee: description.clone(),
                amount,
                category,
                description: Some(description),
                date,
                currency: DEFAULT_CURRENCY.to_string(),
                is_transfer,
            });
        }

        debug!(parser = PARSER_NAME, count = out.len(), "parsed CSV statement");
        Ok(out)
    }

    /// Records lacking an amount, posting date or name, or with unparseable values, are skipped.
    pub fn parse_ofx(
        &self,
        content: &str,
        account: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<Transaction>> {
        let doc = OfxDocument::parse(content, PARSER_NAME)?;
        if doc.descendants("OFX").is_empty() {
            return Err(Error::format(PARSER_NAME, "missing OFX root element"));
        }

        let mut out = Vec::new();

        for stmt_trnrs in doc.descendants("STMTTRNRS") {
            let Some(stmtrs) = stmt_trnrs.child("STMTRS") else {
                continue;
            };
            let default_currency = stmtrs.child_text("CURDEF").unwrap_or(DEFAULT_CURRENCY);
            let Some(tran_list) = stmtrs.child("BANKTRANLIST") else {
                continue;
            };

            for record in tran_list.children().filter(|c| c.name() == "STMTTRN") {
                cancel.check()?;
                match ofx_transaction(record, account, default_currency) {
                    Some(txn) => out.push(txn),
                    None => debug!(parser = PARSER_NAME, "skipping incomplete STMTTRN record"),
                }
            }
        }

        debug!(parser = PARSER_NAME, count = out.len(), "parsed OFX statement");
        Ok(out)
    }
}

fn ofx_transaction(record: Element<'_>, account: &str, default_currency: &str) -> Option<Transaction> {
    let raw_amount = record.child_text("TRNAMT")?;
    let raw_posted = record.child_text("DTPOSTED")?;
    let name = record.child_text("NAME")?;
    let memo = record.child_text("MEMO");

    // 20251009120249.000[+3:MSK]
    let posted = raw_posted.split('.').next().unwrap_or(raw_posted);
    let naive = NaiveDateTime::parse_from_str(posted, OFX_DATE_FORMAT).ok()?;
    let date = LOCALE.localize(naive)?;
    let amount = Decimal::from_str(raw_amount).ok()?;

    let currency = record
        .child("CURRENCY")
        .and_then(|c| c.child_text("CURSYM"))
        .unwrap_or(default_currency);

    let is_transfer = memo.is_some_and(|m| m.to_lowercase() == TRANSFER_CATEGORY.to_lowercase())
        && contains_ignore_case(name, OFX_TRANSFER_MARKER);

    Some(Transaction {
        bank: PARSER_NAME.to_string(),
        account: account.to_string(),
        payee: name.to_string(),
        amount,
        category: memo.map(str::to_string),
        description: Some(name.to_string()),
        date,
        currency: currency.to_string(),
        is_transfer,
    })
}

impl TransactionsConverter for TBankParser {
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
