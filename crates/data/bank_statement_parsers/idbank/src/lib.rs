use calamine::{Data, Range};
use models::{
    CancellationToken, Error, Result, StatementSource, Transaction, TransactionsConverter,
};
use rust_decimal::Decimal;
use tracing::{debug, warn};
use utils::spreadsheet::{cell_datetime, cell_decimal, cell_text, error_cell, last_row, open_first_sheet};
use utils::{contains_ignore_case, DecimalConvention, Locale};

pub const PARSER_NAME: &str = "idbank";

const LOCALE: Locale = Locale::new("%d/%m/%Y %H:%M:%S", DecimalConvention::Point, 4);
const CURRENCY: &str = "AMD";

const HEADER_MARKER: &str = "document number";
const END_MARKER: &str = "balance at the end";

const COL_DOCUMENT_NUMBER: usize = 1; // A
const COL_DATE: usize = 3; // C
const COL_DEBIT: usize = 4;
const COL_CREDIT: usize = 5;
const COL_ADDITIONAL_INFO: usize = 6;
const COL_ACCOUNT: usize = 7;
const COL_PAYEE: usize = 8;
const COL_DESCRIPTION: usize = 9;

/// IDBank (Armenia) account statement workbook.
///
/// The transaction table starts right after the row whose first cell reads "Document number"
/// and ends at the "Balance at the end" summary row.
#[derive(Debug, Default, Clone, Copy)]
pub struct IdBankXlsxParser;

impl IdBankXlsxParser {
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
        let start = find_data_start_row(range, last).ok_or_else(|| {
            Error::format(PARSER_NAME, "could not find the 'Document number' header row")
        })?;

        let mut out = Vec::new();

        for row in start..=last {
            cancel.check()?;

            let first = cell_text(range, row, COL_DOCUMENT_NUMBER).to_lowercase();
            if first.contains(END_MARKER) {
                break;
            }

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

fn find_data_start_row(range: &Range<Data>, last: usize) -> Option<usize> {
    (1..=last)
        .find(|&row| contains_ignore_case(&cell_text(range, row, COL_DOCUMENT_NUMBER), HEADER_MARKER))
        .map(|row| row + 1)
}

fn parse_row(
    range: &Range<Data>,
    row: usize,
    account: &str,
) -> std::result::Result<Option<Transaction>, String> {
    if let Some((col, err)) = error_cell(range, row, &[COL_DATE, COL_DEBIT, COL_CREDIT, COL_PAYEE]) {
        return Err(format!("column {col} holds {err}"));
    }

    let Some(date) = cell_datetime(range, row, COL_DATE, &LOCALE) else {
        return Ok(None);
    };

    let payee = cell_text(range, row, COL_PAYEE);
    if payee.is_empty() {
        return Ok(None);
    }

    let debit = cell_decimal(range, row, COL_DEBIT, &LOCALE).unwrap_or(Decimal::ZERO);
    let credit = cell_decimal(range, row, COL_CREDIT, &LOCALE).unwrap_or(Decimal::ZERO);
    let amount = if debit > Decimal::ZERO { -debit } else { credit };

    let description = cell_text(range, row, COL_DESCRIPTION);
    let additional_info = cell_text(range, row, COL_ADDITIONAL_INFO);
    let description = match (description.is_empty(), additional_info.is_empty()) {
        (_, true) => description,
        (true, false) => additional_info,
        (false, false) => format!("{description} {additional_info}"),
    };

    let row_account = cell_text(range, row, COL_ACCOUNT);
    let account = if row_account.is_empty() {
        account.to_string()
    } else {
        row_account
    };

    let is_transfer = contains_ignore_case(&payee, "transfer");

    Ok(Some(Transaction {
        bank: PARSER_NAME.to_string(),
        account,
        payee,
        amount,
        category: None,
        description: Some(description).filter(|d| !d.is_empty()),
        date,
        currency: CURRENCY.to_string(),
        is_transfer,
    }))
}

impl TransactionsConverter for IdBankXlsxParser {
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
