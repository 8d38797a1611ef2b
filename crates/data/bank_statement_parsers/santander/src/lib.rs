use calamine::{Data, Range};
use models::{
    CancellationToken, Error, Result, StatementSource, Transaction, TransactionsConverter,
};
use rust_decimal::Decimal;
use tracing::{debug, warn};
use utils::spreadsheet::{cell_datetime, cell_decimal, cell_text, error_cell, last_row, open_first_sheet};
use utils::{contains_ignore_case, DecimalConvention, Locale};

pub const PARSER_NAME: &str = "santander";

const LOCALE: Locale = Locale::new("%d/%m/%Y", DecimalConvention::Point, 1);
const CURRENCY: &str = "EUR";

/// Header sits on row 7.
const DATA_START_ROW: usize = 8;

const COL_DATE: usize = 1; // A
const COL_CONCEPT: usize = 3; // C
const COL_AMOUNT: usize = 4;

const TRANSFER_MARKER: &str = "transferencia";
const TRANSFER_RECEIVED: &str = "Transfer received";
const TRANSFER_COMPLETED: &str = "Transfer completed";

/// Santander (Spain) account movements workbook.
///
/// Bank transfers carry the counterparty only inside the free-text concept, so their payee is
/// replaced by a fixed label depending on direction.
#[derive(Debug, Default, Clone, Copy)]
pub struct SantanderXlsxParser;

impl SantanderXlsxParser {
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
    if let Some((col, err)) = error_cell(range, row, &[COL_DATE, COL_CONCEPT, COL_AMOUNT]) {
        return Err(format!("column {col} holds {err}"));
    }

    let Some(date) = cell_datetime(range, row, COL_DATE, &LOCALE) else {
        return Ok(None);
    };

    let concept = cell_text(range, row, COL_CONCEPT);
    if concept.is_empty() {
        return Ok(None);
    }

    let amount = cell_decimal(range, row, COL_AMOUNT, &LOCALE).unwrap_or(Decimal::ZERO);
    let is_transfer = contains_ignore_case(&concept, TRANSFER_MARKER);

    let payee = match (is_transfer, amount >= Decimal::ZERO) {
        (true, true) => TRANSFER_RECEIVED.to_string(),
        (true, false) => TRANSFER_COMPLETED.to_string(),
        (false, _) => concept.clone(),
    };

    Ok(Some(Transaction {
        bank: PARSER_NAME.to_string(),
        account: account.to_string(),
        payee,
        amount,
        category: None,
        description: Some(concept),
        date,
        currency: CURRENCY.to_string(),
        is_transfer,
    }))
}

impl TransactionsConverter for SantanderXlsxParser {
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
