//! OFX 1.0.2 (SGML header, well-formed body) bank statement writer.
//!
//! Transactions are grouped into one statement per (bank, account, currency), in the order
//! each group first appears. Timestamps carry no zone marker: DTPOSTED is the transaction's
//! own wall-clock time and DTSERVER the exporting machine's local time.

use chrono::{DateTime, FixedOffset, Local};
use models::{CancellationToken, Error, Result, Transaction};
use quick_xml::escape::escape;
use rust_decimal::Decimal;
use sha2::{Digest, Sha256};

use crate::{format_amount, TransactionExporter};

const HEADER: [&str; 9] = [
    "OFXHEADER:100",
    "DATA:OFXSGML",
    "VERSION:102",
    "SECURITY:NONE",
    "ENCODING:UTF-8",
    "CHARSET:NONE",
    "COMPRESSION:NONE",
    "OLDFILEUID:NONE",
    "NEWFILEUID:NONE",
];

const DATETIME_FORMAT: &str = "%Y%m%d%H%M%S";
const DATE_FORMAT: &str = "%Y%m%d";
const FITID_LEN: usize = 32;
const INDENT: &str = "  ";

#[derive(Debug, Default, Clone, Copy)]
pub struct OfxExporter;

impl OfxExporter {
    pub fn new() -> Self {
        Self
    }

    /// Renders with an explicit server timestamp, written in its own offset.
    pub fn render_at(
        &self,
        transactions: &[Transaction],
        server_time: DateTime<FixedOffset>,
        cancel: &CancellationToken,
    ) -> Result<String> {
        if transactions.is_empty() {
            return Err(Error::Validation(
                "cannot export an empty transaction set to OFX".to_string(),
            ));
        }

        let mut doc = OfxWriter::default();
        for line in HEADER {
            doc.line(line);
        }
        doc.line("");

        doc.open("OFX");

        doc.open("SIGNONMSGSRSV1");
        doc.open("SONRS");
        write_status(&mut doc);
        doc.leaf("DTSERVER", &server_time.format(DATETIME_FORMAT).to_string());
        doc.leaf("LANGUAGE", "ENG");
        doc.close("SONRS");
        doc.close("SIGNONMSGSRSV1");

        doc.open("BANKMSGSRSV1");
        for group in group_statements(transactions) {
            write_statement(&mut doc, &group, cancel)?;
        }
        doc.close("BANKMSGSRSV1");

        doc.close("OFX");
        Ok(doc.finish())
    }
}

impl TransactionExporter for OfxExporter {
    fn key(&self) -> &'static str {
        "ofx"
    }

    fn file_extension(&self) -> &'static str {
        "ofx"
    }

    fn render(&self, transactions: &[Transaction], cancel: &CancellationToken) -> Result<Vec<u8>> {
        self.render_at(transactions, Local::now().fixed_offset(), cancel)
            .map(String::into_bytes)
    }
}

/// Stable identifier: first 32 upper-case hex digits of
/// SHA-256(`bank|account|yyyyMMddHHmmss|payee|amount|currency`).
pub fn fit_id(txn: &Transaction) -> String {
    let key = format!(
        "{}|{}|{}|{}|{}|{}",
        txn.bank,
        txn.account,
        txn.date.format(DATETIME_FORMAT),
        txn.payee,
        format_amount(txn.amount),
        txn.currency
    );
    let digest = Sha256::digest(key.as_bytes());
    let mut id = hex::encode_upper(digest);
    id.truncate(FITID_LEN);
    id
}

fn transaction_type(txn: &Transaction) -> &'static str {
    if txn.is_transfer {
        "XFER"
    } else if txn.is_expense() {
        "DEBIT"
    } else {
        "CREDIT"
    }
}

struct StatementGroup<'a> {
    bank: &'a str,
    account: &'a str,
    currency: &'a str,
    transactions: Vec<&'a Transaction>,
}

fn group_statements(transactions: &[Transaction]) -> Vec<StatementGroup<'_>> {
    let mut groups: Vec<StatementGroup<'_>> = Vec::new();
    for txn in transactions {
        let existing = groups.iter_mut().find(|g| {
            g.bank == txn.bank && g.account == txn.account && g.currency == txn.currency
        });
        match existing {
            Some(group) => group.transactions.push(txn),
            None => groups.push(StatementGroup {
                bank: &txn.bank,
                account: &txn.account,
                currency: &txn.currency,
                transactions: vec![txn],
            }),
        }
    }
    for group in &mut groups {
        group.transactions.sort_by_key(|t| t.date);
    }
    groups
}

fn write_status(doc: &mut OfxWriter) {
    doc.open("STATUS");
    doc.leaf("CODE", "0");
    doc.leaf("SEVERITY", "INFO");
    doc.close("STATUS");
}

fn write_statement(
    doc: &mut OfxWriter,
    group: &StatementGroup<'_>,
    cancel: &CancellationToken,
) -> Result<()> {
    // groups are never empty
    let (Some(first), Some(last)) = (group.transactions.first(), group.transactions.last()) else {
        return Ok(());
    };
    let start = statement_date(&first.date);
    let end = statement_date(&last.date);
    let balance: Decimal = group.transactions.iter().map(|t| t.amount).sum();

    doc.open("STMTTRNRS");
    doc.leaf("TRNUID", "1");
    write_status(doc);

    doc.open("STMTRS");
    doc.leaf("CURDEF", group.currency);

    doc.open("BANKACCTFROM");
    doc.leaf("BANKID", group.bank);
    doc.leaf("ACCTID", group.account);
    doc.leaf("ACCTTYPE", "CHECKING");
    doc.close("BANKACCTFROM");

    doc.open("BANKTRANLIST");
    doc.leaf("DTSTART", &start);
    doc.leaf("DTEND", &end);
    for txn in &group.transactions {
        cancel.check()?;
        write_transaction(doc, txn);
    }
    doc.close("BANKTRANLIST");

    doc.open("LEDGERBAL");
    doc.leaf("BALAMT", &format_amount(balance));
    doc.leaf("DTASOF", &end);
    doc.close("LEDGERBAL");

    doc.close("STMTRS");
    doc.close("STMTTRNRS");
    Ok(())
}

fn write_transaction(doc: &mut OfxWriter, txn: &Transaction) {
    doc.open("STMTTRN");
    doc.leaf("TRNTYPE", transaction_type(txn));
    doc.leaf("DTPOSTED", &txn.date.format(DATETIME_FORMAT).to_string());
    doc.leaf("TRNAMT", &format_amount(txn.amount));
    doc.leaf("FITID", &fit_id(txn));
    doc.leaf("NAME", &txn.payee);
    if let Some(memo) = txn.description.as_deref().filter(|d| !d.is_empty()) {
        doc.leaf("MEMO", memo);
    }
    doc.close("STMTTRN");
}

fn statement_date(date: &DateTime<FixedOffset>) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// Line-oriented writer that indents two spaces per open element.
#[derive(Default)]
struct OfxWriter {
    out: String,
    depth: usize,
}

impl OfxWriter {
    fn line(&mut self, text: &str) {
        self.out.push_str(text);
        self.out.push('\n');
    }

    fn indented(&mut self, text: &str) {
        for _ in 0..self.depth {
            self.out.push_str(INDENT);
        }
        self.line(text);
    }

    fn open(&mut self, tag: &str) {
        self.indented(&format!("<{tag}>"));
        self.depth += 1;
    }

    fn close(&mut self, tag: &str) {
        self.depth = self.depth.saturating_sub(1);
        self.indented(&format!("</{tag}>"));
    }

    fn leaf(&mut self, tag: &str, value: &str) {
        self.indented(&format!("<{tag}>{}</{tag}>", escape(value)));
    }

    fn finish(self) -> String {
        self.out
    }
}
