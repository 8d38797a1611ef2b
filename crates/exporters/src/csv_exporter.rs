use std::io;

use models::{CancellationToken, Result, Transaction};

use crate::TransactionExporter;

pub const HEADER: [&str; 10] = [
    "Bank",
    "Account",
    "Payee",
    "Amount",
    "Category",
    "Description",
    "Date",
    "Currency",
    "IsTransfer",
    "Type",
];

const DATE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%:z";

#[derive(Debug, Default, Clone, Copy)]
pub struct CsvExporter;

impl TransactionExporter for CsvExporter {
    fn key(&self) -> &'static str {
        "csv"
    }

    fn file_extension(&self) -> &'static str {
        "csv"
    }

    fn render(&self, transactions: &[Transaction], cancel: &CancellationToken) -> Result<Vec<u8>> {
        let mut wtr = csv::Writer::from_writer(Vec::new());
        wtr.write_record(HEADER).map_err(io::Error::from)?;

        for txn in transactions {
            cancel.check()?;
            let amount = txn.amount.to_string();
            let date = txn.date.format(DATE_FORMAT).to_string();
            let kind = txn.kind().to_string();
            wtr.write_record([
                txn.bank.as_str(),
                txn.account.as_str(),
                txn.payee.as_str(),
                amount.as_str(),
                txn.category.as_deref().unwrap_or(""),
                txn.description.as_deref().unwrap_or(""),
                date.as_str(),
                txn.currency.as_str(),
                if txn.is_transfer { "true" } else { "false" },
                kind.as_str(),
            ])
            .map_err(io::Error::from)?;
        }

        let bytes = wtr.into_inner().map_err(|e| e.into_error())?;
        Ok(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::txn;
    use tempfile::tempdir;

    #[test]
    fn test_empty_input_writes_header_only() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.csv");

        CsvExporter
            .export(&[], &path, &CancellationToken::new())
            .unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(
            content,
            "Bank,Account,Payee,Amount,Category,Description,Date,Currency,IsTransfer,Type\n"
        );
    }

    #[test]
    fn test_rows_follow_header_order() {
        let mut expense = txn("wise", "main", "EUR", "Lidl, Madrid", "-29.90", 1);
        expense.category = Some("Groceries".into());
        let mut transfer = txn("wise", "main", "EUR", "Savings", "100.00", 2);
        transfer.is_transfer = true;

        let bytes = CsvExporter
            .render(&[expense, transfer], &CancellationToken::new())
            .unwrap();
        let content = String::from_utf8(bytes).unwrap();
        let lines: Vec<&str> = content.lines().collect();

        assert_eq!(lines.len(), 3);
        assert_eq!(
            lines[1],
            "wise,main,\"Lidl, Madrid\",-29.90,Groceries,,2025-03-01T12:30:15+01:00,EUR,false,Expense"
        );
        assert_eq!(
            lines[2],
            "wise,main,Savings,100.00,,,2025-03-02T12:30:15+01:00,EUR,true,TopUp"
        );
    }

    #[test]
    fn test_cancellation_propagates() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = CsvExporter
            .render(&[txn("x", "y", "USD", "p", "1", 1)], &cancel)
            .unwrap_err();
        assert!(err.is_cancelled());
    }
}
