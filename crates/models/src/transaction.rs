use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, FixedOffset};
use rust_decimal::Decimal;

/// Bank-agnostic transaction produced by every converter.
#[derive(Debug, Clone, PartialEq)]
pub struct Transaction {
    pub bank: String,
    pub account: String,
    pub payee: String,
    pub amount: Decimal,
    pub category: Option<String>,
    pub description: Option<String>,
    pub date: DateTime<FixedOffset>,
    /// ISO 4217 code, e.g. EUR
    pub currency: String,
    pub is_transfer: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionKind {
    Expense,
    TopUp,
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransactionKind::Expense => write!(f, "Expense"),
            TransactionKind::TopUp => write!(f, "TopUp"),
        }
    }
}

impl Transaction {
    /// Derived from the sign of the amount; zero counts as a top-up.
    pub fn kind(&self) -> TransactionKind {
        if self.amount < Decimal::ZERO {
            TransactionKind::Expense
        } else {
            TransactionKind::TopUp
        }
    }

    pub fn is_expense(&self) -> bool {
        self.kind() == TransactionKind::Expense
    }
}

/// One `--file` argument: which file, which bank format, which account label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BankStatementFile {
    pub path: PathBuf,
    pub bank: String,
    pub account: String,
}

impl BankStatementFile {
    pub fn new(path: impl Into<PathBuf>, bank: impl Into<String>, account: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            bank: bank.into(),
            account: account.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::str::FromStr;

    fn txn(amount: &str) -> Transaction {
        Transaction {
            bank: "wise".into(),
            account: "main".into(),
            payee: "Shop".into(),
            amount: Decimal::from_str(amount).unwrap(),
            category: None,
            description: None,
            date: FixedOffset::east_opt(0)
                .unwrap()
                .with_ymd_and_hms(2025, 3, 1, 18, 0, 2)
                .unwrap(),
            currency: "EUR".into(),
            is_transfer: false,
        }
    }

    #[test]
    fn test_kind_follows_amount_sign() {
        assert_eq!(txn("-61.13").kind(), TransactionKind::Expense);
        assert_eq!(txn("15.00").kind(), TransactionKind::TopUp);
        assert_eq!(txn("0").kind(), TransactionKind::TopUp);
        assert_eq!(txn("-0.00").kind(), TransactionKind::TopUp);
    }

    #[test]
    fn test_kind_display() {
        assert_eq!(TransactionKind::Expense.to_string(), "Expense");
        assert_eq!(TransactionKind::TopUp.to_string(), "TopUp");
    }
}
