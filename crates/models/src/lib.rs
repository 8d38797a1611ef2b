//! Canonical data model shared by every converter, exporter and the pipeline.

pub mod cancel;
pub mod error;
pub mod reference;
pub mod settings;
pub mod transaction;

use std::io::{Read, Seek};

pub use crate::cancel::CancellationToken;
pub use crate::error::{Error, Result};
pub use crate::reference::{Category, Payee};
pub use crate::settings::Settings;
pub use crate::transaction::{BankStatementFile, Transaction, TransactionKind};

/// Any seekable byte stream a converter can read a statement from.
pub trait StatementSource: Read + Seek {}

impl<T: Read + Seek> StatementSource for T {}

/// Produces canonical transactions from one bank's export format.
pub trait TransactionsConverter {
    /// Lower-case bank key used on the command line.
    fn key(&self) -> &'static str;

    fn convert(
        &self,
        source: &mut dyn StatementSource,
        account: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<Transaction>>;
}
