//! Serializers for canonical transactions.

pub mod csv_exporter;
pub mod ofx_exporter;

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use models::{CancellationToken, Error, Result, Transaction};
use rust_decimal::{Decimal, RoundingStrategy};
use tracing::info;

pub use crate::csv_exporter::CsvExporter;
pub use crate::ofx_exporter::OfxExporter;

pub trait TransactionExporter {
    /// Lower-case format key used on the command line.
    fn key(&self) -> &'static str;

    /// Extension without the leading dot.
    fn file_extension(&self) -> &'static str;

    /// Serializes the whole document in memory.
    fn render(&self, transactions: &[Transaction], cancel: &CancellationToken) -> Result<Vec<u8>>;

    /// Writes the complete file, or nothing if rendering fails.
    fn export(
        &self,
        transactions: &[Transaction],
        path: &Path,
        cancel: &CancellationToken,
    ) -> Result<()> {
        let bytes = self.render(transactions, cancel)?;
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(path, &bytes)?;
        info!(
            format = self.key(),
            path = %path.display(),
            count = transactions.len(),
            "exported transactions"
        );
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExportFormat {
    Csv,
    Ofx,
}

impl ExportFormat {
    pub const ALL: [ExportFormat; 2] = [ExportFormat::Csv, ExportFormat::Ofx];

    pub fn key(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Ofx => "ofx",
        }
    }

    pub fn exporter(&self) -> Box<dyn TransactionExporter + Send + Sync> {
        match self {
            ExportFormat::Csv => Box::new(CsvExporter),
            ExportFormat::Ofx => Box::new(OfxExporter::new()),
        }
    }

    pub fn keys() -> Vec<&'static str> {
        Self::ALL.iter().map(ExportFormat::key).collect()
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for ExportFormat {
    type Err = Error;

    /// Case-insensitive.
    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|format| format.key() == wanted)
            .ok_or_else(|| {
                Error::NotFound(format!(
                    "exporter for format '{s}' (supported: {})",
                    Self::keys().join(", ")
                ))
            })
    }
}

/// Exactly two fractional digits, midpoints rounded away from zero.
pub fn format_amount(amount: Decimal) -> String {
    let rounded = amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    format!("{rounded:.2}")
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_amount() {
        assert_eq!(format_amount(Decimal::from_str("50").unwrap()), "50.00");
        assert_eq!(format_amount(Decimal::from_str("-0.125").unwrap()), "-0.13");
        assert_eq!(format_amount(Decimal::from_str("1900.1").unwrap()), "1900.10");
    }

    #[test]
    fn test_format_lookup() {
        assert_eq!("OFX".parse::<ExportFormat>().unwrap(), ExportFormat::Ofx);
        assert_eq!("csv".parse::<ExportFormat>().unwrap().exporter().file_extension(), "csv");

        let err = "qif".parse::<ExportFormat>().unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[test]
    fn test_exporter_keys_match_formats() {
        for format in ExportFormat::ALL {
            assert_eq!(format.exporter().key(), format.key());
        }
    }
}
