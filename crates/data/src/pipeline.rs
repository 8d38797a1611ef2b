use std::fs::File;
use std::io::BufReader;

use models::{BankStatementFile, CancellationToken, Error, Result, Transaction};
use tracing::{debug, info};
use utils::Enricher;

use crate::registry::ConverterRegistry;

/// Checks that every file exists and names a known bank before any conversion starts.
pub fn validate_files(files: &[BankStatementFile], registry: &ConverterRegistry) -> Result<()> {
    for file in files {
        if !file.path.is_file() {
            return Err(Error::NotFound(format!(
                "statement file {}",
                file.path.display()
            )));
        }
        registry.get(&file.bank)?;
    }
    Ok(())
}

/// Converts the files in the given order, merges the results and enriches them.
///
/// Any converter failure aborts the whole run; nothing is returned for the files that did
/// convert. Cancellation surfaces as [`Error::Cancelled`].
pub fn process_files(
    files: &[BankStatementFile],
    registry: &ConverterRegistry,
    enricher: &Enricher<'_>,
    cancel: &CancellationToken,
) -> Result<Vec<Transaction>> {
    validate_files(files, registry)?;

    let mut all = Vec::new();

    for file in files {
        cancel.check()?;
        let converter = registry.get(&file.bank)?;

        let transactions = {
            let handle = File::open(&file.path)?;
            let mut reader = BufReader::new(handle);
            converter.convert(&mut reader, &file.account, cancel)?
        };

        info!(
            file = %file.path.display(),
            bank = converter.key(),
            account = %file.account,
            count = transactions.len(),
            "converted statement"
        );
        all.extend(transactions);
    }

    let enriched = enricher.enrich(all);
    debug!(count = enriched.len(), "enrichment complete");
    Ok(enriched)
}
