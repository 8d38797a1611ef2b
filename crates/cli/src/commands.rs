use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::{Context, Result};
use data_import::{process_files, ConverterRegistry};
use exporters::ExportFormat;
use models::{CancellationToken, Category, Payee, Settings};
use tracing::info;
use utils::{read_database, write_database, Database, Enricher};

use crate::args::{CategoryAction, ConvertArgs, PayeeAction, RecordType, SynonymArgs};

pub const DEFAULT_OUTPUT_STEM: &str = "converted_transactions";
const DEFAULT_FORMAT: &str = "csv";

/// Converts every statement and writes one output file. Returns the output path.
pub fn convert(
    args: ConvertArgs,
    settings: &Settings,
    db_path: &Path,
    cancel: &CancellationToken,
) -> Result<PathBuf> {
    let format_key = args
        .format
        .as_deref()
        .or(settings.default_format.as_deref())
        .unwrap_or(DEFAULT_FORMAT);
    let format = ExportFormat::from_str(format_key)?;
    let exporter = format.exporter();

    let output = args.output.unwrap_or_else(|| {
        PathBuf::from(format!("{DEFAULT_OUTPUT_STEM}.{}", exporter.file_extension()))
    });

    let registry = ConverterRegistry::new();
    let database = read_database(db_path)?;
    let enricher = Enricher::new(&database.payees, &database.categories);

    let transactions = process_files(&args.files, &registry, &enricher, cancel)?;
    info!(
        files = args.files.len(),
        transactions = transactions.len(),
        format = %format,
        "conversion finished"
    );

    exporter
        .export(&transactions, &output, cancel)
        .with_context(|| format!("Writing {}", output.display()))?;
    Ok(output)
}

pub fn payee(action: PayeeAction, db_path: &Path) -> Result<()> {
    let mut db = read_database(db_path)?;
    match action {
        PayeeAction::List => {
            for payee in &db.payees {
                println!("{}", describe_payee(payee));
            }
            return Ok(());
        }
        PayeeAction::Add {
            name,
            expense_category,
            expense_description,
            topup_category,
            topup_description,
        } => {
            let payee = Payee {
                expense_category,
                expense_description,
                topup_category,
                topup_description,
                ..Payee::new(name)
            };
            info!(payee = %payee.name, "adding payee");
            db.add_payee(payee)?;
        }
        PayeeAction::Remove { name } => {
            let removed = db.remove_payee(&name)?;
            info!(payee = %removed.name, "removed payee");
        }
        PayeeAction::Synonym { name, synonym } => {
            db.add_payee_synonym(&name, &synonym)?;
            info!(payee = %name, %synonym, "added payee synonym");
        }
    }
    save(db_path, &db)
}

pub fn category(action: CategoryAction, db_path: &Path) -> Result<()> {
    let mut db = read_database(db_path)?;
    match action {
        CategoryAction::List => {
            for category in &db.categories {
                println!("{}", describe_synonyms(&category.name, &category.synonyms));
            }
            return Ok(());
        }
        CategoryAction::Add { name } => {
            info!(category = %name, "adding category");
            db.add_category(Category::new(name))?;
        }
        CategoryAction::Remove { name } => {
            let removed = db.remove_category(&name)?;
            info!(category = %removed.name, "removed category");
        }
        CategoryAction::Synonym { name, synonym } => {
            db.add_category_synonym(&name, &synonym)?;
            info!(category = %name, %synonym, "added category synonym");
        }
    }
    save(db_path, &db)
}

pub fn synonym(args: SynonymArgs, db_path: &Path) -> Result<()> {
    match args.record_type {
        RecordType::Payee => payee(
            PayeeAction::Synonym {
                name: args.name,
                synonym: args.synonym,
            },
            db_path,
        ),
        RecordType::Category => category(
            CategoryAction::Synonym {
                name: args.name,
                synonym: args.synonym,
            },
            db_path,
        ),
    }
}

fn save(db_path: &Path, db: &Database) -> Result<()> {
    let written = write_database(db_path, db)?;
    info!(path = %written.display(), "store updated");
    Ok(())
}

fn describe_payee(payee: &Payee) -> String {
    let mut line = describe_synonyms(&payee.name, &payee.synonyms);
    let fields = [
        ("expense category", &payee.expense_category),
        ("expense description", &payee.expense_description),
        ("top-up category", &payee.topup_category),
        ("top-up description", &payee.topup_description),
    ];
    for (label, value) in fields {
        if let Some(value) = value {
            line.push_str(&format!("\n  {label}: {value}"));
        }
    }
    line
}

fn describe_synonyms(name: &str, synonyms: &[String]) -> String {
    if synonyms.is_empty() {
        name.to_string()
    } else {
        format!("{name} (synonyms: {})", synonyms.join(", "))
    }
}
