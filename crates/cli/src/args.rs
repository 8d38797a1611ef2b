use std::path::{Component, Path, PathBuf};

use clap::{Args, Parser, Subcommand, ValueEnum};
use models::BankStatementFile;

/// Convert bank statements to CSV or OFX and manage the payee/category store.
#[derive(Debug, Parser)]
#[command(name = "ledgerline", author, version, about, long_about = None)]
pub struct Cli {
    /// Path to the payee/category store (file or directory)
    #[arg(short = 'd', long = "db", global = true)]
    pub db_path: Option<PathBuf>,

    /// Path to settings.json (optional)
    #[arg(short = 's', long = "settings", global = true)]
    pub settings_path: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Convert statement files into one output file
    Convert(ConvertArgs),

    /// Manage payees
    Payee {
        #[command(subcommand)]
        action: PayeeAction,
    },

    /// Manage categories
    Category {
        #[command(subcommand)]
        action: CategoryAction,
    },

    /// Add a synonym to a payee or category
    Synonym(SynonymArgs),
}

#[derive(Debug, Args)]
pub struct ConvertArgs {
    /// Statement to convert as <path>:<bank>:<account>; repeat for several files
    #[arg(short = 'f', long = "file", required = true, value_parser = parse_file_spec)]
    pub files: Vec<BankStatementFile>,

    /// Output file (defaults to ./converted_transactions.<ext>)
    #[arg(short = 'o', long = "output", value_parser = parse_safe_path)]
    pub output: Option<PathBuf>,

    /// Output format: csv or ofx
    #[arg(long = "format")]
    pub format: Option<String>,
}

#[derive(Debug, Subcommand)]
pub enum PayeeAction {
    /// List all payees
    List,
    /// Add a payee
    Add {
        name: String,
        #[arg(long)]
        expense_category: Option<String>,
        #[arg(long)]
        expense_description: Option<String>,
        #[arg(long)]
        topup_category: Option<String>,
        #[arg(long)]
        topup_description: Option<String>,
    },
    /// Remove a payee
    Remove { name: String },
    /// Add a synonym to a payee
    Synonym { name: String, synonym: String },
}

#[derive(Debug, Subcommand)]
pub enum CategoryAction {
    /// List all categories
    List,
    /// Add a category
    Add { name: String },
    /// Remove a category
    Remove { name: String },
    /// Add a synonym to a category
    Synonym { name: String, synonym: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum RecordType {
    Payee,
    Category,
}

#[derive(Debug, Args)]
pub struct SynonymArgs {
    #[arg(long = "type", value_enum)]
    pub record_type: RecordType,

    /// Canonical name of the record
    #[arg(long)]
    pub name: String,

    #[arg(long)]
    pub synonym: String,
}

/// `<path>:<bank>:<account>` with exactly three parts.
pub fn parse_file_spec(value: &str) -> Result<BankStatementFile, String> {
    let parts: Vec<&str> = value.split(':').collect();
    let [path, bank, account] = parts.as_slice() else {
        return Err(format!(
            "expected <path>:<bank>:<account>, got '{value}' ({} parts)",
            parts.len()
        ));
    };

    if path.trim().is_empty() {
        return Err("statement path is empty".to_string());
    }
    if bank.trim().is_empty() {
        return Err(format!("bank is empty in '{value}'"));
    }
    let path = parse_safe_path(path)?;

    Ok(BankStatementFile::new(path, bank.trim(), *account))
}

/// Relative paths may not climb above the current directory.
pub fn parse_safe_path(value: &str) -> Result<PathBuf, String> {
    let path = Path::new(value);
    if escapes_current_dir(path) {
        return Err(format!("path '{value}' escapes the current directory"));
    }
    Ok(path.to_path_buf())
}

fn escapes_current_dir(path: &Path) -> bool {
    if path.is_absolute() {
        return false;
    }
    let mut depth: i32 = 0;
    for component in path.components() {
        match component {
            Component::ParentDir => {
                depth -= 1;
                if depth < 0 {
                    return true;
                }
            }
            Component::Normal(_) => depth += 1,
            Component::CurDir => {}
            Component::RootDir | Component::Prefix(_) => return false,
        }
    }
    false
}
