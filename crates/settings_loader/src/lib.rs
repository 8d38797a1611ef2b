//! # Settings Loader
//!
//! Loads the optional `settings.json` and resolves where the payee/category store lives.
//!
//! ## Usage Examples
//!
//! ```rust,no_run
//! use std::path::PathBuf;
//!
//! // Load settings from a specific path
//! let settings = settings_loader::load_settings("config/settings.json")?;
//!
//! // Explicit path if given, otherwise ./settings.json when present
//! let path = Some(PathBuf::from("settings.json"));
//! let settings = settings_loader::load_settings_with_fallback(path.as_ref())?;
//!
//! // --db flag, then LEDGERLINE_DATABASE, then settings, then next to the executable
//! let db = settings_loader::resolve_database_path(None, settings.as_ref());
//! # Ok::<(), anyhow::Error>(())
//! ```

use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use models::Settings;

pub const DEFAULT_SETTINGS_FILE: &str = "settings.json";
pub const DATABASE_ENV_VAR: &str = "LEDGERLINE_DATABASE";
pub const DEFAULT_DATABASE_FILE: &str = "database.json";

/// Loads settings from a JSON file
pub fn load_settings<P: AsRef<Path>>(path: P) -> Result<Settings> {
    let path = path.as_ref();
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Reading settings file: {}", path.display()))?;
    let settings: Settings = serde_json::from_str(&raw)
        .with_context(|| format!("Parsing settings JSON in {}", path.display()))?;
    Ok(settings)
}

/// Loads settings from an optional path, returning None if no path is provided
pub fn load_optional_settings(path: Option<&PathBuf>) -> Result<Option<Settings>> {
    match path {
        Some(settings_path) => Ok(Some(load_settings(settings_path)?)),
        None => Ok(None),
    }
}

/// An explicit path must load. Without one, `settings.json` in the current directory is used
/// when it exists.
pub fn load_settings_with_fallback(path: Option<&PathBuf>) -> Result<Option<Settings>> {
    if path.is_some() {
        return load_optional_settings(path);
    }

    let default = Path::new(DEFAULT_SETTINGS_FILE);
    if default.is_file() {
        Ok(Some(load_settings(default)?))
    } else {
        Ok(None)
    }
}

/// Store location: `--db` flag, then the environment, then settings, then the executable's
/// directory.
pub fn resolve_database_path(cli: Option<&Path>, settings: Option<&Settings>) -> PathBuf {
    pick_database_path(
        cli,
        std::env::var_os(DATABASE_ENV_VAR),
        settings,
        default_database_path(),
    )
}

fn pick_database_path(
    cli: Option<&Path>,
    env: Option<OsString>,
    settings: Option<&Settings>,
    fallback: PathBuf,
) -> PathBuf {
    if let Some(path) = cli {
        return path.to_path_buf();
    }
    if let Some(value) = env.filter(|v| !v.is_empty()) {
        return PathBuf::from(value);
    }
    if let Some(path) = settings.and_then(|s| s.database_path.clone()) {
        return path;
    }
    fallback
}

fn default_database_path() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|dir| dir.join(DEFAULT_DATABASE_FILE)))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_DATABASE_FILE))
}
