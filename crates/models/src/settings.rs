use std::path::PathBuf;

use serde::Deserialize;

// Settings models
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Settings {
    /// Location of the payee/category store
    #[serde(default)]
    pub database_path: Option<PathBuf>,
    /// Export format used when `--format` is omitted
    #[serde(default)]
    pub default_format: Option<String>,
}
