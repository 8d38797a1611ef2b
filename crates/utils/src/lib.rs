pub mod database;
pub mod encoding;
pub mod enrichment;
pub mod locale;
pub mod ofx;
pub mod spreadsheet;
pub mod text;

// Re-export commonly used items
pub use crate::database::{read_database, write_database, Database};
pub use crate::encoding::{decode_text, detect_encoding, read_text};
pub use crate::enrichment::Enricher;
pub use crate::locale::{DecimalConvention, Locale};
pub use crate::text::{contains_ignore_case, normalize_whitespace, remove_last_word};
