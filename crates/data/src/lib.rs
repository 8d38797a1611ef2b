pub mod pipeline;
pub mod registry;

pub use crate::pipeline::{process_files, validate_files};
pub use crate::registry::{Bank, ConverterRegistry};
