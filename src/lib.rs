pub mod camera_ready;
pub mod checks;
pub mod core;
pub mod error;
pub mod export;
pub mod metadata;
pub mod parser;
pub mod pipeline;
pub mod render;

pub use core::config::{CheckConfig, PaperType};
pub use core::report::{Category, CheckReport};
pub use pipeline::{CheckOptions, CheckOutcome, FormatChecker};
