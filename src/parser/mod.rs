pub mod fonts;
pub mod layout_builder;
pub mod pdf_reader;
pub mod text_extractor;

pub use pdf_reader::{LopdfBackend, PdfReader};

use anyhow::Result;
use std::path::Path;

use crate::core::model::Document;

/// Source of extracted page primitives.
///
/// Opening failures are fatal for the document; failures confined to a page
/// are reported through that page's `content`.
pub trait PdfBackend: Send + Sync {
    fn load(&self, pdf_path: &Path) -> Result<Document>;
}
