use thiserror::Error;

/// Failures raised while pulling primitives out of a PDF.
///
/// Page-scoped variants are stored on the page they belong to, so they must
/// stay cheap to clone.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExtractError {
    #[error("failed to open PDF: {0}")]
    Open(String),

    #[error("page {page}: {reason}")]
    Page { page: usize, reason: String },

    #[error("page {page}: malformed content stream: {reason}")]
    Content { page: usize, reason: String },
}

impl ExtractError {
    pub fn page(page: usize, reason: impl Into<String>) -> Self {
        ExtractError::Page {
            page,
            reason: reason.into(),
        }
    }
}

impl From<lopdf::Error> for ExtractError {
    fn from(err: lopdf::Error) -> Self {
        ExtractError::Open(err.to_string())
    }
}

/// Failures while publishing metadata problems to a spreadsheet.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SheetError {
    #[error("in sheet only: {sheet_only:?}; in submissions only: {submissions_only:?}")]
    IdMismatch {
        sheet_only: Vec<u64>,
        submissions_only: Vec<u64>,
    },

    #[error("sheet cell {value:?} is not a submission id")]
    InvalidId { value: String },
}
