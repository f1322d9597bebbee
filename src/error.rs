//! Top-level error type for [`crate::analyze`].
//!
//! Only document-open failures are represented here (§7 "Input invalid").
//! Every other absence downstream (no views recognised, no grid, no
//! matching) is a normal outcome modelled by `Option` fields on
//! [`crate::types::AnalysisResult`], not an error variant.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("not a valid PDF document: {0}")]
    InvalidDocument(String),

    #[error("document contains zero pages")]
    EmptyDocument,

    #[error("PDF backend error: {0}")]
    Backend(String),
}

pub type Result<T> = std::result::Result<T, AnalysisError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_document_message() {
        let e = AnalysisError::InvalidDocument("bad header".into());
        assert_eq!(e.to_string(), "not a valid PDF document: bad header");
    }

    #[test]
    fn empty_document_message() {
        assert_eq!(
            AnalysisError::EmptyDocument.to_string(),
            "document contains zero pages"
        );
    }
}
