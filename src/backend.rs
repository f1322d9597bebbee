//! The read-only PDF backend collaborator (§6).
//!
//! Domain logic in this crate never touches a PDF library directly; it only
//! calls through this trait. That keeps every component above component A
//! testable against synthetic [`crate::types::PageData`] fixtures, and
//! isolates the one real external dependency (pdfium) behind the `pdf`
//! feature.

use crate::error::Result;
use crate::types::PageData;

/// A rasterisation sink receiving clipped page crops at ~150 DPI (§6(ii)).
/// The core calls this once per detected panel; it never decides what to do
/// with the bytes.
pub trait RasterSink {
    fn receive_png(&mut self, page_index: usize, clip: Option<crate::geometry::BBox>, png_bytes: Vec<u8>);
}

/// Exposes exactly the read-only operations the core needs from a PDF
/// document: per-page text-dict extraction, annotation enumeration,
/// vector line/rect enumeration, and a rotation/mediabox accessor (§6(i)).
pub trait PdfBackend {
    /// Number of pages in the opened document.
    fn page_count(&self) -> usize;

    /// Extract all primitives for one page in the mediabox frame. Must
    /// merge standard text-block spans with AutoCAD SHX annotation glyph
    /// spans (§4.A) and must drop line segments shorter than 0.5pt.
    fn page_data(&self, page_index: usize) -> Result<PageData>;

    /// Rasterise a page (optionally clipped to `clip`, in mediabox
    /// coordinates) at the given DPI, returning PNG bytes. Implementations
    /// that cannot rasterise may return `Ok(None)`; the core treats that as
    /// "no render available", never as an error.
    fn rasterize(&self, page_index: usize, clip: Option<crate::geometry::BBox>, dpi: u32) -> Result<Option<Vec<u8>>>;
}

#[cfg(test)]
pub(crate) mod fixture {
    //! A trivial in-memory [`PdfBackend`] used by integration tests to
    //! exercise the pipeline without a real PDF file.
    use super::*;

    pub struct FixtureBackend {
        pub pages: Vec<PageData>,
    }

    impl PdfBackend for FixtureBackend {
        fn page_count(&self) -> usize {
            self.pages.len()
        }

        fn page_data(&self, page_index: usize) -> Result<PageData> {
            self.pages
                .get(page_index)
                .cloned()
                .ok_or_else(|| crate::error::AnalysisError::Backend(format!("no such page {page_index}")))
        }

        fn rasterize(&self, _page_index: usize, _clip: Option<crate::geometry::BBox>, _dpi: u32) -> Result<Option<Vec<u8>>> {
            Ok(None)
        }
    }
}
