//! Deterministic extraction and 2D/3D reconstruction of pre-engineered
//! steel building structure from Japanese architectural drawing PDFs.
//!
//! The pipeline runs component by component — primitives, view
//! segmentation, grid extraction, dimensions, heights, quality gates,
//! cross-view matching, 3D reconstruction, quantity takeoff, and leader
//! tracing — each consuming only the outputs of the ones before it. See
//! [`analyze`] for the orchestrating entry point.

pub mod axial_frame;
pub mod backend;
pub mod catalog;
pub mod config;
pub mod dimensions;
pub mod error;
pub mod geometry;
pub mod grids;
pub mod heights;
pub mod leader;
pub mod matching;
pub mod primitives;
#[cfg(feature = "pdf")]
pub mod pdfium;
pub mod quality;
pub mod reconstruction;
pub mod roof_plan;
pub mod takeoff;
pub mod types;
pub mod views;

mod analyze;

pub use analyze::analyze;
pub use backend::{PdfBackend, RasterSink};
pub use catalog::SteelCatalog;
pub use config::AnalysisConfig;
pub use error::{AnalysisError, Result};
#[cfg(feature = "pdf")]
pub use pdfium::PdfiumBackend;
pub use types::AnalysisResult;
