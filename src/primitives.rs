//! Component A: primitives.
//!
//! The PDF-specific half of this component (merging text-block spans with
//! SHX annotation glyphs, dropping sub-0.5pt lines) lives behind
//! [`crate::backend::PdfBackend`]; what's left here is the backend-
//! independent geometry helpers every later component reuses to query a
//! page's or view's primitives.

use crate::geometry::{BBox, Line, Point};
use crate::types::TextSpan;

/// Minimum line length retained by the backend (§4.A). Kept here as a
/// documented constant for components that re-filter already-extracted
/// lines (the backend is responsible for applying it on ingestion).
pub const MIN_LINE_LENGTH_PT: f64 = 0.5;

/// Text spans whose centre falls inside `bbox`.
pub fn texts_in_bbox<'a>(texts: &'a [TextSpan], bbox: &BBox) -> Vec<&'a TextSpan> {
    texts.iter().filter(|t| bbox.contains_point(&t.center())).collect()
}

/// Lines with at least one endpoint inside `bbox`.
pub fn lines_in_bbox<'a>(lines: &'a [Line], bbox: &BBox) -> Vec<&'a Line> {
    lines
        .iter()
        .filter(|l| bbox.contains_point(&l.p1) || bbox.contains_point(&l.p2))
        .collect()
}

/// Text spans whose centre lies within `radius` of `point`.
pub fn nearby_texts<'a>(point: Point, texts: &'a [TextSpan], radius: f64) -> Vec<&'a TextSpan> {
    texts.iter().filter(|t| t.center().dist(&point) <= radius).collect()
}

/// Lines whose perpendicular distance to `point` is within `radius`.
pub fn nearby_lines<'a>(point: Point, lines: &'a [Line], radius: f64) -> Vec<&'a Line> {
    lines.iter().filter(|l| l.point_distance(&point) <= radius).collect()
}
