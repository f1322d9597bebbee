//! Real [`PdfBackend`](crate::backend::PdfBackend) implementation behind
//! `pdfium-render`, gated behind the `pdf` feature (§2.1, §6).
//!
//! Each call re-binds `Pdfium` and re-opens the document rather than
//! holding a parsed `PdfDocument` across calls — the same function-scoped
//! pattern used everywhere a document handle is needed once, avoiding a
//! self-referential struct. The document and its binding drop at the end
//! of each call, which is the crate's RAII release point (§6 resource
//! policy).

use std::io::Cursor;

use image::ImageFormat;
use pdfium_render::prelude::*;

use crate::backend::PdfBackend;
use crate::error::{AnalysisError, Result};
use crate::geometry::{BBox, Line, Rotation};
use crate::primitives::MIN_LINE_LENGTH_PT;
use crate::types::{PageData, TextSpan};

const DEFAULT_FONT_SIZE: f64 = 10.0;
/// Max horizontal gap (as a multiple of font size) still considered part of
/// the same text run when merging glyphs into spans.
const SPAN_GAP_FACTOR: f64 = 0.6;
const POINTS_PER_INCH: f64 = 72.0;

struct Glyph {
    ch: char,
    x0: f64,
    y0: f64,
    x1: f64,
    y1: f64,
    font_size: f64,
}

pub struct PdfiumBackend {
    bytes: Vec<u8>,
}

impl PdfiumBackend {
    /// Open a document from its raw bytes, validating eagerly that pdfium
    /// can parse it and that it has at least one page.
    pub fn new(bytes: Vec<u8>) -> Result<Self> {
        let backend = Self { bytes };
        backend.with_document(|doc| {
            if doc.pages().len() == 0 {
                return Err(AnalysisError::EmptyDocument);
            }
            Ok(())
        })?;
        Ok(backend)
    }

    fn with_document<T>(&self, f: impl FnOnce(&PdfDocument<'_>) -> Result<T>) -> Result<T> {
        let pdfium = Pdfium::default();
        let document = pdfium
            .load_pdf_from_byte_slice(&self.bytes, None)
            .map_err(|e| AnalysisError::InvalidDocument(e.to_string()))?;
        f(&document)
    }
}

impl PdfBackend for PdfiumBackend {
    fn page_count(&self) -> usize {
        self.with_document(|doc| Ok(doc.pages().len() as usize)).unwrap_or(0)
    }

    fn page_data(&self, page_index: usize) -> Result<PageData> {
        self.with_document(|doc| {
            let page = doc
                .pages()
                .get(page_index as u16)
                .map_err(|e| AnalysisError::Backend(e.to_string()))?;
            extract_page_data(&page, page_index)
        })
    }

    fn rasterize(&self, page_index: usize, clip: Option<BBox>, dpi: u32) -> Result<Option<Vec<u8>>> {
        self.with_document(|doc| {
            let page = doc
                .pages()
                .get(page_index as u16)
                .map_err(|e| AnalysisError::Backend(e.to_string()))?;
            render_page(&page, clip, dpi)
        })
    }
}

fn page_rotation(page: &PdfPage) -> Rotation {
    match page.rotation() {
        Ok(PdfPageRenderRotation::Degrees90) => Rotation::R90,
        Ok(PdfPageRenderRotation::Degrees180) => Rotation::R180,
        Ok(PdfPageRenderRotation::Degrees270) => Rotation::R270,
        _ => Rotation::R0,
    }
}

fn extract_page_data(page: &PdfPage, page_index: usize) -> Result<PageData> {
    let media_box = page.boundaries().media().map_err(|e| AnalysisError::Backend(e.to_string()))?;
    let media_width = media_box.width().value as f64;
    let media_height = media_box.height().value as f64;
    let rotation = page_rotation(page);

    let mut texts = extract_texts(page)?;
    texts.extend(extract_annotation_texts(page));

    let (lines, rects) = extract_vector_primitives(page);

    Ok(PageData {
        page_index,
        media_width,
        media_height,
        rotation,
        texts,
        lines,
        rects,
    })
}

fn extract_texts(page: &PdfPage) -> Result<Vec<TextSpan>> {
    let page_text = page.text().map_err(|e| AnalysisError::Backend(e.to_string()))?;
    let chars = page_text.chars();
    let mut glyphs = Vec::with_capacity(chars.len());
    for i in 0..chars.len() {
        let Ok(c) = chars.get(i) else { continue };
        let Some(ch) = c.unicode_char() else { continue };
        let Ok(bounds) = c.loose_bounds() else { continue };
        let raw_font_size = c.unscaled_font_size().value as f64;
        glyphs.push(Glyph {
            ch,
            x0: bounds.left().value as f64,
            y0: bounds.bottom().value as f64,
            x1: bounds.right().value as f64,
            y1: bounds.top().value as f64,
            font_size: if raw_font_size > 0.0 { raw_font_size } else { DEFAULT_FONT_SIZE },
        });
    }
    Ok(merge_glyphs_into_spans(glyphs))
}

/// Greedily merge same-row, closely-spaced glyphs into text spans, mirroring
/// how a text-dict groups characters into spans by font run.
fn merge_glyphs_into_spans(glyphs: Vec<Glyph>) -> Vec<TextSpan> {
    struct Run {
        text: String,
        x0: f64,
        y0: f64,
        x1: f64,
        y1: f64,
        font_size: f64,
    }

    let mut spans = Vec::new();
    let mut run: Option<Run> = None;

    for g in glyphs {
        let joins_run = run.as_ref().is_some_and(|r| {
            let gap = g.x0 - r.x1;
            let same_row = (g.y0 - r.y0).abs() < r.font_size.max(g.font_size) * 0.5;
            same_row && gap >= -1.0 && gap <= r.font_size.max(g.font_size) * SPAN_GAP_FACTOR
        });

        if joins_run {
            let r = run.as_mut().unwrap();
            r.text.push(g.ch);
            r.x1 = g.x1.max(r.x1);
            r.y0 = r.y0.min(g.y0);
            r.y1 = r.y1.max(g.y1);
        } else {
            if let Some(r) = run.take() {
                spans.push(r);
            }
            run = Some(Run {
                text: g.ch.to_string(),
                x0: g.x0,
                y0: g.y0,
                x1: g.x1,
                y1: g.y1,
                font_size: g.font_size,
            });
        }
    }
    if let Some(r) = run {
        spans.push(r);
    }

    spans
        .into_iter()
        .filter(|r| !r.text.trim().is_empty())
        .map(|r| TextSpan {
            text: r.text,
            bbox: BBox::new(r.x0, r.y0, r.x1, r.y1),
            font_name: String::new(),
            size: r.font_size,
        })
        .collect()
}

/// AutoCAD SHX fonts commonly round-trip through PDF as annotation
/// free-text rather than a selectable text-layer span; merge them in as
/// additional spans so component A sees one uniform text list (§4.A).
fn extract_annotation_texts(page: &PdfPage) -> Vec<TextSpan> {
    let mut out = Vec::new();
    for annotation in page.annotations().iter() {
        let Some(content) = annotation.contents() else { continue };
        let content = content.trim();
        if content.is_empty() {
            continue;
        }
        let Ok(bounds) = annotation.bounds() else { continue };
        out.push(TextSpan {
            text: content.to_string(),
            bbox: BBox::new(
                bounds.left().value as f64,
                bounds.bottom().value as f64,
                bounds.right().value as f64,
                bounds.top().value as f64,
            ),
            font_name: String::new(),
            size: 0.0,
        });
    }
    out
}

/// Walk every path object's segments, emitting one [`Line`] per
/// straight-line segment (curves are not structural drawing geometry in
/// these drawings) and collecting axis-aligned closed 4-segment paths as
/// rects. Segments shorter than [`MIN_LINE_LENGTH_PT`] are dropped (§4.A).
fn extract_vector_primitives(page: &PdfPage) -> (Vec<Line>, Vec<BBox>) {
    let mut lines = Vec::new();
    let mut rects = Vec::new();

    for object in page.objects().iter() {
        let Some(path) = object.as_path_object() else { continue };
        let stroke_width = path.stroke_width().map(|w| w.value as f64).unwrap_or(1.0);

        let mut points = Vec::new();
        for segment in path.segments().iter() {
            let p = segment.points();
            points.push((p.0.value as f64, p.1.value as f64));
        }
        if points.len() < 2 {
            continue;
        }

        for pair in points.windows(2) {
            let (x0, y0) = pair[0];
            let (x1, y1) = pair[1];
            let line = Line::new(crate::geometry::Point::new(x0, y0), crate::geometry::Point::new(x1, y1), stroke_width);
            if line.length() >= MIN_LINE_LENGTH_PT {
                lines.push(line);
            }
        }

        if points.len() == 5 && points.first() == points.last() {
            let xs: Vec<f64> = points.iter().map(|p| p.0).collect();
            let ys: Vec<f64> = points.iter().map(|p| p.1).collect();
            let axis_aligned = xs.iter().all(|&x| (x - xs[0]).abs() < 0.5 || (x - xs[2]).abs() < 0.5);
            if axis_aligned {
                rects.push(BBox::new(
                    xs.iter().cloned().fold(f64::INFINITY, f64::min),
                    ys.iter().cloned().fold(f64::INFINITY, f64::min),
                    xs.iter().cloned().fold(f64::NEG_INFINITY, f64::max),
                    ys.iter().cloned().fold(f64::NEG_INFINITY, f64::max),
                ));
            }
        }
    }

    (lines, rects)
}

/// Rasterise a page at `dpi`, optionally cropping to `clip` (mediabox
/// points). Returns `Ok(None)` only when pdfium cannot produce a bitmap at
/// all; a missing `clip` renders the whole page.
fn render_page(page: &PdfPage, clip: Option<BBox>, dpi: u32) -> Result<Option<Vec<u8>>> {
    let scale = dpi as f64 / POINTS_PER_INCH;
    let media_box = page.boundaries().media().map_err(|e| AnalysisError::Backend(e.to_string()))?;
    let target_width = (media_box.width().value as f64 * scale).round().max(1.0) as u16;
    let target_height = (media_box.height().value as f64 * scale).round().max(1.0) as u16;

    let config = PdfRenderConfig::new().set_target_size(target_width, target_height);
    let Ok(bitmap) = page.render_with_config(&config) else {
        return Ok(None);
    };
    let image = bitmap.as_image();

    let cropped = match clip {
        Some(bbox) => {
            let page_height = media_box.height().value as f64;
            let x = (bbox.x0 * scale).max(0.0) as u32;
            let y = ((page_height - bbox.y1) * scale).max(0.0) as u32;
            let w = ((bbox.width()) * scale).max(1.0) as u32;
            let h = ((bbox.height()) * scale).max(1.0) as u32;
            image.crop_imm(x, y, w.min(image.width().saturating_sub(x).max(1)), h.min(image.height().saturating_sub(y).max(1)))
        }
        None => image,
    };

    let mut bytes: Vec<u8> = Vec::new();
    cropped
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .map_err(|e| AnalysisError::Backend(format!("PNG encode failed: {e}")))?;
    Ok(Some(bytes))
}
