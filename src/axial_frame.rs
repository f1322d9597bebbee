//! Component J: 軸組図 / 断面図 (axial frame / section elevation) member
//! detection.
//!
//! These drawings lay several elevation sub-views (one per governing grid
//! line — Y1通り, Y2通り, X1通り, ...) side by side on one page. Each
//! sub-view's drawing region is isolated from its title position and the
//! pair of grid labels bounding the building's other axis, echoing the
//! column-splitting done for view segmentation in §4.B.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::catalog::SteelCatalog;
use crate::config::AnalysisConfig;
use crate::geometry::{BBox, Line, Point};
use crate::leader;
use crate::types::{LeaderTraceResult, PageData, TextSpan};
use crate::views::kanji_pattern;

static AXIAL_FRAME_TITLE: Lazy<Regex> = Lazy::new(|| kanji_pattern("軸組図"));
static SECTION_TITLE: Lazy<Regex> = Lazy::new(|| kanji_pattern("断面図"));
static SUBVIEW_TITLE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^.{1,6}通\s*り$").unwrap());

/// One elevation sub-view's leader trace, labelled by its governing grid
/// line (e.g. "Y1通り").
#[derive(Debug, Clone)]
pub struct AxialSubview {
    pub label: String,
    pub trace: LeaderTraceResult,
    /// The page this sub-view was found on.
    pub page_index: usize,
    /// The sub-view's isolated column region, in the page's visual frame.
    pub region_bbox: BBox,
}

fn find_axial_page(pages: &[PageData]) -> Option<usize> {
    pages
        .iter()
        .find(|p| p.texts.iter().any(|t| AXIAL_FRAME_TITLE.is_match(&t.text) || SECTION_TITLE.is_match(&t.text)))
        .map(|p| p.page_index)
}

fn visual_texts_lines(page: &PageData) -> (Vec<TextSpan>, Vec<Line>) {
    let transform = page.transform();
    let texts = page
        .texts
        .iter()
        .map(|t| TextSpan {
            text: t.text.clone(),
            bbox: BBox::new(
                transform.to_visual(Point::new(t.bbox.x0, t.bbox.y0)).x,
                transform.to_visual(Point::new(t.bbox.x0, t.bbox.y0)).y,
                transform.to_visual(Point::new(t.bbox.x1, t.bbox.y1)).x,
                transform.to_visual(Point::new(t.bbox.x1, t.bbox.y1)).y,
            ),
            font_name: t.font_name.clone(),
            size: t.size,
        })
        .collect();
    let lines = page
        .lines
        .iter()
        .map(|l| Line::new(transform.to_visual(l.p1), transform.to_visual(l.p2), l.stroke_width))
        .collect();
    (texts, lines)
}

/// Bound a sub-view by the grid labels present on the page (if any) and the
/// title row's vertical extent, per §4.J's generalised bbox rule.
fn overall_drawing_bbox(texts: &[TextSpan], config: &AnalysisConfig) -> Option<BBox> {
    let find = |label: &str| texts.iter().find(|t| t.text.trim() == label).map(|t| t.center());
    let x1 = find("X1");
    let x_end = find("Xn+1").or_else(|| find("XN+1"));
    let y1 = find("Y1");
    let y2 = find("Y2");

    let xs: Vec<f64> = [x1, x_end].into_iter().flatten().map(|p| p.x).collect();
    let ys: Vec<f64> = [y1, y2].into_iter().flatten().map(|p| p.y).collect();
    if xs.is_empty() && ys.is_empty() {
        return None;
    }
    let points: Vec<Point> = [x1, x_end, y1, y2].into_iter().flatten().collect();
    let bbox = BBox::bounding(&points)?;
    Some(bbox.inflate(config.drawing_bbox_margin_pt))
}

fn subview_titles(texts: &[TextSpan]) -> Vec<(String, Point)> {
    let mut out: Vec<(String, Point)> = texts
        .iter()
        .filter(|t| SUBVIEW_TITLE.is_match(t.text.trim()))
        .map(|t| (t.text.trim().to_string(), t.center()))
        .collect();
    out.sort_by(|a, b| a.1.x.partial_cmp(&b.1.x).unwrap());
    out
}

/// Run component J over every elevation sub-view found on the axial-frame
/// / section page, if one exists.
pub fn detect_axial_frame_members(
    pages: &[PageData],
    span: Option<f64>,
    length: Option<f64>,
    catalog: Option<&dyn SteelCatalog>,
    config: &AnalysisConfig,
) -> Vec<AxialSubview> {
    let Some(page_index) = find_axial_page(pages) else {
        return Vec::new();
    };
    let Some(page) = pages.iter().find(|p| p.page_index == page_index) else {
        return Vec::new();
    };
    let (texts, lines) = visual_texts_lines(page);
    let visual_width = page.transform().visual_width();
    let visual_height = page.transform().visual_height();

    let titles = subview_titles(&texts);
    if titles.is_empty() {
        return Vec::new();
    }
    let overall = overall_drawing_bbox(&texts, config);

    let mut results = Vec::new();
    for (col, (label, center)) in titles.iter().enumerate() {
        let left = if col == 0 { 0.0 } else { (titles[col - 1].1.x + center.x) / 2.0 };
        let right = if col + 1 < titles.len() { (center.x + titles[col + 1].1.x) / 2.0 } else { visual_width };
        let top = (center.y - config.drawing_bbox_margin_pt).max(0.0);
        let bottom = visual_height;
        let mut region = BBox::new(left, top, right, bottom + config.drawing_bbox_margin_pt);
        if let Some(bound) = overall {
            region.x0 = region.x0.max(bound.x0);
            region.x1 = region.x1.min(bound.x1);
            region.y1 = region.y1.min(bound.y1);
        }

        let region_texts: Vec<TextSpan> = texts.iter().filter(|t| region.contains_point(&t.center())).cloned().collect();
        let region_lines: Vec<Line> = lines.iter().filter(|l| region.contains_point(&l.p1) || region.contains_point(&l.p2)).cloned().collect();

        let members = leader::detect_members(&region_texts, &region_lines, span, length, catalog, config);
        results.push(AxialSubview {
            label: label.clone(),
            trace: LeaderTraceResult {
                source_label: label.clone(),
                members,
            },
            page_index,
            region_bbox: region,
        });
    }
    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Rotation;

    fn text(s: &str, x: f64, y: f64) -> TextSpan {
        TextSpan {
            text: s.into(),
            bbox: BBox::new(x - 2.0, y - 2.0, x + 2.0, y + 2.0),
            font_name: "Arial".into(),
            size: 8.0,
        }
    }

    fn blank_page(index: usize) -> PageData {
        PageData {
            page_index: index,
            media_width: 842.0,
            media_height: 595.0,
            rotation: Rotation::R0,
            texts: vec![],
            lines: vec![],
            rects: vec![],
        }
    }

    #[test]
    fn no_axial_page_yields_no_subviews() {
        let pages = vec![blank_page(0)];
        let config = AnalysisConfig::default();
        assert!(detect_axial_frame_members(&pages, None, None, None, &config).is_empty());
    }

    #[test]
    fn two_subview_titles_yield_two_columns() {
        let config = AnalysisConfig::default();
        let mut page = blank_page(0);
        page.texts.push(text("軸組図", 400.0, 30.0));
        page.texts.push(text("Y1通り", 150.0, 80.0));
        page.texts.push(text("Y2通り", 550.0, 80.0));
        let pages = vec![page];
        let results = detect_axial_frame_members(&pages, None, None, None, &config);
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].label, "Y1通り");
        assert_eq!(results[1].label, "Y2通り");
    }

    #[test]
    fn subview_title_pattern_matches_expected_labels() {
        assert!(SUBVIEW_TITLE.is_match("Y1通り"));
        assert!(SUBVIEW_TITLE.is_match("X2~Xn通り"));
        assert!(!SUBVIEW_TITLE.is_match("軸組図"));
    }
}
