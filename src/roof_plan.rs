//! Component J: 小屋伏図 (roof-framing plan) member detection.
//!
//! Locates the plan page, isolates its drawing region from the four corner
//! grid labels, and hands the region's primitives to [`crate::leader`].

use once_cell::sync::Lazy;
use regex::Regex;

use crate::catalog::SteelCatalog;
use crate::config::AnalysisConfig;
use crate::geometry::{BBox, Line, Point};
use crate::leader;
use crate::types::{LeaderTraceResult, PageData, TextSpan};
use crate::views::kanji_pattern;

static ROOF_PLAN_TITLE: Lazy<Regex> = Lazy::new(|| kanji_pattern("小屋伏図"));
static SCALE_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"S\s*=\s*1\s*/\s*(\d+)").unwrap());

/// Result of tracing the roof-framing plan, carrying the page it was found
/// on and any co-located scale string alongside the traced members.
#[derive(Debug, Clone)]
pub struct RoofPlanResult {
    pub page_index: usize,
    pub scale: Option<String>,
    pub trace: LeaderTraceResult,
    /// The drawing region isolated from the four corner grid labels, in the
    /// page's visual frame; `None` when no corner labels were found and the
    /// whole page was used instead.
    pub region_bbox: Option<BBox>,
}

fn find_roof_plan_page(pages: &[PageData]) -> Option<usize> {
    if pages.len() < 2 {
        return None;
    }
    pages
        .iter()
        .skip(1)
        .find(|p| p.texts.iter().any(|t| ROOF_PLAN_TITLE.is_match(&t.text)))
        .map(|p| p.page_index)
}

fn find_scale(texts: &[TextSpan]) -> Option<String> {
    let keyword_hit = texts
        .iter()
        .find(|t| (t.text.contains('小') && t.text.contains('屋')) || t.text.contains("伏図"))
        .and_then(|t| SCALE_PATTERN.captures(&t.text))
        .map(|c| format!("1/{}", &c[1]));
    keyword_hit.or_else(|| texts.iter().find_map(|t| SCALE_PATTERN.captures(&t.text).map(|c| format!("1/{}", &c[1]))))
}

/// Locate the plan's drawing region from its four corner grid labels, in
/// the visual frame, per §4.J.
fn find_drawing_bbox(texts_visual: &[(Point, &str)], config: &AnalysisConfig) -> Option<BBox> {
    let find = |label: &str| texts_visual.iter().find(|(_, t)| *t == label).map(|(p, _)| *p);
    let x1 = find("X1")?;
    let x_end = find("Xn+1").or_else(|| find("XN+1"))?;
    let y1 = find("Y1")?;
    let y2 = find("Y2")?;

    let x_min = x1.x.min(x_end.x);
    let x_max = x1.x.max(x_end.x);
    let y_min = y2.y.min(y1.y);
    let y_max = y2.y.max(y1.y);

    Some(BBox::new(
        x_min - config.drawing_bbox_margin_pt,
        y_min - config.drawing_bbox_margin_pt,
        x_max + config.drawing_bbox_far_margin_pt,
        y_max + config.drawing_bbox_margin_pt,
    ))
}

/// Run component J over the roof-framing plan page, if one is found.
pub fn detect_roof_plan_members(
    pages: &[PageData],
    span: Option<f64>,
    length: Option<f64>,
    catalog: Option<&dyn SteelCatalog>,
    config: &AnalysisConfig,
) -> Option<RoofPlanResult> {
    let page_index = find_roof_plan_page(pages)?;
    let page = pages.iter().find(|p| p.page_index == page_index)?;
    let transform = page.transform();

    let texts_visual: Vec<TextSpan> = page
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
    let lines_visual: Vec<Line> = page
        .lines
        .iter()
        .map(|l| Line::new(transform.to_visual(l.p1), transform.to_visual(l.p2), l.stroke_width))
        .collect();

    let scale = find_scale(&texts_visual);

    let label_positions: Vec<(Point, &str)> = texts_visual.iter().map(|t| (t.center(), t.text.trim())).collect();
    let bbox = find_drawing_bbox(&label_positions, config);

    let (region_texts, region_lines): (Vec<TextSpan>, Vec<Line>) = match bbox {
        Some(b) => (
            texts_visual.into_iter().filter(|t| b.contains_point(&t.center())).collect(),
            lines_visual
                .into_iter()
                .filter(|l| b.contains_point(&l.p1) || b.contains_point(&l.p2))
                .collect(),
        ),
        None => (texts_visual, lines_visual),
    };

    let members = leader::detect_members(&region_texts, &region_lines, span, length, catalog, config);

    Some(RoofPlanResult {
        page_index,
        scale,
        trace: LeaderTraceResult {
            source_label: "小屋伏図".to_string(),
            members,
        },
        region_bbox: bbox,
    })
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
    fn single_page_pdf_yields_no_roof_plan() {
        let pages = vec![blank_page(0)];
        assert_eq!(find_roof_plan_page(&pages), None);
    }

    #[test]
    fn finds_plan_page_among_later_pages() {
        let mut p1 = blank_page(1);
        p1.texts.push(text("小屋伏図 S=1/150", 400.0, 50.0));
        let pages = vec![blank_page(0), p1];
        assert_eq!(find_roof_plan_page(&pages), Some(1));
    }

    #[test]
    fn scale_prefers_title_colocated_match() {
        let texts = vec![text("小屋伏図 S=1/150", 400.0, 50.0), text("S=1/50", 100.0, 500.0)];
        assert_eq!(find_scale(&texts), Some("1/150".into()));
    }

    #[test]
    fn drawing_bbox_spans_the_four_grid_labels() {
        let config = AnalysisConfig::default();
        let labels = vec![(Point::new(50.0, 100.0), "X1"), (Point::new(450.0, 100.0), "Xn+1"), (Point::new(50.0, 400.0), "Y1"), (Point::new(50.0, 120.0), "Y2")];
        let bbox = find_drawing_bbox(&labels, &config).unwrap();
        assert!((bbox.x0 - (50.0 - config.drawing_bbox_margin_pt)).abs() < 1e-9);
        assert!((bbox.x1 - (450.0 + config.drawing_bbox_far_margin_pt)).abs() < 1e-9);
    }

    #[test]
    fn end_to_end_detects_one_member() {
        let config = AnalysisConfig::default();
        let mut page = blank_page(1);
        page.texts.push(text("小屋伏図 S=1/150", 400.0, 50.0));
        page.texts.push(text("X1", 50.0, 100.0));
        page.texts.push(text("Xn+1", 450.0, 100.0));
        page.texts.push(text("Y1", 50.0, 400.0));
        page.texts.push(text("Y2", 50.0, 120.0));
        page.texts.push(text("1", 200.0, 200.0));
        page.lines.push(Line::new(Point::new(200.0, 200.0), Point::new(210.0, 200.0), config.thin_stroke_width));
        let pages = vec![blank_page(0), page];
        let result = detect_roof_plan_members(&pages, Some(15000.0), None, None, &config);
        assert!(result.is_some());
    }
}
