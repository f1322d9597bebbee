//! Component B: view segmentation.
//!
//! Detects the Japanese view titles on a page, lays them out into a
//! row/column grid in the visual (upright) frame, clips spec-table panels
//! out of each region, and assigns every text span and line segment on the
//! page to the view whose region contains it.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::config::AnalysisConfig;
use crate::geometry::{BBox, Line, PageTransform, Point};
use crate::primitives::{lines_in_bbox, texts_in_bbox};
use crate::types::{PageData, TextSpan, View, ViewType};

pub(crate) fn kanji_pattern(kanji: &str) -> Regex {
    let joined = kanji
        .chars()
        .map(|c| regex::escape(&c.to_string()))
        .collect::<Vec<_>>()
        .join(r"[\s　]*");
    Regex::new(&joined).expect("kanji pattern is always valid")
}

static VIEW_PATTERNS: Lazy<Vec<(ViewType, Regex)>> = Lazy::new(|| {
    vec![
        (ViewType::RoofPlan, kanji_pattern("屋根伏図")),
        (ViewType::FloorPlan, kanji_pattern("平面図")),
        (ViewType::Elevation, kanji_pattern("立面図")),
        (ViewType::Section, kanji_pattern("断面図")),
    ]
});

static SCALE_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?:S\s*=\s*)?1\s*/\s*(\d+)").unwrap());

struct TitleCandidate {
    view_type: ViewType,
    span_index: usize,
    scale: Option<String>,
}

fn matched_view_types(text: &str) -> Vec<ViewType> {
    VIEW_PATTERNS
        .iter()
        .filter(|(_, re)| re.is_match(text))
        .map(|(vt, _)| *vt)
        .collect()
}

fn find_scale_near(texts: &[TextSpan], center: Point, box_size: (f64, f64)) -> Option<String> {
    let half_w = box_size.0 / 2.0;
    let half_h = box_size.1 / 2.0;
    let region = BBox::new(center.x - half_w, center.y - half_h, center.x + half_w, center.y + half_h);
    texts_in_bbox(texts, &region)
        .iter()
        .find_map(|t| SCALE_PATTERN.captures(&t.text).map(|c| format!("1/{}", &c[1])))
}

fn find_title_candidates(texts: &[TextSpan], config: &AnalysisConfig) -> Vec<TitleCandidate> {
    let mut out = Vec::new();
    for (idx, span) in texts.iter().enumerate() {
        let matches = matched_view_types(&span.text);
        if matches.is_empty() {
            continue;
        }
        let mut score: i32 = 0;
        let inline_scale = SCALE_PATTERN.captures(&span.text).map(|c| format!("1/{}", &c[1]));
        let nearby_scale = inline_scale
            .clone()
            .or_else(|| find_scale_near(texts, span.center(), config.scale_search_box));
        if nearby_scale.is_some() {
            score += 10;
        }
        if span.text.chars().count() < 30 {
            score += 5;
        }
        if matches.len() > 1 {
            // Same span hit more than one title pattern: almost always the
            // drawing-sheet title block, not a view title.
            score -= 20;
        }
        if score > 0 {
            out.push(TitleCandidate {
                view_type: matches[0],
                span_index: idx,
                scale: nearby_scale,
            });
        }
    }
    out
}

struct Row {
    candidates: Vec<(usize, Point)>,
}

fn cluster_rows(mut ordered: Vec<(usize, Point)>, threshold: f64) -> Vec<Row> {
    ordered.sort_by(|a, b| a.1.y.partial_cmp(&b.1.y).unwrap());
    let mut rows: Vec<Row> = Vec::new();
    for item in ordered {
        match rows.last_mut() {
            Some(row) if (item.1.y - row.candidates.last().unwrap().1.y).abs() <= threshold => {
                row.candidates.push(item);
            }
            _ => rows.push(Row { candidates: vec![item] }),
        }
    }
    for row in &mut rows {
        row.candidates.sort_by(|a, b| a.1.x.partial_cmp(&b.1.x).unwrap());
    }
    rows
}

fn detect_panels(lines_visual: &[Line], visual_width: f64, config: &AnalysisConfig) -> Vec<BBox> {
    let threshold_x = visual_width * 0.6;
    let mut candidates: Vec<&Line> = lines_visual
        .iter()
        .filter(|l| l.length() >= config.panel_line_min_length_pt && l.is_horizontal(5.0))
        .filter(|l| l.p1.x.min(l.p2.x) >= threshold_x)
        .collect();
    candidates.sort_by(|a, b| a.p1.x.min(a.p2.x).partial_cmp(&b.p1.x.min(b.p2.x)).unwrap());

    let mut panels = Vec::new();
    let mut used = vec![false; candidates.len()];
    for i in 0..candidates.len() {
        if used[i] {
            continue;
        }
        let x_start = candidates[i].p1.x.min(candidates[i].p2.x);
        let mut cluster = vec![candidates[i]];
        used[i] = true;
        for j in (i + 1)..candidates.len() {
            if used[j] {
                continue;
            }
            let xj = candidates[j].p1.x.min(candidates[j].p2.x);
            if (xj - x_start).abs() <= config.panel_x_extent_tolerance_pt {
                cluster.push(candidates[j]);
                used[j] = true;
            }
        }
        if cluster.len() >= config.panel_min_lines {
            let points: Vec<Point> = cluster.iter().flat_map(|l| [l.p1, l.p2]).collect();
            if let Some(bbox) = BBox::bounding(&points) {
                panels.push(bbox);
            }
        }
    }
    panels
}

fn clip_against_panels(region: BBox, panels: &[BBox], title_x: f64, margin: f64) -> BBox {
    let mut clipped = region;
    for panel in panels {
        if panel.x0 < clipped.x1 && panel.y1 >= clipped.y0 && panel.y0 <= clipped.y1 {
            let candidate = panel.x0 - margin;
            if candidate < clipped.x1 {
                clipped.x1 = candidate.max(title_x);
            }
        }
    }
    clipped
}

fn find_subtitle(texts: &[TextSpan], title_idx: usize, center: Point, box_size: (f64, f64)) -> Option<String> {
    let half_w = box_size.0 / 2.0;
    let half_h = box_size.1 / 2.0;
    let region = BBox::new(center.x - half_w, center.y - half_h, center.x + half_w, center.y + half_h);
    texts
        .iter()
        .enumerate()
        .filter(|(i, t)| *i != title_idx && t.text.contains('通') && t.text.contains('り'))
        .find(|(_, t)| region.contains_point(&t.center()))
        .map(|(_, t)| t.text.clone())
}

/// Segment a page's primitives into titled views, per §4.B. Returns a
/// single `ViewType::Unknown` view covering the whole page when no title
/// candidates survive scoring (§7 "component no-data").
pub fn segment_views(page: &PageData, config: &AnalysisConfig) -> Vec<View> {
    let transform = page.transform();
    let candidates = find_title_candidates(&page.texts, config);
    if candidates.is_empty() {
        return vec![unknown_view(page)];
    }

    let visual_width = transform.visual_width();
    let visual_height = transform.visual_height();
    let ordered: Vec<(usize, Point)> = candidates
        .iter()
        .map(|c| (c.span_index, transform.to_visual(page.texts[c.span_index].center())))
        .collect();
    let rows = cluster_rows(ordered, config.title_row_cluster_pt);

    let lines_visual: Vec<Line> = page
        .lines
        .iter()
        .map(|l| Line::new(transform.to_visual(l.p1), transform.to_visual(l.p2), l.stroke_width))
        .collect();
    let panels = detect_panels(&lines_visual, visual_width, config);

    let mut views = Vec::new();
    let mut row_top = 0.0;
    for row in &rows {
        let row_bottom_raw = row
            .candidates
            .iter()
            .map(|(_, p)| p.y)
            .fold(f64::MIN, f64::max)
            + config.title_row_margin_pt;
        let row_bottom = row_bottom_raw.min(visual_height);
        let k = row.candidates.len();
        let xs: Vec<f64> = row.candidates.iter().map(|(_, p)| p.x).collect();
        for (col, &(span_idx, title_visual)) in row.candidates.iter().enumerate() {
            let left = if col == 0 { 0.0 } else { (xs[col - 1] + xs[col]) / 2.0 };
            let right = if col + 1 < k { (xs[col] + xs[col + 1]) / 2.0 } else { visual_width };
            let visual_region = BBox::new(left, row_top, right, row_bottom);
            let clipped_visual = clip_against_panels(visual_region, &panels, title_visual.x, config.panel_clip_margin_pt);
            let region = transform.visual_rect_to_mediabox(clipped_visual);

            let candidate = candidates.iter().find(|c| c.span_index == span_idx).unwrap();
            let title_span = &page.texts[span_idx];
            let subtitle = if candidate.view_type == ViewType::Elevation {
                find_subtitle(&page.texts, span_idx, title_visual, config.subtitle_search_box)
            } else {
                None
            };

            let texts = texts_in_bbox(&page.texts, &region).into_iter().cloned().collect();
            let lines = lines_in_bbox(&page.lines, &region).into_iter().cloned().collect();

            views.push(View {
                view_type: candidate.view_type,
                title_text: title_span.text.clone(),
                title_bbox: title_span.bbox,
                region,
                scale: candidate.scale.clone(),
                subtitle,
                texts,
                lines,
            });
        }
        row_top = row_bottom;
    }
    views
}

fn unknown_view(page: &PageData) -> View {
    let region = BBox::new(0.0, 0.0, page.media_width, page.media_height);
    View {
        view_type: ViewType::Unknown,
        title_text: String::new(),
        title_bbox: region,
        region,
        scale: None,
        subtitle: None,
        texts: page.texts.clone(),
        lines: page.lines.clone(),
    }
}

/// Public for components (C, J) that need the one shared mediabox↔visual
/// transform for a page, per the §9 design note against ad-hoc transforms.
pub fn page_transform(page: &PageData) -> PageTransform {
    page.transform()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Rotation;

    fn text(s: &str, x: f64, y: f64) -> TextSpan {
        TextSpan {
            text: s.into(),
            bbox: BBox::new(x - 5.0, y - 5.0, x + 5.0, y + 5.0),
            font_name: "Arial".into(),
            size: 10.0,
        }
    }

    #[test]
    fn single_floor_plan_title_yields_one_view() {
        let page = PageData {
            page_index: 0,
            media_width: 842.0,
            media_height: 595.0,
            rotation: Rotation::R0,
            texts: vec![text("平面図 S=1/150", 400.0, 100.0)],
            lines: vec![],
            rects: vec![],
        };
        let config = AnalysisConfig::default();
        let views = segment_views(&page, &config);
        assert_eq!(views.len(), 1);
        assert_eq!(views[0].view_type, ViewType::FloorPlan);
        assert_eq!(views[0].scale.as_deref(), Some("1/150"));
    }

    #[test]
    fn no_title_yields_unknown_view_covering_page() {
        let page = PageData {
            page_index: 0,
            media_width: 842.0,
            media_height: 595.0,
            rotation: Rotation::R0,
            texts: vec![text("some noise", 10.0, 10.0)],
            lines: vec![],
            rects: vec![],
        };
        let config = AnalysisConfig::default();
        let views = segment_views(&page, &config);
        assert_eq!(views.len(), 1);
        assert_eq!(views[0].view_type, ViewType::Unknown);
        assert_eq!(views[0].region, BBox::new(0.0, 0.0, 842.0, 595.0));
    }

    #[test]
    fn two_titles_form_two_columns_in_one_row() {
        let page = PageData {
            page_index: 0,
            media_width: 842.0,
            media_height: 595.0,
            rotation: Rotation::R0,
            texts: vec![text("平面図", 200.0, 100.0), text("立面図(Y1通り)", 600.0, 100.0)],
            lines: vec![],
            rects: vec![],
        };
        let config = AnalysisConfig::default();
        let views = segment_views(&page, &config);
        assert_eq!(views.len(), 2);
        // Left-to-right by visual X.
        assert_eq!(views[0].view_type, ViewType::FloorPlan);
        assert_eq!(views[1].view_type, ViewType::Elevation);
        assert!(views[0].region.x1 <= views[1].region.x0 + 1e-6);
    }
}
