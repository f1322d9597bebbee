//! Component C: grid-label extraction and grid-line association.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::config::AnalysisConfig;
use crate::geometry::{Line, PageTransform};
use crate::types::{GridAxis, GridLabel, GridSystem, LabelIndex, TextSpan, View, ViewType};

static GRID_NUMERIC_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)^([XYｘｙ])[\s　]*(\d{1,2})$").unwrap());
static GRID_SYMBOLIC_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^([XYｘｙ])[\s　]*n[\s　]*(?:\+[\s　]*1)?$").unwrap());

fn normalize_axis(letter: &str) -> GridAxis {
    match letter.to_uppercase().replace(['ｘ', 'Ｘ'], "X").replace(['ｙ', 'Ｙ'], "Y").as_str() {
        "X" => GridAxis::X,
        _ => GridAxis::Y,
    }
}

/// Match a text span's trimmed content against the grid-label patterns.
/// Returns `(axis, label, index)` when it's a label, numeric or symbolic.
fn match_grid_label(text: &str) -> Option<(GridAxis, String, LabelIndex)> {
    let trimmed = text.trim();
    if let Some(c) = GRID_NUMERIC_PATTERN.captures(trimmed) {
        let axis = normalize_axis(&c[1]);
        let index: i64 = c[2].parse().ok()?;
        let label = format!("{}{}", if axis == GridAxis::X { "X" } else { "Y" }, index);
        return Some((axis, label, LabelIndex::Numeric(index)));
    }
    if let Some(c) = GRID_SYMBOLIC_PATTERN.captures(trimmed) {
        let axis = normalize_axis(&c[1]);
        let label = format!("{}{}", if axis == GridAxis::X { "X" } else { "Y" }, &trimmed[1..].trim());
        return Some((axis, label, LabelIndex::Symbolic));
    }
    None
}

/// Find the long line this label should associate with, per §4.C: X-labels
/// seek vertical lines, Y-labels seek horizontal lines, swapped under a
/// 90/270 page rotation because the mediabox axes are transposed relative
/// to the visual drawing.
fn associate_line<'a>(
    axis: GridAxis,
    label_text: &TextSpan,
    lines: &'a [Line],
    rotation_swaps_axes: bool,
    config: &AnalysisConfig,
) -> Option<&'a Line> {
    let want_vertical = match axis {
        GridAxis::X => !rotation_swaps_axes,
        GridAxis::Y => rotation_swaps_axes,
    };
    let center = label_text.center();
    lines
        .iter()
        .filter(|l| l.length() >= config.grid_line_min_length_pt)
        .filter(|l| {
            if want_vertical {
                l.is_vertical(config.grid_angle_tolerance_deg)
            } else {
                l.is_horizontal(config.grid_angle_tolerance_deg)
            }
        })
        .map(|l| (l, l.point_distance(&center)))
        .filter(|(_, d)| *d <= config.grid_max_distance_pt)
        .min_by(|a, b| a.1.partial_cmp(&b.1).unwrap())
        .map(|(l, _)| l)
}

/// The label's scalar position along its own axis: the matched line's
/// midpoint along that axis if associated, else the text centre along that
/// axis. Axis selection (which coordinate of the point to read) is swapped
/// identically to the association rule under a 90/270 rotation.
fn label_position(axis: GridAxis, text_center: crate::geometry::Point, line: Option<&Line>, rotation_swaps_axes: bool) -> f64 {
    let use_x = match axis {
        GridAxis::X => !rotation_swaps_axes,
        GridAxis::Y => rotation_swaps_axes,
    };
    let point = line.map(|l| l.midpoint()).unwrap_or(text_center);
    if use_x {
        point.x
    } else {
        point.y
    }
}

/// Extract grid labels from a single view.
pub fn extract_view_grid(view: &View, rotation_swaps_axes: bool, config: &AnalysisConfig) -> (Vec<GridLabel>, Vec<GridLabel>) {
    let mut x_labels = Vec::new();
    let mut y_labels = Vec::new();
    for span in &view.texts {
        let Some((axis, label, index)) = match_grid_label(&span.text) else {
            continue;
        };
        let line = associate_line(axis, span, &view.lines, rotation_swaps_axes, config).cloned();
        let position = label_position(axis, span.center(), line.as_ref(), rotation_swaps_axes);
        let grid_label = GridLabel {
            axis,
            label,
            index,
            position,
            source_text: span.clone(),
            line,
        };
        match axis {
            GridAxis::X => x_labels.push(grid_label),
            GridAxis::Y => y_labels.push(grid_label),
        }
    }
    (x_labels, y_labels)
}

fn dedup_by_label(labels: Vec<GridLabel>) -> Vec<GridLabel> {
    let mut seen = std::collections::HashSet::new();
    let mut out = Vec::new();
    for l in labels {
        if seen.insert(l.label.clone()) {
            out.push(l);
        }
    }
    out
}

/// Extract the building's grid system, per §4.C: prefer FLOOR_PLAN, then
/// ELEVATION, else fall back to any view; merge deduplicated labels across
/// the chosen view(s), first occurrence of a label name wins.
pub fn extract_grid_system(views: &[View], page_transform: &PageTransform, config: &AnalysisConfig) -> Option<GridSystem> {
    let rotation_swaps_axes = page_transform.rotation().swaps_axes();

    let priority: Vec<&View> = {
        let floor: Vec<&View> = views.iter().filter(|v| v.view_type == ViewType::FloorPlan).collect();
        if !floor.is_empty() {
            floor
        } else {
            let elev: Vec<&View> = views.iter().filter(|v| v.view_type == ViewType::Elevation).collect();
            if !elev.is_empty() {
                elev
            } else {
                views.iter().collect()
            }
        }
    };

    let mut all_x = Vec::new();
    let mut all_y = Vec::new();
    let mut source_view = None;
    for view in &priority {
        let (x, y) = extract_view_grid(view, rotation_swaps_axes, config);
        if !x.is_empty() || !y.is_empty() {
            source_view.get_or_insert(view.view_type);
        }
        all_x.extend(x);
        all_y.extend(y);
    }

    let x_labels = dedup_by_label(all_x);
    let y_labels = dedup_by_label(all_y);
    if x_labels.is_empty() && y_labels.is_empty() {
        return None;
    }
    Some(GridSystem {
        x_labels,
        y_labels,
        source_view,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{BBox, Point};

    fn span(text: &str, x: f64, y: f64) -> TextSpan {
        TextSpan {
            text: text.into(),
            bbox: BBox::new(x - 2.0, y - 2.0, x + 2.0, y + 2.0),
            font_name: "Arial".into(),
            size: 8.0,
        }
    }

    #[test]
    fn matches_numeric_and_symbolic_labels() {
        assert_eq!(
            match_grid_label("X7"),
            Some((GridAxis::X, "X7".into(), LabelIndex::Numeric(7)))
        );
        assert!(matches!(match_grid_label("Xn+1"), Some((GridAxis::X, _, LabelIndex::Symbolic))));
        assert_eq!(match_grid_label("nonsense"), None);
    }

    #[test]
    fn associates_vertical_line_to_x_label_without_rotation() {
        let config = AnalysisConfig::default();
        let label_span = span("X1", 120.0, 50.0);
        let lines = vec![Line::new(Point::new(120.0, 0.0), Point::new(120.0, 500.0), 0.3)];
        let line = associate_line(GridAxis::X, &label_span, &lines, false, &config);
        assert!(line.is_some());
    }

    #[test]
    fn rejects_line_beyond_max_distance() {
        let config = AnalysisConfig::default();
        let label_span = span("X1", 400.0, 50.0);
        let lines = vec![Line::new(Point::new(120.0, 0.0), Point::new(120.0, 500.0), 0.3)];
        assert!(associate_line(GridAxis::X, &label_span, &lines, false, &config).is_none());
    }

    #[test]
    fn dedup_keeps_first_occurrence() {
        let a = GridLabel {
            axis: GridAxis::X,
            label: "X1".into(),
            index: LabelIndex::Numeric(1),
            position: 10.0,
            source_text: span("X1", 10.0, 10.0),
            line: None,
        };
        let mut b = a.clone();
        b.position = 999.0;
        let out = dedup_by_label(vec![a, b]);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].position, 10.0);
    }
}
