//! Component G: cross-view matching — the hardest single component.
//!
//! Implemented as a cascade of small strategy functions, each returning
//! `Option<(value, source_label, raw_evidence)>`; the first `Some` in a
//! cascade wins and its source is recorded on the resulting
//! [`AnchoredParam`], per the §9 design note against inheritance or shared
//! mutable strategy state.

use crate::config::AnalysisConfig;
use crate::types::{
    AnchoredParam, ConsistencyCheck, Dimension, DimensionType, FrameLink, GateStatus, GridAxis, GridSystem, HeightParam,
    HeightType, MatchingResult, View, ViewGridInfo, ViewType,
};

struct Strategy {
    value: f64,
    source: String,
    evidence: String,
}

/// Cluster distinct long-line positions along `axis` within `view`,
/// averaging lines within `cluster_pt` of each other (§4.G grid-distance
/// matching, the position-extraction half).
fn distinct_grid_line_positions(view: &View, axis: GridAxis, config: &AnalysisConfig) -> Vec<f64> {
    let mut positions: Vec<f64> = view
        .lines
        .iter()
        .filter(|l| l.length() >= config.grid_distance_line_min_length_pt)
        .filter(|l| match axis {
            GridAxis::X => l.is_vertical(config.grid_angle_tolerance_deg),
            GridAxis::Y => l.is_horizontal(config.grid_angle_tolerance_deg),
        })
        .map(|l| match axis {
            GridAxis::X => l.midpoint().x,
            GridAxis::Y => l.midpoint().y,
        })
        .collect();
    positions.sort_by(|a, b| a.partial_cmp(b).unwrap());

    let mut clusters: Vec<Vec<f64>> = Vec::new();
    for p in positions {
        match clusters.last_mut() {
            Some(c) if (p - c.last().copied().unwrap()).abs() <= config.grid_distance_cluster_pt => c.push(p),
            _ => clusters.push(vec![p]),
        }
    }
    clusters.iter().map(|c| c.iter().sum::<f64>() / c.len() as f64).collect()
}

/// Grid-distance matching (§4.G): for every pair of distinct line positions
/// along `axis`, compute the mm distance and look for a printed dimension
/// within tolerance; return the largest matching dimension value.
fn match_grid_distance(view: &View, axis: GridAxis, dims: &[Dimension], config: &AnalysisConfig) -> Option<Strategy> {
    let mm_per_pt = view.mm_per_point()?;
    let positions = distinct_grid_line_positions(view, axis, config);
    let mut best: Option<f64> = None;
    for i in 0..positions.len() {
        for j in (i + 1)..positions.len() {
            let distance_mm = (positions[j] - positions[i]).abs() * mm_per_pt;
            for d in dims {
                if (d.value - distance_mm).abs() / distance_mm.max(1.0) <= config.grid_distance_match_tolerance
                    && best.map(|b| d.value > b).unwrap_or(true)
                {
                    best = Some(d.value);
                }
            }
        }
    }
    best.map(|v| Strategy {
        value: v,
        source: "grid_distance".into(),
        evidence: format!("{v:.0}"),
    })
}

/// An "X-side" elevation (§4.G elevation-side inference) is one whose own
/// grid labels are Y-only — you are looking along X, so only the Y axis is
/// visible on the sheet.
fn is_x_side_elevation(view: &View, config: &AnalysisConfig) -> bool {
    if view.view_type != ViewType::Elevation {
        return false;
    }
    let (x, y) = local_view_axes(view, config);
    x.is_empty() && !y.is_empty()
}

fn local_view_axes(view: &View, config: &AnalysisConfig) -> (Vec<()>, Vec<()>) {
    // Lightweight re-scan just to classify the view, without pulling a full
    // GridSystem merge; mirrors grids::extract_view_grid's matching but
    // only needs axis presence here.
    let (x, y) = crate::grids::extract_view_grid(view, false, config);
    (x.iter().map(|_| ()).collect(), y.iter().map(|_| ()).collect())
}

/// Multi-span check (§4.G b): given a base Y-distance `base`, check whether
/// any configured multiple (2x, 3x, ...) appears as a SINGLE dimension in a
/// section view or an X-side elevation.
fn check_multi_span(base: f64, views: &[View], dims: &[Dimension], config: &AnalysisConfig) -> Option<Strategy> {
    let eligible_views: Vec<&View> = views
        .iter()
        .filter(|v| v.view_type == ViewType::Section || is_x_side_elevation(v, config))
        .collect();
    for &factor in &config.multi_span_factors {
        let candidate = base * factor as f64;
        let found = dims.iter().any(|d| {
            d.dim_type == DimensionType::Single
                && (d.value - candidate).abs() / candidate <= config.grid_distance_match_tolerance
                && eligible_views.iter().any(|v| v.region.contains_point(&d.text_span.center()))
        });
        if found {
            return Some(Strategy {
                value: candidate,
                source: "multi_span".into(),
                evidence: format!("{base:.0} x {factor}"),
            });
        }
    }
    None
}

/// Span fallback (§4.G c): the largest SINGLE dimension >= threshold located
/// inside a section or X-side elevation.
fn span_fallback_single(views: &[View], dims: &[Dimension], config: &AnalysisConfig) -> Option<Strategy> {
    let eligible_views: Vec<&View> = views
        .iter()
        .filter(|v| v.view_type == ViewType::Section || is_x_side_elevation(v, config))
        .collect();
    dims.iter()
        .filter(|d| d.dim_type == DimensionType::Single && d.value >= config.span_fallback_min_mm)
        .filter(|d| eligible_views.iter().any(|v| v.region.contains_point(&d.text_span.center())))
        .max_by(|a, b| a.value.partial_cmp(&b.value).unwrap())
        .map(|d| Strategy {
            value: d.value,
            source: "section_single".into(),
            evidence: d.raw_text.clone(),
        })
}

fn span_from_grid_positions(grid: &GridSystem, view: &View) -> Option<Strategy> {
    let mm_per_pt = view.mm_per_point()?;
    let sorted = grid.sorted_y();
    let first = sorted.first()?;
    let last = sorted.last()?;
    if first.label == last.label {
        return None;
    }
    let value = (last.position - first.position).abs() * mm_per_pt;
    Some(Strategy {
        value,
        source: "grid_positions".into(),
        evidence: format!("{}..{}", first.label, last.label),
    })
}

fn derive_span(floor_view: Option<&View>, views: &[View], dims: &[Dimension], grid: Option<&GridSystem>, config: &AnalysisConfig) -> Option<Strategy> {
    if let Some(fv) = floor_view {
        if let Some(base) = match_grid_distance(fv, GridAxis::Y, dims, config) {
            if let Some(multi) = check_multi_span(base.value, views, dims, config) {
                return Some(multi);
            }
            return Some(base);
        }
    }
    if let Some(s) = span_fallback_single(views, dims, config) {
        return Some(s);
    }
    if let (Some(fv), Some(grid)) = (floor_view, grid) {
        if let Some(s) = span_from_grid_positions(grid, fv) {
            return Some(s);
        }
    }
    None
}

fn repeat_chain_sum(pitch: f64, dims: &[Dimension], config: &AnalysisConfig) -> Option<Strategy> {
    if let Some(repeat) = dims.iter().find(|d| d.dim_type == DimensionType::Repeat && d.repeat_count.is_some()) {
        let count = repeat.repeat_count.unwrap() as f64;
        return Some(Strategy {
            value: pitch * count,
            source: "repeat_chain".into(),
            evidence: format!("{pitch:.0} x {count:.0}"),
        });
    }
    let sum: f64 = dims
        .iter()
        .filter(|d| d.dim_type == DimensionType::Single)
        .filter(|d| {
            let ratio = d.value / pitch;
            (ratio - ratio.round()).abs() / ratio.max(1.0) <= config.repeat_chain_tolerance
        })
        .map(|d| d.value)
        .sum();
    if sum > 0.0 {
        Some(Strategy {
            value: sum,
            source: "repeat_chain".into(),
            evidence: format!("sum of multiples of {pitch:.0}"),
        })
    } else {
        None
    }
}

fn derive_length(floor_view: Option<&View>, dims: &[Dimension], span: Option<f64>, pitch: Option<f64>, grid: Option<&GridSystem>, config: &AnalysisConfig) -> Option<Strategy> {
    if let Some(fv) = floor_view {
        if let Some(candidate) = match_grid_distance(fv, GridAxis::X, dims, config) {
            let wrong_axis = span.map(|s| (candidate.value - s).abs() / s <= config.grid_distance_match_tolerance).unwrap_or(false);
            if !wrong_axis {
                return Some(candidate);
            }
        }
    }
    if let Some(pitch) = pitch {
        if let Some(s) = repeat_chain_sum(pitch, dims, config) {
            return Some(s);
        }
    }
    if let Some(grid) = grid {
        if let Some(fv) = floor_view {
            if let Some(mm_per_pt) = fv.mm_per_point() {
                let sorted = grid.sorted_x();
                if let (Some(first), Some(last)) = (sorted.first(), sorted.last()) {
                    if first.label != last.label {
                        let value = (last.position - first.position).abs() * mm_per_pt;
                        return Some(Strategy {
                            value,
                            source: "grid_positions".into(),
                            evidence: format!("{}..{}", first.label, last.label),
                        });
                    }
                }
            }
        }
    }
    None
}

fn derive_bay_pitch(dims: &[Dimension], grid: Option<&GridSystem>, config: &AnalysisConfig) -> Option<Strategy> {
    if let Some(d) = dims.iter().find(|d| matches!(d.dim_type, DimensionType::Pitch | DimensionType::Repeat)) {
        return Some(Strategy {
            value: d.value,
            source: "dimension".into(),
            evidence: d.raw_text.clone(),
        });
    }
    let grid = grid?;
    let numeric: Vec<f64> = {
        let mut v: Vec<&crate::types::GridLabel> = grid.x_labels.iter().filter(|l| matches!(l.index, crate::types::LabelIndex::Numeric(_))).collect();
        v.sort_by_key(|l| l.index);
        v.iter().map(|l| l.position).collect()
    };
    if numeric.len() < 3 {
        return None;
    }
    let spacings: Vec<f64> = numeric.windows(2).map(|w| (w[1] - w[0]).abs()).collect();
    let mean = spacings.iter().sum::<f64>() / spacings.len() as f64;
    if spacings.iter().all(|s| (s - mean).abs() / mean <= config.pitch_uniformity_tolerance) {
        Some(Strategy {
            value: mean,
            source: "grid_spacing".into(),
            evidence: format!("{} spacings", spacings.len()),
        })
    } else {
        None
    }
}

fn derive_bay_count(dims: &[Dimension], length: Option<f64>, pitch: Option<f64>, config: &AnalysisConfig) -> Option<(u32, String, String)> {
    if let Some(d) = dims.iter().find(|d| d.dim_type == DimensionType::Repeat && d.repeat_count.is_some()) {
        return Some((d.repeat_count.unwrap(), "dimension".into(), d.raw_text.clone()));
    }
    if let (Some(length), Some(pitch)) = (length, pitch) {
        let ratio = length / pitch;
        if (ratio - ratio.round()).abs() <= config.bay_count_closeness_a {
            return Some((ratio.round() as u32, "length_over_pitch".into(), format!("{length:.0}/{pitch:.0}")));
        }
    }
    if let Some(pitch) = pitch {
        if let Some(length) = length {
            let mut candidates: Vec<&Dimension> = dims
                .iter()
                .filter(|d| d.dim_type == DimensionType::Single && d.value >= 2.0 * pitch && d.value < length)
                .collect();
            candidates.sort_by(|a, b| b.value.partial_cmp(&a.value).unwrap());
            for d in candidates {
                let ratio = d.value / pitch;
                if (ratio - ratio.round()).abs() / ratio.max(1.0) <= config.bay_count_closeness_b {
                    return Some((ratio.round() as u32, "single_dimension".into(), d.raw_text.clone()));
                }
            }
        }
    }
    None
}

fn infer_elevation_side(view: &View, config: &AnalysisConfig) -> Option<String> {
    if let Some(start) = view.title_text.find('(').or_else(|| view.title_text.find('（')) {
        let rest = &view.title_text[start + 1..];
        if let Some(end) = rest.find('通') {
            return Some(rest[..end].trim().to_string());
        }
    }
    let (x, y) = local_view_axes(view, config);
    match (x.is_empty(), y.is_empty()) {
        (true, false) => Some("Y-side".to_string()),
        (false, true) => Some("X-side".to_string()),
        _ => None,
    }
}

fn build_frame_links(grid: &GridSystem, views: &[View], config: &AnalysisConfig) -> Vec<FrameLink> {
    grid.x_labels
        .iter()
        .map(|label| {
            let sides: Vec<String> = views
                .iter()
                .filter(|v| v.view_type == ViewType::Elevation)
                .filter(|v| v.texts.iter().any(|t| t.text.trim() == label.label))
                .filter_map(|v| infer_elevation_side(v, config))
                .collect();
            FrameLink {
                x_label: label.label.clone(),
                elevation_sides: sides,
            }
        })
        .collect()
}

fn run_consistency_checks(
    grid: Option<&GridSystem>,
    views: &[View],
    span: Option<f64>,
    length: Option<f64>,
    pitch: Option<f64>,
    bay_count: Option<u32>,
    config: &AnalysisConfig,
) -> Vec<ConsistencyCheck> {
    let mut checks = Vec::new();

    let plan_x: std::collections::HashSet<String> = grid.map(|g| g.x_labels.iter().map(|l| l.label.clone()).collect()).unwrap_or_default();
    let elevation_x: std::collections::HashSet<String> = views
        .iter()
        .filter(|v| v.view_type == ViewType::Elevation)
        .flat_map(|v| v.texts.iter().filter(|t| plan_x.contains(t.text.trim())).map(|t| t.text.trim().to_string()))
        .collect();
    let overlap = plan_x.intersection(&elevation_x).count();
    checks.push(ConsistencyCheck {
        name: "Plan/elevation X-label overlap".into(),
        status: if overlap >= 2 {
            GateStatus::Pass
        } else if overlap == 1 {
            GateStatus::Warn
        } else {
            GateStatus::Fail
        },
        message: format!("{overlap} shared X-labels"),
    });

    if let (Some(pitch), Some(count), Some(length)) = (pitch, bay_count, length) {
        let predicted = pitch * count as f64;
        let ok = (predicted - length).abs() / length.max(1.0) <= config.consistency_tolerance;
        checks.push(ConsistencyCheck {
            name: "pitch x count = length".into(),
            status: if ok { GateStatus::Pass } else { GateStatus::Warn },
            message: format!("{pitch:.0} x {count} = {predicted:.0} vs {length:.0}"),
        });
    }

    let sides_detected = views
        .iter()
        .filter(|v| v.view_type == ViewType::Elevation)
        .filter_map(|v| infer_elevation_side(v, config))
        .collect::<std::collections::HashSet<_>>()
        .len();
    checks.push(ConsistencyCheck {
        name: "Elevation sides detected".into(),
        status: if sides_detected >= 2 {
            GateStatus::Pass
        } else if sides_detected == 1 {
            GateStatus::Warn
        } else {
            GateStatus::Fail
        },
        message: format!("{sides_detected} sides"),
    });

    let present = [span.is_some(), length.is_some(), pitch.is_some(), bay_count.is_some()]
        .iter()
        .filter(|b| **b)
        .count();
    checks.push(ConsistencyCheck {
        name: "Core parameters present".into(),
        status: if present == 4 {
            GateStatus::Pass
        } else if present >= 2 {
            GateStatus::Warn
        } else {
            GateStatus::Fail
        },
        message: format!("{present}/4 of span/length/pitch/bay_count present"),
    });

    checks
}

fn anchor_from_strategy(name: &str, s: &Strategy, anchor_from: Option<String>, anchor_to: Option<String>) -> AnchoredParam {
    AnchoredParam {
        name: name.into(),
        value: s.value,
        unit: "mm".into(),
        anchor_from,
        anchor_to,
        source: s.source.clone(),
        raw_evidence: s.evidence.clone(),
    }
}

/// Run the full component-G cascade, per §4.G.
pub fn run_matching(views: &[View], grid: Option<&GridSystem>, dimensions: &[Dimension], heights: &[HeightParam], config: &AnalysisConfig) -> Option<MatchingResult> {
    if views.is_empty() {
        return None;
    }
    let floor_view = views.iter().find(|v| v.view_type == ViewType::FloorPlan);

    let span = derive_span(floor_view, views, dimensions, grid, config);
    let pitch = derive_bay_pitch(dimensions, grid, config);
    let length = derive_length(floor_view, dimensions, span.as_ref().map(|s| s.value), pitch.as_ref().map(|p| p.value), grid, config);
    let bay_count = derive_bay_count(dimensions, length.as_ref().map(|l| l.value), pitch.as_ref().map(|p| p.value), config);

    let eave_height = heights.iter().find(|h| h.height_type == HeightType::EaveHeight).and_then(|h| h.value);
    let max_height = heights.iter().find(|h| h.height_type == HeightType::MaxHeight).and_then(|h| h.value);

    let mut anchored_params = Vec::new();
    let (y_from, y_to) = grid
        .map(|g| {
            let sorted = g.sorted_y();
            (sorted.first().map(|l| l.label.clone()), sorted.last().map(|l| l.label.clone()))
        })
        .unwrap_or((None, None));
    if let Some(s) = &span {
        anchored_params.push(anchor_from_strategy("span", s, y_from, y_to));
    }
    let (x_from, x_to) = grid
        .map(|g| {
            let sorted = g.sorted_x();
            (sorted.first().map(|l| l.label.clone()), sorted.last().map(|l| l.label.clone()))
        })
        .unwrap_or((None, None));
    if let Some(s) = &length {
        anchored_params.push(anchor_from_strategy("length", s, x_from, x_to));
    }
    if let Some(s) = &pitch {
        anchored_params.push(anchor_from_strategy("bay_pitch", s, None, None));
    }
    if let Some((value, source, evidence)) = &bay_count {
        anchored_params.push(AnchoredParam {
            name: "bay_count".into(),
            value: *value as f64,
            unit: "count".into(),
            anchor_from: None,
            anchor_to: None,
            source: source.clone(),
            raw_evidence: evidence.clone(),
        });
    }

    let view_grid_info: Vec<ViewGridInfo> = views
        .iter()
        .map(|v| ViewGridInfo {
            view_type: v.view_type,
            title_text: v.title_text.clone(),
            grid_side: if v.view_type == ViewType::Elevation { infer_elevation_side(v, config) } else { None },
        })
        .collect();

    let frame_links = grid.map(|g| build_frame_links(g, views, config)).unwrap_or_default();
    let consistency_checks = run_consistency_checks(
        grid,
        views,
        span.as_ref().map(|s| s.value),
        length.as_ref().map(|l| l.value),
        pitch.as_ref().map(|p| p.value),
        bay_count.as_ref().map(|(c, _, _)| *c),
        config,
    );

    Some(MatchingResult {
        canonical_grid_view: grid.and_then(|g| g.source_view),
        view_grid_info,
        frame_links,
        anchored_params,
        consistency_checks,
        span: span.map(|s| s.value),
        length: length.map(|l| l.value),
        bay_pitch: pitch.map(|p| p.value),
        bay_count: bay_count.map(|(c, _, _)| c),
        eave_height,
        max_height,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::BBox;
    use crate::types::{DimensionType, TextSpan};

    fn dim(value: f64, dim_type: DimensionType, repeat_count: Option<u32>, text: &str) -> Dimension {
        Dimension {
            value,
            raw_text: text.into(),
            dim_type,
            repeat_count,
            text_span: TextSpan {
                text: text.into(),
                bbox: BBox::new(0.0, 0.0, 10.0, 10.0),
                font_name: "Arial".into(),
                size: 8.0,
            },
            source_view: ViewType::FloorPlan,
            nearest_lines: vec![],
        }
    }

    #[test]
    fn scenario_s2_pitch_repeat_length() {
        let config = AnalysisConfig::default();
        let dims = vec![
            dim(2000.0, DimensionType::Pitch, None, "@2000"),
            dim(2000.0, DimensionType::Repeat, Some(5), "2000x5"),
            dim(10000.0, DimensionType::Single, None, "10000"),
        ];
        let pitch = derive_bay_pitch(&dims, None, &config).unwrap();
        assert_eq!(pitch.value, 2000.0);
        let bay_count = derive_bay_count(&dims, Some(10000.0), Some(2000.0), &config).unwrap();
        assert_eq!(bay_count.0, 5);
    }

    #[test]
    fn multi_span_prefers_larger_configured_factor() {
        let config = AnalysisConfig::default();
        let section = View {
            view_type: ViewType::Section,
            title_text: "断面図".into(),
            title_bbox: BBox::new(0.0, 0.0, 10.0, 10.0),
            region: BBox::new(0.0, 0.0, 1000.0, 1000.0),
            scale: Some("1/100".into()),
            subtitle: None,
            texts: vec![],
            lines: vec![],
        };
        let dims = vec![dim(15000.0, DimensionType::Single, None, "15000")];
        let result = check_multi_span(7500.0, &[section], &dims, &config);
        assert!(result.is_some());
        assert_eq!(result.unwrap().value, 15000.0);
    }
}
