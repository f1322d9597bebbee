//! Component D: dimension extraction.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::config::AnalysisConfig;
use crate::primitives::nearby_lines;
use crate::types::{Dimension, DimensionType, TextSpan, View};

static PLAIN_DIM_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(\d{2,6})$").unwrap());
static PITCH_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[@＠][\s　]*(\d{2,6})$").unwrap());
static REPEAT_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(\d{2,6})[\s　]*[×xXｘ][\s　]*(\d{1,3})$").unwrap());
static REPEAT_SYMBOLIC_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{2,6})[\s　]*[×xXｘ][\s　]*([nNｎＮ])$").unwrap());

struct Matched {
    dim_type: DimensionType,
    value: f64,
    repeat_count: Option<u32>,
}

/// Test order is significant: PITCH, then REPEAT-numeric, then
/// REPEAT-symbolic, then plain SINGLE (§4.D).
fn match_dimension_text(text: &str) -> Option<Matched> {
    let trimmed = text.trim();
    if let Some(c) = PITCH_PATTERN.captures(trimmed) {
        return Some(Matched {
            dim_type: DimensionType::Pitch,
            value: c[1].parse().ok()?,
            repeat_count: None,
        });
    }
    if let Some(c) = REPEAT_PATTERN.captures(trimmed) {
        return Some(Matched {
            dim_type: DimensionType::Repeat,
            value: c[1].parse().ok()?,
            repeat_count: c[2].parse().ok(),
        });
    }
    if REPEAT_SYMBOLIC_PATTERN.is_match(trimmed) {
        let c = REPEAT_SYMBOLIC_PATTERN.captures(trimmed).unwrap();
        return Some(Matched {
            dim_type: DimensionType::Repeat,
            value: c[1].parse().ok()?,
            repeat_count: None,
        });
    }
    if let Some(c) = PLAIN_DIM_PATTERN.captures(trimmed) {
        let value: f64 = c[1].parse().ok()?;
        if value < 10.0 {
            return None;
        }
        return Some(Matched {
            dim_type: DimensionType::Single,
            value,
            repeat_count: None,
        });
    }
    None
}

fn extract_from_view(view: &View, config: &AnalysisConfig) -> Vec<Dimension> {
    let mut dims = Vec::new();
    for span in &view.texts {
        let Some(m) = match_dimension_text(&span.text) else {
            continue;
        };
        let nearest_lines = nearby_lines(span.center(), &view.lines, config.dim_line_search_radius_pt)
            .into_iter()
            .cloned()
            .collect();
        dims.push(Dimension {
            value: m.value,
            raw_text: span.text.clone(),
            dim_type: m.dim_type,
            repeat_count: m.repeat_count,
            text_span: span.clone(),
            source_view: view.view_type,
            nearest_lines,
        });
    }
    dims
}

/// Extract all dimensions from every view on the page, per §4.D.
pub fn extract_dimensions(views: &[View], config: &AnalysisConfig) -> Vec<Dimension> {
    views.iter().flat_map(|v| extract_from_view(v, config)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_single_rejects_below_10() {
        assert!(match_dimension_text("5").is_none());
        let m = match_dimension_text("7500").unwrap();
        assert_eq!(m.dim_type, DimensionType::Single);
        assert_eq!(m.value, 7500.0);
    }

    #[test]
    fn pitch_matches_at_sign() {
        let m = match_dimension_text("@2000").unwrap();
        assert_eq!(m.dim_type, DimensionType::Pitch);
        assert_eq!(m.value, 2000.0);
    }

    #[test]
    fn repeat_numeric_carries_count() {
        let m = match_dimension_text("2000×5").unwrap();
        assert_eq!(m.dim_type, DimensionType::Repeat);
        assert_eq!(m.value, 2000.0);
        assert_eq!(m.repeat_count, Some(5));
    }

    #[test]
    fn repeat_symbolic_has_no_count() {
        let m = match_dimension_text("2000×n").unwrap();
        assert_eq!(m.dim_type, DimensionType::Repeat);
        assert_eq!(m.repeat_count, None);
    }

    #[test]
    fn accepts_fullwidth_multiplication_variants() {
        assert!(match_dimension_text("2000ｘ5").is_some());
        assert!(match_dimension_text("2000X5").is_some());
    }
}
