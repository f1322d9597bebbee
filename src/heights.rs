//! Component E: height parameter extraction (軒高, 最高高さ, GL, 設計GL, FL).

use once_cell::sync::Lazy;
use regex::Regex;

use crate::types::{HeightParam, HeightType, View, ViewType};

static EAVE_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"軒高[=:：]?[\s　]*(\d{2,6})").unwrap());
static MAX_HEIGHT_PAREN_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d{2,6})[\s　]*[（(]建築物の最高高さ[）)]").unwrap());
static MAX_HEIGHT_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"最高高さ[=:：]?[\s　]*(\d{2,6})").unwrap());
static DESIGN_GL_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"設計GL").unwrap());
static GL_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?:^|[^設計])\bGL\b").unwrap());
static FL_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d{1,2})?[\s　]*FL\b").unwrap());

struct Matched {
    height_type: HeightType,
    value: Option<f64>,
}

fn match_height_text(text: &str) -> Option<Matched> {
    let trimmed = text.trim();
    if let Some(c) = EAVE_PATTERN.captures(trimmed) {
        return Some(Matched {
            height_type: HeightType::EaveHeight,
            value: c[1].parse().ok(),
        });
    }
    if let Some(c) = MAX_HEIGHT_PAREN_PATTERN.captures(trimmed) {
        return Some(Matched {
            height_type: HeightType::MaxHeight,
            value: c[1].parse().ok(),
        });
    }
    if let Some(c) = MAX_HEIGHT_PATTERN.captures(trimmed) {
        return Some(Matched {
            height_type: HeightType::MaxHeight,
            value: c[1].parse().ok(),
        });
    }
    if DESIGN_GL_PATTERN.is_match(trimmed) {
        return Some(Matched {
            height_type: HeightType::DesignGl,
            value: None,
        });
    }
    if FL_PATTERN.is_match(trimmed) {
        let c = FL_PATTERN.captures(trimmed).unwrap();
        return Some(Matched {
            height_type: HeightType::Fl,
            value: c.get(1).and_then(|m| m.as_str().parse().ok()),
        });
    }
    if GL_PATTERN.is_match(trimmed) {
        return Some(Matched {
            height_type: HeightType::Gl,
            value: None,
        });
    }
    None
}

fn source_priority(vt: ViewType) -> u8 {
    match vt {
        ViewType::Section | ViewType::Elevation => 0,
        _ => 1,
    }
}

/// Extract heights from all views, per §4.E. 軒高 and 最高高さ and 設計GL are
/// deduplicated (first-by-priority wins); GL/FL are not, since they repeat
/// legitimately across floors.
pub fn extract_heights(views: &[View]) -> Vec<HeightParam> {
    let mut raw: Vec<HeightParam> = Vec::new();
    for view in views {
        for span in &view.texts {
            let Some(m) = match_height_text(&span.text) else {
                continue;
            };
            raw.push(HeightParam {
                height_type: m.height_type,
                value: m.value,
                source_view: view.view_type,
                raw_text: span.text.clone(),
            });
        }
    }

    let dedup_kinds = [HeightType::EaveHeight, HeightType::MaxHeight, HeightType::DesignGl];
    let mut out = Vec::new();
    for kind in dedup_kinds {
        let mut candidates: Vec<&HeightParam> = raw.iter().filter(|h| h.height_type == kind).collect();
        candidates.sort_by_key(|h| source_priority(h.source_view));
        if let Some(first) = candidates.into_iter().next() {
            out.push(first.clone());
        }
    }
    out.extend(raw.into_iter().filter(|h| matches!(h.height_type, HeightType::Gl | HeightType::Fl)));
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_eave_height() {
        let m = match_height_text("軒高=5000").unwrap();
        assert_eq!(m.height_type, HeightType::EaveHeight);
        assert_eq!(m.value, Some(5000.0));
    }

    #[test]
    fn matches_max_height_paren_form() {
        let m = match_height_text("7500（建築物の最高高さ）").unwrap();
        assert_eq!(m.height_type, HeightType::MaxHeight);
        assert_eq!(m.value, Some(7500.0));
    }

    #[test]
    fn matches_design_gl_without_value() {
        let m = match_height_text("設計GL").unwrap();
        assert_eq!(m.height_type, HeightType::DesignGl);
        assert_eq!(m.value, None);
    }

    #[test]
    fn matches_fl_with_floor_number() {
        let m = match_height_text("2FL").unwrap();
        assert_eq!(m.height_type, HeightType::Fl);
        assert_eq!(m.value, Some(2.0));
    }
}
