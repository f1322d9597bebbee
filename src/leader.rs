//! Component J shared logic: leader-line tracing from a member label to
//! the structural line(s) it annotates (§4.J). Operates on a drawing
//! region already isolated by `roof_plan` or `axial_frame`.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::catalog::{self, SteelCatalog};
use crate::config::AnalysisConfig;
use crate::geometry::{dist, Line, Point};
use crate::types::{DetectedMember, LeaderTip, TextSpan};

static MEMBER_NUMBER_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(?:[1-9]|1[0-2])$").unwrap());
static MODIFIER_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(内側|外側)$").unwrap());

fn label_candidates<'a>(texts: &'a [TextSpan]) -> (Vec<&'a TextSpan>, Vec<&'a TextSpan>) {
    let mut labels = Vec::new();
    let mut modifiers = Vec::new();
    for t in texts {
        let trimmed = t.text.trim();
        if MEMBER_NUMBER_PATTERN.is_match(trimmed) {
            labels.push(t);
        } else if MODIFIER_PATTERN.is_match(trimmed) {
            modifiers.push(t);
        }
    }
    (labels, modifiers)
}

fn find_modifier(label_center: Point, modifiers: &[&TextSpan], config: &AnalysisConfig) -> Option<String> {
    modifiers
        .iter()
        .find(|m| dist(label_center, m.center()) < config.modifier_radius_pt)
        .map(|m| m.text.trim().to_string())
}

/// Leader-origin discovery: collect endpoints of thin lines near the
/// label, score each candidate junction by the longest thin line
/// anchored there (tie-broken by proximity to the label), per §4.J.
fn find_leader_hub(label: Point, lines: &[Line], config: &AnalysisConfig) -> Option<Point> {
    let mut candidates: Vec<Point> = Vec::new();
    for line in lines {
        if !config.is_thin_stroke(line.stroke_width) || line.length() < 2.0 {
            continue;
        }
        let d1 = dist(line.p1, label);
        let d2 = dist(line.p2, label);
        if d1 <= config.leader_hub_radius_pt {
            candidates.push(line.p2);
        }
        if d2 <= config.leader_hub_radius_pt {
            candidates.push(line.p1);
        }
    }
    if candidates.is_empty() {
        return None;
    }

    let mut seen: Vec<(i64, i64)> = Vec::new();
    let mut dedup: Vec<Point> = Vec::new();
    for c in candidates {
        let key = (c.x.round() as i64, c.y.round() as i64);
        if !seen.contains(&key) {
            seen.push(key);
            dedup.push(c);
        }
    }

    let score_junction = |origin: Point| -> f64 {
        lines
            .iter()
            .filter(|l| config.is_thin_stroke(l.stroke_width) && l.length() >= config.min_tip_length_pt)
            .filter(|l| dist(l.p1, origin) <= config.junction_snap_pt || dist(l.p2, origin) <= config.junction_snap_pt)
            .map(|l| l.length())
            .fold(0.0, f64::max)
    };

    dedup
        .into_iter()
        .max_by(|a, b| {
            let sa = score_junction(*a);
            let sb = score_junction(*b);
            sa.partial_cmp(&sb)
                .unwrap()
                .then_with(|| dist(*b, label).partial_cmp(&dist(*a, label)).unwrap())
        })
}

/// Tip enumeration: every thin line anchored at the hub whose far
/// endpoint moves away from the label (not the entry stub), per §4.J.
fn find_leader_tips(label: Point, lines: &[Line], config: &AnalysisConfig) -> Vec<LeaderTip> {
    let Some(hub) = find_leader_hub(label, lines, config) else {
        return Vec::new();
    };
    let hub_to_label = dist(hub, label);

    let mut seen: Vec<(i64, i64)> = Vec::new();
    let mut tips = Vec::new();
    for line in lines {
        if !config.is_thin_stroke(line.stroke_width) || line.length() < config.min_tip_length_pt {
            continue;
        }
        let d1 = dist(line.p1, hub);
        let d2 = dist(line.p2, hub);
        let far = if d1 <= config.junction_snap_pt {
            line.p2
        } else if d2 <= config.junction_snap_pt {
            line.p1
        } else {
            continue;
        };

        if dist(far, label) < hub_to_label {
            continue;
        }
        let key = (far.x.round() as i64, far.y.round() as i64);
        if seen.contains(&key) {
            continue;
        }
        seen.push(key);
        tips.push(LeaderTip {
            point: far,
            leg_length: (line.length() * 10.0).round() / 10.0,
        });
    }
    tips.sort_by(|a, b| a.leg_length.partial_cmp(&b.leg_length).unwrap());
    tips
}

/// Orientation inference per §4.J: multi-tip members use spread, single-tip
/// members vote first on thick structural lines (length-weighted), falling
/// back to a count vote over thin lines. The two steps are never merged.
fn determine_orientation(tips: &[LeaderTip], lines: &[Line], config: &AnalysisConfig) -> String {
    if tips.len() >= 2 {
        let xs: Vec<f64> = tips.iter().map(|t| t.point.x).collect();
        let ys: Vec<f64> = tips.iter().map(|t| t.point.y).collect();
        let x_spread = xs.iter().cloned().fold(f64::MIN, f64::max) - xs.iter().cloned().fold(f64::MAX, f64::min);
        let y_spread = ys.iter().cloned().fold(f64::MIN, f64::max) - ys.iter().cloned().fold(f64::MAX, f64::min);
        return if y_spread > x_spread { "x".into() } else { "y".into() };
    }

    let Some(tip) = tips.first() else {
        return String::new();
    };

    let mut struct_horiz = 0.0;
    let mut struct_vert = 0.0;
    for line in lines {
        if line.length() < 3.0 || line.stroke_width < config.structural_line_min_width {
            continue;
        }
        if line.point_distance(&tip.point) > 15.0 {
            continue;
        }
        if line.is_horizontal(config.orientation_horizontal_max_deg) {
            struct_horiz += line.length();
        } else if line.is_vertical(90.0 - config.orientation_vertical_min_deg) {
            struct_vert += line.length();
        }
    }
    if struct_horiz > 0.0 && struct_vert > 0.0 {
        return if struct_horiz > struct_vert { "x".into() } else { "y".into() };
    }

    let mut horiz_count = 0;
    let mut vert_count = 0;
    for line in lines {
        if line.length() < 3.0 {
            continue;
        }
        if line.point_distance(&tip.point) > 15.0 {
            continue;
        }
        let near_endpoint = dist(line.p1, tip.point) < 3.0 || dist(line.p2, tip.point) < 3.0;
        if near_endpoint && !config.is_thin_stroke(line.stroke_width) {
            continue;
        }
        if line.is_horizontal(config.orientation_horizontal_max_deg) {
            horiz_count += 1;
        } else if line.is_vertical(90.0 - config.orientation_vertical_min_deg) {
            vert_count += 1;
        }
    }
    if horiz_count > 0 || vert_count > 0 {
        return if horiz_count > vert_count { "x".into() } else { "y".into() };
    }
    String::new()
}

/// Structural-line count per §4.J: for Y-direction members, find the
/// nearest structural line's length and count distinct vertical lines
/// of similar length in the drawing region; for X-direction members,
/// each tip already terminates on one structural line.
fn count_structural_lines(member: &DetectedMember, lines: &[Line], config: &AnalysisConfig) -> usize {
    if member.orientation == "x" {
        return member.tip_count;
    }
    if member.orientation != "y" || member.tips.is_empty() {
        return member.tip_count;
    }

    let tip = &member.tips[0];
    let mut ref_len = 0.0;
    let mut best_dist = f64::INFINITY;
    for line in lines {
        if line.length() < config.min_structural_length_pt || line.stroke_width < config.structural_line_min_width {
            continue;
        }
        if !line.is_vertical(90.0 - config.orientation_vertical_min_deg) {
            continue;
        }
        let d = line.point_distance(&tip.point);
        if d < best_dist {
            best_dist = d;
            ref_len = line.length();
        }
    }
    if ref_len <= 0.0 {
        return member.tip_count;
    }

    let tol = ref_len * config.structural_length_cluster_tolerance;
    let mut positions: Vec<f64> = lines
        .iter()
        .filter(|l| {
            l.length() >= config.min_structural_length_pt
                && l.stroke_width >= config.structural_line_min_width
                && l.is_vertical(90.0 - config.orientation_vertical_min_deg)
                && (l.length() - ref_len).abs() <= tol
        })
        .map(|l| l.midpoint().x)
        .collect();
    positions.sort_by(|a, b| a.partial_cmp(b).unwrap());

    let mut clustered = 0;
    let mut last: Option<f64> = None;
    for x in positions {
        match last {
            Some(l) if (x - l).abs() <= config.structural_position_cluster_pt => {}
            _ => clustered += 1,
        }
        last = Some(x);
    }
    clustered
}

/// Post-processing per §4.J: attach unit_length/total_length (from span
/// or length) and, when a catalog is available, look up the section
/// notation and compute its weight.
fn normalize_circled_digit(number: &str) -> String {
    const CIRCLED: &[char] = &['①', '②', '③', '④', '⑤', '⑥', '⑦', '⑧', '⑨', '⑩', '⑪', '⑫', '⑬', '⑭', '⑮', '⑯', '⑰', '⑱', '⑲', '⑳'];
    if let Some(c) = number.chars().next() {
        if let Some(idx) = CIRCLED.iter().position(|&d| d == c) {
            return format!("{}{}", idx + 1, &number[c.len_utf8()..]);
        }
    }
    number.to_string()
}

fn attach_post_processing(member: &mut DetectedMember, span: Option<f64>, length: Option<f64>, catalog: Option<&dyn SteelCatalog>) {
    let unit_length = if member.orientation == "y" { span } else if member.orientation == "x" { length } else { None };
    member.unit_length = unit_length;
    member.total_length = unit_length.map(|u| u * member.line_count as f64);

    let Some(catalog) = catalog else { return };
    let normalized = normalize_circled_digit(&member.member_number);
    let Some(section_text) = catalog.lookup(&normalized) else { return };
    member.section_text = Some(section_text.to_string());

    if let Some((unit_weight, truss)) = catalog::parse_compound(section_text) {
        member.member_kind = if truss.is_some() { Some("lattice".into()) } else { None };
        member.unit_weight = Some(unit_weight);
        member.total_weight = member.total_length.map(|l| (l / 1000.0 * unit_weight * 1000.0).round() / 1000.0);
    }
}

/// Run component J over a single isolated drawing region: find every
/// member label, trace its leader to the structural line(s) it refers
/// to, and (optionally) attach length/weight via `catalog`.
pub fn detect_members(
    texts: &[TextSpan],
    lines: &[Line],
    span: Option<f64>,
    length: Option<f64>,
    catalog: Option<&dyn SteelCatalog>,
    config: &AnalysisConfig,
) -> Vec<DetectedMember> {
    let (labels, modifiers) = label_candidates(texts);

    let mut members: Vec<DetectedMember> = labels
        .iter()
        .map(|label_span| {
            let center = label_span.center();
            let modifier = find_modifier(center, &modifiers, config);
            let number = label_span.text.trim().to_string();
            let tips = find_leader_tips(center, lines, config);
            let tip_count = tips.len();
            DetectedMember {
                member_number: number.clone(),
                modifier: modifier.clone(),
                label: format!("{number}{}", modifier.as_deref().unwrap_or("")),
                label_center: center,
                tips,
                tip_count,
                line_count: tip_count,
                orientation: String::new(),
                unit_length: None,
                total_length: None,
                section_text: None,
                member_kind: None,
                unit_weight: None,
                total_weight: None,
            }
        })
        .collect();

    let all_labels: Vec<String> = members.iter().map(|m| m.label.clone()).collect();
    let mut label_orientation: std::collections::HashMap<String, String> = std::collections::HashMap::new();
    for label in all_labels.iter().collect::<std::collections::HashSet<_>>() {
        let pooled: Vec<LeaderTip> = members.iter().filter(|m| &m.label == label).flat_map(|m| m.tips.clone()).collect();
        label_orientation.insert(label.clone(), determine_orientation(&pooled, lines, config));
    }
    for member in &mut members {
        member.orientation = label_orientation.get(&member.label).cloned().unwrap_or_default();
    }

    for member in &mut members {
        member.line_count = count_structural_lines(member, lines, config);
        attach_post_processing(member, span, length, catalog);
    }

    members.sort_by(|a, b| {
        let na: i64 = a.member_number.parse().unwrap_or(0);
        let nb: i64 = b.member_number.parse().unwrap_or(0);
        na.cmp(&nb).then_with(|| a.modifier.cmp(&b.modifier))
    });
    members
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::BBox;

    fn text(s: &str, x: f64, y: f64) -> TextSpan {
        TextSpan {
            text: s.into(),
            bbox: BBox::new(x - 2.0, y - 2.0, x + 2.0, y + 2.0),
            font_name: "Arial".into(),
            size: 8.0,
        }
    }

    struct NoCatalog;
    impl SteelCatalog for NoCatalog {
        fn lookup(&self, _: &str) -> Option<&str> {
            None
        }
    }

    #[test]
    fn finds_leader_hub_and_tips() {
        let config = AnalysisConfig::default();
        let label = text("1", 0.0, 0.0);
        let texts = vec![label];
        let lines = vec![
            Line::new(Point::new(0.0, 0.0), Point::new(10.0, 0.0), config.thin_stroke_width),
            Line::new(Point::new(10.0, 0.0), Point::new(30.0, 20.0), config.thin_stroke_width),
            Line::new(Point::new(10.0, 0.0), Point::new(30.0, -20.0), config.thin_stroke_width),
        ];
        let members = detect_members(&texts, &lines, Some(15000.0), Some(18000.0), Some(&NoCatalog), &config);
        assert_eq!(members.len(), 1);
        assert_eq!(members[0].tip_count, 2);
    }

    #[test]
    fn modifier_is_attached_when_nearby() {
        let config = AnalysisConfig::default();
        let texts = vec![text("2", 0.0, 0.0), text("内側", 10.0, 0.0)];
        let members = detect_members(&texts, &[], None, None, None, &config);
        assert_eq!(members[0].modifier.as_deref(), Some("内側"));
        assert_eq!(members[0].label, "2内側");
    }

    #[test]
    fn normalizes_circled_digit_member_numbers() {
        assert_eq!(normalize_circled_digit("①"), "1");
        assert_eq!(normalize_circled_digit("⑤a"), "5a");
    }

    #[test]
    fn multi_tip_orientation_follows_spread() {
        let config = AnalysisConfig::default();
        let tips = vec![
            LeaderTip { point: Point::new(0.0, 0.0), leg_length: 10.0 },
            LeaderTip { point: Point::new(0.0, 50.0), leg_length: 10.0 },
        ];
        assert_eq!(determine_orientation(&tips, &[], &config), "x");
    }
}
