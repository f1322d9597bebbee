//! Component K: Japanese steel section notation parser and weight
//! calculator, driven by an external member-number -> notation lookup (§4.K).

use once_cell::sync::Lazy;
use regex::Regex;

const STEEL_DENSITY_KG_PER_MM2_PER_M: f64 = 7.85e-3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectionShape {
    Pipe,
    SquareTube,
    RectTube,
    Angle,
    RoundBar,
    FlatBar,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SteelSection {
    pub shape: SectionShape,
    pub notation: String,
    pub area_mm2: f64,
    pub unit_weight: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LatticeTruss {
    pub chord: SteelSection,
    pub chord_count: u32,
    pub lattice: SteelSection,
    pub depth_mm: f64,
    pub angle_deg: f64,
    pub chord_weight_per_m: f64,
    pub lattice_weight_per_m: f64,
    pub total_weight_per_m: f64,
}

/// Lookup from member number (e.g. "①", "⑤a") to its raw section-text
/// notation, as printed in the drawing's MEMBER LIST. This is the one
/// external collaborator this component depends on (§6) — the catalog
/// itself is not shipped as production data, only this trait boundary.
pub trait SteelCatalog {
    fn lookup(&self, member_number: &str) -> Option<&str>;
}

fn to_kg_m(area_mm2: f64) -> f64 {
    (area_mm2 * STEEL_DENSITY_KG_PER_MM2_PER_M * 1000.0).round() / 1000.0
}

fn round3(v: f64) -> f64 {
    (v * 1000.0).round() / 1000.0
}

fn pipe_area(d: f64, t: f64) -> f64 {
    std::f64::consts::PI * (d - t) * t
}

fn tube_area(b: f64, h: f64, t: f64) -> f64 {
    2.0 * (b + h - 2.0 * t) * t
}

fn angle_area(a: f64, b: f64, t: f64) -> f64 {
    (a + b - t) * t
}

fn round_bar_area(d: f64) -> f64 {
    std::f64::consts::PI * d * d / 4.0
}

fn flat_bar_area(b: f64, t: f64) -> f64 {
    b * t
}

static PIPE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"Ps?[-\u{2212}\u{2013}](\d+\.?\d*)[\u{03c6}\u{03a6}\u{00f8}\u{0278}][×xX](\d+\.?\d*)t").unwrap());
static TUBE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\u{25a1}[-\u{2212}\u{2013}](\d+\.?\d*)[×xX](\d+\.?\d*)[×xX](\d+\.?\d*)t").unwrap());
static ANGLE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"L[-\u{2212}\u{2013}](\d+\.?\d*)[×xX](\d+\.?\d*)[×xX](\d+\.?\d*)t").unwrap());
static FLAT_BAR_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"FB[-\u{2212}\u{2013}](\d+\.?\d*)[×xX](\d+\.?\d*)t?").unwrap());
static ROUND_BAR_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"M(\d+\.?\d*)").unwrap());

fn parse_pipe(text: &str) -> Option<SteelSection> {
    let c = PIPE_PATTERN.captures(text)?;
    let d: f64 = c[1].parse().ok()?;
    let t: f64 = c[2].parse().ok()?;
    let area = pipe_area(d, t);
    Some(SteelSection {
        shape: SectionShape::Pipe,
        notation: format!("P-{d}φ×{t}t"),
        area_mm2: (area * 10.0).round() / 10.0,
        unit_weight: to_kg_m(area),
    })
}

fn parse_tube(text: &str) -> Option<SteelSection> {
    let c = TUBE_PATTERN.captures(text)?;
    let b: f64 = c[1].parse().ok()?;
    let h: f64 = c[2].parse().ok()?;
    let t: f64 = c[3].parse().ok()?;
    let area = tube_area(b, h, t);
    let shape = if b == h { SectionShape::SquareTube } else { SectionShape::RectTube };
    Some(SteelSection {
        shape,
        notation: format!("□-{b}×{h}×{t}t"),
        area_mm2: (area * 10.0).round() / 10.0,
        unit_weight: to_kg_m(area),
    })
}

fn parse_angle(text: &str) -> Option<SteelSection> {
    let c = ANGLE_PATTERN.captures(text)?;
    let a: f64 = c[1].parse().ok()?;
    let b: f64 = c[2].parse().ok()?;
    let t: f64 = c[3].parse().ok()?;
    let area = angle_area(a, b, t);
    Some(SteelSection {
        shape: SectionShape::Angle,
        notation: format!("L-{a}×{b}×{t}t"),
        area_mm2: (area * 10.0).round() / 10.0,
        unit_weight: to_kg_m(area),
    })
}

fn parse_round_bar(text: &str) -> Option<SteelSection> {
    let c = ROUND_BAR_PATTERN.captures(text)?;
    let d: f64 = c[1].parse().ok()?;
    if d > 64.0 {
        return None;
    }
    let area = round_bar_area(d);
    Some(SteelSection {
        shape: SectionShape::RoundBar,
        notation: format!("M{d:.0}"),
        area_mm2: (area * 10.0).round() / 10.0,
        unit_weight: to_kg_m(area),
    })
}

fn parse_flat_bar(text: &str) -> Option<SteelSection> {
    let c = FLAT_BAR_PATTERN.captures(text)?;
    let b: f64 = c[1].parse().ok()?;
    let t: f64 = c[2].parse().ok()?;
    let area = flat_bar_area(b, t);
    Some(SteelSection {
        shape: SectionShape::FlatBar,
        notation: format!("FB-{b}×{t}t"),
        area_mm2: (area * 10.0).round() / 10.0,
        unit_weight: to_kg_m(area),
    })
}

/// Parse a single section notation, trying each shape in turn. Order
/// matters only in that pipe/tube/angle/flat-bar patterns are mutually
/// exclusive by their leading glyph; round bar is tried last since `M`
/// has no other collision.
pub fn parse_section(text: &str) -> Option<SteelSection> {
    let text = text.trim();
    parse_pipe(text)
        .or_else(|| parse_tube(text))
        .or_else(|| parse_angle(text))
        .or_else(|| parse_flat_bar(text))
        .or_else(|| parse_round_bar(text))
}

fn extract_count(text: &str) -> u32 {
    let trimmed = text.trim_start_matches(['上', '下', '角', '内', '外']);
    let digits: String = trimmed.chars().take_while(|c| c.is_ascii_digit()).collect();
    digits.parse().unwrap_or(1)
}

pub fn calc_lattice_truss(chord: SteelSection, chord_count: u32, lattice: SteelSection, depth_mm: f64, angle_deg: f64) -> LatticeTruss {
    let chord_w = chord_count as f64 * chord.unit_weight;
    let lattice_w = lattice.unit_weight / angle_deg.to_radians().cos();
    let total_w = chord_w + lattice_w;
    LatticeTruss {
        chord,
        chord_count,
        lattice,
        depth_mm,
        angle_deg,
        chord_weight_per_m: round3(chord_w),
        lattice_weight_per_m: round3(lattice_w),
        total_weight_per_m: round3(total_w),
    }
}

static DEPTH_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"D[=\u{ff1d}](\d+\.?\d*)(?:[,\u{ff0c}](\d+\.?\d*))?").unwrap());
static THETA_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\u{03b8}\u{0398}][=\u{ff1d}](\d+\.?\d*)").unwrap());

/// Parse a compound or lattice-truss section-text row into its combined
/// unit weight (kg/m). Returns `None` if no recognizable section is found.
pub fn parse_compound(section_text: &str) -> Option<(f64, Option<LatticeTruss>)> {
    if section_text.contains('\u{30e9}') && section_text.contains('\u{30c1}') && section_text.contains('\u{30b9}') {
        return parse_lattice(section_text);
    }

    let mut total_w = 0.0;
    let mut found_any = false;
    for part in section_text.split(['\u{ff0c}', ',']) {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        let count = extract_count(part);
        if let Some(sec) = parse_section(part) {
            total_w += sec.unit_weight * count as f64;
            found_any = true;
        }
    }
    if !found_any {
        return None;
    }
    Some((round3(total_w), None))
}

fn parse_lattice(section_text: &str) -> Option<(f64, Option<LatticeTruss>)> {
    let mut halves = section_text.splitn(2, "\u{30e9}\u{30c1}\u{30b9}");
    let chord_text = halves.next()?;
    let lattice_text = halves.next()?;
    let lattice = parse_section(lattice_text)?;

    let mut chords: Vec<(u32, SteelSection)> = Vec::new();
    for part in chord_text.split(['\u{ff0c}', ',']) {
        let part = part.trim();
        if part.is_empty() || part.starts_with('D') {
            continue;
        }
        let count = extract_count(part);
        if let Some(sec) = parse_section(part) {
            chords.push((count, sec));
        }
    }
    if chords.len() == 1 && chords[0].0 == 1 {
        chords[0].0 = 2;
    }
    if chords.is_empty() {
        return None;
    }

    let total_chord_w: f64 = chords.iter().map(|(c, s)| *c as f64 * s.unit_weight).sum();

    let mut depths = Vec::new();
    if let Some(c) = DEPTH_PATTERN.captures(section_text) {
        if let Ok(d) = c[1].parse::<f64>() {
            depths.push(d);
        }
        if let Some(d2) = c.get(2).and_then(|m| m.as_str().parse::<f64>().ok()) {
            depths.push(d2);
        }
    }
    let depth = if depths.is_empty() { 0.0 } else { depths.iter().sum::<f64>() / depths.len() as f64 };

    let angle = THETA_PATTERN
        .captures(section_text)
        .and_then(|c| c[1].parse::<f64>().ok())
        .unwrap_or(45.0);

    let primary = chords.iter().max_by(|a, b| a.1.area_mm2.partial_cmp(&b.1.area_mm2).unwrap())?.clone();
    let primary_count: u32 = chords.iter().map(|(c, _)| c).sum();

    if depth > 0.0 {
        let truss = calc_lattice_truss(primary.1, primary_count, lattice, depth, angle);
        let total = truss.total_weight_per_m;
        return Some((total, Some(truss)));
    }

    let total = round3(total_chord_w + lattice.unit_weight);
    Some((total, None))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_pipe_notation() {
        let s = parse_section("P-42.7φ×2.3t").unwrap();
        assert_eq!(s.shape, SectionShape::Pipe);
        assert!((s.unit_weight - 2.2915).abs() < 0.01);
    }

    #[test]
    fn parses_square_tube_as_square_when_equal_sides() {
        let s = parse_section("□-50×50×2.3t").unwrap();
        assert_eq!(s.shape, SectionShape::SquareTube);
    }

    #[test]
    fn parses_rect_tube_when_sides_differ() {
        let s = parse_section("□-125×75×2.3t").unwrap();
        assert_eq!(s.shape, SectionShape::RectTube);
    }

    #[test]
    fn rejects_round_bar_over_64mm() {
        assert!(parse_section("M70").is_none());
        assert!(parse_section("M12").is_some());
    }

    #[test]
    fn compound_row_sums_counted_sections() {
        let (w, truss) = parse_compound("\u{4e0a}P-42.7\u{03c6}×2.3t, \u{4e0b}P-42.7\u{03c6}×2.3t").unwrap();
        assert!(truss.is_none());
        assert!((w - 2.0 * 2.2915).abs() < 0.05);
    }

    #[test]
    fn lattice_truss_computes_chord_and_diagonal_weight() {
        let section_text = "2Ps-42.7\u{03c6}×2.3t, D=450, \u{30e9}\u{30c1}\u{30b9}P-42.7\u{03c6}×1.9t, \u{03b8}=45\u{00b0}";
        let (w, truss) = parse_compound(section_text).unwrap();
        let truss = truss.unwrap();
        assert_eq!(truss.chord_count, 2);
        assert!(w > truss.chord_weight_per_m);
    }

    #[test]
    fn single_chord_count_one_defaults_to_two() {
        let section_text = "□-100×100×2.3t, D=600, \u{30e9}\u{30c1}\u{30b9}P-27.2\u{03c6}×1.9t, \u{03b8}=45\u{00b0}";
        let (_, truss) = parse_compound(section_text).unwrap();
        assert_eq!(truss.unwrap().chord_count, 2);
    }
}
