//! Tunable analysis constants.
//!
//! Every tolerance named in the component design is exposed here instead of
//! being inlined as a literal at its call site, per the design note that
//! these ranges are calibration knobs, not hard-wired behaviour.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// §4.B: row-clustering threshold for view titles, in visual-frame pt.
    #[serde(default = "default_title_row_cluster_pt")]
    pub title_row_cluster_pt: f64,
    /// §4.B: vertical gap below a title row's lowest title.
    #[serde(default = "default_title_row_margin_pt")]
    pub title_row_margin_pt: f64,
    /// §4.B: window searched for a co-located "S=1/N" scale string.
    #[serde(default = "default_scale_search_box")]
    pub scale_search_box: (f64, f64),
    /// §4.B: spec-table panel clip margin.
    #[serde(default = "default_panel_clip_margin_pt")]
    pub panel_clip_margin_pt: f64,
    /// §4.B: subtitle ("...通り") search window around a title centre.
    #[serde(default = "default_subtitle_search_box")]
    pub subtitle_search_box: (f64, f64),
    /// §4.B: minimum length and cluster count/tolerance for a spec-table
    /// panel's near-horizontal lines.
    #[serde(default = "default_panel_line_min_length_pt")]
    pub panel_line_min_length_pt: f64,
    #[serde(default = "default_panel_min_lines")]
    pub panel_min_lines: usize,
    #[serde(default = "default_panel_x_extent_tolerance_pt")]
    pub panel_x_extent_tolerance_pt: f64,

    /// §4.C: minimum line length considered as a grid-line candidate.
    #[serde(default = "default_grid_line_min_length_pt")]
    pub grid_line_min_length_pt: f64,
    /// §4.C: angular tolerance for a grid-line orientation match.
    #[serde(default = "default_grid_angle_tolerance_deg")]
    pub grid_angle_tolerance_deg: f64,
    /// §4.C: maximum perpendicular distance for label-to-line association.
    #[serde(default = "default_grid_max_distance_pt")]
    pub grid_max_distance_pt: f64,

    /// §4.D: search radius for dimension-line weak evidence.
    #[serde(default = "default_dim_line_search_radius_pt")]
    pub dim_line_search_radius_pt: f64,

    /// §4.G: grid-distance match tolerance (fraction, 0.03 = 3%).
    #[serde(default = "default_grid_distance_match_tolerance")]
    pub grid_distance_match_tolerance: f64,
    /// §4.G: minimum line length for grid-distance position extraction.
    #[serde(default = "default_grid_distance_line_min_length_pt")]
    pub grid_distance_line_min_length_pt: f64,
    /// §4.G: clustering distance for grid-distance line positions.
    #[serde(default = "default_grid_distance_cluster_pt")]
    pub grid_distance_cluster_pt: f64,
    /// §4.G / §9: multiples of the base span checked by the multi-span
    /// heuristic, tried in order, first match wins. Resolves the "cap at
    /// 3x" open question by making the factor list itself configurable.
    #[serde(default = "default_multi_span_factors")]
    pub multi_span_factors: Vec<u32>,
    /// §4.G: minimum SINGLE dimension accepted as a span fallback candidate.
    #[serde(default = "default_span_fallback_min_mm")]
    pub span_fallback_min_mm: f64,
    /// §4.G: tolerance for the repeat-chain "clean integer multiple" test.
    #[serde(default = "default_repeat_chain_tolerance")]
    pub repeat_chain_tolerance: f64,
    /// §4.G: tolerance for consecutive grid-label spacing uniformity.
    #[serde(default = "default_pitch_uniformity_tolerance")]
    pub pitch_uniformity_tolerance: f64,
    /// §4.G: integer-closeness tolerance for length/pitch bay-count.
    #[serde(default = "default_bay_count_closeness_a")]
    pub bay_count_closeness_a: f64,
    /// §4.G: integer-closeness tolerance for the descending-SINGLE fallback.
    #[serde(default = "default_bay_count_closeness_b")]
    pub bay_count_closeness_b: f64,
    /// §4.G: tolerance used by the pitch*count≈length consistency check.
    #[serde(default = "default_consistency_tolerance")]
    pub consistency_tolerance: f64,

    /// §4.H / §9: purlins generated per roof slope between adjacent frames.
    #[serde(default = "default_purlins_per_slope")]
    pub purlins_per_slope: u32,

    /// §4.I: takeoff bucket quantisation step, in mm.
    #[serde(default = "default_takeoff_quantize_mm")]
    pub takeoff_quantize_mm: f64,

    /// §4.J / §9: thin (leader) stroke width and its tolerance band.
    #[serde(default = "default_thin_stroke_width")]
    pub thin_stroke_width: f64,
    #[serde(default = "default_stroke_width_tolerance")]
    pub stroke_width_tolerance: f64,
    /// §4.J / §9: thick (structural) stroke width and its tolerance band.
    #[serde(default = "default_thick_stroke_width")]
    pub thick_stroke_width: f64,
    /// §4.J: minimum width to count as a structural line for orientation
    /// inference (distinct from the nominal thick width above).
    #[serde(default = "default_structural_line_min_width")]
    pub structural_line_min_width: f64,
    /// §4.J / §9: minimum length for a line to be considered structural.
    #[serde(default = "default_min_structural_length_pt")]
    pub min_structural_length_pt: f64,
    /// §4.J: radius used to find a leader hub near a label.
    #[serde(default = "default_leader_hub_radius_pt")]
    pub leader_hub_radius_pt: f64,
    /// §4.J: snap radius used when clustering endpoints at a junction.
    #[serde(default = "default_junction_snap_pt")]
    pub junction_snap_pt: f64,
    /// §4.J: minimum tip-leg length.
    #[serde(default = "default_min_tip_length_pt")]
    pub min_tip_length_pt: f64,
    /// §4.J: modifier ("内側"/"外側") search radius around a label.
    #[serde(default = "default_modifier_radius_pt")]
    pub modifier_radius_pt: f64,
    /// §4.J: structural-line length clustering tolerance for instance count.
    #[serde(default = "default_structural_length_cluster_tolerance")]
    pub structural_length_cluster_tolerance: f64,
    /// §4.J: X-position clustering distance for instance counting.
    #[serde(default = "default_structural_position_cluster_pt")]
    pub structural_position_cluster_pt: f64,
    /// §4.J: angle bands classifying a line as horizontal/vertical.
    #[serde(default = "default_orientation_horizontal_max_deg")]
    pub orientation_horizontal_max_deg: f64,
    #[serde(default = "default_orientation_vertical_min_deg")]
    pub orientation_vertical_min_deg: f64,
    /// §4.J: margin added around the grid labels that bound a drawing
    /// region (roof-framing plan or one elevation sub-view).
    #[serde(default = "default_drawing_bbox_margin_pt")]
    pub drawing_bbox_margin_pt: f64,
    /// §4.J: larger margin on the edge past the title / far grid label.
    #[serde(default = "default_drawing_bbox_far_margin_pt")]
    pub drawing_bbox_far_margin_pt: f64,
}

fn default_title_row_cluster_pt() -> f64 {
    60.0
}
fn default_title_row_margin_pt() -> f64 {
    30.0
}
fn default_scale_search_box() -> (f64, f64) {
    (200.0, 50.0)
}
fn default_panel_clip_margin_pt() -> f64 {
    20.0
}
fn default_subtitle_search_box() -> (f64, f64) {
    (250.0, 40.0)
}
fn default_panel_line_min_length_pt() -> f64 {
    100.0
}
fn default_panel_min_lines() -> usize {
    5
}
fn default_panel_x_extent_tolerance_pt() -> f64 {
    50.0
}
fn default_grid_line_min_length_pt() -> f64 {
    50.0
}
fn default_grid_angle_tolerance_deg() -> f64 {
    10.0
}
fn default_grid_max_distance_pt() -> f64 {
    100.0
}
fn default_dim_line_search_radius_pt() -> f64 {
    40.0
}
fn default_grid_distance_match_tolerance() -> f64 {
    0.03
}
fn default_grid_distance_line_min_length_pt() -> f64 {
    100.0
}
fn default_grid_distance_cluster_pt() -> f64 {
    5.0
}
fn default_multi_span_factors() -> Vec<u32> {
    vec![2, 3]
}
fn default_span_fallback_min_mm() -> f64 {
    1000.0
}
fn default_repeat_chain_tolerance() -> f64 {
    0.05
}
fn default_pitch_uniformity_tolerance() -> f64 {
    0.10
}
fn default_bay_count_closeness_a() -> f64 {
    0.15
}
fn default_bay_count_closeness_b() -> f64 {
    0.05
}
fn default_consistency_tolerance() -> f64 {
    0.05
}
fn default_purlins_per_slope() -> u32 {
    4
}
fn default_takeoff_quantize_mm() -> f64 {
    10.0
}
fn default_thin_stroke_width() -> f64 {
    0.30
}
fn default_stroke_width_tolerance() -> f64 {
    0.05
}
fn default_thick_stroke_width() -> f64 {
    0.42
}
fn default_structural_line_min_width() -> f64 {
    0.35
}
fn default_min_structural_length_pt() -> f64 {
    150.0
}
fn default_leader_hub_radius_pt() -> f64 {
    15.0
}
fn default_junction_snap_pt() -> f64 {
    3.0
}
fn default_min_tip_length_pt() -> f64 {
    5.0
}
fn default_modifier_radius_pt() -> f64 {
    40.0
}
fn default_structural_length_cluster_tolerance() -> f64 {
    0.05
}
fn default_structural_position_cluster_pt() -> f64 {
    5.0
}
fn default_orientation_horizontal_max_deg() -> f64 {
    30.0
}
fn default_orientation_vertical_min_deg() -> f64 {
    60.0
}
fn default_drawing_bbox_margin_pt() -> f64 {
    30.0
}
fn default_drawing_bbox_far_margin_pt() -> f64 {
    50.0
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            title_row_cluster_pt: default_title_row_cluster_pt(),
            title_row_margin_pt: default_title_row_margin_pt(),
            scale_search_box: default_scale_search_box(),
            panel_clip_margin_pt: default_panel_clip_margin_pt(),
            subtitle_search_box: default_subtitle_search_box(),
            panel_line_min_length_pt: default_panel_line_min_length_pt(),
            panel_min_lines: default_panel_min_lines(),
            panel_x_extent_tolerance_pt: default_panel_x_extent_tolerance_pt(),
            grid_line_min_length_pt: default_grid_line_min_length_pt(),
            grid_angle_tolerance_deg: default_grid_angle_tolerance_deg(),
            grid_max_distance_pt: default_grid_max_distance_pt(),
            dim_line_search_radius_pt: default_dim_line_search_radius_pt(),
            grid_distance_match_tolerance: default_grid_distance_match_tolerance(),
            grid_distance_line_min_length_pt: default_grid_distance_line_min_length_pt(),
            grid_distance_cluster_pt: default_grid_distance_cluster_pt(),
            multi_span_factors: default_multi_span_factors(),
            span_fallback_min_mm: default_span_fallback_min_mm(),
            repeat_chain_tolerance: default_repeat_chain_tolerance(),
            pitch_uniformity_tolerance: default_pitch_uniformity_tolerance(),
            bay_count_closeness_a: default_bay_count_closeness_a(),
            bay_count_closeness_b: default_bay_count_closeness_b(),
            consistency_tolerance: default_consistency_tolerance(),
            purlins_per_slope: default_purlins_per_slope(),
            takeoff_quantize_mm: default_takeoff_quantize_mm(),
            thin_stroke_width: default_thin_stroke_width(),
            stroke_width_tolerance: default_stroke_width_tolerance(),
            thick_stroke_width: default_thick_stroke_width(),
            structural_line_min_width: default_structural_line_min_width(),
            min_structural_length_pt: default_min_structural_length_pt(),
            leader_hub_radius_pt: default_leader_hub_radius_pt(),
            junction_snap_pt: default_junction_snap_pt(),
            min_tip_length_pt: default_min_tip_length_pt(),
            modifier_radius_pt: default_modifier_radius_pt(),
            structural_length_cluster_tolerance: default_structural_length_cluster_tolerance(),
            structural_position_cluster_pt: default_structural_position_cluster_pt(),
            orientation_horizontal_max_deg: default_orientation_horizontal_max_deg(),
            orientation_vertical_min_deg: default_orientation_vertical_min_deg(),
            drawing_bbox_margin_pt: default_drawing_bbox_margin_pt(),
            drawing_bbox_far_margin_pt: default_drawing_bbox_far_margin_pt(),
        }
    }
}

impl AnalysisConfig {
    pub fn is_thin_stroke(&self, width: f64) -> bool {
        (width - self.thin_stroke_width).abs() <= self.stroke_width_tolerance
    }

    pub fn is_thick_stroke(&self, width: f64) -> bool {
        (width - self.thick_stroke_width).abs() <= self.stroke_width_tolerance
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec_literals() {
        let c = AnalysisConfig::default();
        assert_eq!(c.purlins_per_slope, 4);
        assert_eq!(c.multi_span_factors, vec![2, 3]);
        assert!((c.thin_stroke_width - 0.30).abs() < 1e-9);
        assert!((c.thick_stroke_width - 0.42).abs() < 1e-9);
        assert!((c.min_structural_length_pt - 150.0).abs() < 1e-9);
    }

    #[test]
    fn deserializes_with_partial_overrides() {
        let json = r#"{"purlins_per_slope": 6}"#;
        let c: AnalysisConfig = serde_json::from_str(json).unwrap();
        assert_eq!(c.purlins_per_slope, 6);
        // Everything else still falls back to its default.
        assert_eq!(c.multi_span_factors, vec![2, 3]);
    }

    #[test]
    fn stroke_width_classification() {
        let c = AnalysisConfig::default();
        assert!(c.is_thin_stroke(0.32));
        assert!(!c.is_thin_stroke(0.42));
        assert!(c.is_thick_stroke(0.40));
    }
}
