//! The building's structured data model: primitives, views, grids,
//! dimensions, heights, matching results, the reconstructed 3D model, the
//! quantity takeoff, and leader-traced members.

use serde::{Deserialize, Serialize};

use crate::geometry::{BBox, Line, Point, Point3D, Rotation};

/// A single run of text as extracted from a PDF page, from either the text
/// layer or an AutoCAD SHX annotation glyph rectangle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextSpan {
    pub text: String,
    pub bbox: BBox,
    pub font_name: String,
    pub size: f64,
}

impl TextSpan {
    pub fn center(&self) -> Point {
        self.bbox.center()
    }
}

/// All primitives extracted from one page, in the mediabox frame.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageData {
    pub page_index: usize,
    pub media_width: f64,
    pub media_height: f64,
    pub rotation: Rotation,
    pub texts: Vec<TextSpan>,
    pub lines: Vec<Line>,
    pub rects: Vec<BBox>,
}

impl PageData {
    pub fn transform(&self) -> crate::geometry::PageTransform {
        crate::geometry::PageTransform::new(self.rotation, self.media_width, self.media_height)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewType {
    RoofPlan,
    FloorPlan,
    Elevation,
    Section,
    Unknown,
}

impl ViewType {
    /// The kanji title this view type is recognised by, used both for
    /// matching and for diagnostics messages.
    pub fn kanji(&self) -> &'static str {
        match self {
            ViewType::RoofPlan => "屋根伏図",
            ViewType::FloorPlan => "平面図",
            ViewType::Elevation => "立面図",
            ViewType::Section => "断面図",
            ViewType::Unknown => "",
        }
    }
}

/// A detected drawing panel: a titled view with its clipped region and the
/// primitives that fall inside it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct View {
    pub view_type: ViewType,
    pub title_text: String,
    pub title_bbox: BBox,
    pub region: BBox,
    pub scale: Option<String>,
    pub subtitle: Option<String>,
    pub texts: Vec<TextSpan>,
    pub lines: Vec<Line>,
}

impl View {
    /// Parsed `N` from a `"1/N"` scale string, if present.
    pub fn scale_factor(&self) -> Option<f64> {
        let s = self.scale.as_ref()?;
        let n = s.split('/').nth(1)?;
        n.trim().parse::<f64>().ok()
    }

    /// PDF-point-to-millimetre conversion factor for this view, per §4.G.
    pub fn mm_per_point(&self) -> Option<f64> {
        self.scale_factor().map(|n| (25.4 / 72.0) * n)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GridAxis {
    X,
    Y,
}

/// The numeric-vs-symbolic shape of a grid label's index, per the §9 design
/// note: symbolic labels always sort after every numeric one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LabelIndex {
    Numeric(i64),
    Symbolic,
}

impl LabelIndex {
    /// Sentinel used when serialising to a flat numeric field; symbolic
    /// labels sort after any realistic numeric index.
    pub const SYMBOLIC_SENTINEL: i64 = 999;

    pub fn as_sort_key(&self) -> i64 {
        match self {
            LabelIndex::Numeric(i) => *i,
            LabelIndex::Symbolic => Self::SYMBOLIC_SENTINEL,
        }
    }
}

impl PartialOrd for LabelIndex {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for LabelIndex {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.as_sort_key().cmp(&other.as_sort_key())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GridLabel {
    pub axis: GridAxis,
    pub label: String,
    pub index: LabelIndex,
    /// Scalar position along `axis`, in mediabox coordinates.
    pub position: f64,
    pub source_text: TextSpan,
    pub line: Option<Line>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GridSystem {
    pub x_labels: Vec<GridLabel>,
    pub y_labels: Vec<GridLabel>,
    pub source_view: Option<ViewType>,
}

impl GridSystem {
    /// Labels sorted by index, numeric ascending then symbolic.
    pub fn sorted_x(&self) -> Vec<&GridLabel> {
        let mut v: Vec<&GridLabel> = self.x_labels.iter().collect();
        v.sort_by_key(|l| l.index);
        v
    }

    pub fn sorted_y(&self) -> Vec<&GridLabel> {
        let mut v: Vec<&GridLabel> = self.y_labels.iter().collect();
        v.sort_by_key(|l| l.index);
        v
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DimensionType {
    Single,
    Pitch,
    Repeat,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dimension {
    pub value: f64,
    pub raw_text: String,
    pub dim_type: DimensionType,
    pub repeat_count: Option<u32>,
    pub text_span: TextSpan,
    pub source_view: ViewType,
    pub nearest_lines: Vec<Line>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HeightType {
    EaveHeight,
    MaxHeight,
    Gl,
    Fl,
    DesignGl,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeightParam {
    pub height_type: HeightType,
    pub value: Option<f64>,
    pub source_view: ViewType,
    pub raw_text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GateStatus {
    Pass,
    Warn,
    Fail,
}

impl GateStatus {
    pub fn worst_of(statuses: impl IntoIterator<Item = GateStatus>) -> GateStatus {
        let mut worst = GateStatus::Pass;
        for s in statuses {
            if s.rank() > worst.rank() {
                worst = s;
            }
        }
        worst
    }

    fn rank(&self) -> u8 {
        match self {
            GateStatus::Pass => 0,
            GateStatus::Warn => 1,
            GateStatus::Fail => 2,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QualityCheck {
    pub name: String,
    pub status: GateStatus,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QualityReport {
    pub overall: GateStatus,
    pub checks: Vec<QualityCheck>,
}

/// A single parameter derived by the component-G strategy cascade. `source`
/// records which strategy produced the value ("grid_distance", "multi_span",
/// "computed", or a view tag) so downstream consumers and diagnostics can
/// explain a number instead of just reporting it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnchoredParam {
    pub name: String,
    pub value: f64,
    pub unit: String,
    pub anchor_from: Option<String>,
    pub anchor_to: Option<String>,
    pub source: String,
    pub raw_evidence: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrameLink {
    pub x_label: String,
    pub elevation_sides: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsistencyCheck {
    pub name: String,
    pub status: GateStatus,
    pub message: String,
}

/// Per-view grid info retained by matching (§3 `MatchingResult`): which view
/// this is and, for elevations, which grid side it looks along (e.g. "Y1",
/// "X-side") — distinct from `frame_links`, which is keyed by X-label rather
/// than by view.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ViewGridInfo {
    pub view_type: ViewType,
    pub title_text: String,
    pub grid_side: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MatchingResult {
    pub canonical_grid_view: Option<ViewType>,
    pub view_grid_info: Vec<ViewGridInfo>,
    pub frame_links: Vec<FrameLink>,
    pub anchored_params: Vec<AnchoredParam>,
    pub consistency_checks: Vec<ConsistencyCheck>,
    pub span: Option<f64>,
    pub length: Option<f64>,
    pub bay_pitch: Option<f64>,
    pub bay_count: Option<u32>,
    pub eave_height: Option<f64>,
    pub max_height: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemberType {
    Column,
    Rafter,
    RidgeBeam,
    Purlin,
}

impl MemberType {
    /// Sort order used by the quantity takeoff, per §4.I.
    pub fn type_order(&self) -> u8 {
        match self {
            MemberType::Column => 0,
            MemberType::Rafter => 1,
            MemberType::RidgeBeam => 2,
            MemberType::Purlin => 3,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Member3D {
    pub member_type: MemberType,
    pub label: String,
    pub start: Point3D,
    pub end: Point3D,
    pub length: f64,
    pub frame_index: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildingEnvelope {
    pub length: f64,
    pub span: f64,
    pub eave_height: f64,
    pub ridge_height: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructuralModel {
    pub members: Vec<Member3D>,
    pub envelope: BuildingEnvelope,
    pub frame_count: usize,
    pub bay_count: u32,
    pub bay_pitch: f64,
    pub x_grid_positions: Vec<f64>,
    pub y_grid_positions: Vec<f64>,
    pub member_summary: std::collections::BTreeMap<String, usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuantityBucket {
    pub member_type: MemberType,
    pub unit_length: f64,
    pub count: usize,
    pub total_length: f64,
    pub member_labels: Vec<String>,
    pub unit_weight: Option<f64>,
    pub total_weight: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuantityTakeoff {
    pub buckets: Vec<QuantityBucket>,
}

impl QuantityTakeoff {
    pub fn total_members(&self) -> usize {
        self.buckets.iter().map(|b| b.count).sum()
    }

    pub fn total_length(&self) -> f64 {
        self.buckets.iter().map(|b| b.total_length).sum()
    }
}

/// One leader-traced tip and its leg length.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct LeaderTip {
    pub point: Point,
    pub leg_length: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DetectedMember {
    pub member_number: String,
    pub modifier: Option<String>,
    pub label: String,
    pub label_center: Point,
    pub tips: Vec<LeaderTip>,
    pub tip_count: usize,
    pub line_count: usize,
    pub orientation: String,
    pub unit_length: Option<f64>,
    pub total_length: Option<f64>,
    pub section_text: Option<String>,
    pub member_kind: Option<String>,
    pub unit_weight: Option<f64>,
    pub total_weight: Option<f64>,
}

/// Result of leader tracing over one drawing region (the roof-framing plan,
/// or one elevation sub-view).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeaderTraceResult {
    pub source_label: String,
    pub members: Vec<DetectedMember>,
}

/// An ordered, append-only bag of free-text notes explaining non-obvious
/// decisions made during analysis (which strategy won a parameter, which
/// view seeded the grid, ...).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Diagnostics {
    pub notes: Vec<String>,
}

impl Diagnostics {
    pub fn note(&mut self, message: impl Into<String>) {
        self.notes.push(message.into());
    }
}

/// Serialize `Vec<Option<Vec<u8>>>` PNG renders as base64 strings (or
/// `null`) rather than raw byte arrays, matching how the field looks on the
/// wire (§3.1: "base64-PNG renders of pages").
mod serde_png_renders {
    use base64::prelude::*;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S>(renders: &[Option<Vec<u8>>], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        use serde::ser::SerializeSeq;
        let mut seq = serializer.serialize_seq(Some(renders.len()))?;
        for render in renders {
            seq.serialize_element(&render.as_ref().map(|bytes| BASE64_STANDARD.encode(bytes)))?;
        }
        seq.end()
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<Option<Vec<u8>>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let encoded: Vec<Option<String>> = Deserialize::deserialize(deserializer)?;
        encoded
            .into_iter()
            .map(|maybe| {
                maybe
                    .map(|s| BASE64_STANDARD.decode(s.as_bytes()).map_err(serde::de::Error::custom))
                    .transpose()
            })
            .collect()
    }
}

/// The top-level result of a single `analyze()` call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub filename: String,
    pub page_count: usize,
    pub page_rotations: Vec<Rotation>,
    /// `(media_width, media_height)` per page, in PDF points (§3.1).
    pub page_dimensions: Vec<(f64, f64)>,
    /// Full-page PNG renders at the backend's default DPI, one per page, in
    /// document order. `None` where the backend could not rasterise a page
    /// (§6(ii): "the core treats that as no render available").
    #[serde(with = "serde_png_renders")]
    pub page_renders: Vec<Option<Vec<u8>>>,
    pub views: Vec<View>,
    pub grid: Option<GridSystem>,
    pub dimensions: Vec<Dimension>,
    pub heights: Vec<HeightParam>,
    pub quality: QualityReport,
    pub matching: Option<MatchingResult>,
    pub structural_model: Option<StructuralModel>,
    pub takeoff: Option<QuantityTakeoff>,
    pub leader_traces: Vec<LeaderTraceResult>,
    pub diagnostics: Diagnostics,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_renders_round_trip_through_base64() {
        let result = AnalysisResult {
            filename: "drawing.pdf".into(),
            page_count: 2,
            page_rotations: vec![Rotation::R0, Rotation::R90],
            page_dimensions: vec![(842.0, 595.0), (842.0, 595.0)],
            page_renders: vec![Some(vec![1, 2, 3]), None],
            views: vec![],
            grid: None,
            dimensions: vec![],
            heights: vec![],
            quality: QualityReport { overall: GateStatus::Pass, checks: vec![] },
            matching: None,
            structural_model: None,
            takeoff: None,
            leader_traces: vec![],
            diagnostics: Diagnostics::default(),
        };
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["page_renders"][0], serde_json::json!("AQID"));
        assert_eq!(json["page_renders"][1], serde_json::Value::Null);

        let round_tripped: AnalysisResult = serde_json::from_value(json).unwrap();
        assert_eq!(round_tripped.page_renders, result.page_renders);
    }

    #[test]
    fn label_index_orders_symbolic_last() {
        let mut idx = vec![LabelIndex::Symbolic, LabelIndex::Numeric(3), LabelIndex::Numeric(1)];
        idx.sort();
        assert_eq!(idx, vec![LabelIndex::Numeric(1), LabelIndex::Numeric(3), LabelIndex::Symbolic]);
    }

    #[test]
    fn gate_status_worst_of() {
        assert_eq!(
            GateStatus::worst_of([GateStatus::Pass, GateStatus::Warn]),
            GateStatus::Warn
        );
        assert_eq!(
            GateStatus::worst_of([GateStatus::Pass, GateStatus::Warn, GateStatus::Fail]),
            GateStatus::Fail
        );
        assert_eq!(GateStatus::worst_of([]), GateStatus::Pass);
    }

    #[test]
    fn scale_factor_parses_1_over_n() {
        let view = View {
            view_type: ViewType::FloorPlan,
            title_text: "平面図".into(),
            title_bbox: BBox::new(0.0, 0.0, 10.0, 10.0),
            region: BBox::new(0.0, 0.0, 100.0, 100.0),
            scale: Some("1/150".into()),
            subtitle: None,
            texts: vec![],
            lines: vec![],
        };
        assert_eq!(view.scale_factor(), Some(150.0));
        let mm_per_pt = view.mm_per_point().unwrap();
        assert!((mm_per_pt - (25.4 / 72.0 * 150.0)).abs() < 1e-9);
    }

    #[test]
    fn member_type_order_matches_spec() {
        assert!(MemberType::Column.type_order() < MemberType::Rafter.type_order());
        assert!(MemberType::Rafter.type_order() < MemberType::RidgeBeam.type_order());
        assert!(MemberType::RidgeBeam.type_order() < MemberType::Purlin.type_order());
    }
}
