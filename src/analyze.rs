//! The top-level pipeline: opens the document through a [`PdfBackend`] and
//! runs every component in sequence, per §5. Each stage only ever consumes
//! the outputs of the stages before it; nothing here re-derives primitives.

use crate::axial_frame;
use crate::backend::{PdfBackend, RasterSink};
use crate::catalog::SteelCatalog;
use crate::config::AnalysisConfig;
use crate::dimensions;
use crate::error::{AnalysisError, Result};
use crate::geometry::BBox;
use crate::grids;
use crate::heights;
use crate::matching;
use crate::quality;
use crate::reconstruction;
use crate::roof_plan;
use crate::takeoff;
use crate::types::{AnalysisResult, Diagnostics, PageData};
use crate::views;

/// DPI used for every `PdfBackend::rasterize` call the pipeline makes, both
/// for full-page renders and clipped J-panel crops.
const RASTER_DPI: u32 = 150;

/// Run the full analysis pipeline over a document opened behind `backend`.
///
/// `catalog`, when given, is consulted by the leader-tracing stage (§4.J,
/// §4.K) to attach section notation and weight to detected members; without
/// one, members are still detected and traced, just without that
/// post-processing. `raster_sink`, when given, receives one clipped PNG crop
/// per detected J-component panel (roof-plan drawing region, each
/// axial-frame sub-view region) as they're found; a backend that cannot
/// rasterize (or a caller with no sink) simply forgoes those crops, and
/// `AnalysisResult.page_renders` still carries a full-page render per page.
#[tracing::instrument(skip(backend, catalog, raster_sink, config), fields(filename))]
pub fn analyze(
    backend: &dyn PdfBackend,
    filename: &str,
    catalog: Option<&dyn SteelCatalog>,
    mut raster_sink: Option<&mut dyn RasterSink>,
    config: &AnalysisConfig,
) -> Result<AnalysisResult> {
    let page_count = backend.page_count();
    if page_count == 0 {
        return Err(AnalysisError::EmptyDocument);
    }

    let pages = (0..page_count)
        .map(|i| backend.page_data(i))
        .collect::<Result<Vec<_>>>()?;
    let page_rotations = pages.iter().map(|p| p.rotation).collect();
    let page_dimensions = pages.iter().map(|p| (p.media_width, p.media_height)).collect();
    let page_renders = pages
        .iter()
        .map(|p| backend.rasterize(p.page_index, None, RASTER_DPI).unwrap_or(None))
        .collect();

    let mut diagnostics = Diagnostics::default();

    // Components B-G run over the primary drawing sheet (page 0), which
    // carries the floor plan, elevations, and grid/dimension/height data.
    let main_page = &pages[0];
    let transform = main_page.transform();
    let views = views::segment_views(main_page, config);
    tracing::debug!(view_count = views.len(), "segmented views");

    let grid = grids::extract_grid_system(&views, &transform, config);
    if grid.is_none() {
        diagnostics.note("no grid system recognised on the primary sheet");
    }

    let dimensions = dimensions::extract_dimensions(&views, config);
    let heights = heights::extract_heights(&views);
    let quality = quality::run_quality_gates(&views, grid.as_ref(), &dimensions, &heights);
    tracing::debug!(status = ?quality.overall, "quality gates complete");

    let matching = matching::run_matching(&views, grid.as_ref(), &dimensions, &heights, config);
    if matching.is_none() {
        diagnostics.note("cross-view matching produced no anchored parameters");
    }

    let structural_model = matching
        .as_ref()
        .and_then(|m| reconstruction::reconstruct_3d(m, grid.as_ref(), config));
    if structural_model.is_none() && matching.is_some() {
        diagnostics.note("3D reconstruction skipped: matching result missing a required parameter");
    }

    let takeoff = structural_model.as_ref().map(|m| takeoff::compute_takeoff(m, config));

    // Component J scans every page independently for the roof-framing plan
    // and axial-frame/section sheets; it does not rely on B's segmentation.
    let span = matching.as_ref().and_then(|m| m.span);
    let length = matching.as_ref().and_then(|m| m.length);

    let mut leader_traces = Vec::new();
    match roof_plan::detect_roof_plan_members(&pages, span, length, catalog, config) {
        Some(result) => {
            tracing::debug!(page_index = result.page_index, member_count = result.trace.members.len(), "roof plan traced");
            if let Some(region) = result.region_bbox {
                rasterize_panel(backend, &pages, result.page_index, region, raster_sink.as_deref_mut());
            }
            leader_traces.push(result.trace);
        }
        None => diagnostics.note("no 小屋伏図 page found"),
    }
    let axial_subviews = axial_frame::detect_axial_frame_members(&pages, span, length, catalog, config);
    if axial_subviews.is_empty() {
        diagnostics.note("no 軸組図 / 断面図 page found");
    }
    for subview in axial_subviews {
        rasterize_panel(backend, &pages, subview.page_index, subview.region_bbox, raster_sink.as_deref_mut());
        leader_traces.push(subview.trace);
    }

    Ok(AnalysisResult {
        filename: filename.to_string(),
        page_count,
        page_rotations,
        page_dimensions,
        page_renders,
        views,
        grid,
        dimensions,
        heights,
        quality,
        matching,
        structural_model,
        takeoff,
        leader_traces,
        diagnostics,
    })
}

/// Convert a J-panel's visual-frame region bbox back to mediabox
/// coordinates, rasterize it, and push the result to `sink` if one was
/// given and the backend produced a render.
fn rasterize_panel(backend: &dyn PdfBackend, pages: &[PageData], page_index: usize, region_visual: BBox, sink: Option<&mut dyn RasterSink>) {
    let Some(sink) = sink else { return };
    let Some(page) = pages.iter().find(|p| p.page_index == page_index) else {
        return;
    };
    let clip = page.transform().visual_rect_to_mediabox(region_visual);
    if let Ok(Some(png_bytes)) = backend.rasterize(page_index, Some(clip), RASTER_DPI) {
        sink.receive_png(page_index, Some(clip), png_bytes);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::fixture::FixtureBackend;
    use crate::geometry::{BBox, Rotation};
    use crate::types::{PageData, TextSpan};

    fn text(s: &str, x: f64, y: f64) -> TextSpan {
        TextSpan {
            text: s.into(),
            bbox: BBox::new(x - 5.0, y - 5.0, x + 5.0, y + 5.0),
            font_name: "Arial".into(),
            size: 10.0,
        }
    }

    #[test]
    fn empty_document_is_an_error() {
        let backend = FixtureBackend { pages: vec![] };
        let config = AnalysisConfig::default();
        let err = analyze(&backend, "empty.pdf", None, None, &config).unwrap_err();
        assert!(matches!(err, AnalysisError::EmptyDocument));
    }

    #[test]
    fn single_blank_page_yields_unknown_view_and_no_matching() {
        let page = PageData {
            page_index: 0,
            media_width: 842.0,
            media_height: 595.0,
            rotation: Rotation::R0,
            texts: vec![text("unrelated note", 50.0, 50.0)],
            lines: vec![],
            rects: vec![],
        };
        let backend = FixtureBackend { pages: vec![page] };
        let config = AnalysisConfig::default();
        let result = analyze(&backend, "blank.pdf", None, None, &config).unwrap();
        assert_eq!(result.page_count, 1);
        assert_eq!(result.page_dimensions, vec![(842.0, 595.0)]);
        assert_eq!(result.page_renders, vec![None]);
        assert!(result.grid.is_none());
        assert!(result.matching.is_none());
        assert!(result.structural_model.is_none());
        assert!(!result.diagnostics.notes.is_empty());
    }
}
