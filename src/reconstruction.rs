//! Component H: deterministic 2D -> 3D structural reconstruction (§4.H).

use std::collections::BTreeMap;

use crate::config::AnalysisConfig;
use crate::geometry::Point3D;
use crate::types::{BuildingEnvelope, GridSystem, Member3D, MemberType, MatchingResult, StructuralModel};

fn build_y_positions(span: f64, grid: Option<&GridSystem>) -> Vec<f64> {
    if let Some(grid) = grid {
        if grid.y_labels.len() >= 3 {
            let mut positions: Vec<f64> = grid.sorted_y().iter().map(|l| l.position).collect();
            positions.sort_by(|a, b| a.partial_cmp(b).unwrap());
            let (p_min, p_max) = (positions[0], *positions.last().unwrap());
            if p_max - p_min > 0.0 {
                return positions.iter().map(|p| (p - p_min) / (p_max - p_min) * span).collect();
            }
        }
    }
    vec![0.0, span]
}

fn make_member(member_type: MemberType, start: Point3D, end: Point3D, label: &str, frame_index: Option<usize>) -> Member3D {
    let length = (start.dist(&end) * 10.0).round() / 10.0;
    Member3D {
        member_type,
        label: label.to_string(),
        start,
        end,
        length,
        frame_index,
    }
}

fn generate_frame_members(xi: f64, frame_idx: usize, y_positions: &[f64], z_eave: f64, z_ridge: f64, span: f64) -> Vec<Member3D> {
    let mut members = Vec::new();
    let y_ridge = span / 2.0;
    for (j, &yj) in y_positions.iter().enumerate() {
        members.push(make_member(
            MemberType::Column,
            Point3D::new(xi, yj, 0.0),
            Point3D::new(xi, yj, z_eave),
            &format!("C-F{frame_idx}-Y{}", j + 1),
            Some(frame_idx),
        ));
    }
    members.push(make_member(
        MemberType::Rafter,
        Point3D::new(xi, y_positions[0], z_eave),
        Point3D::new(xi, y_ridge, z_ridge),
        &format!("R-F{frame_idx}-L"),
        Some(frame_idx),
    ));
    members.push(make_member(
        MemberType::Rafter,
        Point3D::new(xi, y_ridge, z_ridge),
        Point3D::new(xi, *y_positions.last().unwrap(), z_eave),
        &format!("R-F{frame_idx}-R"),
        Some(frame_idx),
    ));
    members
}

fn generate_purlins(x_positions: &[f64], y_positions: &[f64], z_eave: f64, z_ridge: f64, span: f64, n_purlins_per_slope: u32) -> Vec<Member3D> {
    let mut members = Vec::new();
    let y_ridge = span / 2.0;
    let y_left = y_positions[0];
    let y_right = *y_positions.last().unwrap();

    for bay_idx in 0..x_positions.len().saturating_sub(1) {
        let x_start = x_positions[bay_idx];
        let x_end = x_positions[bay_idx + 1];

        for k in 1..=n_purlins_per_slope {
            let t = k as f64 / (n_purlins_per_slope + 1) as f64;
            let y_p = y_left + t * (y_ridge - y_left);
            let z_p = z_eave + t * (z_ridge - z_eave);
            members.push(make_member(
                MemberType::Purlin,
                Point3D::new(x_start, y_p, z_p),
                Point3D::new(x_end, y_p, z_p),
                &format!("P-B{bay_idx}-L{k}"),
                None,
            ));
        }
        for k in 1..=n_purlins_per_slope {
            let t = k as f64 / (n_purlins_per_slope + 1) as f64;
            let y_p = y_ridge + t * (y_right - y_ridge);
            let z_p = z_ridge + t * (z_eave - z_ridge);
            members.push(make_member(
                MemberType::Purlin,
                Point3D::new(x_start, y_p, z_p),
                Point3D::new(x_end, y_p, z_p),
                &format!("P-B{bay_idx}-R{k}"),
                None,
            ));
        }
    }
    members
}

/// Run Step H: convert component G's parameters into a 3D structural
/// model. Returns `None` if any essential parameter is missing (§7
/// "component no-data").
pub fn reconstruct_3d(matching: &MatchingResult, grid: Option<&GridSystem>, config: &AnalysisConfig) -> Option<StructuralModel> {
    let span = matching.span?;
    let eave = matching.eave_height?;
    let ridge = matching.max_height?;
    let pitch = matching.bay_pitch?;
    let bay_count = matching.bay_count?;
    let length = matching.length.unwrap_or(pitch * bay_count as f64);

    let x_positions: Vec<f64> = (0..=bay_count).map(|i| i as f64 * pitch).collect();
    let y_positions = build_y_positions(span, grid);
    let frame_count = bay_count as usize + 1;

    let mut members = Vec::new();
    for (i, &xi) in x_positions.iter().enumerate() {
        members.extend(generate_frame_members(xi, i, &y_positions, eave, ridge, span));
    }

    let y_ridge = span / 2.0;
    members.push(make_member(
        MemberType::RidgeBeam,
        Point3D::new(0.0, y_ridge, ridge),
        Point3D::new(length, y_ridge, ridge),
        "RB",
        None,
    ));

    members.extend(generate_purlins(&x_positions, &y_positions, eave, ridge, span, config.purlins_per_slope));

    let mut summary: BTreeMap<String, usize> = BTreeMap::new();
    for m in &members {
        *summary.entry(format!("{:?}", m.member_type)).or_insert(0) += 1;
    }

    Some(StructuralModel {
        members,
        envelope: BuildingEnvelope {
            length,
            span,
            eave_height: eave,
            ridge_height: ridge,
        },
        frame_count,
        bay_count,
        bay_pitch: pitch,
        x_grid_positions: x_positions,
        y_grid_positions: y_positions,
        member_summary: summary,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matching(span: f64, eave: f64, ridge: f64, pitch: f64, bay_count: u32, length: Option<f64>) -> MatchingResult {
        MatchingResult {
            span: Some(span),
            eave_height: Some(eave),
            max_height: Some(ridge),
            bay_pitch: Some(pitch),
            bay_count: Some(bay_count),
            length,
            ..Default::default()
        }
    }

    #[test]
    fn scenario_s4_counts_match_spec() {
        let config = AnalysisConfig::default();
        let m = matching(15000.0, 5000.0, 7500.0, 6000.0, 3, None);
        let model = reconstruct_3d(&m, None, &config).unwrap();
        assert_eq!(model.frame_count, 4);
        assert_eq!(model.bay_count, 3);
        assert_eq!(model.envelope.length, 18000.0);

        let columns = model.members.iter().filter(|mm| mm.member_type == MemberType::Column).count();
        assert_eq!(columns, 8);
        let rafters = model.members.iter().filter(|mm| mm.member_type == MemberType::Rafter).count();
        assert_eq!(rafters, 8);
        let ridge_beams = model.members.iter().filter(|mm| mm.member_type == MemberType::RidgeBeam).count();
        assert_eq!(ridge_beams, 1);
        let ridge_beam = model.members.iter().find(|mm| mm.member_type == MemberType::RidgeBeam).unwrap();
        assert_eq!(ridge_beam.length, 18000.0);
        let purlins = model.members.iter().filter(|mm| mm.member_type == MemberType::Purlin).count();
        assert_eq!(purlins, 24);
    }

    #[test]
    fn missing_parameter_yields_none() {
        let config = AnalysisConfig::default();
        let mut m = matching(15000.0, 5000.0, 7500.0, 6000.0, 3, None);
        m.bay_pitch = None;
        assert!(reconstruct_3d(&m, None, &config).is_none());
    }

    #[test]
    fn reconstruction_is_idempotent() {
        let config = AnalysisConfig::default();
        let m = matching(15000.0, 5000.0, 7500.0, 6000.0, 3, None);
        let a = reconstruct_3d(&m, None, &config).unwrap();
        let b = reconstruct_3d(&m, None, &config).unwrap();
        assert_eq!(a.members.len(), b.members.len());
        assert_eq!(a.envelope.length, b.envelope.length);
    }

    #[test]
    fn column_and_rafter_invariants() {
        let config = AnalysisConfig::default();
        let m = matching(15000.0, 5000.0, 7500.0, 6000.0, 3, None);
        let model = reconstruct_3d(&m, None, &config).unwrap();
        for member in model.members.iter().filter(|mm| mm.member_type == MemberType::Column) {
            assert_eq!(member.start.z, 0.0);
            assert_eq!(member.end.z, model.envelope.eave_height);
        }
    }
}
