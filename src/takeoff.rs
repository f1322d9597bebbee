//! Component I: member grouping and quantity takeoff (§4.I).

use std::collections::BTreeMap;

use crate::config::AnalysisConfig;
use crate::types::{MemberType, QuantityBucket, QuantityTakeoff, StructuralModel};

fn quantize(value: f64, step: f64) -> f64 {
    if step <= 0.0 {
        return (value * 10.0).round() / 10.0;
    }
    (value / step).round() * step
}

/// Run Step I: bucket members by (type, quantized length) and sort by
/// type order, then by descending unit length (§4.I).
pub fn compute_takeoff(model: &StructuralModel, config: &AnalysisConfig) -> QuantityTakeoff {
    let mut buckets: BTreeMap<(MemberType, u64), Vec<String>> = BTreeMap::new();
    let mut unit_lengths: BTreeMap<(MemberType, u64), f64> = BTreeMap::new();

    for member in &model.members {
        let rounded = quantize(member.length, config.takeoff_quantize_mm);
        let key = (member.member_type, rounded.to_bits());
        buckets.entry(key).or_default().push(member.label.clone());
        unit_lengths.insert(key, rounded);
    }

    let mut groups: Vec<QuantityBucket> = buckets
        .into_iter()
        .map(|(key, labels)| {
            let unit_length = unit_lengths[&key];
            let count = labels.len();
            QuantityBucket {
                member_type: key.0,
                unit_length,
                count,
                total_length: unit_length * count as f64,
                member_labels: labels,
                unit_weight: None,
                total_weight: None,
            }
        })
        .collect();

    groups.sort_by(|a, b| {
        a.member_type
            .type_order()
            .cmp(&b.member_type.type_order())
            .then(b.unit_length.partial_cmp(&a.unit_length).unwrap())
    });

    QuantityTakeoff { buckets: groups }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Point3D;
    use crate::types::{BuildingEnvelope, Member3D};
    use std::collections::BTreeMap as Map;

    fn member(member_type: MemberType, length: f64, label: &str) -> Member3D {
        Member3D {
            member_type,
            label: label.into(),
            start: Point3D::new(0.0, 0.0, 0.0),
            end: Point3D::new(length, 0.0, 0.0),
            length,
            frame_index: None,
        }
    }

    fn model(members: Vec<Member3D>) -> StructuralModel {
        StructuralModel {
            members,
            envelope: BuildingEnvelope {
                length: 0.0,
                span: 0.0,
                eave_height: 0.0,
                ridge_height: 0.0,
            },
            frame_count: 0,
            bay_count: 0,
            bay_pitch: 0.0,
            x_grid_positions: vec![],
            y_grid_positions: vec![],
            member_summary: Map::new(),
        }
    }

    #[test]
    fn groups_members_of_same_rounded_length() {
        let config = AnalysisConfig::default();
        let m = model(vec![
            member(MemberType::Column, 5000.0, "C-F0-Y1"),
            member(MemberType::Column, 5004.0, "C-F0-Y2"),
            member(MemberType::Column, 5000.0, "C-F1-Y1"),
        ]);
        let takeoff = compute_takeoff(&m, &config);
        assert_eq!(takeoff.buckets.len(), 1);
        assert_eq!(takeoff.buckets[0].count, 3);
        assert_eq!(takeoff.total_members(), 3);
    }

    #[test]
    fn sorted_by_type_then_descending_length() {
        let config = AnalysisConfig::default();
        let m = model(vec![
            member(MemberType::Purlin, 6000.0, "P-B0-L1"),
            member(MemberType::Column, 5000.0, "C-F0-Y1"),
            member(MemberType::Column, 7000.0, "C-F0-Y2"),
        ]);
        let takeoff = compute_takeoff(&m, &config);
        assert_eq!(takeoff.buckets[0].member_type, MemberType::Column);
        assert_eq!(takeoff.buckets[0].unit_length, 7000.0);
        assert_eq!(takeoff.buckets[1].member_type, MemberType::Column);
        assert_eq!(takeoff.buckets[1].unit_length, 5000.0);
        assert_eq!(takeoff.buckets[2].member_type, MemberType::Purlin);
    }

    #[test]
    fn total_length_sums_bucket_totals() {
        let config = AnalysisConfig::default();
        let m = model(vec![
            member(MemberType::Rafter, 4000.0, "R-F0-L"),
            member(MemberType::Rafter, 4000.0, "R-F0-R"),
        ]);
        let takeoff = compute_takeoff(&m, &config);
        assert_eq!(takeoff.total_length(), 8000.0);
    }
}
