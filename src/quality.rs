//! Component F: structural completeness gates over A-E (§4.F). Purely
//! advisory — the overall status never blocks later components.

use crate::types::{Dimension, GateStatus, GridSystem, HeightParam, HeightType, QualityCheck, QualityReport, View, ViewType};

pub fn run_quality_gates(views: &[View], grid: Option<&GridSystem>, dimensions: &[Dimension], heights: &[HeightParam]) -> QualityReport {
    let checks = vec![
        check_views_detected(views),
        check_floor_plan_present(views),
        check_grid_labels(grid),
        check_grid_line_association(grid),
        check_dimensions_found(dimensions),
        check_heights_found(heights),
        check_key_heights(heights),
    ];
    let overall = GateStatus::worst_of(checks.iter().map(|c| c.status));
    QualityReport { overall, checks }
}

fn check(name: &str, status: GateStatus, message: impl Into<String>, detail: Option<String>) -> QualityCheck {
    QualityCheck {
        name: name.into(),
        status,
        message: message.into(),
        detail,
    }
}

fn check_views_detected(views: &[View]) -> QualityCheck {
    let named: Vec<&View> = views.iter().filter(|v| v.view_type != ViewType::Unknown).collect();
    match named.len() {
        n if n >= 2 => check(
            "Views detected",
            GateStatus::Pass,
            format!("{n} views detected"),
            Some(named.iter().map(|v| v.view_type.kanji()).collect::<Vec<_>>().join(", ")),
        ),
        1 => check(
            "Views detected",
            GateStatus::Warn,
            "Only 1 view detected",
            Some(named[0].view_type.kanji().to_string()),
        ),
        _ => check(
            "Views detected",
            GateStatus::Fail,
            "No views detected",
            Some("Expected at least 平面図 and 立面図".into()),
        ),
    }
}

fn check_floor_plan_present(views: &[View]) -> QualityCheck {
    if views.iter().any(|v| v.view_type == ViewType::FloorPlan) {
        check("Floor plan (平面図)", GateStatus::Pass, "平面図 found", None)
    } else {
        check(
            "Floor plan (平面図)",
            GateStatus::Fail,
            "平面図 not found",
            Some("Floor plan is required for grid extraction".into()),
        )
    }
}

fn check_grid_labels(grid: Option<&GridSystem>) -> QualityCheck {
    let Some(grid) = grid else {
        return check(
            "Grid labels",
            GateStatus::Fail,
            "No grid system detected",
            Some("Expected X1, X2, ..., Y1, Y2 labels".into()),
        );
    };
    let (x, y) = (grid.x_labels.len(), grid.y_labels.len());
    if x >= 2 && y >= 1 {
        check("Grid labels", GateStatus::Pass, format!("{x} X-labels, {y} Y-labels"), None)
    } else {
        check(
            "Grid labels",
            GateStatus::Warn,
            format!("Incomplete grid: {x} X-labels, {y} Y-labels"),
            Some("Expected at least 2 X-labels and 1 Y-label".into()),
        )
    }
}

fn check_grid_line_association(grid: Option<&GridSystem>) -> QualityCheck {
    let Some(grid) = grid else {
        return check("Grid line association", GateStatus::Fail, "No grid to check", None);
    };
    let total = grid.x_labels.len() + grid.y_labels.len();
    if total == 0 {
        return check("Grid line association", GateStatus::Fail, "No grid labels to associate", None);
    }
    let with_lines = grid.x_labels.iter().chain(grid.y_labels.iter()).filter(|l| l.line.is_some()).count();
    let ratio = with_lines as f64 / total as f64;
    if ratio >= 0.8 {
        check(
            "Grid line association",
            GateStatus::Pass,
            format!("{with_lines}/{total} labels have lines"),
            None,
        )
    } else {
        check(
            "Grid line association",
            GateStatus::Warn,
            format!("Only {with_lines}/{total} labels have associated lines"),
            None,
        )
    }
}

fn check_dimensions_found(dimensions: &[Dimension]) -> QualityCheck {
    let count = dimensions.len();
    if count >= 5 {
        check("Dimensions found", GateStatus::Pass, format!("{count} dimensions extracted"), None)
    } else if count >= 1 {
        check(
            "Dimensions found",
            GateStatus::Warn,
            format!("Only {count} dimensions found"),
            Some("Expected at least 5 dimension values".into()),
        )
    } else {
        check("Dimensions found", GateStatus::Fail, "No dimensions found", None)
    }
}

fn check_heights_found(heights: &[HeightParam]) -> QualityCheck {
    if heights.is_empty() {
        return check("Heights found", GateStatus::Fail, "No height parameters found", None);
    }
    let types: Vec<String> = heights.iter().map(|h| format!("{:?}", h.height_type)).collect();
    check(
        "Heights found",
        GateStatus::Pass,
        format!("{} height parameters found", heights.len()),
        Some(types.join(", ")),
    )
}

fn check_key_heights(heights: &[HeightParam]) -> QualityCheck {
    let has_eave = heights.iter().any(|h| h.height_type == HeightType::EaveHeight);
    let has_max = heights.iter().any(|h| h.height_type == HeightType::MaxHeight);
    match (has_eave, has_max) {
        (true, true) => check("Key heights (軒高 + 最高高さ)", GateStatus::Pass, "Both 軒高 and 最高高さ found", None),
        (true, false) => check(
            "Key heights (軒高 + 最高高さ)",
            GateStatus::Warn,
            "Only 軒高 found, 最高高さ missing",
            None,
        ),
        (false, true) => check(
            "Key heights (軒高 + 最高高さ)",
            GateStatus::Warn,
            "Only 最高高さ found, 軒高 missing",
            None,
        ),
        (false, false) => check("Key heights (軒高 + 最高高さ)", GateStatus::Fail, "Neither 軒高 nor 最高高さ found", None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_views_fails() {
        let report = run_quality_gates(&[], None, &[], &[]);
        assert_eq!(report.overall, GateStatus::Fail);
    }

    #[test]
    fn overall_is_worst_of_checks() {
        let heights = vec![HeightParam {
            height_type: HeightType::EaveHeight,
            value: Some(5000.0),
            source_view: ViewType::Elevation,
            raw_text: "軒高=5000".into(),
        }];
        let report = run_quality_gates(&[], None, &[], &heights);
        assert_eq!(report.overall, GateStatus::Fail);
        let key_heights = report.checks.iter().find(|c| c.name.starts_with("Key heights")).unwrap();
        assert_eq!(key_heights.status, GateStatus::Warn);
    }
}
