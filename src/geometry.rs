//! Core geometric primitives shared by every component.
//!
//! All coordinates are in PDF points unless documented otherwise. A
//! *mediabox* frame is the raw coordinate space of the page; a *visual*
//! frame applies the page-rotation transform so the drawing reads upright.

use serde::{Deserialize, Serialize};

/// A 2D point in either the mediabox or visual frame, depending on context.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn dist(&self, other: &Point) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }
}

/// A 3D point used by the reconstructed structural model.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point3D {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Point3D {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn dist(&self, other: &Point3D) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        let dz = self.z - other.z;
        (dx * dx + dy * dy + dz * dz).sqrt()
    }
}

/// Axis-aligned bounding box with x0<=x1, y0<=y1.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BBox {
    pub x0: f64,
    pub y0: f64,
    pub x1: f64,
    pub y1: f64,
}

impl BBox {
    pub fn new(x0: f64, y0: f64, x1: f64, y1: f64) -> Self {
        Self {
            x0: x0.min(x1),
            y0: y0.min(y1),
            x1: x0.max(x1),
            y1: y0.max(y1),
        }
    }

    pub fn center(&self) -> Point {
        Point::new((self.x0 + self.x1) / 2.0, (self.y0 + self.y1) / 2.0)
    }

    pub fn width(&self) -> f64 {
        self.x1 - self.x0
    }

    pub fn height(&self) -> f64 {
        self.y1 - self.y0
    }

    pub fn contains_point(&self, p: &Point) -> bool {
        p.x >= self.x0 && p.x <= self.x1 && p.y >= self.y0 && p.y <= self.y1
    }

    pub fn is_empty(&self) -> bool {
        self.x1 <= self.x0 || self.y1 <= self.y0
    }

    /// Expand by `margin` on every side.
    pub fn inflate(&self, margin: f64) -> BBox {
        BBox::new(self.x0 - margin, self.y0 - margin, self.x1 + margin, self.y1 + margin)
    }

    /// Bounding box of a set of points.
    pub fn bounding(points: &[Point]) -> Option<BBox> {
        let mut it = points.iter();
        let first = it.next()?;
        let mut b = BBox::new(first.x, first.y, first.x, first.y);
        for p in it {
            b.x0 = b.x0.min(p.x);
            b.y0 = b.y0.min(p.y);
            b.x1 = b.x1.max(p.x);
            b.y1 = b.y1.max(p.y);
        }
        Some(b)
    }
}

/// A straight vector line segment, as drawn in the source PDF.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Line {
    pub p1: Point,
    pub p2: Point,
    pub stroke_width: f64,
}

impl Line {
    pub fn new(p1: Point, p2: Point, stroke_width: f64) -> Self {
        Self { p1, p2, stroke_width }
    }

    pub fn length(&self) -> f64 {
        self.p1.dist(&self.p2)
    }

    /// Angle in degrees, normalized to [0, 360).
    pub fn angle(&self) -> f64 {
        let dx = self.p2.x - self.p1.x;
        let dy = self.p2.y - self.p1.y;
        let a = dy.atan2(dx).to_degrees();
        if a < 0.0 {
            a + 360.0
        } else {
            a
        }
    }

    pub fn midpoint(&self) -> Point {
        Point::new((self.p1.x + self.p2.x) / 2.0, (self.p1.y + self.p2.y) / 2.0)
    }

    /// True when the line's orientation (mod 180) is within `tolerance_deg`
    /// of horizontal (0 / 180).
    pub fn is_horizontal(&self, tolerance_deg: f64) -> bool {
        let a = self.angle() % 180.0;
        a <= tolerance_deg || a >= 180.0 - tolerance_deg
    }

    /// True when the line's orientation (mod 180) is within `tolerance_deg`
    /// of vertical (90).
    pub fn is_vertical(&self, tolerance_deg: f64) -> bool {
        let a = self.angle() % 180.0;
        (a - 90.0).abs() <= tolerance_deg
    }

    /// Perpendicular distance from `p` to the line segment, clamping the
    /// projection parameter to [0, 1] so the result is distance-to-segment,
    /// not distance-to-infinite-line.
    pub fn point_distance(&self, p: &Point) -> f64 {
        let dx = self.p2.x - self.p1.x;
        let dy = self.p2.y - self.p1.y;
        let len_sq = dx * dx + dy * dy;
        if len_sq <= f64::EPSILON {
            return self.p1.dist(p);
        }
        let t = ((p.x - self.p1.x) * dx + (p.y - self.p1.y) * dy) / len_sq;
        let t = t.clamp(0.0, 1.0);
        let proj = Point::new(self.p1.x + t * dx, self.p1.y + t * dy);
        proj.dist(p)
    }
}

/// Page rotation, as read from the PDF page dictionary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rotation {
    R0,
    R90,
    R180,
    R270,
}

impl Rotation {
    pub fn from_degrees(deg: i64) -> Rotation {
        match ((deg % 360) + 360) % 360 {
            90 => Rotation::R90,
            180 => Rotation::R180,
            270 => Rotation::R270,
            _ => Rotation::R0,
        }
    }

    pub fn degrees(&self) -> i64 {
        match self {
            Rotation::R0 => 0,
            Rotation::R90 => 90,
            Rotation::R180 => 180,
            Rotation::R270 => 270,
        }
    }

    /// Whether this rotation swaps the visual X/Y axes relative to mediabox.
    pub fn swaps_axes(&self) -> bool {
        matches!(self, Rotation::R90 | Rotation::R270)
    }
}

/// Affine transform pair between a page's mediabox frame and its visual
/// (upright, as displayed) frame. Built once per page from (rotation,
/// mediabox dimensions) and reused everywhere rotation-aware coordinates
/// are needed, per the single-source-of-truth design note.
#[derive(Debug, Clone, Copy)]
pub struct PageTransform {
    rotation: Rotation,
    media_width: f64,
    media_height: f64,
}

impl PageTransform {
    pub fn new(rotation: Rotation, media_width: f64, media_height: f64) -> Self {
        Self {
            rotation,
            media_width,
            media_height,
        }
    }

    pub fn rotation(&self) -> Rotation {
        self.rotation
    }

    /// Visual-frame page width.
    pub fn visual_width(&self) -> f64 {
        if self.rotation.swaps_axes() {
            self.media_height
        } else {
            self.media_width
        }
    }

    /// Visual-frame page height.
    pub fn visual_height(&self) -> f64 {
        if self.rotation.swaps_axes() {
            self.media_width
        } else {
            self.media_height
        }
    }

    /// Map a mediabox-frame point into the visual frame.
    pub fn to_visual(&self, p: Point) -> Point {
        let (w, h) = (self.media_width, self.media_height);
        match self.rotation {
            Rotation::R0 => Point::new(p.x, h - p.y),
            Rotation::R90 => Point::new(p.y, p.x),
            Rotation::R180 => Point::new(w - p.x, p.y),
            Rotation::R270 => Point::new(h - p.y, w - p.x),
        }
    }

    /// Map a visual-frame point back into the mediabox frame. Exact inverse
    /// of `to_visual` for each of the four rotations.
    pub fn to_mediabox(&self, p: Point) -> Point {
        let (w, h) = (self.media_width, self.media_height);
        match self.rotation {
            Rotation::R0 => Point::new(p.x, h - p.y),
            Rotation::R90 => Point::new(p.y, p.x),
            Rotation::R180 => Point::new(w - p.x, p.y),
            Rotation::R270 => Point::new(w - p.y, h - p.x),
        }
    }

    /// Map a visual-frame rectangle back to a mediabox-frame bounding box by
    /// transforming all four corners and bounding the result.
    pub fn visual_rect_to_mediabox(&self, rect: BBox) -> BBox {
        let corners = [
            Point::new(rect.x0, rect.y0),
            Point::new(rect.x1, rect.y0),
            Point::new(rect.x1, rect.y1),
            Point::new(rect.x0, rect.y1),
        ];
        let mapped: Vec<Point> = corners.iter().map(|c| self.to_mediabox(*c)).collect();
        BBox::bounding(&mapped).expect("four corners always yield a bbox")
    }
}

/// Euclidean distance between two points (free function mirroring the
/// Python `dist` helper for call sites that don't otherwise need a Point).
pub fn dist(a: Point, b: Point) -> f64 {
    a.dist(&b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bbox_normalizes_corners() {
        let b = BBox::new(10.0, 10.0, 0.0, 0.0);
        assert_eq!(b.x0, 0.0);
        assert_eq!(b.y0, 0.0);
        assert_eq!(b.x1, 10.0);
        assert_eq!(b.y1, 10.0);
    }

    #[test]
    fn line_angle_and_orientation() {
        let horiz = Line::new(Point::new(0.0, 0.0), Point::new(10.0, 0.0), 0.3);
        assert!(horiz.is_horizontal(5.0));
        assert!(!horiz.is_vertical(5.0));

        let vert = Line::new(Point::new(0.0, 0.0), Point::new(0.0, 10.0), 0.3);
        assert!(vert.is_vertical(5.0));
        assert!(!vert.is_horizontal(5.0));
    }

    #[test]
    fn point_distance_clamps_to_segment() {
        let line = Line::new(Point::new(0.0, 0.0), Point::new(10.0, 0.0), 0.3);
        // Point beyond the segment's end projects to the endpoint, not the
        // infinite line.
        let d = line.point_distance(&Point::new(20.0, 0.0));
        assert!((d - 10.0).abs() < 1e-9);
    }

    #[test]
    fn rotation_round_trip_all_four() {
        let p = Point::new(37.5, 91.2);
        for rot in [Rotation::R0, Rotation::R90, Rotation::R180, Rotation::R270] {
            let t = PageTransform::new(rot, 595.0, 842.0);
            let v = t.to_visual(p);
            let back = t.to_mediabox(v);
            assert!((back.x - p.x).abs() < 1e-6, "rotation {:?}", rot);
            assert!((back.y - p.y).abs() < 1e-6, "rotation {:?}", rot);
        }
    }

    #[test]
    fn swaps_axes_only_for_90_270() {
        assert!(!Rotation::R0.swaps_axes());
        assert!(Rotation::R90.swaps_axes());
        assert!(!Rotation::R180.swaps_axes());
        assert!(Rotation::R270.swaps_axes());
    }
}
