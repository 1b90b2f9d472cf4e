//! Contour shape metrics and tip selection

use crate::Result;
use opencv::{
    core::{Point, Vector},
    imgproc,
};
use trailblazer_core::{PixelPoint, ScreenPoint};

/// Shape descriptors of one contour
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShapeMetrics {
    pub area: f64,
    /// Contour area over bounding-box area
    pub extent: f64,
    /// Contour area over convex-hull area
    pub solidity: f64,
    /// `4πA / P²`, 1.0 for a perfect circle
    pub circularity: f64,
    pub perimeter: f64,
}

impl ShapeMetrics {
    /// Measure a contour; `None` for degenerate geometry (zero area hull or perimeter)
    pub fn measure(contour: &Vector<Point>) -> Result<Option<Self>> {
        let area = imgproc::contour_area(contour, false)?;
        let rect = imgproc::bounding_rect(contour)?;
        let rect_area = rect.width as f64 * rect.height as f64;

        let mut hull = Vector::<Point>::new();
        imgproc::convex_hull(contour, &mut hull, false, true)?;
        let hull_area = imgproc::contour_area(&hull, false)?;
        let perimeter = imgproc::arc_length(contour, true)?;

        if rect_area <= 0.0 || hull_area <= 0.0 || perimeter <= 0.0 {
            return Ok(None);
        }

        Ok(Some(Self {
            area,
            extent: area / rect_area,
            solidity: area / hull_area,
            circularity: 4.0 * std::f64::consts::PI * area / (perimeter * perimeter),
            perimeter,
        }))
    }

    /// Ranking score among accepted blobs
    pub fn score(&self) -> f64 {
        self.area * (0.5 + 0.3 * self.extent + 0.2 * self.solidity)
    }
}

/// Interior angle in degrees at `v` between the edges to `prev` and `next`
pub fn vertex_angle(prev: PixelPoint, v: PixelPoint, next: PixelPoint) -> f64 {
    let (ax, ay) = ((prev.x - v.x) as f64, (prev.y - v.y) as f64);
    let (bx, by) = ((next.x - v.x) as f64, (next.y - v.y) as f64);
    let norm = ax.hypot(ay) * bx.hypot(by);
    if norm == 0.0 {
        return 180.0;
    }
    ((ax * bx + ay * by) / norm).clamp(-1.0, 1.0).acos().to_degrees()
}

/// Twice the signed polygon area (shoelace)
fn signed_area2(polygon: &[PixelPoint]) -> f64 {
    let n = polygon.len();
    (0..n)
        .map(|i| {
            let (a, b) = (polygon[i], polygon[(i + 1) % n]);
            a.x as f64 * b.y as f64 - b.x as f64 * a.y as f64
        })
        .sum()
}

/// The arrow tip of a blob.
///
/// Among the convex vertices of `polygon` the sharpest one under
/// `max_angle` wins. Without such a vertex the contour point farthest from
/// `center` is used.
pub fn select_tip(
    polygon: &[PixelPoint],
    contour: &[PixelPoint],
    center: ScreenPoint,
    max_angle: f64,
) -> Option<PixelPoint> {
    let n = polygon.len();
    if n >= 3 {
        let orientation = signed_area2(polygon).signum();
        let sharpest = (0..n)
            .filter_map(|i| {
                let prev = polygon[(i + n - 1) % n];
                let v = polygon[i];
                let next = polygon[(i + 1) % n];
                let cross = (v.x - prev.x) as f64 * (next.y - v.y) as f64
                    - (v.y - prev.y) as f64 * (next.x - v.x) as f64;
                if orientation == 0.0 || cross.signum() != orientation {
                    return None;
                }
                let angle = vertex_angle(prev, v, next);
                (angle < max_angle).then_some((v, angle))
            })
            .min_by(|a, b| a.1.total_cmp(&b.1));

        if let Some((tip, _)) = sharpest {
            return Some(tip);
        }
    }

    contour.iter().copied().max_by(|a, b| {
        let da = a.to_screen().distance_to(center);
        let db = b.to_screen().distance_to(center);
        da.total_cmp(&db)
    })
}

pub fn to_pixels(points: &Vector<Point>) -> Vec<PixelPoint> {
    points.iter().map(|p| PixelPoint::new(p.x, p.y)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use trailblazer_core::BearingSample;

    fn arrow() -> Vec<PixelPoint> {
        vec![
            PixelPoint::new(160, 100),
            PixelPoint::new(125, 80),
            PixelPoint::new(90, 80),
            PixelPoint::new(90, 120),
            PixelPoint::new(125, 120),
        ]
    }

    #[test]
    fn test_acute_vertex_beats_centroid() {
        let polygon = arrow();
        let center = ScreenPoint::new(100.0, 160.0);

        let tip = select_tip(&polygon, &polygon, center, 70.0).unwrap();
        assert_eq!(tip, PixelPoint::new(160, 100));

        let bearing = BearingSample::between(center, tip).degrees;
        assert!((bearing - 45.0).abs() < 1e-9, "bearing {bearing}");

        // The centroid would point much closer to straight up
        let centroid = PixelPoint::new(115, 100);
        assert!(BearingSample::between(center, centroid).degrees < 20.0);
    }

    #[test]
    fn test_winding_order_does_not_matter() {
        let mut polygon = arrow();
        polygon.reverse();
        let tip = select_tip(&polygon, &polygon, ScreenPoint::new(100.0, 160.0), 70.0);
        assert_eq!(tip, Some(PixelPoint::new(160, 100)));
    }

    #[test]
    fn test_reflex_vertex_is_not_a_tip() {
        // Square with a narrow notch cut into its top edge; the notch
        // bottom is the sharpest vertex but it is concave
        let polygon = vec![
            PixelPoint::new(0, 0),
            PixelPoint::new(18, 0),
            PixelPoint::new(20, 30),
            PixelPoint::new(22, 0),
            PixelPoint::new(40, 0),
            PixelPoint::new(40, 40),
            PixelPoint::new(0, 40),
        ];
        let tip = select_tip(&polygon, &polygon, ScreenPoint::new(15.0, -5.0), 70.0);
        assert_eq!(tip, Some(PixelPoint::new(40, 40)));
    }

    #[test]
    fn test_blunt_shape_falls_back_to_farthest_point() {
        let square = vec![
            PixelPoint::new(0, 0),
            PixelPoint::new(10, 0),
            PixelPoint::new(10, 10),
            PixelPoint::new(0, 10),
        ];
        let tip = select_tip(&square, &square, ScreenPoint::new(-5.0, -5.0), 70.0);
        assert_eq!(tip, Some(PixelPoint::new(10, 10)));
        assert_eq!(select_tip(&[], &[], ScreenPoint::default(), 70.0), None);
    }

    #[test]
    fn test_vertex_angle() {
        let right = vertex_angle(PixelPoint::new(1, 0), PixelPoint::new(0, 0), PixelPoint::new(0, 1));
        assert!((right - 90.0).abs() < 1e-9);
    }
}
