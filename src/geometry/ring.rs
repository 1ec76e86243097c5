use geo::winding_order::WindingOrder;
use geo::{LineString, Winding};

use crate::error::PipelineError;
use crate::geometry::projection::wgs84_to_lv03;

/// Vertices closer than this (in degrees) count as the same point.
const COINCIDENT_EPS: f64 = 1e-9;

/// Smallest projected ring area (m^2) we accept for extrusion.
const MIN_RING_AREA_M2: f64 = 1.0;

/// A polygon ring as drawn by the user: ordered (lng, lat) vertices.
///
/// The ring is stored open; a repeated closing vertex in the input is
/// tolerated and stripped. Winding is preserved exactly as supplied, since
/// the border wall extrusion compensates for it.
#[derive(Debug, Clone)]
pub struct Ring {
    points: Vec<(f64, f64)>,
    ccw: bool,
}

impl Ring {
    /// Validate and normalize an input ring.
    ///
    /// Fails with [`PipelineError::DegenerateGeometry`] when fewer than 3
    /// distinct vertices remain or the projected area is below 1 m^2.
    pub fn new(points: &[(f64, f64)]) -> Result<Self, PipelineError> {
        let mut pts: Vec<(f64, f64)> = points.to_vec();
        if pts.len() >= 2 && coincident(pts[0], pts[pts.len() - 1]) {
            pts.pop();
        }

        if distinct_count(&pts) < 3 {
            return Err(PipelineError::DegenerateGeometry(format!(
                "need at least 3 distinct vertices, got {}",
                distinct_count(&pts)
            )));
        }

        let projected = project_ring(&pts);
        let area = shoelace_area(&projected).abs();
        if area < MIN_RING_AREA_M2 {
            return Err(PipelineError::DegenerateGeometry(format!(
                "projected ring area {area:.3} m^2 is below {MIN_RING_AREA_M2} m^2"
            )));
        }

        // geo only reports winding for closed rings
        let mut coords: Vec<geo::Coord<f64>> = pts
            .iter()
            .map(|&(lng, lat)| geo::coord! { x: lng, y: lat })
            .collect();
        coords.push(coords[0]);
        let line = LineString::new(coords);
        let ccw = match line.winding_order() {
            Some(WindingOrder::CounterClockwise) => true,
            Some(WindingOrder::Clockwise) => false,
            None => {
                return Err(PipelineError::DegenerateGeometry(
                    "ring winding is undefined (collinear vertices)".to_string(),
                ));
            }
        };

        Ok(Self { points: pts, ccw })
    }

    /// Open ring vertices as (lng, lat), in input order.
    pub fn vertices(&self) -> &[(f64, f64)] {
        &self.points
    }

    /// Winding of the geographic ring as the user drew it.
    pub fn is_ccw(&self) -> bool {
        self.ccw
    }

    /// Project every vertex into the local planar frame, in ring order.
    pub fn project_lv03(&self) -> Vec<(f64, f64)> {
        project_ring(&self.points)
    }
}

fn project_ring(points: &[(f64, f64)]) -> Vec<(f64, f64)> {
    points
        .iter()
        .map(|&(lng, lat)| wgs84_to_lv03(lat, lng))
        .collect()
}

fn coincident(a: (f64, f64), b: (f64, f64)) -> bool {
    (a.0 - b.0).abs() < COINCIDENT_EPS && (a.1 - b.1).abs() < COINCIDENT_EPS
}

fn distinct_count(points: &[(f64, f64)]) -> usize {
    let mut distinct: Vec<(f64, f64)> = Vec::with_capacity(points.len());
    for &p in points {
        if !distinct.iter().any(|&q| coincident(p, q)) {
            distinct.push(p);
        }
    }
    distinct.len()
}

/// Signed shoelace area; positive for counter-clockwise rings.
pub fn shoelace_area(points: &[(f64, f64)]) -> f64 {
    let n = points.len();
    if n < 3 {
        return 0.0;
    }
    let mut sum = 0.0;
    for i in 0..n {
        let (x0, y0) = points[i];
        let (x1, y1) = points[(i + 1) % n];
        sum += x0 * y1 - x1 * y0;
    }
    sum / 2.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square() -> Vec<(f64, f64)> {
        vec![
            (7.436137, 46.950273),
            (7.441129, 46.950273),
            (7.441129, 46.953691),
            (7.436137, 46.953691),
        ]
    }

    #[test]
    fn test_open_and_closed_rings_equal() {
        let open = Ring::new(&square()).unwrap();
        let mut closed = square();
        closed.push(closed[0]);
        let closed = Ring::new(&closed).unwrap();
        assert_eq!(open.vertices(), closed.vertices());
    }

    #[test]
    fn test_winding_detection() {
        let ccw = Ring::new(&square()).unwrap();
        assert!(ccw.is_ccw());

        let mut reversed = square();
        reversed.reverse();
        let cw = Ring::new(&reversed).unwrap();
        assert!(!cw.is_ccw());
    }

    #[test]
    fn test_too_few_vertices() {
        let result = Ring::new(&[(7.43, 46.95), (7.44, 46.95)]);
        assert!(matches!(
            result,
            Err(crate::error::PipelineError::DegenerateGeometry(_))
        ));
    }

    #[test]
    fn test_collapsed_ring() {
        // Distinct vertices, but all of them project onto the same meter
        let result = Ring::new(&[
            (7.4361370, 46.9502730),
            (7.4361371, 46.9502730),
            (7.4361370, 46.9502731),
        ]);
        assert!(matches!(
            result,
            Err(crate::error::PipelineError::DegenerateGeometry(_))
        ));
    }

    #[test]
    fn test_projected_ring_vertices() {
        let ring = Ring::new(&square()).unwrap();
        let projected = ring.project_lv03();
        assert_eq!(projected[0], (599_810.0, 199_910.0));
        assert_eq!(projected[2], (600_190.0, 200_290.0));
    }

    #[test]
    fn test_shoelace_sign() {
        let ccw = [(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0)];
        assert!(shoelace_area(&ccw) > 0.0);
        let cw = [(0.0, 0.0), (0.0, 1.0), (1.0, 1.0), (1.0, 0.0)];
        assert!(shoelace_area(&cw) < 0.0);
    }
}
