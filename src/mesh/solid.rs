use geo::{BooleanOps, LineString, Polygon as GeoPolygon, Rect, coord};

use crate::error::PipelineError;
use crate::geometry::ring::shoelace_area;
use crate::mesh::surface::{Model, Surface};
use crate::mesh::wall::BorderWall;

/// Clip pieces below this area (m^2) are noise from the boolean op.
const AREA_EPS: f64 = 1e-6;
/// Tolerance for merging segment split parameters and for cell lookup.
const GEOM_EPS: f64 = 1e-9;

/// One planar-ish boundary polygon of a solid, counter-clockwise seen from
/// outside the volume.
#[derive(Debug, Clone)]
pub struct Face {
    pub ring: Vec<[f64; 3]>,
}

/// A closed, printable volume: terrain on top, flat base below, vertical
/// boundary along the polygon. Carries its recomputed elevation range.
#[derive(Debug, Clone)]
pub struct Solid {
    faces: Vec<Face>,
    elevation: (f64, f64),
}

impl Solid {
    pub fn faces(&self) -> &[Face] {
        &self.faces
    }

    /// Min/max z over the clipped result.
    pub fn elevation(&self) -> (f64, f64) {
        self.elevation
    }
}

/// Clip the two-layer model against the border wall, keeping the portion
/// enclosed by the wall.
///
/// The wall is vertical, so the cut reduces to clipping each grid cell
/// against the polygon in plan view: interior cells keep their full quad,
/// boundary cells keep the intersection piece with bilinear heights at the
/// new vertices, and the wall band is subdivided at every grid-line
/// crossing so its top edge meets the clipped surface exactly. Cells with a
/// missing corner stay gaps, as in the unclipped surface.
pub fn cut_model(model: &Model, wall: &BorderWall) -> Result<Solid, PipelineError> {
    let surface = model.surface();
    let zero = model.zero();

    if surface.ncols() < 2 || surface.nrows() < 2 {
        return Err(PipelineError::NoDataInSelection);
    }

    // An uncapped wall only closes the sides if its band spans the model
    if let Some((lo, hi)) = model.elevation()
        && (wall.z_bottom() > lo + GEOM_EPS || wall.z_top() < hi - GEOM_EPS)
    {
        return Err(PipelineError::DegenerateGeometry(format!(
            "border wall band {:.1} m .. {:.1} m does not span the model ({:.1} m .. {:.1} m)",
            wall.z_bottom(),
            wall.z_top(),
            lo,
            hi
        )));
    }

    // Work on a counter-clockwise ring; the wall band itself is already
    // winding-invariant.
    let mut ring: Vec<(f64, f64)> = wall.ring().to_vec();
    if shoelace_area(&ring) < 0.0 {
        ring.reverse();
    }
    let clip = GeoPolygon::new(LineString::from(ring.clone()), vec![]);

    let mut faces = Vec::new();

    for row in 0..surface.nrows() - 1 {
        for col in 0..surface.ncols() - 1 {
            let Some(cell) = Cell::at(surface, row, col) else {
                continue;
            };
            let rect = Rect::new(
                coord! { x: cell.x0, y: cell.ys },
                coord! { x: cell.x1, y: cell.yn },
            )
            .to_polygon();

            for piece in &clip.intersection(&rect).0 {
                let exterior = piece.exterior();
                let mut pts: Vec<(f64, f64)> =
                    exterior.0.iter().map(|c| (c.x, c.y)).collect();
                if pts.len() >= 2 && pts.first() == pts.last() {
                    pts.pop();
                }
                if pts.len() < 3 {
                    continue;
                }
                let area = shoelace_area(&pts);
                if area.abs() < AREA_EPS {
                    continue;
                }
                if area < 0.0 {
                    pts.reverse();
                }

                let top: Vec<[f64; 3]> = pts
                    .iter()
                    .map(|&(x, y)| [x, y, cell.interpolate(x, y)])
                    .collect();
                let bottom: Vec<[f64; 3]> =
                    pts.iter().rev().map(|&(x, y)| [x, y, zero]).collect();
                faces.push(Face { ring: top });
                faces.push(Face { ring: bottom });
            }
        }
    }

    let n = ring.len();
    for i in 0..n {
        let a = ring[i];
        let b = ring[(i + 1) % n];
        for (pa, pb) in subdivide_segment(surface, a, b) {
            let mid = ((pa.0 + pb.0) / 2.0, (pa.1 + pb.1) / 2.0);
            let Some(cell) = Cell::containing(surface, mid.0, mid.1) else {
                continue;
            };
            let za = cell.interpolate(pa.0, pa.1);
            let zb = cell.interpolate(pb.0, pb.1);
            // Outward for a counter-clockwise ring
            faces.push(Face {
                ring: vec![
                    [pa.0, pa.1, zero],
                    [pb.0, pb.1, zero],
                    [pb.0, pb.1, zb],
                    [pa.0, pa.1, za],
                ],
            });
        }
    }

    if faces.is_empty() {
        return Err(PipelineError::NoDataInSelection);
    }

    let mut lo = f64::MAX;
    let mut hi = f64::MIN;
    for face in &faces {
        for v in &face.ring {
            lo = lo.min(v[2]);
            hi = hi.max(v[2]);
        }
    }

    Ok(Solid {
        faces,
        elevation: (lo, hi),
    })
}

/// One grid cell with its corner heights. Only exists when all four
/// corners carry data.
struct Cell {
    x0: f64,
    x1: f64,
    /// North edge (larger y)
    yn: f64,
    /// South edge
    ys: f64,
    z_nw: f64,
    z_ne: f64,
    z_sw: f64,
    z_se: f64,
}

impl Cell {
    fn at(surface: &Surface, row: usize, col: usize) -> Option<Self> {
        let cell = Self {
            x0: surface.x_axis()[col],
            x1: surface.x_axis()[col + 1],
            yn: surface.y_axis()[row],
            ys: surface.y_axis()[row + 1],
            z_nw: surface.height(row, col),
            z_ne: surface.height(row, col + 1),
            z_sw: surface.height(row + 1, col),
            z_se: surface.height(row + 1, col + 1),
        };
        let complete = !(cell.z_nw.is_nan()
            || cell.z_ne.is_nan()
            || cell.z_sw.is_nan()
            || cell.z_se.is_nan());
        complete.then_some(cell)
    }

    fn containing(surface: &Surface, x: f64, y: f64) -> Option<Self> {
        let x_axis = surface.x_axis();
        let y_axis = surface.y_axis();

        let col = x_axis
            .partition_point(|&v| v <= x)
            .saturating_sub(1)
            .min(x_axis.len() - 2);
        if x < x_axis[col] - GEOM_EPS || x > x_axis[col + 1] + GEOM_EPS {
            return None;
        }

        // Row axis descends north to south
        let row = y_axis
            .partition_point(|&v| v > y)
            .saturating_sub(1)
            .min(y_axis.len() - 2);
        if y > y_axis[row] + GEOM_EPS || y < y_axis[row + 1] - GEOM_EPS {
            return None;
        }

        Self::at(surface, row, col)
    }

    /// Bilinear height inside the cell.
    fn interpolate(&self, x: f64, y: f64) -> f64 {
        let tx = ((x - self.x0) / (self.x1 - self.x0)).clamp(0.0, 1.0);
        let ty = ((y - self.ys) / (self.yn - self.ys)).clamp(0.0, 1.0);
        let south = self.z_sw * (1.0 - tx) + self.z_se * tx;
        let north = self.z_nw * (1.0 - tx) + self.z_ne * tx;
        south * (1.0 - ty) + north * ty
    }
}

/// Split a ring segment at every crossing of a grid line, so wall faces
/// never span more than one cell.
fn subdivide_segment(
    surface: &Surface,
    a: (f64, f64),
    b: (f64, f64),
) -> Vec<((f64, f64), (f64, f64))> {
    let dx = b.0 - a.0;
    let dy = b.1 - a.1;

    let mut ts = vec![0.0, 1.0];
    if dx.abs() > GEOM_EPS {
        for &x in surface.x_axis() {
            let t = (x - a.0) / dx;
            if t > 0.0 && t < 1.0 {
                ts.push(t);
            }
        }
    }
    if dy.abs() > GEOM_EPS {
        for &y in surface.y_axis() {
            let t = (y - a.1) / dy;
            if t > 0.0 && t < 1.0 {
                ts.push(t);
            }
        }
    }
    ts.sort_by(|p, q| p.total_cmp(q));
    ts.dedup_by(|p, q| (*p - *q).abs() < GEOM_EPS);

    ts.windows(2)
        .map(|w| {
            let at = |t: f64| (a.0 + dx * t, a.1 + dy * t);
            (at(w[0]), at(w[1]))
        })
        .filter(|(p, q)| (p.0 - q.0).abs() > GEOM_EPS || (p.1 - q.1).abs() > GEOM_EPS)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Ring;
    use crate::grid::{ClippedArea, clip_grid, parse_ascii_grid};
    use crate::mesh::{build_solid, fundament};

    fn square() -> Vec<(f64, f64)> {
        vec![
            (7.436137, 46.950273),
            (7.441129, 46.950273),
            (7.441129, 46.953691),
            (7.436137, 46.953691),
        ]
    }

    fn area_from(text: &str) -> ClippedArea {
        let entry = parse_ascii_grid(text).unwrap();
        let ring = Ring::new(&square()).unwrap();
        clip_grid(&entry.grid, &entry.meta, &ring)
    }

    fn sloped_area() -> ClippedArea {
        // 6x6, heights rise to the south-east; the polygon footprint and
        // its one-cell margin fit inside the coverage
        area_from(
            "\
ncols 6
nrows 6
xllcorner 599700
yllcorner 199800
cellsize 100
nodata_value -9999
0 1 2 3 4 5
6 7 8 9 10 11
12 13 14 15 16 17
18 19 20 21 22 23
24 25 26 27 28 29
30 31 32 33 34 35
",
        )
    }

    fn build(points: &[(f64, f64)]) -> Solid {
        let area = sloped_area();
        let (lo, hi) = area.height_range().unwrap();
        build_solid(&area, points, fundament(lo, hi), hi).unwrap()
    }

    #[test]
    fn test_vertical_extent_spans_zero_to_peak() {
        let area = sloped_area();
        // The clip window trims the outermost source row and column
        assert_eq!(area.height_range(), Some((1.0, 29.0)));

        let solid = build(&square());
        let (lo, hi) = solid.elevation();
        assert_eq!(lo, fundament(1.0, 29.0));
        // Peak height sampled inside the polygon, near the south-east corner
        assert!(hi > 28.0 && hi <= 29.0);
    }

    #[test]
    fn test_footprint_matches_polygon() {
        let solid = build(&square());
        let (mut min_x, mut max_x) = (f64::MAX, f64::MIN);
        let (mut min_y, mut max_y) = (f64::MAX, f64::MIN);
        for face in solid.faces() {
            for v in &face.ring {
                min_x = min_x.min(v[0]);
                max_x = max_x.max(v[0]);
                min_y = min_y.min(v[1]);
                max_y = max_y.max(v[1]);
            }
        }
        assert!((min_x - 599_810.0).abs() < 1e-6);
        assert!((max_x - 600_190.0).abs() < 1e-6);
        assert!((min_y - 199_910.0).abs() < 1e-6);
        assert!((max_y - 200_290.0).abs() < 1e-6);
    }

    #[test]
    fn test_reversed_ring_same_solid() {
        let forward = build(&square());
        let mut reversed_points = square();
        reversed_points.reverse();
        let reversed = build(&reversed_points);

        assert_eq!(forward.faces().len(), reversed.faces().len());
        assert_eq!(forward.elevation(), reversed.elevation());

        let centroids = |solid: &Solid| {
            let mut cs: Vec<(i64, i64, i64)> = solid
                .faces()
                .iter()
                .map(|f| {
                    let n = f.ring.len() as f64;
                    let (mut x, mut y, mut z) = (0.0, 0.0, 0.0);
                    for v in &f.ring {
                        x += v[0];
                        y += v[1];
                        z += v[2];
                    }
                    (
                        ((x / n) * 1e6).round() as i64,
                        ((y / n) * 1e6).round() as i64,
                        ((z / n) * 1e6).round() as i64,
                    )
                })
                .collect();
            cs.sort_unstable();
            cs
        };
        assert_eq!(centroids(&forward), centroids(&reversed));
    }

    #[test]
    fn test_missing_cells_leave_gaps() {
        let gappy = area_from(
            "\
ncols 6
nrows 6
xllcorner 599700
yllcorner 199800
cellsize 100
nodata_value -9999
0 1 2 3 4 5
6 7 8 9 10 11
12 13 -9999 15 16 17
18 19 20 21 22 23
24 25 26 27 28 29
30 31 32 33 34 35
",
        );
        let full = build(&square());
        let (lo, hi) = gappy.height_range().unwrap();
        let solid = build_solid(&gappy, &square(), fundament(lo, hi), hi).unwrap();
        // The four cells around the missing sample become gaps
        assert!(solid.faces().len() < full.faces().len());
    }

    #[test]
    fn test_all_missing_fails() {
        let empty = area_from(
            "\
ncols 2
nrows 2
xllcorner 599800
yllcorner 199900
cellsize 300
nodata_value -9999
-9999 -9999
-9999 -9999
",
        );
        let err = build_solid(&empty, &square(), -1.0, 0.0).unwrap_err();
        assert!(matches!(err, PipelineError::NoDataInSelection));
    }

    #[test]
    fn test_degenerate_polygon_fails() {
        let area = sloped_area();
        let line = [(7.436137, 46.950273), (7.441129, 46.950273)];
        let err = build_solid(&area, &line, -1.0, 8.0).unwrap_err();
        assert!(matches!(err, PipelineError::DegenerateGeometry(_)));
    }

    #[test]
    fn test_interior_cell_keeps_full_quad() {
        let solid = build(&square());
        // At least one top face is a full grid-aligned cell quad
        let full_quads = solid
            .faces()
            .iter()
            .filter(|f| {
                f.ring.len() == 4
                    && f.ring.iter().all(|v| {
                        grid_aligned(v[0], 599_700.0, 100.0)
                            && grid_aligned(v[1], 199_800.0, 100.0)
                    })
            })
            .count();
        assert!(full_quads > 0);
    }

    fn grid_aligned(v: f64, origin: f64, step: f64) -> bool {
        ((v - origin) / step).fract().abs() < 1e-9
    }
}
