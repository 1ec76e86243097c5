pub mod solid;
pub mod stl;
pub mod surface;
pub mod wall;

pub use solid::{Face, Solid, cut_model};
pub use stl::{StlFormat, export_stl, export_stl_ascii, triangulate, write_stl};
pub use surface::{Model, Surface};
pub use wall::BorderWall;

use crate::error::PipelineError;
use crate::geometry::Ring;
use crate::grid::ClippedArea;

/// A triangle for STL output, f32 per the format
#[derive(Debug, Clone, PartialEq)]
pub struct Triangle {
    /// Three vertices: [[x, y, z]; 3]
    pub vertices: [[f32; 3]; 3],
    /// Unit normal from the vertex winding (right-hand rule)
    pub normal: [f32; 3],
}

impl Triangle {
    /// Build from f64 pipeline coordinates, narrowing at the boundary.
    pub fn from_f64(v0: [f64; 3], v1: [f64; 3], v2: [f64; 3]) -> Self {
        let vertices = [narrow(v0), narrow(v1), narrow(v2)];
        let normal = winding_normal(&vertices);
        Self { vertices, normal }
    }
}

fn narrow(v: [f64; 3]) -> [f32; 3] {
    [v[0] as f32, v[1] as f32, v[2] as f32]
}

fn winding_normal(vertices: &[[f32; 3]; 3]) -> [f32; 3] {
    let [v0, v1, v2] = vertices;
    let u = [v1[0] - v0[0], v1[1] - v0[1], v1[2] - v0[2]];
    let v = [v2[0] - v0[0], v2[1] - v0[1], v2[2] - v0[2]];

    let nx = u[1] * v[2] - u[2] * v[1];
    let ny = u[2] * v[0] - u[0] * v[2];
    let nz = u[0] * v[1] - u[1] * v[0];

    let len = (nx * nx + ny * ny + nz * nz).sqrt();
    if len > 1e-12 {
        [nx / len, ny / len, nz / len]
    } else {
        [0.0, 0.0, 1.0]
    }
}

/// Base elevation for the printed model: the lowest terrain point minus a
/// 10% margin of the elevation span, so the model gets a flat fundament
/// below its deepest valley.
pub fn fundament(min_z: f64, max_z: f64) -> f64 {
    min_z - 0.1 * (max_z - min_z)
}

/// Turn a clipped height field and the user's polygon into one watertight
/// solid.
///
/// `zero` is the base-plane elevation (see [`fundament`]) and `height` the
/// highest terrain point of the area; both are supplied by the caller. The
/// polygon may repeat its first vertex and may be drawn in either winding.
pub fn build_solid(
    area: &ClippedArea,
    points: &[(f64, f64)],
    zero: f64,
    height: f64,
) -> Result<Solid, PipelineError> {
    let ring = Ring::new(points)?;
    if area.height_range().is_none() {
        return Err(PipelineError::NoDataInSelection);
    }

    let surface = Surface::from_area(area);
    let model = Model::over_base(surface, zero);
    let wall = BorderWall::from_ring(&ring, zero, height);
    cut_model(&model, &wall)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_triangle_normal_up() {
        let tri = Triangle::from_f64([0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]);
        assert!(tri.normal[0].abs() < 1e-6);
        assert!(tri.normal[1].abs() < 1e-6);
        assert!((tri.normal[2] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_triangle_normal_flips_with_winding() {
        let tri = Triangle::from_f64([0.0, 0.0, 0.0], [0.0, 1.0, 0.0], [1.0, 0.0, 0.0]);
        assert!((tri.normal[2] + 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_fundament_margin() {
        assert!((fundament(0.0, 24.0) + 2.4).abs() < 1e-12);
        assert_eq!(fundament(400.0, 900.0), 350.0);
        // Flat terrain still yields a valid base plane
        assert_eq!(fundament(500.0, 500.0), 500.0);
    }
}
