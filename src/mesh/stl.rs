use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::error::PipelineError;
use crate::mesh::Triangle;
use crate::mesh::solid::{Face, Solid};

/// STL flavor to emit. Binary is the default; ASCII is available for
/// inspection and tools that want text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StlFormat {
    #[default]
    Binary,
    Ascii,
}

/// Reduce the solid's boundary faces to plain triangles.
///
/// Triangles pass through, quads split along a fixed diagonal, larger faces
/// (clipped boundary cells) are ear-cut in plan view. Faces that collapse
/// under triangulation are dropped best-effort; no further repair is
/// attempted.
pub fn triangulate(solid: &Solid) -> Vec<Triangle> {
    let mut triangles = Vec::new();
    for face in solid.faces() {
        triangulate_face(face, &mut triangles);
    }
    triangles.retain(is_printable);
    triangles
}

fn triangulate_face(face: &Face, out: &mut Vec<Triangle>) {
    let ring = &face.ring;
    match ring.len() {
        0 | 1 | 2 => {}
        3 => out.push(Triangle::from_f64(ring[0], ring[1], ring[2])),
        4 => {
            out.push(Triangle::from_f64(ring[0], ring[1], ring[2]));
            out.push(Triangle::from_f64(ring[0], ring[2], ring[3]));
        }
        _ => {
            let mut flat = Vec::with_capacity(ring.len() * 2);
            for v in ring {
                flat.push(v[0]);
                flat.push(v[1]);
            }
            let holes: Vec<usize> = Vec::new();
            let indices = earcutr::earcut(&flat, &holes, 2).unwrap_or_default();
            for tri in indices.chunks(3) {
                if let [a, b, c] = *tri {
                    out.push(Triangle::from_f64(ring[a], ring[b], ring[c]));
                }
            }
        }
    }
}

/// Degenerate or non-finite facets would break downstream slicers.
fn is_printable(tri: &Triangle) -> bool {
    let finite = tri
        .vertices
        .iter()
        .flatten()
        .chain(tri.normal.iter())
        .all(|c| c.is_finite());
    finite && triangle_area(&tri.vertices) > 1e-10
}

fn triangle_area(vertices: &[[f32; 3]; 3]) -> f32 {
    let [v0, v1, v2] = vertices;
    let a = [v1[0] - v0[0], v1[1] - v0[1], v1[2] - v0[2]];
    let b = [v2[0] - v0[0], v2[1] - v0[1], v2[2] - v0[2]];
    let cx = a[1] * b[2] - a[2] * b[1];
    let cy = a[2] * b[0] - a[0] * b[2];
    let cz = a[0] * b[1] - a[1] * b[0];
    0.5 * (cx * cx + cy * cy + cz * cz).sqrt()
}

/// Serialize the solid as a binary STL byte stream.
///
/// Layout: 80-byte header, u32 facet count, then 50 bytes per facet
/// (normal, three vertices, attribute word), all little endian.
pub fn export_stl(solid: &Solid) -> Result<Vec<u8>, PipelineError> {
    let triangles = triangulate(solid);
    if triangles.is_empty() {
        return Err(PipelineError::DegenerateGeometry(
            "triangulation produced no printable facets".to_string(),
        ));
    }

    let mut bytes = Vec::with_capacity(estimate_stl_size(triangles.len()));
    let mut header = [0u8; 80];
    let tag = b"alpenstein terrain model";
    header[..tag.len()].copy_from_slice(tag);
    bytes.extend_from_slice(&header);
    bytes.extend_from_slice(&(triangles.len() as u32).to_le_bytes());

    for tri in &triangles {
        for &n in &tri.normal {
            bytes.extend_from_slice(&n.to_le_bytes());
        }
        for vertex in &tri.vertices {
            for &coord in vertex {
                bytes.extend_from_slice(&coord.to_le_bytes());
            }
        }
        bytes.extend_from_slice(&[0u8, 0u8]);
    }

    Ok(bytes)
}

/// Serialize the solid as an ASCII STL document.
pub fn export_stl_ascii(solid: &Solid) -> Result<String, PipelineError> {
    let triangles = triangulate(solid);
    if triangles.is_empty() {
        return Err(PipelineError::DegenerateGeometry(
            "triangulation produced no printable facets".to_string(),
        ));
    }

    let mut text = String::from("solid alpenstein\n");
    for tri in &triangles {
        let [nx, ny, nz] = tri.normal;
        text.push_str(&format!("facet normal {nx:e} {ny:e} {nz:e}\n"));
        text.push_str("  outer loop\n");
        for [x, y, z] in tri.vertices {
            text.push_str(&format!("    vertex {x:e} {y:e} {z:e}\n"));
        }
        text.push_str("  endloop\nendfacet\n");
    }
    text.push_str("endsolid alpenstein\n");
    Ok(text)
}

/// Write the STL artifact to its output slot.
///
/// The slot holds at most one artifact: any previous file at `path` is
/// removed before the new bytes are written.
pub fn write_stl(path: &Path, solid: &Solid, format: StlFormat) -> Result<(), PipelineError> {
    clear_slot(path)?;
    if let Some(dir) = path.parent()
        && !dir.as_os_str().is_empty()
    {
        std::fs::create_dir_all(dir)?;
    }

    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    match format {
        StlFormat::Binary => writer.write_all(&export_stl(solid)?)?,
        StlFormat::Ascii => writer.write_all(export_stl_ascii(solid)?.as_bytes())?,
    }
    writer.flush()?;
    Ok(())
}

/// Drop whatever artifact currently occupies the slot.
pub fn clear_slot(path: &Path) -> Result<(), PipelineError> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

/// Byte size of a binary STL with the given facet count.
pub fn estimate_stl_size(triangle_count: usize) -> usize {
    80 + 4 + triangle_count * 50
}
