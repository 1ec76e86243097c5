use anyhow::{Context, Result, bail};
use serde::Deserialize;

/// The slice of GeoJSON this tool accepts: a polygon, a feature wrapping
/// one, or a feature collection whose first feature wraps one.
#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum GeoJson {
    Polygon {
        coordinates: Vec<Vec<[f64; 2]>>,
    },
    Feature {
        geometry: Box<GeoJson>,
    },
    FeatureCollection {
        features: Vec<GeoJson>,
    },
    MultiPolygon {
        coordinates: Vec<Vec<Vec<[f64; 2]>>>,
    },
}

/// Extract the outer polygon ring from a GeoJSON document.
///
/// Returns (lng, lat) pairs in drawing order. A repeated closing vertex is
/// passed through untouched; the ring handling downstream tolerates it.
/// Interior rings (holes) are rejected: the pipeline clips against a single
/// boundary.
pub fn parse_polygon(text: &str) -> Result<Vec<(f64, f64)>> {
    let document: GeoJson = serde_json::from_str(text).context("Failed to parse GeoJSON")?;
    outer_ring(document)
}

fn outer_ring(document: GeoJson) -> Result<Vec<(f64, f64)>> {
    match document {
        GeoJson::Polygon { coordinates } => {
            if coordinates.is_empty() {
                bail!("Polygon has no rings");
            }
            if coordinates.len() > 1 {
                bail!("Polygons with holes are not supported");
            }
            Ok(coordinates[0].iter().map(|&[lng, lat]| (lng, lat)).collect())
        }
        GeoJson::Feature { geometry } => outer_ring(*geometry),
        GeoJson::FeatureCollection { mut features } => {
            if features.is_empty() {
                bail!("FeatureCollection is empty");
            }
            outer_ring(features.remove(0))
        }
        GeoJson::MultiPolygon { .. } => {
            bail!("MultiPolygon is not supported; draw a single polygon")
        }
    }
}
