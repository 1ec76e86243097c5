//! alpenstein - Generate 3D-printable STL terrain models from swisstopo
//! elevation grids
//!
//! The pipeline: a polygon drawn over Switzerland is projected into the
//! national planar frame, the cached elevation grid for the chosen
//! resolution tier is clipped to the polygon's surroundings, the clipped
//! height field is extruded down to a flat fundament and cut along the
//! polygon boundary, and the resulting watertight solid is serialized as
//! STL.
//!
//! The three entry points, in pipeline order:
//! [`GridStore::get_elevation`], [`build_solid`], [`export_stl`].

pub mod config;
pub mod error;
pub mod geojson;
pub mod geometry;
pub mod grid;
pub mod mesh;

pub use error::PipelineError;
pub use grid::{ClippedArea, GridStore, Tier, clip_grid};
pub use mesh::{Solid, build_solid, export_stl, fundament};
