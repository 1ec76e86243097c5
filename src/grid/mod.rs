pub mod ascii;
pub mod clip;
pub mod store;

pub use ascii::parse_ascii_grid;
pub use clip::{ClippedArea, clip_grid};
pub use store::{GridSource, GridStore, HttpSource, Tier};

use bincode::{Decode, Encode};

/// Header of an ASCII-grid raster, as a fixed, typed record.
///
/// Invariants: `ncols * nrows` equals the number of height samples and
/// `cellsize` is strictly positive; both are enforced by the parser.
#[derive(Debug, Clone, PartialEq, Encode, Decode)]
pub struct GridMeta {
    pub ncols: usize,
    pub nrows: usize,
    pub xllcorner: f64,
    pub yllcorner: f64,
    pub cellsize: f64,
    pub nodata_value: f64,
}

/// An immutable height field with real-world axis coordinates.
///
/// `values` is row-major with row 0 as the northern-most row, matching the
/// top-to-bottom order of the source file. `y_axis` descends accordingly;
/// `x_axis` ascends west to east. Missing samples are `f64::NAN` and must
/// never be treated as zero elevation.
#[derive(Debug, Clone, Encode, Decode)]
pub struct ElevationGrid {
    pub x_axis: Vec<f64>,
    pub y_axis: Vec<f64>,
    pub values: Vec<f64>,
}

impl ElevationGrid {
    pub fn ncols(&self) -> usize {
        self.x_axis.len()
    }

    pub fn nrows(&self) -> usize {
        self.y_axis.len()
    }

    /// Height at (row, col); NaN marks a missing sample.
    pub fn value(&self, row: usize, col: usize) -> f64 {
        self.values[row * self.ncols() + col]
    }
}

/// The cached unit: one parsed grid and its header, per resolution tier.
#[derive(Debug, Clone, Encode, Decode)]
pub struct GridEntry {
    pub meta: GridMeta,
    pub grid: ElevationGrid,
}
