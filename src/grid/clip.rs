use crate::geometry::{Bounds, Ring};
use crate::grid::{ElevationGrid, GridMeta};

/// A rectangular sub-view of an elevation grid, owning its height values.
///
/// Produced by [`clip_grid`]; covers the polygon's projected bounding box
/// plus one cell of margin, clamped to grid coverage. May be empty when the
/// polygon lies outside the grid (a caller-prevented condition that is not
/// re-validated here).
#[derive(Debug, Clone)]
pub struct ClippedArea {
    x_axis: Vec<f64>,
    y_axis: Vec<f64>,
    values: Vec<f64>,
}

impl ClippedArea {
    pub fn ncols(&self) -> usize {
        self.x_axis.len()
    }

    pub fn nrows(&self) -> usize {
        self.y_axis.len()
    }

    /// Column coordinates, ascending west to east.
    pub fn x_axis(&self) -> &[f64] {
        &self.x_axis
    }

    /// Row coordinates, descending north to south.
    pub fn y_axis(&self) -> &[f64] {
        &self.y_axis
    }

    /// Height at (row, col); NaN marks a missing sample.
    pub fn value(&self, row: usize, col: usize) -> f64 {
        self.values[row * self.ncols() + col]
    }

    /// Min and max height over the area, ignoring missing samples.
    /// `None` when the area holds no usable sample at all.
    pub fn height_range(&self) -> Option<(f64, f64)> {
        let mut range: Option<(f64, f64)> = None;
        for &v in &self.values {
            if v.is_nan() {
                continue;
            }
            range = Some(match range {
                Some((lo, hi)) => (lo.min(v), hi.max(v)),
                None => (v, v),
            });
        }
        range
    }
}

/// Slice the grid down to the polygon's surroundings.
///
/// Every ring vertex is projected to the planar frame; the projected
/// bounding box grows by exactly one `cellsize` on each side, and the
/// minimal covering sub-rectangle of the grid is copied out. The row axis
/// descends, so its slice is taken in (max, min) order to match storage.
pub fn clip_grid(grid: &ElevationGrid, meta: &GridMeta, ring: &Ring) -> ClippedArea {
    let projected = ring.project_lv03();
    let Some(bounds) = Bounds::from_points(&projected) else {
        return ClippedArea {
            x_axis: Vec::new(),
            y_axis: Vec::new(),
            values: Vec::new(),
        };
    };
    let window = bounds.expanded(meta.cellsize);

    // x ascends: keep axis values inside [min_x, max_x]
    let col_start = grid.x_axis.partition_point(|&x| x < window.min_x);
    let col_end = grid.x_axis.partition_point(|&x| x <= window.max_x);
    // y descends: keep axis values inside [min_y, max_y], north first
    let row_start = grid.y_axis.partition_point(|&y| y > window.max_y);
    let row_end = grid.y_axis.partition_point(|&y| y >= window.min_y);

    let x_axis = grid.x_axis[col_start..col_end].to_vec();
    let y_axis = grid.y_axis[row_start..row_end].to_vec();
    let mut values = Vec::with_capacity(x_axis.len() * y_axis.len());
    for row in row_start..row_end {
        for col in col_start..col_end {
            values.push(grid.value(row, col));
        }
    }

    ClippedArea {
        x_axis,
        y_axis,
        values,
    }
}
