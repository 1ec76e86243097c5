use crate::grid::ClippedArea;

/// A 2.5D structured terrain surface.
///
/// Horizontal coordinates come from the clipped area's axes, broadcast
/// across the grid; the vertical coordinate is the per-cell height. Missing
/// samples stay NaN: they are gaps in the surface, never zero elevation.
#[derive(Debug, Clone)]
pub struct Surface {
    x_axis: Vec<f64>,
    y_axis: Vec<f64>,
    heights: Vec<f64>,
    elevation: Option<(f64, f64)>,
}

impl Surface {
    pub fn from_area(area: &ClippedArea) -> Self {
        let heights: Vec<f64> = (0..area.nrows())
            .flat_map(|row| (0..area.ncols()).map(move |col| area.value(row, col)))
            .collect();
        Self {
            x_axis: area.x_axis().to_vec(),
            y_axis: area.y_axis().to_vec(),
            heights,
            elevation: area.height_range(),
        }
    }

    pub fn ncols(&self) -> usize {
        self.x_axis.len()
    }

    pub fn nrows(&self) -> usize {
        self.y_axis.len()
    }

    pub fn x_axis(&self) -> &[f64] {
        &self.x_axis
    }

    pub fn y_axis(&self) -> &[f64] {
        &self.y_axis
    }

    /// Height at (row, col); NaN marks a gap.
    pub fn height(&self, row: usize, col: usize) -> f64 {
        self.heights[row * self.ncols() + col]
    }

    /// Min/max height over the surface, `None` when everything is missing.
    pub fn elevation(&self) -> Option<(f64, f64)> {
        self.elevation
    }
}

/// A surface extruded down to a flat base plane: two structured layers,
/// terrain on top, the `zero` plane below.
#[derive(Debug, Clone)]
pub struct Model {
    surface: Surface,
    zero: f64,
}

impl Model {
    pub fn over_base(surface: Surface, zero: f64) -> Self {
        Self { surface, zero }
    }

    pub fn surface(&self) -> &Surface {
        &self.surface
    }

    /// Elevation of the flat bottom layer.
    pub fn zero(&self) -> f64 {
        self.zero
    }

    /// Min/max elevation across both layers.
    pub fn elevation(&self) -> Option<(f64, f64)> {
        self.surface
            .elevation()
            .map(|(lo, hi)| (lo.min(self.zero), hi.max(self.zero)))
    }
}
