use crate::geometry::Ring;

/// The vertical clip wall along the polygon boundary.
///
/// An uncapped ribbon: the projected ring placed at a reference elevation
/// and extruded vertically by a signed amount. The sign compensates for the
/// winding of the geographic ring, so the band always covers the same z
/// interval regardless of the direction the user drew the polygon:
/// counter-clockwise rings extrude upward from `zero`, clockwise rings
/// extrude downward from `height`.
#[derive(Debug, Clone)]
pub struct BorderWall {
    ring: Vec<(f64, f64)>,
    reference: f64,
    extrusion: f64,
}

impl BorderWall {
    pub fn from_ring(ring: &Ring, zero: f64, height: f64) -> Self {
        let (extrusion, reference) = if ring.is_ccw() {
            (height - zero, zero)
        } else {
            (-(height - zero), height)
        };
        Self {
            ring: ring.project_lv03(),
            reference,
            extrusion,
        }
    }

    /// Projected ring vertices, open, in the order the user drew them.
    pub fn ring(&self) -> &[(f64, f64)] {
        &self.ring
    }

    /// Elevation the ribbon is anchored at.
    pub fn reference(&self) -> f64 {
        self.reference
    }

    /// Signed vertical extrusion applied to the anchor.
    pub fn extrusion(&self) -> f64 {
        self.extrusion
    }

    /// Lower edge of the band.
    pub fn z_bottom(&self) -> f64 {
        self.reference.min(self.reference + self.extrusion)
    }

    /// Upper edge of the band.
    pub fn z_top(&self) -> f64 {
        self.reference.max(self.reference + self.extrusion)
    }
}
