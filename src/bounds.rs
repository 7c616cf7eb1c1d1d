use anyhow::{Result, bail};
use nalgebra::Point3;

/// Axis-aligned volume enclosing every scan position, buffered and
/// aligned to the buffer unit for downstream grid construction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min: Point3<f64>,
    pub max: Point3<f64>,
}

impl Bounds {
    /// `(xmin, ymin, zmin, xmax, ymax, zmax)` ordering.
    pub fn to_array(&self) -> [f64; 6] {
        [
            self.min.x, self.min.y, self.min.z, self.max.x, self.max.y, self.max.z,
        ]
    }

    /// Grid dimensions at the given voxel resolution, floor-divided as
    /// the voxelization config expects.
    pub fn grid_dims(&self, resolution: f64) -> (u64, u64, u64) {
        let cells = |lo: f64, hi: f64| (hi - lo).div_euclid(resolution).max(0.0) as u64;
        (
            cells(self.min.x, self.max.x),
            cells(self.min.y, self.max.y),
            cells(self.min.z, self.max.z),
        )
    }
}

/// Fold sensor origins into a bounding volume and apply the analysis
/// buffering rules, in order: buffer the minimums (Z additionally gets
/// the fixed vertical allowance), give the X/Y maximums 1.5x headroom,
/// raise the Z maximum by `hmax`, then floor every value to a multiple
/// of `buffer`.
///
/// An empty origin set is a configuration error; the degenerate
/// all-infinite volume must never reach the grid code.
pub fn compute_bounds(origins: &[Point3<f64>], buffer: f64, hmax: f64) -> Result<Bounds> {
    if origins.is_empty() {
        bail!("no positions to bound");
    }
    if buffer <= 0.0 {
        bail!("buffer must be positive, got {buffer}");
    }

    let mut min = origins[0];
    let mut max = origins[0];
    for o in &origins[1..] {
        min = Point3::new(min.x.min(o.x), min.y.min(o.y), min.z.min(o.z));
        max = Point3::new(max.x.max(o.x), max.y.max(o.y), max.z.max(o.z));
    }

    min.x -= buffer;
    min.y -= buffer;
    min.z -= buffer + buffer;
    max.x += 1.5 * buffer;
    max.y += 1.5 * buffer;
    max.z += hmax;

    let floor_to = |v: f64| v.div_euclid(buffer) * buffer;
    Ok(Bounds {
        min: Point3::new(floor_to(min.x), floor_to(min.y), floor_to(min.z)),
        max: Point3::new(floor_to(max.x), floor_to(max.y), floor_to(max.z)),
    })
}
