use nalgebra::{Point3, Vector3};
use serde::Serialize;
use std::collections::BTreeSet;

use crate::error::{Error, Result};

/// User-facing 3-component vector, value type
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vec3 {
    #[must_use]
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub(crate) const fn to_point(self) -> Point3<f64> {
        Point3::new(self.x, self.y, self.z)
    }

    pub(crate) fn from_point(p: &Point3<f64>) -> Self {
        Self::new(p.x, p.y, p.z)
    }

    pub(crate) fn from_vector(v: &Vector3<f64>) -> Self {
        Self::new(v.x, v.y, v.z)
    }
}

impl From<(f64, f64, f64)> for Vec3 {
    fn from(t: (f64, f64, f64)) -> Self {
        Self::new(t.0, t.1, t.2)
    }
}

/// Tessellation parameter bundle, immutable once validated.
#[derive(Debug, Clone, Copy)]
pub struct Config {
    /// Minimum accepted weight fraction. Rows whose weight falls below
    /// this contribute no clipping plane; it also bounds the neighbor
    /// search radius (`reach / min_M`).
    pub min_m: f64,
    /// Geometric position tolerance
    pub eps_pos: f64,
    /// Tolerance for normal normalization / parallel checks
    pub eps_angle: f64,
    /// Faces below this area are pruned from emitted cells
    pub min_face_area: f64,
    /// Periodic planning: search reach = `reach_factor` * nearest-neighbor distance
    pub reach_factor: f64,
    /// Padding added to the neighbor search radius
    pub neighbor_skin: f64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            min_m: 0.1,
            eps_pos: 1e-10,
            eps_angle: 1e-12,
            min_face_area: 1e-14,
            reach_factor: 2.5,
            neighbor_skin: 1e-8,
        }
    }
}

impl Config {
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.min_m) || !self.min_m.is_finite() {
            return Err(Error::InvalidConfig(format!(
                "min_M must be in [0, 1], got {}",
                self.min_m
            )));
        }
        if self.eps_pos <= 0.0 || self.eps_angle <= 0.0 {
            return Err(Error::InvalidConfig(
                "tolerances must be positive".to_string(),
            ));
        }
        if self.reach_factor <= 0.0 {
            return Err(Error::InvalidConfig(format!(
                "reach_factor must be positive, got {}",
                self.reach_factor
            )));
        }
        Ok(())
    }
}

/// Oriented candidate pair table produced by the planner.
///
/// Row `r` describes the pair (`i[r]`, `j[r]`) with `j` taken at periodic
/// image `img[r]`; `disp[r]` is the cartesian displacement from site `i`
/// to that image of `j` and `r2[r]` its squared length. For every row
/// `(i, j, img)` the complementary row `(j, i, -img)` is also present.
#[derive(Debug, Clone, Default, Serialize)]
pub struct NeighborTable {
    pub i: Vec<i64>,
    pub j: Vec<i64>,
    pub img: Vec<[i32; 3]>,
    #[serde(skip)]
    pub disp: Vec<Vector3<f64>>,
    pub r2: Vec<f64>,
}

impl NeighborTable {
    #[must_use]
    pub fn len(&self) -> usize {
        self.i.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.i.is_empty()
    }

    pub(crate) fn push(&mut self, i: usize, j: usize, img: [i32; 3], disp: Vector3<f64>) {
        self.i.push(i as i64);
        self.j.push(j as i64);
        self.img.push(img);
        self.r2.push(disp.norm_squared());
        self.disp.push(disp);
    }

    /// Row indices belonging to site `i`, in table order.
    #[must_use]
    pub fn rows_for_site(&self, site: usize) -> Vec<usize> {
        (0..self.len())
            .filter(|&r| self.i[r] == site as i64)
            .collect()
    }
}

/// Label identifying what produced a cell face.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FaceLabel {
    /// Bisector face shared with another site (at the given periodic image)
    Neighbor { site: usize, image: [i32; 3] },
    /// Container wall face (finite box only)
    Wall,
    /// Spherical-cap face of a surface site
    Cap,
}

/// One face of a cell: a cyclic vertex-index loop plus its provenance.
#[derive(Debug, Clone, Serialize)]
pub struct CellFace {
    pub vertices: Vec<usize>,
    pub label: FaceLabel,
    pub area: f64,
}

/// Per-site convex polyhedral cell, immutable once emitted.
///
/// A degenerate (fully clipped) cell has no vertices, no faces and zero
/// volume; that is a legitimate outcome, not an error.
#[derive(Debug, Clone, Serialize)]
pub struct Cell {
    pub site: usize,
    pub vertices: Vec<Vec3>,
    pub faces: Vec<CellFace>,
    pub volume: f64,
}

/// Deduplicated face in the merged mesh. `j == -1` marks a boundary
/// (wall or cap) face; internal faces carry `i < j` canonically, except
/// periodic self-pairs where `i == j` and the image breaks the tie.
///
/// The vertex loop is wound counter-clockwise as seen against
/// `normal_ij`: the unit direction from site `i` to the canonical image
/// of site `j` for internal faces, the outward direction for boundary
/// faces.
#[derive(Debug, Clone, Serialize)]
pub struct MeshFace {
    pub i: i64,
    pub j: i64,
    pub image: [i32; 3],
    pub vertices: Vec<usize>,
    pub area: f64,
    pub centroid: Vec3,
    pub normal_ij: Vec3,
}

/// Per-site record in the merged mesh.
#[derive(Debug, Clone, Serialize)]
pub struct MeshCell {
    pub site: usize,
    pub face_ids: Vec<usize>,
    pub volume: f64,
    pub centroid: Vec3,
}

/// Deduplicated union of all cell vertices, edges and faces.
/// Exactly one record exists per physically distinct face; each edge is
/// a unique unordered vertex pair stored as `[lo, hi]`; ordering is a
/// stable function of site index, independent of thread scheduling.
#[derive(Debug, Clone, Default, Serialize)]
pub struct GlobalMesh {
    pub vertices: Vec<Vec3>,
    pub edges: Vec<[usize; 2]>,
    pub faces: Vec<MeshFace>,
    pub cells: Vec<MeshCell>,
}

/// Options for closing open cells at domain surfaces with
/// quadrature-approximated spherical caps.
#[derive(Debug, Clone)]
pub struct CapOptions {
    pub enabled: bool,
    /// Cap sphere radius around each surface site
    pub radius: f64,
    /// Quadrature order; must be one of the supported direction counts
    pub lebedev_order: usize,
    /// Explicit surface sites. When empty and `auto_surface_margin > 0`,
    /// box sites within that distance of any wall are selected instead.
    pub surface_atom_ids: BTreeSet<usize>,
    pub auto_surface_margin: f64,
}

impl Default for CapOptions {
    fn default() -> Self {
        Self {
            enabled: false,
            radius: 1.0,
            lebedev_order: 26,
            surface_atom_ids: BTreeSet::new(),
            auto_surface_margin: 0.0,
        }
    }
}

impl CapOptions {
    pub(crate) fn validate(&self, num_sites: usize) -> Result<()> {
        if !self.enabled {
            return Ok(());
        }
        if !(self.radius > 0.0) || !self.radius.is_finite() {
            return Err(Error::InvalidConfig(format!(
                "cap radius must be positive, got {}",
                self.radius
            )));
        }
        for &id in &self.surface_atom_ids {
            if id >= num_sites {
                return Err(Error::UnknownSiteId { id, num_sites });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default_is_valid() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_config_rejects_bad_min_m() {
        let mut cfg = Config::default();
        cfg.min_m = -0.1;
        assert!(cfg.validate().is_err());
        cfg.min_m = 1.5;
        assert!(cfg.validate().is_err());
        cfg.min_m = 1.0;
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_cap_options_unknown_site() {
        let mut opt = CapOptions {
            enabled: true,
            ..CapOptions::default()
        };
        opt.surface_atom_ids.insert(5);
        assert!(matches!(
            opt.validate(3),
            Err(Error::UnknownSiteId { id: 5, num_sites: 3 })
        ));
        assert!(opt.validate(6).is_ok());
    }

    #[test]
    fn test_neighbor_table_rows_for_site() {
        let mut t = NeighborTable::default();
        t.push(0, 1, [0, 0, 0], Vector3::x());
        t.push(1, 0, [0, 0, 0], -Vector3::x());
        t.push(0, 2, [0, 0, 0], Vector3::y());
        assert_eq!(t.rows_for_site(0), vec![0, 2]);
        assert_eq!(t.rows_for_site(1), vec![1]);
        assert_eq!(t.len(), 3);
    }
}
