use nalgebra::{Point3, Vector3};

use crate::geometry::Plane;
use crate::lattice::Lattice;
use crate::types::Vec3;

/// Axis-aligned box bounds
#[derive(Debug, Clone, Copy)]
pub struct BoxBounds {
    pub lo: Vec3,
    pub hi: Vec3,
}

impl BoxBounds {
    #[must_use]
    pub const fn new(lo: Vec3, hi: Vec3) -> Self {
        Self { lo, hi }
    }
}

/// Finite axis-aligned box holding site positions
#[derive(Debug, Clone)]
pub struct BoxContainer {
    pub bounds: BoxBounds,
    pos: Vec<Point3<f64>>,
}

impl BoxContainer {
    #[must_use]
    pub fn new(bounds: BoxBounds) -> Self {
        Self {
            bounds,
            pos: Vec::new(),
        }
    }

    pub fn add_atoms(&mut self, xyz: &[Vec3]) {
        self.pos.extend(xyz.iter().map(|v| v.to_point()));
    }

    #[must_use]
    pub fn positions(&self) -> &[Point3<f64>] {
        &self.pos
    }

    /// Maximum distance from site `i` to any box corner (safe reach bound)
    #[must_use]
    pub fn farthest_corner_radius(&self, i: usize) -> f64 {
        let r = &self.pos[i];
        let mut reach = 0.0f64;
        for cx in [self.bounds.lo.x, self.bounds.hi.x] {
            for cy in [self.bounds.lo.y, self.bounds.hi.y] {
                for cz in [self.bounds.lo.z, self.bounds.hi.z] {
                    reach = reach.max((Point3::new(cx, cy, cz) - r).norm());
                }
            }
        }
        reach
    }

    /// The six wall half-spaces, inward-kept (`n·x <= d`)
    #[must_use]
    pub fn wall_planes(&self) -> [Plane; 6] {
        let lo = self.bounds.lo;
        let hi = self.bounds.hi;
        [
            Plane::from_point_normal(&Point3::new(lo.x, 0.0, 0.0), &-Vector3::x()),
            Plane::from_point_normal(&Point3::new(hi.x, 0.0, 0.0), &Vector3::x()),
            Plane::from_point_normal(&Point3::new(0.0, lo.y, 0.0), &-Vector3::y()),
            Plane::from_point_normal(&Point3::new(0.0, hi.y, 0.0), &Vector3::y()),
            Plane::from_point_normal(&Point3::new(0.0, 0.0, lo.z), &-Vector3::z()),
            Plane::from_point_normal(&Point3::new(0.0, 0.0, hi.z), &Vector3::z()),
        ]
    }
}

/// Triclinic periodic container: a lattice, per-axis periodicity flags,
/// and the site positions.
#[derive(Debug, Clone)]
pub struct TriclinicPbc {
    pub lattice: Lattice,
    pub periodic: [bool; 3],
    pos: Vec<Point3<f64>>,
}

impl TriclinicPbc {
    #[must_use]
    pub fn new(lattice: Lattice, periodic: [bool; 3]) -> Self {
        Self {
            lattice,
            periodic,
            pos: Vec::new(),
        }
    }

    pub fn add_atoms(&mut self, xyz: &[Vec3]) {
        self.pos.extend(xyz.iter().map(|v| v.to_point()));
    }

    #[must_use]
    pub fn positions(&self) -> &[Point3<f64>] {
        &self.pos
    }
}

/// Polymorphic container: the planner and tessellation engine depend only
/// on the capabilities exposed here (positions, wall half-spaces for the
/// box variant, minimum-image queries), never on the concrete variant.
#[derive(Debug, Clone)]
pub enum Container {
    Box(BoxContainer),
    Periodic(TriclinicPbc),
}

impl Container {
    #[must_use]
    pub fn positions(&self) -> &[Point3<f64>] {
        match self {
            Self::Box(b) => b.positions(),
            Self::Periodic(p) => p.positions(),
        }
    }

    #[must_use]
    pub fn num_sites(&self) -> usize {
        self.positions().len()
    }

    /// Wall half-spaces; `None` for periodic containers, which are bounded
    /// by neighbor planes from images across the cell instead.
    #[must_use]
    pub fn wall_planes(&self) -> Option<[Plane; 6]> {
        match self {
            Self::Box(b) => Some(b.wall_planes()),
            Self::Periodic(_) => None,
        }
    }

    #[must_use]
    pub fn periodic_flags(&self) -> [bool; 3] {
        match self {
            Self::Box(_) => [false; 3],
            Self::Periodic(p) => p.periodic,
        }
    }

    /// Minimum-image displacement between two sites (identity for boxes).
    #[must_use]
    pub fn min_image_disp(&self, i: usize, j: usize) -> (Vector3<f64>, [i32; 3]) {
        let pos = self.positions();
        match self {
            Self::Box(_) => (pos[j] - pos[i], [0; 3]),
            Self::Periodic(p) => p.lattice.min_image_disp(&pos[i], &pos[j], p.periodic),
        }
    }
}

impl From<BoxContainer> for Container {
    fn from(b: BoxContainer) -> Self {
        Self::Box(b)
    }
}

impl From<TriclinicPbc> for Container {
    fn from(p: TriclinicPbc) -> Self {
        Self::Periodic(p)
    }
}
