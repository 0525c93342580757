use nalgebra::{Point3, Vector3};

/// Tolerance for floating-point comparisons.
/// The clipping algorithm requires one consistent epsilon across all
/// vertex classifications to keep face incidence geometrically consistent.
pub const EPSILON: f64 = 1e-10;

/// Epsilon-based floating point comparisons.
/// These exist because half-space clipping needs consistent "fuzzy"
/// comparisons to handle near-coincident vertices and planes robustly.
pub mod float_cmp {
    use super::EPSILON;

    #[inline]
    pub const fn eq(a: f64, b: f64) -> bool {
        (a - b).abs() <= EPSILON
    }

    #[inline]
    pub const fn lt(a: f64, b: f64) -> bool {
        a + EPSILON < b
    }

    #[inline]
    pub const fn gt(a: f64, b: f64) -> bool {
        a - EPSILON > b
    }

    #[inline]
    pub const fn le(a: f64, b: f64) -> bool {
        a < b + EPSILON
    }
}

use float_cmp::eq;

/// Oriented plane `n·x = d` with unit normal; the kept half-space of a
/// clip is `n·x <= d`.
#[derive(Debug, Clone, Copy)]
pub struct Plane {
    pub normal: Vector3<f64>,
    pub offset: f64,
}

impl Plane {
    /// Plane through `point` with (not necessarily unit) `normal`.
    /// A zero normal falls back to +x so callers never see a NaN plane.
    #[must_use]
    pub fn from_point_normal(point: &Point3<f64>, normal: &Vector3<f64>) -> Self {
        let len = normal.norm();
        debug_assert!(len > 0.0, "plane normal must be nonzero");
        let unit = if len > 0.0 {
            normal / len
        } else {
            Vector3::x()
        };
        Self {
            normal: unit,
            offset: unit.dot(&point.coords),
        }
    }

    /// Signed distance from `x` (positive on the clipped-away side).
    #[inline]
    #[must_use]
    pub fn signed_distance(&self, x: &Point3<f64>) -> f64 {
        self.normal.dot(&x.coords) - self.offset
    }

    /// Whether two planes coincide within tolerance (same normal and offset).
    #[must_use]
    pub fn nearly_coincident(&self, other: &Self) -> bool {
        eq(self.normal.dot(&other.normal), 1.0) && eq(self.offset, other.offset)
    }
}

/// Intersection of a plane with segment ab, given precomputed signed
/// distances of the endpoints. Falls back to `a` for a degenerate segment.
pub fn intersect_plane_segment(a: &Point3<f64>, b: &Point3<f64>, da: f64, db: f64) -> Point3<f64> {
    if (da - db).abs() < EPSILON {
        *a
    } else {
        let t = da / (da - db);
        a + (b - a) * t
    }
}

/// Triangle area from three points
#[inline]
pub fn triangle_area(a: &Point3<f64>, b: &Point3<f64>, c: &Point3<f64>) -> f64 {
    (b - a).cross(&(c - a)).norm() / 2.0
}

/// Signed volume of tetrahedron (o, a, b, c)
#[inline]
pub fn signed_tetrahedron_volume(
    o: &Point3<f64>,
    a: &Point3<f64>,
    b: &Point3<f64>,
    c: &Point3<f64>,
) -> f64 {
    (a - o).dot(&(b - o).cross(&(c - o))) / 6.0
}

/// Newell normal of a vertex cycle. Not normalized; the magnitude is
/// twice the polygon area, and the direction follows the winding by the
/// right-hand rule.
pub fn newell_normal(points: &[Point3<f64>], cycle: &[usize]) -> Vector3<f64> {
    let mut n = Vector3::zeros();
    for k in 0..cycle.len() {
        let a = &points[cycle[k]];
        let b = &points[cycle[(k + 1) % cycle.len()]];
        n.x += (a.y - b.y) * (a.z + b.z);
        n.y += (a.z - b.z) * (a.x + b.x);
        n.z += (a.x - b.x) * (a.y + b.y);
    }
    n
}

/// Find any unit vector perpendicular to the given vector
pub fn any_normal_of_vector(a: &Vector3<f64>) -> Vector3<f64> {
    let candidate = if a.x.abs() < a.y.abs() && a.x.abs() < a.z.abs() {
        Vector3::x()
    } else if a.y.abs() < a.z.abs() {
        Vector3::y()
    } else {
        Vector3::z()
    };
    let n = a.cross(&candidate);
    let len = n.norm();
    if len > 0.0 {
        n / len
    } else {
        Vector3::x()
    }
}

/// Sort point indices counter-clockwise around `center` as seen against
/// `normal`. Used to assemble the polygon a clipping plane cuts out of a
/// convex polyhedron.
pub fn order_loop_ccw(
    points: &[Point3<f64>],
    indices: &mut [usize],
    center: &Point3<f64>,
    normal: &Vector3<f64>,
) {
    let tangent_x = any_normal_of_vector(normal);
    let tangent_y = normal.cross(&tangent_x);
    indices.sort_by(|&a, &b| {
        let va = points[a] - center;
        let vb = points[b] - center;
        let aa = va.dot(&tangent_y).atan2(va.dot(&tangent_x));
        let ab = vb.dot(&tangent_y).atan2(vb.dot(&tangent_x));
        aa.total_cmp(&ab)
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_plane_signed_distance() {
        let plane = Plane::from_point_normal(&Point3::new(1.0, 0.0, 0.0), &Vector3::x());
        assert_relative_eq!(plane.signed_distance(&Point3::new(2.0, 5.0, -3.0)), 1.0);
        assert_relative_eq!(plane.signed_distance(&Point3::new(0.0, 0.0, 0.0)), -1.0);
    }

    #[test]
    fn test_plane_normalizes() {
        let plane =
            Plane::from_point_normal(&Point3::new(0.0, 2.0, 0.0), &Vector3::new(0.0, 10.0, 0.0));
        assert_relative_eq!(plane.normal.norm(), 1.0, epsilon = 1e-12);
        assert_relative_eq!(plane.offset, 2.0, epsilon = 1e-12);
    }

    #[test]
    fn test_intersect_plane_segment() {
        let a = Point3::new(0.0, 0.0, 0.0);
        let b = Point3::new(2.0, 0.0, 0.0);
        // plane x = 1: da = -1, db = 1
        let p = intersect_plane_segment(&a, &b, -1.0, 1.0);
        assert_relative_eq!(p.x, 1.0, epsilon = 1e-12);
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "plane normal must be nonzero")]
    fn test_zero_normal_asserts() {
        let _ = Plane::from_point_normal(&Point3::origin(), &Vector3::zeros());
    }

    #[test]
    fn test_newell_normal_of_square() {
        let points = vec![
            Point3::new(0.0, 0.0, 2.0),
            Point3::new(1.0, 0.0, 2.0),
            Point3::new(1.0, 1.0, 2.0),
            Point3::new(0.0, 1.0, 2.0),
        ];
        let ccw = newell_normal(&points, &[0, 1, 2, 3]);
        // Magnitude is twice the area, direction by the right-hand rule
        assert_relative_eq!(ccw.z, 2.0, epsilon = 1e-12);
        let cw = newell_normal(&points, &[3, 2, 1, 0]);
        assert_relative_eq!(cw.z, -2.0, epsilon = 1e-12);
    }

    #[test]
    fn test_any_normal() {
        for v in [
            Vector3::new(1.0, 2.0, 3.0),
            Vector3::x(),
            Vector3::new(0.0, 0.0, -2.0),
        ] {
            let n = any_normal_of_vector(&v);
            assert_relative_eq!(v.dot(&n), 0.0, epsilon = 1e-9);
            assert_relative_eq!(n.norm(), 1.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_order_loop_ccw() {
        let points = vec![
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
            Point3::new(-1.0, 0.0, 0.0),
            Point3::new(0.0, -1.0, 0.0),
        ];
        let mut indices = vec![2, 0, 3, 1];
        order_loop_ccw(&points, &mut indices, &Point3::origin(), &Vector3::z());
        // Any rotation or reflection of the cycle is fine; check adjacency
        let pos_of = |i: usize| indices.iter().position(|&x| x == i).unwrap();
        let n = indices.len();
        for i in 0..4 {
            let next = indices[(pos_of(i) + 1) % n];
            assert!(next == (i + 1) % 4 || next == (i + 3) % 4);
        }
    }

    #[test]
    fn test_tetrahedron_volume() {
        let v = signed_tetrahedron_volume(
            &Point3::origin(),
            &Point3::new(1.0, 0.0, 0.0),
            &Point3::new(0.0, 1.0, 0.0),
            &Point3::new(0.0, 0.0, 1.0),
        );
        assert_relative_eq!(v, 1.0 / 6.0, epsilon = 1e-12);
    }
}
