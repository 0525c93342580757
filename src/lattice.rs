use nalgebra::{Matrix3, Point3, Vector3};

use crate::error::{Error, Result};

/// Triclinic lattice defined by edge lengths (a, b, c) and angles
/// (alpha, beta, gamma, degrees). Stores the cell matrix (columns are
/// lattice vectors, conventional orientation: `a` along +x, `b` in the
/// xy plane) together with its inverse for fractional transforms.
#[derive(Debug, Clone)]
pub struct Lattice {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub alpha: f64,
    pub beta: f64,
    pub gamma: f64,
    cell: Matrix3<f64>,
    inv: Matrix3<f64>,
}

impl Lattice {
    /// Build a lattice; fails if the resulting cell matrix is degenerate.
    pub fn new(a: f64, b: f64, c: f64, alpha: f64, beta: f64, gamma: f64) -> Result<Self> {
        let (ca, cb, cg) = (
            alpha.to_radians().cos(),
            beta.to_radians().cos(),
            gamma.to_radians().cos(),
        );
        let sg = gamma.to_radians().sin();

        let va = Vector3::new(a, 0.0, 0.0);
        let vb = Vector3::new(b * cg, b * sg, 0.0);
        let cx = c * cb;
        let cy = c * (ca - cb * cg) / sg;
        let cz = (c * c - cx * cx - cy * cy).max(0.0).sqrt();
        let vc = Vector3::new(cx, cy, cz);

        let cell = Matrix3::from_columns(&[va, vb, vc]);
        let volume = cell.determinant();
        if !(volume > 0.0) || !volume.is_finite() {
            return Err(Error::DegenerateLattice { volume });
        }
        let inv = cell
            .try_inverse()
            .ok_or(Error::DegenerateLattice { volume })?;

        Ok(Self {
            a,
            b,
            c,
            alpha,
            beta,
            gamma,
            cell,
            inv,
        })
    }

    /// Lattice vectors as matrix columns (cartesian)
    #[must_use]
    pub fn cell_matrix(&self) -> &Matrix3<f64> {
        &self.cell
    }

    /// Lattice vector along axis `k` (0, 1, 2)
    #[must_use]
    pub fn axis(&self, k: usize) -> Vector3<f64> {
        self.cell.column(k).into()
    }

    /// Cell volume (positive by construction)
    #[must_use]
    pub fn volume(&self) -> f64 {
        self.cell.determinant()
    }

    #[must_use]
    pub fn to_cart(&self, frac: &Vector3<f64>) -> Vector3<f64> {
        self.cell * frac
    }

    #[must_use]
    pub fn to_frac(&self, cart: &Vector3<f64>) -> Vector3<f64> {
        self.inv * cart
    }

    /// Wrap fractional coordinates into [0, 1) along periodic axes.
    #[must_use]
    pub fn wrap_frac(&self, frac: &Vector3<f64>, periodic: [bool; 3]) -> Vector3<f64> {
        let mut w = *frac;
        for k in 0..3 {
            if periodic[k] {
                w[k] -= w[k].floor();
            }
        }
        w
    }

    /// Minimum-image displacement from `ri` to the nearest periodic image
    /// of `rj`, plus the integer image triple that realizes it.
    ///
    /// Exact half-cell ties are resolved by `f64::round`
    /// (round-half-away-from-zero), which is deterministic.
    #[must_use]
    pub fn min_image_disp(
        &self,
        ri: &Point3<f64>,
        rj: &Point3<f64>,
        periodic: [bool; 3],
    ) -> (Vector3<f64>, [i32; 3]) {
        let mut df = self.to_frac(&(rj - ri));
        let mut img = [0i32; 3];
        for k in 0..3 {
            if periodic[k] {
                let shift = df[k].round();
                df[k] -= shift;
                img[k] = -shift as i32;
            }
        }
        (self.to_cart(&df), img)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_cubic_roundtrip() {
        let lat = Lattice::new(2.0, 2.0, 2.0, 90.0, 90.0, 90.0).unwrap();
        let cart = Vector3::new(1.0, 0.5, 1.5);
        let frac = lat.to_frac(&cart);
        assert_relative_eq!(frac.x, 0.5, epsilon = 1e-12);
        let back = lat.to_cart(&frac);
        assert_relative_eq!((back - cart).norm(), 0.0, epsilon = 1e-12);
        assert_relative_eq!(lat.volume(), 8.0, epsilon = 1e-12);
    }

    #[test]
    fn test_triclinic_volume() {
        // V = abc * sqrt(1 - ca^2 - cb^2 - cg^2 + 2 ca cb cg)
        let (a, b, c) = (3.0, 4.0, 5.0);
        let (al, be, ga) = (80.0f64, 95.0f64, 110.0f64);
        let lat = Lattice::new(a, b, c, al, be, ga).unwrap();
        let (ca, cb, cg) = (
            al.to_radians().cos(),
            be.to_radians().cos(),
            ga.to_radians().cos(),
        );
        let expected =
            a * b * c * (1.0 - ca * ca - cb * cb - cg * cg + 2.0 * ca * cb * cg).sqrt();
        assert_relative_eq!(lat.volume(), expected, epsilon = 1e-9);
    }

    #[test]
    fn test_degenerate_lattice_rejected() {
        assert!(Lattice::new(1.0, 1.0, 1.0, 90.0, 90.0, 180.0).is_err());
        assert!(Lattice::new(0.0, 1.0, 1.0, 90.0, 90.0, 90.0).is_err());
    }

    #[test]
    fn test_wrap_frac() {
        let lat = Lattice::new(1.0, 1.0, 1.0, 90.0, 90.0, 90.0).unwrap();
        let w = lat.wrap_frac(&Vector3::new(1.25, -0.25, 0.5), [true, true, false]);
        assert_relative_eq!(w.x, 0.25, epsilon = 1e-12);
        assert_relative_eq!(w.y, 0.75, epsilon = 1e-12);
        assert_relative_eq!(w.z, 0.5, epsilon = 1e-12);
    }

    #[test]
    fn test_min_image_cubic() {
        let lat = Lattice::new(1.0, 1.0, 1.0, 90.0, 90.0, 90.0).unwrap();
        let ri = Point3::new(0.1, 0.5, 0.5);
        let rj = Point3::new(0.9, 0.5, 0.5);
        let (disp, img) = lat.min_image_disp(&ri, &rj, [true, true, true]);
        // Nearest image of j is across the -x boundary
        assert_relative_eq!(disp.x, -0.2, epsilon = 1e-12);
        assert_eq!(img, [-1, 0, 0]);

        let (disp, img) = lat.min_image_disp(&ri, &rj, [false, true, true]);
        assert_relative_eq!(disp.x, 0.8, epsilon = 1e-12);
        assert_eq!(img, [0, 0, 0]);
    }
}
