use std::f64::consts::PI;

use nalgebra::Vector3;

use crate::error::{Error, Result};

/// Quadrature orders with a direction table. Orders up to 26 are the
/// classic octahedron/cube/cuboctahedron sets; higher orders use a
/// deterministic golden-angle spiral with exactly `order` points.
pub const SUPPORTED_ORDERS: &[usize] = &[6, 14, 26, 50, 86, 110, 146, 194, 230, 302];

/// Unit directions approximating uniform sphere coverage for the given
/// order. Unsupported orders fail; they are never rounded to a neighbor.
pub fn quadrature_directions(order: usize) -> Result<Vec<Vector3<f64>>> {
    if !SUPPORTED_ORDERS.contains(&order) {
        return Err(Error::UnsupportedQuadratureOrder {
            order,
            supported: SUPPORTED_ORDERS,
        });
    }
    Ok(match order {
        6 => octahedron_dirs(),
        14 => {
            let mut dirs = octahedron_dirs();
            dirs.extend(cube_corner_dirs());
            dirs
        }
        26 => {
            let mut dirs = octahedron_dirs();
            dirs.extend(edge_midpoint_dirs());
            dirs.extend(cube_corner_dirs());
            dirs
        }
        n => fibonacci_sphere(n),
    })
}

fn octahedron_dirs() -> Vec<Vector3<f64>> {
    vec![
        Vector3::x(),
        -Vector3::x(),
        Vector3::y(),
        -Vector3::y(),
        Vector3::z(),
        -Vector3::z(),
    ]
}

fn cube_corner_dirs() -> Vec<Vector3<f64>> {
    let s = 1.0 / 3.0f64.sqrt();
    let mut dirs = Vec::with_capacity(8);
    for a in [-1.0, 1.0] {
        for b in [-1.0, 1.0] {
            for c in [-1.0, 1.0] {
                dirs.push(Vector3::new(s * a, s * b, s * c));
            }
        }
    }
    dirs
}

fn edge_midpoint_dirs() -> Vec<Vector3<f64>> {
    let s = 1.0 / 2.0f64.sqrt();
    let mut dirs = Vec::with_capacity(12);
    for a in [-1.0, 1.0] {
        for b in [-1.0, 1.0] {
            dirs.push(Vector3::new(s * a, s * b, 0.0));
            dirs.push(Vector3::new(s * a, 0.0, s * b));
            dirs.push(Vector3::new(0.0, s * a, s * b));
        }
    }
    dirs
}

/// Golden-angle spiral: n points, unit length by construction.
fn fibonacci_sphere(n: usize) -> Vec<Vector3<f64>> {
    let phi = (1.0 + 5.0f64.sqrt()) * 0.5;
    let golden_angle = 2.0 * PI * (1.0 - 1.0 / phi);
    (0..n)
        .map(|k| {
            let z = 1.0 - 2.0 * ((k as f64 + 0.5) / n as f64);
            let r = (1.0 - z * z).max(0.0).sqrt();
            let theta = golden_angle * k as f64;
            Vector3::new(r * theta.cos(), r * theta.sin(), z)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_direction_counts() {
        for &order in SUPPORTED_ORDERS {
            let dirs = quadrature_directions(order).unwrap();
            assert_eq!(dirs.len(), order, "order {order}");
        }
    }

    #[test]
    fn test_directions_are_unit() {
        for &order in SUPPORTED_ORDERS {
            for d in quadrature_directions(order).unwrap() {
                assert_relative_eq!(d.norm(), 1.0, epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn test_unsupported_order_fails() {
        for order in [0, 5, 27, 60, 200] {
            assert!(matches!(
                quadrature_directions(order),
                Err(Error::UnsupportedQuadratureOrder { .. })
            ));
        }
    }

    #[test]
    fn test_spiral_covers_both_hemispheres() {
        let dirs = quadrature_directions(50).unwrap();
        let mean: Vector3<f64> = dirs.iter().sum::<Vector3<f64>>() / 50.0;
        assert!(mean.norm() < 0.05, "directions should nearly cancel");
    }
}
