use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::types::NeighborTable;

/// Enforce weight complementarity: for every complementary row pair
/// `(i, j, img)` / `(j, i, -img)`, replace the two weights with
/// `m = (M_ij + 1 - M_ji) / 2` and `1 - m`. Rows without a complement
/// pass through unchanged. Idempotent: reapplying is a no-op.
pub fn symmetrize(table: &NeighborTable, weights: &[f64]) -> Result<Vec<f64>> {
    if weights.len() != table.len() {
        return Err(Error::InvalidConfig(format!(
            "weight matrix has {} entries for {} table rows",
            weights.len(),
            table.len()
        )));
    }

    // Scoped lookup, built and discarded within the call
    let mut row_of: HashMap<(i64, i64, [i32; 3]), usize> = HashMap::with_capacity(table.len());
    for r in 0..table.len() {
        row_of.insert((table.i[r], table.j[r], table.img[r]), r);
    }

    let mut out = weights.to_vec();
    for r in 0..table.len() {
        let img = table.img[r];
        let complement = (table.j[r], table.i[r], [-img[0], -img[1], -img[2]]);
        if let Some(&c) = row_of.get(&complement) {
            // Touch each unordered pair once
            if c < r {
                continue;
            }
            let m = 0.5 * (out[r] + (1.0 - out[c]));
            out[r] = m;
            out[c] = 1.0 - m;
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::Vector3;

    fn two_row_table() -> NeighborTable {
        let mut t = NeighborTable::default();
        t.push(0, 1, [0, 0, 0], Vector3::x());
        t.push(1, 0, [0, 0, 0], -Vector3::x());
        t
    }

    #[test]
    fn test_complementarity_enforced() {
        let t = two_row_table();
        let m = symmetrize(&t, &[0.7, 0.5]).unwrap();
        assert_relative_eq!(m[0] + m[1], 1.0, epsilon = 1e-15);
        assert_relative_eq!(m[0], 0.6, epsilon = 1e-15);
    }

    #[test]
    fn test_idempotent() {
        let t = two_row_table();
        let once = symmetrize(&t, &[0.3, 0.9]).unwrap();
        let twice = symmetrize(&t, &once).unwrap();
        for (a, b) in once.iter().zip(&twice) {
            assert_relative_eq!(a, b, epsilon = 1e-15);
        }
    }

    #[test]
    fn test_row_without_complement_passes_through() {
        let mut t = NeighborTable::default();
        t.push(0, 1, [1, 0, 0], Vector3::x());
        let m = symmetrize(&t, &[0.42]).unwrap();
        assert_relative_eq!(m[0], 0.42, epsilon = 1e-15);
    }

    #[test]
    fn test_periodic_images_matched() {
        let mut t = NeighborTable::default();
        t.push(0, 1, [1, 0, 0], Vector3::x());
        t.push(1, 0, [-1, 0, 0], -Vector3::x());
        t.push(0, 1, [0, 0, 0], Vector3::y());
        t.push(1, 0, [0, 0, 0], -Vector3::y());
        let m = symmetrize(&t, &[0.8, 0.4, 0.5, 0.5]).unwrap();
        assert_relative_eq!(m[0] + m[1], 1.0, epsilon = 1e-15);
        assert_relative_eq!(m[2], 0.5, epsilon = 1e-15);
        assert_relative_eq!(m[3], 0.5, epsilon = 1e-15);
    }

    #[test]
    fn test_length_mismatch_rejected() {
        let t = two_row_table();
        assert!(symmetrize(&t, &[0.5]).is_err());
    }
}
