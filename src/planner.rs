use log::debug;
use nalgebra::{Point3, Vector3};

use crate::container::{BoxContainer, Container, TriclinicPbc};
use crate::error::Result;
use crate::types::{Config, NeighborTable};

/// Below this site count the bucketed search is not worth building.
const EXHAUSTIVE_THRESHOLD: usize = 64;

/// Build the oriented candidate pair table.
///
/// For every unordered pair within the interaction cutoff two rows are
/// emitted, `(i, j, img)` and `(j, i, -img)`. The cutoff interval is
/// closed (`d^2 <= r^2`). In periodic containers every lattice image of a
/// pair within range yields its own row pair, enumerated in lexicographic
/// `(na, nb, nc)` order. A container with a single site yields an empty
/// table. Pure function of its inputs.
pub fn plan_neighbors(container: &Container, config: &Config) -> Result<NeighborTable> {
    config.validate()?;
    let table = match container {
        Container::Box(b) => plan_box(b, config),
        Container::Periodic(p) => plan_periodic(p, config),
    };
    debug!(
        "planned {} oriented rows for {} sites",
        table.len(),
        container.num_sites()
    );
    Ok(table)
}

/// Per-site search radius for a box: the farthest corner bounds how far
/// the cell can reach, and a weight as low as min_M can push a bisector
/// plane up to `reach / min_M` away.
fn box_search_radius(b: &BoxContainer, i: usize, config: &Config) -> f64 {
    b.farthest_corner_radius(i) / config.min_m.max(1e-12) + config.neighbor_skin
}

fn plan_box(b: &BoxContainer, config: &Config) -> NeighborTable {
    let mut table = NeighborTable::default();
    let pos = b.positions();
    let n = pos.len();
    if n <= 1 {
        return table;
    }

    let radii: Vec<f64> = (0..n).map(|i| box_search_radius(b, i, config)).collect();
    let rmax = radii.iter().fold(0.0f64, |a, &r| a.max(r));

    let grid = Grid::build(pos, rmax);
    match grid {
        Some(grid) => {
            for i in 0..n {
                for j in grid.candidates_above(pos, i) {
                    try_pair_box(&mut table, pos, &radii, i, j);
                }
            }
        }
        None => {
            for i in 0..n {
                for j in (i + 1)..n {
                    try_pair_box(&mut table, pos, &radii, i, j);
                }
            }
        }
    }
    table
}

/// Emit both oriented rows for (i, j) if within the pair cutoff.
/// The pair cutoff is the larger of the two per-site radii so that the
/// complement row is always present (candidate symmetry).
fn try_pair_box(
    table: &mut NeighborTable,
    pos: &[Point3<f64>],
    radii: &[f64],
    i: usize,
    j: usize,
) {
    let d = pos[j] - pos[i];
    let cutoff = radii[i].max(radii[j]);
    if d.norm_squared() <= cutoff * cutoff {
        table.push(i, j, [0; 3], d);
        table.push(j, i, [0; 3], -d);
    }
}

fn plan_periodic(p: &TriclinicPbc, config: &Config) -> NeighborTable {
    let mut table = NeighborTable::default();
    let pos = p.positions();
    let n = pos.len();
    if n <= 1 {
        return table;
    }
    if let Some(bucketed) = plan_periodic_bucketed(p, config) {
        return bucketed;
    }

    // Nearest-neighbor distance estimate over minimum images
    let mut dnn = f64::INFINITY;
    for i in 0..n {
        for j in (i + 1)..n {
            let (d, _) = p.lattice.min_image_disp(&pos[i], &pos[j], p.periodic);
            dnn = dnn.min(d.norm());
        }
    }
    if !dnn.is_finite() || dnn == 0.0 {
        dnn = 1.0;
    }
    let reach = config.reach_factor * dnn;
    let rsearch = reach / config.min_m.max(1e-12) + config.neighbor_skin;
    debug!("periodic planning: d_nn={dnn:.4e}, search radius={rsearch:.4e}");

    let range = |k: usize| -> i32 {
        if p.periodic[k] {
            (rsearch / p.lattice.axis(k).norm().max(1e-12)).ceil() as i32
        } else {
            0
        }
    };
    let (na, nb, nc) = (range(0), range(1), range(2));
    let r2max = rsearch * rsearch;

    for i in 0..n {
        for j in 0..n {
            if i == j {
                continue;
            }
            for ia in -na..=na {
                for ib in -nb..=nb {
                    for ic in -nc..=nc {
                        let shift = p.lattice.axis(0) * f64::from(ia)
                            + p.lattice.axis(1) * f64::from(ib)
                            + p.lattice.axis(2) * f64::from(ic);
                        let d = (pos[j] + shift) - pos[i];
                        let d2 = d.norm_squared();
                        if d2 <= r2max && d2 > 0.0 {
                            table.push(i, j, [ia, ib, ic], d);
                        }
                    }
                }
            }
        }
    }
    table
}

/// Bucketed minimum-image search for fully periodic lattices.
///
/// Sites are bucketed by wrapped fractional coordinates, with at least
/// three buckets along every axis so the wrapped 27-bucket neighborhood
/// covers the search radius. Under that condition a pair can have at
/// most one lattice image within range, so the minimum image suffices.
/// Returns `None` when the site count is small, any axis is aperiodic,
/// or the search radius does not fit three buckets; the caller then
/// falls back to the exhaustive image scan.
fn plan_periodic_bucketed(p: &TriclinicPbc, config: &Config) -> Option<NeighborTable> {
    let pos = p.positions();
    let n = pos.len();
    if n < EXHAUSTIVE_THRESHOLD || p.periodic != [true, true, true] {
        return None;
    }

    // Density-based nearest-neighbor estimate; the exact minimum over
    // all pairs is quadratic and only affordable on the fallback path
    let dnn = (p.lattice.volume() / n as f64).cbrt();
    let rsearch = config.reach_factor * dnn / config.min_m.max(1e-12) + config.neighbor_skin;
    if !rsearch.is_finite() || !(rsearch > 0.0) {
        return None;
    }

    // Bucket thickness along each axis is the perpendicular cell height
    // divided by the bucket count, and must stay at least rsearch
    let mut ncell = [0usize; 3];
    for k in 0..3 {
        let others: Vec<usize> = (0..3).filter(|&j| j != k).collect();
        let height = p.lattice.volume()
            / p
                .lattice
                .axis(others[0])
                .cross(&p.lattice.axis(others[1]))
                .norm()
                .max(1e-12);
        let cells = (height / rsearch).floor();
        if cells < 3.0 {
            return None;
        }
        ncell[k] = cells as usize;
    }
    debug!(
        "periodic bucketed planning: d_nn~{dnn:.4e}, search radius={rsearch:.4e}, \
         buckets={ncell:?}"
    );

    let frac: Vec<Vector3<f64>> = pos
        .iter()
        .map(|r| p.lattice.wrap_frac(&p.lattice.to_frac(&r.coords), p.periodic))
        .collect();
    let bucket_of = |f: &Vector3<f64>| -> [usize; 3] {
        let mut c = [0usize; 3];
        for k in 0..3 {
            c[k] = ((f[k] * ncell[k] as f64) as usize).min(ncell[k] - 1);
        }
        c
    };
    let index = |c: [usize; 3]| c[2] * ncell[0] * ncell[1] + c[1] * ncell[0] + c[0];

    let mut buckets: Vec<Vec<usize>> = vec![Vec::new(); ncell[0] * ncell[1] * ncell[2]];
    for (id, f) in frac.iter().enumerate() {
        buckets[index(bucket_of(f))].push(id);
    }

    let wrap = |c: usize, d: i64, m: usize| -> usize {
        (c as i64 + d).rem_euclid(m as i64) as usize
    };
    let r2 = rsearch * rsearch;
    let mut table = NeighborTable::default();
    for i in 0..n {
        let c = bucket_of(&frac[i]);
        for dx in -1i64..=1 {
            for dy in -1i64..=1 {
                for dz in -1i64..=1 {
                    let b = [
                        wrap(c[0], dx, ncell[0]),
                        wrap(c[1], dy, ncell[1]),
                        wrap(c[2], dz, ncell[2]),
                    ];
                    for &j in &buckets[index(b)] {
                        if j <= i {
                            continue;
                        }
                        let (d, img) = p.lattice.min_image_disp(&pos[i], &pos[j], p.periodic);
                        if d.norm_squared() <= r2 {
                            table.push(i, j, img, d);
                            table.push(j, i, [-img[0], -img[1], -img[2]], -d);
                        }
                    }
                }
            }
        }
    }
    Some(table)
}

/// Bucketed cell list over site positions, one bucket per cutoff-sized
/// cube, searched over the 27-cell neighborhood.
struct Grid {
    cell_size: f64,
    offset: [i32; 3],
    size: [i32; 3],
    /// bucket index -> site ids
    buckets: Vec<Vec<usize>>,
}

impl Grid {
    /// Returns `None` when bucketing degenerates: too few sites, a cutoff
    /// wider than the point cloud, or a non-finite cutoff.
    fn build(pos: &[Point3<f64>], cutoff: f64) -> Option<Self> {
        if pos.len() < EXHAUSTIVE_THRESHOLD || !(cutoff > 0.0) || !cutoff.is_finite() {
            return None;
        }
        let cell_of = |p: &Point3<f64>| -> [i32; 3] {
            [
                (p.x / cutoff).floor() as i32,
                (p.y / cutoff).floor() as i32,
                (p.z / cutoff).floor() as i32,
            ]
        };

        let first = cell_of(&pos[0]);
        let mut lo = first;
        let mut hi = first;
        for p in &pos[1..] {
            let c = cell_of(p);
            for k in 0..3 {
                lo[k] = lo[k].min(c[k]);
                hi[k] = hi[k].max(c[k]);
            }
        }
        let size = [hi[0] - lo[0] + 1, hi[1] - lo[1] + 1, hi[2] - lo[2] + 1];
        let total = size[0] as usize * size[1] as usize * size[2] as usize;
        if total < 27 {
            return None;
        }

        let mut grid = Self {
            cell_size: cutoff,
            offset: lo,
            size,
            buckets: vec![Vec::new(); total],
        };
        for (id, p) in pos.iter().enumerate() {
            let idx = grid.bucket_index(p);
            grid.buckets[idx].push(id);
        }
        Some(grid)
    }

    fn cell_coords(&self, p: &Point3<f64>) -> [i32; 3] {
        [
            (p.x / self.cell_size).floor() as i32 - self.offset[0],
            (p.y / self.cell_size).floor() as i32 - self.offset[1],
            (p.z / self.cell_size).floor() as i32 - self.offset[2],
        ]
    }

    fn bucket_index(&self, p: &Point3<f64>) -> usize {
        let c = self.cell_coords(p);
        (c[2] * self.size[0] * self.size[1] + c[1] * self.size[0] + c[0]) as usize
    }

    /// Candidate partners of site `i` with id > i from the 27-cell
    /// neighborhood (each unordered pair surfaces exactly once).
    fn candidates_above(&self, pos: &[Point3<f64>], i: usize) -> Vec<usize> {
        let c = self.cell_coords(&pos[i]);
        let mut out = Vec::new();
        for dx in -1..=1 {
            for dy in -1..=1 {
                for dz in -1..=1 {
                    let (x, y, z) = (c[0] + dx, c[1] + dy, c[2] + dz);
                    if x < 0
                        || y < 0
                        || z < 0
                        || x >= self.size[0]
                        || y >= self.size[1]
                        || z >= self.size[2]
                    {
                        continue;
                    }
                    let idx = (z * self.size[0] * self.size[1] + y * self.size[0] + x) as usize;
                    out.extend(self.buckets[idx].iter().copied().filter(|&j| j > i));
                }
            }
        }
        out
    }
}
