use log::debug;
use nalgebra::{Point3, Vector3};
use rayon::prelude::*;

use crate::container::{Container, TriclinicPbc};
use crate::error::{Error, Result};
use crate::geometry::Plane;
use crate::lebedev::quadrature_directions;
use crate::polyhedron::{FaceTag, Polyhedron};
use crate::types::{CapOptions, Cell, CellFace, Config, FaceLabel, NeighborTable, Vec3};

/// Main entry point: clip every site's polyhedron against its weighted
/// bisector half-spaces (and container walls), one cell per site.
///
/// Rows whose weight falls below `config.min_m` contribute no plane. A
/// cell that collapses below tolerance is returned with zero volume and
/// no faces; a cell that stays unbounded is an error.
pub fn tessellate_pairs(
    container: &Container,
    table: &NeighborTable,
    weights: &[f64],
    config: &Config,
) -> Result<Vec<Cell>> {
    let polys = build_cell_polyhedra(container, table, weights, None, config)?;
    Ok(polys
        .into_iter()
        .enumerate()
        .map(|(site, poly)| poly_to_cell(site, &poly, table, container, config))
        .collect())
}

/// Like [`tessellate_pairs`], but sites designated as surface sites trade
/// their container walls for a set of supporting half-spaces tangent to a
/// sphere of `cap_options.radius`, closing open cells with a polygonal
/// approximation of a spherical cap.
pub fn tessellate_pairs_with_caps(
    container: &Container,
    table: &NeighborTable,
    weights: &[f64],
    cap_options: &CapOptions,
    config: &Config,
) -> Result<Vec<Cell>> {
    if !cap_options.enabled {
        return tessellate_pairs(container, table, weights, config);
    }
    let polys = build_cell_polyhedra(container, table, weights, Some(cap_options), config)?;
    Ok(polys
        .into_iter()
        .enumerate()
        .map(|(site, poly)| poly_to_cell(site, &poly, table, container, config))
        .collect())
}

/// Per-site clipping environment, read-only across the rayon fan-out.
struct ClipContext<'a> {
    container: &'a Container,
    table: &'a NeighborTable,
    weights: &'a [f64],
    config: &'a Config,
    /// Rows of each site, sorted by squared distance (closest planes
    /// first, so empty cells are detected early)
    rows_by_site: Vec<Vec<usize>>,
    /// Periodic containers: shifts to the site's own lattice images,
    /// plus the synthetic seed half-extent
    self_shifts: Vec<([i32; 3], Vector3<f64>)>,
    seed_half_extent: f64,
    /// Cap closure: quadrature directions, radius, per-site surface flag
    caps: Option<CapContext>,
}

struct CapContext {
    directions: Vec<Vector3<f64>>,
    radius: f64,
    surface: Vec<bool>,
}

/// Run the weighted clipping for every site, in parallel, gathering the
/// resulting polyhedra in site order.
pub(crate) fn build_cell_polyhedra(
    container: &Container,
    table: &NeighborTable,
    weights: &[f64],
    cap_options: Option<&CapOptions>,
    config: &Config,
) -> Result<Vec<Polyhedron>> {
    config.validate()?;
    if weights.len() != table.len() {
        return Err(Error::InvalidConfig(format!(
            "weight matrix has {} entries for {} table rows",
            weights.len(),
            table.len()
        )));
    }
    let n = container.num_sites();
    if n == 0 {
        return Ok(Vec::new());
    }

    let mut rows_by_site: Vec<Vec<usize>> = vec![Vec::new(); n];
    for r in 0..table.len() {
        rows_by_site[table.i[r] as usize].push(r);
    }
    for rows in &mut rows_by_site {
        rows.sort_by(|&a, &b| table.r2[a].total_cmp(&table.r2[b]));
    }

    let (self_shifts, seed_half_extent) = match container {
        Container::Box(_) => (Vec::new(), 0.0),
        Container::Periodic(p) => {
            let shifts = lattice_image_shifts(p);
            (shifts, seed_extent(p, table))
        }
    };

    let caps = match cap_options {
        Some(opt) => {
            opt.validate(n)?;
            Some(CapContext {
                directions: quadrature_directions(opt.lebedev_order)?,
                radius: opt.radius,
                surface: surface_flags(container, opt),
            })
        }
        None => None,
    };

    let ctx = ClipContext {
        container,
        table,
        weights,
        config,
        rows_by_site,
        self_shifts,
        seed_half_extent,
        caps,
    };

    (0..n)
        .into_par_iter()
        .map(|site| build_site_polyhedron(site, &ctx))
        .collect()
}

/// Which sites get a spherical cap: the explicit id set, or for box
/// containers with a positive margin, every site that close to a wall.
fn surface_flags(container: &Container, opt: &CapOptions) -> Vec<bool> {
    let n = container.num_sites();
    if !opt.surface_atom_ids.is_empty() {
        let mut flags = vec![false; n];
        for &id in &opt.surface_atom_ids {
            flags[id] = true;
        }
        return flags;
    }
    if opt.auto_surface_margin > 0.0 {
        if let Container::Box(b) = container {
            let (lo, hi, m) = (b.bounds.lo, b.bounds.hi, opt.auto_surface_margin);
            return b
                .positions()
                .iter()
                .map(|r| {
                    r.x - lo.x < m
                        || hi.x - r.x < m
                        || r.y - lo.y < m
                        || hi.y - r.y < m
                        || r.z - lo.z < m
                        || hi.z - r.z < m
                })
                .collect();
        }
    }
    vec![false; n]
}

fn build_site_polyhedron(site: usize, ctx: &ClipContext<'_>) -> Result<Polyhedron> {
    let pos = ctx.container.positions();
    let ri = pos[site];
    let is_surface = ctx
        .caps
        .as_ref()
        .is_some_and(|c| c.surface[site]);

    let mut planes: Vec<(Plane, FaceTag)> = Vec::new();
    let mut poly = match ctx.container {
        Container::Box(b) => {
            if is_surface {
                // Caps replace the walls; seed a cube the caps must carve
                let h = 2.0 * ctx.caps.as_ref().map_or(1.0, |c| c.radius);
                seed_cube(&ri, h)
            } else {
                Polyhedron::cuboid(
                    &b.bounds.lo.to_point(),
                    &b.bounds.hi.to_point(),
                    [0, 1, 2, 3, 4, 5].map(FaceTag::Wall),
                )
            }
        }
        Container::Periodic(_) => seed_cube(&ri, ctx.seed_half_extent),
    };

    // Midplanes to the site's own periodic images keep every periodic
    // cell inside the Wigner-Seitz region of its own sublattice; without
    // them periodic cells would overlap their own translates.
    for (k, (_, shift)) in ctx.self_shifts.iter().enumerate() {
        let point = ri + shift * 0.5;
        planes.push((
            Plane::from_point_normal(&point, shift),
            FaceTag::SelfImage(k),
        ));
    }

    for &row in &ctx.rows_by_site[site] {
        let w = ctx.weights[row];
        if w < ctx.config.min_m {
            continue;
        }
        let disp = ctx.table.disp[row];
        if disp.norm_squared() == 0.0 {
            continue;
        }
        let point = ri + disp * w;
        planes.push((Plane::from_point_normal(&point, &disp), FaceTag::Neighbor(row)));
    }

    if is_surface {
        if let Some(c) = &ctx.caps {
            for (k, dir) in c.directions.iter().enumerate() {
                let point = ri + dir * c.radius;
                planes.push((Plane::from_point_normal(&point, dir), FaceTag::Cap(k)));
            }
        }
    }

    let planes = merge_coincident_planes(planes);
    for (plane, tag) in &planes {
        poly.clip(plane, *tag);
        if poly.is_empty() {
            debug!("site {site}: cell collapsed to zero volume");
            return Ok(Polyhedron::default());
        }
    }

    if poly.has_seed_face() {
        return Err(Error::UnderconstrainedCell { site });
    }
    Ok(poly)
}

fn seed_cube(center: &Point3<f64>, half_extent: f64) -> Polyhedron {
    let h = Vector3::repeat(half_extent);
    Polyhedron::cuboid(&(center - h), &(center + h), [FaceTag::Seed; 6])
}

/// Synthetic seed half-extent for a periodic container: generously larger
/// than any cell that is actually bounded, so a surviving seed face is a
/// reliable unboundedness signal.
fn seed_extent(p: &TriclinicPbc, table: &NeighborTable) -> f64 {
    let axes: f64 = (0..3)
        .filter(|&k| p.periodic[k])
        .map(|k| p.lattice.axis(k).norm())
        .sum();
    let max_disp = table.r2.iter().fold(0.0f64, |a, &r2| a.max(r2)).sqrt();
    2.0 * (axes + max_disp + 1.0)
}

/// Shifts to a site's own periodic images, enumerated far enough out to
/// carve the full Wigner-Seitz region, in lexicographic image order.
pub(crate) fn lattice_image_shifts(p: &TriclinicPbc) -> Vec<([i32; 3], Vector3<f64>)> {
    // Any point of the Wigner-Seitz cell lies within half the periodic
    // axis-length sum; images beyond twice that cannot contribute a face.
    let diameter: f64 = (0..3)
        .filter(|&k| p.periodic[k])
        .map(|k| p.lattice.axis(k).norm())
        .sum();
    if diameter == 0.0 {
        return Vec::new();
    }
    let range = |k: usize| -> i32 {
        if !p.periodic[k] {
            return 0;
        }
        let others: Vec<usize> = (0..3).filter(|&j| j != k).collect();
        let spacing = p.lattice.volume()
            / p.lattice.axis(others[0])
                .cross(&p.lattice.axis(others[1]))
                .norm()
                .max(1e-12);
        (diameter / spacing).ceil() as i32
    };
    let (na, nb, nc) = (range(0), range(1), range(2));

    let mut shifts = Vec::new();
    for ia in -na..=na {
        for ib in -nb..=nb {
            for ic in -nc..=nc {
                if ia == 0 && ib == 0 && ic == 0 {
                    continue;
                }
                let shift = p.lattice.axis(0) * f64::from(ia)
                    + p.lattice.axis(1) * f64::from(ib)
                    + p.lattice.axis(2) * f64::from(ic);
                if shift.norm() <= diameter + 1e-9 {
                    shifts.push(([ia, ib, ic], shift));
                }
            }
        }
    }
    shifts
}

/// Merge near-coincident planes, keeping the more restrictive offset.
fn merge_coincident_planes(planes: Vec<(Plane, FaceTag)>) -> Vec<(Plane, FaceTag)> {
    let mut out: Vec<(Plane, FaceTag)> = Vec::with_capacity(planes.len());
    'next: for (plane, tag) in planes {
        for (kept, kept_tag) in &mut out {
            if plane.nearly_coincident(kept) {
                if plane.offset < kept.offset {
                    *kept = plane;
                    *kept_tag = tag;
                }
                continue 'next;
            }
        }
        out.push((plane, tag));
    }
    out
}

/// Convert a clipped polyhedron into the public cell representation,
/// pruning faces below the minimum area.
pub(crate) fn poly_to_cell(
    site: usize,
    poly: &Polyhedron,
    table: &NeighborTable,
    container: &Container,
    config: &Config,
) -> Cell {
    let self_images: Vec<[i32; 3]> = match container {
        Container::Box(_) => Vec::new(),
        Container::Periodic(p) => lattice_image_shifts(p).iter().map(|s| s.0).collect(),
    };

    let mut faces = Vec::with_capacity(poly.faces.len());
    for face in &poly.faces {
        let area = poly.face_area(face);
        if area < config.min_face_area {
            continue;
        }
        let label = match face.tag {
            FaceTag::Neighbor(row) => FaceLabel::Neighbor {
                site: table.j[row] as usize,
                image: table.img[row],
            },
            FaceTag::SelfImage(k) => FaceLabel::Neighbor {
                site,
                image: self_images[k],
            },
            FaceTag::Wall(_) => FaceLabel::Wall,
            FaceTag::Cap(_) => FaceLabel::Cap,
            FaceTag::Seed => FaceLabel::Wall,
        };
        faces.push(CellFace {
            vertices: face.cycle.clone(),
            label,
            area,
        });
    }

    Cell {
        site,
        vertices: poly.vertices.iter().map(Vec3::from_point).collect(),
        faces,
        volume: poly.volume(),
    }
}
