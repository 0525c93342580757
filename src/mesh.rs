use std::collections::{HashMap, HashSet};

use nalgebra::{Point3, Vector3};

use crate::container::Container;
use crate::error::Result;
use crate::geometry::newell_normal;
use crate::polyhedron::{FaceTag, PolyFace, Polyhedron};
use crate::tessellation::{build_cell_polyhedra, lattice_image_shifts};
use crate::types::{Config, GlobalMesh, MeshCell, MeshFace, NeighborTable, Vec3};

/// Canonical identity of an internal face: lower site first, image
/// oriented from the lower to the higher site. Periodic self-pairs use
/// the lexicographically smaller image vector as the canonical side.
type FaceKey = (usize, usize, [i32; 3]);

/// Compute all cells and merge them into one deduplicated mesh.
///
/// Each internal face has a single canonical owner, the lower-indexed
/// site of its pair; the partner cell references the owner's polygon
/// instead of re-emitting a near-identical copy, so shared boundaries are
/// identical by construction. Face loops are wound so their Newell normal
/// follows `normal_ij` (canonical i to j for internal faces, outward for
/// boundary faces, which carry the sentinel `j = -1`). Output ordering is
/// a stable function of site index.
pub fn tessellate_pairs_global_mesh(
    container: &Container,
    table: &NeighborTable,
    weights: &[f64],
    config: &Config,
) -> Result<GlobalMesh> {
    let polys = build_cell_polyhedra(container, table, weights, None, config)?;
    let self_shifts: Vec<([i32; 3], Vector3<f64>)> = match container {
        Container::Box(_) => Vec::new(),
        Container::Periodic(p) => lattice_image_shifts(p),
    };

    let mut mesh = GlobalMesh::default();
    let mut vertex_ids: HashMap<(i64, i64, i64), usize> = HashMap::new();
    let mut face_ids: HashMap<FaceKey, usize> = HashMap::new();
    let quantum = (config.eps_pos * 100.0).max(1e-9);

    for (site, poly) in polys.iter().enumerate() {
        let local_to_global = register_vertices(poly, quantum, &mut vertex_ids, &mut mesh);
        let cell_centroid = poly.centroid();
        let mut cell = MeshCell {
            site,
            face_ids: Vec::with_capacity(poly.faces.len()),
            volume: poly.volume(),
            centroid: Vec3::from_point(&cell_centroid),
        };

        for face in &poly.faces {
            let area = poly.face_area(face);
            if area < config.min_face_area {
                continue;
            }

            let partner = match face.tag {
                FaceTag::Neighbor(row) => {
                    Some((table.j[row] as usize, table.img[row], table.disp[row]))
                }
                FaceTag::SelfImage(k) => Some((site, self_shifts[k].0, self_shifts[k].1)),
                FaceTag::Wall(_) | FaceTag::Cap(_) | FaceTag::Seed => None,
            };

            let fid = match partner {
                None => {
                    let fid = mesh.faces.len();
                    mesh.faces.push(boundary_face(
                        site,
                        poly,
                        face,
                        &cell_centroid,
                        area,
                        &local_to_global,
                    ));
                    fid
                }
                Some((other, img, disp)) => {
                    let key = canonical_key(site, other, img);
                    if let Some(&fid) = face_ids.get(&key) {
                        // The owner already registered this face; reuse it
                        fid
                    } else {
                        let dir = if key.0 == site && key.2 == img {
                            disp
                        } else {
                            -disp
                        };
                        let fid = mesh.faces.len();
                        mesh.faces.push(internal_face(
                            key,
                            poly,
                            face,
                            &dir,
                            area,
                            &local_to_global,
                        ));
                        face_ids.insert(key, fid);
                        fid
                    }
                }
            };
            cell.face_ids.push(fid);
        }
        mesh.cells.push(cell);
    }

    collect_edges(&mut mesh);
    Ok(mesh)
}

/// Internal face record, loop wound to follow the canonical i-to-j
/// direction.
fn internal_face(
    key: FaceKey,
    poly: &Polyhedron,
    face: &PolyFace,
    dir: &Vector3<f64>,
    area: f64,
    local_to_global: &[usize],
) -> MeshFace {
    let unit = dir / dir.norm();
    let mut cycle: Vec<usize> = face.cycle.iter().map(|&v| local_to_global[v]).collect();
    if newell_normal(&poly.vertices, &face.cycle).dot(&unit) < 0.0 {
        cycle.reverse();
    }
    MeshFace {
        i: key.0 as i64,
        j: key.1 as i64,
        image: key.2,
        vertices: cycle,
        area,
        centroid: face_centroid(poly, face),
        normal_ij: Vec3::from_vector(&unit),
    }
}

/// Boundary face record (`j = -1`), loop wound outward from the cell.
fn boundary_face(
    site: usize,
    poly: &Polyhedron,
    face: &PolyFace,
    cell_centroid: &Point3<f64>,
    area: f64,
    local_to_global: &[usize],
) -> MeshFace {
    let centroid = face_centroid(poly, face);
    let outward = centroid.to_point() - cell_centroid;
    let mut normal = newell_normal(&poly.vertices, &face.cycle);
    let mut cycle: Vec<usize> = face.cycle.iter().map(|&v| local_to_global[v]).collect();
    if normal.dot(&outward) < 0.0 {
        cycle.reverse();
        normal = -normal;
    }
    MeshFace {
        i: site as i64,
        j: -1,
        image: [0; 3],
        vertices: cycle,
        area,
        centroid,
        normal_ij: Vec3::from_vector(&normal.normalize()),
    }
}

fn face_centroid(poly: &Polyhedron, face: &PolyFace) -> Vec3 {
    let sum = face
        .cycle
        .iter()
        .fold(Point3::origin(), |acc, &v| acc + poly.vertices[v].coords);
    Vec3::from_point(&(sum / face.cycle.len() as f64))
}

/// Unique unordered vertex pairs over all face loops, in first-encounter
/// order.
fn collect_edges(mesh: &mut GlobalMesh) {
    let mut seen: HashSet<(usize, usize)> = HashSet::new();
    for face in &mesh.faces {
        let cycle = &face.vertices;
        for k in 0..cycle.len() {
            let a = cycle[k];
            let b = cycle[(k + 1) % cycle.len()];
            let pair = (a.min(b), a.max(b));
            if seen.insert(pair) {
                mesh.edges.push([pair.0, pair.1]);
            }
        }
    }
}

/// Map a cell's local vertices onto deduplicated global ids through
/// quantized coordinate keys.
fn register_vertices(
    poly: &Polyhedron,
    quantum: f64,
    vertex_ids: &mut HashMap<(i64, i64, i64), usize>,
    mesh: &mut GlobalMesh,
) -> Vec<usize> {
    poly.vertices
        .iter()
        .map(|v| {
            let key = quantize(v, quantum);
            *vertex_ids.entry(key).or_insert_with(|| {
                mesh.vertices.push(Vec3::from_point(v));
                mesh.vertices.len() - 1
            })
        })
        .collect()
}

fn quantize(v: &Point3<f64>, quantum: f64) -> (i64, i64, i64) {
    (
        (v.x / quantum).round() as i64,
        (v.y / quantum).round() as i64,
        (v.z / quantum).round() as i64,
    )
}

/// Orient a face identity so both sides of a pair agree on one key.
fn canonical_key(site: usize, other: usize, img: [i32; 3]) -> FaceKey {
    let neg = [-img[0], -img[1], -img[2]];
    if site < other || (site == other && img <= neg) {
        (site, other, img)
    } else {
        (other, site, neg)
    }
}
