use std::collections::HashMap;

use nalgebra::Point3;

use crate::geometry::{
    float_cmp, intersect_plane_segment, order_loop_ccw, signed_tetrahedron_volume, triangle_area,
    Plane,
};

/// What produced a face of the working polyhedron.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FaceTag {
    /// Bisector plane from neighbor table row
    Neighbor(usize),
    /// Midplane to the site's own periodic image (index into the
    /// container's image shift list)
    SelfImage(usize),
    /// Container wall (0..6)
    Wall(usize),
    /// Quadrature cap direction
    Cap(usize),
    /// Synthetic seed face of an initially unbounded region; any remnant
    /// after clipping means the cell is underconstrained
    Seed,
}

#[derive(Debug, Clone)]
pub(crate) struct PolyFace {
    pub cycle: Vec<usize>,
    pub tag: FaceTag,
}

/// Outcome of clipping by one half-space.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ClipOutcome {
    /// Polyhedron already inside the half-space
    Unchanged,
    /// Plane cut the polyhedron; a new face was introduced
    Clipped,
    /// Nothing (above tolerance) remains on the kept side
    Empty,
}

/// Convex polyhedron as a vertex list plus face cycles. Maintained convex
/// by construction: it only ever shrinks through half-space clips.
#[derive(Debug, Clone, Default)]
pub(crate) struct Polyhedron {
    pub vertices: Vec<Point3<f64>>,
    pub faces: Vec<PolyFace>,
}

impl Polyhedron {
    /// Axis-aligned cuboid with per-face tags ordered
    /// (-x, +x, -y, +y, -z, +z), matching wall plane order.
    pub fn cuboid(lo: &Point3<f64>, hi: &Point3<f64>, tags: [FaceTag; 6]) -> Self {
        let vertices = vec![
            Point3::new(lo.x, lo.y, lo.z),
            Point3::new(hi.x, lo.y, lo.z),
            Point3::new(hi.x, hi.y, lo.z),
            Point3::new(lo.x, hi.y, lo.z),
            Point3::new(lo.x, lo.y, hi.z),
            Point3::new(hi.x, lo.y, hi.z),
            Point3::new(hi.x, hi.y, hi.z),
            Point3::new(lo.x, hi.y, hi.z),
        ];
        let cycles: [Vec<usize>; 6] = [
            vec![0, 4, 7, 3], // -x
            vec![1, 2, 6, 5], // +x
            vec![0, 1, 5, 4], // -y
            vec![3, 7, 6, 2], // +y
            vec![0, 3, 2, 1], // -z
            vec![4, 5, 6, 7], // +z
        ];
        let faces = cycles
            .into_iter()
            .zip(tags)
            .map(|(cycle, tag)| PolyFace { cycle, tag })
            .collect();
        Self { vertices, faces }
    }

    pub fn is_empty(&self) -> bool {
        self.faces.is_empty()
    }

    pub fn clear(&mut self) {
        self.vertices.clear();
        self.faces.clear();
    }

    /// Intersect with the half-space `plane.normal · x <= plane.offset`.
    ///
    /// Each face cycle is clipped against the plane; crossing edges get a
    /// shared intersection vertex, and the on-plane vertices form one new
    /// face carrying `tag`. Tolerance comes from the shared geometry
    /// epsilon; vertices within it are treated as lying on the plane.
    pub fn clip(&mut self, plane: &Plane, tag: FaceTag) -> ClipOutcome {
        if self.is_empty() {
            return ClipOutcome::Empty;
        }
        let dist: Vec<f64> = self
            .vertices
            .iter()
            .map(|v| plane.signed_distance(v))
            .collect();

        if !dist.iter().any(|&d| float_cmp::gt(d, 0.0)) {
            return ClipOutcome::Unchanged;
        }
        if !dist.iter().any(|&d| float_cmp::lt(d, 0.0)) {
            // Collapsed below tolerance: a legitimate zero-volume outcome
            self.clear();
            return ClipOutcome::Empty;
        }

        // Shared intersection vertices so adjacent faces stay stitched
        let mut edge_cut: HashMap<(usize, usize), usize> = HashMap::new();
        let mut vertices = std::mem::take(&mut self.vertices);
        let mut new_faces: Vec<PolyFace> = Vec::with_capacity(self.faces.len() + 1);

        for face in self.faces.drain(..) {
            let n = face.cycle.len();
            let mut cycle = Vec::with_capacity(n + 2);
            for k in 0..n {
                let a = face.cycle[k];
                let b = face.cycle[(k + 1) % n];
                if float_cmp::le(dist[a], 0.0) {
                    cycle.push(a);
                }
                let crosses = (float_cmp::lt(dist[a], 0.0) && float_cmp::gt(dist[b], 0.0))
                    || (float_cmp::gt(dist[a], 0.0) && float_cmp::lt(dist[b], 0.0));
                if crosses {
                    let key = (a.min(b), a.max(b));
                    let id = *edge_cut.entry(key).or_insert_with(|| {
                        let p = intersect_plane_segment(
                            &vertices[a],
                            &vertices[b],
                            dist[a],
                            dist[b],
                        );
                        vertices.push(p);
                        vertices.len() - 1
                    });
                    cycle.push(id);
                }
            }
            cycle.dedup();
            while cycle.len() > 1 && cycle.first() == cycle.last() {
                cycle.pop();
            }
            if cycle.len() >= 3 {
                new_faces.push(PolyFace {
                    cycle,
                    tag: face.tag,
                });
            }
        }

        // Assemble the cut polygon from every surviving on-plane vertex
        let mut on_plane: Vec<usize> = Vec::new();
        for face in &new_faces {
            for &v in &face.cycle {
                let d = if v < dist.len() { dist[v] } else { 0.0 };
                if float_cmp::eq(d, 0.0) && !on_plane.contains(&v) {
                    on_plane.push(v);
                }
            }
        }
        if on_plane.len() >= 3 {
            let center = on_plane
                .iter()
                .fold(Point3::origin(), |acc, &v| acc + vertices[v].coords)
                / on_plane.len() as f64;
            order_loop_ccw(&vertices, &mut on_plane, &center, &plane.normal);
            new_faces.push(PolyFace {
                cycle: on_plane,
                tag,
            });
        }

        self.vertices = vertices;
        self.faces = new_faces;
        if self.faces.len() < 4 {
            // Fewer than four faces cannot bound a 3D region
            self.clear();
            return ClipOutcome::Empty;
        }
        self.compact();
        ClipOutcome::Clipped
    }

    /// Drop vertices no face references, remapping cycles.
    fn compact(&mut self) {
        let mut used = vec![false; self.vertices.len()];
        for face in &self.faces {
            for &v in &face.cycle {
                used[v] = true;
            }
        }
        let mut remap = vec![usize::MAX; self.vertices.len()];
        let mut kept = Vec::with_capacity(self.vertices.len());
        for (i, v) in self.vertices.iter().enumerate() {
            if used[i] {
                remap[i] = kept.len();
                kept.push(*v);
            }
        }
        for face in &mut self.faces {
            for v in &mut face.cycle {
                *v = remap[*v];
            }
        }
        self.vertices = kept;
    }

    /// Centroid of the vertex set; interior for a convex polyhedron.
    pub fn centroid(&self) -> Point3<f64> {
        if self.vertices.is_empty() {
            return Point3::origin();
        }
        self.vertices
            .iter()
            .fold(Point3::origin(), |acc, v| acc + v.coords)
            / self.vertices.len() as f64
    }

    /// Area of one face by fan triangulation.
    pub fn face_area(&self, face: &PolyFace) -> f64 {
        let c = &face.cycle;
        let mut area = 0.0;
        for k in 1..c.len().saturating_sub(1) {
            area += triangle_area(
                &self.vertices[c[0]],
                &self.vertices[c[k]],
                &self.vertices[c[k + 1]],
            );
        }
        area
    }

    /// Volume by divergence-theorem summation of face pyramids from the
    /// vertex centroid. Face winding is not assumed consistent, so each
    /// face pyramid contributes its magnitude.
    pub fn volume(&self) -> f64 {
        if self.is_empty() {
            return 0.0;
        }
        let o = self.centroid();
        let mut volume = 0.0;
        for face in &self.faces {
            let c = &face.cycle;
            let mut pyramid = 0.0;
            for k in 1..c.len().saturating_sub(1) {
                pyramid += signed_tetrahedron_volume(
                    &o,
                    &self.vertices[c[0]],
                    &self.vertices[c[k]],
                    &self.vertices[c[k + 1]],
                );
            }
            volume += pyramid.abs();
        }
        volume
    }

    /// Whether any synthetic seed face survived clipping.
    pub fn has_seed_face(&self) -> bool {
        self.faces.iter().any(|f| f.tag == FaceTag::Seed)
    }
}
