//! End-to-end pipeline tests: planning, symmetrization, tessellation

use approx::assert_relative_eq;
use voronoi3d::{
    plan_neighbors, symmetrize, tessellate_pairs, tessellate_pairs_global_mesh,
    tessellate_pairs_with_caps, BoxBounds, BoxContainer, CapOptions, Config, Container, Error,
    FaceLabel, Lattice, TriclinicPbc, Vec3,
};

fn grid_box(n: usize, span: f64) -> Container {
    let mut b = BoxContainer::new(BoxBounds::new(
        Vec3::new(0.0, 0.0, 0.0),
        Vec3::new(span, span, span),
    ));
    let step = span / n as f64;
    let mut sites = Vec::with_capacity(n * n * n);
    for ix in 0..n {
        for iy in 0..n {
            for iz in 0..n {
                sites.push(Vec3::new(
                    (ix as f64 + 0.5) * step,
                    (iy as f64 + 0.5) * step,
                    (iz as f64 + 0.5) * step,
                ));
            }
        }
    }
    b.add_atoms(&sites);
    Container::from(b)
}

#[test]
fn box_grid_cells_partition_the_box() {
    let container = grid_box(4, 8.0);
    let config = Config::default();
    let table = plan_neighbors(&container, &config).unwrap();
    assert!(!table.is_empty());

    let weights = symmetrize(&table, &vec![0.5; table.len()]).unwrap();
    let cells = tessellate_pairs(&container, &table, &weights, &config).unwrap();
    assert_eq!(cells.len(), 64);

    let total: f64 = cells.iter().map(|c| c.volume).sum();
    assert_relative_eq!(total, 512.0, epsilon = 1e-6);

    // Equal weights on a uniform grid give identical cubic cells
    for cell in &cells {
        assert_relative_eq!(cell.volume, 8.0, epsilon = 1e-6);
        for face in &cell.faces {
            assert!(face.area > 0.0);
        }
    }
}

#[test]
fn asymmetric_weights_shift_the_shared_face() {
    let mut b = BoxContainer::new(BoxBounds::new(
        Vec3::new(0.0, 0.0, 0.0),
        Vec3::new(1.0, 1.0, 1.0),
    ));
    b.add_atoms(&[Vec3::new(0.25, 0.5, 0.5), Vec3::new(0.75, 0.5, 0.5)]);
    let container = Container::from(b);
    let config = Config::default();
    let table = plan_neighbors(&container, &config).unwrap();

    // Raw weights violate complementarity; symmetrization resolves them
    // to m = 0.7, putting the face at x = 0.25 + 0.7 * 0.5 = 0.6
    let raw: Vec<f64> = (0..table.len())
        .map(|r| if table.i[r] == 0 { 0.8 } else { 0.4 })
        .collect();
    let weights = symmetrize(&table, &raw).unwrap();
    let cells = tessellate_pairs(&container, &table, &weights, &config).unwrap();

    assert_relative_eq!(cells[0].volume, 0.6, epsilon = 1e-9);
    assert_relative_eq!(cells[1].volume, 0.4, epsilon = 1e-9);

    let neighbor_faces = cells[0]
        .faces
        .iter()
        .filter(|f| matches!(f.label, FaceLabel::Neighbor { site: 1, .. }))
        .count();
    assert_eq!(neighbor_faces, 1);
}

#[test]
fn triclinic_periodic_volumes_conserve_the_cell() {
    let lat = Lattice::new(3.0, 3.2, 2.8, 80.0, 95.0, 100.0).unwrap();
    let cell_volume = lat.volume();
    let mut pbc = TriclinicPbc::new(lat, [true, true, true]);
    pbc.add_atoms(&[
        Vec3::new(0.3, 0.4, 0.5),
        Vec3::new(1.8, 1.2, 0.9),
        Vec3::new(0.9, 2.1, 1.7),
        Vec3::new(2.2, 0.5, 2.0),
    ]);
    let container = Container::from(pbc);
    // min_M of 0.5 keeps the image enumeration compact while still
    // accepting the 0.5 weights below
    let mut config = Config::default();
    config.min_m = 0.5;
    let table = plan_neighbors(&container, &config).unwrap();
    let weights = symmetrize(&table, &vec![0.5; table.len()]).unwrap();
    let cells = tessellate_pairs(&container, &table, &weights, &config).unwrap();

    let total: f64 = cells.iter().map(|c| c.volume).sum();
    assert_relative_eq!(total, cell_volume, epsilon = 5e-2 * cell_volume);
}

#[test]
fn global_mesh_shares_faces_between_cells() {
    let container = grid_box(3, 3.0);
    let config = Config::default();
    let table = plan_neighbors(&container, &config).unwrap();
    let weights = symmetrize(&table, &vec![0.5; table.len()]).unwrap();
    let mesh = tessellate_pairs_global_mesh(&container, &table, &weights, &config).unwrap();

    assert_eq!(mesh.cells.len(), 27);
    let total: f64 = mesh.cells.iter().map(|c| c.volume).sum();
    assert_relative_eq!(total, 27.0, epsilon = 1e-6);

    // Every internal face is referenced by exactly two cells, boundary
    // faces by exactly one
    let mut refs = vec![0usize; mesh.faces.len()];
    for cell in &mesh.cells {
        for &fid in &cell.face_ids {
            refs[fid] += 1;
        }
    }
    for (face, &n) in mesh.faces.iter().zip(&refs) {
        if face.j >= 0 {
            assert_eq!(n, 2, "internal face {}-{} referenced {} times", face.i, face.j, n);
        } else {
            assert_eq!(n, 1);
        }
    }

    // 3x3x3 unit grid: three families of interior walls, 18 per axis
    let internal = mesh.faces.iter().filter(|f| f.j >= 0).count();
    assert_eq!(internal, 54);

    // The merged grid is a 4x4x4 vertex lattice
    assert_eq!(mesh.vertices.len(), 64);
    assert_eq!(mesh.edges.len(), 144);
    assert_eq!(mesh.faces.len(), 108);
}

#[test]
fn capped_surface_cell_approximates_the_sphere() {
    let mut b = BoxContainer::new(BoxBounds::new(
        Vec3::new(-10.0, -10.0, -10.0),
        Vec3::new(10.0, 10.0, 10.0),
    ));
    b.add_atoms(&[Vec3::new(0.0, 0.0, 0.0)]);
    let container = Container::from(b);
    let config = Config::default();
    let table = plan_neighbors(&container, &config).unwrap();
    assert!(table.is_empty());

    let opts = CapOptions {
        enabled: true,
        radius: 2.0,
        lebedev_order: 302,
        surface_atom_ids: [0].into_iter().collect(),
        auto_surface_margin: 0.0,
    };
    let cells = tessellate_pairs_with_caps(&container, &table, &[], &opts, &config).unwrap();
    let sphere = 4.0 / 3.0 * std::f64::consts::PI * 8.0;
    assert_relative_eq!(cells[0].volume, sphere, epsilon = 0.03 * sphere);
    assert!(cells[0]
        .faces
        .iter()
        .all(|f| matches!(f.label, FaceLabel::Cap)));
}

#[test]
fn unsupported_quadrature_order_is_rejected() {
    let container = grid_box(1, 1.0);
    let config = Config::default();
    let table = plan_neighbors(&container, &config).unwrap();
    let opts = CapOptions {
        enabled: true,
        radius: 1.0,
        lebedev_order: 60,
        surface_atom_ids: [0].into_iter().collect(),
        auto_surface_margin: 0.0,
    };
    let err = tessellate_pairs_with_caps(&container, &table, &[], &opts, &config).unwrap_err();
    assert!(matches!(
        err,
        Error::UnsupportedQuadratureOrder { order: 60, .. }
    ));
}
