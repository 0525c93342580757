//! Weighted Voronoi (power diagram) tessellation of point sites in 3D.
//!
//! Cells are built by intersecting half-spaces: for every neighboring pair
//! of sites a separating plane is placed along the connecting segment at a
//! fractional position given by a per-pair weight, so `w = 0.5` recovers
//! the ordinary Voronoi diagram and asymmetric weights shift each face
//! toward one site. Sites live either in a finite axis-aligned box or in a
//! triclinic lattice with per-axis periodic boundaries.
//!
//! The pipeline has three stages that can be used independently:
//! candidate pair planning ([`plan_neighbors`]), weight symmetrization
//! ([`symmetrize`]) and cell construction ([`tessellate_pairs`]). Cells at
//! open domain surfaces can be closed with quadrature-approximated
//! spherical caps ([`tessellate_pairs_with_caps`]), and all cells can be
//! merged into one deduplicated mesh where every shared face is stored
//! exactly once ([`tessellate_pairs_global_mesh`]).
//!
//! # Example
//!
//! ```
//! use voronoi3d::{
//!     plan_neighbors, symmetrize, tessellate_pairs, BoxBounds, BoxContainer, Config,
//!     Container, Vec3,
//! };
//!
//! let mut sites = BoxContainer::new(BoxBounds::new(
//!     Vec3::new(0.0, 0.0, 0.0),
//!     Vec3::new(1.0, 1.0, 1.0),
//! ));
//! sites.add_atoms(&[Vec3::new(0.25, 0.5, 0.5), Vec3::new(0.75, 0.5, 0.5)]);
//! let container = Container::from(sites);
//!
//! let config = Config::default();
//! let table = plan_neighbors(&container, &config)?;
//! let weights = symmetrize(&table, &vec![0.5; table.len()])?;
//! let cells = tessellate_pairs(&container, &table, &weights, &config)?;
//!
//! for cell in &cells {
//!     println!("cell {}: volume={:.3}, faces={}", cell.site, cell.volume, cell.faces.len());
//! }
//! # Ok::<(), voronoi3d::Error>(())
//! ```

mod container;
mod error;
mod geometry;
mod lattice;
mod lebedev;
mod mesh;
mod planner;
mod polyhedron;
mod tessellation;
mod types;
mod weights;

pub use container::{BoxBounds, BoxContainer, Container, TriclinicPbc};
pub use error::{Error, Result};
pub use lattice::Lattice;
pub use lebedev::SUPPORTED_ORDERS;
pub use mesh::tessellate_pairs_global_mesh;
pub use planner::plan_neighbors;
pub use tessellation::{tessellate_pairs, tessellate_pairs_with_caps};
pub use types::{
    CapOptions, Cell, CellFace, Config, FaceLabel, GlobalMesh, MeshCell, MeshFace, NeighborTable,
    Vec3,
};
pub use weights::symmetrize;
