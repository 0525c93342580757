use thiserror::Error;

/// Errors surfaced by the tessellation core.
///
/// Geometric degeneracies (empty or collapsed cells) are never errors;
/// they produce zero-volume cells. Only configuration problems, bad
/// indices, and genuinely unbounded cells are reported here.
#[derive(Debug, Error)]
pub enum Error {
    /// A configuration value is outside its accepted range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The lattice matrix is singular or has non-positive volume.
    #[error("degenerate lattice (volume {volume})")]
    DegenerateLattice { volume: f64 },

    /// The requested quadrature order is not in the supported table.
    /// Orders are never rounded to a nearby supported value.
    #[error("unsupported quadrature order {order} (supported: {supported:?})")]
    UnsupportedQuadratureOrder {
        order: usize,
        supported: &'static [usize],
    },

    /// A cap option referenced a site id outside the container.
    #[error("unknown site id {id} (container holds {num_sites} sites)")]
    UnknownSiteId { id: usize, num_sites: usize },

    /// A site's polyhedron remained unbounded after all applicable planes
    /// were applied and no cap was requested for it.
    #[error("cell of site {site} is unbounded after clipping")]
    UnderconstrainedCell { site: usize },
}

pub type Result<T> = std::result::Result<T, Error>;
