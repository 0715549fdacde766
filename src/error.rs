//! Error types for setup. Failures during synchronization are fatal and
//! are not represented here.

use thiserror::Error;

/// Problems with the geometry of the decomposition, detected before
/// any patch is built.
#[derive(Debug, Error, PartialEq)]
pub enum DecompositionError {
    #[error("dimensionality must be 1, 2 or 3, not {0}")]
    InvalidDimensionality(usize),

    #[error("axis {axis}: {cells} cells cannot be split evenly into {patches} patches")]
    UnevenSplit { axis: usize, cells: usize, patches: usize },

    #[error("axis {axis}: patches of {n_space} cells are too small for oversize {oversize} (need at least {required})")]
    PatchTooSmall { axis: usize, n_space: usize, oversize: usize, required: usize },

    #[error("axis {0}: oversize must be at least 1")]
    NoGhostLayer(usize),

    #[error("axis {0}: cell length must be positive")]
    NonPositiveCellLength(usize),

    #[error("timestep must be positive, got {0}")]
    NonPositiveTimestep(f64),

    #[error("axis {0}: periodic boundaries must be set on both faces")]
    HalfPeriodic(usize),

    #[error("Hilbert ordering needs the same power-of-two patch count on every axis, got {0:?}")]
    HilbertShape(Vec<usize>),

    #[error("{patches} patches exceed the {max} that message tags can address")]
    TooManyPatches { patches: usize, max: usize },

    #[error("{patches} patches cannot be shared among {ranks} processes")]
    TooFewPatches { patches: usize, ranks: usize },

    #[error("patch {hindex} does not exist in a decomposition of {total} patches")]
    NoSuchPatch { hindex: usize, total: usize },

    #[error("patch {hindex} is owned by rank {owner}, not by rank {rank}")]
    ForeignPatch { hindex: usize, owner: i32, rank: i32 },

    #[error("rank {rank} is outside a decomposition over {ranks} processes")]
    NoSuchRank { rank: i32, ranks: usize },

    #[error("expected {expected} patch costs, got {got}")]
    CostLength { expected: usize, got: usize },

    #[error("unknown field '{0}'")]
    UnknownField(String),

    #[error("species '{species}': particle boundaries along axis {axis} must be periodic exactly when the fields are")]
    ParticleBoundaryMismatch { species: String, axis: usize },

    #[error("unknown Maxwell solver '{name}' for a {dims}D geometry")]
    UnknownSolver { name: String, dims: usize },
}

/// Problems reading the input configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid input file: {0}\nUsage: mpirun -n np ./tessera input-file")]
    InvalidInputFile(&'static str),

    #[error("unable to parse '{0}' = '{1}' in configuration file")]
    CouldNotParse(String, String),

    #[error("unable to find '{1}' in section '{0}' with correct type in configuration file")]
    MissingField(String, String),

    #[error("'{value}' is not a valid {what}")]
    UnknownVariant { what: &'static str, value: String },

    #[error(transparent)]
    Decomposition(#[from] DecompositionError),
}
