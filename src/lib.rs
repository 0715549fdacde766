//! Patch-decomposed particle-in-cell core.
//!
//! The global grid is cut into patches, ordered along a space-filling
//! curve and shared out among processes in contiguous runs. Within a
//! process, patches are worked on in parallel by rayon. The [`sync`]
//! module keeps field ghost layers, deposited currents and particles
//! consistent across patch boundaries, whether the neighbour lives in
//! the same process or behind a [`transport::Transport`].

pub mod control;
pub mod decomposition;
pub mod diagnostics;
pub mod domain;
pub mod error;
pub mod grid;
pub mod ordering;
pub mod particle;
pub mod patch;
pub mod patches;
pub mod setup;
pub mod simulation;
pub mod sync;
pub mod transport;
