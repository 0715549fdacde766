//! Synchronization of patch-local data across patch boundaries.
//!
//! Fields are kept consistent in two ways. An exchange overwrites each
//! ghost layer with the interior of the adjacent patch, so that every
//! copy of a node agrees. A sum adds together every patch's contribution
//! to the nodes they share, which is how deposited currents and densities
//! are completed. Particles are handed over by [`exchange_particles`].
//!
//! Every operation here is collective over the processes of `transport`:
//! all ranks must call the same operations in the same order.

mod halo;
mod migrate;

pub use self::migrate::*;

use tracing::trace;

use crate::grid::FieldKind;
use crate::patches::PatchCollection;
use crate::transport::Transport;

use self::halo::{halo_round, Mode};

/// Fills the ghost layer of `kind` along `axis` from the neighbours.
pub fn exchange_along<T>(patches: &mut PatchCollection, kind: FieldKind, axis: usize, transport: &T)
where T: Transport + ?Sized {
    halo_round(patches, kind, axis, Mode::Exchange, transport);
}

/// Fills the ghost layers of `kind` along every axis, one after the
/// other, so that corner and edge ghosts are filled as well.
pub fn exchange<T>(patches: &mut PatchCollection, kind: FieldKind, transport: &T)
where T: Transport + ?Sized {
    for axis in patches.domain().axes() {
        halo_round(patches, kind, axis, Mode::Exchange, transport);
    }
}

/// Adds up the contributions of neighbouring patches to the nodes they
/// share. Every copy of a shared node ends up with the same total.
pub fn sum<T>(patches: &mut PatchCollection, kind: FieldKind, transport: &T)
where T: Transport + ?Sized {
    for axis in patches.domain().axes() {
        halo_round(patches, kind, axis, Mode::Sum, transport);
    }
}

/// Exchanges the electric field, all components along every axis.
pub fn exchange_e<T>(patches: &mut PatchCollection, transport: &T)
where T: Transport + ?Sized {
    for c in 0..3 {
        exchange(patches, FieldKind::e(c), transport);
    }
}

/// Exchanges the magnetic field. Along its own axis a component is
/// recomputed from the electric field everywhere, ghosts included, so
/// it is only exchanged along the others.
pub fn exchange_b<T>(patches: &mut PatchCollection, transport: &T)
where T: Transport + ?Sized {
    for c in 0..3 {
        for axis in patches.domain().axes().filter(|&axis| axis != c) {
            exchange_along(patches, FieldKind::b(c), axis, transport);
        }
    }
}

/// Completes the deposited currents; the charge density as well if
/// `with_rho` is set.
pub fn sum_rho_j<T>(patches: &mut PatchCollection, with_rho: bool, transport: &T)
where T: Transport + ?Sized {
    trace!(with_rho, "summing currents");
    for c in 0..3 {
        sum(patches, FieldKind::j(c), transport);
    }
    if with_rho {
        sum(patches, FieldKind::Rho, transport);
    }
}

/// Completes the currents and density of species `ispec`. Does nothing
/// if species fields are not allocated.
pub fn sum_rho_js<T>(patches: &mut PatchCollection, ispec: usize, transport: &T)
where T: Transport + ?Sized {
    if !patches.has_species_fields() {
        return;
    }
    for kind in [
        FieldKind::SpeciesJx(ispec),
        FieldKind::SpeciesJy(ispec),
        FieldKind::SpeciesJz(ispec),
        FieldKind::SpeciesRho(ispec),
    ] {
        sum(patches, kind, transport);
    }
}
