//! Ghost-layer exchange and additive reduction of one field along one axis.

use std::ops::Range;

use rayon::prelude::*;
use tracing::{debug, trace};

use crate::domain::{GlobalDomain, Side};
use crate::grid::{Field, FieldKind};
use crate::patch::Patch;
use crate::patches::PatchCollection;
use crate::transport::{tag, Incoming, Outgoing, Transport};

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) enum Mode {
    /// Overwrite the ghost layer with the neighbour's interior.
    Exchange,
    /// Add the neighbour's overlapping nodes to our own.
    Sum,
}

/// Nodes sent through `side`, and nodes written with what arrives there.
fn slab_ranges(mode: Mode, field: &Field, domain: &GlobalDomain, axis: usize, side: Side) -> (Range<usize>, Range<usize>) {
    let o = domain.oversize(axis);
    let n = domain.n_space(axis);
    let dual = field.is_dual(axis) as usize;
    match mode {
        Mode::Exchange => {
            let g = o + 1 + dual;
            match side {
                Side::Lower => (g..g + o, 0..o),
                Side::Upper => (n..n + o, n + g..n + g + o),
            }
        }
        Mode::Sum => {
            let w = 2 * o + 1 + dual;
            match side {
                Side::Lower => (0..w, 0..w),
                Side::Upper => (n..n + w, n..n + w),
            }
        }
    }
}

fn field_of(p: &Patch, kind: FieldKind) -> &Field {
    match p.em.field(kind) {
        Some(f) => f,
        None => panic!("patch {} has no field {:?}", p.hindex(), kind),
    }
}

fn field_of_mut(p: &mut Patch, kind: FieldKind) -> &mut Field {
    let hindex = p.hindex();
    match p.em.field_mut(kind) {
        Some(f) => f,
        None => panic!("patch {} has no field {:?}", hindex, kind),
    }
}

fn receive(p: &mut Patch, kind: FieldKind, mode: Mode, domain: &GlobalDomain, axis: usize, side: Side, data: &[f64]) {
    let field = field_of_mut(p, kind);
    let (_, range) = slab_ranges(mode, field, domain, axis, side);
    match mode {
        Mode::Exchange => field.overwrite(axis, range, data),
        Mode::Sum => field.accumulate(axis, range, data),
    }
}

/// Synchronizes field `kind` of every local patch with its neighbours
/// along `axis`. Same-process neighbours are served first, directly from
/// memory; then every cross-process slab is posted at once and awaited.
/// Both paths read only values gathered before anything is written.
pub(crate) fn halo_round<T>(patches: &mut PatchCollection, kind: FieldKind, axis: usize, mode: Mode, transport: &T)
where T: Transport + ?Sized {
    let rank = patches.rank();
    let first = patches.hindices().start;
    let (domain, _, list) = patches.parts_mut();
    if axis >= domain.dims() {
        return;
    }

    let mut slabs: Vec<[Option<Vec<f64>>; 2]> = list
        .par_iter()
        .map(|p| {
            let field = field_of(p, kind);
            Side::BOTH.map(|side| {
                p.neighbor(axis, side).map(|_| {
                    let (send, _) = slab_ranges(mode, field, domain, axis, side);
                    field.extract(axis, send)
                })
            })
        })
        .collect();

    // slabs leaving the process are moved out; the rest stay for the local pass
    let mut outgoing = Vec::new();
    let mut incoming = Vec::new();
    let mut targets = Vec::new();
    for (i, p) in list.iter().enumerate() {
        for side in Side::BOTH {
            let (neighbor, owner) = match (p.neighbor(axis, side), p.owner_process(axis, side)) {
                (Some(h), Some(r)) if r != rank => (h, r),
                _ => continue,
            };
            if let Some(data) = slabs[i][side.index()].take() {
                outgoing.push(Outgoing { to: owner, tag: tag(p.hindex(), axis, side), data });
            }
            let field = field_of(p, kind);
            let (_, recv) = slab_ranges(mode, field, domain, axis, side);
            let len = field.slab_len(axis, recv.len());
            incoming.push(Incoming::new(owner, tag(neighbor, axis, side.opposite()), len));
            targets.push((i, side));
        }
    }
    debug!(?kind, axis, ?mode, patches = list.len(), remote = incoming.len(), "halo round");

    list.par_iter_mut().for_each(|p| {
        for side in Side::BOTH {
            if !p.is_local(axis, side) {
                continue;
            }
            if let Some(neighbor) = p.neighbor(axis, side) {
                if let Some(data) = &slabs[neighbor - first][side.opposite().index()] {
                    receive(p, kind, mode, domain, axis, side, data);
                }
            }
        }
    });

    if incoming.is_empty() && outgoing.is_empty() {
        return;
    }
    transport.exchange(outgoing, &mut incoming);

    let mut inbox: Vec<[Option<Vec<f64>>; 2]> = vec![[None, None]; list.len()];
    for ((i, side), inc) in targets.into_iter().zip(incoming) {
        trace!(from = inc.from, tag = inc.tag, len = inc.data.len(), "slab received");
        inbox[i][side.index()] = Some(inc.data);
    }
    list.par_iter_mut().zip(inbox.par_iter()).for_each(|(p, slabs)| {
        for side in Side::BOTH {
            if let Some(data) = &slabs[side.index()] {
                receive(p, kind, mode, domain, axis, side, data);
            }
        }
    });
}
