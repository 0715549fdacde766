//! Particle migration between neighbouring patches.

use std::ops::{Add, AddAssign};

use rayon::prelude::*;
use tracing::debug;

use crate::domain::{GlobalDomain, Side};
use crate::particle::{just_below, SpeciesSpec, RECORD_LEN};
use crate::patch::Patch;
use crate::patches::PatchCollection;
use crate::transport::{tag, Incoming, Outgoing, Transport};

/// Tally of one migration, local to the calling process.
#[derive(Debug, Default, Copy, Clone, PartialEq)]
pub struct MigrationReport {
    /// Particles handed to another patch.
    pub migrated: u64,
    /// Particles deleted at an absorbing face.
    pub removed: u64,
    /// Kinetic energy carried away by the deleted particles.
    pub lost_energy: f64,
}

impl Add for MigrationReport {
    type Output = MigrationReport;

    fn add(self, other: MigrationReport) -> MigrationReport {
        MigrationReport {
            migrated: self.migrated + other.migrated,
            removed: self.removed + other.removed,
            lost_energy: self.lost_energy + other.lost_energy,
        }
    }
}

impl AddAssign for MigrationReport {
    fn add_assign(&mut self, other: MigrationReport) {
        *self = *self + other;
    }
}

#[derive(Default)]
struct Outbox {
    /// Serialized records leaving through each face.
    to: [Vec<f64>; 2],
    /// Indices to delete once everything has been sent, ascending.
    departed: Vec<usize>,
    report: MigrationReport,
}

/// Shifts a coordinate that left the domain by one period.
fn wrap(x: f64, length: f64, side: Side) -> f64 {
    match side {
        Side::Lower => {
            let y = x + length;
            if y >= length { just_below(length) } else { y }
        }
        Side::Upper => x - length,
    }
}

/// Sorts the particles of `p` that lie outside its bounds along `axis`
/// into the outbox, applying the domain's particle boundaries on the way.
fn collect_leavers(p: &mut Patch, domain: &GlobalDomain, spec: &SpeciesSpec, ispec: usize, axis: usize) -> Outbox {
    let (min, max) = p.bounds(axis);
    let at_edge = [p.is_boundary(axis, Side::Lower), p.is_boundary(axis, Side::Upper)];
    let periodic = domain.is_periodic(axis);
    let length = domain.length(axis);

    let mut outbox = Outbox::default();
    let mut leaving: [Vec<usize>; 2] = Default::default();
    let set = &mut p.particles[ispec];
    let rng = &mut p.rng;

    for (i, pt) in set.all_mut().iter_mut().enumerate() {
        let x = pt.position[axis];
        let side = if x < min {
            Side::Lower
        } else if x >= max {
            Side::Upper
        } else {
            continue;
        };

        if at_edge[side.index()] {
            if !periodic {
                let face = match side {
                    Side::Lower => min,
                    Side::Upper => max,
                };
                let bc = spec.boundaries[axis][side.index()];
                if !bc.apply(pt, axis, side, face, spec.mass, rng) {
                    outbox.report.removed += 1;
                    outbox.report.lost_energy += pt.kinetic_energy(spec.mass);
                    outbox.departed.push(i);
                }
                continue;
            }
            pt.position[axis] = wrap(x, length, side);
        }
        leaving[side.index()].push(i);
        outbox.departed.push(i);
    }

    for side in Side::BOTH {
        set.serialize_into(&leaving[side.index()], &mut outbox.to[side.index()]);
    }
    outbox.report.migrated = (leaving[0].len() + leaving[1].len()) as u64;
    outbox
}

fn migrate_along<T>(patches: &mut PatchCollection, ispec: usize, axis: usize, transport: &T) -> MigrationReport
where T: Transport + ?Sized {
    let rank = patches.rank();
    let first = patches.hindices().start;
    let (domain, species, list) = patches.parts_mut();
    let spec = &species[ispec];
    let record_len = RECORD_LEN + spec.aux_width;

    let mut outboxes: Vec<Outbox> = list
        .par_iter_mut()
        .map(|p| collect_leavers(p, domain, spec, ispec, axis))
        .collect();

    // same-process neighbours take the buffer as is
    let mut inbox: Vec<[Vec<f64>; 2]> = vec![Default::default(); list.len()];
    let mut out_counts = Vec::new();
    let mut in_counts = Vec::new();
    let mut remote = Vec::new();
    for (i, p) in list.iter().enumerate() {
        for side in Side::BOTH {
            let (neighbor, owner) = match (p.neighbor(axis, side), p.owner_process(axis, side)) {
                (Some(h), Some(r)) => (h, r),
                _ => continue,
            };
            if owner == rank {
                inbox[neighbor - first][side.opposite().index()] = std::mem::take(&mut outboxes[i].to[side.index()]);
                continue;
            }
            let records = outboxes[i].to[side.index()].len() / record_len;
            out_counts.push(Outgoing { to: owner, tag: tag(p.hindex(), axis, side), data: vec![records as f64] });
            in_counts.push(Incoming::new(owner, tag(neighbor, axis, side.opposite()), 1));
            remote.push((i, side, neighbor, owner));
        }
    }

    if !remote.is_empty() {
        transport.exchange(out_counts, &mut in_counts);

        let mut out_data = Vec::new();
        let mut in_data = Vec::new();
        let mut targets = Vec::new();
        for (&(i, side, neighbor, owner), count) in remote.iter().zip(&in_counts) {
            let data = std::mem::take(&mut outboxes[i].to[side.index()]);
            if !data.is_empty() {
                out_data.push(Outgoing { to: owner, tag: tag(list[i].hindex(), axis, side), data });
            }
            let expected = count.data[0] as usize;
            if expected > 0 {
                in_data.push(Incoming::new(owner, tag(neighbor, axis, side.opposite()), expected * record_len));
                targets.push((i, side));
            }
        }
        transport.exchange(out_data, &mut in_data);
        for ((i, side), inc) in targets.into_iter().zip(in_data) {
            inbox[i][side.index()] = inc.data;
        }
    }

    // arrivals through the lower face go in first
    list.par_iter_mut()
        .zip(outboxes.par_iter())
        .zip(inbox.into_par_iter())
        .for_each(|((p, out), arrived)| {
            let set = &mut p.particles[ispec];
            set.remove_sorted(&out.departed);
            for records in &arrived {
                set.append_records(records);
            }
        });

    let report = outboxes.iter().fold(MigrationReport::default(), |acc, o| acc + o.report);
    debug!(
        species = %spec.name, axis, migrated = report.migrated, removed = report.removed,
        remote = remote.len(), "particles exchanged"
    );
    report
}

/// Moves every particle of species `ispec` that left its patch during
/// the push to the patch that now contains it, one axis at a time so
/// that corner crossings travel in several hops. Particles crossing a
/// non-periodic face of the domain are handled by the species' boundary
/// condition instead. Afterwards every set is sorted by cell.
///
/// A particle may move at most one patch along each axis per call.
pub fn exchange_particles<T>(patches: &mut PatchCollection, ispec: usize, transport: &T) -> MigrationReport
where T: Transport + ?Sized {
    let mut report = MigrationReport::default();
    for axis in patches.domain().axes() {
        report += migrate_along(patches, ispec, axis, transport);
    }

    let (domain, _, list) = patches.parts_mut();
    list.par_iter_mut().for_each(|p| {
        p.sort_particles(domain, ispec);
        debug_assert!(
            p.particles[ispec].all().iter().all(|pt| p.contains(domain, &pt.position)),
            "particle outside patch {} after migration", p.hindex()
        );
    });
    report
}
