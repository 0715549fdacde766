//! Macro-particles, stored per species and per patch.

use rand::prelude::*;
use rand_distr::StandardNormal;

mod boundary;
mod push;
mod vec3;

pub use self::boundary::*;
pub use self::push::*;
pub use self::vec3::Vec3;

use crate::error::DecompositionError;
use crate::domain::GlobalDomain;

/// One macro-particle. Positions are global; momenta are in units of
/// the species mass times c.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Particle {
    pub position: [f64; 3],
    pub momentum: [f64; 3],
    pub weight: f64,
    /// Charge, in units of the elementary charge.
    pub charge: f64,
    pub id: u64,
}

impl Particle {
    pub fn gamma(&self) -> f64 {
        let u = self.momentum;
        (1.0 + u[0] * u[0] + u[1] * u[1] + u[2] * u[2]).sqrt()
    }

    /// Kinetic energy carried by the whole macro-particle, in units of
    /// the electron rest energy.
    pub fn kinetic_energy(&self, mass: f64) -> f64 {
        self.weight * mass * (self.gamma() - 1.0)
    }
}

/// Number of f64 values in a serialized record, before any auxiliary columns.
pub const RECORD_LEN: usize = 9;

/// Invariant parameters of one species.
#[derive(Debug, Clone, PartialEq)]
pub struct SpeciesSpec {
    pub name: String,
    /// In units of the electron mass.
    pub mass: f64,
    pub charge: f64,
    /// Particles per cell at load time.
    pub npc: usize,
    /// In units of the electron rest energy.
    pub temperature: f64,
    pub drift: [f64; 3],
    /// Behaviour at each face of the domain, `[axis][side]`.
    pub boundaries: [[ParticleBoundary; 2]; 3],
    /// Extra f64 columns carried by every particle, e.g. for tracking.
    pub aux_width: usize,
}

impl SpeciesSpec {
    /// A cold species that is periodic on every axis.
    pub fn new(name: &str, mass: f64, charge: f64) -> Self {
        SpeciesSpec {
            name: name.to_owned(),
            mass,
            charge,
            npc: 0,
            temperature: 0.0,
            drift: [0.0; 3],
            boundaries: [[ParticleBoundary::Periodic; 2]; 3],
            aux_width: 0,
        }
    }

    /// Particles wrap exactly where the fields do.
    pub fn validate(&self, domain: &GlobalDomain) -> Result<(), DecompositionError> {
        for axis in domain.axes() {
            for bc in &self.boundaries[axis] {
                let wraps = *bc == ParticleBoundary::Periodic;
                if wraps != domain.is_periodic(axis) {
                    return Err(DecompositionError::ParticleBoundaryMismatch {
                        species: self.name.clone(),
                        axis,
                    });
                }
            }
        }
        Ok(())
    }
}

/// The particles of one species within one patch, with optional
/// auxiliary columns and a per-cell bin table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParticleSet {
    store: Vec<Particle>,
    aux_width: usize,
    aux: Vec<f64>,
    /// `bins[c]..bins[c + 1]` indexes the particles of local cell `c`,
    /// valid after [`ParticleSet::sort_by_cell`].
    bins: Vec<usize>,
}

impl ParticleSet {
    pub fn new(aux_width: usize) -> Self {
        ParticleSet { store: Vec::new(), aux_width, aux: Vec::new(), bins: Vec::new() }
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    pub fn all(&self) -> &[Particle] {
        &self.store
    }

    pub fn all_mut(&mut self) -> &mut [Particle] {
        &mut self.store
    }

    pub fn aux(&self, i: usize) -> &[f64] {
        &self.aux[i * self.aux_width..(i + 1) * self.aux_width]
    }

    pub fn bins(&self) -> &[usize] {
        &self.bins
    }

    pub fn push(&mut self, pt: Particle, aux: &[f64]) {
        assert_eq!(aux.len(), self.aux_width, "wrong number of auxiliary values");
        self.store.push(pt);
        self.aux.extend_from_slice(aux);
    }

    pub fn record_len(&self) -> usize {
        RECORD_LEN + self.aux_width
    }

    /// Appends the records of particles `indices` to `out` as flat f64 rows.
    pub fn serialize_into(&self, indices: &[usize], out: &mut Vec<f64>) {
        out.reserve(indices.len() * self.record_len());
        for &i in indices {
            let pt = &self.store[i];
            out.extend_from_slice(&pt.position);
            out.extend_from_slice(&pt.momentum);
            out.push(pt.weight);
            out.push(pt.charge);
            out.push(f64::from_bits(pt.id));
            out.extend_from_slice(self.aux(i));
        }
    }

    /// Appends particles from rows written by [`ParticleSet::serialize_into`].
    pub fn append_records(&mut self, data: &[f64]) {
        let len = self.record_len();
        assert_eq!(data.len() % len, 0, "truncated particle records");
        for row in data.chunks_exact(len) {
            self.store.push(Particle {
                position: [row[0], row[1], row[2]],
                momentum: [row[3], row[4], row[5]],
                weight: row[6],
                charge: row[7],
                id: row[8].to_bits(),
            });
            self.aux.extend_from_slice(&row[RECORD_LEN..]);
        }
    }

    /// Deletes the particles listed in `departed` (sorted, unique),
    /// keeping the others in order.
    pub fn remove_sorted(&mut self, departed: &[usize]) {
        if departed.is_empty() {
            return;
        }
        let w = self.aux_width;
        let mut gone = departed.iter().peekable();
        let mut kept = 0;
        for i in 0..self.store.len() {
            if gone.peek() == Some(&&i) {
                gone.next();
                continue;
            }
            self.store[kept] = self.store[i];
            self.aux.copy_within(i * w..(i + 1) * w, kept * w);
            kept += 1;
        }
        self.store.truncate(kept);
        self.aux.truncate(kept * w);
    }

    /// Stable sort by `cell`, then rebuilds the bin table over `n_cells` cells.
    pub fn sort_by_cell<F>(&mut self, cell: F, n_cells: usize)
    where F: Fn(&Particle) -> usize {
        let keys: Vec<usize> = self.store.iter().map(|pt| cell(pt).min(n_cells - 1)).collect();
        let mut order: Vec<usize> = (0..self.store.len()).collect();
        order.sort_by_key(|&i| keys[i]);

        let w = self.aux_width;
        let store: Vec<Particle> = order.iter().map(|&i| self.store[i]).collect();
        let mut aux = Vec::with_capacity(self.aux.len());
        for &i in &order {
            aux.extend_from_slice(&self.aux[i * w..(i + 1) * w]);
        }
        self.store = store;
        self.aux = aux;

        let mut bins = vec![0usize; n_cells + 1];
        for &k in &keys {
            bins[k + 1] += 1;
        }
        for c in 0..n_cells {
            bins[c + 1] += bins[c];
        }
        self.bins = bins;
    }

    pub fn kinetic_energy(&self, mass: f64) -> f64 {
        self.store.iter().map(|pt| pt.kinetic_energy(mass)).sum()
    }
}

/// Samples a momentum from a drifting, non-relativistic Maxwellian.
pub fn maxwellian<R: Rng>(spec: &SpeciesSpec, rng: &mut R) -> [f64; 3] {
    let sigma = (spec.temperature / spec.mass).sqrt();
    let mut u = spec.drift;
    for u in u.iter_mut() {
        let n: f64 = rng.sample(StandardNormal);
        *u += sigma * n;
    }
    u
}
