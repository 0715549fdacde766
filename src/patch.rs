//! A single patch: its place in the global domain, its neighbours and
//! the fields and particles it owns.

use rand::prelude::*;
use rand_xoshiro::Xoshiro256StarStar;

use crate::decomposition::{Decomposition, Rank};
use crate::domain::{FieldBoundaryKind, GlobalDomain, Side};
use crate::error::DecompositionError;
use crate::grid::{EmFields, FieldBoundary};
use crate::particle::{maxwellian, Particle, ParticleSet, SpeciesSpec};

pub struct Patch {
    hindex: usize,
    coords: [usize; 3],
    /// Global index of the first interior cell.
    offset: [usize; 3],
    min: [f64; 3],
    max: [f64; 3],
    rank: Rank,
    neighbor: [[Option<usize>; 2]; 3],
    owner: [[Option<Rank>; 2]; 3],
    boundary: [[bool; 2]; 3],
    field_boundaries: Vec<FieldBoundary>,
    pub em: EmFields,
    /// One set per species.
    pub particles: Vec<ParticleSet>,
    /// Random stream of this patch, reproducible from the run seed.
    pub rng: Xoshiro256StarStar,
}

impl Patch {
    /// Builds patch `hindex` for the process `rank`. `species_fields`
    /// lists the species that get their own current and density arrays.
    pub fn new(
        domain: &GlobalDomain,
        decomposition: &Decomposition,
        rank: Rank,
        hindex: usize,
        species: &[SpeciesSpec],
        species_fields: &[String],
        seed: u64,
    ) -> Result<Patch, DecompositionError> {
        let owner_of_self = decomposition.owner(hindex)?;
        if owner_of_self != rank {
            return Err(DecompositionError::ForeignPatch { hindex, owner: owner_of_self, rank });
        }

        let shape = domain.patch_shape();
        let ordering = domain.ordering();
        let coords = ordering.coords(shape, hindex);

        let mut offset = [0; 3];
        let mut min = [0.0; 3];
        let mut max = [0.0; 3];
        let mut neighbor = [[None; 2]; 3];
        let mut owner = [[None; 2]; 3];
        let mut boundary = [[false; 2]; 3];

        for axis in domain.axes() {
            let n = domain.n_space(axis);
            let dx = domain.cell_length(axis);
            offset[axis] = coords[axis] * n;
            min[axis] = (offset[axis] as f64) * dx;
            max[axis] = ((offset[axis] + n) as f64) * dx;

            let count = shape[axis];
            for side in Side::BOTH {
                let at_edge = match side {
                    Side::Lower => coords[axis] == 0,
                    Side::Upper => coords[axis] + 1 == count,
                };
                boundary[axis][side.index()] = at_edge;

                let next = match (side, at_edge) {
                    (_, true) if !domain.is_periodic(axis) => None,
                    (Side::Lower, _) => Some((coords[axis] + count - 1) % count),
                    (Side::Upper, _) => Some((coords[axis] + 1) % count),
                };
                if let Some(c) = next {
                    let mut nc = coords;
                    nc[axis] = c;
                    let h = ordering.hindex(shape, &nc[..domain.dims()]);
                    neighbor[axis][side.index()] = Some(h);
                    owner[axis][side.index()] = Some(decomposition.owner(h)?);
                }
            }
        }

        let field_boundaries = domain
            .axes()
            .flat_map(|axis| Side::BOTH.into_iter().map(move |side| (axis, side)))
            .filter(|&(axis, side)| boundary[axis][side.index()])
            .filter(|&(axis, side)| domain.boundary(axis, side) != FieldBoundaryKind::Periodic)
            .map(|(axis, side)| FieldBoundary::create(domain.boundary(axis, side), domain, axis, side))
            .collect();

        Ok(Patch {
            hindex,
            coords,
            offset,
            min,
            max,
            rank,
            neighbor,
            owner,
            boundary,
            field_boundaries,
            em: EmFields::new(domain, species_fields),
            particles: species.iter().map(|s| ParticleSet::new(s.aux_width)).collect(),
            rng: Xoshiro256StarStar::seed_from_u64(seed.wrapping_add(hindex as u64)),
        })
    }

    pub fn hindex(&self) -> usize {
        self.hindex
    }

    /// Position of the patch in the grid of patches.
    pub fn coords(&self) -> [usize; 3] {
        self.coords
    }

    pub fn offset(&self, axis: usize) -> usize {
        self.offset[axis]
    }

    pub fn min(&self) -> &[f64; 3] {
        &self.min
    }

    /// Half-open interval `[min, max)` owned along `axis`.
    pub fn bounds(&self, axis: usize) -> (f64, f64) {
        (self.min[axis], self.max[axis])
    }

    pub fn rank(&self) -> Rank {
        self.rank
    }

    /// Hindex of the adjacent patch, or `None` at a non-periodic edge.
    pub fn neighbor(&self, axis: usize, side: Side) -> Option<usize> {
        self.neighbor[axis][side.index()]
    }

    /// Rank owning the adjacent patch.
    pub fn owner_process(&self, axis: usize, side: Side) -> Option<Rank> {
        self.owner[axis][side.index()]
    }

    /// Whether the adjacent patch lives in this process.
    pub fn is_local(&self, axis: usize, side: Side) -> bool {
        self.owner_process(axis, side) == Some(self.rank)
    }

    /// Whether the face lies on the edge of the global domain.
    pub fn is_boundary(&self, axis: usize, side: Side) -> bool {
        self.boundary[axis][side.index()]
    }

    pub fn contains(&self, domain: &GlobalDomain, x: &[f64; 3]) -> bool {
        domain.axes().all(|axis| x[axis] >= self.min[axis] && x[axis] < self.max[axis])
    }

    pub fn n_cells(&self, domain: &GlobalDomain) -> usize {
        domain.axes().map(|axis| domain.n_space(axis)).product()
    }

    /// Sorts the particles of species `ispec` by cell and rebuilds their bins.
    pub fn sort_particles(&mut self, domain: &GlobalDomain, ispec: usize) {
        let n_cells = self.n_cells(domain);
        let min = self.min;
        self.particles[ispec].sort_by_cell(|pt| cell_index(domain, &min, &pt.position), n_cells);
    }

    /// Imposes the outer field boundary conditions on the faces that need them.
    pub fn apply_field_boundaries(&mut self, domain: &GlobalDomain) {
        for bc in &self.field_boundaries {
            bc.apply(&mut self.em, domain);
        }
    }

    /// Fills species `ispec` with `spec.npc` particles per cell, placed
    /// uniformly at random, whose weights follow `density` evaluated at
    /// the cell centre.
    pub fn load_species<F>(&mut self, domain: &GlobalDomain, ispec: usize, spec: &SpeciesSpec, density: F)
    where F: Fn(f64, f64, f64) -> f64 {
        if spec.npc == 0 {
            return;
        }
        let dims = domain.dims();
        let n: Vec<usize> = domain.axes().map(|axis| domain.n_space(axis)).collect();
        let total: usize = n.iter().product();
        let mut next_id = (self.hindex as u64) << 32;

        for cell in 0..total {
            // unpack the row-major cell index
            let mut idx = [0; 3];
            let mut rem = cell;
            for axis in (0..dims).rev() {
                idx[axis] = rem % n[axis];
                rem /= n[axis];
            }
            let mut centre = [0.0; 3];
            for axis in 0..dims {
                centre[axis] = self.min[axis] + ((idx[axis] as f64) + 0.5) * domain.cell_length(axis);
            }
            let nreal = density(centre[0], centre[1], centre[2]) * domain.cell_volume();
            if !(nreal > 0.0) {
                continue;
            }
            let weight = nreal / (spec.npc as f64);
            for _ in 0..spec.npc {
                let mut position = [0.0; 3];
                for axis in 0..dims {
                    let r: f64 = self.rng.gen();
                    position[axis] = self.min[axis] + ((idx[axis] as f64) + r) * domain.cell_length(axis);
                }
                let pt = Particle {
                    position,
                    momentum: maxwellian(spec, &mut self.rng),
                    weight,
                    charge: spec.charge,
                    id: next_id,
                };
                next_id += 1;
                let aux = vec![0.0; spec.aux_width];
                self.particles[ispec].push(pt, &aux);
            }
        }
    }
}

/// Index of the cell containing `x` within the patch whose lower corner is
/// `min`, in row-major order. Positions outside are clamped to the edge cells.
pub fn cell_index(domain: &GlobalDomain, min: &[f64; 3], x: &[f64; 3]) -> usize {
    domain.axes().fold(0, |key, axis| {
        let n = domain.n_space(axis);
        let c = ((x[axis] - min[axis]) / domain.cell_length(axis)).floor();
        let c = (c.max(0.0) as usize).min(n - 1);
        key * n + c
    })
}
