//! All patches owned by one process.

use std::ops::Range;
use std::sync::Arc;

use rayon::prelude::*;

use crate::decomposition::{Decomposition, Rank};
use crate::domain::GlobalDomain;
use crate::error::DecompositionError;
use crate::grid::{Field, FieldKind};
use crate::patch::Patch;
use crate::particle::SpeciesSpec;

pub struct PatchCollection {
    domain: Arc<GlobalDomain>,
    decomposition: Decomposition,
    rank: Rank,
    species: Vec<SpeciesSpec>,
    species_fields: Vec<String>,
    patches: Vec<Patch>,
}

impl PatchCollection {
    /// Builds every patch that `decomposition` assigns to `rank`, in
    /// hindex order. If `species_fields` is set, every species also gets
    /// its own current and density arrays.
    pub fn new(
        domain: Arc<GlobalDomain>,
        decomposition: Decomposition,
        rank: Rank,
        species: Vec<SpeciesSpec>,
        species_fields: bool,
        seed: u64,
    ) -> Result<Self, DecompositionError> {
        if decomposition.n_patches() != domain.total_patches() {
            return Err(DecompositionError::CostLength {
                expected: domain.total_patches(),
                got: decomposition.n_patches(),
            });
        }
        if rank < 0 || rank as usize >= decomposition.n_ranks() {
            return Err(DecompositionError::NoSuchRank { rank, ranks: decomposition.n_ranks() });
        }
        for spec in &species {
            spec.validate(&domain)?;
        }
        let species_fields: Vec<String> = if species_fields {
            species.iter().map(|s| s.name.clone()).collect()
        } else {
            Vec::new()
        };

        let patches = decomposition
            .range(rank)
            .into_par_iter()
            .map(|h| Patch::new(&domain, &decomposition, rank, h, &species, &species_fields, seed))
            .collect::<Result<Vec<Patch>, _>>()?;

        Ok(PatchCollection { domain, decomposition, rank, species, species_fields, patches })
    }

    pub fn domain(&self) -> &GlobalDomain {
        &self.domain
    }

    pub fn rank(&self) -> Rank {
        self.rank
    }

    pub fn species(&self) -> &[SpeciesSpec] {
        &self.species
    }

    /// Whether per-species currents and densities are allocated.
    pub fn has_species_fields(&self) -> bool {
        !self.species_fields.is_empty()
    }

    pub fn len(&self) -> usize {
        self.patches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patches.is_empty()
    }

    /// Hindices owned here.
    pub fn hindices(&self) -> Range<usize> {
        self.decomposition.range(self.rank)
    }

    pub fn patches(&self) -> &[Patch] {
        &self.patches
    }

    pub fn patches_mut(&mut self) -> &mut [Patch] {
        &mut self.patches
    }

    /// Splits into the shared domain and the mutable patch list.
    pub fn parts_mut(&mut self) -> (&GlobalDomain, &[SpeciesSpec], &mut [Patch]) {
        (&self.domain, &self.species, &mut self.patches)
    }

    /// The field `kind` of every patch, in local patch order.
    pub fn fields(&self, kind: FieldKind) -> Result<Vec<&Field>, DecompositionError> {
        self.patches
            .iter()
            .map(|p| p.em.field(kind).ok_or_else(|| DecompositionError::UnknownField(format!("{:?}", kind))))
            .collect()
    }

    pub fn fields_mut(&mut self, kind: FieldKind) -> Result<Vec<&mut Field>, DecompositionError> {
        self.patches
            .iter_mut()
            .map(|p| p.em.field_mut(kind).ok_or_else(|| DecompositionError::UnknownField(format!("{:?}", kind))))
            .collect()
    }

    /// Resolves a field name against the species of this run.
    pub fn field_kind(&self, name: &str) -> Result<FieldKind, DecompositionError> {
        let names: Vec<String> = self.species.iter().map(|s| s.name.clone()).collect();
        let kind = FieldKind::from_name(name, &names)?;
        match kind {
            FieldKind::SpeciesJx(_) | FieldKind::SpeciesJy(_) | FieldKind::SpeciesJz(_) | FieldKind::SpeciesRho(_)
                if !self.has_species_fields() => Err(DecompositionError::UnknownField(name.to_owned())),
            _ => Ok(kind),
        }
    }

    /// Fills species `ispec` in every local patch.
    pub fn load_species<F>(&mut self, ispec: usize, density: F)
    where F: Fn(f64, f64, f64) -> f64 + Sync {
        let domain = &self.domain;
        let spec = &self.species[ispec];
        self.patches
            .par_iter_mut()
            .for_each(|p| p.load_species(domain, ispec, spec, &density));
    }

    /// Number of particles of species `ispec` held locally.
    pub fn particle_count(&self, ispec: usize) -> usize {
        self.patches.iter().map(|p| p.particles[ispec].len()).sum()
    }

    /// Kinetic energy of species `ispec` held locally.
    pub fn kinetic_energy(&self, ispec: usize) -> f64 {
        let mass = self.species[ispec].mass;
        self.patches.iter().map(|p| p.particles[ispec].kinetic_energy(mass)).sum()
    }

    /// Electromagnetic energy on the local patches.
    pub fn field_energy(&self) -> f64 {
        self.patches.iter().map(|p| p.em.energy(&self.domain)).sum()
    }
}
