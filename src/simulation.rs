//! The per-step control flow tying the kernels to the sync layer.

use rayon::prelude::*;
use tracing::{debug, info_span};

use crate::diagnostics::ChargeAccumulation;
use crate::grid::MaxwellSolver;
use crate::particle::{deposit_species, push_species};
use crate::patches::PatchCollection;
use crate::sync::{self, MigrationReport};
use crate::transport::Transport;

/// Global totals, identical on every rank.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Totals {
    pub particles: u64,
    pub kinetic_energy: f64,
    pub field_energy: f64,
}

pub struct Simulation<T, C> {
    patches: PatchCollection,
    solver: MaxwellSolver,
    transport: T,
    selection: C,
    step: u64,
    losses: MigrationReport,
}

impl<T, C> Simulation<T, C>
where
    T: Transport,
    C: ChargeAccumulation,
{
    pub fn new(patches: PatchCollection, solver: MaxwellSolver, transport: T, selection: C) -> Self {
        Simulation { patches, solver, transport, selection, step: 0, losses: MigrationReport::default() }
    }

    pub fn patches(&self) -> &PatchCollection {
        &self.patches
    }

    pub fn patches_mut(&mut self) -> &mut PatchCollection {
        &mut self.patches
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Number of completed steps.
    pub fn current_step(&self) -> u64 {
        self.step
    }

    /// Migration tally of this rank since the start of the run.
    pub fn losses(&self) -> MigrationReport {
        self.losses
    }

    /// Deposits the current of every species and completes it across
    /// patches, along with the charge density if `with_rho`. Per-species
    /// fields are only read by diagnostics, so they are completed only
    /// when `with_rho` is set. Used once before the first step, and by
    /// every step after the push.
    pub fn deposit(&mut self, with_rho: bool) {
        let (domain, _, list) = self.patches.parts_mut();
        list.par_iter_mut().for_each(|p| {
            p.em.restart_rho_j();
            let min = *p.min();
            for (ispec, set) in p.particles.iter().enumerate() {
                deposit_species(set, ispec, &mut p.em, domain, &min, with_rho);
            }
            p.em.compute_total_rho_j();
        });

        sync::sum_rho_j(&mut self.patches, with_rho, &self.transport);
        if with_rho && self.patches.has_species_fields() {
            for ispec in 0..self.patches.species().len() {
                sync::sum_rho_js(&mut self.patches, ispec, &self.transport);
            }
        }
    }

    /// Advances fields and particles by one timestep.
    pub fn step(&mut self) {
        self.step += 1;
        let span = info_span!("step", n = self.step);
        let _guard = span.enter();

        let solver = self.solver;
        let (domain, _, list) = self.patches.parts_mut();
        list.par_iter_mut().for_each(|p| {
            p.em.save_magnetic_fields();
            solver.solve_maxwell_ampere(&mut p.em, domain);
            solver.solve_maxwell_faraday(&mut p.em, domain);
            p.apply_field_boundaries(domain);
        });

        sync::exchange_b(&mut self.patches, &self.transport);
        sync::exchange_e(&mut self.patches, &self.transport);

        let (domain, species, list) = self.patches.parts_mut();
        list.par_iter_mut().for_each(|p| {
            p.em.center_magnetic_fields();
            let min = *p.min();
            for (ispec, spec) in species.iter().enumerate() {
                push_species(&mut p.particles[ispec], &p.em, domain, &min, spec.mass);
            }
        });

        for ispec in 0..self.patches.species().len() {
            let report = sync::exchange_particles(&mut self.patches, ispec, &self.transport);
            self.losses += report;
        }

        let with_rho = self.selection.needs_charge_accumulation(self.step);
        self.deposit(with_rho);
        debug!(with_rho, "step complete");
    }

    /// Sums particle count and energies over all ranks. Collective.
    pub fn totals(&self) -> Totals {
        let n_species = self.patches.species().len();
        let particles: usize = (0..n_species).map(|i| self.patches.particle_count(i)).sum();
        let kinetic: f64 = (0..n_species).map(|i| self.patches.kinetic_energy(i)).sum();
        Totals {
            particles: self.transport.sum_u64(particles as u64),
            kinetic_energy: self.transport.sum_f64(kinetic),
            field_energy: self.transport.sum_f64(self.patches.field_energy()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use crate::decomposition::Decomposition;
    use crate::diagnostics::TimeSelection;
    use crate::domain::DomainDesign;
    use crate::grid::FieldKind;
    use crate::particle::SpeciesSpec;
    use crate::transport::{Incoming, Outgoing, ThreadTransport};
    use std::cell::Cell;

    /// Counts the message rounds of the transport it wraps.
    struct Counting {
        inner: ThreadTransport,
        rounds: Cell<usize>,
    }

    impl Transport for Counting {
        fn rank(&self) -> crate::decomposition::Rank {
            self.inner.rank()
        }

        fn size(&self) -> usize {
            self.inner.size()
        }

        fn exchange(&self, outgoing: Vec<Outgoing>, incoming: &mut [Incoming]) {
            self.rounds.set(self.rounds.get() + 1);
            self.inner.exchange(outgoing, incoming);
        }

        fn sum_f64(&self, value: f64) -> f64 {
            self.inner.sum_f64(value)
        }

        fn sum_u64(&self, value: u64) -> u64 {
            self.inner.sum_u64(value)
        }
    }

    #[test]
    fn plasma_keeps_its_particles() {
        let domain = DomainDesign::new(2).cells(&[32, 32]).patches(&[4, 4]).timestep(0.5).build().unwrap();
        let d = Decomposition::even(16, 1).unwrap();
        let mut spec = SpeciesSpec::new("electron", 1.0, -1.0);
        spec.npc = 2;
        spec.temperature = 0.01;
        let mut patches = PatchCollection::new(Arc::new(domain), d, 0, vec![spec], false, 5).unwrap();
        patches.load_species(0, |_, _, _| 1.0);

        let mut sim = Simulation::new(patches, MaxwellSolver::Yee, ThreadTransport::single(), TimeSelection::new(2));
        sim.deposit(true);
        let before = sim.totals();
        for _ in 0..5 {
            sim.step();
        }
        assert_eq!(sim.current_step(), 5);
        assert_eq!(sim.totals().particles, before.particles);
        assert_eq!(sim.losses().removed, 0);
        let domain = sim.patches().domain().clone();
        for p in sim.patches().patches() {
            assert!(p.particles[0].all().iter().all(|pt| p.contains(&domain, &pt.position)));
        }
    }

    #[test]
    fn density_is_summed_only_when_selected() {
        let domain = DomainDesign::new(1).cells(&[32]).patches(&[4]).build().unwrap();
        let d = Decomposition::even(4, 1).unwrap();
        let mut spec = SpeciesSpec::new("electron", 1.0, -1.0);
        spec.npc = 4;
        let mut patches = PatchCollection::new(Arc::new(domain), d, 0, vec![spec], false, 9).unwrap();
        patches.load_species(0, |_, _, _| 1.0);

        let never = |_: u64| false;
        let mut sim = Simulation::new(patches, MaxwellSolver::Yee, ThreadTransport::single(), never);
        sim.step();
        for f in sim.patches().fields(FieldKind::Rho).unwrap() {
            assert!(f.view().iter().all(|&v| v == 0.0));
        }
    }

    #[test]
    fn species_fields_are_summed_only_when_selected() {
        let domain = Arc::new(DomainDesign::new(1).cells(&[40]).patches(&[4]).build().unwrap());
        let ranks = ThreadTransport::universe(2);
        std::thread::scope(|s| {
            for t in ranks {
                let domain = Arc::clone(&domain);
                s.spawn(move || {
                    let d = Decomposition::even(4, 2).unwrap();
                    let mut species = vec![SpeciesSpec::new("electron", 1.0, -1.0), SpeciesSpec::new("ion", 100.0, 1.0)];
                    for spec in species.iter_mut() {
                        spec.npc = 2;
                    }
                    let mut patches = PatchCollection::new(domain, d, t.rank(), species, true, 2).unwrap();
                    patches.load_species(0, |_, _, _| 1.0);
                    patches.load_species(1, |_, _, _| 1.0);

                    let transport = Counting { inner: t, rounds: Cell::new(0) };
                    let mut sim = Simulation::new(patches, MaxwellSolver::Yee, transport, |_: u64| false);

                    // every patch has a remote neighbour, so each sum along x is one round
                    sim.deposit(true);
                    assert_eq!(sim.transport().rounds.get(), 4 + 2 * 4);
                    assert!(sim.patches().fields(FieldKind::SpeciesRho(1)).unwrap().iter().any(|f| f.view().sum() != 0.0));

                    sim.transport().rounds.set(0);
                    sim.deposit(false);
                    assert_eq!(sim.transport().rounds.get(), 3);
                    for f in sim.patches().fields(FieldKind::SpeciesRho(1)).unwrap() {
                        assert!(f.view().iter().all(|&v| v == 0.0));
                    }
                });
            }
        });
    }
}
