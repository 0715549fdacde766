use std::error::Error;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use tessera::control::RunControl;
use tessera::decomposition::Decomposition;
use tessera::error::ConfigError;
use tessera::grid::MaxwellSolver;
use tessera::patches::PatchCollection;
use tessera::setup::{ettc, Configuration, PrettyDuration};
use tessera::simulation::Simulation;
use tessera::transport::Transport;

fn main() -> Result<(), Box<dyn Error>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    #[cfg(feature = "mpi")]
    let universe = mpi::initialize().ok_or("unable to initialize MPI")?;
    #[cfg(feature = "mpi")]
    let transport = tessera::transport::MpiTransport::new(universe.world());
    #[cfg(not(feature = "mpi"))]
    let transport = tessera::transport::ThreadTransport::single();

    let rank0 = transport.rank() == 0;

    // Read input configuration with default context

    let args: Vec<String> = std::env::args().collect();
    let path = args
        .get(1)
        .ok_or(ConfigError::InvalidInputFile("no file supplied"))?;
    let path = PathBuf::from(path);

    let mut config = Configuration::from_file(&path)?;
    config.with_context("constants");

    let domain = Arc::new(config.domain_design()?.build()?);
    let control = config.control()?;
    let species = config.species(domain.dims())?;
    let selection = config.charge_selection()?;
    let solver = MaxwellSolver::create(&control.solver, domain.dims())?;
    let densities = species
        .iter()
        .map(|s| config.density(&s.name))
        .collect::<Result<Vec<_>, _>>()?;

    // Balance the expected particle load, sampled at patch centres

    let costs: Vec<f64> = (0..domain.total_patches())
        .map(|h| {
            let coords = domain.ordering().coords(domain.patch_shape(), h);
            let mut centre = [0.0; 3];
            for axis in domain.axes() {
                let width = domain.length(axis) / (domain.n_patches(axis) as f64);
                centre[axis] = ((coords[axis] as f64) + 0.5) * width;
            }
            let particles: f64 = species
                .iter()
                .zip(&densities)
                .map(|(s, n)| (s.npc as f64) * n(centre[0], centre[1], centre[2]).max(0.0))
                .sum();
            // the field solve costs the same everywhere
            1.0 + particles
        })
        .collect();
    let decomposition = Decomposition::balanced(&costs, transport.size())?;

    let mut patches = PatchCollection::new(
        Arc::clone(&domain),
        decomposition,
        transport.rank(),
        species,
        control.species_fields,
        control.seed,
    )?;

    // Particle initialization, one patch at a time as the
    // density expressions cannot be shared between threads

    {
        let (domain, species, list) = patches.parts_mut();
        for (ispec, (spec, density)) in species.iter().zip(&densities).enumerate() {
            for patch in list.iter_mut() {
                patch.load_species(domain, ispec, spec, density);
            }
        }
    }

    let mut run = RunControl::new();
    if let Some(limit) = control.time_limit {
        run = run.with_time_limit(Duration::from_secs_f64(limit));
    }

    let mut sim = Simulation::new(patches, solver, transport, selection);
    sim.deposit(true);

    let totals = sim.totals();
    if rank0 {
        info!(
            "Running {} patches on {} processes with {} threads each, {} particles...",
            domain.total_patches(), sim.transport().size(), rayon::current_num_threads(), totals.particles
        );
    }

    let total_steps = control.steps;
    let steps_bt_output = (total_steps / control.n_outputs.max(1)).max(1);
    let runtime = Instant::now();

    while sim.current_step() < total_steps {
        if run.should_stop(sim.transport()) {
            if rank0 {
                warn!("Stopping early at step {}", sim.current_step());
            }
            break;
        }

        sim.step();

        let step = sim.current_step();
        if step % steps_bt_output == 0 || step == total_steps {
            let totals = sim.totals();
            if rank0 {
                info!(
                    "Step {: >6} at t = {: >8.2}, RT = {}, ETTC = {}, {} particles, EM energy = {:.4e}, kinetic = {:.4e}",
                    step, (step as f64) * domain.timestep(),
                    PrettyDuration::from(runtime.elapsed()),
                    PrettyDuration::from(ettc(runtime, step as usize, total_steps as usize)),
                    totals.particles, totals.field_energy, totals.kinetic_energy,
                );
            }
        }
    }

    let losses = sim.losses();
    let removed = sim.transport().sum_u64(losses.removed);
    let lost_energy = sim.transport().sum_f64(losses.lost_energy);
    if rank0 {
        info!(
            "Finished {} steps, RT = {}, {} particles absorbed carrying {:.4e}",
            sim.current_step(), PrettyDuration::from(runtime.elapsed()), removed, lost_energy
        );
    }

    Ok(())
}
