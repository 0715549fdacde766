#![allow(dead_code)]

use tessera::grid::FieldKind;
use tessera::particle::Particle;
use tessera::patches::PatchCollection;
use tessera::transport::ThreadTransport;

/// Runs `f` once per rank, each on its own thread, and returns the
/// results in rank order.
pub fn run_ranks<F, R>(n: usize, f: F) -> Vec<R>
where
    F: Fn(ThreadTransport) -> R + Sync,
    R: Send,
{
    let ranks = ThreadTransport::universe(n);
    std::thread::scope(|s| {
        let handles: Vec<_> = ranks
            .into_iter()
            .map(|t| {
                let f = &f;
                s.spawn(move || f(t))
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    })
}

/// Everything a patch holds, for comparing runs.
#[derive(Debug, Clone, PartialEq)]
pub struct PatchState {
    pub hindex: usize,
    pub fields: Vec<Vec<f64>>,
    pub particles: Vec<Vec<Particle>>,
}

pub fn snapshot(patches: &PatchCollection, kinds: &[FieldKind]) -> Vec<PatchState> {
    patches
        .patches()
        .iter()
        .map(|p| PatchState {
            hindex: p.hindex(),
            fields: kinds
                .iter()
                .map(|&k| p.em.field(k).unwrap().view().iter().copied().collect())
                .collect(),
            particles: p.particles.iter().map(|set| set.all().to_vec()).collect(),
        })
        .collect()
}
