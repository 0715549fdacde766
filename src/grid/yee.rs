//! Reference Maxwell solver on the Yee lattice, in normalized units
//! (c = epsilon_0 = 1). Works on one patch at a time and touches every
//! node it can reach, ghosts included; stale ghost values are overwritten
//! by the next exchange.

use ndarray::prelude::*;
use ndarray::{Slice, Zip};

use crate::domain::GlobalDomain;
use crate::error::DecompositionError;
use crate::grid::{EmFields, Field};

/// The Maxwell solver, chosen once at setup.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum MaxwellSolver {
    Yee,
}

impl MaxwellSolver {
    /// Looks up the solver called `name` for a `dims`-dimensional geometry.
    pub fn create(name: &str, dims: usize) -> Result<MaxwellSolver, DecompositionError> {
        match (name, dims) {
            ("Yee", 1..=3) | ("yee", 1..=3) => Ok(MaxwellSolver::Yee),
            _ => Err(DecompositionError::UnknownSolver { name: name.to_owned(), dims }),
        }
    }

    /// Advances E by a full step using B and J at the half step.
    pub fn solve_maxwell_ampere(&self, em: &mut EmFields, domain: &GlobalDomain) {
        let dt = domain.timestep();
        let EmFields { e, b, j, .. } = em;
        for c in 0..3 {
            Zip::from(e[c].view_mut())
                .and(j[c].view())
                .for_each(|e, &j| *e -= dt * j);
        }
        // dE/dt = curl B
        for c in 0..3 {
            let (p, q) = ((c + 1) % 3, (c + 2) % 3);
            add_derivative(&mut e[c], &b[q], p, dt, domain);
            add_derivative(&mut e[c], &b[p], q, -dt, domain);
        }
    }

    /// Advances B by a full step using E.
    pub fn solve_maxwell_faraday(&self, em: &mut EmFields, domain: &GlobalDomain) {
        let dt = domain.timestep();
        let EmFields { e, b, .. } = em;
        // dB/dt = -curl E
        for c in 0..3 {
            let (p, q) = ((c + 1) % 3, (c + 2) % 3);
            add_derivative(&mut b[c], &e[q], p, -dt, domain);
            add_derivative(&mut b[c], &e[p], q, dt, domain);
        }
    }
}

/// target += coef * d(source)/dx_axis, differencing on the staggered grid.
///
/// Target and source share staggering on every axis but `axis`. A dual
/// target node sits between source nodes i-1 and i; a primal target node
/// between dual source nodes i and i+1. The outermost dual nodes have
/// only one neighbour and are left alone.
fn add_derivative(target: &mut Field, source: &Field, axis: usize, coef: f64, domain: &GlobalDomain) {
    if axis >= domain.dims() {
        return;
    }
    let coef = coef / domain.cell_length(axis);
    let n = target.dims()[axis];
    let src = source.view();
    let (target_range, upper, lower) = if target.is_dual(axis) {
        (Slice::from(1..n - 1), Slice::from(1..n - 1), Slice::from(0..n - 2))
    } else {
        (Slice::from(0..n), Slice::from(1..n + 1), Slice::from(0..n))
    };
    let mut view = target.view_mut();
    Zip::from(view.slice_axis_mut(Axis(axis), target_range))
        .and(src.slice_axis(Axis(axis), upper))
        .and(src.slice_axis(Axis(axis), lower))
        .for_each(|t, &hi, &lo| *t += coef * (hi - lo));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::DomainDesign;
    use approx::assert_relative_eq;

    #[test]
    fn factory_knows_geometries() {
        assert_eq!(MaxwellSolver::create("Yee", 2).unwrap(), MaxwellSolver::Yee);
        assert!(MaxwellSolver::create("Lehe", 2).is_err());
        assert!(MaxwellSolver::create("Yee", 4).is_err());
    }

    #[test]
    fn uniform_fields_are_stationary() {
        let domain = DomainDesign::new(2).cells(&[16, 16]).timestep(0.3).build().unwrap();
        let mut em = EmFields::new(&domain, &[]);
        for f in em.e.iter_mut().chain(em.b.iter_mut()) {
            f.put_to(0.7);
        }
        let solver = MaxwellSolver::Yee;
        solver.solve_maxwell_ampere(&mut em, &domain);
        solver.solve_maxwell_faraday(&mut em, &domain);
        for f in em.e.iter().chain(em.b.iter()) {
            assert!(f.view().iter().all(|&v| v == 0.7));
        }
    }

    #[test]
    fn faraday_follows_the_curl_in_1d() {
        let domain = DomainDesign::new(1).cells(&[16]).cell_length(&[0.5]).timestep(0.25).build().unwrap();
        let mut em = EmFields::new(&domain, &[]);
        // Ez = x on the primal grid
        for i in 0..em.e[2].dims()[0] {
            em.e[2][[i, 0, 0]] = i as f64 * 0.5;
        }
        MaxwellSolver::Yee.solve_maxwell_faraday(&mut em, &domain);
        // dBy/dt = dEz/dx = 1
        assert_relative_eq!(em.b[1][[5, 0, 0]], 0.25, epsilon = 1e-12);
        assert_eq!(em.b[1][[0, 0, 0]], 0.0);
        // Bz is driven by Ey only
        assert_eq!(em.b[2][[5, 0, 0]], 0.0);
    }

    #[test]
    fn ampere_subtracts_current() {
        let domain = DomainDesign::new(1).cells(&[16]).timestep(0.5).build().unwrap();
        let mut em = EmFields::new(&domain, &[]);
        em.j[0].put_to(2.0);
        MaxwellSolver::Yee.solve_maxwell_ampere(&mut em, &domain);
        assert_eq!(em.e[0][[4, 0, 0]], -1.0);
    }
}
