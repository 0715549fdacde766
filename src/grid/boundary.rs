//! Field boundary conditions at the outer faces of the global domain.

use ndarray::prelude::*;
use ndarray::{Slice, Zip};

use crate::domain::{FieldBoundaryKind, GlobalDomain, Side};
use crate::grid::{EmFields, Field};

/// The boundary condition handling one face of a patch that lies on the
/// edge of the global domain. Built once, by [`FieldBoundary::create`],
/// and applied after every field update.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldBoundary {
    /// Nothing to do: periodic faces are ordinary seams.
    Periodic,
    /// First-order absorbing condition for waves at normal incidence.
    SilverMuller { axis: usize, side: Side, alpha: f64, beta: f64 },
    /// Perfect conductor.
    Reflective { axis: usize, side: Side },
}

impl FieldBoundary {
    pub fn create(kind: FieldBoundaryKind, domain: &GlobalDomain, axis: usize, side: Side) -> FieldBoundary {
        match kind {
            FieldBoundaryKind::Periodic => FieldBoundary::Periodic,
            FieldBoundaryKind::SilverMuller => {
                let ratio = domain.timestep() / domain.cell_length(axis);
                let factor = 1.0 / (1.0 + ratio);
                // the upper face sees the wave travelling the other way
                let alpha = match side {
                    Side::Lower => 2.0 * factor,
                    Side::Upper => -2.0 * factor,
                };
                let beta = -(1.0 - ratio) * factor;
                FieldBoundary::SilverMuller { axis, side, alpha, beta }
            }
            FieldBoundaryKind::Reflective => FieldBoundary::Reflective { axis, side },
        }
    }

    /// Imposes the condition on the fields of a patch touching the face.
    pub fn apply(&self, em: &mut EmFields, domain: &GlobalDomain) {
        match *self {
            FieldBoundary::Periodic => {}
            FieldBoundary::SilverMuller { axis, side, alpha, beta } => {
                let (t1, t2) = ((axis + 1) % 3, (axis + 2) % 3);
                let EmFields { e, b, .. } = em;
                absorb(&mut b[t1], &e[t2], axis, side, alpha, beta);
                absorb(&mut b[t2], &e[t1], axis, side, -alpha, beta);
            }
            FieldBoundary::Reflective { axis, side } => {
                let (t1, t2) = ((axis + 1) % 3, (axis + 2) % 3);
                let o = domain.oversize(axis);
                let n = domain.n_space(axis);
                // primal nodes from the face outwards, face included
                let outside = match side {
                    Side::Lower => 0..o + 1,
                    Side::Upper => o + n..n + 2 * o + 1,
                };
                zero_slab(&mut em.e[t1], axis, outside.clone());
                zero_slab(&mut em.e[t2], axis, outside.clone());
                zero_slab(&mut em.b[axis], axis, outside);
                mirror(&mut em.b[t1], axis, side, o, n);
                mirror(&mut em.b[t2], axis, side, o, n);
            }
        }
    }
}

/// Sets the outermost dual B layer from the tangential E on the face
/// and the B layer just inside it.
fn absorb(b: &mut Field, e: &Field, axis: usize, side: Side, alpha: f64, beta: f64) {
    let nb = b.dims()[axis];
    let ne = e.dims()[axis];
    let (edge, inner, face) = match side {
        Side::Lower => (0, 1, 0),
        Side::Upper => (nb - 1, nb - 2, ne - 1),
    };
    let inside = b.view().index_axis(Axis(axis), inner).to_owned();
    let mut view = b.view_mut();
    Zip::from(view.index_axis_mut(Axis(axis), edge))
        .and(e.view().index_axis(Axis(axis), face))
        .and(&inside)
        .for_each(|b, &e, &b_in| *b = alpha * e + beta * b_in);
}

fn zero_slab(field: &mut Field, axis: usize, range: std::ops::Range<usize>) {
    field.view_mut().slice_axis_mut(Axis(axis), Slice::from(range)).fill(0.0);
}

/// Copies the tangential (dual) B into the ghost layer, mirrored about
/// the conducting face.
fn mirror(field: &mut Field, axis: usize, side: Side, o: usize, n: usize) {
    let (ghosts, face) = match side {
        Side::Lower => (0..o + 1, o),
        Side::Upper => (o + n + 1..n + 2 * o + 2, o + n),
    };
    for j in ghosts {
        let image = 2 * face + 1 - j;
        let values = field.extract(axis, image..image + 1);
        field.overwrite(axis, j..j + 1, &values);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::DomainDesign;
    use crate::grid::MaxwellSolver;
    use approx::assert_relative_eq;

    fn absorbing_line(cells: usize) -> GlobalDomain {
        DomainDesign::new(1)
            .cells(&[cells])
            .timestep(0.95)
            .boundary(0, FieldBoundaryKind::SilverMuller, FieldBoundaryKind::SilverMuller)
            .build()
            .unwrap()
    }

    #[test]
    fn coefficients_match_the_courant_number() {
        let domain = absorbing_line(32);
        match FieldBoundary::create(FieldBoundaryKind::SilverMuller, &domain, 0, Side::Upper) {
            FieldBoundary::SilverMuller { alpha, beta, .. } => {
                assert_relative_eq!(alpha, -2.0 / 1.95);
                assert_relative_eq!(beta, -0.05 / 1.95);
            }
            other => panic!("unexpected boundary {:?}", other),
        }
        assert_eq!(
            FieldBoundary::create(FieldBoundaryKind::Periodic, &domain, 0, Side::Lower),
            FieldBoundary::Periodic
        );
    }

    #[test]
    fn outgoing_pulse_is_absorbed() {
        let domain = absorbing_line(200);
        let mut em = EmFields::new(&domain, &[]);
        // Ey on primal nodes, Bz on dual nodes, travelling towards +x
        let o = domain.oversize(0) as f64;
        for i in 0..em.e[1].dims()[0] {
            let x = i as f64 - o;
            em.e[1][[i, 0, 0]] = (-((x - 100.0) / 8.0).powi(2)).exp();
        }
        for i in 0..em.b[2].dims()[0] {
            let x = i as f64 - o - 0.5;
            em.b[2][[i, 0, 0]] = (-((x - 100.0) / 8.0).powi(2)).exp();
        }
        let energy = |em: &EmFields| -> f64 {
            em.e.iter().chain(em.b.iter()).map(|f| f.view().iter().map(|v| v * v).sum::<f64>()).sum()
        };
        let initial = energy(&em);

        let boundaries: Vec<FieldBoundary> = Side::BOTH
            .iter()
            .map(|&side| FieldBoundary::create(FieldBoundaryKind::SilverMuller, &domain, 0, side))
            .collect();
        let solver = MaxwellSolver::Yee;
        for _ in 0..400 {
            solver.solve_maxwell_ampere(&mut em, &domain);
            solver.solve_maxwell_faraday(&mut em, &domain);
            for bc in &boundaries {
                bc.apply(&mut em, &domain);
            }
        }
        assert!(energy(&em) < 0.01 * initial, "{} left of {}", energy(&em), initial);
    }

    #[test]
    fn conductor_mirrors_the_ghosts() {
        let domain = DomainDesign::new(1)
            .cells(&[16])
            .boundary(0, FieldBoundaryKind::Reflective, FieldBoundaryKind::Reflective)
            .build()
            .unwrap();
        let mut em = EmFields::new(&domain, &[]);
        for f in em.e.iter_mut().chain(em.b.iter_mut()) {
            for (i, v) in f.view_mut().iter_mut().enumerate() {
                *v = 1.0 + i as f64;
            }
        }
        let bc = FieldBoundary::create(FieldBoundaryKind::Reflective, &domain, 0, Side::Lower);
        bc.apply(&mut em, &domain);

        // oversize 2: primal nodes 0, 1 are ghosts, node 2 is on the face
        for i in 0..3 {
            assert_eq!(em.e[1][[i, 0, 0]], 0.0);
            assert_eq!(em.e[2][[i, 0, 0]], 0.0);
            assert_eq!(em.b[0][[i, 0, 0]], 0.0);
        }
        assert_eq!(em.e[1][[3, 0, 0]], 4.0);
        // dual node j mirrors onto 5 - j
        assert_eq!(em.b[2][[0, 0, 0]], 6.0);
        assert_eq!(em.b[2][[2, 0, 0]], 4.0);
        assert_eq!(em.b[1][[1, 0, 0]], 5.0);
        // the normal E is left alone
        assert_eq!(em.e[0][[0, 0, 0]], 1.0);

        let upper = FieldBoundary::create(FieldBoundaryKind::Reflective, &domain, 0, Side::Upper);
        upper.apply(&mut em, &domain);
        // face at primal 18, dual ghosts 19..22 mirror onto 37 - j
        assert_eq!(em.e[2][[18, 0, 0]], 0.0);
        assert_eq!(em.e[2][[17, 0, 0]], 18.0);
        assert_eq!(em.b[2][[21, 0, 0]], 17.0);
    }
}
