//! Reference particle kernels: a Boris pusher with nearest-node field
//! interpolation and a cloud-in-cell projector. Both work on one patch,
//! whose lower corner is `min`, in normalized units.

use crate::domain::GlobalDomain;
use crate::grid::{EmFields, Field};
use crate::particle::{Particle, ParticleSet, Vec3};

/// Position of `x` along `axis` in cells from the patch corner, shifted
/// so that the nodes of `field` sit on integers.
fn grid_coordinate(field: &Field, domain: &GlobalDomain, min: &[f64; 3], x: &[f64; 3], axis: usize) -> f64 {
    let shift = if field.is_dual(axis) { 0.5 } else { 0.0 };
    (x[axis] - min[axis]) / domain.cell_length(axis) + shift
}

fn nearest_value(field: &Field, domain: &GlobalDomain, min: &[f64; 3], x: &[f64; 3]) -> f64 {
    let mut idx = [0; 3];
    for axis in domain.axes() {
        let xi = grid_coordinate(field, domain, min, x, axis);
        let k = xi.round() as isize + domain.oversize(axis) as isize;
        idx[axis] = k.clamp(0, field.dims()[axis] as isize - 1) as usize;
    }
    field[idx]
}

/// E and the time-centred B at the node nearest to `x`.
pub fn fields_at(em: &EmFields, domain: &GlobalDomain, min: &[f64; 3], x: &[f64; 3]) -> (Vec3, Vec3) {
    let e = [0, 1, 2].map(|c| nearest_value(&em.e[c], domain, min, x));
    let b = [0, 1, 2].map(|c| nearest_value(&em.b_m[c], domain, min, x));
    (Vec3::from(e), Vec3::from(b))
}

/// Advances momentum and position of a particle with charge-to-mass
/// ratio `q / mass` by one timestep.
#[allow(non_snake_case)]
pub fn boris_push(pt: &mut Particle, E: Vec3, B: Vec3, mass: f64, dt: f64) {
    let alpha = pt.charge * dt / (2.0 * mass);
    let u = Vec3::from(pt.momentum);

    // half the electric field acceleration
    let u_minus = u + alpha * E;

    // magnetic field rotation
    let gamma = (1.0 + u_minus.norm_sqr()).sqrt();
    let t = (alpha / gamma) * B;
    let u_prime = u_minus + u_minus.cross(t);
    let s = (2.0 / (1.0 + t.norm_sqr())) * t;
    let u_plus = u_minus + u_prime.cross(s);

    // remaining electric field acceleration
    let u = u_plus + alpha * E;
    let gamma = (1.0 + u.norm_sqr()).sqrt();
    pt.momentum = u.into();
    for axis in 0..3 {
        pt.position[axis] += dt * pt.momentum[axis] / gamma;
    }
}

/// Pushes every particle of a species sitting in the patch at `min`.
pub fn push_species(set: &mut ParticleSet, em: &EmFields, domain: &GlobalDomain, min: &[f64; 3], mass: f64) {
    let dt = domain.timestep();
    for pt in set.all_mut() {
        let (e, b) = fields_at(em, domain, min, &pt.position);
        boris_push(pt, e, b, mass, dt);
    }
}

/// Spreads `value` onto the nodes of `field` around `x` with linear weights.
fn deposit_cic(field: &mut Field, domain: &GlobalDomain, min: &[f64; 3], x: &[f64; 3], value: f64) {
    let mut base = [0; 3];
    let mut weights = [[1.0, 0.0]; 3];
    let mut span = [1; 3];
    for axis in domain.axes() {
        let xi = grid_coordinate(field, domain, min, x, axis);
        let i0 = xi.floor();
        base[axis] = (i0 as isize + domain.oversize(axis) as isize) as usize;
        weights[axis] = [1.0 - (xi - i0), xi - i0];
        span[axis] = 2;
    }
    for a in 0..span[0] {
        for b in 0..span[1] {
            for c in 0..span[2] {
                let w = weights[0][a] * weights[1][b] * weights[2][c];
                field[[base[0] + a, base[1] + b, base[2] + c]] += value * w;
            }
        }
    }
}

/// Deposits the current, and the charge density if `with_rho`, of
/// species `ispec` into its own fields if they exist, else into the totals.
pub fn deposit_species(set: &ParticleSet, ispec: usize, em: &mut EmFields, domain: &GlobalDomain, min: &[f64; 3], with_rho: bool) {
    let per_volume = 1.0 / domain.cell_volume();
    let (j, rho) = match em.species.get_mut(ispec) {
        Some(s) => (&mut s.j, &mut s.rho),
        None => (&mut em.j, &mut em.rho),
    };
    for pt in set.all() {
        let charge = pt.charge * pt.weight * per_volume;
        let gamma = pt.gamma();
        for c in 0..3 {
            let v = pt.momentum[c] / gamma;
            deposit_cic(&mut j[c], domain, min, &pt.position, charge * v);
        }
        if with_rho {
            deposit_cic(rho, domain, min, &pt.position, charge);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::DomainDesign;
    use approx::assert_relative_eq;

    fn at_rest(x: [f64; 3]) -> Particle {
        Particle { position: x, momentum: [0.0; 3], weight: 2.0, charge: -1.0, id: 0 }
    }

    #[test]
    fn magnetic_field_does_no_work() {
        let mut pt = at_rest([0.0; 3]);
        pt.momentum = [0.3, 0.4, 0.0];
        let gamma = pt.gamma();
        for _ in 0..100 {
            boris_push(&mut pt, Vec3::new(0.0, 0.0, 0.0), Vec3::new(0.0, 0.0, 1.5), 1.0, 0.1);
        }
        assert_relative_eq!(pt.gamma(), gamma, epsilon = 1e-12);
        assert_eq!(pt.momentum[2], 0.0);
    }

    #[test]
    fn electric_field_accelerates() {
        let mut pt = at_rest([0.0; 3]);
        boris_push(&mut pt, Vec3::new(0.5, 0.0, 0.0), Vec3::new(0.0, 0.0, 0.0), 1.0, 0.2);
        // q = -1: pushed against E by q E dt / m
        assert_relative_eq!(pt.momentum[0], -0.1, epsilon = 1e-12);
        assert!(pt.position[0] < 0.0);
    }

    #[test]
    fn deposit_conserves_charge() {
        let domain = DomainDesign::new(2).cells(&[16, 16]).cell_length(&[0.5, 0.5]).build().unwrap();
        let mut em = EmFields::new(&domain, &[]);
        let mut set = ParticleSet::new(0);
        set.push(at_rest([1.3, 2.9, 0.0]), &[]);
        set.push(at_rest([0.1, 6.4, 0.0]), &[]);
        deposit_species(&set, 0, &mut em, &domain, &[0.0; 3], true);
        let total: f64 = em.rho.view().sum();
        // 2 particles of charge -2, spread over cells of area 0.25
        assert_relative_eq!(total * domain.cell_volume(), -4.0, epsilon = 1e-12);
        assert!(em.j[0].view().iter().all(|&v| v == 0.0));
    }

    #[test]
    fn species_fields_take_precedence() {
        let domain = DomainDesign::new(1).cells(&[16]).build().unwrap();
        let mut em = EmFields::new(&domain, &["ion".to_owned()]);
        let mut set = ParticleSet::new(0);
        let mut pt = at_rest([3.0, 0.0, 0.0]);
        pt.charge = 1.0;
        set.push(pt, &[]);
        deposit_species(&set, 0, &mut em, &domain, &[0.0; 3], true);
        // primal node 3 sits at index 3 + oversize
        assert_eq!(em.species[0].rho[[5, 0, 0]], 2.0);
        assert_eq!(em.rho[[5, 0, 0]], 0.0);
    }
}
