use rand::prelude::*;
use rand_distr::StandardNormal;

use crate::domain::Side;
use crate::error::ConfigError;
use crate::particle::Particle;

/// What happens to a particle crossing a face of the global domain.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum ParticleBoundary {
    /// Re-enters on the opposite face. Handled by the migration itself.
    Periodic,
    /// Deleted; its energy is reported as lost.
    Remove,
    /// Mirrored about the face, with the normal momentum reversed.
    Reflect,
    /// Mirrored back inside and brought to rest.
    Stop,
    /// Mirrored back inside with a momentum redrawn from a Maxwellian
    /// at `temperature` (in units of the electron rest energy), pointing
    /// into the domain.
    Thermalize { temperature: f64 },
}

impl ParticleBoundary {
    /// Parses a boundary name; `temperature` is only used by `thermalize`.
    pub fn from_name(name: &str, temperature: f64) -> Result<Self, ConfigError> {
        match name.to_lowercase().as_str() {
            "periodic" => Ok(ParticleBoundary::Periodic),
            "remove" | "supp" => Ok(ParticleBoundary::Remove),
            "reflect" | "reflective" | "refl" => Ok(ParticleBoundary::Reflect),
            "stop" => Ok(ParticleBoundary::Stop),
            "thermalize" => Ok(ParticleBoundary::Thermalize { temperature }),
            _ => Err(ConfigError::UnknownVariant { what: "particle boundary", value: name.to_owned() }),
        }
    }

    /// Applies the condition to `pt`, which has crossed the domain face
    /// at `face` along `axis`. Returns false if the particle is to be
    /// deleted.
    pub fn apply<R: Rng>(&self, pt: &mut Particle, axis: usize, side: Side, face: f64, mass: f64, rng: &mut R) -> bool {
        match *self {
            ParticleBoundary::Periodic => true,
            ParticleBoundary::Remove => false,
            ParticleBoundary::Reflect => {
                pt.position[axis] = mirror(pt.position[axis], face, side);
                pt.momentum[axis] = -pt.momentum[axis];
                true
            }
            ParticleBoundary::Stop => {
                pt.position[axis] = mirror(pt.position[axis], face, side);
                pt.momentum = [0.0; 3];
                true
            }
            ParticleBoundary::Thermalize { temperature } => {
                pt.position[axis] = mirror(pt.position[axis], face, side);
                let sigma = (temperature / mass).sqrt();
                for u in pt.momentum.iter_mut() {
                    let n: f64 = rng.sample(StandardNormal);
                    *u = sigma * n;
                }
                let inward = match side {
                    Side::Lower => 1.0,
                    Side::Upper => -1.0,
                };
                pt.momentum[axis] = inward * pt.momentum[axis].abs();
                true
            }
        }
    }
}

/// Image of `x` in the face, kept strictly inside the half-open patch bounds.
fn mirror(x: f64, face: f64, side: Side) -> f64 {
    let image = 2.0 * face - x;
    match side {
        Side::Upper if image >= face => just_below(face),
        _ => image,
    }
}

/// The largest f64 smaller than a positive `x`.
pub(crate) fn just_below(x: f64) -> f64 {
    debug_assert!(x > 0.0);
    f64::from_bits(x.to_bits() - 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand_xoshiro::Xoshiro256StarStar;

    fn escaping() -> Particle {
        Particle { position: [10.25, 1.0, 0.0], momentum: [0.5, 0.2, 0.0], weight: 1.0, charge: -1.0, id: 0 }
    }

    #[test]
    fn parses_names() {
        assert_eq!(ParticleBoundary::from_name("Supp", 0.0).unwrap(), ParticleBoundary::Remove);
        assert_eq!(
            ParticleBoundary::from_name("thermalize", 0.01).unwrap(),
            ParticleBoundary::Thermalize { temperature: 0.01 }
        );
        assert!(ParticleBoundary::from_name("absorb", 0.0).is_err());
    }

    #[test]
    fn reflection_mirrors_position_and_momentum() {
        let mut rng = Xoshiro256StarStar::seed_from_u64(0);
        let mut pt = escaping();
        assert!(ParticleBoundary::Reflect.apply(&mut pt, 0, Side::Upper, 10.0, 1.0, &mut rng));
        assert_eq!(pt.position[0], 9.75);
        assert_eq!(pt.momentum, [-0.5, 0.2, 0.0]);

        let mut pt = escaping();
        assert!(ParticleBoundary::Stop.apply(&mut pt, 0, Side::Upper, 10.0, 1.0, &mut rng));
        assert_eq!(pt.momentum, [0.0; 3]);
        assert!(!ParticleBoundary::Remove.apply(&mut escaping(), 0, Side::Upper, 10.0, 1.0, &mut rng));
    }

    #[test]
    fn thermalized_particles_head_inwards() {
        let mut rng = Xoshiro256StarStar::seed_from_u64(3);
        let bc = ParticleBoundary::Thermalize { temperature: 0.01 };
        for _ in 0..50 {
            let mut pt = escaping();
            assert!(bc.apply(&mut pt, 0, Side::Upper, 10.0, 1.0, &mut rng));
            assert!(pt.momentum[0] <= 0.0);
            assert_eq!(pt.position[0], 9.75);
        }
    }

    #[test]
    fn mirrored_particles_stay_inside() {
        let mut rng = Xoshiro256StarStar::seed_from_u64(0);
        let mut pt = escaping();
        pt.position[0] = 10.0;
        ParticleBoundary::Reflect.apply(&mut pt, 0, Side::Upper, 10.0, 1.0, &mut rng);
        assert!(pt.position[0] < 10.0);
    }
}
