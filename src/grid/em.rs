//! The set of electromagnetic fields, currents and densities owned by a
//! patch, and the names by which they are requested.

use crate::domain::GlobalDomain;
use crate::error::DecompositionError;
use crate::grid::Field;

/// Identifies one physical quantity across all patches.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum FieldKind {
    Ex,
    Ey,
    Ez,
    Bx,
    By,
    Bz,
    /// Time-centred magnetic field, as seen by the pusher.
    BxM,
    ByM,
    BzM,
    Jx,
    Jy,
    Jz,
    Rho,
    /// Per-species current and charge density, by species index.
    SpeciesJx(usize),
    SpeciesJy(usize),
    SpeciesJz(usize),
    SpeciesRho(usize),
}

impl FieldKind {
    pub fn e(component: usize) -> FieldKind {
        [FieldKind::Ex, FieldKind::Ey, FieldKind::Ez][component]
    }

    pub fn b(component: usize) -> FieldKind {
        [FieldKind::Bx, FieldKind::By, FieldKind::Bz][component]
    }

    pub fn j(component: usize) -> FieldKind {
        [FieldKind::Jx, FieldKind::Jy, FieldKind::Jz][component]
    }

    /// Yee staggering: E and J components are dual along their own axis,
    /// B components along the two others, densities are primal.
    pub fn staggering(self) -> [bool; 3] {
        use FieldKind::*;
        match self {
            Ex | Jx | SpeciesJx(_) => [true, false, false],
            Ey | Jy | SpeciesJy(_) => [false, true, false],
            Ez | Jz | SpeciesJz(_) => [false, false, true],
            Bx | BxM => [false, true, true],
            By | ByM => [true, false, true],
            Bz | BzM => [true, true, false],
            Rho | SpeciesRho(_) => [false, false, false],
        }
    }

    /// Resolves a field name such as `"Ey"`, `"Bz_m"`, `"Rho"` or
    /// `"Jx_electron"`.
    pub fn from_name(name: &str, species: &[String]) -> Result<FieldKind, DecompositionError> {
        use FieldKind::*;
        let kind = match name {
            "Ex" => Ex,
            "Ey" => Ey,
            "Ez" => Ez,
            "Bx" => Bx,
            "By" => By,
            "Bz" => Bz,
            "Bx_m" => BxM,
            "By_m" => ByM,
            "Bz_m" => BzM,
            "Jx" => Jx,
            "Jy" => Jy,
            "Jz" => Jz,
            "Rho" | "rho" => Rho,
            _ => {
                let (base, who) = name
                    .split_once('_')
                    .ok_or_else(|| DecompositionError::UnknownField(name.to_owned()))?;
                let ispec = species
                    .iter()
                    .position(|s| s == who)
                    .ok_or_else(|| DecompositionError::UnknownField(name.to_owned()))?;
                match base {
                    "Jx" => SpeciesJx(ispec),
                    "Jy" => SpeciesJy(ispec),
                    "Jz" => SpeciesJz(ispec),
                    "Rho" | "rho" => SpeciesRho(ispec),
                    _ => return Err(DecompositionError::UnknownField(name.to_owned())),
                }
            }
        };
        Ok(kind)
    }
}

/// Current and charge density of one species.
#[derive(Debug, Clone)]
pub struct SpeciesFields {
    pub j: [Field; 3],
    pub rho: Field,
}

impl SpeciesFields {
    fn new(domain: &GlobalDomain, name: &str) -> Self {
        SpeciesFields {
            j: [
                Field::new(&format!("Jx_{}", name), domain, FieldKind::Jx.staggering()),
                Field::new(&format!("Jy_{}", name), domain, FieldKind::Jy.staggering()),
                Field::new(&format!("Jz_{}", name), domain, FieldKind::Jz.staggering()),
            ],
            rho: Field::new(&format!("Rho_{}", name), domain, FieldKind::Rho.staggering()),
        }
    }
}

/// All fields of one patch.
#[derive(Debug, Clone)]
pub struct EmFields {
    pub e: [Field; 3],
    pub b: [Field; 3],
    pub b_m: [Field; 3],
    pub j: [Field; 3],
    pub rho: Field,
    /// Empty unless per-species densities were requested.
    pub species: Vec<SpeciesFields>,
}

impl EmFields {
    /// Allocates zeroed fields; `species` lists the species that need
    /// their own current and density arrays.
    pub fn new(domain: &GlobalDomain, species: &[String]) -> Self {
        let make = |kind: FieldKind, name: &str| Field::new(name, domain, kind.staggering());
        EmFields {
            e: [make(FieldKind::Ex, "Ex"), make(FieldKind::Ey, "Ey"), make(FieldKind::Ez, "Ez")],
            b: [make(FieldKind::Bx, "Bx"), make(FieldKind::By, "By"), make(FieldKind::Bz, "Bz")],
            b_m: [make(FieldKind::BxM, "Bx_m"), make(FieldKind::ByM, "By_m"), make(FieldKind::BzM, "Bz_m")],
            j: [make(FieldKind::Jx, "Jx"), make(FieldKind::Jy, "Jy"), make(FieldKind::Jz, "Jz")],
            rho: make(FieldKind::Rho, "Rho"),
            species: species.iter().map(|s| SpeciesFields::new(domain, s)).collect(),
        }
    }

    pub fn field(&self, kind: FieldKind) -> Option<&Field> {
        use FieldKind::*;
        match kind {
            Ex => Some(&self.e[0]),
            Ey => Some(&self.e[1]),
            Ez => Some(&self.e[2]),
            Bx => Some(&self.b[0]),
            By => Some(&self.b[1]),
            Bz => Some(&self.b[2]),
            BxM => Some(&self.b_m[0]),
            ByM => Some(&self.b_m[1]),
            BzM => Some(&self.b_m[2]),
            Jx => Some(&self.j[0]),
            Jy => Some(&self.j[1]),
            Jz => Some(&self.j[2]),
            Rho => Some(&self.rho),
            SpeciesJx(i) => self.species.get(i).map(|s| &s.j[0]),
            SpeciesJy(i) => self.species.get(i).map(|s| &s.j[1]),
            SpeciesJz(i) => self.species.get(i).map(|s| &s.j[2]),
            SpeciesRho(i) => self.species.get(i).map(|s| &s.rho),
        }
    }

    pub fn field_mut(&mut self, kind: FieldKind) -> Option<&mut Field> {
        use FieldKind::*;
        match kind {
            Ex => Some(&mut self.e[0]),
            Ey => Some(&mut self.e[1]),
            Ez => Some(&mut self.e[2]),
            Bx => Some(&mut self.b[0]),
            By => Some(&mut self.b[1]),
            Bz => Some(&mut self.b[2]),
            BxM => Some(&mut self.b_m[0]),
            ByM => Some(&mut self.b_m[1]),
            BzM => Some(&mut self.b_m[2]),
            Jx => Some(&mut self.j[0]),
            Jy => Some(&mut self.j[1]),
            Jz => Some(&mut self.j[2]),
            Rho => Some(&mut self.rho),
            SpeciesJx(i) => self.species.get_mut(i).map(|s| &mut s.j[0]),
            SpeciesJy(i) => self.species.get_mut(i).map(|s| &mut s.j[1]),
            SpeciesJz(i) => self.species.get_mut(i).map(|s| &mut s.j[2]),
            SpeciesRho(i) => self.species.get_mut(i).map(|s| &mut s.rho),
        }
    }

    /// Wipes all charges and currents, per species included.
    pub fn restart_rho_j(&mut self) {
        for f in self.j.iter_mut() {
            f.zero();
        }
        self.rho.zero();
        for s in self.species.iter_mut() {
            for f in s.j.iter_mut() {
                f.zero();
            }
            s.rho.zero();
        }
    }

    /// Adds every species' current and density into the totals.
    pub fn compute_total_rho_j(&mut self) {
        for s in &self.species {
            for (total, part) in self.j.iter_mut().zip(&s.j) {
                total.add_from(part);
            }
            self.rho.add_from(&s.rho);
        }
    }

    /// Keeps B at the start of the step, to be centred afterwards.
    pub fn save_magnetic_fields(&mut self) {
        for (m, b) in self.b_m.iter_mut().zip(&self.b) {
            m.copy_from(b);
        }
    }

    /// B_m = (B_old + B_new) / 2, the field at the time of the push.
    pub fn center_magnetic_fields(&mut self) {
        for (m, b) in self.b_m.iter_mut().zip(&self.b) {
            m.add_from(b);
            m.view_mut().map_inplace(|v| *v *= 0.5);
        }
    }

    /// Electromagnetic energy on the owned nodes, in normalized units.
    pub fn energy(&self, domain: &GlobalDomain) -> f64 {
        let sum: f64 = self.e.iter().chain(self.b_m.iter()).map(|f| f.norm2(domain)).sum();
        0.5 * sum * domain.cell_volume()
    }
}
