//! Parse input configuration file

use std::fmt;
use std::path::Path;
use std::time::{Duration, Instant};

use meval::Context;
use yaml_rust::{yaml::Yaml, YamlLoader};

use crate::diagnostics::TimeSelection;
use crate::domain::{DomainDesign, FieldBoundaryKind};
use crate::error::ConfigError;
use crate::ordering::PatchOrdering;
use crate::particle::{ParticleBoundary, SpeciesSpec};

/// Represents the input configuration, can be queried
/// for desired parameters. Sections may be nested, in which case
/// they are addressed as `outer.inner`.
pub struct Configuration<'a> {
    input: Yaml,
    ctx: Context<'a>,
}

/// Run-level parameters that are not part of the domain.
#[derive(Debug, Clone, PartialEq)]
pub struct Control {
    pub steps: u64,
    pub seed: u64,
    pub n_outputs: u64,
    pub solver: String,
    /// Allocate per-species currents and densities.
    pub species_fields: bool,
    /// Wall-time limit in seconds, if any.
    pub time_limit: Option<f64>,
}

impl<'a> Configuration<'a> {
    pub fn from_file(path: &Path) -> Result<Configuration<'a>, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|_e| ConfigError::InvalidInputFile("unable to read file"))?;
        Self::from_yaml(&contents)
    }

    pub fn from_yaml(contents: &str) -> Result<Configuration<'a>, ConfigError> {
        let input = YamlLoader::load_from_str(contents).map_err(|_e| ConfigError::InvalidInputFile("yaml trouble"))?;
        let input = input.first().ok_or(ConfigError::InvalidInputFile("yaml trouble"))?;
        Ok(Configuration {
            input: input.clone(),
            ctx: Context::new(),
        })
    }

    /// Loads the default functions, then every constant in `section`.
    pub fn with_context(&mut self, section: &str) -> &mut Self {
        self.ctx
            .func3("step", |x, min, max| if x >= min && x < max {1.0} else {0.0})
            .func3("gauss", |x, mu, sigma| (-(x - mu).powi(2) / (2.0 * sigma.powi(2))).exp());

        // a constant may refer to those defined above it
        let constants = match self.lookup(section).as_hash() {
            Some(hash) => hash.clone(),
            None => return self,
        };
        for (a, b) in &constants {
            match (a, b) {
                (Yaml::String(s), Yaml::Real(v)) => {
                    if let Ok(num) = v.parse::<f64>() {self.ctx.var(s, num);}
                },
                (Yaml::String(s), Yaml::Integer(i)) => {
                    self.ctx.var(s, *i as f64);
                },
                (Yaml::String(s), Yaml::String(v)) => {
                    if let Ok(expr) = v.parse::<meval::Expr>() {
                        if let Ok(num) = expr.eval_with_context(&self.ctx) {self.ctx.var(s, num);}
                    }
                },
                _ => ()
            }
        }

        self
    }

    fn lookup(&self, section: &str) -> &Yaml {
        section.split('.').filter(|key| !key.is_empty()).fold(&self.input, |node, key| &node[key])
    }

    fn evaluate(&self, section: &str, field: &str, value: &Yaml) -> Result<f64, ConfigError> {
        let name = field.to_owned();
        match value {
            Yaml::Real(s) => s.parse::<f64>().map_err(|_| ConfigError::CouldNotParse(name, s.clone())),
            Yaml::Integer(i) => Ok(*i as f64),
            Yaml::String(s) => {
                let expr = s.parse::<meval::Expr>().map_err(|_| ConfigError::CouldNotParse(name.clone(), s.clone()))?;
                expr.eval_with_context(&self.ctx).map_err(|_| ConfigError::CouldNotParse(name, s.clone()))
            },
            _ => Err(ConfigError::MissingField(section.to_owned(), name)),
        }
    }

    pub fn contains(&self, section: &str, field: &str) -> bool {
        !self.lookup(section)[field].is_badvalue()
    }

    /// Names of the entries of `section`, in the order they are written.
    pub fn keys(&self, section: &str) -> Result<Vec<String>, ConfigError> {
        let hash = self.lookup(section).as_hash().ok_or_else(|| ConfigError::MissingField(section.to_owned(), "*".to_owned()))?;
        Ok(hash.keys().filter_map(|k| k.as_str().map(str::to_owned)).collect())
    }

    pub fn real(&self, section: &str, field: &str) -> Result<f64, ConfigError> {
        self.evaluate(section, field, &self.lookup(section)[field])
    }

    /// A list of reals, or a single real broadcast to `n` entries.
    pub fn reals(&self, section: &str, field: &str, n: usize) -> Result<Vec<f64>, ConfigError> {
        match &self.lookup(section)[field] {
            Yaml::Array(array) => {
                let got = array.iter().map(|y| self.evaluate(section, field, y)).collect::<Result<Vec<f64>, _>>()?;
                if got.len() == n {
                    Ok(got)
                } else {
                    Err(ConfigError::CouldNotParse(field.to_owned(), format!("{} entries, expected {}", got.len(), n)))
                }
            },
            single => Ok(vec![self.evaluate(section, field, single)?; n]),
        }
    }

    pub fn func3(&'a self, section: &str, field: &str, args: [&str; 3]) -> Result<impl Fn(f64, f64, f64) -> f64 + 'a, ConfigError> {
        match &self.lookup(section)[field] {
            Yaml::String(s) | Yaml::Real(s) => {
                let expr = s.parse::<meval::Expr>().map_err(|_| ConfigError::CouldNotParse(field.to_owned(), s.clone()))?;
                expr.bind3_with_context(&self.ctx, args[0], args[1], args[2]).map_err(|_| ConfigError::CouldNotParse(field.to_owned(), s.clone()))
            },
            _ => Err(ConfigError::MissingField(section.to_owned(), field.to_owned()))
        }
    }

    pub fn integer(&self, section: &str, field: &str) -> Result<i64, ConfigError> {
        match &self.lookup(section)[field] {
            Yaml::Integer(i) => Ok(*i),
            _ => Err(ConfigError::MissingField(section.to_owned(), field.to_owned())),
        }
    }

    /// A list of non-negative integers, or a single one broadcast to `n` entries.
    pub fn integers(&self, section: &str, field: &str, n: usize) -> Result<Vec<usize>, ConfigError> {
        let parse = |y: &Yaml| match y {
            Yaml::Integer(i) if *i >= 0 => Ok(*i as usize),
            Yaml::Integer(i) => Err(ConfigError::CouldNotParse(field.to_owned(), i.to_string())),
            _ => Err(ConfigError::MissingField(section.to_owned(), field.to_owned())),
        };
        match &self.lookup(section)[field] {
            Yaml::Array(array) => {
                let got = array.iter().map(parse).collect::<Result<Vec<usize>, _>>()?;
                if got.len() == n {
                    Ok(got)
                } else {
                    Err(ConfigError::CouldNotParse(field.to_owned(), format!("{} entries, expected {}", got.len(), n)))
                }
            },
            single => Ok(vec![parse(single)?; n]),
        }
    }

    pub fn bool(&self, section: &str, field: &str) -> Result<bool, ConfigError> {
        match &self.lookup(section)[field] {
            Yaml::Boolean(b) => Ok(*b),
            _ => Err(ConfigError::MissingField(section.to_owned(), field.to_owned())),
        }
    }

    pub fn strings(&self, section: &str, field: &str) -> Result<Vec<String>, ConfigError> {
        let name = field.to_owned();
        match &self.lookup(section)[field] {
            Yaml::String(s) => {
                Ok(vec![s.clone()])
            },
            Yaml::Array(array) => {
                let got: Vec<String> = array.iter().filter_map(|y| y.as_str().map(str::to_owned)).collect();
                if got.is_empty() {
                    Err(ConfigError::CouldNotParse(section.to_owned(), name))
                } else {
                    Ok(got)
                }
            },
            _ => Err(ConfigError::MissingField(section.to_owned(), name))
        }
    }

    pub fn string(&self, section: &str, field: &str) -> Result<String, ConfigError> {
        let strs = self.strings(section, field)?;
        Ok(strs[0].clone())
    }

    /// Face conditions along every axis: each entry is either one name
    /// for both faces or a `[lower, upper]` pair.
    fn faces(&self, section: &str, field: &str, dims: usize) -> Result<Vec<[String; 2]>, ConfigError> {
        let pair = |y: &Yaml| -> Result<[String; 2], ConfigError> {
            match y {
                Yaml::String(s) => Ok([s.clone(), s.clone()]),
                Yaml::Array(a) => match (a.get(0).and_then(Yaml::as_str), a.get(1).and_then(Yaml::as_str), a.len()) {
                    (Some(lo), Some(hi), 2) => Ok([lo.to_owned(), hi.to_owned()]),
                    _ => Err(ConfigError::CouldNotParse(field.to_owned(), format!("{:?}", a))),
                },
                _ => Err(ConfigError::MissingField(section.to_owned(), field.to_owned())),
            }
        };
        let node = &self.lookup(section)[field];
        match node {
            // in 1D a pair of names is the two faces of the only axis
            Yaml::Array(array) if dims == 1 && array.len() == 2 => Ok(vec![pair(node)?]),
            Yaml::Array(array) if array.len() == dims => array.iter().map(pair).collect(),
            Yaml::Array(array) => Err(ConfigError::CouldNotParse(field.to_owned(), format!("{} axes, expected {}", array.len(), dims))),
            single => Ok(vec![pair(single)?; dims]),
        }
    }

    /// The geometry described by `control` and `boundaries`. The timestep
    /// is either given directly or as a fraction `cfl` of the stability limit.
    pub fn domain_design(&self) -> Result<DomainDesign, ConfigError> {
        let dims = self.integer("control", "dims")? as usize;
        if !(1..=3).contains(&dims) {
            return Err(ConfigError::CouldNotParse("dims".to_owned(), dims.to_string()));
        }
        let cells = self.integers("control", "cells", dims)?;
        let dx = self.reals("control", "cell_length", dims)?;
        let patches = self.integers("control", "patches", dims)?;
        let oversize = if self.contains("control", "oversize") {
            self.integers("control", "oversize", dims)?
        } else {
            vec![2; dims]
        };

        let timestep = if self.contains("control", "timestep") {
            self.real("control", "timestep")?
        } else {
            let cfl = self.real("control", "cfl")?;
            cfl / dx.iter().map(|d| d.powi(-2)).sum::<f64>().sqrt()
        };

        let mut design = DomainDesign::new(dims)
            .cells(&cells)
            .cell_length(&dx)
            .patches(&patches)
            .oversize(&oversize)
            .timestep(timestep);

        if self.contains("control", "ordering") {
            let ordering: PatchOrdering = self.string("control", "ordering")?.parse()?;
            design = design.ordering(ordering);
        }
        if self.contains("boundaries", "fields") {
            for (axis, [lo, hi]) in self.faces("boundaries", "fields", dims)?.iter().enumerate() {
                let lo: FieldBoundaryKind = lo.parse()?;
                let hi: FieldBoundaryKind = hi.parse()?;
                design = design.boundary(axis, lo, hi);
            }
        }
        Ok(design)
    }

    pub fn control(&self) -> Result<Control, ConfigError> {
        let non_negative = |field: &str| -> Result<u64, ConfigError> {
            let i = self.integer("control", field)?;
            u64::try_from(i).map_err(|_| ConfigError::CouldNotParse(field.to_owned(), i.to_string()))
        };
        Ok(Control {
            steps: non_negative("steps")?,
            seed: if self.contains("control", "seed") { non_negative("seed")? } else { 0 },
            n_outputs: if self.contains("control", "n_outputs") { non_negative("n_outputs")? } else { 10 },
            solver: if self.contains("control", "solver") { self.string("control", "solver")? } else { "Yee".to_owned() },
            species_fields: self.contains("control", "species_fields") && self.bool("control", "species_fields")?,
            time_limit: if self.contains("control", "time_limit") { Some(self.real("control", "time_limit")?) } else { None },
        })
    }

    /// Every species listed under `species`, in order. The density
    /// expression is read separately with [`Configuration::density`].
    pub fn species(&self, dims: usize) -> Result<Vec<SpeciesSpec>, ConfigError> {
        if !self.contains("", "species") {
            return Ok(Vec::new());
        }
        self.keys("species")?
            .iter()
            .map(|name| {
                let section = format!("species.{}", name);
                let mut spec = SpeciesSpec::new(name, self.real(&section, "mass")?, self.real(&section, "charge")?);
                if self.contains(&section, "npc") {
                    spec.npc = self.integers(&section, "npc", 1)?[0];
                }
                if self.contains(&section, "temperature") {
                    spec.temperature = self.real(&section, "temperature")?;
                }
                if self.contains(&section, "drift") {
                    let drift = self.reals(&section, "drift", 3)?;
                    spec.drift = [drift[0], drift[1], drift[2]];
                }
                if self.contains(&section, "aux") {
                    spec.aux_width = self.integers(&section, "aux", 1)?[0];
                }
                if self.contains(&section, "boundaries") {
                    for (axis, faces) in self.faces(&section, "boundaries", dims)?.iter().enumerate() {
                        for (side, name) in faces.iter().enumerate() {
                            spec.boundaries[axis][side] = ParticleBoundary::from_name(name, spec.temperature)?;
                        }
                    }
                }
                Ok(spec)
            })
            .collect()
    }

    /// Number density of species `name` as a function of position.
    pub fn density(&'a self, name: &str) -> Result<impl Fn(f64, f64, f64) -> f64 + 'a, ConfigError> {
        self.func3(&format!("species.{}", name), "density", ["x", "y", "z"])
    }

    /// Steps on which the charge density is needed; none if the
    /// `diagnostics.charge` section is absent.
    pub fn charge_selection(&self) -> Result<TimeSelection, ConfigError> {
        let section = "diagnostics.charge";
        if !self.contains(section, "every") {
            return Ok(TimeSelection::never());
        }
        let every = self.integers(section, "every", 1)?[0] as u64;
        let start = if self.contains(section, "start") { self.integers(section, "start", 1)?[0] as u64 } else { 0 };
        let end = if self.contains(section, "end") { self.integers(section, "end", 1)?[0] as u64 } else { u64::MAX };
        Ok(TimeSelection::new(every).between(start, end))
    }
}

/// Estimated time to completion, given the time elapsed since `start`
/// and `current` of `total` steps done.
pub fn ettc (start: Instant, current: usize, total: usize) -> Duration {
    let rt = start.elapsed().as_secs_f64();
    let ettc = rt * ((total - current) as f64) / (current as f64);
    Duration::from_secs_f64(ettc)
}

pub struct PrettyDuration {
    pub duration: Duration,
}

impl From<Duration> for PrettyDuration {
    fn from(duration: Duration) -> PrettyDuration {
        PrettyDuration {duration}
    }
}

impl fmt::Display for PrettyDuration {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut t = self.duration.as_secs();
        let s = t % 60;
        t /= 60;
        let min = t % 60;
        t /= 60;
        let hr = t % 24;
        let d = t / 24;
        if d > 0 {
            write!(f, "{}d {:02}:{:02}:{:02}", d, hr, min, s)
        } else {
            write!(f, "{:02}:{:02}:{:02}", hr, min, s)
        }
    }
}
