//! Immutable description of the global simulation domain and of the
//! way it is cut into patches.

use std::str::FromStr;

use crate::error::{ConfigError, DecompositionError};
use crate::ordering::PatchOrdering;
use crate::transport;

/// One of the two faces of a patch, or of the domain, along an axis.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Side {
    Lower,
    Upper,
}

impl Side {
    pub const BOTH: [Side; 2] = [Side::Lower, Side::Upper];

    pub fn index(self) -> usize {
        match self {
            Side::Lower => 0,
            Side::Upper => 1,
        }
    }

    pub fn opposite(self) -> Side {
        match self {
            Side::Lower => Side::Upper,
            Side::Upper => Side::Lower,
        }
    }
}

/// Field boundary condition applied at a face of the global domain.
///
/// - `Periodic`: fields wrap around the domain; the face is an ordinary
/// seam between patches.
/// - `SilverMuller`: outgoing waves at normal incidence are absorbed.
/// - `Reflective`: the face acts as a perfect conductor.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum FieldBoundaryKind {
    Periodic,
    SilverMuller,
    Reflective,
}

impl FromStr for FieldBoundaryKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "periodic" => Ok(FieldBoundaryKind::Periodic),
            "silver-muller" | "silver_muller" | "absorbing" => Ok(FieldBoundaryKind::SilverMuller),
            "reflective" | "conducting" => Ok(FieldBoundaryKind::Reflective),
            _ => Err(ConfigError::UnknownVariant { what: "field boundary", value: s.to_owned() }),
        }
    }
}

/// Parameters of the domain, not yet validated. Axes beyond `dims`
/// are ignored.
#[derive(Debug, Clone)]
pub struct DomainDesign {
    pub dims: usize,
    pub n_cells: [usize; 3],
    pub cell_length: [f64; 3],
    pub timestep: f64,
    pub oversize: [usize; 3],
    pub n_patches: [usize; 3],
    pub boundaries: [[FieldBoundaryKind; 2]; 3],
    pub ordering: PatchOrdering,
}

impl DomainDesign {
    /// A periodic, single-patch domain of unit cells, to be refined
    /// with the builder methods below.
    pub fn new(dims: usize) -> Self {
        DomainDesign {
            dims,
            n_cells: [1; 3],
            cell_length: [1.0; 3],
            timestep: 0.5,
            oversize: [2; 3],
            n_patches: [1; 3],
            boundaries: [[FieldBoundaryKind::Periodic; 2]; 3],
            ordering: PatchOrdering::Linear,
        }
    }

    pub fn cells(mut self, n: &[usize]) -> Self {
        self.n_cells[..n.len()].copy_from_slice(n);
        self
    }

    pub fn cell_length(mut self, dx: &[f64]) -> Self {
        self.cell_length[..dx.len()].copy_from_slice(dx);
        self
    }

    pub fn timestep(mut self, dt: f64) -> Self {
        self.timestep = dt;
        self
    }

    pub fn oversize(mut self, o: &[usize]) -> Self {
        self.oversize[..o.len()].copy_from_slice(o);
        self
    }

    pub fn patches(mut self, n: &[usize]) -> Self {
        self.n_patches[..n.len()].copy_from_slice(n);
        self
    }

    pub fn boundary(mut self, axis: usize, lower: FieldBoundaryKind, upper: FieldBoundaryKind) -> Self {
        self.boundaries[axis] = [lower, upper];
        self
    }

    pub fn ordering(mut self, ordering: PatchOrdering) -> Self {
        self.ordering = ordering;
        self
    }

    /// Validates the design. Every problem found here is fatal.
    pub fn build(self) -> Result<GlobalDomain, DecompositionError> {
        let dims = self.dims;
        if dims == 0 || dims > 3 {
            return Err(DecompositionError::InvalidDimensionality(dims));
        }
        if !(self.timestep > 0.0) {
            return Err(DecompositionError::NonPositiveTimestep(self.timestep));
        }

        let mut n_cells = [1; 3];
        let mut cell_length = [1.0; 3];
        let mut oversize = [0; 3];
        let mut n_patches = [1; 3];
        let mut n_space = [0; 3];
        let mut boundaries = [[FieldBoundaryKind::Periodic; 2]; 3];

        for axis in 0..dims {
            let (cells, patches, o) = (self.n_cells[axis], self.n_patches[axis], self.oversize[axis]);
            if patches == 0 || cells % patches != 0 {
                return Err(DecompositionError::UnevenSplit { axis, cells, patches });
            }
            if !(self.cell_length[axis] > 0.0) {
                return Err(DecompositionError::NonPositiveCellLength(axis));
            }
            if o == 0 {
                return Err(DecompositionError::NoGhostLayer(axis));
            }
            // the lower and upper reduction regions of a patch must not overlap
            let n = cells / patches;
            let required = 2 * o + 2;
            if n < required {
                return Err(DecompositionError::PatchTooSmall { axis, n_space: n, oversize: o, required });
            }
            let [lower, upper] = self.boundaries[axis];
            if (lower == FieldBoundaryKind::Periodic) != (upper == FieldBoundaryKind::Periodic) {
                return Err(DecompositionError::HalfPeriodic(axis));
            }

            n_cells[axis] = cells;
            cell_length[axis] = self.cell_length[axis];
            oversize[axis] = o;
            n_patches[axis] = patches;
            n_space[axis] = n;
            boundaries[axis] = self.boundaries[axis];
        }

        self.ordering.validate(&n_patches[..dims])?;

        let patches: usize = n_patches.iter().product();
        if patches > transport::max_patches() {
            return Err(DecompositionError::TooManyPatches { patches, max: transport::max_patches() });
        }

        Ok(GlobalDomain {
            dims,
            n_cells,
            cell_length,
            timestep: self.timestep,
            oversize,
            n_patches,
            n_space,
            boundaries,
            ordering: self.ordering,
        })
    }
}

/// The validated, read-only description of the domain shared by every
/// patch of every process. Inactive axes have one cell, one patch and no
/// ghost layer.
#[derive(Debug, Clone, PartialEq)]
pub struct GlobalDomain {
    dims: usize,
    n_cells: [usize; 3],
    cell_length: [f64; 3],
    timestep: f64,
    oversize: [usize; 3],
    n_patches: [usize; 3],
    n_space: [usize; 3],
    boundaries: [[FieldBoundaryKind; 2]; 3],
    ordering: PatchOrdering,
}

impl GlobalDomain {
    pub fn dims(&self) -> usize {
        self.dims
    }

    /// The active axes, in exchange order.
    pub fn axes(&self) -> std::ops::Range<usize> {
        0..self.dims
    }

    pub fn n_cells(&self, axis: usize) -> usize {
        self.n_cells[axis]
    }

    /// Number of interior cells per patch along `axis`.
    pub fn n_space(&self, axis: usize) -> usize {
        self.n_space[axis]
    }

    pub fn oversize(&self, axis: usize) -> usize {
        self.oversize[axis]
    }

    pub fn cell_length(&self, axis: usize) -> f64 {
        self.cell_length[axis]
    }

    pub fn cell_volume(&self) -> f64 {
        self.cell_length[..self.dims].iter().product()
    }

    pub fn timestep(&self) -> f64 {
        self.timestep
    }

    /// Physical length of the domain along `axis`.
    pub fn length(&self, axis: usize) -> f64 {
        (self.n_cells[axis] as f64) * self.cell_length[axis]
    }

    pub fn n_patches(&self, axis: usize) -> usize {
        self.n_patches[axis]
    }

    /// Patch counts along the active axes.
    pub fn patch_shape(&self) -> &[usize] {
        &self.n_patches[..self.dims]
    }

    pub fn total_patches(&self) -> usize {
        self.n_patches.iter().product()
    }

    pub fn ordering(&self) -> PatchOrdering {
        self.ordering
    }

    pub fn boundary(&self, axis: usize, side: Side) -> FieldBoundaryKind {
        self.boundaries[axis][side.index()]
    }

    pub fn is_periodic(&self, axis: usize) -> bool {
        axis < self.dims && self.boundaries[axis][0] == FieldBoundaryKind::Periodic
    }

    /// Number of grid nodes, ghosts included, of a field along `axis`.
    pub fn field_extent(&self, axis: usize, dual: bool) -> usize {
        if axis < self.dims {
            self.n_space[axis] + 1 + 2 * self.oversize[axis] + (dual as usize)
        } else {
            1
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inactive_axes_collapse() {
        let domain = DomainDesign::new(1).cells(&[40]).patches(&[4]).build().unwrap();
        assert_eq!(domain.n_space(0), 10);
        assert_eq!(domain.field_extent(0, false), 15);
        assert_eq!(domain.field_extent(0, true), 16);
        assert_eq!(domain.field_extent(1, true), 1);
        assert_eq!(domain.total_patches(), 4);
        assert_eq!(domain.patch_shape(), &[4]);
    }

    #[test]
    fn rejects_invalid_designs() {
        assert_eq!(
            DomainDesign::new(4).build().unwrap_err(),
            DecompositionError::InvalidDimensionality(4)
        );
        assert_eq!(
            DomainDesign::new(1).cells(&[30]).patches(&[4]).build().unwrap_err(),
            DecompositionError::UnevenSplit { axis: 0, cells: 30, patches: 4 }
        );
        assert_eq!(
            DomainDesign::new(2).cells(&[32, 32]).patches(&[4, 8]).oversize(&[2, 2]).build().unwrap_err(),
            DecompositionError::PatchTooSmall { axis: 1, n_space: 4, oversize: 2, required: 6 }
        );
        assert_eq!(
            DomainDesign::new(1)
                .cells(&[32])
                .boundary(0, FieldBoundaryKind::Periodic, FieldBoundaryKind::SilverMuller)
                .build()
                .unwrap_err(),
            DecompositionError::HalfPeriodic(0)
        );
        assert!(matches!(
            DomainDesign::new(2).cells(&[48, 48]).patches(&[3, 3]).ordering(PatchOrdering::Hilbert).build(),
            Err(DecompositionError::HilbertShape(_))
        ));
        assert_eq!(
            DomainDesign::new(1).cells(&[32]).timestep(0.0).build().unwrap_err(),
            DecompositionError::NonPositiveTimestep(0.0)
        );
    }

    #[test]
    fn patch_count_is_bounded_by_tags() {
        let max = transport::max_patches();
        assert!(DomainDesign::new(1).cells(&[6 * max]).patches(&[max]).build().is_ok());
        assert_eq!(
            DomainDesign::new(1).cells(&[6 * (max + 1)]).patches(&[max + 1]).build().unwrap_err(),
            DecompositionError::TooManyPatches { patches: max + 1, max }
        );
        assert_eq!(
            DomainDesign::new(2).cells(&[768, 768]).patches(&[128, 128]).build().unwrap_err(),
            DecompositionError::TooManyPatches { patches: 16384, max }
        );
    }

    #[test]
    fn parses_boundary_names() {
        assert_eq!("Silver-Muller".parse::<FieldBoundaryKind>().unwrap(), FieldBoundaryKind::SilverMuller);
        assert_eq!("periodic".parse::<FieldBoundaryKind>().unwrap(), FieldBoundaryKind::Periodic);
        assert!("sticky".parse::<FieldBoundaryKind>().is_err());
    }
}
