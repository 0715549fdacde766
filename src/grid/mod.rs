//! Field storage on the staggered grid of a single patch.

use std::ops::{Index, IndexMut, Range};

use ndarray::prelude::*;
use ndarray::{Slice, Zip};

use crate::domain::GlobalDomain;

mod em;
mod yee;
mod boundary;

pub use self::em::*;
pub use self::yee::*;
pub use self::boundary::*;

/// A dense array of nodes covering one patch, ghost layers included.
///
/// Every field is stored as three-dimensional; axes that the simulation
/// does not resolve have extent 1. Along an active axis `d` a primal field
/// has `n_space + 1 + 2*oversize` nodes and a dual field one more, with
/// the first primal interior node at index `oversize`.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    name: String,
    dual: [bool; 3],
    data: Array3<f64>,
}

impl Field {
    /// Allocates a zeroed field. Staggering requested along inactive axes
    /// is ignored.
    pub fn new(name: &str, domain: &GlobalDomain, dual: [bool; 3]) -> Field {
        let mut stagger = [false; 3];
        for axis in domain.axes() {
            stagger[axis] = dual[axis];
        }
        let shape = (
            domain.field_extent(0, stagger[0]),
            domain.field_extent(1, stagger[1]),
            domain.field_extent(2, stagger[2]),
        );
        Field {
            name: name.to_owned(),
            dual: stagger,
            data: Array3::zeros(shape),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_dual(&self, axis: usize) -> bool {
        self.dual[axis]
    }

    pub fn dims(&self) -> [usize; 3] {
        let s = self.data.shape();
        [s[0], s[1], s[2]]
    }

    pub fn view(&self) -> ArrayView3<'_, f64> {
        self.data.view()
    }

    pub fn view_mut(&mut self) -> ArrayViewMut3<'_, f64> {
        self.data.view_mut()
    }

    /// Sets every node, ghosts included, to `value`.
    pub fn put_to(&mut self, value: f64) {
        self.data.fill(value);
    }

    pub fn zero(&mut self) {
        self.put_to(0.0);
    }

    pub fn copy_from(&mut self, other: &Field) {
        self.data.assign(&other.data);
    }

    /// Adds `other` node by node, e.g. to fold a species current into the total.
    pub fn add_from(&mut self, other: &Field) {
        self.data += &other.data;
    }

    /// Nodes owned by this patch along `axis`: every physical node appears
    /// in exactly one patch when the domain is periodic.
    pub fn interior(&self, domain: &GlobalDomain, axis: usize) -> Range<usize> {
        if axis >= domain.dims() {
            return 0..1;
        }
        let start = domain.oversize(axis) + (self.dual[axis] as usize);
        start..start + domain.n_space(axis)
    }

    /// Sum of squares over the interior nodes.
    pub fn norm2(&self, domain: &GlobalDomain) -> f64 {
        let view = self.data.slice(s![
            Slice::from(self.interior(domain, 0)),
            Slice::from(self.interior(domain, 1)),
            Slice::from(self.interior(domain, 2))
        ]);
        view.iter().map(|v| v * v).sum()
    }

    /// Number of values in a slab `width` nodes thick across `axis`.
    pub fn slab_len(&self, axis: usize, width: usize) -> usize {
        let dims = self.dims();
        width * dims.iter().enumerate().filter(|&(a, _)| a != axis).map(|(_, n)| n).product::<usize>()
    }

    fn slab_shape(&self, axis: usize, width: usize) -> (usize, usize, usize) {
        let mut dims = self.dims();
        dims[axis] = width;
        (dims[0], dims[1], dims[2])
    }

    /// Copies the slab `range` across `axis`, in logical (row-major) order.
    pub fn extract(&self, axis: usize, range: Range<usize>) -> Vec<f64> {
        self.data
            .slice_axis(Axis(axis), Slice::from(range))
            .iter()
            .copied()
            .collect()
    }

    /// Replaces the slab `range` across `axis` with `values`, as produced
    /// by [`Field::extract`] on a field of the same staggering.
    pub fn overwrite(&mut self, axis: usize, range: Range<usize>, values: &[f64]) {
        let shape = self.slab_shape(axis, range.len());
        let source = ArrayView3::from_shape(shape, values)
            .expect("slab does not match the field geometry");
        self.data
            .slice_axis_mut(Axis(axis), Slice::from(range))
            .assign(&source);
    }

    /// Adds `values` into the slab `range` across `axis`.
    pub fn accumulate(&mut self, axis: usize, range: Range<usize>, values: &[f64]) {
        let shape = self.slab_shape(axis, range.len());
        let source = ArrayView3::from_shape(shape, values)
            .expect("slab does not match the field geometry");
        Zip::from(self.data.slice_axis_mut(Axis(axis), Slice::from(range)))
            .and(&source)
            .for_each(|dst, &src| *dst += src);
    }
}

impl Index<[usize; 3]> for Field {
    type Output = f64;
    fn index(&self, idx: [usize; 3]) -> &f64 {
        &self.data[idx]
    }
}

impl IndexMut<[usize; 3]> for Field {
    fn index_mut(&mut self, idx: [usize; 3]) -> &mut f64 {
        &mut self.data[idx]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::DomainDesign;

    fn domain_2d() -> GlobalDomain {
        DomainDesign::new(2).cells(&[16, 12]).patches(&[2, 2]).oversize(&[2, 1]).build().unwrap()
    }

    #[test]
    fn extents_follow_staggering() {
        let domain = domain_2d();
        let f = Field::new("Bz", &domain, [true, true, true]);
        // 8 + 1 + 4 + 1 along x, 6 + 1 + 2 + 1 along y, inactive z
        assert_eq!(f.dims(), [14, 10, 1]);
        assert!(!f.is_dual(2));
        assert_eq!(f.slab_len(0, 2), 20);
    }

    #[test]
    fn slabs_move_between_fields() {
        let domain = domain_2d();
        let mut a = Field::new("Ex", &domain, [true, false, false]);
        let mut b = Field::new("Ex", &domain, [true, false, false]);
        for ((i, j, k), v) in a.view_mut().indexed_iter_mut() {
            *v = (100 * i + 10 * j + k) as f64;
        }
        let slab = a.extract(1, 3..5);
        assert_eq!(slab.len(), a.slab_len(1, 2));
        b.overwrite(1, 0..2, &slab);
        assert_eq!(b[[4, 1, 0]], a[[4, 4, 0]]);
        b.accumulate(1, 0..2, &slab);
        assert_eq!(b[[7, 0, 0]], 2.0 * a[[7, 3, 0]]);
        assert_eq!(b[[7, 2, 0]], 0.0);
    }

    #[test]
    fn norm_skips_ghosts() {
        let domain = domain_2d();
        let mut f = Field::new("rho", &domain, [false; 3]);
        f.put_to(2.0);
        // 8 x 6 owned nodes
        assert_eq!(f.norm2(&domain), 4.0 * 48.0);
        f.zero();
        assert_eq!(f.norm2(&domain), 0.0);
    }

    #[test]
    #[should_panic]
    fn mismatched_slab_is_fatal() {
        let domain = domain_2d();
        let mut f = Field::new("rho", &domain, [false; 3]);
        f.overwrite(0, 0..2, &[1.0; 3]);
    }
}
