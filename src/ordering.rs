//! Global ordering of patches. The position of a patch along the chosen
//! curve is its hindex; contiguous hindex ranges are handed to processes,
//! so a space-filling curve keeps each process's patches compact.

use std::str::FromStr;

use crate::error::{ConfigError, DecompositionError};

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum PatchOrdering {
    /// Row-major order, axis 0 varying slowest.
    Linear,
    /// Compact Hilbert curve; needs the same power-of-two patch count
    /// along every axis.
    Hilbert,
}

impl FromStr for PatchOrdering {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "linear" | "linearized" => Ok(PatchOrdering::Linear),
            "hilbert" | "hilbertian" => Ok(PatchOrdering::Hilbert),
            _ => Err(ConfigError::UnknownVariant { what: "patch ordering", value: s.to_owned() }),
        }
    }
}

impl PatchOrdering {
    /// Checks that patches laid out as `shape` can be ordered this way.
    pub fn validate(self, shape: &[usize]) -> Result<(), DecompositionError> {
        match self {
            PatchOrdering::Linear => Ok(()),
            PatchOrdering::Hilbert => {
                let first = shape[0];
                if first.is_power_of_two() && shape.iter().all(|&n| n == first) {
                    Ok(())
                } else {
                    Err(DecompositionError::HilbertShape(shape.to_vec()))
                }
            }
        }
    }

    /// Position along the curve of the patch at `coords`.
    pub fn hindex(self, shape: &[usize], coords: &[usize]) -> usize {
        debug_assert_eq!(shape.len(), coords.len());
        match self {
            PatchOrdering::Linear => coords
                .iter()
                .zip(shape)
                .fold(0, |h, (&c, &n)| h * n + c),
            PatchOrdering::Hilbert if shape.len() == 1 => coords[0],
            PatchOrdering::Hilbert => {
                let bits = shape[0].trailing_zeros();
                let mut x: Vec<usize> = coords.to_vec();
                axes_to_transpose(&mut x, bits);
                interleave(&x, bits)
            }
        }
    }

    /// Inverse of [`PatchOrdering::hindex`]. Unused axes are reported as 0.
    pub fn coords(self, shape: &[usize], hindex: usize) -> [usize; 3] {
        let mut out = [0; 3];
        match self {
            PatchOrdering::Linear => {
                let mut h = hindex;
                for axis in (0..shape.len()).rev() {
                    out[axis] = h % shape[axis];
                    h /= shape[axis];
                }
            }
            PatchOrdering::Hilbert if shape.len() == 1 => out[0] = hindex,
            PatchOrdering::Hilbert => {
                let bits = shape[0].trailing_zeros();
                let mut x = deinterleave(hindex, shape.len(), bits);
                transpose_to_axes(&mut x, bits);
                out[..shape.len()].copy_from_slice(&x);
            }
        }
        out
    }
}

/*------------------------------------------------------------------------------------

  Skilling's transform (AIP Conf. Proc. 707, 381 (2004)) between axis
  coordinates and the "transposed" Hilbert index, in which bit b of the
  index for axis i is stored in bit b of x[i]. Interleaving the transposed
  form, most significant bit first, gives the scalar index.

------------------------------------------------------------------------------------*/

fn axes_to_transpose(x: &mut [usize], bits: u32) {
    if bits == 0 {
        return;
    }
    let n = x.len();
    let m = 1usize << (bits - 1);

    // inverse undo
    let mut q = m;
    while q > 1 {
        let p = q - 1;
        for i in 0..n {
            if x[i] & q != 0 {
                x[0] ^= p;
            } else {
                let t = (x[0] ^ x[i]) & p;
                x[0] ^= t;
                x[i] ^= t;
            }
        }
        q >>= 1;
    }

    // Gray encode
    for i in 1..n {
        x[i] ^= x[i - 1];
    }
    let mut t = 0;
    let mut q = m;
    while q > 1 {
        if x[n - 1] & q != 0 {
            t ^= q - 1;
        }
        q >>= 1;
    }
    for xi in x.iter_mut() {
        *xi ^= t;
    }
}

fn transpose_to_axes(x: &mut [usize], bits: u32) {
    if bits == 0 {
        return;
    }
    let n = x.len();
    let big = 2usize << (bits - 1);

    // Gray decode
    let t = x[n - 1] >> 1;
    for i in (1..n).rev() {
        x[i] ^= x[i - 1];
    }
    x[0] ^= t;

    // undo excess work
    let mut q = 2;
    while q != big {
        let p = q - 1;
        for i in (0..n).rev() {
            if x[i] & q != 0 {
                x[0] ^= p;
            } else {
                let t = (x[0] ^ x[i]) & p;
                x[0] ^= t;
                x[i] ^= t;
            }
        }
        q <<= 1;
    }
}

fn interleave(x: &[usize], bits: u32) -> usize {
    let mut h = 0;
    for b in (0..bits).rev() {
        for xi in x {
            h = (h << 1) | ((xi >> b) & 1);
        }
    }
    h
}

fn deinterleave(h: usize, n: usize, bits: u32) -> Vec<usize> {
    let mut x = vec![0; n];
    let mut shift = (bits as usize) * n;
    for b in (0..bits).rev() {
        for xi in x.iter_mut() {
            shift -= 1;
            *xi |= ((h >> shift) & 1) << b;
        }
    }
    x
}
