//! How the global patch sequence is divided among processes.

use crate::error::DecompositionError;

/// Rank of a process in the communicator.
pub type Rank = i32;

/// Specifies which contiguous range of hindices each process owns,
/// without constructing any patches.
#[derive(Debug, Clone, PartialEq)]
pub struct Decomposition {
    /// `first[r]` is the first hindex owned by rank `r`; the final entry
    /// is the total number of patches.
    first: Vec<usize>,
}

impl Decomposition {
    /// Splits `n_patches` patches among `n_ranks` processes as evenly as
    /// possible; the first `n_patches % n_ranks` ranks get one extra.
    pub fn even(n_patches: usize, n_ranks: usize) -> Result<Self, DecompositionError> {
        if n_ranks == 0 || n_patches < n_ranks {
            return Err(DecompositionError::TooFewPatches { patches: n_patches, ranks: n_ranks });
        }
        let base = n_patches / n_ranks;
        let extra = n_patches % n_ranks;
        let counts: Vec<usize> = (0..n_ranks)
            .map(|r| if r < extra { base + 1 } else { base })
            .collect();
        Ok(Self::from_counts(&counts))
    }

    /// Splits the patch sequence so that the summed `cost` (e.g. particle
    /// count) per process is approximately the same. Every process gets
    /// at least one patch.
    pub fn balanced(cost: &[f64], n_ranks: usize) -> Result<Self, DecompositionError> {
        let n_patches = cost.len();
        if n_ranks == 0 || n_patches < n_ranks {
            return Err(DecompositionError::TooFewPatches { patches: n_patches, ranks: n_ranks });
        }

        let cumsum: Vec<f64> = cost
            .iter()
            .scan(0.0f64, |total, c| { *total += c.max(0.0); Some(*total) })
            .collect();
        let total = cumsum.last().copied().unwrap_or(0.0);
        if total <= 0.0 {
            return Self::even(n_patches, n_ranks);
        }
        // Each process should get this much, approx:
        let target = total / (n_ranks as f64);

        let mut counts: Vec<usize> = Vec::with_capacity(n_ranks);
        let mut start: usize = 0;
        for r in 1..n_ranks {
            // leave at least one patch for every process still to come
            let last_allowed = n_patches - (n_ranks - r);
            let goal = target * (r as f64);
            // first patch past the goal, kept only if that lands closer to it
            let end = match cumsum[start..last_allowed].iter().position(|&cs| cs >= goal) {
                Some(i) => {
                    let i = start + i;
                    if i > start && goal - cumsum[i - 1] < cumsum[i] - goal { i } else { i + 1 }
                }
                None => last_allowed,
            }
            .max(start + 1);
            counts.push(end - start);
            start = end;
        }
        counts.push(n_patches - start);

        Ok(Self::from_counts(&counts))
    }

    fn from_counts(counts: &[usize]) -> Self {
        let first: Vec<usize> = std::iter::once(0)
            .chain(counts.iter().scan(0usize, |rt, n| { *rt += n; Some(*rt) }))
            .collect();
        Decomposition { first }
    }

    pub fn n_ranks(&self) -> usize {
        self.first.len() - 1
    }

    pub fn n_patches(&self) -> usize {
        self.first[self.first.len() - 1]
    }

    /// Range of hindices owned by `rank`.
    pub fn range(&self, rank: Rank) -> std::ops::Range<usize> {
        let r = rank as usize;
        self.first[r]..self.first[r + 1]
    }

    /// Rank owning the patch `hindex`.
    pub fn owner(&self, hindex: usize) -> Result<Rank, DecompositionError> {
        if hindex >= self.n_patches() {
            return Err(DecompositionError::NoSuchPatch { hindex, total: self.n_patches() });
        }
        // first is sorted; find the last rank whose first hindex is <= hindex
        let r = self.first.partition_point(|&f| f <= hindex) - 1;
        Ok(r as Rank)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn even_split_gives_leading_ranks_the_remainder() {
        let d = Decomposition::even(10, 4).unwrap();
        assert_eq!(d.range(0), 0..3);
        assert_eq!(d.range(1), 3..6);
        assert_eq!(d.range(2), 6..8);
        assert_eq!(d.range(3), 8..10);
        assert_eq!(d.owner(5).unwrap(), 1);
        assert_eq!(d.owner(9).unwrap(), 3);
        assert!(d.owner(10).is_err());
    }

    #[test]
    fn cannot_have_idle_processes() {
        assert_eq!(
            Decomposition::even(2, 3),
            Err(DecompositionError::TooFewPatches { patches: 2, ranks: 3 })
        );
    }

    #[test]
    fn balanced_split_follows_cost() {
        // all the work lives in the first two patches
        let cost = [5.0, 5.0, 0.1, 0.1, 0.1, 0.1, 0.1, 0.1];
        let d = Decomposition::balanced(&cost, 2).unwrap();
        assert_eq!(d.range(0), 0..1);
        assert_eq!(d.range(1), 1..8);
        assert_eq!(d.n_patches(), 8);
    }

    #[test]
    fn balanced_split_is_contiguous_and_complete() {
        let cost: Vec<f64> = (0..37).map(|i| ((i * 7) % 5) as f64).collect();
        for ranks in 1..8 {
            let d = Decomposition::balanced(&cost, ranks).unwrap();
            assert_eq!(d.n_ranks(), ranks);
            let mut next = 0;
            for r in 0..ranks {
                let range = d.range(r as Rank);
                assert_eq!(range.start, next);
                assert!(!range.is_empty());
                next = range.end;
            }
            assert_eq!(next, 37);
        }
    }

    #[test]
    fn zero_cost_falls_back_to_even() {
        let d = Decomposition::balanced(&[0.0; 6], 3).unwrap();
        assert_eq!(d, Decomposition::even(6, 3).unwrap());
    }
}
