//! Point-to-point messaging and reductions between processes.
//!
//! Every message is a flat buffer of f64 and is matched by the sending
//! rank and a tag. Tags are derived from the sending patch, the axis and
//! the face it leaves through, so no two messages of one round can be
//! confused. Transport failures are not recoverable: a mismatched buffer
//! panics and a missing message blocks forever.

use crate::decomposition::Rank;
use crate::domain::Side;

mod local;
pub use self::local::*;

#[cfg(feature = "mpi")]
mod mpi;
#[cfg(feature = "mpi")]
pub use self::mpi::*;

pub type Tag = i32;

/// Largest tag that every MPI implementation must accept.
pub const MAX_TAG: Tag = 32767;

/// Most patches a run can have with every tag of [`tag`] valid.
pub fn max_patches() -> usize {
    (MAX_TAG as usize + 1) / 6
}

/// Tag of the message that patch `hindex` sends through face `side` of `axis`.
pub fn tag(hindex: usize, axis: usize, side: Side) -> Tag {
    ((hindex * 3 + axis) * 2 + side.index()) as Tag
}

/// A buffer to be sent.
#[derive(Debug, Clone)]
pub struct Outgoing {
    pub to: Rank,
    pub tag: Tag,
    pub data: Vec<f64>,
}

/// A buffer to be received, preallocated to the expected length.
#[derive(Debug, Clone)]
pub struct Incoming {
    pub from: Rank,
    pub tag: Tag,
    pub data: Vec<f64>,
}

impl Incoming {
    pub fn new(from: Rank, tag: Tag, len: usize) -> Self {
        Incoming { from, tag, data: vec![0.0; len] }
    }
}

pub trait Transport {
    fn rank(&self) -> Rank;

    fn size(&self) -> usize;

    /// Posts every send and every receive, then blocks until all have
    /// completed. The received buffers must match their preallocated size.
    fn exchange(&self, outgoing: Vec<Outgoing>, incoming: &mut [Incoming]);

    /// Sum over all ranks; every rank gets the same bits.
    fn sum_f64(&self, value: f64) -> f64;

    fn sum_u64(&self, value: u64) -> u64;

    /// True on every rank if it is true on any.
    fn any(&self, flag: bool) -> bool {
        self.sum_u64(flag as u64) > 0
    }
}
