//! Cross-process transport over MPI.

use mpi::collective::SystemOperation;
use mpi::request::WaitGuard;
use mpi::topology::SimpleCommunicator;
use mpi::traits::*;

use crate::decomposition::Rank;
use crate::transport::{Incoming, Outgoing, Transport};

pub struct MpiTransport {
    world: SimpleCommunicator,
}

impl MpiTransport {
    pub fn new(world: SimpleCommunicator) -> Self {
        MpiTransport { world }
    }
}

impl Transport for MpiTransport {
    fn rank(&self) -> Rank {
        self.world.rank()
    }

    fn size(&self) -> usize {
        self.world.size() as usize
    }

    fn exchange(&self, outgoing: Vec<Outgoing>, incoming: &mut [Incoming]) {
        mpi::request::scope(|scope| {
            // receives first, so that no send waits on an unposted receive
            let mut receives = Vec::with_capacity(incoming.len());
            for inc in incoming.iter_mut() {
                let (from, tag, len) = (inc.from, inc.tag, inc.data.len());
                let process = self.world.process_at_rank(from);
                let req = process.immediate_receive_into_with_tag(scope, &mut inc.data[..], tag);
                receives.push((from, len, req));
            }
            let sends: Vec<_> = outgoing
                .iter()
                .map(|out| {
                    let process = self.world.process_at_rank(out.to);
                    WaitGuard::from(process.immediate_send_with_tag(scope, &out.data[..], out.tag))
                })
                .collect();
            for (from, len, req) in receives {
                let status = req.wait();
                let got = status.count(f64::equivalent_datatype()) as usize;
                assert_eq!(got, len, "expected {} values from rank {}", len, from);
            }
            drop(sends);
        });
    }

    fn sum_f64(&self, value: f64) -> f64 {
        let mut total = 0.0;
        self.world.all_reduce_into(&value, &mut total, SystemOperation::sum());
        total
    }

    fn sum_u64(&self, value: u64) -> u64 {
        let mut total = 0u64;
        self.world.all_reduce_into(&value, &mut total, SystemOperation::sum());
        total
    }
}
