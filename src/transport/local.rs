//! In-process transport: each thread plays the part of one rank.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use parking_lot::{Condvar, Mutex};

use crate::decomposition::Rank;
use crate::transport::{Incoming, Outgoing, Tag, Transport};

/// Reserved for collectives; patch tags are never negative.
const COLLECTIVE: Tag = -1;

type Mailbox = HashMap<(Rank, Rank, Tag), VecDeque<Vec<f64>>>;

#[derive(Default)]
struct Switchboard {
    mail: Mutex<Mailbox>,
    delivered: Condvar,
}

impl Switchboard {
    fn post(&self, from: Rank, to: Rank, tag: Tag, data: Vec<f64>) {
        let mut mail = self.mail.lock();
        mail.entry((from, to, tag)).or_default().push_back(data);
        self.delivered.notify_all();
    }

    fn take(&self, from: Rank, to: Rank, tag: Tag) -> Vec<f64> {
        let mut mail = self.mail.lock();
        loop {
            if let Some(data) = mail.get_mut(&(from, to, tag)).and_then(|q| q.pop_front()) {
                return data;
            }
            self.delivered.wait(&mut mail);
        }
    }
}

/// One rank of a group of threads sharing a switchboard. Messages between
/// a given pair of ranks with a given tag arrive in the order they were sent.
pub struct ThreadTransport {
    rank: Rank,
    size: usize,
    board: Arc<Switchboard>,
}

impl ThreadTransport {
    /// Creates `n` connected ranks, to be moved into one thread each.
    pub fn universe(n: usize) -> Vec<ThreadTransport> {
        let board = Arc::new(Switchboard::default());
        (0..n)
            .map(|r| ThreadTransport { rank: r as Rank, size: n, board: Arc::clone(&board) })
            .collect()
    }

    /// A lone rank, for running without a message-passing library.
    pub fn single() -> ThreadTransport {
        let mut all = Self::universe(1);
        all.remove(0)
    }

    /// Everyone's value, in rank order.
    fn all_gather(&self, value: f64) -> Vec<f64> {
        for to in 0..self.size as Rank {
            if to != self.rank {
                self.board.post(self.rank, to, COLLECTIVE, vec![value]);
            }
        }
        (0..self.size as Rank)
            .map(|from| if from == self.rank { value } else { self.board.take(from, self.rank, COLLECTIVE)[0] })
            .collect()
    }
}

impl Transport for ThreadTransport {
    fn rank(&self) -> Rank {
        self.rank
    }

    fn size(&self) -> usize {
        self.size
    }

    fn exchange(&self, outgoing: Vec<Outgoing>, incoming: &mut [Incoming]) {
        for out in outgoing {
            self.board.post(self.rank, out.to, out.tag, out.data);
        }
        for inc in incoming.iter_mut() {
            let data = self.board.take(inc.from, self.rank, inc.tag);
            assert_eq!(
                data.len(), inc.data.len(),
                "rank {} expected {} values from rank {} with tag {}", self.rank, inc.data.len(), inc.from, inc.tag
            );
            inc.data = data;
        }
    }

    fn sum_f64(&self, value: f64) -> f64 {
        self.all_gather(value).iter().sum()
    }

    fn sum_u64(&self, value: u64) -> u64 {
        self.all_gather(f64::from_bits(value)).iter().map(|v| v.to_bits()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Side;
    use crate::transport::tag;

    #[test]
    fn ring_exchange() {
        let ranks = ThreadTransport::universe(4);
        std::thread::scope(|s| {
            for t in ranks {
                s.spawn(move || {
                    let me = t.rank();
                    let right = (me + 1) % 4;
                    let left = (me + 3) % 4;
                    let out = vec![Outgoing { to: right, tag: tag(me as usize, 0, Side::Upper), data: vec![me as f64; 3] }];
                    let mut inc = vec![Incoming::new(left, tag(left as usize, 0, Side::Upper), 3)];
                    t.exchange(out, &mut inc);
                    assert_eq!(inc[0].data, vec![left as f64; 3]);
                    assert_eq!(t.sum_u64(me as u64 + 1), 10);
                    assert_eq!(t.sum_f64(0.5), 2.0);
                    assert!(t.any(me == 2));
                    assert!(!t.any(false));
                });
            }
        });
    }

    #[test]
    #[should_panic]
    fn short_buffer_is_fatal() {
        let t = ThreadTransport::single();
        let out = vec![Outgoing { to: 0, tag: 7, data: vec![1.0; 2] }];
        let mut inc = vec![Incoming::new(0, 7, 3)];
        t.exchange(out, &mut inc);
    }
}
