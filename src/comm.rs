//! Point-to-point message passing between ranked workers.
//!
//! The partitioned multipliers only need four primitives: their own rank, the world
//! size, and blocking `send` / `receive` of flattened element buffers. Receivers
//! always state the exact length they expect and the rank it must come from, so no
//! length prefix travels with a message.

use std::sync::mpsc::{channel, Receiver, Sender};

use tracing::trace;

use crate::error::{MatMulError, Result};
use crate::matrix::Element;

pub trait Communicator {
    fn rank(&self) -> usize;

    fn size(&self) -> usize;

    /// Delivers `buffer` to `dest`. May return before the receiver has consumed it.
    fn send(&self, buffer: &[Element], dest: usize) -> Result<()>;

    /// Blocks until the next message from `src` arrives and copies it into `buffer`.
    ///
    /// The message must be exactly `buffer.len()` elements long.
    fn receive(&self, buffer: &mut [Element], src: usize) -> Result<()>;

    /// Returns once every rank has entered the barrier.
    ///
    /// Built from empty messages through rank 0, so a rank that has gone away
    /// surfaces as an error on its peers instead of a hang.
    fn barrier(&self) -> Result<()> {
        let (rank, size) = (self.rank(), self.size());
        if rank == 0 {
            for src in 1..size {
                self.receive(&mut [], src)?;
            }
            for dest in 1..size {
                self.send(&[], dest)?;
            }
        } else {
            self.send(&[], 0)?;
            self.receive(&mut [], 0)?;
        }
        Ok(())
    }
}

/// In-process transport: one unbounded FIFO channel per ordered pair of ranks.
///
/// Each endpoint is moved onto its own worker thread and owns nothing but its
/// channel ends, which models a process with private memory.
pub struct ChannelNetwork;

impl ChannelNetwork {
    /// Creates `size` connected endpoints, indexed by rank.
    pub fn create(size: usize) -> Vec<ChannelEndpoint> {
        // senders[src][dest] pairs with receivers[dest][src]
        let mut senders: Vec<Vec<Sender<Vec<Element>>>> = (0..size).map(|_| Vec::new()).collect();
        let mut receivers: Vec<Vec<Option<Receiver<Vec<Element>>>>> =
            (0..size).map(|_| (0..size).map(|_| None).collect()).collect();

        for (src, outgoing) in senders.iter_mut().enumerate() {
            for incoming in receivers.iter_mut() {
                let (tx, rx) = channel();
                outgoing.push(tx);
                incoming[src] = Some(rx);
            }
        }

        senders
            .into_iter()
            .zip(receivers)
            .enumerate()
            .map(|(rank, (outgoing, incoming))| ChannelEndpoint {
                rank,
                outgoing,
                incoming: incoming.into_iter().flatten().collect(),
            })
            .collect()
    }
}

pub struct ChannelEndpoint {
    rank: usize,
    outgoing: Vec<Sender<Vec<Element>>>,
    incoming: Vec<Receiver<Vec<Element>>>,
}

impl ChannelEndpoint {
    fn check_rank(&self, rank: usize) -> Result<()> {
        if rank >= self.outgoing.len() {
            return Err(MatMulError::InvalidRank {
                rank,
                size: self.outgoing.len(),
            });
        }
        Ok(())
    }
}

impl Communicator for ChannelEndpoint {
    fn rank(&self) -> usize {
        self.rank
    }

    fn size(&self) -> usize {
        self.outgoing.len()
    }

    fn send(&self, buffer: &[Element], dest: usize) -> Result<()> {
        self.check_rank(dest)?;
        trace!(rank = self.rank, dest, len = buffer.len(), "send");
        self.outgoing[dest]
            .send(buffer.to_vec())
            .map_err(|_| MatMulError::PeerDisconnected { peer: dest })
    }

    fn receive(&self, buffer: &mut [Element], src: usize) -> Result<()> {
        self.check_rank(src)?;
        let message = self.incoming[src]
            .recv()
            .map_err(|_| MatMulError::PeerDisconnected { peer: src })?;
        if message.len() != buffer.len() {
            return Err(MatMulError::LengthMismatch {
                peer: src,
                expected: buffer.len(),
                got: message.len(),
            });
        }
        buffer.copy_from_slice(&message);
        trace!(rank = self.rank, src, len = buffer.len(), "receive");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_point_to_point() {
        let mut endpoints = ChannelNetwork::create(2);
        let one = endpoints.pop().unwrap();
        let zero = endpoints.pop().unwrap();
        assert_eq!((zero.rank(), one.rank()), (0, 1));
        assert_eq!(zero.size(), 2);

        zero.send(&[1, 2, 3], 1).unwrap();
        let mut buf = [0; 3];
        one.receive(&mut buf, 0).unwrap();
        assert_eq!(buf, [1, 2, 3]);
    }

    #[test]
    fn test_messages_are_matched_by_origin() {
        let endpoints = ChannelNetwork::create(3);
        endpoints[1].send(&[10], 0).unwrap();
        endpoints[2].send(&[20], 0).unwrap();

        let mut buf = [0; 1];
        endpoints[0].receive(&mut buf, 2).unwrap();
        assert_eq!(buf, [20]);
        endpoints[0].receive(&mut buf, 1).unwrap();
        assert_eq!(buf, [10]);
    }

    #[test]
    fn test_length_mismatch_is_protocol_error() {
        let endpoints = ChannelNetwork::create(2);
        endpoints[0].send(&[1, 2], 1).unwrap();
        let mut buf = [0; 3];
        let err = endpoints[1].receive(&mut buf, 0).unwrap_err();
        assert!(matches!(
            err,
            MatMulError::LengthMismatch {
                peer: 0,
                expected: 3,
                got: 2
            }
        ));
        assert!(err.is_protocol());
    }

    #[test]
    fn test_invalid_rank_and_disconnect() {
        let mut endpoints = ChannelNetwork::create(2);
        assert!(matches!(
            endpoints[0].send(&[1], 5),
            Err(MatMulError::InvalidRank { rank: 5, size: 2 })
        ));

        let one = endpoints.pop().unwrap();
        drop(endpoints);
        let mut buf = [0; 1];
        assert!(matches!(
            one.receive(&mut buf, 0),
            Err(MatMulError::PeerDisconnected { peer: 0 })
        ));
    }

    #[test]
    fn test_barrier() {
        let endpoints = ChannelNetwork::create(4);
        thread::scope(|s| {
            for endpoint in endpoints {
                s.spawn(move || {
                    endpoint.barrier().unwrap();
                    endpoint.barrier().unwrap();
                });
            }
        });
    }
}
