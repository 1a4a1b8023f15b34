//! The transport abstraction group operations are built against, plus an
//! in-memory implementation for tests and the demo binary.
//!
//! The trait is deliberately MPI-shaped: nonblocking, tagged point-to-point
//! send/receive that return request tokens, completed only by `wait_all`.
//! Only `wait_all` may block; `isend`/`irecv` merely post the operation.

use std::any::Any;
use std::collections::HashMap;
use std::sync::mpsc::{channel, Receiver, Sender};

use crate::error::GroupError;
use crate::rank::TransportRank;

/// A message tag. The group operations in this crate use a single reserved
/// tag throughout, since at most one message flows between any ordered pair
/// of processes in a given round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Tag(pub u32);

/// The tag reserved for all traffic generated by this crate's group
/// operations.
pub const GROUP_TAG: Tag = Tag(0);

/// A type that can cross the transport as the element of a send/receive
/// buffer. `Send + 'static` so it can ride in a type-erased box between
/// threads; `Clone` so an in-memory transport can copy it out of one
/// buffer and into another without taking ownership of the sender's.
pub trait TransportPayload: Clone + Send + 'static {}
impl<T: Clone + Send + 'static> TransportPayload for T {}

/// Nonblocking tagged point-to-point communication over some handle's
/// process group.
///
/// Sending to, or receiving from, [`TransportRank::NONE`] is a no-op that
/// completes successfully without touching the caller's buffer, mirroring
/// `MPI_PROC_NULL`.
pub trait Transport {
    /// The opaque handle identifying this transport's process group, shared
    /// with the chain descriptors operations are invoked over.
    type Handle: Clone;

    /// An outstanding operation, completed by a later [`Transport::wait_all`].
    /// Borrows the buffer it was posted against, so it cannot outlive it.
    type Request<'a>: 'a
    where
        Self: 'a;

    /// Posts a nonblocking receive of `buf.len()` elements from `from`.
    fn irecv<'a, T: TransportPayload>(
        &mut self,
        from: TransportRank,
        tag: Tag,
        buf: &'a mut [T],
    ) -> Self::Request<'a>;

    /// Posts a nonblocking send of `buf` to `to`.
    fn isend<'a, T: TransportPayload>(
        &mut self,
        to: TransportRank,
        tag: Tag,
        buf: &'a [T],
    ) -> Self::Request<'a>;

    /// Blocks until every request in `requests` has completed.
    fn wait_all<'a>(&mut self, requests: Vec<Self::Request<'a>>) -> Result<(), GroupError>;
}

type Envelope = Box<dyn Any + Send>;

/// An in-memory [`Transport`] connecting a fixed set of transport ranks,
/// for use in tests and the demo binary. One [`SimTransport`] handle
/// exists per participating rank; the handles are meant to be moved onto
/// separate threads (one per simulated process) and run concurrently, one
/// real OS thread per simulated process, connected by `std::sync::mpsc`.
pub struct SimTransport {
    rank: TransportRank,
    senders: HashMap<TransportRank, Sender<Envelope>>,
    receivers: HashMap<TransportRank, Receiver<Envelope>>,
}

impl SimTransport {
    /// Builds one [`SimTransport`] per entry in `ranks`, fully connected: a
    /// channel exists between every ordered pair, including a rank and
    /// itself (needed for the ring all-to-all's self-delivery case).
    pub fn build(ranks: &[TransportRank]) -> Vec<SimTransport> {
        let mut senders: HashMap<TransportRank, HashMap<TransportRank, Sender<Envelope>>> =
            ranks.iter().map(|&r| (r, HashMap::new())).collect();
        let mut receivers: HashMap<TransportRank, HashMap<TransportRank, Receiver<Envelope>>> =
            ranks.iter().map(|&r| (r, HashMap::new())).collect();

        for &src in ranks {
            for &dst in ranks {
                let (tx, rx) = channel();
                senders.get_mut(&src).unwrap().insert(dst, tx);
                receivers.get_mut(&dst).unwrap().insert(src, rx);
            }
        }

        ranks
            .iter()
            .map(|&r| SimTransport {
                rank: r,
                senders: senders.remove(&r).unwrap(),
                receivers: receivers.remove(&r).unwrap(),
            })
            .collect()
    }

    /// The transport rank of this handle.
    pub fn rank(&self) -> TransportRank {
        self.rank
    }
}

/// A deferred send or receive, run by [`SimTransport::wait_all`].
///
/// Sends never block (the underlying channel is unbounded), so `wait_all`
/// always runs every `Send` request before any `Recv` request: posting a
/// receive whose matching send is still queued elsewhere must not block
/// this process from reaching its own sends, or two processes that both
/// receive before they send would deadlock against each other.
pub enum SimRequest<'a> {
    /// Already fully described; runs a channel send when driven.
    Send(Box<dyn FnOnce(&mut SimTransport) -> Result<(), GroupError> + 'a>),
    /// Runs a blocking channel receive, then copies into the caller's
    /// buffer, when driven.
    Recv(Box<dyn FnOnce(&mut SimTransport) -> Result<(), GroupError> + 'a>),
}

impl Transport for SimTransport {
    type Handle = ();
    type Request<'a> = SimRequest<'a>;

    fn isend<'a, T: TransportPayload>(
        &mut self,
        to: TransportRank,
        _tag: Tag,
        buf: &'a [T],
    ) -> Self::Request<'a> {
        if to.is_none() {
            return SimRequest::Send(Box::new(|_| Ok(())));
        }
        let payload: Vec<T> = buf.to_vec();
        SimRequest::Send(Box::new(move |this: &mut SimTransport| {
            let sender = this.senders.get(&to).ok_or_else(|| {
                GroupError::Transport(format!("no channel from {:?} to {:?}", this.rank, to))
            })?;
            sender
                .send(Box::new(payload) as Envelope)
                .map_err(|_| GroupError::Transport(format!("peer {:?} hung up", to)))
        }))
    }

    fn irecv<'a, T: TransportPayload>(
        &mut self,
        from: TransportRank,
        _tag: Tag,
        buf: &'a mut [T],
    ) -> Self::Request<'a> {
        if from.is_none() {
            return SimRequest::Recv(Box::new(|_| Ok(())));
        }
        SimRequest::Recv(Box::new(move |this: &mut SimTransport| {
            let receiver = this.receivers.get(&from).ok_or_else(|| {
                GroupError::Transport(format!("no channel from {:?} to {:?}", from, this.rank))
            })?;
            let envelope = receiver
                .recv()
                .map_err(|_| GroupError::Transport(format!("peer {:?} hung up", from)))?;
            let data = envelope.downcast::<Vec<T>>().map_err(|_| {
                GroupError::Transport("payload type mismatch on receive".to_string())
            })?;
            if data.len() != buf.len() {
                return Err(GroupError::Transport(format!(
                    "expected {} elements from {:?}, got {}",
                    buf.len(),
                    from,
                    data.len()
                )));
            }
            buf.clone_from_slice(&data);
            Ok(())
        }))
    }

    fn wait_all<'a>(&mut self, requests: Vec<Self::Request<'a>>) -> Result<(), GroupError> {
        let (sends, recvs): (Vec<_>, Vec<_>) =
            requests.into_iter().partition(|r| matches!(r, SimRequest::Send(_)));
        for req in sends {
            if let SimRequest::Send(action) = req {
                action(self)?;
            }
        }
        for req in recvs {
            if let SimRequest::Recv(action) = req {
                action(self)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn self_send_completes_without_a_peer() {
        let mut transports = SimTransport::build(&[TransportRank::from(0usize)]);
        let mut t = transports.remove(0);
        let out = [7u32];
        let mut inp = [0u32];
        let reqs = vec![
            t.isend(t.rank(), GROUP_TAG, &out),
            t.irecv(t.rank(), GROUP_TAG, &mut inp),
        ];
        t.wait_all(reqs).unwrap();
        assert_eq!(inp, [7]);
    }

    #[test]
    fn none_send_and_recv_are_no_ops() {
        let mut transports = SimTransport::build(&[TransportRank::from(0usize)]);
        let mut t = transports.remove(0);
        let out = [1u32];
        let mut inp = [9u32];
        let reqs = vec![
            t.isend(TransportRank::NONE, GROUP_TAG, &out),
            t.irecv(TransportRank::NONE, GROUP_TAG, &mut inp),
        ];
        t.wait_all(reqs).unwrap();
        assert_eq!(inp, [9], "receive from NONE must not touch the buffer");
    }

    #[test]
    fn two_ranks_exchange_concurrently() {
        let ranks = [TransportRank::from(0usize), TransportRank::from(1usize)];
        let mut transports = SimTransport::build(&ranks);
        let mut t1 = transports.remove(1);
        let mut t0 = transports.remove(0);

        let h0 = thread::spawn(move || {
            let out = [10u32];
            let mut inp = [0u32];
            let reqs = vec![
                t0.irecv(TransportRank::from(1usize), GROUP_TAG, &mut inp),
                t0.isend(TransportRank::from(1usize), GROUP_TAG, &out),
            ];
            t0.wait_all(reqs).unwrap();
            inp[0]
        });
        let h1 = thread::spawn(move || {
            let out = [20u32];
            let mut inp = [0u32];
            let reqs = vec![
                t1.irecv(TransportRank::from(0usize), GROUP_TAG, &mut inp),
                t1.isend(TransportRank::from(0usize), GROUP_TAG, &out),
            ];
            t1.wait_all(reqs).unwrap();
            inp[0]
        });

        assert_eq!(h0.join().unwrap(), 20);
        assert_eq!(h1.join().unwrap(), 10);
    }
}
