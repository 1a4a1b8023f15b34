//! Event types emitted by the group operations, for installation into a
//! [`procgroup_logging::Registry`].

use serde::{Deserialize, Serialize};

use crate::rank::TransportRank;

/// An event emitted by a group operation.
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy, Serialize, Deserialize)]
pub enum GroupEvent {
    /// One round of [`crate::bin_split::split_bin`]'s double scan.
    BinSplitRound(BinSplitRoundEvent),
    /// One round of [`crate::alltoallv::alltoallv_linear`]'s ring exchange.
    AllToAllRound(AllToAllRoundEvent),
}

/// Emitted once per round of `split_bin`, after the round's wait-all
/// completes and the scan buffers have been merged.
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy, Serialize, Deserialize)]
pub struct BinSplitRoundEvent {
    /// The transport rank of the process emitting this event.
    pub rank: TransportRank,
    /// The round number, starting at zero.
    pub round: u32,
    /// The pointer-doubling distance used this round.
    pub dist: usize,
    /// The left neighbor to be used next round.
    pub left: TransportRank,
    /// The right neighbor to be used next round.
    pub right: TransportRank,
}

/// Emitted once per round of `alltoallv_linear`, after the round's wait-all
/// completes.
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy, Serialize, Deserialize)]
pub struct AllToAllRoundEvent {
    /// The transport rank of the process emitting this event.
    pub rank: TransportRank,
    /// The round number, also the number of hops covered so far.
    pub dist: usize,
    /// The partner data was received from this round.
    pub src: TransportRank,
    /// The partner data was sent to this round.
    pub dst: TransportRank,
}

impl From<BinSplitRoundEvent> for GroupEvent {
    fn from(event: BinSplitRoundEvent) -> GroupEvent {
        GroupEvent::BinSplitRound(event)
    }
}
impl From<AllToAllRoundEvent> for GroupEvent {
    fn from(event: AllToAllRoundEvent) -> GroupEvent {
        GroupEvent::AllToAllRound(event)
    }
}
