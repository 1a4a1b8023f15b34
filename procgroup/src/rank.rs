//! Transport-rank type: a process's index in the underlying transport context.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A process's index within the underlying transport context, distinct from
/// its index within any one chain (`chain_rank`).
///
/// `TransportRank::NONE` is the sentinel used throughout this crate for "no
/// such neighbor" (an absent left or right link, or an address not yet
/// discovered by a scan).
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TransportRank(i32);

impl TransportRank {
    /// The sentinel denoting the absence of a neighbor.
    pub const NONE: TransportRank = TransportRank(-1);

    /// Wraps a transport-rank value. Negative values other than `-1` are not
    /// meaningful but are not rejected here; callers that accept untrusted
    /// ranks should validate at the boundary.
    #[inline]
    pub fn new(rank: i32) -> Self {
        TransportRank(rank)
    }

    /// `true` for the `NONE` sentinel.
    #[inline]
    pub fn is_none(self) -> bool {
        self == Self::NONE
    }

    /// The rank as a `usize` index, or `None` for the `NONE` sentinel.
    #[inline]
    pub fn as_usize(self) -> Option<usize> {
        if self.is_none() {
            None
        } else {
            Some(self.0 as usize)
        }
    }

    /// The raw signed rank value, with `-1` representing `NONE`.
    #[inline]
    pub fn raw(self) -> i32 {
        self.0
    }
}

impl Default for TransportRank {
    fn default() -> Self {
        TransportRank::NONE
    }
}

impl From<i32> for TransportRank {
    fn from(rank: i32) -> Self {
        TransportRank(rank)
    }
}

impl From<usize> for TransportRank {
    fn from(rank: usize) -> Self {
        TransportRank(rank as i32)
    }
}

impl fmt::Debug for TransportRank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_none() {
            write!(f, "NONE")
        } else {
            write!(f, "{}", self.0)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn none_round_trips() {
        assert!(TransportRank::NONE.is_none());
        assert_eq!(TransportRank::NONE.as_usize(), None);
        assert_eq!(TransportRank::default(), TransportRank::NONE);
    }

    #[test]
    fn real_ranks_are_not_none() {
        let rank = TransportRank::from(3usize);
        assert!(!rank.is_none());
        assert_eq!(rank.as_usize(), Some(3));
        assert_eq!(rank.raw(), 3);
    }
}
