//! Chain descriptors: an ordered sequence of processes linked by left/right
//! neighbor transport ranks.

use crate::rank::TransportRank;

/// An ordered sequence of processes linked only by left/right neighbor
/// transport ranks.
///
/// `H` is an opaque transport handle (a communicator, endpoint set, or
/// similar) that every operation on the chain threads through unexamined;
/// this crate never inspects it.
///
/// A non-null chain (`chain_size() > 0`) satisfies:
/// - `NONE` appears on the left iff `chain_rank() == 0`.
/// - `NONE` appears on the right iff `chain_rank() == chain_size() - 1`.
/// - A singleton chain (`chain_size() == 1`) has both neighbors `NONE`,
///   *except* when the descriptor is deliberately built to represent a ring
///   (see [`ChainDescriptor::ring`] and the note on [`crate::bin_split`]'s
///   singleton handling), in which case both neighbors equal its own rank.
#[derive(Clone, Debug)]
pub struct ChainDescriptor<H> {
    handle: H,
    rank: TransportRank,
    left: TransportRank,
    right: TransportRank,
    chain_rank: usize,
    chain_size: usize,
}

impl<H: Clone> ChainDescriptor<H> {
    /// Builds a chain descriptor, checking the left/right-at-the-ends
    /// invariant in debug builds.
    pub fn new(
        handle: H,
        rank: TransportRank,
        left: TransportRank,
        right: TransportRank,
        chain_rank: usize,
        chain_size: usize,
    ) -> Self {
        debug_assert!(chain_size > 0, "use ChainDescriptor::null for an empty chain");
        debug_assert!(chain_rank < chain_size, "chain_rank must be < chain_size");
        debug_assert!(
            (chain_rank == 0) == left.is_none() || chain_size == 1,
            "left neighbor must be NONE iff chain_rank == 0 (singleton rings excepted)"
        );
        debug_assert!(
            (chain_rank == chain_size - 1) == right.is_none() || chain_size == 1,
            "right neighbor must be NONE iff chain_rank == chain_size - 1 (singleton rings excepted)"
        );
        ChainDescriptor { handle, rank, left, right, chain_rank, chain_size }
    }

    /// The null chain: a process that belongs to no group. `chain_size()` is
    /// `0` and neither `left()` nor `right()` are meaningful.
    pub fn null(handle: H, rank: TransportRank) -> Self {
        ChainDescriptor {
            handle,
            rank,
            left: TransportRank::NONE,
            right: TransportRank::NONE,
            chain_rank: 0,
            chain_size: 0,
        }
    }

    /// Builds a ring-shaped descriptor over `members`, where `members[i]` is
    /// the transport rank of the process at chain rank `i`. The descriptor
    /// for chain rank `0` links left to `members[members.len() - 1]` and the
    /// descriptor for the last chain rank links right to `members[0]`.
    ///
    /// This is the convention [`crate::alltoallv_linear`] expects of its
    /// `group` argument: a descriptor whose neighbors wrap around, so that
    /// every ordered pair of members -- including a process paired with
    /// itself -- is visited once the ring has rotated all the way around.
    /// [`crate::split_bin`] does not produce descriptors like this (its
    /// output chains terminate in `NONE`, except for singleton bins, which
    /// it deliberately rings for the same reason).
    pub fn ring(handle: H, members: &[TransportRank], my_index: usize) -> Self
    where
        H: Clone,
    {
        let chain_size = members.len();
        assert!(chain_size > 0, "a ring needs at least one member");
        assert!(my_index < chain_size, "my_index must be < members.len()");
        let left = members[(my_index + chain_size - 1) % chain_size];
        let right = members[(my_index + 1) % chain_size];
        ChainDescriptor {
            handle,
            rank: members[my_index],
            left,
            right,
            chain_rank: my_index,
            chain_size,
        }
    }

    /// `true` if this process does not belong to the group (`chain_size() == 0`).
    #[inline]
    pub fn is_null(&self) -> bool {
        self.chain_size == 0
    }

    /// The opaque transport handle threaded through this chain.
    #[inline]
    pub fn handle(&self) -> &H {
        &self.handle
    }

    /// This process's transport rank.
    #[inline]
    pub fn rank(&self) -> TransportRank {
        self.rank
    }

    /// The transport rank of the left neighbor, or `NONE` at the head.
    #[inline]
    pub fn left(&self) -> TransportRank {
        self.left
    }

    /// The transport rank of the right neighbor, or `NONE` at the tail.
    #[inline]
    pub fn right(&self) -> TransportRank {
        self.right
    }

    /// This process's position within the chain.
    #[inline]
    pub fn chain_rank(&self) -> usize {
        self.chain_rank
    }

    /// The number of processes in the chain (`0` for the null chain).
    #[inline]
    pub fn chain_size(&self) -> usize {
        self.chain_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_chain_has_no_members() {
        let chain = ChainDescriptor::null((), TransportRank::from(4usize));
        assert!(chain.is_null());
        assert_eq!(chain.chain_size(), 0);
    }

    #[test]
    fn middle_of_chain_has_two_neighbors() {
        let chain = ChainDescriptor::new(
            (),
            TransportRank::from(5usize),
            TransportRank::from(4usize),
            TransportRank::from(6usize),
            1,
            3,
        );
        assert!(!chain.is_null());
        assert_eq!(chain.left(), TransportRank::from(4usize));
        assert_eq!(chain.right(), TransportRank::from(6usize));
    }

    #[test]
    fn ring_wraps_around() {
        let members: Vec<TransportRank> =
            [10, 11, 12, 13].iter().map(|&r| TransportRank::from(r)).collect();
        let head = ChainDescriptor::ring((), &members, 0);
        let tail = ChainDescriptor::ring((), &members, 3);
        assert_eq!(head.left(), TransportRank::from(13));
        assert_eq!(tail.right(), TransportRank::from(10));
    }

    #[test]
    fn singleton_ring_points_at_itself() {
        let members = [TransportRank::from(7usize)];
        let only = ChainDescriptor::ring((), &members, 0);
        assert_eq!(only.left(), TransportRank::from(7usize));
        assert_eq!(only.right(), TransportRank::from(7usize));
    }
}
