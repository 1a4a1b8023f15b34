//! Partitioning a chain into same-bin subgroups in O(log N) rounds.

use procgroup_logging::Logger;

use crate::chain::ChainDescriptor;
use crate::error::GroupError;
use crate::logging::{BinSplitRoundEvent, GroupEvent};
use crate::rank::TransportRank;
use crate::transport::{Transport, GROUP_TAG};

/// One bin's running tally in the double scan: how many same-bin
/// processes have been seen in this direction, and the transport rank of
/// the nearest one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
pub struct ScanCell {
    /// Number of same-bin processes seen so far in this direction.
    pub count: u64,
    /// The transport rank of the nearest same-bin process seen so far in
    /// this direction, or `NONE` if none has been seen yet. Sticky: once
    /// set, never overwritten by a later, farther discovery.
    pub closest: TransportRank,
}

impl ScanCell {
    fn mine(rank: TransportRank) -> Self {
        ScanCell { count: 1, closest: rank }
    }
}

/// The message exchanged between neighbors each round: one [`ScanCell`]
/// per bin, plus the transport rank to use as the next hop in this
/// direction (pointer-doubling).
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
struct ScanMessage {
    cells: Vec<ScanCell>,
    next_hop: TransportRank,
}

impl ScanMessage {
    fn blank(num_bins: usize) -> Self {
        ScanMessage { cells: vec![ScanCell::default(); num_bins], next_hop: TransportRank::NONE }
    }
}

/// Splits `input` into up to `num_bins` subgroups: a process is grouped
/// with every other process that names the same `my_bin`. Processes that
/// pass a negative `my_bin` receive the null chain back, but still
/// participate in the scan so that others' pointer-doubling hops resolve
/// correctly.
///
/// Runs in `O(num_bins * log(input.chain_size()))` time: `ceil(log2(N))`
/// rounds, each moving `O(num_bins)` data in each direction.
pub fn split_bin<T: Transport>(
    transport: &mut T,
    num_bins: u32,
    my_bin: i32,
    input: &ChainDescriptor<T::Handle>,
    logger: Option<&Logger<GroupEvent>>,
) -> Result<ChainDescriptor<T::Handle>, GroupError> {
    if num_bins == 0 {
        return Err(GroupError::InvalidArgument("num_bins must be at least 1".to_string()));
    }
    if my_bin >= num_bins as i32 {
        return Err(GroupError::InvalidArgument(format!(
            "my_bin ({my_bin}) must be less than num_bins ({num_bins})"
        )));
    }
    if input.is_null() {
        return Err(GroupError::InvalidArgument(
            "split_bin requires a non-null input chain".to_string(),
        ));
    }

    let num_bins = num_bins as usize;
    let handle = input.handle().clone();
    let own_rank = input.rank();
    let chain_rank = input.chain_rank();
    let chain_size = input.chain_size();

    let mut right_going = vec![ScanCell::default(); num_bins];
    let mut left_going = vec![ScanCell::default(); num_bins];
    if my_bin >= 0 {
        let bin = my_bin as usize;
        right_going[bin] = ScanCell::mine(own_rank);
        left_going[bin] = ScanCell::mine(own_rank);
    }

    let mut left_rank = input.left();
    let mut right_rank = input.right();
    let mut my_left = TransportRank::NONE;
    let mut my_right = TransportRank::NONE;

    let mut dist = 1usize;
    let mut round = 0u32;
    while dist < chain_size {
        let to_right = ScanMessage { cells: right_going.clone(), next_hop: left_rank };
        let to_left = ScanMessage { cells: left_going.clone(), next_hop: right_rank };

        let mut from_left = [ScanMessage::blank(num_bins)];
        let mut from_right = [ScanMessage::blank(num_bins)];

        let requests = vec![
            transport.irecv(left_rank, GROUP_TAG, &mut from_left),
            transport.irecv(right_rank, GROUP_TAG, &mut from_right),
            transport.isend(right_rank, GROUP_TAG, std::slice::from_ref(&to_right)),
            transport.isend(left_rank, GROUP_TAG, std::slice::from_ref(&to_left)),
        ];
        transport.wait_all(requests)?;

        let [from_left] = from_left;
        let [from_right] = from_right;

        if my_bin >= 0 {
            let bin = my_bin as usize;
            if my_left.is_none() {
                my_left = from_left.cells[bin].closest;
            }
            if my_right.is_none() {
                my_right = from_right.cells[bin].closest;
            }
        }

        for bin in 0..num_bins {
            if chain_rank >= dist {
                right_going[bin].count += from_left.cells[bin].count;
            }
            if right_going[bin].closest.is_none() {
                right_going[bin].closest = from_left.cells[bin].closest;
            }
        }
        for bin in 0..num_bins {
            if chain_rank + dist < chain_size {
                left_going[bin].count += from_right.cells[bin].count;
            }
            if left_going[bin].closest.is_none() {
                left_going[bin].closest = from_right.cells[bin].closest;
            }
        }

        left_rank = from_left.next_hop;
        right_rank = from_right.next_hop;

        if let Some(l) = logger {
            l.log(GroupEvent::from(BinSplitRoundEvent {
                rank: own_rank,
                round,
                dist,
                left: left_rank,
                right: right_rank,
            }));
        }

        dist <<= 1;
        round += 1;
    }

    // A singleton input chain has no neighbors to scan with; give it a
    // self-loop instead so any same-bin ring built from it (necessarily
    // of size one) still has well-defined neighbors for ring operations
    // like `alltoallv_linear`.
    if chain_size == 1 {
        my_left = own_rank;
        my_right = own_rank;
    }

    if my_bin >= 0 {
        let bin = my_bin as usize;
        let count_left = (right_going[bin].count - 1) as usize;
        let count_right = (left_going[bin].count - 1) as usize;
        Ok(ChainDescriptor::new(
            handle,
            own_rank,
            my_left,
            my_right,
            count_left,
            count_left + count_right + 1,
        ))
    } else {
        Ok(ChainDescriptor::null(handle, own_rank))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::SimTransport;
    use std::thread;

    fn run_split(
        ranks: &[TransportRank],
        bins: &[i32],
        num_bins: u32,
    ) -> Vec<ChainDescriptor<()>> {
        let transports = SimTransport::build(ranks);
        let handles: Vec<_> = transports
            .into_iter()
            .zip(ranks.iter().copied())
            .zip(bins.iter().copied())
            .enumerate()
            .map(|(i, ((mut transport, rank), bin))| {
                let chain_size = ranks.len();
                let left = if i == 0 { TransportRank::NONE } else { ranks[i - 1] };
                let right = if i + 1 == chain_size { TransportRank::NONE } else { ranks[i + 1] };
                let input = ChainDescriptor::new((), rank, left, right, i, chain_size);
                thread::spawn(move || split_bin(&mut transport, num_bins, bin, &input, None))
            })
            .collect();

        handles.into_iter().map(|h| h.join().unwrap().unwrap()).collect()
    }

    fn ranks_of(n: usize) -> Vec<TransportRank> {
        (0..n).map(TransportRank::from).collect()
    }

    #[test]
    fn single_bin_keeps_everyone_together() {
        let ranks = ranks_of(5);
        let bins = vec![0; 5];
        let out = run_split(&ranks, &bins, 1);
        for (i, chain) in out.iter().enumerate() {
            assert_eq!(chain.chain_size(), 5);
            assert_eq!(chain.chain_rank(), i);
        }
        assert_eq!(out[0].left(), TransportRank::NONE);
        assert_eq!(out[4].right(), TransportRank::NONE);
        for i in 1..4 {
            assert_eq!(out[i].left(), ranks[i - 1]);
            assert_eq!(out[i].right(), ranks[i + 1]);
        }
    }

    #[test]
    fn two_bins_alternate_partition_into_interleaved_chains() {
        let ranks = ranks_of(6);
        let bins = vec![0, 1, 0, 1, 0, 1];
        let out = run_split(&ranks, &bins, 2);

        // Even ranks form one chain of 3, odd ranks another chain of 3.
        let evens: Vec<_> = [0, 2, 4].iter().map(|&i| &out[i]).collect();
        let odds: Vec<_> = [1, 3, 5].iter().map(|&i| &out[i]).collect();
        for chain in evens.iter().chain(odds.iter()) {
            assert_eq!(chain.chain_size(), 3);
        }
        assert_eq!(evens[0].chain_rank(), 0);
        assert_eq!(evens[1].chain_rank(), 1);
        assert_eq!(evens[2].chain_rank(), 2);
        assert_eq!(evens[0].right(), ranks[2]);
        assert_eq!(evens[1].left(), ranks[0]);
        assert_eq!(evens[1].right(), ranks[4]);
        assert_eq!(evens[2].left(), ranks[2]);
    }

    #[test]
    fn opted_out_processes_get_the_null_chain_but_still_forward() {
        let ranks = ranks_of(4);
        let bins = vec![0, -1, 0, -1];
        let out = run_split(&ranks, &bins, 1);

        assert!(out[1].is_null());
        assert!(out[3].is_null());
        assert_eq!(out[0].chain_size(), 2);
        assert_eq!(out[2].chain_size(), 2);
        assert_eq!(out[0].right(), ranks[2]);
        assert_eq!(out[2].left(), ranks[0]);
    }

    #[test]
    fn singleton_input_rings_back_to_itself() {
        let ranks = ranks_of(1);
        let bins = vec![0];
        let out = run_split(&ranks, &bins, 1);
        assert_eq!(out[0].chain_size(), 1);
        assert_eq!(out[0].left(), ranks[0]);
        assert_eq!(out[0].right(), ranks[0]);
    }

    #[test]
    fn round_count_matches_ceil_log2() {
        use procgroup_logging::{Logger, Registry};
        use std::sync::atomic::{AtomicUsize, Ordering};
        use std::sync::Arc;
        use std::time::Instant;

        fn counting_logger(count: Arc<AtomicUsize>) -> Logger<GroupEvent> {
            let mut registry = Registry::new(Instant::now());
            registry.insert::<GroupEvent>(
                "bin_split".to_string(),
                Box::new(move |_now, events| {
                    count.fetch_add(events.len(), Ordering::SeqCst);
                }),
            );
            registry.get::<GroupEvent>("bin_split").unwrap()
        }

        let ranks = ranks_of(5);
        let transports = SimTransport::build(&ranks);

        let handles: Vec<_> = transports
            .into_iter()
            .enumerate()
            .map(|(i, mut transport)| {
                let chain_size = ranks.len();
                let left = if i == 0 { TransportRank::NONE } else { ranks[i - 1] };
                let right = if i + 1 == chain_size { TransportRank::NONE } else { ranks[i + 1] };
                let input = ChainDescriptor::new((), ranks[i], left, right, i, chain_size);
                let count = Arc::new(AtomicUsize::new(0));
                let count_for_logger = count.clone();
                thread::spawn(move || {
                    // `Logger` buffers through an `Rc`, so it must be built
                    // and used on the same thread that runs `split_bin`.
                    let logger = counting_logger(count_for_logger);
                    split_bin(&mut transport, 1, 0, &input, Some(&logger)).unwrap();
                    logger.flush();
                    count.load(Ordering::SeqCst)
                })
            })
            .collect();

        // ceil(log2(5)) == 3 rounds for every participant.
        for h in handles {
            assert_eq!(h.join().unwrap(), 3);
        }
    }
}
