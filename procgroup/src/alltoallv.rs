//! Pipelined ring all-to-all exchange over a chain with variable per-pair
//! message sizes.

use procgroup_logging::Logger;

use crate::chain::ChainDescriptor;
use crate::error::GroupError;
use crate::logging::{AllToAllRoundEvent, GroupEvent};
use crate::rank::TransportRank;
use crate::transport::{Transport, TransportPayload, GROUP_TAG};

/// Performs a variable-sized all-to-all exchange over `group` in exactly
/// `group.chain_size()` rounds.
///
/// `sendcounts`/`senddispls`/`recvcounts`/`recvdispls` are indexed by
/// *transport* rank (not chain rank), matching `sendbuf`/`recvbuf`'s own
/// layout: `sendbuf[senddispls[d]..][..sendcounts[d]]` is the slice destined
/// for the process whose transport rank is `d`.
///
/// Every round moves two data transfers (the payload) and four address
/// transfers (rotating `src`/`dst` one hop further around the ring)
/// concurrently, so that which neighbor to talk to next is itself computed
/// by the exchange rather than known in advance.
///
/// `group` must be ring-shaped (see [`ChainDescriptor::ring`]): a chain
/// descriptor whose neighbors terminate in `NONE`, as produced by
/// [`crate::split_bin`] for a non-singleton bin, will not visit every
/// ordered pair -- the rotation relies on wraparound to cover the pair a
/// process forms with itself, and the last hop in each direction, the way a
/// true ring does.
pub fn alltoallv_linear<T: Transport, P: TransportPayload>(
    transport: &mut T,
    sendbuf: &[P],
    sendcounts: &[usize],
    senddispls: &[usize],
    recvbuf: &mut [P],
    recvcounts: &[usize],
    recvdispls: &[usize],
    group: &ChainDescriptor<T::Handle>,
    logger: Option<&Logger<GroupEvent>>,
) -> Result<(), GroupError> {
    let chain_size = group.chain_size();
    if chain_size == 0 {
        return Err(GroupError::InvalidArgument(
            "alltoallv_linear requires a non-null chain".to_string(),
        ));
    }

    let own_rank = group.rank();
    let mut src = group.left();
    let mut dst = group.right();
    // Persist across rounds like the reference implementation's locals:
    // if either `src` or `dst` is NONE, the matching address receive is a
    // no-op and leaves these untouched, so the stale value carries forward.
    let mut src_next = src;
    let mut dst_next = dst;

    let mut dist = 0usize;
    while dist < chain_size {
        let mut src_next_buf = [src_next];
        let mut dst_next_buf = [dst_next];

        let mut requests = Vec::with_capacity(6);

        if let Some(s) = src.as_usize() {
            let recv_slice = &mut recvbuf[recvdispls[s]..recvdispls[s] + recvcounts[s]];
            requests.push(transport.irecv(src, GROUP_TAG, recv_slice));
        }
        if let Some(d) = dst.as_usize() {
            let send_slice = &sendbuf[senddispls[d]..senddispls[d] + sendcounts[d]];
            requests.push(transport.isend(dst, GROUP_TAG, send_slice));
        }
        requests.push(transport.irecv(src, GROUP_TAG, &mut src_next_buf));
        requests.push(transport.irecv(dst, GROUP_TAG, &mut dst_next_buf));
        requests.push(transport.isend(dst, GROUP_TAG, std::slice::from_ref(&src)));
        requests.push(transport.isend(src, GROUP_TAG, std::slice::from_ref(&dst)));

        transport.wait_all(requests)?;

        src_next = src_next_buf[0];
        dst_next = dst_next_buf[0];

        if let Some(l) = logger {
            l.log(GroupEvent::from(AllToAllRoundEvent { rank: own_rank, dist, src, dst }));
        }

        src = src_next;
        dst = dst_next;
        dist += 1;
    }

    Ok(())
}
