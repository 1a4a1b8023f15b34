//! A lightweight process-group library: chain-based group partitioning and
//! a pipelined ring all-to-all exchange, built over a minimal nonblocking
//! transport abstraction.
//!
//! A [`ChainDescriptor`] names a process's place in an ordered sequence of
//! peers by transport rank alone -- no global membership table, no
//! collective-wide metadata. [`split_bin`] partitions such a chain into
//! same-bin subgroups in `O(log N)` rounds via a double pointer-doubling
//! scan; [`alltoallv_linear`] then moves variable-sized data between every
//! pair of processes in such a group in exactly `N` rounds.
//!
//! # Example
//!
//! ```
//! use procgroup::{split_bin, ChainDescriptor, TransportRank};
//! use procgroup::transport::SimTransport;
//! use std::thread;
//!
//! let ranks: Vec<TransportRank> = (0..4).map(TransportRank::from).collect();
//! let bins = [0, 1, 0, 1];
//! let transports = SimTransport::build(&ranks);
//!
//! let handles: Vec<_> = transports
//!     .into_iter()
//!     .enumerate()
//!     .map(|(i, mut transport)| {
//!         let ranks = ranks.clone();
//!         let bin = bins[i];
//!         thread::spawn(move || {
//!             let chain_size = ranks.len();
//!             let left = if i == 0 { TransportRank::NONE } else { ranks[i - 1] };
//!             let right = if i + 1 == chain_size { TransportRank::NONE } else { ranks[i + 1] };
//!             let input = ChainDescriptor::new((), ranks[i], left, right, i, chain_size);
//!             split_bin(&mut transport, 2, bin, &input, None).unwrap()
//!         })
//!     })
//!     .collect();
//!
//! let out: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
//! assert_eq!(out[0].chain_size(), 2);
//! ```

mod alltoallv;
mod bin_split;
mod chain;
mod error;
mod logging;
mod rank;
pub mod transport;

pub use alltoallv::alltoallv_linear;
pub use bin_split::{split_bin, ScanCell};
pub use chain::ChainDescriptor;
pub use error::GroupError;
pub use logging::{AllToAllRoundEvent, BinSplitRoundEvent, GroupEvent};
pub use rank::TransportRank;
pub use transport::{Tag, Transport, TransportPayload, GROUP_TAG};
