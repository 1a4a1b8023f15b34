//! Command-line demonstration of `split_bin` followed by `alltoallv_linear`
//! over an in-memory transport: every process prints who it ended up
//! grouped with and what it received from the rest of its group.

use std::thread;

use getopts::Options;

use procgroup::transport::SimTransport;
use procgroup::{alltoallv_linear, split_bin, ChainDescriptor, TransportRank};

struct Args {
    processes: usize,
    bins: u32,
}

fn parse_args<I: Iterator<Item = String>>(args: I) -> Result<Args, String> {
    let mut opts = Options::new();
    opts.optopt("n", "processes", "number of simulated processes", "NUM");
    opts.optopt("b", "bins", "number of bins to split into", "NUM");
    opts.optflag("h", "help", "print this help text");

    let matches = opts.parse(args).map_err(|e| e.to_string())?;
    if matches.opt_present("h") {
        print!("{}", opts.usage("usage: demo [-n NUM] [-b NUM]"));
        std::process::exit(0);
    }

    let processes = matches.opt_str("n").map(|v| v.parse()).transpose().map_err(|e: std::num::ParseIntError| e.to_string())?.unwrap_or(6);
    let bins = matches.opt_str("b").map(|v| v.parse()).transpose().map_err(|e: std::num::ParseIntError| e.to_string())?.unwrap_or(2);

    if processes == 0 {
        return Err("processes must be at least 1".to_string());
    }
    if bins == 0 {
        return Err("bins must be at least 1".to_string());
    }
    Ok(Args { processes, bins })
}

fn main() {
    let args = match parse_args(std::env::args().skip(1)) {
        Ok(args) => args,
        Err(message) => {
            eprintln!("error: {message}");
            std::process::exit(1);
        }
    };

    let ranks: Vec<TransportRank> = (0..args.processes).map(TransportRank::from).collect();
    let num_bins = args.bins;

    let split_transports = SimTransport::build(&ranks);
    let split_handles: Vec<_> = split_transports
        .into_iter()
        .enumerate()
        .map(|(i, mut transport)| {
            let ranks = ranks.clone();
            thread::spawn(move || {
                let chain_size = ranks.len();
                let left = if i == 0 { TransportRank::NONE } else { ranks[i - 1] };
                let right =
                    if i + 1 == chain_size { TransportRank::NONE } else { ranks[i + 1] };
                let input = ChainDescriptor::new((), ranks[i], left, right, i, chain_size);
                let bin = (i as u32 % num_bins) as i32;
                let out = split_bin(&mut transport, num_bins, bin, &input, None)
                    .expect("split_bin failed");
                (i, bin, out)
            })
        })
        .collect();

    let split_out: Vec<_> = split_handles.into_iter().map(|h| h.join().unwrap()).collect();

    for (i, bin, chain) in &split_out {
        if chain.is_null() {
            println!("process {i} (bin {bin}): opted out");
        } else {
            println!(
                "process {i} (bin {bin}): group of {} at chain rank {} (left={:?}, right={:?})",
                chain.chain_size(),
                chain.chain_rank(),
                chain.left(),
                chain.right()
            );
        }
    }

    // Re-run the whole group (ignoring bins) through a ring all-to-all so
    // each process reports what it received from every peer.
    let ring_transports = SimTransport::build(&ranks);
    let ring_handles: Vec<_> = ring_transports
        .into_iter()
        .enumerate()
        .map(|(i, mut transport)| {
            let ranks = ranks.clone();
            thread::spawn(move || {
                let group = ChainDescriptor::ring((), &ranks, i);
                let sendbuf = vec![i as u32; ranks.len()];
                let counts = vec![1usize; ranks.len()];
                let displs: Vec<usize> = (0..ranks.len()).collect();
                let mut recvbuf = vec![0u32; ranks.len()];
                alltoallv_linear(
                    &mut transport,
                    &sendbuf,
                    &counts,
                    &displs,
                    &mut recvbuf,
                    &counts,
                    &displs,
                    &group,
                    None,
                )
                .expect("alltoallv_linear failed");
                (i, recvbuf)
            })
        })
        .collect();

    for h in ring_handles {
        let (i, recvbuf) = h.join().unwrap();
        println!("process {i}: received from every peer: {recvbuf:?}");
    }
}
