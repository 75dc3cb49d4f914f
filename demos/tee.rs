//! Tee - Copies stdin to stdout and to every file named on the command line
//!
//! Run with: cargo run --example tee -- [--async] out1.txt [out2.txt ...]
//!
//! This example demonstrates:
//! - `make_pump` draining a reader on a background thread
//! - Mixing a synchronous destination (stdout) with file destinations
//! - Waiting for the pump to finish with `Plumbing::join`
//!
//! ```text
//!   stdin ──► [pull-inlet thread] ──► Plumbing ──┬──► stdout
//!                                                ├──► out1.txt
//!                                                └──► out2.txt
//! ```
//!
//! Logs go to stderr; set `RUST_LOG=plumbing_rs=debug` to watch endpoints
//! come and go.

use std::fs::File;
use std::io::BufWriter;

use plumbing_rs::{make_pump, Destination, OutletOptions};

fn print_usage() {
    eprintln!("Usage: tee [--async] [FILE ...]");
    eprintln!();
    eprintln!("  --async   write files from their own threads");
    eprintln!();
    eprintln!("Examples:");
    eprintln!("  echo hi | tee a.txt b.txt");
    eprintln!("  cat big.log | tee --async copy.log > /dev/null");
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = std::env::args().skip(1).collect();

    if args.iter().any(|a| a == "--help" || a == "-h") {
        print_usage();
        return Ok(());
    }

    // Initialize logging; stdout carries the data
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("plumbing_rs=warn".parse()?),
        )
        .with_writer(std::io::stderr)
        .init();

    let asynchronous = args.iter().any(|a| a == "--async");
    let file_options = OutletOptions::new()
        .close_on_eof(true)
        .asynchronous(asynchronous);

    let mut destinations = vec![Destination::new(std::io::stdout(), OutletOptions::new())];
    for path in args.iter().filter(|a| !a.starts_with("--")) {
        let file = File::create(path)?;
        destinations.push(Destination::new(BufWriter::new(file), file_options));
    }

    let plumbing = make_pump([std::io::stdin()], destinations)?;
    plumbing.join();

    let stats = plumbing.stats();
    tracing::info!(
        chunks = stats.chunks_broadcast,
        bytes = stats.bytes_broadcast,
        "Done"
    );

    Ok(())
}
