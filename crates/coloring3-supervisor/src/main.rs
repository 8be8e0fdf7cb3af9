// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Supervisor binary.
//!
//! Creates the shared region and named semaphores, drains candidates
//! published by generator processes, tracks the smallest one seen, and
//! reports either a proof of 3-colorability or the best edge-deletion set
//! found before the candidate limit, an interrupt, or a proof ended the run.
//!
//! ```bash
//! supervisor -n 1000 -w 1
//! ```

use anyhow::{Context, Result};
use clap::{ArgAction, Parser};
use coloring3::{Edge, ResourceNames, Supervisor, Termination};
use std::collections::BTreeMap;
use std::thread;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "supervisor")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Drains 3-coloring candidates over shared memory and reports the smallest edge-deletion set found")]
struct Cli {
    /// Stop after consuming LIMIT candidates (0 or omitted = unbounded)
    #[arg(short = 'n', action = ArgAction::Append, value_name = "LIMIT")]
    limit: Vec<i64>,

    /// Seconds to sleep between resource initialization and the main loop
    #[arg(short = 'w', action = ArgAction::Append, value_name = "DELAY")]
    delay: Vec<i64>,

    /// Print the best result's vertex adjacency after the summary
    #[arg(short = 'p', action = ArgAction::Count)]
    print_graph: u8,
}

struct Config {
    limit: u64,
    delay_secs: u64,
    print_graph: bool,
}

fn usage_exit(message: &str) -> ! {
    eprintln!("[supervisor] ERROR: {message}");
    eprintln!("Usage: supervisor [-n limit] [-w delay] [-p]");
    std::process::exit(1);
}

fn resolve_config(cli: Cli) -> Config {
    if cli.limit.len() > 1 {
        usage_exit("multiple -n parameters were passed");
    }
    if cli.delay.len() > 1 {
        usage_exit("multiple -w parameters were passed");
    }
    if cli.print_graph > 1 {
        usage_exit("multiple -p parameters were passed");
    }

    let limit = match cli.limit.first() {
        Some(v) if *v < 0 => usage_exit("limit cannot be smaller than 0"),
        Some(v) => *v as u64,
        None => 0,
    };
    let delay_secs = match cli.delay.first() {
        Some(v) if *v < 0 => usage_exit("delay cannot be smaller than 0"),
        Some(v) => *v as u64,
        None => 0,
    };

    Config {
        limit,
        delay_secs,
        print_graph: cli.print_graph == 1,
    }
}

fn main() -> Result<()> {
    env_logger::init();
    let config = resolve_config(Cli::parse());

    let names = ResourceNames::with_default_prefix();
    let supervisor =
        Supervisor::create(names).context("failed to initialize shared resources")?;

    if config.delay_secs > 0 {
        log::info!("sleeping {}s before entering the main loop", config.delay_secs);
        thread::sleep(Duration::from_secs(config.delay_secs));
    }

    let result = supervisor
        .drain(config.limit)
        .context("error while draining candidates")?;
    supervisor.shutdown();

    log::info!(
        "terminated: {:?} after {} candidates",
        result.termination,
        result.candidates_read
    );

    if result.termination == Termination::ProofFound {
        println!("The graph is 3-colorable!");
    } else {
        let best_len = result.best.as_ref().map_or(0, Vec::len);
        println!(
            "The graph might not be 3-colorable, best solution removes {best_len} edges."
        );
        if config.print_graph {
            if let Some(best) = &result.best {
                print_adjacency(best);
            }
        }
    }

    Ok(())
}

/// `-p`: print the removed edges' vertex adjacency, using only data the
/// supervisor already holds from the drain result, no external graph
/// collaborator needed.
fn print_adjacency(edges: &[Edge]) {
    let mut adjacency: BTreeMap<i64, Vec<i64>> = BTreeMap::new();
    for edge in edges {
        adjacency.entry(edge.u).or_default().push(edge.v);
        adjacency.entry(edge.v).or_default().push(edge.u);
    }
    println!("Removed-edge adjacency:");
    for (vertex, neighbors) in adjacency {
        println!("  {vertex}: {neighbors:?}");
    }
}
