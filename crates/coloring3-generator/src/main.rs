// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Generator binary.
//!
//! Attaches to a supervisor's shared resources, repeatedly tries a random
//! 3-coloring of the graph given on the command line, and publishes the
//! monochromatic edges as a candidate whenever the attempt fits a slot.
//!
//! ```bash
//! generator 1-2 2-3 1-3
//! ```

mod graph;

use anyhow::{Context, Result};
use clap::Parser;
use coloring3::{Edge, Generator, PublishOutcome, ResourceNames, MAX_EDGES};
use graph::Graph;

#[derive(Parser)]
#[command(name = "generator")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Searches for a 3-coloring of a graph and publishes violating edges to a supervisor")]
struct Cli {
    /// Edges in the graph, each formatted as NODE1-NODE2
    #[arg(required = true, value_name = "EDGE")]
    edges: Vec<String>,
}

fn parse_edge(raw: &str) -> Result<Edge> {
    let mut parts = raw.splitn(2, '-');
    let u = parts
        .next()
        .filter(|s| !s.is_empty())
        .with_context(|| format!("could not parse edge: {raw}"))?;
    let v = parts
        .next()
        .filter(|s| !s.is_empty())
        .with_context(|| format!("could not parse edge: {raw}"))?;
    let u: i64 = u
        .parse()
        .with_context(|| format!("no digits were found in the first node of edge: {raw}"))?;
    let v: i64 = v
        .parse()
        .with_context(|| format!("no digits were found in the second node of edge: {raw}"))?;
    Ok(Edge::new(u, v))
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let edges: Vec<Edge> = cli
        .edges
        .iter()
        .map(|raw| parse_edge(raw))
        .collect::<Result<_>>()
        .context("failed to parse edges")?;

    let graph = Graph::from_edges(&edges);
    log::info!(
        "loaded graph: {} edges, {} vertices",
        edges.len(),
        graph.vertex_count()
    );

    let names = ResourceNames::with_default_prefix();
    let generator =
        Generator::attach(&names).context("failed to attach to supervisor resources")?;

    let mut rng = rand::thread_rng();
    while !generator.should_stop() {
        let coloring = graph.random_coloring(&mut rng);
        let candidate = graph.monochromatic_edges(&coloring);

        if candidate.len() >= MAX_EDGES {
            log::debug!(
                "discarding candidate with {} edges (capacity {MAX_EDGES})",
                candidate.len()
            );
            continue;
        }

        match generator.publish(&candidate)? {
            PublishOutcome::Published => {}
            PublishOutcome::Interrupted => continue,
        }
    }

    log::info!("stop requested, exiting");
    Ok(())
}
