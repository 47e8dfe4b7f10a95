//! Distributed DFS spanning-tree solver.
//!
//! Reads a symmetric edge list, hosts one task per graph node, and runs the
//! discovery protocol until the tree converges. Each node's final children
//! set is printed once the whole group is done.

use core::fmt;
use std::fs::File;
use std::io::{self, BufReader};
use std::path::PathBuf;

use clap::Parser;
use error_stack::{Report, ResultExt};
use pddfs_group::{Topology, run_group};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Compute the spanning DFS tree of an undirected connected graph by
/// distributed message passing.
#[derive(Parser, Debug)]
#[command(name = "pddfs")]
#[command(about = "Compute a spanning DFS tree of an undirected graph")]
struct Args {
    /// Edge list file (`u v` per line, each edge in both directions);
    /// defaults to standard input.
    #[arg(short, long)]
    input: Option<PathBuf>,
}

#[derive(Debug)]
enum AppError {
    Input,
    Solve,
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Input => f.write_str("failed to load the graph topology"),
            AppError::Solve => f.write_str("the group did not converge"),
        }
    }
}

impl core::error::Error for AppError {}

#[tokio::main]
async fn main() -> Result<(), Report<AppError>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let topology = match &args.input {
        Some(path) => {
            let file = File::open(path)
                .change_context(AppError::Input)
                .attach_printable_lazy(|| path.display().to_string())?;
            Topology::from_edge_list(BufReader::new(file)).change_context(AppError::Input)?
        }
        None => Topology::from_edge_list(io::stdin().lock()).change_context(AppError::Input)?,
    };
    info!(nodes = topology.nodes(), "topology loaded");

    let cancel = CancellationToken::new();
    let interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt; tearing the group down");
            interrupt.cancel();
        }
    });

    let reports = run_group(&topology, cancel)
        .await
        .change_context(AppError::Solve)?;
    for report in reports {
        println!("{report}");
    }
    Ok(())
}
