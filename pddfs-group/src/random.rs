//! Seeded Erdős–Rényi sampling of connected test graphs.

use core::fmt;
use std::collections::{BTreeMap, BTreeSet, VecDeque};

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

/// G(n, p) sampler: every unordered pair becomes an edge with probability
/// `p`, independently.
///
/// The protocol's behavior on disconnected inputs is undefined, so
/// [`ErdosRenyi::sample`] retries with derived seeds until the sample is
/// connected. Sampling is deterministic in `(nodes, p, seed)`.
#[derive(Clone, Debug)]
pub struct ErdosRenyi {
    nodes: u32,
    edge_probability: f64,
    seed: u64,
}

/// The sampler could not produce a usable graph.
#[derive(Clone, Debug, PartialEq)]
pub enum SampleError {
    /// `p` outside `(0, 1]`.
    InvalidProbability { p: f64 },
    /// No node to root the tree at.
    NoNodes,
    /// Every attempted sample was disconnected.
    NeverConnected { attempts: u32 },
}

impl fmt::Display for SampleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SampleError::InvalidProbability { p } => {
                write!(f, "edge probability {p} is outside (0, 1]")
            }
            SampleError::NoNodes => f.write_str("cannot sample a graph with zero nodes"),
            SampleError::NeverConnected { attempts } => {
                write!(f, "no connected sample in {attempts} attempts; raise p")
            }
        }
    }
}

impl core::error::Error for SampleError {}

impl ErdosRenyi {
    const MAX_ATTEMPTS: u32 = 64;

    #[must_use]
    pub fn new(nodes: u32, edge_probability: f64, seed: u64) -> Self {
        Self {
            nodes,
            edge_probability,
            seed,
        }
    }

    /// Samples until connected, returning the undirected edges as `(u, v)`
    /// pairs with `u < v`, sorted.
    ///
    /// # Errors
    ///
    /// [`SampleError`] for unusable parameters or when every attempt within
    /// the retry limit came out disconnected.
    pub fn sample(&self) -> Result<Vec<(u32, u32)>, SampleError> {
        if !(self.edge_probability > 0.0 && self.edge_probability <= 1.0) {
            return Err(SampleError::InvalidProbability {
                p: self.edge_probability,
            });
        }
        if self.nodes == 0 {
            return Err(SampleError::NoNodes);
        }
        for attempt in 0..Self::MAX_ATTEMPTS {
            let mut rng = SmallRng::seed_from_u64(self.seed.wrapping_add(u64::from(attempt)));
            let edges = self.sample_once(&mut rng);
            if is_connected(self.nodes, &edges) {
                return Ok(edges);
            }
            debug!(attempt, "sample disconnected; retrying with derived seed");
        }
        Err(SampleError::NeverConnected {
            attempts: Self::MAX_ATTEMPTS,
        })
    }

    fn sample_once(&self, rng: &mut SmallRng) -> Vec<(u32, u32)> {
        let mut edges = Vec::new();
        for u in 0..self.nodes {
            for v in (u + 1)..self.nodes {
                if rng.random_bool(self.edge_probability) {
                    edges.push((u, v));
                }
            }
        }
        edges
    }
}

/// Expands undirected pairs into the symmetric, source-sorted directed edge
/// list the solver consumes.
#[must_use]
pub fn symmetric_edge_list(pairs: &[(u32, u32)]) -> Vec<(u32, u32)> {
    let mut edges: Vec<_> = pairs
        .iter()
        .flat_map(|&(u, v)| [(u, v), (v, u)])
        .collect();
    edges.sort_unstable();
    edges
}

#[allow(clippy::cast_possible_truncation)] // usize is at least 32 bits on supported targets
fn is_connected(nodes: u32, edges: &[(u32, u32)]) -> bool {
    if nodes == 1 {
        return true;
    }
    let mut adjacency: BTreeMap<u32, Vec<u32>> = BTreeMap::new();
    for &(u, v) in edges {
        adjacency.entry(u).or_default().push(v);
        adjacency.entry(v).or_default().push(u);
    }

    let mut seen = BTreeSet::from([0_u32]);
    let mut frontier = VecDeque::from([0_u32]);
    while let Some(at) = frontier.pop_front() {
        for &next in adjacency.get(&at).into_iter().flatten() {
            if seen.insert(next) {
                frontier.push_back(next);
            }
        }
    }
    seen.len() == nodes as usize
}
