//! Graph topology: loading and validating the symmetric edge list.

use core::fmt;
use std::collections::BTreeSet;
use std::io::BufRead;

use error_stack::{Report, ResultExt};
use pddfs_core::Rank;

/// Undirected adjacency for a group of ranks `0..nodes()`.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Topology {
    neighbors: Vec<BTreeSet<Rank>>,
}

/// Fault in the edge-list input. Fatal at bootstrap: no topology is handed
/// to the group.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum TopologyError {
    Io,
    /// A line was not two whitespace-separated ranks.
    Malformed { line: usize },
    /// A rank fell outside `[0, N)` for the inferred node count N.
    RankOutOfRange { rank: u32, nodes: usize },
    /// An edge connected a rank to itself.
    SelfLoop { rank: u32 },
    /// A directed copy had no mirror; the graph is not undirected.
    Asymmetric { source: Rank, dest: Rank },
    /// No edges at all: the node count cannot be inferred.
    Empty,
}

impl fmt::Display for TopologyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TopologyError::Io => f.write_str("failed to read the edge list"),
            TopologyError::Malformed { line } => {
                write!(f, "line {line} is not an `<source> <dest>` edge")
            }
            TopologyError::RankOutOfRange { rank, nodes } => {
                write!(f, "rank {rank} is outside [0, {nodes})")
            }
            TopologyError::SelfLoop { rank } => write!(f, "self-loop at rank {rank}"),
            TopologyError::Asymmetric { source, dest } => {
                write!(f, "edge {source} -> {dest} has no mirror {dest} -> {source}")
            }
            TopologyError::Empty => f.write_str("edge list is empty"),
        }
    }
}

impl core::error::Error for TopologyError {}

impl Topology {
    /// Loads a topology from `u v` edge lines, one directed copy per line,
    /// each undirected edge supplied in both directions.
    ///
    /// The node count is the number of distinct source ranks; every rank
    /// must then fall in `[0, N)`. Blank lines are skipped.
    ///
    /// # Errors
    ///
    /// Any [`TopologyError`]; the report carries the offending line.
    pub fn from_edge_list(reader: impl BufRead) -> Result<Self, Report<TopologyError>> {
        let mut edges = Vec::new();
        let mut sources = BTreeSet::new();

        for (index, line) in reader.lines().enumerate() {
            let line = line.change_context(TopologyError::Io)?;
            let line_no = index + 1;
            if line.trim().is_empty() {
                continue;
            }
            let (source, dest) = parse_edge(&line)
                .ok_or_else(|| Report::new(TopologyError::Malformed { line: line_no }))
                .attach_printable_lazy(|| format!("line {line_no}: {line:?}"))?;
            if source == dest {
                return Err(Report::new(TopologyError::SelfLoop { rank: source.0 })
                    .attach_printable(format!("line {line_no}: {line:?}")));
            }
            sources.insert(source);
            edges.push((source, dest, line_no));
        }

        if edges.is_empty() {
            return Err(Report::new(TopologyError::Empty));
        }

        let nodes = sources.len();
        let mut neighbors = vec![BTreeSet::new(); nodes];
        for &(source, dest, line_no) in &edges {
            for rank in [source, dest] {
                if rank.index() >= nodes {
                    return Err(Report::new(TopologyError::RankOutOfRange {
                        rank: rank.0,
                        nodes,
                    })
                    .attach_printable(format!("line {line_no}")));
                }
            }
            neighbors[source.index()].insert(dest);
        }

        let topology = Self { neighbors };
        topology.check_symmetry()?;
        Ok(topology)
    }

    /// Builds a topology from undirected pairs over ranks `0..nodes`.
    /// Both directed copies of every pair are inserted.
    ///
    /// # Errors
    ///
    /// [`TopologyError::Empty`] for zero nodes, [`TopologyError::SelfLoop`]
    /// and [`TopologyError::RankOutOfRange`] for invalid pairs.
    pub fn from_pairs(nodes: usize, pairs: &[(u32, u32)]) -> Result<Self, Report<TopologyError>> {
        if nodes == 0 {
            return Err(Report::new(TopologyError::Empty));
        }
        let mut neighbors = vec![BTreeSet::new(); nodes];
        for &(a, b) in pairs {
            if a == b {
                return Err(Report::new(TopologyError::SelfLoop { rank: a }));
            }
            for rank in [a, b] {
                if Rank(rank).index() >= nodes {
                    return Err(Report::new(TopologyError::RankOutOfRange { rank, nodes }));
                }
            }
            neighbors[Rank(a).index()].insert(Rank(b));
            neighbors[Rank(b).index()].insert(Rank(a));
        }
        Ok(Self { neighbors })
    }

    #[must_use]
    pub fn nodes(&self) -> usize {
        self.neighbors.len()
    }

    /// All ranks of the group in ascending order.
    #[allow(clippy::cast_possible_truncation)] // the rank space is u32 by construction
    #[must_use]
    pub fn ranks(&self) -> impl Iterator<Item = Rank> + '_ {
        (0..self.neighbors.len() as u32).map(Rank)
    }

    /// Neighbors of `rank`.
    ///
    /// # Panics
    ///
    /// Panics if `rank` is not part of this topology.
    #[must_use]
    pub fn neighbors(&self, rank: Rank) -> &BTreeSet<Rank> {
        &self.neighbors[rank.index()]
    }

    fn check_symmetry(&self) -> Result<(), Report<TopologyError>> {
        for (source, adjacent) in self.ranks().zip(&self.neighbors) {
            for &dest in adjacent {
                if !self.neighbors[dest.index()].contains(&source) {
                    return Err(Report::new(TopologyError::Asymmetric { source, dest }));
                }
            }
        }
        Ok(())
    }
}

fn parse_edge(line: &str) -> Option<(Rank, Rank)> {
    let mut parts = line.split_whitespace();
    let source = parts.next()?.parse().ok()?;
    let dest = parts.next()?.parse().ok()?;
    if parts.next().is_some() {
        return None;
    }
    Some((Rank(source), Rank(dest)))
}
