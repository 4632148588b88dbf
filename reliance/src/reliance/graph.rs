//! Directed graphs over rule indices.

use std::{fs::File, io::Write, path::Path};

use petgraph::{Directed, Graph};

use crate::error::ExportError;

/// Directed graph given as an adjacency list.
///
/// Nodes are the numbers `0..node_count()`; self loops are allowed.
/// The number of nodes is fixed on construction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SimpleGraph {
    edges: Vec<Vec<usize>>,
}

impl SimpleGraph {
    /// Create a new [`SimpleGraph`] without edges.
    pub fn new(node_count: usize) -> Self {
        Self {
            edges: vec![Vec::new(); node_count],
        }
    }

    /// Create a graph from its adjacency lists.
    pub fn from_adjacency(edges: Vec<Vec<usize>>) -> Self {
        Self { edges }
    }

    /// Return the number of nodes.
    pub fn node_count(&self) -> usize {
        self.edges.len()
    }

    /// Return the number of edges.
    pub fn edge_count(&self) -> usize {
        self.edges.iter().map(Vec::len).sum()
    }

    /// Add an edge.
    ///
    /// # Panics
    /// Panics if `from` is not a node of the graph.
    pub fn add_edge(&mut self, from: usize, to: usize) {
        self.edges[from].push(to);
    }

    /// Return `true` if the graph contains the given edge.
    pub fn contains_edge(&self, from: usize, to: usize) -> bool {
        self.edges
            .get(from)
            .is_some_and(|successors| successors.contains(&to))
    }

    /// Return the successors of a node in the order their edges were added.
    pub fn successors(&self, node: usize) -> &[usize] {
        self.edges.get(node).map(Vec::as_slice).unwrap_or_default()
    }

    /// Return the adjacency lists of the graph.
    pub fn adjacency(&self) -> &[Vec<usize>] {
        &self.edges
    }

    /// Return an iterator over all edges.
    pub fn edges(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.edges
            .iter()
            .enumerate()
            .flat_map(|(from, successors)| successors.iter().map(move |&to| (from, to)))
    }

    /// Return the graph with every edge reversed.
    pub fn transpose(&self) -> Self {
        let mut result = Self::new(self.node_count());

        for (from, to) in self.edges() {
            result.add_edge(to, from);
        }

        result
    }

    /// Convert into a [`Graph`], where the weight of a node is its index.
    pub fn to_petgraph(&self) -> Graph<usize, (), Directed> {
        let mut graph = Graph::new();
        let nodes = (0..self.node_count())
            .map(|node| graph.add_node(node))
            .collect::<Vec<_>>();

        for (from, to) in self.edges() {
            graph.add_edge(nodes[from], nodes[to], ());
        }

        graph
    }

    /// Write one `from,to` row per edge.
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<(), ExportError> {
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(writer);

        for edge in self.edges() {
            writer.serialize(edge)?;
        }

        writer.flush().map_err(csv::Error::from)?;

        Ok(())
    }

    /// Save the edges of this graph as a CSV file.
    pub fn save_csv(&self, path: impl AsRef<Path>) -> Result<(), ExportError> {
        let path = path.as_ref();
        let file = File::create(path).map_err(|error| ExportError::IOWriting {
            error,
            filename: path.display().to_string(),
        })?;

        self.write_csv(file)?;
        log::info!("saved {} edges to \"{}\"", self.edge_count(), path.display());

        Ok(())
    }
}

/// Compute the union of two graphs over the same nodes together with its transpose.
pub fn combine_graphs(positive: &SimpleGraph, restraint: &SimpleGraph) -> (SimpleGraph, SimpleGraph) {
    let node_count = positive.node_count().max(restraint.node_count());
    let mut union = SimpleGraph::new(node_count);
    let mut transposed = SimpleGraph::new(node_count);

    for (from, to) in positive.edges().chain(restraint.edges()) {
        union.add_edge(from, to);
        transposed.add_edge(to, from);
    }

    (union, transposed)
}
