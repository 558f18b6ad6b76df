//! Connected component analysis over a built [`Graph`].
//!
//! Links are treated as undirected. Links whose endpoints are not nodes of
//! the graph are ignored.

use std::collections::HashMap;

use ripple_types::{Graph, LinkKind};
use serde::Serialize;

/// Summary of a graph's connectivity and link mix.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ComponentSummary {
    /// Number of nodes.
    pub node_count: usize,
    /// Number of links.
    pub link_count: usize,
    /// Number of structural links.
    pub structural_links: usize,
    /// Number of auxiliary links.
    pub auxiliary_links: usize,
    /// Number of connected components. Zero for an empty graph.
    pub component_count: usize,
    /// Size of the largest component.
    pub largest_component: usize,
}

impl ComponentSummary {
    /// Analyse `graph`.
    pub fn of(graph: &Graph) -> Self {
        let lookup = graph.lookup();
        let mut sets = DisjointSets::new(graph.node_count());
        for link in &graph.links {
            if let (Some(&a), Some(&b)) = (
                lookup.get(link.source.as_str()),
                lookup.get(link.target.as_str()),
            ) {
                sets.union(a, b);
            }
        }

        let mut sizes: HashMap<usize, usize> = HashMap::new();
        for idx in 0..graph.node_count() {
            let root = sets.find(idx);
            let size = sizes.entry(root).or_insert(0);
            *size = size.saturating_add(1);
        }

        let structural_links = graph.count_links(LinkKind::Structural);
        Self {
            node_count: graph.node_count(),
            link_count: graph.link_count(),
            structural_links,
            auxiliary_links: graph.link_count().saturating_sub(structural_links),
            component_count: sizes.len(),
            largest_component: sizes.values().copied().max().unwrap_or(0),
        }
    }

    /// Whether the graph forms a single component. An empty graph counts
    /// as connected.
    pub const fn is_connected(&self) -> bool {
        self.component_count <= 1
    }
}

/// Shorthand for `ComponentSummary::of(graph).is_connected()`.
pub fn is_connected(graph: &Graph) -> bool {
    ComponentSummary::of(graph).is_connected()
}

// -----------------------------------------------------------------------
// Union-find
// -----------------------------------------------------------------------

struct DisjointSets {
    parent: Vec<usize>,
    rank: Vec<u32>,
}

impl DisjointSets {
    fn new(len: usize) -> Self {
        Self {
            parent: (0..len).collect(),
            rank: vec![0; len],
        }
    }

    fn find(&mut self, start: usize) -> usize {
        let mut root = start;
        while let Some(&parent) = self.parent.get(root) {
            if parent == root {
                break;
            }
            root = parent;
        }
        // Path compression.
        let mut node = start;
        while node != root {
            let Some(slot) = self.parent.get_mut(node) else {
                break;
            };
            let next = *slot;
            *slot = root;
            node = next;
        }
        root
    }

    fn union(&mut self, a: usize, b: usize) {
        let ra = self.find(a);
        let rb = self.find(b);
        if ra == rb {
            return;
        }
        let rank_a = self.rank.get(ra).copied().unwrap_or(0);
        let rank_b = self.rank.get(rb).copied().unwrap_or(0);
        let (child, root) = if rank_a < rank_b { (ra, rb) } else { (rb, ra) };
        if let Some(slot) = self.parent.get_mut(child) {
            *slot = root;
        }
        if rank_a == rank_b {
            let bumped = rank_a.saturating_add(1);
            if let Some(rank) = self.rank.get_mut(root) {
                *rank = bumped;
            }
        }
    }
}
