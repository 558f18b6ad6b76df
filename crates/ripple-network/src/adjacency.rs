//! Id-keyed neighbour lookup over a built [`Graph`].

use std::collections::{BTreeSet, HashMap};

use ripple_types::{Graph, PersonaId};

/// Undirected neighbour lists, resolved once per graph build.
#[derive(Debug, Clone, Default)]
pub struct Adjacency {
    ids: Vec<PersonaId>,
    index: HashMap<PersonaId, usize>,
    neighbours: Vec<BTreeSet<usize>>,
}

impl Adjacency {
    /// Resolve every link of `graph` into neighbour sets. Links naming
    /// unknown nodes are ignored.
    pub fn from_graph(graph: &Graph) -> Self {
        let ids: Vec<PersonaId> = graph.nodes.iter().map(|n| n.id.clone()).collect();
        let index: HashMap<PersonaId, usize> = ids
            .iter()
            .enumerate()
            .map(|(idx, id)| (id.clone(), idx))
            .collect();
        let mut neighbours = vec![BTreeSet::new(); ids.len()];

        for link in &graph.links {
            let (Some(&a), Some(&b)) = (
                index.get(link.source.as_str()),
                index.get(link.target.as_str()),
            ) else {
                continue;
            };
            if let Some(set) = neighbours.get_mut(a) {
                set.insert(b);
            }
            if let Some(set) = neighbours.get_mut(b) {
                set.insert(a);
            }
        }

        Self {
            ids,
            index,
            neighbours,
        }
    }

    /// Node index of `id`.
    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.index.get(id).copied()
    }

    /// Neighbour ids of `id` in node order, or `None` if `id` is unknown.
    pub fn neighbours_of(&self, id: &str) -> Option<Vec<&PersonaId>> {
        let idx = self.index_of(id)?;
        let set = self.neighbours.get(idx)?;
        Some(set.iter().filter_map(|&n| self.ids.get(n)).collect())
    }

    /// Number of distinct neighbours of `id`.
    pub fn degree(&self, id: &str) -> Option<usize> {
        let idx = self.index_of(id)?;
        self.neighbours.get(idx).map(BTreeSet::len)
    }

    /// Number of nodes covered.
    pub const fn len(&self) -> usize {
        self.ids.len()
    }

    /// Whether the adjacency covers no nodes.
    pub const fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use ripple_types::{CommunityId, Link, LinkKind, LinkStyle, Node, Shape};

    use super::*;

    fn node(id: &str) -> Node {
        Node {
            id: PersonaId::from(id),
            community_id: CommunityId::from("a"),
            display_name: String::from(id),
            display_code: String::from("A-0001"),
            size: 1.0,
            shape: Shape::Circle,
            pattern_id: 1,
            pulse_rate: 0.5,
            color: String::from("#000000"),
            original_color: String::from("#000000"),
            alpha: 1.0,
            highlighted: false,
        }
    }

    fn link(a: &str, b: &str) -> Link {
        Link {
            source: PersonaId::from(a),
            target: PersonaId::from(b),
            weight: 0.2,
            kind: LinkKind::Structural,
            style: LinkStyle::Solid,
            strength: 0.4,
            alpha: 0.5,
        }
    }

    #[test]
    fn neighbours_are_undirected() {
        let graph = Graph {
            nodes: vec![node("p0"), node("p1"), node("p2")],
            links: vec![link("p0", "p1"), link("p2", "p0")],
        };
        let adjacency = Adjacency::from_graph(&graph);
        let around_p0: Vec<_> = adjacency
            .neighbours_of("p0")
            .unwrap()
            .into_iter()
            .map(PersonaId::as_str)
            .collect();
        assert_eq!(around_p0, vec!["p1", "p2"]);
        assert_eq!(adjacency.degree("p1"), Some(1));
        assert!(adjacency.neighbours_of("p9").is_none());
        assert_eq!(adjacency.len(), 3);
    }
}
