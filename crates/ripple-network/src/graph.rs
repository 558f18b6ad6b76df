//! Connected graph construction.
//!
//! [`GraphBuilder::build`] turns a persona sequence into a [`Graph`] in six
//! passes:
//!
//! 1. Filter personas by [`CommunityFilter`] and project them into nodes.
//! 2. Group nodes by community, in order of first appearance.
//! 3. Build a randomized spanning tree inside each group (structural links).
//! 4. Close a ring across the groups when there are at least two.
//! 5. Add tiered density links inside each group, plus occasional
//!    cross-community links.
//! 6. Every attempted link is checked against the existing unordered pairs
//!    and skipped once if it would duplicate one.
//!
//! Steps 3 and 4 together make the graph a single connected component
//! whenever every community passes the filter.

use std::collections::{HashMap, HashSet};

use rand::Rng;
use rand::seq::IndexedRandom;
use ripple_types::{
    CommunityDefinition, CommunityFilter, CommunityId, CountRange, Graph, Link, LinkKind,
    LinkStyle, Node, Persona, ValueRange,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::NetworkError;

/// Colour used for nodes whose community has no palette entry.
pub const FALLBACK_COLOR: &str = "#999999";

// -----------------------------------------------------------------------
// Link policy
// -----------------------------------------------------------------------

/// Fixed presentation values for one family of links.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LinkPreset {
    /// Stroke width hint.
    pub weight: f64,
    /// Spring strength hint.
    pub strength: f64,
    /// Opacity hint in `[0, 1]`.
    pub alpha: f64,
    /// Stroke style.
    pub style: LinkStyle,
}

impl LinkPreset {
    fn validate(&self, name: &str) -> Result<(), NetworkError> {
        let finite = self.weight.is_finite() && self.strength.is_finite();
        if !finite || self.weight < 0.0 || self.strength < 0.0 || !is_probability(self.alpha) {
            return Err(NetworkError::configuration(format!(
                "link preset {name} has out-of-range values"
            )));
        }
        Ok(())
    }
}

/// Every tunable constant used by [`GraphBuilder`].
///
/// All fields default individually, so a YAML section may override any
/// subset of them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkPolicy {
    /// Intra-community spanning tree links.
    #[serde(default = "default_spanning")]
    pub spanning: LinkPreset,

    /// Inter-community ring links.
    #[serde(default = "default_ring")]
    pub ring: LinkPreset,

    /// Random cross-community links added during enrichment.
    #[serde(default = "default_cross")]
    pub cross: LinkPreset,

    /// Weight range for intra-community density links.
    #[serde(default = "default_extra_weight")]
    pub extra_weight: ValueRange,

    /// Strength range for intra-community density links.
    #[serde(default = "default_extra_strength")]
    pub extra_strength: ValueRange,

    /// Opacity of intra-community density links.
    #[serde(default = "default_extra_alpha")]
    pub extra_alpha: f64,

    /// Probability that a density link is dashed rather than solid.
    #[serde(default = "default_extra_dashed_probability")]
    pub extra_dashed_probability: f64,

    /// Every `hub_every`-th node is a hub. Zero disables the tier.
    #[serde(default = "default_hub_every")]
    pub hub_every: usize,

    /// Extra link budget of hub nodes.
    #[serde(default = "default_hub_budget")]
    pub hub_budget: CountRange,

    /// Every `medium_every`-th non-hub node is medium. Zero disables the tier.
    #[serde(default = "default_medium_every")]
    pub medium_every: usize,

    /// Extra link budget of medium nodes.
    #[serde(default = "default_medium_budget")]
    pub medium_budget: CountRange,

    /// Probability that a remaining node gets a single extra link.
    #[serde(default = "default_low_link_probability")]
    pub low_link_probability: f64,

    /// Per-node probability of one cross-community link.
    #[serde(default = "default_cross_probability")]
    pub cross_probability: f64,
}

impl Default for LinkPolicy {
    fn default() -> Self {
        Self {
            spanning: default_spanning(),
            ring: default_ring(),
            cross: default_cross(),
            extra_weight: default_extra_weight(),
            extra_strength: default_extra_strength(),
            extra_alpha: default_extra_alpha(),
            extra_dashed_probability: default_extra_dashed_probability(),
            hub_every: default_hub_every(),
            hub_budget: default_hub_budget(),
            medium_every: default_medium_every(),
            medium_budget: default_medium_budget(),
            low_link_probability: default_low_link_probability(),
            cross_probability: default_cross_probability(),
        }
    }
}

impl LinkPolicy {
    /// Check that every probability, range, and preset is usable.
    ///
    /// # Errors
    ///
    /// Returns [`NetworkError::Configuration`] naming the first bad field.
    pub fn validate(&self) -> Result<(), NetworkError> {
        self.spanning.validate("spanning")?;
        self.ring.validate("ring")?;
        self.cross.validate("cross")?;

        for (name, range) in [
            ("extra_weight", self.extra_weight),
            ("extra_strength", self.extra_strength),
        ] {
            if !range.is_ordered() || range.min < 0.0 {
                return Err(NetworkError::configuration(format!(
                    "{name} must be a non-negative ordered range"
                )));
            }
        }

        for (name, range) in [
            ("hub_budget", self.hub_budget),
            ("medium_budget", self.medium_budget),
        ] {
            if !range.is_ordered() {
                return Err(NetworkError::configuration(format!(
                    "{name} range {range} is inverted"
                )));
            }
        }

        for (name, value) in [
            ("extra_alpha", self.extra_alpha),
            ("extra_dashed_probability", self.extra_dashed_probability),
            ("low_link_probability", self.low_link_probability),
            ("cross_probability", self.cross_probability),
        ] {
            if !is_probability(value) {
                return Err(NetworkError::configuration(format!(
                    "{name} must lie in [0, 1], got {value}"
                )));
            }
        }
        Ok(())
    }
}

const fn default_spanning() -> LinkPreset {
    LinkPreset {
        weight: 0.2,
        strength: 0.4,
        alpha: 0.5,
        style: LinkStyle::Solid,
    }
}

const fn default_ring() -> LinkPreset {
    LinkPreset {
        weight: 0.15,
        strength: 0.2,
        alpha: 0.3,
        style: LinkStyle::Dashed,
    }
}

const fn default_cross() -> LinkPreset {
    LinkPreset {
        weight: 0.08,
        strength: 0.15,
        alpha: 0.25,
        style: LinkStyle::Dashed,
    }
}

const fn default_extra_weight() -> ValueRange {
    ValueRange::new(0.05, 0.2)
}

const fn default_extra_strength() -> ValueRange {
    ValueRange::new(0.1, 0.4)
}

const fn default_extra_alpha() -> f64 {
    0.3
}

const fn default_extra_dashed_probability() -> f64 {
    0.2
}

const fn default_hub_every() -> usize {
    10
}

const fn default_hub_budget() -> CountRange {
    CountRange::new(4, 6)
}

const fn default_medium_every() -> usize {
    3
}

const fn default_medium_budget() -> CountRange {
    CountRange::new(2, 3)
}

const fn default_low_link_probability() -> f64 {
    0.8
}

const fn default_cross_probability() -> f64 {
    0.3
}

fn is_probability(value: f64) -> bool {
    (0.0..=1.0).contains(&value)
}

// -----------------------------------------------------------------------
// Palette
// -----------------------------------------------------------------------

/// Community id to colour mapping used when projecting nodes.
#[derive(Debug, Clone, Default)]
pub struct CommunityPalette {
    colors: HashMap<CommunityId, String>,
}

impl CommunityPalette {
    /// Build a palette from community definitions.
    pub fn from_definitions(definitions: &[CommunityDefinition]) -> Self {
        Self {
            colors: definitions
                .iter()
                .map(|d| (d.id.clone(), d.color.clone()))
                .collect(),
        }
    }

    /// Colour of `community`, or [`FALLBACK_COLOR`] when unknown.
    pub fn color_of(&self, community: &str) -> &str {
        self.colors
            .get(community)
            .map_or(FALLBACK_COLOR, String::as_str)
    }

    /// Whether `community` has an entry.
    pub fn contains(&self, community: &str) -> bool {
        self.colors.contains_key(community)
    }
}

// -----------------------------------------------------------------------
// Builder
// -----------------------------------------------------------------------

/// Builds connected graphs according to a validated [`LinkPolicy`].
#[derive(Debug, Clone, Default)]
pub struct GraphBuilder {
    policy: LinkPolicy,
}

/// Node indices of one community, in insertion order. Never empty.
struct Group {
    members: Vec<usize>,
}

/// Links under construction plus per-node neighbour sets for pair checks.
struct LinkSet<'a> {
    nodes: &'a [Node],
    links: Vec<Link>,
    neighbours: Vec<HashSet<usize>>,
}

impl<'a> LinkSet<'a> {
    fn new(nodes: &'a [Node]) -> Self {
        Self {
            nodes,
            links: Vec::new(),
            neighbours: vec![HashSet::new(); nodes.len()],
        }
    }

    /// Whether a link between `a` and `b` would be a self-pair or duplicate.
    fn blocked(&self, a: usize, b: usize) -> bool {
        a == b || self.neighbours.get(a).is_some_and(|n| n.contains(&b))
    }

    /// Add a link unless the pair is blocked. Returns whether it was added.
    fn try_add(&mut self, a: usize, b: usize, kind: LinkKind, preset: LinkPreset) -> bool {
        if self.blocked(a, b) {
            return false;
        }
        let (Some(source), Some(target)) = (self.nodes.get(a), self.nodes.get(b)) else {
            return false;
        };
        self.links.push(Link {
            source: source.id.clone(),
            target: target.id.clone(),
            weight: preset.weight,
            kind,
            style: preset.style,
            strength: preset.strength,
            alpha: preset.alpha,
        });
        if let Some(n) = self.neighbours.get_mut(a) {
            n.insert(b);
        }
        if let Some(n) = self.neighbours.get_mut(b) {
            n.insert(a);
        }
        true
    }

    fn into_links(self) -> Vec<Link> {
        self.links
    }
}

impl GraphBuilder {
    /// Create a builder after validating `policy`.
    ///
    /// # Errors
    ///
    /// Returns [`NetworkError::Configuration`] if the policy is invalid.
    pub fn new(policy: LinkPolicy) -> Result<Self, NetworkError> {
        policy.validate()?;
        Ok(Self { policy })
    }

    /// The policy this builder applies.
    pub const fn policy(&self) -> &LinkPolicy {
        &self.policy
    }

    /// Build a graph from `personas`.
    ///
    /// Personas outside `filter` are dropped; filter ids that match no
    /// persona simply select nothing. An empty result is a valid empty
    /// graph.
    pub fn build(
        &self,
        personas: &[Persona],
        filter: &CommunityFilter,
        palette: &CommunityPalette,
        rng: &mut impl Rng,
    ) -> Graph {
        let nodes: Vec<Node> = personas
            .iter()
            .filter(|p| filter.matches(&p.community_id))
            .map(|p| project(p, palette))
            .collect();

        let (groups, group_of) = group_by_community(&nodes);
        let mut links = LinkSet::new(&nodes);

        self.add_spanning_trees(&groups, &mut links, rng);
        self.add_ring(&groups, &mut links, rng);
        self.add_density(&groups, &group_of, &mut links, rng);

        let links = links.into_links();
        let graph = Graph { nodes, links };
        debug!(
            nodes = graph.node_count(),
            links = graph.link_count(),
            structural = graph.count_links(LinkKind::Structural),
            communities = groups.len(),
            "Built network graph"
        );
        graph
    }

    fn add_spanning_trees(&self, groups: &[Group], links: &mut LinkSet<'_>, rng: &mut impl Rng) {
        for group in groups {
            let Some((&root, rest)) = group.members.split_first() else {
                continue;
            };
            let mut connected = vec![root];
            let mut unconnected = rest.to_vec();
            while !unconnected.is_empty() {
                let Some(&source) = connected.choose(rng) else {
                    break;
                };
                let pick = rng.random_range(0..unconnected.len());
                let target = unconnected.swap_remove(pick);
                links.try_add(source, target, LinkKind::Structural, self.policy.spanning);
                connected.push(target);
            }
        }
    }

    fn add_ring(&self, groups: &[Group], links: &mut LinkSet<'_>, rng: &mut impl Rng) {
        if groups.len() < 2 {
            return;
        }
        for (i, group) in groups.iter().enumerate() {
            let Some(next) = i
                .saturating_add(1)
                .checked_rem(groups.len())
                .and_then(|j| groups.get(j))
            else {
                continue;
            };
            let (Some(&source), Some(&target)) =
                (group.members.choose(rng), next.members.choose(rng))
            else {
                continue;
            };
            if links.try_add(source, target, LinkKind::Auxiliary, self.policy.ring) {
                continue;
            }
            // Only reachable with two communities: the reverse ring link
            // drew the pair the forward link already used.
            let open: Vec<usize> = next
                .members
                .iter()
                .copied()
                .filter(|&candidate| !links.blocked(source, candidate))
                .collect();
            if let Some(&target) = open.choose(rng) {
                links.try_add(source, target, LinkKind::Auxiliary, self.policy.ring);
            }
        }
    }

    fn add_density(
        &self,
        groups: &[Group],
        group_of: &[usize],
        links: &mut LinkSet<'_>,
        rng: &mut impl Rng,
    ) {
        let policy = &self.policy;
        for (node, &group_idx) in group_of.iter().enumerate() {
            let Some(group) = groups.get(group_idx) else {
                continue;
            };

            let budget = self.extra_budget(node, rng);
            let limit = budget.min(group.members.len().saturating_sub(1));
            for _ in 0..limit {
                let open: Vec<usize> = group
                    .members
                    .iter()
                    .copied()
                    .filter(|&candidate| !links.blocked(node, candidate))
                    .collect();
                let Some(&target) = open.choose(rng) else {
                    break;
                };
                let style = if rng.random_bool(policy.extra_dashed_probability) {
                    LinkStyle::Dashed
                } else {
                    LinkStyle::Solid
                };
                let preset = LinkPreset {
                    weight: sample(policy.extra_weight, rng),
                    strength: sample(policy.extra_strength, rng),
                    alpha: policy.extra_alpha,
                    style,
                };
                links.try_add(node, target, LinkKind::Auxiliary, preset);
            }

            if rng.random_bool(policy.cross_probability) {
                let others: Vec<&Group> = groups
                    .iter()
                    .enumerate()
                    .filter(|&(idx, _)| idx != group_idx)
                    .map(|(_, g)| g)
                    .collect();
                if let Some(&target) = others
                    .choose(rng)
                    .and_then(|other| other.members.choose(rng))
                {
                    links.try_add(node, target, LinkKind::Auxiliary, policy.cross);
                }
            }
        }
    }

    /// Tiered extra-link budget for the node at `index`.
    fn extra_budget(&self, index: usize, rng: &mut impl Rng) -> usize {
        let policy = &self.policy;
        let budget = if index.checked_rem(policy.hub_every) == Some(0) {
            rng.random_range(policy.hub_budget.min..=policy.hub_budget.max)
        } else if index.checked_rem(policy.medium_every) == Some(0) {
            rng.random_range(policy.medium_budget.min..=policy.medium_budget.max)
        } else {
            u32::from(rng.random_bool(policy.low_link_probability))
        };
        usize::try_from(budget).unwrap_or(usize::MAX)
    }
}

fn project(persona: &Persona, palette: &CommunityPalette) -> Node {
    let color = palette.color_of(persona.community_id.as_str()).to_owned();
    Node {
        id: persona.id.clone(),
        community_id: persona.community_id.clone(),
        display_name: persona.display_name.clone(),
        display_code: persona.display_code.clone(),
        size: persona.size,
        shape: persona.shape,
        pattern_id: persona.pattern_id,
        pulse_rate: persona.pulse_rate,
        original_color: color.clone(),
        color,
        alpha: 1.0,
        highlighted: false,
    }
}

/// Partition node indices by community in order of first appearance.
///
/// Returns the groups and, for every node, the index of its group.
fn group_by_community(nodes: &[Node]) -> (Vec<Group>, Vec<usize>) {
    let mut slots: HashMap<&CommunityId, usize> = HashMap::new();
    let mut groups: Vec<Group> = Vec::new();
    let mut group_of = Vec::with_capacity(nodes.len());

    for (idx, node) in nodes.iter().enumerate() {
        let slot = *slots.entry(&node.community_id).or_insert_with(|| {
            let slot = groups.len();
            groups.push(Group {
                members: Vec::new(),
            });
            slot
        });
        if let Some(group) = groups.get_mut(slot) {
            group.members.push(idx);
        }
        group_of.push(slot);
    }
    (groups, group_of)
}

fn sample(range: ValueRange, rng: &mut impl Rng) -> f64 {
    if range.is_degenerate() {
        range.min
    } else {
        rng.random_range(range.min..range.max)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::arithmetic_side_effects)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::SmallRng;
    use ripple_types::{PersonaAttributes, PersonaId, Shape};

    use super::*;

    fn persona(index: usize, community: &str) -> Persona {
        Persona {
            id: PersonaId::for_index(index),
            community_id: CommunityId::from(community),
            display_name: format!("Persona {index}"),
            display_code: format!("XX-{index:04}"),
            size: 2.0,
            shape: Shape::Circle,
            pattern_id: 0,
            pulse_rate: 0.5,
            attributes: PersonaAttributes::default(),
        }
    }

    fn palette() -> CommunityPalette {
        CommunityPalette::from_definitions(&[
            CommunityDefinition::new("a", "A", "#111111", 1.0),
            CommunityDefinition::new("b", "B", "#222222", 1.0),
        ])
    }

    fn build(personas: &[Persona], seed: u64) -> Graph {
        let mut rng = SmallRng::seed_from_u64(seed);
        GraphBuilder::default().build(personas, &CommunityFilter::All, &palette(), &mut rng)
    }

    #[test]
    fn empty_personas_give_empty_graph() {
        let graph = build(&[], 1);
        assert!(graph.is_empty());
        assert_eq!(graph.link_count(), 0);
    }

    #[test]
    fn filter_matching_nothing_gives_empty_graph() {
        let personas = vec![persona(0, "a"), persona(1, "a")];
        let mut rng = SmallRng::seed_from_u64(1);
        let filter = CommunityFilter::only([CommunityId::from("missing")]);
        let graph = GraphBuilder::default().build(&personas, &filter, &palette(), &mut rng);
        assert!(graph.is_empty());
    }

    #[test]
    fn spanning_tree_has_group_size_minus_one_links() {
        let personas: Vec<_> = (0..12).map(|i| persona(i, "a")).collect();
        for seed in 0..20 {
            let graph = build(&personas, seed);
            assert_eq!(graph.count_links(LinkKind::Structural), 11);
        }
    }

    #[test]
    fn singleton_community_joins_ring() {
        let personas = vec![persona(0, "a"), persona(1, "b"), persona(2, "b")];
        let graph = build(&personas, 3);
        let ring = graph
            .links
            .iter()
            .filter(|l| l.kind == LinkKind::Auxiliary && l.touches("persona-0"))
            .count();
        assert!(ring >= 1);
        assert_eq!(graph.count_links(LinkKind::Structural), 1);
    }

    #[test]
    fn two_community_ring_uses_fallback_pair() {
        // Community b has one node, community a has two: the reverse ring
        // draw must pick the other node of a if it collides.
        let personas = vec![persona(0, "a"), persona(1, "a"), persona(2, "b")];
        for seed in 0..50 {
            let graph = build(&personas, seed);
            let cross = graph
                .links
                .iter()
                .filter(|l| l.touches("persona-2"))
                .count();
            assert!(cross >= 2, "seed {seed} produced {cross} cross links");
        }
    }

    #[test]
    fn unknown_palette_entry_uses_fallback_color() {
        let personas = vec![persona(0, "zz")];
        let graph = build(&personas, 1);
        let node = graph.node("persona-0").unwrap();
        assert_eq!(node.color, FALLBACK_COLOR);
        assert_eq!(node.original_color, FALLBACK_COLOR);
        assert!((node.alpha - 1.0).abs() < f64::EPSILON);
        assert!(!node.highlighted);
    }

    #[test]
    fn node_order_follows_persona_order() {
        let personas: Vec<_> = (0..6)
            .map(|i| persona(i, if i % 2 == 0 { "a" } else { "b" }))
            .collect();
        let graph = build(&personas, 8);
        let ids: Vec<_> = graph.nodes.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(
            ids,
            vec!["persona-0", "persona-1", "persona-2", "persona-3", "persona-4", "persona-5"]
        );
    }

    #[test]
    fn only_filter_keeps_selected_community() {
        let personas: Vec<_> = (0..6)
            .map(|i| persona(i, if i < 3 { "a" } else { "b" }))
            .collect();
        let mut rng = SmallRng::seed_from_u64(2);
        let filter = CommunityFilter::only([CommunityId::from("b")]);
        let graph = GraphBuilder::default().build(&personas, &filter, &palette(), &mut rng);
        assert_eq!(graph.node_count(), 3);
        assert!(graph.nodes.iter().all(|n| n.community_id.as_str() == "b"));
        assert!(graph.links.iter().all(|l| graph.node(l.source.as_str()).is_some()));
    }

    #[test]
    fn default_policy_is_valid() {
        assert!(LinkPolicy::default().validate().is_ok());
    }

    #[test]
    fn invalid_policy_rejected() {
        let policy = LinkPolicy {
            cross_probability: 1.5,
            ..LinkPolicy::default()
        };
        assert!(GraphBuilder::new(policy).is_err());

        let policy = LinkPolicy {
            hub_budget: CountRange::new(6, 4),
            ..LinkPolicy::default()
        };
        assert!(GraphBuilder::new(policy).is_err());

        let policy = LinkPolicy {
            extra_weight: ValueRange::new(0.3, 0.1),
            ..LinkPolicy::default()
        };
        assert!(GraphBuilder::new(policy).is_err());
    }

    #[test]
    fn partial_policy_yaml_uses_defaults() {
        let yaml = "cross_probability: 0.0\nhub_every: 0\n";
        let policy: LinkPolicy = serde_yml::from_str(yaml).unwrap();
        assert!(policy.cross_probability.abs() < f64::EPSILON);
        assert_eq!(policy.hub_every, 0);
        assert_eq!(policy.spanning, default_spanning());
        assert_eq!(policy.medium_budget, CountRange::new(2, 3));
    }

    #[test]
    fn disabled_enrichment_leaves_only_tree_and_ring() {
        let policy = LinkPolicy {
            hub_every: 0,
            medium_every: 0,
            low_link_probability: 0.0,
            cross_probability: 0.0,
            ..LinkPolicy::default()
        };
        let builder = GraphBuilder::new(policy).unwrap();
        let personas: Vec<_> = (0..10)
            .map(|i| persona(i, if i < 5 { "a" } else { "b" }))
            .collect();
        let mut rng = SmallRng::seed_from_u64(4);
        let graph = builder.build(&personas, &CommunityFilter::All, &palette(), &mut rng);
        assert_eq!(graph.count_links(LinkKind::Structural), 8);
        assert_eq!(graph.count_links(LinkKind::Auxiliary), 2);
    }
}
