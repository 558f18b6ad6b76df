//! Core entity structs: personas, communities, graph, and activation state.
//!
//! Links reference nodes by [`PersonaId`] only. Resolving an id to a node
//! goes through [`Graph::lookup`], so no node or link ever holds a live
//! reference to another.

use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::enums::{LinkKind, LinkStyle, Phase, Shape};
use crate::ids::{CommunityId, PersonaId};

/// Sentinel selector meaning "every community".
pub const ALL_COMMUNITIES: &str = "all";

// ---------------------------------------------------------------------------
// Personas
// ---------------------------------------------------------------------------

/// Base attribute template copied into a persona at generation time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct PersonaAttributes {
    /// Broad archetype label (for example "early adopter").
    pub archetype: String,
    /// Occupation shown in persona details.
    pub occupation: String,
    /// Age band such as `25-34`.
    pub age_band: String,
    /// Interest tags.
    pub interests: Vec<String>,
    /// Income bracket label.
    pub income_bracket: String,
}

impl Default for PersonaAttributes {
    fn default() -> Self {
        Self {
            archetype: String::from("mainstream"),
            occupation: String::from("salaried professional"),
            age_band: String::from("25-34"),
            interests: vec![String::from("news"), String::from("shopping")],
            income_bracket: String::from("middle"),
        }
    }
}

/// A synthetic member of the network.
///
/// Immutable once generated; a new persona set is produced by regenerating
/// the whole store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Persona {
    /// Unique persona id (also the node id in every graph built from it).
    pub id: PersonaId,
    /// Community this persona belongs to.
    pub community_id: CommunityId,
    /// Human-readable name.
    pub display_name: String,
    /// Short code such as `NI-0412`.
    pub display_code: String,
    /// Render size, always positive.
    pub size: f64,
    /// Render glyph.
    pub shape: Shape,
    /// Fill pattern index.
    pub pattern_id: u8,
    /// Pulse animation rate in `(0, 1]`.
    pub pulse_rate: f64,
    /// Base attributes drawn from the template pool.
    pub attributes: PersonaAttributes,
}

// ---------------------------------------------------------------------------
// Communities
// ---------------------------------------------------------------------------

/// A named partition of personas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct CommunityDefinition {
    /// Stable identifier, also used by filters.
    pub id: CommunityId,
    /// Label shown to users.
    pub display_name: String,
    /// Hex colour used for nodes of this community.
    pub color: String,
    /// Base render size; persona sizes jitter around it.
    #[serde(default = "default_base_size")]
    pub base_size: f64,
}

impl CommunityDefinition {
    /// Create a community definition.
    pub fn new(
        id: impl Into<CommunityId>,
        display_name: impl Into<String>,
        color: impl Into<String>,
        base_size: f64,
    ) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            color: color.into(),
            base_size,
        }
    }
}

const fn default_base_size() -> f64 {
    2.5
}

/// Which communities are included when a graph is built.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum CommunityFilter {
    /// Every community.
    #[default]
    All,
    /// Only the listed communities. Must not be empty.
    Only(BTreeSet<CommunityId>),
}

impl CommunityFilter {
    /// Build a filter from a list of ids. An empty list selects everything.
    pub fn only<I>(ids: I) -> Self
    where
        I: IntoIterator<Item = CommunityId>,
    {
        let set: BTreeSet<CommunityId> = ids.into_iter().collect();
        if set.is_empty() { Self::All } else { Self::Only(set) }
    }

    /// Build a filter from selector strings such as `["all"]` or
    /// `["north-india", "east-india"]`. Any `all` selector, or no selectors
    /// at all, yields [`Self::All`].
    pub fn from_selectors<I, S>(selectors: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut ids = Vec::new();
        for selector in selectors {
            let selector = selector.as_ref();
            if selector == ALL_COMMUNITIES {
                return Self::All;
            }
            ids.push(CommunityId::from(selector));
        }
        Self::only(ids)
    }

    /// Selector strings for this filter; the inverse of
    /// [`Self::from_selectors`].
    pub fn selectors(&self) -> Vec<String> {
        match self {
            Self::All => vec![String::from(ALL_COMMUNITIES)],
            Self::Only(set) => set.iter().map(ToString::to_string).collect(),
        }
    }

    /// Whether this is the "all communities" sentinel.
    pub const fn is_all(&self) -> bool {
        matches!(self, Self::All)
    }

    /// Whether personas of `community` pass the filter.
    pub fn matches(&self, community: &CommunityId) -> bool {
        match self {
            Self::All => true,
            Self::Only(set) => set.contains(community),
        }
    }

    /// The explicitly selected communities, or `None` for [`Self::All`].
    pub const fn selected(&self) -> Option<&BTreeSet<CommunityId>> {
        match self {
            Self::All => None,
            Self::Only(set) => Some(set),
        }
    }

    /// Return the filter obtained by toggling `selector`.
    ///
    /// - `"all"` always yields [`Self::All`].
    /// - A selected id is removed; an emptied selection becomes [`Self::All`].
    /// - An unselected id is added. Toggling from [`Self::All`] selects only
    ///   that id.
    #[must_use]
    pub fn toggled(&self, selector: &str) -> Self {
        if selector == ALL_COMMUNITIES {
            return Self::All;
        }
        let mut set = self.selected().cloned().unwrap_or_default();
        if !set.remove(selector) {
            set.insert(CommunityId::from(selector));
        }
        Self::only(set)
    }
}

// ---------------------------------------------------------------------------
// Graph
// ---------------------------------------------------------------------------

/// Per-build projection of a persona plus presentation hints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Node {
    /// Same id as the source persona.
    pub id: PersonaId,
    /// Community of the source persona.
    pub community_id: CommunityId,
    /// Persona display name.
    pub display_name: String,
    /// Persona display code.
    pub display_code: String,
    /// Render size.
    pub size: f64,
    /// Render glyph.
    pub shape: Shape,
    /// Fill pattern index.
    pub pattern_id: u8,
    /// Pulse animation rate.
    pub pulse_rate: f64,
    /// Current fill colour.
    pub color: String,
    /// Community colour, kept so the renderer can restore highlights.
    pub original_color: String,
    /// Opacity hint.
    pub alpha: f64,
    /// Highlight hint.
    pub highlighted: bool,
}

/// Undirected edge between two nodes, referenced by id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Link {
    /// Endpoint the link was created from.
    pub source: PersonaId,
    /// Endpoint the link was created to.
    pub target: PersonaId,
    /// Stroke width hint.
    pub weight: f64,
    /// Connectivity role.
    pub kind: LinkKind,
    /// Stroke style hint.
    pub style: LinkStyle,
    /// Spring strength hint for force layouts.
    pub strength: f64,
    /// Opacity hint.
    pub alpha: f64,
}

impl Link {
    /// Whether this link touches `id`.
    pub fn touches(&self, id: &str) -> bool {
        self.source.as_str() == id || self.target.as_str() == id
    }

    /// The endpoint opposite `id`, if the link touches it.
    pub fn other_end(&self, id: &str) -> Option<&PersonaId> {
        if self.source.as_str() == id {
            Some(&self.target)
        } else if self.target.as_str() == id {
            Some(&self.source)
        } else {
            None
        }
    }

    /// Whether this link joins `a` and `b`, in either direction.
    pub fn joins(&self, a: &str, b: &str) -> bool {
        (self.source.as_str() == a && self.target.as_str() == b)
            || (self.source.as_str() == b && self.target.as_str() == a)
    }
}

/// A built network: nodes in stable insertion order plus deduplicated links.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Graph {
    /// Nodes in insertion order.
    pub nodes: Vec<Node>,
    /// Links; no two share the same unordered endpoint pair.
    pub links: Vec<Link>,
}

impl Graph {
    /// Number of nodes.
    pub const fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of links.
    pub const fn link_count(&self) -> usize {
        self.links.len()
    }

    /// Whether the graph has no nodes.
    pub const fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Build the id → node index lookup.
    pub fn lookup(&self) -> HashMap<&str, usize> {
        self.nodes
            .iter()
            .enumerate()
            .map(|(idx, node)| (node.id.as_str(), idx))
            .collect()
    }

    /// Find a node by id (linear scan).
    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.iter().find(|node| node.id.as_str() == id)
    }

    /// Whether a link joins `a` and `b` in either direction.
    pub fn has_link(&self, a: &str, b: &str) -> bool {
        self.links.iter().any(|link| link.joins(a, b))
    }

    /// Number of links of the given kind.
    pub fn count_links(&self, kind: LinkKind) -> usize {
        self.links.iter().filter(|link| link.kind == kind).count()
    }
}

// ---------------------------------------------------------------------------
// Activation
// ---------------------------------------------------------------------------

/// Activation state of one simulation run.
///
/// `active_ids` only grows within a run. `blinking_ids` is regenerated on
/// every step. `phase` is always the phase derived from `active_ids`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct ActivationState {
    /// Nodes that have been activated during the run.
    pub active_ids: BTreeSet<PersonaId>,
    /// Nodes highlighted on the current step.
    pub blinking_ids: BTreeSet<PersonaId>,
    /// Phase derived from the activation fraction.
    pub phase: Phase,
}

impl ActivationState {
    /// The empty state every run starts from.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `id` is active.
    pub fn is_active(&self, id: &str) -> bool {
        self.active_ids.contains(id)
    }

    /// Whether `id` is blinking on the current step.
    pub fn is_blinking(&self, id: &str) -> bool {
        self.blinking_ids.contains(id)
    }

    /// Number of active nodes.
    pub fn active_count(&self) -> usize {
        self.active_ids.len()
    }

    /// Active fraction relative to `node_count`; 0.0 for an empty graph.
    pub fn fraction(&self, node_count: usize) -> f64 {
        if node_count == 0 {
            return 0.0;
        }
        // Both counts are bounded by the node set; safe to represent as f64.
        #[allow(clippy::cast_precision_loss)]
        let fraction = self.active_ids.len() as f64 / node_count as f64;
        fraction
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filter_of(ids: &[&str]) -> CommunityFilter {
        CommunityFilter::only(ids.iter().map(|id| CommunityId::from(*id)))
    }

    #[test]
    fn empty_only_filter_collapses_to_all() {
        assert_eq!(CommunityFilter::only(Vec::new()), CommunityFilter::All);
    }

    #[test]
    fn filter_matches() {
        let filter = filter_of(&["north-india"]);
        assert!(filter.matches(&CommunityId::from("north-india")));
        assert!(!filter.matches(&CommunityId::from("south-india")));
        assert!(CommunityFilter::All.matches(&CommunityId::from("anything")));
    }

    #[test]
    fn toggle_from_all_selects_single() {
        let toggled = CommunityFilter::All.toggled("east-india");
        assert_eq!(toggled, filter_of(&["east-india"]));
    }

    #[test]
    fn toggle_adds_and_removes() {
        let filter = filter_of(&["east-india"]).toggled("west-india");
        assert_eq!(filter, filter_of(&["east-india", "west-india"]));

        let filter = filter.toggled("east-india");
        assert_eq!(filter, filter_of(&["west-india"]));
    }

    #[test]
    fn toggle_last_selected_falls_back_to_all() {
        let filter = filter_of(&["west-india"]).toggled("west-india");
        assert!(filter.is_all());
    }

    #[test]
    fn toggle_all_sentinel_resets() {
        let filter = filter_of(&["west-india", "east-india"]).toggled(ALL_COMMUNITIES);
        assert!(filter.is_all());
    }

    #[test]
    fn selectors_round_trip() {
        assert!(CommunityFilter::from_selectors(["all"]).is_all());
        assert!(CommunityFilter::from_selectors(["east-india", "all"]).is_all());
        assert!(CommunityFilter::from_selectors(Vec::<String>::new()).is_all());

        let filter = CommunityFilter::from_selectors(["west-india", "east-india"]);
        assert_eq!(filter, filter_of(&["east-india", "west-india"]));
        assert_eq!(filter.selectors(), vec!["east-india", "west-india"]);
        assert_eq!(CommunityFilter::All.selectors(), vec!["all"]);
    }

    #[test]
    fn filter_serde_shape() {
        let json = serde_json::to_string(&CommunityFilter::All).ok();
        assert_eq!(json.as_deref(), Some("\"all\""));

        let json = serde_json::to_string(&filter_of(&["north-india"])).ok();
        assert_eq!(json.as_deref(), Some("{\"only\":[\"north-india\"]}"));
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
    fn link_endpoints() {
        let l = link("persona-1", "persona-2");
        assert!(l.joins("persona-2", "persona-1"));
        assert!(l.touches("persona-1"));
        assert_eq!(l.other_end("persona-2").map(PersonaId::as_str), Some("persona-1"));
        assert!(l.other_end("persona-3").is_none());
    }

    #[test]
    fn activation_fraction_handles_empty_graph() {
        let mut state = ActivationState::new();
        assert!(state.fraction(0).abs() < f64::EPSILON);
        state.active_ids.insert(PersonaId::from("persona-0"));
        assert!((state.fraction(4) - 0.25).abs() < f64::EPSILON);
        assert!(state.is_active("persona-0"));
        assert!(!state.is_blinking("persona-0"));
    }
}
