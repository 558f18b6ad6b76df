//! Network session: the current persona store, filter, and graph.
//!
//! A session owns everything needed to rebuild the graph. Every rebuild
//! replaces the graph wholesale and bumps [`NetworkSession::revision`], so
//! callers holding activation state for an older revision know to drop it.

use std::sync::Arc;

use rand::Rng;
use ripple_types::{
    ALL_COMMUNITIES, CommunityDefinition, CommunityFilter, CommunityId, Graph, PersonaAttributes,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::NetworkError;
use crate::graph::{CommunityPalette, GraphBuilder, LinkPolicy};
use crate::persona::{DEFAULT_PERSONA_COUNT, PersonaStore, default_communities, validate_communities};
use crate::template::default_template_pool;

// -----------------------------------------------------------------------
// Settings
// -----------------------------------------------------------------------

/// Network section of the configuration file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkSettings {
    /// Number of personas to generate.
    #[serde(default = "default_persona_count")]
    pub persona_count: usize,

    /// Ordered community definitions. Must not be empty.
    #[serde(default = "default_communities")]
    pub communities: Vec<CommunityDefinition>,

    /// Community selectors applied to the first build: `[all]` or a list
    /// of community ids.
    #[serde(default = "default_active_communities")]
    pub active_communities: Vec<String>,

    /// Base attribute templates personas are drawn from.
    #[serde(default = "default_template_pool")]
    pub templates: Vec<PersonaAttributes>,

    /// Link construction constants.
    #[serde(default)]
    pub link_policy: LinkPolicy,
}

impl Default for NetworkSettings {
    fn default() -> Self {
        Self {
            persona_count: default_persona_count(),
            communities: default_communities(),
            active_communities: default_active_communities(),
            templates: default_template_pool(),
            link_policy: LinkPolicy::default(),
        }
    }
}

const fn default_persona_count() -> usize {
    DEFAULT_PERSONA_COUNT
}

fn default_active_communities() -> Vec<String> {
    vec![String::from(ALL_COMMUNITIES)]
}

impl NetworkSettings {
    /// Validate communities, link policy, and the initial filter.
    ///
    /// # Errors
    ///
    /// Returns the first [`NetworkError`] found.
    pub fn validate(&self) -> Result<(), NetworkError> {
        if self.persona_count == 0 {
            return Err(NetworkError::configuration(
                "persona_count must be at least 1",
            ));
        }
        validate_communities(&self.communities)?;
        self.link_policy.validate()?;
        validate_filter(&self.initial_filter(), &self.communities)
    }

    /// The filter described by `active_communities`.
    pub fn initial_filter(&self) -> CommunityFilter {
        CommunityFilter::from_selectors(&self.active_communities)
    }
}

/// Check that `filter` only names configured communities.
///
/// # Errors
///
/// - [`NetworkError::Configuration`] for an empty `Only` set.
/// - [`NetworkError::UnknownCommunity`] for an id not in `communities`.
pub fn validate_filter(
    filter: &CommunityFilter,
    communities: &[CommunityDefinition],
) -> Result<(), NetworkError> {
    let Some(selected) = filter.selected() else {
        return Ok(());
    };
    if selected.is_empty() {
        return Err(NetworkError::configuration(
            "community filter must select at least one community",
        ));
    }
    for id in selected {
        if !communities.iter().any(|c| &c.id == id) {
            return Err(NetworkError::UnknownCommunity(id.clone()));
        }
    }
    Ok(())
}

// -----------------------------------------------------------------------
// Session
// -----------------------------------------------------------------------

/// The live network: personas, filter, and the graph built from them.
#[derive(Debug)]
pub struct NetworkSession<R> {
    settings: NetworkSettings,
    palette: CommunityPalette,
    builder: GraphBuilder,
    store: PersonaStore,
    filter: CommunityFilter,
    graph: Arc<Graph>,
    revision: u64,
    rng: R,
}

impl<R: Rng> NetworkSession<R> {
    /// Validate `settings`, generate personas, and build the first graph.
    ///
    /// # Errors
    ///
    /// Returns a [`NetworkError`] if the settings are invalid. No partial
    /// session is constructed.
    pub fn new(settings: NetworkSettings, mut rng: R) -> Result<Self, NetworkError> {
        settings.validate()?;
        let builder = GraphBuilder::new(settings.link_policy.clone())?;
        let palette = CommunityPalette::from_definitions(&settings.communities);
        let store = PersonaStore::generate(
            settings.persona_count,
            &settings.communities,
            &settings.templates,
            &mut rng,
        )?;
        let filter = settings.initial_filter();
        let graph = builder.build(store.personas(), &filter, &palette, &mut rng);

        info!(
            personas = store.len(),
            communities = settings.communities.len(),
            nodes = graph.node_count(),
            links = graph.link_count(),
            "Network session initialized"
        );

        Ok(Self {
            settings,
            palette,
            builder,
            store,
            filter,
            graph: Arc::new(graph),
            revision: 1,
            rng,
        })
    }

    /// The current graph.
    pub fn graph(&self) -> Arc<Graph> {
        Arc::clone(&self.graph)
    }

    /// Revision of the current graph. Starts at 1; bumped on every rebuild.
    pub const fn revision(&self) -> u64 {
        self.revision
    }

    /// The active community filter.
    pub const fn filter(&self) -> &CommunityFilter {
        &self.filter
    }

    /// The configured communities, in order.
    pub fn communities(&self) -> &[CommunityDefinition] {
        &self.settings.communities
    }

    /// The current persona store.
    pub const fn store(&self) -> &PersonaStore {
        &self.store
    }

    /// Replace the filter and rebuild the graph.
    ///
    /// # Errors
    ///
    /// Returns an error if the filter names unknown communities; the
    /// current graph is left untouched.
    pub fn set_filter(&mut self, filter: CommunityFilter) -> Result<Arc<Graph>, NetworkError> {
        validate_filter(&filter, &self.settings.communities)?;
        self.filter = filter;
        Ok(self.rebuild())
    }

    /// Toggle one community (or `all`) in the filter and rebuild.
    ///
    /// # Errors
    ///
    /// Returns [`NetworkError::UnknownCommunity`] for an unconfigured id.
    pub fn toggle_community(&mut self, selector: &str) -> Result<Arc<Graph>, NetworkError> {
        if selector != ALL_COMMUNITIES && !self.palette.contains(selector) {
            return Err(NetworkError::UnknownCommunity(CommunityId::from(selector)));
        }
        let filter = self.filter.toggled(selector);
        self.set_filter(filter)
    }

    /// Generate a fresh persona store and rebuild.
    ///
    /// # Errors
    ///
    /// Returns an error if persona generation fails.
    pub fn regenerate(&mut self) -> Result<Arc<Graph>, NetworkError> {
        self.store = PersonaStore::generate(
            self.settings.persona_count,
            &self.settings.communities,
            &self.settings.templates,
            &mut self.rng,
        )?;
        Ok(self.rebuild())
    }

    fn rebuild(&mut self) -> Arc<Graph> {
        let graph = self.builder.build(
            self.store.personas(),
            &self.filter,
            &self.palette,
            &mut self.rng,
        );
        self.graph = Arc::new(graph);
        self.revision = self.revision.saturating_add(1);
        debug!(
            revision = self.revision,
            nodes = self.graph.node_count(),
            links = self.graph.link_count(),
            "Graph rebuilt"
        );
        Arc::clone(&self.graph)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    use super::*;
    use crate::components::is_connected;

    fn settings(count: usize) -> NetworkSettings {
        NetworkSettings {
            persona_count: count,
            ..NetworkSettings::default()
        }
    }

    fn session(count: usize) -> NetworkSession<SmallRng> {
        NetworkSession::new(settings(count), SmallRng::seed_from_u64(42)).unwrap()
    }

    #[test]
    fn new_session_builds_connected_graph() {
        let session = session(120);
        assert_eq!(session.revision(), 1);
        assert_eq!(session.graph().node_count(), 120);
        assert!(is_connected(&session.graph()));
    }

    #[test]
    fn unknown_filter_rejected_without_rebuild() {
        let mut session = session(40);
        let before = session.graph();
        let result = session.set_filter(CommunityFilter::only([CommunityId::from("atlantis")]));
        assert!(matches!(result, Err(NetworkError::UnknownCommunity(_))));
        assert_eq!(session.revision(), 1);
        assert!(Arc::ptr_eq(&before, &session.graph()));
    }

    #[test]
    fn toggle_narrows_and_restores() {
        let mut session = session(40);
        let graph = session.toggle_community("south-india").unwrap();
        assert_eq!(graph.node_count(), 10);
        assert!(graph.nodes.iter().all(|n| n.community_id.as_str() == "south-india"));

        let graph = session.toggle_community("south-india").unwrap();
        assert_eq!(graph.node_count(), 40);
        assert!(session.filter().is_all());
        assert_eq!(session.revision(), 3);
    }

    #[test]
    fn toggle_unknown_rejected() {
        let mut session = session(8);
        assert!(session.toggle_community("atlantis").is_err());
        assert!(session.toggle_community(ALL_COMMUNITIES).is_ok());
    }

    #[test]
    fn regenerate_replaces_graph() {
        let mut session = session(30);
        let before = session.graph();
        let after = session.regenerate().unwrap();
        assert!(!Arc::ptr_eq(&before, &after));
        assert_eq!(after.node_count(), 30);
        assert_eq!(session.revision(), 2);
    }

    #[test]
    fn empty_only_filter_rejected() {
        let filter = CommunityFilter::Only(std::collections::BTreeSet::new());
        assert!(validate_filter(&filter, &default_communities()).is_err());
    }

    #[test]
    fn unknown_initial_selector_rejected() {
        let settings = NetworkSettings {
            active_communities: vec![String::from("atlantis")],
            ..settings(10)
        };
        assert!(matches!(
            settings.validate(),
            Err(NetworkError::UnknownCommunity(_))
        ));
    }

    #[test]
    fn rejects_zero_persona_count() {
        let settings = NetworkSettings {
            persona_count: 0,
            ..NetworkSettings::default()
        };
        assert!(matches!(
            settings.validate(),
            Err(NetworkError::Configuration { .. })
        ));
        assert!(NetworkSession::new(settings, SmallRng::seed_from_u64(1)).is_err());
    }

    #[test]
    fn settings_from_partial_yaml() {
        let yaml = r##"
persona_count: 12
active_communities: [north-india, east-india]
communities:
  - id: north-india
    display_name: North India
    color: "#FF5733"
  - id: east-india
    display_name: East India
    color: "#3357FF"
    base_size: 2.0
"##;
        let settings: NetworkSettings = serde_yml::from_str(yaml).unwrap();
        assert_eq!(settings.persona_count, 12);
        assert_eq!(settings.communities.len(), 2);
        let first = settings.communities.first().unwrap();
        assert!((first.base_size - 2.5).abs() < f64::EPSILON);
        assert_eq!(settings.initial_filter().selectors().len(), 2);
        assert!(!settings.templates.is_empty());
        assert!(settings.validate().is_ok());
    }
}
