//! Persona generation.
//!
//! Personas are assigned to communities round-robin (`index mod k`), so
//! community sizes never differ by more than one no matter which random
//! source is used. Everything else about a persona is cosmetic and sampled
//! independently: name, display code, shape, fill pattern, pulse rate, and
//! a base attribute template.

use std::collections::{BTreeMap, BTreeSet};

use rand::Rng;
use rand::seq::IndexedRandom;
use ripple_types::{
    ALL_COMMUNITIES, CommunityDefinition, CommunityId, Persona, PersonaAttributes, PersonaId,
    Shape,
};
use tracing::debug;

use crate::error::NetworkError;

/// Number of fill patterns a renderer is expected to provide.
pub const PATTERN_COUNT: u8 = 6;

/// Persona count used when configuration does not set one.
pub const DEFAULT_PERSONA_COUNT: usize = 988;

/// Lower bound of the size jitter factor.
const SIZE_JITTER_MIN: f64 = 0.8;

/// Upper bound of the size jitter factor.
const SIZE_JITTER_MAX: f64 = 1.2;

// -----------------------------------------------------------------------
// Name pools
// -----------------------------------------------------------------------

const FIRST_NAMES: &[&str] = &[
    "Aarav", "Aditi", "Akash", "Ananya", "Arjun", "Deepa", "Divya", "Farhan",
    "Gaurav", "Ishaan", "Kavya", "Lakshmi", "Manish", "Meera", "Neha", "Nikhil",
    "Pooja", "Priya", "Rahul", "Ravi", "Rohan", "Sanjay", "Shreya", "Sneha",
    "Suresh", "Tanvi", "Varun", "Vikram", "Yash", "Zoya",
];

const LAST_NAMES: &[&str] = &[
    "Banerjee", "Bose", "Chatterjee", "Das", "Desai", "Gupta", "Iyer", "Jain",
    "Joshi", "Kapoor", "Khan", "Kulkarni", "Menon", "Mehta", "Nair", "Patel",
    "Pillai", "Rao", "Reddy", "Sharma", "Shah", "Singh", "Verma", "Yadav",
];

// -----------------------------------------------------------------------
// Communities
// -----------------------------------------------------------------------

/// The four regional communities used when configuration supplies none.
pub fn default_communities() -> Vec<CommunityDefinition> {
    vec![
        CommunityDefinition::new("north-india", "North India", "#FF5733", 3.0),
        CommunityDefinition::new("south-india", "South India", "#33FF57", 2.5),
        CommunityDefinition::new("east-india", "East India", "#3357FF", 2.0),
        CommunityDefinition::new("west-india", "West India", "#F1C40F", 2.75),
    ]
}

/// Validate an ordered list of community definitions.
///
/// # Errors
///
/// - [`NetworkError::Configuration`] when the list is empty, an id is blank
///   or equal to the `all` sentinel, or a base size is not a positive finite
///   number.
/// - [`NetworkError::DuplicateCommunity`] when an id appears twice.
pub fn validate_communities(communities: &[CommunityDefinition]) -> Result<(), NetworkError> {
    if communities.is_empty() {
        return Err(NetworkError::configuration(
            "at least one community definition is required",
        ));
    }

    let mut seen = BTreeSet::new();
    for community in communities {
        let id = community.id.as_str();
        if id.trim().is_empty() || id == ALL_COMMUNITIES {
            return Err(NetworkError::configuration(format!(
                "community id {id:?} is reserved or blank"
            )));
        }
        if !seen.insert(id) {
            return Err(NetworkError::DuplicateCommunity(community.id.clone()));
        }
        if !community.base_size.is_finite() || community.base_size <= 0.0 {
            return Err(NetworkError::configuration(format!(
                "community {id} has invalid base size {}",
                community.base_size
            )));
        }
    }
    Ok(())
}

// -----------------------------------------------------------------------
// Store
// -----------------------------------------------------------------------

/// An immutable, generated set of personas.
#[derive(Debug, Clone, Default)]
pub struct PersonaStore {
    personas: Vec<Persona>,
}

impl PersonaStore {
    /// Generate `count` personas across `communities`.
    ///
    /// A base template is drawn uniformly from `templates`; an empty pool
    /// falls back to [`PersonaAttributes::default`].
    ///
    /// # Errors
    ///
    /// Returns an error if `communities` fails [`validate_communities`].
    pub fn generate(
        count: usize,
        communities: &[CommunityDefinition],
        templates: &[PersonaAttributes],
        rng: &mut impl Rng,
    ) -> Result<Self, NetworkError> {
        validate_communities(communities)?;

        let mut personas = Vec::with_capacity(count);
        for index in 0..count {
            let community = index
                .checked_rem(communities.len())
                .and_then(|slot| communities.get(slot))
                .ok_or_else(|| NetworkError::configuration("community slot out of range"))?;
            let attributes = templates.choose(rng).cloned().unwrap_or_default();
            personas.push(generate_persona(index, community, attributes, rng));
        }

        debug!(
            count,
            communities = communities.len(),
            "Generated persona store"
        );
        Ok(Self { personas })
    }

    /// All personas in generation order.
    pub fn personas(&self) -> &[Persona] {
        &self.personas
    }

    /// Number of personas.
    pub const fn len(&self) -> usize {
        self.personas.len()
    }

    /// Whether the store is empty.
    pub const fn is_empty(&self) -> bool {
        self.personas.is_empty()
    }

    /// Look up a persona by id.
    pub fn get(&self, id: &str) -> Option<&Persona> {
        self.personas.iter().find(|p| p.id.as_str() == id)
    }

    /// Personas belonging to `community`, in generation order.
    pub fn by_community<'a>(&'a self, community: &'a str) -> impl Iterator<Item = &'a Persona> {
        self.personas
            .iter()
            .filter(move |p| p.community_id.as_str() == community)
    }

    /// Persona count per community.
    pub fn community_counts(&self) -> BTreeMap<CommunityId, usize> {
        let mut counts: BTreeMap<CommunityId, usize> = BTreeMap::new();
        for persona in &self.personas {
            let entry = counts.entry(persona.community_id.clone()).or_insert(0);
            *entry = entry.saturating_add(1);
        }
        counts
    }
}

fn generate_persona(
    index: usize,
    community: &CommunityDefinition,
    attributes: PersonaAttributes,
    rng: &mut impl Rng,
) -> Persona {
    let first = FIRST_NAMES.choose(rng).copied().unwrap_or("Asha");
    let last = LAST_NAMES.choose(rng).copied().unwrap_or("Sharma");
    let code_number: u16 = rng.random_range(0..10_000);
    let jitter = rng.random_range(SIZE_JITTER_MIN..=SIZE_JITTER_MAX);
    let shape = if rng.random_bool(0.5) {
        Shape::Circle
    } else {
        Shape::Square
    };
    let pattern_id = rng.random_range(0..PATTERN_COUNT);
    // random() is in [0, 1); flip it so the rate is never zero.
    let pulse_rate = 1.0 - rng.random::<f64>();

    Persona {
        id: PersonaId::for_index(index),
        community_id: community.id.clone(),
        display_name: format!("{first} {last}"),
        display_code: format!("{}-{code_number:04}", community_initials(&community.id)),
        size: community.base_size * jitter,
        shape,
        pattern_id,
        pulse_rate,
        attributes,
    }
}

/// Upper-case initials of a kebab-case id: `north-india` becomes `NI`.
fn community_initials(id: &CommunityId) -> String {
    id.as_str()
        .split(['-', '_', ' '])
        .filter_map(|word| word.chars().next())
        .flat_map(char::to_uppercase)
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::arithmetic_side_effects)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    use super::*;
    use crate::template::default_template_pool;

    fn store(count: usize, seed: u64) -> PersonaStore {
        let mut rng = SmallRng::seed_from_u64(seed);
        PersonaStore::generate(
            count,
            &default_communities(),
            &default_template_pool(),
            &mut rng,
        )
        .unwrap()
    }

    #[test]
    fn round_robin_balance() {
        let store = store(998, 1);
        let counts = store.community_counts();
        assert_eq!(counts.len(), 4);
        let max = counts.values().copied().max().unwrap();
        let min = counts.values().copied().min().unwrap();
        assert!(max - min <= 1);
        assert_eq!(counts.values().sum::<usize>(), 998);
    }

    #[test]
    fn assignment_ignores_rng() {
        let a = store(40, 1);
        let b = store(40, 99);
        let left: Vec<_> = a.personas().iter().map(|p| &p.community_id).collect();
        let right: Vec<_> = b.personas().iter().map(|p| &p.community_id).collect();
        assert_eq!(left, right);
    }

    #[test]
    fn zero_count_is_empty() {
        assert!(store(0, 1).is_empty());
    }

    #[test]
    fn empty_communities_rejected() {
        let mut rng = SmallRng::seed_from_u64(1);
        let result = PersonaStore::generate(10, &[], &default_template_pool(), &mut rng);
        assert!(matches!(result, Err(NetworkError::Configuration { .. })));
    }

    #[test]
    fn duplicate_communities_rejected() {
        let mut communities = default_communities();
        communities.push(CommunityDefinition::new("north-india", "Again", "#000000", 1.0));
        let result = validate_communities(&communities);
        assert!(matches!(result, Err(NetworkError::DuplicateCommunity(_))));
    }

    #[test]
    fn bad_base_size_rejected() {
        let communities = vec![CommunityDefinition::new("solo", "Solo", "#000000", 0.0)];
        assert!(validate_communities(&communities).is_err());

        let communities = vec![CommunityDefinition::new("solo", "Solo", "#000000", f64::NAN)];
        assert!(validate_communities(&communities).is_err());
    }

    #[test]
    fn reserved_id_rejected() {
        let communities = vec![CommunityDefinition::new("all", "All", "#000000", 1.0)];
        assert!(validate_communities(&communities).is_err());
    }

    #[test]
    fn cosmetic_ranges() {
        let store = store(200, 7);
        let communities = default_communities();
        for persona in store.personas() {
            let base = communities
                .iter()
                .find(|c| c.id == persona.community_id)
                .unwrap()
                .base_size;
            assert!(persona.size >= base * 0.8 - 1e-9);
            assert!(persona.size <= base * 1.2 + 1e-9);
            assert!(persona.pulse_rate > 0.0 && persona.pulse_rate <= 1.0);
            assert!(persona.pattern_id < PATTERN_COUNT);
        }
    }

    #[test]
    fn display_code_uses_initials() {
        let store = store(4, 3);
        let first = store.get("persona-0").unwrap();
        assert!(first.display_code.starts_with("NI-"));
        assert_eq!(first.display_code.len(), 7);
        let second = store.get("persona-1").unwrap();
        assert!(second.display_code.starts_with("SI-"));
    }

    #[test]
    fn empty_template_pool_falls_back() {
        let mut rng = SmallRng::seed_from_u64(5);
        let store = PersonaStore::generate(3, &default_communities(), &[], &mut rng).unwrap();
        assert!(
            store
                .personas()
                .iter()
                .all(|p| p.attributes == PersonaAttributes::default())
        );
    }

    #[test]
    fn seeded_generation_is_deterministic() {
        assert_eq!(store(50, 11).personas(), store(50, 11).personas());
    }

    #[test]
    fn by_community_filters() {
        let store = store(8, 2);
        let ids: Vec<_> = store.by_community("east-india").map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["persona-2", "persona-6"]);
    }
}
