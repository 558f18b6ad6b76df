//! Three-phase activation over a built graph.
//!
//! The phase is a pure function of the activation fraction
//! `f = |active ∩ nodes| / |nodes|`:
//!
//! | Phase      | Range              | Per-step behaviour                          |
//! |------------|--------------------|---------------------------------------------|
//! | `Seed`     | `f < 0.1`          | activate 2-5 random inactive nodes          |
//! | `Spread`   | `0.1 <= f < 0.5`   | cross active/inactive links with p = 0.3, plus 1-3 random inactive nodes |
//! | `Saturate` | `f >= 0.5`         | every inactive node activates with p = 0.4  |
//!
//! Active nodes never deactivate. Once every node is active, stepping is a
//! no-op. Blinking nodes are redrawn from scratch on every step.
//!
//! The simulator never schedules itself; the caller decides when to step.

use std::collections::{BTreeSet, HashMap};

use rand::Rng;
use rand::seq::IndexedRandom;
use ripple_types::{ActivationState, CountRange, Graph, Phase, PersonaId};
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::config::ConfigError;

// ---------------------------------------------------------------------------
// Parameters
// ---------------------------------------------------------------------------

/// Every tunable constant of the activation process.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiffusionParams {
    /// Fraction at which `Seed` gives way to `Spread`.
    #[serde(default = "default_spread_threshold")]
    pub spread_threshold: f64,

    /// Fraction at which `Spread` gives way to `Saturate`.
    #[serde(default = "default_saturate_threshold")]
    pub saturate_threshold: f64,

    /// Random activations per `Seed` step.
    #[serde(default = "default_seed_count")]
    pub seed_count: CountRange,

    /// Probability of crossing one active/inactive link per `Spread` step.
    #[serde(default = "default_spread_probability")]
    pub spread_probability: f64,

    /// Extra random activations per `Spread` step.
    #[serde(default = "default_spread_random")]
    pub spread_random: CountRange,

    /// Per-node activation probability per `Saturate` step.
    #[serde(default = "default_saturate_probability")]
    pub saturate_probability: f64,

    /// Probability that an active node blinks on a step.
    #[serde(default = "default_blink_probability")]
    pub blink_probability: f64,

    /// Maximum number of blinking nodes.
    #[serde(default = "default_blink_cap")]
    pub blink_cap: usize,

    /// Draws allowed when topping blinking nodes up from inactive ones.
    /// Defaults to four times `blink_cap`.
    #[serde(default)]
    pub blink_fill_attempts: Option<usize>,
}

impl Default for DiffusionParams {
    fn default() -> Self {
        Self {
            spread_threshold: default_spread_threshold(),
            saturate_threshold: default_saturate_threshold(),
            seed_count: default_seed_count(),
            spread_probability: default_spread_probability(),
            spread_random: default_spread_random(),
            saturate_probability: default_saturate_probability(),
            blink_probability: default_blink_probability(),
            blink_cap: default_blink_cap(),
            blink_fill_attempts: None,
        }
    }
}

impl DiffusionParams {
    /// Check thresholds, probabilities, ranges, and the blink cap.
    ///
    /// `saturate_probability` must be positive so every run terminates.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first bad field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let thresholds_ok = (0.0..=1.0).contains(&self.spread_threshold)
            && (0.0..=1.0).contains(&self.saturate_threshold)
            && self.spread_threshold <= self.saturate_threshold;
        if !thresholds_ok {
            return Err(ConfigError::invalid(format!(
                "diffusion thresholds must satisfy 0 <= spread ({}) <= saturate ({}) <= 1",
                self.spread_threshold, self.saturate_threshold
            )));
        }

        for (name, value) in [
            ("spread_probability", self.spread_probability),
            ("saturate_probability", self.saturate_probability),
            ("blink_probability", self.blink_probability),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::invalid(format!(
                    "diffusion.{name} must lie in [0, 1], got {value}"
                )));
            }
        }
        if self.saturate_probability <= 0.0 {
            return Err(ConfigError::invalid(
                "diffusion.saturate_probability must be positive",
            ));
        }

        for (name, range) in [
            ("seed_count", self.seed_count),
            ("spread_random", self.spread_random),
        ] {
            if !range.is_ordered() {
                return Err(ConfigError::invalid(format!(
                    "diffusion.{name} range {range} is inverted"
                )));
            }
        }

        if self.blink_cap == 0 {
            return Err(ConfigError::invalid("diffusion.blink_cap must be positive"));
        }
        Ok(())
    }

    /// Effective bound on inactive blink draws.
    pub fn fill_attempts(&self) -> usize {
        self.blink_fill_attempts
            .unwrap_or_else(|| self.blink_cap.saturating_mul(4))
    }
}

const fn default_spread_threshold() -> f64 {
    0.1
}

const fn default_saturate_threshold() -> f64 {
    0.5
}

const fn default_seed_count() -> CountRange {
    CountRange::new(2, 5)
}

const fn default_spread_probability() -> f64 {
    0.3
}

const fn default_spread_random() -> CountRange {
    CountRange::new(1, 3)
}

const fn default_saturate_probability() -> f64 {
    0.4
}

const fn default_blink_probability() -> f64 {
    0.2
}

const fn default_blink_cap() -> usize {
    20
}

// ---------------------------------------------------------------------------
// Simulator
// ---------------------------------------------------------------------------

/// Advances an [`ActivationState`] one step at a time.
#[derive(Debug, Clone, Default)]
pub struct DiffusionSimulator {
    params: DiffusionParams,
}

impl DiffusionSimulator {
    /// Create a simulator after validating `params`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if the parameters are unusable.
    pub fn new(params: DiffusionParams) -> Result<Self, ConfigError> {
        params.validate()?;
        Ok(Self { params })
    }

    /// The parameters in use.
    pub const fn params(&self) -> &DiffusionParams {
        &self.params
    }

    /// Phase for an activation fraction.
    pub fn phase_for(&self, fraction: f64) -> Phase {
        if fraction >= self.params.saturate_threshold {
            Phase::Saturate
        } else if fraction >= self.params.spread_threshold {
            Phase::Spread
        } else {
            Phase::Seed
        }
    }

    /// Activation fraction of `state` over `graph`, counting only ids that
    /// are nodes of `graph`. Zero for an empty graph.
    pub fn fraction(graph: &Graph, state: &ActivationState) -> f64 {
        let active = active_in_graph(graph, &state.active_ids);
        ratio(active, graph.node_count())
    }

    /// Advance `state` by one step.
    ///
    /// Returns `state` unchanged for an empty graph or when every node is
    /// already active.
    pub fn step(
        &self,
        graph: &Graph,
        state: &ActivationState,
        rng: &mut impl Rng,
    ) -> ActivationState {
        let node_count = graph.node_count();
        let active_before = active_in_graph(graph, &state.active_ids);
        if node_count == 0 || active_before >= node_count {
            return state.clone();
        }

        let phase = self.phase_for(ratio(active_before, node_count));
        let mut active = state.active_ids.clone();

        match phase {
            Phase::Seed => {
                let count = draw_count(self.params.seed_count, rng);
                activate_random(graph, &mut active, count, rng);
            }
            Phase::Spread => {
                self.spread_along_links(graph, &state.active_ids, &mut active, rng);
                let count = draw_count(self.params.spread_random, rng);
                activate_random(graph, &mut active, count, rng);
            }
            Phase::Saturate => {
                for node in &graph.nodes {
                    if !active.contains(&node.id)
                        && rng.random_bool(self.params.saturate_probability)
                    {
                        active.insert(node.id.clone());
                    }
                }
            }
        }

        let blinking_ids = self.draw_blinking(graph, &active, rng);
        let after = active_in_graph(graph, &active);
        let next_phase = self.phase_for(ratio(after, node_count));

        trace!(
            phase = %phase,
            next_phase = %next_phase,
            active_before,
            active_after = after,
            blinking = blinking_ids.len(),
            "Activation step"
        );

        ActivationState {
            active_ids: active,
            blinking_ids,
            phase: next_phase,
        }
    }

    /// Cross every link with exactly one endpoint in `before`.
    fn spread_along_links(
        &self,
        graph: &Graph,
        before: &BTreeSet<PersonaId>,
        active: &mut BTreeSet<PersonaId>,
        rng: &mut impl Rng,
    ) {
        let lookup: HashMap<&str, usize> = graph.lookup();
        for link in &graph.links {
            let source_active = before.contains(&link.source);
            let target_active = before.contains(&link.target);
            if source_active == target_active {
                continue;
            }
            let other = if source_active {
                &link.target
            } else {
                &link.source
            };
            if lookup.contains_key(other.as_str())
                && rng.random_bool(self.params.spread_probability)
            {
                active.insert(other.clone());
            }
        }
    }

    /// Blink a random subset of active nodes, then top up with inactive
    /// nodes using a bounded number of draws.
    fn draw_blinking(
        &self,
        graph: &Graph,
        active: &BTreeSet<PersonaId>,
        rng: &mut impl Rng,
    ) -> BTreeSet<PersonaId> {
        let cap = self.params.blink_cap;
        let mut blinking = BTreeSet::new();

        for node in graph.nodes.iter().filter(|n| active.contains(&n.id)) {
            if blinking.len() >= cap {
                break;
            }
            if rng.random_bool(self.params.blink_probability) {
                blinking.insert(node.id.clone());
            }
        }

        let inactive: Vec<&PersonaId> = graph
            .nodes
            .iter()
            .map(|n| &n.id)
            .filter(|id| !active.contains(*id))
            .collect();
        let mut attempts = self.params.fill_attempts();
        while blinking.len() < cap && attempts > 0 {
            let Some(&id) = inactive.choose(rng) else {
                break;
            };
            blinking.insert(id.clone());
            attempts = attempts.saturating_sub(1);
        }
        blinking
    }
}

/// Activate up to `count` distinct random inactive nodes.
fn activate_random(
    graph: &Graph,
    active: &mut BTreeSet<PersonaId>,
    count: usize,
    rng: &mut impl Rng,
) {
    let inactive: Vec<&PersonaId> = graph
        .nodes
        .iter()
        .map(|n| &n.id)
        .filter(|id| !active.contains(*id))
        .collect();
    let picked: Vec<PersonaId> = inactive
        .choose_multiple(rng, count)
        .map(|id| (*id).clone())
        .collect();
    active.extend(picked);
}

fn draw_count(range: CountRange, rng: &mut impl Rng) -> usize {
    let count = rng.random_range(range.min..=range.max);
    usize::try_from(count).unwrap_or(usize::MAX)
}

fn active_in_graph(graph: &Graph, active: &BTreeSet<PersonaId>) -> usize {
    graph
        .nodes
        .iter()
        .filter(|n| active.contains(&n.id))
        .count()
}

fn ratio(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    // Both counts are bounded by the node set; safe to represent as f64.
    #[allow(clippy::cast_precision_loss)]
    let value = part as f64 / whole as f64;
    value
}
