//! Activation tracking for run reports.
//!
//! Records which nodes became active on which tick and derives an adoption
//! curve, the peak activation rate, time to half penetration, and
//! per-community penetration.

use std::collections::{BTreeMap, HashMap};

use ripple_types::{CommunityId, Graph, PersonaId};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Report types
// ---------------------------------------------------------------------------

/// One point of the cumulative adoption curve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdoptionPoint {
    /// Tick that produced the activations.
    pub tick: u64,
    /// Total active nodes after the tick.
    pub cumulative: usize,
}

/// The tick with the most new activations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeakActivity {
    /// Tick number.
    pub tick: u64,
    /// Nodes activated on that tick.
    pub count: usize,
}

/// Summary of how activation spread during a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivationReport {
    /// Cumulative active count per tick that activated at least one node.
    pub adoption_curve: Vec<AdoptionPoint>,
    /// Tick with the most new activations.
    pub peak: Option<PeakActivity>,
    /// First tick at which at least half the nodes were active.
    pub half_penetration_tick: Option<u64>,
    /// Active fraction per community.
    pub community_penetration: BTreeMap<CommunityId, f64>,
}

// ---------------------------------------------------------------------------
// Tracker
// ---------------------------------------------------------------------------

/// Accumulates activations for one run over one graph.
#[derive(Debug, Clone, Default)]
pub struct ActivationTracker {
    node_count: usize,
    community_of: HashMap<PersonaId, CommunityId>,
    community_sizes: BTreeMap<CommunityId, usize>,
    activated_by_community: BTreeMap<CommunityId, usize>,
    new_per_tick: BTreeMap<u64, usize>,
    total: usize,
}

impl ActivationTracker {
    /// Create a tracker for `graph`.
    pub fn new(graph: &Graph) -> Self {
        let mut community_sizes: BTreeMap<CommunityId, usize> = BTreeMap::new();
        for node in &graph.nodes {
            let size = community_sizes.entry(node.community_id.clone()).or_insert(0);
            *size = size.saturating_add(1);
        }
        Self {
            node_count: graph.node_count(),
            community_of: graph
                .nodes
                .iter()
                .map(|n| (n.id.clone(), n.community_id.clone()))
                .collect(),
            community_sizes,
            ..Self::default()
        }
    }

    /// Record the ids newly activated on `tick`. Ids that are not nodes of
    /// the tracked graph are ignored.
    pub fn record<'a, I>(&mut self, tick: u64, newly_active: I)
    where
        I: IntoIterator<Item = &'a PersonaId>,
    {
        let mut count: usize = 0;
        for id in newly_active {
            let Some(community) = self.community_of.get(id) else {
                continue;
            };
            let entry = self
                .activated_by_community
                .entry(community.clone())
                .or_insert(0);
            *entry = entry.saturating_add(1);
            count = count.saturating_add(1);
        }
        if count == 0 {
            return;
        }
        self.total = self.total.saturating_add(count);
        let slot = self.new_per_tick.entry(tick).or_insert(0);
        *slot = slot.saturating_add(count);
    }

    /// Total activations recorded.
    pub const fn total(&self) -> usize {
        self.total
    }

    /// Cumulative `(tick, active)` pairs in tick order.
    pub fn adoption_curve(&self) -> Vec<AdoptionPoint> {
        let mut cumulative: usize = 0;
        self.new_per_tick
            .iter()
            .map(|(&tick, &count)| {
                cumulative = cumulative.saturating_add(count);
                AdoptionPoint { tick, cumulative }
            })
            .collect()
    }

    /// Tick with the most new activations. Earliest tick wins ties.
    pub fn peak(&self) -> Option<PeakActivity> {
        let mut best: Option<PeakActivity> = None;
        for (&tick, &count) in &self.new_per_tick {
            if best.is_none_or(|b| count > b.count) {
                best = Some(PeakActivity { tick, count });
            }
        }
        best
    }

    /// First tick at which at least half of the nodes were active.
    pub fn half_penetration_tick(&self) -> Option<u64> {
        if self.node_count == 0 {
            return None;
        }
        self.adoption_curve()
            .into_iter()
            .find(|point| point.cumulative.saturating_mul(2) >= self.node_count)
            .map(|point| point.tick)
    }

    /// Active fraction per community; communities with no activations
    /// report 0.0.
    pub fn community_penetration(&self) -> BTreeMap<CommunityId, f64> {
        self.community_sizes
            .iter()
            .map(|(community, &size)| {
                let active = self
                    .activated_by_community
                    .get(community)
                    .copied()
                    .unwrap_or(0);
                // Both counts are bounded by the node set; safe to represent as f64.
                #[allow(clippy::cast_precision_loss)]
                let fraction = if size == 0 {
                    0.0
                } else {
                    active as f64 / size as f64
                };
                (community.clone(), fraction)
            })
            .collect()
    }

    /// Build the full report.
    pub fn report(&self) -> ActivationReport {
        ActivationReport {
            adoption_curve: self.adoption_curve(),
            peak: self.peak(),
            half_penetration_tick: self.half_penetration_tick(),
            community_penetration: self.community_penetration(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use ripple_types::{Node, Shape};

    use super::*;

    fn graph() -> Graph {
        let nodes = (0..6)
            .map(|i| Node {
                id: PersonaId::for_index(i),
                community_id: CommunityId::from(if i < 4 { "north-india" } else { "south-india" }),
                display_name: format!("P{i}"),
                display_code: format!("NI-{i:04}"),
                size: 1.0,
                shape: Shape::Square,
                pattern_id: 2,
                pulse_rate: 0.3,
                color: String::from("#FF5733"),
                original_color: String::from("#FF5733"),
                alpha: 1.0,
                highlighted: false,
            })
            .collect();
        Graph {
            nodes,
            links: Vec::new(),
        }
    }

    fn ids(indices: &[usize]) -> Vec<PersonaId> {
        indices.iter().map(|&i| PersonaId::for_index(i)).collect()
    }

    #[test]
    fn empty_tracker_reports_nothing() {
        let tracker = ActivationTracker::new(&graph());
        let report = tracker.report();
        assert!(report.adoption_curve.is_empty());
        assert!(report.peak.is_none());
        assert!(report.half_penetration_tick.is_none());
        assert_eq!(report.community_penetration.len(), 2);
    }

    #[test]
    fn curve_peak_and_half_penetration() {
        let mut tracker = ActivationTracker::new(&graph());
        tracker.record(1, &ids(&[0]));
        tracker.record(2, &ids(&[1, 4]));
        tracker.record(3, &ids(&[]));
        tracker.record(4, &ids(&[2, 3, 5]));

        let curve = tracker.adoption_curve();
        assert_eq!(
            curve,
            vec![
                AdoptionPoint { tick: 1, cumulative: 1 },
                AdoptionPoint { tick: 2, cumulative: 3 },
                AdoptionPoint { tick: 4, cumulative: 6 },
            ]
        );
        assert_eq!(tracker.peak(), Some(PeakActivity { tick: 4, count: 3 }));
        assert_eq!(tracker.half_penetration_tick(), Some(2));
        assert_eq!(tracker.total(), 6);
    }

    #[test]
    fn community_penetration_fractions() {
        let mut tracker = ActivationTracker::new(&graph());
        tracker.record(1, &ids(&[0, 1, 4]));
        let penetration = tracker.community_penetration();
        let north = penetration.get("north-india").copied().unwrap();
        let south = penetration.get("south-india").copied().unwrap();
        assert!((north - 0.5).abs() < f64::EPSILON);
        assert!((south - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn unknown_ids_ignored() {
        let mut tracker = ActivationTracker::new(&graph());
        tracker.record(1, &ids(&[99]));
        assert_eq!(tracker.total(), 0);
        assert!(tracker.adoption_curve().is_empty());
    }
}
