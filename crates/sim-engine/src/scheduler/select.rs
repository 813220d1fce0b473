//! Actor Selection
//!
//! Weighted random choice over the eligible roster. Stress raises an
//! agent's weight, very recent activity lowers it, and the urgency flag
//! multiplies it; a degenerate zero-weight total falls back to uniform
//! choice so no agent can starve.

use crate::config::SchedulerConfig;
use crate::memory::EventMemory;
use crate::world::WorldStore;
use rand::rngs::SmallRng;
use rand::Rng;

/// Agents that may act this round: stress below saturation and status
/// "active".
pub(crate) fn eligible_agents(world: &WorldStore, roster: &[String]) -> Vec<String> {
    roster
        .iter()
        .filter(|id| {
            world
                .entity(id)
                .map_or(false, |e| e.stress_level() < 1.0 && e.is_active())
        })
        .cloned()
        .collect()
}

/// Selection weight for one agent.
pub(crate) fn selection_weight(
    world: &WorldStore,
    memory: &EventMemory,
    config: &SchedulerConfig,
    agent: &str,
) -> f64 {
    let Some(entity) = world.entity(agent) else {
        return 0.0;
    };

    let mut weight = 1.0 + entity.stress_level() * config.stress_weight;

    let acted_recently = memory
        .recent_events(config.recency_penalty_window)
        .iter()
        .any(|e| e.actor == agent);
    if acted_recently {
        weight *= config.recency_penalty;
    }

    if entity.has_urgency() {
        weight *= config.urgency_bonus;
    }

    weight
}

/// Weighted random selection over `eligible`. Returns None only for an
/// empty slate.
pub(crate) fn select_next_actor(
    world: &WorldStore,
    memory: &EventMemory,
    config: &SchedulerConfig,
    rng: &mut SmallRng,
    eligible: &[String],
) -> Option<String> {
    if eligible.is_empty() {
        return None;
    }

    let weights: Vec<f64> = eligible
        .iter()
        .map(|agent| selection_weight(world, memory, config, agent))
        .collect();
    let total: f64 = weights.iter().sum();

    // Uniform fallback keeps zero-weight agents selectable.
    if total <= 0.0 {
        return Some(eligible[rng.gen_range(0..eligible.len())].clone());
    }

    let roll = rng.gen_range(0.0..total);
    let mut cumulative = 0.0;
    for (agent, weight) in eligible.iter().zip(&weights) {
        cumulative += weight;
        if roll <= cumulative {
            return Some(agent.clone());
        }
    }
    eligible.last().cloned()
}
