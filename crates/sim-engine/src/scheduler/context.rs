//! Turn Context & Fallback Actions
//!
//! Serializes the read-only world slice one agent sees on its turn, and
//! synthesizes replacement invocations when the policy fails or proposes
//! nothing.

use crate::config::SimConfig;
use crate::memory::EventMemory;
use crate::oracle::{PeerView, TurnContext};
use crate::world::WorldStore;
use serde_json::json;
use sim_model::{keys, EffectInvocation, EffectName, EventKind};
use std::collections::BTreeMap;

/// How many trailing signals the context shows.
const CONTEXT_SIGNALS: usize = 3;

/// Lookback window for signals shown in the context.
const CONTEXT_SIGNAL_WINDOW: f64 = 20.0;

pub(crate) fn build_context(
    world: &WorldStore,
    memory: &mut EventMemory,
    config: &SimConfig,
    roster: &[String],
    round: u64,
    actor: &str,
) -> TurnContext {
    let actor_state = world.entity(actor).cloned().unwrap_or_default();

    let peers = roster
        .iter()
        .filter(|id| id.as_str() != actor)
        .map(|id| {
            let entity = world.entity(id);
            PeerView {
                id: id.clone(),
                status: entity
                    .and_then(|e| e.text(keys::STATUS))
                    .unwrap_or("unknown")
                    .to_string(),
                goal: entity
                    .and_then(|e| e.text(keys::GOAL))
                    .unwrap_or("unknown")
                    .to_string(),
            }
        })
        .collect();

    let mut recent_signals: Vec<_> = world
        .recent_signals(CONTEXT_SIGNAL_WINDOW, Some(actor))
        .into_iter()
        .cloned()
        .collect();
    let keep_from = recent_signals.len().saturating_sub(CONTEXT_SIGNALS);
    recent_signals.drain(..keep_from);

    let recent_events = memory
        .recent_events(config.scheduler.recent_history)
        .iter()
        .map(|e| format!("[{:.1}] {} {}", e.timestamp, e.actor, e.action))
        .collect();

    // Knowledge relevant to the agent's goal, when any has accumulated.
    let memory_excerpt = match actor_state.text(keys::GOAL) {
        Some(goal) => memory
            .search_kind(EventKind::Learning, goal)
            .into_iter()
            .filter_map(|hit| {
                hit.event
                    .params
                    .get("knowledge")
                    .and_then(|v| v.as_str())
                    .map(str::to_string)
            })
            .collect(),
        None => Vec::new(),
    };

    TurnContext {
        time: world.time,
        round,
        actor: actor.to_string(),
        actor_state,
        peers,
        recent_signals,
        recent_events,
        memory_excerpt,
    }
}

/// The safe default action substituted on policy failure: a moderate look
/// at the environment.
pub(crate) fn safe_default_invocation(environment_entity: &str) -> EffectInvocation {
    EffectInvocation::new(EffectName::Observe)
        .with_param("entity_id", environment_entity)
        .with_param("resolution", 0.5)
}

/// Synthesizes a replacement when the policy proposes nothing: the effect
/// least used this run (catalogue order breaks ties, so a never-used
/// effect always wins) with neutral parameters.
pub(crate) fn fallback_invocation(
    usage: &BTreeMap<EffectName, u64>,
    actor: &str,
    environment_entity: &str,
) -> EffectInvocation {
    let name = EffectName::all()
        .iter()
        .copied()
        .min_by_key(|name| usage.get(name).copied().unwrap_or(0))
        .unwrap_or(EffectName::Observe);

    match name {
        EffectName::Observe => safe_default_invocation(environment_entity),
        EffectName::Query => EffectInvocation::new(name)
            .with_param("memory_type", "all")
            .with_param("search_term", "escape"),
        EffectName::Detect => EffectInvocation::new(name)
            .with_param("entity_set", json!(["all"]))
            .with_param("pattern_type", "correlation"),
        EffectName::Transfer => EffectInvocation::new(name)
            .with_param("property_name", "supplies")
            .with_param("from_entity", actor)
            .with_param("to_entity", environment_entity)
            .with_param("amount", 1.0),
        EffectName::Modify => EffectInvocation::new(name)
            .with_param("entity_id", actor)
            .with_param("property_name", keys::STRESS_LEVEL)
            .with_param("operation", "add")
            .with_param("value", 0.0),
        EffectName::Connect => EffectInvocation::new(name)
            .with_param("entity_a", actor)
            .with_param("entity_b", environment_entity)
            .with_param("strength", 0.0),
        EffectName::Signal => EffectInvocation::new(name)
            .with_param("message", "status check")
            .with_param("intensity", 3)
            .with_param("target", "all"),
        EffectName::Receive => {
            EffectInvocation::new(name).with_param("time_window", CONTEXT_SIGNAL_WINDOW)
        }
        EffectName::Store => EffectInvocation::new(name)
            .with_param("knowledge", "situation unchanged")
            .with_param("confidence", 0.3),
        EffectName::Compute => EffectInvocation::new(name)
            .with_param("operation", "analyze")
            .with_param("inputs", json!([])),
    }
}
