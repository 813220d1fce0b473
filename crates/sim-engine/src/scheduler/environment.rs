//! Environmental Pressure
//!
//! The per-round threat ratchet and its side effects. Threat only ever
//! rises; once it crosses the activation point every agent gains the
//! urgency flag and a mirror of the current threat level. Stale signals are
//! evicted in the same pass.

use crate::config::EnvironmentConfig;
use crate::world::WorldStore;
use sim_model::keys;

/// Threat assumed when the environment entity carries no threat attribute.
const IMPLICIT_BASE_THREAT: f64 = 0.1;

/// Advances environmental pressure one step. Returns the new threat level.
pub(crate) fn update_environment(
    world: &mut WorldStore,
    config: &EnvironmentConfig,
    roster: &[String],
) -> f64 {
    let Some(environment) = world.entity(&config.environment_entity) else {
        return 0.0;
    };

    let current = environment
        .number(keys::THREAT_LEVEL)
        .unwrap_or(IMPLICIT_BASE_THREAT);
    let rate = environment
        .number(keys::ESCALATION_RATE)
        .unwrap_or(config.escalation_rate);
    let new_threat = (current + rate * config.step_factor).min(1.0);

    world.set_attr(&config.environment_entity, keys::THREAT_LEVEL, new_threat);

    if new_threat > config.urgency_threshold {
        for agent in roster {
            if world.contains_entity(agent) {
                world.set_attr(agent, keys::URGENCY, true);
                world.set_attr(agent, keys::THREAT_LEVEL, new_threat);
            }
        }
    }

    world.evict_signals(config.signal_retention);
    tracing::debug!(threat = new_threat, "environment updated");
    new_threat
}
