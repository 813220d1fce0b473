//! Scenario Setup
//!
//! Seeds the world for a named scenario. An unknown scenario id is the one
//! fatal error class in the engine: it aborts before any round executes.

use crate::config::EnvironmentConfig;
use crate::error::SetupError;
use crate::world::WorldStore;
use sim_model::{keys, AttrValue, Entity};

/// The only scenario currently known.
pub const SAFEHOUSE: &str = "safehouse";

/// Names of the agents the safehouse scenario seeds.
pub const SAFEHOUSE_AGENTS: &[&str] = &["AGENT_A", "AGENT_B", "AGENT_C"];

/// Builds the initial world for `name` and returns it with the agent
/// roster.
pub fn setup_scenario(
    name: &str,
    config: &EnvironmentConfig,
) -> Result<(WorldStore, Vec<String>), SetupError> {
    match name {
        SAFEHOUSE => Ok(setup_safehouse(config)),
        other => Err(SetupError::UnknownScenario(other.to_string())),
    }
}

/// Three agents trapped in a safehouse under rising threat; the exit door
/// barrier must be worn down to escape.
fn setup_safehouse(config: &EnvironmentConfig) -> (WorldStore, Vec<String>) {
    let mut world = WorldStore::new();

    let roster: Vec<String> = SAFEHOUSE_AGENTS.iter().map(|s| s.to_string()).collect();
    for agent in &roster {
        world.add_entity(
            agent,
            Entity::from_attrs([
                (keys::STATUS, AttrValue::from("active")),
                (keys::GOAL, AttrValue::from("escape_safehouse")),
                (keys::LOCATION, AttrValue::from("safehouse_interior")),
                (keys::STRESS_LEVEL, AttrValue::from(0.0)),
            ]),
        );
    }

    world.add_entity(
        &config.environment_entity,
        Entity::from_attrs([
            (keys::STATUS, AttrValue::from("active")),
            (keys::LOCATION, AttrValue::from("safehouse")),
            (keys::THREAT_LEVEL, AttrValue::from(0.0)),
            (keys::ESCALATION_RATE, AttrValue::from(config.escalation_rate)),
            ("escape_route", AttrValue::from("unknown")),
            (
                "exits",
                AttrValue::List(vec![
                    "front_door".into(),
                    "back_door".into(),
                    "window".into(),
                ]),
            ),
        ]),
    );

    world.add_entity(
        "front_door",
        Entity::from_attrs([
            (keys::STATUS, AttrValue::from("locked")),
            ("type", AttrValue::from("exit")),
            ("difficulty", AttrValue::from("high")),
        ]),
    );
    world.add_entity(
        "back_door",
        Entity::from_attrs([
            (keys::STATUS, AttrValue::from("locked")),
            ("type", AttrValue::from("exit")),
            ("difficulty", AttrValue::from("medium")),
        ]),
    );
    world.add_entity(
        "window",
        Entity::from_attrs([
            (keys::STATUS, AttrValue::from("accessible")),
            ("type", AttrValue::from("exit")),
            ("difficulty", AttrValue::from("low")),
        ]),
    );

    world.add_entity(
        &config.barrier_entity,
        Entity::from_attrs([
            (keys::STATUS, AttrValue::from("sealed")),
            ("type", AttrValue::from("barrier")),
            (keys::BARRIER_STRENGTH, AttrValue::from(100.0)),
        ]),
    );

    tracing::info!(
        scenario = SAFEHOUSE,
        agents = roster.len(),
        "scenario initialized"
    );
    (world, roster)
}
