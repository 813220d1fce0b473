//! World Store
//!
//! Holds entities (attribute bags) and ephemeral broadcast signals with a
//! logical timestamp. Entities live for the process lifetime; signals are
//! evicted once older than the retention window. The store is mutated only
//! by the scheduler thread, through the effect catalogue.

use sim_model::{Entity, Signal};
use std::collections::BTreeMap;

/// The shared mutable world.
#[derive(Debug, Clone, Default)]
pub struct WorldStore {
    /// Logical simulation time
    pub time: f64,
    entities: BTreeMap<String, Entity>,
    signals: Vec<Signal>,
    next_signal_seq: u64,
}

impl WorldStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance_time(&mut self, dt: f64) {
        self.time += dt;
    }

    /// Adds or replaces an entity.
    pub fn add_entity(&mut self, id: impl Into<String>, entity: Entity) {
        self.entities.insert(id.into(), entity);
    }

    pub fn entity(&self, id: &str) -> Option<&Entity> {
        self.entities.get(id)
    }

    /// Mutable access, creating an empty entity if absent. Attribute writes
    /// through the effect catalogue may create entities on the fly.
    pub fn entity_mut(&mut self, id: &str) -> &mut Entity {
        self.entities.entry(id.to_string()).or_default()
    }

    pub fn contains_entity(&self, id: &str) -> bool {
        self.entities.contains_key(id)
    }

    pub fn entity_ids(&self) -> impl Iterator<Item = &str> {
        self.entities.keys().map(String::as_str)
    }

    pub fn entities(&self) -> impl Iterator<Item = (&str, &Entity)> {
        self.entities.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Sets a single attribute, creating the entity if needed.
    pub fn set_attr(
        &mut self,
        entity_id: &str,
        key: impl Into<String>,
        value: impl Into<sim_model::AttrValue>,
    ) {
        self.entity_mut(entity_id).set(key, value);
    }

    /// Entity ids that look like agents (carry a goal, stress level or role).
    pub fn agent_ids(&self) -> Vec<String> {
        self.entities
            .iter()
            .filter(|(_, e)| e.looks_like_agent())
            .map(|(id, _)| id.clone())
            .collect()
    }

    /// Appends a signal, assigning the next sequence id.
    pub fn add_signal(
        &mut self,
        sender: impl Into<String>,
        message: impl Into<String>,
        intensity: i64,
        target: impl Into<String>,
    ) -> u64 {
        let seq = self.next_signal_seq;
        self.next_signal_seq += 1;
        self.signals
            .push(Signal::new(sender, message, intensity, target, self.time, seq));
        seq
    }

    pub fn signals(&self) -> &[Signal] {
        &self.signals
    }

    /// Signals within the trailing time window, optionally filtered to those
    /// addressed to a receiver (directly or via broadcast).
    pub fn recent_signals(&self, window: f64, receiver: Option<&str>) -> Vec<&Signal> {
        let cutoff = self.time - window;
        self.signals
            .iter()
            .filter(|s| s.timestamp >= cutoff)
            .filter(|s| receiver.map_or(true, |r| s.addressed_to(r)))
            .collect()
    }

    /// Removes signals older than the retention window.
    pub fn evict_signals(&mut self, max_age: f64) {
        let cutoff = self.time - max_age;
        self.signals.retain(|s| s.timestamp >= cutoff);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sim_model::keys;

    #[test]
    fn test_entity_lifecycle() {
        let mut world = WorldStore::new();
        world.add_entity(
            "AGENT_A",
            Entity::from_attrs([(keys::STATUS, "active"), (keys::GOAL, "escape_safehouse")]),
        );

        assert!(world.contains_entity("AGENT_A"));
        assert!(world.entity("AGENT_A").unwrap().is_active());
        assert!(world.entity("missing").is_none());
    }

    #[test]
    fn test_set_attr_creates_entity() {
        let mut world = WorldStore::new();
        world.set_attr("door", keys::STATUS, "locked");
        assert_eq!(world.entity("door").unwrap().text(keys::STATUS), Some("locked"));
    }

    #[test]
    fn test_agent_ids_heuristic() {
        let mut world = WorldStore::new();
        world.add_entity("AGENT_A", Entity::from_attrs([(keys::STRESS_LEVEL, 0.1)]));
        world.add_entity("front_door", Entity::from_attrs([(keys::STATUS, "locked")]));

        assert_eq!(world.agent_ids(), vec!["AGENT_A".to_string()]);
    }

    #[test]
    fn test_signal_sequence_and_window() {
        let mut world = WorldStore::new();
        world.add_signal("AGENT_A", "early", 5, "all");
        world.advance_time(50.0);
        let seq = world.add_signal("AGENT_B", "late", 5, "AGENT_A");
        assert_eq!(seq, 1);

        // Window of 20 covers only the late signal.
        let recent = world.recent_signals(20.0, None);
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].message, "late");

        // Receiver filter: the late signal targets AGENT_A.
        assert_eq!(world.recent_signals(20.0, Some("AGENT_A")).len(), 1);
        assert_eq!(world.recent_signals(20.0, Some("AGENT_C")).len(), 0);
    }

    #[test]
    fn test_signal_eviction() {
        let mut world = WorldStore::new();
        world.add_signal("a", "old", 5, "all");
        world.advance_time(150.0);
        world.add_signal("a", "fresh", 5, "all");

        world.evict_signals(100.0);
        assert_eq!(world.signals().len(), 1);
        assert_eq!(world.signals()[0].message, "fresh");
    }
}
