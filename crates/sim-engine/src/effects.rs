//! Effect Catalogue
//!
//! The ten named operations agents use to act on the world. Every call
//! returns a uniform reply; failures are data (`success: false` plus a
//! reason), never errors, so a bad call still produces a loggable event and
//! the turn continues.
//!
//! The executor itself is almost stateless; it only tracks per-entity
//! observation counts to signal diminishing returns on repeat observation.

use crate::memory::{EventMemory, KindSelector, QueryResult, ScoredEvent};
use crate::world::WorldStore;
use rand::rngs::SmallRng;
use rand::Rng;
use serde_json::{json, Map, Value};
use sim_model::{keys, AttrValue, EffectInvocation, EffectName, EffectReply, Entity};
use std::collections::BTreeMap;

/// Default lookback for receive calls that omit a time window.
const DEFAULT_RECEIVE_WINDOW: f64 = 100.0;

/// Executes effect invocations against the world and memory.
#[derive(Debug, Default)]
pub struct EffectExecutor {
    observation_counts: BTreeMap<String, u32>,
}

impl EffectExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Dispatches one invocation. `actor` is the acting agent; it supplies
    /// the sender/receiver/discoverer identity the individual effects need.
    pub fn apply(
        &mut self,
        world: &mut WorldStore,
        memory: &mut EventMemory,
        rng: &mut SmallRng,
        actor: &str,
        invocation: &EffectInvocation,
    ) -> EffectReply {
        match invocation.name {
            EffectName::Observe => self.observe(world, invocation),
            EffectName::Query => query(memory, invocation),
            EffectName::Detect => detect(world, invocation),
            EffectName::Transfer => transfer(world, invocation),
            EffectName::Modify => modify(world, invocation),
            EffectName::Connect => connect(memory, invocation),
            EffectName::Signal => signal(world, actor, invocation),
            EffectName::Receive => receive(world, actor, invocation),
            EffectName::Store => store(memory, actor, invocation),
            EffectName::Compute => compute(rng, invocation),
        }
    }

    /// Reads an entity at a caller-chosen resolution. Low resolution hides
    /// everything but existence and role; moderate resolution hides
    /// underscore-prefixed attributes; full resolution returns the whole
    /// bag. Repeat observations of the same entity are flagged.
    fn observe(&mut self, world: &WorldStore, invocation: &EffectInvocation) -> EffectReply {
        let Some(entity_id) = invocation.str_param("entity_id") else {
            return missing_param("entity_id");
        };
        let resolution = invocation.num_param("resolution").unwrap_or(0.5).clamp(0.0, 1.0);

        let count = {
            let counter = self
                .observation_counts
                .entry(entity_id.to_string())
                .or_insert(0);
            *counter += 1;
            *counter
        };

        let Some(entity) = world.entity(entity_id) else {
            let available: Vec<Value> =
                world.entity_ids().map(|id| json!(id)).collect();
            return EffectReply::fail("entity_not_found").with("available_entities", available);
        };

        let mut observations = if resolution < 0.3 {
            let role = entity.text(keys::ROLE).unwrap_or("object");
            let mut basic = Map::new();
            basic.insert("exists".into(), json!(true));
            basic.insert("type".into(), json!(role));
            basic
        } else if resolution < 0.7 {
            entity
                .attrs
                .iter()
                .filter(|(key, _)| !key.starts_with('_'))
                .map(|(key, value)| (key.clone(), attr_to_json(value)))
                .collect()
        } else {
            entity
                .attrs
                .iter()
                .map(|(key, value)| (key.clone(), attr_to_json(value)))
                .collect()
        };

        if count > 2 {
            observations.insert(
                "note".into(),
                json!(format!(
                    "You've observed this {count} times. Little new information gained."
                )),
            );
        } else if count > 1 {
            observations.insert(
                "note".into(),
                json!("Familiar entity - minimal new information."),
            );
        }

        EffectReply::ok()
            .with("observations", Value::Object(observations))
            .with("resolution_used", json!(resolution))
    }
}

/// Semantic search over memory. `memory_type` selects one event kind,
/// "all" for a per-kind fan-out, or the pattern/relationship stores.
/// Unknown types yield empty results, not failures.
fn query(memory: &mut EventMemory, invocation: &EffectInvocation) -> EffectReply {
    let search_term = invocation.str_param("search_term").unwrap_or("");
    let memory_type = invocation.str_param("memory_type").unwrap_or("all");

    let results = if memory_type == "patterns" {
        let needle = search_term.to_lowercase();
        let matched: Vec<Value> = memory
            .patterns()
            .iter()
            .filter(|p| p.description.to_lowercase().contains(&needle))
            .filter_map(|p| serde_json::to_value(p).ok())
            .collect();
        json!(matched)
    } else if memory_type == "relationships" {
        let matched: Map<String, Value> = memory
            .relationships()
            .iter()
            .filter(|(key, _)| key.contains(search_term))
            .map(|(key, strength)| (key.clone(), json!(strength)))
            .collect();
        Value::Object(matched)
    } else if let Some(selector) = KindSelector::parse(memory_type) {
        match memory.query(selector, search_term) {
            QueryResult::Single(hits) => json!(hits_to_json(&hits)),
            QueryResult::ByKind(map) => {
                let by_kind: Map<String, Value> = map
                    .into_iter()
                    .map(|(kind, hits)| (kind.as_str().to_string(), json!(hits_to_json(&hits))))
                    .collect();
                Value::Object(by_kind)
            }
        }
    } else {
        json!([])
    };

    EffectReply::ok()
        .with("results", results)
        .with("search_term", json!(search_term))
}

fn hits_to_json(hits: &[ScoredEvent]) -> Vec<Value> {
    hits.iter()
        .filter_map(|hit| {
            let mut value = serde_json::to_value(&hit.event).ok()?;
            if let (Some(obj), Some(similarity)) = (value.as_object_mut(), hit.similarity) {
                obj.insert("similarity".into(), json!(similarity));
            }
            Some(value)
        })
        .collect()
}

/// Pattern detection over a set of entities. Correlation over two or more
/// entities reports their common attribute keys; everything else reports
/// the no-pattern sentinel at low confidence.
fn detect(world: &WorldStore, invocation: &EffectInvocation) -> EffectReply {
    let entity_set: Vec<String> = invocation
        .param("entity_set")
        .and_then(Value::as_array)
        .map(|ids| {
            ids.iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();
    let pattern_type = invocation.str_param("pattern_type").unwrap_or("correlation");

    let mut entities: Vec<&Entity> = Vec::new();
    for id in &entity_set {
        if id == "all" {
            entities.extend(world.entities().map(|(_, e)| e));
        } else if let Some(entity) = world.entity(id) {
            entities.push(entity);
        }
    }

    if pattern_type == "correlation" && entities.len() > 1 {
        let mut common: Vec<&str> = entities[0].attrs.keys().map(String::as_str).collect();
        for entity in &entities[1..] {
            common.retain(|key| entity.attrs.contains_key(*key));
        }
        return EffectReply::ok()
            .with("pattern", json!(format!("Common properties: {common:?}")))
            .with("confidence", json!(0.7))
            .with("entity_count", json!(entities.len()));
    }

    EffectReply::ok()
        .with("pattern", json!("no_significant_pattern"))
        .with("confidence", json!(0.1))
}

/// Moves a property between entities. Numbers are debited and credited,
/// lists are split by count or moved wholesale with "all", strings move
/// entirely and leave the source empty.
fn transfer(world: &mut WorldStore, invocation: &EffectInvocation) -> EffectReply {
    let Some(property) = invocation.str_param("property_name") else {
        return missing_param("property_name");
    };
    let Some(from_id) = invocation.str_param("from_entity") else {
        return missing_param("from_entity");
    };
    let Some(to_id) = invocation.str_param("to_entity") else {
        return missing_param("to_entity");
    };
    let property = property.to_string();
    let (from_id, to_id) = (from_id.to_string(), to_id.to_string());
    let amount = invocation.param("amount").cloned().unwrap_or(json!("all"));

    if !world.contains_entity(&from_id) || !world.contains_entity(&to_id) {
        return EffectReply::fail("entity_not_found");
    }

    let Some(current) = world.entity(&from_id).and_then(|e| e.get(&property)).cloned() else {
        return EffectReply::fail(format!("{from_id} doesn't have {property}"));
    };

    match current {
        AttrValue::Number(have) => {
            let Some(wanted) = amount.as_f64() else {
                return EffectReply::fail("invalid_amount_for_number");
            };
            if have < wanted {
                return EffectReply::fail("insufficient_quantity");
            }
            let receiving = world
                .entity(&to_id)
                .and_then(|e| e.number(&property))
                .unwrap_or(0.0);
            world.set_attr(&from_id, &property, have - wanted);
            world.set_attr(&to_id, &property, receiving + wanted);
            EffectReply::ok()
                .with("transferred", json!(wanted))
                .with("from_remaining", json!(have - wanted))
        }
        AttrValue::List(items) => {
            let moved: Vec<AttrValue> = if amount == json!("all") {
                world.set_attr(&from_id, &property, AttrValue::List(Vec::new()));
                items
            } else if let Some(n) = amount.as_u64().map(|n| n as usize) {
                if n > items.len() {
                    return EffectReply::fail("invalid_amount_for_list");
                }
                let (moved, kept) = items.split_at(n);
                let moved = moved.to_vec();
                world.set_attr(&from_id, &property, AttrValue::List(kept.to_vec()));
                moved
            } else {
                return EffectReply::fail("invalid_amount_for_list");
            };

            let mut receiving = world
                .entity(&to_id)
                .and_then(|e| e.get(&property))
                .and_then(|v| v.as_list().map(<[AttrValue]>::to_vec))
                .unwrap_or_default();
            receiving.extend(moved.iter().cloned());
            world.set_attr(&to_id, &property, AttrValue::List(receiving));
            EffectReply::ok().with("transferred", json!(attrs_to_json(&moved)))
        }
        AttrValue::Text(text) => {
            world.set_attr(&to_id, &property, text.clone());
            world.set_attr(&from_id, &property, "");
            EffectReply::ok().with("transferred", json!(text))
        }
        _ => EffectReply::fail("unsupported_property_type"),
    }
}

/// Direct attribute mutation: set, add, multiply, or append. Unlike
/// attribute writes elsewhere, modify refuses to create entities.
fn modify(world: &mut WorldStore, invocation: &EffectInvocation) -> EffectReply {
    let Some(entity_id) = invocation.str_param("entity_id") else {
        return missing_param("entity_id");
    };
    let Some(property) = invocation.str_param("property_name") else {
        return missing_param("property_name");
    };
    let operation = invocation.str_param("operation").unwrap_or("set");
    let value = invocation.param("value").cloned().unwrap_or(Value::Null);
    let (entity_id, property) = (entity_id.to_string(), property.to_string());

    if !world.contains_entity(&entity_id) {
        return EffectReply::fail("entity_not_found");
    }

    let old = world
        .entity(&entity_id)
        .and_then(|e| e.get(&property))
        .cloned();
    let old_json = old.as_ref().map_or(Value::Null, attr_to_json);

    let new = match (operation, &old) {
        ("set", _) => json_to_attr(&value),
        ("add", Some(AttrValue::Number(n))) => value.as_f64().map(|v| AttrValue::Number(n + v)),
        ("multiply", Some(AttrValue::Number(n))) => {
            value.as_f64().map(|v| AttrValue::Number(n * v))
        }
        ("append", Some(AttrValue::List(items))) => {
            let mut items = items.clone();
            match &value {
                Value::Array(more) => items.extend(more.iter().filter_map(json_to_attr)),
                other => {
                    if let Some(attr) = json_to_attr(other) {
                        items.push(attr);
                    }
                }
            }
            Some(AttrValue::List(items))
        }
        _ => None,
    };

    let Some(new) = new else {
        return EffectReply::fail("invalid_operation_or_type");
    };
    let new_json = attr_to_json(&new);
    world.set_attr(&entity_id, &property, new);

    EffectReply::ok()
        .with("old_value", old_json)
        .with("new_value", new_json)
}

/// Records a directed relationship in memory. The relationship map is the
/// single source of truth; entities never mirror it.
fn connect(memory: &mut EventMemory, invocation: &EffectInvocation) -> EffectReply {
    let Some(entity_a) = invocation.str_param("entity_a") else {
        return missing_param("entity_a");
    };
    let Some(entity_b) = invocation.str_param("entity_b") else {
        return missing_param("entity_b");
    };
    let strength = invocation.num_param("strength").unwrap_or(0.0).clamp(-1.0, 1.0);

    memory.update_relationship(entity_a, entity_b, strength);

    let kind = if strength > 0.0 {
        "trust"
    } else if strength < 0.0 {
        "distrust"
    } else {
        "neutral"
    };
    EffectReply::ok()
        .with("connection_id", json!(format!("{entity_a}<->{entity_b}")))
        .with("strength", json!(strength))
        .with("type", json!(kind))
}

/// Broadcasts a message at a clamped intensity to "all" or a named target.
fn signal(world: &mut WorldStore, actor: &str, invocation: &EffectInvocation) -> EffectReply {
    let Some(message) = invocation.str_param("message") else {
        return missing_param("message");
    };
    let intensity = invocation.num_param("intensity").unwrap_or(5.0) as i64;
    let target = invocation.str_param("target").unwrap_or(sim_model::BROADCAST_TARGET);
    let (message, target) = (message.to_string(), target.to_string());

    let sequence = world.add_signal(actor, message, intensity, &target);
    let delivered = world
        .signals()
        .iter()
        .find(|s| s.sequence == sequence)
        .map_or(5, |s| s.intensity);

    EffectReply::ok()
        .with("message_id", json!(sequence))
        .with("delivered_to", json!(target))
        .with("intensity", json!(delivered))
}

/// Collects recent signals addressed to the actor, excluding their own,
/// optionally filtered by sender and minimum intensity.
fn receive(world: &WorldStore, actor: &str, invocation: &EffectInvocation) -> EffectReply {
    let window = invocation
        .num_param("time_window")
        .unwrap_or(DEFAULT_RECEIVE_WINDOW);
    let criteria = invocation
        .param("filter_criteria")
        .and_then(Value::as_object)
        .cloned()
        .unwrap_or_default();

    let matched: Vec<Value> = world
        .recent_signals(window, Some(actor))
        .into_iter()
        .filter(|s| s.sender != actor)
        .filter(|s| {
            criteria.iter().all(|(key, value)| match key.as_str() {
                "sender" => value.as_str() == Some(s.sender.as_str()),
                "min_intensity" => {
                    value.as_f64().map_or(false, |min| f64::from(s.intensity) >= min)
                }
                "target" => value.as_str() == Some(s.target.as_str()),
                _ => true,
            })
        })
        .filter_map(|s| serde_json::to_value(s).ok())
        .collect();

    let count = matched.len();
    EffectReply::ok()
        .with("signals", json!(matched))
        .with("count", json!(count))
}

/// Saves an insight to the shared pattern store under a generated name.
fn store(memory: &mut EventMemory, actor: &str, invocation: &EffectInvocation) -> EffectReply {
    let Some(knowledge) = invocation.str_param("knowledge") else {
        return missing_param("knowledge");
    };
    let confidence = invocation.num_param("confidence").unwrap_or(0.9);

    let name = format!("insight_{}", memory.patterns().len());
    let id = memory.add_pattern(name, knowledge, confidence, actor);

    EffectReply::ok()
        .with("pattern_id", json!(id))
        .with("stored_knowledge", json!(knowledge))
}

/// Derives a value from a list of inputs. Sum and average are exact;
/// correlate and predict are stochastic placeholders drawn from the run's
/// seeded generator, so runs stay reproducible.
fn compute(rng: &mut SmallRng, invocation: &EffectInvocation) -> EffectReply {
    let operation = invocation.str_param("operation").unwrap_or("analyze");
    let inputs: Vec<Value> = invocation
        .param("inputs")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();

    let numbers: Option<Vec<f64>> = inputs.iter().map(Value::as_f64).collect();

    let result = match operation {
        "sum" => match &numbers {
            Some(ns) => json!(ns.iter().sum::<f64>()),
            None => return EffectReply::fail("non_numeric_inputs"),
        },
        "average" => match &numbers {
            Some(ns) if !ns.is_empty() => json!(ns.iter().sum::<f64>() / ns.len() as f64),
            Some(_) => json!(0.0),
            None => return EffectReply::fail("non_numeric_inputs"),
        },
        "correlate" => json!({
            "correlation": if rng.gen_bool(0.5) { "positive" } else { "negative" },
            "strength": rng.gen::<f64>(),
        }),
        "predict" => json!({
            "prediction": "cooperation_beneficial",
            "confidence": rng.gen_range(0.3..0.9),
        }),
        "analyze" => json!({
            "analysis": format!("Processed {} data points", inputs.len()),
            "insights": ["pattern_detected"],
        }),
        _ => return EffectReply::fail("unsupported_operation"),
    };

    EffectReply::ok()
        .with("result", result)
        .with("operation", json!(operation))
}

fn missing_param(name: &str) -> EffectReply {
    EffectReply::fail(format!("missing_parameter: {name}"))
}

fn attr_to_json(value: &AttrValue) -> Value {
    serde_json::to_value(value).unwrap_or(Value::Null)
}

fn attrs_to_json(values: &[AttrValue]) -> Vec<Value> {
    values.iter().map(attr_to_json).collect()
}

fn json_to_attr(value: &Value) -> Option<AttrValue> {
    serde_json::from_value(value.clone()).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MemoryConfig;
    use rand::SeedableRng;
    use sim_model::EventKind;

    struct Fixture {
        world: WorldStore,
        memory: EventMemory,
        rng: SmallRng,
        executor: EffectExecutor,
    }

    fn fixture() -> Fixture {
        let mut world = WorldStore::new();
        world.add_entity(
            "AGENT_A",
            Entity::from_attrs([
                (keys::STATUS, AttrValue::from("active")),
                (keys::GOAL, AttrValue::from("escape_safehouse")),
                ("supplies", AttrValue::from(10.0)),
            ]),
        );
        world.add_entity(
            "AGENT_B",
            Entity::from_attrs([
                (keys::STATUS, AttrValue::from("active")),
                (keys::GOAL, AttrValue::from("escape_safehouse")),
            ]),
        );
        world.add_entity(
            "exit_door",
            Entity::from_attrs([(keys::BARRIER_STRENGTH, AttrValue::from(100.0))]),
        );
        Fixture {
            world,
            memory: EventMemory::new(MemoryConfig::default()),
            rng: SmallRng::seed_from_u64(7),
            executor: EffectExecutor::new(),
        }
    }

    fn apply(fx: &mut Fixture, actor: &str, invocation: EffectInvocation) -> EffectReply {
        fx.executor
            .apply(&mut fx.world, &mut fx.memory, &mut fx.rng, actor, &invocation)
    }

    #[test]
    fn test_observe_resolution_tiers() {
        let mut fx = fixture();

        let basic = apply(
            &mut fx,
            "AGENT_B",
            EffectInvocation::new(EffectName::Observe)
                .with_param("entity_id", "AGENT_A")
                .with_param("resolution", 0.1),
        );
        let obs = basic.get("observations").unwrap();
        assert_eq!(obs["exists"], json!(true));
        assert!(obs.get("supplies").is_none());

        let full = apply(
            &mut fx,
            "AGENT_B",
            EffectInvocation::new(EffectName::Observe)
                .with_param("entity_id", "AGENT_A")
                .with_param("resolution", 0.9),
        );
        assert_eq!(full.get("observations").unwrap()["supplies"], json!(10.0));
    }

    #[test]
    fn test_observe_diminishing_returns_note() {
        let mut fx = fixture();
        let call = || {
            EffectInvocation::new(EffectName::Observe)
                .with_param("entity_id", "exit_door")
                .with_param("resolution", 0.5)
        };

        let first = apply(&mut fx, "AGENT_A", call());
        assert!(first.get("observations").unwrap().get("note").is_none());

        apply(&mut fx, "AGENT_A", call());
        let third = apply(&mut fx, "AGENT_A", call());
        let note = third.get("observations").unwrap()["note"].as_str().unwrap().to_string();
        assert!(note.contains("3 times"));
    }

    #[test]
    fn test_observe_unknown_entity_lists_available() {
        let mut fx = fixture();
        let reply = apply(
            &mut fx,
            "AGENT_A",
            EffectInvocation::new(EffectName::Observe).with_param("entity_id", "ghost"),
        );
        assert!(!reply.success);
        assert_eq!(reply.error.as_deref(), Some("entity_not_found"));
        let available = reply.get("available_entities").unwrap().as_array().unwrap();
        assert!(available.contains(&json!("exit_door")));
    }

    #[test]
    fn test_transfer_numeric_and_insufficient() {
        let mut fx = fixture();
        let reply = apply(
            &mut fx,
            "AGENT_A",
            EffectInvocation::new(EffectName::Transfer)
                .with_param("property_name", "supplies")
                .with_param("from_entity", "AGENT_A")
                .with_param("to_entity", "AGENT_B")
                .with_param("amount", 4.0),
        );
        assert!(reply.success);
        assert_eq!(reply.get_f64("from_remaining"), Some(6.0));
        assert_eq!(fx.world.entity("AGENT_B").unwrap().number("supplies"), Some(4.0));

        let broke = apply(
            &mut fx,
            "AGENT_A",
            EffectInvocation::new(EffectName::Transfer)
                .with_param("property_name", "supplies")
                .with_param("from_entity", "AGENT_A")
                .with_param("to_entity", "AGENT_B")
                .with_param("amount", 50.0),
        );
        assert_eq!(broke.error.as_deref(), Some("insufficient_quantity"));
    }

    #[test]
    fn test_transfer_list_and_text() {
        let mut fx = fixture();
        fx.world.set_attr(
            "AGENT_A",
            "tools",
            AttrValue::List(vec!["rope".into(), "wire".into(), "knife".into()]),
        );
        fx.world.set_attr("AGENT_A", "intel", "door code 7142");

        let two = apply(
            &mut fx,
            "AGENT_A",
            EffectInvocation::new(EffectName::Transfer)
                .with_param("property_name", "tools")
                .with_param("from_entity", "AGENT_A")
                .with_param("to_entity", "AGENT_B")
                .with_param("amount", 2),
        );
        assert!(two.success);
        let remaining = fx.world.entity("AGENT_A").unwrap().get("tools").unwrap();
        assert_eq!(remaining.as_list().unwrap().len(), 1);

        let text = apply(
            &mut fx,
            "AGENT_A",
            EffectInvocation::new(EffectName::Transfer)
                .with_param("property_name", "intel")
                .with_param("from_entity", "AGENT_A")
                .with_param("to_entity", "AGENT_B")
                .with_param("amount", "all"),
        );
        assert_eq!(text.get_str("transferred"), Some("door code 7142"));
        assert_eq!(fx.world.entity("AGENT_A").unwrap().text("intel"), Some(""));
        assert_eq!(
            fx.world.entity("AGENT_B").unwrap().text("intel"),
            Some("door code 7142")
        );
    }

    #[test]
    fn test_modify_operations() {
        let mut fx = fixture();

        let add = apply(
            &mut fx,
            "AGENT_A",
            EffectInvocation::new(EffectName::Modify)
                .with_param("entity_id", "exit_door")
                .with_param("property_name", keys::BARRIER_STRENGTH)
                .with_param("operation", "add")
                .with_param("value", -30.0),
        );
        assert!(add.success);
        assert_eq!(add.get_f64("new_value"), Some(70.0));

        let bad = apply(
            &mut fx,
            "AGENT_A",
            EffectInvocation::new(EffectName::Modify)
                .with_param("entity_id", "exit_door")
                .with_param("property_name", keys::BARRIER_STRENGTH)
                .with_param("operation", "append")
                .with_param("value", 1.0),
        );
        assert_eq!(bad.error.as_deref(), Some("invalid_operation_or_type"));

        let ghost = apply(
            &mut fx,
            "AGENT_A",
            EffectInvocation::new(EffectName::Modify)
                .with_param("entity_id", "ghost")
                .with_param("property_name", "x")
                .with_param("operation", "set")
                .with_param("value", 1.0),
        );
        assert_eq!(ghost.error.as_deref(), Some("entity_not_found"));
    }

    #[test]
    fn test_connect_writes_only_the_relationship_map() {
        let mut fx = fixture();
        let reply = apply(
            &mut fx,
            "AGENT_A",
            EffectInvocation::new(EffectName::Connect)
                .with_param("entity_a", "AGENT_A")
                .with_param("entity_b", "AGENT_B")
                .with_param("strength", 2.0),
        );

        assert_eq!(reply.get_f64("strength"), Some(1.0));
        assert_eq!(reply.get_str("type"), Some("trust"));
        assert_eq!(fx.memory.relationship("AGENT_A", "AGENT_B"), Some(1.0));
        // Entities carry no mirror copy.
        assert!(fx.world.entity("AGENT_A").unwrap().get("relationships").is_none());
    }

    #[test]
    fn test_signal_and_receive_with_filters() {
        let mut fx = fixture();
        apply(
            &mut fx,
            "AGENT_A",
            EffectInvocation::new(EffectName::Signal)
                .with_param("message", "back door clear")
                .with_param("intensity", 8)
                .with_param("target", "all"),
        );
        apply(
            &mut fx,
            "AGENT_B",
            EffectInvocation::new(EffectName::Signal)
                .with_param("message", "hold position")
                .with_param("intensity", 2)
                .with_param("target", "AGENT_A"),
        );

        // AGENT_B hears only the broadcast, never its own signal.
        let heard = apply(
            &mut fx,
            "AGENT_B",
            EffectInvocation::new(EffectName::Receive).with_param("time_window", 10.0),
        );
        assert_eq!(heard.get_f64("count"), Some(1.0));

        // Intensity filter drops the weak direct signal for AGENT_A.
        let filtered = apply(
            &mut fx,
            "AGENT_A",
            EffectInvocation::new(EffectName::Receive)
                .with_param("time_window", 10.0)
                .with_param("filter_criteria", json!({"min_intensity": 5})),
        );
        assert_eq!(filtered.get_f64("count"), Some(0.0));
    }

    #[test]
    fn test_store_creates_named_insight() {
        let mut fx = fixture();
        let reply = apply(
            &mut fx,
            "AGENT_A",
            EffectInvocation::new(EffectName::Store)
                .with_param("knowledge", "the window is the weak point")
                .with_param("confidence", 0.85),
        );

        assert_eq!(reply.get_f64("pattern_id"), Some(0.0));
        let pattern = &fx.memory.patterns()[0];
        assert_eq!(pattern.name, "insight_0");
        assert_eq!(pattern.discovered_by, "AGENT_A");
        assert_eq!(pattern.confidence, 0.85);
    }

    #[test]
    fn test_compute_exact_operations() {
        let mut fx = fixture();
        let sum = apply(
            &mut fx,
            "AGENT_A",
            EffectInvocation::new(EffectName::Compute)
                .with_param("operation", "sum")
                .with_param("inputs", json!([1.0, 2.0, 3.5])),
        );
        assert_eq!(sum.get("result"), Some(&json!(6.5)));

        let avg = apply(
            &mut fx,
            "AGENT_A",
            EffectInvocation::new(EffectName::Compute)
                .with_param("operation", "average")
                .with_param("inputs", json!([2.0, 4.0])),
        );
        assert_eq!(avg.get("result"), Some(&json!(3.0)));

        let bad = apply(
            &mut fx,
            "AGENT_A",
            EffectInvocation::new(EffectName::Compute)
                .with_param("operation", "teleport")
                .with_param("inputs", json!([])),
        );
        assert_eq!(bad.error.as_deref(), Some("unsupported_operation"));
    }

    #[test]
    fn test_detect_correlation_common_properties() {
        let mut fx = fixture();
        let reply = apply(
            &mut fx,
            "AGENT_A",
            EffectInvocation::new(EffectName::Detect)
                .with_param("entity_set", json!(["AGENT_A", "AGENT_B"]))
                .with_param("pattern_type", "correlation"),
        );

        assert!(reply.success);
        let pattern = reply.get_str("pattern").unwrap();
        assert!(pattern.contains("goal"));
        assert!(pattern.contains("status"));
        assert_eq!(reply.get_f64("confidence"), Some(0.7));

        let sparse = apply(
            &mut fx,
            "AGENT_A",
            EffectInvocation::new(EffectName::Detect)
                .with_param("entity_set", json!(["AGENT_A"]))
                .with_param("pattern_type", "correlation"),
        );
        assert_eq!(sparse.get_str("pattern"), Some("no_significant_pattern"));
        assert_eq!(sparse.get_f64("confidence"), Some(0.1));
    }

    #[test]
    fn test_query_fans_out_and_tolerates_unknown_type() {
        let mut fx = fixture();
        fx.memory
            .append(sim_model::EventDraft::new(1.0, "AGENT_A", "observe"));

        let all = apply(
            &mut fx,
            "AGENT_A",
            EffectInvocation::new(EffectName::Query)
                .with_param("memory_type", "all")
                .with_param("search_term", "door"),
        );
        assert!(all.success);
        let results = all.get("results").unwrap().as_object().unwrap();
        assert_eq!(results.len(), EventKind::all().len());

        let unknown = apply(
            &mut fx,
            "AGENT_A",
            EffectInvocation::new(EffectName::Query)
                .with_param("memory_type", "dreams")
                .with_param("search_term", "door"),
        );
        assert!(unknown.success);
        assert_eq!(unknown.get("results"), Some(&json!([])));
    }
}
