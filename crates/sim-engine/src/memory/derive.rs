//! Derivation Pipeline
//!
//! Pure rules that inspect a just-appended primary event and may emit one
//! pre-classified secondary event. Each secondary event carries an explicit
//! `source_id` link back to its originating record. Rules never mutate state
//! and never fail; inapplicable inputs simply yield nothing.

use serde_json::json;
use sim_model::{Event, EventDraft, EventKind};

/// Sentinel pattern name meaning the detect effect found nothing.
const NO_PATTERN: &str = "no_significant_pattern";

/// Minimum detect confidence worth recording as a learning.
const LEARNING_MIN_CONFIDENCE: f64 = 0.3;

/// One derivation rule in the pipeline.
pub trait Derivation: Send {
    /// Inspects a primary event and optionally emits one secondary draft.
    fn derive(&self, primary: &Event) -> Option<EventDraft>;
}

/// The standard pipeline, run in order on every primary append.
pub fn default_pipeline() -> Vec<Box<dyn Derivation>> {
    vec![
        Box::new(OutcomeDerivation),
        Box::new(LearningDerivation),
        Box::new(HypothesisDerivation),
    ]
}

/// Records the outcome of every action-kind event that carries a reply.
pub struct OutcomeDerivation;

impl Derivation for OutcomeDerivation {
    fn derive(&self, primary: &Event) -> Option<EventDraft> {
        if primary.kind != EventKind::Action {
            return None;
        }
        let result = primary.result.as_ref()?;

        let mut draft = EventDraft::new(primary.timestamp, &primary.actor, "derived_outcome")
            .with_kind(EventKind::Outcome)
            .with_source(primary.id)
            .with_param("success", json!(result.success))
            .with_param("action_type", json!(primary.action))
            .with_param("related_action_id", json!(primary.id));
        if let Some(error) = &result.error {
            draft = draft.with_param("error", json!(error));
        }
        Some(draft)
    }
}

/// Extracts knowledge from successful detect, compute, and store effects.
pub struct LearningDerivation;

impl Derivation for LearningDerivation {
    fn derive(&self, primary: &Event) -> Option<EventDraft> {
        let result = primary.result.as_ref()?;
        if !result.success {
            return None;
        }

        let (knowledge, confidence) = match primary.action.as_str() {
            "detect" => {
                let pattern = result.get_str("pattern")?;
                let confidence = result.get_f64("confidence").unwrap_or(0.0);
                if pattern == NO_PATTERN || confidence < LEARNING_MIN_CONFIDENCE {
                    return None;
                }
                (format!("Detected pattern: {pattern}"), confidence)
            }
            "compute" => {
                let operation = primary
                    .params
                    .get("operation")
                    .and_then(|v| v.as_str())
                    .unwrap_or("computation");
                let value = result.get("result").cloned().unwrap_or(json!(null));
                (format!("Computed {operation}: {value}"), 0.8)
            }
            "store" => {
                let knowledge = primary.params.get("knowledge").and_then(|v| v.as_str())?;
                let confidence = primary
                    .params
                    .get("confidence")
                    .and_then(|v| v.as_f64())
                    .unwrap_or(0.9);
                (knowledge.to_string(), confidence)
            }
            _ => return None,
        };

        Some(
            EventDraft::new(primary.timestamp, &primary.actor, "derived_learning")
                .with_kind(EventKind::Learning)
                .with_source(primary.id)
                .with_param("knowledge", json!(knowledge))
                .with_param("confidence", json!(confidence)),
        )
    }
}

/// Mines the actor's free-text justification for hypothesis statements.
pub struct HypothesisDerivation;

/// Explicit hypothesis markers. Longer first so "hypothesize" wins over its
/// "hypothesis" prefix at the same position.
const EXPLICIT_MARKERS: &[(&str, f64)] = &[("hypothesize", 0.9), ("hypothesis", 0.9)];

/// Weaker belief markers, consulted only when no explicit marker matches.
const BELIEF_MARKERS: &[(&str, f64)] = &[("believe", 0.7), ("think", 0.7)];

/// Phrases that mark a statement as a plan rather than a belief.
const PLAN_MARKERS: &[&str] = &["should", "will", "need to", "going to", "plan to"];

const MAX_HYPOTHESIS_LEN: usize = 200;

impl Derivation for HypothesisDerivation {
    fn derive(&self, primary: &Event) -> Option<EventDraft> {
        let text = primary.justification.to_lowercase();

        // Explicit markers outrank belief markers; within a family the
        // earliest occurrence wins. At most one hypothesis per event.
        let (position, marker, confidence) = [EXPLICIT_MARKERS, BELIEF_MARKERS]
            .iter()
            .find_map(|family| {
                family
                    .iter()
                    .filter_map(|(marker, conf)| text.find(marker).map(|pos| (pos, *marker, *conf)))
                    .min_by_key(|(pos, _, _)| *pos)
            })?;

        let mut clause = &text[position + marker.len()..];
        clause = clause.trim_start_matches([' ', ':', ',']);
        clause = clause.strip_prefix("that ").unwrap_or(clause);

        let sentence_end = clause.find(['.', '!', '?', '\n']).unwrap_or(clause.len());
        // Length cap counts characters, so the cut always lands on a char
        // boundary even for multibyte text.
        let cap = clause
            .char_indices()
            .nth(MAX_HYPOTHESIS_LEN)
            .map_or(clause.len(), |(offset, _)| offset);
        let clause = clause[..sentence_end.min(cap)].trim();

        if clause.is_empty() {
            return None;
        }
        // Plans and intentions are not beliefs about the world.
        if PLAN_MARKERS.iter().any(|m| clause.contains(m)) {
            return None;
        }

        Some(
            EventDraft::new(primary.timestamp, &primary.actor, "derived_hypothesis")
                .with_kind(EventKind::Hypothesis)
                .with_source(primary.id)
                .with_param("hypothesis", json!(clause))
                .with_param("confidence", json!(confidence)),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sim_model::EffectReply;

    fn primary(action: &str, result: Option<EffectReply>, justification: &str) -> Event {
        let mut draft = EventDraft::new(5.0, "AGENT_A", action).with_justification(justification);
        if let Some(r) = result {
            draft = draft.with_result(r);
        }
        draft.into_event(42)
    }

    #[test]
    fn test_outcome_fires_for_action_with_result() {
        let event = primary("transfer", Some(EffectReply::ok()), "");
        let draft = OutcomeDerivation.derive(&event).unwrap();

        assert_eq!(draft.kind, Some(EventKind::Outcome));
        assert_eq!(draft.source_id, Some(42));
        assert_eq!(draft.params["success"], json!(true));
        assert_eq!(draft.params["action_type"], json!("transfer"));
        assert_eq!(draft.params["related_action_id"], json!(42));
    }

    #[test]
    fn test_outcome_records_failure_reason() {
        let event = primary("transfer", Some(EffectReply::fail("insufficient_quantity")), "");
        let draft = OutcomeDerivation.derive(&event).unwrap();
        assert_eq!(draft.params["success"], json!(false));
        assert_eq!(draft.params["error"], json!("insufficient_quantity"));
    }

    #[test]
    fn test_outcome_skips_perceptions_and_resultless_events() {
        let observed = primary("observe", Some(EffectReply::ok()), "");
        assert!(OutcomeDerivation.derive(&observed).is_none());

        let no_result = primary("transfer", None, "");
        assert!(OutcomeDerivation.derive(&no_result).is_none());
    }

    #[test]
    fn test_learning_from_detect() {
        let reply = EffectReply::ok()
            .with("pattern", json!("increasing_values"))
            .with("confidence", json!(0.85));
        let event = primary("detect", Some(reply), "");
        let draft = LearningDerivation.derive(&event).unwrap();

        assert_eq!(draft.kind, Some(EventKind::Learning));
        assert_eq!(
            draft.params["knowledge"],
            json!("Detected pattern: increasing_values")
        );
        assert_eq!(draft.params["confidence"], json!(0.85));
    }

    #[test]
    fn test_learning_skips_no_pattern_and_low_confidence() {
        let none = EffectReply::ok()
            .with("pattern", json!("no_significant_pattern"))
            .with("confidence", json!(0.9));
        assert!(LearningDerivation.derive(&primary("detect", Some(none), "")).is_none());

        let weak = EffectReply::ok()
            .with("pattern", json!("correlation"))
            .with("confidence", json!(0.2));
        assert!(LearningDerivation.derive(&primary("detect", Some(weak), "")).is_none());
    }

    #[test]
    fn test_learning_from_compute_uses_fixed_confidence() {
        let reply = EffectReply::ok().with("result", json!(12.5));
        let mut event = primary("compute", Some(reply), "");
        event.params.insert("operation".into(), json!("average"));

        let draft = LearningDerivation.derive(&event).unwrap();
        assert_eq!(draft.params["confidence"], json!(0.8));
        assert_eq!(draft.params["knowledge"], json!("Computed average: 12.5"));
    }

    #[test]
    fn test_learning_from_store_defaults_confidence() {
        let mut event = primary("store", Some(EffectReply::ok()), "");
        event
            .params
            .insert("knowledge".into(), json!("the window is unlocked"));

        let draft = LearningDerivation.derive(&event).unwrap();
        assert_eq!(draft.params["knowledge"], json!("the window is unlocked"));
        assert_eq!(draft.params["confidence"], json!(0.9));
    }

    #[test]
    fn test_hypothesis_explicit_marker() {
        let event = primary(
            "observe",
            None,
            "My hypothesis: the exit door weakens under repeated force. Next I check.",
        );
        let draft = HypothesisDerivation.derive(&event).unwrap();

        assert_eq!(draft.kind, Some(EventKind::Hypothesis));
        assert_eq!(
            draft.params["hypothesis"],
            json!("the exit door weakens under repeated force")
        );
        assert_eq!(draft.params["confidence"], json!(0.9));
    }

    #[test]
    fn test_hypothesis_belief_marker_lower_confidence() {
        let event = primary("signal", None, "I believe that the others heard my signal.");
        let draft = HypothesisDerivation.derive(&event).unwrap();
        assert_eq!(draft.params["hypothesis"], json!("the others heard my signal"));
        assert_eq!(draft.params["confidence"], json!(0.7));
    }

    #[test]
    fn test_hypothesis_rejects_plans() {
        for text in [
            "I think we should try the window next.",
            "I believe I will signal the others soon.",
            "I think we need to gather more resources.",
        ] {
            let event = primary("observe", None, text);
            assert!(HypothesisDerivation.derive(&event).is_none(), "{text}");
        }
    }

    #[test]
    fn test_hypothesis_at_most_one() {
        let event = primary(
            "observe",
            None,
            "I believe the door is weak. I also think the window is open.",
        );
        // Only the first marker's clause is extracted.
        let draft = HypothesisDerivation.derive(&event).unwrap();
        assert_eq!(draft.params["hypothesis"], json!("the door is weak"));
    }

    #[test]
    fn test_hypothesis_explicit_marker_outranks_earlier_belief() {
        let event = primary(
            "observe",
            None,
            "I think the guards rotate at dawn. My hypothesis: the back door is unwatched.",
        );
        let draft = HypothesisDerivation.derive(&event).unwrap();
        assert_eq!(
            draft.params["hypothesis"],
            json!("the back door is unwatched")
        );
        assert_eq!(draft.params["confidence"], json!(0.9));
    }

    #[test]
    fn test_hypothesis_truncates_long_clauses() {
        let long = format!("I believe that {}", "x".repeat(400));
        let event = primary("observe", None, &long);
        let draft = HypothesisDerivation.derive(&event).unwrap();
        let clause = draft.params["hypothesis"].as_str().unwrap();
        assert!(clause.len() <= 200);
    }

    #[test]
    fn test_hypothesis_truncation_handles_multibyte_text() {
        let long = format!("I believe that {}", "é".repeat(300));
        let event = primary("observe", None, &long);
        let draft = HypothesisDerivation.derive(&event).unwrap();
        let clause = draft.params["hypothesis"].as_str().unwrap();
        assert_eq!(clause.chars().count(), 200);
    }

    #[test]
    fn test_hypothesis_none_without_markers() {
        let event = primary("observe", None, "Checking the surroundings for exits.");
        assert!(HypothesisDerivation.derive(&event).is_none());
    }
}
