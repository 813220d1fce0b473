//! Event Memory
//!
//! The append-only interaction log and everything mined from it: per-kind
//! semantic indices, auto-derived secondary events, coarse pattern
//! detection, the directed relationship map, and snapshot persistence.
//!
//! Events are classified into one of five kinds at append time and never
//! reclassified afterwards (except when loading a pre-typed-index snapshot,
//! whose stale kind tags are not trusted). The semantic index for a kind is
//! invalidated on every append to that kind and rebuilt lazily on the next
//! query.

mod derive;
mod semantic;

pub use derive::{
    default_pipeline, Derivation, HypothesisDerivation, LearningDerivation, OutcomeDerivation,
};
pub use semantic::SemanticIndex;

use crate::config::MemoryConfig;
use crate::error::SnapshotError;
use sim_model::{
    Event, EventDraft, EventKind, MemorySnapshot, Pattern, SnapshotMetadata, SNAPSHOT_VERSION,
};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Which kind(s) a query targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KindSelector {
    /// Fan out across all five kinds
    All,
    One(EventKind),
}

impl KindSelector {
    /// Parses the wire form used by the query effect: "all", a kind name,
    /// or None for unrecognized strings.
    pub fn parse(s: &str) -> Option<KindSelector> {
        if s == "all" {
            return Some(KindSelector::All);
        }
        EventKind::parse(s).map(KindSelector::One)
    }
}

/// One query hit: the matched event plus its cosine similarity. A missing
/// similarity marks a recency-fallback hit rather than a scored match.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredEvent {
    pub event: Event,
    pub similarity: Option<f64>,
}

/// The shape of a query answer mirrors its selector: one list for a single
/// kind, a per-kind map for the fan-out form.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryResult {
    Single(Vec<ScoredEvent>),
    ByKind(BTreeMap<EventKind, Vec<ScoredEvent>>),
}

/// The typed event memory.
pub struct EventMemory {
    config: MemoryConfig,
    events: Vec<Event>,
    patterns: Vec<Pattern>,
    /// Directed relationship strengths keyed "a->b". Single source of
    /// truth; entities never carry their own copy.
    relationships: BTreeMap<String, f64>,
    /// Event ids per kind, in insertion order
    kind_index: BTreeMap<EventKind, Vec<u64>>,
    indices: BTreeMap<EventKind, SemanticIndex>,
    pipeline: Vec<Box<dyn Derivation>>,
}

impl EventMemory {
    pub fn new(config: MemoryConfig) -> Self {
        Self::with_pipeline(config, default_pipeline())
    }

    /// Constructs a memory with a custom derivation pipeline. An empty
    /// pipeline turns derived-append into a plain append.
    pub fn with_pipeline(config: MemoryConfig, pipeline: Vec<Box<dyn Derivation>>) -> Self {
        Self {
            config,
            events: Vec::new(),
            patterns: Vec::new(),
            relationships: BTreeMap::new(),
            kind_index: BTreeMap::new(),
            indices: BTreeMap::new(),
            pipeline,
        }
    }

    /// Appends one event: assigns the next monotonic id, resolves its kind,
    /// inserts into the flat log and the per-kind index, and invalidates
    /// that kind's semantic index. Periodically triggers pattern
    /// auto-detection.
    pub fn append(&mut self, draft: EventDraft) -> u64 {
        let id = self.events.len() as u64;
        let event = draft.into_event(id);
        let kind = event.kind;

        self.kind_index.entry(kind).or_default().push(id);
        if let Some(index) = self.indices.get_mut(&kind) {
            index.mark_dirty();
        }
        tracing::debug!(id, actor = %event.actor, action = %event.action, kind = %kind, "event appended");
        self.events.push(event);

        // detect_stride = 0 disables auto-detection.
        let len = self.events.len();
        let stride = self.config.detect_stride;
        if stride > 0 && len >= self.config.detect_min_events && len % stride == 0 {
            self.auto_detect_patterns();
        }
        id
    }

    /// Appends a primary event and runs the derivation pipeline on it,
    /// appending every secondary event the rules emit. Returns the primary
    /// event's id.
    pub fn append_with_derivation(&mut self, draft: EventDraft) -> u64 {
        let id = self.append(draft);
        let secondary: Vec<EventDraft> = {
            let primary = &self.events[id as usize];
            self.pipeline
                .iter()
                .filter_map(|rule| rule.derive(primary))
                .collect()
        };
        for draft in secondary {
            self.append(draft);
        }
        id
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// The trailing `n` events, oldest first.
    pub fn recent_events(&self, n: usize) -> &[Event] {
        let start = self.events.len().saturating_sub(n);
        &self.events[start..]
    }

    pub fn count_of_kind(&self, kind: EventKind) -> usize {
        self.kind_index.get(&kind).map_or(0, Vec::len)
    }

    pub fn patterns(&self) -> &[Pattern] {
        &self.patterns
    }

    /// Records a discovered pattern, clamping confidence, and returns its
    /// id. `created_at` is the timestamp of the latest event.
    pub fn add_pattern(
        &mut self,
        name: impl Into<String>,
        description: impl Into<String>,
        confidence: f64,
        discovered_by: impl Into<String>,
    ) -> u64 {
        let id = self.patterns.len() as u64;
        let created_at = self.events.last().map_or(0.0, |e| e.timestamp);
        let pattern = Pattern::new(id, name, description, confidence, discovered_by, created_at);
        tracing::info!(id, name = %pattern.name, confidence = pattern.confidence, "pattern recorded");
        self.patterns.push(pattern);
        id
    }

    /// Overwrites the directed relationship `a -> b`, clamped to [-1, 1].
    pub fn update_relationship(&mut self, agent_a: &str, agent_b: &str, strength: f64) {
        let key = format!("{agent_a}->{agent_b}");
        self.relationships.insert(key, strength.clamp(-1.0, 1.0));
    }

    pub fn relationship(&self, agent_a: &str, agent_b: &str) -> Option<f64> {
        self.relationships.get(&format!("{agent_a}->{agent_b}")).copied()
    }

    pub fn relationships(&self) -> &BTreeMap<String, f64> {
        &self.relationships
    }

    /// Read-through view of one agent's outgoing relationships.
    pub fn relationships_of(&self, agent: &str) -> BTreeMap<String, f64> {
        let prefix = format!("{agent}->");
        self.relationships
            .iter()
            .filter_map(|(key, &strength)| {
                key.strip_prefix(&prefix).map(|other| (other.to_string(), strength))
            })
            .collect()
    }

    /// Semantic query over one kind or all kinds. Never fails: sparse or
    /// degenerate corpora fall back to recency, and absence of data yields
    /// empty results.
    pub fn query(&mut self, selector: KindSelector, term: &str) -> QueryResult {
        match selector {
            KindSelector::One(kind) => QueryResult::Single(self.search_kind(kind, term)),
            KindSelector::All => {
                let mut by_kind = BTreeMap::new();
                for &kind in EventKind::all() {
                    by_kind.insert(kind, self.search_kind(kind, term));
                }
                QueryResult::ByKind(by_kind)
            }
        }
    }

    /// Scores `term` against one kind's events. Fewer than two events of
    /// the kind, or an unfittable corpus, yields the trailing events of
    /// that kind unscored instead.
    pub fn search_kind(&mut self, kind: EventKind, term: &str) -> Vec<ScoredEvent> {
        let ids = self.kind_index.get(&kind).cloned().unwrap_or_default();
        if ids.len() < 2 {
            return self.recency_fallback(&ids);
        }

        let fitted = self.indices.get(&kind).is_some_and(SemanticIndex::is_fitted);
        if !fitted {
            let documents: Vec<(u64, String)> = ids
                .iter()
                .map(|&id| (id, self.events[id as usize].searchable_text()))
                .collect();
            self.indices.entry(kind).or_default().fit(
                documents.iter().map(|(id, text)| (*id, text.as_str())),
                self.config.vocabulary_cap,
            );
        }
        let index = &self.indices[&kind];
        if !index.is_fitted() {
            return self.recency_fallback(&ids);
        }

        index
            .search(term, self.config.top_k, self.config.min_similarity)
            .into_iter()
            .map(|(id, similarity)| ScoredEvent {
                event: self.events[id as usize].clone(),
                similarity: Some(similarity),
            })
            .collect()
    }

    fn recency_fallback(&self, ids: &[u64]) -> Vec<ScoredEvent> {
        let start = ids.len().saturating_sub(self.config.top_k);
        ids[start..]
            .iter()
            .map(|&id| ScoredEvent {
                event: self.events[id as usize].clone(),
                similarity: None,
            })
            .collect()
    }

    /// Inspects the trailing window of the flat log and records a pattern
    /// for each heuristic whose count threshold is crossed. Rules are
    /// independent; several may fire from the same window.
    fn auto_detect_patterns(&mut self) {
        let window: Vec<(String, String)> = self
            .recent_events(self.config.detect_window)
            .iter()
            .map(|e| (e.actor.clone(), e.action.clone()))
            .collect();

        let count_in = |set: &[&str]| {
            window.iter().filter(|(_, action)| set.contains(&action.as_str())).count()
        };

        if count_in(&["transfer", "connect", "signal"]) >= 3 {
            self.add_pattern(
                "Cooperation Emergence",
                "Agents are beginning to work together through communication and resource sharing",
                0.7,
                "system",
            );
        }

        if count_in(&["observe", "query", "detect"]) >= 4 {
            self.add_pattern(
                "Information Gathering",
                "Agents are actively exploring and learning about their environment",
                0.6,
                "system",
            );
        }

        let comm: Vec<&str> = window
            .iter()
            .filter(|(_, action)| action == "signal" || action == "receive")
            .map(|(actor, _)| actor.as_str())
            .collect();
        if comm.len() >= 3 {
            let mut actors: Vec<&str> = comm.clone();
            actors.sort_unstable();
            actors.dedup();
            if actors.len() >= 2 {
                self.add_pattern(
                    "Communication Network",
                    "Multiple agents are engaging in information exchange",
                    0.8,
                    "system",
                );
            }
        }

        let mut actions: Vec<&str> = window.iter().map(|(_, action)| action.as_str()).collect();
        actions.sort_unstable();
        actions.dedup();
        if actions.len() >= 5 {
            self.add_pattern(
                "Tool Diversity",
                "Agents are using a wide variety of capabilities, indicating adaptive behavior",
                0.7,
                "system",
            );
        }
    }

    /// Serializes the full memory to a snapshot file.
    pub fn save(&self, path: impl AsRef<Path>, world_time: f64) -> Result<(), SnapshotError> {
        let snapshot = MemorySnapshot {
            version: SNAPSHOT_VERSION,
            metadata: SnapshotMetadata {
                total_events: self.events.len(),
                saved_at_time: world_time,
            },
            events: self.events.clone(),
            patterns: self.patterns.clone(),
            relationships: self.relationships.clone(),
            kind_indices: self.kind_index.clone(),
        };
        let json = serde_json::to_string_pretty(&snapshot)?;
        fs::write(path, json)?;
        Ok(())
    }

    /// Restores a memory from a snapshot file. Blobs that predate the
    /// typed-index feature get every event reclassified from its action
    /// name; stored kind tags are not trusted across that boundary.
    pub fn load(path: impl AsRef<Path>, config: MemoryConfig) -> Result<Self, SnapshotError> {
        let json = fs::read_to_string(path)?;
        let snapshot: MemorySnapshot = serde_json::from_str(&json)?;

        let reclassify = snapshot.needs_reclassification();
        let mut events = snapshot.events;
        if reclassify {
            tracing::info!(
                events = events.len(),
                "pre-typed-index snapshot: reclassifying all events"
            );
            for event in &mut events {
                event.kind = sim_model::classify_action(&event.action);
            }
        }

        let mut kind_index: BTreeMap<EventKind, Vec<u64>> = BTreeMap::new();
        for event in &events {
            kind_index.entry(event.kind).or_default().push(event.id);
        }

        Ok(Self {
            config,
            events,
            patterns: snapshot.patterns,
            relationships: snapshot.relationships,
            kind_index,
            indices: BTreeMap::new(),
            pipeline: default_pipeline(),
        })
    }
}
