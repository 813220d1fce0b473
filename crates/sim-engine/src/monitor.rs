//! System Health Monitor
//!
//! A lightweight meta-observer that runs periodically over the trailing
//! event window and appends advisory intervention events when agents look
//! stuck: too much observing, too little communicating. Interventions are
//! ordinary events from the `META_AGENT` actor; nothing forces agents to
//! heed them.

use crate::config::MonitorConfig;
use crate::memory::EventMemory;
use serde_json::json;
use sim_model::EventDraft;

/// Actor name stamped on intervention events.
pub const META_AGENT: &str = "META_AGENT";

/// Actions counted as communication for breakdown detection.
const COMM_ACTIONS: &[&str] = &["signal", "receive", "connect", "transfer"];

/// Result of one analysis pass.
#[derive(Debug, Clone, PartialEq)]
pub struct HealthAnalysis {
    pub observation_ratio: f64,
    pub observation_loop: bool,
    pub communication_ratio: f64,
    pub communication_breakdown: bool,
    /// Action-diversity score in [0, 1]
    pub health_score: f64,
}

impl HealthAnalysis {
    pub fn intervention_needed(&self) -> bool {
        self.observation_loop || self.communication_breakdown
    }
}

/// Periodic health analyzer.
#[derive(Debug, Clone)]
pub struct SystemMonitor {
    config: MonitorConfig,
}

impl SystemMonitor {
    pub fn new(config: MonitorConfig) -> Self {
        Self { config }
    }

    /// Inspects the trailing event window. Empty memory reports a neutral
    /// healthy state.
    pub fn analyze(&self, memory: &EventMemory) -> HealthAnalysis {
        let window = memory.recent_events(self.config.window);
        if window.is_empty() {
            return HealthAnalysis {
                observation_ratio: 0.0,
                observation_loop: false,
                communication_ratio: 0.0,
                communication_breakdown: false,
                health_score: 0.5,
            };
        }

        let total = window.len() as f64;
        let observes = window.iter().filter(|e| e.action == "observe").count() as f64;
        let comms = window
            .iter()
            .filter(|e| COMM_ACTIONS.contains(&e.action.as_str()))
            .count() as f64;

        let mut actions: Vec<&str> = window.iter().map(|e| e.action.as_str()).collect();
        actions.sort_unstable();
        actions.dedup();
        let diversity = actions.len() as f64 / total;

        let observation_ratio = observes / total;
        let communication_ratio = comms / total;
        HealthAnalysis {
            observation_ratio,
            observation_loop: observation_ratio > self.config.observe_loop_ratio,
            communication_ratio,
            communication_breakdown: communication_ratio < self.config.comm_breakdown_ratio,
            health_score: (diversity * 2.0).min(1.0),
        }
    }

    /// Runs one analysis pass and appends an advisory intervention event
    /// per detected condition. Returns the number of interventions raised.
    pub fn intervene(&self, memory: &mut EventMemory, time: f64) -> usize {
        if !self.config.enabled {
            return 0;
        }
        let analysis = self.analyze(memory);
        tracing::debug!(
            observation_ratio = analysis.observation_ratio,
            communication_ratio = analysis.communication_ratio,
            health = analysis.health_score,
            "health analysis"
        );

        let mut raised = 0;
        if analysis.observation_loop {
            memory.append(
                EventDraft::new(time, META_AGENT, "intervention").with_param(
                    "message",
                    json!("Try more communication - signal and receive"),
                ),
            );
            raised += 1;
        }
        if analysis.communication_breakdown {
            memory.append(
                EventDraft::new(time, META_AGENT, "intervention").with_param(
                    "message",
                    json!("Focus on building relationships - connect and transfer"),
                ),
            );
            raised += 1;
        }
        if raised > 0 {
            tracing::info!(raised, "monitor raised interventions");
        }
        raised
    }
}
