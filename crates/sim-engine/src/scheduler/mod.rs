//! Turn Scheduler
//!
//! The synchronous simulation loop: pick an actor, ask the decision policy
//! for invocations, apply them through the effect catalogue, log the
//! results, ratchet environmental pressure, and re-evaluate termination.
//! Single-threaded by design — one writer, no locks, and every turn
//! observes all prior turns' effects.

mod context;
mod environment;
mod select;

use crate::config::SimConfig;
use crate::effects::EffectExecutor;
use crate::memory::EventMemory;
use crate::monitor::SystemMonitor;
use crate::oracle::{Decision, DecisionOracle};
use crate::world::WorldStore;
use rand::rngs::SmallRng;
use rand::SeedableRng;
use sim_model::{EffectName, Entity, EventDraft};
use std::collections::BTreeMap;
use std::fmt;
use std::time::{Duration, Instant};

/// Why a run ended. Exactly one reason is reported per run, checked in
/// significance order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// Threat reached the critical level
    CriticalThreat,
    /// Nothing has happened for a whole trailing window late in the run
    Quiescent,
    /// The exit barrier was worn down below the escape threshold
    ObjectiveAchieved,
    RoundBudget,
    TimeBudget,
    WallClockBudget,
    NoEligibleAgents,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            StopReason::CriticalThreat => "critical threat level reached",
            StopReason::Quiescent => "natural resolution reached",
            StopReason::ObjectiveAchieved => "exit achieved",
            StopReason::RoundBudget => "round budget exhausted",
            StopReason::TimeBudget => "time budget exhausted",
            StopReason::WallClockBudget => "wall-clock budget exhausted",
            StopReason::NoEligibleAgents => "no agents can act",
        };
        f.write_str(text)
    }
}

/// External budgets for one run.
#[derive(Debug, Clone, Copy)]
pub struct RunLimits {
    pub max_rounds: u64,
    pub max_time: f64,
    pub wall_clock_budget: Duration,
}

impl RunLimits {
    pub fn from_config(config: &SimConfig) -> Self {
        Self {
            max_rounds: config.scheduler.max_rounds,
            max_time: config.scheduler.max_time,
            wall_clock_budget: Duration::from_secs(config.scheduler.wall_clock_budget_secs),
        }
    }
}

/// Aggregate statistics for one completed run.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub rounds: u64,
    pub actions: u64,
    /// Simulated duration
    pub duration: f64,
    /// Events whose action name contains "transfer"
    pub cooperation_events: usize,
    /// Events whose action name contains "signal"
    pub communication_events: usize,
    pub patterns_discovered: usize,
    pub final_threat: f64,
    pub stop_reason: StopReason,
    /// Terminal snapshot of every rostered agent entity
    pub agents: BTreeMap<String, Entity>,
}

/// The turn scheduler. Owns the world, the memory, the effect executor and
/// the policy; everything is constructor-injected, nothing is ambient.
pub struct Scheduler {
    world: WorldStore,
    memory: EventMemory,
    executor: EffectExecutor,
    monitor: SystemMonitor,
    oracle: Box<dyn DecisionOracle>,
    rng: SmallRng,
    config: SimConfig,
    roster: Vec<String>,
    effect_usage: BTreeMap<EffectName, u64>,
    action_count: u64,
    round: u64,
}

impl Scheduler {
    pub fn new(
        world: WorldStore,
        roster: Vec<String>,
        memory: EventMemory,
        oracle: Box<dyn DecisionOracle>,
        config: SimConfig,
        seed: u64,
    ) -> Self {
        Self {
            world,
            memory,
            executor: EffectExecutor::new(),
            monitor: SystemMonitor::new(config.monitor.clone()),
            oracle,
            rng: SmallRng::seed_from_u64(seed),
            config,
            roster,
            effect_usage: BTreeMap::new(),
            action_count: 0,
            round: 0,
        }
    }

    pub fn world(&self) -> &WorldStore {
        &self.world
    }

    pub fn memory(&self) -> &EventMemory {
        &self.memory
    }

    /// Consumes the scheduler, releasing the world and memory for
    /// persistence.
    pub fn into_parts(self) -> (WorldStore, EventMemory) {
        (self.world, self.memory)
    }

    /// Checks the natural termination conditions in significance order.
    pub fn should_stop(&self) -> Option<StopReason> {
        let env = &self.config.environment;
        let threat = self
            .world
            .entity(&env.environment_entity)
            .map_or(0.0, Entity::threat_level);
        if threat >= env.critical_threat {
            return Some(StopReason::CriticalThreat);
        }

        if self.world.time > env.quiescence_floor {
            let cutoff = self.world.time - env.quiescence_window;
            let idle = !self.memory.events().iter().any(|e| e.timestamp > cutoff);
            if idle {
                return Some(StopReason::Quiescent);
            }
        }

        let barrier = self
            .world
            .entity(&env.barrier_entity)
            .map(|e| e.barrier_strength().unwrap_or(100.0));
        if let Some(strength) = barrier {
            if strength <= env.barrier_exit_threshold {
                return Some(StopReason::ObjectiveAchieved);
            }
        }

        None
    }

    /// Runs rounds until a budget or a natural stop condition ends the run.
    pub fn run(&mut self, limits: &RunLimits) -> RunSummary {
        let started = Instant::now();
        tracing::info!(
            max_rounds = limits.max_rounds,
            max_time = limits.max_time,
            "run starting"
        );

        let stop_reason = loop {
            if let Some(reason) = self.should_stop() {
                break reason;
            }
            if self.round >= limits.max_rounds {
                break StopReason::RoundBudget;
            }
            if self.world.time >= limits.max_time {
                break StopReason::TimeBudget;
            }
            if started.elapsed() >= limits.wall_clock_budget {
                break StopReason::WallClockBudget;
            }

            let eligible = select::eligible_agents(&self.world, &self.roster);
            if eligible.is_empty() {
                break StopReason::NoEligibleAgents;
            }

            self.round += 1;
            if self.config.scheduler.single_actor {
                if let Some(actor) = select::select_next_actor(
                    &self.world,
                    &self.memory,
                    &self.config.scheduler,
                    &mut self.rng,
                    &eligible,
                ) {
                    self.take_turn(&actor);
                }
            } else {
                for actor in eligible {
                    // The round slate is fixed, but an agent incapacitated
                    // mid-round loses its turn.
                    let still_eligible = self
                        .world
                        .entity(&actor)
                        .map_or(false, |e| e.stress_level() < 1.0 && e.is_active());
                    if still_eligible {
                        self.take_turn(&actor);
                    }
                }
            }

            environment::update_environment(&mut self.world, &self.config.environment, &self.roster);

            if self.round % 10 == 0 {
                tracing::info!(
                    round = self.round,
                    time = self.world.time,
                    actions = self.action_count,
                    events = self.memory.len(),
                    "progress"
                );
            }
        };

        tracing::info!(rounds = self.round, actions = self.action_count, %stop_reason, "run finished");
        self.summarize(stop_reason)
    }

    fn take_turn(&mut self, actor: &str) {
        self.world.advance_time(self.config.scheduler.turn_dt);
        self.execute_turn(actor);
        self.action_count += 1;

        // interval_actions = 0 disables the periodic pass entirely.
        let interval = self.config.monitor.interval_actions;
        if interval > 0 && self.action_count % interval == 0 {
            self.monitor.intervene(&mut self.memory, self.world.time);
        }
    }

    /// One agent turn: decision, execution, logging. Policy failures
    /// degrade to a safe default; a bad turn never aborts the run.
    fn execute_turn(&mut self, actor: &str) {
        let ctx = context::build_context(
            &self.world,
            &mut self.memory,
            &self.config,
            &self.roster,
            self.round,
            actor,
        );

        let environment_entity = self.config.environment.environment_entity.clone();
        let decision = match self.oracle.decide(&ctx) {
            Ok(decision) => decision,
            Err(error) => {
                tracing::warn!(%actor, %error, "decision failure, substituting safe default");
                Decision {
                    invocations: vec![context::safe_default_invocation(&environment_entity)],
                    justification: format!("decision failure: {error}"),
                }
            }
        };

        let mut invocations = decision.invocations;
        if invocations.is_empty() {
            let fallback =
                context::fallback_invocation(&self.effect_usage, actor, &environment_entity);
            tracing::debug!(%actor, effect = %fallback.name, "empty decision, diversity fallback");
            invocations.push(fallback);
        }

        for invocation in invocations {
            let invocation = invocation.normalized();
            let reply = self.executor.apply(
                &mut self.world,
                &mut self.memory,
                &mut self.rng,
                actor,
                &invocation,
            );
            *self.effect_usage.entry(invocation.name).or_insert(0) += 1;

            self.memory.append_with_derivation(
                EventDraft::new(self.world.time, actor, invocation.name.as_str())
                    .with_params(invocation.params.clone())
                    .with_result(reply)
                    .with_justification(decision.justification.clone()),
            );
        }
    }

    fn summarize(&self, stop_reason: StopReason) -> RunSummary {
        let events = self.memory.events();
        let agents = self
            .roster
            .iter()
            .filter_map(|id| self.world.entity(id).map(|e| (id.clone(), e.clone())))
            .collect();

        RunSummary {
            rounds: self.round,
            actions: self.action_count,
            duration: self.world.time,
            cooperation_events: events.iter().filter(|e| e.action.contains("transfer")).count(),
            communication_events: events.iter().filter(|e| e.action.contains("signal")).count(),
            patterns_discovered: self.memory.patterns().len(),
            final_threat: self
                .world
                .entity(&self.config.environment.environment_entity)
                .map_or(0.0, Entity::threat_level),
            stop_reason,
            agents,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oracle::ScriptedOracle;
    use crate::scenario::{setup_scenario, SAFEHOUSE};
    use sim_model::{keys, EffectInvocation};

    fn scheduler_with(oracle: ScriptedOracle, config: SimConfig) -> Scheduler {
        let (world, roster) = setup_scenario(SAFEHOUSE, &config.environment).unwrap();
        let memory = EventMemory::new(config.memory.clone());
        Scheduler::new(world, roster, memory, Box::new(oracle), config, 99)
    }

    fn limits(max_rounds: u64) -> RunLimits {
        RunLimits {
            max_rounds,
            max_time: 500.0,
            wall_clock_budget: Duration::from_secs(30),
        }
    }

    #[test]
    fn test_stop_order_prefers_critical_threat() {
        let config = SimConfig::default();
        let mut scheduler = scheduler_with(ScriptedOracle::default(), config.clone());

        // Both critical threat and achieved objective hold; threat wins.
        scheduler
            .world
            .set_attr(&config.environment.environment_entity, keys::THREAT_LEVEL, 0.97);
        scheduler
            .world
            .set_attr(&config.environment.barrier_entity, keys::BARRIER_STRENGTH, 5.0);
        assert_eq!(scheduler.should_stop(), Some(StopReason::CriticalThreat));
    }

    #[test]
    fn test_objective_achieved_at_threshold() {
        let config = SimConfig::default();
        let mut scheduler = scheduler_with(ScriptedOracle::default(), config.clone());

        scheduler
            .world
            .set_attr(&config.environment.barrier_entity, keys::BARRIER_STRENGTH, 10.0);
        assert_eq!(scheduler.should_stop(), Some(StopReason::ObjectiveAchieved));
    }

    #[test]
    fn test_quiescence_needs_floor_and_idle_window() {
        let config = SimConfig::default();
        let mut scheduler = scheduler_with(ScriptedOracle::default(), config);

        // Early in the run idle time does not end it.
        assert_eq!(scheduler.should_stop(), None);

        scheduler.world.advance_time(150.0);
        assert_eq!(scheduler.should_stop(), Some(StopReason::Quiescent));

        // A recent event clears quiescence.
        scheduler
            .memory
            .append(EventDraft::new(145.0, "AGENT_A", "observe"));
        assert_eq!(scheduler.should_stop(), None);
    }

    #[test]
    fn test_run_ends_on_round_budget() {
        let summary = scheduler_with(ScriptedOracle::default(), SimConfig::default())
            .run(&limits(5));
        assert_eq!(summary.stop_reason, StopReason::RoundBudget);
        assert_eq!(summary.rounds, 5);
        assert!(summary.actions >= 5);
        assert!(summary.final_threat > 0.0);
    }

    #[test]
    fn test_run_ends_when_nobody_can_act() {
        let config = SimConfig::default();
        let mut scheduler = scheduler_with(ScriptedOracle::default(), config);
        for agent in ["AGENT_A", "AGENT_B", "AGENT_C"] {
            scheduler.world.set_attr(agent, keys::STRESS_LEVEL, 1.0);
        }

        let summary = scheduler.run(&limits(50));
        assert_eq!(summary.stop_reason, StopReason::NoEligibleAgents);
        assert_eq!(summary.rounds, 0);
    }

    #[test]
    fn test_oracle_failure_degrades_to_safe_default() {
        struct FailingOracle;
        impl DecisionOracle for FailingOracle {
            fn decide(&mut self, _: &crate::oracle::TurnContext) -> Result<Decision, crate::error::OracleError> {
                Err(crate::error::OracleError::CallFailed("policy offline".into()))
            }
        }

        let config = SimConfig::default();
        let (world, roster) = setup_scenario(SAFEHOUSE, &config.environment).unwrap();
        let memory = EventMemory::new(config.memory.clone());
        let mut scheduler =
            Scheduler::new(world, roster, memory, Box::new(FailingOracle), config, 1);

        let summary = scheduler.run(&limits(3));
        assert_eq!(summary.rounds, 3);

        let events = scheduler.memory().events();
        let observe = events.iter().find(|e| e.action == "observe").unwrap();
        assert!(observe.justification.contains("policy offline"));
        assert_eq!(
            observe.params.get("entity_id").and_then(|v| v.as_str()),
            Some("environment")
        );
    }

    #[test]
    fn test_scripted_decisions_mutate_world() {
        let config = SimConfig::default();
        let oracle = ScriptedOracle::new([Decision::new("force the exit door").with_invocation(
            EffectInvocation::new(EffectName::Modify)
                .with_param("entity_id", "exit_door")
                .with_param("property_name", keys::BARRIER_STRENGTH)
                .with_param("operation", "add")
                .with_param("value", -95.0),
        )]);
        let mut scheduler = scheduler_with(oracle, config);

        let summary = scheduler.run(&limits(10));
        assert_eq!(summary.stop_reason, StopReason::ObjectiveAchieved);
        assert_eq!(summary.rounds, 1);
    }

    #[test]
    fn test_untouched_entities_survive_rounds_unchanged() {
        let config = SimConfig::default();
        let mut scheduler = scheduler_with(ScriptedOracle::default(), config);
        let before = scheduler.world.entity("front_door").cloned().unwrap();

        scheduler.run(&limits(4));

        // Fallback actions never touch the doors; attribute bags of
        // untouched entities are bit-for-bit stable.
        assert_eq!(scheduler.world().entity("front_door"), Some(&before));
    }

    #[test]
    fn test_zero_monitor_interval_disables_interventions() {
        let mut config = SimConfig::default();
        config.monitor.interval_actions = 0;
        let mut scheduler = scheduler_with(ScriptedOracle::default(), config);

        let summary = scheduler.run(&limits(12));
        assert_eq!(summary.stop_reason, StopReason::RoundBudget);
        assert!(
            !scheduler
                .memory()
                .events()
                .iter()
                .any(|e| e.actor == crate::monitor::META_AGENT)
        );
    }

    #[test]
    fn test_full_round_mode_gives_everyone_a_turn() {
        let mut config = SimConfig::default();
        config.scheduler.single_actor = false;
        let mut scheduler = scheduler_with(ScriptedOracle::default(), config);

        scheduler.run(&limits(2));
        // 3 agents x 2 rounds.
        assert_eq!(scheduler.action_count, 6);

        let actors: std::collections::BTreeSet<_> = scheduler
            .memory()
            .events()
            .iter()
            .filter(|e| e.actor.starts_with("AGENT_"))
            .map(|e| e.actor.clone())
            .collect();
        assert_eq!(actors.len(), 3);
    }

    #[test]
    fn test_seeded_runs_are_reproducible() {
        let run = |seed: u64| {
            let config = SimConfig::default();
            let (world, roster) = setup_scenario(SAFEHOUSE, &config.environment).unwrap();
            let memory = EventMemory::new(config.memory.clone());
            let mut scheduler = Scheduler::new(
                world,
                roster,
                memory,
                Box::new(ScriptedOracle::default()),
                config,
                seed,
            );
            scheduler.run(&limits(8));
            scheduler
                .memory()
                .events()
                .iter()
                .map(|e| (e.actor.clone(), e.action.clone()))
                .collect::<Vec<_>>()
        };

        assert_eq!(run(5), run(5));
    }
}
