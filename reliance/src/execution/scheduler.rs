//! Application of rules in an order derived from their reliances.
//!
//! Rules are grouped into strongly connected components of the positive reliance graph
//! (positive groups) and of the union of positive and restraint graph (restrained groups).
//! The scheduler repeatedly selects a restrained group without active predecessors
//! and fires its rules until its positive groups can be retired.

use std::{
    collections::BTreeSet,
    time::{Duration, Instant},
};

use serde::Serialize;
use thiserror::Error;

use crate::{
    model::Program,
    reliance::{
        combine_graphs, compute_positive_reliances, compute_reliance_groups,
        compute_restraint_reliances, is_core_stratified, Deadline, SimpleGraph,
    },
};

use super::{
    execution_parameters::{SchedulerMode, SchedulerParameters},
    rule_execution::RuleExecutor,
};

/// Inconsistencies in the runtime state of the scheduler.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerError {
    /// A rule was deactivated twice
    #[error("rule {rule} is already inactive")]
    RuleAlreadyInactive {
        /// Index of the rule
        rule: usize,
    },
    /// A group lost more active predecessors than it had
    #[error("positive group {group} has no active predecessors left")]
    PredecessorUnderflow {
        /// Index of the positive group
        group: usize,
    },
    /// More positive groups were retired than exist
    #[error("number of active positive groups dropped below zero")]
    ActiveGroupUnderflow,
    /// All precomputed restrained groups were processed but some rules are still active
    #[error("no restrained group left while {remaining} positive groups are active")]
    StaticOrderExhausted {
        /// Number of positive groups that are still active
        remaining: usize,
    },
    /// Every remaining restrained group has an active predecessor
    #[error("remaining restrained groups have no source")]
    NoSourceGroup,
}

/// A single application of a rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RuleFiring {
    /// Index of the rule
    pub rule: usize,
    /// Iteration number passed to the executor
    pub iteration: usize,
    /// Whether new facts were derived
    pub derived: bool,
    /// Time spent in the executor
    pub duration: Duration,
}

/// Outcome of a scheduler run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SchedulerSummary {
    /// Every firing in the order it happened
    pub firings: Vec<RuleFiring>,
    /// Iteration number the next firing would have received
    pub next_iteration: usize,
    /// Number of firings that derived new facts
    pub derivations: usize,
    /// Whether the run was stopped by the timeout
    pub timeout: bool,
    /// Whether the rule set is core stratified
    pub core_stratified: bool,
    /// Duration of the run
    pub elapsed: Duration,
}

/// Fires rules of a [`Program`] in an order derived from its reliance graphs.
#[derive(Debug, Clone)]
pub struct Scheduler {
    program: Program,
    parameters: SchedulerParameters,
    positive: SimpleGraph,
    restraint: SimpleGraph,
}

impl Scheduler {
    /// Create a new [`Scheduler`] computing the reliance graphs of `program`.
    ///
    /// Reliances are computed without a time limit,
    /// since a partial positive graph would miss triggers.
    pub fn new(program: &Program, parameters: SchedulerParameters) -> Self {
        let program = if parameters.mode.piece_decomposed {
            program.piece_decomposed()
        } else {
            program.clone()
        };

        let positive = compute_positive_reliances(&program, parameters.reliance_strategy, None);
        let restraint = compute_restraint_reliances(&program, parameters.reliance_strategy, None);

        Self::from_graphs(program, positive.graph, restraint.graph, parameters)
    }

    /// Create a new [`Scheduler`] from precomputed reliance graphs.
    ///
    /// The graphs must be defined over the rules of `program`;
    /// edges mentioning other nodes are ignored.
    /// No piece decomposition is applied.
    pub fn from_graphs(
        program: Program,
        positive: SimpleGraph,
        restraint: SimpleGraph,
        parameters: SchedulerParameters,
    ) -> Self {
        Self {
            program,
            parameters,
            positive,
            restraint,
        }
    }

    /// Return the program whose rules are scheduled.
    pub fn program(&self) -> &Program {
        &self.program
    }

    /// Return the positive reliance graph.
    pub fn positive_graph(&self) -> &SimpleGraph {
        &self.positive
    }

    /// Return the restraint graph.
    pub fn restraint_graph(&self) -> &SimpleGraph {
        &self.restraint
    }

    /// Fire rules using `executor` until no rule is active anymore
    /// or the timeout is reached.
    pub fn run<E: RuleExecutor>(&self, executor: &mut E) -> Result<SchedulerSummary, SchedulerError> {
        let mode = self.parameters.mode;
        let (union, union_transposed) = combine_graphs(&self.positive, &self.restraint);

        let mut runtime = Runtime::new(self, executor);
        runtime.summary.core_stratified =
            is_core_stratified(&union, &union_transposed, &self.restraint).stratified;

        let statistics = self.program.statistics();
        log::info!(
            "scheduling {} rules ({} existential) in {} positive groups, core stratified: {}",
            statistics.rules,
            statistics.existential_rules,
            runtime.groups.len(),
            runtime.summary.core_stratified
        );

        for group in 0..runtime.groups.len() {
            runtime.retire(group)?;
        }

        let static_groups = (!mode.dynamic)
            .then(|| compute_reliance_groups(&union, &union_transposed, Some(&runtime.active_rules)));
        let mut static_index = 0;

        while runtime.active_groups > 0 {
            let members = match &static_groups {
                Some(static_groups) => loop {
                    let group = static_groups.groups.get(static_index).ok_or(
                        SchedulerError::StaticOrderExhausted {
                            remaining: runtime.active_groups,
                        },
                    )?;

                    if group.iter().any(|&rule| runtime.active_rules[rule]) {
                        break group.clone();
                    }

                    static_index += 1;
                },
                None => {
                    let mut groups =
                        compute_reliance_groups(&union, &union_transposed, Some(&runtime.active_rules));
                    let minimum = groups.minimum_group.ok_or(SchedulerError::NoSourceGroup)?;

                    groups.groups.swap_remove(minimum)
                }
            };

            let restrained_group = runtime.restrained_group(members);
            let execution = if mode.unrestrained_first {
                runtime.execute_unrestrained_first(&restrained_group)
            } else {
                runtime.execute_by_positive_groups(&restrained_group)
            };

            match execution {
                Execution::Interrupted => {
                    log::warn!(
                        "scheduler stopped by timeout after {} firings",
                        runtime.summary.firings.len()
                    );
                    runtime.summary.timeout = true;
                    break;
                }
                Execution::Finished(Some(group)) => runtime.retire(group)?,
                Execution::Finished(None) => {
                    for &group in &restrained_group.positive_groups {
                        runtime.retire(group)?;
                    }
                }
            }
        }

        let mut summary = runtime.summary;
        summary.next_iteration = runtime.iteration;
        summary.elapsed = runtime.deadline.elapsed();

        log::info!(
            "scheduler finished after {} firings with {} derivations in {} ms",
            summary.firings.len(),
            summary.derivations,
            summary.elapsed.as_millis()
        );

        Ok(summary)
    }
}

/// Runtime state of a single rule
#[derive(Debug)]
struct RuleState {
    triggered: bool,
    /// Number of active rules that restrain this rule
    restrained_by: usize,
    positive_group: usize,
    positive_successors: Vec<usize>,
    restraint_successors: Vec<usize>,
}

/// Strongly connected component of the positive reliance graph
#[derive(Debug, Default)]
struct PositiveGroup {
    removed: bool,
    active_predecessors: usize,
    triggered_rules: usize,
    members: Vec<usize>,
    successors: Vec<usize>,
}

impl PositiveGroup {
    fn is_active(&self) -> bool {
        self.active_predecessors > 0 || self.triggered_rules > 0
    }
}

/// Strongly connected component of the union of positive and restraint graph
#[derive(Debug, Default)]
struct RestrainedGroup {
    positive_groups: Vec<usize>,
    restrained_members: Vec<usize>,
    unrestrained_members: Vec<usize>,
}

#[derive(Debug)]
enum Execution {
    /// The deadline tripped
    Interrupted,
    /// The group was processed; contains a positive group that became inactive, if known
    Finished(Option<usize>),
}

/// Round robin position within a list of rules
#[derive(Debug)]
struct Cursor {
    members: Vec<usize>,
    position: usize,
    idle: usize,
    pending: bool,
}

impl Cursor {
    fn new(members: &[usize], rules: &[RuleState]) -> Self {
        Self {
            members: members.to_vec(),
            position: 0,
            idle: 0,
            pending: members.iter().any(|&rule| rules[rule].triggered),
        }
    }

    fn wake(&mut self) {
        self.pending = true;
        self.idle = 0;
        self.position = 0;
    }
}

struct Runtime<'a, E> {
    program: &'a Program,
    mode: SchedulerMode,
    executor: &'a mut E,
    rules: Vec<RuleState>,
    groups: Vec<PositiveGroup>,
    active_rules: Vec<bool>,
    active_groups: usize,
    iteration: usize,
    deadline: Deadline,
    summary: SchedulerSummary,
}

impl<'a, E: RuleExecutor> Runtime<'a, E> {
    fn new(scheduler: &'a Scheduler, executor: &'a mut E) -> Self {
        let rule_count = scheduler.program.len();
        let positive_groups = compute_reliance_groups(
            &scheduler.positive,
            &scheduler.positive.transpose(),
            None,
        );

        let mut rules = (0..rule_count)
            .map(|rule| RuleState {
                triggered: false,
                restrained_by: 0,
                positive_group: 0,
                positive_successors: Self::successors(&scheduler.positive, rule, rule_count),
                restraint_successors: Self::successors(&scheduler.restraint, rule, rule_count),
            })
            .collect::<Vec<_>>();

        let mut groups = Vec::new();
        for (group_index, group) in positive_groups.groups.iter().enumerate() {
            let mut members = group
                .iter()
                .copied()
                .filter(|&rule| rule < rule_count)
                .collect::<Vec<_>>();
            members.sort_unstable();

            for &member in &members {
                rules[member].positive_group = group_index;
            }

            groups.push(PositiveGroup {
                members,
                ..Default::default()
            });
        }

        for group_index in 0..groups.len() {
            let successors = groups[group_index]
                .members
                .iter()
                .flat_map(|&member| rules[member].positive_successors.iter())
                .map(|&successor| rules[successor].positive_group)
                .filter(|&successor| successor != group_index)
                .collect::<BTreeSet<_>>();

            for &successor in &successors {
                groups[successor].active_predecessors += 1;
            }

            groups[group_index].successors = successors.into_iter().collect();
        }

        for rule in 0..rule_count {
            for successor_index in 0..rules[rule].restraint_successors.len() {
                let successor = rules[rule].restraint_successors[successor_index];
                rules[successor].restrained_by += 1;
            }
        }

        let mut result = Self {
            program: &scheduler.program,
            mode: scheduler.parameters.mode,
            executor,
            rules,
            active_groups: groups.len(),
            groups,
            active_rules: vec![true; rule_count],
            iteration: scheduler.parameters.first_iteration,
            deadline: Deadline::new(scheduler.parameters.timeout),
            summary: SchedulerSummary::default(),
        };

        for (rule_index, rule) in scheduler.program.rules().iter().enumerate() {
            if rule.derived_body_literals() == 0 {
                result.set_triggered(rule_index, true);
            }
        }

        result
    }

    fn successors(graph: &SimpleGraph, rule: usize, rule_count: usize) -> Vec<usize> {
        graph
            .successors(rule)
            .iter()
            .copied()
            .filter(|&successor| successor < rule_count)
            .collect()
    }

    fn set_triggered(&mut self, rule: usize, triggered: bool) {
        let state = &mut self.rules[rule];
        if state.triggered == triggered {
            return;
        }

        state.triggered = triggered;

        let group = &mut self.groups[state.positive_group];
        if triggered {
            group.triggered_rules += 1;
        } else {
            group.triggered_rules -= 1;
        }
    }

    fn deactivate_rule(&mut self, rule: usize) -> Result<(), SchedulerError> {
        if !self.active_rules[rule] {
            return Err(SchedulerError::RuleAlreadyInactive { rule });
        }
        self.active_rules[rule] = false;

        for successor_index in 0..self.rules[rule].restraint_successors.len() {
            let successor = self.rules[rule].restraint_successors[successor_index];
            let restrained_by = &mut self.rules[successor].restrained_by;
            *restrained_by = restrained_by.saturating_sub(1);
        }

        Ok(())
    }

    /// Remove `group` if it is inactive,
    /// together with every successor group that becomes inactive as a consequence.
    fn retire(&mut self, group: usize) -> Result<(), SchedulerError> {
        let mut stack = vec![group];

        while let Some(group) = stack.pop() {
            if self.groups[group].removed || self.groups[group].is_active() {
                continue;
            }

            self.active_groups = self
                .active_groups
                .checked_sub(1)
                .ok_or(SchedulerError::ActiveGroupUnderflow)?;
            self.groups[group].removed = true;

            for member in self.groups[group].members.clone() {
                self.deactivate_rule(member)?;
            }

            for successor in self.groups[group].successors.clone() {
                let predecessors = &mut self.groups[successor].active_predecessors;
                *predecessors = predecessors
                    .checked_sub(1)
                    .ok_or(SchedulerError::PredecessorUnderflow { group: successor })?;

                stack.push(successor);
            }
        }

        Ok(())
    }

    fn restrained_group(&self, mut members: Vec<usize>) -> RestrainedGroup {
        members.sort_unstable();

        let positive_groups = members
            .iter()
            .map(|&member| self.rules[member].positive_group)
            .collect::<BTreeSet<_>>();

        let (unrestrained_members, restrained_members) = members
            .into_iter()
            .partition(|&member| self.rules[member].restrained_by == 0);

        RestrainedGroup {
            positive_groups: positive_groups.into_iter().collect(),
            restrained_members,
            unrestrained_members,
        }
    }

    /// Apply `rule` once and trigger its positive successors if something was derived.
    fn fire(&mut self, rule: usize) -> bool {
        let start = Instant::now();
        let derived = self.executor.fire(&self.program.rules()[rule], self.iteration);
        let duration = start.elapsed();

        log::trace!(
            "iteration {}: fired rule {rule}, derived: {derived}",
            self.iteration
        );

        self.summary.firings.push(RuleFiring {
            rule,
            iteration: self.iteration,
            derived,
            duration,
        });
        self.iteration += 1;

        self.set_triggered(rule, false);

        if derived {
            self.summary.derivations += 1;

            for successor_index in 0..self.rules[rule].positive_successors.len() {
                let successor = self.rules[rule].positive_successors[successor_index];
                self.set_triggered(successor, true);
            }
        }

        derived
    }

    /// Fire the first positive group without active predecessors to a local fixpoint.
    fn execute_by_positive_groups(&mut self, group: &RestrainedGroup) -> Execution {
        for &positive_group in &group.positive_groups {
            let current = &self.groups[positive_group];
            if current.removed || current.triggered_rules == 0 || current.active_predecessors > 0 {
                continue;
            }

            let members = current.members.clone();
            let mut position = 0;
            let mut idle = 0;

            while idle < members.len() {
                let rule = members[position];
                position = (position + 1) % members.len();

                let derived = self.fire(rule);
                if self.deadline.expired() {
                    return Execution::Interrupted;
                }

                if derived {
                    idle = 0;
                } else {
                    idle += 1;
                }
            }

            return Execution::Finished(Some(positive_group));
        }

        Execution::Finished(None)
    }

    /// Fire triggered rules of the group, preferring rules that are not restrained.
    fn execute_unrestrained_first(&mut self, group: &RestrainedGroup) -> Execution {
        let mut unrestrained = Cursor::new(&group.unrestrained_members, &self.rules);
        let mut restrained = Cursor::new(&group.restrained_members, &self.rules);

        loop {
            let cursor = if unrestrained.pending {
                &mut unrestrained
            } else if restrained.pending {
                &mut restrained
            } else {
                break;
            };

            let rule = cursor.members[cursor.position];
            cursor.position = (cursor.position + 1) % cursor.members.len();

            if !self.rules[rule].triggered {
                cursor.idle += 1;
                if cursor.idle >= cursor.members.len() {
                    cursor.pending = false;
                }

                continue;
            }
            cursor.idle = 0;

            let derived = self.fire(rule);
            if self.deadline.expired() {
                return Execution::Interrupted;
            }

            if derived {
                for &successor in &self.rules[rule].positive_successors {
                    if unrestrained.members.contains(&successor) {
                        unrestrained.wake();
                    } else if restrained.members.contains(&successor) {
                        restrained.wake();
                    }
                }
            }

            let positive_group = self.rules[rule].positive_group;
            if self.mode.dynamic && !self.groups[positive_group].is_active() {
                return Execution::Finished(Some(positive_group));
            }
        }

        Execution::Finished(None)
    }
}
