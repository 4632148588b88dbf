//! Module for common functionality for the computation of different reliances.

use crate::model::{Literal, Rule, Term};

use super::{
    assignment::{Side, VariableAssignments},
    deadline::Deadline,
    strategy::RelianceStrategy,
};

/// Result of checking the conditions of a reliance for a partial literal mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum RelianceCheckResult {
    /// The mapping can never be extended to a witness of the reliance
    Abort,
    /// The mapping witnesses the reliance
    Success,
    /// The mapping has to be extended to decide the reliance
    Extend,
}

/// Result of a complete search for a reliance between two rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SearchOutcome {
    /// There is a reliance
    Reliance,
    /// There is no reliance
    NoReliance,
    /// The deadline tripped before the search could finish
    Interrupted,
}

/// Conditions defining one type of reliance.
///
/// The search maps literals of the target rule (see [`RelianceImplementation::literals_target`])
/// onto literals of the source rule (see [`RelianceImplementation::literals_source`]).
/// The source rule is always on [`Side::From`].
pub(super) trait RelianceImplementation {
    /// Literals of the source rule that may be used as images of the mapping.
    fn literals_source(rule: &Rule) -> &[Literal];
    /// Literals of the target rule that are mapped.
    fn literals_target(rule: &Rule) -> &[Literal];

    /// Create an empty assignment for the variables of both rules.
    fn new_assignments(rule_source: &Rule, rule_target: &Rule) -> VariableAssignments {
        VariableAssignments::new(rule_source.variable_count(), rule_target.variable_count())
    }

    /// Attempts to extend the current mapping by unifying `literal_source` with `literal_target`.
    ///
    /// Returns `false` if the unification fails or leads to a forbidden assignment.
    fn extend_assignment(
        literal_source: &Literal,
        literal_target: &Literal,
        assignments: &mut VariableAssignments,
        strategy: RelianceStrategy,
    ) -> bool;

    /// Decide whether the current mapping witnesses the reliance.
    ///
    /// `mapping_domain` contains the indices of the mapped target literals in ascending order.
    fn check_conditions(
        mapping_domain: &[usize],
        rule_source: &Rule,
        rule_target: &Rule,
        assignments: &VariableAssignments,
    ) -> RelianceCheckResult;
}

/// Performs a depth-first search over all possible literal mappings,
/// i.e. partial assignments of literals from the target rule to literals of the source rule,
/// until every condition of the respective reliance is fulfilled.
///
/// Depending on which condition failed,
/// certain paths in the search tree may be aborted early.
///
/// Returns `true` if a reliance was found or the deadline tripped.
fn extend<Implementation: RelianceImplementation>(
    mapping_domain: &mut Vec<usize>,
    rule_source: &Rule,
    rule_target: &Rule,
    assignments: &mut VariableAssignments,
    strategy: RelianceStrategy,
    deadline: &mut Deadline,
) -> bool {
    if deadline.expired_sparse() {
        return true;
    }

    let target_start = mapping_domain.last().map_or(0, |&last| last + 1);

    for (index_target, literal_target) in Implementation::literals_target(rule_target)
        .iter()
        .enumerate()
        .skip(target_start)
    {
        mapping_domain.push(index_target);

        for literal_source in Implementation::literals_source(rule_source) {
            if !literal_source.compatible(literal_target) {
                continue;
            }

            assignments.increase_depth();

            if !Implementation::extend_assignment(
                literal_source,
                literal_target,
                assignments,
                strategy,
            ) {
                assignments.decrease_depth();
                continue;
            }

            let descend = match Implementation::check_conditions(
                mapping_domain,
                rule_source,
                rule_target,
                assignments,
            ) {
                RelianceCheckResult::Success => return true,
                RelianceCheckResult::Extend => true,
                RelianceCheckResult::Abort => !strategy.early_termination,
            };

            if descend
                && extend::<Implementation>(
                    mapping_domain,
                    rule_source,
                    rule_target,
                    assignments,
                    strategy,
                    deadline,
                )
            {
                return true;
            }

            assignments.decrease_depth();
        }

        mapping_domain.pop();
    }

    false
}

/// Check a single total mapping, where `mapping[i] == 0` leaves target literal `i` unmapped
/// and `mapping[i] == j + 1` maps it onto source literal `j`.
fn check_total_mapping<Implementation: RelianceImplementation>(
    mapping: &[usize],
    rule_source: &Rule,
    rule_target: &Rule,
    strategy: RelianceStrategy,
) -> bool {
    let literals_source = Implementation::literals_source(rule_source);
    let literals_target = Implementation::literals_target(rule_target);

    let mut assignments = Implementation::new_assignments(rule_source, rule_target);
    let mut mapping_domain = Vec::new();

    for (index_target, &choice) in mapping.iter().enumerate() {
        let Some(index_source) = choice.checked_sub(1) else {
            continue;
        };

        mapping_domain.push(index_target);

        let literal_source = &literals_source[index_source];
        let literal_target = &literals_target[index_target];

        if !literal_source.compatible(literal_target)
            || !Implementation::extend_assignment(
                literal_source,
                literal_target,
                &mut assignments,
                strategy,
            )
        {
            return false;
        }
    }

    !mapping_domain.is_empty()
        && Implementation::check_conditions(&mapping_domain, rule_source, rule_target, &assignments)
            == RelianceCheckResult::Success
}

/// Enumerate every total mapping from target literals to source literals (or to nothing).
///
/// Much slower than [`extend`]; kept for cross-checking its results.
///
/// Returns `true` if a reliance was found or the deadline tripped.
fn iterate_all<Implementation: RelianceImplementation>(
    rule_source: &Rule,
    rule_target: &Rule,
    strategy: RelianceStrategy,
    deadline: &mut Deadline,
) -> bool {
    let source_count = Implementation::literals_source(rule_source).len();
    let target_count = Implementation::literals_target(rule_target).len();

    if target_count == 0 {
        return false;
    }

    let mut mapping = vec![0usize; target_count];

    loop {
        if deadline.expired_sparse() {
            return true;
        }

        if check_total_mapping::<Implementation>(&mapping, rule_source, rule_target, strategy) {
            return true;
        }

        // Advance to the next mapping, last position first
        let mut position = target_count;
        loop {
            if position == 0 {
                return false;
            }
            position -= 1;

            mapping[position] += 1;
            if mapping[position] <= source_count {
                break;
            }

            mapping[position] = 0;
        }
    }
}

/// Search for a reliance of the given type between two rules.
pub(super) fn search<Implementation: RelianceImplementation>(
    rule_source: &Rule,
    rule_target: &Rule,
    strategy: RelianceStrategy,
    deadline: &mut Deadline,
) -> SearchOutcome {
    let found = if strategy.better_iterate {
        let mut assignments = Implementation::new_assignments(rule_source, rule_target);
        let mut mapping_domain = Vec::new();

        extend::<Implementation>(
            &mut mapping_domain,
            rule_source,
            rule_target,
            &mut assignments,
            strategy,
            deadline,
        )
    } else {
        iterate_all::<Implementation>(rule_source, rule_target, strategy, deadline)
    };

    if deadline.is_tripped() {
        SearchOutcome::Interrupted
    } else if found {
        SearchOutcome::Reliance
    } else {
        SearchOutcome::NoReliance
    }
}

/// Return the literals whose index is not contained in `mapping_domain`
/// together with their indices.
pub(super) fn split_not_mapped<'a>(
    literals: &'a [Literal],
    mapping_domain: &[usize],
) -> (Vec<&'a Literal>, Vec<usize>) {
    literals
        .iter()
        .enumerate()
        .filter(|(index, _)| mapping_domain.binary_search(index).is_err())
        .map(|(index, literal)| (literal, index))
        .unzip()
}

/// Return the position of the first literal containing a term of the given kind
/// that is assigned to a null.
fn first_null<'a>(
    literals: impl IntoIterator<Item = &'a Literal>,
    assignments: &VariableAssignments,
    side: Side,
    kind: fn(&Term) -> bool,
) -> Option<usize> {
    literals.into_iter().position(|literal| {
        literal.terms().iter().any(|term| {
            kind(term)
                && term.variable().is_some_and(|variable| {
                    assignments
                        .constant(variable, side)
                        .is_some_and(|value| value.is_null())
                })
        })
    })
}

/// Return the position of the first literal containing a universal variable assigned to a null.
pub(super) fn first_null_universal<'a>(
    literals: impl IntoIterator<Item = &'a Literal>,
    assignments: &VariableAssignments,
    side: Side,
) -> Option<usize> {
    first_null(literals, assignments, side, Term::is_universal)
}

/// Return the position of the first literal containing an existential variable assigned to a null.
pub(super) fn first_null_existential<'a>(
    literals: impl IntoIterator<Item = &'a Literal>,
    assignments: &VariableAssignments,
    side: Side,
) -> Option<usize> {
    first_null(literals, assignments, side, Term::is_existential)
}

/// Decide what to do if the not mapped literal at `position` forces the mapping to grow.
///
/// Literals before the last mapped one will never be mapped by an extension of the current mapping.
pub(super) fn extend_or_abort(
    position: usize,
    not_mapped_indices: &[usize],
    mapping_domain: &[usize],
) -> RelianceCheckResult {
    let index = not_mapped_indices[position];

    if mapping_domain.last().is_some_and(|&last| index < last) {
        RelianceCheckResult::Abort
    } else {
        RelianceCheckResult::Extend
    }
}
