//! Functionality for implementing self-restraint reliances.

use std::collections::HashSet;

use crate::model::{Literal, Rule, Term};

use super::{
    assignment::{Side, VariableAssignments},
    common::{
        extend_or_abort, first_null_existential, first_null_universal, split_not_mapped,
        RelianceCheckResult, RelianceImplementation,
    },
    models::{possibly_satisfied, Entailment},
    strategy::RelianceStrategy,
    term_info::{term_info_unify_self, unify_terms},
};

/// A rule restrains itself if a single application of the rule
/// may produce witnesses that make part of its own output redundant.
///
/// Head literals of the rule are mapped onto head literals of the same rule.
/// Source and target share the variables, so only [`Side::From`] is used.
#[derive(Debug)]
pub(super) struct SelfRestraintReliance {}

impl SelfRestraintReliance {
    /// Return `true` if applying the mapping to the head of `rule`
    /// leaves fewer distinct nulls than there are existential variables.
    fn is_null_reducing(rule: &Rule, assignments: &VariableAssignments) -> bool {
        let mut existentials = HashSet::new();
        let mut nulls = HashSet::new();

        for term in rule.head().iter().flat_map(Literal::terms) {
            let Term::Existential(variable) = term else {
                continue;
            };

            existentials.insert(*variable);

            match assignments.constant(*variable, Side::From) {
                Some(value) if value.is_null() => {
                    nulls.insert(value);
                }
                _ => return true,
            }
        }

        nulls.len() < existentials.len()
    }
}

impl RelianceImplementation for SelfRestraintReliance {
    fn literals_source(rule: &Rule) -> &[Literal] {
        rule.head()
    }

    fn literals_target(rule: &Rule) -> &[Literal] {
        rule.head()
    }

    fn new_assignments(rule_source: &Rule, _rule_target: &Rule) -> VariableAssignments {
        VariableAssignments::new(rule_source.variable_count(), 0)
    }

    fn extend_assignment(
        literal_source: &Literal,
        literal_target: &Literal,
        assignments: &mut VariableAssignments,
        _strategy: RelianceStrategy,
    ) -> bool {
        for (term_source, term_target) in literal_source.terms().iter().zip(literal_target.terms()) {
            let info_source = term_info_unify_self(term_source, assignments, Side::From);
            let info_target = term_info_unify_self(term_target, assignments, Side::To);

            if !unify_terms(&info_source, &info_target, assignments) {
                return false;
            }
        }

        assignments.finish_group_assignments();

        true
    }

    fn check_conditions(
        mapping_domain: &[usize],
        rule: &Rule,
        _rule_target: &Rule,
        assignments: &VariableAssignments,
    ) -> RelianceCheckResult {
        let (head_notmapped, notmapped_indices) = split_not_mapped(rule.head(), mapping_domain);

        if first_null_universal(rule.body(), assignments, Side::From).is_some() {
            return RelianceCheckResult::Abort;
        }

        if !Self::is_null_reducing(rule, assignments) {
            return RelianceCheckResult::Abort;
        }

        if let Some(position) =
            first_null_existential(head_notmapped.iter().copied(), assignments, Side::From)
        {
            return extend_or_abort(position, &notmapped_indices, mapping_domain);
        }

        // The rule would not be applicable since its head is already satisfied
        if possibly_satisfied(
            rule.head(),
            rule.body().iter().chain(head_notmapped.iter().copied()),
        ) {
            let mut entailment = Entailment::new(rule.head(), Side::From, assignments, true);
            entailment
                .add(rule.body(), Side::From, false)
                .add(head_notmapped.iter().copied(), Side::From, false);

            if entailment.holds() {
                return RelianceCheckResult::Extend;
            }
        }

        RelianceCheckResult::Success
    }
}
