//! Functionality for implementing positive reliances.

use crate::model::{Literal, Rule};

use super::{
    assignment::{Side, VariableAssignments},
    common::{
        extend_or_abort, first_null_universal, split_not_mapped, RelianceCheckResult,
        RelianceImplementation,
    },
    models::{possibly_satisfied, Entailment},
    strategy::RelianceStrategy,
    term_info::{term_info_unify, unify_terms, TermKind},
};

/// The source rule positively relies on the target rule
/// if applying the source rule may lead to a new application of the target rule.
///
/// Body literals of the target rule are mapped onto head literals of the source rule.
#[derive(Debug)]
pub(super) struct PositiveReliance {}

impl RelianceImplementation for PositiveReliance {
    fn literals_source(rule: &Rule) -> &[Literal] {
        rule.head()
    }

    fn literals_target(rule: &Rule) -> &[Literal] {
        rule.body()
    }

    fn extend_assignment(
        literal_source: &Literal,
        literal_target: &Literal,
        assignments: &mut VariableAssignments,
        strategy: RelianceStrategy,
    ) -> bool {
        for (term_source, term_target) in literal_source.terms().iter().zip(literal_target.terms()) {
            let info_source = term_info_unify(term_source, assignments, Side::From);
            let info_target = term_info_unify(term_target, assignments, Side::To);

            // A universal variable of the source rule may not be bound to a null
            if strategy.early_termination
                && info_source.kind == TermKind::Universal
                && info_target.is_null()
            {
                return false;
            }

            if !unify_terms(&info_source, &info_target, assignments) {
                return false;
            }
        }

        assignments.finish_group_assignments();

        true
    }

    fn check_conditions(
        mapping_domain: &[usize],
        rule_source: &Rule,
        rule_target: &Rule,
        assignments: &VariableAssignments,
    ) -> RelianceCheckResult {
        let (body_target_notmapped, notmapped_indices) =
            split_not_mapped(rule_target.body(), mapping_domain);

        // The body of the source rule cannot contain nulls before it is applied
        if first_null_universal(rule_source.body(), assignments, Side::From).is_some() {
            return RelianceCheckResult::Abort;
        }

        // Remaining body literals of the target rule containing nulls have to be mapped
        if let Some(position) =
            first_null_universal(body_target_notmapped.iter().copied(), assignments, Side::To)
        {
            return extend_or_abort(position, &notmapped_indices, mapping_domain);
        }

        let before_source = || {
            rule_source
                .body()
                .iter()
                .chain(body_target_notmapped.iter().copied())
        };

        // The source rule would not be applicable since its head is already satisfied
        if possibly_satisfied(rule_source.head(), before_source()) {
            let mut entailment = Entailment::new(rule_source.head(), Side::From, assignments, true);
            entailment
                .add(rule_source.body(), Side::From, false)
                .add(body_target_notmapped.iter().copied(), Side::To, false);

            if entailment.holds() {
                return RelianceCheckResult::Extend;
            }
        }

        // The target rule would have been applicable before applying the source rule
        if possibly_satisfied(rule_target.body(), before_source()) {
            let mut entailment = Entailment::new(rule_target.body(), Side::To, assignments, true);
            entailment
                .add(rule_source.body(), Side::From, false)
                .add(body_target_notmapped.iter().copied(), Side::To, false);

            if entailment.holds() {
                return RelianceCheckResult::Extend;
            }
        }

        // The target rule is already satisfied after applying the source rule
        if possibly_satisfied(
            rule_target.head(),
            before_source().chain(rule_source.head()),
        ) {
            let mut entailment = Entailment::new(rule_target.head(), Side::To, assignments, true);
            entailment
                .add(rule_source.body(), Side::From, false)
                .add(body_target_notmapped.iter().copied(), Side::To, false)
                .add(rule_source.head(), Side::From, false);

            if entailment.holds() {
                return RelianceCheckResult::Abort;
            }
        }

        RelianceCheckResult::Success
    }
}

#[cfg(test)]
mod test {
    use test_log::test;

    use crate::{
        io::parser::parse_program,
        reliance::{
            common::{search, SearchOutcome},
            deadline::Deadline,
            strategy::RelianceStrategy,
        },
    };

    use super::PositiveReliance;

    fn relies(rule_a: &str, rule_b: &str) -> bool {
        let program = parse_program(format!("{rule_a}\n{rule_b}")).unwrap();
        let rules = program.rules();

        let mut results = Vec::new();
        for strategy in [RelianceStrategy::full(), RelianceStrategy::naive()] {
            let outcome = search::<PositiveReliance>(
                &rules[0],
                &rules[1],
                strategy,
                &mut Deadline::unbounded(),
            );
            results.push(outcome == SearchOutcome::Reliance);
        }

        assert_eq!(results[0], results[1], "incremental and exhaustive search disagree");
        results[0]
    }

    #[test]
    fn positive_constants() {
        assert!(relies("a(c1, c2) :- b(c2, c1) .", "c(c2, c1) :- a(c1, c2) ."));
    }

    #[test]
    fn positive_simple() {
        assert!(relies("a(?x, !v) :- b(?x, ?y) .", "c(?x, ?y) :- a(?x, ?y) ."));
    }

    #[test]
    fn positive_null() {
        // Unification forces a null to be present before applying the first rule
        assert!(!relies("h(?x, !v) :- b(?x) .", "c(?y) :- h(?y, ?y) ."));
        // There is no way to obtain c(null)
        assert!(!relies("h(?x, !v) :- b(?x) .", "d(?x, ?y) :- h(?x, ?y), c(?y) ."));
    }

    #[test]
    fn positive_phi2ia() {
        // Every time the first rule is applicable, so is the second
        assert!(!relies("a(?x, ?y), r(?x) :- a(?x, ?y) .", "b(?x, ?y) :- a(?x, ?y) ."));
    }

    #[test]
    fn positive_psi2ib_phi1() {
        // Body of the first rule satisfies the second rule
        assert!(!relies("b(?x, ?y) :- a(?x, ?y) .", "a(?x, !v) :- b(?x, ?y) ."));
        assert!(relies("a(?x, !v) :- b(?x, ?y) .", "b(?x, ?y) :- a(?x, ?y) ."));
    }

    #[test]
    fn positive_unification() {
        assert!(!relies("h(?x, ?x, const) :- b(?x) .", "c(!w) :- h(?y, other, ?y) ."));
        // Constant cannot be a null
        assert!(!relies("h(?x, !v, const) :- b(?x) .", "c(?y, ?z) :- h(?y, ?z, ?z) ."));
    }
}
