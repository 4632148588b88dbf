//! Functionality for implementing restraint reliances.

use crate::model::{Literal, Rule};

use super::{
    assignment::{Side, VariableAssignments},
    common::{
        extend_or_abort, first_null_existential, first_null_universal, split_not_mapped,
        RelianceCheckResult, RelianceImplementation,
    },
    models::{possibly_satisfied, Entailment},
    strategy::RelianceStrategy,
    term_info::{term_info_unify, unify_terms, TermKind},
};

/// The source rule is restrained by the target rule
/// if applying the target rule may render the witnesses
/// introduced by an earlier application of the source rule redundant.
///
/// Head literals of the target rule are mapped onto head literals of the source rule.
#[derive(Debug)]
pub(super) struct RestraintReliance {}

impl RelianceImplementation for RestraintReliance {
    fn literals_source(rule: &Rule) -> &[Literal] {
        rule.head()
    }

    fn literals_target(rule: &Rule) -> &[Literal] {
        rule.head()
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

            // We do not allow any assignment of a universal variable to a null
            if strategy.early_termination
                && (info_source.kind == TermKind::Universal
                    || info_target.kind == TermKind::Universal)
                && (info_source.is_null() || info_target.is_null())
            {
                return false;
            }

            if !unify_terms(&info_source, &info_target, assignments) {
                return false;
            }

            if info_target.kind == TermKind::Existential {
                assignments.mark_mapped_existential();
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
        let (head_target_notmapped, notmapped_indices) =
            split_not_mapped(rule_target.head(), mapping_domain);

        if first_null_universal(rule_source.body(), assignments, Side::From).is_some()
            || first_null_universal(rule_target.body(), assignments, Side::To).is_some()
        {
            return RelianceCheckResult::Abort;
        }

        if !assignments.has_mapped_existential() {
            return RelianceCheckResult::Extend;
        }

        if let Some(position) =
            first_null_existential(head_target_notmapped.iter().copied(), assignments, Side::To)
        {
            return extend_or_abort(position, &notmapped_indices, mapping_domain);
        }

        // The target rule would not be applicable since its head is already satisfied
        if possibly_satisfied(rule_target.head(), rule_target.body()) {
            let mut entailment = Entailment::new(rule_target.head(), Side::To, assignments, true);
            entailment.add(rule_target.body(), Side::To, false);

            if entailment.holds() {
                return RelianceCheckResult::Abort;
            }
        }

        // The head of the target rule is already present in a different form
        let mut alternative_match =
            Entailment::new(rule_target.head(), Side::To, assignments, false);
        alternative_match
            .add(rule_target.body(), Side::To, false)
            .add(rule_target.head(), Side::To, true)
            .add(rule_source.body(), Side::From, false)
            .add(head_target_notmapped.iter().copied(), Side::To, false);

        if alternative_match.holds() {
            return RelianceCheckResult::Extend;
        }

        // The source rule would not have been applicable
        if possibly_satisfied(
            rule_source.head(),
            rule_target
                .body()
                .iter()
                .chain(rule_target.head())
                .chain(rule_source.body())
                .chain(head_target_notmapped.iter().copied()),
        ) {
            let mut entailment = Entailment::new(rule_source.head(), Side::From, assignments, true);
            entailment
                .add(rule_target.body(), Side::To, false)
                .add(rule_target.head(), Side::To, true)
                .add(rule_source.body(), Side::From, false)
                .add(head_target_notmapped.iter().copied(), Side::To, false);

            if entailment.holds() {
                return RelianceCheckResult::Extend;
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

    use super::RestraintReliance;

    fn restrains(program: &str, source: usize, target: usize) -> bool {
        let program = parse_program(program).unwrap();
        let rules = program.rules();

        search::<RestraintReliance>(
            &rules[source],
            &rules[target],
            RelianceStrategy::full(),
            &mut Deadline::unbounded(),
        ) == SearchOutcome::Reliance
    }

    #[test]
    fn restraint_basic() {
        let program = "h(?x, !v) :- b(?x) .
                       h(?x, ?y) :- a(?x, ?y) .";

        assert!(restrains(program, 1, 0));
        assert!(!restrains(program, 0, 0));
    }

    #[test]
    fn restraint_within_rule() {
        // The second head literal can be obtained by mapping `!v` onto `?x`
        assert!(restrains("q(?x, !v), q(!v, !w) :- p(?x, ?y) .", 0, 0));
        // Every witness is needed
        assert!(!restrains("q(?x, !v), q(!v, ?x) :- p(?x, ?y) .", 0, 0));
        assert!(!restrains(
            "r(?x, ?x, !w), r(?x, !v, !w), a(!v) :- b(?x) .",
            0,
            0
        ));
    }

    #[test]
    fn restraint_needs_witness_bound_to_universal() {
        // `!v` of the earlier application is mapped onto `?y` of the later one
        assert!(restrains("e(?x, !v, !w), e(?x, ?y, !v) :- d(?x, ?y) .", 0, 0));
        // Witnesses mapped onto nulls still match their own head literal
        assert!(!restrains("q(?x, !v), q(?y, !v) :- p(?x, ?y) .", 0, 0));
        assert!(!restrains(
            "q(?x, !u), q(?y, !u), q(?z, !u) :- p(?x, ?y, ?z) .",
            0,
            0
        ));
    }
}
