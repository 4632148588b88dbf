//! Checks whether a set of literals is already modeled by other literals
//! under a partial variable assignment.

use std::collections::{HashMap, HashSet};

use crate::model::Literal;

use super::{
    assignment::{Side, VariableAssignments},
    term_info::{term_info_models, terms_equal, TermInfo},
};

/// Possible images of the existential variables of one literal,
/// keyed by the signed id of the variable.
type ExistentialMapping = HashMap<i64, TermInfo>;

/// Return `false` if some literal of `right` uses a predicate that does not occur in `left`.
///
/// Used to skip entailment checks that can never succeed.
pub(crate) fn possibly_satisfied<'b>(
    right: &[Literal],
    left: impl IntoIterator<Item = &'b Literal>,
) -> bool {
    let predicates = left
        .into_iter()
        .map(Literal::predicate)
        .collect::<HashSet<_>>();

    right
        .iter()
        .all(|literal| predicates.contains(&literal.predicate()))
}

/// Incremental check whether a fixed list of literals (the right side)
/// is entailed by the union of several lists of literals (the left side).
///
/// Literals of the right side that contain existential variables
/// are treated as obligations if `existentials_as_variables` is set:
/// they hold if their existential variables can be mapped consistently
/// across all such literals.
#[derive(Debug)]
pub(crate) struct Entailment<'a> {
    right: &'a [Literal],
    right_side: Side,
    assignments: &'a VariableAssignments,

    /// Satisfaction of every literal that is not an obligation
    satisfied: Vec<bool>,
    /// Index into `candidates` for every obligation
    obligations: Vec<Option<usize>>,
    /// Consistent mappings found so far, one list per obligation
    candidates: Vec<Vec<ExistentialMapping>>,
}

impl<'a> Entailment<'a> {
    /// Start an entailment check for the literals in `right`.
    pub(crate) fn new(
        right: &'a [Literal],
        right_side: Side,
        assignments: &'a VariableAssignments,
        existentials_as_variables: bool,
    ) -> Self {
        let mut candidates = Vec::new();
        let obligations = right
            .iter()
            .map(|literal| {
                if existentials_as_variables && literal.is_existential() {
                    candidates.push(Vec::new());
                    Some(candidates.len() - 1)
                } else {
                    None
                }
            })
            .collect();

        Self {
            right,
            right_side,
            assignments,
            satisfied: vec![false; right.len()],
            obligations,
            candidates,
        }
    }

    /// Add literals to the left side.
    ///
    /// If `default_assign` is set, existential variables in `left`
    /// are treated as fresh nulls.
    pub(crate) fn add<'b>(
        &mut self,
        left: impl IntoIterator<Item = &'b Literal> + Clone,
        left_side: Side,
        default_assign: bool,
    ) -> &mut Self {
        let right = self.right;

        for (right_index, right_literal) in right.iter().enumerate() {
            match self.obligations[right_index] {
                Some(slot) => {
                    for left_literal in left.clone() {
                        if !left_literal.compatible(right_literal) {
                            continue;
                        }

                        if let Some(mapping) =
                            self.existential_mapping(left_literal, left_side, right_literal, default_assign)
                        {
                            self.candidates[slot].push(mapping);
                        }
                    }
                }
                None => {
                    if self.satisfied[right_index] {
                        continue;
                    }

                    let satisfied = left.clone().into_iter().any(|left_literal| {
                        left_literal.compatible(right_literal)
                            && self.models_literal(left_literal, left_side, right_literal, default_assign)
                    });
                    self.satisfied[right_index] = satisfied;
                }
            }
        }

        self
    }

    fn left_info(&self, literal: &Literal, position: usize, side: Side, default_assign: bool) -> TermInfo {
        term_info_models(&literal.terms()[position], self.assignments, side, default_assign)
    }

    fn right_info(&self, literal: &Literal, position: usize) -> TermInfo {
        term_info_models(&literal.terms()[position], self.assignments, self.right_side, false)
    }

    /// Return `true` if `left` equals `right` under the current assignment.
    fn models_literal(&self, left: &Literal, left_side: Side, right: &Literal, default_assign: bool) -> bool {
        (0..right.arity()).all(|position| {
            terms_equal(
                &self.left_info(left, position, left_side, default_assign),
                &self.right_info(right, position),
            )
        })
    }

    /// Compute the images of the existential variables of `right` in `left`,
    /// if the remaining terms match.
    fn existential_mapping(
        &self,
        left: &Literal,
        left_side: Side,
        right: &Literal,
        default_assign: bool,
    ) -> Option<ExistentialMapping> {
        let mut mapping = ExistentialMapping::new();

        for (position, right_term) in right.terms().iter().enumerate() {
            let left_info = self.left_info(left, position, left_side, default_assign);

            if right_term.is_existential() {
                match mapping.get(&right_term.id()) {
                    Some(image) => {
                        if !terms_equal(image, &left_info) {
                            return None;
                        }
                    }
                    None => {
                        mapping.insert(right_term.id(), left_info);
                    }
                }
            } else if !terms_equal(&left_info, &self.right_info(right, position)) {
                return None;
            }
        }

        Some(mapping)
    }

    /// Return `true` if the right side is entailed by everything added so far.
    pub(crate) fn holds(&self) -> bool {
        let all_satisfied = self
            .obligations
            .iter()
            .zip(self.satisfied.iter())
            .all(|(obligation, satisfied)| obligation.is_some() || *satisfied);

        all_satisfied && (self.candidates.is_empty() || consistent_mappings(&self.candidates))
    }
}

/// Merge `mapping` into `combined`.
///
/// Returns `false` if both assign different images to some variable.
fn merge_mapping(combined: &mut ExistentialMapping, mapping: &ExistentialMapping) -> bool {
    for (variable, image) in mapping {
        match combined.get(variable) {
            Some(existing) => {
                if !terms_equal(existing, image) {
                    return false;
                }
            }
            None => {
                combined.insert(*variable, *image);
            }
        }
    }

    true
}

fn consistent_from(combined: &ExistentialMapping, candidates: &[Vec<ExistentialMapping>]) -> bool {
    let Some((first, rest)) = candidates.split_first() else {
        return true;
    };

    first.iter().any(|mapping| {
        let mut extended = combined.clone();
        merge_mapping(&mut extended, mapping) && consistent_from(&extended, rest)
    })
}

/// Return `true` if one mapping can be chosen per obligation
/// such that all chosen mappings agree.
fn consistent_mappings(candidates: &[Vec<ExistentialMapping>]) -> bool {
    if candidates.iter().any(Vec::is_empty) {
        return false;
    }

    consistent_from(&ExistentialMapping::new(), candidates)
}

#[cfg(test)]
mod test {
    use test_log::test;

    use crate::{
        io::parser::parse_program,
        reliance::assignment::{Side, VariableAssignments},
    };

    use super::{possibly_satisfied, Entailment};

    #[test]
    fn datalog_heads_are_checked_literal_by_literal() {
        let program = parse_program(
            "h(?x), g(?x) :- b(?x) .
             b(?x), h(?x) :- g(?x) .",
        )
        .unwrap();
        let first = &program.rules()[0];
        let second = &program.rules()[1];
        let assignments = VariableAssignments::new(first.variable_count(), second.variable_count());

        let mut entailment = Entailment::new(first.head(), Side::From, &assignments, true);
        entailment.add(first.body(), Side::From, false);
        assert!(!entailment.holds());

        // Variables of different rules are different unless unified.
        entailment.add(second.head(), Side::To, false);
        assert!(!entailment.holds());

        let mut entailment = Entailment::new(first.head(), Side::From, &assignments, true);
        entailment.add(first.head(), Side::From, false);
        assert!(entailment.holds());
    }

    #[test]
    fn existential_obligations_need_consistent_images() {
        let program = parse_program(
            "h(?x, !v), g(!v) :- b(?x) .
             h(?x, ?y), g(?z) :- b(?x), c(?y), c(?z) .
             h(?x, ?y), g(?y) :- b(?x), c(?y) .",
        )
        .unwrap();
        let first = &program.rules()[0];
        let second = &program.rules()[1];
        let third = &program.rules()[2];

        let mut assignments = VariableAssignments::new(
            first.variable_count(),
            second.variable_count().max(third.variable_count()),
        );
        assignments.connect_variables(1, 1);
        assignments.finish_group_assignments();

        // `!v` would have to be mapped to both `?y` and `?z`.
        let mut entailment = Entailment::new(first.head(), Side::From, &assignments, true);
        entailment.add(second.head(), Side::To, false);
        assert!(!entailment.holds());

        let mut entailment = Entailment::new(first.head(), Side::From, &assignments, true);
        entailment.add(third.head(), Side::To, false);
        assert!(entailment.holds());

        // Treated as a null, `!v` only equals itself.
        let mut entailment = Entailment::new(first.head(), Side::From, &assignments, false);
        entailment.add(third.head(), Side::To, false);
        assert!(!entailment.holds());
    }

    #[test]
    fn predicates_must_be_present() {
        let program = parse_program(
            "h(?x) :- b(?x) .
             g(?x) :- h(?x) .",
        )
        .unwrap();
        let first = &program.rules()[0];
        let second = &program.rules()[1];

        assert!(possibly_satisfied(first.head(), second.body()));
        assert!(!possibly_satisfied(first.head(), first.body()));
        assert!(!possibly_satisfied(
            second.head(),
            first.body().iter().chain(first.head())
        ));
    }
}
