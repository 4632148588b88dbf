//! Structural fingerprints of rule pairs used to memoize reliance checks.
//!
//! Two pairs of rules receive the same key if they are equal
//! up to a consistent renaming of predicates.

use std::collections::HashMap;

use crate::model::{Literal, PredicateId, Rule, Term};

/// Fingerprint of a single rule.
///
/// Predicates are numbered in order of their first occurrence,
/// heads before bodies.
#[derive(Debug, Clone, Default)]
pub(crate) struct RuleHashInfo {
    predicate_to_local: HashMap<PredicateId, usize>,
    local_predicate: usize,
    /// Terms followed by the local predicate numbers of the rule
    first_rule_string: String,
    /// Terms of the rule only
    second_rule_string: String,
}

impl RuleHashInfo {
    /// Compute the fingerprint of `rule`.
    pub(crate) fn new(rule: &Rule) -> Self {
        let mut result = Self::default();

        let mut literal_stream = String::new();
        let mut predicate_stream = String::new();

        for literal in rule.head() {
            let local = result.add_predicate(literal.predicate());
            predicate_stream.push_str(&format!("|{local}"));
            push_literal(&mut literal_stream, literal);
        }

        literal_stream.push('_');

        for literal in rule.body() {
            let local = result.add_predicate(literal.predicate());
            predicate_stream.push_str(&format!("|{local}"));
            push_literal(&mut literal_stream, literal);
        }

        result.first_rule_string = format!("{literal_stream}{predicate_stream}");
        result.second_rule_string = literal_stream;

        result
    }

    fn add_predicate(&mut self, predicate: PredicateId) -> usize {
        *self.predicate_to_local.entry(predicate).or_insert_with(|| {
            let local = self.local_predicate;
            self.local_predicate += 1;
            local
        })
    }
}

fn push_literal(stream: &mut String, literal: &Literal) {
    for term in literal.terms() {
        match term {
            Term::Constant(constant) => stream.push_str(&format!("c{},", constant.0)),
            Term::Universal(variable) => stream.push_str(&format!("v{variable},")),
            Term::Existential(variable) => stream.push_str(&format!("e{variable},")),
        }
    }

    stream.push(';');
}

/// Key identifying the pair (`from`, `to`) up to renaming of predicates.
///
/// `rule_to` must be the rule `to` was computed from.
/// Local predicate numbers of `to` continue the numbering of `from`,
/// so shared predicates are recognized.
pub(crate) fn pair_hash(
    from: &RuleHashInfo,
    to: &RuleHashInfo,
    rule_to: &Rule,
    self_pair: bool,
) -> String {
    let mut from = from.clone();
    let mut result = format!(
        "{}#{}",
        from.first_rule_string, to.second_rule_string
    );

    for literal in rule_to.head().iter().chain(rule_to.body()) {
        let local = from.add_predicate(literal.predicate());
        result.push_str(&format!("|{local}"));
    }

    if self_pair {
        result.push('!');
    }

    result
}

#[cfg(test)]
mod test {
    use test_log::test;

    use crate::io::parser::parse_program;

    use super::{pair_hash, RuleHashInfo};

    #[test]
    fn renamed_predicates_share_a_key() {
        let program = parse_program(
            "a(?x, !v) :- b(?x) .
             c(?x) :- a(?x, ?y) .
             d(?x, !v) :- e(?x) .
             f(?x) :- d(?x, ?y) .
             g(?x) :- k(?x, ?y) .",
        )
        .unwrap();
        let rules = program.rules();
        let infos = rules.iter().map(RuleHashInfo::new).collect::<Vec<_>>();

        let first = pair_hash(&infos[0], &infos[1], &rules[1], false);
        let second = pair_hash(&infos[2], &infos[3], &rules[3], false);
        assert_eq!(first, second);

        // The body predicate of the second rule does not occur in the first
        let third = pair_hash(&infos[2], &infos[4], &rules[4], false);
        assert_ne!(first, third);

        let self_pair = pair_hash(&infos[0], &infos[0], &rules[0], true);
        let same_shape = pair_hash(&infos[2], &infos[2], &rules[2], false);
        assert_ne!(self_pair, same_shape);
    }
}
