//! Existential rules.

use std::collections::HashSet;

use super::{literal::Literal, term::VariableIndex};

/// An existential rule `head :- body`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    id: usize,
    head: Vec<Literal>,
    body: Vec<Literal>,
    /// Sorted and free of duplicates
    existential_variables: Vec<VariableIndex>,
    /// Number of body literals whose predicate occurs in the head of some rule
    derived_body_literals: usize,
    /// Source names of the variables; position `i` names variable `i + 1`
    variable_names: Vec<String>,
}

impl Rule {
    /// Create a new [`Rule`].
    ///
    /// The identifier is assigned once the rule becomes part of a [`super::Program`].
    pub fn new(head: Vec<Literal>, body: Vec<Literal>) -> Self {
        let mut existential_variables = head
            .iter()
            .flat_map(Literal::existential_variables)
            .collect::<Vec<_>>();
        existential_variables.sort_unstable();
        existential_variables.dedup();

        Self {
            id: 0,
            head,
            body,
            existential_variables,
            derived_body_literals: 0,
            variable_names: Vec::new(),
        }
    }

    /// Attach the names under which the variables were written in the source.
    pub fn with_variable_names(mut self, names: Vec<String>) -> Self {
        self.variable_names = names;
        self
    }

    pub(crate) fn set_id(&mut self, id: usize) {
        self.id = id;
    }

    pub(crate) fn set_derived_body_literals(&mut self, count: usize) {
        self.derived_body_literals = count;
    }

    /// Return the identifier of this rule.
    pub fn id(&self) -> usize {
        self.id
    }

    /// Return the head literals.
    pub fn head(&self) -> &[Literal] {
        &self.head
    }

    /// Return the body literals.
    pub fn body(&self) -> &[Literal] {
        &self.body
    }

    /// Return the existential variables of this rule in ascending order.
    pub fn existential_variables(&self) -> &[VariableIndex] {
        &self.existential_variables
    }

    /// Return `true` if the head of this rule contains an existential variable.
    pub fn is_existential(&self) -> bool {
        !self.existential_variables.is_empty()
    }

    /// Return the number of body literals over derived predicates.
    pub fn derived_body_literals(&self) -> usize {
        self.derived_body_literals
    }

    /// Size of a variable index space able to hold every variable of this rule,
    /// i.e. the largest variable index plus one.
    pub fn variable_count(&self) -> usize {
        self.head
            .iter()
            .chain(self.body.iter())
            .flat_map(Literal::variables)
            .max()
            .map_or(1, |index| index as usize + 1)
    }

    /// Return the source name of the given variable, if known.
    pub fn variable_name(&self, variable: VariableIndex) -> Option<&str> {
        (variable as usize)
            .checked_sub(1)
            .and_then(|position| self.variable_names.get(position))
            .map(String::as_str)
    }

    /// Split the head of this rule into pieces,
    /// i.e. maximal sets of head literals connected through shared existential variables.
    ///
    /// Returns one rule per piece, each with the body of this rule.
    /// Head literals without existential variables form a piece of their own.
    pub fn split_into_pieces(&self) -> Vec<Rule> {
        let mut assigned = vec![false; self.head.len()];
        let mut pieces = Vec::new();

        for start in 0..self.head.len() {
            if assigned[start] {
                continue;
            }

            let mut piece = Vec::new();
            let mut stack = vec![start];
            assigned[start] = true;

            while let Some(current) = stack.pop() {
                piece.push(current);

                let shared = self.head[current]
                    .existential_variables()
                    .collect::<HashSet<_>>();
                if shared.is_empty() {
                    continue;
                }

                for (candidate, literal) in self.head.iter().enumerate() {
                    if assigned[candidate] {
                        continue;
                    }

                    if literal
                        .existential_variables()
                        .any(|variable| shared.contains(&variable))
                    {
                        assigned[candidate] = true;
                        stack.push(candidate);
                    }
                }
            }

            piece.sort_unstable();

            let head = piece
                .into_iter()
                .map(|index| self.head[index].clone())
                .collect();
            let mut rule = Rule::new(head, self.body.clone())
                .with_variable_names(self.variable_names.clone());
            rule.id = self.id;
            rule.derived_body_literals = self.derived_body_literals;

            pieces.push(rule);
        }

        pieces
    }
}

#[cfg(test)]
mod test {
    use test_log::test;

    use crate::io::parser::parse_program;

    #[test]
    fn pieces_follow_shared_existentials() {
        let program = parse_program(
            "r(?x, ?x, !w), r(?x, !v, !w), a(!v), q(?x) :- b(?x) .
             h(?x, !v), t(!v, !w), s(!w) :- b(?x) .",
        )
        .unwrap();

        let pieces = program.rules()[0].split_into_pieces();
        assert_eq!(pieces.len(), 2);
        assert_eq!(pieces[0].head().len(), 3);
        assert_eq!(pieces[1].head().len(), 1);
        assert!(!pieces[1].is_existential());

        assert_eq!(program.rules()[1].split_into_pieces().len(), 1);
    }

    #[test]
    fn variable_count_covers_all_variables() {
        let program = parse_program("h(?x, !v) :- b(?x, ?y) .").unwrap();
        let rule = &program.rules()[0];

        assert_eq!(rule.variable_count(), 4);
        assert_eq!(rule.existential_variables(), &[3]);
        assert_eq!(rule.variable_name(3), Some("v"));
    }
}
