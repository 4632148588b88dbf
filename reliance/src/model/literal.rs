//! Literals, i.e. predicates applied to a tuple of terms.

use super::term::{PredicateId, Term, VariableIndex};

/// A positive literal.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Literal {
    predicate: PredicateId,
    terms: Vec<Term>,
}

impl Literal {
    /// Create a new [`Literal`].
    pub fn new(predicate: PredicateId, terms: Vec<Term>) -> Self {
        Self { predicate, terms }
    }

    /// Return the predicate of this literal.
    pub fn predicate(&self) -> PredicateId {
        self.predicate
    }

    /// Return the terms of this literal.
    pub fn terms(&self) -> &[Term] {
        &self.terms
    }

    /// Return the number of terms.
    pub fn arity(&self) -> usize {
        self.terms.len()
    }

    /// Two literals are compatible if they could be unified,
    /// i.e. they share the same predicate and arity.
    pub fn compatible(&self, other: &Literal) -> bool {
        self.predicate == other.predicate && self.arity() == other.arity()
    }

    /// Return an iterator over the variables of this literal (with repetitions).
    pub fn variables(&self) -> impl Iterator<Item = VariableIndex> + '_ {
        self.terms.iter().filter_map(Term::variable)
    }

    /// Return an iterator over the existential variables of this literal (with repetitions).
    pub fn existential_variables(&self) -> impl Iterator<Item = VariableIndex> + '_ {
        self.terms.iter().filter_map(|term| match term {
            Term::Existential(index) => Some(*index),
            _ => None,
        })
    }

    /// Return `true` if this literal mentions an existential variable.
    pub fn is_existential(&self) -> bool {
        self.terms.iter().any(Term::is_existential)
    }
}
