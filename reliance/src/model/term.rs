//! Terms and the identifiers they are built from.

use std::fmt::Display;

use serde::Serialize;

/// Index of a variable within a single rule.
///
/// Universal and existential variables of one rule share the same index space,
/// which starts at 1.
pub type VariableIndex = u32;

/// Identifier of an interned predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct PredicateId(pub usize);

impl Display for PredicateId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "p{}", self.0)
    }
}

/// Identifier of an interned constant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ConstantId(pub usize);

impl Display for ConstantId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "c{}", self.0)
    }
}

/// A term occurring in a rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Term {
    /// A constant value.
    Constant(ConstantId),
    /// A universally quantified variable, bound by the rule body.
    Universal(VariableIndex),
    /// An existentially quantified variable, occurring only in the rule head.
    Existential(VariableIndex),
}

impl Term {
    /// Signed identifier of this term:
    /// zero for constants, the positive index for universal variables
    /// and the negated index for existential variables.
    pub fn id(&self) -> i64 {
        match self {
            Term::Constant(_) => 0,
            Term::Universal(index) => i64::from(*index),
            Term::Existential(index) => -i64::from(*index),
        }
    }

    /// Return the variable index if this term is a variable.
    pub fn variable(&self) -> Option<VariableIndex> {
        match self {
            Term::Constant(_) => None,
            Term::Universal(index) | Term::Existential(index) => Some(*index),
        }
    }

    /// Return `true` if this term is a constant.
    pub fn is_constant(&self) -> bool {
        matches!(self, Term::Constant(_))
    }

    /// Return `true` if this term is a universal variable.
    pub fn is_universal(&self) -> bool {
        matches!(self, Term::Universal(_))
    }

    /// Return `true` if this term is an existential variable.
    pub fn is_existential(&self) -> bool {
        matches!(self, Term::Existential(_))
    }
}

impl Display for Term {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Term::Constant(constant) => write!(f, "{constant}"),
            Term::Universal(index) => write!(f, "?v{index}"),
            Term::Existential(index) => write!(f, "!v{index}"),
        }
    }
}

#[cfg(test)]
mod test {
    use test_log::test;

    use super::{ConstantId, Term};

    #[test]
    fn signed_identifiers() {
        assert_eq!(Term::Constant(ConstantId(7)).id(), 0);
        assert_eq!(Term::Universal(3).id(), 3);
        assert_eq!(Term::Existential(3).id(), -3);

        assert_eq!(Term::Existential(2).variable(), Some(2));
        assert_eq!(Term::Constant(ConstantId(2)).variable(), None);
    }
}
