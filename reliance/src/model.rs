//! The logical model of existential rules as consumed by the reliance analysis.
//!
//! Rules are stored in an index-based form:
//! predicates and constants are interned in a [`SymbolTable`],
//! and variables are numbered per rule starting at 1.

pub mod literal;
pub mod program;
pub mod rule;
pub mod term;

pub use literal::Literal;
pub use program::{Program, ProgramStatistics, SymbolTable};
pub use rule::Rule;
pub use term::{ConstantId, PredicateId, Term, VariableIndex};
