//! Programs, i.e. ordered collections of rules over a common vocabulary.

use std::{
    collections::{HashMap, HashSet},
    fmt::Display,
};

use serde::Serialize;

use super::{
    rule::Rule,
    term::{ConstantId, PredicateId, Term},
};

/// Interned names of predicates and constants.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SymbolTable {
    predicates: Vec<(String, usize)>,
    predicate_ids: HashMap<String, PredicateId>,
    constants: Vec<String>,
    constant_ids: HashMap<String, ConstantId>,
}

impl SymbolTable {
    /// Intern a predicate with the given arity.
    ///
    /// Returns the identifier together with the arity the predicate was first registered with.
    pub fn intern_predicate(&mut self, name: &str, arity: usize) -> (PredicateId, usize) {
        if let Some(id) = self.predicate_ids.get(name) {
            return (*id, self.predicates[id.0].1);
        }

        let id = PredicateId(self.predicates.len());
        self.predicates.push((name.to_string(), arity));
        self.predicate_ids.insert(name.to_string(), id);

        (id, arity)
    }

    /// Intern a constant.
    pub fn intern_constant(&mut self, name: &str) -> ConstantId {
        if let Some(id) = self.constant_ids.get(name) {
            return *id;
        }

        let id = ConstantId(self.constants.len());
        self.constants.push(name.to_string());
        self.constant_ids.insert(name.to_string(), id);

        id
    }

    /// Return the name of a predicate.
    pub fn predicate_name(&self, predicate: PredicateId) -> Option<&str> {
        self.predicates.get(predicate.0).map(|(name, _)| name.as_str())
    }

    /// Return the name of a constant.
    pub fn constant_name(&self, constant: ConstantId) -> Option<&str> {
        self.constants.get(constant.0).map(String::as_str)
    }

    /// Return the number of predicates.
    pub fn predicate_count(&self) -> usize {
        self.predicates.len()
    }
}

/// Counts describing the shape of a [`Program`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ProgramStatistics {
    /// Number of rules
    pub rules: usize,
    /// Number of rules with existential variables
    pub existential_rules: usize,
    /// Number of rules without existential variables
    pub datalog_rules: usize,
    /// Number of rules whose body only uses predicates that are never derived
    pub rules_without_derived_body: usize,
    /// Number of predicates
    pub predicates: usize,
    /// Number of predicates occurring in some rule head
    pub derived_predicates: usize,
}

/// An ordered list of rules.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Program {
    rules: Vec<Rule>,
    symbols: SymbolTable,
}

impl Program {
    /// Create a new [`Program`].
    ///
    /// Rule identifiers are set to their position in `rules`
    /// and derived body literals are counted with respect to this rule set.
    pub fn new(mut rules: Vec<Rule>, symbols: SymbolTable) -> Self {
        let derived = Self::derived_predicates(&rules);

        for (index, rule) in rules.iter_mut().enumerate() {
            let count = rule
                .body()
                .iter()
                .filter(|literal| derived.contains(&literal.predicate()))
                .count();

            rule.set_id(index);
            rule.set_derived_body_literals(count);
        }

        Self { rules, symbols }
    }

    fn derived_predicates(rules: &[Rule]) -> HashSet<PredicateId> {
        rules
            .iter()
            .flat_map(|rule| rule.head().iter().map(|literal| literal.predicate()))
            .collect()
    }

    /// Return the rules of this program.
    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Return the symbol table of this program.
    pub fn symbols(&self) -> &SymbolTable {
        &self.symbols
    }

    /// Return the number of rules.
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Return `true` if this program contains no rules.
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Return a displayable version of the given rule that uses the names of this program.
    pub fn display_rule<'a>(&'a self, rule: &'a Rule) -> DisplayRule<'a> {
        DisplayRule {
            rule,
            symbols: &self.symbols,
        }
    }

    /// Render the rule at the given index.
    pub fn rule_string(&self, index: usize) -> String {
        self.rules
            .get(index)
            .map(|rule| self.display_rule(rule).to_string())
            .unwrap_or_default()
    }

    /// Return a program in which every existential rule is replaced by its pieces.
    pub fn piece_decomposed(&self) -> Program {
        let rules = self
            .rules
            .iter()
            .flat_map(|rule| {
                if rule.is_existential() {
                    rule.split_into_pieces()
                } else {
                    vec![rule.clone()]
                }
            })
            .collect();

        Program::new(rules, self.symbols.clone())
    }

    /// Compute [`ProgramStatistics`] for this program.
    pub fn statistics(&self) -> ProgramStatistics {
        let existential_rules = self.rules.iter().filter(|rule| rule.is_existential()).count();

        ProgramStatistics {
            rules: self.rules.len(),
            existential_rules,
            datalog_rules: self.rules.len() - existential_rules,
            rules_without_derived_body: self
                .rules
                .iter()
                .filter(|rule| rule.derived_body_literals() == 0)
                .count(),
            predicates: self.symbols.predicate_count(),
            derived_predicates: Self::derived_predicates(&self.rules).len(),
        }
    }
}

/// Helper for displaying a [`Rule`] with the names of its [`Program`].
#[derive(Debug, Clone, Copy)]
pub struct DisplayRule<'a> {
    rule: &'a Rule,
    symbols: &'a SymbolTable,
}

impl DisplayRule<'_> {
    fn write_literals(
        &self,
        f: &mut std::fmt::Formatter<'_>,
        literals: &[super::Literal],
    ) -> std::fmt::Result {
        for (position, literal) in literals.iter().enumerate() {
            if position > 0 {
                write!(f, ", ")?;
            }

            match self.symbols.predicate_name(literal.predicate()) {
                Some(name) => write!(f, "{name}(")?,
                None => write!(f, "{}(", literal.predicate())?,
            }

            for (term_position, term) in literal.terms().iter().enumerate() {
                if term_position > 0 {
                    write!(f, ", ")?;
                }

                match term {
                    Term::Constant(constant) => match self.symbols.constant_name(*constant) {
                        Some(name) => write!(f, "{name}")?,
                        None => write!(f, "{constant}")?,
                    },
                    Term::Universal(index) | Term::Existential(index) => {
                        let prefix = if term.is_universal() { '?' } else { '!' };
                        match self.rule.variable_name(*index) {
                            Some(name) => write!(f, "{prefix}{name}")?,
                            None => write!(f, "{term}")?,
                        }
                    }
                }
            }

            write!(f, ")")?;
        }

        Ok(())
    }
}

impl Display for DisplayRule<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.write_literals(f, self.rule.head())?;
        write!(f, " :- ")?;
        self.write_literals(f, self.rule.body())?;
        write!(f, " .")
    }
}

#[cfg(test)]
mod test {
    use test_log::test;

    use crate::io::parser::parse_program;

    #[test]
    fn derived_body_literals() {
        let program = parse_program(
            "a(?x, !v) :- b(?x) .
             c(?x) :- a(?x, ?y), b(?y) .",
        )
        .unwrap();

        assert_eq!(program.rules()[0].derived_body_literals(), 0);
        assert_eq!(program.rules()[1].derived_body_literals(), 1);

        let statistics = program.statistics();
        assert_eq!(statistics.rules, 2);
        assert_eq!(statistics.existential_rules, 1);
        assert_eq!(statistics.rules_without_derived_body, 1);
        assert_eq!(statistics.predicates, 3);
        assert_eq!(statistics.derived_predicates, 2);
    }

    #[test]
    fn rule_rendering_uses_source_names() {
        let program = parse_program("h(?x, !v, c) :- b(?x) .").unwrap();

        assert_eq!(program.rule_string(0), "h(?x, !v, c) :- b(?x) .");
    }

    #[test]
    fn piece_decomposition_renumbers_rules() {
        let program = parse_program(
            "h(?x, !v), r(?x) :- b(?x) .
             s(?x) :- h(?x, ?y) .",
        )
        .unwrap();

        let decomposed = program.piece_decomposed();
        assert_eq!(decomposed.len(), 3);
        assert_eq!(decomposed.rules()[2].id(), 2);
        assert_eq!(decomposed.rule_string(1), "r(?x) :- b(?x) .");
    }
}
