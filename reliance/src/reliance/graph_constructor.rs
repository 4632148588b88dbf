//! Construction of reliance graphs for whole programs.

use std::{
    collections::{HashMap, HashSet},
    num::NonZeroUsize,
    ops::ControlFlow,
    time::{Duration, Instant},
};

use lru::LruCache;

use crate::model::{PredicateId, Program, Rule};

use super::{
    common::{search, SearchOutcome},
    deadline::Deadline,
    graph::SimpleGraph,
    positive::PositiveReliance,
    restraint::RestraintReliance,
    rule_hash::{pair_hash, RuleHashInfo},
    self_restraint::SelfRestraintReliance,
    strategy::RelianceStrategy,
    RelianceType,
};

/// Maximal number of memoized results of rule pairs
const PAIR_CACHE_SIZE: NonZeroUsize = match NonZeroUsize::new(40_000) {
    Some(size) => size,
    None => panic!("cache size must be non-zero"),
};

/// The pair of rules whose check took the longest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LongestPair {
    /// Time needed to check the pair
    pub duration: Duration,
    /// Textual representation of the pair
    pub description: String,
}

/// Result of computing a reliance graph.
#[derive(Debug, Clone)]
pub struct RelianceComputationResult {
    /// Graph containing an edge from one rule to another if there is a reliance
    pub graph: SimpleGraph,
    /// Transpose of `graph`
    pub transposed: SimpleGraph,
    /// Number of pairs for which the reliance search was run
    pub number_of_calls: u64,
    /// Whether the computation stopped before all pairs were checked
    pub timeout: bool,
    /// Total time of the computation
    pub elapsed: Duration,
    /// The pair that took the longest to check, if any pair was checked
    pub longest_pair: Option<LongestPair>,
}

impl RelianceComputationResult {
    fn new(node_count: usize) -> Self {
        Self {
            graph: SimpleGraph::new(node_count),
            transposed: SimpleGraph::new(node_count),
            number_of_calls: 0,
            timeout: false,
            elapsed: Duration::ZERO,
            longest_pair: None,
        }
    }

    fn add_edge(&mut self, from: usize, to: usize) {
        self.graph.add_edge(from, to);
        self.transposed.add_edge(to, from);
    }
}

/// Computes reliance graphs of a [`Program`].
#[derive(Debug, Clone, Copy)]
pub struct RelianceGraphConstructor<'a> {
    program: &'a Program,
    strategy: RelianceStrategy,
    timeout: Option<Duration>,
}

impl<'a> RelianceGraphConstructor<'a> {
    /// Create a new [`RelianceGraphConstructor`] using every optimization and no timeout.
    pub fn new(program: &'a Program) -> Self {
        Self {
            program,
            strategy: RelianceStrategy::default(),
            timeout: None,
        }
    }

    /// Set the [`RelianceStrategy`].
    pub fn with_strategy(mut self, strategy: RelianceStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Set the time after which the computation is stopped.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Compute the graph of the given [`RelianceType`].
    ///
    /// If the timeout is reached, the partial graph computed so far is returned.
    /// It only contains edges of pairs that were checked completely.
    pub fn compute(&self, reliance_type: RelianceType) -> RelianceComputationResult {
        let rules = self.program.rules();
        let index = self
            .strategy
            .cut_pairs
            .then(|| candidate_index(rules, reliance_type));

        let mut computation = PairComputation {
            program: self.program,
            strategy: self.strategy,
            reliance_type,
            deadline: Deadline::new(self.timeout),
            result: RelianceComputationResult::new(rules.len()),
            hash_infos: if self.strategy.pair_hash {
                rules.iter().map(RuleHashInfo::new).collect()
            } else {
                Vec::new()
            },
            cache: LruCache::new(PAIR_CACHE_SIZE),
        };

        'pairs: for (from, rule_from) in rules.iter().enumerate() {
            let targets = match &index {
                Some(index) => cut_targets(rule_from, index),
                None => (0..rules.len()).collect(),
            };

            for to in targets {
                if computation.process(from, to).is_break() {
                    break 'pairs;
                }
            }
        }

        let mut result = computation.result;
        result.elapsed = computation.deadline.elapsed();

        log::info!(
            "computed {reliance_type} reliances: {} edges, {} calls, {} ms{}",
            result.graph.edge_count(),
            result.number_of_calls,
            result.elapsed.as_millis(),
            if result.timeout { " (timeout)" } else { "" }
        );

        result
    }
}

/// Compute the positive reliance graph of `program`.
pub fn compute_positive_reliances(
    program: &Program,
    strategy: RelianceStrategy,
    timeout: Option<Duration>,
) -> RelianceComputationResult {
    RelianceGraphConstructor::new(program)
        .with_strategy(strategy)
        .with_timeout(timeout)
        .compute(RelianceType::Positive)
}

/// Compute the restraint reliance graph of `program`.
pub fn compute_restraint_reliances(
    program: &Program,
    strategy: RelianceStrategy,
    timeout: Option<Duration>,
) -> RelianceComputationResult {
    RelianceGraphConstructor::new(program)
        .with_strategy(strategy)
        .with_timeout(timeout)
        .compute(RelianceType::Restraint)
}

/// Count the pairs of rules where a head predicate of the first occurs in the body of the second
/// but the positive reliance graph has no edge between them.
pub fn count_pruned_dependencies(program: &Program, positive: &SimpleGraph) -> usize {
    let rules = program.rules();
    let mut result = 0;

    for (from, rule_from) in rules.iter().enumerate() {
        let head_predicates = rule_from
            .head()
            .iter()
            .map(|literal| literal.predicate())
            .collect::<HashSet<_>>();

        for (to, rule_to) in rules.iter().enumerate() {
            if positive.contains_edge(from, to) {
                continue;
            }

            if rule_to
                .body()
                .iter()
                .any(|literal| head_predicates.contains(&literal.predicate()))
            {
                log::debug!("pruned dependency from rule {from} to rule {to}");
                result += 1;
            }
        }
    }

    result
}

/// Map each predicate to the rules that may be the second rule of a pair
/// whose first rule uses the predicate in its head.
///
/// For positive reliances these are the rules using the predicate in their body,
/// for restraints the rules using it in a head literal with an existential variable.
fn candidate_index(rules: &[Rule], reliance_type: RelianceType) -> HashMap<PredicateId, Vec<usize>> {
    let mut index = HashMap::<PredicateId, Vec<usize>>::new();

    for (rule_index, rule) in rules.iter().enumerate() {
        let literals = match reliance_type {
            RelianceType::Positive => rule.body(),
            RelianceType::Restraint => rule.head(),
        };

        for literal in literals {
            if reliance_type == RelianceType::Restraint && !literal.is_existential() {
                continue;
            }

            index.entry(literal.predicate()).or_default().push(rule_index);
        }
    }

    index
}

/// Rules to be checked against `rule`, each one only once.
fn cut_targets(rule: &Rule, index: &HashMap<PredicateId, Vec<usize>>) -> Vec<usize> {
    let mut seen = HashSet::new();

    rule.head()
        .iter()
        .filter_map(|literal| index.get(&literal.predicate()))
        .flatten()
        .copied()
        .filter(|&target| seen.insert(target))
        .collect()
}

/// State of a running graph computation.
struct PairComputation<'a> {
    program: &'a Program,
    strategy: RelianceStrategy,
    reliance_type: RelianceType,
    deadline: Deadline,
    result: RelianceComputationResult,
    hash_infos: Vec<RuleHashInfo>,
    cache: LruCache<String, bool>,
}

impl PairComputation<'_> {
    fn describe_pair(&self, from: usize, to: usize) -> String {
        format!(
            "{} -> {}",
            self.program.rule_string(from),
            self.program.rule_string(to)
        )
    }

    /// Run the search for the given type of reliance on a single pair.
    fn search_pair(&mut self, rule_from: &Rule, rule_to: &Rule, self_pair: bool) -> SearchOutcome {
        match self.reliance_type {
            RelianceType::Positive => search::<PositiveReliance>(
                rule_from,
                rule_to,
                self.strategy,
                &mut self.deadline,
            ),
            RelianceType::Restraint => {
                let outcome = search::<RestraintReliance>(
                    rule_from,
                    rule_to,
                    self.strategy,
                    &mut self.deadline,
                );

                if self_pair && outcome == SearchOutcome::NoReliance {
                    search::<SelfRestraintReliance>(
                        rule_from,
                        rule_to,
                        self.strategy,
                        &mut self.deadline,
                    )
                } else {
                    outcome
                }
            }
        }
    }

    fn record(&mut self, from: usize, to: usize, is_reliance: bool) {
        if is_reliance {
            log::debug!(
                "{} reliance {}",
                self.reliance_type,
                self.describe_pair(from, to)
            );
            self.result.add_edge(from, to);
        }
    }

    /// Check a single pair of rules.
    fn process(&mut self, from: usize, to: usize) -> ControlFlow<()> {
        if self.deadline.expired() {
            self.result.timeout = true;
            return ControlFlow::Break(());
        }

        let program = self.program;
        let rule_from = &program.rules()[from];
        let rule_to = &program.rules()[to];
        let self_pair =
            self.reliance_type == RelianceType::Restraint && from == to && rule_from.is_existential();

        let key = self.strategy.pair_hash.then(|| {
            pair_hash(
                &self.hash_infos[from],
                &self.hash_infos[to],
                rule_to,
                self_pair,
            )
        });

        if let Some(&is_reliance) = key.as_ref().and_then(|key| self.cache.get(key)) {
            self.record(from, to, is_reliance);
            return ControlFlow::Continue(());
        }

        self.result.number_of_calls += 1;

        // Rules consisting of several pieces always restrain themselves
        if self_pair && rule_from.split_into_pieces().len() > 1 {
            self.record(from, to, true);
            if let Some(key) = key {
                self.cache.put(key, true);
            }

            return ControlFlow::Continue(());
        }

        let start = Instant::now();
        let outcome = self.search_pair(rule_from, rule_to, self_pair);
        let duration = start.elapsed();

        if self
            .result
            .longest_pair
            .as_ref()
            .map_or(true, |longest| duration > longest.duration)
        {
            self.result.longest_pair = Some(LongestPair {
                duration,
                description: self.describe_pair(from, to),
            });
        }

        match outcome {
            SearchOutcome::Interrupted => {
                log::warn!(
                    "timeout while checking {} reliance {}",
                    self.reliance_type,
                    self.describe_pair(from, to)
                );

                self.result.timeout = true;
                ControlFlow::Break(())
            }
            SearchOutcome::Reliance | SearchOutcome::NoReliance => {
                let is_reliance = outcome == SearchOutcome::Reliance;
                self.record(from, to, is_reliance);

                if let Some(key) = key {
                    self.cache.put(key, is_reliance);
                }

                ControlFlow::Continue(())
            }
        }
    }
}

#[cfg(test)]
mod test {
    use std::time::Duration;

    use quickcheck_macros::quickcheck;
    use test_log::test;

    use crate::{
        io::parser::parse_program,
        model::{Literal, PredicateId, Program, Rule, SymbolTable, Term},
        reliance::{strategy::RelianceStrategy, RelianceType},
    };

    use super::{
        compute_positive_reliances, compute_restraint_reliances, count_pruned_dependencies,
        RelianceGraphConstructor, PAIR_CACHE_SIZE,
    };

    const ALL_STRATEGIES: [u32; 6] = [0, 1, 2, 4, 8, 15];

    #[test]
    fn strategies_agree() {
        let program = parse_program(
            "a(?x, !v) :- b(?x, ?y) .
             c(?x, ?y) :- a(?x, ?y) .
             b(?x, ?y) :- a(?x, ?y) .
             h(?x, !v) :- b(?x, ?z) .
             h(?x, ?y) :- a(?x, ?y) .",
        )
        .unwrap();

        let reference = compute_positive_reliances(&program, RelianceStrategy::full(), None);
        let reference_restraint =
            compute_restraint_reliances(&program, RelianceStrategy::full(), None);

        for bits in ALL_STRATEGIES {
            let strategy = RelianceStrategy::from_bits(bits);

            let positive = compute_positive_reliances(&program, strategy, None);
            for from in 0..program.len() {
                for to in 0..program.len() {
                    assert_eq!(
                        positive.graph.contains_edge(from, to),
                        reference.graph.contains_edge(from, to),
                        "positive {from} -> {to} with strategy {bits}"
                    );
                }
            }

            let restraint = compute_restraint_reliances(&program, strategy, None);
            for from in 0..program.len() {
                for to in 0..program.len() {
                    assert_eq!(
                        restraint.graph.contains_edge(from, to),
                        reference_restraint.graph.contains_edge(from, to),
                        "restraint {from} -> {to} with strategy {bits}"
                    );
                }
            }
        }
    }

    #[test]
    fn pair_hash_saves_calls() {
        let program = parse_program(
            "a(?x, !v) :- b(?x, ?y) .
             c(?x, ?y) :- a(?x, ?y) .
             d(?x, !v) :- e(?x, ?y) .
             f(?x, ?y) :- d(?x, ?y) .",
        )
        .unwrap();

        let cached = compute_positive_reliances(&program, RelianceStrategy::full(), None);
        let uncached = compute_positive_reliances(
            &program,
            RelianceStrategy::from_bits(RelianceStrategy::FULL & !RelianceStrategy::PAIR_HASH),
            None,
        );

        assert_eq!(uncached.number_of_calls, 2);
        assert_eq!(cached.number_of_calls, 1);
        assert!(cached.graph.contains_edge(0, 1));
        assert!(cached.graph.contains_edge(2, 3));
        assert_eq!(cached.graph.edge_count(), 2);
        assert!(cached.transposed.contains_edge(3, 2));
        assert!(cached.longest_pair.is_some());
    }

    #[test]
    fn pair_cache_capacity_is_constant() {
        assert_eq!(PAIR_CACHE_SIZE.get(), 40_000);
    }

    #[test]
    fn pieces_restrain_themselves() {
        let program = parse_program("h(?x, !v), r(?x) :- b(?x) .").unwrap();

        let result = compute_restraint_reliances(&program, RelianceStrategy::full(), None);
        assert!(result.graph.contains_edge(0, 0));
        assert!(!result.timeout);
    }

    /// Chain of rules where each rule derives the body predicate of the next one,
    /// so that every pair needs a search over several literal mappings.
    fn heavy_program(length: usize) -> Program {
        let mut text = String::new();

        for index in 1..=length {
            let previous = index - 1;
            text.push_str(&format!(
                "p{index}(?x, !v), p{index}(!v, ?y), q{index}(!v) :- \
                 p{previous}(?x, ?z), p{previous}(?z, ?y), p{previous}(?y, ?w), p{previous}(?w, ?x) .\n"
            ));
        }

        parse_program(text).unwrap()
    }

    #[test]
    fn timeout_yields_subgraph() {
        let program = heavy_program(40);

        let complete = RelianceGraphConstructor::new(&program).compute(RelianceType::Positive);
        assert!(!complete.timeout);

        let partial = RelianceGraphConstructor::new(&program)
            .with_timeout(Some(Duration::ZERO))
            .compute(RelianceType::Positive);
        assert!(partial.timeout);

        for (from, to) in partial.graph.edges() {
            assert!(complete.graph.contains_edge(from, to));
        }
    }

    #[test]
    fn pruned_dependencies() {
        let program = parse_program(
            "b(?x, ?y) :- a(?x, ?y) .
             a(?x, !v) :- b(?x, ?y) .",
        )
        .unwrap();

        let positive = compute_positive_reliances(&program, RelianceStrategy::full(), None);
        assert!(positive.graph.contains_edge(1, 0));
        assert_eq!(count_pruned_dependencies(&program, &positive.graph), 1);
    }

    /// Build a single rule from arbitrary numbers,
    /// using predicates from `predicates` only.
    fn arbitrary_rule(shape: &[(u8, u8, u8)], predicates: [usize; 2], head_first: bool) -> Rule {
        let mut head = Vec::new();
        let mut body = Vec::new();

        for (position, &(predicate, first, second)) in shape.iter().enumerate() {
            let predicate = PredicateId(predicates[usize::from(predicate % 2)]);
            let terms = vec![
                Term::Universal(u32::from(first % 3) + 1),
                Term::Universal(u32::from(second % 3) + 1),
            ];

            if (position % 2 == 0) == head_first {
                head.push(Literal::new(predicate, terms));
            } else {
                body.push(Literal::new(predicate, terms));
            }
        }

        Rule::new(head, body)
    }

    #[quickcheck]
    fn disjoint_predicates_prevent_positive_reliance(
        first: Vec<(u8, u8, u8)>,
        second: Vec<(u8, u8, u8)>,
    ) -> bool {
        // Heads of the first rule use predicates 0 and 1, bodies of the second rule 2 and 3
        let rule_first = arbitrary_rule(&first, [0, 1], true);
        let rule_second = arbitrary_rule(&second, [2, 3], false);
        let program = Program::new(vec![rule_first, rule_second], SymbolTable::default());

        let result = compute_positive_reliances(&program, RelianceStrategy::naive(), None);
        let heads_disjoint = program.rules()[0]
            .head()
            .iter()
            .all(|head| program.rules()[1].body().iter().all(|body| head.predicate() != body.predicate()));

        !heads_disjoint || !result.graph.contains_edge(0, 1)
    }
}
