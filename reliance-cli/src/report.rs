//! Results of the analyses, printable as text or serializable as JSON.

use colored::Colorize;
use reliance::{
    model::{Program, ProgramStatistics},
    reliance::{CoreStratifiedResult, RelianceComputationResult, RelianceType},
};
use serde::Serialize;

fn yes_no(value: bool) -> colored::ColoredString {
    if value {
        "yes".green().bold()
    } else {
        "no".red().bold()
    }
}

fn print_statistics(statistics: &ProgramStatistics) {
    println!(
        "Loaded {} rules ({} existential, {} datalog) over {} predicates.",
        statistics.rules.to_string().bold(),
        statistics.existential_rules,
        statistics.datalog_rules,
        statistics.predicates
    );
}

/// Summary of the computation of a single reliance graph
#[derive(Debug, Serialize)]
pub struct GraphReport {
    /// Kind of the computed graph
    pub reliance_type: RelianceType,
    /// Shape of the analysed program
    pub statistics: ProgramStatistics,
    /// Number of edges
    pub edges: usize,
    /// Number of pairs for which the search was run
    pub calls: u64,
    /// Whether the computation was stopped early
    pub timeout: bool,
    /// Duration of the computation in milliseconds
    pub elapsed_ms: u128,
    /// Rendering of the pair that took longest to check
    pub longest_pair: Option<String>,
    /// Time needed for the longest pair in milliseconds
    pub longest_pair_ms: Option<u128>,
    /// Predicate-level dependencies rejected by the positive search
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pruned_dependencies: Option<usize>,
    /// Successors of each rule
    pub graph: Vec<Vec<usize>>,
}

impl GraphReport {
    /// Summarize `result`, which was computed for `program`.
    pub fn new(
        program: &Program,
        reliance_type: RelianceType,
        result: &RelianceComputationResult,
        pruned_dependencies: Option<usize>,
    ) -> Self {
        Self {
            reliance_type,
            statistics: program.statistics(),
            edges: result.graph.edge_count(),
            calls: result.number_of_calls,
            timeout: result.timeout,
            elapsed_ms: result.elapsed.as_millis(),
            longest_pair: result
                .longest_pair
                .as_ref()
                .map(|pair| pair.description.clone()),
            longest_pair_ms: result
                .longest_pair
                .as_ref()
                .map(|pair| pair.duration.as_millis()),
            pruned_dependencies,
            graph: result.graph.adjacency().to_vec(),
        }
    }

    /// Print a human readable version of this report.
    pub fn print(&self) {
        print_statistics(&self.statistics);
        println!(
            "Computed {} reliances in {}{}.",
            self.reliance_type,
            self.elapsed_ms.to_string().green().bold(),
            "ms".green().bold()
        );
        println!("   {0: <14} {1}", "Edges:", self.edges);
        println!("   {0: <14} {1}", "Calls:", self.calls);
        println!("   {0: <14} {1}", "Timeout:", yes_no(self.timeout));

        if let Some(pruned) = self.pruned_dependencies {
            println!("   {0: <14} {1}", "Pruned:", pruned);
        }

        if let (Some(pair), Some(duration)) = (&self.longest_pair, self.longest_pair_ms) {
            println!("   {0: <14} {1}ms", "Longest pair:", duration);
            for line in pair.lines() {
                println!("      {line}");
            }
        }

        for (from, successors) in self.graph.iter().enumerate() {
            if successors.is_empty() {
                continue;
            }

            let successors = successors
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", ");
            println!("   {from} -> {successors}");
        }
    }
}

/// Summary of the core stratification check
#[derive(Debug, Serialize)]
pub struct CoreStratifiedReport {
    /// Shape of the analysed program
    pub statistics: ProgramStatistics,
    /// Number of positive reliances
    pub positive_edges: usize,
    /// Number of restraint reliances
    pub restraint_edges: usize,
    /// Whether one of the graphs is incomplete
    pub timeout: bool,
    /// Statistics of the components containing restraint edges
    #[serde(flatten)]
    pub result: CoreStratifiedResult,
    /// Rules on a shortest cycle through a restraint edge
    pub shortest_cycle: Option<Vec<String>>,
}

impl CoreStratifiedReport {
    /// Print a human readable version of this report.
    pub fn print(&self) {
        print_statistics(&self.statistics);
        println!(
            "Core stratified: {}{}",
            yes_no(self.result.stratified),
            if self.timeout { " (incomplete graphs)" } else { "" }
        );
        println!("   {0: <26} {1}", "Positive reliances:", self.positive_edges);
        println!("   {0: <26} {1}", "Restraint reliances:", self.restraint_edges);

        if self.result.stratified {
            return;
        }

        println!(
            "   {0: <26} {1}",
            "Restrained groups:", self.result.number_of_restrained_groups
        );
        println!(
            "   {0: <26} {1}",
            "Rules in restrained groups:", self.result.number_of_rules_in_restrained_groups
        );
        println!(
            "   {0: <26} {1}",
            "Biggest restrained group:", self.result.biggest_restrained_group_size
        );

        if let Some(cycle) = &self.shortest_cycle {
            println!("Shortest cycle through a restraint:");
            for rule in cycle {
                println!("   {rule}");
            }
        }
    }
}

/// Result of the acyclicity check of the positive reliance graph
#[derive(Debug, Clone, Copy, Serialize)]
pub struct GrdReport {
    /// Shape of the analysed program
    pub statistics: ProgramStatistics,
    /// Number of positive reliances
    pub edges: usize,
    /// Whether the graph is incomplete
    pub timeout: bool,
    /// Whether the positive reliance graph is acyclic
    pub acyclic: bool,
}

impl GrdReport {
    /// Print a human readable version of this report.
    pub fn print(&self) {
        print_statistics(&self.statistics);
        println!(
            "Positive reliance graph acyclic: {}{}",
            yes_no(self.acyclic),
            if self.timeout { " (incomplete graph)" } else { "" }
        );
        println!("   {0: <14} {1}", "Edges:", self.edges);
    }
}

/// The piece decomposition of a program
#[derive(Debug, Serialize)]
pub struct PiecesReport {
    /// Rules of the decomposed program
    pub rules: Vec<String>,
}

impl PiecesReport {
    /// Decompose `program` into pieces.
    pub fn new(program: &Program) -> Self {
        let decomposed = program.piece_decomposed();

        Self {
            rules: (0..decomposed.len())
                .map(|rule| decomposed.rule_string(rule))
                .collect(),
        }
    }

    /// Print one rule per line.
    pub fn print(&self) {
        for rule in &self.rules {
            println!("{rule}");
        }
    }
}
