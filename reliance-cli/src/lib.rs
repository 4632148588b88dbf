//! Command line interface for the reliance analysis of existential rules

#![deny(
    missing_debug_implementations,
    missing_copy_implementations,
    trivial_casts,
    trivial_numeric_casts
)]
#![warn(
    missing_docs,
    unused_import_braces,
    unused_qualifications,
    unused_extern_crates,
    variant_size_differences
)]

pub mod cli;
pub mod error;
pub mod report;

use std::path::Path;

use cli::{CliApp, Command};
use error::CliError;
use reliance::{
    error::Error,
    io::{export::save_graphml, load_program},
    model::Program,
    reliance::{
        combine_graphs, count_pruned_dependencies, is_core_stratified, is_positively_acyclic,
        shortest_restraint_cycle, RelianceComputationResult, RelianceGraphConstructor,
        RelianceType,
    },
};
use report::{CoreStratifiedReport, GraphReport, GrdReport, PiecesReport};
use serde::Serialize;

fn emit<R: Serialize>(report: &R, json: bool, print: impl FnOnce(&R)) -> Result<(), CliError> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
    } else {
        print(report);
    }

    Ok(())
}

fn compute(cli: &CliApp, program: &Program, reliance_type: RelianceType) -> RelianceComputationResult {
    RelianceGraphConstructor::new(program)
        .with_strategy(cli.reliance.strategy())
        .with_timeout(cli.reliance.timeout())
        .compute(reliance_type)
}

fn graph_command(
    cli: &CliApp,
    program: &Program,
    reliance_type: RelianceType,
    export: Option<&Path>,
) -> Result<(), CliError> {
    let result = compute(cli, program, reliance_type);

    if let Some(path) = export {
        result.graph.save_csv(path).map_err(Error::from)?;
    }

    let pruned = (reliance_type == RelianceType::Positive)
        .then(|| count_pruned_dependencies(program, &result.graph));
    let report = GraphReport::new(program, reliance_type, &result, pruned);

    emit(&report, cli.json, GraphReport::print)
}

fn core_stratified_command(
    cli: &CliApp,
    program: &Program,
    graphml: Option<&Path>,
) -> Result<(), CliError> {
    let positive = compute(cli, program, RelianceType::Positive);
    let restraint = compute(cli, program, RelianceType::Restraint);

    let (union, union_transposed) = combine_graphs(&positive.graph, &restraint.graph);
    let result = is_core_stratified(&union, &union_transposed, &restraint.graph);

    let shortest_cycle = (!result.stratified)
        .then(|| {
            shortest_restraint_cycle(
                &positive.graph,
                &restraint.graph,
                &result.smallest_restrained_component,
            )
        })
        .flatten()
        .map(|cycle| cycle.into_iter().map(|rule| program.rule_string(rule)).collect());

    if let Some(path) = graphml {
        save_graphml(path, program, &positive.graph, &restraint.graph).map_err(Error::from)?;
    }

    let report = CoreStratifiedReport {
        statistics: program.statistics(),
        positive_edges: positive.graph.edge_count(),
        restraint_edges: restraint.graph.edge_count(),
        timeout: positive.timeout || restraint.timeout,
        result,
        shortest_cycle,
    };

    emit(&report, cli.json, CoreStratifiedReport::print)
}

fn grd_command(cli: &CliApp, program: &Program) -> Result<(), CliError> {
    let positive = compute(cli, program, RelianceType::Positive);

    let report = GrdReport {
        statistics: program.statistics(),
        edges: positive.graph.edge_count(),
        timeout: positive.timeout,
        acyclic: is_positively_acyclic(&positive.graph, &positive.transposed),
    };

    emit(&report, cli.json, GrdReport::print)
}

/// Load the rule file given in `cli` and run the selected analysis.
pub fn run(cli: &CliApp) -> Result<(), CliError> {
    log::info!("Parsing rules ...");
    let program = load_program(&cli.rules).map_err(Error::from)?;
    log::info!("Rules parsed");

    match &cli.command {
        Command::Positive { export } => {
            graph_command(cli, &program, RelianceType::Positive, export.as_deref())
        }
        Command::Restraint { export } => {
            graph_command(cli, &program, RelianceType::Restraint, export.as_deref())
        }
        Command::CoreStratified { graphml } => {
            core_stratified_command(cli, &program, graphml.as_deref())
        }
        Command::Grd => grd_command(cli, &program),
        Command::Pieces => emit(&PiecesReport::new(&program), cli.json, PiecesReport::print),
    }
}
