//! GraphML export of reliance graphs labeled with rule strings.

use std::{fs::File, io::Write, path::Path};

use petgraph::{Directed, Graph};
use petgraph_graphml::GraphMl;

use crate::{
    error::ExportError,
    model::Program,
    reliance::{RelianceType, SimpleGraph},
};

/// Graph whose nodes are rendered rules and whose edges are labeled with their kind of reliance.
pub type LabeledRelianceGraph = Graph<String, RelianceType, Directed>;

/// Combine the positive and the restraint graph of `program` into a single labeled graph.
///
/// Node `i` of the result corresponds to rule `i` of `program`.
pub fn labeled_reliance_graph(
    program: &Program,
    positive: &SimpleGraph,
    restraint: &SimpleGraph,
) -> LabeledRelianceGraph {
    let mut graph = LabeledRelianceGraph::new();
    let nodes = (0..program.len())
        .map(|rule| graph.add_node(program.rule_string(rule)))
        .collect::<Vec<_>>();

    let labeled_edges = positive
        .edges()
        .map(|edge| (edge, RelianceType::Positive))
        .chain(restraint.edges().map(|edge| (edge, RelianceType::Restraint)));

    for ((from, to), label) in labeled_edges {
        if let (Some(&from), Some(&to)) = (nodes.get(from), nodes.get(to)) {
            graph.add_edge(from, to, label);
        }
    }

    graph
}

/// Write the labeled reliance graph of `program` in GraphML format.
pub fn write_graphml<W: Write>(
    writer: W,
    program: &Program,
    positive: &SimpleGraph,
    restraint: &SimpleGraph,
) -> std::io::Result<()> {
    let graph = labeled_reliance_graph(program, positive, restraint);

    GraphMl::new(&graph)
        .pretty_print(true)
        .export_node_weights_display()
        .export_edge_weights_display()
        .to_writer(writer)
}

/// Save the labeled reliance graph of `program` as a GraphML file.
pub fn save_graphml(
    path: impl AsRef<Path>,
    program: &Program,
    positive: &SimpleGraph,
    restraint: &SimpleGraph,
) -> Result<(), ExportError> {
    let path = path.as_ref();
    let to_export_error = |error| ExportError::IOWriting {
        error,
        filename: path.display().to_string(),
    };

    let file = File::create(path).map_err(to_export_error)?;
    write_graphml(file, program, positive, restraint).map_err(to_export_error)?;

    log::info!("saved reliance graph to \"{}\"", path.display());

    Ok(())
}

#[cfg(test)]
mod test {
    use assert_fs::{prelude::*, TempDir};
    use predicates::{prelude::PredicateBooleanExt, str::contains};
    use test_log::test;

    use crate::{
        io::parser::parse_program,
        reliance::{RelianceType, SimpleGraph},
    };

    use super::{labeled_reliance_graph, save_graphml};

    #[test]
    fn labels_follow_graphs() {
        let program = parse_program(
            "h(?x, !v) :- b(?x) .
             h(?x, ?y) :- a(?x, ?y) .",
        )
        .unwrap();

        let positive = SimpleGraph::new(2);
        let mut restraint = SimpleGraph::new(2);
        restraint.add_edge(1, 0);

        let graph = labeled_reliance_graph(&program, &positive, &restraint);
        assert_eq!(graph.node_count(), 2);
        assert_eq!(graph.edge_count(), 1);
        assert_eq!(
            graph.edge_weights().copied().collect::<Vec<_>>(),
            vec![RelianceType::Restraint]
        );

        let dir = TempDir::new().unwrap();
        let file = dir.child("graph.graphml");
        save_graphml(file.path(), &program, &positive, &restraint).unwrap();

        file.assert(contains("<graphml").and(contains("restraint")));
    }
}
