#![cfg(not(miri))]

use dir_test::{dir_test, Fixture};
use reliance::{
    io::parser::parse_program,
    reliance::{RelianceGraphConstructor, RelianceStrategy, RelianceType, SimpleGraph},
};

/// Expected graph stated in a header line like `%! positive: {1}, {}`
fn expected_graph(content: &str, reliance_type: RelianceType) -> Option<Vec<Vec<usize>>> {
    let prefix = format!("%! {reliance_type}:");
    let line = content
        .lines()
        .find_map(|line| line.trim().strip_prefix(prefix.as_str()))?;

    let graph = line
        .split('}')
        .filter_map(|part| part.split_once('{').map(|(_, inner)| inner))
        .map(|inner| {
            let mut successors = inner
                .split(',')
                .map(str::trim)
                .filter(|successor| !successor.is_empty())
                .map(|successor| successor.parse::<usize>().unwrap())
                .collect::<Vec<_>>();
            successors.sort_unstable();
            successors
        })
        .collect();

    Some(graph)
}

fn sorted_adjacency(graph: &SimpleGraph) -> Vec<Vec<usize>> {
    graph
        .adjacency()
        .iter()
        .map(|successors| {
            let mut successors = successors.clone();
            successors.sort_unstable();
            successors
        })
        .collect()
}

#[dir_test(
    dir: "$CARGO_MANIFEST_DIR/../resources/testcases/reliances",
    glob: "*.rls",
)]
fn reliance_fixture(fixture: Fixture<&str>) {
    let content = fixture.content();
    let program = parse_program(content).unwrap();

    let mut checked = 0;
    for reliance_type in [RelianceType::Positive, RelianceType::Restraint] {
        let Some(expected) = expected_graph(content, reliance_type) else {
            continue;
        };
        assert_eq!(expected.len(), program.len(), "{}", fixture.path());

        let result = RelianceGraphConstructor::new(&program)
            .with_strategy(RelianceStrategy::full())
            .compute(reliance_type);

        assert!(!result.timeout);
        assert_eq!(
            sorted_adjacency(&result.graph),
            expected,
            "{reliance_type} reliances of {}",
            fixture.path()
        );
        checked += 1;
    }

    assert!(checked > 0, "{} states no expected graph", fixture.path());
}
