//! Strongly connected components of reliance graphs and the analyses built on top of them.

use std::collections::VecDeque;

use serde::Serialize;

use super::graph::SimpleGraph;

/// Partition of the nodes of a graph into strongly connected components.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RelianceGroupResult {
    /// The components in topological order of the condensation,
    /// i.e. every edge between different groups points to a later group
    pub groups: Vec<Vec<usize>>,
    /// Index of the group of each node; `None` for inactive nodes
    pub assignments: Vec<Option<usize>>,
    /// Index of a group without active predecessors outside of the group
    pub minimum_group: Option<usize>,
}

impl RelianceGroupResult {
    /// Return the group of the given node.
    pub fn group_of(&self, node: usize) -> Option<usize> {
        self.assignments.get(node).copied().flatten()
    }
}

fn is_active(active: Option<&[bool]>, node: usize) -> bool {
    active.map_or(true, |active| active.get(node).copied().unwrap_or(false))
}

/// Push the nodes reachable from `start` onto `order` in the order they are finished.
fn fill_order(
    graph: &SimpleGraph,
    start: usize,
    visited: &mut [bool],
    order: &mut Vec<usize>,
    active: Option<&[bool]>,
) {
    let mut stack = vec![(start, false)];

    while let Some((node, finished)) = stack.pop() {
        if finished {
            order.push(node);
            continue;
        }

        if visited[node] {
            continue;
        }
        visited[node] = true;

        stack.push((node, true));

        for &successor in graph.successors(node) {
            if is_active(active, successor) && !visited[successor] {
                stack.push((successor, false));
            }
        }
    }
}

/// Collect every unvisited node reachable from `start`.
fn collect_component(
    graph: &SimpleGraph,
    start: usize,
    visited: &mut [bool],
    active: Option<&[bool]>,
) -> Vec<usize> {
    let mut component = Vec::new();
    let mut stack = vec![start];

    while let Some(node) = stack.pop() {
        if visited[node] {
            continue;
        }
        visited[node] = true;
        component.push(node);

        for &successor in graph.successors(node) {
            if is_active(active, successor) && !visited[successor] {
                stack.push(successor);
            }
        }
    }

    component
}

/// Compute the strongly connected components of `graph`.
///
/// `transposed` must be the transpose of `graph`.
/// If `active` is given, only nodes marked as active are considered.
pub fn compute_reliance_groups(
    graph: &SimpleGraph,
    transposed: &SimpleGraph,
    active: Option<&[bool]>,
) -> RelianceGroupResult {
    let node_count = graph.node_count();
    let mut result = RelianceGroupResult {
        groups: Vec::new(),
        assignments: vec![None; node_count],
        minimum_group: None,
    };

    let mut visited = vec![false; node_count];
    let mut order = Vec::with_capacity(node_count);

    for node in (0..node_count).rev() {
        if is_active(active, node) && !visited[node] {
            fill_order(graph, node, &mut visited, &mut order, active);
        }
    }

    visited.fill(false);

    while let Some(node) = order.pop() {
        if visited[node] {
            continue;
        }

        let group = collect_component(transposed, node, &mut visited, active);
        let group_index = result.groups.len();

        for &member in &group {
            result.assignments[member] = Some(group_index);
        }

        result.groups.push(group);
    }

    result.minimum_group = (0..result.groups.len()).find(|&group_index| {
        result.groups[group_index].iter().all(|&member| {
            transposed.successors(member).iter().all(|&predecessor| {
                !is_active(active, predecessor)
                    || result.assignments[predecessor] == Some(group_index)
            })
        })
    });

    result
}

/// Summary of the check whether a program is core stratified.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CoreStratifiedResult {
    /// Whether no component of the union graph contains a restraint edge
    pub stratified: bool,
    /// Number of components containing a restraint edge
    pub number_of_restrained_groups: usize,
    /// Size of the largest component containing a restraint edge
    pub biggest_restrained_group_size: usize,
    /// Number of rules in components containing a restraint edge
    pub number_of_rules_in_restrained_groups: usize,
    /// Members of the smallest component containing a restraint edge
    pub smallest_restrained_component: Vec<usize>,
}

/// Check whether some component of the union of the positive and the restraint graph
/// contains both ends of a restraint edge.
///
/// `union` and `union_transposed` are usually obtained from [`super::combine_graphs`].
pub fn is_core_stratified(
    union: &SimpleGraph,
    union_transposed: &SimpleGraph,
    restraint: &SimpleGraph,
) -> CoreStratifiedResult {
    let groups = compute_reliance_groups(union, union_transposed, None);
    let mut result = CoreStratifiedResult {
        stratified: true,
        ..Default::default()
    };

    for (group_index, group) in groups.groups.iter().enumerate() {
        let restrained = group.iter().any(|&member| {
            restraint
                .successors(member)
                .iter()
                .any(|&target| groups.group_of(target) == Some(group_index))
        });

        if !restrained {
            continue;
        }

        result.stratified = false;
        result.number_of_restrained_groups += 1;
        result.number_of_rules_in_restrained_groups += group.len();
        result.biggest_restrained_group_size = result.biggest_restrained_group_size.max(group.len());

        if result.smallest_restrained_component.is_empty()
            || group.len() < result.smallest_restrained_component.len()
        {
            result.smallest_restrained_component = group.clone();
        }
    }

    result
}

/// Find a shortest cycle among the nodes of `component`
/// that uses at least one restraint edge and otherwise positive or restraint edges.
///
/// The cycle is returned as the sequence of its nodes, starting with the source of a restraint edge.
pub fn shortest_restraint_cycle(
    positive: &SimpleGraph,
    restraint: &SimpleGraph,
    component: &[usize],
) -> Option<Vec<usize>> {
    let node_count = positive.node_count().max(restraint.node_count());
    let mut inside = vec![false; node_count];
    for &member in component {
        if let Some(flag) = inside.get_mut(member) {
            *flag = true;
        }
    }

    let mut best: Option<Vec<usize>> = None;

    for &source in component {
        for &target in restraint.successors(source) {
            if !inside.get(target).copied().unwrap_or(false) {
                continue;
            }

            let Some(path) = shortest_path(positive, restraint, &inside, target, source) else {
                continue;
            };

            // `path` ends with `source`, which is also the start of the cycle
            let mut cycle = vec![source];
            cycle.extend(path.into_iter().take_while(|&node| node != source));

            if best.as_ref().map_or(true, |best| cycle.len() < best.len()) {
                best = Some(cycle);
            }
        }
    }

    best
}

/// Breadth first search from `start` to `goal` over nodes marked in `inside`.
///
/// Returns the nodes of the path including both ends.
fn shortest_path(
    positive: &SimpleGraph,
    restraint: &SimpleGraph,
    inside: &[bool],
    start: usize,
    goal: usize,
) -> Option<Vec<usize>> {
    let mut parent = vec![None; inside.len()];
    let mut visited = vec![false; inside.len()];
    let mut queue = VecDeque::from([start]);
    visited[start] = true;

    while let Some(node) = queue.pop_front() {
        if node == goal {
            let mut path = vec![node];
            let mut current = node;
            while let Some(previous) = parent[current] {
                path.push(previous);
                current = previous;
            }
            path.reverse();

            return Some(path);
        }

        for &successor in positive.successors(node).iter().chain(restraint.successors(node)) {
            if inside.get(successor).copied().unwrap_or(false) && !visited[successor] {
                visited[successor] = true;
                parent[successor] = Some(node);
                queue.push_back(successor);
            }
        }
    }

    None
}

/// Return `true` if the positive reliance graph has no cycles,
/// i.e. every component consists of a single rule that does not rely on itself.
pub fn is_positively_acyclic(positive: &SimpleGraph, positive_transposed: &SimpleGraph) -> bool {
    let groups = compute_reliance_groups(positive, positive_transposed, None);

    groups.groups.iter().all(|group| match group.as_slice() {
        [single] => !positive.contains_edge(*single, *single),
        _ => false,
    })
}

#[cfg(test)]
mod test {
    use std::collections::BTreeSet;

    use petgraph::algo::kosaraju_scc;
    use quickcheck_macros::quickcheck;
    use test_log::test;

    use crate::reliance::graph::{combine_graphs, SimpleGraph};

    use super::{
        compute_reliance_groups, is_core_stratified, is_positively_acyclic,
        shortest_restraint_cycle,
    };

    fn graph_from_pairs(node_count: usize, pairs: &[(u8, u8)]) -> SimpleGraph {
        let mut graph = SimpleGraph::new(node_count);

        if node_count > 0 {
            for &(from, to) in pairs {
                graph.add_edge(usize::from(from) % node_count, usize::from(to) % node_count);
            }
        }

        graph
    }

    type Partition = BTreeSet<BTreeSet<usize>>;

    fn partition(groups: &[Vec<usize>]) -> Partition {
        groups
            .iter()
            .map(|group| group.iter().copied().collect())
            .collect()
    }

    /// Textbook recursive version of the component search.
    fn recursive_groups(graph: &SimpleGraph, transposed: &SimpleGraph) -> Vec<Vec<usize>> {
        fn fill(graph: &SimpleGraph, node: usize, visited: &mut [bool], order: &mut Vec<usize>) {
            visited[node] = true;
            for &successor in graph.successors(node) {
                if !visited[successor] {
                    fill(graph, successor, visited, order);
                }
            }
            order.push(node);
        }

        fn collect(graph: &SimpleGraph, node: usize, visited: &mut [bool], group: &mut Vec<usize>) {
            visited[node] = true;
            group.push(node);
            for &successor in graph.successors(node) {
                if !visited[successor] {
                    collect(graph, successor, visited, group);
                }
            }
        }

        let mut visited = vec![false; graph.node_count()];
        let mut order = Vec::new();
        for node in 0..graph.node_count() {
            if !visited[node] {
                fill(graph, node, &mut visited, &mut order);
            }
        }

        let mut visited = vec![false; graph.node_count()];
        let mut groups = Vec::new();
        while let Some(node) = order.pop() {
            if !visited[node] {
                let mut group = Vec::new();
                collect(transposed, node, &mut visited, &mut group);
                groups.push(group);
            }
        }

        groups
    }

    #[test]
    fn groups_regression() {
        let mut graph = SimpleGraph::new(5);
        graph.add_edge(0, 2);
        graph.add_edge(2, 1);
        graph.add_edge(1, 0);
        graph.add_edge(0, 3);
        graph.add_edge(3, 4);

        let result = compute_reliance_groups(&graph, &graph.transpose(), None);

        assert_eq!(result.groups, vec![vec![2, 0, 1], vec![3], vec![4]]);
        assert_eq!(result.assignments, vec![Some(0), Some(0), Some(0), Some(1), Some(2)]);
        assert_eq!(result.minimum_group, Some(0));
    }

    #[test]
    fn groups_of_active_nodes() {
        let mut graph = SimpleGraph::new(5);
        graph.add_edge(0, 2);
        graph.add_edge(2, 1);
        graph.add_edge(1, 0);
        graph.add_edge(0, 3);
        graph.add_edge(3, 4);

        let active = [true, false, true, true, true];
        let result = compute_reliance_groups(&graph, &graph.transpose(), Some(&active));

        assert_eq!(
            partition(&result.groups),
            partition(&[vec![0], vec![2], vec![3], vec![4]])
        );
        assert_eq!(result.group_of(1), None);

        // Node 0 loses its only predecessor together with node 1
        let minimum = result.minimum_group.unwrap();
        assert_eq!(result.groups[minimum], vec![0]);
    }

    #[quickcheck]
    fn groups_match_petgraph(node_count: u8, pairs: Vec<(u8, u8)>) -> bool {
        let graph = graph_from_pairs(usize::from(node_count % 16), &pairs);
        let result = compute_reliance_groups(&graph, &graph.transpose(), None);

        let petgraph = graph.to_petgraph();
        let expected = kosaraju_scc(&petgraph)
            .into_iter()
            .map(|group| group.into_iter().map(|index| petgraph[index]).collect())
            .collect::<Partition>();

        partition(&result.groups) == expected
            && partition(&recursive_groups(&graph, &graph.transpose())) == expected
    }

    #[quickcheck]
    fn groups_are_topologically_ordered(node_count: u8, pairs: Vec<(u8, u8)>) -> bool {
        let graph = graph_from_pairs(usize::from(node_count % 16), &pairs);
        let result = compute_reliance_groups(&graph, &graph.transpose(), None);

        graph.edges().all(|(from, to)| result.group_of(from) <= result.group_of(to))
            && (graph.node_count() == 0 || result.minimum_group == Some(0))
    }

    #[quickcheck]
    fn groups_ignore_edge_order(node_count: u8, pairs: Vec<(u8, u8)>) -> bool {
        let node_count = usize::from(node_count % 16);
        let graph = graph_from_pairs(node_count, &pairs);

        let mut reversed_pairs = pairs.clone();
        reversed_pairs.reverse();
        let reversed = graph_from_pairs(node_count, &reversed_pairs);

        partition(&compute_reliance_groups(&graph, &graph.transpose(), None).groups)
            == partition(&compute_reliance_groups(&reversed, &reversed.transpose(), None).groups)
    }

    #[quickcheck]
    fn restraint_free_programs_are_stratified(node_count: u8, pairs: Vec<(u8, u8)>) -> bool {
        let positive = graph_from_pairs(usize::from(node_count % 16), &pairs);
        let restraint = SimpleGraph::new(positive.node_count());
        let (union, union_transposed) = combine_graphs(&positive, &restraint);

        is_core_stratified(&union, &union_transposed, &restraint).stratified
    }

    #[test]
    fn restrained_components() {
        let mut positive = SimpleGraph::new(5);
        positive.add_edge(0, 1);
        positive.add_edge(1, 2);
        positive.add_edge(2, 0);
        positive.add_edge(3, 4);

        let mut restraint = SimpleGraph::new(5);
        restraint.add_edge(0, 2);
        restraint.add_edge(4, 3);
        restraint.add_edge(2, 3);

        let (union, union_transposed) = combine_graphs(&positive, &restraint);
        let result = is_core_stratified(&union, &union_transposed, &restraint);

        assert!(!result.stratified);
        assert_eq!(result.number_of_restrained_groups, 2);
        assert_eq!(result.number_of_rules_in_restrained_groups, 5);
        assert_eq!(result.biggest_restrained_group_size, 3);

        let mut smallest = result.smallest_restrained_component.clone();
        smallest.sort_unstable();
        assert_eq!(smallest, vec![3, 4]);

        assert_eq!(
            shortest_restraint_cycle(&positive, &restraint, &smallest),
            Some(vec![4, 3])
        );
        assert_eq!(
            shortest_restraint_cycle(&positive, &restraint, &[0, 1, 2]),
            Some(vec![0, 2])
        );
        assert_eq!(shortest_restraint_cycle(&positive, &SimpleGraph::new(5), &[0, 1, 2]), None);
    }

    #[test]
    fn self_restraint_breaks_stratification() {
        let positive = SimpleGraph::new(2);
        let mut restraint = SimpleGraph::new(2);
        restraint.add_edge(1, 1);

        let (union, union_transposed) = combine_graphs(&positive, &restraint);
        let result = is_core_stratified(&union, &union_transposed, &restraint);

        assert!(!result.stratified);
        assert_eq!(result.smallest_restrained_component, vec![1]);
        assert_eq!(shortest_restraint_cycle(&positive, &restraint, &[1]), Some(vec![1]));
    }

    #[test]
    fn positive_acyclicity() {
        let mut positive = SimpleGraph::new(3);
        positive.add_edge(0, 1);
        positive.add_edge(1, 2);
        assert!(is_positively_acyclic(&positive, &positive.transpose()));

        positive.add_edge(2, 2);
        assert!(!is_positively_acyclic(&positive, &positive.transpose()));
    }
}
