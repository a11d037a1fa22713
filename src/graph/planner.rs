use rustc_hash::FxHashMap;

use super::{Graph, GraphError};

/// Group the nodes of a graph into levels for evaluation.
///
/// Every node in a level depends only on graph inputs and on nodes in
/// earlier levels, so the nodes within a level can be evaluated in any order
/// or concurrently. Node indices within each level are sorted.
///
/// Returns an error if a value has more than one producer, if a node or
/// graph output refers to a value which nothing produces or if the graph has
/// a cycle.
pub fn topo_levels(graph: &Graph) -> Result<Vec<Vec<usize>>, GraphError> {
    // Map of value name to producing node. `None` means a graph input.
    let mut producers: FxHashMap<&str, Option<usize>> = FxHashMap::default();

    for input in &graph.inputs {
        if producers.insert(input.name.as_str(), None).is_some() {
            return Err(GraphError::DuplicateProducer {
                value: input.name.clone(),
            });
        }
    }
    for (node_idx, node) in graph.nodes.iter().enumerate() {
        for output in node.present_outputs() {
            if producers.insert(output, Some(node_idx)).is_some() {
                return Err(GraphError::DuplicateProducer {
                    value: output.to_string(),
                });
            }
        }
    }

    if let Some(output) = graph
        .outputs
        .iter()
        .find(|output| !producers.contains_key(output.name.as_str()))
    {
        return Err(GraphError::UndefinedOutput {
            value: output.name.clone(),
        });
    }

    let mut pending_deps = vec![0usize; graph.nodes.len()];
    let mut consumers: Vec<Vec<usize>> = vec![Vec::new(); graph.nodes.len()];

    for (node_idx, node) in graph.nodes.iter().enumerate() {
        for input in node.present_inputs() {
            match producers.get(input) {
                Some(Some(producer)) => {
                    pending_deps[node_idx] += 1;
                    consumers[*producer].push(node_idx);
                }
                Some(None) => {}
                None => {
                    return Err(GraphError::UndefinedValue {
                        node: graph.node_name(node_idx),
                        value: input.to_string(),
                    });
                }
            }
        }
    }

    let mut levels = Vec::new();
    let mut level: Vec<usize> = (0..graph.nodes.len())
        .filter(|&node_idx| pending_deps[node_idx] == 0)
        .collect();
    let mut visited = 0;

    while !level.is_empty() {
        visited += level.len();

        let mut next_level = Vec::new();
        for &node_idx in &level {
            for &consumer in &consumers[node_idx] {
                pending_deps[consumer] -= 1;
                if pending_deps[consumer] == 0 {
                    next_level.push(consumer);
                }
            }
        }
        next_level.sort_unstable();

        levels.push(level);
        level = next_level;
    }

    if visited < graph.nodes.len() {
        let nodes = (0..graph.nodes.len())
            .filter(|&node_idx| pending_deps[node_idx] > 0)
            .map(|node_idx| graph.node_name(node_idx))
            .collect();
        return Err(GraphError::Cycle { nodes });
    }

    Ok(levels)
}

#[cfg(test)]
mod tests {
    use super::topo_levels;
    use crate::graph::{Graph, GraphError, Node};
    use nmdefs_shape_inference::TensorShape;

    fn graph_with_nodes(nodes: impl IntoIterator<Item = Node>) -> Graph {
        let mut graph = Graph::new("test");
        graph.add_input("x", None, TensorShape::unknown());
        for node in nodes {
            graph.add_node(node);
        }
        graph
    }

    fn node(name: &str, inputs: &[&str], outputs: &[&str]) -> Node {
        Node::new("Op")
            .with_name(name)
            .with_inputs(inputs.iter().copied())
            .with_outputs(outputs.iter().copied())
    }

    #[test]
    fn test_topo_levels() {
        // Nodes are listed out of order.
        let graph = graph_with_nodes([
            node("c", &["a_out", "b_out"], &["c_out"]),
            node("a", &["x"], &["a_out"]),
            node("b", &["x", ""], &["b_out"]),
            node("d", &["a_out", "a_out"], &["d_out"]),
        ]);
        let levels = topo_levels(&graph).unwrap();
        assert_eq!(levels, [vec![1, 2], vec![0, 3]]);
    }

    #[test]
    fn test_empty_graph() {
        let graph = graph_with_nodes([]);
        assert!(topo_levels(&graph).unwrap().is_empty());
    }

    #[test]
    fn test_cycle() {
        let graph = graph_with_nodes([
            node("a", &["x", "b_out"], &["a_out"]),
            node("b", &["a_out"], &["b_out"]),
            node("c", &["x"], &["c_out"]),
        ]);
        let err = topo_levels(&graph).err().unwrap();
        assert_eq!(
            err,
            GraphError::Cycle {
                nodes: vec!["a".to_string(), "b".to_string()]
            }
        );
    }

    #[test]
    fn test_duplicate_producer() {
        let graph = graph_with_nodes([
            node("a", &["x"], &["y"]),
            node("b", &["x"], &["y"]),
        ]);
        assert_eq!(
            topo_levels(&graph).err(),
            Some(GraphError::DuplicateProducer {
                value: "y".to_string()
            })
        );

        let graph = graph_with_nodes([node("a", &["x"], &["x"])]);
        assert_eq!(
            topo_levels(&graph).err(),
            Some(GraphError::DuplicateProducer {
                value: "x".to_string()
            })
        );
    }

    #[test]
    fn test_undefined_value() {
        let graph = graph_with_nodes([node("a", &["x", "w"], &["y"])]);
        assert_eq!(
            topo_levels(&graph).err(),
            Some(GraphError::UndefinedValue {
                node: "a".to_string(),
                value: "w".to_string()
            })
        );
    }

    #[test]
    fn test_undefined_output() {
        let mut graph = graph_with_nodes([node("a", &["x"], &["y"])]);
        graph.add_output("y", None, TensorShape::unknown());
        graph.add_output("x", None, TensorShape::unknown());
        assert!(topo_levels(&graph).is_ok());

        graph.add_output("z", None, TensorShape::unknown());
        assert_eq!(
            topo_levels(&graph).err(),
            Some(GraphError::UndefinedOutput {
                value: "z".to_string()
            })
        );
    }
}
