//! Residual graph and minimum cut from a finished augmentation map

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::Dfs;
use std::collections::{BTreeMap, BTreeSet, HashMap};

use super::network::FlowNetwork;
use crate::pregel::{AugmentationMap, PregelError, VertexId};

/// Residual network with only positive-capacity arcs
#[derive(Debug, Clone)]
pub struct ResidualGraph {
    graph: DiGraph<VertexId, i64>,
    index: HashMap<VertexId, NodeIndex>,
}

impl ResidualGraph {
    /// Remaining capacity of `from -> to` (0 when the arc is absent)
    pub fn weight(&self, from: &str, to: &str) -> i64 {
        let (Some(a), Some(b)) = (
            self.index.get(&VertexId::new(from)),
            self.index.get(&VertexId::new(to)),
        ) else {
            return 0;
        };
        self.graph
            .find_edge(*a, *b)
            .and_then(|e| self.graph.edge_weight(e))
            .copied()
            .unwrap_or(0)
    }

    /// Number of positive residual arcs
    pub fn arc_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Vertices reachable from `start` along positive residual arcs
    pub fn reachable_from(&self, start: &VertexId) -> BTreeSet<VertexId> {
        let mut reached = BTreeSet::new();
        let Some(&start) = self.index.get(start) else {
            return reached;
        };
        let mut dfs = Dfs::new(&self.graph, start);
        while let Some(node) = dfs.next(&self.graph) {
            reached.insert(self.graph[node].clone());
        }
        reached
    }
}

/// Build the residual network of `network` under `augmentation`
///
/// Forward capacity drops by the flow on each edge and the reverse arc gains
/// it. Arcs left with zero capacity are removed.
pub fn residual_graph(
    network: &FlowNetwork,
    augmentation: &AugmentationMap,
) -> Result<ResidualGraph, PregelError> {
    let mut weights: BTreeMap<(VertexId, VertexId), i64> = network
        .edges()
        .map(|(from, to, cap)| ((from.clone(), to.clone()), cap))
        .collect();

    let mut reverse = Vec::new();
    for (id, flow) in augmentation.iter() {
        let (from, to) = id
            .endpoints()
            .ok_or_else(|| PregelError::state_error(format!("Invalid edge id {id}")))?;
        let key = (VertexId::new(from), VertexId::new(to));
        let weight = weights
            .get_mut(&key)
            .ok_or_else(|| PregelError::state_error(format!("Flow on unknown edge {id}")))?;
        if flow > *weight {
            return Err(PregelError::capacity_violation(id.clone(), flow, *weight));
        }
        *weight -= flow;
        reverse.push(((key.1, key.0), flow));
    }
    for (key, flow) in reverse {
        *weights.entry(key).or_insert(0) += flow;
    }

    let mut graph = DiGraph::new();
    let mut index = HashMap::new();
    for vertex in network.vertices() {
        index.insert(vertex.clone(), graph.add_node(vertex.clone()));
    }
    for ((from, to), weight) in weights {
        if weight <= 0 {
            continue;
        }
        if let (Some(&a), Some(&b)) = (index.get(&from), index.get(&to)) {
            graph.add_edge(a, b, weight);
        }
    }

    Ok(ResidualGraph { graph, index })
}

/// An `s`/`t` cut of the original network
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MinCut {
    /// Vertices reachable from `s` in the residual network
    pub source_side: BTreeSet<VertexId>,
    /// Original edges leaving the source side, with their capacities
    pub cut_edges: Vec<(VertexId, VertexId, i64)>,
    /// Sum of the cut edges' capacities
    pub value: i64,
    /// Whether `t` is still reachable; if so the flow was not maximal
    pub sink_reachable: bool,
}

/// Extract the cut induced by `augmentation`
///
/// When the augmentation is a maximum flow, `t` is unreachable and `value`
/// equals the flow value.
pub fn min_cut(network: &FlowNetwork, augmentation: &AugmentationMap) -> Result<MinCut, PregelError> {
    network.validate_endpoints()?;
    let residual = residual_graph(network, augmentation)?;
    let source_side = residual.reachable_from(&VertexId::source());

    let cut_edges: Vec<_> = network
        .edges()
        .filter(|(from, to, _)| source_side.contains(*from) && !source_side.contains(*to))
        .map(|(from, to, cap)| (from.clone(), to.clone(), cap))
        .collect();
    let value: i64 = cut_edges.iter().map(|(_, _, cap)| cap).sum();
    let sink_reachable = source_side.contains(&VertexId::sink());

    tracing::debug!(
        source_side = source_side.len(),
        cut_edges = cut_edges.len(),
        value,
        sink_reachable,
        "Extracted cut"
    );

    Ok(MinCut {
        source_side,
        cut_edges,
        value,
        sink_reachable,
    })
}
