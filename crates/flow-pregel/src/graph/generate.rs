//! Random small-world test networks
//!
//! A ring lattice of numbered vertices is rewired Watts-Strogatz style; each
//! undirected lattice edge becomes one directed edge with a random capacity.
//! `s` then fans out to a random subset of vertices and a random subset
//! drains into `t` (or back into `s`).

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use super::network::FlowNetwork;
use crate::pregel::{PregelError, VertexId};

/// Parameters for [`small_world`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratorConfig {
    /// Number of numbered vertices (excluding `s` and `t`)
    pub nodes: usize,
    /// Lattice degree; each vertex links to `neighbors / 2` on each side
    pub neighbors: usize,
    /// Probability of rewiring each lattice edge
    pub rewire: f64,
    /// Probability that `s` links to a given vertex
    pub source_probability: f64,
    /// Probability that a vertex links to `s` or `t` (split evenly)
    pub attach_probability: f64,
    /// Largest edge capacity; capacities are uniform in `1..=max_capacity`
    pub max_capacity: i64,
    /// RNG seed; `None` draws one from the OS
    pub seed: Option<u64>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            nodes: 100,
            neighbors: 4,
            rewire: 0.2,
            source_probability: 0.1,
            attach_probability: 0.3,
            max_capacity: 10,
            seed: None,
        }
    }
}

impl GeneratorConfig {
    /// Config for `nodes` vertices with default shape
    pub fn new(nodes: usize) -> Self {
        Self {
            nodes,
            ..Default::default()
        }
    }

    /// Set the RNG seed
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Set the lattice degree
    pub fn with_neighbors(mut self, neighbors: usize) -> Self {
        self.neighbors = neighbors;
        self
    }

    /// Set the rewiring probability
    pub fn with_rewire(mut self, rewire: f64) -> Self {
        self.rewire = rewire;
        self
    }

    fn validate(&self) -> Result<(), PregelError> {
        for (name, p) in [
            ("rewire", self.rewire),
            ("source_probability", self.source_probability),
            ("attach_probability", self.attach_probability),
        ] {
            if !(0.0..=1.0).contains(&p) {
                return Err(PregelError::config_error(format!(
                    "{name} must be within [0, 1], got {p}"
                )));
            }
        }
        if self.max_capacity < 1 {
            return Err(PregelError::config_error("max_capacity must be at least 1"));
        }
        Ok(())
    }
}

/// Ring lattice with rewiring, as undirected pairs `(low, high)`
fn lattice(nodes: usize, neighbors: usize, rewire: f64, rng: &mut StdRng) -> BTreeSet<(usize, usize)> {
    let half = (neighbors / 2).min(nodes.saturating_sub(1) / 2);
    let pair = |a: usize, b: usize| (a.min(b), a.max(b));

    let mut edges = BTreeSet::new();
    for u in 0..nodes {
        for j in 1..=half {
            edges.insert(pair(u, (u + j) % nodes));
        }
    }

    for j in 1..=half {
        for u in 0..nodes {
            let original = pair(u, (u + j) % nodes);
            if !edges.contains(&original) || !rng.random_bool(rewire) {
                continue;
            }
            let w = rng.random_range(0..nodes);
            let replacement = pair(u, w);
            if w == u || edges.contains(&replacement) {
                continue;
            }
            edges.remove(&original);
            edges.insert(replacement);
        }
    }
    edges
}

/// Generate a random flow network
pub fn small_world(config: &GeneratorConfig) -> Result<FlowNetwork, PregelError> {
    config.validate()?;
    let mut rng = match config.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };

    let mut network = FlowNetwork::new();
    network.add_vertex(VertexId::source())?;
    network.add_vertex(VertexId::sink())?;

    for u in 0..config.nodes {
        network.add_vertex(u.to_string())?;
    }
    for (u, v) in lattice(config.nodes, config.neighbors, config.rewire, &mut rng) {
        let capacity = rng.random_range(1..=config.max_capacity);
        network.add_edge(v.to_string(), u.to_string(), capacity)?;
    }

    for u in 0..config.nodes {
        let vertex = u.to_string();
        if rng.random_bool(config.source_probability) {
            let capacity = rng.random_range(1..=config.max_capacity);
            network.add_edge(VertexId::source(), vertex.clone(), capacity)?;
        }
        if rng.random_bool(config.attach_probability) {
            let capacity = rng.random_range(1..=config.max_capacity);
            let target = if rng.random_bool(0.5) {
                VertexId::source()
            } else {
                VertexId::sink()
            };
            network.add_edge(vertex, target, capacity)?;
        }
    }

    tracing::debug!(
        vertices = network.vertex_count(),
        edges = network.edge_count(),
        seed = ?config.seed,
        "Generated small-world network"
    );
    Ok(network)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seeded_generation_is_reproducible() {
        let config = GeneratorConfig::new(30).with_seed(7);
        let first = small_world(&config).unwrap();
        let second = small_world(&config).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.vertex_count(), 32);
    }

    #[test]
    fn test_capacities_in_range() {
        let network = small_world(&GeneratorConfig::new(50).with_seed(1)).unwrap();
        assert!(network.edge_count() > 0);
        for (from, to, cap) in network.edges() {
            assert!((1..=10).contains(&cap), "{from}->{to} has {cap}");
            assert_ne!(from, to);
            assert!(!from.is_sink(), "t must have no outgoing edges");
        }
    }

    #[test]
    fn test_lattice_without_rewiring() {
        let mut rng = StdRng::seed_from_u64(0);
        let edges = lattice(6, 4, 0.0, &mut rng);
        assert_eq!(edges.len(), 12);
        assert!(edges.contains(&(0, 1)));
        assert!(edges.contains(&(0, 4)));
        assert!(edges.contains(&(0, 5)));
    }

    #[test]
    fn test_rewiring_keeps_edge_count() {
        let mut rng = StdRng::seed_from_u64(3);
        let edges = lattice(40, 4, 1.0, &mut rng);
        assert_eq!(edges.len(), 80);
        assert!(edges.iter().all(|(a, b)| a < b));
    }

    #[test]
    fn test_rejects_bad_probability() {
        let err = small_world(&GeneratorConfig::new(5).with_rewire(1.5)).unwrap_err();
        assert!(matches!(err, PregelError::ConfigError(_)));
    }

    #[test]
    fn test_tiny_networks() {
        let network = small_world(&GeneratorConfig::new(0).with_seed(2)).unwrap();
        assert_eq!(network.vertex_count(), 2);
        network.validate_endpoints().unwrap();

        let network = small_world(&GeneratorConfig::new(2).with_seed(2)).unwrap();
        assert_eq!(network.vertex_count(), 4);
    }
}
