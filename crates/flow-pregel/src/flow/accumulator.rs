//! Admission control for competing candidate paths
//!
//! An [`Accumulator`] is scoped to a single mapper or reducer invocation.
//! Candidates are presented one at a time; each accepted path reserves its
//! bottleneck on every one of its edges, so later candidates sharing those
//! edges see the reduced residual.

use std::collections::HashMap;

use super::edge::{Edge, EdgeId, Path};
use crate::pregel::AugmentationMap;

/// Flow admitted per edge id within one invocation
#[derive(Debug, Clone, Default)]
pub struct Accumulator {
    admitted: HashMap<EdgeId, i64>,
}

impl Accumulator {
    /// Create an empty accumulator
    pub fn new() -> Self {
        Self::default()
    }

    /// Flow already admitted on an edge by this accumulator
    pub fn admitted(&self, id: &EdgeId) -> i64 {
        self.admitted.get(id).copied().unwrap_or(0)
    }

    /// Residual of an edge after prior rounds and this accumulator's admissions
    pub fn residual(&self, edge: &Edge) -> i64 {
        edge.capacity - edge.flow - self.admitted(&edge.id)
    }

    /// Smallest residual along the path, or `None` if the path cannot carry flow
    pub fn bottleneck(&self, path: &Path) -> Option<i64> {
        let mut bottleneck: Option<i64> = None;
        for edge in path.edges() {
            let residual = self.residual(edge);
            if residual <= 0 {
                return None;
            }
            bottleneck = Some(bottleneck.map_or(residual, |b| b.min(residual)));
        }
        bottleneck
    }

    /// Try to admit a path.
    ///
    /// On success the bottleneck is added to every edge of the path and true
    /// is returned; on rejection nothing changes.
    pub fn accept(&mut self, path: &Path) -> bool {
        let Some(bottleneck) = self.bottleneck(path) else {
            return false;
        };
        for edge in path.edges() {
            *self.admitted.entry(edge.id.clone()).or_insert(0) += bottleneck;
        }
        true
    }

    /// Check if nothing has been admitted
    pub fn is_empty(&self) -> bool {
        self.admitted.is_empty()
    }

    /// Consume the accumulator and return its admitted flow per edge
    pub fn into_augmentation(self) -> AugmentationMap {
        self.admitted.into_iter().collect()
    }
}

/// Admit an ordered batch of candidates against `accumulator`.
///
/// Returns the accepted candidates (in input order) and the updated
/// accumulator. Which candidates win depends on the order; the capacity
/// bound does not.
pub fn admit<'p>(
    candidates: impl IntoIterator<Item = &'p Path>,
    mut accumulator: Accumulator,
) -> (Vec<&'p Path>, Accumulator) {
    let accepted = candidates
        .into_iter()
        .filter(|path| accumulator.accept(path))
        .collect();
    (accepted, accumulator)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path(edges: &[(&str, &str, i64)]) -> Path {
        Path::from_edges(
            edges
                .iter()
                .map(|(from, to, cap)| Edge::new(from, to, *cap))
                .collect(),
        )
        .unwrap()
    }

    #[test]
    fn test_accept_updates_every_edge_by_bottleneck() {
        let mut acc = Accumulator::new();
        let p = path(&[("s", "a", 10), ("a", "b", 3), ("b", "t", 7)]);

        assert!(acc.accept(&p));
        assert_eq!(acc.admitted(&EdgeId::between("s", "a")), 3);
        assert_eq!(acc.admitted(&EdgeId::between("a", "b")), 3);
        assert_eq!(acc.admitted(&EdgeId::between("b", "t")), 3);
    }

    #[test]
    fn test_accept_accounts_for_prior_round_flow() {
        let mut acc = Accumulator::new();
        let mut p = path(&[("s", "a", 10), ("a", "t", 10)]);
        for edge in p.edges_mut() {
            edge.flow = 6;
        }
        assert!(acc.accept(&p));
        assert_eq!(acc.admitted(&EdgeId::between("s", "a")), 4);
    }

    #[test]
    fn test_reject_saturated_path_leaves_state_untouched() {
        let mut acc = Accumulator::new();
        let mut p = path(&[("s", "a", 10), ("a", "t", 5)]);
        p.edges_mut().last().unwrap().flow = 5;

        assert!(!acc.accept(&p));
        assert!(acc.is_empty());
    }

    #[test]
    fn test_competing_paths_first_come_first_served() {
        let mut acc = Accumulator::new();
        let first = path(&[("s", "a", 4), ("a", "t", 10)]);
        let second = path(&[("s", "b", 10), ("b", "a", 10), ("a", "t", 10)]);
        let third = path(&[("s", "c", 10), ("c", "a", 10), ("a", "t", 10)]);

        assert!(acc.accept(&first));
        assert!(acc.accept(&second));
        assert_eq!(acc.admitted(&EdgeId::between("a", "t")), 10);
        // a->t is now fully reserved
        assert!(!acc.accept(&third));
        assert_eq!(acc.admitted(&EdgeId::between("s", "c")), 0);
    }

    #[test]
    fn test_duplicate_path_rejected() {
        let mut acc = Accumulator::new();
        let p = path(&[("s", "a", 10)]);
        assert!(acc.accept(&p));
        assert!(!acc.accept(&p));
        assert_eq!(acc.admitted(&EdgeId::between("s", "a")), 10);
    }

    #[test]
    fn test_empty_path_rejected() {
        let mut acc = Accumulator::new();
        assert!(!acc.accept(&Path::default()));
    }

    #[test]
    fn test_admit_batch() {
        let a = path(&[("s", "a", 5), ("a", "t", 5)]);
        let b = path(&[("s", "a", 5), ("a", "t", 5)]);
        let c = path(&[("s", "b", 2), ("b", "t", 9)]);
        let candidates = vec![a.clone(), b, c.clone()];

        let (accepted, acc) = admit(&candidates, Accumulator::new());
        assert_eq!(accepted, vec![&a, &c]);

        let flows = acc.into_augmentation();
        assert_eq!(flows.get(&EdgeId::between("a", "t")), 5);
        assert_eq!(flows.get(&EdgeId::between("b", "t")), 2);
    }
}
