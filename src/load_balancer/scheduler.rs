//! Weighted round-robin with GCD smoothing.
//!
//! Equal weights take the plain round-robin fast path. Differing weights walk the
//! ring while lowering a threshold (`current_weight`) by `gcd(weights)` on every
//! wrap; a node is eligible when its weight reaches the threshold. With weights
//! `[1, 2, 1]` this yields `1, 0, 1, 2, 1, 0, 1, 2, ...`: the heavy node gets its
//! extra share spread out instead of back to back.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use crate::error::SelectError;
use crate::load_balancer::node::Node;
use crate::load_balancer::registry::NodeRegistry;
use crate::load_balancer::Scheduler;

/// Weighted round-robin selector.
#[derive(Debug, Default)]
pub struct WeightedRoundRobin {
    current_weight: AtomicI64,
}

impl WeightedRoundRobin {
    pub fn new() -> Self {
        Self::default()
    }

    fn select_unweighted(&self, registry: &NodeRegistry) -> Option<Arc<Node>> {
        let len = registry.len();
        let start = registry.advance_cursor();

        for step in 0..len {
            let idx = start.wrapping_add(step) % len;
            let node = registry.node_at(idx);
            if node.is_alive() {
                if step != 0 {
                    registry.persist_cursor(idx);
                }
                return Some(node.clone());
            }
        }
        None
    }

    fn select_weighted(&self, registry: &NodeRegistry, weights: &[u32]) -> Option<Arc<Node>> {
        let len = weights.len();
        let gcd = i64::from(gcd_of(weights));
        let max = i64::from(max_of(weights));
        if max == 0 {
            return None;
        }

        let start = registry.advance_cursor();
        let mut current = self.current_weight.load(Ordering::Relaxed);

        // Every (index, threshold) pair is visited within len * max steps, so an
        // alive node is always found inside the bound if one exists.
        let bound = len.saturating_mul(max as usize);
        for step in 0..bound {
            let idx = start.wrapping_add(step) % len;
            if idx == 0 {
                current -= gcd;
                if current <= 0 {
                    current = max;
                }
            }

            if i64::from(weights[idx]) >= current {
                let node = registry.node_at(idx);
                if node.is_alive() {
                    self.current_weight.store(current, Ordering::Relaxed);
                    registry.persist_cursor(idx);
                    return Some(node.clone());
                }
            }
        }

        self.current_weight.store(current, Ordering::Relaxed);
        None
    }
}

impl Scheduler for WeightedRoundRobin {
    fn select_node(&self, registry: &NodeRegistry) -> Result<Arc<Node>, SelectError> {
        if registry.is_empty() {
            return Err(SelectError::NoneAvailable);
        }

        let weights: Vec<u32> = registry
            .snapshot_weights()
            .into_iter()
            .map(|(_, w)| w)
            .collect();

        let selected = if all_same(&weights) {
            self.select_unweighted(registry)
        } else {
            self.select_weighted(registry, &weights)
        };
        selected.ok_or(SelectError::NoneAvailable)
    }

    fn name(&self) -> &'static str {
        "weighted_round_robin"
    }
}

fn gcd(mut a: u32, mut b: u32) -> u32 {
    while b != 0 {
        (a, b) = (b, a % b);
    }
    a
}

fn gcd_of(weights: &[u32]) -> u32 {
    weights.iter().copied().fold(0, gcd)
}

fn max_of(weights: &[u32]) -> u32 {
    weights.iter().copied().max().unwrap_or(0)
}

fn all_same(weights: &[u32]) -> bool {
    weights.windows(2).all(|w| w[0] == w[1])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::forwarder::testing::StaticForwarder;
    use crate::dispatch::forwarder::Forwarder;
    use std::collections::HashMap;
    use std::time::{Duration, Instant};

    fn registry(weights: &[u32]) -> NodeRegistry {
        let mut registry = NodeRegistry::new();
        for (i, w) in weights.iter().enumerate() {
            let fwd: Arc<dyn Forwarder> = Arc::new(StaticForwarder::ok("ok"));
            registry
                .add(&format!("127.0.0.1:{}", 9000 + i), *w, fwd)
                .unwrap();
        }
        registry
    }

    fn pick(lb: &WeightedRoundRobin, registry: &NodeRegistry) -> u16 {
        lb.select_node(registry).unwrap().address().port() - 9000
    }

    #[test]
    fn test_helpers() {
        assert_eq!(gcd_of(&[4, 6, 8]), 2);
        assert_eq!(gcd_of(&[3, 5]), 1);
        assert_eq!(gcd_of(&[7]), 7);
        assert_eq!(max_of(&[1, 9, 3]), 9);
        assert!(all_same(&[2, 2, 2]));
        assert!(all_same(&[5]));
        assert!(!all_same(&[2, 1]));
    }

    #[test]
    fn test_round_robin_equal_weights() {
        let lb = WeightedRoundRobin::new();
        let registry = registry(&[1, 1]);

        assert_eq!(pick(&lb, &registry), 0);
        assert_eq!(pick(&lb, &registry), 1);
        assert_eq!(pick(&lb, &registry), 0);
    }

    #[test]
    fn test_equal_weights_fairness() {
        let lb = WeightedRoundRobin::new();
        let registry = registry(&[3, 3, 3, 3, 3]);
        let n = 1003;

        let mut counts: HashMap<u16, usize> = HashMap::new();
        for _ in 0..n {
            *counts.entry(pick(&lb, &registry)).or_default() += 1;
        }

        let expected = n / registry.len();
        for i in 0..registry.len() as u16 {
            let c = counts[&i];
            assert!(
                c + 1 >= expected && c <= expected + 1,
                "node {i} selected {c} times, expected {expected}±1"
            );
        }
    }

    #[test]
    fn test_unweighted_skips_dead() {
        let lb = WeightedRoundRobin::new();
        let registry = registry(&[1, 1, 1]);
        registry.mark_status(registry.node_at(1).address(), false);

        let picks: Vec<u16> = (0..6).map(|_| pick(&lb, &registry)).collect();
        assert!(!picks.contains(&1));
        assert!(picks.contains(&0) && picks.contains(&2));
    }

    #[test]
    fn test_weighted_interleaving() {
        let lb = WeightedRoundRobin::new();
        let registry = registry(&[1, 2, 1]);

        let picks: Vec<u16> = (0..12).map(|_| pick(&lb, &registry)).collect();
        assert_eq!(picks, vec![1, 0, 1, 2, 1, 0, 1, 2, 1, 0, 1, 2]);

        for window in picks.windows(4) {
            let heavy = window.iter().filter(|&&p| p == 1).count();
            assert_eq!(heavy, 2, "window {window:?}");
            assert_eq!(window.iter().filter(|&&p| p == 0).count(), 1);
            assert_eq!(window.iter().filter(|&&p| p == 2).count(), 1);
        }
        for pair in picks.windows(2) {
            assert_ne!(pair[0], pair[1], "node picked twice in a row: {picks:?}");
        }
    }

    #[test]
    fn test_weighted_proportions_with_common_divisor() {
        let lb = WeightedRoundRobin::new();
        let registry = registry(&[2, 4, 6]);

        let mut counts = [0usize; 3];
        for _ in 0..120 {
            counts[pick(&lb, &registry) as usize] += 1;
        }
        assert_eq!(counts, [20, 40, 60]);
    }

    #[test]
    fn test_weighted_skips_dead() {
        let lb = WeightedRoundRobin::new();
        let registry = registry(&[1, 2, 1]);
        registry.mark_status(registry.node_at(1).address(), false);

        for _ in 0..20 {
            assert_ne!(pick(&lb, &registry), 1);
        }
    }

    #[test]
    fn test_all_dead_terminates() {
        for weights in [&[1, 2, 1][..], &[5, 5, 5][..], &[1, 100][..]] {
            let lb = WeightedRoundRobin::new();
            let registry = registry(weights);
            for node in registry.nodes() {
                registry.mark_status(node.address(), false);
            }

            let started = Instant::now();
            for _ in 0..10 {
                assert_eq!(lb.select_node(&registry).unwrap_err(), SelectError::NoneAvailable);
            }
            assert!(started.elapsed() < Duration::from_secs(1));
        }
    }

    #[test]
    fn test_empty_registry() {
        let lb = WeightedRoundRobin::new();
        assert_eq!(
            lb.select_node(&NodeRegistry::new()).unwrap_err(),
            SelectError::NoneAvailable
        );
    }

    #[test]
    fn test_revival_visible_on_next_call() {
        for weights in [&[1, 2, 1][..], &[1, 1, 1][..]] {
            let lb = WeightedRoundRobin::new();
            let registry = registry(weights);
            for node in registry.nodes() {
                registry.mark_status(node.address(), false);
            }
            assert!(lb.select_node(&registry).is_err());

            let revived = registry.node_at(2).clone();
            registry.mark_status(revived.address(), true);
            let chosen = lb.select_node(&registry).unwrap();
            assert_eq!(chosen.address(), revived.address());
        }
    }

    #[test]
    fn test_concurrent_selection_never_returns_dead() {
        let lb = Arc::new(WeightedRoundRobin::new());
        let registry = Arc::new(registry(&[1, 3, 2, 1, 5]));
        for (i, node) in registry.nodes().iter().enumerate() {
            if i != 3 {
                registry.mark_status(node.address(), false);
            }
        }

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let lb = lb.clone();
                let registry = registry.clone();
                std::thread::spawn(move || {
                    for _ in 0..2_000 {
                        let node = lb.select_node(&registry).unwrap();
                        assert_eq!(node.address().port(), 9003);
                    }
                })
            })
            .collect();

        for h in handles {
            h.join().unwrap();
        }
    }
}
