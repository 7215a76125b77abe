//! Route valuation: the distribution-propagating expected-chains metric.
//!
//! A route of width `w` runs `w` parallel elementary attempts per hop. The
//! value of a route is the expected number of end-to-end chains it yields,
//! which is not additive per hop: it depends on the full distribution of
//! "how many of the `w` attempts are still alive". This module carries that
//! distribution explicitly and collapses it to a scalar only at comparison
//! time.

use qnet_topology::{NodeId, Topology};

/// Probability distribution over the number of parallel attempts (out of a
/// fixed width `w`) that survive every hop folded in so far.
///
/// Index `m` holds `P[exactly m attempts survive]`, `m ∈ 0..=w`.
#[derive(Debug, Clone, PartialEq)]
pub struct SuccessDistribution {
    probs: Vec<f64>,
}

impl SuccessDistribution {
    /// Distribution after a single hop with per-attempt success `p`:
    /// binomial over `width` attempts.
    pub fn single_hop(width: usize, p: f64) -> Self {
        let probs = (0..=width).map(|m| binomial_pmf(width, m, p)).collect();
        Self { probs }
    }

    /// Fold one more hop with per-attempt success `p` into the distribution.
    ///
    /// After the new hop, `m` attempts survive when either exactly `m`
    /// survived before and at least `m` succeed on the new hop, or more than
    /// `m` survived before and exactly `m` succeed now. The new hop runs its
    /// own `w` attempts, so surplus survivors on one side cannot help the
    /// other.
    pub fn fold_hop(&self, p: f64) -> Self {
        let w = self.width();
        let exactly: Vec<f64> = (0..=w).map(|m| binomial_pmf(w, m, p)).collect();
        let mut at_least = exactly.clone();
        for m in (0..w).rev() {
            at_least[m] += at_least[m + 1];
        }
        let mut old_above = vec![0.0; w + 1];
        for m in (0..w).rev() {
            old_above[m] = old_above[m + 1] + self.probs[m + 1];
        }
        let probs = (0..=w)
            .map(|m| self.probs[m] * at_least[m] + exactly[m] * old_above[m])
            .collect();
        Self { probs }
    }

    /// The width `w` this distribution ranges over.
    pub fn width(&self) -> usize {
        self.probs.len() - 1
    }

    /// Expected number of surviving attempts, `Σ m · P[m]`.
    pub fn expected_survivors(&self) -> f64 {
        self.probs
            .iter()
            .enumerate()
            .map(|(m, p)| m as f64 * p)
            .sum()
    }

    /// Expected end-to-end chains over a route of `hops` hops: every
    /// surviving attempt still needs `hops - 1` swaps, each succeeding with
    /// probability `q`.
    pub fn expected_chains(&self, q: f64, hops: usize) -> f64 {
        if hops == 0 {
            return 0.0;
        }
        self.expected_survivors() * q.powi(hops as i32 - 1)
    }
}

/// Expected chains over a concrete path at a given width, folding every hop
/// of the path. Returns 0 when the path has a hop with no physical link.
pub fn expected_chains_on_path(topo: &Topology, path: &[NodeId], width: usize) -> f64 {
    if path.len() < 2 || width == 0 {
        return 0.0;
    }
    let mut dist: Option<SuccessDistribution> = None;
    for hop in path.windows(2) {
        let Some(link) = topo.links_between(hop[0], hop[1]).next() else {
            return 0.0;
        };
        dist = Some(match dist {
            None => SuccessDistribution::single_hop(width, link.p()),
            Some(d) => d.fold_hop(link.p()),
        });
    }
    match dist {
        Some(d) => d.expected_chains(topo.q(), path.len() - 1),
        None => 0.0,
    }
}

/// `C(n, m) p^m (1-p)^(n-m)` computed multiplicatively to stay in f64 range.
fn binomial_pmf(n: usize, m: usize, p: f64) -> f64 {
    let mut coeff = 1.0;
    for i in 0..m {
        coeff *= (n - i) as f64 / (i + 1) as f64;
    }
    coeff * p.powi(m as i32) * (1.0 - p).powi((n - m) as i32)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn total(dist: &SuccessDistribution) -> f64 {
        dist.probs.iter().sum()
    }

    #[test]
    fn single_hop_is_binomial() {
        let d = SuccessDistribution::single_hop(2, 0.5);
        assert!((d.probs[0] - 0.25).abs() < 1e-12);
        assert!((d.probs[1] - 0.5).abs() < 1e-12);
        assert!((d.probs[2] - 0.25).abs() < 1e-12);
        assert!((total(&d) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn fold_preserves_probability_mass() {
        let mut d = SuccessDistribution::single_hop(3, 0.8);
        for _ in 0..5 {
            d = d.fold_hop(0.7);
            assert!((total(&d) - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn folding_never_increases_expectation() {
        // Extending a route can only lose attempts, never gain them.
        for &p in &[0.1, 0.5, 0.9, 1.0] {
            let mut d = SuccessDistribution::single_hop(4, 0.9);
            let mut prev = d.expected_survivors();
            for _ in 0..6 {
                d = d.fold_hop(p);
                let next = d.expected_survivors();
                assert!(next <= prev + 1e-12, "p = {p}: {next} > {prev}");
                prev = next;
            }
        }
    }

    #[test]
    fn certain_hops_change_nothing() {
        let d = SuccessDistribution::single_hop(3, 0.6);
        let folded = d.fold_hop(1.0);
        for (a, b) in d.probs.iter().zip(&folded.probs) {
            assert!((a - b).abs() < 1e-12);
        }
    }

    #[test]
    fn expected_chains_discounts_swaps() {
        let d = SuccessDistribution::single_hop(1, 1.0);
        // One guaranteed attempt, three hops, q = 0.5: two swaps remain.
        assert!((d.expected_chains(0.5, 3) - 0.25).abs() < 1e-12);
        assert_eq!(d.expected_chains(0.5, 0), 0.0);
    }
}
