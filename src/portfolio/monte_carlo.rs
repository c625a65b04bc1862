//! Monte Carlo sampling of the feasible weight simplex.
//!
//! Each trial draws N independent uniforms and normalizes them by their sum.
//! The resulting weights are feasible but not uniformly distributed over the
//! simplex; the cloud is meant for plotting the risk/return space next to the
//! frontier. Parallelized via Rayon.

use nalgebra::DVector;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::core::statistics::ReturnStatistics;
use crate::metrics::performance::{portfolio_return, portfolio_volatility, sharpe_ratio};

/// Configuration for Monte Carlo sampling.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MonteCarloConfig {
    pub n_simulations: usize,
    pub seed: u64,
    /// Trials per parallel work unit. Each chunk owns an RNG derived from
    /// `seed` and the chunk index, so output depends on (seed, chunk_size)
    /// but never on the number of threads.
    pub chunk_size: usize,
    /// Keep every sampled weight vector in the result.
    pub record_weights: bool,
}

impl Default for MonteCarloConfig {
    fn default() -> Self {
        Self {
            n_simulations: 10_000,
            seed: 42,
            chunk_size: 1_024,
            record_weights: false,
        }
    }
}

/// Result of a Monte Carlo run: parallel sequences, one entry per trial.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SimulationResult {
    pub returns: Vec<f64>,
    pub volatilities: Vec<f64>,
    /// NaN where the sampled portfolio had zero volatility.
    pub sharpe_ratios: Vec<f64>,
    /// Sampled weights, when requested.
    pub weights: Option<Vec<Vec<f64>>>,
    /// Trials whose Sharpe ratio was undefined.
    pub degenerate_samples: usize,
}

impl SimulationResult {
    /// Number of trials.
    #[inline]
    pub fn len(&self) -> usize {
        self.returns.len()
    }

    /// Check if empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.returns.is_empty()
    }

    /// Index of the trial with the highest defined Sharpe ratio.
    pub fn max_sharpe_index(&self) -> Option<usize> {
        self.sharpe_ratios
            .iter()
            .enumerate()
            .filter(|(_, s)| !s.is_nan())
            .max_by(|(_, a), (_, b)| a.total_cmp(b))
            .map(|(i, _)| i)
    }

    /// Index of the trial with the lowest volatility.
    pub fn min_volatility_index(&self) -> Option<usize> {
        self.volatilities
            .iter()
            .enumerate()
            .min_by(|(_, a), (_, b)| a.total_cmp(b))
            .map(|(i, _)| i)
    }
}

struct Sample {
    ret: f64,
    vol: f64,
    sharpe: f64,
    weights: Option<Vec<f64>>,
}

/// Draw normalized-uniform weights into `buf`.
fn sample_weights<R: Rng>(rng: &mut R, buf: &mut DVector<f64>) {
    let mut total = 0.0;
    for w in buf.iter_mut() {
        *w = rng.random::<f64>();
        total += *w;
    }
    if total > 0.0 {
        *buf /= total;
    } else {
        let n = buf.len() as f64;
        buf.fill(1.0 / n);
    }
}

fn chunk_seed(seed: u64, chunk_idx: usize) -> u64 {
    seed ^ (chunk_idx as u64).wrapping_mul(0x9e3779b97f4a7c15)
}

/// Sample `config.n_simulations` random portfolios and evaluate each one.
///
/// Zero trials yields an empty result.
pub fn simulate(stats: &ReturnStatistics, config: &MonteCarloConfig) -> SimulationResult {
    let n_sims = config.n_simulations;
    if n_sims == 0 {
        return SimulationResult::default();
    }

    let n_assets = stats.n_assets();
    let chunk_size = config.chunk_size.max(1);
    let n_chunks = n_sims.div_ceil(chunk_size);

    let chunks: Vec<Vec<Sample>> = (0..n_chunks)
        .into_par_iter()
        .map(|chunk_idx| {
            let start = chunk_idx * chunk_size;
            let end = (start + chunk_size).min(n_sims);
            let mut rng = StdRng::seed_from_u64(chunk_seed(config.seed, chunk_idx));
            let mut weights = DVector::<f64>::zeros(n_assets);

            (start..end)
                .map(|_| {
                    sample_weights(&mut rng, &mut weights);
                    let ret = portfolio_return(&weights, stats);
                    let vol = portfolio_volatility(&weights, stats);
                    Sample {
                        ret,
                        vol,
                        sharpe: sharpe_ratio(ret, vol).unwrap_or(f64::NAN),
                        weights: config
                            .record_weights
                            .then(|| weights.iter().copied().collect()),
                    }
                })
                .collect()
        })
        .collect();

    let mut result = SimulationResult {
        returns: Vec::with_capacity(n_sims),
        volatilities: Vec::with_capacity(n_sims),
        sharpe_ratios: Vec::with_capacity(n_sims),
        weights: config.record_weights.then(|| Vec::with_capacity(n_sims)),
        degenerate_samples: 0,
    };

    for sample in chunks.into_iter().flatten() {
        if sample.sharpe.is_nan() {
            result.degenerate_samples += 1;
        }
        result.returns.push(sample.ret);
        result.volatilities.push(sample.vol);
        result.sharpe_ratios.push(sample.sharpe);
        if let (Some(all), Some(w)) = (result.weights.as_mut(), sample.weights) {
            all.push(w);
        }
    }

    if result.degenerate_samples > 0 {
        warn!(
            degenerate = result.degenerate_samples,
            "sampled portfolios with zero volatility have undefined Sharpe ratios"
        );
    }
    debug!(n_sims, n_chunks, "monte carlo sampling finished");

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{is_feasible, WEIGHT_TOLERANCE};

    fn three_asset_stats() -> ReturnStatistics {
        ReturnStatistics::from_moments(
            vec![0.0005, 0.001, 0.0015],
            vec![
                vec![0.0001, 0.00002, 0.0],
                vec![0.00002, 0.0004, 0.00005],
                vec![0.0, 0.00005, 0.0009],
            ],
            100,
        )
        .unwrap()
    }

    #[test]
    fn test_zero_simulations() {
        let config = MonteCarloConfig { n_simulations: 0, ..Default::default() };
        let result = simulate(&three_asset_stats(), &config);
        assert!(result.is_empty());
        assert!(result.volatilities.is_empty());
        assert!(result.sharpe_ratios.is_empty());
        assert_eq!(result.max_sharpe_index(), None);
    }

    #[test]
    fn test_simulate_basic() {
        let stats = three_asset_stats();
        let config = MonteCarloConfig {
            n_simulations: 2_500,
            chunk_size: 256,
            record_weights: true,
            ..Default::default()
        };
        let result = simulate(&stats, &config);

        assert_eq!(result.len(), 2_500);
        assert_eq!(result.volatilities.len(), 2_500);
        assert_eq!(result.sharpe_ratios.len(), 2_500);
        assert_eq!(result.degenerate_samples, 0);

        let weights = result.weights.as_ref().unwrap();
        assert_eq!(weights.len(), 2_500);
        assert!(weights.iter().all(|w| is_feasible(w, WEIGHT_TOLERANCE)));

        // Every sampled return lies inside the single-asset return range.
        let (lo, hi) = stats.return_range();
        assert!(result.returns.iter().all(|&r| r >= lo - 1e-12 && r <= hi + 1e-12));
        assert!(result.volatilities.iter().all(|&v| v > 0.0));
    }

    #[test]
    fn test_deterministic() {
        let stats = three_asset_stats();
        let config = MonteCarloConfig { n_simulations: 3_000, seed: 123, ..Default::default() };

        let r1 = simulate(&stats, &config);
        let r2 = simulate(&stats, &config);
        assert_eq!(r1, r2);

        let other = MonteCarloConfig { seed: 124, ..config };
        let r3 = simulate(&stats, &other);
        assert_ne!(r1.returns, r3.returns);
    }

    #[test]
    fn test_zero_volatility_samples() {
        let stats = ReturnStatistics::from_moments(
            vec![0.001, 0.002],
            vec![vec![0.0, 0.0], vec![0.0, 0.0]],
            60,
        )
        .unwrap();
        let config = MonteCarloConfig {
            n_simulations: 100,
            chunk_size: 16,
            ..Default::default()
        };
        let result = simulate(&stats, &config);

        assert_eq!(result.len(), 100);
        assert_eq!(result.degenerate_samples, 100);
        assert!(result.sharpe_ratios.iter().all(|s| s.is_nan()));
        assert!(result.volatilities.iter().all(|&v| v == 0.0));
        assert!(result.returns.iter().all(|r| r.is_finite()));
        assert_eq!(result.max_sharpe_index(), None);
    }

    #[test]
    fn test_best_sample_indices() {
        let result = SimulationResult {
            returns: vec![0.1, 0.2, 0.3],
            volatilities: vec![0.2, 0.1, 0.0],
            sharpe_ratios: vec![0.5, 2.0, f64::NAN],
            weights: None,
            degenerate_samples: 1,
        };
        assert_eq!(result.max_sharpe_index(), Some(1));
        assert_eq!(result.min_volatility_index(), Some(2));
    }
}
