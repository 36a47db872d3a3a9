use serde::{Deserialize, Serialize};

/// Hyper-parameters of a belief propagation run
///
/// # Example
///
/// ```
/// use bnrs::core::PropagationConfig;
///
/// let config = PropagationConfig {
///     max_iterations: 200,
///     ..PropagationConfig::default()
/// };
/// assert_eq!(config.tolerance, 1e-4);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PropagationConfig {
    /// Maximal number of iterations, propagation stops without convergence after it
    pub max_iterations: usize,

    /// Propagation converges when the discrepancy between two subsequent
    /// message configurations is smaller than this value
    pub tolerance: f64,

    /// Visit edges in a random order within each iteration. It does not change
    /// the result and is useful to check the order independence of an update
    pub shuffle_edges: bool,

    /// Seed of the generator used to initialize messages and shuffle edges,
    /// the generator is seeded from entropy if not given
    pub seed: Option<u64>,
}

impl Default for PropagationConfig {
    fn default() -> Self {
        PropagationConfig {
            max_iterations: 1000,
            tolerance: 1e-4,
            shuffle_edges: false,
            seed: None,
        }
    }
}
