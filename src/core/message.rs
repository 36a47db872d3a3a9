use std::{collections::HashMap, fmt::Display};

use ndarray::Array1;
use rand::Rng;
use rand_distr::{Distribution, Uniform};
use serde::{Deserialize, Serialize};

// ------------------------------------------------------------------------------------------

/// Stable identifier of a node, an index into the node arena of a Bayesian network
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub usize);

impl Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A directed edge of a Bayesian network. Both messages living on an edge
/// are vectors over the parent's levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Edge {
    pub parent: NodeId,
    pub child: NodeId,
}

impl Edge {
    #[inline(always)]
    pub fn new(parent: NodeId, child: NodeId) -> Self {
        Edge { parent, child }
    }
}

impl Display for Edge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({} -> {})", self.parent, self.child)
    }
}

// ------------------------------------------------------------------------------------------

/// Normalizes a vector in place so that it sums to one.
///
/// Returns `true` if the vector was degenerate, i.e. its sum is zero or not finite.
/// A degenerate vector is replaced by the uniform distribution `1 / len`.
///
/// # Example
///
/// ```
/// use bnrs::core::normalize;
/// use ndarray::array;
///
/// let mut msg = array![1., 3.];
/// assert!(!normalize(&mut msg));
/// assert_eq!(msg, array![0.25, 0.75]);
///
/// let mut msg = array![0., 0., 0., 0.];
/// assert!(normalize(&mut msg));
/// assert_eq!(msg, array![0.25, 0.25, 0.25, 0.25]);
/// ```
#[inline]
pub fn normalize(msg: &mut Array1<f64>) -> bool {
    let sum = msg.sum();
    if sum > 0f64 && sum.is_finite() {
        *msg /= sum;
        false
    } else {
        let uniform = 1f64 / msg.len() as f64;
        msg.fill(uniform);
        true
    }
}

/// Squared euclidean distance between two vectors of the same length
#[inline]
pub(crate) fn squared_distance(lhs: &Array1<f64>, rhs: &Array1<f64>) -> f64 {
    (lhs - rhs).mapv(|x| x * x).sum()
}

/// Creates a random message initializer. It takes the length of a message
/// and returns a vector of i.i.d. samples from the uniform distribution over [0, 1).
/// Messages are normalized when they are stored.
///
/// # Arguments
///
/// * `rng` - A generator of random numbers
pub fn random_message_initializer(mut rng: impl Rng) -> impl FnMut(usize) -> Array1<f64> {
    let distr = Uniform::new(0f64, 1f64);
    move |len| Array1::from_shape_fn(len, |_| distr.sample(&mut rng))
}

// ------------------------------------------------------------------------------------------

/// Downstream and upstream messages of every edge of a network
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MessageStore {
    pub(crate) downstream: HashMap<Edge, Array1<f64>>,
    pub(crate) upstream: HashMap<Edge, Array1<f64>>,
}

impl MessageStore {
    /// Creates an empty store with preallocated memory for `edges_number` edges
    #[inline]
    pub fn with_capacity(edges_number: usize) -> Self {
        MessageStore {
            downstream: HashMap::with_capacity(edges_number),
            upstream: HashMap::with_capacity(edges_number),
        }
    }

    /// Returns the parent's belief about itself sent toward the child
    #[inline]
    pub fn downstream(&self, edge: &Edge) -> Option<&Array1<f64>> {
        self.downstream.get(edge)
    }

    /// Returns the evidence collected on the child's side re-expressed over the parent's levels
    #[inline]
    pub fn upstream(&self, edge: &Edge) -> Option<&Array1<f64>> {
        self.upstream.get(edge)
    }

    /// Stores a downstream message after normalizing it.
    /// Returns `true` if the message was degenerate (see [`normalize`])
    #[inline]
    pub fn insert_downstream(&mut self, edge: Edge, mut msg: Array1<f64>) -> bool {
        let degenerate = normalize(&mut msg);
        self.downstream.insert(edge, msg);
        degenerate
    }

    /// Stores an upstream message after normalizing it.
    /// Returns `true` if the message was degenerate (see [`normalize`])
    #[inline]
    pub fn insert_upstream(&mut self, edge: Edge, mut msg: Array1<f64>) -> bool {
        let degenerate = normalize(&mut msg);
        self.upstream.insert(edge, msg);
        degenerate
    }

    /// Checks whether both messages of an edge are present
    #[inline]
    pub fn contains(&self, edge: &Edge) -> bool {
        self.downstream.contains_key(edge) && self.upstream.contains_key(edge)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.downstream.is_empty() && self.upstream.is_empty()
    }

    /// Euclidean distance between two message configurations over the given edges:
    /// the square root of the sum of squared distances of their downstream and
    /// upstream messages. A message present in only one of the stores counts in full
    pub fn discrepancy<'a>(&self, other: &Self, edges: impl IntoIterator<Item = &'a Edge>) -> f64 {
        fn dist(lhs: Option<&Array1<f64>>, rhs: Option<&Array1<f64>>) -> f64 {
            match (lhs, rhs) {
                (Some(lhs), Some(rhs)) => squared_distance(lhs, rhs),
                (Some(msg), None) | (None, Some(msg)) => msg.iter().map(|x| x * x).sum(),
                (None, None) => 0f64,
            }
        }
        edges
            .into_iter()
            .map(|edge| {
                dist(self.downstream(edge), other.downstream(edge))
                    + dist(self.upstream(edge), other.upstream(edge))
            })
            .sum::<f64>()
            .sqrt()
    }
}
