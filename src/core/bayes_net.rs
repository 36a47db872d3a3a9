use std::{collections::HashMap, fmt::Display};

use ndarray::Array1;
use rand::{rngs::StdRng, seq::SliceRandom, Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::core::{
    config::PropagationConfig,
    cpt::CptError,
    message::{random_message_initializer, Edge, MessageStore, NodeId},
    node::Node,
};

// ------------------------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Error)]
/// Reasons an observed distribution is rejected
pub enum EvidenceError {
    #[error("distribution has {found} levels, the node has {expected}")]
    LengthMismatch { expected: usize, found: usize },

    #[error("entry {0} is negative or not finite")]
    InvalidEntry(usize),

    #[error("distribution sums to zero")]
    ZeroSum,
}

#[derive(Debug, Error)]
/// Errors that could appear in Bayesian network's methods
pub enum BNError {
    /// A CPT does not match the node's cardinality or its parents
    #[error("malformed CPT of node '{node}': {source}")]
    MalformedCpt {
        node: String,
        #[source]
        source: CptError,
    },

    /// A node has parents but no CPT covering them
    #[error("node '{0}' has parents but no CPT")]
    MissingCpt(String),

    /// An edge of a structure description is not covered by the child's CPT
    #[error("edge '{parent}' -> '{child}' is not covered by the CPT of '{child}'")]
    UncoveredEdge { parent: String, child: String },

    #[error("invalid evidence for node '{node}': {source}")]
    InvalidEvidence {
        node: String,
        #[source]
        source: EvidenceError,
    },

    #[error("unknown node '{0}'")]
    UnknownNode(String),

    /// Identifier of a node is out of range
    #[error("identifier {1} of a node is out of range of [0..{0}] nodes")]
    OutOfRangeNode(usize, NodeId),

    #[error("node '{0}' is declared twice")]
    DuplicateNode(String),

    #[error("node '{0}' has zero levels")]
    ZeroCardinality(String),

    #[error("number of levels of node '{0}' is not declared")]
    MissingCardinality(String),

    #[error("node '{0}' lists itself as a parent")]
    SelfLoop(String),

    #[error("node '{node}' lists parent '{parent}' more than once")]
    RepeatedParent { node: String, parent: String },

    #[error("edge {0} is not an edge of the network")]
    UnknownEdge(Edge),

    #[error("message on edge {edge} has {found} entries, expected {expected}")]
    MessageLength {
        edge: Edge,
        expected: usize,
        found: usize,
    },

    #[error("message on edge {edge} has a negative or non-finite entry at {position}")]
    InvalidMessage { edge: Edge, position: usize },

    #[error("message on edge {0} is missing")]
    MissingMessage(Edge),

    #[error("messages are not initialized")]
    NotInitialized,

    #[error("parse error at line {line}: {reason}")]
    Parse { line: usize, reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Bayesian network's methods result type
pub type BNResult<T> = Result<T, BNError>;

/// Outcome of a belief propagation run. Non-convergence is a
/// regular outcome reported through `converged`, not an error
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessagePassingInfo {
    /// Whether the discrepancy dropped below the tolerance
    pub converged: bool,

    /// Number of iterations performed
    pub iterations_number: usize,

    /// Discrepancy between the last and the previous iteration's messages,
    /// infinite if no iteration was performed
    pub last_discrepancy: f64,

    /// Discrepancy after each iteration
    pub discrepancy_dynamics: Vec<f64>,

    /// Number of messages and beliefs that summed to zero and were replaced
    /// by the uniform distribution
    pub degenerate_normalizations: usize,
}

impl Display for MessagePassingInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.converged {
            write!(
                f,
                "Belief propagation has converged after {} iterations, last iteration discrepancy: {}",
                self.iterations_number, self.last_discrepancy,
            )
        } else {
            write!(
                f,
                "Belief propagation has not converged after {} iterations, last iteration discrepancy: {}",
                self.iterations_number, self.last_discrepancy,
            )
        }
    }
}

// ------------------------------------------------------------------------------------------

/// A discrete Bayesian network together with the messages of belief propagation.
///
/// The network owns its nodes, nodes refer to each other through [`NodeId`]s.
/// Networks are created by [`crate::core::BayesNetBuilder`].
#[derive(Debug, Clone)]
pub struct BayesNet {
    pub(crate) nodes: Vec<Node>,
    pub(crate) names: HashMap<String, NodeId>,
    pub(crate) edges: Vec<Edge>,
    pub(crate) messages: MessageStore,
}

impl BayesNet {
    /// All nodes, indexed by [`NodeId`]
    #[inline]
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// All edges in the order they were derived from the CPTs
    #[inline]
    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    /// Current messages
    #[inline]
    pub fn messages(&self) -> &MessageStore {
        &self.messages
    }

    #[inline]
    pub fn node(&self, id: NodeId) -> BNResult<&Node> {
        self.nodes
            .get(id.0)
            .ok_or(BNError::OutOfRangeNode(self.nodes.len(), id))
    }

    /// Resolves a node name to its identifier
    #[inline]
    pub fn node_id(&self, name: &str) -> BNResult<NodeId> {
        self.names
            .get(name)
            .copied()
            .ok_or_else(|| BNError::UnknownNode(name.to_owned()))
    }

    #[inline]
    pub fn node_by_name(&self, name: &str) -> BNResult<&Node> {
        self.node(self.node_id(name)?)
    }

    /// Returns the most recently computed belief of a node
    #[inline]
    pub fn belief(&self, name: &str) -> BNResult<Option<&Array1<f64>>> {
        Ok(self.node_by_name(name)?.belief())
    }

    /// Checks whether every edge carries both messages
    #[inline]
    pub fn is_initialized(&self) -> bool {
        self.edges.iter().all(|edge| self.messages.contains(edge))
    }

    /// Assigns random normalized downstream and upstream messages to every edge
    ///
    /// # Arguments
    ///
    /// * `rng` - A generator of random numbers
    pub fn initialize(&mut self, rng: impl Rng) {
        let mut initializer = random_message_initializer(rng);
        let mut messages = MessageStore::with_capacity(self.edges.len());
        for edge in &self.edges {
            let len = self.nodes[edge.parent.0].cardinality;
            messages.insert_downstream(*edge, initializer(len));
            messages.insert_upstream(*edge, initializer(len));
        }
        self.messages = messages;
    }

    /// Assigns messages produced by an initializer to every edge. The initializer
    /// takes the length of a message (the parent's cardinality), messages are normalized
    /// before they are stored
    ///
    /// # Example
    ///
    /// ```
    /// use bnrs::core::BayesNetBuilder;
    /// use ndarray::Array1;
    ///
    /// let mut bnb = BayesNetBuilder::new();
    /// bnb.add_node("rain", 2).unwrap();
    /// bnb.add_node("wet", 2).unwrap();
    /// bnb.add_cpt("wet", &["rain"], vec![
    ///     (vec![0], vec![0.9, 0.1]),
    ///     (vec![1], vec![0.2, 0.8]),
    /// ]).unwrap();
    /// let mut net = bnb.build();
    /// net.initialize_with(&mut |len| Array1::ones(len)).unwrap();
    /// assert!(net.is_initialized());
    /// ```
    pub fn initialize_with(
        &mut self,
        initializer: &mut impl FnMut(usize) -> Array1<f64>,
    ) -> BNResult<()> {
        let mut messages = MessageStore::with_capacity(self.edges.len());
        for edge in &self.edges {
            let len = self.nodes[edge.parent.0].cardinality;
            let downstream = checked_message(*edge, len, initializer(len))?;
            let upstream = checked_message(*edge, len, initializer(len))?;
            messages.insert_downstream(*edge, downstream);
            messages.insert_upstream(*edge, upstream);
        }
        self.messages = messages;
        Ok(())
    }

    /// Replaces the downstream message of an edge. Entries must be finite and
    /// non-negative, the message is normalized
    pub fn set_downstream_message(&mut self, edge: Edge, msg: Array1<f64>) -> BNResult<()> {
        let len = self.edge_message_len(&edge)?;
        let msg = checked_message(edge, len, msg)?;
        self.messages.insert_downstream(edge, msg);
        Ok(())
    }

    /// Replaces the upstream message of an edge. Entries must be finite and
    /// non-negative, the message is normalized
    pub fn set_upstream_message(&mut self, edge: Edge, msg: Array1<f64>) -> BNResult<()> {
        let len = self.edge_message_len(&edge)?;
        let msg = checked_message(edge, len, msg)?;
        self.messages.insert_upstream(edge, msg);
        Ok(())
    }

    /// Runs synchronous belief propagation. Every iteration computes a complete new set
    /// of downstream and upstream messages from the previous iteration's messages only.
    /// When the discrepancy between two subsequent configurations drops below `tolerance`
    /// beliefs of all nodes are computed. Otherwise beliefs are left untouched and
    /// the returned info reports non-convergence.
    ///
    /// # Arguments
    ///
    /// * `max_iterations` - A maximal number of iterations
    /// * `tolerance` - A threshold specifying the convergence criterion
    ///
    /// # Example
    ///
    /// ```
    /// use bnrs::core::BayesNetBuilder;
    /// use rand::thread_rng;
    ///
    /// let mut bnb = BayesNetBuilder::new();
    /// bnb.add_node("rain", 2).unwrap();
    /// bnb.add_node("wet", 2).unwrap();
    /// bnb.add_prior("rain", vec![0.2, 0.8]).unwrap();
    /// bnb.add_cpt("wet", &["rain"], vec![
    ///     (vec![0], vec![0.9, 0.1]),
    ///     (vec![1], vec![0.2, 0.8]),
    /// ]).unwrap();
    /// let mut net = bnb.build();
    /// net.initialize(thread_rng());
    /// let info = net.propagate(100, 1e-10).unwrap();
    /// assert!(info.converged);
    ///
    /// let wet = net.belief("wet").unwrap().unwrap();
    /// assert!((wet[0] - (0.2 * 0.9 + 0.8 * 0.2)).abs() < 1e-8);
    /// ```
    #[inline]
    pub fn propagate(
        &mut self,
        max_iterations: usize,
        tolerance: f64,
    ) -> BNResult<MessagePassingInfo> {
        self.propagate_with_order(max_iterations, tolerance, |_| {})
    }

    /// Same as [`BayesNet::propagate`], `order` rearranges the edges before each
    /// iteration. Since an iteration reads only the previous messages, the
    /// visitation order does not change the result
    pub fn propagate_with_order(
        &mut self,
        max_iterations: usize,
        tolerance: f64,
        mut order: impl FnMut(&mut [Edge]),
    ) -> BNResult<MessagePassingInfo> {
        if !self.is_initialized() {
            return Err(BNError::NotInitialized);
        }
        let mut edges = self.edges.clone();
        let mut discrepancy_dynamics = Vec::with_capacity(max_iterations);
        let mut last_discrepancy = f64::INFINITY;
        let mut degenerate_normalizations = 0;
        for i in 0..max_iterations {
            order(&mut edges);
            let mut new_messages = MessageStore::with_capacity(edges.len());
            for edge in &edges {
                let msg = self.upstream_update(edge)?;
                degenerate_normalizations += new_messages.insert_upstream(*edge, msg) as usize;
            }
            for edge in &edges {
                let msg = self.downstream_update(edge)?;
                degenerate_normalizations += new_messages.insert_downstream(*edge, msg) as usize;
            }
            last_discrepancy = new_messages.discrepancy(&self.messages, &self.edges);
            discrepancy_dynamics.push(last_discrepancy);
            self.messages = new_messages;
            debug!(iteration = i, discrepancy = last_discrepancy, "belief propagation step");
            if last_discrepancy < tolerance {
                degenerate_normalizations += self.compute_beliefs()?;
                info!(
                    iterations = i + 1,
                    discrepancy = last_discrepancy,
                    "belief propagation converged, beliefs computed"
                );
                return Ok(MessagePassingInfo {
                    converged: true,
                    iterations_number: i + 1,
                    last_discrepancy,
                    discrepancy_dynamics,
                    degenerate_normalizations,
                });
            }
        }
        warn!(
            iterations = max_iterations,
            tolerance,
            discrepancy = last_discrepancy,
            "belief propagation did not converge, beliefs not computed"
        );
        Ok(MessagePassingInfo {
            converged: false,
            iterations_number: max_iterations,
            last_discrepancy,
            discrepancy_dynamics,
            degenerate_normalizations,
        })
    }

    /// Initializes messages at random and runs belief propagation
    /// with the given hyper-parameters
    ///
    /// # Example
    ///
    /// ```
    /// use bnrs::core::{BayesNetBuilder, PropagationConfig};
    ///
    /// let mut bnb = BayesNetBuilder::new();
    /// bnb.add_node("rain", 2).unwrap();
    /// bnb.add_node("wet", 2).unwrap();
    /// bnb.add_prior("rain", vec![0.2, 0.8]).unwrap();
    /// bnb.add_cpt("wet", &["rain"], vec![
    ///     (vec![0], vec![0.9, 0.1]),
    ///     (vec![1], vec![0.2, 0.8]),
    /// ]).unwrap();
    /// let mut net = bnb.build();
    /// let config = PropagationConfig {
    ///     tolerance: 1e-10,
    ///     shuffle_edges: true,
    ///     seed: Some(42),
    ///     ..PropagationConfig::default()
    /// };
    /// assert!(net.run(&config).unwrap().converged);
    /// ```
    pub fn run(&mut self, config: &PropagationConfig) -> BNResult<MessagePassingInfo> {
        let mut rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        self.initialize(&mut rng);
        if config.shuffle_edges {
            self.propagate_with_order(config.max_iterations, config.tolerance, |edges| {
                edges.shuffle(&mut rng)
            })
        } else {
            self.propagate(config.max_iterations, config.tolerance)
        }
    }

    /// Computes beliefs of all nodes from the current messages. Returns the
    /// number of beliefs that were degenerate and replaced by the uniform distribution
    pub fn compute_beliefs(&mut self) -> BNResult<usize> {
        if !self.is_initialized() {
            return Err(BNError::NotInitialized);
        }
        let mut degenerate = 0;
        for node in &mut self.nodes {
            if node.compute_belief(&self.messages)? {
                debug!(node = node.name.as_str(), "degenerate belief replaced by uniform");
                degenerate += 1;
            }
        }
        Ok(degenerate)
    }

    /// Sets an observed distribution of a node. The distribution is normalized.
    /// Messages and beliefs are not updated until propagation runs again
    ///
    /// # Arguments
    ///
    /// * `name` - A name of the observed node
    /// * `distribution` - Non-negative weights of the node's levels with a positive sum
    ///
    /// # Example
    ///
    /// ```
    /// use bnrs::core::BayesNetBuilder;
    ///
    /// let mut bnb = BayesNetBuilder::new();
    /// bnb.add_node("rain", 2).unwrap();
    /// let mut net = bnb.build();
    /// net.set_evidence("rain", &[3., 1.]).unwrap();
    /// let evidence = net.node_by_name("rain").unwrap().evidence().unwrap();
    /// assert_eq!(evidence[0], 0.75);
    /// assert!(net.set_evidence("rain", &[0., 0.]).is_err());
    /// ```
    pub fn set_evidence(&mut self, name: &str, distribution: &[f64]) -> BNResult<()> {
        let id = self.node_id(name)?;
        let node = &mut self.nodes[id.0];
        let evidence = checked_evidence(node, distribution)?;
        debug!(node = name, ?evidence, "evidence set");
        node.evidence = Some(evidence);
        Ok(())
    }

    /// Sets several observed distributions at once. Nothing is changed
    /// if any of them is invalid
    pub fn add_evidence<'a>(
        &mut self,
        evidence: impl IntoIterator<Item = (&'a str, &'a [f64])>,
    ) -> BNResult<()> {
        let checked = evidence
            .into_iter()
            .map(|(name, distribution)| {
                let id = self.node_id(name)?;
                Ok((id, checked_evidence(&self.nodes[id.0], distribution)?))
            })
            .collect::<BNResult<Vec<_>>>()?;
        for (id, evidence) in checked {
            debug!(node = self.nodes[id.0].name.as_str(), ?evidence, "evidence set");
            self.nodes[id.0].evidence = Some(evidence);
        }
        Ok(())
    }

    /// Removes an observed distribution of a node, does nothing if there is none
    pub fn clear_evidence(&mut self, name: &str) -> BNResult<()> {
        let id = self.node_id(name)?;
        if self.nodes[id.0].evidence.take().is_some() {
            debug!(node = name, "evidence cleared");
        }
        Ok(())
    }

    pub fn clear_all_evidence(&mut self) {
        for node in &mut self.nodes {
            node.evidence = None;
        }
    }
}

// private methods --------------------------------------------------------------------------

impl BayesNet {
    fn edge_message_len(&self, edge: &Edge) -> BNResult<usize> {
        if !self.edges.contains(edge) {
            return Err(BNError::UnknownEdge(*edge));
        }
        Ok(self.node(edge.parent)?.cardinality)
    }

    /// New upstream message of an edge: the child's side evidence projected
    /// through the child's CPT onto the parent's levels, unnormalized
    fn upstream_update(&self, edge: &Edge) -> BNResult<Array1<f64>> {
        let parent = &self.nodes[edge.parent.0];
        let child = &self.nodes[edge.child.0];
        let child_up = child.merge_up(&self.messages, Some(edge.parent))?;
        let weighted = child.merge_down(&self.messages, Some(edge.parent))?;
        let (cpt, position) = match (child.cpt(), child.which_parent_index(edge.parent)) {
            (Some(cpt), Some(position)) => (cpt, position),
            _ => return Err(BNError::MissingCpt(child.name.clone())),
        };
        let mut msg = Array1::<f64>::zeros(parent.cardinality);
        for (row_index, row) in weighted.iter().enumerate() {
            msg[cpt.level(row_index, position)] += row.dot(&child_up);
        }
        Ok(msg)
    }

    /// New downstream message of an edge: the parent's belief excluding
    /// what the child has sent, unnormalized
    fn downstream_update(&self, edge: &Edge) -> BNResult<Array1<f64>> {
        let parent = &self.nodes[edge.parent.0];
        let self_up = parent.merge_up(&self.messages, Some(edge.child))?;
        let down = parent.down_marginal(&self.messages, None)?;
        Ok(self_up * down)
    }
}

#[inline]
fn checked_message(edge: Edge, expected: usize, msg: Array1<f64>) -> BNResult<Array1<f64>> {
    if msg.len() != expected {
        return Err(BNError::MessageLength {
            edge,
            expected,
            found: msg.len(),
        });
    }
    if let Some(position) = msg.iter().position(|x| !x.is_finite() || *x < 0f64) {
        return Err(BNError::InvalidMessage { edge, position });
    }
    Ok(msg)
}

fn checked_evidence(node: &Node, distribution: &[f64]) -> BNResult<Array1<f64>> {
    let invalid = |source| BNError::InvalidEvidence {
        node: node.name.clone(),
        source,
    };
    if distribution.len() != node.cardinality {
        return Err(invalid(EvidenceError::LengthMismatch {
            expected: node.cardinality,
            found: distribution.len(),
        }));
    }
    if let Some(pos) = distribution.iter().position(|x| !x.is_finite() || *x < 0f64) {
        return Err(invalid(EvidenceError::InvalidEntry(pos)));
    }
    let mut evidence = Array1::from_vec(distribution.to_vec());
    let max = evidence.fold(0f64, |acc, x| acc.max(*x));
    if max <= 0f64 {
        return Err(invalid(EvidenceError::ZeroSum));
    }
    // entries are finite, but their sum may overflow
    if !evidence.sum().is_finite() {
        evidence /= max;
    }
    let sum = evidence.sum();
    Ok(evidence / sum)
}
