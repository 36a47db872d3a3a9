use std::collections::HashMap;

use ndarray::Array2;

use crate::core::{
    bayes_net::{BNError, BNResult, BayesNet},
    cpt::Cpt,
    message::{Edge, MessageStore, NodeId},
    node::Node,
};

// ------------------------------------------------------------------------------------------

#[derive(Debug)]
struct PendingNode {
    name: String,
    cardinality: usize,
    parents: Vec<NodeId>,
    cpt: Option<Cpt>,
}

// public methods ---------------------------------------------------------------------------

/// A Bayesian network builder.
///
/// Nodes are declared first, then CPTs are attached to them. Edges of the
/// network are derived from the parents listed by the CPTs.
#[derive(Debug, Default)]
pub struct BayesNetBuilder {
    nodes: Vec<PendingNode>,
    names: HashMap<String, NodeId>,
}

impl BayesNetBuilder {
    /// Creates an empty builder
    #[inline]
    pub fn new() -> Self {
        BayesNetBuilder::default()
    }

    /// Declares a node
    ///
    /// # Arguments
    ///
    /// * `name` - A unique name of the node
    /// * `cardinality` - A number of levels of the node, must be positive
    ///
    /// # Example
    ///
    /// ```
    /// use bnrs::core::BayesNetBuilder;
    ///
    /// let mut bnb = BayesNetBuilder::new();
    /// let id = bnb.add_node("rain", 2).unwrap();
    /// assert_eq!(id.0, 0);
    /// assert!(bnb.add_node("rain", 3).is_err());
    /// ```
    pub fn add_node(&mut self, name: impl Into<String>, cardinality: usize) -> BNResult<NodeId> {
        let name = name.into();
        if self.names.contains_key(&name) {
            return Err(BNError::DuplicateNode(name));
        }
        if cardinality == 0 {
            return Err(BNError::ZeroCardinality(name));
        }
        let id = NodeId(self.nodes.len());
        self.names.insert(name.clone(), id);
        self.nodes.push(PendingNode {
            name,
            cardinality,
            parents: Vec::new(),
            cpt: None,
        });
        Ok(id)
    }

    /// Checks whether a node is declared
    #[inline]
    pub fn contains(&self, name: &str) -> bool {
        self.names.contains_key(name)
    }

    /// Attaches a CPT given as (combination, row) pairs to a node. A combination
    /// lists one level per parent in the order of `parents`. A repeated call
    /// replaces the previous CPT
    ///
    /// # Arguments
    ///
    /// * `child` - A name of the node the CPT belongs to
    /// * `parents` - Names of the parents, their order defines the order of combination keys
    /// * `entries` - (combination, row) pairs, one for every combination of parents' levels
    ///
    /// # Example
    ///
    /// ```
    /// use bnrs::core::BayesNetBuilder;
    ///
    /// let mut bnb = BayesNetBuilder::new();
    /// bnb.add_node("rain", 2).unwrap();
    /// bnb.add_node("wet", 2).unwrap();
    /// bnb.add_cpt("wet", &["rain"], vec![
    ///     (vec![0], vec![0.9, 0.1]),
    ///     (vec![1], vec![0.2, 0.8]),
    /// ]).unwrap();
    /// let net = bnb.build();
    /// assert_eq!(net.edges().len(), 1);
    /// ```
    pub fn add_cpt(
        &mut self,
        child: &str,
        parents: &[&str],
        entries: impl IntoIterator<Item = (Vec<usize>, Vec<f64>)>,
    ) -> BNResult<()> {
        let (child_id, parent_ids, parent_cardinalities) = self.resolve_family(child, parents)?;
        let cardinality = self.nodes[child_id.0].cardinality;
        let cpt = Cpt::from_entries(cardinality, parent_cardinalities, entries).map_err(
            |source| BNError::MalformedCpt {
                node: child.to_owned(),
                source,
            },
        )?;
        self.attach(child_id, parent_ids, cpt);
        Ok(())
    }

    /// Attaches a CPT given as a dense table (see [`Cpt::new`]) to a node
    pub fn add_cpt_table(
        &mut self,
        child: &str,
        parents: &[&str],
        table: Array2<f64>,
    ) -> BNResult<()> {
        let (child_id, parent_ids, parent_cardinalities) = self.resolve_family(child, parents)?;
        let cardinality = self.nodes[child_id.0].cardinality;
        let cpt = Cpt::new(cardinality, parent_cardinalities, table).map_err(|source| {
            BNError::MalformedCpt {
                node: child.to_owned(),
                source,
            }
        })?;
        self.attach(child_id, parent_ids, cpt);
        Ok(())
    }

    /// Attaches a prior distribution to a node without parents
    #[inline]
    pub fn add_prior(&mut self, node: &str, probabilities: Vec<f64>) -> BNResult<()> {
        self.add_cpt(node, &[], [(Vec::new(), probabilities)])
    }

    /// Returns a Bayesian network. Edges are ordered by child declaration
    /// and then by the child's parents' order
    pub fn build(self) -> BayesNet {
        let mut edges = Vec::new();
        for (index, node) in self.nodes.iter().enumerate() {
            for parent in &node.parents {
                edges.push(Edge::new(*parent, NodeId(index)));
            }
        }
        let mut children = vec![Vec::new(); self.nodes.len()];
        for edge in &edges {
            children[edge.parent.0].push(edge.child);
        }
        let nodes = self
            .nodes
            .into_iter()
            .zip(children)
            .enumerate()
            .map(|(index, (pending, children))| Node {
                id: NodeId(index),
                name: pending.name,
                cardinality: pending.cardinality,
                parents: pending.parents,
                children,
                cpt: pending.cpt,
                evidence: None,
                belief: None,
            })
            .collect();
        BayesNet {
            nodes,
            names: self.names,
            messages: MessageStore::with_capacity(edges.len()),
            edges,
        }
    }
}

// private methods --------------------------------------------------------------------------

impl BayesNetBuilder {
    fn id(&self, name: &str) -> BNResult<NodeId> {
        self.names
            .get(name)
            .copied()
            .ok_or_else(|| BNError::UnknownNode(name.to_owned()))
    }

    fn resolve_family(
        &self,
        child: &str,
        parents: &[&str],
    ) -> BNResult<(NodeId, Vec<NodeId>, Vec<usize>)> {
        let child_id = self.id(child)?;
        let mut parent_ids: Vec<NodeId> = Vec::with_capacity(parents.len());
        for parent in parents {
            let parent_id = self.id(parent)?;
            if parent_id == child_id {
                return Err(BNError::SelfLoop(child.to_owned()));
            }
            if parent_ids.contains(&parent_id) {
                return Err(BNError::RepeatedParent {
                    node: child.to_owned(),
                    parent: (*parent).to_owned(),
                });
            }
            parent_ids.push(parent_id);
        }
        let parent_cardinalities = parent_ids
            .iter()
            .map(|id| self.nodes[id.0].cardinality)
            .collect();
        Ok((child_id, parent_ids, parent_cardinalities))
    }

    #[inline]
    fn attach(&mut self, child: NodeId, parents: Vec<NodeId>, cpt: Cpt) {
        let node = &mut self.nodes[child.0];
        node.parents = parents;
        node.cpt = Some(cpt);
    }
}
