use ndarray::Array1;

use crate::core::{
    bayes_net::{BNError, BNResult},
    cpt::Cpt,
    message::{normalize, Edge, MessageStore, NodeId},
};

/// A discrete variable of a Bayesian network.
///
/// Parents and children are identifiers of other nodes of the same network,
/// the network owns all nodes.
#[derive(Debug, Clone)]
pub struct Node {
    pub(crate) id: NodeId,
    pub(crate) name: String,
    pub(crate) cardinality: usize,
    pub(crate) parents: Vec<NodeId>,
    pub(crate) children: Vec<NodeId>,
    pub(crate) cpt: Option<Cpt>,
    pub(crate) evidence: Option<Array1<f64>>,
    pub(crate) belief: Option<Array1<f64>>,
}

impl Node {
    #[inline]
    pub fn id(&self) -> NodeId {
        self.id
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of levels of the variable
    #[inline]
    pub fn cardinality(&self) -> usize {
        self.cardinality
    }

    /// Parents in the order used by combination keys of the CPT
    #[inline]
    pub fn parents(&self) -> &[NodeId] {
        &self.parents
    }

    #[inline]
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    /// The conditional probability table, `None` for a root without a prior
    #[inline]
    pub fn cpt(&self) -> Option<&Cpt> {
        self.cpt.as_ref()
    }

    /// Observed distribution, if any
    #[inline]
    pub fn evidence(&self) -> Option<&Array1<f64>> {
        self.evidence.as_ref()
    }

    /// The most recently computed marginal, `None` until beliefs are computed
    #[inline]
    pub fn belief(&self) -> Option<&Array1<f64>> {
        self.belief.as_ref()
    }

    /// Returns the position of a parent in the parents' order
    #[inline]
    pub fn which_parent_index(&self, parent: NodeId) -> Option<usize> {
        self.parents.iter().position(|p| *p == parent)
    }

    /// Weights every CPT row by the product of downstream messages received
    /// from the parents, skipping the `excluding` parent. Returns one weighted
    /// row per combination in the CPT's order, not summed. A node without a CPT
    /// returns an empty list.
    pub fn merge_down(
        &self,
        messages: &MessageStore,
        excluding: Option<NodeId>,
    ) -> BNResult<Vec<Array1<f64>>> {
        let cpt = match &self.cpt {
            Some(cpt) => cpt,
            None => return Ok(Vec::new()),
        };
        let incoming = self
            .parents
            .iter()
            .enumerate()
            .filter(|(_, parent)| Some(**parent) != excluding)
            .map(|(pos, parent)| {
                let edge = Edge::new(*parent, self.id);
                messages
                    .downstream(&edge)
                    .map(|msg| (pos, msg))
                    .ok_or(BNError::MissingMessage(edge))
            })
            .collect::<BNResult<Vec<_>>>()?;
        let weighted = cpt
            .table()
            .rows()
            .into_iter()
            .enumerate()
            .map(|(row_index, row)| {
                let weight: f64 = incoming
                    .iter()
                    .map(|(pos, msg)| msg[cpt.level(row_index, *pos)])
                    .product();
                &row * weight
            })
            .collect();
        Ok(weighted)
    }

    /// Multiplies elementwise the upstream messages received from the children,
    /// skipping the `excluding` child. Without children to multiply the result is
    /// a vector of ones. Evidence, when set, is returned as is and children are ignored.
    pub fn merge_up(
        &self,
        messages: &MessageStore,
        excluding: Option<NodeId>,
    ) -> BNResult<Array1<f64>> {
        if let Some(evidence) = &self.evidence {
            return Ok(evidence.clone());
        }
        let mut merged = Array1::<f64>::ones(self.cardinality);
        for child in self.children.iter().filter(|c| Some(**c) != excluding) {
            let edge = Edge::new(self.id, *child);
            let msg = messages
                .upstream(&edge)
                .ok_or(BNError::MissingMessage(edge))?;
            merged *= msg;
        }
        Ok(merged)
    }

    /// Sum of [`Node::merge_down`] over all combinations, or a vector of
    /// ones for a node without a CPT
    pub fn down_marginal(
        &self,
        messages: &MessageStore,
        excluding: Option<NodeId>,
    ) -> BNResult<Array1<f64>> {
        if self.cpt.is_none() {
            return Ok(Array1::ones(self.cardinality));
        }
        let marginal = self
            .merge_down(messages, excluding)?
            .into_iter()
            .fold(Array1::<f64>::zeros(self.cardinality), |acc, row| acc + row);
        Ok(marginal)
    }

    /// Computes and stores the belief of the node from the given messages.
    /// Returns `true` if the unnormalized belief was degenerate and has been
    /// replaced by the uniform distribution
    pub fn compute_belief(&mut self, messages: &MessageStore) -> BNResult<bool> {
        let mut belief = self.merge_up(messages, None)? * self.down_marginal(messages, None)?;
        let degenerate = normalize(&mut belief);
        self.belief = Some(belief);
        Ok(degenerate)
    }
}
