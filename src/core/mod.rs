mod bayes_net;
mod bayes_net_builder;
mod config;
mod cpt;
mod message;
mod node;

pub use bayes_net::{BNError, BNResult, BayesNet, EvidenceError, MessagePassingInfo};
pub use bayes_net_builder::BayesNetBuilder;
pub use config::PropagationConfig;
pub use cpt::{Cpt, CptError};
pub use message::{normalize, random_message_initializer, Edge, MessageStore, NodeId};
pub use node::Node;

pub(crate) use cpt::combination_index;
