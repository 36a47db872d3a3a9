/// A module containing the belief propagation engine for discrete Bayesian networks
pub mod core;
/// A module containing loaders of networks from tabular data and text specifications, and exporters of computed beliefs
pub mod io;

#[cfg(test)]
mod tests;
