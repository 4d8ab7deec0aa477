use crate::discrete::Assignment;
use crate::gaussian::VectorValues;

/// Gaussian factors and conditionals indexed by discrete assignments (decision trees with
/// possibly null Gaussian leaves).
pub mod mixture;

/// Tagged union over Gaussian, discrete and mixture factors, with a uniform key-set interface.
pub mod factor;

/// Tagged union over Gaussian, discrete and mixture conditionals.
pub mod conditional;

/// Elimination of a single group of frontal variables from the factors touching them.
pub mod eliminate;

/// Symbolic elimination structure (elimination tree and junction-tree clusters) driving
/// sequential and multifrontal elimination.
pub mod etree;

pub mod graph;

pub mod bayes_net;

/// Clique tree of hybrid conditionals, supporting removal of the top of the tree
/// for incremental updates, and pruning.
pub mod bayes_tree;

/// Incremental inference over a Bayes tree (ISAM).
pub mod isam;

pub use mixture::{GaussianMixture, GaussianMixtureFactor};

pub use factor::HybridFactor;

pub use conditional::HybridConditional;

pub use graph::HybridFactorGraph;

pub use bayes_net::HybridBayesNet;

pub use bayes_tree::{HybridBayesTree, CliqueId};

pub use isam::{HybridIsam, IsamParams};

/// Joint values of discrete and continuous variables.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HybridValues {
    pub discrete : Assignment,
    pub continuous : VectorValues
}
