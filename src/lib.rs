/// Identifier of a random variable, shared by continuous and discrete variables (a key
/// cannot be used as both).
pub type Key = u64;

/// Error type shared by every module of this crate.
pub mod error;

/// Discrete variables: decision trees, potentials (decision-tree factors), and conditionals
/// obtained by sum-product or max-product elimination.
pub mod discrete;

/// Linear-Gaussian factors, their QR elimination into square-root information conditionals,
/// and Gaussian Bayes nets.
pub mod gaussian;

/// Factor graphs mixing discrete and continuous variables. Elimination under a variable ordering
/// yields a hybrid Bayes net (sequential) or a hybrid Bayes tree (multifrontal). The Bayes tree
/// can be pruned to its most probable discrete assignments and updated incrementally as new
/// factors arrive.
///
/// ```
/// use hybrid::discrete::DiscreteKey;
/// use hybrid::gaussian::JacobianFactor;
/// use hybrid::hybrid::{HybridFactorGraph, GaussianMixtureFactor};
/// use nalgebra::{DMatrix, DVector};
///
/// let one = DMatrix::from_element(1, 1, 1.0);
/// let mode = DiscreteKey::new(10, 2);
/// let mut graph = HybridFactorGraph::new();
/// graph.push(JacobianFactor::unary(1, one.clone(), DVector::zeros(1), 1.0).unwrap());
/// let measurements = vec![
///     Some(JacobianFactor::unary(1, one.clone(), DVector::from_element(1, 0.0), 1.0).unwrap()),
///     Some(JacobianFactor::unary(1, one.clone(), DVector::from_element(1, 4.0), 1.0).unwrap())
/// ];
/// graph.push(GaussianMixtureFactor::new(vec![1], &[mode], measurements).unwrap());
/// graph.add_discrete(mode, &[], "1/1").unwrap();
/// let (net, _) = graph.eliminate_sequential(&[1, 10]).unwrap();
/// let sol = net.optimize().unwrap();
/// assert_eq!(sol.discrete[&10], 0);
/// ```
pub mod hybrid;

pub use error::{HybridError, Result};

pub use discrete::{DiscreteKey, Assignment};
