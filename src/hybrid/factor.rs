use std::rc::Rc;
use crate::Key;
use crate::discrete::{DiscreteKey, DecisionTreeFactor};
use crate::gaussian::JacobianFactor;
use super::mixture::GaussianMixtureFactor;

/// Any factor of a hybrid graph. Elimination only needs to know which variables
/// (continuous or discrete) a factor touches, so every variant exposes the same
/// key-set interface, while the as_* methods give access to the concrete factor.
#[derive(Debug, Clone)]
pub enum HybridFactor {

    /// Factor over continuous variables only.
    Gaussian(Rc<JacobianFactor>),

    /// Factor over discrete variables only.
    Discrete(Rc<DecisionTreeFactor>),

    /// Gaussian factor over continuous variables, indexed by discrete variables.
    Mixture(Rc<GaussianMixtureFactor>)

}

impl HybridFactor {

    pub fn continuous_keys(&self) -> Vec<Key> {
        match self {
            HybridFactor::Gaussian(f) => f.keys().to_vec(),
            HybridFactor::Discrete(_) => Vec::new(),
            HybridFactor::Mixture(m) => m.continuous_keys().to_vec()
        }
    }

    pub fn discrete_keys(&self) -> Vec<DiscreteKey> {
        match self {
            HybridFactor::Gaussian(_) => Vec::new(),
            HybridFactor::Discrete(f) => f.keys().to_vec(),
            HybridFactor::Mixture(m) => m.discrete_keys().to_vec()
        }
    }

    /// Continuous keys followed by discrete keys.
    pub fn keys(&self) -> Vec<Key> {
        let mut keys = self.continuous_keys();
        keys.extend(self.discrete_keys().iter().map(|k| k.key ));
        keys
    }

    pub fn is_continuous(&self) -> bool {
        matches!(self, HybridFactor::Gaussian(_))
    }

    pub fn is_discrete(&self) -> bool {
        matches!(self, HybridFactor::Discrete(_))
    }

    pub fn is_hybrid(&self) -> bool {
        matches!(self, HybridFactor::Mixture(_))
    }

    pub fn as_gaussian(&self) -> Option<&Rc<JacobianFactor>> {
        match self {
            HybridFactor::Gaussian(f) => Some(f),
            _ => None
        }
    }

    pub fn as_discrete(&self) -> Option<&Rc<DecisionTreeFactor>> {
        match self {
            HybridFactor::Discrete(f) => Some(f),
            _ => None
        }
    }

    pub fn as_mixture(&self) -> Option<&Rc<GaussianMixtureFactor>> {
        match self {
            HybridFactor::Mixture(m) => Some(m),
            _ => None
        }
    }

}

impl From<JacobianFactor> for HybridFactor {

    fn from(f : JacobianFactor) -> Self {
        HybridFactor::Gaussian(Rc::new(f))
    }

}

impl From<DecisionTreeFactor> for HybridFactor {

    fn from(f : DecisionTreeFactor) -> Self {
        HybridFactor::Discrete(Rc::new(f))
    }

}

impl From<GaussianMixtureFactor> for HybridFactor {

    fn from(m : GaussianMixtureFactor) -> Self {
        HybridFactor::Mixture(Rc::new(m))
    }

}

#[test]
fn discriminants_and_keys() {
    use nalgebra::{DMatrix, DVector};
    let g : HybridFactor = JacobianFactor::unary(1, DMatrix::from_element(1, 1, 1.), DVector::zeros(1), 1.0).unwrap().into();
    let d : HybridFactor = DecisionTreeFactor::from_table(&[DiscreteKey::new(7, 2)], "1 2").unwrap().into();
    assert!(g.is_continuous() && !g.is_discrete() && !g.is_hybrid());
    assert!(d.is_discrete() && d.as_gaussian().is_none());
    assert_eq!(d.keys(), vec![7]);
    assert_eq!(g.keys(), vec![1]);
}
