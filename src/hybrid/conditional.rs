use std::rc::Rc;
use crate::error::Result;
use crate::Key;
use crate::discrete::{DiscreteKey, DiscreteConditional};
use crate::gaussian::GaussianConditional;
use super::mixture::GaussianMixture;
use super::factor::HybridFactor;

/// Result of eliminating one or more frontal variables from a hybrid graph.
#[derive(Debug, Clone)]
pub enum HybridConditional {
    Gaussian(Rc<GaussianConditional>),
    Mixture(Rc<GaussianMixture>),
    Discrete(Rc<DiscreteConditional>)
}

impl HybridConditional {

    pub fn frontals(&self) -> Vec<Key> {
        match self {
            HybridConditional::Gaussian(c) => c.frontals().to_vec(),
            HybridConditional::Mixture(m) => m.frontals().to_vec(),
            HybridConditional::Discrete(d) => d.frontals().iter().map(|k| k.key ).collect()
        }
    }

    pub fn nr_frontals(&self) -> usize {
        match self {
            HybridConditional::Gaussian(c) => c.frontals().len(),
            HybridConditional::Mixture(m) => m.frontals().len(),
            HybridConditional::Discrete(d) => d.frontals().len()
        }
    }

    pub fn continuous_parents(&self) -> Vec<Key> {
        match self {
            HybridConditional::Gaussian(c) => c.parents().to_vec(),
            HybridConditional::Mixture(m) => m.parents().to_vec(),
            HybridConditional::Discrete(_) => Vec::new()
        }
    }

    pub fn discrete_parents(&self) -> Vec<DiscreteKey> {
        match self {
            HybridConditional::Gaussian(_) => Vec::new(),
            HybridConditional::Mixture(m) => m.discrete_keys().to_vec(),
            HybridConditional::Discrete(d) => d.parents().to_vec()
        }
    }

    /// Continuous parents followed by discrete parents.
    pub fn parents(&self) -> Vec<Key> {
        let mut keys = self.continuous_parents();
        keys.extend(self.discrete_parents().iter().map(|k| k.key ));
        keys
    }

    /// Frontals followed by parents.
    pub fn keys(&self) -> Vec<Key> {
        let mut keys = self.frontals();
        keys.extend(self.parents());
        keys
    }

    /// All discrete variables involved, frontal or not.
    pub fn discrete_keys(&self) -> Vec<DiscreteKey> {
        match self {
            HybridConditional::Discrete(d) => d.frontals().iter().chain(d.parents().iter()).cloned().collect(),
            _ => self.discrete_parents()
        }
    }

    pub fn is_continuous(&self) -> bool {
        matches!(self, HybridConditional::Gaussian(_))
    }

    pub fn is_discrete(&self) -> bool {
        matches!(self, HybridConditional::Discrete(_))
    }

    pub fn is_hybrid(&self) -> bool {
        matches!(self, HybridConditional::Mixture(_))
    }

    pub fn as_gaussian(&self) -> Option<&Rc<GaussianConditional>> {
        match self {
            HybridConditional::Gaussian(c) => Some(c),
            _ => None
        }
    }

    pub fn as_mixture(&self) -> Option<&Rc<GaussianMixture>> {
        match self {
            HybridConditional::Mixture(m) => Some(m),
            _ => None
        }
    }

    pub fn as_discrete(&self) -> Option<&Rc<DiscreteConditional>> {
        match self {
            HybridConditional::Discrete(d) => Some(d),
            _ => None
        }
    }

    /// The conditional as a factor over all its keys, used when a clique is
    /// re-eliminated.
    pub fn to_factor(&self) -> Result<HybridFactor> {
        match self {
            HybridConditional::Gaussian(c) => Ok(HybridFactor::Gaussian(Rc::new(c.to_factor()?))),
            HybridConditional::Mixture(m) => Ok(HybridFactor::Mixture(Rc::new(m.to_factor()?))),
            HybridConditional::Discrete(d) => Ok(HybridFactor::Discrete(Rc::new(d.as_factor().clone())))
        }
    }

}

impl From<GaussianConditional> for HybridConditional {

    fn from(c : GaussianConditional) -> Self {
        HybridConditional::Gaussian(Rc::new(c))
    }

}

impl From<GaussianMixture> for HybridConditional {

    fn from(m : GaussianMixture) -> Self {
        HybridConditional::Mixture(Rc::new(m))
    }

}

impl From<DiscreteConditional> for HybridConditional {

    fn from(d : DiscreteConditional) -> Self {
        HybridConditional::Discrete(Rc::new(d))
    }

}
