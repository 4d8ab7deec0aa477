use std::collections::BTreeSet;
use std::ops::Index;
use std::rc::Rc;
use crate::error::{HybridError, Result};
use crate::Key;
use crate::discrete::{DiscreteKey, DiscreteConditional};
use crate::discrete::conditional::{DiscreteEliminator, EliminationKind};
use super::factor::HybridFactor;
use super::etree::EliminationTree;
use super::bayes_net::HybridBayesNet;
use super::bayes_tree::HybridBayesTree;

/// Collection of hybrid factors, whose product is the (unnormalized) joint density
/// over all continuous and discrete variables they touch.
#[derive(Debug, Clone, Default)]
pub struct HybridFactorGraph {
    factors : Vec<HybridFactor>
}

impl HybridFactorGraph {

    pub fn new() -> Self {
        Self::default()
    }

    pub fn push<F>(&mut self, factor : F)
    where
        F : Into<HybridFactor>
    {
        self.factors.push(factor.into());
    }

    /// Appends the discrete factor P(key | parents) given by a signature such as "1/2 3/2".
    pub fn add_discrete(&mut self, key : DiscreteKey, parents : &[DiscreteKey], signature : &str) -> Result<()> {
        let cond = DiscreteConditional::from_signature(key, parents, signature)?;
        self.factors.push(HybridFactor::Discrete(Rc::new(cond.as_factor().clone())));
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.factors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factors.is_empty()
    }

    pub fn at(&self, ix : usize) -> Result<&HybridFactor> {
        self.factors.get(ix).ok_or(HybridError::OutOfBounds { index : ix, len : self.factors.len() })
    }

    pub fn iter(&self) -> impl Iterator<Item=&HybridFactor> {
        self.factors.iter()
    }

    /// Keeps only the first len factors.
    pub fn truncate(&mut self, len : usize) {
        self.factors.truncate(len);
    }

    /// Graph with the factors at the informed positions, in the informed order.
    pub fn select(&self, ixs : &[usize]) -> Result<HybridFactorGraph> {
        let mut out = HybridFactorGraph::new();
        for ix in ixs.iter() {
            out.push(self.at(*ix)?.clone());
        }
        Ok(out)
    }

    /// All variables, ascending.
    pub fn keys(&self) -> Vec<Key> {
        let keys : BTreeSet<Key> = self.factors.iter().flat_map(|f| f.keys() ).collect();
        keys.into_iter().collect()
    }

    pub fn continuous_keys(&self) -> Vec<Key> {
        let keys : BTreeSet<Key> = self.factors.iter().flat_map(|f| f.continuous_keys() ).collect();
        keys.into_iter().collect()
    }

    pub fn discrete_keys(&self) -> Vec<DiscreteKey> {
        let keys : BTreeSet<DiscreteKey> = self.factors.iter().flat_map(|f| f.discrete_keys() ).collect();
        keys.into_iter().collect()
    }

    fn check_complete(&self, ordering : &[Key]) -> Result<()> {
        match self.keys().into_iter().find(|k| !ordering.contains(k) ) {
            Some(k) => Err(HybridError::IncompleteOrdering(k)),
            None => Ok(())
        }
    }

    /// Eliminates all variables one at a time with max-product discrete elimination.
    /// The ordering must cover every variable of the graph, so the returned graph is empty.
    pub fn eliminate_sequential(&self, ordering : &[Key]) -> Result<(HybridBayesNet, HybridFactorGraph)> {
        self.check_complete(ordering)?;
        self.eliminate_partial_sequential(ordering)
    }

    /// Eliminates the variables in the ordering one at a time, returning the Bayes net on them
    /// and the factors left on the remaining variables.
    pub fn eliminate_partial_sequential(&self, ordering : &[Key]) -> Result<(HybridBayesNet, HybridFactorGraph)> {
        self.eliminate_partial_sequential_with(ordering, EliminationKind::default().eliminator())
    }

    pub fn eliminate_partial_sequential_with(
        &self,
        ordering : &[Key],
        eliminator : &dyn DiscreteEliminator
    ) -> Result<(HybridBayesNet, HybridFactorGraph)> {
        EliminationTree::new(self, ordering)?.eliminate_sequential(eliminator)
    }

    /// Eliminates all variables into a Bayes tree with max-product discrete elimination. The
    /// ordering must cover every variable of the graph, so the returned graph is empty.
    pub fn eliminate_multifrontal(&self, ordering : &[Key]) -> Result<(HybridBayesTree, HybridFactorGraph)> {
        self.check_complete(ordering)?;
        self.eliminate_partial_multifrontal(ordering)
    }

    /// Eliminates the variables in the ordering into a Bayes tree, returning the factors left
    /// on the remaining variables.
    pub fn eliminate_partial_multifrontal(&self, ordering : &[Key]) -> Result<(HybridBayesTree, HybridFactorGraph)> {
        self.eliminate_partial_multifrontal_with(ordering, EliminationKind::default().eliminator())
    }

    pub fn eliminate_partial_multifrontal_with(
        &self,
        ordering : &[Key],
        eliminator : &dyn DiscreteEliminator
    ) -> Result<(HybridBayesTree, HybridFactorGraph)> {
        let etree = EliminationTree::new(self, ordering)?;
        let mut tree = HybridBayesTree::new();
        let remaining = etree.eliminate_multifrontal(&mut tree, eliminator)?;
        Ok((tree, remaining))
    }

}

impl Index<usize> for HybridFactorGraph {

    type Output = HybridFactor;

    fn index(&self, ix : usize) -> &HybridFactor {
        &self.factors[ix]
    }

}

impl std::iter::FromIterator<HybridFactor> for HybridFactorGraph {

    fn from_iter<I : IntoIterator<Item=HybridFactor>>(iter : I) -> Self {
        Self { factors : iter.into_iter().collect() }
    }

}

#[cfg(test)]
mod tests {

    use super::*;
    use nalgebra::{DMatrix, DVector};
    use crate::gaussian::JacobianFactor;

    #[test]
    fn full_elimination_needs_all_keys() {
        let mut g = HybridFactorGraph::new();
        g.push(JacobianFactor::unary(1, DMatrix::from_element(1, 1, 1.), DVector::zeros(1), 1.0).unwrap());
        g.add_discrete(DiscreteKey::new(5, 2), &[], "1/1").unwrap();
        assert!(matches!(g.eliminate_sequential(&[1]), Err(HybridError::IncompleteOrdering(5))));
        let (net, rest) = g.eliminate_partial_sequential(&[1]).unwrap();
        assert_eq!(net.len(), 1);
        assert_eq!(rest.len(), 1);
        assert!(rest[0].is_discrete());
        assert!(matches!(g.at(3), Err(HybridError::OutOfBounds { index : 3, len : 2 })));
        g.truncate(1);
        assert_eq!(g.keys(), vec![1]);
    }

}
