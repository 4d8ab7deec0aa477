use std::collections::BTreeSet;
use std::fs::File;
use std::io::Read;
use std::ops::Index;
use std::path::Path;
use anyhow::Context;
use serde::{Serialize, Deserialize};
use tracing::{debug, warn};
use crate::error::Result;
use crate::Key;
use crate::discrete::conditional::EliminationKind;
use super::factor::HybridFactor;
use super::conditional::HybridConditional;
use super::etree::EliminationTree;
use super::bayes_tree::HybridBayesTree;
use super::graph::HybridFactorGraph;
use super::HybridValues;

/// Settings of the incremental engine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IsamParams {

    /// Strategy used to eliminate discrete variables.
    pub elimination : EliminationKind,

    /// When set, each update ends by pruning every root clique holding a discrete
    /// conditional to this many leaves.
    pub max_nr_leaves : Option<usize>

}

impl IsamParams {

    pub fn from_json(content : &str) -> Result<Self> {
        Ok(serde_json::from_str(content)?)
    }

    pub fn load_from_path<P>(path : P) -> anyhow::Result<Self>
    where
        P : AsRef<Path>
    {
        let path = path.as_ref();
        let f = File::open(path).with_context(|| format!("Could not open {}", path.display()) )?;
        Self::load(f).with_context(|| format!("Invalid parameters at {}", path.display()) )
    }

    pub fn load<R>(mut reader : R) -> Result<Self>
    where
        R : Read
    {
        let mut content = String::new();
        reader.read_to_string(&mut content)?;
        Self::from_json(&content[..])
    }

}

/// Incremental inference over a hybrid Bayes tree. Each update removes the cliques touched by
/// the new factors (and their paths to the root), re-eliminates them together with the new
/// factors, and re-attaches the untouched sub-trees, which are never re-eliminated.
#[derive(Debug, Clone, Default)]
pub struct HybridIsam {
    tree : HybridBayesTree,
    params : IsamParams
}

impl HybridIsam {

    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_params(params : IsamParams) -> Self {
        Self { tree : HybridBayesTree::new(), params }
    }

    pub fn params(&self) -> &IsamParams {
        &self.params
    }

    pub fn tree(&self) -> &HybridBayesTree {
        &self.tree
    }

    /// Number of cliques.
    pub fn len(&self) -> usize {
        self.tree.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }

    pub fn clique(&self, key : Key) -> Result<&HybridConditional> {
        self.tree.clique(key)
    }

    /// Incorporates new factors. Variables are re-eliminated in the order: continuous variables
    /// already in the tree, then new continuous variables, then discrete variables, each group
    /// by ascending key. On error, the tree is left as it was before the call.
    pub fn update(&mut self, new_factors : &HybridFactorGraph) -> Result<()> {
        let mut tree = self.tree.clone();
        let seen : BTreeSet<Key> = tree.keys().into_iter().collect();
        let (removed, orphans) = tree.remove_top(&new_factors.keys());
        let mut pool : Vec<HybridFactor> = Vec::with_capacity(removed.len() + new_factors.len());
        for cond in removed.iter() {
            pool.push(cond.to_factor()?);
        }
        pool.extend(new_factors.iter().cloned());

        let continuous : BTreeSet<Key> = pool.iter().flat_map(|f| f.continuous_keys() ).collect();
        let discrete : BTreeSet<Key> = pool.iter().flat_map(|f| f.discrete_keys().into_iter().map(|k| k.key ) ).collect();
        let (old, new) : (Vec<Key>, Vec<Key>) = continuous.iter().cloned().partition(|k| seen.contains(k) );
        let ordering : Vec<Key> = old.into_iter().chain(new.into_iter()).chain(discrete.into_iter()).collect();
        debug!(
            "Update with {} factors: {} cliques removed, {} orphans, {} variables to eliminate",
            new_factors.len(),
            removed.len(),
            orphans.len(),
            ordering.len()
        );

        let etree = EliminationTree::with_orphans(pool, &ordering, orphans)?;
        let remaining = etree.eliminate_multifrontal(&mut tree, self.params.elimination.eliminator())?;
        if !remaining.is_empty() {
            warn!("{} factors left over after incremental elimination", remaining.len());
        }

        if let Some(max) = self.params.max_nr_leaves {
            let roots = tree.roots().to_vec();
            for r in roots {
                let key = match tree.conditional(r) {
                    Some(HybridConditional::Discrete(d)) => d.frontals().first().map(|k| k.key ),
                    _ => None
                };
                if let Some(key) = key {
                    tree = tree.prune(key, max)?;
                }
            }
        }
        self.tree = tree;
        Ok(())
    }

    /// Prunes the discrete conditional of the clique holding key to its max_nr_leaves most
    /// probable entries, nulling the corresponding mixture components in the whole tree.
    pub fn prune(&mut self, key : Key, max_nr_leaves : usize) -> Result<()> {
        self.tree = self.tree.prune(key, max_nr_leaves)?;
        Ok(())
    }

    pub fn optimize(&self) -> Result<HybridValues> {
        self.tree.optimize()
    }

}

impl Index<Key> for HybridIsam {

    type Output = HybridConditional;

    fn index(&self, key : Key) -> &HybridConditional {
        &self.tree[key]
    }

}

#[cfg(test)]
mod tests {

    use super::*;
    use crate::error::HybridError;

    #[test]
    fn params_from_json() {
        let p = IsamParams::from_json(r#"{ "elimination" : "SumProduct", "max_nr_leaves" : 5 }"#).unwrap();
        assert_eq!(p.elimination, EliminationKind::SumProduct);
        assert_eq!(p.max_nr_leaves, Some(5));
        let d = IsamParams::from_json("{}").unwrap();
        assert_eq!(d, IsamParams::default());
        assert_eq!(d.elimination, EliminationKind::MaxProduct);
        assert!(matches!(IsamParams::from_json("{ \"elimination\" : 1 }"), Err(HybridError::Json(_))));
        assert!(IsamParams::load_from_path("/nonexistent/isam.json").is_err());
    }

}
