use std::collections::{BTreeMap, BTreeSet};
use std::ops::Index;
use std::rc::Rc;
use petgraph::stable_graph::{StableDiGraph, NodeIndex};
use petgraph::Direction;
use tracing::debug;
use crate::error::{HybridError, Result};
use crate::Key;
use crate::discrete::{Assignment, DecisionTreeFactor};
use crate::gaussian::GaussianBayesNet;
use super::conditional::HybridConditional;
use super::bayes_net::HybridBayesNet;
use super::HybridValues;

/// Stable identifier of a clique. Removing other cliques never invalidates it.
pub type CliqueId = NodeIndex;

/// Sub-tree left without a parent after its ancestors were removed for re-elimination.
/// Keys are the separator of its root clique, which must end up inside the clique it
/// is re-attached to.
#[derive(Debug, Clone)]
pub struct Orphan {
    pub clique : CliqueId,
    pub keys : Vec<Key>
}

/// Clique tree of hybrid conditionals. Each clique holds one (possibly multi-frontal)
/// conditional whose parents are all frontals of ancestor cliques. Cliques live in a
/// stable graph arena, with an edge from each parent to its children, and every frontal
/// variable is indexed to the clique that eliminates it.
#[derive(Debug, Clone, Default)]
pub struct HybridBayesTree {
    graph : StableDiGraph<HybridConditional, ()>,
    nodes : BTreeMap<Key, CliqueId>,
    roots : Vec<CliqueId>
}

impl HybridBayesTree {

    pub fn new() -> Self {
        Self::default()
    }

    /// Number of cliques.
    pub fn len(&self) -> usize {
        self.graph.node_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    pub fn roots(&self) -> &[CliqueId] {
        &self.roots[..]
    }

    /// Eliminated variables, ascending.
    pub fn keys(&self) -> Vec<Key> {
        self.nodes.keys().cloned().collect()
    }

    pub fn contains(&self, key : Key) -> bool {
        self.nodes.contains_key(&key)
    }

    pub fn clique_id(&self, key : Key) -> Result<CliqueId> {
        self.nodes.get(&key).cloned().ok_or(HybridError::MissingKey(key))
    }

    /// Conditional of the clique holding key as frontal.
    pub fn clique(&self, key : Key) -> Result<&HybridConditional> {
        let id = self.clique_id(key)?;
        self.graph.node_weight(id).ok_or(HybridError::MissingKey(key))
    }

    pub fn conditional(&self, id : CliqueId) -> Option<&HybridConditional> {
        self.graph.node_weight(id)
    }

    pub fn parent(&self, id : CliqueId) -> Option<CliqueId> {
        self.graph.neighbors_directed(id, Direction::Incoming).next()
    }

    /// Children, sorted by id.
    pub fn children(&self, id : CliqueId) -> Vec<CliqueId> {
        let mut children : Vec<_> = self.graph.neighbors_directed(id, Direction::Outgoing).collect();
        children.sort();
        children
    }

    /// Inserts a parentless clique, indexing its frontals.
    pub fn add_clique(&mut self, cond : HybridConditional) -> CliqueId {
        let frontals = cond.frontals();
        let id = self.graph.add_node(cond);
        for f in frontals {
            self.nodes.insert(f, id);
        }
        self.roots.push(id);
        id
    }

    /// Makes child a child of parent. The child must currently be a root.
    pub fn attach(&mut self, child : CliqueId, parent : CliqueId) {
        self.roots.retain(|r| *r != child );
        self.graph.add_edge(parent, child, ());
    }

    /// Cliques in post-order: every clique comes after all its descendants.
    pub fn post_order(&self) -> Vec<CliqueId> {
        let mut out = Vec::with_capacity(self.len());
        let mut stack : Vec<(CliqueId, bool)> = self.roots.iter().rev().map(|r| (*r, false) ).collect();
        while let Some((id, expanded)) = stack.pop() {
            if expanded {
                out.push(id);
            } else {
                stack.push((id, true));
                for c in self.children(id).into_iter().rev() {
                    stack.push((c, false));
                }
            }
        }
        out
    }

    /// Removes the cliques holding any of the keys, together with their paths to the root.
    /// Returns the conditionals of the removed cliques (ancestors last) and the sub-trees
    /// left without a parent, which become roots until re-attached.
    pub fn remove_top(&mut self, keys : &[Key]) -> (Vec<HybridConditional>, Vec<Orphan>) {
        let mut affected = BTreeSet::new();
        for k in keys.iter() {
            let mut current = self.nodes.get(k).cloned();
            while let Some(id) = current {
                if !affected.insert(id) {
                    break;
                }
                current = self.parent(id);
            }
        }
        let mut orphans = Vec::new();
        for id in affected.iter() {
            for c in self.children(*id) {
                if !affected.contains(&c) {
                    let keys = self.graph.node_weight(c).map(|cond| cond.parents() ).unwrap_or_default();
                    orphans.push(Orphan { clique : c, keys });
                }
            }
        }
        let removal_order : Vec<CliqueId> = self.post_order().into_iter().filter(|id| affected.contains(id) ).collect();
        let mut removed = Vec::with_capacity(removal_order.len());
        for id in removal_order {
            if let Some(cond) = self.graph.remove_node(id) {
                for f in cond.frontals() {
                    self.nodes.remove(&f);
                }
                removed.push(cond);
            }
            self.roots.retain(|r| *r != id );
        }
        for o in orphans.iter() {
            self.roots.push(o.clique);
        }
        debug!("Removed {} cliques, leaving {} orphans", removed.len(), orphans.len());
        (removed, orphans)
    }

    /// All conditionals in an order where parents come after their children.
    pub fn to_bayes_net(&self) -> HybridBayesNet {
        let mut net = HybridBayesNet::new();
        for id in self.post_order() {
            if let Some(cond) = self.graph.node_weight(id) {
                net.push(cond.clone());
            }
        }
        net
    }

    /// Gaussian Bayes net selected by a discrete assignment (see HybridBayesNet::choose).
    pub fn choose(&self, assignment : &Assignment) -> Result<GaussianBayesNet> {
        self.to_bayes_net().choose(assignment)
    }

    /// MPE over the discrete conditionals, followed by the Gaussian solution of the selected mode.
    pub fn optimize(&self) -> Result<HybridValues> {
        self.to_bayes_net().optimize()
    }

    /// Returns a tree where the discrete conditional of the clique holding key keeps only its
    /// max_nr_leaves most probable entries, and every mixture is pruned against it.
    pub fn prune(&self, key : Key, max_nr_leaves : usize) -> Result<HybridBayesTree> {
        let id = self.clique_id(key)?;
        let discrete = self.clique(key)?.as_discrete().ok_or(HybridError::NotDiscrete(key))?;
        let pruned = discrete.prune(max_nr_leaves);
        debug!("Pruning clique of {} to {} leaves", key, max_nr_leaves);
        let mut tree = self.clone();
        if let Some(w) = tree.graph.node_weight_mut(id) {
            *w = HybridConditional::Discrete(Rc::new(pruned.clone()));
        }
        tree.prune_mixtures(pruned.as_factor());
        Ok(tree)
    }

    /// Nulls the leaves of every mixture that have no nonzero extension in the factor.
    pub fn prune_mixtures(&mut self, factor : &DecisionTreeFactor) {
        let ids : Vec<CliqueId> = self.graph.node_indices().collect();
        for id in ids {
            if let Some(w) = self.graph.node_weight_mut(id) {
                let pruned = w.as_mixture().map(|m| m.prune(factor) );
                if let Some(m) = pruned {
                    *w = HybridConditional::Mixture(Rc::new(m));
                }
            }
        }
    }

}

impl Index<Key> for HybridBayesTree {

    type Output = HybridConditional;

    fn index(&self, key : Key) -> &HybridConditional {
        &self.graph[self.nodes[&key]]
    }

}

#[cfg(test)]
mod tests {

    use super::*;
    use nalgebra::{DMatrix, DVector};
    use crate::gaussian::GaussianConditional;

    fn clique(frontal : Key, parent : Option<Key>) -> HybridConditional {
        let parents : Vec<(Key, usize)> = parent.into_iter().map(|p| (p, 1) ).collect();
        let s = DMatrix::from_element(1, parents.len(), -1.0);
        let c = GaussianConditional::new(
            vec![(frontal, 1)],
            parents,
            DMatrix::from_element(1, 1, 1.0),
            s,
            DVector::from_element(1, 1.0)
        ).unwrap();
        HybridConditional::Gaussian(Rc::new(c))
    }

    // 3 is the root, with children 2 and 4; 1 hangs from 2.
    fn chain() -> HybridBayesTree {
        let mut tree = HybridBayesTree::new();
        let c1 = tree.add_clique(clique(1, Some(2)));
        let c2 = tree.add_clique(clique(2, Some(3)));
        tree.attach(c1, c2);
        let c4 = tree.add_clique(clique(4, Some(3)));
        let c3 = tree.add_clique(clique(3, None));
        tree.attach(c2, c3);
        tree.attach(c4, c3);
        tree
    }

    #[test]
    fn post_order_visits_children_first() {
        let tree = chain();
        assert_eq!(tree.roots().len(), 1);
        let order : Vec<Key> = tree.post_order().iter().map(|id| tree.conditional(*id).unwrap().frontals()[0] ).collect();
        assert_eq!(order, vec![1, 2, 4, 3]);
        let sol = tree.optimize().unwrap();
        assert_eq!(sol.continuous[3][0], 1.0);
        assert_eq!(sol.continuous[1][0], 3.0);
    }

    #[test]
    fn remove_top_leaves_orphans() {
        let mut tree = chain();
        let c1 = tree.clique_id(1).unwrap();
        let c4 = tree.clique_id(4).unwrap();
        let (removed, orphans) = tree.remove_top(&[2]);
        let removed : Vec<Key> = removed.iter().map(|c| c.frontals()[0] ).collect();
        assert_eq!(removed, vec![2, 3]);
        assert_eq!(tree.len(), 2);
        assert!(!tree.contains(2) && !tree.contains(3));
        assert_eq!(orphans.len(), 2);
        let mut found : Vec<(CliqueId, Vec<Key>)> = orphans.into_iter().map(|o| (o.clique, o.keys) ).collect();
        found.sort();
        let mut expected = vec![(c1, vec![2]), (c4, vec![3])];
        expected.sort();
        assert_eq!(found, expected);
        assert_eq!(tree.roots().len(), 2);
        assert!(matches!(tree.clique(3), Err(HybridError::MissingKey(3))));
    }

}
