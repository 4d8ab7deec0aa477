use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;
use crate::error::{HybridError, Result};
use crate::Key;
use crate::discrete::conditional::DiscreteEliminator;
use super::factor::HybridFactor;
use super::eliminate::eliminate_hybrid;
use super::bayes_net::HybridBayesNet;
use super::bayes_tree::{HybridBayesTree, Orphan, CliqueId};
use super::graph::HybridFactorGraph;

/// Symbolic elimination of a single variable.
#[derive(Debug, Clone)]
struct Node {
    key : Key,
    discrete : bool,
    factors : Vec<usize>,
    orphans : Vec<usize>,
    children : Vec<usize>,
    parent : Option<usize>,
    separator : BTreeSet<Key>
}

/// Group of variables eliminated together into a single clique.
#[derive(Debug, Clone)]
struct Cluster {
    frontals : Vec<Key>,
    discrete : bool,
    factors : Vec<usize>,
    orphans : Vec<usize>,
    children : Vec<usize>,
    parent : Option<usize>,
    separator_len : usize
}

/// Symbolic structure of the elimination of a factor graph under an ordering. Each
/// factor is assigned to the node of its first eliminated variable, and each node
/// has as parent the node of the first eliminated variable of its separator. Nodes are
/// stored in elimination order, which is also a post-order of the tree.
///
/// All structural checks happen here, before any numeric work: duplicate ordering
/// entries, keys used both as continuous and discrete variables, variables absent from
/// every factor, and discrete variables ordered before continuous variables they
/// still share a factor (or separator) with.
#[derive(Debug, Clone)]
pub struct EliminationTree {
    factors : Vec<HybridFactor>,
    orphans : Vec<Orphan>,
    nodes : Vec<Node>,
    untouched : Vec<usize>
}

impl EliminationTree {

    pub fn new(graph : &HybridFactorGraph, ordering : &[Key]) -> Result<Self> {
        Self::with_orphans(graph.iter().cloned().collect(), ordering, Vec::new())
    }

    /// Builds the tree over factors plus orphaned sub-trees of a Bayes tree, which only
    /// take part symbolically: each orphan is attached to the clique eliminating the
    /// first of its separator keys.
    pub fn with_orphans(factors : Vec<HybridFactor>, ordering : &[Key], orphans : Vec<Orphan>) -> Result<Self> {
        let mut position = BTreeMap::new();
        for (i, k) in ordering.iter().enumerate() {
            if position.insert(*k, i).is_some() {
                return Err(HybridError::DuplicateOrdering(*k));
            }
        }

        let mut continuous = BTreeSet::new();
        let mut discrete = BTreeSet::new();
        for f in factors.iter() {
            continuous.extend(f.continuous_keys());
            discrete.extend(f.discrete_keys().iter().map(|k| k.key ));
        }
        if let Some(k) = continuous.intersection(&discrete).next() {
            return Err(HybridError::KeyKind(*k));
        }
        for k in ordering.iter() {
            if !continuous.contains(k) && !discrete.contains(k) {
                return Err(HybridError::MissingKey(*k));
            }
        }

        let mut nodes : Vec<Node> = ordering.iter().map(|k| {
            Node {
                key : *k,
                discrete : discrete.contains(k),
                factors : Vec::new(),
                orphans : Vec::new(),
                children : Vec::new(),
                parent : None,
                separator : BTreeSet::new()
            }
        }).collect();

        let first_position = |keys : &[Key]| keys.iter().filter_map(|k| position.get(k).cloned() ).min();
        let mut untouched = Vec::new();
        let mut involved : Vec<BTreeSet<Key>> = vec![BTreeSet::new(); nodes.len()];
        for (i, f) in factors.iter().enumerate() {
            let keys = f.keys();
            match first_position(&keys) {
                Some(p) => {
                    nodes[p].factors.push(i);
                    involved[p].extend(keys);
                },
                None => untouched.push(i)
            }
        }
        for (i, o) in orphans.iter().enumerate() {
            if let Some(p) = first_position(&o.keys) {
                nodes[p].orphans.push(i);
                involved[p].extend(o.keys.iter().cloned());
            }
        }

        for p in 0..nodes.len() {
            let key = nodes[p].key;
            let mut keys = std::mem::take(&mut involved[p]);
            if nodes[p].discrete {
                if let Some(c) = keys.iter().find(|k| continuous.contains(*k) ) {
                    return Err(HybridError::Ordering { discrete : key, continuous : *c });
                }
            }
            keys.remove(&key);
            let parent = keys.iter().filter_map(|k| position.get(k).cloned() ).min();
            if let Some(parent) = parent {
                involved[parent].extend(keys.iter().cloned());
                nodes[parent].children.push(p);
            }
            nodes[p].parent = parent;
            nodes[p].separator = keys;
        }
        debug!("Elimination tree over {} variables, {} factors left untouched", nodes.len(), untouched.len());
        Ok(Self { factors, orphans, nodes, untouched })
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Variables at the roots of the tree (whose separator holds no eliminated variable).
    pub fn roots(&self) -> Vec<Key> {
        self.nodes.iter().filter(|n| n.parent.is_none() ).map(|n| n.key ).collect()
    }

    fn remaining_graph(&self, remainders : Vec<HybridFactor>) -> HybridFactorGraph {
        let mut remaining = HybridFactorGraph::new();
        for ix in self.untouched.iter() {
            remaining.push(self.factors[*ix].clone());
        }
        for f in remainders {
            remaining.push(f);
        }
        remaining
    }

    /// Eliminates one variable at a time, in ordering order. Returns the resulting Bayes net
    /// and the factors left over on variables outside the ordering: first the factors that
    /// did not involve any eliminated variable (in their original order), then the
    /// factors produced by elimination.
    pub fn eliminate_sequential(&self, eliminator : &dyn DiscreteEliminator) -> Result<(HybridBayesNet, HybridFactorGraph)> {
        let mut pending : Vec<Vec<HybridFactor>> = vec![Vec::new(); self.nodes.len()];
        let mut net = HybridBayesNet::new();
        let mut remainders = Vec::new();
        for (p, node) in self.nodes.iter().enumerate() {
            let mut fs : Vec<HybridFactor> = node.factors.iter().map(|ix| self.factors[*ix].clone() ).collect();
            fs.extend(std::mem::take(&mut pending[p]));
            let (cond, rem) = eliminate_hybrid(&fs, &[node.key], eliminator)?;
            net.push(cond);
            match (rem, node.parent) {
                (Some(r), Some(parent)) => pending[parent].push(r),
                (Some(r), None) => remainders.push(r),
                (None, _) => { }
            }
        }
        Ok((net, self.remaining_graph(remainders)))
    }

    /// Groups nodes into clusters (junction tree). A child is merged into its parent when
    /// both eliminate variables of the same kind and the child separator has as many
    /// keys as the parent separator plus the frontals the parent cluster already holds.
    /// Merged frontals come first, in elimination order, followed by the parent variable.
    fn clusters(&self) -> Vec<Option<Cluster>> {
        let mut clusters : Vec<Option<Cluster>> = Vec::with_capacity(self.nodes.len());
        for (p, node) in self.nodes.iter().enumerate() {
            let mut cluster = Cluster {
                frontals : Vec::new(),
                discrete : node.discrete,
                factors : node.factors.clone(),
                orphans : node.orphans.clone(),
                children : Vec::new(),
                parent : None,
                separator_len : node.separator.len()
            };
            let mut merged_frontals = Vec::new();
            for c in node.children.iter().cloned() {
                let child = match clusters.get_mut(c).and_then(|c| c.take() ) {
                    Some(child) => child,
                    None => continue
                };
                let nr_frontals = merged_frontals.len() + 1;
                if child.discrete == cluster.discrete && child.separator_len == cluster.separator_len + nr_frontals {
                    merged_frontals.extend(child.frontals);
                    cluster.factors.extend(child.factors);
                    cluster.orphans.extend(child.orphans);
                    cluster.children.extend(child.children);
                } else {
                    cluster.children.push(c);
                    clusters[c] = Some(child);
                }
            }
            cluster.frontals = merged_frontals;
            cluster.frontals.push(node.key);
            clusters.push(Some(cluster));
        }
        for p in 0..clusters.len() {
            let children = match &clusters[p] {
                Some(c) => c.children.clone(),
                None => continue
            };
            for c in children {
                if let Some(child) = clusters[c].as_mut() {
                    child.parent = Some(p);
                }
            }
        }
        clusters
    }

    /// Eliminates clusters of variables at once, adding one clique per cluster to the Bayes tree
    /// and attaching the orphans to the clique of the cluster they were assigned to. Returns
    /// the factors left over on variables outside the ordering.
    pub fn eliminate_multifrontal(
        &self,
        tree : &mut HybridBayesTree,
        eliminator : &dyn DiscreteEliminator
    ) -> Result<HybridFactorGraph> {
        let clusters = self.clusters();
        let mut pending : Vec<Vec<HybridFactor>> = vec![Vec::new(); clusters.len()];
        let mut cliques : Vec<Option<CliqueId>> = vec![None; clusters.len()];
        let mut remainders = Vec::new();
        for (p, cluster) in clusters.iter().enumerate() {
            let cluster = match cluster {
                Some(c) => c,
                None => continue
            };
            let mut fs : Vec<HybridFactor> = cluster.factors.iter().map(|ix| self.factors[*ix].clone() ).collect();
            fs.extend(std::mem::take(&mut pending[p]));
            let (cond, rem) = eliminate_hybrid(&fs, &cluster.frontals, eliminator)?;
            let id = tree.add_clique(cond);
            for c in cluster.children.iter() {
                if let Some(child) = cliques[*c] {
                    tree.attach(child, id);
                }
            }
            for o in cluster.orphans.iter() {
                tree.attach(self.orphans[*o].clique, id);
            }
            cliques[p] = Some(id);
            match (rem, cluster.parent) {
                (Some(r), Some(parent)) => pending[parent].push(r),
                (Some(r), None) => remainders.push(r),
                (None, _) => { }
            }
        }
        debug!("Multifrontal elimination produced {} cliques", cliques.iter().flatten().count());
        Ok(self.remaining_graph(remainders))
    }

}

#[cfg(test)]
mod tests {

    use super::*;
    use nalgebra::{DMatrix, DVector};
    use crate::discrete::DiscreteKey;
    use crate::gaussian::JacobianFactor;
    use crate::hybrid::mixture::GaussianMixtureFactor;

    fn scalar(v : f64) -> DMatrix<f64> {
        DMatrix::from_element(1, 1, v)
    }

    fn graph() -> HybridFactorGraph {
        let mut g = HybridFactorGraph::new();
        g.push(JacobianFactor::unary(1, scalar(1.), DVector::zeros(1), 1.0).unwrap());
        let comps = vec![
            Some(JacobianFactor::binary(1, scalar(-1.), 2, scalar(1.), DVector::zeros(1), 1.0).unwrap()),
            Some(JacobianFactor::binary(1, scalar(-1.), 2, scalar(1.), DVector::from_element(1, 1.), 1.0).unwrap())
        ];
        g.push(GaussianMixtureFactor::new(vec![1, 2], &[DiscreteKey::new(10, 2)], comps).unwrap());
        g
    }

    #[test]
    fn structural_errors_come_first() {
        let g = graph();
        assert!(matches!(EliminationTree::new(&g, &[1, 1]), Err(HybridError::DuplicateOrdering(1))));
        assert!(matches!(EliminationTree::new(&g, &[1, 3]), Err(HybridError::MissingKey(3))));
        assert!(matches!(EliminationTree::new(&g, &[1, 10, 2]), Err(HybridError::Ordering { discrete : 10, continuous : 2 })));
    }

    #[test]
    fn parents_follow_separators() {
        let g = graph();
        let etree = EliminationTree::new(&g, &[1, 2, 10]).unwrap();
        assert_eq!(etree.len(), 3);
        assert_eq!(etree.roots(), vec![10]);
        let partial = EliminationTree::new(&g, &[1]).unwrap();
        assert_eq!(partial.roots(), vec![1]);
    }

}
