use crate::error::{HybridError, Result};
use crate::Key;
use super::{DiscreteKey, Assignment, DecisionTree};
use super::tree::Iter;

/// Potential over a set of discrete variables, stored as a decision tree with
/// nonnegative scalar leaves. Key order determines the tree layout (first key
/// at the root), but never the meaning of the factor.
#[derive(Debug, Clone)]
pub struct DecisionTreeFactor {
    keys : Vec<DiscreteKey>,
    tree : DecisionTree<f64>
}

impl DecisionTreeFactor {

    /// Parses a whitespace-separated, row-major table of nonnegative values.
    pub fn from_table(keys : &[DiscreteKey], table : &str) -> Result<Self> {
        let values = table.split_whitespace()
            .map(|s| s.parse::<f64>().map_err(|_| HybridError::Table(format!("Could not parse {}", s)) ) )
            .collect::<Result<Vec<_>>>()?;
        Self::from_values(keys, values)
    }

    pub fn from_values(keys : &[DiscreteKey], values : Vec<f64>) -> Result<Self> {
        if let Some(v) = values.iter().find(|v| !(**v >= 0.0) ) {
            return Err(HybridError::Table(format!("Negative or invalid potential {}", v)));
        }
        let tree = DecisionTree::from_leaves(keys, values)?;
        Ok(Self { keys : keys.to_vec(), tree })
    }

    /// Wraps a tree the caller guarantees to hold nonnegative leaves.
    pub(crate) fn from_tree(tree : DecisionTree<f64>) -> Self {
        Self { keys : tree.keys(), tree }
    }

    /// Factor that evaluates to value for any assignment.
    pub fn constant(value : f64) -> Self {
        Self { keys : Vec::new(), tree : DecisionTree::leaf(value) }
    }

    pub fn keys(&self) -> &[DiscreteKey] {
        &self.keys[..]
    }

    pub fn tree(&self) -> &DecisionTree<f64> {
        &self.tree
    }

    pub fn contains(&self, key : Key) -> bool {
        self.keys.iter().any(|k| k.key == key )
    }

    /// Value at an assignment holding (at least) all keys of this factor.
    pub fn get(&self, assignment : &Assignment) -> Result<f64> {
        super::check_assignment(&self.keys, assignment)?;
        self.tree.get(assignment).cloned().ok_or(HybridError::Table(format!("Incomplete tree over {:?}", self.keys)))
    }

    /// Product over the union of both key sets; keys of self come first.
    pub fn multiply(&self, other : &DecisionTreeFactor) -> Self {
        Self {
            keys : super::union_keys(&self.keys, &other.keys),
            tree : self.tree.apply2(&other.tree, |a, b| a * b )
        }
    }

    /// Leaf-wise division, taking 0/0 as 0. The divisor keys should be a subset of
    /// the keys of self.
    pub fn divide(&self, other : &DecisionTreeFactor) -> Self {
        Self {
            keys : super::union_keys(&self.keys, &other.keys),
            tree : self.tree.apply2(&other.tree, |a, b| if *b == 0.0 { 0.0 } else { a / b } )
        }
    }

    pub fn sum_out(&self, frontals : &[Key]) -> Self {
        self.combine_out(frontals, |a, b| a + b )
    }

    pub fn max_out(&self, frontals : &[Key]) -> Self {
        self.combine_out(frontals, |a : &f64, b : &f64| a.max(*b) )
    }

    fn combine_out<F>(&self, frontals : &[Key], op : F) -> Self
    where
        F : Fn(&f64, &f64) -> f64
    {
        let mut tree = self.tree.clone();
        for f in frontals.iter() {
            tree = tree.combine(*f, &op);
        }
        let keys = self.keys.iter().filter(|k| !frontals.contains(&k.key) ).cloned().collect();
        Self { keys, tree }
    }

    /// Restriction to a partial assignment. Assigned keys are removed.
    pub fn choose(&self, assignment : &Assignment) -> Self {
        let keys = self.keys.iter().filter(|k| !assignment.contains_key(&k.key) ).cloned().collect();
        Self { keys, tree : self.tree.choose(assignment) }
    }

    /// Keeps the max_nr_leaves leaves with the largest values and sets all others to zero.
    /// Leaves of equal value are ranked by their traversal order. The shape of the
    /// tree is unchanged, and so is the value of any retained leaf.
    pub fn prune(&self, max_nr_leaves : usize) -> Self {
        let values : Vec<f64> = self.tree.iter().map(|(_, v)| *v ).collect();
        if max_nr_leaves >= values.len() {
            return self.clone();
        }
        let mut ranked : Vec<usize> = (0..values.len()).collect();

        // sort_by is stable, so ties keep traversal order.
        ranked.sort_by(|a, b| values[*b].partial_cmp(&values[*a]).unwrap_or(std::cmp::Ordering::Equal) );
        let mut kept = vec![false; values.len()];
        for ix in ranked.iter().take(max_nr_leaves) {
            kept[*ix] = true;
        }
        let mut pos = 0;
        let tree = self.tree.map(|v| {
            let keep = kept.get(pos).cloned().unwrap_or(false);
            pos += 1;
            if keep { *v } else { 0.0 }
        });
        Self { keys : self.keys.clone(), tree }
    }

    pub fn nr_leaves(&self) -> usize {
        self.tree.nr_leaves()
    }

    pub fn nr_nonzero(&self) -> usize {
        self.tree.fold(|v, n| if *v > 0.0 { n + 1 } else { n }, 0)
    }

    pub fn sum(&self) -> f64 {
        self.tree.fold(|v, s| s + v, 0.0)
    }

    pub fn max(&self) -> f64 {
        self.tree.fold(|v, m : f64| m.max(*v), 0.0)
    }

    pub fn fold<A, F>(&self, f : F, init : A) -> A
    where
        F : FnMut(&f64, A) -> A
    {
        self.tree.fold(f, init)
    }

    pub fn iter(&self) -> Iter<'_, f64> {
        self.tree.iter()
    }

    /// Assignment-wise comparison with absolute tolerance.
    pub fn equals(&self, other : &DecisionTreeFactor, tol : f64) -> bool {
        self.tree.equals_with(&other.tree, |a, b| (a - b).abs() <= tol )
    }

}

#[cfg(test)]
mod tests {

    use super::*;

    fn m(k : Key) -> DiscreteKey {
        DiscreteKey::new(k, 2)
    }

    #[test]
    fn product_and_marginal() {
        let a = DecisionTreeFactor::from_table(&[m(1)], "1 3").unwrap();
        let b = DecisionTreeFactor::from_table(&[m(1), m(2)], "1 2 3 4").unwrap();
        let p = a.multiply(&b);
        assert_eq!(p.keys(), &[m(1), m(2)]);
        let asg : Assignment = vec![(1, 1), (2, 1)].into_iter().collect();
        assert_eq!(p.get(&asg).unwrap(), 12.0);
        let marg = p.sum_out(&[2]);
        assert_eq!(marg.keys(), &[m(1)]);
        assert!(marg.equals(&DecisionTreeFactor::from_table(&[m(1)], "3 21").unwrap(), 1E-12));
        let mx = p.max_out(&[1]);
        assert!(mx.equals(&DecisionTreeFactor::from_table(&[m(2)], "9 12").unwrap(), 1E-12));
    }

    #[test]
    fn lookup_errors() {
        let f = DecisionTreeFactor::from_table(&[m(1), m(2)], "1 2 3 4").unwrap();
        let partial : Assignment = vec![(1, 1)].into_iter().collect();
        assert!(matches!(f.get(&partial), Err(HybridError::MissingAssignment(2))));
        let out : Assignment = vec![(1, 1), (2, 2)].into_iter().collect();
        assert!(matches!(f.get(&out), Err(HybridError::AssignmentRange { key : 2, .. })));
        assert!(DecisionTreeFactor::from_table(&[m(1)], "1 x").is_err());
        assert!(DecisionTreeFactor::from_table(&[m(1)], "1 -1").is_err());
    }

    #[test]
    fn prune_keeps_largest() {
        let f = DecisionTreeFactor::from_table(&[m(1), m(2)], "0.1 0.4 0.4 0.3").unwrap();
        let pruned = f.prune(2);
        assert_eq!(pruned.nr_nonzero(), 2);
        let values : Vec<f64> = pruned.iter().map(|(_, v)| *v ).collect();
        assert_eq!(values, vec![0.0, 0.4, 0.4, 0.0]);
        let tie = f.prune(1);
        let values : Vec<f64> = tie.iter().map(|(_, v)| *v ).collect();
        assert_eq!(values, vec![0.0, 0.4, 0.0, 0.0]);
        assert_eq!(f.prune(10).nr_nonzero(), 4);
    }

}
