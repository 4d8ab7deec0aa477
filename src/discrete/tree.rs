use std::rc::Rc;
use crate::error::{HybridError, Result};
use crate::Key;
use super::{DiscreteKey, Assignment};

#[derive(Debug)]
enum Node<T> {
    Leaf(T),
    Choice { key : DiscreteKey, branches : Vec<Rc<Node<T>>> }
}

/// Immutable mapping from discrete assignments to leaves of type T. The tree
/// always has one leaf per assignment of its keys (no leaf merging happens),
/// so its shape is fully determined by the key ordering informed at construction.
/// Nodes are reference counted: every transformation returns a new root that
/// shares the untouched sub-trees with the original, and earlier snapshots
/// stay valid for as long as someone holds them.
#[derive(Debug)]
pub struct DecisionTree<T> {
    root : Rc<Node<T>>
}

impl<T> Clone for DecisionTree<T> {

    fn clone(&self) -> Self {
        Self { root : self.root.clone() }
    }

}

impl<T> DecisionTree<T> {

    /// Tree without any choice, holding a single value for all assignments.
    pub fn leaf(value : T) -> Self {
        Self { root : Rc::new(Node::Leaf(value)) }
    }

    /// Builds a tree from a row-major enumeration of leaves: the first key
    /// is the most significant one (root choice) and the last key varies fastest.
    pub fn from_leaves(keys : &[DiscreteKey], leaves : Vec<T>) -> Result<Self> {
        check_unique(keys)?;
        let expected = super::nr_assignments(keys);
        if leaves.len() != expected {
            return Err(HybridError::LeafCount { expected, found : leaves.len() });
        }
        let mut it = leaves.into_iter();
        let root = nodes_from_iter(keys, &mut it)
            .ok_or(HybridError::LeafCount { expected, found : 0 })?;
        Ok(Self { root })
    }

    /// Builds a tree over the informed keys by evaluating f at every full assignment,
    /// visited in row-major order.
    pub fn build<F>(keys : &[DiscreteKey], mut f : F) -> Self
    where
        F : FnMut(&Assignment) -> T
    {
        let mut assignment = Assignment::new();
        Self { root : nodes_from_fn(keys, &mut assignment, &mut f) }
    }

    pub fn is_leaf(&self) -> bool {
        matches!(*self.root, Node::Leaf(_))
    }

    /// Discrete keys this tree branches on, in the order they are first met
    /// by a depth-first traversal.
    pub fn keys(&self) -> Vec<DiscreteKey> {
        let mut keys = Vec::new();
        collect_keys(&self.root, &mut keys);
        keys
    }

    pub fn nr_leaves(&self) -> usize {
        self.fold(|_, n| n + 1, 0)
    }

    /// Returns the leaf selected by the assignment, or None if the assignment
    /// leaves some branching key unspecified (or out of its domain).
    pub fn get(&self, assignment : &Assignment) -> Option<&T> {
        let mut node = &*self.root;
        loop {
            match node {
                Node::Leaf(v) => return Some(v),
                Node::Choice { key, branches } => {
                    let v = assignment.get(&key.key)?;
                    node = &**branches.get(*v)?;
                }
            }
        }
    }

    /// Restricts the tree to a (possibly partial) assignment. Keys that are
    /// assigned disappear from the result, the remaining ones are kept; a full
    /// assignment yields a single leaf. Leaves are shared, never copied.
    pub fn choose(&self, assignment : &Assignment) -> Self {
        Self { root : choose_node(&self.root, assignment) }
    }

    pub fn map<U, F>(&self, mut f : F) -> DecisionTree<U>
    where
        F : FnMut(&T) -> U
    {
        DecisionTree { root : map_node(&self.root, &mut |_, v| f(v), &mut Assignment::new()) }
    }

    /// Like map, but stops at the first leaf for which f fails.
    pub fn try_map<U, E, F>(&self, mut f : F) -> std::result::Result<DecisionTree<U>, E>
    where
        F : FnMut(&T) -> std::result::Result<U, E>
    {
        Ok(DecisionTree { root : try_map_node(&self.root, &mut f)? })
    }

    /// Like map, but also informs the closure of the assignment leading to each leaf.
    pub fn map_with_assignment<U, F>(&self, mut f : F) -> DecisionTree<U>
    where
        F : FnMut(&Assignment, &T) -> U
    {
        DecisionTree { root : map_node(&self.root, &mut f, &mut Assignment::new()) }
    }

    /// Combines the leaves of two trees that might branch on different keys.
    /// The result branches first on the keys of self, then on the keys of
    /// other that self does not hold, and each of its leaves is f applied to the
    /// leaves of both trees aligned by assignment.
    pub fn apply2<U, V, F>(&self, other : &DecisionTree<U>, mut f : F) -> DecisionTree<V>
    where
        F : FnMut(&T, &U) -> V
    {
        DecisionTree { root : apply2_nodes(&self.root, &other.root, &mut f) }
    }

    /// Order-independent reduction over all leaves.
    pub fn fold<A, F>(&self, mut f : F, init : A) -> A
    where
        F : FnMut(&T, A) -> A
    {
        fold_node(&self.root, &mut f, init)
    }

    /// Lazily enumerates (assignment, leaf) pairs in traversal order. Calling
    /// iter() again restarts the enumeration.
    pub fn iter(&self) -> Iter<'_, T> {
        Iter { stack : vec![(&*self.root, Assignment::new())] }
    }

    /// Removes key from the tree by reducing its branches with op, which
    /// is how discrete variables are summed or maximized out.
    pub fn combine<F>(&self, key : Key, op : F) -> Self
    where
        F : Fn(&T, &T) -> T
    {
        Self { root : combine_node(&self.root, key, &op) }
    }

    /// Compares two trees assignment by assignment. Trees branching on different
    /// key orderings can be equal.
    pub fn equals_with<U, F>(&self, other : &DecisionTree<U>, mut eq : F) -> bool
    where
        F : FnMut(&T, &U) -> bool
    {
        let mut keys = self.keys();
        let mine = keys.clone();
        let theirs = other.keys();
        for k in theirs.iter() {
            if !keys.contains(k) {
                keys.push(*k);
            }
        }
        if mine.len() != theirs.len() || keys.len() != mine.len() {
            return false;
        }
        super::cartesian_product(&keys).iter().all(|a| {
            match (self.get(a), other.get(a)) {
                (Some(x), Some(y)) => eq(x, y),
                _ => false
            }
        })
    }

}

fn check_unique(keys : &[DiscreteKey]) -> Result<()> {
    for (i, k) in keys.iter().enumerate() {
        if keys[..i].iter().any(|other| other.key == k.key) {
            return Err(HybridError::DuplicateKey(k.key));
        }
    }
    Ok(())
}

fn nodes_from_iter<T, I>(keys : &[DiscreteKey], leaves : &mut I) -> Option<Rc<Node<T>>>
where
    I : Iterator<Item=T>
{
    match keys.split_first() {
        None => leaves.next().map(|v| Rc::new(Node::Leaf(v))),
        Some((key, rest)) => {
            let mut branches = Vec::with_capacity(key.cardinality);
            for _ in 0..key.cardinality {
                branches.push(nodes_from_iter(rest, leaves)?);
            }
            Some(Rc::new(Node::Choice { key : *key, branches }))
        }
    }
}

fn nodes_from_fn<T, F>(keys : &[DiscreteKey], assignment : &mut Assignment, f : &mut F) -> Rc<Node<T>>
where
    F : FnMut(&Assignment) -> T
{
    match keys.split_first() {
        None => Rc::new(Node::Leaf(f(assignment))),
        Some((key, rest)) => {
            let mut branches = Vec::with_capacity(key.cardinality);
            for v in 0..key.cardinality {
                assignment.insert(key.key, v);
                branches.push(nodes_from_fn(rest, assignment, f));
            }
            assignment.remove(&key.key);
            Rc::new(Node::Choice { key : *key, branches })
        }
    }
}

fn collect_keys<T>(node : &Node<T>, keys : &mut Vec<DiscreteKey>) {
    if let Node::Choice { key, branches } = node {
        if !keys.contains(key) {
            keys.push(*key);
        }
        for b in branches.iter() {
            collect_keys(b, keys);
        }
    }
}

fn choose_node<T>(node : &Rc<Node<T>>, assignment : &Assignment) -> Rc<Node<T>> {
    match &**node {
        Node::Leaf(_) => node.clone(),
        Node::Choice { key, branches } => {
            match assignment.get(&key.key).and_then(|v| branches.get(*v) ) {
                Some(branch) => choose_node(branch, assignment),
                None => Rc::new(Node::Choice {
                    key : *key,
                    branches : branches.iter().map(|b| choose_node(b, assignment) ).collect()
                })
            }
        }
    }
}

fn restrict<T>(node : &Rc<Node<T>>, key : Key, value : usize) -> Rc<Node<T>> {
    match &**node {
        Node::Leaf(_) => node.clone(),
        Node::Choice { key : k, branches } => {
            if k.key == key {
                match branches.get(value) {
                    Some(b) => b.clone(),
                    None => node.clone()
                }
            } else {
                Rc::new(Node::Choice {
                    key : *k,
                    branches : branches.iter().map(|b| restrict(b, key, value) ).collect()
                })
            }
        }
    }
}

fn map_node<T, U, F>(node : &Node<T>, f : &mut F, assignment : &mut Assignment) -> Rc<Node<U>>
where
    F : FnMut(&Assignment, &T) -> U
{
    match node {
        Node::Leaf(v) => Rc::new(Node::Leaf(f(assignment, v))),
        Node::Choice { key, branches } => {
            let mut mapped = Vec::with_capacity(branches.len());
            for (i, b) in branches.iter().enumerate() {
                assignment.insert(key.key, i);
                mapped.push(map_node(b, f, assignment));
            }
            assignment.remove(&key.key);
            Rc::new(Node::Choice { key : *key, branches : mapped })
        }
    }
}

fn try_map_node<T, U, E, F>(node : &Node<T>, f : &mut F) -> std::result::Result<Rc<Node<U>>, E>
where
    F : FnMut(&T) -> std::result::Result<U, E>
{
    match node {
        Node::Leaf(v) => Ok(Rc::new(Node::Leaf(f(v)?))),
        Node::Choice { key, branches } => {
            let mut mapped = Vec::with_capacity(branches.len());
            for b in branches.iter() {
                mapped.push(try_map_node(b, f)?);
            }
            Ok(Rc::new(Node::Choice { key : *key, branches : mapped }))
        }
    }
}

fn apply2_nodes<T, U, V, F>(a : &Rc<Node<T>>, b : &Rc<Node<U>>, f : &mut F) -> Rc<Node<V>>
where
    F : FnMut(&T, &U) -> V
{
    match (&**a, &**b) {
        (Node::Leaf(x), Node::Leaf(y)) => Rc::new(Node::Leaf(f(x, y))),
        (Node::Choice { key, branches }, _) => {
            let mut combined = Vec::with_capacity(branches.len());
            for (i, branch) in branches.iter().enumerate() {
                combined.push(apply2_nodes(branch, &restrict(b, key.key, i), f));
            }
            Rc::new(Node::Choice { key : *key, branches : combined })
        },
        (Node::Leaf(_), Node::Choice { key, branches }) => {
            let mut combined = Vec::with_capacity(branches.len());
            for branch in branches.iter() {
                combined.push(apply2_nodes(a, branch, f));
            }
            Rc::new(Node::Choice { key : *key, branches : combined })
        }
    }
}

fn fold_node<T, A, F>(node : &Node<T>, f : &mut F, acc : A) -> A
where
    F : FnMut(&T, A) -> A
{
    match node {
        Node::Leaf(v) => f(v, acc),
        Node::Choice { branches, .. } => {
            let mut acc = acc;
            for b in branches.iter() {
                acc = fold_node(b, f, acc);
            }
            acc
        }
    }
}

fn combine_node<T, F>(node : &Rc<Node<T>>, key : Key, op : &F) -> Rc<Node<T>>
where
    F : Fn(&T, &T) -> T
{
    match &**node {
        Node::Leaf(_) => node.clone(),
        Node::Choice { key : k, branches } if k.key == key => {
            match branches.split_first() {
                Some((first, rest)) => {
                    let mut acc = combine_node(first, key, op);
                    for b in rest.iter() {
                        let next = combine_node(b, key, op);
                        acc = apply2_nodes(&acc, &next, &mut |x : &T, y : &T| op(x, y) );
                    }
                    acc
                },
                None => node.clone()
            }
        },
        Node::Choice { key : k, branches } => {
            Rc::new(Node::Choice {
                key : *k,
                branches : branches.iter().map(|b| combine_node(b, key, op) ).collect()
            })
        }
    }
}

/// Lazy traversal over the leaves of a DecisionTree, returned by DecisionTree::iter.
pub struct Iter<'a, T> {
    stack : Vec<(&'a Node<T>, Assignment)>
}

impl<'a, T> Iterator for Iter<'a, T> {

    type Item = (Assignment, &'a T);

    fn next(&mut self) -> Option<Self::Item> {
        while let Some((node, assignment)) = self.stack.pop() {
            match node {
                Node::Leaf(v) => return Some((assignment, v)),
                Node::Choice { key, branches } => {
                    for (i, b) in branches.iter().enumerate().rev() {
                        let mut next = assignment.clone();
                        next.insert(key.key, i);
                        self.stack.push((&**b, next));
                    }
                }
            }
        }
        None
    }

}

#[cfg(test)]
mod tests {

    use super::*;

    fn keys() -> Vec<DiscreteKey> {
        vec![DiscreteKey::new(1, 2), DiscreteKey::new(2, 3)]
    }

    fn assign(pairs : &[(Key, usize)]) -> Assignment {
        pairs.iter().cloned().collect()
    }

    #[test]
    fn leaves_are_row_major() {
        let tree = DecisionTree::from_leaves(&keys(), (0..6).collect()).unwrap();
        assert_eq!(tree.get(&assign(&[(1, 0), (2, 2)])), Some(&2));
        assert_eq!(tree.get(&assign(&[(1, 1), (2, 0)])), Some(&3));
        assert_eq!(tree.get(&assign(&[(1, 1)])), None);
        assert_eq!(tree.nr_leaves(), 6);
    }

    #[test]
    fn wrong_leaf_count_is_rejected() {
        match DecisionTree::from_leaves(&keys(), vec![1, 2, 3]) {
            Err(HybridError::LeafCount { expected : 6, found : 3 }) => { },
            other => panic!("Unexpected result: {:?}", other)
        }
    }

    #[test]
    fn partial_choice_keeps_free_keys() {
        let tree = DecisionTree::from_leaves(&keys(), (0..6).collect()).unwrap();
        let sub = tree.choose(&assign(&[(2, 1)]));
        assert_eq!(sub.keys(), vec![DiscreteKey::new(1, 2)]);
        assert_eq!(sub.get(&assign(&[(1, 1)])), Some(&4));
        let single = tree.choose(&assign(&[(1, 0), (2, 0)]));
        assert!(single.is_leaf());
    }

    #[test]
    fn iteration_follows_traversal_order() {
        let tree = DecisionTree::from_leaves(&keys(), (0..6).collect()).unwrap();
        let visited : Vec<_> = tree.iter().map(|(_, v)| *v ).collect();
        assert_eq!(visited, vec![0, 1, 2, 3, 4, 5]);
        let (first, _) = tree.iter().next().unwrap();
        assert_eq!(first, assign(&[(1, 0), (2, 0)]));
        assert_eq!(tree.iter().count(), tree.iter().count());
    }

    #[test]
    fn apply2_aligns_different_keys() {
        let a = DecisionTree::from_leaves(&[DiscreteKey::new(1, 2)], vec![1.0, 2.0]).unwrap();
        let b = DecisionTree::from_leaves(&[DiscreteKey::new(2, 2)], vec![10.0, 100.0]).unwrap();
        let prod = a.apply2(&b, |x, y| x * y );
        assert_eq!(prod.keys(), vec![DiscreteKey::new(1, 2), DiscreteKey::new(2, 2)]);
        assert_eq!(prod.get(&assign(&[(1, 1), (2, 1)])), Some(&200.0));
        assert_eq!(prod.get(&assign(&[(1, 0), (2, 1)])), Some(&100.0));
    }

    #[test]
    fn combine_removes_key() {
        let tree = DecisionTree::from_leaves(&keys(), vec![1., 2., 3., 4., 5., 6.]).unwrap();
        let summed = tree.combine(2, |a, b| a + b );
        assert_eq!(summed.keys(), vec![DiscreteKey::new(1, 2)]);
        assert_eq!(summed.get(&assign(&[(1, 0)])), Some(&6.));
        assert_eq!(summed.get(&assign(&[(1, 1)])), Some(&15.));
        let maxed = tree.combine(1, |a : &f64, b : &f64| a.max(*b) );
        assert_eq!(maxed.get(&assign(&[(2, 0)])), Some(&4.));
    }

    #[test]
    fn transforms_leave_original_untouched() {
        let tree = DecisionTree::from_leaves(&keys(), (0..6).collect()).unwrap();
        let doubled = tree.map(|v| v * 2 );
        assert_eq!(tree.get(&assign(&[(1, 1), (2, 2)])), Some(&5));
        assert_eq!(doubled.get(&assign(&[(1, 1), (2, 2)])), Some(&10));
    }

    #[test]
    fn equality_ignores_key_order() {
        let a = DecisionTree::from_leaves(&keys(), (0..6).collect()).unwrap();
        let swapped = DecisionTree::build(&[DiscreteKey::new(2, 3), DiscreteKey::new(1, 2)], |asg| {
            asg[&1] * 3 + asg[&2]
        });
        assert!(a.equals_with(&swapped, |x, y| x == y ));
        let other = a.map(|v| v + 1 );
        assert!(!a.equals_with(&other, |x, y| x == y ));
    }

}
