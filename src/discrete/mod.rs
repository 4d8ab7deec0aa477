use std::collections::BTreeMap;
use serde::{Serialize, Deserialize};
use crate::Key;

/// Immutable, reference-counted decision trees mapping discrete assignments to arbitrary leaves.
pub mod tree;

/// Decision trees with nonnegative scalar leaves (potentials), supporting products,
/// marginalization and pruning.
pub mod factor;

/// Normalized conditionals and max-product lookup tables over discrete variables.
pub mod conditional;

pub use tree::DecisionTree;

pub use factor::DecisionTreeFactor;

pub use conditional::DiscreteConditional;

/// A discrete variable: its key and the number of values it can take.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DiscreteKey {
    pub key : Key,
    pub cardinality : usize
}

impl DiscreteKey {

    pub fn new(key : Key, cardinality : usize) -> Self {
        Self { key, cardinality }
    }

}

/// Values taken by a set of discrete variables, indexed by key.
pub type Assignment = BTreeMap<Key, usize>;

/// Number of joint assignments over the informed keys (1 for an empty key set).
pub fn nr_assignments(keys : &[DiscreteKey]) -> usize {
    keys.iter().map(|k| k.cardinality ).product()
}

/// Enumerates all joint assignments over keys in row-major order: the first key is
/// the most significant and the last one varies fastest.
pub fn cartesian_product(keys : &[DiscreteKey]) -> Vec<Assignment> {
    let mut out = vec![Assignment::new()];
    for k in keys.iter() {
        let mut next = Vec::with_capacity(out.len() * k.cardinality);
        for a in out.iter() {
            for v in 0..k.cardinality {
                let mut a = a.clone();
                a.insert(k.key, v);
                next.push(a);
            }
        }
        out = next;
    }
    out
}

/// Keys of a followed by the keys of b not already in a.
pub fn union_keys(a : &[DiscreteKey], b : &[DiscreteKey]) -> Vec<DiscreteKey> {
    let mut keys = a.to_vec();
    for k in b.iter() {
        if !keys.iter().any(|other| other.key == k.key ) {
            keys.push(*k);
        }
    }
    keys
}

/// Verifies the assignment holds an in-domain value for every informed key.
pub fn check_assignment(keys : &[DiscreteKey], assignment : &Assignment) -> crate::error::Result<()> {
    for k in keys.iter() {
        match assignment.get(&k.key) {
            Some(v) if *v >= k.cardinality => {
                return Err(crate::error::HybridError::AssignmentRange { key : k.key, value : *v, cardinality : k.cardinality });
            },
            Some(_) => { },
            None => return Err(crate::error::HybridError::MissingAssignment(k.key))
        }
    }
    Ok(())
}

/// Restricts an assignment to the informed keys.
pub fn restrict_assignment(assignment : &Assignment, keys : &[DiscreteKey]) -> Assignment {
    keys.iter()
        .filter_map(|k| assignment.get(&k.key).map(|v| (k.key, *v) ) )
        .collect()
}

#[test]
fn product_is_row_major() {
    let keys = [DiscreteKey::new(3, 2), DiscreteKey::new(1, 3)];
    let all = cartesian_product(&keys);
    assert_eq!(all.len(), nr_assignments(&keys));
    assert_eq!(all[1][&1], 1);
    assert_eq!(all[1][&3], 0);
    assert_eq!(all[3][&3], 1);
    assert_eq!(cartesian_product(&[]).len(), 1);
}
