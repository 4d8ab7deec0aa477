#![allow(dead_code)]

use nalgebra::{DMatrix, DVector};
use hybrid::Key;
use hybrid::discrete::{DiscreteKey, Assignment};
use hybrid::gaussian::JacobianFactor;
use hybrid::hybrid::{HybridFactorGraph, GaussianMixtureFactor};

pub const EPS : f64 = 1E-5;

pub fn x(k : usize) -> Key {
    k as Key
}

pub fn m(k : usize) -> Key {
    100 + k as Key
}

pub fn mode(k : usize) -> DiscreteKey {
    DiscreteKey::new(m(k), 2)
}

pub fn assign(pairs : &[(Key, usize)]) -> Assignment {
    pairs.iter().cloned().collect()
}

fn scalar(v : f64) -> DMatrix<f64> {
    DMatrix::from_element(1, 1, v)
}

fn vector(v : f64) -> DVector<f64> {
    DVector::from_element(1, v)
}

/// Linearized switching chain over X(1)..X(k), with modes M(1)..M(k-1). Each motion
/// X(i) -> X(i+1) is either "still" (mode 0, zero displacement) or "moving" (mode 1, unit
/// displacement), with unit noise. X(1) has a prior at 0 and each X(i), i >= 2, is measured
/// at i - 1, both with sigma 0.1; the linearization point is X(i) = i.
///
/// Factor layout: 0 is the prior; 1..k-1 the motion mixtures; then the k-1 measurements on
/// X(2)..X(k); then P(M1); then (if requested) the transitions P(M(i+1) | M(i)).
pub fn switching_with(k : usize, transitions : bool) -> HybridFactorGraph {
    let mut graph = HybridFactorGraph::new();
    graph.push(JacobianFactor::unary(x(1), scalar(1.), vector(-1.), 0.1).unwrap());
    for i in 1..k {
        let motion = |b : f64| {
            JacobianFactor::binary(x(i), scalar(-1.), x(i + 1), scalar(1.), vector(b), 1.0).unwrap()
        };
        let comps = vec![Some(motion(-1.)), Some(motion(0.))];
        graph.push(GaussianMixtureFactor::new(vec![x(i), x(i + 1)], &[mode(i)], comps).unwrap());
    }
    for i in 2..(k + 1) {
        graph.push(JacobianFactor::unary(x(i), scalar(1.), vector(-1.), 0.1).unwrap());
    }
    graph.add_discrete(mode(1), &[], "1/1").unwrap();
    if transitions {
        for i in 1..(k - 1) {
            graph.add_discrete(mode(i + 1), &[mode(i)], "1/2 3/2").unwrap();
        }
    }
    graph
}

pub fn switching(k : usize) -> HybridFactorGraph {
    switching_with(k, true)
}

/// Continuous variables first, then modes, each ascending.
pub fn ordering(k : usize) -> Vec<Key> {
    (1..(k + 1)).map(x).chain((1..k).map(m)).collect()
}

pub fn continuous_ordering(k : usize) -> Vec<Key> {
    (1..(k + 1)).map(x).collect()
}
