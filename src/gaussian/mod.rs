use std::collections::BTreeMap;
use std::ops::Index;
use nalgebra::{DMatrix, DVector};
use crate::error::{HybridError, Result};
use crate::Key;

/// Linear-Gaussian factors in the form ||A x - b||² under a noise model.
pub mod factor;

/// Gaussian conditionals in square-root information form R x_f + S x_p = d.
pub mod conditional;

/// Partial QR elimination of a set of linear-Gaussian factors.
pub mod eliminate;

/// Ordered sequence of Gaussian conditionals resulting from elimination.
pub mod bayes_net;

pub use factor::JacobianFactor;

pub use conditional::GaussianConditional;

pub use bayes_net::GaussianBayesNet;

pub use eliminate::eliminate;

/// Values for a set of continuous (vector-valued) variables.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VectorValues {
    values : BTreeMap<Key, DVector<f64>>
}

impl VectorValues {

    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key : Key, value : DVector<f64>) {
        self.values.insert(key, value);
    }

    pub fn get(&self, key : Key) -> Option<&DVector<f64>> {
        self.values.get(&key)
    }

    pub fn at(&self, key : Key) -> Result<&DVector<f64>> {
        self.values.get(&key).ok_or(HybridError::MissingKey(key))
    }

    pub fn contains(&self, key : Key) -> bool {
        self.values.contains_key(&key)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item=(&Key, &DVector<f64>)> {
        self.values.iter()
    }

    /// Moves all values of other into self, replacing repeated keys.
    pub fn extend(&mut self, other : VectorValues) {
        self.values.extend(other.values.into_iter());
    }

    /// Concatenates the values of the informed keys, in order.
    pub fn stack(&self, keys : &[Key]) -> Result<DVector<f64>> {
        let mut parts = Vec::with_capacity(keys.len());
        for k in keys.iter() {
            parts.push(self.at(*k)?);
        }
        let n = parts.iter().map(|p| p.nrows() ).sum();
        let mut out = DVector::zeros(n);
        let mut offset = 0;
        for p in parts {
            out.rows_mut(offset, p.nrows()).copy_from(p);
            offset += p.nrows();
        }
        Ok(out)
    }

    pub fn equals(&self, other : &VectorValues, tol : f64) -> bool {
        self.values.len() == other.values.len() && self.values.iter().all(|(k, v)| {
            other.values.get(k).map(|o| o.nrows() == v.nrows() && (o - v).amax() <= tol ).unwrap_or(false)
        })
    }

}

impl Index<Key> for VectorValues {

    type Output = DVector<f64>;

    fn index(&self, key : Key) -> &DVector<f64> {
        &self.values[&key]
    }

}

/// Gaussian noise on the rows of a linear factor. Factors without a noise model
/// are taken to carry unit noise.
#[derive(Debug, Clone, PartialEq)]
pub enum NoiseModel {

    /// Same standard deviation for all rows.
    Isotropic { dim : usize, sigma : f64 },

    /// One standard deviation per row.
    Diagonal(DVector<f64>)

}

impl NoiseModel {

    pub fn isotropic(dim : usize, sigma : f64) -> Self {
        NoiseModel::Isotropic { dim, sigma }
    }

    pub fn dim(&self) -> usize {
        match self {
            NoiseModel::Isotropic { dim, .. } => *dim,
            NoiseModel::Diagonal(s) => s.nrows()
        }
    }

    pub fn sigma(&self, row : usize) -> f64 {
        match self {
            NoiseModel::Isotropic { sigma, .. } => *sigma,
            NoiseModel::Diagonal(s) => s[row]
        }
    }

    /// Divides each row of m by its standard deviation.
    pub fn whiten(&self, m : &DMatrix<f64>) -> DMatrix<f64> {
        let mut out = m.clone();
        for i in 0..out.nrows() {
            let sigma = self.sigma(i);
            let mut row = out.row_mut(i);
            row /= sigma;
        }
        out
    }

    pub fn whiten_vector(&self, v : &DVector<f64>) -> DVector<f64> {
        DVector::from_fn(v.nrows(), |i, _| v[i] / self.sigma(i) )
    }

}

#[test]
fn stacked_values() {
    let mut vals = VectorValues::new();
    vals.insert(2, DVector::from_vec(vec![1., 2.]));
    vals.insert(1, DVector::from_vec(vec![3.]));
    let s = vals.stack(&[2, 1]).unwrap();
    assert_eq!(s, DVector::from_vec(vec![1., 2., 3.]));
    assert!(matches!(vals.stack(&[4]), Err(HybridError::MissingKey(4))));
}
