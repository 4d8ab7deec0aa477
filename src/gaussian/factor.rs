use nalgebra::{DMatrix, DVector};
use crate::error::{HybridError, Result};
use crate::Key;
use super::{VectorValues, NoiseModel};

/// Linear-Gaussian factor with error 0.5 ||W (A x - b)||², where A is partitioned
/// into one column block per variable and W whitens the rows by the noise model.
#[derive(Debug, Clone, PartialEq)]
pub struct JacobianFactor {
    keys : Vec<Key>,
    dims : Vec<usize>,
    a : DMatrix<f64>,
    b : DVector<f64>,
    noise : Option<NoiseModel>
}

impl JacobianFactor {

    /// Builds a factor from one (key, block) pair per variable. All blocks and b
    /// must have the same number of rows.
    pub fn new(terms : Vec<(Key, DMatrix<f64>)>, b : DVector<f64>, noise : Option<NoiseModel>) -> Result<Self> {
        let rows = b.nrows();
        let mut keys = Vec::with_capacity(terms.len());
        let mut dims = Vec::with_capacity(terms.len());
        for (k, m) in terms.iter() {
            if keys.contains(k) {
                return Err(HybridError::DuplicateKey(*k));
            }
            if m.nrows() != rows {
                return Err(HybridError::Dimension { key : *k, expected : rows, found : m.nrows() });
            }
            keys.push(*k);
            dims.push(m.ncols());
        }
        if let Some(n) = &noise {
            if n.dim() != rows {
                return Err(HybridError::Dimension { key : keys.first().cloned().unwrap_or(0), expected : rows, found : n.dim() });
            }
        }
        let mut a = DMatrix::zeros(rows, dims.iter().sum());
        let mut offset = 0;
        for (_, m) in terms.iter() {
            a.columns_mut(offset, m.ncols()).copy_from(m);
            offset += m.ncols();
        }
        Ok(Self { keys, dims, a, b, noise })
    }

    /// Unary factor a x = b with isotropic noise sigma.
    pub fn unary(key : Key, a : DMatrix<f64>, b : DVector<f64>, sigma : f64) -> Result<Self> {
        let dim = b.nrows();
        Self::new(vec![(key, a)], b, Some(NoiseModel::isotropic(dim, sigma)))
    }

    /// Binary factor a1 x1 + a2 x2 = b with isotropic noise sigma.
    pub fn binary(
        k1 : Key,
        a1 : DMatrix<f64>,
        k2 : Key,
        a2 : DMatrix<f64>,
        b : DVector<f64>,
        sigma : f64
    ) -> Result<Self> {
        let dim = b.nrows();
        Self::new(vec![(k1, a1), (k2, a2)], b, Some(NoiseModel::isotropic(dim, sigma)))
    }

    pub fn keys(&self) -> &[Key] {
        &self.keys[..]
    }

    pub fn dims(&self) -> &[usize] {
        &self.dims[..]
    }

    pub fn dim(&self, key : Key) -> Option<usize> {
        self.keys.iter().position(|k| *k == key ).map(|i| self.dims[i] )
    }

    pub fn rows(&self) -> usize {
        self.b.nrows()
    }

    pub fn noise(&self) -> Option<&NoiseModel> {
        self.noise.as_ref()
    }

    pub fn b(&self) -> &DVector<f64> {
        &self.b
    }

    /// Column block of A associated with key.
    pub fn block(&self, key : Key) -> Option<DMatrix<f64>> {
        let pos = self.keys.iter().position(|k| *k == key )?;
        let offset : usize = self.dims[..pos].iter().sum();
        Some(self.a.columns(offset, self.dims[pos]).clone_owned())
    }

    /// A and b with rows divided by the noise standard deviations.
    pub fn whitened(&self) -> (DMatrix<f64>, DVector<f64>) {
        match &self.noise {
            Some(n) => (n.whiten(&self.a), n.whiten_vector(&self.b)),
            None => (self.a.clone(), self.b.clone())
        }
    }

    /// Whitened residual A x - b at values holding all keys of this factor.
    pub fn residual(&self, values : &VectorValues) -> Result<DVector<f64>> {
        let x = values.stack(&self.keys)?;
        if x.nrows() != self.a.ncols() {
            return Err(HybridError::Dimension { key : self.keys[0], expected : self.a.ncols(), found : x.nrows() });
        }
        let (a, b) = self.whitened();
        Ok(a * x - b)
    }

    pub fn error(&self, values : &VectorValues) -> Result<f64> {
        Ok(0.5 * self.residual(values)?.norm_squared())
    }

    /// Error at x = 0; for a factor without keys, this is the squared norm of
    /// the residual left by elimination.
    pub fn constant_error(&self) -> f64 {
        let (_, b) = self.whitened();
        0.5 * b.norm_squared()
    }

    pub fn equals(&self, other : &JacobianFactor, tol : f64) -> bool {
        let (a1, b1) = self.whitened();
        let (a2, b2) = other.whitened();
        self.keys == other.keys && self.dims == other.dims && a1.shape() == a2.shape() &&
            b1.nrows() == b2.nrows() && (a1 - a2).amax() <= tol && (b1 - b2).amax() <= tol
    }

}

#[cfg(test)]
mod tests {

    use super::*;

    #[test]
    fn error_is_whitened() {
        let f = JacobianFactor::unary(1, DMatrix::from_element(1, 1, 1.0), DVector::from_element(1, 1.0), 0.1).unwrap();
        let mut vals = VectorValues::new();
        vals.insert(1, DVector::from_element(1, 0.0));
        assert!((f.error(&vals).unwrap() - 50.0).abs() < 1E-9);
        assert!((f.constant_error() - 50.0).abs() < 1E-9);
    }

    #[test]
    fn blocks_must_agree_in_rows() {
        let res = JacobianFactor::binary(
            1,
            DMatrix::from_element(2, 1, 1.0),
            2,
            DMatrix::from_element(1, 1, 1.0),
            DVector::zeros(2),
            1.0
        );
        assert!(matches!(res, Err(HybridError::Dimension { key : 2, expected : 2, found : 1 })));
        let f = JacobianFactor::binary(
            1,
            DMatrix::from_element(1, 1, -1.0),
            2,
            DMatrix::from_element(1, 2, 2.0),
            DVector::zeros(1),
            1.0
        ).unwrap();
        assert_eq!(f.block(2).unwrap(), DMatrix::from_element(1, 2, 2.0));
        assert_eq!(f.dim(2), Some(2));
    }

}
