use std::f64::consts::PI;
use nalgebra::{DMatrix, DVector};
use rand::Rng;
use rand_distr::StandardNormal;
use crate::error::{HybridError, Result};
use crate::Key;
use super::{VectorValues, JacobianFactor};

/// Gaussian density over the frontal variables given the parents, in square-root
/// information form: R x_f + S x_p = d with unit noise. R is upper-triangular with a
/// positive diagonal.
#[derive(Debug, Clone, PartialEq)]
pub struct GaussianConditional {
    frontals : Vec<Key>,
    frontal_dims : Vec<usize>,
    parents : Vec<Key>,
    parent_dims : Vec<usize>,
    r : DMatrix<f64>,
    s : DMatrix<f64>,
    d : DVector<f64>
}

impl GaussianConditional {

    pub fn new(
        frontals : Vec<(Key, usize)>,
        parents : Vec<(Key, usize)>,
        r : DMatrix<f64>,
        s : DMatrix<f64>,
        d : DVector<f64>
    ) -> Result<Self> {
        let (frontals, frontal_dims) : (Vec<_>, Vec<_>) = frontals.into_iter().unzip();
        let (parents, parent_dims) : (Vec<_>, Vec<_>) = parents.into_iter().unzip();
        let nf : usize = frontal_dims.iter().sum();
        let np : usize = parent_dims.iter().sum();
        let first = frontals.first().cloned().unwrap_or(0);
        if r.nrows() != nf || r.ncols() != nf {
            return Err(HybridError::Dimension { key : first, expected : nf, found : r.ncols() });
        }
        if s.nrows() != nf || s.ncols() != np {
            return Err(HybridError::Dimension { key : parents.first().cloned().unwrap_or(first), expected : np, found : s.ncols() });
        }
        if d.nrows() != nf {
            return Err(HybridError::Dimension { key : first, expected : nf, found : d.nrows() });
        }
        Ok(Self { frontals, frontal_dims, parents, parent_dims, r, s, d })
    }

    pub fn frontals(&self) -> &[Key] {
        &self.frontals[..]
    }

    pub fn parents(&self) -> &[Key] {
        &self.parents[..]
    }

    pub fn frontal_dims(&self) -> &[usize] {
        &self.frontal_dims[..]
    }

    pub fn parent_dims(&self) -> &[usize] {
        &self.parent_dims[..]
    }

    pub fn r(&self) -> &DMatrix<f64> {
        &self.r
    }

    pub fn s(&self) -> &DMatrix<f64> {
        &self.s
    }

    pub fn d(&self) -> &DVector<f64> {
        &self.d
    }

    fn rhs(&self, values : &VectorValues) -> Result<DVector<f64>> {
        if self.parents.is_empty() {
            Ok(self.d.clone())
        } else {
            Ok(&self.d - &self.s * values.stack(&self.parents)?)
        }
    }

    fn split(&self, x : DVector<f64>) -> VectorValues {
        let mut out = VectorValues::new();
        let mut offset = 0;
        for (k, dim) in self.frontals.iter().zip(self.frontal_dims.iter()) {
            out.insert(*k, x.rows(offset, *dim).clone_owned());
            offset += dim;
        }
        out
    }

    fn back_substitute(&self, rhs : &DVector<f64>) -> Result<DVector<f64>> {
        self.r.solve_upper_triangular(rhs)
            .ok_or(HybridError::IndeterminantSystem(self.frontals.first().cloned().unwrap_or(0)))
    }

    /// Mean of the frontals given values for (at least) all parents.
    pub fn solve(&self, parents : &VectorValues) -> Result<VectorValues> {
        let rhs = self.rhs(parents)?;
        Ok(self.split(self.back_substitute(&rhs)?))
    }

    /// Draws the frontals given the parents: the mean plus R⁻¹ z, z ~ N(0, I).
    pub fn sample<R>(&self, parents : &VectorValues, rng : &mut R) -> Result<VectorValues>
    where
        R : Rng
    {
        let z = DVector::from_fn(self.d.nrows(), |_, _| rng.sample::<f64, _>(StandardNormal) );
        let rhs = self.rhs(parents)? + z;
        Ok(self.split(self.back_substitute(&rhs)?))
    }

    /// Half the squared norm of R x_f + S x_p - d.
    pub fn error(&self, values : &VectorValues) -> Result<f64> {
        let xf = values.stack(&self.frontals)?;
        let rhs = self.rhs(values)?;
        Ok(0.5 * (&self.r * xf - rhs).norm_squared())
    }

    /// Log of the normalization constant: sum of ln|R_ii| - n/2 ln 2π.
    pub fn log_normalization_constant(&self) -> f64 {
        let n = self.d.nrows() as f64;
        self.r.diagonal().iter().map(|v| v.abs().ln() ).sum::<f64>() - 0.5 * n * (2. * PI).ln()
    }

    pub fn log_density(&self, values : &VectorValues) -> Result<f64> {
        Ok(self.log_normalization_constant() - self.error(values)?)
    }

    /// Converts back into a linear factor over frontals and parents (unit noise).
    pub fn to_factor(&self) -> Result<JacobianFactor> {
        let mut terms = Vec::with_capacity(self.frontals.len() + self.parents.len());
        let mut offset = 0;
        for (k, dim) in self.frontals.iter().zip(self.frontal_dims.iter()) {
            terms.push((*k, self.r.columns(offset, *dim).clone_owned()));
            offset += dim;
        }
        offset = 0;
        for (k, dim) in self.parents.iter().zip(self.parent_dims.iter()) {
            terms.push((*k, self.s.columns(offset, *dim).clone_owned()));
            offset += dim;
        }
        JacobianFactor::new(terms, self.d.clone(), None)
    }

    pub fn equals(&self, other : &GaussianConditional, tol : f64) -> bool {
        self.frontals == other.frontals && self.parents == other.parents &&
            self.frontal_dims == other.frontal_dims && self.parent_dims == other.parent_dims &&
            (&self.r - &other.r).amax() <= tol && (&self.s - &other.s).amax() <= tol &&
            (&self.d - &other.d).amax() <= tol
    }

}
