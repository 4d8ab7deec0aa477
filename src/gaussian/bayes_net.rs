use std::rc::Rc;
use std::ops::Index;
use rand::Rng;
use crate::error::{HybridError, Result};
use super::{GaussianConditional, VectorValues};

/// Gaussian conditionals in elimination order: each conditional only has parents
/// among the frontals of the conditionals that follow it.
#[derive(Debug, Clone, Default)]
pub struct GaussianBayesNet {
    conditionals : Vec<Rc<GaussianConditional>>
}

impl GaussianBayesNet {

    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, cond : Rc<GaussianConditional>) {
        self.conditionals.push(cond);
    }

    pub fn len(&self) -> usize {
        self.conditionals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.conditionals.is_empty()
    }

    pub fn at(&self, ix : usize) -> Result<&GaussianConditional> {
        self.conditionals.get(ix)
            .map(|c| c.as_ref() )
            .ok_or(HybridError::OutOfBounds { index : ix, len : self.conditionals.len() })
    }

    pub fn iter(&self) -> impl Iterator<Item=&Rc<GaussianConditional>> {
        self.conditionals.iter()
    }

    /// Most probable values, obtained by back-substitution from the last conditional.
    pub fn optimize(&self) -> Result<VectorValues> {
        let mut values = VectorValues::new();
        for c in self.conditionals.iter().rev() {
            let sol = c.solve(&values)?;
            values.extend(sol);
        }
        Ok(values)
    }

    /// Ancestral sample, drawn from the last conditional to the first.
    pub fn sample<R>(&self, rng : &mut R) -> Result<VectorValues>
    where
        R : Rng
    {
        let mut values = VectorValues::new();
        for c in self.conditionals.iter().rev() {
            let sol = c.sample(&values, rng)?;
            values.extend(sol);
        }
        Ok(values)
    }

    pub fn log_density(&self, values : &VectorValues) -> Result<f64> {
        let mut total = 0.0;
        for c in self.conditionals.iter() {
            total += c.log_density(values)?;
        }
        Ok(total)
    }

    pub fn error(&self, values : &VectorValues) -> Result<f64> {
        let mut total = 0.0;
        for c in self.conditionals.iter() {
            total += c.error(values)?;
        }
        Ok(total)
    }

    pub fn equals(&self, other : &GaussianBayesNet, tol : f64) -> bool {
        self.len() == other.len() &&
            self.conditionals.iter().zip(other.conditionals.iter()).all(|(a, b)| a.equals(b, tol) )
    }

}

impl Index<usize> for GaussianBayesNet {

    type Output = GaussianConditional;

    fn index(&self, ix : usize) -> &GaussianConditional {
        &self.conditionals[ix]
    }

}
