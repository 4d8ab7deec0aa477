use rand::Rng;
use serde::{Serialize, Deserialize};
use crate::error::{HybridError, Result};
use crate::Key;
use super::{DiscreteKey, Assignment, DecisionTreeFactor};

/// Conditional distribution P(frontals | parents) over discrete variables. When produced
/// by max-product elimination, the table holds the unnormalized product of the eliminated
/// factors instead (a lookup table), which still supports argmax but does not sum to one.
#[derive(Debug, Clone)]
pub struct DiscreteConditional {
    frontals : Vec<DiscreteKey>,
    parents : Vec<DiscreteKey>,
    factor : DecisionTreeFactor
}

impl DiscreteConditional {

    /// Builds P(key | parents) from a signature such as "1/2 3/2": one slash-separated row of
    /// relative weights per parent assignment (parents in row-major order), each row
    /// holding one weight per value of key. Rows are normalized.
    pub fn from_signature(key : DiscreteKey, parents : &[DiscreteKey], signature : &str) -> Result<Self> {
        let rows : Vec<&str> = signature.split_whitespace().collect();
        let nr_rows = super::nr_assignments(parents);
        if rows.len() != nr_rows {
            return Err(HybridError::LeafCount { expected : nr_rows, found : rows.len() });
        }
        let mut values = Vec::with_capacity(nr_rows * key.cardinality);
        for row in rows.iter() {
            let weights = row.split('/')
                .map(|s| s.parse::<f64>().map_err(|_| HybridError::Table(format!("Invalid weight {} in row {}", s, row)) ) )
                .collect::<Result<Vec<_>>>()?;
            if weights.len() != key.cardinality {
                return Err(HybridError::Table(format!("Row {} should have {} entries", row, key.cardinality)));
            }
            let total : f64 = weights.iter().sum();
            if !(total > 0.0) || weights.iter().any(|w| *w < 0.0 ) {
                return Err(HybridError::Table(format!("Row {} does not hold valid weights", row)));
            }
            values.extend(weights.iter().map(|w| w / total ));
        }
        let mut keys = parents.to_vec();
        keys.push(key);
        let factor = DecisionTreeFactor::from_values(&keys, values)?;
        Ok(Self { frontals : vec![key], parents : parents.to_vec(), factor })
    }

    /// Interprets a factor as a conditional over the informed frontal keys; all remaining
    /// keys of the factor become parents.
    pub fn from_factor(frontals : &[Key], factor : DecisionTreeFactor) -> Self {
        let (frontals, parents) : (Vec<DiscreteKey>, Vec<DiscreteKey>) = factor.keys()
            .iter()
            .cloned()
            .partition(|k| frontals.contains(&k.key) );
        Self { frontals, parents, factor }
    }

    pub fn frontals(&self) -> &[DiscreteKey] {
        &self.frontals[..]
    }

    pub fn parents(&self) -> &[DiscreteKey] {
        &self.parents[..]
    }

    pub fn as_factor(&self) -> &DecisionTreeFactor {
        &self.factor
    }

    pub fn get(&self, assignment : &Assignment) -> Result<f64> {
        self.factor.get(assignment)
    }

    pub fn log_probability(&self, assignment : &Assignment) -> Result<f64> {
        Ok(self.get(assignment)?.ln())
    }

    /// Most probable frontal assignment given values for the parents (which can
    /// be part of a larger assignment). Ties resolve to the first assignment in row-major order.
    pub fn argmax(&self, parents : &Assignment) -> Result<Assignment> {
        let mut best : Option<(Assignment, f64)> = None;
        for frontal in super::cartesian_product(&self.frontals) {
            let mut full = parents.clone();
            full.extend(frontal.iter());
            let v = self.get(&full)?;
            if best.as_ref().map(|(_, b)| v > *b ).unwrap_or(true) {
                best = Some((frontal, v));
            }
        }
        best.map(|(a, _)| a ).ok_or(HybridError::Table(String::from("Conditional without frontal values")))
    }

    /// Draws frontal values given the parents, weighting each frontal assignment by its
    /// table value (so lookup tables are sampled as if normalized).
    pub fn sample<R>(&self, parents : &Assignment, rng : &mut R) -> Result<Assignment>
    where
        R : Rng
    {
        let candidates = super::cartesian_product(&self.frontals);
        let mut weights = Vec::with_capacity(candidates.len());
        for frontal in candidates.iter() {
            let mut full = parents.clone();
            full.extend(frontal.iter());
            weights.push(self.get(&full)?);
        }
        let total : f64 = weights.iter().sum();
        if !(total > 0.0) {
            return Err(HybridError::Table(format!("Zero-probability row for parents {:?}", parents)));
        }
        let u = rng.gen::<f64>() * total;
        let mut acc = 0.0;
        for (frontal, w) in candidates.iter().zip(weights.iter()) {
            acc += w;
            if u < acc {
                return Ok(frontal.clone());
            }
        }
        candidates.into_iter()
            .zip(weights.into_iter())
            .filter(|(_, w)| *w > 0.0 )
            .last()
            .map(|(a, _)| a )
            .ok_or(HybridError::Table(String::from("Conditional without frontal values")))
    }

    /// Same conditional with only its max_nr_leaves most probable entries retained.
    pub fn prune(&self, max_nr_leaves : usize) -> Self {
        Self {
            frontals : self.frontals.clone(),
            parents : self.parents.clone(),
            factor : self.factor.prune(max_nr_leaves)
        }
    }

    pub fn equals(&self, other : &DiscreteConditional, tol : f64) -> bool {
        let mut mine : Vec<_> = self.frontals.clone();
        let mut theirs : Vec<_> = other.frontals.clone();
        mine.sort();
        theirs.sort();
        mine == theirs && self.factor.equals(&other.factor, tol)
    }

}

/// Strategy used to eliminate discrete frontal variables from the product of all
/// discrete factors touching them. Returns the conditional on the frontals and the
/// factor left on the separator.
pub trait DiscreteEliminator {

    fn eliminate(&self, product : &DecisionTreeFactor, frontals : &[Key]) -> (DiscreteConditional, DecisionTreeFactor);

}

/// Marginalization: the separator factor is the sum over the frontals, and the conditional
/// is the product divided by it.
#[derive(Debug, Clone, Copy, Default)]
pub struct SumProduct;

/// MPE elimination: the conditional is a lookup table holding the product itself,
/// and the separator factor is its maximum over the frontals.
#[derive(Debug, Clone, Copy, Default)]
pub struct MaxProduct;

impl DiscreteEliminator for SumProduct {

    fn eliminate(&self, product : &DecisionTreeFactor, frontals : &[Key]) -> (DiscreteConditional, DecisionTreeFactor) {
        let marginal = product.sum_out(frontals);
        let cond = DiscreteConditional::from_factor(frontals, product.divide(&marginal));
        (cond, marginal)
    }

}

impl DiscreteEliminator for MaxProduct {

    fn eliminate(&self, product : &DecisionTreeFactor, frontals : &[Key]) -> (DiscreteConditional, DecisionTreeFactor) {
        let separator = product.max_out(frontals);
        (DiscreteConditional::from_factor(frontals, product.clone()), separator)
    }

}

/// Serializable choice of the discrete elimination strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EliminationKind {
    MaxProduct,
    SumProduct
}

impl Default for EliminationKind {

    fn default() -> Self {
        EliminationKind::MaxProduct
    }

}

impl EliminationKind {

    pub fn eliminator(&self) -> &'static dyn DiscreteEliminator {
        match self {
            EliminationKind::MaxProduct => &MaxProduct,
            EliminationKind::SumProduct => &SumProduct
        }
    }

}
