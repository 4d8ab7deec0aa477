use std::ops::Index;
use std::rc::Rc;
use rand::Rng;
use crate::error::{HybridError, Result};
use crate::discrete::{DiscreteKey, Assignment, DecisionTreeFactor, DiscreteConditional};
use crate::gaussian::GaussianBayesNet;
use super::conditional::HybridConditional;
use super::mixture::GaussianMixture;
use super::HybridValues;

/// Hybrid conditionals in elimination order. Every conditional only has parents among
/// the frontals of the conditionals that follow it, so the net is evaluated (or sampled)
/// from the last conditional to the first.
#[derive(Debug, Clone, Default)]
pub struct HybridBayesNet {
    conditionals : Vec<HybridConditional>
}

impl HybridBayesNet {

    pub fn new() -> Self {
        Self::default()
    }

    pub fn push<C>(&mut self, cond : C)
    where
        C : Into<HybridConditional>
    {
        self.conditionals.push(cond.into());
    }

    /// Appends a root prior over key, given by a signature such as "1/1".
    pub fn add_discrete(&mut self, key : DiscreteKey, table : &str) -> Result<()> {
        let prior = DiscreteConditional::from_signature(key, &[], table)?;
        self.conditionals.push(HybridConditional::Discrete(Rc::new(prior)));
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.conditionals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.conditionals.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item=&HybridConditional> {
        self.conditionals.iter()
    }

    pub fn at(&self, ix : usize) -> Result<&HybridConditional> {
        self.conditionals.get(ix).ok_or(HybridError::OutOfBounds { index : ix, len : self.conditionals.len() })
    }

    /// The mixture at position ix, or None if the conditional there is of another kind.
    pub fn at_mixture(&self, ix : usize) -> Result<Option<&Rc<GaussianMixture>>> {
        Ok(self.at(ix)?.as_mixture())
    }

    /// The discrete conditional at position ix, or None if the conditional there is of another kind.
    pub fn at_discrete(&self, ix : usize) -> Result<Option<&Rc<DiscreteConditional>>> {
        Ok(self.at(ix)?.as_discrete())
    }

    /// Gaussian Bayes net for a fixed discrete assignment: mixtures are replaced by the conditional
    /// the assignment selects, Gaussian conditionals are kept and discrete conditionals are skipped.
    pub fn choose(&self, assignment : &Assignment) -> Result<GaussianBayesNet> {
        let mut net = GaussianBayesNet::new();
        for cond in self.conditionals.iter() {
            match cond {
                HybridConditional::Gaussian(c) => net.push(c.clone()),
                HybridConditional::Mixture(m) => {
                    match m.conditional(assignment)? {
                        Some(c) => net.push(c),
                        None => {
                            return Err(HybridError::PrunedComponent(m.discrete_keys().iter().map(|k| k.key ).collect()));
                        }
                    }
                },
                HybridConditional::Discrete(_) => { }
            }
        }
        Ok(net)
    }

    /// Nulls the leaves of every mixture that have no nonzero extension in the factor. Other
    /// conditionals are shared with self.
    pub fn prune(&self, factor : &DecisionTreeFactor) -> HybridBayesNet {
        let conditionals = self.conditionals.iter().map(|c| {
            match c {
                HybridConditional::Mixture(m) => HybridConditional::Mixture(Rc::new(m.prune(factor))),
                other => other.clone()
            }
        }).collect();
        Self { conditionals }
    }

    /// Sum of the log-probabilities of the discrete conditionals and the log-densities of the
    /// Gaussian conditionals (for mixtures, of the component selected by the discrete values).
    pub fn log_probability(&self, values : &HybridValues) -> Result<f64> {
        let mut total = 0.0;
        for cond in self.conditionals.iter() {
            total += match cond {
                HybridConditional::Gaussian(c) => c.log_density(&values.continuous)?,
                HybridConditional::Mixture(m) => m.log_density(&values.continuous, &values.discrete)?,
                HybridConditional::Discrete(d) => d.log_probability(&values.discrete)?
            };
        }
        Ok(total)
    }

    /// Most probable discrete assignment, found by maximizing each discrete conditional given its
    /// parents from the last to the first.
    pub fn mpe(&self) -> Result<Assignment> {
        let mut assignment = Assignment::new();
        for cond in self.conditionals.iter().rev() {
            if let HybridConditional::Discrete(d) = cond {
                let best = d.argmax(&assignment)?;
                assignment.extend(best.into_iter());
            }
        }
        Ok(assignment)
    }

    /// MPE assignment together with the most probable continuous values of the Gaussian
    /// Bayes net it selects.
    pub fn optimize(&self) -> Result<HybridValues> {
        let discrete = self.mpe()?;
        let continuous = self.choose(&discrete)?.optimize()?;
        Ok(HybridValues { discrete, continuous })
    }

    /// Ancestral sample of all variables.
    pub fn sample<R>(&self, rng : &mut R) -> Result<HybridValues>
    where
        R : Rng
    {
        let mut values = HybridValues::default();
        for cond in self.conditionals.iter().rev() {
            match cond {
                HybridConditional::Discrete(d) => {
                    let s = d.sample(&values.discrete, rng)?;
                    values.discrete.extend(s.into_iter());
                },
                HybridConditional::Gaussian(c) => {
                    let s = c.sample(&values.continuous, rng)?;
                    values.continuous.extend(s);
                },
                HybridConditional::Mixture(m) => {
                    let c = m.conditional(&values.discrete)?
                        .ok_or(HybridError::PrunedComponent(m.discrete_keys().iter().map(|k| k.key ).collect()))?;
                    let s = c.sample(&values.continuous, rng)?;
                    values.continuous.extend(s);
                }
            }
        }
        Ok(values)
    }

}

impl Index<usize> for HybridBayesNet {

    type Output = HybridConditional;

    fn index(&self, ix : usize) -> &HybridConditional {
        &self.conditionals[ix]
    }

}

#[cfg(test)]
mod tests {

    use super::*;
    use nalgebra::{DMatrix, DVector};
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use crate::gaussian::GaussianConditional;

    fn mode() -> DiscreteKey {
        DiscreteKey::new(10, 2)
    }

    fn net() -> HybridBayesNet {
        let comps = vec![0.0, 5.0].into_iter().map(|mean| {
            Some(GaussianConditional::new(
                vec![(1, 1)],
                vec![],
                DMatrix::from_element(1, 1, 1.),
                DMatrix::zeros(1, 0),
                DVector::from_element(1, mean)
            ).unwrap())
        }).collect();
        let mut net = HybridBayesNet::new();
        net.push(GaussianMixture::new(vec![1], vec![], &[mode()], comps).unwrap());
        net.add_discrete(mode(), "1/3").unwrap();
        net
    }

    #[test]
    fn optimize_picks_mode_then_mean() {
        let sol = net().optimize().unwrap();
        assert_eq!(sol.discrete[&10], 1);
        assert!((sol.continuous[1][0] - 5.0).abs() < 1E-12);
    }

    #[test]
    fn accessors_check_kind_and_bounds() {
        let net = net();
        assert!(net.at_mixture(0).unwrap().is_some());
        assert!(net.at_discrete(0).unwrap().is_none());
        assert!(net.at_discrete(1).unwrap().is_some());
        assert!(matches!(net.at(2), Err(HybridError::OutOfBounds { .. })));
        assert!(matches!(net.choose(&Assignment::new()), Err(HybridError::MissingAssignment(10))));
    }

    #[test]
    fn pruned_mode_cannot_be_chosen() {
        let keep_second = DecisionTreeFactor::from_table(&[mode()], "0 1").unwrap();
        let pruned = net().prune(&keep_second);
        let first : Assignment = vec![(10, 0)].into_iter().collect();
        assert!(matches!(pruned.choose(&first), Err(HybridError::PrunedComponent(_))));
        let second : Assignment = vec![(10, 1)].into_iter().collect();
        assert_eq!(pruned.choose(&second).unwrap().len(), 1);
    }

    #[test]
    fn samples_are_consistent() {
        let mut rng = StdRng::seed_from_u64(42);
        let net = net();
        for _ in 0..10 {
            let s = net.sample(&mut rng).unwrap();
            assert!(net.log_probability(&s).unwrap().is_finite());
        }
    }

}
