use std::rc::Rc;
use tracing::{debug, trace};
use crate::error::{HybridError, Result};
use crate::Key;
use crate::discrete::{DiscreteKey, DecisionTree, DecisionTreeFactor};
use crate::discrete::conditional::DiscreteEliminator;
use crate::gaussian::{self, JacobianFactor, GaussianConditional};
use super::factor::HybridFactor;
use super::conditional::HybridConditional;
use super::mixture::{GaussianMixture, GaussianMixtureFactor, GaussianSum};

type Slice = Option<(Rc<GaussianConditional>, Rc<JacobianFactor>)>;

/// Eliminates the frontal variables from the factors touching them, producing
/// the conditional on the frontals and at most one factor on the separator
/// (None when the separator has no keys).
///
/// Frontals must be all discrete or all continuous. For continuous frontals, the step is
/// purely Gaussian when no mixture factor is present. Otherwise the step is indexed by the
/// union of the discrete keys of the mixtures, sorted by key, and the Gaussian system selected
/// by each assignment of this index is triangularized independently. Assignments whose
/// system is rank-deficient (or that select a pruned component) yield a null conditional.
/// When no continuous variable is left on the separator, the step leaves behind a discrete
/// factor weighting each assignment by exp(-½‖r‖²), r being the whitened residual of its system.
pub fn eliminate_hybrid(
    factors : &[HybridFactor],
    frontals : &[Key],
    eliminator : &dyn DiscreteEliminator
) -> Result<(HybridConditional, Option<HybridFactor>)> {
    let continuous : Vec<Key> = factors.iter().flat_map(|f| f.continuous_keys() ).collect();
    let discrete : Vec<Key> = factors.iter().flat_map(|f| f.discrete_keys().into_iter().map(|k| k.key ) ).collect();
    let nr_discrete = frontals.iter().filter(|f| discrete.contains(*f) ).count();
    for f in frontals.iter() {
        if !continuous.contains(f) && !discrete.contains(f) {
            return Err(HybridError::MissingKey(*f));
        }
    }
    debug!("Eliminating {:?} from {} factors", frontals, factors.len());
    if nr_discrete == frontals.len() {
        if let Some(c) = continuous.first() {
            return Err(HybridError::Ordering { discrete : frontals[0], continuous : *c });
        }
        eliminate_discrete(factors, frontals, eliminator)
    } else if nr_discrete > 0 {
        let d = frontals.iter().find(|f| discrete.contains(*f) ).cloned().unwrap_or(0);
        let c = frontals.iter().find(|f| continuous.contains(*f) ).cloned().unwrap_or(0);
        Err(HybridError::Ordering { discrete : d, continuous : c })
    } else if factors.iter().any(|f| f.is_hybrid() ) {
        eliminate_mixed(factors, frontals)
    } else {
        eliminate_continuous(factors, frontals)
    }
}

fn eliminate_discrete(
    factors : &[HybridFactor],
    frontals : &[Key],
    eliminator : &dyn DiscreteEliminator
) -> Result<(HybridConditional, Option<HybridFactor>)> {
    let mut product = DecisionTreeFactor::constant(1.0);
    for f in factors.iter() {
        if let Some(d) = f.as_discrete() {
            product = product.multiply(d);
        }
    }
    let (cond, sep) = eliminator.eliminate(&product, frontals);
    let remainder = if sep.keys().is_empty() {
        None
    } else {
        Some(HybridFactor::Discrete(Rc::new(sep)))
    };
    Ok((HybridConditional::Discrete(Rc::new(cond)), remainder))
}

fn gaussian_factors(factors : &[HybridFactor], frontals : &[Key]) -> Result<Vec<Rc<JacobianFactor>>> {
    let mut out = Vec::new();
    for f in factors.iter() {
        match f {
            HybridFactor::Gaussian(g) => out.push(g.clone()),
            HybridFactor::Discrete(_) => {
                return Err(HybridError::UnexpectedFactor { frontal : frontals.first().cloned().unwrap_or(0) });
            },
            HybridFactor::Mixture(_) => { }
        }
    }
    Ok(out)
}

fn eliminate_continuous(factors : &[HybridFactor], frontals : &[Key]) -> Result<(HybridConditional, Option<HybridFactor>)> {
    let gaussians = gaussian_factors(factors, frontals)?;
    let refs : Vec<&JacobianFactor> = gaussians.iter().map(|f| f.as_ref() ).collect();
    let (cond, rem) = gaussian::eliminate(&refs, frontals)?;
    let remainder = if rem.keys().is_empty() {
        None
    } else {
        Some(HybridFactor::Gaussian(Rc::new(rem)))
    };
    Ok((HybridConditional::Gaussian(Rc::new(cond)), remainder))
}

/// Discrete keys of all mixtures, sorted by key.
fn mixture_index(factors : &[HybridFactor]) -> Vec<DiscreteKey> {
    let mut index : Vec<DiscreteKey> = Vec::new();
    for m in factors.iter().filter_map(|f| f.as_mixture() ) {
        for k in m.discrete_keys() {
            if !index.iter().any(|i| i.key == k.key ) {
                index.push(*k);
            }
        }
    }
    index.sort_by_key(|k| k.key );
    index
}

fn eliminate_mixed(factors : &[HybridFactor], frontals : &[Key]) -> Result<(HybridConditional, Option<HybridFactor>)> {
    let gaussians = gaussian_factors(factors, frontals)?;
    let index = mixture_index(factors);
    let mut sum : GaussianSum = DecisionTree::build(&index, |_| Some(gaussians.clone()) );
    for m in factors.iter().filter_map(|f| f.as_mixture() ) {
        sum = m.add(&sum);
    }

    let slices : DecisionTree<Slice> = sum.try_map(|slice| {
        match slice {
            Some(fs) => {
                let refs : Vec<&JacobianFactor> = fs.iter().map(|f| f.as_ref() ).collect();
                match gaussian::eliminate(&refs, frontals) {
                    Ok((c, r)) => Ok(Some((Rc::new(c), Rc::new(r)))),
                    Err(HybridError::IndeterminantSystem(k)) => {
                        trace!("Degenerate slice when eliminating {:?} (variable {})", frontals, k);
                        Ok(None)
                    },
                    Err(e) => Err(e)
                }
            },
            None => Ok(None)
        }
    })?;

    let mut separator : Vec<Key> = factors.iter()
        .flat_map(|f| f.continuous_keys() )
        .filter(|k| !frontals.contains(k) )
        .collect();
    separator.sort();
    separator.dedup();

    let conditionals = slices.map(|s| s.as_ref().map(|(c, _)| c.clone() ) );
    let mixture = GaussianMixture::from_tree(frontals.to_vec(), separator.clone(), index.clone(), conditionals);
    let remainder = if separator.is_empty() {
        if index.is_empty() {
            None
        } else {
            let weights = slices.map(|s| {
                match s {
                    Some((_, r)) => (-r.constant_error()).exp(),
                    None => 0.0
                }
            });
            Some(HybridFactor::Discrete(Rc::new(DecisionTreeFactor::from_tree(weights))))
        }
    } else {
        let components = slices.map(|s| s.as_ref().map(|(_, r)| r.clone() ) );
        Some(HybridFactor::Mixture(Rc::new(GaussianMixtureFactor::from_tree(separator, index, components))))
    };
    Ok((HybridConditional::Mixture(Rc::new(mixture)), remainder))
}

#[cfg(test)]
mod tests {

    use super::*;
    use nalgebra::{DMatrix, DVector};
    use crate::discrete::Assignment;
    use crate::discrete::conditional::{MaxProduct, SumProduct};

    fn scalar(v : f64) -> DMatrix<f64> {
        DMatrix::from_element(1, 1, v)
    }

    fn two_mode_measurement() -> HybridFactor {
        let comps = vec![
            Some(JacobianFactor::unary(1, scalar(1.), DVector::from_element(1, 0.), 1.0).unwrap()),
            Some(JacobianFactor::unary(1, scalar(1.), DVector::from_element(1, 2.), 1.0).unwrap())
        ];
        GaussianMixtureFactor::new(vec![1], &[DiscreteKey::new(5, 2)], comps).unwrap().into()
    }

    #[test]
    fn mixed_step_leaves_weights() {
        let prior : HybridFactor = JacobianFactor::unary(1, scalar(1.), DVector::from_element(1, 0.), 1.0).unwrap().into();
        let (cond, rem) = eliminate_hybrid(&[prior, two_mode_measurement()], &[1], &MaxProduct).unwrap();
        let mix = cond.as_mixture().unwrap();
        assert_eq!(mix.nr_components(), 2);
        let rem = rem.unwrap();
        let weights = rem.as_discrete().unwrap();
        let a0 : Assignment = vec![(5, 0)].into_iter().collect();
        let a1 : Assignment = vec![(5, 1)].into_iter().collect();
        assert!((weights.get(&a0).unwrap() - 1.0).abs() < 1E-9);
        assert!((weights.get(&a1).unwrap() - (-1.0f64).exp()).abs() < 1E-9);
        let c1 = mix.conditional(&a1).unwrap().unwrap();
        assert!((c1.solve(&Default::default()).unwrap()[1][0] - 1.0).abs() < 1E-9);
    }

    #[test]
    fn degenerate_slice_is_nulled() {
        let comps = vec![
            Some(JacobianFactor::unary(1, scalar(1.), DVector::from_element(1, 0.), 1.0).unwrap()),
            Some(JacobianFactor::unary(1, scalar(0.), DVector::from_element(1, 0.), 1.0).unwrap())
        ];
        let mix : HybridFactor = GaussianMixtureFactor::new(vec![1], &[DiscreteKey::new(5, 2)], comps).unwrap().into();
        let (cond, rem) = eliminate_hybrid(&[mix], &[1], &MaxProduct).unwrap();
        assert_eq!(cond.as_mixture().unwrap().nr_components(), 1);
        let a1 : Assignment = vec![(5, 1)].into_iter().collect();
        assert_eq!(rem.unwrap().as_discrete().unwrap().get(&a1).unwrap(), 0.0);
    }

    #[test]
    fn discrete_frontal_with_continuous_factor_fails() {
        let err = eliminate_hybrid(&[two_mode_measurement()], &[5], &SumProduct);
        assert!(matches!(err, Err(HybridError::Ordering { discrete : 5, continuous : 1 })));
    }

    #[test]
    fn pure_gaussian_singularity_is_an_error() {
        let f : HybridFactor = JacobianFactor::unary(1, scalar(0.), DVector::from_element(1, 0.), 1.0).unwrap().into();
        assert!(matches!(eliminate_hybrid(&[f], &[1], &MaxProduct), Err(HybridError::IndeterminantSystem(1))));
    }

}
