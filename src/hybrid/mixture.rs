use std::rc::Rc;
use crate::error::{HybridError, Result};
use crate::Key;
use crate::discrete::{self, DiscreteKey, Assignment, DecisionTree, DecisionTreeFactor};
use crate::gaussian::{JacobianFactor, GaussianConditional, VectorValues};

/// Collections of Gaussian factors indexed by discrete assignment. A null leaf means
/// some component contributing to that assignment was pruned away.
pub type GaussianSum = DecisionTree<Option<Vec<Rc<JacobianFactor>>>>;

fn sorted(keys : &[Key]) -> Vec<Key> {
    let mut keys = keys.to_vec();
    keys.sort();
    keys
}

fn check_disjoint(continuous : &[Key], discrete : &[DiscreteKey]) -> Result<()> {
    match discrete.iter().find(|d| continuous.contains(&d.key) ) {
        Some(d) => Err(HybridError::KeyKind(d.key)),
        None => Ok(())
    }
}

/// Linear-Gaussian factor whose parameters depend on the values of a set of discrete
/// variables: a decision tree with one (possibly null) Jacobian factor per discrete
/// assignment. All components are defined over the same continuous keys.
#[derive(Debug, Clone)]
pub struct GaussianMixtureFactor {
    continuous_keys : Vec<Key>,
    discrete_keys : Vec<DiscreteKey>,
    factors : DecisionTree<Option<Rc<JacobianFactor>>>
}

impl GaussianMixtureFactor {

    /// Builds a mixture factor from a row-major list of components over discrete_keys
    /// (the first key most significant). Every non-null component must be defined over
    /// exactly continuous_keys.
    pub fn new(
        continuous_keys : Vec<Key>,
        discrete_keys : &[DiscreteKey],
        components : Vec<Option<JacobianFactor>>
    ) -> Result<Self> {
        check_disjoint(&continuous_keys, discrete_keys)?;
        let expected = sorted(&continuous_keys);
        for c in components.iter().flatten() {
            let found = sorted(c.keys());
            if found != expected {
                return Err(HybridError::ComponentKeys { expected : continuous_keys.clone(), found : c.keys().to_vec() });
            }
        }
        let leaves = components.into_iter().map(|c| c.map(Rc::new) ).collect();
        let factors = DecisionTree::from_leaves(discrete_keys, leaves)?;
        Ok(Self { continuous_keys, discrete_keys : discrete_keys.to_vec(), factors })
    }

    pub(crate) fn from_tree(
        continuous_keys : Vec<Key>,
        discrete_keys : Vec<DiscreteKey>,
        factors : DecisionTree<Option<Rc<JacobianFactor>>>
    ) -> Self {
        Self { continuous_keys, discrete_keys, factors }
    }

    pub fn continuous_keys(&self) -> &[Key] {
        &self.continuous_keys[..]
    }

    pub fn discrete_keys(&self) -> &[DiscreteKey] {
        &self.discrete_keys[..]
    }

    pub fn factors(&self) -> &DecisionTree<Option<Rc<JacobianFactor>>> {
        &self.factors
    }

    /// Component selected by a full assignment of the discrete keys (None if pruned).
    pub fn factor(&self, assignment : &Assignment) -> Result<Option<Rc<JacobianFactor>>> {
        discrete::check_assignment(&self.discrete_keys, assignment)?;
        Ok(self.factors.get(assignment).cloned().flatten())
    }

    pub fn nr_components(&self) -> usize {
        self.factors.fold(|f, n| if f.is_some() { n + 1 } else { n }, 0)
    }

    pub fn error(&self, values : &VectorValues, assignment : &Assignment) -> Result<f64> {
        match self.factor(assignment)? {
            Some(f) => f.error(values),
            None => Err(HybridError::PrunedComponent(self.discrete_keys.iter().map(|k| k.key ).collect()))
        }
    }

    /// Appends the component of this mixture to the factor collection of each assignment.
    /// The result branches on the keys of sum first, then on the keys of this mixture
    /// sum does not hold.
    pub fn add(&self, sum : &GaussianSum) -> GaussianSum {
        sum.apply2(&self.factors, |graph, leaf| {
            match (graph, leaf) {
                (Some(g), Some(f)) => {
                    let mut g = g.clone();
                    g.push(f.clone());
                    Some(g)
                },
                _ => None
            }
        })
    }

    pub fn equals(&self, other : &GaussianMixtureFactor, tol : f64) -> bool {
        sorted(&self.continuous_keys) == sorted(&other.continuous_keys) &&
            self.factors.equals_with(&other.factors, |a, b| {
                match (a, b) {
                    (Some(a), Some(b)) => a.equals(b, tol),
                    (None, None) => true,
                    _ => false
                }
            })
    }

}

/// Gaussian conditional whose parameters depend on discrete parents: a decision tree
/// with one (possibly null) Gaussian conditional per discrete assignment. The tree always
/// has one leaf per assignment of its discrete keys; pruning nulls leaves but never
/// reshapes the tree.
#[derive(Debug, Clone)]
pub struct GaussianMixture {
    frontals : Vec<Key>,
    parents : Vec<Key>,
    discrete_keys : Vec<DiscreteKey>,
    conditionals : DecisionTree<Option<Rc<GaussianConditional>>>
}

impl GaussianMixture {

    pub fn new(
        frontals : Vec<Key>,
        parents : Vec<Key>,
        discrete_keys : &[DiscreteKey],
        components : Vec<Option<GaussianConditional>>
    ) -> Result<Self> {
        check_disjoint(&frontals, discrete_keys)?;
        check_disjoint(&parents, discrete_keys)?;
        let expected_parents = sorted(&parents);
        for c in components.iter().flatten() {
            if c.frontals() != &frontals[..] || sorted(c.parents()) != expected_parents {
                let found = c.frontals().iter().chain(c.parents().iter()).cloned().collect();
                let expected = frontals.iter().chain(parents.iter()).cloned().collect();
                return Err(HybridError::ComponentKeys { expected, found });
            }
        }
        let leaves = components.into_iter().map(|c| c.map(Rc::new) ).collect();
        let conditionals = DecisionTree::from_leaves(discrete_keys, leaves)?;
        Ok(Self { frontals, parents, discrete_keys : discrete_keys.to_vec(), conditionals })
    }

    pub(crate) fn from_tree(
        frontals : Vec<Key>,
        parents : Vec<Key>,
        discrete_keys : Vec<DiscreteKey>,
        conditionals : DecisionTree<Option<Rc<GaussianConditional>>>
    ) -> Self {
        Self { frontals, parents, discrete_keys, conditionals }
    }

    pub fn frontals(&self) -> &[Key] {
        &self.frontals[..]
    }

    /// Continuous parents.
    pub fn parents(&self) -> &[Key] {
        &self.parents[..]
    }

    /// Discrete parents.
    pub fn discrete_keys(&self) -> &[DiscreteKey] {
        &self.discrete_keys[..]
    }

    pub fn conditionals(&self) -> &DecisionTree<Option<Rc<GaussianConditional>>> {
        &self.conditionals
    }

    /// Conditional selected by a full assignment of the discrete parents, or None if
    /// it was pruned (or infeasible at elimination).
    pub fn conditional(&self, assignment : &Assignment) -> Result<Option<Rc<GaussianConditional>>> {
        discrete::check_assignment(&self.discrete_keys, assignment)?;
        Ok(self.conditionals.get(assignment).cloned().flatten())
    }

    /// Sub-tree of conditionals consistent with a partial assignment.
    pub fn choose(&self, assignment : &Assignment) -> DecisionTree<Option<Rc<GaussianConditional>>> {
        self.conditionals.choose(assignment)
    }

    /// Number of non-null conditionals.
    pub fn nr_components(&self) -> usize {
        self.conditionals.fold(|c, n| if c.is_some() { n + 1 } else { n }, 0)
    }

    /// Nulls every conditional whose assignment cannot be extended into an assignment of
    /// the factor's keys with a nonzero value. The factor may be defined over fewer,
    /// more or different keys than this mixture.
    pub fn prune(&self, factor : &DecisionTreeFactor) -> Self {
        let conditionals = self.conditionals.map_with_assignment(|asg, c| {
            if factor.choose(asg).max() > 0.0 {
                c.clone()
            } else {
                None
            }
        });
        Self { conditionals, ..self.clone() }
    }

    /// Log-density of the Gaussian component selected by the assignment.
    pub fn log_density(&self, values : &VectorValues, assignment : &Assignment) -> Result<f64> {
        match self.conditional(assignment)? {
            Some(c) => c.log_density(values),
            None => Err(HybridError::PrunedComponent(self.discrete_keys.iter().map(|k| k.key ).collect()))
        }
    }

    /// Converts every conditional back into a Jacobian factor.
    pub fn to_factor(&self) -> Result<GaussianMixtureFactor> {
        let factors = self.conditionals.try_map(|c| {
            match c {
                Some(c) => c.to_factor().map(|f| Some(Rc::new(f)) ),
                None => Ok(None)
            }
        })?;
        let continuous_keys = self.frontals.iter().chain(self.parents.iter()).cloned().collect();
        Ok(GaussianMixtureFactor::from_tree(continuous_keys, self.discrete_keys.clone(), factors))
    }

    pub fn equals(&self, other : &GaussianMixture, tol : f64) -> bool {
        self.frontals == other.frontals && sorted(&self.parents) == sorted(&other.parents) &&
            self.conditionals.equals_with(&other.conditionals, |a, b| {
                match (a, b) {
                    (Some(a), Some(b)) => a.equals(b, tol),
                    (None, None) => true,
                    _ => false
                }
            })
    }

}

#[cfg(test)]
mod tests {

    use super::*;
    use nalgebra::{DMatrix, DVector};

    fn m(k : Key) -> DiscreteKey {
        DiscreteKey::new(k, 2)
    }

    fn motion(mean : f64) -> JacobianFactor {
        JacobianFactor::binary(
            1,
            DMatrix::from_element(1, 1, -1.),
            2,
            DMatrix::from_element(1, 1, 1.),
            DVector::from_element(1, mean),
            1.0
        ).unwrap()
    }

    fn mixture() -> GaussianMixture {
        let comps = (0..4).map(|i| {
            Some(GaussianConditional::new(
                vec![(1, 1)],
                vec![],
                DMatrix::from_element(1, 1, 1.),
                DMatrix::zeros(1, 0),
                DVector::from_element(1, i as f64)
            ).unwrap())
        }).collect();
        GaussianMixture::new(vec![1], vec![], &[m(10), m(11)], comps).unwrap()
    }

    #[test]
    fn components_must_share_keys() {
        let other = JacobianFactor::unary(3, DMatrix::from_element(1, 1, 1.), DVector::zeros(1), 1.0).unwrap();
        let res = GaussianMixtureFactor::new(vec![1, 2], &[m(10)], vec![Some(motion(0.)), Some(other)]);
        assert!(matches!(res, Err(HybridError::ComponentKeys { .. })));
        let res = GaussianMixtureFactor::new(vec![1, 2], &[m(10)], vec![Some(motion(0.))]);
        assert!(matches!(res, Err(HybridError::LeafCount { expected : 2, found : 1 })));
        let res = GaussianMixtureFactor::new(vec![1, 2], &[m(2)], vec![Some(motion(0.)), None]);
        assert!(matches!(res, Err(HybridError::KeyKind(2))));
    }

    #[test]
    fn selects_by_assignment() {
        let mix = mixture();
        let asg : Assignment = vec![(10, 1), (11, 0)].into_iter().collect();
        assert_eq!(mix.conditional(&asg).unwrap().unwrap().d()[0], 2.0);
        let partial : Assignment = vec![(10, 1)].into_iter().collect();
        assert!(matches!(mix.conditional(&partial), Err(HybridError::MissingAssignment(11))));
        assert_eq!(mix.choose(&partial).nr_leaves(), 2);
        assert_eq!(mix.nr_components(), 4);
    }

    #[test]
    fn prune_over_subset_and_superset() {
        let mix = mixture();
        let on_first = DecisionTreeFactor::from_table(&[m(10)], "0 1").unwrap();
        let pruned = mix.prune(&on_first);
        assert_eq!(pruned.nr_components(), 2);
        assert_eq!(pruned.conditionals().nr_leaves(), 4);
        let wider = DecisionTreeFactor::from_table(&[m(10), m(11), m(12)], "0 0 0 1 0 0 0 0").unwrap();
        let pruned = mix.prune(&wider);
        assert_eq!(pruned.nr_components(), 1);
        let asg : Assignment = vec![(10, 0), (11, 1)].into_iter().collect();
        assert!(pruned.conditional(&asg).unwrap().is_some());
        assert!(matches!(pruned.log_density(&VectorValues::new(), &vec![(10, 0), (11, 0)].into_iter().collect()),
            Err(HybridError::PrunedComponent(_))));
    }

    #[test]
    fn sum_aligns_mixtures() {
        let a = GaussianMixtureFactor::new(vec![1, 2], &[m(10)], vec![Some(motion(0.)), Some(motion(1.))]).unwrap();
        let b = GaussianMixtureFactor::new(vec![1, 2], &[m(11)], vec![Some(motion(2.)), None]).unwrap();
        let start : GaussianSum = DecisionTree::leaf(Some(Vec::new()));
        let sum = b.add(&a.add(&start));
        let asg : Assignment = vec![(10, 1), (11, 0)].into_iter().collect();
        let graph = sum.get(&asg).unwrap().as_ref().unwrap();
        assert_eq!(graph.len(), 2);
        assert_eq!(graph[0].b()[0], 1.);
        assert_eq!(graph[1].b()[0], 2.);
        let asg : Assignment = vec![(10, 1), (11, 1)].into_iter().collect();
        assert!(sum.get(&asg).unwrap().is_none());
    }

}
