mod common;

use std::io::Write;
use hybrid::HybridError;
use hybrid::discrete::DiscreteKey;
use hybrid::discrete::conditional::EliminationKind;
use hybrid::hybrid::{HybridIsam, IsamParams, HybridFactorGraph};
use common::*;

#[test]
fn incremental_elimination() {
    let graph = switching(3);
    let mut isam = HybridIsam::new();
    isam.update(&graph.select(&[0, 1, 2, 5]).unwrap()).unwrap();
    assert_eq!(isam.len(), 3);
    assert_eq!(isam[x(1)].frontals(), vec![x(1)]);
    assert_eq!(isam[x(1)].parents(), vec![x(2), m(1)]);
    assert_eq!(isam[x(2)].frontals(), vec![x(2), x(3)]);
    assert_eq!(isam[x(2)].discrete_parents(), vec![mode(1), mode(2)]);
    assert!(isam[m(1)].is_discrete());
    assert_eq!(isam[m(1)].nr_frontals(), 2);

    isam.update(&graph.select(&[3, 4, 6]).unwrap()).unwrap();
    assert_eq!(isam.len(), 3);
    assert_eq!(isam[x(3)].frontals(), vec![x(2), x(3)]);
    assert_eq!(isam.tree().roots().len(), 1);

    // The clique of X1 was not touched by the second update.
    let root = isam.tree().clique_id(m(1)).unwrap();
    let x2 = isam.tree().clique_id(x(2)).unwrap();
    let x1 = isam.tree().clique_id(x(1)).unwrap();
    assert_eq!(isam.tree().parent(x2), Some(root));
    assert_eq!(isam.tree().parent(x1), Some(x2));
}

#[test]
fn incremental_inference_matches_batch() {
    let graph = switching(3);
    let mut isam = HybridIsam::new();
    isam.update(&graph.select(&[0, 1, 2, 5]).unwrap()).unwrap();
    isam.update(&graph.select(&[3, 4, 6]).unwrap()).unwrap();
    let (batch, _) = graph.eliminate_multifrontal(&ordering(3)).unwrap();

    for k in [x(1), x(2)].iter() {
        let inc = isam[*k].as_mixture().unwrap();
        let expected = batch[*k].as_mixture().unwrap();
        assert!(inc.equals(expected, 1E-6), "Clique of {} differs from batch elimination", k);
    }

    let modes = isam[m(1)].as_discrete().unwrap();
    let expected = [((0, 0), 0.0619233), ((1, 0), 0.183743), ((0, 1), 0.204159), ((1, 1), 0.2)];
    for ((m1, m2), v) in expected.iter() {
        let value = modes.get(&assign(&[(m(1), *m1), (m(2), *m2)])).unwrap();
        assert!((value - v).abs() < EPS);
    }
    assert!(modes.equals(batch[m(1)].as_discrete().unwrap(), 1E-6));

    let inc = isam.optimize().unwrap();
    let all = batch.optimize().unwrap();
    assert_eq!(inc.discrete, all.discrete);
    assert!(inc.continuous.equals(&all.continuous, 1E-6));
}

#[test]
fn failed_update_keeps_tree() {
    let graph = switching(3);
    let mut isam = HybridIsam::new();
    isam.update(&graph.select(&[0, 1, 2, 5]).unwrap()).unwrap();
    let before = isam.optimize().unwrap();

    // X1 is continuous, so it cannot be a discrete parent.
    let mut bad = HybridFactorGraph::new();
    bad.add_discrete(mode(2), &[DiscreteKey::new(x(1), 2)], "1/1 1/1").unwrap();
    assert!(matches!(isam.update(&bad), Err(HybridError::KeyKind(k)) if k == x(1)));
    assert_eq!(isam.len(), 3);
    assert_eq!(isam[x(2)].frontals(), vec![x(2), x(3)]);
    assert_eq!(isam.optimize().unwrap(), before);
}

#[test]
fn update_prunes_when_configured() {
    let params = IsamParams { elimination : EliminationKind::MaxProduct, max_nr_leaves : Some(2) };
    let mut isam = HybridIsam::with_params(params);
    isam.update(&switching(3)).unwrap();
    let modes = isam[m(1)].as_discrete().unwrap();
    assert_eq!(modes.as_factor().nr_nonzero(), 2);
    assert_eq!(modes.get(&assign(&[(m(1), 0), (m(2), 0)])).unwrap(), 0.0);
    assert_eq!(modes.get(&assign(&[(m(1), 1), (m(2), 0)])).unwrap(), 0.0);

    // Both values of M1 survive, but M2 = 0 does not.
    assert_eq!(isam[x(1)].as_mixture().unwrap().nr_components(), 2);
    let upper = isam[x(2)].as_mixture().unwrap();
    assert_eq!(upper.nr_components(), 2);
    assert!(upper.conditional(&assign(&[(m(1), 0), (m(2), 0)])).unwrap().is_none());
    assert!(upper.conditional(&assign(&[(m(1), 1), (m(2), 1)])).unwrap().is_some());

    let sol = isam.optimize().unwrap();
    assert_eq!(sol.discrete, assign(&[(m(1), 0), (m(2), 1)]));
}

#[test]
fn manual_prune_requires_discrete_clique() {
    let mut isam = HybridIsam::new();
    isam.update(&switching(3)).unwrap();
    assert!(matches!(isam.prune(x(1), 2), Err(HybridError::NotDiscrete(_))));
    assert!(matches!(isam.prune(999, 2), Err(HybridError::MissingKey(999))));
    isam.prune(m(2), 3).unwrap();
    assert_eq!(isam[m(2)].as_discrete().unwrap().as_factor().nr_nonzero(), 3);
}

#[test]
fn params_from_file() {
    let path = std::env::temp_dir().join(format!("hybrid-isam-{}.json", std::process::id()));
    let mut f = std::fs::File::create(&path).unwrap();
    f.write_all(br#"{ "elimination" : "SumProduct" }"#).unwrap();
    drop(f);
    let params = IsamParams::load_from_path(&path).unwrap();
    assert_eq!(params.elimination, EliminationKind::SumProduct);
    assert_eq!(params.max_nr_leaves, None);
    std::fs::remove_file(&path).unwrap();
    let err = IsamParams::load_from_path(&path).unwrap_err();
    assert!(format!("{}", err).starts_with("Could not open"));
}
