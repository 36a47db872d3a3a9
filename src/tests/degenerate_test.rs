use super::utils::assert_normalized;
use crate::core::{normalize, BayesNetBuilder};
use ndarray::array;
use rand::thread_rng;

#[test]
fn zero_rows_and_contradicting_evidence_yield_uniform_distributions() {
    let mut bnb = BayesNetBuilder::new();
    bnb.add_node("A", 2).unwrap();
    bnb.add_node("B", 2).unwrap();
    bnb.add_prior("A", vec![0.5, 0.5]).unwrap();
    // no data supports A = 1
    bnb.add_cpt("B", &["A"], vec![(vec![0], vec![1., 0.]), (vec![1], vec![0., 0.])])
        .unwrap();
    let mut net = bnb.build();
    net.set_evidence("B", &[0., 1.]).unwrap();
    net.initialize(thread_rng());
    let info = net.propagate(100, 1e-10).unwrap();
    assert!(info.converged, "{}", info);
    assert!(info.degenerate_normalizations > 0);
    for edge in net.edges() {
        assert_normalized(net.messages().downstream(edge).unwrap());
        assert_normalized(net.messages().upstream(edge).unwrap());
    }
    for node in net.nodes() {
        assert_normalized(node.belief().unwrap());
    }
    assert_eq!(net.belief("B").unwrap().unwrap(), &array![0.5, 0.5]);
    assert_eq!(net.messages().upstream(&net.edges()[0]).unwrap(), &array![0.5, 0.5]);
}

#[test]
fn zero_row_without_conflict_is_harmless() {
    let mut bnb = BayesNetBuilder::new();
    bnb.add_node("A", 2).unwrap();
    bnb.add_node("B", 2).unwrap();
    bnb.add_prior("A", vec![0.5, 0.5]).unwrap();
    bnb.add_cpt("B", &["A"], vec![(vec![0], vec![0.9, 0.1]), (vec![1], vec![0., 0.])])
        .unwrap();
    let mut net = bnb.build();
    net.initialize(thread_rng());
    let info = net.propagate(100, 1e-10).unwrap();
    assert!(info.converged);
    assert_eq!(info.degenerate_normalizations, 0);
    let b = net.belief("B").unwrap().unwrap();
    assert!((b[0] - 0.9).abs() < 1e-12, "{}", b);
}

#[test]
fn normalization_of_non_finite_vector() {
    let mut msg = array![f64::NAN, 1., 1.];
    assert!(normalize(&mut msg));
    assert_normalized(&msg);
    let mut msg = array![f64::INFINITY, 1.];
    assert!(normalize(&mut msg));
    assert_eq!(msg, array![0.5, 0.5]);
}
