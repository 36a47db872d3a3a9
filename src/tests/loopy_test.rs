use super::utils::{assert_normalized, chain, frustrated_cycle};
use crate::core::{BNError, Edge, NodeId};
use ndarray::array;
use rand::{rngs::StdRng, seq::SliceRandom, thread_rng, SeedableRng};

#[test]
fn cycle_is_accepted_and_has_three_edges() {
    let net = frustrated_cycle();
    assert_eq!(net.edges().len(), 3);
    for node in net.nodes() {
        assert_eq!(node.parents().len(), 1);
        assert_eq!(node.children().len(), 1);
    }
}

#[test]
fn exhausted_budget_is_reported_and_keeps_stale_beliefs() {
    let mut net = frustrated_cycle();
    net.initialize_with(&mut |len| {
        let mut msg = ndarray::Array1::<f64>::zeros(len);
        msg[0] = 0.99;
        msg[len - 1] += 0.01;
        msg
    })
    .unwrap();
    net.compute_beliefs().unwrap();
    let stale: Vec<_> = net.nodes().iter().map(|n| n.belief().unwrap().clone()).collect();
    let info = net.propagate(1, 1e-12).unwrap();
    assert!(!info.converged);
    assert_eq!(info.iterations_number, 1);
    assert_eq!(info.discrepancy_dynamics.len(), 1);
    assert!(info.last_discrepancy >= 1e-12);
    for (node, belief) in net.nodes().iter().zip(&stale) {
        assert_eq!(node.belief().unwrap(), belief);
    }
}

#[test]
fn exhausted_budget_before_any_belief() {
    let mut net = frustrated_cycle();
    net.initialize(thread_rng());
    let info = net.propagate(1, 1e-12).unwrap();
    assert!(!info.converged);
    assert!(net.nodes().iter().all(|node| node.belief().is_none()));
}

#[test]
fn loopy_propagation_stays_finite_and_normalized() {
    let mut net = frustrated_cycle();
    net.initialize(thread_rng());
    let info = net.propagate(500, 1e-10).unwrap();
    assert!(info.discrepancy_dynamics.iter().all(|x| x.is_finite()));
    for edge in net.edges() {
        assert_normalized(net.messages().downstream(edge).unwrap());
        assert_normalized(net.messages().upstream(edge).unwrap());
    }
    net.compute_beliefs().unwrap();
    for node in net.nodes() {
        assert_normalized(node.belief().unwrap());
    }
}

#[test]
fn edge_order_does_not_change_an_iteration() {
    let mut net = frustrated_cycle();
    net.set_evidence("B", &[0.2, 0.8]).unwrap();
    net.initialize(StdRng::seed_from_u64(7));
    let mut reversed = net.clone();
    let mut shuffled = net.clone();
    net.propagate(1, 0.).unwrap();
    reversed
        .propagate_with_order(1, 0., |edges| edges.reverse())
        .unwrap();
    let mut rng = StdRng::seed_from_u64(11);
    shuffled
        .propagate_with_order(1, 0., |edges| edges.shuffle(&mut rng))
        .unwrap();
    assert_eq!(net.messages(), reversed.messages());
    assert_eq!(net.messages(), shuffled.messages());
}

#[test]
fn propagation_requires_initialized_messages() {
    let mut net = chain();
    assert!(!net.is_initialized());
    assert!(matches!(net.propagate(10, 1e-6), Err(BNError::NotInitialized)));
    assert!(matches!(net.compute_beliefs(), Err(BNError::NotInitialized)));
}

#[test]
fn external_messages_are_validated_and_used() {
    let mut net = chain();
    net.initialize(thread_rng());
    let edge = Edge::new(NodeId(1), NodeId(2));
    net.set_upstream_message(edge, array![3., 1.]).unwrap();
    assert_eq!(net.messages().upstream(&edge).unwrap(), &array![0.75, 0.25]);
    assert!(matches!(
        net.set_upstream_message(edge, array![1., 1., 1.]),
        Err(BNError::MessageLength { expected: 2, found: 3, .. })
    ));
    assert!(matches!(
        net.set_downstream_message(Edge::new(NodeId(2), NodeId(1)), array![1., 1.]),
        Err(BNError::UnknownEdge(_))
    ));
    net.compute_beliefs().unwrap();
    let b = net.belief("B").unwrap().unwrap().clone();
    let down = net.node_by_name("B").unwrap().down_marginal(net.messages(), None).unwrap();
    let mut expected = &down * &array![0.75, 0.25];
    expected /= expected.sum();
    assert!((&b - &expected).iter().all(|x| x.abs() < 1e-12));
}

#[test]
fn negative_or_non_finite_messages_are_rejected() {
    let mut net = chain();
    net.initialize(thread_rng());
    let edge = Edge::new(NodeId(1), NodeId(2));
    let stored = net.messages().clone();
    assert!(matches!(
        net.set_upstream_message(edge, array![2., -1.]),
        Err(BNError::InvalidMessage { position: 1, .. })
    ));
    assert!(matches!(
        net.set_downstream_message(edge, array![f64::NAN, 1.]),
        Err(BNError::InvalidMessage { position: 0, .. })
    ));
    assert!(matches!(
        net.set_downstream_message(edge, array![f64::INFINITY, 1.]),
        Err(BNError::InvalidMessage { position: 0, .. })
    ));
    assert_eq!(net.messages(), &stored);
    assert!(matches!(
        net.initialize_with(&mut |len| ndarray::Array1::from_elem(len, -1.)),
        Err(BNError::InvalidMessage { .. })
    ));
    assert_eq!(net.messages(), &stored);
    net.compute_beliefs().unwrap();
    for node in net.nodes() {
        assert_normalized(node.belief().unwrap());
    }
}

#[test]
fn zero_iterations_report_no_discrepancy() {
    let mut net = chain();
    net.initialize(thread_rng());
    let info = net.propagate(0, 1.).unwrap();
    assert!(!info.converged);
    assert_eq!(info.iterations_number, 0);
    assert!(info.discrepancy_dynamics.is_empty());
    assert_eq!(info.last_discrepancy, f64::INFINITY);
    assert!(net.nodes().iter().all(|node| node.belief().is_none()));
}

#[test]
fn discrepancy_between_message_stores() {
    let mut net = chain();
    net.initialize_with(&mut |len| ndarray::Array1::ones(len)).unwrap();
    let uniform = net.messages().clone();
    assert_eq!(uniform.discrepancy(&uniform, net.edges()), 0.);
    let edge = Edge::new(NodeId(0), NodeId(1));
    net.set_upstream_message(edge, array![1., 0.]).unwrap();
    net.set_downstream_message(edge, array![0., 1.]).unwrap();
    // two messages differ by (0.5, -0.5) each
    let delta = net.messages().discrepancy(&uniform, net.edges());
    assert!((delta - 1.).abs() < 1e-12, "Error amplitude: {}", (delta - 1.).abs());
}
