use ndarray::Array1;

use crate::core::{BayesNet, BayesNetBuilder};

/// Exact marginals by enumeration of all joint assignments.
/// Evidence acts as a likelihood of the observed node's levels
pub(super) fn exact_marginals(net: &BayesNet) -> Vec<Array1<f64>> {
    let nodes = net.nodes();
    let cardinalities: Vec<usize> = nodes.iter().map(|node| node.cardinality()).collect();
    let mut marginals: Vec<Array1<f64>> =
        cardinalities.iter().map(|card| Array1::zeros(*card)).collect();
    let mut assignment = vec![0; nodes.len()];
    loop {
        let mut weight = 1f64;
        for node in nodes {
            let level = assignment[node.id().0];
            if let Some(cpt) = node.cpt() {
                let combination: Vec<usize> =
                    node.parents().iter().map(|parent| assignment[parent.0]).collect();
                weight *= cpt.row(&combination).unwrap()[level];
            }
            if let Some(evidence) = node.evidence() {
                weight *= evidence[level];
            }
        }
        for (marginal, level) in marginals.iter_mut().zip(&assignment) {
            marginal[*level] += weight;
        }
        let mut pos = 0;
        loop {
            if pos == nodes.len() {
                for marginal in &mut marginals {
                    *marginal /= marginal.sum();
                }
                return marginals;
            }
            assignment[pos] += 1;
            if assignment[pos] < cardinalities[pos] {
                break;
            }
            assignment[pos] = 0;
            pos += 1;
        }
    }
}

pub(super) fn max_abs_diff(lhs: &Array1<f64>, rhs: &Array1<f64>) -> f64 {
    assert_eq!(lhs.len(), rhs.len());
    lhs.iter()
        .zip(rhs)
        .map(|(x, y)| (x - y).abs())
        .fold(0f64, f64::max)
}

/// Compares beliefs of every node with exact marginals
pub(super) fn assert_exact_beliefs(net: &BayesNet, error: f64) {
    let exact = exact_marginals(net);
    for (node, marginal) in net.nodes().iter().zip(&exact) {
        let belief = node.belief().expect("beliefs must be computed");
        let diff = max_abs_diff(belief, marginal);
        assert!(
            diff < error,
            "Node {}: belief {} vs exact {}, error amplitude: {}",
            node.name(),
            belief,
            marginal,
            diff
        );
    }
}

pub(super) fn assert_normalized(vector: &Array1<f64>) {
    assert!(vector.iter().all(|x| x.is_finite() && *x >= 0f64), "{}", vector);
    assert!((vector.sum() - 1f64).abs() < 1e-10, "{} sums to {}", vector, vector.sum());
}

/// A -> B -> C, binary nodes
pub(super) fn chain() -> BayesNet {
    let mut bnb = BayesNetBuilder::new();
    for name in ["A", "B", "C"] {
        bnb.add_node(name, 2).unwrap();
    }
    bnb.add_prior("A", vec![0.5, 0.5]).unwrap();
    bnb.add_cpt(
        "B",
        &["A"],
        vec![(vec![0], vec![0.9, 0.1]), (vec![1], vec![0.2, 0.8])],
    )
    .unwrap();
    bnb.add_cpt(
        "C",
        &["B"],
        vec![(vec![0], vec![0.7, 0.3]), (vec![1], vec![0.1, 0.9])],
    )
    .unwrap();
    bnb.build()
}

/// 1 -> 3 <- 2, 3 -> 4, 3 -> 5. Node 3 has three levels
pub(super) fn polytree() -> BayesNet {
    let mut bnb = BayesNetBuilder::new();
    bnb.add_node("1", 2).unwrap();
    bnb.add_node("2", 2).unwrap();
    bnb.add_node("3", 3).unwrap();
    bnb.add_node("4", 2).unwrap();
    bnb.add_node("5", 2).unwrap();
    bnb.add_prior("1", vec![0.3, 0.7]).unwrap();
    bnb.add_prior("2", vec![0.6, 0.4]).unwrap();
    bnb.add_cpt(
        "3",
        &["1", "2"],
        vec![
            (vec![0, 0], vec![0.8, 0.1, 0.1]),
            (vec![0, 1], vec![0.3, 0.4, 0.3]),
            (vec![1, 0], vec![0.2, 0.2, 0.6]),
            (vec![1, 1], vec![0.05, 0.9, 0.05]),
        ],
    )
    .unwrap();
    bnb.add_cpt(
        "4",
        &["3"],
        vec![
            (vec![0], vec![0.9, 0.1]),
            (vec![1], vec![0.4, 0.6]),
            (vec![2], vec![0.15, 0.85]),
        ],
    )
    .unwrap();
    bnb.add_cpt(
        "5",
        &["3"],
        vec![
            (vec![0], vec![0.25, 0.75]),
            (vec![1], vec![0.5, 0.5]),
            (vec![2], vec![0.95, 0.05]),
        ],
    )
    .unwrap();
    bnb.build()
}

/// A -> B -> C -> A with CPTs that disagree around the cycle
pub(super) fn frustrated_cycle() -> BayesNet {
    let mut bnb = BayesNetBuilder::new();
    for name in ["A", "B", "C"] {
        bnb.add_node(name, 2).unwrap();
    }
    let copy = vec![(vec![0], vec![0.9, 0.1]), (vec![1], vec![0.1, 0.9])];
    let flip = vec![(vec![0], vec![0.05, 0.95]), (vec![1], vec![0.95, 0.05])];
    bnb.add_cpt("B", &["A"], copy.clone()).unwrap();
    bnb.add_cpt("C", &["B"], copy).unwrap();
    bnb.add_cpt("A", &["C"], flip).unwrap();
    bnb.build()
}
