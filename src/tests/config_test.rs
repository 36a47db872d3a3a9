use super::utils::{assert_exact_beliefs, polytree};
use crate::core::{MessagePassingInfo, PropagationConfig};

#[test]
fn config_from_yaml_with_defaults() {
    let config: PropagationConfig = serde_yaml::from_str("tolerance: 1.0e-9\nseed: 3\n").unwrap();
    assert_eq!(config.max_iterations, 1000);
    assert_eq!(config.tolerance, 1e-9);
    assert!(!config.shuffle_edges);
    assert_eq!(config.seed, Some(3));
    let config: PropagationConfig = serde_yaml::from_str("{}").unwrap();
    assert_eq!(config, PropagationConfig::default());
}

#[test]
fn config_drives_a_run() {
    let config: PropagationConfig = serde_yaml::from_str(
        "max_iterations: 50\ntolerance: 1.0e-10\nshuffle_edges: true\nseed: 21\n",
    )
    .unwrap();
    let mut net = polytree();
    let info = net.run(&config).unwrap();
    assert!(info.converged, "{}", info);
    assert!(info.iterations_number <= 50);
    assert_exact_beliefs(&net, 1e-8);
}

#[test]
fn info_serialization() {
    let mut net = polytree();
    let info = net
        .run(&PropagationConfig {
            tolerance: 1e-10,
            seed: Some(1),
            ..PropagationConfig::default()
        })
        .unwrap();
    let text = serde_yaml::to_string(&info).unwrap();
    let restored: MessagePassingInfo = serde_yaml::from_str(&text).unwrap();
    assert_eq!(restored.converged, info.converged);
    assert_eq!(restored.iterations_number, info.iterations_number);
    assert_eq!(restored.discrepancy_dynamics.len(), info.discrepancy_dynamics.len());
    assert!(info.to_string().contains("converged"));
}
