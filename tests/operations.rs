//! End-to-end behavior of the public sampling-tree API.

use approx::assert_relative_eq;
use kappa_tree::core::{SamplingTree, TreeConfig, TreeError};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::collections::HashMap;
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

// -----------------------------------------------------------------------------
// Reference Scenarios
// -----------------------------------------------------------------------------

#[test]
fn test_numbering_from_cumulative_sum() {
    let kappa: Vec<f64> = (0..8).map(|i| f64::from(i) + 0.1).collect();
    let rows: Vec<Vec<f64>> = kappa.chunks(4).map(<[f64]>::to_vec).collect();
    let mut tree = SamplingTree::new();
    tree.append(&rows, [0_usize, 1]).unwrap();

    let xi = 0.5;
    tree.choose_event(xi).unwrap();

    let total: f64 = kappa.iter().sum();
    let below = kappa
        .iter()
        .scan(0.0, |acc, w| {
            *acc += w;
            Some(*acc / total)
        })
        .filter(|&c| c < xi)
        .count();
    assert_eq!(tree.get_jump_id().unwrap(), below % 4);
    assert_eq!(*tree.get_index().unwrap(), (below + 1) / 4);
}

#[test]
fn test_large_skewed_tree() {
    init_tracing();
    let n_atoms = 10_000;
    let mut rows = vec![[1.0e-4; 4]; n_atoms];
    rows[12][3] = 1e4;
    let mut tree = SamplingTree::new();
    tree.append(&rows, 0..n_atoms).unwrap();

    tree.choose_event(0.5).unwrap();
    assert_eq!(tree.get_jump_id().unwrap(), 3);
    assert_eq!(*tree.get_index().unwrap(), 12);
}

#[test]
fn test_remove_and_reappend() {
    let n_atoms = 4;
    let mut rows = vec![[1.0e-4; 4]; n_atoms];
    rows[1][3] = 1e4;
    let mut tree = SamplingTree::new();
    tree.append(&rows, 0..n_atoms).unwrap();

    tree.choose_event(0.5).unwrap();
    tree.remove().unwrap();
    tree.append(&[[1.0; 4]], [1]).unwrap();
    tree.choose_event(0.4).unwrap();
    assert_eq!(*tree.get_index().unwrap(), 1);
    assert_eq!(tree.get_jump_id().unwrap(), 1);
}

// -----------------------------------------------------------------------------
// Randomized Operation Sequences
// -----------------------------------------------------------------------------

/// Apply a random mix of appends, updates and removals while tracking the
/// expected weights by id, and check the tree against that model throughout.
fn run_random_operations(config: TreeConfig, seed: u64, steps: usize) {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut tree = SamplingTree::with_config(config);
    let mut model: HashMap<u64, [f64; 4]> = HashMap::new();
    let mut next_id = 0_u64;

    for step in 0..steps {
        let op = rng.gen_range(0..10);
        if tree.is_empty() || op < 3 {
            let batch = rng.gen_range(1..20);
            let rows: Vec<[f64; 4]> = (0..batch).map(|_| rng.gen()).collect();
            let ids: Vec<u64> = (next_id..next_id + batch).collect();
            for (id, row) in ids.iter().zip(&rows) {
                model.insert(*id, *row);
            }
            next_id += batch;
            tree.append(&rows, ids).unwrap();
            continue;
        }

        tree.choose_event(rng.gen()).unwrap();
        let id = *tree.get_index().unwrap();
        let jump_id = tree.get_jump_id().unwrap();
        assert!(model[&id][jump_id] > 0.0, "step {step}: drew a zero-weight slot");

        if op < 7 {
            let mut row: [f64; 4] = rng.gen();
            if rng.gen_bool(0.2) {
                row[rng.gen_range(0..4)] = 0.0;
            }
            tree.update_kappa(&row).unwrap();
            model.insert(id, row);
        } else {
            let (removed, weights) = tree.remove().unwrap();
            assert_eq!(removed, id);
            assert_eq!(model.remove(&id), Some(weights));
        }

        assert!(tree.capacity() >= tree.len());
        assert!(tree.capacity().is_power_of_two());
    }

    assert_eq!(tree.len(), model.len());
    for (id, kappa) in tree.iter() {
        assert_eq!(model.get(id), Some(kappa));
    }
    let expected: f64 = model.values().flatten().sum();
    assert_relative_eq!(tree.get_kappa(), expected, max_relative = 1e-9);
    tree.check_invariants(1e-9).unwrap();
}

#[test]
fn test_random_operations_basic_config() {
    init_tracing();
    run_random_operations(TreeConfig::basic(), 1, 5_000);
}

#[test]
fn test_random_operations_compact_config() {
    init_tracing();
    run_random_operations(TreeConfig::compact(), 2, 5_000);
}

#[test]
fn test_random_operations_preallocated() {
    init_tracing();
    run_random_operations(TreeConfig::preallocated(1_000), 3, 2_000);
}

// -----------------------------------------------------------------------------
// Error Handling
// -----------------------------------------------------------------------------

#[test]
fn test_failed_calls_leave_tree_unchanged() {
    let mut tree = SamplingTree::new();
    tree.append(&[[1.0; 4], [2.0; 4]], ["a", "b"]).unwrap();
    let selection = tree.choose_event(0.9).unwrap();

    assert!(tree.append(&[[1.0; 4]], ["c", "d"]).is_err());
    assert!(tree.update_kappa(&[f64::NAN, 0.0, 0.0, 0.0]).is_err());
    assert!(tree.choose_event(1.5).is_err());

    assert_eq!(tree.len(), 2);
    assert_eq!(tree.selection(), Some(selection));
    assert_relative_eq!(tree.get_kappa(), 12.0);
    assert_eq!(*tree.get_index().unwrap(), "b");
}

#[test]
fn test_remove_requires_fresh_draw() {
    let mut tree = SamplingTree::new();
    tree.append(&[[1.0; 4], [1.0; 4]], [0, 1]).unwrap();
    tree.choose_event(0.2).unwrap();
    tree.remove().unwrap();
    assert_eq!(tree.remove().unwrap_err(), TreeError::InvalidState);
    tree.choose_event(0.2).unwrap();
    tree.remove().unwrap();
    assert!(tree.is_empty());
}
