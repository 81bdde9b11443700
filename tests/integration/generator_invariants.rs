#![allow(missing_docs)]

use std::collections::{HashMap, HashSet};

use authbench::generator::{
    generate, AuthGraph, Entities, EntityEnv, GenerationConfig, GenerationContext, User,
};
use proptest::prelude::*;

fn config(users: usize, resources: usize, groups: usize, seed: u64) -> GenerationConfig {
    GenerationConfig {
        users,
        resources,
        groups,
        seed,
        ..GenerationConfig::default()
    }
}

/// Longest path check over INHERITS_FROM; fails on a back edge.
fn assert_acyclic(graph: &AuthGraph) {
    let mut parents: HashMap<&str, Vec<&str>> = HashMap::new();
    for edge in &graph.inheritance {
        parents
            .entry(edge.child_id.as_str())
            .or_default()
            .push(edge.parent_id.as_str());
    }
    for start in parents.keys() {
        let mut seen = HashSet::new();
        let mut stack = vec![*start];
        while let Some(node) = stack.pop() {
            assert!(seen.insert(node), "cycle through {node}");
            if let Some(next) = parents.get(node) {
                stack.extend(next.iter().copied());
            }
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn prop_same_seed_same_graph(
        users in 1usize..80,
        resources in 0usize..60,
        groups in 0usize..20,
        seed in any::<u64>(),
    ) {
        let cfg = config(users, resources, groups, seed);
        let a = generate(&cfg).unwrap();
        let b = generate(&cfg).unwrap();
        prop_assert_eq!(a, b);
    }

    #[test]
    fn prop_generated_graphs_hold_invariants(
        users in 1usize..80,
        resources in 0usize..60,
        groups in 0usize..30,
        seed in any::<u64>(),
        inheritance in 0.0f64..=1.0,
    ) {
        let cfg = GenerationConfig {
            inheritance_probability: inheritance,
            ..config(users, resources, groups, seed)
        };
        let graph = generate(&cfg).unwrap();
        prop_assert!(graph.verify().is_ok(), "{:?}", graph.verify());
        assert_acyclic(&graph);

        prop_assert_eq!(graph.users.len(), users);
        prop_assert_eq!(graph.resources.len(), resources);
        prop_assert_eq!(graph.groups.len(), groups);
        if groups > 0 {
            prop_assert!(graph.memberships.len() >= users);
        } else {
            prop_assert!(graph.memberships.is_empty());
        }
        prop_assert!(graph.user_permissions.len() >= resources);
    }
}

#[test]
fn different_seeds_differ() {
    let a = generate(&config(50, 30, 10, 1)).unwrap();
    let b = generate(&config(50, 30, 10, 2)).unwrap();
    assert_ne!(a, b);
}

#[test]
fn node_streams_do_not_depend_on_other_counts() {
    let small = generate(&config(40, 0, 0, 11)).unwrap();
    let large = generate(&config(40, 500, 80, 11)).unwrap();
    assert_eq!(small.users, large.users);
}

#[test]
fn entity_sequence_is_lazy_and_restartable() {
    let cfg = config(1_000_000, 0, 0, 5);
    let ctx = GenerationContext::from_config(&cfg).unwrap();
    let mut users = Entities::<User>::new(&ctx, cfg.users, EntityEnv::default()).unwrap();
    assert_eq!(users.len(), 1_000_000);
    let head: Vec<_> = users.by_ref().take(3).collect();
    assert_eq!(users.len(), 999_997);
    users.restart();
    let again: Vec<_> = users.take(3).collect();
    assert_eq!(head, again);
}

#[test]
fn single_group_caps_every_membership() {
    let graph = generate(&config(100, 0, 1, 3)).unwrap();
    assert_eq!(graph.memberships.len(), 100);
    assert!(graph.inheritance.is_empty());
}

#[test]
fn zero_users_with_resources_is_rejected() {
    assert!(generate(&config(0, 10, 3, 1)).is_err());
    let empty = generate(&config(0, 0, 0, 1)).unwrap();
    assert_eq!(empty.node_count() + empty.edge_count(), 0);
}
