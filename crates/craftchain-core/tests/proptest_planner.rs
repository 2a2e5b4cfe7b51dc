//! Property-based tests for the craftchain planner.
//!
//! Uses proptest to generate random cost vectors, chains and small catalogs,
//! then verify the accounting and pruning invariants hold.

use craftchain_core::chain::{ChainArena, ChainStep, Delta, RecipeChain};
use craftchain_core::config::PlannerConfig;
use craftchain_core::dominance::{dominates, CostVectors};
use craftchain_core::id::*;
use craftchain_core::planner::{ChangeSet, ComputeOutcome, CraftPlanner};
use craftchain_core::test_utils::*;
use proptest::prelude::*;
use std::collections::BTreeMap;

// ===========================================================================
// Generators
// ===========================================================================

fn arb_dim() -> impl Strategy<Value = Vec<(u64, u32)>> {
    proptest::collection::btree_map(0u64..6, 1u32..4, 0..4)
        .prop_map(|m| m.into_iter().collect())
}

fn arb_costs() -> impl Strategy<Value = CostVectors> {
    (arb_dim(), arb_dim(), arb_dim()).prop_map(|(physical, drone, trade)| CostVectors {
        physical,
        drone,
        trade,
    })
}

type RecipeSpec = (u32, u32, Vec<(u32, u32)>);

/// Ten recipes over eight items, one or two ingredients each.
fn arb_recipes() -> impl Strategy<Value = Vec<RecipeSpec>> {
    proptest::collection::vec(
        (
            0u32..8,
            1u32..=2,
            proptest::collection::btree_map(0u32..8, 1u32..=2, 1..=2),
        )
            .prop_map(|(result, count, ings)| (result, count, ings.into_iter().collect())),
        10,
    )
}

fn arb_stacks() -> impl Strategy<Value = Vec<(u32, u32)>> {
    proptest::collection::btree_map(0u32..8, 0u32..4, 1..8).prop_map(|m| m.into_iter().collect())
}

fn catalog_from(recipes: &[RecipeSpec]) -> craftchain_core::catalog::RecipeCatalog {
    let refs: Vec<(u32, u32, &[(u32, u32)])> = recipes
        .iter()
        .map(|(r, c, ings)| (*r, *c, ings.as_slice()))
        .collect();
    make_catalog(8, &refs)
}

// ===========================================================================
// Dominance
// ===========================================================================

proptest! {
    #[test]
    fn dominance_is_antisymmetric(a in arb_costs(), b in arb_costs()) {
        prop_assert!(!(dominates(&a, &b) && dominates(&b, &a)));
    }

    #[test]
    fn nothing_dominates_itself(a in arb_costs()) {
        prop_assert!(!dominates(&a, &a));
    }
}

// ===========================================================================
// Surplus accounting
// ===========================================================================

proptest! {
    #[test]
    fn surplus_is_sum_of_ancestor_deltas(
        steps in proptest::collection::vec(
            proptest::collection::vec((0u32..5, -3i32..=3), 3),
            1..6,
        ),
        watched in 0u32..5,
    ) {
        let mut arena = ChainArena::new();
        let mut parent = None;
        let mut expected = 0i32;
        for (depth, deltas) in steps.iter().enumerate() {
            let mut slots = [Delta::default(); 3];
            for (slot, &(i, amount)) in deltas.iter().enumerate() {
                slots[slot] = Delta { index: res(i), amount };
                if i == watched {
                    expected += amount;
                }
            }
            let mut chain = make_root_chain(0, &[]);
            chain.parent = parent;
            chain.depth = depth as u32 + 1;
            chain.step = ChainStep::Craft(RecipeId(depth as u32));
            chain.deltas = slots;
            parent = Some(arena.insert(chain));
        }
        let leaf = parent.unwrap();
        prop_assert_eq!(arena.net_surplus_for(leaf, res(watched)), expected);
        prop_assert_eq!(arena.steps(leaf).len(), steps.len());
    }
}

// ===========================================================================
// Admission
// ===========================================================================

proptest! {
    #[test]
    fn admission_never_exceeds_cap(
        cap in 1usize..4,
        costs in proptest::collection::vec(
            proptest::collection::btree_map(0u32..4, 1u32..=3, 1..=2),
            1..20,
        ),
    ) {
        let catalog = make_catalog(6, &[(5, 1, &[(0, 1)])]);
        let config = PlannerConfig { max_chains_per_result: cap, ..Default::default() };
        let mut planner = CraftPlanner::new(catalog, config).unwrap();
        for cost in costs {
            let physical: Vec<(u32, u32)> = cost.into_iter().collect();
            let chain: RecipeChain = make_root_chain(5, &physical);
            planner.add_chain_to_results(chain);
            prop_assert!(planner.accepted_count(res(5)) <= cap);
        }
    }

    #[test]
    fn reseeding_is_deterministic(recipes in arb_recipes(), stacks in arb_stacks()) {
        let catalog = catalog_from(&recipes);
        let snapshot = snapshot_with(&catalog, &stacks).build();
        let mut planner = CraftPlanner::new(catalog, PlannerConfig::default()).unwrap();
        let first = planner.compute(&snapshot, &ChangeSet::forced());
        let first_stats = planner.last_stats();
        let second = planner.compute(&snapshot, &ChangeSet::forced());
        prop_assert_eq!(first, second);
        prop_assert_eq!(first_stats, planner.last_stats());
    }

    #[test]
    fn breadth_stays_within_caps(recipes in arb_recipes(), stacks in arb_stacks()) {
        let catalog = catalog_from(&recipes);
        let masters = catalog.recipe_count();
        // Widest adjacency of any single index, consumers plus producers.
        let max_adjacency = (0..8)
            .map(|i| catalog.consumers_of(res(i)).len() + catalog.producers_of(res(i)).len())
            .max()
            .unwrap_or(0);
        let snapshot = snapshot_with(&catalog, &stacks).build();
        let config = PlannerConfig {
            max_depth: 3,
            max_bridge_items_per_chain: 2,
            max_producers_per_bridge: 2,
            ..Default::default()
        };
        let cap = config.max_chains_per_result;
        let trade_cap = config.max_trade_children_per_chain;
        let bridge_bound = config.max_bridge_items_per_chain * config.max_producers_per_bridge;
        // Each node adds at most three deltas to the profile.
        let profile_bound = 3 * config.max_depth as usize + 3;
        let mut planner = CraftPlanner::new(catalog, config).unwrap();
        let outcome = planner.compute(&snapshot, &ChangeSet::forced());
        let stats = planner.last_stats();

        prop_assert!(stats.seeded <= masters);
        prop_assert!(stats.bridge_candidates <= stats.expanded * bridge_bound);
        prop_assert!(
            stats.candidates_generated
                <= stats.expanded * (profile_bound * max_adjacency + bridge_bound)
        );
        prop_assert!(stats.trade_children <= stats.expanded * trade_cap);
        prop_assert!(stats.chains_created <= stats.seeded + stats.expanded * (masters + trade_cap));
        prop_assert!(stats.layers <= 3);

        let mut per_result: BTreeMap<ResourceId, usize> = BTreeMap::new();
        if let ComputeOutcome::Updated(entries) = outcome {
            for entry in entries {
                prop_assert!(entry.chains.iter().all(|c| c.depth <= 3));
                *per_result.entry(entry.source).or_default() += entry.chains.len();
            }
        }
        prop_assert!(per_result.values().all(|&n| n <= cap));
    }
}
