//! Shared fixtures for integration tests, property tests and benchmarks.
//!
//! Gated behind `#[cfg(any(test, feature = "test-utils"))]`.

use crate::catalog::{CatalogBuilder, Ingredient, RecipeCatalog};
use crate::chain::{ChainStep, Delta, RecipeChain};
use crate::id::*;
use crate::resource::ResourceSpace;
use crate::snapshot::{DroneCandidate, InventorySnapshot, SnapshotBuilder};

// ===========================================================================
// Resource constructors
// ===========================================================================

pub fn res(i: u32) -> ResourceId {
    ResourceId(i)
}

pub fn ing(i: u32, count: u32) -> Ingredient {
    Ingredient::new(ResourceId(i), count)
}

// ===========================================================================
// Catalog builders
// ===========================================================================

/// Build a catalog over `items` items and no equipment from
/// `(result, result_count, ingredients)` triples.
pub fn make_catalog(items: u32, recipes: &[(u32, u32, &[(u32, u32)])]) -> RecipeCatalog {
    let mut builder = CatalogBuilder::new(ResourceSpace::new(items, 0));
    for &(result, count, ingredients) in recipes {
        let ingredients: Vec<Ingredient> = ingredients.iter().map(|&(i, c)| ing(i, c)).collect();
        builder.add_recipe(res(result), count, &ingredients);
    }
    builder
        .build()
        .expect("fixture catalog should be valid")
}

/// Every master recipe in the catalog, for a snapshot's filtered list.
pub fn all_recipes(catalog: &RecipeCatalog) -> Vec<RecipeId> {
    catalog.recipes().map(|(id, _)| id).collect()
}

// ===========================================================================
// Snapshot builders
// ===========================================================================

/// Snapshot builder pre-loaded with physical stacks and every catalog recipe.
pub fn snapshot_with(catalog: &RecipeCatalog, stacks: &[(u32, u32)]) -> SnapshotBuilder {
    stacks.iter().fold(
        InventorySnapshot::builder(catalog.space()).recipes(all_recipes(catalog)),
        |b, &(i, count)| b.physical(res(i), count),
    )
}

pub fn make_drone(minion: u32, scrap_index: u32, upgrade_count: u32) -> DroneCandidate {
    DroneCandidate {
        key: DroneKey::new(1, minion),
        name: format!("drone-{minion}"),
        upgrade_count,
        locally_owned: true,
        scrap_index: res(scrap_index),
    }
}

// ===========================================================================
// Chain builders
// ===========================================================================

/// A root chain producing one `result` that paid `physical` from stock.
pub fn make_root_chain(result: u32, physical: &[(u32, u32)]) -> RecipeChain {
    let mut deltas = [Delta::default(); 3];
    deltas[0] = Delta {
        index: res(result),
        amount: 1,
    };
    for (slot, &(i, c)) in physical.iter().take(2).enumerate() {
        deltas[slot + 1] = Delta {
            index: res(i),
            amount: -(c as i32),
        };
    }
    let mut physical_cost: Vec<Ingredient> = physical.iter().map(|&(i, c)| ing(i, c)).collect();
    physical_cost.sort_by_key(|i| i.index);
    RecipeChain {
        parent: None,
        step: ChainStep::Craft(RecipeId(0)),
        depth: 1,
        result: res(result),
        result_count: 1,
        physical_cost,
        drone_cost: Vec::new(),
        trade_cost: Vec::new(),
        drone_overflow: Vec::new(),
        deltas,
    }
}
