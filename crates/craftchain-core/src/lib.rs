//! Craftchain Core -- bounded-depth crafting-chain planning.
//!
//! Given an inventory snapshot and a catalog of two-ingredient recipes, the
//! planner enumerates, for every producible result, the non-dominated
//! multi-step chains reachable within a configured depth. Costs are split
//! across three payment channels: owned stock, drone scrap, and ally trades.
//!
//! # Pass Pipeline
//!
//! Each call to [`planner::CraftPlanner::compute`] runs these phases:
//!
//! 1. **Gate** -- Skip the pass if no changed index is relevant.
//! 2. **Index** -- Rebuild the active recipe subset and requirement masks.
//! 3. **Seed** -- Admit every affordable single-step chain.
//! 4. **Expand** -- Grow chains layer by layer up to `max_depth`, using the
//!    surplus/deficit profile to pick candidates and ally trades to bridge
//!    one-unit gaps.
//! 5. **Materialize** -- Filter, sort and emit [`materialize::CraftableEntry`]
//!    values.
//!
//! ```rust,ignore
//! let mut planner = CraftPlanner::new(catalog, PlannerConfig::default())?;
//! if let ComputeOutcome::Updated(entries) = planner.compute(&snapshot, &ChangeSet::forced()) {
//!     for entry in &entries {
//!         println!("{:?} in {} steps", entry.result, entry.min_depth);
//!     }
//! }
//! ```
//!
//! # Key Types
//!
//! - [`catalog::RecipeCatalog`] -- Immutable recipes with static producer and
//!   consumer adjacency (built through [`catalog::CatalogBuilder`]).
//! - [`snapshot::InventorySnapshot`] -- Everything a pass may spend.
//! - [`chain::ChainArena`] -- Per-pass slot map of parent-linked chain nodes.
//! - [`cost::CostResolver`] -- Marginal cost of appending one step.
//! - [`dominance::DominanceIndex`] -- Exact-shape table plus Pareto frontier.
//! - [`capture`] -- Versioned bitcode capture of a pass's inputs for replay.

pub mod capture;
pub mod catalog;
pub mod chain;
pub mod config;
pub mod cost;
pub mod dominance;
pub mod id;
pub mod mask;
pub mod materialize;
pub mod planner;
pub mod recipe_index;
pub mod resource;
pub mod snapshot;
pub mod stamp;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
