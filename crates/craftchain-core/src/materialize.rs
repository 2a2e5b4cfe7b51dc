//! Turns the per-pass chain map into the externally visible result list.

use crate::catalog::Ingredient;
use crate::chain::{ChainArena, ChainStep, DroneRequirement, TradeRequirement};
use crate::id::{ChainId, DonorId, ResourceId};
use crate::snapshot::InventorySnapshot;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// Ordering applied to the final entry list.
pub type EntryOrder = fn(&CraftableEntry, &CraftableEntry) -> Ordering;

/// An arena-independent copy of one accepted chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlannedChain {
    /// Root first.
    pub steps: Vec<ChainStep>,
    pub depth: u32,
    pub result: ResourceId,
    pub result_count: u32,
    pub physical_cost: Vec<Ingredient>,
    pub drone_cost: Vec<DroneRequirement>,
    pub trade_cost: Vec<TradeRequirement>,
}

impl PlannedChain {
    pub fn from_arena(arena: &ChainArena, id: ChainId) -> Option<Self> {
        let node = arena.get(id)?;
        Some(Self {
            steps: arena.steps(id),
            depth: node.depth,
            result: node.result,
            result_count: node.result_count,
            physical_cost: node.physical_cost.clone(),
            drone_cost: node.drone_cost.clone(),
            trade_cost: node.trade_cost.clone(),
        })
    }

    /// How many times this chain can be run against `snapshot` right now.
    ///
    /// Takes the minimum over owned stock per ingredient, drone potential per
    /// scrap index, and each donor's `min(stack, remaining trades)` per
    /// traded item. A chain with no cost at all returns `u32::MAX`.
    pub fn max_affordable(&self, snapshot: &InventorySnapshot) -> u32 {
        let mut best = u32::MAX;

        for ing in &self.physical_cost {
            if ing.count > 0 {
                best = best.min(snapshot.physical(ing.index) / ing.count);
            }
        }

        let mut drone_units: BTreeMap<ResourceId, u32> = BTreeMap::new();
        for d in &self.drone_cost {
            *drone_units.entry(d.scrap_index).or_default() += d.units;
        }
        for (&index, &units) in &drone_units {
            if units > 0 {
                best = best.min(snapshot.drone_potential(index) / units);
            }
        }

        let mut per_donor: BTreeMap<DonorId, u32> = BTreeMap::new();
        for t in &self.trade_cost {
            if t.trades_required == 0 {
                continue;
            }
            let Some(ally) = snapshot.ally(t.donor) else {
                return 0;
            };
            best = best.min(ally.stack(t.index) / t.trades_required);
            *per_donor.entry(t.donor).or_default() += t.trades_required;
        }
        for (donor, trades) in per_donor {
            let budget = snapshot.ally(donor).map_or(0, |a| a.remaining_trades);
            best = best.min(budget / trades);
        }

        best
    }
}

/// One producible result and the chains that make it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CraftableEntry {
    /// Index to display; differs from `source` when an override applies.
    pub result: ResourceId,
    /// Index the chains actually produce.
    pub source: ResourceId,
    pub result_count: u32,
    pub min_depth: u32,
    /// Sorted by drone count, then depth.
    pub chains: Vec<PlannedChain>,
}

/// Default entry order: result index, then shallowest chain.
pub fn default_entry_order(a: &CraftableEntry, b: &CraftableEntry) -> Ordering {
    a.result
        .cmp(&b.result)
        .then(a.min_depth.cmp(&b.min_depth))
        .then(a.source.cmp(&b.source))
}

/// Build the entry list from accepted chains grouped by result.
///
/// A chain survives if it produces the key it is filed under, it is not a
/// lone depth-1 trade, and its net surplus of the result equals its result
/// count.
pub fn materialize(
    arena: &ChainArena,
    discovered: &BTreeMap<ResourceId, Vec<ChainId>>,
    snapshot: &InventorySnapshot,
    order: Option<EntryOrder>,
) -> Vec<CraftableEntry> {
    let mut entries = Vec::with_capacity(discovered.len());

    for (&result, ids) in discovered {
        let mut chains: Vec<PlannedChain> = ids
            .iter()
            .filter(|&&id| {
                arena.get(id).is_some_and(|node| {
                    node.result == result
                        && !(node.depth == 1 && node.step.is_trade())
                        && arena.result_surplus(id) == node.result_count as i32
                })
            })
            .filter_map(|&id| PlannedChain::from_arena(arena, id))
            .collect();
        if chains.is_empty() {
            continue;
        }
        chains.sort_by_key(|c| (c.drone_cost.len(), c.depth));

        entries.push(CraftableEntry {
            result: snapshot.display_index(result),
            source: result,
            result_count: chains[0].result_count,
            min_depth: chains[0].depth,
            chains,
        });
    }

    entries.sort_by(order.unwrap_or(default_entry_order));
    entries
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::{Delta, RecipeChain};
    use crate::id::{DroneKey, RecipeId};
    use crate::resource::ResourceSpace;
    use crate::snapshot::AllyInventory;

    const A: ResourceId = ResourceId(0);
    const R: ResourceId = ResourceId(1);

    fn craft(parent: Option<ChainId>, depth: u32, result: ResourceId, ing: ResourceId) -> RecipeChain {
        RecipeChain {
            parent,
            step: ChainStep::Craft(RecipeId(depth)),
            depth,
            result,
            result_count: 1,
            physical_cost: vec![Ingredient::new(ing, 1)],
            drone_cost: Vec::new(),
            trade_cost: Vec::new(),
            drone_overflow: Vec::new(),
            deltas: [
                Delta {
                    index: result,
                    amount: 1,
                },
                Delta {
                    index: ing,
                    amount: -1,
                },
                Delta::default(),
            ],
        }
    }

    fn snapshot() -> InventorySnapshot {
        InventorySnapshot::builder(ResourceSpace::new(4, 0))
            .physical(A, 5)
            .display_override(R, ResourceId(3))
            .build()
    }

    #[test]
    fn sorts_by_drones_then_depth() {
        let mut arena = ChainArena::new();
        let mut with_drone = craft(None, 1, R, A);
        with_drone.drone_cost.push(DroneRequirement {
            key: DroneKey::new(1, 1),
            scrap_index: A,
            count: 1,
            capacity: 1,
            units: 1,
        });
        let droned = arena.insert(with_drone);
        let root = arena.insert(craft(None, 1, ResourceId(2), A));
        let deep = arena.insert(craft(Some(root), 2, R, ResourceId(2)));

        let mut discovered = BTreeMap::new();
        discovered.insert(R, vec![droned, deep]);
        let entries = materialize(&arena, &discovered, &snapshot(), None);
        assert_eq!(entries.len(), 1);
        let entry = &entries[0];
        assert_eq!(entry.result, ResourceId(3));
        assert_eq!(entry.source, R);
        assert_eq!(entry.min_depth, 2);
        assert!(entry.chains[0].drone_cost.is_empty());
        assert_eq!(entry.chains[1].depth, 1);
    }

    fn trade(parent: Option<ChainId>, depth: u32, index: ResourceId) -> RecipeChain {
        let mut chain = craft(parent, depth, index, index);
        chain.step = ChainStep::Trade {
            donor: DonorId(1),
            index,
        };
        chain.physical_cost.clear();
        chain.deltas = [
            Delta {
                index,
                amount: 1,
            },
            Delta::default(),
            Delta::default(),
        ];
        chain
    }

    #[test]
    fn lone_trade_is_not_surfaced() {
        let mut arena = ChainArena::new();
        let id = arena.insert(trade(None, 1, A));
        let mut discovered = BTreeMap::new();
        discovered.insert(A, vec![id]);
        assert!(materialize(&arena, &discovered, &snapshot(), None).is_empty());
    }

    #[test]
    fn deeper_trade_terminated_chain_is_surfaced() {
        let mut arena = ChainArena::new();
        let root = arena.insert(craft(None, 1, R, A));
        let traded = arena.insert(trade(Some(root), 2, ResourceId(2)));
        let mut discovered = BTreeMap::new();
        discovered.insert(ResourceId(2), vec![traded]);
        let entries = materialize(&arena, &discovered, &snapshot(), None);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].source, ResourceId(2));
        assert_eq!(entries[0].min_depth, 2);
        assert!(entries[0].chains[0].steps[1].is_trade());
    }

    #[test]
    fn overproduction_is_filtered() {
        let mut arena = ChainArena::new();
        let root = arena.insert(craft(None, 1, R, A));
        // Crafting R twice leaves a surplus of 2 for a result count of 1.
        let twice = arena.insert(craft(Some(root), 2, R, A));
        let mut discovered = BTreeMap::new();
        discovered.insert(R, vec![root, twice]);
        let entries = materialize(&arena, &discovered, &snapshot(), None);
        assert_eq!(entries[0].chains.len(), 1);
        assert_eq!(entries[0].chains[0].depth, 1);
    }

    #[test]
    fn max_affordable_takes_minimum() {
        let chain = PlannedChain {
            steps: vec![ChainStep::Craft(RecipeId(0))],
            depth: 1,
            result: R,
            result_count: 1,
            physical_cost: vec![Ingredient::new(A, 2)],
            drone_cost: Vec::new(),
            trade_cost: vec![TradeRequirement {
                donor: DonorId(7),
                index: ResourceId(2),
                trades_required: 1,
            }],
        };
        let snap = InventorySnapshot::builder(ResourceSpace::new(4, 0))
            .physical(A, 9)
            .ally(AllyInventory::new(DonorId(7), 3).with_stack(ResourceId(2), 10))
            .build();
        assert_eq!(chain.max_affordable(&snap), 3);

        let poorer = InventorySnapshot::builder(ResourceSpace::new(4, 0))
            .physical(A, 9)
            .build();
        assert_eq!(chain.max_affordable(&poorer), 0);
    }

    #[test]
    fn free_chain_is_unbounded() {
        let chain = PlannedChain {
            steps: Vec::new(),
            depth: 1,
            result: R,
            result_count: 1,
            physical_cost: Vec::new(),
            drone_cost: Vec::new(),
            trade_cost: Vec::new(),
        };
        assert_eq!(chain.max_affordable(&snapshot()), u32::MAX);
    }
}
