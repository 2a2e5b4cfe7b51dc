//! Marginal cost of appending one step to a chain prefix.
//!
//! Each ingredient deficit is paid in a fixed order: the prefix's own net
//! surplus, then owned stock the prefix has not spent, then scrap left over
//! from drones the prefix already scrapped, then fresh drones. Trades are
//! never used to pay a recipe ingredient; they enter a chain only as their
//! own [`ChainStep::Trade`] step.

use crate::catalog::{ChefRecipe, Ingredient, RecipeCatalog};
use crate::chain::{
    sparse_add, sparse_count, ChainArena, ChainStep, Delta, DroneRequirement, RecipeChain,
    TradeRequirement,
};
use crate::id::{ChainId, DonorId, DroneKey, ResourceId};
use crate::snapshot::InventorySnapshot;

/// Fully resolved cost of a candidate step, ready to become a chain node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitCost {
    pub result: ResourceId,
    pub result_count: u32,
    pub physical_cost: Vec<Ingredient>,
    pub drone_cost: Vec<DroneRequirement>,
    pub trade_cost: Vec<TradeRequirement>,
    pub drone_overflow: Vec<Ingredient>,
    pub deltas: [Delta; 3],
}

impl SplitCost {
    /// Turn the cost into a chain node appended to `parent`.
    pub fn into_chain(self, parent: Option<(ChainId, u32)>, step: ChainStep) -> RecipeChain {
        RecipeChain {
            parent: parent.map(|(id, _)| id),
            step,
            depth: parent.map(|(_, depth)| depth + 1).unwrap_or(1),
            result: self.result,
            result_count: self.result_count,
            physical_cost: self.physical_cost,
            drone_cost: self.drone_cost,
            trade_cost: self.trade_cost,
            drone_overflow: self.drone_overflow,
            deltas: self.deltas,
        }
    }
}

/// Quick feasibility check for a seed recipe: can owned stock plus drone
/// potential cover every ingredient?
pub fn is_recipe_affordable(recipe: &ChefRecipe, snapshot: &InventorySnapshot, scrap: bool) -> bool {
    recipe.ingredients.iter().all(|ing| {
        let potential = if scrap {
            snapshot.drone_potential(ing.index)
        } else {
            0
        };
        snapshot.physical(ing.index).saturating_add(potential) >= ing.count
    })
}

/// Upper bound on units of `index` a step appended to `parent` could use:
/// positive surplus, unspent stock, and (with scrapping) unused drone potential.
pub fn available_for(
    arena: &ChainArena,
    parent: Option<ChainId>,
    index: ResourceId,
    snapshot: &InventorySnapshot,
    scrap: bool,
) -> u32 {
    let node = parent.and_then(|p| arena.get(p));
    let surplus = parent
        .map(|p| arena.net_surplus_for(p, index).max(0) as u32)
        .unwrap_or(0);
    let spent = node.map(|n| n.physical_spent(index)).unwrap_or(0);
    let mut total = surplus.saturating_add(snapshot.physical(index).saturating_sub(spent));
    if scrap {
        let scrapped: u32 = node
            .map(|n| {
                n.drone_cost
                    .iter()
                    .filter(|d| d.scrap_index == index)
                    .map(|d| d.capacity)
                    .sum()
            })
            .unwrap_or(0);
        let overflow = node.map(|n| n.overflow(index)).unwrap_or(0);
        total = total
            .saturating_add(snapshot.drone_potential(index).saturating_sub(scrapped))
            .saturating_add(overflow);
    }
    total
}

fn sparse_take(vec: &mut Vec<Ingredient>, index: ResourceId, want: u32) -> u32 {
    let Ok(pos) = vec.binary_search_by_key(&index, |i| i.index) else {
        return 0;
    };
    let taken = vec[pos].count.min(want);
    vec[pos].count -= taken;
    if vec[pos].count == 0 {
        vec.remove(pos);
    }
    taken
}

fn merge_trade(vec: &mut Vec<TradeRequirement>, donor: DonorId, index: ResourceId) {
    match vec.binary_search_by_key(&(donor, index), |t| (t.donor, t.index)) {
        Ok(pos) => vec[pos].trades_required += 1,
        Err(pos) => vec.insert(
            pos,
            TradeRequirement {
                donor,
                index,
                trades_required: 1,
            },
        ),
    }
}

/// Resolves split costs. Holds the per-call scratch: the drone carry-over
/// bank and the list of drone keys already used by the chain.
#[derive(Debug, Clone)]
pub struct CostResolver {
    scrap_surplus: Vec<Ingredient>,
    drone_touched: Vec<DroneKey>,
    touched_len: usize,
}

impl CostResolver {
    pub fn new(max_depth: u32) -> Self {
        let mut resolver = Self {
            scrap_surplus: Vec::new(),
            drone_touched: Vec::new(),
            touched_len: 0,
        };
        resolver.set_max_depth(max_depth);
        resolver
    }

    /// Resize the touched-drone buffer to `2 * max_depth + 2`, never shrinking.
    pub fn set_max_depth(&mut self, max_depth: u32) {
        let want = 2 * max_depth as usize + 2;
        if self.drone_touched.len() < want {
            self.drone_touched.resize(want, DroneKey(0));
        }
    }

    pub fn touched_capacity(&self) -> usize {
        self.drone_touched.len()
    }

    fn touch(&mut self, key: DroneKey) {
        if self.touched_len == self.drone_touched.len() {
            let grown = (self.drone_touched.len() * 2).max(2);
            self.drone_touched.resize(grown, DroneKey(0));
        }
        self.drone_touched[self.touched_len] = key;
        self.touched_len += 1;
    }

    fn is_touched(&self, key: DroneKey) -> bool {
        self.drone_touched[..self.touched_len].contains(&key)
    }

    /// Cost of appending `step` to `parent` (or of a root step when `None`).
    /// Returns `None` if some deficit cannot be closed.
    pub fn resolve(
        &mut self,
        arena: &ChainArena,
        parent: Option<ChainId>,
        step: ChainStep,
        catalog: &RecipeCatalog,
        snapshot: &InventorySnapshot,
        scrap: bool,
    ) -> Option<SplitCost> {
        let node = match parent {
            Some(p) => Some(arena.get(p)?),
            None => None,
        };
        match step {
            ChainStep::Craft(id) => {
                let recipe = catalog.get_recipe(id)?;
                self.resolve_craft(arena, parent, node, recipe, snapshot, scrap)
            }
            ChainStep::Trade { donor, index } => Self::resolve_trade(node, donor, index, snapshot),
        }
    }

    fn resolve_craft(
        &mut self,
        arena: &ChainArena,
        parent: Option<ChainId>,
        node: Option<&RecipeChain>,
        recipe: &ChefRecipe,
        snapshot: &InventorySnapshot,
        scrap: bool,
    ) -> Option<SplitCost> {
        self.scrap_surplus.clear();
        self.touched_len = 0;
        let mut physical_cost = Vec::with_capacity(node.map_or(0, |n| n.physical_cost.len()) + 2);
        let mut drone_cost = Vec::new();
        let mut trade_cost = Vec::new();
        if let Some(n) = node {
            physical_cost.extend_from_slice(&n.physical_cost);
            drone_cost.extend_from_slice(&n.drone_cost);
            trade_cost.extend_from_slice(&n.trade_cost);
            self.scrap_surplus.extend_from_slice(&n.drone_overflow);
            for d in &n.drone_cost {
                self.touch(d.key);
            }
        }

        let mut deltas = [Delta::default(); 3];
        deltas[0] = Delta {
            index: recipe.result,
            amount: recipe.result_count as i32,
        };

        for (slot, ing) in recipe.ingredients.iter().enumerate().take(2) {
            deltas[slot + 1] = Delta {
                index: ing.index,
                amount: -(ing.count as i32),
            };

            let surplus = parent
                .map(|p| arena.net_surplus_for(p, ing.index).max(0) as u32)
                .unwrap_or(0);
            let mut remaining = ing.count.saturating_sub(surplus);
            if remaining == 0 {
                continue;
            }

            let unspent = snapshot
                .physical(ing.index)
                .saturating_sub(sparse_count(&physical_cost, ing.index));
            let take = unspent.min(remaining);
            sparse_add(&mut physical_cost, ing.index, take);
            remaining -= take;
            if remaining == 0 {
                continue;
            }

            if !scrap {
                return None;
            }
            remaining -= sparse_take(&mut self.scrap_surplus, ing.index, remaining);

            for candidate in snapshot.drone_candidates(ing.index) {
                if remaining == 0 {
                    break;
                }
                if self.is_touched(candidate.key) {
                    continue;
                }
                let capacity = candidate.capacity();
                let used = capacity.min(remaining);
                remaining -= used;
                sparse_add(&mut self.scrap_surplus, ing.index, capacity - used);
                drone_cost.push(DroneRequirement {
                    key: candidate.key,
                    scrap_index: ing.index,
                    count: 1,
                    capacity,
                    units: used,
                });
                self.touch(candidate.key);
            }
            if remaining > 0 {
                return None;
            }
        }

        Some(SplitCost {
            result: recipe.result,
            result_count: recipe.result_count,
            physical_cost,
            drone_cost,
            trade_cost,
            drone_overflow: self.scrap_surplus.clone(),
            deltas,
        })
    }

    fn resolve_trade(
        node: Option<&RecipeChain>,
        donor: DonorId,
        index: ResourceId,
        snapshot: &InventorySnapshot,
    ) -> Option<SplitCost> {
        let ally = snapshot.ally(donor)?;
        let traded = node.map_or(0, |n| n.traded(donor, index));
        let trades_used = node.map_or(0, |n| n.trades_with(donor));
        if ally.stack(index) <= traded || ally.remaining_trades <= trades_used {
            return None;
        }

        let mut trade_cost = node.map(|n| n.trade_cost.clone()).unwrap_or_default();
        merge_trade(&mut trade_cost, donor, index);
        let mut deltas = [Delta::default(); 3];
        deltas[0] = Delta { index, amount: 1 };

        Some(SplitCost {
            result: index,
            result_count: 1,
            physical_cost: node.map(|n| n.physical_cost.clone()).unwrap_or_default(),
            drone_cost: node.map(|n| n.drone_cost.clone()).unwrap_or_default(),
            trade_cost,
            drone_overflow: node.map(|n| n.drone_overflow.clone()).unwrap_or_default(),
            deltas,
        })
    }
}
