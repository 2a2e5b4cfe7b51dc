//! Immutable inventory snapshot consumed by one compute pass.
//!
//! The snapshot is produced by the inventory-observation layer. It carries
//! everything the planner may spend: physical stacks, drones that could be
//! scrapped into a specific resource, and allied players willing to trade.

use crate::id::{DonorId, DroneKey, RecipeId, ResourceId};
use crate::mask::ResourceMask;
use crate::resource::ResourceSpace;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Units of scrap yielded by scrapping a drone with `upgrade_count` upgrades.
pub fn drone_scrap_capacity(upgrade_count: u32) -> u32 {
    upgrade_count.saturating_add(1)
}

/// A drone that can be scrapped into one unit type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DroneCandidate {
    pub key: DroneKey,
    pub name: String,
    pub upgrade_count: u32,
    /// Owned by the local player (preferred over allies' drones).
    pub locally_owned: bool,
    /// Resource this drone scraps into.
    pub scrap_index: ResourceId,
}

impl DroneCandidate {
    pub fn capacity(&self) -> u32 {
        drone_scrap_capacity(self.upgrade_count)
    }
}

/// Cached inventory and trade budget of one allied player.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllyInventory {
    pub donor: DonorId,
    pub stacks: BTreeMap<ResourceId, u32>,
    /// Trades this donor may still perform, across all items.
    pub remaining_trades: u32,
}

impl AllyInventory {
    pub fn new(donor: DonorId, remaining_trades: u32) -> Self {
        Self {
            donor,
            stacks: BTreeMap::new(),
            remaining_trades,
        }
    }

    pub fn with_stack(mut self, index: ResourceId, count: u32) -> Self {
        self.stacks.insert(index, count);
        self
    }

    pub fn stack(&self, index: ResourceId) -> u32 {
        self.stacks.get(&index).copied().unwrap_or(0)
    }
}

/// Everything the planner may spend in one pass, plus the active recipe list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InventorySnapshot {
    space: ResourceSpace,
    physical: Vec<u32>,
    drone_potential: Vec<u32>,
    drone_candidates: BTreeMap<ResourceId, Vec<DroneCandidate>>,
    allies: Vec<AllyInventory>,
    can_scrap_drones: bool,
    pooling_enabled: bool,
    recipes: Vec<RecipeId>,
    display_overrides: BTreeMap<ResourceId, ResourceId>,
    owned_mask: ResourceMask,
    potential_mask: ResourceMask,
}

impl InventorySnapshot {
    pub fn builder(space: ResourceSpace) -> SnapshotBuilder {
        SnapshotBuilder::new(space)
    }

    pub fn space(&self) -> ResourceSpace {
        self.space
    }

    /// Raw physical stack array, indexed by unified index. May be shorter
    /// than the resource space if the observer supplied partial data.
    pub fn physical_stacks(&self) -> &[u32] {
        &self.physical
    }

    pub fn physical(&self, id: ResourceId) -> u32 {
        self.physical.get(id.index()).copied().unwrap_or(0)
    }

    /// Total scrap units obtainable by scrapping every candidate for `id`.
    pub fn drone_potential(&self, id: ResourceId) -> u32 {
        self.drone_potential.get(id.index()).copied().unwrap_or(0)
    }

    /// Candidates for `id`, sorted by upgrade count, local owner first, then name.
    pub fn drone_candidates(&self, id: ResourceId) -> &[DroneCandidate] {
        self.drone_candidates
            .get(&id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn allies(&self) -> &[AllyInventory] {
        &self.allies
    }

    pub fn ally(&self, donor: DonorId) -> Option<&AllyInventory> {
        self.allies.iter().find(|a| a.donor == donor)
    }

    pub fn can_scrap_drones(&self) -> bool {
        self.can_scrap_drones
    }

    pub fn pooling_enabled(&self) -> bool {
        self.pooling_enabled
    }

    /// The externally filtered recipe list to plan against.
    pub fn recipes(&self) -> &[RecipeId] {
        &self.recipes
    }

    /// Index a result should be shown as (corruption/transformation remaps).
    pub fn display_index(&self, id: ResourceId) -> ResourceId {
        self.display_overrides.get(&id).copied().unwrap_or(id)
    }

    pub fn display_overrides(&self) -> &BTreeMap<ResourceId, ResourceId> {
        &self.display_overrides
    }

    /// Indices with a positive physical stack.
    pub fn owned_mask(&self) -> &ResourceMask {
        &self.owned_mask
    }

    /// Indices obtainable by scrapping at least one drone.
    pub fn potential_mask(&self) -> &ResourceMask {
        &self.potential_mask
    }
}

/// Builder for [`InventorySnapshot`]; derives potentials and masks on `build`.
#[derive(Debug, Clone)]
pub struct SnapshotBuilder {
    space: ResourceSpace,
    physical: Vec<u32>,
    drones: Vec<DroneCandidate>,
    allies: Vec<AllyInventory>,
    can_scrap_drones: bool,
    pooling_enabled: bool,
    recipes: Vec<RecipeId>,
    display_overrides: BTreeMap<ResourceId, ResourceId>,
}

impl SnapshotBuilder {
    pub fn new(space: ResourceSpace) -> Self {
        Self {
            space,
            physical: vec![0; space.total()],
            drones: Vec::new(),
            allies: Vec::new(),
            can_scrap_drones: false,
            pooling_enabled: false,
            recipes: Vec::new(),
            display_overrides: BTreeMap::new(),
        }
    }

    /// Set the physical stack of one resource. Out-of-range ids are ignored.
    pub fn physical(mut self, id: ResourceId, count: u32) -> Self {
        if let Some(slot) = self.physical.get_mut(id.index()) {
            *slot = count;
        }
        self
    }

    /// Replace the whole physical array as delivered by the observer.
    pub fn physical_stacks(mut self, stacks: Vec<u32>) -> Self {
        self.physical = stacks;
        self
    }

    pub fn drone(mut self, candidate: DroneCandidate) -> Self {
        self.drones.push(candidate);
        self
    }

    pub fn ally(mut self, ally: AllyInventory) -> Self {
        self.allies.push(ally);
        self
    }

    pub fn can_scrap_drones(mut self, enabled: bool) -> Self {
        self.can_scrap_drones = enabled;
        self
    }

    pub fn pooling_enabled(mut self, enabled: bool) -> Self {
        self.pooling_enabled = enabled;
        self
    }

    pub fn recipes(mut self, recipes: impl IntoIterator<Item = RecipeId>) -> Self {
        self.recipes = recipes.into_iter().collect();
        self
    }

    pub fn display_override(mut self, from: ResourceId, to: ResourceId) -> Self {
        self.display_overrides.insert(from, to);
        self
    }

    pub fn build(self) -> InventorySnapshot {
        let total = self.space.total();
        let mut owned_mask = ResourceMask::with_capacity(total);
        for (i, &count) in self.physical.iter().enumerate().take(total) {
            if count > 0 {
                owned_mask.set(ResourceId(i as u32));
            }
        }

        let mut drone_potential = vec![0u32; total];
        let mut potential_mask = ResourceMask::with_capacity(total);
        let mut drone_candidates: BTreeMap<ResourceId, Vec<DroneCandidate>> = BTreeMap::new();
        for drone in self.drones {
            let Some(slot) = drone_potential.get_mut(drone.scrap_index.index()) else {
                continue;
            };
            *slot = slot.saturating_add(drone.capacity());
            potential_mask.set(drone.scrap_index);
            drone_candidates
                .entry(drone.scrap_index)
                .or_default()
                .push(drone);
        }
        for list in drone_candidates.values_mut() {
            list.sort_by(|a, b| {
                a.upgrade_count
                    .cmp(&b.upgrade_count)
                    .then(b.locally_owned.cmp(&a.locally_owned))
                    .then_with(|| a.name.cmp(&b.name))
                    .then(a.key.cmp(&b.key))
            });
        }

        InventorySnapshot {
            space: self.space,
            physical: self.physical,
            drone_potential,
            drone_candidates,
            allies: self.allies,
            can_scrap_drones: self.can_scrap_drones,
            pooling_enabled: self.pooling_enabled,
            recipes: self.recipes,
            display_overrides: self.display_overrides,
            owned_mask,
            potential_mask,
        }
    }
}
