//! The unified resource index space and coarse tier weights.

use crate::id::ResourceId;
use serde::{Deserialize, Serialize};

/// Flat numbering over every craftable unit type: items occupy
/// `[0, item_count)`, equipment occupies `[item_count, total)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceSpace {
    pub item_count: u32,
    pub equipment_count: u32,
}

impl ResourceSpace {
    pub fn new(item_count: u32, equipment_count: u32) -> Self {
        Self {
            item_count,
            equipment_count,
        }
    }

    /// Total number of unified indices.
    pub fn total(&self) -> usize {
        (self.item_count + self.equipment_count) as usize
    }

    pub fn contains(&self, id: ResourceId) -> bool {
        id.index() < self.total()
    }

    pub fn is_item(&self, id: ResourceId) -> bool {
        id.0 < self.item_count
    }

    pub fn is_equipment(&self, id: ResourceId) -> bool {
        id.0 >= self.item_count && self.contains(id)
    }

    /// Unified index of the `n`th equipment definition.
    pub fn equipment(&self, n: u32) -> ResourceId {
        ResourceId(self.item_count + n)
    }
}

/// Coarse rarity class of a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceTier {
    Tier1,
    Tier2,
    Tier3,
    Lunar,
    Boss,
    VoidTier1,
    VoidTier2,
    VoidTier3,
    VoidBoss,
    FoodTier,
    Equipment,
    #[default]
    NoTier,
}

impl ResourceTier {
    /// Policy weight used by the inefficiency gate. Tuned for one game's
    /// economy; not derived from anything.
    pub fn weight(self) -> u32 {
        match self {
            ResourceTier::Tier1 | ResourceTier::Lunar | ResourceTier::VoidTier1 => 1,
            ResourceTier::Tier2 | ResourceTier::VoidTier2 => 2,
            ResourceTier::Tier3
            | ResourceTier::Boss
            | ResourceTier::VoidBoss
            | ResourceTier::FoodTier
            | ResourceTier::VoidTier3 => 4,
            ResourceTier::Equipment => 3,
            ResourceTier::NoTier => 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn items_precede_equipment() {
        let space = ResourceSpace::new(10, 3);
        assert_eq!(space.total(), 13);
        assert!(space.is_item(ResourceId(9)));
        assert!(space.is_equipment(ResourceId(10)));
        assert!(space.is_equipment(space.equipment(2)));
        assert!(!space.contains(ResourceId(13)));
        assert!(!space.is_equipment(ResourceId(13)));
    }

    #[test]
    fn tier_weights_match_policy_table() {
        assert_eq!(ResourceTier::Tier1.weight(), 1);
        assert_eq!(ResourceTier::Lunar.weight(), 1);
        assert_eq!(ResourceTier::VoidTier2.weight(), 2);
        assert_eq!(ResourceTier::Boss.weight(), 4);
        assert_eq!(ResourceTier::FoodTier.weight(), 4);
        assert_eq!(ResourceTier::Equipment.weight(), 3);
        assert_eq!(ResourceTier::NoTier.weight(), 1);
    }
}
