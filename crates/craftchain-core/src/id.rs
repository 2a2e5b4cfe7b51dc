use serde::{Deserialize, Serialize};
use slotmap::new_key_type;

new_key_type! {
    /// Identifies a chain node in the per-pass chain arena.
    pub struct ChainId;
}

/// Unified resource index: items first, then equipment. Cheap to copy and compare.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct ResourceId(pub u32);

impl ResourceId {
    /// The index as a `usize`, for array lookups.
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Stable master index of a recipe in the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RecipeId(pub u32);

impl RecipeId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Identifies an allied player who can donate items.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct DonorId(pub u32);

/// Owner-scoped identity of a single drone: owner master id in the high
/// 32 bits, minion instance id in the low 32 bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DroneKey(pub u64);

impl DroneKey {
    pub fn new(owner_master_id: u32, minion_id: u32) -> Self {
        Self(((owner_master_id as u64) << 32) | minion_id as u64)
    }

    pub fn owner_master_id(self) -> u32 {
        (self.0 >> 32) as u32
    }

    pub fn minion_id(self) -> u32 {
        self.0 as u32
    }
}
