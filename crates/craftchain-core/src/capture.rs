//! Binary capture of one planner pass's inputs.
//!
//! A [`PlanCapture`] bundles the config, catalog and snapshot so a pass can
//! be replayed offline. Encoding uses `bitcode` behind a versioned header.

use crate::catalog::RecipeCatalog;
use crate::config::{ConfigError, PlannerConfig};
use crate::planner::{ChangeSet, ComputeOutcome, CraftPlanner};
use crate::snapshot::InventorySnapshot;
use serde::{Deserialize, Serialize};

/// Magic number identifying a planner capture.
pub const CAPTURE_MAGIC: u32 = 0xC4AF_0001;

/// Current format version. Increment when breaking the wire format.
pub const CAPTURE_VERSION: u32 = 1;

#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    #[error("bitcode encoding failed: {0}")]
    Encode(String),
    #[error("bitcode decoding failed: {0}")]
    Decode(String),
    #[error("invalid magic number: expected 0x{:08X}, got 0x{:08X}", CAPTURE_MAGIC, .0)]
    InvalidMagic(u32),
    #[error("unsupported capture version: expected {}, got {}", CAPTURE_VERSION, .0)]
    UnsupportedVersion(u32),
    #[error("capture from future version {0} (this build supports up to {CAPTURE_VERSION})")]
    FutureVersion(u32),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureHeader {
    pub magic: u32,
    pub version: u32,
}

impl Default for CaptureHeader {
    fn default() -> Self {
        Self {
            magic: CAPTURE_MAGIC,
            version: CAPTURE_VERSION,
        }
    }
}

impl CaptureHeader {
    pub fn validate(&self) -> Result<(), CaptureError> {
        if self.magic != CAPTURE_MAGIC {
            return Err(CaptureError::InvalidMagic(self.magic));
        }
        if self.version > CAPTURE_VERSION {
            return Err(CaptureError::FutureVersion(self.version));
        }
        if self.version < CAPTURE_VERSION {
            return Err(CaptureError::UnsupportedVersion(self.version));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanCapture {
    pub header: CaptureHeader,
    pub config: PlannerConfig,
    pub catalog: RecipeCatalog,
    pub snapshot: InventorySnapshot,
}

impl PlanCapture {
    pub fn new(config: PlannerConfig, catalog: RecipeCatalog, snapshot: InventorySnapshot) -> Self {
        Self {
            header: CaptureHeader::default(),
            config,
            catalog,
            snapshot,
        }
    }

    pub fn encode(&self) -> Result<Vec<u8>, CaptureError> {
        bitcode::serialize(self).map_err(|e| CaptureError::Encode(e.to_string()))
    }

    pub fn decode(data: &[u8]) -> Result<Self, CaptureError> {
        let capture: PlanCapture =
            bitcode::deserialize(data).map_err(|e| CaptureError::Decode(e.to_string()))?;
        capture.header.validate()?;
        Ok(capture)
    }

    /// Run one forced pass over the captured inputs.
    pub fn replay(&self) -> Result<ComputeOutcome, ConfigError> {
        let mut planner = CraftPlanner::new(self.catalog.clone(), self.config.clone())?;
        Ok(planner.compute(&self.snapshot, &ChangeSet::forced()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{CatalogBuilder, Ingredient};
    use crate::id::{RecipeId, ResourceId};
    use crate::resource::ResourceSpace;

    fn capture() -> PlanCapture {
        let space = ResourceSpace::new(3, 1);
        let mut b = CatalogBuilder::new(space);
        b.add_recipe(
            ResourceId(2),
            1,
            &[Ingredient::new(ResourceId(0), 1), Ingredient::new(ResourceId(1), 1)],
        );
        let snapshot = InventorySnapshot::builder(space)
            .physical(ResourceId(0), 1)
            .physical(ResourceId(1), 1)
            .recipes([RecipeId(0)])
            .build();
        PlanCapture::new(PlannerConfig::default(), b.build().unwrap(), snapshot)
    }

    #[test]
    fn encode_then_replay() {
        let bytes = capture().encode().unwrap();
        let decoded = PlanCapture::decode(&bytes).unwrap();
        assert_eq!(decoded.config, PlannerConfig::default());
        let outcome = decoded.replay().unwrap();
        assert_eq!(outcome.entries().unwrap().len(), 1);
        assert_eq!(outcome, capture().replay().unwrap());
    }

    #[test]
    fn wrong_magic_rejected() {
        let mut c = capture();
        c.header.magic = 0xDEAD_BEEF;
        let bytes = c.encode().unwrap();
        match PlanCapture::decode(&bytes) {
            Err(CaptureError::InvalidMagic(0xDEAD_BEEF)) => {}
            other => panic!("expected InvalidMagic, got: {other:?}"),
        }
    }

    #[test]
    fn future_version_rejected() {
        let mut c = capture();
        c.header.version = CAPTURE_VERSION + 1;
        let bytes = c.encode().unwrap();
        assert!(matches!(
            PlanCapture::decode(&bytes),
            Err(CaptureError::FutureVersion(_))
        ));
    }

    #[test]
    fn garbage_fails_decode() {
        assert!(matches!(
            PlanCapture::decode(&[1, 2, 3]),
            Err(CaptureError::Decode(_))
        ));
    }
}
