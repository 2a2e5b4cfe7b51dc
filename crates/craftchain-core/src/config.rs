use serde::{Deserialize, Serialize};

/// Largest accepted `max_depth`. Frontier buckets pack vector lengths into
/// 10 bits each.
pub const MAX_SUPPORTED_DEPTH: u32 = 1023;

/// Static planner ceilings and feature toggles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
    /// BFS depth ceiling. Changing it resizes scratch buffers.
    pub max_depth: u32,
    /// Admission cap per result index.
    pub max_chains_per_result: usize,
    /// Missing bridge items explored per chain.
    pub max_bridge_items_per_chain: usize,
    /// Producers tried per bridge item.
    pub max_producers_per_bridge: usize,
    /// Trade children synthesized per parent chain.
    pub max_trade_children_per_chain: usize,
    /// Allow paying deficits by scrapping drones.
    pub scrap_drones: bool,
    /// Allow bridging one-unit deficits with ally trades.
    pub ally_pooling: bool,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            max_depth: 3,
            max_chains_per_result: 16,
            max_bridge_items_per_chain: 4,
            max_producers_per_bridge: 4,
            max_trade_children_per_chain: 32,
            scrap_drones: true,
            ally_pooling: true,
        }
    }
}

impl PlannerConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_depth == 0 || self.max_depth > MAX_SUPPORTED_DEPTH {
            return Err(ConfigError::DepthOutOfRange(self.max_depth));
        }
        if self.max_chains_per_result == 0 {
            return Err(ConfigError::ZeroChainLimit);
        }
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("max_depth {0} outside 1..={MAX_SUPPORTED_DEPTH}")]
    DepthOutOfRange(u32),
    #[error("max_chains_per_result must be at least 1")]
    ZeroChainLimit,
}
