//! pool configuration
//!
//! loaded from YAML; missing keys fall back to [`PoolConfig::default`].
//!
//! ```yaml
//! min_asp_stake: 10000
//! approval_threshold: 2
//! ragequit_delay: 86400
//! ragequit_window: 604800
//! root_history_size: 100
//! max_tree_depth: 32
//! max_batch_size: 64
//! stake_asset: 0
//! ```

use serde::{Deserialize, Serialize};

use crate::{Amount, AssetId, PoolError, Result};

/// deepest tree the pool will accept
pub const MAX_TREE_DEPTH: usize = lean_imt::MAX_SUPPORTED_DEPTH;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    /// minimum stake escrowed by an asp at registration
    pub min_asp_stake: Amount,
    /// distinct auditor votes needed to activate an asp
    pub approval_threshold: u32,
    /// seconds between a ragequit request and its earliest execution
    pub ragequit_delay: u64,
    /// seconds after `executable_at` during which a ragequit may execute
    pub ragequit_window: u64,
    /// recent roots retained per tree
    pub root_history_size: usize,
    /// depth cap for the deposit tree and association sets
    pub max_tree_depth: usize,
    /// upper bound for batch deposits and set insertions
    pub max_batch_size: usize,
    /// asset asp stakes are paid in
    pub stake_asset: AssetId,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            min_asp_stake: 10_000,
            approval_threshold: 2,
            ragequit_delay: 86_400,
            ragequit_window: 604_800,
            root_history_size: 100,
            max_tree_depth: lean_imt::DEFAULT_MAX_DEPTH,
            max_batch_size: 64,
            stake_asset: 0,
        }
    }
}

impl PoolConfig {
    /// parse and validate
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Self =
            serde_yaml::from_str(yaml).map_err(|e| PoolError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).map_err(|e| PoolError::Config(e.to_string()))
    }

    pub fn validate(&self) -> Result<()> {
        if self.approval_threshold == 0 {
            return Err(PoolError::Config("approval_threshold must be at least 1".into()));
        }
        if self.root_history_size == 0 {
            return Err(PoolError::Config("root_history_size must be at least 1".into()));
        }
        if self.max_tree_depth == 0 || self.max_tree_depth > MAX_TREE_DEPTH {
            return Err(PoolError::Config(format!(
                "max_tree_depth must be within 1..={}",
                MAX_TREE_DEPTH
            )));
        }
        if self.max_batch_size == 0 {
            return Err(PoolError::Config("max_batch_size must be at least 1".into()));
        }
        if self.ragequit_delay.checked_add(self.ragequit_window).is_none() {
            return Err(PoolError::Config("ragequit_delay + ragequit_window overflows".into()));
        }
        Ok(())
    }
}
