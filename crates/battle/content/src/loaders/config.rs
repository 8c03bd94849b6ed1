//! Battle tunables loader.

use std::path::Path;

use battle_core::BattleConfig;

use crate::loaders::{LoadResult, read_file};

/// Loader for [`BattleConfig`] from TOML files.
///
/// Every field is optional; missing ones keep their defaults.
pub struct ConfigLoader;

impl ConfigLoader {
    pub fn load(path: &Path) -> LoadResult<BattleConfig> {
        let content = read_file(path)?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> LoadResult<BattleConfig> {
        let config: BattleConfig = toml::from_str(content)
            .map_err(|e| anyhow::anyhow!("Failed to parse battle config TOML: {}", e))?;
        if config.grace_period < 0.0 || config.base_attack_period <= 0.0 {
            anyhow::bail!(
                "Invalid battle config: grace_period must be >= 0 and base_attack_period > 0"
            );
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_keeps_defaults() {
        let config = ConfigLoader::parse("grace_period = 4.0\nmax_evasion = 80\n").unwrap();
        assert_eq!(config.grace_period, 4.0);
        assert_eq!(config.max_evasion, 80);
        assert_eq!(config.base_attack_period, BattleConfig::DEFAULT_ATTACK_PERIOD);
    }

    #[test]
    fn rejects_zero_attack_period() {
        assert!(ConfigLoader::parse("base_attack_period = 0.0").is_err());
    }
}
