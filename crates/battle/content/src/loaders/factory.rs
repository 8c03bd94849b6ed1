//! Content factory for loading a whole data directory.

use std::path::{Path, PathBuf};

use anyhow::Context;
use battle_core::{BattleConfig, ScriptedExecutor, StatsTables};
use tracing::info;

use crate::loaders::{ConfigLoader, EffectLoader, LoadResult, TablesLoader};

/// Everything a battle host needs from disk.
#[derive(Debug, Clone)]
pub struct Content {
    pub config: BattleConfig,
    pub tables: StatsTables,
    pub executor: ScriptedExecutor,
}

/// Content factory that loads all battle content from a data directory.
///
/// # Directory Structure
///
/// ```text
/// data_dir/
/// ├── battle.toml
/// ├── tables.ron
/// └── effects.ron
/// ```
pub struct ContentFactory {
    data_dir: PathBuf,
}

impl ContentFactory {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    /// Load battle tunables from `battle.toml`. A missing file means defaults.
    pub fn load_config(&self) -> LoadResult<BattleConfig> {
        let path = self.data_dir.join("battle.toml");
        if !path.exists() {
            return Ok(BattleConfig::default());
        }
        ConfigLoader::load(&path)
    }

    /// Load stats tables from `tables.ron`.
    pub fn load_tables(&self) -> LoadResult<StatsTables> {
        let path = self.data_dir.join("tables.ron");
        TablesLoader::load(&path)
    }

    /// Load effect scripts from `effects.ron`.
    pub fn load_effects(&self) -> LoadResult<ScriptedExecutor> {
        let path = self.data_dir.join("effects.ron");
        EffectLoader::load(&path)
    }

    /// Load and cross-check every file.
    pub fn load(&self) -> LoadResult<Content> {
        let config = self.load_config()?;
        let tables = self.load_tables()?;
        let executor = self.load_effects()?;
        tables
            .validate(|name| executor.script(name).is_ok())
            .with_context(|| format!("Inconsistent content in {}", self.data_dir.display()))?;

        info!(
            data_dir = %self.data_dir.display(),
            items = tables.items().count(),
            monsters = tables.monsters().count(),
            scripts = executor.len(),
            "battle content loaded"
        );
        Ok(Content {
            config,
            tables,
            executor,
        })
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }
}
