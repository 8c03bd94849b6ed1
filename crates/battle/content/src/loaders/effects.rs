//! Effect script loader.

use std::collections::BTreeMap;
use std::path::Path;

use battle_core::{EffectScript, ScriptedExecutor};
use serde::{Deserialize, Serialize};

use crate::loaders::{LoadResult, read_file};

/// Effect script catalog structure for RON files.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EffectCatalog {
    pub scripts: BTreeMap<String, EffectScript>,
}

/// Loader for the [`ScriptedExecutor`] from RON files.
pub struct EffectLoader;

impl EffectLoader {
    pub fn load(path: &Path) -> LoadResult<ScriptedExecutor> {
        let content = read_file(path)?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> LoadResult<ScriptedExecutor> {
        let catalog: EffectCatalog = ron::from_str(content)
            .map_err(|e| anyhow::anyhow!("Failed to parse effect catalog RON: {}", e))?;

        let mut executor = ScriptedExecutor::new();
        for (name, script) in catalog.scripts {
            executor.insert(name, script);
        }
        Ok(executor)
    }
}
