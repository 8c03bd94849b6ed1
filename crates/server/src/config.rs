//! Server configuration structures and loaders.
use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;

use runtime::RuntimeConfig;

/// Configuration required to start the battle server.
#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub content_dir: PathBuf,
    pub bind_addr: SocketAddr,
    pub runtime: RuntimeConfig,
    /// Demo encounter every newly connected player is placed in.
    pub demo_encounter: String,
    pub session_id: Option<String>,
    pub log_dir: Option<PathBuf>,
    /// Fixed seed for every encounter; random when unset.
    pub seed: Option<u64>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            content_dir: PathBuf::from("content"),
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 7878)),
            runtime: RuntimeConfig::default(),
            demo_encounter: "meadow".to_owned(),
            session_id: None,
            log_dir: None,
            seed: None,
        }
    }
}

impl ServerConfig {
    /// Construct configuration from process environment variables.
    ///
    /// Environment variables:
    /// - `BATTLE_CONTENT_DIR` - Directory holding battle.toml, tables.ron and effects.ron (default: content)
    /// - `BATTLE_BIND_ADDR` - Listen address (default: 127.0.0.1:7878)
    /// - `BATTLE_TICK_RATE` - Simulation ticks per second (default: 60)
    /// - `BATTLE_TIME_SCALE` - Simulated seconds per wall second (default: 1.0)
    /// - `BATTLE_BATCH_INTERVAL` - Ticks between position batches (default: 6)
    /// - `BATTLE_DEMO_ENCOUNTER` - Encounter new players join (default: meadow)
    /// - `BATTLE_SESSION_ID` - Session identifier for log files (default: auto-generated)
    /// - `BATTLE_LOG_DIR` - Directory for log files (default: platform-specific)
    /// - `BATTLE_SEED` - Fixed encounter seed (default: random)
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an explicit variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        let read = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(dir) = read("BATTLE_CONTENT_DIR") {
            config.content_dir = PathBuf::from(dir);
        }
        if let Some(addr) = parse(read("BATTLE_BIND_ADDR")) {
            config.bind_addr = addr;
        }
        if let Some(rate) = parse::<u32>(read("BATTLE_TICK_RATE")) {
            config.runtime.tick_rate = rate.max(1);
        }
        if let Some(scale) = parse::<f64>(read("BATTLE_TIME_SCALE")) {
            config.runtime.time_scale = scale.max(0.0);
        }
        if let Some(interval) = parse(read("BATTLE_BATCH_INTERVAL")) {
            config.runtime.position_batch_interval = interval;
        }
        if let Some(name) = read("BATTLE_DEMO_ENCOUNTER") {
            config.demo_encounter = name;
        }
        config.session_id = read("BATTLE_SESSION_ID");
        config.log_dir = read("BATTLE_LOG_DIR").map(PathBuf::from);
        config.seed = parse(read("BATTLE_SEED"));

        config
    }
}

fn parse<T>(value: Option<String>) -> Option<T>
where
    T: std::str::FromStr,
{
    value?.trim().parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn empty_environment_gives_defaults() {
        let config = ServerConfig::from_lookup(lookup(&[]));
        assert_eq!(config.content_dir, PathBuf::from("content"));
        assert_eq!(config.bind_addr.port(), 7878);
        assert_eq!(config.runtime.tick_rate, 60);
        assert_eq!(config.demo_encounter, "meadow");
        assert!(config.seed.is_none());
    }

    #[test]
    fn variables_override_and_garbage_is_ignored() {
        let config = ServerConfig::from_lookup(lookup(&[
            ("BATTLE_CONTENT_DIR", "/srv/battle"),
            ("BATTLE_BIND_ADDR", "0.0.0.0:9000"),
            ("BATTLE_TICK_RATE", "0"),
            ("BATTLE_TIME_SCALE", "fast"),
            ("BATTLE_SEED", " 42 "),
            ("BATTLE_SESSION_ID", ""),
        ]));
        assert_eq!(config.content_dir, PathBuf::from("/srv/battle"));
        assert_eq!(config.bind_addr, "0.0.0.0:9000".parse().unwrap());
        assert_eq!(config.runtime.tick_rate, 1);
        assert_eq!(config.runtime.time_scale, 1.0);
        assert_eq!(config.seed, Some(42));
        assert!(config.session_id.is_none());
    }
}
