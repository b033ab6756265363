//! # Node Configuration
//!
//! Unified configuration for the runtime and every subsystem it drives.
//!
//! ## Sources
//!
//! 1. Defaults
//! 2. TOML file named by `GAMBIT_CONFIG`, if set
//! 3. `GAMBIT_ROOM`, `GAMBIT_PLAYERS`, `GAMBIT_MOVES`, `GAMBIT_ICE_SERVERS`

use gb_04_membership::MembershipConfig;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

pub const CONFIG_PATH_VAR: &str = "GAMBIT_CONFIG";

/// Complete node configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    /// Room the players meet in.
    pub room: String,
    /// Player names. The first one hosts.
    pub players: Vec<String>,
    /// Moves played in turn, host first.
    pub moves: Vec<String>,
    /// Upper bound for the mesh to form and for each move to commit.
    pub settle_timeout_secs: u64,
    pub membership: MembershipConfig,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            room: "gambit".to_string(),
            players: vec!["white".to_string(), "black".to_string()],
            moves: ["e4", "e5", "Nf3", "Nc6", "Bb5"]
                .into_iter()
                .map(String::from)
                .collect(),
            settle_timeout_secs: 10,
            membership: MembershipConfig::default(),
        }
    }
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid configuration in {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("At least one player is required")]
    NoPlayers,

    #[error("Player {0} is listed twice")]
    DuplicatePlayer(String),

    #[error("{players} players do not fit a room of {max_players}")]
    RoomTooSmall { players: usize, max_players: usize },
}

impl NodeConfig {
    /// Load from the process environment.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = match std::env::var(CONFIG_PATH_VAR) {
            Ok(path) => Self::from_file(Path::new(&path))?,
            Err(_) => Self::default(),
        };
        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Apply `GAMBIT_*` overrides read through `lookup`.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(room) = lookup("GAMBIT_ROOM") {
            self.room = room;
        }
        if let Some(players) = lookup("GAMBIT_PLAYERS") {
            self.players = split_list(&players);
        }
        if let Some(moves) = lookup("GAMBIT_MOVES") {
            self.moves = split_list(&moves);
        }
        if let Some(servers) = lookup("GAMBIT_ICE_SERVERS") {
            self.membership.negotiator.ice_servers = split_list(&servers);
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.players.is_empty() {
            return Err(ConfigError::NoPlayers);
        }
        let mut seen = HashSet::new();
        if let Some(dup) = self.players.iter().find(|p| !seen.insert(p.as_str())) {
            return Err(ConfigError::DuplicatePlayer(dup.clone()));
        }
        if self.players.len() > self.membership.max_players {
            return Err(ConfigError::RoomTooSmall {
                players: self.players.len(),
                max_players: self.membership.max_players,
            });
        }
        Ok(())
    }

    pub fn settle_timeout(&self) -> Duration {
        Duration::from_secs(self.settle_timeout_secs)
    }
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults_are_valid() {
        let config = NodeConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.membership.reconcile_interval_secs, 360);
        assert_eq!(config.membership.consensus.prune_depth, 10);
    }

    #[test]
    fn test_partial_toml() {
        let config: NodeConfig = toml::from_str(
            r#"
            room = "club"
            players = ["ann", "ben", "cat"]

            [membership]
            max_players = 3

            [membership.negotiator]
            retry_delay_secs = 1
            "#,
        )
        .unwrap();

        assert_eq!(config.room, "club");
        assert_eq!(config.players.len(), 3);
        assert_eq!(config.moves, NodeConfig::default().moves);
        assert_eq!(config.membership.max_players, 3);
        assert_eq!(config.membership.negotiator.retry_delay_secs, 1);
        assert_eq!(config.membership.negotiator.max_attempts, 3);
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("GAMBIT_ROOM", "lobby"),
            ("GAMBIT_PLAYERS", "ann, ben ,cat"),
            ("GAMBIT_MOVES", "d4,d5"),
            ("GAMBIT_ICE_SERVERS", "stun:a:1,stun:b:2"),
        ]
        .into_iter()
        .collect();

        let mut config = NodeConfig::default();
        config.apply_overrides(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.room, "lobby");
        assert_eq!(config.players, vec!["ann", "ben", "cat"]);
        assert_eq!(config.moves, vec!["d4", "d5"]);
        assert_eq!(
            config.membership.negotiator.ice_servers,
            vec!["stun:a:1", "stun:b:2"]
        );
    }

    #[test]
    fn test_validation() {
        let mut config = NodeConfig {
            players: Vec::new(),
            ..NodeConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::NoPlayers)));

        config.players = vec!["ann".into(), "ann".into()];
        assert!(matches!(
            config.validate(),
            Err(ConfigError::DuplicatePlayer(name)) if name == "ann"
        ));

        config.players = vec!["ann".into(), "ben".into(), "cat".into()];
        config.membership.max_players = 2;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::RoomTooSmall { players: 3, max_players: 2 })
        ));
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            NodeConfig::from_file(Path::new("/nonexistent/gambit.toml")),
            Err(ConfigError::Read { .. })
        ));
    }
}
