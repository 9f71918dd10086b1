use std::path::PathBuf;

use rocket::figment::Figment;
use serde::Deserialize;
use shared::validation::VotePolicy;

/// Which persistence adapter backs the server.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StorageKind {
    /// Append-only key-value log.
    Kv,
    /// JSON document plus SQLite mirror.
    Json,
    /// Relational schema with a uniqueness constraint on votes.
    Sql,
}

impl StorageKind {
    /// The file stores predate input validation; the relational store does not.
    pub fn default_policy(self) -> VotePolicy {
        match self {
            StorageKind::Kv | StorageKind::Json => VotePolicy::Legacy,
            StorageKind::Sql => VotePolicy::Strict,
        }
    }
}

/// Application settings, read from `Rocket.toml` and `ROCKET_*` variables
/// alongside Rocket's own (e.g. `ROCKET_STORAGE=json`).
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub storage: StorageKind,
    pub data_dir: PathBuf,
    pub database_url: String,
    pub policy: Option<VotePolicy>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            storage: StorageKind::Sql,
            data_dir: PathBuf::from("data"),
            database_url: "sqlite://data/events.sqlite".into(),
            policy: None,
        }
    }
}

impl AppConfig {
    pub fn from_figment(figment: &Figment) -> Result<Self, rocket::figment::Error> {
        figment.extract()
    }

    pub fn policy(&self) -> VotePolicy {
        self.policy.unwrap_or_else(|| self.storage.default_policy())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rocket::figment::providers::Serialized;

    #[test]
    fn test_defaults() {
        let config = AppConfig::from_figment(&Figment::new()).unwrap();
        assert_eq!(config.storage, StorageKind::Sql);
        assert_eq!(config.policy(), VotePolicy::Strict);
        assert_eq!(config.data_dir, PathBuf::from("data"));
    }

    #[test]
    fn test_policy_follows_storage_unless_set() {
        let figment = Figment::new().merge(Serialized::default("storage", "json"));
        let config = AppConfig::from_figment(&figment).unwrap();
        assert_eq!(config.storage, StorageKind::Json);
        assert_eq!(config.policy(), VotePolicy::Legacy);

        let figment = figment.merge(Serialized::default("policy", "strict"));
        assert_eq!(AppConfig::from_figment(&figment).unwrap().policy(), VotePolicy::Strict);
    }
}
