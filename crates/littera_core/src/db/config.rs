//! Per-work configuration file.
//!
//! # Responsibility
//! - Round-trip `.littera/config.yml`: work identity, cluster port, data
//!   directory and engine version reference.
//!
//! # Invariants
//! - The recorded port is never rewritten implicitly; `store` is called only
//!   by `init` and the explicit port re-allocation command.

use crate::db::{DbError, DbResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Name of the per-work state directory.
pub const LITTERA_DIR: &str = ".littera";
/// Config file name inside the state directory.
pub const CONFIG_FILE: &str = "config.yml";
/// Cluster data directory name inside the state directory.
pub const DATA_DIR: &str = "pgdata";
/// Engine binary indirection name inside the state directory.
pub const ENGINE_DIR: &str = "pg";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkConfig {
    pub work: WorkRef,
    pub postgres: PostgresSettings,
    pub engine: EngineRef,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkRef {
    pub id: Uuid,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostgresSettings {
    pub data_dir: PathBuf,
    pub port: u16,
    pub db_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineRef {
    pub version: String,
}

impl WorkConfig {
    /// Builds the config written by `init` for a fresh work directory.
    pub fn for_new_work(work_id: Uuid, littera_dir: &Path, port: u16) -> Self {
        Self {
            work: WorkRef { id: work_id },
            postgres: PostgresSettings {
                data_dir: littera_dir.join(DATA_DIR),
                port,
                db_name: "littera".to_string(),
            },
            engine: EngineRef {
                version: crate::db::binaries::ENGINE_VERSION.to_string(),
            },
        }
    }
}

/// Locates the state directory for a work root.
pub fn littera_dir(work_dir: &Path) -> PathBuf {
    work_dir.join(LITTERA_DIR)
}

/// Loads the config for the work rooted at `work_dir`.
///
/// Returns `(littera_dir, config)`.
pub fn load(work_dir: &Path) -> DbResult<(PathBuf, WorkConfig)> {
    let littera_dir = littera_dir(work_dir);
    if !littera_dir.is_dir() {
        return Err(DbError::NotAWork(work_dir.to_path_buf()));
    }

    let path = littera_dir.join(CONFIG_FILE);
    let raw = std::fs::read_to_string(&path).map_err(|err| DbError::InvalidConfig {
        path: path.clone(),
        message: err.to_string(),
    })?;
    let config: WorkConfig = serde_yaml::from_str(&raw).map_err(|err| DbError::InvalidConfig {
        path: path.clone(),
        message: err.to_string(),
    })?;
    Ok((littera_dir, config))
}

/// Writes the config into the state directory.
pub fn store(littera_dir: &Path, config: &WorkConfig) -> DbResult<()> {
    std::fs::create_dir_all(littera_dir)?;
    let path = littera_dir.join(CONFIG_FILE);
    let raw = serde_yaml::to_string(config).map_err(|err| DbError::InvalidConfig {
        path: path.clone(),
        message: err.to_string(),
    })?;
    std::fs::write(&path, raw)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{littera_dir, load, store, WorkConfig};
    use crate::db::DbError;
    use uuid::Uuid;

    #[test]
    fn config_round_trips_through_yaml() {
        let dir = tempfile::tempdir().unwrap();
        let state_dir = littera_dir(dir.path());
        let config = WorkConfig::for_new_work(Uuid::new_v4(), &state_dir, 29_321);

        store(&state_dir, &config).unwrap();
        let (loaded_dir, loaded) = load(dir.path()).unwrap();

        assert_eq!(loaded_dir, state_dir);
        assert_eq!(loaded, config);
    }

    #[test]
    fn missing_state_dir_is_not_a_work() {
        let dir = tempfile::tempdir().unwrap();
        let err = load(dir.path()).unwrap_err();
        assert!(matches!(err, DbError::NotAWork(_)));
    }

    #[test]
    fn malformed_yaml_is_invalid_config() {
        let dir = tempfile::tempdir().unwrap();
        let state_dir = littera_dir(dir.path());
        std::fs::create_dir_all(&state_dir).unwrap();
        std::fs::write(state_dir.join(super::CONFIG_FILE), "work: [not a map").unwrap();

        let err = load(dir.path()).unwrap_err();
        assert!(matches!(err, DbError::InvalidConfig { .. }));
    }
}
