//! Embedded Postgres storage bootstrap for per-work clusters.
//!
//! # Responsibility
//! - Maintain one isolated relational cluster per Work, indistinguishable
//!   from a single-user embedded engine.
//! - Own binary provisioning, cluster lifecycle, lease handling, crash
//!   recovery and schema migration.
//!
//! # Invariants
//! - The cluster binds loopback only and the recorded port never changes
//!   silently; re-allocation is an explicit command.
//! - Core code must not touch application data before migrations succeed.

use crate::error::ErrorKind;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;
use std::time::Duration;

pub mod binaries;
pub mod cluster;
pub mod config;
pub mod lease;
pub mod migrations;
mod open;

pub use open::{binaries_for, connect, connect_db, open_work_db, open_work_db_at, WorkDb};

pub type DbResult<T> = Result<T, DbError>;

/// Storage-layer error.
#[derive(Debug)]
pub enum DbError {
    Postgres(postgres::Error),
    Io(std::io::Error),
    /// The directory is not a Littera work (missing `.littera/`).
    NotAWork(PathBuf),
    /// `.littera/config.yml` is missing or malformed.
    InvalidConfig { path: PathBuf, message: String },
    /// Engine binaries could not be provisioned.
    BinariesUnavailable(String),
    /// The recorded port is bound by another process.
    PortInUse { port: u16 },
    /// No free port in the reserved range.
    NoFreePort { lo: u16, hi: u16 },
    /// A live cluster lock owned by another process.
    LiveLock { pid: u32 },
    /// `pg_ctl start` failed.
    ClusterStartFailed {
        message: String,
        wal_corruption: bool,
    },
    /// The cluster did not accept connections within the readiness window.
    ClusterNotReady { waited: Duration },
    /// A maintenance subprocess (initdb, pg_resetwal, ...) failed.
    EngineCommandFailed { command: String, message: String },
    /// Database schema is newer than this binary supports.
    UnsupportedSchemaVersion {
        db_version: i32,
        latest_supported: i32,
    },
    InvalidMigrationRegistry(&'static str),
}

impl DbError {
    /// Maps this error into the stable taxonomy.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Postgres(_) => ErrorKind::Internal,
            Self::Io(_) => ErrorKind::Internal,
            Self::NotAWork(_) => ErrorKind::InvalidInput,
            Self::InvalidConfig { .. } => ErrorKind::InvalidInput,
            Self::BinariesUnavailable(_)
            | Self::PortInUse { .. }
            | Self::NoFreePort { .. }
            | Self::LiveLock { .. }
            | Self::ClusterStartFailed { .. }
            | Self::ClusterNotReady { .. }
            | Self::EngineCommandFailed { .. } => ErrorKind::BackendUnavailable,
            Self::UnsupportedSchemaVersion { .. } => ErrorKind::BackendUnavailable,
            Self::InvalidMigrationRegistry(_) => ErrorKind::Internal,
        }
    }
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Postgres(err) => write!(f, "{err}"),
            Self::Io(err) => write!(f, "{err}"),
            Self::NotAWork(path) => write!(
                f,
                "not a Littera work (missing .littera/ in `{}`)",
                path.display()
            ),
            Self::InvalidConfig { path, message } => {
                write!(f, "invalid work config `{}`: {message}", path.display())
            }
            Self::BinariesUnavailable(message) => {
                write!(f, "embedded Postgres binaries unavailable: {message}")
            }
            Self::PortInUse { port } => write!(
                f,
                "recorded cluster port {port} is in use; run `littera db reallocate-port`"
            ),
            Self::NoFreePort { lo, hi } => {
                write!(f, "no free cluster port in the reserved range {lo}-{hi}")
            }
            Self::LiveLock { pid } => write!(
                f,
                "cluster is locked by a live process (pid {pid}); stop it before retrying"
            ),
            Self::ClusterStartFailed {
                message,
                wal_corruption,
            } => {
                if *wal_corruption {
                    write!(
                        f,
                        "cluster start failed with write-ahead-log corruption: {message}; \
                         run `littera db reset-wal` (may lose uncommitted data) or \
                         `littera db reinit` (destroys data)"
                    )
                } else {
                    write!(f, "cluster start failed: {message}")
                }
            }
            Self::ClusterNotReady { waited } => write!(
                f,
                "cluster did not accept connections within {}s",
                waited.as_secs()
            ),
            Self::EngineCommandFailed { command, message } => {
                write!(f, "`{command}` failed: {message}")
            }
            Self::UnsupportedSchemaVersion {
                db_version,
                latest_supported,
            } => write!(
                f,
                "database schema version {db_version} is newer than supported {latest_supported}"
            ),
            Self::InvalidMigrationRegistry(message) => {
                write!(f, "invalid migration registry: {message}")
            }
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Postgres(err) => Some(err),
            Self::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<postgres::Error> for DbError {
    fn from(value: postgres::Error) -> Self {
        Self::Postgres(value)
    }
}

impl From<std::io::Error> for DbError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}
