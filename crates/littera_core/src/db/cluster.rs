//! Cluster lifecycle: initdb, start/stop, recovery.
//!
//! # Responsibility
//! - Drive `initdb`/`pg_ctl` for one work's data directory.
//! - Allocate and validate the loopback port.
//! - Recover from stale locks; surface WAL corruption with explicit
//!   remediations instead of guessing.
//!
//! # Invariants
//! - The cluster listens on 127.0.0.1 only.
//! - A stale `postmaster.pid` whose process is dead is the only thing
//!   removed implicitly; a live lock is surfaced as `LiveLock`.

use crate::db::binaries::EngineBinaries;
use crate::db::config::WorkConfig;
use crate::db::{DbError, DbResult};
use log::{info, warn};
use std::net::{TcpListener, TcpStream};
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::{Duration, Instant};
use uuid::Uuid;

/// Reserved loopback port range, away from standard service defaults.
pub const PORT_RANGE_LO: u16 = 29_170;
pub const PORT_RANGE_HI: u16 = 29_998;

/// How long `start` waits for the postmaster to accept connections.
pub const READY_TIMEOUT: Duration = Duration::from_secs(15);

/// `pg_ctl` log fragments that indicate write-ahead-log corruption.
const WAL_CORRUPTION_MARKERS: &[&str] = &[
    "could not locate a valid checkpoint record",
    "invalid checkpoint record",
    "invalid primary checkpoint record",
    "PANIC",
];

/// Everything needed to drive one work's cluster.
#[derive(Debug, Clone)]
pub struct ClusterConfig {
    pub data_dir: PathBuf,
    pub port: u16,
    pub db_name: String,
    pub initdb_path: PathBuf,
    pub pg_ctl_path: PathBuf,
    pub pg_resetwal_path: PathBuf,
}

impl ClusterConfig {
    pub fn from_work(config: &WorkConfig, binaries: &EngineBinaries) -> Self {
        Self {
            data_dir: config.postgres.data_dir.clone(),
            port: config.postgres.port,
            db_name: config.postgres.db_name.clone(),
            initdb_path: binaries.initdb(),
            pg_ctl_path: binaries.pg_ctl(),
            pg_resetwal_path: binaries.pg_resetwal(),
        }
    }

    fn pid_file(&self) -> PathBuf {
        self.data_dir.join("postmaster.pid")
    }

    fn log_file(&self) -> PathBuf {
        self.data_dir.join("postgres.log")
    }
}

/// Picks an unused loopback port in the reserved range.
///
/// The work identifier seeds the starting offset so re-initializing the same
/// work tends to land on the same port; the scan wraps over the whole range
/// before giving up.
pub fn allocate_port(seed: Uuid) -> DbResult<u16> {
    let span = (PORT_RANGE_HI - PORT_RANGE_LO) as u32 + 1;
    let offset = seed_offset(seed) % span;

    for step in 0..span {
        let port = PORT_RANGE_LO + ((offset + step) % span) as u16;
        if port_is_free(port) {
            return Ok(port);
        }
    }
    Err(DbError::NoFreePort {
        lo: PORT_RANGE_LO,
        hi: PORT_RANGE_HI,
    })
}

fn seed_offset(seed: Uuid) -> u32 {
    let bytes = seed.as_bytes();
    u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
}

fn port_is_free(port: u16) -> bool {
    TcpListener::bind(("127.0.0.1", port)).is_ok()
}

/// Creates the cluster data directory if it does not exist yet.
pub fn init_cluster(config: &ClusterConfig) -> DbResult<()> {
    if config.data_dir.join("PG_VERSION").exists() {
        return Ok(());
    }
    std::fs::create_dir_all(&config.data_dir)?;

    let output = Command::new(&config.initdb_path)
        .arg("-D")
        .arg(&config.data_dir)
        .arg("--no-locale")
        .arg("--encoding=UTF8")
        .output()?;
    if !output.status.success() {
        return Err(DbError::EngineCommandFailed {
            command: "initdb".to_string(),
            message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }
    Ok(())
}

/// Starts the cluster.
///
/// Returns `Ok(true)` when this call started it, `Ok(false)` when it was
/// already running under a live lock owned by us (same data directory).
pub fn start(config: &ClusterConfig) -> DbResult<bool> {
    match read_lock_pid(&config.pid_file()) {
        Some(pid) if pid_alive(pid) => {
            // A live postmaster serving our port means the cluster is
            // already up; a live pid without a listening port is a lock we
            // must not bypass.
            if TcpStream::connect(("127.0.0.1", config.port)).is_ok() {
                return Ok(false);
            }
            return Err(DbError::LiveLock { pid });
        }
        Some(pid) => {
            warn!(
                "event=cluster_start module=db status=stale_lock pid={} data_dir={}",
                pid,
                config.data_dir.display()
            );
            std::fs::remove_file(config.pid_file())?;
        }
        None => {}
    }

    // The pid file is gone, so a bound port means another process owns it.
    if !port_is_free(config.port) {
        return Err(DbError::PortInUse { port: config.port });
    }

    let output = Command::new(&config.pg_ctl_path)
        .arg("-D")
        .arg(&config.data_dir)
        .arg("-l")
        .arg(config.log_file())
        .arg("-o")
        .arg(format!(
            "-F -p {} -c listen_addresses=127.0.0.1",
            config.port
        ))
        .arg("-w")
        .arg("start")
        .output()?;

    if !output.status.success() {
        let mut message = String::from_utf8_lossy(&output.stderr).trim().to_string();
        let tail = read_log_tail(&config.log_file());
        if !tail.is_empty() {
            message = format!("{message}\n{tail}");
        }
        let wal_corruption = WAL_CORRUPTION_MARKERS
            .iter()
            .any(|marker| message.contains(marker));
        return Err(DbError::ClusterStartFailed {
            message,
            wal_corruption,
        });
    }

    wait_ready(config, READY_TIMEOUT)?;
    info!(
        "event=cluster_start module=db status=ok port={} data_dir={}",
        config.port,
        config.data_dir.display()
    );
    Ok(true)
}

/// Stops the cluster. Returns whether a running cluster was asked to stop.
pub fn stop(config: &ClusterConfig, mode: &str) -> DbResult<bool> {
    if !config.pid_file().exists() {
        return Ok(false);
    }

    let _ = Command::new(&config.pg_ctl_path)
        .arg("-D")
        .arg(&config.data_dir)
        .arg("-m")
        .arg(mode)
        .arg("-w")
        .arg("stop")
        .output()?;
    Ok(true)
}

/// Blocks until the postmaster accepts TCP connections on the loopback port.
pub fn wait_ready(config: &ClusterConfig, timeout: Duration) -> DbResult<()> {
    let started = Instant::now();
    loop {
        if TcpStream::connect(("127.0.0.1", config.port)).is_ok() {
            return Ok(());
        }
        if started.elapsed() >= timeout {
            return Err(DbError::ClusterNotReady {
                waited: started.elapsed(),
            });
        }
        std::thread::sleep(Duration::from_millis(100));
    }
}

/// Explicit WAL reset: potentially lossy, preserves committed data.
pub fn reset_wal(config: &ClusterConfig) -> DbResult<()> {
    stop(config, "immediate")?;
    let output = Command::new(&config.pg_resetwal_path)
        .arg("-f")
        .arg("-D")
        .arg(&config.data_dir)
        .output()?;
    if !output.status.success() {
        return Err(DbError::EngineCommandFailed {
            command: "pg_resetwal".to_string(),
            message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }
    Ok(())
}

/// Explicit cluster re-initialization: destroys the data directory.
pub fn reinit(config: &ClusterConfig) -> DbResult<()> {
    stop(config, "immediate")?;
    if config.data_dir.exists() {
        std::fs::remove_dir_all(&config.data_dir)?;
    }
    init_cluster(config)
}

/// Returns the live lock owner when one exists, for status reporting.
pub fn lock_state(config: &ClusterConfig) -> Option<(u32, bool)> {
    read_lock_pid(&config.pid_file()).map(|pid| (pid, pid_alive(pid)))
}

fn read_lock_pid(pid_file: &Path) -> Option<u32> {
    let raw = std::fs::read_to_string(pid_file).ok()?;
    raw.lines().next()?.trim().parse().ok()
}

fn pid_alive(pid: u32) -> bool {
    // `kill -0` probes liveness without signaling; /proc is Linux-only.
    Command::new("kill")
        .arg("-0")
        .arg(pid.to_string())
        .output()
        .map(|output| output.status.success())
        .unwrap_or(false)
}

fn read_log_tail(log_file: &Path) -> String {
    let Ok(raw) = std::fs::read_to_string(log_file) else {
        return String::new();
    };
    let lines: Vec<&str> = raw.lines().collect();
    let tail_start = lines.len().saturating_sub(10);
    lines[tail_start..].join("\n")
}

#[cfg(test)]
mod tests {
    use super::{allocate_port, port_is_free, PORT_RANGE_HI, PORT_RANGE_LO};
    use std::net::TcpListener;
    use uuid::Uuid;

    #[test]
    fn allocated_port_is_free_and_in_range() {
        let port = allocate_port(Uuid::new_v4()).unwrap();
        assert!((PORT_RANGE_LO..=PORT_RANGE_HI).contains(&port));
        assert!(port_is_free(port));
    }

    #[test]
    fn allocation_is_stable_for_one_seed() {
        let seed = Uuid::new_v4();
        let first = allocate_port(seed).unwrap();
        let second = allocate_port(seed).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn allocation_skips_bound_ports() {
        let seed = Uuid::new_v4();
        let preferred = allocate_port(seed).unwrap();
        let _holder = TcpListener::bind(("127.0.0.1", preferred)).unwrap();

        let alternative = allocate_port(seed).unwrap();
        assert_ne!(alternative, preferred);
        assert!((PORT_RANGE_LO..=PORT_RANGE_HI).contains(&alternative));
    }
}
