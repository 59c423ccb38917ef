//! Idle lease for the embedded cluster.
//!
//! The lease is the "feels embedded" optimization: the cluster stays up for
//! a short window after a command so bursts of CLI calls skip the startup
//! cost. Tests disable it so every test owns its cluster lifecycle.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Override for the lease duration in seconds; `0` disables the lease.
pub const LEASE_ENV: &str = "LITTERA_PG_LEASE_SECONDS";
/// Test-mode indicator; implies a zero lease.
pub const TEST_ENV: &str = "LITTERA_TEST";

const DEFAULT_LEASE_SECONDS: u64 = 30;
const LEASE_FILE: &str = "pg_lease.json";

#[derive(Debug, Serialize, Deserialize)]
struct LeaseFile {
    version: u32,
    expires_at: f64,
}

fn lease_path(littera_dir: &Path) -> PathBuf {
    littera_dir.join(LEASE_FILE)
}

/// Effective lease duration for this process.
pub fn lease_seconds() -> u64 {
    let default = if std::env::var_os(TEST_ENV).is_some() {
        0
    } else {
        DEFAULT_LEASE_SECONDS
    };

    match std::env::var(LEASE_ENV) {
        Ok(raw) => raw.trim().parse().unwrap_or(default),
        Err(_) => default,
    }
}

/// Renews the lease file. A non-positive duration leaves no lease behind.
pub fn renew(littera_dir: &Path, seconds: u64) -> std::io::Result<()> {
    if seconds == 0 {
        return Ok(());
    }
    let lease = LeaseFile {
        version: 1,
        expires_at: now_epoch() + seconds as f64,
    };
    let raw = serde_json::to_string(&lease).expect("lease serializes");
    std::fs::write(lease_path(littera_dir), raw)
}

/// Seconds until the lease expires. `None` means no (or unreadable) lease;
/// a corrupt lease file is treated as absent rather than fatal.
pub fn remaining(littera_dir: &Path) -> Option<u64> {
    let raw = std::fs::read_to_string(lease_path(littera_dir)).ok()?;
    let lease: LeaseFile = serde_json::from_str(&raw).ok()?;
    let left = lease.expires_at - now_epoch();
    if left <= 0.0 {
        Some(0)
    } else {
        Some(left as u64)
    }
}

/// Whether the lease has expired (missing lease counts as expired).
pub fn expired(littera_dir: &Path) -> bool {
    matches!(remaining(littera_dir), None | Some(0))
}

/// Spawns a detached watcher that stops the cluster after lease expiry.
///
/// Failure to spawn is swallowed: the fallback is a cluster that stays up,
/// which preserves correctness.
pub fn spawn_watcher(littera_dir: &Path) {
    let Ok(exe) = std::env::current_exe() else {
        return;
    };
    let _ = std::process::Command::new(exe)
        .arg("db")
        .arg("watch-lease")
        .arg("--littera-dir")
        .arg(littera_dir)
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .spawn();
}

/// Blocks until the lease expires, rechecking on renewal.
pub fn wait_until_expired(littera_dir: &Path) {
    loop {
        match remaining(littera_dir) {
            None | Some(0) => return,
            Some(left) => std::thread::sleep(Duration::from_secs(left.min(5).max(1))),
        }
    }
}

fn now_epoch() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::ZERO)
        .as_secs_f64()
}

#[cfg(test)]
mod tests {
    use super::{expired, remaining, renew};

    #[test]
    fn zero_lease_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        renew(dir.path(), 0).unwrap();
        assert_eq!(remaining(dir.path()), None);
        assert!(expired(dir.path()));
    }

    #[test]
    fn renewed_lease_counts_down() {
        let dir = tempfile::tempdir().unwrap();
        renew(dir.path(), 120).unwrap();
        let left = remaining(dir.path()).unwrap();
        assert!(left > 0 && left <= 120);
        assert!(!expired(dir.path()));
    }

    #[test]
    fn corrupt_lease_is_treated_as_absent() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("pg_lease.json"), "{not json").unwrap();
        assert_eq!(remaining(dir.path()), None);
        assert!(expired(dir.path()));
    }
}
