//! Scoped work-database acquisition.
//!
//! # Responsibility
//! - Load config, ensure binaries, start the cluster on demand, connect,
//!   and migrate — in that order — returning the only live connection.
//! - Stop a cluster this process started when the lease is disabled.
//!
//! # Invariants
//! - Concurrent starts within one process are serialized.
//! - Migrations are fully applied before the connection is handed out.

use crate::db::binaries::{self, EngineBinaries};
use crate::db::cluster::{self, ClusterConfig};
use crate::db::config::{self, WorkConfig};
use crate::db::lease;
use crate::db::migrations::apply_migrations;
use crate::db::DbResult;
use log::{error, info};
use once_cell::sync::Lazy;
use postgres::{Client, NoTls};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::{Duration, Instant};

static START_GUARD: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// One open work database: config, cluster handle and the live connection.
pub struct WorkDb {
    pub work_dir: PathBuf,
    pub littera_dir: PathBuf,
    pub config: WorkConfig,
    pub cluster: ClusterConfig,
    client: Option<Client>,
    started_here: bool,
    lease_seconds: u64,
}

impl WorkDb {
    /// The only connection to this work's cluster.
    pub fn client(&mut self) -> &mut Client {
        self.client.as_mut().expect("client live until drop")
    }

    /// Whether this acquisition started the cluster.
    pub fn started_here(&self) -> bool {
        self.started_here
    }
}

impl Drop for WorkDb {
    fn drop(&mut self) {
        // Close the connection before a potential stop on all exit paths.
        drop(self.client.take());
        if self.started_here && self.lease_seconds == 0 {
            if let Err(err) = cluster::stop(&self.cluster, "fast") {
                error!(
                    "event=cluster_stop module=db status=error error={}",
                    err
                );
            }
        }
    }
}

/// Opens the work database in the current directory.
pub fn open_work_db() -> DbResult<WorkDb> {
    let cwd = std::env::current_dir()?;
    open_work_db_at(&cwd)
}

/// Opens the work database rooted at `work_dir`.
pub fn open_work_db_at(work_dir: &Path) -> DbResult<WorkDb> {
    let started_at = Instant::now();
    let (littera_dir, config) = config::load(work_dir)?;
    // Diagnostics live with the work; routing is best-effort.
    let _ = crate::logging::ensure_work_logging(&littera_dir);
    let binaries = binaries::ensure(&littera_dir)?;
    let cluster_config = ClusterConfig::from_work(&config, &binaries);

    let started_here = {
        let _guard = START_GUARD.lock().expect("start guard not poisoned");
        cluster::init_cluster(&cluster_config)?;
        cluster::start(&cluster_config)?
    };

    let lease_seconds = lease::lease_seconds();
    let _ = lease::renew(&littera_dir, lease_seconds);
    if started_here && lease_seconds > 0 {
        lease::spawn_watcher(&littera_dir);
    }

    let mut client = connect(&cluster_config)?;
    apply_migrations(&mut client)?;

    info!(
        "event=db_open module=db status=ok port={} started_here={} duration_ms={}",
        cluster_config.port,
        started_here,
        started_at.elapsed().as_millis()
    );

    Ok(WorkDb {
        work_dir: work_dir.to_path_buf(),
        littera_dir,
        config,
        cluster: cluster_config,
        client: Some(client),
        started_here,
        lease_seconds,
    })
}

/// Connects to the named database on the cluster.
pub fn connect(cluster_config: &ClusterConfig) -> DbResult<Client> {
    connect_db(cluster_config, &cluster_config.db_name)
}

/// Connects to an arbitrary database on the cluster (admin paths use
/// `postgres` before the application database exists).
pub fn connect_db(cluster_config: &ClusterConfig, db_name: &str) -> DbResult<Client> {
    let mut pg_config = postgres::Config::new();
    pg_config
        .host("127.0.0.1")
        .port(cluster_config.port)
        .dbname(db_name)
        .user(&cluster_user())
        .connect_timeout(CONNECT_TIMEOUT)
        // Every statement gets a finite timeout; nothing blocks forever.
        .options("-c statement_timeout=30000");
    Ok(pg_config.connect(NoTls)?)
}

/// initdb makes the invoking OS user the cluster superuser.
fn cluster_user() -> String {
    std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .unwrap_or_else(|_| "postgres".to_string())
}

/// Binaries handle for maintenance commands operating on a closed cluster.
pub fn binaries_for(littera_dir: &Path) -> DbResult<EngineBinaries> {
    binaries::ensure(littera_dir)
}
