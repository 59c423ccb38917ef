//! `littera db ...`: embedded cluster maintenance.
//!
//! These commands are intentionally explicit and slightly verbose; the two
//! recovery paths (`reset-wal`, `reinit`) exist so WAL corruption is never
//! repaired implicitly.

use crate::cli::DbCommands;
use crate::output::{CliError, CliResult, OutputCtx};
use littera_core::db::cluster::{self, ClusterConfig};
use littera_core::db::{binaries_for, config, lease};
use std::path::PathBuf;

fn load_cluster() -> CliResult<(PathBuf, ClusterConfig)> {
    let work_dir = std::env::current_dir()?;
    let (littera_dir, work_config) = config::load(&work_dir)?;
    let _ = littera_core::ensure_work_logging(&littera_dir);
    let binaries = binaries_for(&littera_dir)?;
    Ok((
        littera_dir,
        ClusterConfig::from_work(&work_config, &binaries),
    ))
}

pub fn run(ctx: &OutputCtx, command: DbCommands) -> CliResult<()> {
    match command {
        DbCommands::Status => {
            let (littera_dir, cluster_config) = load_cluster()?;
            let lock = cluster::lock_state(&cluster_config);
            let lease_left = lease::remaining(&littera_dir);

            if ctx.json {
                ctx.emit_json(&serde_json::json!({
                    "port": cluster_config.port,
                    "running": matches!(lock, Some((_, true))),
                    "stale_lock": matches!(lock, Some((_, false))),
                    "lease_seconds_left": lease_left,
                }));
                return Ok(());
            }
            match lock {
                Some((_, true)) => println!("Postgres: running (port {})", cluster_config.port),
                Some((pid, false)) => println!("Postgres: not running (stale lock, pid {pid})"),
                None => println!("Postgres: not running"),
            }
            match lease_left {
                Some(seconds) => println!("Lease: expires in {seconds}s"),
                None => println!("Lease: none"),
            }
            Ok(())
        }

        DbCommands::Start { lease_seconds } => {
            let (littera_dir, cluster_config) = load_cluster()?;
            if ctx.dry_run {
                println!("Would start Postgres (port {})", cluster_config.port);
                return Ok(());
            }
            cluster::init_cluster(&cluster_config)?;
            let started_here = cluster::start(&cluster_config)?;

            let seconds = lease_seconds.unwrap_or_else(lease::lease_seconds);
            let _ = lease::renew(&littera_dir, seconds);
            if started_here && seconds > 0 {
                lease::spawn_watcher(&littera_dir);
            }

            if ctx.json {
                ctx.emit_json(&serde_json::json!({
                    "port": cluster_config.port,
                    "started_here": started_here,
                    "lease_seconds": seconds,
                }));
            } else if started_here {
                println!("✓ Started Postgres (port {})", cluster_config.port);
            } else {
                println!("✓ Postgres already running (port {})", cluster_config.port);
            }
            Ok(())
        }

        DbCommands::Stop { mode } => {
            if !["smart", "fast", "immediate"].contains(&mode.as_str()) {
                return Err(CliError::invalid(format!(
                    "invalid stop mode: {mode} (expected smart|fast|immediate)"
                )));
            }
            let (_, cluster_config) = load_cluster()?;
            if ctx.dry_run {
                println!("Would stop Postgres ({mode})");
                return Ok(());
            }
            let stopped = cluster::stop(&cluster_config, &mode)?;
            if ctx.json {
                ctx.emit_json(&serde_json::json!({ "stopped": stopped }));
            } else if stopped {
                println!("✓ Stopped Postgres");
            } else {
                println!("Postgres was not running");
            }
            Ok(())
        }

        DbCommands::Lease { seconds } => {
            let (littera_dir, _) = load_cluster()?;
            match seconds {
                None => {
                    match lease::remaining(&littera_dir) {
                        Some(left) => println!("{left}"),
                        None => println!("(no lease)"),
                    }
                    Ok(())
                }
                Some(seconds) => {
                    if ctx.dry_run {
                        println!("Would renew the lease: {seconds}s");
                        return Ok(());
                    }
                    lease::renew(&littera_dir, seconds)?;
                    if ctx.json {
                        ctx.emit_json(&serde_json::json!({ "lease_seconds": seconds }));
                    } else {
                        println!("✓ Lease renewed: {seconds}s");
                    }
                    Ok(())
                }
            }
        }

        DbCommands::ReallocatePort => {
            let work_dir = std::env::current_dir()?;
            let (littera_dir, mut work_config) = config::load(&work_dir)?;
            let old_port = work_config.postgres.port;
            let new_port = cluster::allocate_port(work_config.work.id)?;

            if ctx.dry_run {
                println!("Would re-allocate port {old_port} → {new_port}");
                return Ok(());
            }

            let binaries = binaries_for(&littera_dir)?;
            let cluster_config = ClusterConfig::from_work(&work_config, &binaries);
            cluster::stop(&cluster_config, "fast")?;

            work_config.postgres.port = new_port;
            config::store(&littera_dir, &work_config)?;

            if ctx.json {
                ctx.emit_json(&serde_json::json!({ "old_port": old_port, "port": new_port }));
            } else {
                println!("✓ Port re-allocated: {old_port} → {new_port}");
            }
            Ok(())
        }

        DbCommands::ResetWal => {
            let (_, cluster_config) = load_cluster()?;
            if ctx.dry_run {
                println!(
                    "Would reset the write-ahead log of {}",
                    cluster_config.data_dir.display()
                );
                return Ok(());
            }
            if !ctx.force {
                return Err(CliError::invariant(
                    "reset-wal may lose uncommitted data; re-run with --force",
                ));
            }
            cluster::reset_wal(&cluster_config)?;
            if ctx.json {
                ctx.emit_json(&serde_json::json!({ "reset_wal": true }));
            } else {
                println!("✓ Write-ahead log reset");
            }
            Ok(())
        }

        DbCommands::Reinit => {
            let (_, cluster_config) = load_cluster()?;
            if ctx.dry_run {
                println!(
                    "Would destroy and re-create {}",
                    cluster_config.data_dir.display()
                );
                return Ok(());
            }
            if !ctx.force {
                return Err(CliError::invariant(
                    "reinit destroys all data in this work's cluster; re-run with --force",
                ));
            }
            cluster::reinit(&cluster_config)?;
            if ctx.json {
                ctx.emit_json(&serde_json::json!({ "reinitialized": true }));
            } else {
                println!("✓ Cluster reinitialized (data directory was destroyed)");
            }
            Ok(())
        }

        DbCommands::WatchLease { littera_dir } => {
            // Detached watcher: block until the lease expires, then stop the
            // cluster. Renewals while we sleep extend the wait.
            let work_dir = littera_dir
                .parent()
                .map(|parent| parent.to_path_buf())
                .unwrap_or_else(|| littera_dir.clone());
            let (_, work_config) = config::load(&work_dir)?;
            let binaries = binaries_for(&littera_dir)?;
            let cluster_config = ClusterConfig::from_work(&work_config, &binaries);

            lease::wait_until_expired(&littera_dir);
            let _ = cluster::stop(&cluster_config, "fast");
            Ok(())
        }
    }
}
