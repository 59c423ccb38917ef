//! `littera init`: provision a new work.
//!
//! Policy layer: chooses defaults, writes config, orchestrates cluster
//! bootstrap, creates the application database and the Work row, then
//! stops the cluster again — embedded Postgres is an implementation
//! detail, not a daemon.

use crate::output::{CliError, CliResult, OutputCtx};
use littera_core::db::cluster::{self, ClusterConfig};
use littera_core::db::config::{self, WorkConfig};
use littera_core::db::migrations::apply_migrations;
use littera_core::db::{binaries_for, connect_db};
use littera_core::model::hierarchy::Work;
use littera_core::repo::work_repo::{PgWorkRepository, WorkRepository};
use std::path::PathBuf;
use uuid::Uuid;

pub fn run(ctx: &OutputCtx, path: Option<PathBuf>, port: Option<u16>) -> CliResult<()> {
    let work_dir = match path {
        Some(path) => path,
        None => std::env::current_dir()?,
    };
    let work_dir = if work_dir.is_absolute() {
        work_dir
    } else {
        std::env::current_dir()?.join(work_dir)
    };

    let work_id = Uuid::new_v4();

    if ctx.dry_run {
        if ctx.json {
            ctx.emit_json(&serde_json::json!({
                "dry_run": true,
                "action": "init",
                "path": work_dir.display().to_string(),
            }));
        } else {
            println!("Would initialize a Littera work at {}", work_dir.display());
        }
        return Ok(());
    }

    std::fs::create_dir_all(&work_dir)?;
    let littera_dir = config::littera_dir(&work_dir);

    if littera_dir.join(config::CONFIG_FILE).exists() {
        return Err(CliError::new(
            littera_core::ErrorKind::Conflict,
            format!("already a Littera work: {}", work_dir.display()),
        ));
    }

    std::fs::create_dir_all(&littera_dir)?;
    let _ = littera_core::ensure_work_logging(&littera_dir);

    // Policy: an explicit --port is trusted as-is; otherwise allocate in
    // the reserved range, seeded by the work id.
    let port = match port {
        Some(port) => port,
        None => cluster::allocate_port(work_id)?,
    };

    let work_config = WorkConfig::for_new_work(work_id, &littera_dir, port);
    config::store(&littera_dir, &work_config)?;

    // First init downloads the engine into the user cache; later inits
    // reuse it through the per-work indirection.
    let binaries = binaries_for(&littera_dir)?;
    let cluster_config = ClusterConfig::from_work(&work_config, &binaries);

    cluster::init_cluster(&cluster_config)?;
    let started_here = cluster::start(&cluster_config)?;

    let result = provision_database(&cluster_config, work_id, &work_dir);

    if started_here {
        let _ = cluster::stop(&cluster_config, "fast");
    }
    result?;

    if ctx.json {
        ctx.emit_json(&serde_json::json!({
            "work_id": work_id,
            "path": work_dir.display().to_string(),
            "port": port,
        }));
    } else {
        println!("Initialized Littera work at {}", work_dir.display());
    }
    Ok(())
}

fn provision_database(
    cluster_config: &ClusterConfig,
    work_id: Uuid,
    work_dir: &std::path::Path,
) -> CliResult<()> {
    // The application database is created through the admin database,
    // which initdb always provides.
    let mut admin = connect_db(cluster_config, "postgres")?;
    let exists = admin.query_opt(
        "SELECT 1 FROM pg_database WHERE datname = $1;",
        &[&cluster_config.db_name],
    )?;
    if exists.is_none() {
        // Identifiers cannot be bound parameters.
        admin.batch_execute(&format!(
            "CREATE DATABASE \"{}\";",
            cluster_config.db_name.replace('"', "\"\"")
        ))?;
    }
    drop(admin);

    let mut client = connect_db(cluster_config, &cluster_config.db_name)?;
    apply_migrations(&mut client)?;

    let title = work_dir
        .file_name()
        .map(|name| name.to_string_lossy().to_string());
    let mut repo = PgWorkRepository::new(&mut client);
    if repo.get_work()?.is_none() {
        repo.create_work(&Work::with_id(work_id, title, "en"))?;
    }
    Ok(())
}
