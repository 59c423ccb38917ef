//! Shared scaffolding for cluster-backed tests.
//!
//! Each test provisions its own isolated cluster in a temp directory with a
//! zero lease, so tests never share state and always stop what they start.
//! These helpers require downloaded engine binaries, which is why every
//! test using them is `#[ignore]`d by default.

use littera_core::db::cluster::{self, ClusterConfig};
use littera_core::db::config::{self, WorkConfig};
use littera_core::db::migrations::apply_migrations;
use littera_core::db::{binaries_for, connect_db};
use littera_core::model::hierarchy::Work;
use littera_core::repo::work_repo::{PgWorkRepository, WorkRepository};
use postgres::Client;
use tempfile::TempDir;
use uuid::Uuid;

/// A live scratch work: cluster running, schema migrated, Work row present.
pub struct ScratchWork {
    pub work_id: Uuid,
    pub client: Client,
    pub cluster: ClusterConfig,
    // Held for the lifetime of the cluster; dropping it removes the work.
    _dir: TempDir,
}

impl ScratchWork {
    pub fn provision() -> Self {
        std::env::set_var("LITTERA_TEST", "1");

        let dir = TempDir::new().expect("temp work directory");
        let littera_dir = config::littera_dir(dir.path());
        let work_id = Uuid::new_v4();
        let port = cluster::allocate_port(work_id).expect("free port");

        let work_config = WorkConfig::for_new_work(work_id, &littera_dir, port);
        config::store(&littera_dir, &work_config).expect("store config");

        let binaries = binaries_for(&littera_dir).expect("engine binaries");
        let cluster_config = ClusterConfig::from_work(&work_config, &binaries);
        cluster::init_cluster(&cluster_config).expect("initdb");
        cluster::start(&cluster_config).expect("cluster start");

        let mut admin = connect_db(&cluster_config, "postgres").expect("admin connection");
        admin
            .batch_execute("CREATE DATABASE \"littera\";")
            .expect("create database");
        drop(admin);

        let mut client = connect_db(&cluster_config, "littera").expect("connection");
        apply_migrations(&mut client).expect("migrations");

        PgWorkRepository::new(&mut client)
            .create_work(&Work::with_id(work_id, Some("scratch".into()), "en"))
            .expect("work row");

        Self {
            work_id,
            client,
            cluster: cluster_config,
            _dir: dir,
        }
    }
}

impl Drop for ScratchWork {
    fn drop(&mut self) {
        let _ = cluster::stop(&self.cluster, "immediate");
    }
}
