//! Embedded Postgres binary provisioning.
//!
//! # Responsibility
//! - Download engine distributions once into a user-global cache keyed by
//!   engine version and host OS/architecture.
//! - Link each work's `.littera/pg` into the cache so cache eviction never
//!   corrupts a work's data.
//!
//! # Invariants
//! - Downloads land in a temp file, are checksum-verified when a digest is
//!   pinned, and are moved into place with an atomic rename.
//! - The cache is append-only; this module never deletes cached engines.

use crate::db::config::ENGINE_DIR;
use crate::db::{DbError, DbResult};
use log::info;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Pinned engine version; also recorded in each work's config.
pub const ENGINE_VERSION: &str = "18.1.0";

/// One redistributable engine artifact (Zonky embedded-postgres JAR).
struct EngineArtifact {
    os: &'static str,
    arch: &'static str,
    url: &'static str,
    /// SHA-1 of the artifact as published on Maven Central, when pinned.
    sha1: Option<&'static str>,
}

const ARTIFACTS: &[EngineArtifact] = &[
    EngineArtifact {
        os: "macos",
        arch: "aarch64",
        url: "https://repo1.maven.org/maven2/io/zonky/test/postgres/embedded-postgres-binaries-darwin-arm64v8/18.1.0/embedded-postgres-binaries-darwin-arm64v8-18.1.0.jar",
        sha1: Some("5941b043f17fe3deca920763efd2fc38ed2f0efa"),
    },
    EngineArtifact {
        os: "macos",
        arch: "x86_64",
        url: "https://repo1.maven.org/maven2/io/zonky/test/postgres/embedded-postgres-binaries-darwin-amd64/18.1.0/embedded-postgres-binaries-darwin-amd64-18.1.0.jar",
        sha1: Some("ade1f82936188b591844e9bc5bcfc22443b0d71f"),
    },
    EngineArtifact {
        os: "linux",
        arch: "x86_64",
        url: "https://repo1.maven.org/maven2/io/zonky/test/postgres/embedded-postgres-binaries-linux-amd64/18.1.0/embedded-postgres-binaries-linux-amd64-18.1.0.jar",
        sha1: None,
    },
    EngineArtifact {
        os: "linux",
        arch: "aarch64",
        url: "https://repo1.maven.org/maven2/io/zonky/test/postgres/embedded-postgres-binaries-linux-arm64v8/18.1.0/embedded-postgres-binaries-linux-arm64v8-18.1.0.jar",
        sha1: None,
    },
];

/// Resolved per-work engine binaries.
#[derive(Debug, Clone)]
pub struct EngineBinaries {
    bin_dir: PathBuf,
}

impl EngineBinaries {
    pub fn initdb(&self) -> PathBuf {
        self.bin_dir.join("initdb")
    }

    pub fn pg_ctl(&self) -> PathBuf {
        self.bin_dir.join("pg_ctl")
    }

    pub fn pg_resetwal(&self) -> PathBuf {
        self.bin_dir.join("pg_resetwal")
    }
}

/// Ensures engine binaries exist for the work and returns their location.
///
/// Binaries are cached globally and symlinked into the work directory; when
/// symlinks are unavailable the cache is copied instead.
pub fn ensure(littera_dir: &Path) -> DbResult<EngineBinaries> {
    let work_pg_dir = littera_dir.join(ENGINE_DIR);
    let work_bin_dir = work_pg_dir.join("bin");
    if work_bin_dir.is_dir() {
        return Ok(EngineBinaries {
            bin_dir: work_bin_dir,
        });
    }

    let cached_pg_dir = ensure_cached_binaries()?;
    populate_work_pg_dir(littera_dir, &work_pg_dir, &cached_pg_dir)?;

    if !work_bin_dir.is_dir() {
        return Err(DbError::BinariesUnavailable(
            "work pg/bin missing after provisioning".to_string(),
        ));
    }
    Ok(EngineBinaries {
        bin_dir: work_bin_dir,
    })
}

/// User-global cache root for the current host.
pub fn cache_root() -> DbResult<PathBuf> {
    let base = dirs::cache_dir()
        .ok_or_else(|| DbError::BinariesUnavailable("no user cache directory".to_string()))?;
    Ok(base
        .join("littera")
        .join("embedded")
        .join(ENGINE_VERSION)
        .join(format!("{}-{}", std::env::consts::OS, std::env::consts::ARCH)))
}

fn ensure_cached_binaries() -> DbResult<PathBuf> {
    let cache_root = cache_root()?;
    let cached_pg_dir = cache_root.join("pg");
    if cached_pg_dir.join("bin").is_dir() {
        return Ok(cached_pg_dir);
    }

    let artifact = select_artifact()?;
    info!(
        "event=engine_download module=db status=start version={} os={} arch={}",
        ENGINE_VERSION,
        artifact.os,
        artifact.arch
    );

    // Unpack into a sibling staging dir, then rename; a crashed download
    // never leaves a half-populated cache entry behind.
    let staging = cache_root.join("pg.partial");
    if staging.exists() {
        std::fs::remove_dir_all(&staging)?;
    }
    std::fs::create_dir_all(&staging)?;
    download_and_unpack(artifact, &staging)?;

    if !staging.join("bin").is_dir() {
        return Err(DbError::BinariesUnavailable(
            "downloaded engine archive has no bin/ directory".to_string(),
        ));
    }
    std::fs::rename(&staging, &cached_pg_dir)?;

    info!(
        "event=engine_download module=db status=ok version={}",
        ENGINE_VERSION
    );
    Ok(cached_pg_dir)
}

fn select_artifact() -> DbResult<&'static EngineArtifact> {
    let os = std::env::consts::OS;
    let arch = std::env::consts::ARCH;
    ARTIFACTS
        .iter()
        .find(|artifact| artifact.os == os && artifact.arch == arch)
        .ok_or_else(|| DbError::BinariesUnavailable(format!("unsupported platform {os}-{arch}")))
}

fn populate_work_pg_dir(littera_dir: &Path, work_pg_dir: &Path, cached_pg_dir: &Path) -> DbResult<()> {
    std::fs::create_dir_all(littera_dir)?;

    if work_pg_dir.is_symlink() || work_pg_dir.is_file() {
        std::fs::remove_file(work_pg_dir)?;
    } else if work_pg_dir.is_dir() {
        std::fs::remove_dir_all(work_pg_dir)?;
    }

    #[cfg(unix)]
    {
        if std::os::unix::fs::symlink(cached_pg_dir, work_pg_dir).is_ok() {
            return Ok(());
        }
    }
    copy_dir_recursive(cached_pg_dir, work_pg_dir)
}

fn copy_dir_recursive(from: &Path, to: &Path) -> DbResult<()> {
    std::fs::create_dir_all(to)?;
    for entry in std::fs::read_dir(from)? {
        let entry = entry?;
        let target = to.join(entry.file_name());
        if entry.file_type()?.is_dir() {
            copy_dir_recursive(&entry.path(), &target)?;
        } else {
            std::fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}

fn download_and_unpack(artifact: &EngineArtifact, pg_dir: &Path) -> DbResult<()> {
    let archive_path = pg_dir.join("postgres.jar");
    run_engine_command(
        Command::new("curl")
            .arg("--fail")
            .arg("--location")
            .arg("--silent")
            .arg("--show-error")
            .arg("--output")
            .arg(&archive_path)
            .arg(artifact.url),
        "curl",
    )?;

    if let Some(expected) = artifact.sha1 {
        let actual = file_sha1(&archive_path)?;
        if actual != expected {
            let _ = std::fs::remove_file(&archive_path);
            return Err(DbError::BinariesUnavailable(format!(
                "checksum mismatch for {}: expected {expected}, got {actual}",
                artifact.url
            )));
        }
    }

    // Zonky artifacts are JARs (ZIP) wrapping a native .txz distribution.
    run_engine_command(
        Command::new("unzip")
            .arg("-o")
            .arg("-q")
            .arg(&archive_path)
            .arg("-d")
            .arg(pg_dir),
        "unzip",
    )?;
    std::fs::remove_file(&archive_path)?;

    let txz_path = find_txz(pg_dir)?;
    run_engine_command(
        Command::new("tar")
            .arg("-xJf")
            .arg(&txz_path)
            .arg("-C")
            .arg(pg_dir),
        "tar",
    )?;
    std::fs::remove_file(&txz_path)?;
    Ok(())
}

fn find_txz(pg_dir: &Path) -> DbResult<PathBuf> {
    for entry in std::fs::read_dir(pg_dir)? {
        let entry = entry?;
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if name.starts_with("postgres-") && name.ends_with(".txz") {
            return Ok(entry.path());
        }
    }
    Err(DbError::BinariesUnavailable(
        "no embedded Postgres .txz found in engine artifact".to_string(),
    ))
}

fn file_sha1(path: &Path) -> DbResult<String> {
    let output = Command::new("sha1sum").arg(path).output()?;
    if !output.status.success() {
        return Err(DbError::EngineCommandFailed {
            command: "sha1sum".to_string(),
            message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }
    let stdout = String::from_utf8_lossy(&output.stdout);
    stdout
        .split_whitespace()
        .next()
        .map(|digest| digest.to_string())
        .ok_or_else(|| DbError::EngineCommandFailed {
            command: "sha1sum".to_string(),
            message: "empty output".to_string(),
        })
}

fn run_engine_command(command: &mut Command, name: &str) -> DbResult<()> {
    let output = command.output()?;
    if !output.status.success() {
        return Err(DbError::EngineCommandFailed {
            command: name.to_string(),
            message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{cache_root, ENGINE_VERSION};

    #[test]
    fn cache_root_is_versioned_and_platform_scoped() {
        let root = cache_root().unwrap();
        let rendered = root.display().to_string();
        assert!(rendered.contains("littera"));
        assert!(rendered.contains(ENGINE_VERSION));
        assert!(rendered.contains(std::env::consts::OS));
        assert!(rendered.contains(std::env::consts::ARCH));
    }
}
