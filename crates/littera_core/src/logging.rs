//! Per-work diagnostic logging.
//!
//! # Responsibility
//! - Route a process's log files into the work they describe:
//!   `.littera/logs/` sits next to the cluster state, so diagnostics move,
//!   back up and disappear together with the work.
//! - Capture panics as sanitized, metadata-only log events.
//!
//! # Invariants
//! - The first routed work wins for the process lifetime; re-routing to the
//!   same work is a no-op, to a different one is rejected.
//! - Commands never fail because logging could not be set up; every call
//!   site treats the result as best-effort.

use flexi_logger::{Age, Cleanup, Criterion, FileSpec, Logger, LoggerHandle, Naming, WriteMode};
use log::error;
use once_cell::sync::OnceCell;
use std::path::{Path, PathBuf};

/// Log directory name inside `.littera/`.
pub const LOG_DIR: &str = "logs";

const LOG_BASENAME: &str = "littera";
const KEEP_LOG_FILES: usize = 7;
const PANIC_PAYLOAD_CAP: usize = 160;

struct ActiveLog {
    dir: PathBuf,
    _handle: LoggerHandle,
}

static ACTIVE: OnceCell<ActiveLog> = OnceCell::new();
static PANIC_HOOK: OnceCell<()> = OnceCell::new();

/// Routes this process's logs into the given work's state directory.
///
/// Writing sessions are long and low-volume, so files rotate daily and the
/// last week is kept. `RUST_LOG` overrides the build-mode default level.
pub fn ensure_work_logging(littera_dir: &Path) -> Result<(), String> {
    let dir = littera_dir.join(LOG_DIR);

    if let Some(active) = ACTIVE.get() {
        if active.dir == dir {
            return Ok(());
        }
        return Err(format!(
            "logs already routed to `{}`; not switching to `{}`",
            active.dir.display(),
            dir.display()
        ));
    }

    let state = ACTIVE.get_or_try_init(|| -> Result<ActiveLog, String> {
        std::fs::create_dir_all(&dir)
            .map_err(|err| format!("cannot create `{}`: {err}", dir.display()))?;

        let handle = Logger::try_with_env_or_str(default_log_level())
            .map_err(|err| format!("invalid log specification: {err}"))?
            .log_to_file(FileSpec::default().directory(&dir).basename(LOG_BASENAME))
            .rotate(
                Criterion::Age(Age::Day),
                Naming::Timestamps,
                Cleanup::KeepLogFiles(KEEP_LOG_FILES),
            )
            .write_mode(WriteMode::BufferAndFlush)
            .append()
            .start()
            .map_err(|err| format!("logger start failed: {err}"))?;

        install_panic_hook();

        log::info!(
            "event=log_open module=core status=ok dir={} version={} platform={}",
            dir.display(),
            env!("CARGO_PKG_VERSION"),
            std::env::consts::OS
        );
        Ok(ActiveLog {
            dir: dir.clone(),
            _handle: handle,
        })
    })?;

    if state.dir != dir {
        return Err(format!(
            "logs already routed to `{}`; not switching to `{}`",
            state.dir.display(),
            dir.display()
        ));
    }
    Ok(())
}

/// The directory this process is logging into, once routed.
pub fn log_directory() -> Option<PathBuf> {
    ACTIVE.get().map(|active| active.dir.clone())
}

fn default_log_level() -> &'static str {
    if cfg!(debug_assertions) {
        "debug"
    } else {
        "info"
    }
}

fn install_panic_hook() {
    if PANIC_HOOK.set(()).is_err() {
        return;
    }

    let previous = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let location = info
            .location()
            .map(|loc| format!("{}:{}", loc.file(), loc.line()))
            .unwrap_or_else(|| "unknown".to_string());
        error!(
            "event=panic_captured module=core status=error location={} payload={}",
            location,
            payload_summary(info)
        );
        previous(info);
    }));
}

/// Panic payloads can carry prose fragments; flatten and cap them before
/// they reach the log.
fn payload_summary(info: &std::panic::PanicHookInfo<'_>) -> String {
    let text = if let Some(message) = info.payload().downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = info.payload().downcast_ref::<String>() {
        message.clone()
    } else {
        "opaque payload".to_string()
    };

    let mut flat: String = text
        .chars()
        .map(|ch| if ch == '\n' || ch == '\r' { ' ' } else { ch })
        .take(PANIC_PAYLOAD_CAP)
        .collect();
    if text.chars().count() > PANIC_PAYLOAD_CAP {
        flat.push_str("...");
    }
    flat
}
