//! Schema migration registry and executor.
//!
//! # Responsibility
//! - Register schema migrations in strictly increasing order.
//! - Apply pending migrations idempotently on every connection acquisition.
//!
//! # Invariants
//! - `version` values are strictly increasing, starting from 1.
//! - Applied versions are recorded in `schema_version`; already-applied
//!   migrations are skipped.
//! - A database newer than this binary is refused.

use crate::db::{DbError, DbResult};
use postgres::Client;

#[derive(Debug, Clone, Copy)]
struct Migration {
    version: i32,
    sql: &'static str,
}

const MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    sql: include_str!("0001_init.sql"),
}];

/// Returns the latest migration version known by this binary.
pub fn latest_version() -> i32 {
    MIGRATIONS
        .iter()
        .map(|migration| migration.version)
        .max()
        .unwrap_or(0)
}

/// Applies all pending migrations on the provided connection.
pub fn apply_migrations(client: &mut Client) -> DbResult<()> {
    validate_registry(MIGRATIONS)?;

    client.batch_execute(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER NOT NULL,
            applied_at TIMESTAMPTZ NOT NULL DEFAULT now()
        );",
    )?;

    let current_version = current_version(client)?;
    let latest = latest_version();

    if current_version > latest {
        return Err(DbError::UnsupportedSchemaVersion {
            db_version: current_version,
            latest_supported: latest,
        });
    }
    if current_version == latest {
        return Ok(());
    }

    let mut tx = client.transaction()?;
    for migration in MIGRATIONS {
        if migration.version <= current_version {
            continue;
        }
        tx.batch_execute(migration.sql)?;
        tx.execute(
            "INSERT INTO schema_version (version) VALUES ($1);",
            &[&migration.version],
        )?;
    }
    tx.commit()?;
    Ok(())
}

fn current_version(client: &mut Client) -> DbResult<i32> {
    let row = client.query_one("SELECT COALESCE(MAX(version), 0) FROM schema_version;", &[])?;
    Ok(row.get(0))
}

fn validate_registry(migrations: &[Migration]) -> DbResult<()> {
    let mut previous = 0;
    for migration in migrations {
        if migration.version == 0 {
            return Err(DbError::InvalidMigrationRegistry(
                "migration version must start from 1",
            ));
        }
        if migration.version <= previous {
            return Err(DbError::InvalidMigrationRegistry(
                "migration versions must be strictly increasing and unique",
            ));
        }
        previous = migration.version;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{latest_version, validate_registry, Migration};
    use crate::db::DbError;

    #[test]
    fn registry_rejects_non_increasing_versions() {
        let migrations = [
            Migration {
                version: 1,
                sql: "SELECT 1;",
            },
            Migration {
                version: 1,
                sql: "SELECT 1;",
            },
        ];
        let err = validate_registry(&migrations).unwrap_err();
        assert!(matches!(err, DbError::InvalidMigrationRegistry(_)));
    }

    #[test]
    fn registry_rejects_zero_version() {
        let migrations = [Migration {
            version: 0,
            sql: "SELECT 1;",
        }];
        let err = validate_registry(&migrations).unwrap_err();
        assert!(matches!(err, DbError::InvalidMigrationRegistry(_)));
    }

    #[test]
    fn embedded_registry_is_valid() {
        validate_registry(super::MIGRATIONS).unwrap();
        assert!(latest_version() >= 1);
    }
}
