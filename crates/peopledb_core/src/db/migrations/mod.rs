//! SQLite migration registry and executor.
//!
//! # Responsibility
//! - Register schema migrations in strictly increasing order.
//! - Apply pending migrations atomically.
//! - Verify the `contacts` column set once migrations are done.
//!
//! # Invariants
//! - `version` values must remain monotonic.
//! - Applied migration version is mirrored to `PRAGMA user_version`.
//! - Every step is idempotent on its own. Stores written by older releases
//!   report `user_version = 0` yet may already carry later columns.
//! - Migrations are additive only: no column is dropped or renamed and no
//!   existing row content is rewritten.

use crate::db::{DbError, DbResult};
use log::info;
use rusqlite::{Connection, TransactionBehavior};

pub const CONTACTS_TABLE: &str = "contacts";

/// Columns every migrated `contacts` table must expose, in export order.
pub const REQUIRED_COLUMNS: &[&str] = &[
    "id",
    "name",
    "nickname",
    "birthday",
    "address",
    "personality_notes",
    "social_media",
    "tags",
    "like_as_friend",
    "like_romantically",
    "created_at",
    "updated_at",
];

#[derive(Debug, Clone, Copy)]
enum Step {
    Sql(&'static str),
    /// `ALTER TABLE .. ADD COLUMN` guarded by a `PRAGMA table_info` check.
    AddColumn {
        table: &'static str,
        column: &'static str,
        definition: &'static str,
    },
}

#[derive(Debug, Clone, Copy)]
struct Migration {
    version: u32,
    name: &'static str,
    step: Step,
}

const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "contacts",
        step: Step::Sql(include_str!("0001_contacts.sql")),
    },
    Migration {
        version: 2,
        name: "address",
        step: Step::AddColumn {
            table: CONTACTS_TABLE,
            column: "address",
            definition: "TEXT DEFAULT ''",
        },
    },
    Migration {
        version: 3,
        name: "like_as_friend",
        step: Step::AddColumn {
            table: CONTACTS_TABLE,
            column: "like_as_friend",
            definition: "BOOLEAN DEFAULT 0",
        },
    },
    Migration {
        version: 4,
        name: "like_romantically",
        step: Step::AddColumn {
            table: CONTACTS_TABLE,
            column: "like_romantically",
            definition: "BOOLEAN DEFAULT 0",
        },
    },
    Migration {
        version: 5,
        name: "name_index",
        step: Step::Sql(include_str!("0005_name_index.sql")),
    },
];

/// Returns the latest migration version known by this binary.
pub fn latest_version() -> u32 {
    MIGRATIONS.last().map_or(0, |migration| migration.version)
}

/// Reads the schema version recorded in the store.
pub fn current_version(conn: &Connection) -> DbResult<u32> {
    let version = conn.query_row("PRAGMA user_version;", [], |row| row.get::<_, u32>(0))?;
    Ok(version)
}

/// Applies all pending migrations on the provided connection.
pub fn apply_migrations(conn: &mut Connection) -> DbResult<()> {
    let latest = latest_version();
    let observed = current_version(conn)?;
    ensure_supported(observed, latest)?;
    if observed == latest {
        return Ok(());
    }

    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    // Another process may have migrated between the first read and the lock.
    let current = current_version(&tx)?;
    ensure_supported(current, latest)?;

    for migration in MIGRATIONS {
        if migration.version <= current {
            continue;
        }

        let applied = apply_step(&tx, migration.step)?;
        tx.execute_batch(&format!("PRAGMA user_version = {};", migration.version))?;
        info!(
            "event=db_migrate module=db status=ok version={} name={} changed={}",
            migration.version, migration.name, applied
        );
    }
    tx.commit()?;

    Ok(())
}

/// Returns the actual column names of `table`, in declaration order.
pub fn table_columns(conn: &Connection, table: &str) -> DbResult<Vec<String>> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table});"))?;
    let mut rows = stmt.query([])?;
    let mut columns = Vec::new();
    while let Some(row) = rows.next()? {
        columns.push(row.get::<_, String>(1)?);
    }
    Ok(columns)
}

/// Fails when any column of the current contact shape is absent.
pub fn ensure_contacts_schema(conn: &Connection) -> DbResult<()> {
    let columns = table_columns(conn, CONTACTS_TABLE)?;
    for column in REQUIRED_COLUMNS {
        if !columns.iter().any(|current| current == column) {
            return Err(DbError::MissingColumn {
                table: CONTACTS_TABLE,
                column,
            });
        }
    }
    Ok(())
}

fn ensure_supported(version: u32, latest: u32) -> DbResult<()> {
    if version > latest {
        return Err(DbError::UnsupportedSchemaVersion {
            db_version: version,
            latest_supported: latest,
        });
    }
    Ok(())
}

/// Returns whether the step changed the schema.
fn apply_step(conn: &Connection, step: Step) -> DbResult<bool> {
    match step {
        Step::Sql(sql) => {
            conn.execute_batch(sql)?;
            Ok(true)
        }
        Step::AddColumn {
            table,
            column,
            definition,
        } => {
            let columns = table_columns(conn, table)?;
            if columns.iter().any(|current| current == column) {
                return Ok(false);
            }
            conn.execute_batch(&format!(
                "ALTER TABLE {table} ADD COLUMN {column} {definition};"
            ))?;
            Ok(true)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{apply_step, latest_version, MIGRATIONS};
    use rusqlite::Connection;

    #[test]
    fn versions_are_strictly_increasing_from_one() {
        for (index, migration) in MIGRATIONS.iter().enumerate() {
            assert_eq!(migration.version as usize, index + 1);
        }
        assert_eq!(latest_version(), MIGRATIONS.len() as u32);
    }

    #[test]
    fn name_index_belongs_to_its_own_step_only() {
        let conn = Connection::open_in_memory().unwrap();
        let name_indexes = |conn: &Connection| -> i64 {
            conn.query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'index' AND name = 'idx_contacts_name';",
                [],
                |row| row.get(0),
            )
            .unwrap()
        };

        let (last, earlier) = MIGRATIONS.split_last().unwrap();
        for migration in earlier {
            apply_step(&conn, migration.step).unwrap();
        }
        assert_eq!(name_indexes(&conn), 0);

        apply_step(&conn, last.step).unwrap();
        assert_eq!(name_indexes(&conn), 1);
    }
}
