//! Tool index cache.
//!
//! A SQLite table of discovered tool classes, one generation per package
//! fingerprint (the sorted `name==version` list of the package's
//! distributions). A lookup whose fingerprint has no rows rescans the package
//! and inserts the new generation in one transaction. Older generations stay
//! in the table but are never read again.
//!
//! `(distributions, name)` is unique and inserts ignore conflicts, so two
//! processes racing on a cold cache cannot leave duplicate rows.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use anyhow::Context;
use rusqlite::{params, Connection};
use tracing::{debug, info};

use super::ecosystem::{Capability, Ecosystem};
use super::scanner::{find_classes, find_classes_dynamic, FoundClass};
use super::{format_distributions_key, ToolError, COMMUNITY_PACKAGE};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS tools (
    distributions TEXT NOT NULL,
    module        TEXT NOT NULL,
    class         TEXT NOT NULL,
    name          TEXT NOT NULL,
    description   TEXT,
    UNIQUE (distributions, name)
);
";

/// One cached tool class.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ToolDescriptor {
    pub distributions: String,
    pub module: String,
    pub class: String,
    pub name: String,
    pub description: Option<String>,
}

/// Persistent index of tool classes keyed by package fingerprint.
pub struct ToolIndexCache {
    conn: Mutex<Connection>,
}

impl ToolIndexCache {
    /// Open (or create) the cache database at `path`.
    pub fn open(path: &Path) -> anyhow::Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open tool cache {}", path.display()))?;
        Self::with_connection(conn).context("Failed to initialise tool cache")
    }

    /// A cache that lives as long as the process.
    pub fn open_in_memory() -> Result<Self, ToolError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, ToolError> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        // A panic while holding the lock can't leave SQLite half-written.
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// All tools of `package` for its current fingerprint, keyed by name.
    ///
    /// Returns an empty map when the package isn't installed.
    pub fn lookup_tools(
        &self,
        ecosystem: &Ecosystem,
        package: &str,
    ) -> Result<BTreeMap<String, ToolDescriptor>, ToolError> {
        let Some(distributions) = ecosystem.distributions(package) else {
            debug!(package, "package not installed");
            return Ok(BTreeMap::new());
        };
        let key = format_distributions_key(distributions);

        let mut conn = self.conn();
        let existing: i64 = conn.query_row(
            "SELECT count(*) FROM tools WHERE distributions = ?1",
            params![key],
            |row| row.get(0),
        )?;
        if existing == 0 {
            update_cache(&mut conn, ecosystem, package, &key)?;
        } else {
            debug!(package, distributions = %key, rows = existing, "tool cache hit");
        }

        let mut stmt = conn.prepare(
            "SELECT distributions, module, class, name, description
             FROM tools WHERE distributions = ?1",
        )?;
        let rows = stmt.query_map(params![key], |row| {
            Ok(ToolDescriptor {
                distributions: row.get(0)?,
                module: row.get(1)?,
                class: row.get(2)?,
                name: row.get(3)?,
                description: row.get(4)?,
            })
        })?;

        let mut tools = BTreeMap::new();
        for row in rows {
            let descriptor = row?;
            tools.insert(descriptor.name.clone(), descriptor);
        }
        Ok(tools)
    }

    /// Total rows across all generations.
    #[cfg(test)]
    fn row_count(&self) -> Result<i64, ToolError> {
        Ok(self
            .conn()
            .query_row("SELECT count(*) FROM tools", [], |row| row.get(0))?)
    }
}

/// Rescan `package` and insert one row per named tool class under `key`.
fn update_cache(
    conn: &mut Connection,
    ecosystem: &Ecosystem,
    package: &str,
    key: &str,
) -> Result<(), ToolError> {
    info!(package, distributions = %key, "tool cache miss, scanning package");

    let found: Box<dyn Iterator<Item = FoundClass> + '_> = if package == COMMUNITY_PACKAGE {
        let root = format!("{COMMUNITY_PACKAGE}.tools");
        Box::new(find_classes_dynamic(ecosystem, &root, Capability::Tool))
    } else {
        Box::new(find_classes(ecosystem, package, Capability::Tool))
    };

    let tx = conn.transaction()?;
    let mut inserted = 0;
    {
        let mut stmt = tx.prepare(
            "INSERT OR IGNORE INTO tools (distributions, module, class, name, description)
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )?;
        for found in found {
            let Some(name) = found.class.tool_name else {
                continue;
            };
            inserted += stmt.execute(params![
                key,
                found.module,
                found.class.name,
                name,
                found.class.description
            ])?;
        }
    }
    tx.commit()?;

    info!(package, tools = inserted, "tool cache populated");
    Ok(())
}
