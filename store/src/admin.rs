use crate::error::Result;
use crate::Store;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Takes a backup of the database file before a destructive operation
/// (§4.1: every destructive operation "must invoke the backup collaborator
/// first"). A trait so callers can swap in a remote/object-store backend
/// without `arbihawk-store` depending on one.
pub trait BackupCollaborator: Send + Sync {
    fn backup(&self, source_path: &Path, label: &str) -> Result<PathBuf>;
}

/// Copies the database file into a timestamped sibling under `dir`.
#[derive(Debug, Clone)]
pub struct FileBackupCollaborator {
    dir: PathBuf,
}

impl FileBackupCollaborator {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl BackupCollaborator for FileBackupCollaborator {
    fn backup(&self, source_path: &Path, label: &str) -> Result<PathBuf> {
        std::fs::create_dir_all(&self.dir)?;
        let stamp = chrono::Utc::now().format("%Y%m%dT%H%M%S%.f");
        let file_name = format!("{label}_{stamp}.sqlite3");
        let dest = self.dir.join(file_name);
        std::fs::copy(source_path, &dest)?;
        Ok(dest)
    }
}

/// Structured report returned by every destructive operation (§4.1).
#[derive(Debug, Clone, PartialEq)]
pub struct ResetReport {
    pub backup_path: Option<PathBuf>,
    pub records_deleted: HashMap<String, u64>,
    pub total_deleted: u64,
}

const BETTING_TABLES: &[&str] = &["bet_history", "odds", "scores", "fixtures"];
const TRADING_TABLES: &[&str] =
    &["trades", "positions", "portfolio", "indicators", "price_history", "stocks", "crypto"];
const SHARED_TABLES: &[&str] = &["ingestion_metadata", "metrics", "run_history"];

impl Store {
    /// Path on disk backing this store, if any (`None` for an in-memory
    /// instance, which destructive operations refuse to touch since there is
    /// no file for the backup collaborator to copy).
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn reset_betting_domain(&self, backup: &dyn BackupCollaborator) -> Result<ResetReport> {
        self.reset_tables(backup, "reset_betting_domain", BETTING_TABLES)
    }

    pub fn reset_trading_domain(&self, backup: &dyn BackupCollaborator) -> Result<ResetReport> {
        self.reset_tables(backup, "reset_trading_domain", TRADING_TABLES)
    }

    /// `preserve_models = true` keeps `model_versions` intact (§4.1).
    pub fn reset_database(
        &self,
        backup: &dyn BackupCollaborator,
        preserve_models: bool,
    ) -> Result<ResetReport> {
        let mut tables: Vec<&str> =
            BETTING_TABLES.iter().chain(TRADING_TABLES).chain(SHARED_TABLES).copied().collect();
        if !preserve_models {
            tables.push("model_versions");
        }
        self.reset_tables(backup, "reset_database", &tables)
    }

    fn reset_tables(
        &self,
        backup: &dyn BackupCollaborator,
        label: &str,
        tables: &[&str],
    ) -> Result<ResetReport> {
        let backup_path = match self.path.as_deref() {
            Some(path) => Some(backup.backup(path, label)?),
            None => {
                warn!(label, "resetting an in-memory store; skipping backup");
                None
            }
        };

        self.with_conn(|conn| {
            conn.execute_batch("PRAGMA foreign_keys = OFF;")?;
            let tx = conn.unchecked_transaction()?;

            let has_sequence_table: bool = tx.query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name='sqlite_sequence'",
                [],
                |row| row.get::<_, i64>(0),
            )? > 0;

            let mut records_deleted = HashMap::new();
            let mut total_deleted = 0u64;
            for table in tables {
                let count: u64 =
                    tx.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| row.get(0))?;
                tx.execute(&format!("DELETE FROM {table}"), [])?;
                if has_sequence_table {
                    tx.execute("DELETE FROM sqlite_sequence WHERE name = ?1", [table])?;
                }
                records_deleted.insert((*table).to_string(), count);
                total_deleted += count;
            }

            tx.commit()?;
            conn.execute_batch("PRAGMA foreign_keys = ON; VACUUM;")?;

            Ok(ResetReport { backup_path: backup_path.clone(), records_deleted, total_deleted })
        })
    }

    /// Copies all betting+shared tables from `source_path` into this store,
    /// after truncating the destination's copies (§4.1). Deterministic:
    /// identical source bytes always produce identical destination rows,
    /// since this is a row-for-row copy with no generated fields.
    pub fn sync_from_production(&self, source_path: impl AsRef<Path>) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute("ATTACH DATABASE ?1 AS production", [source_path.as_ref().to_string_lossy()])?;

            let tx = conn.unchecked_transaction()?;
            for table in BETTING_TABLES.iter().chain(SHARED_TABLES) {
                tx.execute(&format!("DELETE FROM {table}"), [])?;
                tx.execute(
                    &format!("INSERT INTO {table} SELECT * FROM production.{table}"),
                    [],
                )?;
            }
            tx.commit()?;

            conn.execute("DETACH DATABASE production", [])?;
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arbihawk_instrument::Fixture;
    use arbihawk_markets::FixtureStatus;
    use chrono::Utc;
    use tempfile::tempdir;

    struct NoopBackup;
    impl BackupCollaborator for NoopBackup {
        fn backup(&self, _source_path: &Path, _label: &str) -> Result<PathBuf> {
            Ok(PathBuf::from("/dev/null"))
        }
    }

    fn fixture(id: &str) -> Fixture {
        Fixture {
            fixture_id: id.into(),
            source: "betano".into(),
            tournament_name: None,
            home_team_name: "A".into(),
            away_team_name: "B".into(),
            start_time: Utc::now(),
            status: FixtureStatus::Scheduled,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn reset_betting_domain_clears_betting_tables_only() {
        let store = Store::open_in_memory().unwrap();
        store.upsert_fixture(&fixture("f1")).unwrap();

        let report = store.reset_betting_domain(&NoopBackup).unwrap();
        assert_eq!(report.records_deleted.get("fixtures"), Some(&1));
        assert!(store.get_fixture("f1").unwrap().is_none());
    }

    #[test]
    fn reset_database_preserve_models_keeps_model_versions() {
        let store = Store::open_in_memory().unwrap();
        store.upsert_fixture(&fixture("f1")).unwrap();

        let report = store.reset_database(&NoopBackup, true).unwrap();
        assert!(!report.records_deleted.contains_key("model_versions"));
    }

    #[test]
    fn real_file_backup_copies_bytes() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("arbihawk.sqlite3");
        let store = Store::open(&db_path).unwrap();
        store.upsert_fixture(&fixture("f1")).unwrap();

        let backup_dir = dir.path().join("backups");
        let collaborator = FileBackupCollaborator::new(&backup_dir);
        let report = store.reset_betting_domain(&collaborator).unwrap();

        let backup_path = report.backup_path.unwrap();
        assert!(backup_path.exists());
    }
}
