use crate::error::{Result, StoreError};
use rusqlite::Connection;
use tracing::info;

/// Current schema version this build knows how to reach.
const LATEST_VERSION: u32 = 7;

/// Applies every pending migration step in order (§4.1 migration ladder).
///
/// Each step is idempotent — it checks for the table/column it would create
/// before creating it — so re-running against an already-migrated database
/// is a no-op beyond the version bookkeeping.
pub fn migrate(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER NOT NULL,
            applied_at TEXT NOT NULL
        );",
    )?;

    let mut current: u32 = conn
        .query_row("SELECT COALESCE(MAX(version), 0) FROM schema_version", [], |row| row.get(0))
        .unwrap_or(0);

    while current < LATEST_VERSION {
        let next = current + 1;
        apply_step(conn, next)?;
        conn.execute(
            "INSERT INTO schema_version (version, applied_at) VALUES (?1, datetime('now'))",
            [next],
        )?;
        info!(version = next, "applied migration step");
        current = next;
    }

    Ok(())
}

fn apply_step(conn: &Connection, version: u32) -> Result<()> {
    match version {
        1 => step_1_core_tables(conn),
        2 => step_2_bets_and_ingestion(conn),
        3 => step_3_model_market_column(conn),
        4 => step_4_dismissed_column(conn),
        5 => step_5_model_version_domain(conn),
        6 => step_6_trading_tables(conn),
        7 => step_7_run_history(conn),
        other => Err(StoreError::Migration {
            version: other,
            reason: "no such migration step".into(),
        }),
    }
}

fn step_1_core_tables(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS fixtures (
            fixture_id TEXT PRIMARY KEY,
            source TEXT NOT NULL,
            tournament_name TEXT,
            home_team_name TEXT NOT NULL,
            away_team_name TEXT NOT NULL,
            start_time TEXT NOT NULL,
            status TEXT NOT NULL,
            created_at TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_fixtures_start_time ON fixtures(start_time);
        CREATE INDEX IF NOT EXISTS idx_fixtures_teams_time
            ON fixtures(home_team_name, away_team_name, start_time);

        CREATE TABLE IF NOT EXISTS odds (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            fixture_id TEXT NOT NULL,
            bookmaker_name TEXT NOT NULL,
            market_name TEXT NOT NULL,
            outcome_name TEXT NOT NULL,
            odds_value REAL NOT NULL,
            created_at TEXT NOT NULL,
            UNIQUE(fixture_id, bookmaker_name, market_name, outcome_name)
        );
        CREATE INDEX IF NOT EXISTS idx_odds_fixture_id ON odds(fixture_id);

        CREATE TABLE IF NOT EXISTS scores (
            fixture_id TEXT PRIMARY KEY,
            home_score INTEGER NOT NULL,
            away_score INTEGER NOT NULL,
            status TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_scores_fixture_id ON scores(fixture_id);

        CREATE TABLE IF NOT EXISTS model_versions (
            version_id TEXT PRIMARY KEY,
            market TEXT NOT NULL,
            model_path TEXT NOT NULL,
            trained_at TEXT NOT NULL,
            training_samples INTEGER NOT NULL,
            cv_score REAL NOT NULL,
            is_active INTEGER NOT NULL DEFAULT 0,
            performance_metrics TEXT NOT NULL DEFAULT '{}'
        );
        CREATE INDEX IF NOT EXISTS idx_model_versions_market ON model_versions(market);

        CREATE TABLE IF NOT EXISTS metrics (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            value REAL NOT NULL,
            recorded_at TEXT NOT NULL
        );",
    )?;
    Ok(())
}

fn step_2_bets_and_ingestion(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS bet_history (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            fixture_id TEXT NOT NULL,
            market_name TEXT NOT NULL,
            outcome_name TEXT NOT NULL,
            odds REAL NOT NULL,
            stake REAL NOT NULL,
            placed_at TEXT NOT NULL,
            settled_at TEXT,
            result TEXT NOT NULL DEFAULT 'pending',
            payout REAL NOT NULL DEFAULT 0
        );
        CREATE INDEX IF NOT EXISTS idx_bet_history_fixture_id ON bet_history(fixture_id);
        CREATE INDEX IF NOT EXISTS idx_bet_history_result ON bet_history(result);

        CREATE TABLE IF NOT EXISTS ingestion_metadata (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            source TEXT NOT NULL,
            ingested_at TEXT NOT NULL,
            records_count INTEGER NOT NULL,
            checksum TEXT NOT NULL,
            validation_status TEXT NOT NULL,
            errors TEXT NOT NULL DEFAULT '[]',
            UNIQUE(source, checksum)
        );",
    )?;
    Ok(())
}

fn step_3_model_market_column(conn: &Connection) -> Result<()> {
    if !column_exists(conn, "bet_history", "model_market")? {
        conn.execute("ALTER TABLE bet_history ADD COLUMN model_market TEXT NOT NULL DEFAULT ''", [])?;
        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_bet_history_model_market ON bet_history(model_market)",
            [],
        )?;
    }
    Ok(())
}

fn step_4_dismissed_column(conn: &Connection) -> Result<()> {
    if !column_exists(conn, "ingestion_metadata", "dismissed")? {
        conn.execute(
            "ALTER TABLE ingestion_metadata ADD COLUMN dismissed INTEGER NOT NULL DEFAULT 0",
            [],
        )?;
    }
    Ok(())
}

fn step_5_model_version_domain(conn: &Connection) -> Result<()> {
    if !column_exists(conn, "model_versions", "domain")? {
        conn.execute(
            "ALTER TABLE model_versions ADD COLUMN domain TEXT NOT NULL DEFAULT 'betting'",
            [],
        )?;
        conn.execute("UPDATE model_versions SET domain = 'betting' WHERE domain = ''", [])?;
    }
    conn.execute_batch(
        "CREATE INDEX IF NOT EXISTS idx_model_versions_domain_market
            ON model_versions(domain, market);
        CREATE INDEX IF NOT EXISTS idx_model_versions_domain_market_active
            ON model_versions(domain, market, is_active);",
    )?;
    Ok(())
}

fn step_6_trading_tables(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS stocks (
            symbol TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            sector TEXT
        );
        CREATE TABLE IF NOT EXISTS crypto (
            symbol TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            sector TEXT
        );

        CREATE TABLE IF NOT EXISTS price_history (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            symbol TEXT NOT NULL,
            asset_type TEXT NOT NULL,
            timestamp TEXT NOT NULL,
            open REAL NOT NULL,
            high REAL NOT NULL,
            low REAL NOT NULL,
            close REAL NOT NULL,
            volume REAL NOT NULL,
            UNIQUE(symbol, asset_type, timestamp)
        );
        CREATE INDEX IF NOT EXISTS idx_price_history_symbol_time
            ON price_history(symbol, asset_type, timestamp);

        CREATE TABLE IF NOT EXISTS indicators (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            symbol TEXT NOT NULL,
            asset_type TEXT NOT NULL,
            timestamp TEXT NOT NULL,
            name TEXT NOT NULL,
            value REAL NOT NULL
        );

        CREATE TABLE IF NOT EXISTS trades (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            symbol TEXT NOT NULL,
            asset_type TEXT NOT NULL,
            trade_type TEXT NOT NULL,
            strategy TEXT NOT NULL,
            quantity REAL NOT NULL,
            price REAL NOT NULL,
            timestamp TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS positions (
            symbol TEXT NOT NULL,
            asset_type TEXT NOT NULL,
            strategy TEXT NOT NULL,
            quantity REAL NOT NULL,
            avg_entry_price REAL NOT NULL,
            current_price REAL NOT NULL,
            stop_loss REAL,
            take_profit REAL,
            opened_at TEXT NOT NULL,
            PRIMARY KEY (symbol, asset_type)
        );

        CREATE TABLE IF NOT EXISTS portfolio (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            cash_balance REAL NOT NULL,
            total_position_value REAL NOT NULL,
            realized_pnl REAL NOT NULL,
            unrealized_pnl REAL NOT NULL,
            timestamp TEXT NOT NULL
        );",
    )?;
    Ok(())
}

fn step_7_run_history(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS run_history (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            run_type TEXT NOT NULL,
            domain TEXT NOT NULL,
            started_at TEXT NOT NULL,
            completed_at TEXT,
            success INTEGER NOT NULL DEFAULT 0,
            stopped INTEGER NOT NULL DEFAULT 0,
            skip_reason TEXT,
            result_data TEXT NOT NULL DEFAULT '{}',
            errors TEXT NOT NULL DEFAULT '[]'
        );
        CREATE INDEX IF NOT EXISTS idx_run_history_type_started
            ON run_history(run_type, started_at);",
    )?;
    Ok(())
}

fn column_exists(conn: &Connection, table: &str, column: &str) -> Result<bool> {
    let sql = format!("PRAGMA table_info({table})");
    let mut stmt = conn.prepare(&sql)?;
    let exists = stmt
        .query_map([], |row| row.get::<_, String>(1))?
        .filter_map(std::result::Result::ok)
        .any(|name| name == column);
    Ok(exists)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn migrating_twice_is_a_no_op() {
        let conn = Connection::open_in_memory().unwrap();
        migrate(&conn).unwrap();
        migrate(&conn).unwrap();

        let version: u32 = conn
            .query_row("SELECT MAX(version) FROM schema_version", [], |row| row.get(0))
            .unwrap();
        assert_eq!(version, LATEST_VERSION);
    }

    #[test]
    fn all_documented_tables_exist() {
        let conn = Connection::open_in_memory().unwrap();
        migrate(&conn).unwrap();

        for table in [
            "fixtures", "odds", "scores", "bet_history", "model_versions", "metrics",
            "ingestion_metadata", "stocks", "crypto", "price_history", "indicators", "trades",
            "positions", "portfolio", "run_history", "schema_version",
        ] {
            let count: i64 = conn
                .query_row(
                    "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name=?1",
                    [table],
                    |row| row.get(0),
                )
                .unwrap();
            assert_eq!(count, 1, "missing table {table}");
        }
    }
}
