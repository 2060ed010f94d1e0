use crate::error::Result;
use crate::Store;
use arbihawk_instrument::{AssetMeta, AssetType, PortfolioSnapshot, Position, PriceBar, Trade};
use arbihawk_markets::TradingStrategy;
use rusqlite::{params, OptionalExtension};
use std::str::FromStr;

impl Store {
    /// Upsert semantics (§3: `stocks`/`crypto` are keyed by `symbol`).
    pub fn upsert_asset(&self, asset: &AssetMeta) -> Result<()> {
        let table = asset_table(asset.asset_type);
        self.with_conn(|conn| {
            conn.execute(
                &format!(
                    "INSERT INTO {table} (symbol, name, sector) VALUES (?1, ?2, ?3)
                     ON CONFLICT(symbol) DO UPDATE SET name = excluded.name, sector = excluded.sector"
                ),
                params![asset.symbol.as_str(), asset.name, asset.sector],
            )?;
            Ok(())
        })
    }

    /// Atomic per call; `UNIQUE(symbol, asset_type, timestamp)` makes a
    /// re-ingested bar a silent overwrite rather than a duplicate row.
    pub fn insert_price_bars_batch(&self, bars: &[PriceBar]) -> Result<()> {
        self.with_conn(|conn| {
            let tx = conn.unchecked_transaction()?;
            {
                let mut stmt = tx.prepare(
                    "INSERT INTO price_history
                        (symbol, asset_type, timestamp, open, high, low, close, volume)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                     ON CONFLICT(symbol, asset_type, timestamp) DO UPDATE SET
                        open = excluded.open, high = excluded.high,
                        low = excluded.low, close = excluded.close, volume = excluded.volume",
                )?;
                for bar in bars {
                    stmt.execute(params![
                        bar.symbol.as_str(),
                        bar.asset_type.to_string(),
                        bar.timestamp,
                        bar.open,
                        bar.high,
                        bar.low,
                        bar.close,
                        bar.volume,
                    ])?;
                }
            }
            tx.commit()?;
            Ok(())
        })
    }

    pub fn price_bars(&self, symbol: &str, asset_type: AssetType, limit: u32) -> Result<Vec<PriceBar>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT symbol, asset_type, timestamp, open, high, low, close, volume
                 FROM price_history WHERE symbol = ?1 AND asset_type = ?2
                 ORDER BY timestamp DESC LIMIT ?3",
            )?;
            let rows = stmt
                .query_map(params![symbol, asset_type.to_string(), limit], row_to_price_bar)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(rows)
        })
    }

    /// `UNIQUE(symbol, asset_type)` (§3): upsert while open, delete on close
    /// rather than flagging, matching the reference store's table shape.
    pub fn upsert_position(&self, position: &Position) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO positions
                    (symbol, asset_type, strategy, quantity, avg_entry_price, current_price,
                     stop_loss, take_profit, opened_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                 ON CONFLICT(symbol, asset_type) DO UPDATE SET
                    strategy = excluded.strategy,
                    quantity = excluded.quantity,
                    avg_entry_price = excluded.avg_entry_price,
                    current_price = excluded.current_price,
                    stop_loss = excluded.stop_loss,
                    take_profit = excluded.take_profit",
                params![
                    position.symbol.as_str(),
                    position.asset_type.to_string(),
                    position.strategy.as_str(),
                    position.quantity,
                    position.avg_entry_price,
                    position.current_price,
                    position.stop_loss,
                    position.take_profit,
                    position.opened_at,
                ],
            )?;
            Ok(())
        })
    }

    pub fn close_position(&self, symbol: &str, asset_type: AssetType) -> Result<bool> {
        self.with_conn(|conn| {
            let rows = conn.execute(
                "DELETE FROM positions WHERE symbol = ?1 AND asset_type = ?2",
                params![symbol, asset_type.to_string()],
            )?;
            Ok(rows > 0)
        })
    }

    pub fn open_positions(&self) -> Result<Vec<Position>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT symbol, asset_type, strategy, quantity, avg_entry_price, current_price,
                        stop_loss, take_profit, opened_at
                 FROM positions",
            )?;
            let rows = stmt.query_map([], row_to_position)?.collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(rows)
        })
    }

    /// Append-only (§3).
    pub fn insert_trade(&self, trade: &Trade) -> Result<i64> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO trades (symbol, asset_type, trade_type, strategy, quantity, price, timestamp)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    trade.symbol.as_str(),
                    trade.asset_type.to_string(),
                    trade.trade_type.as_str(),
                    trade.strategy.as_str(),
                    trade.quantity,
                    trade.price,
                    trade.timestamp,
                ],
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    /// Append-only (§3): the latest row is the authoritative balance source.
    pub fn insert_portfolio_snapshot(&self, snapshot: &PortfolioSnapshot) -> Result<i64> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO portfolio
                    (cash_balance, total_position_value, realized_pnl, unrealized_pnl, timestamp)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    snapshot.cash_balance,
                    snapshot.total_position_value,
                    snapshot.realized_pnl,
                    snapshot.unrealized_pnl,
                    snapshot.timestamp,
                ],
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    pub fn latest_portfolio_snapshot(&self) -> Result<Option<PortfolioSnapshot>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT cash_balance, total_position_value, realized_pnl, unrealized_pnl, timestamp
                 FROM portfolio ORDER BY timestamp DESC LIMIT 1",
                [],
                row_to_snapshot,
            )
            .optional()
            .map_err(Into::into)
        })
    }
}

const fn asset_table(asset_type: AssetType) -> &'static str {
    match asset_type {
        AssetType::Stock => "stocks",
        AssetType::Crypto => "crypto",
    }
}

fn row_to_price_bar(row: &rusqlite::Row<'_>) -> rusqlite::Result<PriceBar> {
    let asset_type: String = row.get(1)?;
    Ok(PriceBar {
        symbol: row.get::<_, String>(0)?.into(),
        asset_type: AssetType::from_str(&asset_type).unwrap_or(AssetType::Stock),
        timestamp: row.get(2)?,
        open: row.get(3)?,
        high: row.get(4)?,
        low: row.get(5)?,
        close: row.get(6)?,
        volume: row.get(7)?,
    })
}

fn row_to_position(row: &rusqlite::Row<'_>) -> rusqlite::Result<Position> {
    let asset_type: String = row.get(1)?;
    let strategy: String = row.get(2)?;
    Ok(Position {
        symbol: row.get::<_, String>(0)?.into(),
        asset_type: AssetType::from_str(&asset_type).unwrap_or(AssetType::Stock),
        strategy: TradingStrategy::from_str(&strategy).unwrap_or(TradingStrategy::Momentum),
        quantity: row.get(3)?,
        avg_entry_price: row.get(4)?,
        current_price: row.get(5)?,
        stop_loss: row.get(6)?,
        take_profit: row.get(7)?,
        opened_at: row.get(8)?,
    })
}

fn row_to_snapshot(row: &rusqlite::Row<'_>) -> rusqlite::Result<PortfolioSnapshot> {
    Ok(PortfolioSnapshot {
        cash_balance: row.get(0)?,
        total_position_value: row.get(1)?,
        realized_pnl: row.get(2)?,
        unrealized_pnl: row.get(3)?,
        timestamp: row.get(4)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn upsert_position_then_close_removes_row() {
        let store = Store::open_in_memory().unwrap();
        let position = Position {
            symbol: "AAPL".into(),
            asset_type: AssetType::Stock,
            strategy: TradingStrategy::Momentum,
            quantity: 10.0,
            avg_entry_price: 100.0,
            current_price: 105.0,
            stop_loss: Some(90.0),
            take_profit: Some(120.0),
            opened_at: Utc::now(),
        };
        store.upsert_position(&position).unwrap();
        assert_eq!(store.open_positions().unwrap().len(), 1);

        assert!(store.close_position("AAPL", AssetType::Stock).unwrap());
        assert_eq!(store.open_positions().unwrap().len(), 0);
    }

    #[test]
    fn price_bars_dedup_by_unique_timestamp() {
        let store = Store::open_in_memory().unwrap();
        let now = Utc::now();
        let bar = PriceBar {
            symbol: "AAPL".into(),
            asset_type: AssetType::Stock,
            timestamp: now,
            open: 1.0,
            high: 2.0,
            low: 0.5,
            close: 1.5,
            volume: 100.0,
        };
        store.insert_price_bars_batch(&[bar.clone(), bar]).unwrap();
        assert_eq!(store.price_bars("AAPL", AssetType::Stock, 10).unwrap().len(), 1);
    }

    #[test]
    fn portfolio_snapshot_latest_wins() {
        let store = Store::open_in_memory().unwrap();
        let now = Utc::now();
        store
            .insert_portfolio_snapshot(&PortfolioSnapshot {
                cash_balance: 1000.0,
                total_position_value: 0.0,
                realized_pnl: 0.0,
                unrealized_pnl: 0.0,
                timestamp: now,
            })
            .unwrap();
        store
            .insert_portfolio_snapshot(&PortfolioSnapshot {
                cash_balance: 900.0,
                total_position_value: 150.0,
                realized_pnl: 10.0,
                unrealized_pnl: 5.0,
                timestamp: now + chrono::Duration::minutes(1),
            })
            .unwrap();

        let latest = store.latest_portfolio_snapshot().unwrap().unwrap();
        assert_eq!(latest.cash_balance, 900.0);
        assert_eq!(latest.total_value(), 1050.0);
    }
}
