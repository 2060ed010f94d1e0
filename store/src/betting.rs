use crate::error::Result;
use crate::Store;
use arbihawk_instrument::{Bet, BetResult};
use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension};
use std::str::FromStr;

/// Bankroll ROI summary for one `model_market` (§9 supplemented feature,
/// grounded in the reference trainer's settlement-stats report). Consumed
/// both by Settlement reporting and by `check_should_rollback` (§4.7).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BankrollStats {
    pub settled_bets: u64,
    pub wins: u64,
    pub losses: u64,
    pub total_staked: f64,
    pub total_payout: f64,
}

impl BankrollStats {
    /// `(payout - staked) / staked`, or `0.0` with no settled bets — the
    /// convention `check_should_rollback` relies on to avoid dividing by
    /// zero before a market has any settlement history.
    pub fn roi(&self) -> f64 {
        if self.total_staked <= 0.0 {
            0.0
        } else {
            (self.total_payout - self.total_staked) / self.total_staked
        }
    }
}

impl Store {
    /// Inserts a new pending bet (§3: `result = pending`, `settled_at = nil`,
    /// `payout = 0` on insert) and returns its surrogate id.
    pub fn insert_bet(&self, bet: &Bet) -> Result<i64> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO bet_history
                    (fixture_id, market_name, outcome_name, model_market, odds, stake,
                     placed_at, settled_at, result, payout)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, NULL, 'pending', 0)",
                params![
                    bet.fixture_id.as_str(),
                    bet.market_name,
                    bet.outcome_name,
                    bet.model_market,
                    bet.odds,
                    bet.stake,
                    bet.placed_at,
                ],
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    pub fn get_bet(&self, id: i64) -> Result<Option<Bet>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT id, fixture_id, market_name, outcome_name, model_market, odds, stake,
                        placed_at, settled_at, result, payout
                 FROM bet_history WHERE id = ?1",
                params![id],
                row_to_bet,
            )
            .optional()
            .map_err(Into::into)
        })
    }

    /// Every bet still awaiting settlement, in placement order.
    pub fn pending_bets(&self) -> Result<Vec<Bet>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, fixture_id, market_name, outcome_name, model_market, odds, stake,
                        placed_at, settled_at, result, payout
                 FROM bet_history WHERE result = 'pending' ORDER BY placed_at ASC",
            )?;
            let rows = stmt.query_map([], row_to_bet)?.collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(rows)
        })
    }

    /// Records a settlement outcome. Idempotent (§4.5): settling a bet that
    /// is no longer pending is a silent no-op, matching `settle_bet`'s
    /// "re-running on an already-settled bet is a no-op" contract.
    pub fn settle_bet(
        &self,
        bet_id: i64,
        result: BetResult,
        payout: f64,
        settled_at: DateTime<Utc>,
    ) -> Result<bool> {
        self.with_conn(|conn| {
            let rows = conn.execute(
                "UPDATE bet_history SET result = ?1, payout = ?2, settled_at = ?3
                 WHERE id = ?4 AND result = 'pending'",
                params![result.as_str(), payout, settled_at, bet_id],
            )?;
            Ok(rows > 0)
        })
    }

    /// Bankroll ROI/settlement stats scoped to one `model_market`
    /// (§9: `bet_history.model_market` is the authoritative join key).
    pub fn bankroll_stats(&self, model_market: &str) -> Result<BankrollStats> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT
                    COUNT(*) FILTER (WHERE result != 'pending'),
                    COUNT(*) FILTER (WHERE result = 'win'),
                    COUNT(*) FILTER (WHERE result = 'loss'),
                    COALESCE(SUM(stake) FILTER (WHERE result != 'pending'), 0.0),
                    COALESCE(SUM(payout) FILTER (WHERE result != 'pending'), 0.0)
                 FROM bet_history WHERE model_market = ?1",
                params![model_market],
                |row| {
                    Ok(BankrollStats {
                        settled_bets: row.get(0)?,
                        wins: row.get(1)?,
                        losses: row.get(2)?,
                        total_staked: row.get(3)?,
                        total_payout: row.get(4)?,
                    })
                },
            )
            .map_err(Into::into)
        })
    }
}

fn row_to_bet(row: &rusqlite::Row<'_>) -> rusqlite::Result<Bet> {
    let result: String = row.get(9)?;
    Ok(Bet {
        id: row.get(0)?,
        fixture_id: row.get::<_, String>(1)?.into(),
        market_name: row.get(2)?,
        outcome_name: row.get(3)?,
        model_market: row.get(4)?,
        odds: row.get(5)?,
        stake: row.get(6)?,
        placed_at: row.get(7)?,
        settled_at: row.get(8)?,
        result: BetResult::from_str(&result).unwrap_or(BetResult::Pending),
        payout: row.get(10)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_bet(model_market: &str) -> Bet {
        Bet {
            id: None,
            fixture_id: "f1".into(),
            market_name: "1x2".into(),
            outcome_name: "home".into(),
            model_market: model_market.into(),
            odds: 2.0,
            stake: 10.0,
            placed_at: Utc::now(),
            settled_at: None,
            result: BetResult::Pending,
            payout: 0.0,
        }
    }

    #[test]
    fn insert_then_settle_updates_result_and_payout() {
        let store = Store::open_in_memory().unwrap();
        let id = store.insert_bet(&sample_bet("1x2")).unwrap();

        let settled = store.settle_bet(id, BetResult::Win, 20.0, Utc::now()).unwrap();
        assert!(settled);

        let bet = store.get_bet(id).unwrap().unwrap();
        assert_eq!(bet.result, BetResult::Win);
        assert_eq!(bet.payout, 20.0);
        assert!(bet.settled_at.is_some());
    }

    #[test]
    fn settling_twice_is_a_no_op() {
        let store = Store::open_in_memory().unwrap();
        let id = store.insert_bet(&sample_bet("1x2")).unwrap();

        assert!(store.settle_bet(id, BetResult::Win, 20.0, Utc::now()).unwrap());
        assert!(!store.settle_bet(id, BetResult::Loss, 0.0, Utc::now()).unwrap());

        assert_eq!(store.get_bet(id).unwrap().unwrap().result, BetResult::Win);
    }

    #[test]
    fn pending_bets_excludes_settled() {
        let store = Store::open_in_memory().unwrap();
        let pending_id = store.insert_bet(&sample_bet("1x2")).unwrap();
        let settled_id = store.insert_bet(&sample_bet("1x2")).unwrap();
        store.settle_bet(settled_id, BetResult::Loss, 0.0, Utc::now()).unwrap();

        let pending = store.pending_bets().unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id, Some(pending_id));
    }

    #[test]
    fn bankroll_stats_computes_roi() {
        let store = Store::open_in_memory().unwrap();
        let win = store.insert_bet(&sample_bet("1x2")).unwrap();
        let loss = store.insert_bet(&sample_bet("1x2")).unwrap();
        store.settle_bet(win, BetResult::Win, 20.0, Utc::now()).unwrap();
        store.settle_bet(loss, BetResult::Loss, 0.0, Utc::now()).unwrap();

        let stats = store.bankroll_stats("1x2").unwrap();
        assert_eq!(stats.settled_bets, 2);
        assert_eq!(stats.wins, 1);
        assert_eq!(stats.total_staked, 20.0);
        assert_eq!(stats.total_payout, 20.0);
        assert_eq!(stats.roi(), 0.0);
    }
}
