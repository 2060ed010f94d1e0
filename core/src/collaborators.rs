use arbihawk_markets::Domain;
use arbihawk_store::Store;
use std::collections::HashMap;

/// Discovers which leagues/slugs each sports scraper should run over this
/// cycle (§4.8 Collection task, the reference scheduler's
/// `_discover_betano_leagues`/`_discover_flashscore_leagues`). Out of scope:
/// crawling a bookmaker's sport index or Flashscore's league listing is a
/// scraper-side concern (§1); the scheduler only consumes the result.
pub trait LeagueDiscovery: Send + Sync {
    fn betano_league_ids(&self) -> Vec<String>;
    fn flashscore_league_slugs(&self) -> Vec<String>;
}

/// Builds the argv for one scraper subprocess invocation (§6). Out of
/// scope: which interpreter, script path and flags a league id/slug maps to
/// is deployment configuration, not scheduler logic.
pub trait ScraperCommands: Send + Sync {
    fn betano_command(&self, league_id: &str) -> Vec<String>;
    fn flashscore_command(&self, league_slug: &str) -> Vec<String>;
    fn livescore_command(&self) -> Vec<String>;
    fn stocks_command(&self) -> Vec<String>;
    fn crypto_command(&self) -> Vec<String>;
}

/// Outcome of one training invocation (§4.8 Training task).
#[derive(Debug, Clone)]
pub struct TrainingOutcome {
    pub success: bool,
    pub has_data: bool,
    pub no_data_reason: Option<String>,
    pub metrics: serde_json::Value,
}

/// Fits and persists a model for one `(domain, market)` pair (§4.7). Out of
/// scope: feature engineering, model fitting, and the model-file I/O are a
/// training-side concern (§1); the scheduler records the outcome and leaves
/// activation/versioning to `arbihawk-models`, which this collaborator is
/// expected to call into on success.
pub trait TrainingCollaborator: Send + Sync {
    fn train(&self, domain: Domain, market: &str) -> TrainingOutcome;
}

/// Quotes model probabilities per outcome for one fixture/market, the
/// training/inference boundary the Betting task sits on the other side of
/// (§4.6). Returns `None` when no model is available to quote with.
pub trait ValueBetPredictor: Send + Sync {
    fn predict(&self, domain: Domain, market: &str, fixture_id: &str) -> Option<HashMap<String, f64>>;
}

/// Result of one `trading_cycle` run (§4.8).
#[derive(Debug, Clone, Copy, Default)]
pub struct TradeCycleReport {
    pub positions_closed: u64,
    pub positions_opened: u64,
    pub snapshot_recorded: bool,
}

/// Runs one full trading cycle: refresh position prices, check stop-loss/
/// take-profit and close triggered positions, generate new signals, open
/// positions, record a portfolio snapshot (§4.8 `trading_cycle`). Out of
/// scope: the trade service owns this end-to-end; the scheduler only
/// triggers a cycle and records the report.
pub trait TradeService: Send + Sync {
    fn run_cycle(&self, store: &Store) -> TradeCycleReport;
}
