use arbihawk_markets::TradingStrategy;
use arbihawk_matcher::MatcherConfig;
use arbihawk_models::ModelVersioningConfig;
use arbihawk_strategies::ValueBetConfig;
use chrono::Duration;
use std::time::Duration as StdDuration;

/// Tunables for the scheduler's task bodies (§4.8). Constructed directly by
/// the caller (embedding the façade, or a test) — loading this from a file
/// or CLI flags is out of scope (§1 Non-goals).
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Tolerance and score floor the Matcher uses, both for live score
    /// matching during ingestion and for the Collection task's synthetic-id
    /// reconciliation pass.
    pub matcher: MatcherConfig,
    /// EV threshold, fixed stake and per-market margins the value-bet engine
    /// gates on.
    pub value_bet: ValueBetConfig,
    /// Betting markets the Betting task scans one active model per (§4.8).
    pub betting_markets: Vec<String>,
    /// How far ahead of now the Betting task looks for candidate fixtures.
    pub betting_horizon: Duration,
    /// Cap on how many pending bets the Betting task inserts per model.
    pub limit_per_model: usize,
    /// Worker-pool size for the Betano per-league sweep.
    pub max_workers_leagues: usize,
    /// Worker-pool size for the Flashscore per-league sweep (smaller: the
    /// Flashscore scraper drives a browser automation backend per worker).
    pub max_workers_leagues_playwright: usize,
    /// Rollback thresholds and retention the model-version manager applies.
    pub model_versioning: ModelVersioningConfig,
    /// Strategies the trading side schedules training/signal generation for.
    pub trading_strategies: Vec<TradingStrategy>,
    /// Score-id prefixes the Collection task deletes outright, having no
    /// supported source to reconcile against (e.g. a retired scraper).
    pub stale_score_prefixes: Vec<String>,
    /// Hard timeout for one scraper subprocess invocation.
    pub scraper_timeout: StdDuration,
    /// Sleep interval between `full_run` iterations in daemon mode.
    pub daemon_interval: StdDuration,
    /// Sleep interval between `trading_full_run` iterations in daemon mode.
    pub trading_daemon_interval: StdDuration,
    /// Master switch for placing any bet at all (§4.8 Betting task).
    pub fake_money_enabled: bool,
    /// Whether `full_run` places bets after training completes, or only
    /// refreshes models (§4.8 Betting task).
    pub auto_bet_after_training_enabled: bool,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            matcher: MatcherConfig::default(),
            value_bet: ValueBetConfig::default(),
            betting_markets: vec![
                "1x2".to_string(),
                "over_under".to_string(),
                "btts".to_string(),
                "double_chance".to_string(),
            ],
            betting_horizon: Duration::hours(48),
            limit_per_model: 5,
            max_workers_leagues: 8,
            max_workers_leagues_playwright: 2,
            model_versioning: ModelVersioningConfig::default(),
            trading_strategies: TradingStrategy::ALL.to_vec(),
            stale_score_prefixes: vec!["fbref_".to_string()],
            scraper_timeout: StdDuration::from_secs(300),
            daemon_interval: StdDuration::from_secs(3600),
            trading_daemon_interval: StdDuration::from_secs(900),
            fake_money_enabled: true,
            auto_bet_after_training_enabled: true,
        }
    }
}
