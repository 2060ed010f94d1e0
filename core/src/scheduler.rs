use crate::collaborators::{LeagueDiscovery, ScraperCommands, TradeService, TrainingCollaborator, ValueBetPredictor};
use crate::config::SchedulerConfig;
use crate::logs::{LogBuffer, LogEntry, CURRENT_DOMAIN};
use crate::task::{TaskKind, TaskResult, TriggerOutcome};
use arbihawk_identity::parse_synthetic_id;
use arbihawk_instrument::{AssetType, Bet, BetResult, RunHistory};
use arbihawk_markets::{Domain, SourceKind};
use arbihawk_matcher::Matcher;
use arbihawk_store::{BackupCollaborator, Store};
use chrono::Utc;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::warn;

struct SweepReport {
    ok: usize,
    errors: Vec<String>,
}

struct IngestionRunOutcome {
    records: u64,
    errors: Vec<String>,
}

/// `data` value for a sub-stage a `full_run`/`trading_full_run` chain never
/// reached because an earlier stage was stopped (§8 scenario 4: the
/// un-run stages still carry `skipped=true` with reason `"Stopped"`).
fn skipped_stopped_json() -> serde_json::Value {
    serde_json::to_value(TaskResult::skipped("Stopped")).unwrap_or(serde_json::Value::Null)
}

struct SchedulerState {
    current_task: Option<TaskKind>,
    last_run: HashMap<TaskKind, chrono::DateTime<Utc>>,
    last_duration_seconds: HashMap<TaskKind, f64>,
    daemon_running: bool,
    trading_daemon_running: bool,
}

/// The process-wide scheduler control core (§4.8): a single task slot, a
/// cooperative-cancellation latch, and the task bodies that compose every
/// other crate in the workspace into the Collection/Training/Betting/
/// trading task lifecycles.
pub struct Scheduler {
    store: Arc<Store>,
    config: SchedulerConfig,
    state: Mutex<SchedulerState>,
    stop_task: Mutex<CancellationToken>,
    daemon_stop: CancellationToken,
    trading_daemon_stop: CancellationToken,
    logs: Arc<LogBuffer>,
    backup: Arc<dyn BackupCollaborator>,
    league_discovery: Arc<dyn LeagueDiscovery>,
    scraper_commands: Arc<dyn ScraperCommands>,
    training: Arc<dyn TrainingCollaborator>,
    value_bet_predictor: Arc<dyn ValueBetPredictor>,
    trade_service: Arc<dyn TradeService>,
}

impl std::fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scheduler").field("current_task", &self.state.lock().current_task).finish_non_exhaustive()
    }
}

/// Everything a [`Scheduler`] needs beyond its tunables: the store handle
/// and every out-of-scope collaborator its task bodies call into.
pub struct SchedulerDeps {
    pub store: Arc<Store>,
    pub backup: Arc<dyn BackupCollaborator>,
    pub league_discovery: Arc<dyn LeagueDiscovery>,
    pub scraper_commands: Arc<dyn ScraperCommands>,
    pub training: Arc<dyn TrainingCollaborator>,
    pub value_bet_predictor: Arc<dyn ValueBetPredictor>,
    pub trade_service: Arc<dyn TradeService>,
}

impl Scheduler {
    pub fn new(config: SchedulerConfig, deps: SchedulerDeps) -> Arc<Self> {
        Arc::new(Self {
            store: deps.store,
            config,
            state: Mutex::new(SchedulerState {
                current_task: None,
                last_run: HashMap::new(),
                last_duration_seconds: HashMap::new(),
                daemon_running: false,
                trading_daemon_running: false,
            }),
            stop_task: Mutex::new(CancellationToken::new()),
            daemon_stop: CancellationToken::new(),
            trading_daemon_stop: CancellationToken::new(),
            logs: LogBuffer::new(1000),
            backup: deps.backup,
            league_discovery: deps.league_discovery,
            scraper_commands: deps.scraper_commands,
            training: deps.training,
            value_bet_predictor: deps.value_bet_predictor,
            trade_service: deps.trade_service,
        })
    }

    pub fn logs(&self) -> Vec<LogEntry> {
        self.logs.snapshot()
    }

    pub fn current_task(&self) -> Option<TaskKind> {
        self.state.lock().current_task
    }

    pub fn last_run(&self, kind: TaskKind) -> Option<chrono::DateTime<Utc>> {
        self.state.lock().last_run.get(&kind).copied()
    }

    pub fn last_duration_seconds(&self, kind: TaskKind) -> Option<f64> {
        self.state.lock().last_duration_seconds.get(&kind).copied()
    }

    fn stop_requested(&self) -> bool {
        self.stop_task.lock().is_cancelled()
    }

    /// §4.8 `stop_task()`: sets the latch and returns immediately. Every
    /// task body polls it between steps and exits with `stopped = true`;
    /// cancellation never rolls back already-persisted data (§5).
    pub fn stop_task(&self) {
        self.stop_task.lock().cancel();
    }

    pub fn stop_daemon(&self) {
        self.daemon_stop.cancel();
    }

    pub fn stop_trading_daemon(&self) {
        self.trading_daemon_stop.cancel();
    }

    /// Steps 1-2 of the task lifecycle: reject if busy, else claim the slot
    /// and reset the stop latch.
    fn try_claim(&self, kind: TaskKind) -> TriggerOutcome {
        let mut state = self.state.lock();
        if let Some(running) = state.current_task {
            return TriggerOutcome::AlreadyRunning(running);
        }
        state.current_task = Some(kind);
        *self.stop_task.lock() = CancellationToken::new();
        TriggerOutcome::Started
    }

    /// Step 4-5: record run history (best-effort, §7) and clear the slot.
    fn release(&self, kind: TaskKind, started_at: chrono::DateTime<Utc>, domain: Domain, result: &TaskResult) {
        let completed_at = Utc::now();
        let duration = (completed_at - started_at).num_milliseconds() as f64 / 1000.0;

        let run = RunHistory {
            id: None,
            run_type: kind.as_str().to_string(),
            domain,
            started_at,
            completed_at: Some(completed_at),
            success: result.success,
            stopped: result.stopped,
            skip_reason: result.skip_reason.clone(),
            result_data: result.data.clone(),
            errors: result.errors.clone(),
        };
        if let Err(err) = self.store.insert_run_history(&run) {
            warn!(task = kind.as_str(), %err, "failed to record run history");
        }

        let mut state = self.state.lock();
        state.current_task = None;
        state.last_run.insert(kind, completed_at);
        state.last_duration_seconds.insert(kind, duration);
    }

    /// Runs `body` under the full task lifecycle, awaiting completion
    /// directly. [`Self::trigger`] wraps the same lifecycle for background
    /// fire-and-forget semantics (§4.8 step 3).
    async fn run_lifecycle<F, Fut>(self: &Arc<Self>, kind: TaskKind, domain: Domain, body: F) -> TaskResult
    where
        F: FnOnce(Arc<Self>) -> Fut,
        Fut: Future<Output = TaskResult>,
    {
        if let TriggerOutcome::AlreadyRunning(running) = self.try_claim(kind) {
            return TaskResult::rejected(running);
        }
        let started_at = Utc::now();
        let result = CURRENT_DOMAIN.scope(domain, body(Arc::clone(self))).await;
        self.release(kind, started_at, domain, &result);
        result
    }

    /// Claims the slot synchronously (so a busy rejection is visible to the
    /// caller immediately) then spawns `body` in the background (§4.8 steps
    /// 1-3: "return `{success:true, message:...}` immediately").
    fn trigger<F, Fut>(self: &Arc<Self>, kind: TaskKind, domain: Domain, body: F) -> TriggerOutcome
    where
        F: FnOnce(Arc<Self>) -> Fut + Send + 'static,
        Fut: Future<Output = TaskResult> + Send + 'static,
    {
        let claim = self.try_claim(kind);
        if claim != TriggerOutcome::Started {
            return claim;
        }
        let scheduler = Arc::clone(self);
        tokio::spawn(async move {
            let started_at = Utc::now();
            let result = CURRENT_DOMAIN.scope(domain, body(Arc::clone(&scheduler))).await;
            scheduler.release(kind, started_at, domain, &result);
        });
        TriggerOutcome::Started
    }

    // ---- Collection (§4.8) ----

    async fn run_scraper_pool(&self, source: SourceKind, commands: Vec<Vec<String>>, max_workers: usize) -> SweepReport {
        if commands.is_empty() {
            return SweepReport { ok: 0, errors: Vec::new() };
        }
        let semaphore = Arc::new(tokio::sync::Semaphore::new(max_workers.max(1)));
        let mut join_set = tokio::task::JoinSet::new();

        for command in commands {
            if self.stop_requested() {
                break;
            }
            let store = Arc::clone(&self.store);
            let cancellation = self.stop_task.lock().clone();
            let timeout = self.config.scraper_timeout;
            let semaphore = Arc::clone(&semaphore);
            join_set.spawn(async move {
                let _permit = semaphore.acquire_owned().await.expect("semaphore is never closed");
                arbihawk_ingest::run_and_ingest(store.as_ref(), source, &command, timeout, cancellation, AssetType::Stock).await
            });
        }

        let mut ok = 0usize;
        let mut errors = Vec::new();
        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok(Ok(result)) if result.success && !result.stopped => ok += 1,
                Ok(Ok(result)) => errors.extend(result.errors),
                Ok(Err(err)) => errors.push(err.to_string()),
                Err(join_err) => errors.push(format!("scraper worker panicked: {join_err}")),
            }
        }
        SweepReport { ok, errors }
    }

    async fn run_betano_sweep(&self) -> SweepReport {
        let commands = self.league_discovery.betano_league_ids().iter().map(|id| self.scraper_commands.betano_command(id)).collect();
        self.run_scraper_pool(SourceKind::Betano, commands, self.config.max_workers_leagues).await
    }

    async fn run_flashscore_sweep(&self) -> SweepReport {
        let commands =
            self.league_discovery.flashscore_league_slugs().iter().map(|slug| self.scraper_commands.flashscore_command(slug)).collect();
        self.run_scraper_pool(SourceKind::Flashscore, commands, self.config.max_workers_leagues_playwright).await
    }

    async fn run_livescore(&self) -> IngestionRunOutcome {
        let command = self.scraper_commands.livescore_command();
        let cancellation = self.stop_task.lock().clone();
        match arbihawk_ingest::run_and_ingest(self.store.as_ref(), SourceKind::Livescore, &command, self.config.scraper_timeout, cancellation, AssetType::Stock).await
        {
            Ok(result) => IngestionRunOutcome { records: result.records, errors: result.errors },
            Err(err) => IngestionRunOutcome { records: 0, errors: vec![err.to_string()] },
        }
    }

    /// Resolves pending synthetic score rows (§4.4/§4.8) against the
    /// fixtures just ingested: each row whose id the Matcher can now
    /// resolve is migrated onto the real `fixture_id` and the synthetic row
    /// dropped. Match failures are logged and skipped, not propagated —
    /// reconciliation is best-effort housekeeping, not a blocking step.
    fn reconcile_synthetic_scores(&self) -> arbihawk_store::Result<(usize, usize)> {
        let synthetic = self.store.scores_with_id_prefix(&["flashscore_", "livescore_"])?;
        let total = synthetic.len();
        let matcher = Matcher::with_config(self.store.as_ref(), self.config.matcher);

        let mut matched = 0usize;
        for (synthetic_id, score) in synthetic {
            let Some(parsed) = parse_synthetic_id(&synthetic_id) else { continue };
            let fixture_id = match matcher.match_score(&parsed.home, &parsed.away, &parsed.date) {
                Ok(fixture_id) => fixture_id,
                Err(err) => {
                    warn!(%err, synthetic_id, "synthetic score reconciliation failed to match");
                    continue;
                }
            };
            let Some(fixture_id) = fixture_id else { continue };
            self.store.upsert_score(fixture_id.as_str(), &score)?;
            self.store.delete_scores_with_id_prefix(&[synthetic_id.as_str()])?;
            matched += 1;
        }
        Ok((matched, total))
    }

    fn stale_prefix_refs(&self) -> Vec<&str> {
        self.config.stale_score_prefixes.iter().map(String::as_str).collect()
    }

    async fn collection_body(&self) -> TaskResult {
        let mut errors = Vec::new();
        let mut data = serde_json::Map::new();

        let betano = self.run_betano_sweep().await;
        data.insert("betano_leagues_ok".into(), betano.ok.into());
        errors.extend(betano.errors);
        if self.stop_requested() {
            return TaskResult { success: false, stopped: true, skipped: false, skip_reason: None, errors, data: data.into() };
        }

        let flashscore = self.run_flashscore_sweep().await;
        data.insert("flashscore_leagues_ok".into(), flashscore.ok.into());
        errors.extend(flashscore.errors.clone());
        if self.stop_requested() {
            return TaskResult { success: false, stopped: true, skipped: false, skip_reason: None, errors, data: data.into() };
        }

        // Open Question resolution (§9): the Livescore fallback fires only
        // when Flashscore's sweep returned zero successful leagues.
        if flashscore.ok == 0 {
            let livescore = self.run_livescore().await;
            data.insert("livescore_ran".into(), true.into());
            data.insert("livescore_records".into(), livescore.records.into());
            errors.extend(livescore.errors);
        }
        if self.stop_requested() {
            return TaskResult { success: errors.is_empty(), stopped: true, skipped: false, skip_reason: None, errors, data: data.into() };
        }

        match self.reconcile_synthetic_scores() {
            Ok((matched, total)) => {
                data.insert("synthetic_scores_matched".into(), matched.into());
                data.insert("synthetic_scores_total".into(), total.into());
            }
            Err(err) => errors.push(format!("synthetic score reconciliation failed: {err}")),
        }
        match self.store.delete_scores_with_id_prefix(&self.stale_prefix_refs()) {
            Ok(deleted) => {
                data.insert("stale_scores_deleted".into(), deleted.into());
            }
            Err(err) => errors.push(format!("stale score cleanup failed: {err}")),
        }
        if self.stop_requested() {
            return TaskResult { success: errors.is_empty(), stopped: true, skipped: false, skip_reason: None, errors, data: data.into() };
        }

        match arbihawk_settlement::settle_pending_bets(self.store.as_ref()) {
            Ok(report) => {
                data.insert("settled".into(), report.settled.into());
            }
            Err(err) => errors.push(format!("settlement failed: {err}")),
        }

        TaskResult { success: errors.is_empty(), stopped: false, skipped: false, skip_reason: None, errors, data: data.into() }
    }

    pub async fn run_collection(self: &Arc<Self>) -> TaskResult {
        self.run_lifecycle(TaskKind::Collection, Domain::Betting, |s| async move { s.collection_body().await }).await
    }

    pub fn trigger_collection(self: &Arc<Self>) -> TriggerOutcome {
        self.trigger(TaskKind::Collection, Domain::Betting, |s| async move { s.collection_body().await })
    }

    // ---- Training (§4.8) ----

    async fn training_body(&self, domain: Domain, markets: &[String]) -> TaskResult {
        if let Some(path) = self.store.path() {
            if let Err(err) = self.backup.backup(path, "pre_training") {
                return TaskResult::failed(vec![format!("pre-training backup failed: {err}")]);
            }
        }

        let mut errors = Vec::new();
        let mut trained = serde_json::Map::new();
        for market in markets {
            if self.stop_requested() {
                return TaskResult { success: errors.is_empty(), stopped: true, skipped: false, skip_reason: None, errors, data: trained.into() };
            }
            let outcome = self.training.train(domain, market);
            if !outcome.success {
                errors.push(format!("training failed for {market}"));
                continue;
            }
            if !outcome.has_data {
                warn!(market, reason = outcome.no_data_reason.as_deref().unwrap_or("unspecified"), "training skipped: no data");
                trained.insert(market.clone(), serde_json::json!({"has_data": false}));
                continue;
            }
            trained.insert(market.clone(), outcome.metrics);
        }

        TaskResult { success: errors.is_empty(), stopped: false, skipped: false, skip_reason: None, errors, data: trained.into() }
    }

    pub async fn run_training(self: &Arc<Self>) -> TaskResult {
        self.run_lifecycle(TaskKind::Training, Domain::Betting, |s| async move {
            let markets = s.config.betting_markets.clone();
            s.training_body(Domain::Betting, &markets).await
        })
        .await
    }

    pub fn trigger_training(self: &Arc<Self>) -> TriggerOutcome {
        self.trigger(TaskKind::Training, Domain::Betting, |s| async move {
            let markets = s.config.betting_markets.clone();
            s.training_body(Domain::Betting, &markets).await
        })
    }

    // ---- Betting (§4.8) ----

    async fn betting_body(&self, skip_if_auto_bet_disabled: bool) -> TaskResult {
        if !self.config.fake_money_enabled {
            return TaskResult::skipped("Fake money disabled");
        }
        if skip_if_auto_bet_disabled && !self.config.auto_bet_after_training_enabled {
            return TaskResult::skipped("Auto-betting disabled");
        }

        let now = Utc::now();
        let tolerance = self.config.betting_horizon / 2;
        let midpoint = now + tolerance;

        let mut errors = Vec::new();
        let mut bets_placed = 0u64;
        for market in &self.config.betting_markets {
            if self.stop_requested() {
                return TaskResult {
                    success: errors.is_empty(),
                    stopped: true,
                    skipped: false,
                    skip_reason: None,
                    errors,
                    data: serde_json::json!({"bets_placed": bets_placed}),
                };
            }

            if matches!(arbihawk_models::get_active(self.store.as_ref(), Domain::Betting, market), Ok(None) | Err(_)) {
                continue;
            }

            let fixtures = match self.store.fixtures_in_window(midpoint, tolerance) {
                Ok(fixtures) => fixtures,
                Err(err) => {
                    errors.push(format!("{market}: {err}"));
                    continue;
                }
            };

            let mut placed_for_market = 0usize;
            for fixture in fixtures {
                if placed_for_market >= self.config.limit_per_model {
                    break;
                }
                let Some(probabilities) = self.value_bet_predictor.predict(Domain::Betting, market, &fixture.fixture_id) else {
                    continue;
                };
                let signals = match arbihawk_strategies::find_value_bets(
                    self.store.as_ref(),
                    &fixture.fixture_id,
                    market,
                    &probabilities,
                    &self.config.value_bet,
                    now,
                ) {
                    Ok(signals) => signals,
                    Err(err) => {
                        errors.push(format!("{market}/{}: {err}", fixture.fixture_id));
                        continue;
                    }
                };
                for signal in signals {
                    if placed_for_market >= self.config.limit_per_model {
                        break;
                    }
                    let bet = Bet {
                        id: None,
                        fixture_id: signal.fixture_id,
                        market_name: signal.market_name,
                        outcome_name: signal.outcome_name,
                        model_market: market.clone(),
                        odds: signal.odds,
                        stake: signal.stake,
                        placed_at: now,
                        settled_at: None,
                        result: BetResult::Pending,
                        payout: 0.0,
                    };
                    match self.store.insert_bet(&bet) {
                        Ok(_) => {
                            bets_placed += 1;
                            placed_for_market += 1;
                        }
                        Err(err) => errors.push(format!("failed to insert bet: {err}")),
                    }
                }
            }
        }

        TaskResult { success: errors.is_empty(), stopped: false, skipped: false, skip_reason: None, errors, data: serde_json::json!({"bets_placed": bets_placed}) }
    }

    pub async fn run_betting(self: &Arc<Self>) -> TaskResult {
        self.run_lifecycle(TaskKind::Betting, Domain::Betting, |s| async move { s.betting_body(false).await }).await
    }

    pub fn trigger_betting(self: &Arc<Self>) -> TriggerOutcome {
        self.trigger(TaskKind::Betting, Domain::Betting, |s| async move { s.betting_body(false).await })
    }

    // ---- Full run (§4.8): sequential collection -> training -> betting -> settlement ----

    async fn full_run_body(&self) -> TaskResult {
        let mut errors = Vec::new();
        let mut data = serde_json::Map::new();

        let collection = self.collection_body().await;
        data.insert("collection".into(), collection.data);
        errors.extend(collection.errors);
        if collection.stopped {
            data.insert("training".into(), skipped_stopped_json());
            data.insert("betting".into(), skipped_stopped_json());
            return TaskResult { success: false, stopped: true, skipped: false, skip_reason: None, errors, data: data.into() };
        }

        let betting_markets = self.config.betting_markets.clone();
        let training = self.training_body(Domain::Betting, &betting_markets).await;
        data.insert("training".into(), training.data);
        errors.extend(training.errors);
        if training.stopped {
            data.insert("betting".into(), skipped_stopped_json());
            return TaskResult { success: false, stopped: true, skipped: false, skip_reason: None, errors, data: data.into() };
        }

        let betting = self.betting_body(true).await;
        data.insert("betting".into(), betting.data);
        errors.extend(betting.errors);
        if betting.stopped {
            return TaskResult { success: false, stopped: true, skipped: false, skip_reason: None, errors, data: data.into() };
        }
        if let Some(reason) = betting.skip_reason {
            data.insert("betting_skip_reason".into(), reason.into());
        }

        match arbihawk_settlement::settle_pending_bets(self.store.as_ref()) {
            Ok(report) => {
                data.insert("settled".into(), report.settled.into());
            }
            Err(err) => errors.push(format!("settlement failed: {err}")),
        }

        TaskResult { success: errors.is_empty(), stopped: false, skipped: false, skip_reason: None, errors, data: data.into() }
    }

    pub async fn run_full_run(self: &Arc<Self>) -> TaskResult {
        self.run_lifecycle(TaskKind::FullRun, Domain::Betting, |s| async move { s.full_run_body().await }).await
    }

    pub fn trigger_full_run(self: &Arc<Self>) -> TriggerOutcome {
        self.trigger(TaskKind::FullRun, Domain::Betting, |s| async move { s.full_run_body().await })
    }

    // ---- Trading tasks (§4.8) ----

    async fn trading_collection_body(&self) -> TaskResult {
        let mut errors = Vec::new();
        let mut data = serde_json::Map::new();
        let cancellation = self.stop_task.lock().clone();

        match arbihawk_ingest::run_and_ingest(
            self.store.as_ref(),
            SourceKind::Stocks,
            &self.scraper_commands.stocks_command(),
            self.config.scraper_timeout,
            cancellation.clone(),
            AssetType::Stock,
        )
        .await
        {
            Ok(result) => {
                data.insert("stocks_records".into(), result.records.into());
                errors.extend(result.errors);
            }
            Err(err) => errors.push(format!("stocks ingestion failed: {err}")),
        }
        if self.stop_requested() {
            return TaskResult { success: false, stopped: true, skipped: false, skip_reason: None, errors, data: data.into() };
        }

        match arbihawk_ingest::run_and_ingest(
            self.store.as_ref(),
            SourceKind::Crypto,
            &self.scraper_commands.crypto_command(),
            self.config.scraper_timeout,
            cancellation,
            AssetType::Crypto,
        )
        .await
        {
            Ok(result) => {
                data.insert("crypto_records".into(), result.records.into());
                errors.extend(result.errors);
            }
            Err(err) => errors.push(format!("crypto ingestion failed: {err}")),
        }

        TaskResult { success: errors.is_empty(), stopped: false, skipped: false, skip_reason: None, errors, data: data.into() }
    }

    pub async fn run_trading_collection(self: &Arc<Self>) -> TaskResult {
        self.run_lifecycle(TaskKind::TradingCollection, Domain::Trading, |s| async move { s.trading_collection_body().await }).await
    }

    pub fn trigger_trading_collection(self: &Arc<Self>) -> TriggerOutcome {
        self.trigger(TaskKind::TradingCollection, Domain::Trading, |s| async move { s.trading_collection_body().await })
    }

    async fn trading_training_body(&self) -> TaskResult {
        let markets: Vec<String> = self.config.trading_strategies.iter().map(|s| s.as_str().to_string()).collect();
        self.training_body(Domain::Trading, &markets).await
    }

    pub async fn run_trading_training(self: &Arc<Self>) -> TaskResult {
        self.run_lifecycle(TaskKind::TradingTraining, Domain::Trading, |s| async move { s.trading_training_body().await }).await
    }

    pub fn trigger_trading_training(self: &Arc<Self>) -> TriggerOutcome {
        self.trigger(TaskKind::TradingTraining, Domain::Trading, |s| async move { s.trading_training_body().await })
    }

    async fn trading_cycle_body(&self) -> TaskResult {
        let report = self.trade_service.run_cycle(self.store.as_ref());
        TaskResult::ok(serde_json::json!({
            "positions_closed": report.positions_closed,
            "positions_opened": report.positions_opened,
            "snapshot_recorded": report.snapshot_recorded,
        }))
    }

    pub async fn run_trading_cycle(self: &Arc<Self>) -> TaskResult {
        self.run_lifecycle(TaskKind::TradingCycle, Domain::Trading, |s| async move { s.trading_cycle_body().await }).await
    }

    pub fn trigger_trading_cycle(self: &Arc<Self>) -> TriggerOutcome {
        self.trigger(TaskKind::TradingCycle, Domain::Trading, |s| async move { s.trading_cycle_body().await })
    }

    async fn trading_full_run_body(&self) -> TaskResult {
        let mut errors = Vec::new();
        let mut data = serde_json::Map::new();

        let collection = self.trading_collection_body().await;
        data.insert("collection".into(), collection.data);
        errors.extend(collection.errors);
        if collection.stopped {
            data.insert("training".into(), skipped_stopped_json());
            data.insert("cycle".into(), skipped_stopped_json());
            return TaskResult { success: false, stopped: true, skipped: false, skip_reason: None, errors, data: data.into() };
        }

        let training = self.trading_training_body().await;
        data.insert("training".into(), training.data);
        errors.extend(training.errors);
        if training.stopped {
            data.insert("cycle".into(), skipped_stopped_json());
            return TaskResult { success: false, stopped: true, skipped: false, skip_reason: None, errors, data: data.into() };
        }

        let cycle = self.trading_cycle_body().await;
        data.insert("cycle".into(), cycle.data);
        errors.extend(cycle.errors.clone());

        TaskResult { success: errors.is_empty(), stopped: cycle.stopped, skipped: false, skip_reason: None, errors, data: data.into() }
    }

    pub async fn run_trading_full_run(self: &Arc<Self>) -> TaskResult {
        self.run_lifecycle(TaskKind::TradingFullRun, Domain::Trading, |s| async move { s.trading_full_run_body().await }).await
    }

    pub fn trigger_trading_full_run(self: &Arc<Self>) -> TriggerOutcome {
        self.trigger(TaskKind::TradingFullRun, Domain::Trading, |s| async move { s.trading_full_run_body().await })
    }

    // ---- Daemon mode (§4.8): an interruptible loop around full_run ----

    /// Runs `run_full_run` repeatedly, sleeping `daemon_interval` between
    /// iterations; setting the daemon stop latch interrupts the sleep
    /// immediately rather than waiting out the interval. A no-op if the
    /// daemon is already running.
    pub async fn run_daemon(self: &Arc<Self>) {
        {
            let mut state = self.state.lock();
            if state.daemon_running {
                return;
            }
            state.daemon_running = true;
        }
        loop {
            let _ = self.run_full_run().await;
            tokio::select! {
                _ = self.daemon_stop.cancelled() => break,
                _ = tokio::time::sleep(self.config.daemon_interval) => {}
            }
            if self.daemon_stop.is_cancelled() {
                break;
            }
        }
        self.state.lock().daemon_running = false;
    }

    pub async fn run_trading_daemon(self: &Arc<Self>) {
        {
            let mut state = self.state.lock();
            if state.trading_daemon_running {
                return;
            }
            state.trading_daemon_running = true;
        }
        loop {
            let _ = self.run_trading_full_run().await;
            tokio::select! {
                _ = self.trading_daemon_stop.cancelled() => break,
                _ = tokio::time::sleep(self.config.trading_daemon_interval) => {}
            }
            if self.trading_daemon_stop.is_cancelled() {
                break;
            }
        }
        self.state.lock().trading_daemon_running = false;
    }
}
