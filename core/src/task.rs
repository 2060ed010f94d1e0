use serde::{Deserialize, Serialize};

/// Which background task currently owns the scheduler's single slot (§4.8
/// `current_task`). The slot is free (`nil`) when [`crate::Scheduler::current_task`]
/// returns `None`.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    Collection,
    Training,
    Betting,
    FullRun,
    TradingCollection,
    TradingTraining,
    TradingCycle,
    TradingFullRun,
}

impl TaskKind {
    pub const fn as_str(&self) -> &'static str {
        match self {
            TaskKind::Collection => "collection",
            TaskKind::Training => "training",
            TaskKind::Betting => "betting",
            TaskKind::FullRun => "full_run",
            TaskKind::TradingCollection => "trading_collection",
            TaskKind::TradingTraining => "trading_training",
            TaskKind::TradingCycle => "trading_cycle",
            TaskKind::TradingFullRun => "trading_full_run",
        }
    }
}

impl std::fmt::Display for TaskKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of triggering a task in the background (§4.8 step 1/3): either
/// the slot was free and the task started, or another task already owns it.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum TriggerOutcome {
    Started,
    AlreadyRunning(TaskKind),
}

/// Result of one task run, whether awaited directly or recorded to run
/// history after a background trigger completes (§7: "every task returns a
/// structured result with success, stopped, skipped and errors").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskResult {
    pub success: bool,
    pub stopped: bool,
    pub skipped: bool,
    pub skip_reason: Option<String>,
    pub errors: Vec<String>,
    pub data: serde_json::Value,
}

impl TaskResult {
    pub fn ok(data: serde_json::Value) -> Self {
        Self { success: true, stopped: false, skipped: false, skip_reason: None, errors: Vec::new(), data }
    }

    pub fn stopped() -> Self {
        Self {
            success: false,
            stopped: true,
            skipped: false,
            skip_reason: None,
            errors: Vec::new(),
            data: serde_json::Value::Null,
        }
    }

    pub fn skipped(reason: impl Into<String>) -> Self {
        Self {
            success: true,
            stopped: false,
            skipped: true,
            skip_reason: Some(reason.into()),
            errors: Vec::new(),
            data: serde_json::Value::Null,
        }
    }

    pub fn failed(errors: Vec<String>) -> Self {
        Self { success: false, stopped: false, skipped: false, skip_reason: None, errors, data: serde_json::Value::Null }
    }

    pub fn rejected(running: TaskKind) -> Self {
        Self::failed(vec![format!("Task already running: {running}")])
    }
}
