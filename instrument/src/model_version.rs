use arbihawk_markets::Domain;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One trained model artifact for a `(domain, market)` pair (§3
/// `model_versions`, §4.7 model-version manager). At most one version per
/// `(domain, market)` has `is_active = true`; the manager enforces that
/// exclusivity, this type just carries the row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelVersion {
    pub version_id: String,
    pub domain: Domain,
    pub market: String,
    pub model_path: String,
    pub trained_at: DateTime<Utc>,
    pub training_samples: u64,
    /// Cross-validation score the trainer reported; comparable only between
    /// versions of the same `(domain, market)`.
    pub cv_score: f64,
    pub is_active: bool,
    /// Free-form backtest/validation metrics (accuracy, log loss, Sharpe,
    /// ...) kept as opaque JSON since the metric set differs by market.
    pub performance_metrics: serde_json::Value,
}

impl ModelVersion {
    /// Ranks two versions of the same `(domain, market)` by `cv_score`,
    /// ties broken by recency (§9 supplemented feature, mirrors the
    /// reference trainer's `compare_versions`).
    pub fn compare(&self, other: &Self) -> std::cmp::Ordering {
        self.cv_score
            .partial_cmp(&other.cv_score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| self.trained_at.cmp(&other.trained_at))
    }
}
