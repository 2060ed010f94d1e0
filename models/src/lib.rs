#![forbid(unsafe_code)]
#![warn(missing_debug_implementations, rust_2018_idioms)]

//! # Model-version manager
//!
//! Tracks trained model artifacts per `(domain, market)`, enforces the
//! exactly-one-active invariant, and evaluates automatic rollback on
//! betting-performance degradation (§4.7).

pub mod error;

pub use error::{ModelsError, Result};

use arbihawk_instrument::ModelVersion;
use arbihawk_markets::Domain;
use arbihawk_store::{BackupCollaborator, Store};
use chrono::{DateTime, Utc};
use tracing::info;

/// Tunables mirrored from the reference trainer's `MODEL_VERSIONING_CONFIG`
/// (§9's configuration surface; §4.7 describes the behaviour they gate).
#[derive(Debug, Clone, Copy)]
pub struct ModelVersioningConfig {
    pub auto_rollback_enabled: bool,
    /// ROI percentage threshold (e.g. `-10.0` means "-10% ROI"); crossing
    /// below this after `rollback_evaluation_bets` settled bets triggers
    /// [`check_should_rollback`].
    pub rollback_threshold_pct: f64,
    pub rollback_evaluation_bets: u64,
    /// `None` disables pruning; old versions are kept indefinitely, matching
    /// the reference trainer's behaviour before `_cleanup_old_versions` was
    /// ever wired up to delete anything.
    pub max_versions_to_keep: Option<usize>,
}

impl Default for ModelVersioningConfig {
    fn default() -> Self {
        Self {
            auto_rollback_enabled: true,
            rollback_threshold_pct: -10.0,
            rollback_evaluation_bets: 50,
            max_versions_to_keep: Some(10),
        }
    }
}

/// Deterministic version id: a content hash of everything that makes a
/// trained artifact unique, so re-saving identical training output never
/// collides by chance (mirrors the ingestion pipeline's blake3 checksum use,
/// §4.3) while still being reproducible for tests.
fn generate_version_id(
    domain: Domain,
    market: &str,
    model_path: &str,
    trained_at: DateTime<Utc>,
    training_samples: u64,
    cv_score: f64,
) -> String {
    let mut hasher = blake3::Hasher::new();
    hasher.update(domain.as_str().as_bytes());
    hasher.update(market.as_bytes());
    hasher.update(model_path.as_bytes());
    hasher.update(trained_at.to_rfc3339().as_bytes());
    hasher.update(&training_samples.to_le_bytes());
    hasher.update(&cv_score.to_le_bytes());
    hasher.finalize().to_hex()[..16].to_string()
}

/// Saves a new version row, optionally activating it, then enforces
/// `config.max_versions_to_keep` (§4.7). Returns the new version's id.
#[allow(clippy::too_many_arguments)]
pub fn save_version(
    store: &Store,
    domain: Domain,
    market: &str,
    model_path: &str,
    training_samples: u64,
    cv_score: f64,
    performance_metrics: serde_json::Value,
    activate: bool,
    trained_at: DateTime<Utc>,
    config: &ModelVersioningConfig,
) -> Result<String> {
    let version_id =
        generate_version_id(domain, market, model_path, trained_at, training_samples, cv_score);

    let version = ModelVersion {
        version_id: version_id.clone(),
        domain,
        market: market.to_string(),
        model_path: model_path.to_string(),
        trained_at,
        training_samples,
        cv_score,
        is_active: false,
        performance_metrics,
    };
    store.insert_model_version(&version)?;

    if activate {
        set_active(store, &version_id, domain, market)?;
    }

    prune_old_versions(store, domain, market, config)?;

    Ok(version_id)
}

/// Atomically activates `version_id` for `(domain, market)`, deactivating
/// every other row under that pair (§4.7 invariant).
pub fn set_active(store: &Store, version_id: &str, domain: Domain, market: &str) -> Result<()> {
    store.set_active_version(version_id, domain, market)?;
    Ok(())
}

/// The currently active version for `(domain, market)`, if any.
pub fn get_active(store: &Store, domain: Domain, market: &str) -> Result<Option<ModelVersion>> {
    Ok(store.get_active_version(domain, market)?)
}

/// Activates `version_id`, taking a backup first (§4.1: every destructive
/// operation invokes the backup collaborator before mutating). `(domain,
/// market)` are read off the target row itself rather than supplied by the
/// caller, mirroring the reference trainer's `rollback_to_version`. Returns
/// `false` if `version_id` does not exist instead of erroring, since
/// "rollback to a version that no longer exists" is an expected caller
/// mistake, not a fault.
pub fn rollback_to_version(
    store: &Store,
    backup: &dyn BackupCollaborator,
    version_id: &str,
) -> Result<bool> {
    let Some(version) = store.get_model_version(version_id)? else {
        return Ok(false);
    };

    if let Some(path) = store.path() {
        backup.backup(path, "pre_rollback")?;
    }

    set_active(store, version_id, version.domain, &version.market)?;
    info!(version_id, market = %version.market, "rolled back to model version");
    Ok(true)
}

/// Evaluates whether `market`'s active model should be rolled back, based
/// on bankroll ROI since its activation (§4.7). Returns the version id to
/// roll back *to* — the previous active version under the same `(domain,
/// market)`, by training recency — or `None` if no rollback is warranted.
pub fn check_should_rollback(
    store: &Store,
    domain: Domain,
    market: &str,
    config: &ModelVersioningConfig,
) -> Result<Option<String>> {
    if !config.auto_rollback_enabled {
        return Ok(None);
    }

    let versions = store.list_model_versions(domain, market)?;
    if versions.len() < 2 {
        return Ok(None);
    }

    let stats = store.bankroll_stats(market)?;
    if stats.settled_bets < config.rollback_evaluation_bets {
        return Ok(None);
    }

    let current_roi_pct = stats.roi() * 100.0;
    if current_roi_pct >= config.rollback_threshold_pct {
        return Ok(None);
    }

    // `versions` is ordered newest-trained first; the current active model
    // is expected to be versions[0], so versions[1] is "the previous one".
    Ok(versions.get(1).map(|v| v.version_id.clone()))
}

/// Ranks two versions' `cv_score`, ties broken by training recency (§9
/// supplemented feature, mirrors the reference trainer's `compare_versions`).
pub fn compare_versions(a: &ModelVersion, b: &ModelVersion) -> std::cmp::Ordering {
    a.compare(b)
}

/// The highest-`cv_score` version under `(domain, market)`, or `None` if
/// none exist (§9 supplemented feature).
pub fn get_best_version(store: &Store, domain: Domain, market: &str) -> Result<Option<ModelVersion>> {
    let versions = store.list_model_versions(domain, market)?;
    Ok(versions.into_iter().max_by(|a, b| a.compare(b)))
}

/// Deletes versions beyond `config.max_versions_to_keep`, oldest first,
/// never deleting the active one (§4.7: "not required; the reference
/// behaviour leaves them" — kept as an opt-in enrichment since the
/// invariant is easy to maintain once versions are listed by recency).
fn prune_old_versions(
    store: &Store,
    domain: Domain,
    market: &str,
    config: &ModelVersioningConfig,
) -> Result<()> {
    let Some(max_to_keep) = config.max_versions_to_keep else {
        return Ok(());
    };

    let versions = store.list_model_versions(domain, market)?;
    if versions.len() <= max_to_keep {
        return Ok(());
    }

    for stale in versions.into_iter().skip(max_to_keep) {
        if stale.is_active {
            continue;
        }
        store.delete_model_version(&stale.version_id)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use serde_json::json;

    fn store() -> Store {
        Store::open_in_memory().unwrap()
    }

    #[test]
    fn save_version_without_activation_leaves_nothing_active() {
        let store = store();
        let config = ModelVersioningConfig::default();
        let version_id = save_version(
            &store,
            Domain::Betting,
            "1x2",
            "/models/1x2_v1.bin",
            1000,
            0.65,
            json!({"accuracy": 0.7}),
            false,
            Utc::now(),
            &config,
        )
        .unwrap();

        assert!(get_active(&store, Domain::Betting, "1x2").unwrap().is_none());
        let saved = store.get_model_version(&version_id).unwrap().unwrap();
        assert!(!saved.is_active);
    }

    #[test]
    fn save_version_with_activation_replaces_the_previous_active_version() {
        let store = store();
        let config = ModelVersioningConfig::default();
        let v1 = save_version(
            &store,
            Domain::Betting,
            "1x2",
            "/models/v1.bin",
            1000,
            0.6,
            json!({}),
            true,
            Utc::now(),
            &config,
        )
        .unwrap();
        let v2 = save_version(
            &store,
            Domain::Betting,
            "1x2",
            "/models/v2.bin",
            1200,
            0.7,
            json!({}),
            true,
            Utc::now() + Duration::seconds(1),
            &config,
        )
        .unwrap();

        let active = get_active(&store, Domain::Betting, "1x2").unwrap().unwrap();
        assert_eq!(active.version_id, v2);
        assert!(!store.get_model_version(&v1).unwrap().unwrap().is_active);
    }

    #[test]
    fn rollback_activates_the_target_version_and_skips_backup_for_in_memory_stores() {
        struct NeverCalled;
        impl BackupCollaborator for NeverCalled {
            fn backup(&self, _source_path: &std::path::Path, _label: &str) -> arbihawk_store::Result<std::path::PathBuf> {
                panic!("backup should not be invoked for an in-memory store");
            }
        }

        let store = store();
        let config = ModelVersioningConfig::default();
        let v1 = save_version(
            &store, Domain::Betting, "1x2", "/models/v1.bin", 1000, 0.6, json!({}), true, Utc::now(), &config,
        )
        .unwrap();
        save_version(
            &store,
            Domain::Betting,
            "1x2",
            "/models/v2.bin",
            1200,
            0.7,
            json!({}),
            true,
            Utc::now() + Duration::seconds(1),
            &config,
        )
        .unwrap();

        let ok = rollback_to_version(&store, &NeverCalled, &v1).unwrap();
        assert!(ok);
        let active = get_active(&store, Domain::Betting, "1x2").unwrap().unwrap();
        assert_eq!(active.version_id, v1);
    }

    #[test]
    fn rollback_to_an_unknown_version_returns_false() {
        struct NeverCalled;
        impl BackupCollaborator for NeverCalled {
            fn backup(&self, _source_path: &std::path::Path, _label: &str) -> arbihawk_store::Result<std::path::PathBuf> {
                panic!("backup should not be invoked");
            }
        }

        let store = store();
        let ok = rollback_to_version(&store, &NeverCalled, "missing").unwrap();
        assert!(!ok);
    }

    #[test]
    fn check_should_rollback_requires_enough_settled_bets() {
        let store = store();
        let config = ModelVersioningConfig::default();
        save_version(&store, Domain::Betting, "1x2", "/v1.bin", 1000, 0.6, json!({}), true, Utc::now(), &config)
            .unwrap();
        save_version(
            &store,
            Domain::Betting,
            "1x2",
            "/v2.bin",
            1000,
            0.6,
            json!({}),
            true,
            Utc::now() + Duration::seconds(1),
            &config,
        )
        .unwrap();

        let result = check_should_rollback(&store, Domain::Betting, "1x2", &config).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn check_should_rollback_is_disabled_by_config() {
        let store = store();
        let mut config = ModelVersioningConfig::default();
        config.auto_rollback_enabled = false;

        let result = check_should_rollback(&store, Domain::Betting, "1x2", &config).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn get_best_version_picks_the_highest_cv_score() {
        let store = store();
        let config = ModelVersioningConfig::default();
        save_version(&store, Domain::Betting, "1x2", "/v1.bin", 1000, 0.6, json!({}), false, Utc::now(), &config)
            .unwrap();
        let best_id = save_version(
            &store,
            Domain::Betting,
            "1x2",
            "/v2.bin",
            1000,
            0.9,
            json!({}),
            false,
            Utc::now() + Duration::seconds(1),
            &config,
        )
        .unwrap();

        let best = get_best_version(&store, Domain::Betting, "1x2").unwrap().unwrap();
        assert_eq!(best.version_id, best_id);
    }

    #[test]
    fn prune_deletes_oldest_versions_beyond_the_retention_limit() {
        let store = store();
        let config = ModelVersioningConfig { max_versions_to_keep: Some(2), ..ModelVersioningConfig::default() };

        let oldest = save_version(
            &store, Domain::Betting, "1x2", "/v1.bin", 1000, 0.5, json!({}), false, Utc::now(), &config,
        )
        .unwrap();
        save_version(
            &store,
            Domain::Betting,
            "1x2",
            "/v2.bin",
            1000,
            0.6,
            json!({}),
            false,
            Utc::now() + Duration::seconds(1),
            &config,
        )
        .unwrap();
        save_version(
            &store,
            Domain::Betting,
            "1x2",
            "/v3.bin",
            1000,
            0.7,
            json!({}),
            false,
            Utc::now() + Duration::seconds(2),
            &config,
        )
        .unwrap();

        let remaining = store.list_model_versions(Domain::Betting, "1x2").unwrap();
        assert_eq!(remaining.len(), 2);
        assert!(store.get_model_version(&oldest).unwrap().is_none());
    }
}
