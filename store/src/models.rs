use crate::error::Result;
use crate::Store;
use arbihawk_instrument::ModelVersion;
use arbihawk_markets::Domain;
use rusqlite::{params, OptionalExtension};
use std::str::FromStr;

impl Store {
    /// Inserts a new version row (inactive by default). The higher-level
    /// `save_version`/`set_active` contract (§4.7) lives in
    /// `arbihawk-models`, which composes this with [`Store::set_active_version`].
    pub fn insert_model_version(&self, version: &ModelVersion) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO model_versions
                    (version_id, domain, market, model_path, trained_at, training_samples,
                     cv_score, is_active, performance_metrics)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![
                    version.version_id,
                    version.domain.as_str(),
                    version.market,
                    version.model_path,
                    version.trained_at,
                    version.training_samples,
                    version.cv_score,
                    version.is_active,
                    crate::json::sanitize(&version.performance_metrics).to_string(),
                ],
            )?;
            Ok(())
        })
    }

    /// Atomically clears `is_active` for every row under `(domain, market)`
    /// and sets it for `version_id` (§4.7 invariant: exactly one active row
    /// per `(domain, market)` at every transaction boundary).
    pub fn set_active_version(&self, version_id: &str, domain: Domain, market: &str) -> Result<()> {
        self.with_conn(|conn| {
            let tx = conn.unchecked_transaction()?;
            tx.execute(
                "UPDATE model_versions SET is_active = 0 WHERE domain = ?1 AND market = ?2",
                params![domain.as_str(), market],
            )?;
            let rows = tx.execute(
                "UPDATE model_versions SET is_active = 1
                 WHERE version_id = ?1 AND domain = ?2 AND market = ?3",
                params![version_id, domain.as_str(), market],
            )?;
            if rows == 0 {
                return Err(crate::error::StoreError::NotFound(format!(
                    "model version {version_id} for ({domain}, {market})"
                )));
            }
            tx.commit()?;
            Ok(())
        })
    }

    pub fn get_active_version(&self, domain: Domain, market: &str) -> Result<Option<ModelVersion>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT version_id, domain, market, model_path, trained_at, training_samples,
                        cv_score, is_active, performance_metrics
                 FROM model_versions WHERE domain = ?1 AND market = ?2 AND is_active = 1",
                params![domain.as_str(), market],
                row_to_model_version,
            )
            .optional()
            .map_err(Into::into)
        })
    }

    pub fn get_model_version(&self, version_id: &str) -> Result<Option<ModelVersion>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT version_id, domain, market, model_path, trained_at, training_samples,
                        cv_score, is_active, performance_metrics
                 FROM model_versions WHERE version_id = ?1",
                params![version_id],
                row_to_model_version,
            )
            .optional()
            .map_err(Into::into)
        })
    }

    /// Deletes one version row outright (§4.7 retention pruning). Silent
    /// no-op if the id is already gone.
    pub fn delete_model_version(&self, version_id: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute("DELETE FROM model_versions WHERE version_id = ?1", params![version_id])?;
            Ok(())
        })
    }

    /// All versions under `(domain, market)`, most recently trained first.
    pub fn list_model_versions(&self, domain: Domain, market: &str) -> Result<Vec<ModelVersion>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT version_id, domain, market, model_path, trained_at, training_samples,
                        cv_score, is_active, performance_metrics
                 FROM model_versions WHERE domain = ?1 AND market = ?2
                 ORDER BY trained_at DESC",
            )?;
            let rows = stmt
                .query_map(params![domain.as_str(), market], row_to_model_version)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(rows)
        })
    }
}

fn row_to_model_version(row: &rusqlite::Row<'_>) -> rusqlite::Result<ModelVersion> {
    let domain: String = row.get(1)?;
    let metrics: String = row.get(8)?;
    Ok(ModelVersion {
        version_id: row.get(0)?,
        domain: Domain::from_str(&domain).unwrap_or(Domain::Betting),
        market: row.get(2)?,
        model_path: row.get(3)?,
        trained_at: row.get(4)?,
        training_samples: row.get(5)?,
        cv_score: row.get(6)?,
        is_active: row.get(7)?,
        performance_metrics: serde_json::from_str(&metrics).unwrap_or(serde_json::Value::Null),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::json;

    fn version(id: &str, market: &str, cv_score: f64) -> ModelVersion {
        ModelVersion {
            version_id: id.into(),
            domain: Domain::Betting,
            market: market.into(),
            model_path: format!("/models/{id}.bin"),
            trained_at: Utc::now(),
            training_samples: 1000,
            cv_score,
            is_active: false,
            performance_metrics: json!({"accuracy": cv_score}),
        }
    }

    #[test]
    fn only_one_active_version_survives_activation() {
        let store = Store::open_in_memory().unwrap();
        store.insert_model_version(&version("v1", "1x2", 0.6)).unwrap();
        store.insert_model_version(&version("v2", "1x2", 0.7)).unwrap();

        store.set_active_version("v1", Domain::Betting, "1x2").unwrap();
        store.set_active_version("v2", Domain::Betting, "1x2").unwrap();

        let active = store.get_active_version(Domain::Betting, "1x2").unwrap().unwrap();
        assert_eq!(active.version_id, "v2");

        let v1 = store.get_model_version("v1").unwrap().unwrap();
        assert!(!v1.is_active);
    }

    #[test]
    fn activating_unknown_version_errors() {
        let store = Store::open_in_memory().unwrap();
        let err = store.set_active_version("missing", Domain::Betting, "1x2");
        assert!(err.is_err());
    }

    #[test]
    fn list_model_versions_orders_by_recency() {
        let store = Store::open_in_memory().unwrap();
        store.insert_model_version(&version("older", "1x2", 0.5)).unwrap();
        store.insert_model_version(&version("newer", "1x2", 0.5)).unwrap();

        let versions = store.list_model_versions(Domain::Betting, "1x2").unwrap();
        assert_eq!(versions.len(), 2);
    }
}
