//! In-process `DecisionStore`.
//!
//! No IO: decisions live in memory for the lifetime of the store. Embedders
//! that need durable storage implement `DecisionStore` themselves.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::adapter::{DecisionRecord, DecisionStore};
use crate::artifact::ValidatorRunSummary;
use crate::error::StoreError;

/// Largest page `list_recent_decisions` will return.
pub const MAX_LIST_LIMIT: usize = 100;

#[derive(Default, Debug)]
struct Tables {
    /// Insertion order is creation order.
    decisions: Vec<DecisionRecord>,
    validator_runs: HashMap<String, Vec<ValidatorRunSummary>>,
}

#[derive(Default, Debug)]
pub struct MemoryDecisionStore {
    tables: Mutex<Tables>,
}

impl MemoryDecisionStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn tables(&self) -> Result<std::sync::MutexGuard<'_, Tables>, StoreError> {
        self.tables
            .lock()
            .map_err(|_| StoreError::Unavailable("decision store mutex poisoned".into()))
    }

    /// Validator rows recorded for `decision_id`, in insertion order.
    pub fn validator_runs(&self, decision_id: &str) -> Result<Vec<ValidatorRunSummary>, StoreError> {
        Ok(self
            .tables()?
            .validator_runs
            .get(decision_id)
            .cloned()
            .unwrap_or_default())
    }

    pub fn len(&self) -> usize {
        self.tables().map(|t| t.decisions.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl DecisionStore for MemoryDecisionStore {
    async fn insert_decision(&self, record: &DecisionRecord) -> Result<(), StoreError> {
        let mut t = self.tables()?;
        if t.decisions.iter().any(|d| d.decision_id == record.decision_id) {
            return Err(StoreError::Duplicate(record.decision_id.clone()));
        }
        t.decisions.push(record.clone());
        Ok(())
    }

    async fn insert_validator_runs(
        &self,
        decision_id: &str,
        runs: &[ValidatorRunSummary],
    ) -> Result<(), StoreError> {
        self.tables()?
            .validator_runs
            .entry(decision_id.to_string())
            .or_default()
            .extend_from_slice(runs);
        Ok(())
    }

    async fn get_decision(&self, decision_id: &str) -> Result<Option<DecisionRecord>, StoreError> {
        Ok(self
            .tables()?
            .decisions
            .iter()
            .find(|d| d.decision_id == decision_id)
            .cloned())
    }

    async fn list_recent_decisions(&self, limit: usize) -> Result<Vec<DecisionRecord>, StoreError> {
        if limit > MAX_LIST_LIMIT {
            return Err(StoreError::InvalidLimit(limit));
        }
        Ok(self
            .tables()?
            .decisions
            .iter()
            .rev()
            .take(limit)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str) -> DecisionRecord {
        DecisionRecord {
            decision_id: id.to_string(),
            schema_version: "sentinel.artifact.v1".into(),
            session_id: 78,
            delegate_task_id: "d".into(),
            completion_task_id: "c".into(),
            composite_confidence: 0.5,
            threshold_applied: 0.5,
            final_verdict: "ACCEPT".into(),
            escalation_path: vec![1],
            artifact_hash: "h".into(),
            signature: "s".into(),
            created_at: "2026-01-01T00:00:00.000000Z".into(),
        }
    }

    #[tokio::test]
    async fn newest_first_and_bounded() {
        let store = MemoryDecisionStore::new();
        for id in ["a", "b", "c"] {
            store.insert_decision(&record(id)).await.expect("insert");
        }
        let recent = store.list_recent_decisions(2).await.expect("list");
        let ids: Vec<&str> = recent.iter().map(|r| r.decision_id.as_str()).collect();
        assert_eq!(ids, vec!["c", "b"]);
        assert!(matches!(
            store.list_recent_decisions(101).await,
            Err(StoreError::InvalidLimit(101))
        ));
    }

    #[tokio::test]
    async fn duplicates_are_rejected() {
        let store = MemoryDecisionStore::new();
        store.insert_decision(&record("a")).await.expect("insert");
        assert!(matches!(
            store.insert_decision(&record("a")).await,
            Err(StoreError::Duplicate(_))
        ));
        assert_eq!(store.len(), 1);
        assert!(store.get_decision("a").await.expect("get").is_some());
        assert!(store.get_decision("zz").await.expect("get").is_none());
    }
}
