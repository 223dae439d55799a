use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use tracing::info;
use uuid::Uuid;

use super::decision::EvidenceRecord;

/// Tracing target carrying evidence records in long-running deployments.
pub const AUDIT_TARGET: &str = "audit";

/// Append-only destination for evidence records (e.g. a compliance event
/// store). The gates never call this; callers forward evidence after
/// persisting the transition.
pub trait EvidenceSink: Send + Sync {
    fn record(&self, evidence: EvidenceRecord) -> Result<(), SinkError>;
}

#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("evidence sink unavailable: {0}")]
    Unavailable(String),
    #[error("evidence record {0} already stored")]
    Duplicate(Uuid),
}

/// Hands each record to the tracing pipeline as a structured event on the
/// [`AUDIT_TARGET`] target and keeps nothing in memory.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingEvidenceSink;

impl EvidenceSink for TracingEvidenceSink {
    fn record(&self, evidence: EvidenceRecord) -> Result<(), SinkError> {
        let notices = evidence
            .notices_issued
            .as_deref()
            .map(|notices| {
                notices
                    .iter()
                    .map(|notice| notice.label())
                    .collect::<Vec<_>>()
                    .join(",")
            })
            .unwrap_or_default();
        let response_window_days = evidence
            .response_window
            .map(|window| window.days_allowed)
            .unwrap_or(0);

        info!(
            target: AUDIT_TARGET,
            transition_id = %evidence.transition_id,
            timestamp = %evidence.timestamp.to_rfc3339(),
            actor_id = %evidence.actor_id,
            actor_type = evidence.actor_type.label(),
            from_state = %evidence.from_state,
            to_state = %evidence.to_state,
            notices_issued = %notices,
            response_window_days,
            "fair chance transition evidence"
        );
        Ok(())
    }
}

#[derive(Debug, Default)]
struct StoredEvidence {
    records: Vec<EvidenceRecord>,
    ids: HashSet<Uuid>,
}

/// Keeps every record for inspection. Suited to tests and short-lived
/// commands; the store grows with each allowed transition.
#[derive(Debug, Default, Clone)]
pub struct InMemoryEvidenceSink {
    stored: Arc<Mutex<StoredEvidence>>,
}

impl InMemoryEvidenceSink {
    pub fn records(&self) -> Vec<EvidenceRecord> {
        match self.stored.lock() {
            Ok(guard) => guard.records.clone(),
            Err(poisoned) => poisoned.into_inner().records.clone(),
        }
    }
}

impl EvidenceSink for InMemoryEvidenceSink {
    fn record(&self, evidence: EvidenceRecord) -> Result<(), SinkError> {
        let mut guard = self
            .stored
            .lock()
            .map_err(|_| SinkError::Unavailable("evidence mutex poisoned".to_string()))?;
        if !guard.ids.insert(evidence.transition_id) {
            return Err(SinkError::Duplicate(evidence.transition_id));
        }
        guard.records.push(evidence);
        Ok(())
    }
}
