use super::common::*;
use chrono::{TimeZone, Utc};
use uuid::Uuid;

use crate::workflows::fair_chance::decision::{EvidenceRecord, ResponseWindow};
use crate::workflows::fair_chance::domain::{ActorType, WorkflowState};
use crate::workflows::fair_chance::policy::NoticeKind;
use crate::workflows::fair_chance::{
    EvidenceSink, InMemoryEvidenceSink, SinkError, TracingEvidenceSink,
};

fn evidence() -> EvidenceRecord {
    EvidenceRecord {
        transition_id: Uuid::new_v4(),
        timestamp: Utc
            .with_ymd_and_hms(2025, 10, 1, 14, 30, 0)
            .single()
            .expect("valid timestamp"),
        actor_id: "agent-17".to_string(),
        actor_type: ActorType::LeasingAgent,
        from_state: WorkflowState::BackgroundCheckAllowed,
        to_state: WorkflowState::IndividualizedAssessment,
        notices_issued: Some(vec![NoticeKind::AdverseInformationNotice]),
        response_window: Some(ResponseWindow { days_allowed: 10 }),
    }
}

#[test]
fn tracing_sink_emits_audit_event_per_record() {
    let logs = CapturedLogs::default();
    let record = evidence();
    let transition_id = record.transition_id;

    logs.capture(|| {
        TracingEvidenceSink
            .record(record)
            .expect("tracing sink accepts");
    });

    let output = logs.contents();
    assert!(output.contains("audit"));
    assert!(output.contains(&transition_id.to_string()));
    assert!(output.contains("to_state=INDIVIDUALIZED_ASSESSMENT"));
    assert!(output.contains("notices_issued=adverse_information_notice"));
    assert!(output.contains("response_window_days=10"));
}

#[test]
fn in_memory_sink_rejects_replayed_records() {
    let sink = InMemoryEvidenceSink::default();
    let record = evidence();

    sink.record(record.clone()).expect("first write");
    match sink.record(record.clone()) {
        Err(SinkError::Duplicate(id)) => assert_eq!(id, record.transition_id),
        other => panic!("expected duplicate error, got {other:?}"),
    }
    assert_eq!(sink.records(), vec![record]);
}
