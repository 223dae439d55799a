use std::io;
use std::sync::{Arc, Mutex};

use axum::response::Response;
use chrono::{DateTime, TimeZone, Utc};
use serde_json::Value;
use tracing_subscriber::fmt::MakeWriter;

use crate::workflows::fair_chance::domain::{
    ActorType, AdverseInfoDetails, ApplicationId, Article23AFactor, BackgroundCheckAuthorization,
    CheckRequest, CheckType, ConditionalOfferDetails, FinalDecision, FinalDecisionKind, MarketId,
    PrequalificationResults, TransitionPayload, TransitionRequest, WorkflowState,
};
use crate::workflows::fair_chance::policy::PolicyRegistry;
use crate::workflows::fair_chance::{
    CheckGate, FairChanceGateService, InMemoryEvidenceSink, LegacyGateAdapter,
    SharedPolicyRegistry, TransitionGate,
};

pub(super) const NYC: &str = "NYC";
pub(super) const UNREGULATED: &str = "DES-MOINES";

pub(super) fn registry() -> Arc<PolicyRegistry> {
    Arc::new(PolicyRegistry::standard())
}

pub(super) fn transition_gate() -> TransitionGate {
    TransitionGate::new(registry())
}

pub(super) fn check_gate() -> CheckGate {
    CheckGate::new(registry())
}

pub(super) fn legacy_adapter() -> LegacyGateAdapter {
    LegacyGateAdapter::new(registry())
}

pub(super) fn fixed_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 10, 1, 14, 30, 0)
        .single()
        .expect("valid timestamp")
}

pub(super) fn transition_request(
    market: &str,
    from: WorkflowState,
    to: WorkflowState,
    payload: TransitionPayload,
) -> TransitionRequest {
    TransitionRequest {
        application_id: ApplicationId("app-000123".to_string()),
        market_id: MarketId::new(market),
        current_state: from,
        target_state: to,
        actor_id: "agent-17".to_string(),
        actor_type: ActorType::LeasingAgent,
        payload,
    }
}

pub(super) fn check_request(market: &str, state: WorkflowState, check: CheckType) -> CheckRequest {
    CheckRequest {
        application_id: ApplicationId("app-000123".to_string()),
        market_id: MarketId::new(market),
        current_state: state,
        check_type: check,
        actor_id: "agent-17".to_string(),
    }
}

pub(super) fn prequalified() -> PrequalificationResults {
    PrequalificationResults {
        income_verified: true,
        credit_check_passed: true,
        rental_history_verified: true,
        employment_verified: true,
    }
}

pub(super) fn offer_payload() -> TransitionPayload {
    TransitionPayload {
        prequalification_results: Some(prequalified()),
        conditional_offer_details: Some(ConditionalOfferDetails {
            offer_letter_delivered: true,
            offer_terms: Some("Unit 4B at $2,450/month".to_string()),
        }),
        ..TransitionPayload::default()
    }
}

pub(super) fn authorization_payload(signed: bool) -> TransitionPayload {
    TransitionPayload {
        background_check_authorization: Some(BackgroundCheckAuthorization {
            authorization_signed: signed,
        }),
        ..TransitionPayload::default()
    }
}

pub(super) fn adverse_payload(found: bool, delivered: bool) -> TransitionPayload {
    TransitionPayload {
        adverse_info_details: Some(AdverseInfoDetails {
            adverse_info_found: found,
            notice_delivered: delivered,
            summary: Some("2014 misdemeanor conviction".to_string()),
        }),
        ..TransitionPayload::default()
    }
}

pub(super) fn decision_payload(
    decision: FinalDecisionKind,
    factors: Option<Vec<Article23AFactor>>,
) -> TransitionPayload {
    TransitionPayload {
        final_decision: Some(FinalDecision {
            decision,
            rationale: "Record unrelated to tenancy obligations".to_string(),
            article_23a_factors_considered: factors,
        }),
        ..TransitionPayload::default()
    }
}

pub(super) fn service() -> (
    Arc<FairChanceGateService<InMemoryEvidenceSink>>,
    InMemoryEvidenceSink,
) {
    let sink = InMemoryEvidenceSink::default();
    let service = FairChanceGateService::new(
        SharedPolicyRegistry::new(PolicyRegistry::standard()),
        Arc::new(sink.clone()),
    );
    (Arc::new(service), sink)
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}

/// Log sink for asserting on emitted tracing events.
#[derive(Clone, Default)]
pub(super) struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl CapturedLogs {
    pub(super) fn contents(&self) -> String {
        let bytes = self.0.lock().expect("log buffer").clone();
        String::from_utf8(bytes).expect("utf8 logs")
    }

    /// Run `f` with a subscriber writing into this buffer.
    pub(super) fn capture<T>(&self, f: impl FnOnce() -> T) -> T {
        let subscriber = tracing_subscriber::fmt()
            .with_writer(self.clone())
            .with_ansi(false)
            .with_target(true)
            .with_max_level(tracing::Level::DEBUG)
            .finish();
        tracing::subscriber::with_default(subscriber, f)
    }
}

impl io::Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().expect("log buffer").extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for CapturedLogs {
    type Writer = CapturedLogs;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}
