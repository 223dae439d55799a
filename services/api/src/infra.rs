use fair_chance_gate::config::PolicyConfig;
use fair_chance_gate::error::AppError;
use fair_chance_gate::workflows::fair_chance::{
    ActorType, CheckType, EvidenceSink, FairChanceGateService, InMemoryEvidenceSink, LegacyStage,
    SharedPolicyRegistry, TransitionPayload, WorkflowState,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

pub(crate) type RecordingGateService = FairChanceGateService<InMemoryEvidenceSink>;

/// Load the registry once and host the gates over `sink`.
pub(crate) fn build_service<S>(
    policy: &PolicyConfig,
    sink: Arc<S>,
) -> Result<Arc<FairChanceGateService<S>>, AppError>
where
    S: EvidenceSink + 'static,
{
    let registry = policy.registry()?;
    tracing::info!(
        markets = ?registry.markets(),
        unknown_market_policy = %registry.unknown_market_policy(),
        "policy registry loaded"
    );
    Ok(Arc::new(FairChanceGateService::new(
        SharedPolicyRegistry::new(registry),
        sink,
    )))
}

/// Gates over an in-memory sink whose records the caller can read back.
pub(crate) fn build_recording_service(
    policy: &PolicyConfig,
) -> Result<(Arc<RecordingGateService>, InMemoryEvidenceSink), AppError> {
    let sink = InMemoryEvidenceSink::default();
    let service = build_service(policy, Arc::new(sink.clone()))?;
    Ok((service, sink))
}

pub(crate) fn parse_state(raw: &str) -> Result<WorkflowState, String> {
    raw.parse().map_err(|err| format!("{err}"))
}

pub(crate) fn parse_check_type(raw: &str) -> Result<CheckType, String> {
    raw.parse().map_err(|err| format!("{err}"))
}

pub(crate) fn parse_stage(raw: &str) -> Result<LegacyStage, String> {
    raw.parse().map_err(|err| format!("{err}"))
}

pub(crate) fn parse_actor_type(raw: &str) -> Result<ActorType, String> {
    serde_json::from_value(serde_json::Value::String(raw.trim().to_ascii_lowercase()))
        .map_err(|_| format!("unknown actor type '{raw}'"))
}

pub(crate) fn parse_payload(raw: Option<&str>) -> Result<TransitionPayload, AppError> {
    match raw {
        None => Ok(TransitionPayload::default()),
        Some(json) => serde_json::from_str(json)
            .map_err(|err| AppError::Input(format!("transition payload is not valid JSON: {err}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_cli_vocabulary() {
        assert_eq!(parse_state("conditional_offer"), Ok(WorkflowState::ConditionalOffer));
        assert_eq!(parse_check_type("ARREST_RECORD"), Ok(CheckType::ArrestRecord));
        assert_eq!(parse_stage("background_check"), Ok(LegacyStage::BackgroundCheck));
        assert_eq!(parse_actor_type("Leasing_Agent"), Ok(ActorType::LeasingAgent));
        assert!(parse_check_type("horoscope").is_err());
    }

    #[test]
    fn serve_sink_accepts_evidence_without_retaining_it() {
        use fair_chance_gate::workflows::fair_chance::{
            ApplicationId, BackgroundCheckAuthorization, MarketId, TracingEvidenceSink,
            TransitionRequest,
        };

        let service = build_service(&PolicyConfig::default(), Arc::new(TracingEvidenceSink))
            .expect("service builds");
        let outcome = service
            .transition(&TransitionRequest {
                application_id: ApplicationId("app-serve-1".to_string()),
                market_id: MarketId::new("NYC"),
                current_state: WorkflowState::ConditionalOffer,
                target_state: WorkflowState::BackgroundCheckAllowed,
                actor_id: "agent-17".to_string(),
                actor_type: ActorType::LeasingAgent,
                payload: TransitionPayload {
                    background_check_authorization: Some(BackgroundCheckAuthorization {
                        authorization_signed: true,
                    }),
                    ..TransitionPayload::default()
                },
            })
            .expect("tracing sink never fails");
        assert!(outcome.allowed);
        assert!(outcome.evidence.is_some());
    }

    #[test]
    fn payload_parsing_reports_bad_json_as_input_error() {
        assert!(matches!(parse_payload(Some("{")), Err(AppError::Input(_))));
        let payload = parse_payload(Some(
            r#"{"backgroundCheckAuthorization": {"authorizationSigned": true}}"#,
        ))
        .expect("payload parses");
        assert!(payload.background_check_authorization.is_some());
    }
}
