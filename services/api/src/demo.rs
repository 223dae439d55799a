use crate::cli::{CheckArgs, LegacyCheckArgs, LegacyStageArgs, TransitionArgs};
use crate::infra::{build_recording_service, parse_payload, RecordingGateService};
use fair_chance_gate::config::AppConfig;
use fair_chance_gate::error::AppError;
use fair_chance_gate::workflows::fair_chance::{
    ActorType, AdverseInfoDetails, ApplicationId, Article23AFactor, BackgroundCheckAuthorization,
    CheckRequest, CheckType, ConditionalOfferDetails, FinalDecision, FinalDecisionKind,
    InMemoryEvidenceSink, LegacyBackgroundCheckRequest, LegacyStageTransitionRequest, MarketId,
    PrequalificationResults, TransitionOutcome, TransitionPayload, TransitionRequest,
    WorkflowState,
};
use serde::Serialize;
use std::sync::Arc;

fn load_service() -> Result<(Arc<RecordingGateService>, InMemoryEvidenceSink), AppError> {
    let config = AppConfig::load()?;
    build_recording_service(&config.policy)
}

fn print_json<T: Serialize>(value: &T) -> Result<(), AppError> {
    let rendered = serde_json::to_string_pretty(value)
        .map_err(|err| AppError::Input(format!("failed to render output: {err}")))?;
    println!("{rendered}");
    Ok(())
}

pub(crate) fn run_check(args: CheckArgs) -> Result<(), AppError> {
    let (service, _) = load_service()?;
    let outcome = service.check(&CheckRequest {
        application_id: ApplicationId(args.application_id),
        market_id: MarketId::new(args.market),
        current_state: args.state,
        check_type: args.check_type,
        actor_id: args.actor_id,
    });
    print_json(&outcome)
}

pub(crate) fn run_transition(args: TransitionArgs) -> Result<(), AppError> {
    let payload = parse_payload(args.payload.as_deref())?;
    let (service, _) = load_service()?;
    let outcome = service.transition(&TransitionRequest {
        application_id: ApplicationId(args.application_id),
        market_id: MarketId::new(args.market),
        current_state: args.from,
        target_state: args.to,
        actor_id: args.actor_id,
        actor_type: args.actor_type,
        payload,
    })?;
    print_json(&outcome)
}

pub(crate) fn run_legacy_check(args: LegacyCheckArgs) -> Result<(), AppError> {
    let (service, _) = load_service()?;
    let outcome = service.legacy_background_check(&LegacyBackgroundCheckRequest {
        application_id: ApplicationId(args.application_id),
        market_id: MarketId::new(args.market),
        current_stage: args.stage,
        check_type: args.check_type,
    });
    print_json(&outcome)
}

pub(crate) fn run_legacy_stage(args: LegacyStageArgs) -> Result<(), AppError> {
    let (service, _) = load_service()?;
    let outcome = service.legacy_stage_transition(&LegacyStageTransitionRequest {
        application_id: ApplicationId(args.application_id),
        market_id: MarketId::new(args.market),
        current_stage: args.from,
        target_stage: args.to,
    });
    print_json(&outcome)
}

pub(crate) fn run_demo() -> Result<(), AppError> {
    let (service, sink) = load_service()?;

    println!("=== NYC fair chance walkthrough ===");
    println!();
    println!("-- Applicant A: approved after a clean background check --");
    let early = service.check(&demo_check("demo-app-a", WorkflowState::Prequalification));
    println!(
        "criminal_background_check during PREQUALIFICATION -> {}",
        verdict(early.allowed, early.blocked_reason.as_deref())
    );
    for (from, to, payload) in happy_path() {
        let outcome = service.transition(&demo_transition("demo-app-a", from, to, payload))?;
        print_transition(&outcome, from, to);
        if to == WorkflowState::BackgroundCheckAllowed {
            let screening =
                service.check(&demo_check("demo-app-a", WorkflowState::BackgroundCheckAllowed));
            println!(
                "criminal_background_check during BACKGROUND_CHECK_ALLOWED -> {}",
                verdict(screening.allowed, screening.blocked_reason.as_deref())
            );
        }
    }

    println!();
    println!("-- Applicant B: adverse finding, individualized assessment, denial --");
    let skipped = service.transition(&demo_transition(
        "demo-app-b",
        WorkflowState::BackgroundCheckAllowed,
        WorkflowState::Denied,
        decision(FinalDecisionKind::Denied, Vec::new()),
    ))?;
    print_transition(
        &skipped,
        WorkflowState::BackgroundCheckAllowed,
        WorkflowState::Denied,
    );
    for (from, to, payload) in adverse_path() {
        let outcome = service.transition(&demo_transition("demo-app-b", from, to, payload))?;
        print_transition(&outcome, from, to);
    }

    println!();
    println!("-- Evidence recorded --");
    for record in sink.records() {
        let window = record
            .response_window
            .map(|window| format!(", response window {} days", window.days_allowed))
            .unwrap_or_default();
        let notices = record
            .notices_issued
            .map(|notices| {
                notices
                    .iter()
                    .map(|notice| notice.to_string())
                    .collect::<Vec<_>>()
                    .join(", ")
            })
            .unwrap_or_else(|| "none".to_string());
        println!(
            "{} {} -> {} by {} (notices: {}{})",
            record.timestamp.format("%Y-%m-%d %H:%M:%S"),
            record.from_state,
            record.to_state,
            record.actor_id,
            notices,
            window
        );
    }

    Ok(())
}

fn verdict(allowed: bool, reason: Option<&str>) -> String {
    if allowed {
        "allowed".to_string()
    } else {
        format!("blocked ({})", reason.unwrap_or("no reason given"))
    }
}

fn print_transition(outcome: &TransitionOutcome, from: WorkflowState, to: WorkflowState) {
    println!(
        "{from} -> {to}: {}",
        verdict(outcome.allowed, outcome.blocked_reason.as_deref())
    );
    for violation in &outcome.decision.violations {
        println!("  violation {} ({})", violation.code, violation.rule_reference);
    }
}

fn demo_check(application: &str, state: WorkflowState) -> CheckRequest {
    CheckRequest {
        application_id: ApplicationId(application.to_string()),
        market_id: MarketId::new("NYC"),
        current_state: state,
        check_type: CheckType::CriminalBackgroundCheck,
        actor_id: "demo-leasing-agent".to_string(),
    }
}

fn demo_transition(
    application: &str,
    from: WorkflowState,
    to: WorkflowState,
    payload: TransitionPayload,
) -> TransitionRequest {
    TransitionRequest {
        application_id: ApplicationId(application.to_string()),
        market_id: MarketId::new("NYC"),
        current_state: from,
        target_state: to,
        actor_id: "demo-property-manager".to_string(),
        actor_type: ActorType::PropertyManager,
        payload,
    }
}

fn decision(kind: FinalDecisionKind, factors: Vec<Article23AFactor>) -> TransitionPayload {
    TransitionPayload {
        final_decision: Some(FinalDecision {
            decision: kind,
            rationale: "Reviewed by the demo compliance officer".to_string(),
            article_23a_factors_considered: if factors.is_empty() {
                None
            } else {
                Some(factors)
            },
        }),
        ..TransitionPayload::default()
    }
}

fn happy_path() -> Vec<(WorkflowState, WorkflowState, TransitionPayload)> {
    vec![
        (
            WorkflowState::Prequalification,
            WorkflowState::ConditionalOffer,
            TransitionPayload {
                prequalification_results: Some(PrequalificationResults {
                    income_verified: true,
                    credit_check_passed: true,
                    rental_history_verified: true,
                    employment_verified: true,
                }),
                conditional_offer_details: Some(ConditionalOfferDetails {
                    offer_letter_delivered: true,
                    offer_terms: Some("12 month lease at $2,450".to_string()),
                }),
                ..TransitionPayload::default()
            },
        ),
        (
            WorkflowState::ConditionalOffer,
            WorkflowState::BackgroundCheckAllowed,
            TransitionPayload {
                background_check_authorization: Some(BackgroundCheckAuthorization {
                    authorization_signed: true,
                }),
                ..TransitionPayload::default()
            },
        ),
        (
            WorkflowState::BackgroundCheckAllowed,
            WorkflowState::Approved,
            decision(FinalDecisionKind::Approved, Vec::new()),
        ),
    ]
}

fn adverse_path() -> Vec<(WorkflowState, WorkflowState, TransitionPayload)> {
    vec![
        (
            WorkflowState::BackgroundCheckAllowed,
            WorkflowState::IndividualizedAssessment,
            TransitionPayload {
                adverse_info_details: Some(AdverseInfoDetails {
                    adverse_info_found: true,
                    notice_delivered: true,
                    summary: Some("2014 misdemeanor conviction".to_string()),
                }),
                ..TransitionPayload::default()
            },
        ),
        (
            WorkflowState::IndividualizedAssessment,
            WorkflowState::Denied,
            decision(
                FinalDecisionKind::Denied,
                vec![
                    Article23AFactor::BearingOnTenancy,
                    Article23AFactor::TimeElapsed,
                    Article23AFactor::Rehabilitation,
                ],
            ),
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use fair_chance_gate::config::PolicyConfig;

    #[test]
    fn scripted_paths_are_allowed_under_the_nyc_pack() {
        let (service, sink) = build_recording_service(&PolicyConfig::default()).expect("service builds");

        for (from, to, payload) in happy_path().into_iter().chain(adverse_path()) {
            let outcome = service
                .transition(&demo_transition("demo-test", from, to, payload))
                .expect("sink accepts evidence");
            assert!(outcome.allowed, "{from} -> {to} should be allowed");
        }

        let records = sink.records();
        assert_eq!(records.len(), 5);
        assert!(records
            .iter()
            .any(|record| record.response_window.map(|window| window.days_allowed) == Some(10)));
    }

    #[test]
    fn skipping_assessment_is_blocked_in_demo() {
        let (service, sink) = build_recording_service(&PolicyConfig::default()).expect("service builds");
        let outcome = service
            .transition(&demo_transition(
                "demo-test",
                WorkflowState::BackgroundCheckAllowed,
                WorkflowState::Denied,
                decision(FinalDecisionKind::Denied, Vec::new()),
            ))
            .expect("blocked transitions never touch the sink");

        assert!(!outcome.allowed);
        assert!(sink.records().is_empty());
    }

    #[test]
    fn verdict_includes_blocked_reason() {
        assert_eq!(verdict(true, None), "allowed");
        assert_eq!(verdict(false, Some("nope")), "blocked (nope)");
    }
}
