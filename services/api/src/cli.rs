use crate::demo::{run_check, run_demo, run_legacy_check, run_legacy_stage, run_transition};
use crate::infra::{parse_actor_type, parse_check_type, parse_stage, parse_state};
use crate::server;
use clap::{Args, Parser, Subcommand};
use fair_chance_gate::error::AppError;
use fair_chance_gate::workflows::fair_chance::{ActorType, CheckType, LegacyStage, WorkflowState};

#[derive(Parser, Debug)]
#[command(
    name = "Fair Chance Gate",
    about = "Evaluate fair chance housing compliance gates from the command line or over HTTP",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Evaluate whether a screening check may run
    Check(CheckArgs),
    /// Evaluate a workflow state transition
    Transition(TransitionArgs),
    /// Evaluate a background check using legacy stage names
    LegacyCheck(LegacyCheckArgs),
    /// Evaluate a stage change using legacy stage names
    LegacyStage(LegacyStageArgs),
    /// Walk the NYC happy path and adverse-finding path
    Demo,
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
}

#[derive(Args, Debug)]
pub(crate) struct CheckArgs {
    #[arg(long, default_value = "cli-application")]
    pub(crate) application_id: String,
    /// Market identifier (case-insensitive)
    #[arg(long)]
    pub(crate) market: String,
    /// Current workflow state, e.g. CONDITIONAL_OFFER
    #[arg(long, value_parser = parse_state)]
    pub(crate) state: WorkflowState,
    /// Screening operation, e.g. criminal_history
    #[arg(long, value_parser = parse_check_type)]
    pub(crate) check_type: CheckType,
    #[arg(long, default_value = "cli")]
    pub(crate) actor_id: String,
}

#[derive(Args, Debug)]
pub(crate) struct TransitionArgs {
    #[arg(long, default_value = "cli-application")]
    pub(crate) application_id: String,
    #[arg(long)]
    pub(crate) market: String,
    #[arg(long, value_parser = parse_state)]
    pub(crate) from: WorkflowState,
    #[arg(long, value_parser = parse_state)]
    pub(crate) to: WorkflowState,
    #[arg(long, default_value = "cli")]
    pub(crate) actor_id: String,
    #[arg(long, value_parser = parse_actor_type, default_value = "system")]
    pub(crate) actor_type: ActorType,
    /// Payload sections as camelCase JSON, e.g. '{"backgroundCheckAuthorization":{"authorizationSigned":true}}'
    #[arg(long)]
    pub(crate) payload: Option<String>,
}

#[derive(Args, Debug)]
pub(crate) struct LegacyCheckArgs {
    #[arg(long, default_value = "cli-application")]
    pub(crate) application_id: String,
    #[arg(long)]
    pub(crate) market: String,
    /// Legacy stage, e.g. application_review
    #[arg(long, value_parser = parse_stage)]
    pub(crate) stage: LegacyStage,
    #[arg(long, value_parser = parse_check_type)]
    pub(crate) check_type: CheckType,
}

#[derive(Args, Debug)]
pub(crate) struct LegacyStageArgs {
    #[arg(long, default_value = "cli-application")]
    pub(crate) application_id: String,
    #[arg(long)]
    pub(crate) market: String,
    #[arg(long, value_parser = parse_stage)]
    pub(crate) from: LegacyStage,
    #[arg(long, value_parser = parse_stage)]
    pub(crate) to: LegacyStage,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Check(args) => run_check(args),
        Command::Transition(args) => run_transition(args),
        Command::LegacyCheck(args) => run_legacy_check(args),
        Command::LegacyStage(args) => run_legacy_stage(args),
        Command::Demo => run_demo(),
    }
}
