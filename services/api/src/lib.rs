mod cli;
mod demo;
mod infra;
mod routes;
mod server;

use fair_chance_gate::error::AppError;

pub async fn run() -> Result<(), AppError> {
    cli::run().await
}
