mod cli;
mod commands;
mod demo;
mod infra;
mod report;
mod routes;
mod server;

use wellbeing_monitor::error::AppError;

pub async fn run() -> Result<(), AppError> {
    cli::run().await
}
