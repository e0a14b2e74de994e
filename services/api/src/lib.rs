mod cli;
mod demo;
mod infra;
mod routes;
mod server;

use campaign_desk::error::AppError;

pub use infra::{AppState, InMemoryRoomFiles, LogNotifier, OutboxNotifier};
pub use routes::build_app;

pub async fn run() -> Result<(), AppError> {
    cli::run().await
}
