//! `send-service-alert` binary entrypoint.
//!
//! Connection settings come from the environment (see `AlertsConfig`), the
//! alert itself from flags. Exits with 2 when a service could not be reached
//! and 1 on any other failure.

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use alerts_common::config::AlertsConfig;
use alerts_notifier::AlertDispatcher;

/// Exit status when the platform, token issuer or notification service
/// could not be reached.
const EXIT_UNREACHABLE: u8 = 2;

#[derive(Debug, Parser)]
#[command(name = "send-service-alert", about = "Send a service alert email to a platform space")]
struct Args {
    /// Name of the product raising the alert
    #[arg(long)]
    product: String,

    /// Email subject
    #[arg(long)]
    subject: String,

    /// Service instance ID (optional)
    #[arg(long = "service-instance", default_value = "")]
    service_instance: String,

    /// Email body content
    #[arg(long)]
    content: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "alerts_notifier=info,send_service_alert=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let config = AlertsConfig::from_env()?;
    let dispatcher = AlertDispatcher::new(config)?;

    match dispatcher
        .send_alert(
            &args.product,
            &args.subject,
            &args.service_instance,
            &args.content,
        )
        .await
    {
        Ok(()) => Ok(ExitCode::SUCCESS),
        Err(err) => {
            tracing::error!(error = %err, kind = ?err.kind(), "Failed to send service alert");
            match err.user_message() {
                Some(message) => {
                    tracing::error!("{message}");
                    Ok(ExitCode::from(EXIT_UNREACHABLE))
                }
                None => Ok(ExitCode::FAILURE),
            }
        }
    }
}
