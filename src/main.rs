use clap::Parser;
use mailcast::{telemetry, Application, Config};

/// Wait for shutdown signal (SIGTERM or Ctrl+C)
async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        signal::ctrl_c().await.expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, shutting down gracefully...");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, shutting down gracefully...");
        },
    }
}

/// Run the manual-send routine for one mailing and print the result.
async fn run_send(config: Config, mailing_id: mailcast::MailingId) -> anyhow::Result<()> {
    let pool = mailcast::setup_database(&config).await?;
    let email = std::sync::Arc::new(mailcast::email::EmailService::new(&config)?);
    let state = mailcast::AppState::builder()
        .db(pool.clone())
        .config(config)
        .email(email)
        .build();

    let result = mailcast::sender::send_mailing_manual(&state, mailing_id).await?;
    println!("{result}");

    pool.close().await;
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse CLI args
    let args = mailcast::config::Args::parse();

    // Load configuration
    let config = Config::load(&args)?;

    // If --validate flag is set, exit successfully after config validation
    if args.validate {
        println!("Configuration is valid.");
        return Ok(());
    }

    telemetry::init_telemetry()?;
    tracing::debug!("{:?}", args);

    if let Some(mailcast::config::Command::Send { mailing_id }) = args.command {
        return run_send(config, mailing_id).await;
    }

    // Run the application with graceful shutdown on SIGTERM/Ctrl+C
    let shutdown = shutdown_signal();
    Application::new(config).await?.serve(shutdown).await
}
