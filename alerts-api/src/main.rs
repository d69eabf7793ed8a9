use std::env;

use alerts_api::{config::ApiConfig, startup::Application};
use alerts_config::{load_config, shared::PgConnectionConfig};
use alerts_telemetry::tracing::init_tracing;
use anyhow::{Context, anyhow};
use tracing::{error, info};

/// Entry point for the alerts API service.
///
/// Runs the server without arguments, or applies migrations with `migrate`.
fn main() -> anyhow::Result<()> {
    let _log_flusher = init_tracing(env!("CARGO_BIN_NAME"))?;

    actix_web::rt::System::new().block_on(async_main())?;

    Ok(())
}

async fn async_main() -> anyhow::Result<()> {
    let args: Vec<String> = env::args().skip(1).collect();

    match args.as_slice() {
        [] => {
            let config = load_config::<ApiConfig>()
                .context("loading API configuration for server startup")?;
            log_pg_connection_config(&config.database);
            info!(
                max_requests = config.rate_limit.max_requests,
                window_ms = config.rate_limit.window_ms,
                "rate limit options"
            );

            let application = Application::build(config).await?;
            application.run_until_stopped().await?;
        }
        [command] if command == "migrate" => {
            let config = load_config::<ApiConfig>()
                .context("loading database configuration for migrations")?;
            log_pg_connection_config(&config.database);
            Application::migrate_database(config.database).await?;
            info!("database migrated successfully");
        }
        [command] => {
            error!(%command, "invalid command");
            return Err(anyhow!("invalid command: {command}"));
        }
        _ => {
            error!("invalid number of command line arguments");
            return Err(anyhow!("invalid number of command line arguments"));
        }
    }

    Ok(())
}

fn log_pg_connection_config(config: &PgConnectionConfig) {
    info!(
        host = config.host,
        port = config.port,
        dbname = config.name,
        username = config.username,
        tls_enabled = config.tls.enabled,
        "pg database options",
    );
}
