//! # Messenger Relay
//!
//! Entry point of the Messenger webhook relay. Loads the configuration,
//! sets up logging and metrics, then serves the webhook routes and the
//! static assets referenced by the canned replies.

pub mod config;
pub mod consts;
pub mod errors;
pub mod metric;
pub mod services;
pub mod webhook;

use config::AppConfig;
use logfire::config::{MetricsOptions, SendToLogfire};
use ntex::web;
use openssl::ssl::{SslAcceptor, SslFiletype, SslMethod};
use webhook::messenger::client::GraphApiClient;

#[ntex::main]
async fn main() -> anyhow::Result<()> {
    // Missing or invalid configuration aborts startup
    let app_config = AppConfig::load()?;

    // Initialize logging and metrics
    let mut logfire_config = logfire::configure()
        .install_panic_handler()
        .with_metrics(Some(MetricsOptions::default()))
        .send_to_logfire(SendToLogfire::IfTokenPresent);
    if let Some(token) = &app_config.logfire_token {
        logfire_config = logfire_config.with_token(token);
    }
    let shutdown_handler = logfire_config.finish()?;

    let graph_client = GraphApiClient::new(&app_config)?;

    configure_and_run_server(app_config, graph_client).await?;

    shutdown_handler.shutdown()?;

    Ok(())
}

/// Configures SSL acceptor for production environments
fn setup_ssl_acceptor(app_config: &AppConfig) -> anyhow::Result<openssl::ssl::SslAcceptorBuilder> {
    let mut ssl_acceptor = SslAcceptor::mozilla_intermediate(SslMethod::tls_server())
        .map_err(|e| anyhow::anyhow!("Failed to create SSL acceptor: {}", e))?;

    ssl_acceptor
        .set_private_key_file(&app_config.private_key_path, SslFiletype::PEM)
        .map_err(|e| {
            anyhow::anyhow!(
                "Failed to load private key from {}: {}",
                app_config.private_key_path,
                e
            )
        })?;

    ssl_acceptor
        .set_certificate_file(&app_config.certificate_path, SslFiletype::PEM)
        .map_err(|e| {
            anyhow::anyhow!(
                "Failed to load certificate from {}: {}",
                app_config.certificate_path,
                e
            )
        })?;

    Ok(ssl_acceptor)
}

/// Configures and starts the web server with appropriate SSL settings
async fn configure_and_run_server(
    app_config: AppConfig,
    graph_client: GraphApiClient,
) -> anyhow::Result<()> {
    let server_addr = (app_config.web_server_host.clone(), app_config.web_server_port);
    let is_prod = app_config.is_prod();
    let ssl_acceptor = if is_prod {
        Some(setup_ssl_acceptor(&app_config)?)
    } else {
        None
    };

    logfire::info!(
        "Starting messenger relay on {host}:{port} (env={env})",
        host = server_addr.0.clone(),
        port = i64::from(server_addr.1),
        env = app_config.env.clone()
    );

    let server = web::server(move || {
        let assets_dir = app_config.assets_dir.clone();

        web::App::new()
            .wrap(web::middleware::Logger::default())
            .wrap(web::middleware::Compress::default())
            .state(webhook::AppState {
                config: app_config.clone(),
                sender: Box::new(graph_client.clone()),
            })
            .configure(webhook::routes::messenger)
            .service(ntex_files::Files::new("/assets", assets_dir))
            .default_service(web::route().to(webhook::routes::serve_not_found))
    });

    let bound_server = match ssl_acceptor {
        Some(ssl_acceptor) => server.bind_openssl(server_addr, ssl_acceptor)?,
        None => server.bind(server_addr)?,
    };

    bound_server
        .run()
        .await
        .map_err(|e| anyhow::anyhow!("Server error: {}", e))
}
