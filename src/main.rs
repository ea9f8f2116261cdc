use clap::Parser;
use std::net::SocketAddr;
use std::sync::Arc;
use texweave::cli::Cli;
use texweave::config::Settings;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let settings = Settings::new_with_cli(&cli)?;
    let host = settings.server.host.clone();
    let port = settings.server.port;

    info!("Starting TeXWeave orchestration server on {}:{}", host, port);

    let app = texweave::create_app(Arc::new(settings));

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    info!("Listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
