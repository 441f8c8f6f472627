use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "danmu-server")]
#[command(version = env!("DANMU_SERVER_VERSION"))]
#[command(about = "Fetches danmu overlays for an Emby library", long_about = None)]
struct Cli {
    /// Port to listen on
    #[arg(short, long, env = "DANMU_PORT", default_value = "3000")]
    port: u16,

    /// Host to bind to
    #[arg(long, env = "DANMU_HOST", default_value = "127.0.0.1")]
    host: String,

    /// Directory holding settings and the scraper cache
    #[arg(short, long, env = "DANMU_DATA_DIR", default_value = "data")]
    data_dir: PathBuf,

    /// Emby server base URL
    #[arg(long, env = "EMBY_URL", default_value = "http://127.0.0.1:8096")]
    emby_url: String,

    /// Emby API key
    #[arg(long, env = "EMBY_API_KEY", default_value = "")]
    emby_api_key: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();

    let addr: SocketAddr = format!("{}:{}", cli.host, cli.port).parse()?;
    if cli.emby_api_key.is_empty() {
        tracing::warn!("No Emby API key given, catalog requests will be rejected");
    }

    let config = server::Config::new(cli.data_dir, addr, cli.emby_url, cli.emby_api_key);
    server::run_server(config).await
}
