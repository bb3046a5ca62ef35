use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Init logging
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap();
    fmt().with_env_filter(filter).init();

    // Startup banner at info level so something always prints at default verbosity
    let rust_log = std::env::var("RUST_LOG").unwrap_or_else(|_| "<unset>".to_string());
    let http_port: u16 = std::env::var("BRICKLINE_HTTP_PORT")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(7878);
    let data_folder = std::env::var("BRICKLINE_DATA_FOLDER").unwrap_or_else(|_| "data".to_string());
    let media_folder = std::env::var("BRICKLINE_MEDIA_FOLDER").unwrap_or_else(|_| format!("{data_folder}/media"));
    let max_upload_bytes = std::env::var("BRICKLINE_UPLOAD_MAX_MB")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(|mb| mb * 1024 * 1024)
        .unwrap_or(brickline::assets::DEFAULT_MAX_UPLOAD_BYTES);
    info!(
        target: "brickline",
        "brickline starting: RUST_LOG='{}', http_port={}, data_folder='{}', media_folder='{}', max_upload_bytes={}",
        rust_log, http_port, data_folder, media_folder, max_upload_bytes
    );

    brickline::server::run_with_ports(http_port, &data_folder, &media_folder, max_upload_bytes).await
}
