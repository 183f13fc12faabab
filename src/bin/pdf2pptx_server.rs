//! HTTP service for PDF to PowerPoint conversion

use pdf_to_pptx::server::{serve, ServerConfig};

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = ServerConfig::from_env();
    if let Err(e) = serve(config).await {
        log::error!("server error: {}", e);
        std::process::exit(1);
    }
}
