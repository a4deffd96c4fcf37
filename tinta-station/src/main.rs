use tinta_station::{Config, Server, init_logger_with_file, print_banner};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Environment (.env) and logging
    dotenv::dotenv().ok();
    let config = Config::from_env();
    init_logger_with_file(Some(&config.log_level), config.log_dir.as_deref());

    print_banner();
    tracing::info!("Tinta mixing station starting...");

    // 2. Bind the print listener and run until Ctrl-C
    if let Err(e) = Server::new(config).run().await {
        tracing::error!("Station error: {}", e);
        return Err(e.into());
    }

    Ok(())
}
