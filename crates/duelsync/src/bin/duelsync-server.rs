use duelsync::{telemetry, DuelsyncError, DuelsyncServer, ServerConfig};

#[tokio::main]
async fn main() -> Result<(), DuelsyncError> {
    telemetry::init();

    let config = ServerConfig::from_env()?;
    let server = DuelsyncServer::builder().config(config).build().await?;
    let services = std::sync::Arc::clone(server.services());

    tokio::select! {
        result = server.run() => result,
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("shutting down");
            services.relay.shutdown().await;
            Ok(())
        }
    }
}
