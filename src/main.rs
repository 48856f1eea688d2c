use actix_web::HttpServer;
use request_identity::{AppConfig, ProxyTable, TelemetryConfig, create_app, init_tracing};
use std::{env, io};

#[actix_web::main]
async fn main() -> io::Result<()> {
    let telemetry = TelemetryConfig::from_env();
    init_tracing(&telemetry).map_err(io::Error::other)?;

    // Configuration errors are fatal at startup
    let config = AppConfig::from_env();
    config.validate().map_err(io::Error::other)?;
    let proxies = ProxyTable::from_env().map_err(io::Error::other)?;

    let bind_address = env::var("APP_BIND_ADDRESS").unwrap_or_else(|_| "127.0.0.1:8080".to_string());

    tracing::info!(
        bind_address = %bind_address,
        base_url = %config.base_url,
        index_page = %config.index_page,
        uri_protocol = %config.uri_protocol,
        trusted_proxies = proxies.len(),
        "Starting server"
    );

    HttpServer::new(move || create_app(config.clone(), proxies.clone()))
        .bind(bind_address)?
        .run()
        .await
}
