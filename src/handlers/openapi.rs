//! OpenAPI specification generation and app factory.

use crate::{
    config::{AppConfig, MetricsConfig, ProxyTable},
    handlers::{get_metrics, health, identity, version},
    middleware::{MetricsMiddleware, RequestIdMiddleware, RequestIdentityMiddleware},
    services::{AppMetrics, IpAddressDetector},
};
use actix_web::{App, body::MessageBody};
use paperclip::actix::{OpenApiExt, web};
use paperclip::v2::models::{DefaultApiRaw, Info};

/// Creates the shared OpenAPI specification for the API
pub fn create_openapi_spec() -> DefaultApiRaw {
    DefaultApiRaw {
        info: Info {
            title: "Request Identity API".into(),
            version: env!("CARGO_PKG_VERSION").into(),
            description: Some(
                "Resolves the identity of each request: the canonical URI, the route path the \
                router dispatches on, and the client IP address.\n\n\
                ## Route path detection\n\
                The route path excludes the base URL subfolder and the index page segment. \
                It is detected from the request target, the query string (`?/path` forwarding) \
                or the path info, as configured by `APP_URI_PROTOCOL`.\n\
                \n\
                ## Client IP resolution\n\
                Forwarding headers are honored only when the immediate peer matches an entry \
                of `APP_PROXY_IPS`, a mapping of address or CIDR block to header name:\n\
                ```json\n\
                {\"10.0.0.0/8\": \"X-Forwarded-For\", \"2001:db8::/64\": \"X-Real-IP\"}\n\
                ```\n\
                Malformed forwarded values are ignored and the peer address is used instead."
                    .into(),
            ),
            ..Default::default()
        },
        ..Default::default()
    }
}

/// Creates an app for the given site and proxy configuration
///
/// Every request passes through the identity middleware first, so request
/// logs and metrics see the resolved route path and client address.
///
/// # Panics
///
/// Panics if the Prometheus registry cannot be created.
pub fn create_app(
    config: AppConfig,
    proxies: ProxyTable,
) -> App<
    impl actix_web::dev::ServiceFactory<
        actix_web::dev::ServiceRequest,
        Config = (),
        Response = actix_web::dev::ServiceResponse<impl MessageBody>,
        Error = actix_web::Error,
        InitError = (),
    >,
> {
    let metrics_config = MetricsConfig::from_env();
    let metrics = AppMetrics::new().expect("Failed to create metrics");
    let identity_middleware = RequestIdentityMiddleware::new(config.clone(), IpAddressDetector::new(proxies));

    App::new()
        .wrap(RequestIdMiddleware)
        .wrap(MetricsMiddleware)
        .wrap(identity_middleware)
        .wrap_api_with_spec(create_openapi_spec())
        .app_data(web::Data::new(config))
        .app_data(web::Data::new(metrics_config))
        .app_data(web::Data::new(metrics))
        .service(web::resource("/api/health").route(web::get().to(health)))
        .service(web::resource("/api/version").route(web::get().to(version)))
        .service(web::resource("/api/identity").route(web::get().to(identity)))
        .service(web::resource("/api/metrics").route(web::get().to(get_metrics)))
        .with_json_spec_at("/api/spec/v2")
        .build()
}

/// Creates the app from environment configuration
///
/// # Panics
///
/// Panics when the site or proxy configuration is invalid; a misconfigured
/// base URL or proxy table must stop the service at startup.
pub fn create_base_app() -> App<
    impl actix_web::dev::ServiceFactory<
        actix_web::dev::ServiceRequest,
        Config = (),
        Response = actix_web::dev::ServiceResponse<impl MessageBody>,
        Error = actix_web::Error,
        InitError = (),
    >,
> {
    let config = AppConfig::from_env();
    if let Err(e) = config.validate() {
        panic!("Invalid site configuration: {e}");
    }
    let proxies = ProxyTable::from_env().unwrap_or_else(|e| panic!("Invalid proxy configuration: {e}"));

    create_app(config, proxies)
}
