//! Request ID middleware for tracing and logging.

use crate::telemetry::RequestLogFields;
use actix_web::{
    Error, HttpMessage,
    dev::{Service, ServiceRequest, ServiceResponse, Transform, forward_ready},
    http::header::{HeaderName, HeaderValue},
};
use std::{
    future::{Ready, ready},
    pin::Pin,
};
use uuid::Uuid;

/// Request ID middleware factory
///
/// This middleware ensures every request has a unique ID for tracing purposes.
/// It will use an existing X-Request-ID header if present, or generate a new UUID.
/// Log lines carry the resolved route path and client address, so it must run
/// inside the identity middleware.
pub struct RequestIdMiddleware;

impl<S, B> Transform<S, ServiceRequest> for RequestIdMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = RequestIdService<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(RequestIdService { service }))
    }
}

/// The actual request ID middleware service
pub struct RequestIdService<S> {
    service: S,
}

impl<S, B> Service<ServiceRequest> for RequestIdService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = Pin<Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>>>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let start_time = std::time::Instant::now();

        // Extract or generate Request ID
        let request_id = req
            .headers()
            .get("X-Request-ID")
            .and_then(|h| h.to_str().ok())
            .map(|s| s.to_string())
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        let fields = RequestLogFields::from_request(req.request());

        // Store Request ID in request extensions for potential use in handlers
        req.extensions_mut().insert(request_id.clone());

        tracing::info!(
            target: "request",
            request_id = %request_id,
            method = %fields.method,
            path = %fields.path,
            route_path = %fields.route_path,
            client_ip = %fields.client_ip,
            user_agent = ?fields.user_agent,
            "Incoming request"
        );

        let fut = self.service.call(req);

        Box::pin(async move {
            let mut res = fut.await?;
            let duration = start_time.elapsed();

            res.headers_mut().insert(
                HeaderName::from_static("x-request-id"),
                HeaderValue::from_str(&request_id)
                    .unwrap_or_else(|_| HeaderValue::from_static("invalid")),
            );

            tracing::info!(
                target: "request",
                request_id = %request_id,
                route_path = %fields.route_path,
                client_ip = %fields.client_ip,
                status = %res.status().as_u16(),
                duration_ms = %duration.as_millis(),
                "Request completed"
            );

            Ok(res)
        })
    }
}
