//! Request identity middleware.
//!
//! Resolves the site URI, route path and client address once per request and
//! stores the resulting [`RequestIdentity`] in the request extensions, where
//! handlers and the other middleware read it.

use crate::{
    config::AppConfig,
    models::RequestIdentity,
    services::{AppMetrics, IpAddressDetector},
    utils::resolve_request_identity,
};
use actix_web::{
    Error, HttpMessage, HttpResponse,
    body::EitherBody,
    dev::{Service, ServiceRequest, ServiceResponse, Transform, forward_ready},
    web,
};
use std::{
    future::{Ready, ready},
    pin::Pin,
    rc::Rc,
};

/// Request identity middleware factory
#[derive(Clone)]
pub struct RequestIdentityMiddleware {
    config: Rc<AppConfig>,
    ip_detector: Rc<IpAddressDetector>,
}

impl RequestIdentityMiddleware {
    pub fn new(config: AppConfig, ip_detector: IpAddressDetector) -> Self {
        Self {
            config: Rc::new(config),
            ip_detector: Rc::new(ip_detector),
        }
    }
}

impl<S, B> Transform<S, ServiceRequest> for RequestIdentityMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type InitError = ();
    type Transform = RequestIdentityService<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(RequestIdentityService {
            service,
            config: self.config.clone(),
            ip_detector: self.ip_detector.clone(),
        }))
    }
}

/// The actual request identity middleware service
pub struct RequestIdentityService<S> {
    service: S,
    config: Rc<AppConfig>,
    ip_detector: Rc<IpAddressDetector>,
}

impl<S, B> Service<ServiceRequest> for RequestIdentityService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = Pin<Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>>>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let identity = match resolve_request_identity(req.request(), &self.config, &self.ip_detector) {
            Ok(identity) => identity,
            Err(e) => {
                tracing::warn!(
                    target: "request",
                    path = %req.path(),
                    error = %e,
                    configuration = e.is_configuration(),
                    "Failed to resolve request identity"
                );

                let response = HttpResponse::BadRequest()
                    .content_type("text/plain")
                    .body(e.to_string());
                return Box::pin(async move { Ok(req.into_response(response).map_into_right_body()) });
            }
        };

        if let Some(metrics) = req.app_data::<web::Data<AppMetrics>>() {
            metrics.record_identity(identity.detection_method, &identity.client_ip);
        }

        tracing::debug!(
            target: "request",
            uri = %identity.site_uri,
            route_path = %identity.route_path(),
            client_ip = %identity.client_ip(),
            client_ip_source = identity.client_ip.source(),
            "Resolved request identity"
        );

        req.extensions_mut().insert::<RequestIdentity>(identity);

        let fut = self.service.call(req);

        Box::pin(async move {
            let res = fut.await?;
            Ok(res.map_into_left_body())
        })
    }
}
