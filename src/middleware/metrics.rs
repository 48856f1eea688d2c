//! Request metrics middleware.

use crate::{services::AppMetrics, utils::route::extract_route_pattern};
use actix_web::{
    Error,
    dev::{Service, ServiceRequest, ServiceResponse, Transform, forward_ready},
    web,
};
use std::{
    future::{Ready, ready},
    pin::Pin,
    time::Instant,
};

/// Metrics middleware factory
///
/// Counts requests and observes their latency once the response is ready.
/// The route label is the matched resource pattern, read after routing, so
/// `/index.php/api/identity` style paths and unknown paths do not each open
/// a new series. Identity counters are recorded by the identity middleware.
pub struct MetricsMiddleware;

impl<S, B> Transform<S, ServiceRequest> for MetricsMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = MetricsService<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(MetricsService { service }))
    }
}

/// The actual metrics middleware service
pub struct MetricsService<S> {
    service: S,
}

impl<S, B> Service<ServiceRequest> for MetricsService<S>
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
        let start_time = Instant::now();
        let method = req.method().to_string();

        let fut = self.service.call(req);

        Box::pin(async move {
            let res = fut.await?;
            let status = res.status().as_u16();
            let duration = start_time.elapsed();
            let route = extract_route_pattern(res.request());

            if let Some(metrics) = res.request().app_data::<web::Data<AppMetrics>>() {
                metrics.record_request(&method, &route, status, duration);
                metrics.update_uptime();
            }

            Ok(res)
        })
    }
}
