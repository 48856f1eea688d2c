//! Route pattern extraction utilities.

use actix_web::HttpRequest;

/// Label used for requests no resource matched
pub const UNMATCHED_ROUTE: &str = "unmatched";

/// Extract the registered resource pattern a request was routed to
///
/// Only meaningful once routing has happened, i.e. on the request of a
/// `ServiceResponse`. Label values stay bounded by the set of registered
/// resources: concrete paths and detected route paths are never used.
pub fn extract_route_pattern(req: &HttpRequest) -> String {
    req.match_pattern()
        .unwrap_or_else(|| UNMATCHED_ROUTE.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{App, HttpResponse, test, web};

    #[::core::prelude::v1::test]
    fn test_unrouted_request_is_unmatched() {
        let req = test::TestRequest::get().uri("/users/15").to_http_request();
        assert_eq!(extract_route_pattern(&req), UNMATCHED_ROUTE);
    }

    #[actix_web::test]
    async fn test_pattern_replaces_concrete_path() {
        let app = test::init_service(App::new().route(
            "/users/{id}",
            web::get().to(|req: HttpRequest| async move {
                HttpResponse::Ok().body(extract_route_pattern(&req))
            }),
        ))
        .await;

        let req = test::TestRequest::get().uri("/users/15").to_request();
        let body = test::call_and_read_body(&app, req).await;
        assert_eq!(body, "/users/{id}");
    }
}
