//! Request identity endpoint handler.

use crate::models::{IdentityResponse, RequestIdentity};
use actix_web::{Error, HttpMessage, HttpRequest, Result, web};
use paperclip::actix::api_v2_operation;

/// Request identity endpoint
///
/// Echoes the identity resolved for this request: the canonical URI, the
/// route path the router sees and the client address.
#[api_v2_operation(
    summary = "Request Identity Endpoint",
    description = "Returns the resolved URI, route path and client IP address of the current request.",
    tags("Identity"),
    responses(
        (status = 200, description = "Successful response", body = IdentityResponse),
        (status = 400, description = "The request URI could not be resolved"),
        (status = 500, description = "Identity middleware is not installed")
    )
)]
pub async fn identity(req: HttpRequest) -> Result<web::Json<IdentityResponse>, Error> {
    let extensions = req.extensions();
    let identity = extensions.get::<RequestIdentity>().ok_or_else(|| {
        actix_web::error::ErrorInternalServerError("Request identity was not resolved")
    })?;

    Ok(web::Json(IdentityResponse::from(identity)))
}
