use std::future::{Ready, ready};
use std::rc::Rc;
use std::sync::Arc;

use actix_web::{
    Error, HttpResponse,
    body::EitherBody,
    dev::{Service, ServiceRequest, ServiceResponse, Transform},
    http::header::{HeaderName, HeaderValue, RETRY_AFTER},
};
use alerts::rate_limit::{RateLimitResult, RateLimiter, get_client_ip};
use futures::future::LocalBoxFuture;
use futures::task::{Context, Poll};
use tracing::warn;

use crate::routes::ErrorMessage;

/// Response header carrying the configured request limit.
pub const RATE_LIMIT_LIMIT_HEADER: &str = "x-ratelimit-limit";

/// Response header carrying the requests left in the current window.
pub const RATE_LIMIT_REMAINING_HEADER: &str = "x-ratelimit-remaining";

/// Throttles requests per client address with a shared [`RateLimiter`].
///
/// The client is identified by `x-forwarded-for`, then `x-real-ip`. Requests over the
/// limit get a `429` with `Retry-After`; accepted ones carry the remaining allowance.
/// When the limiter itself fails the request is let through.
pub struct RateLimiting {
    limiter: Arc<RateLimiter>,
}

impl RateLimiting {
    pub fn new(limiter: Arc<RateLimiter>) -> Self {
        Self { limiter }
    }
}

impl<S, B> Transform<S, ServiceRequest> for RateLimiting
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Transform = RateLimitingMiddleware<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(RateLimitingMiddleware {
            service: Rc::new(service),
            limiter: self.limiter.clone(),
        }))
    }
}

pub struct RateLimitingMiddleware<S> {
    service: Rc<S>,
    limiter: Arc<RateLimiter>,
}

impl<S, B> Service<ServiceRequest> for RateLimitingMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.service.poll_ready(cx)
    }

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let client_ip = get_client_ip(|name| {
            req.headers()
                .get(name)
                .and_then(|value| value.to_str().ok())
        });
        let service = self.service.clone();
        let limiter = self.limiter.clone();

        Box::pin(async move {
            let result = match limiter.check(&client_ip).await {
                Ok(result) => Some(result),
                Err(err) => {
                    warn!(error = %err, %client_ip, "rate limit check failed, allowing request");
                    None
                }
            };

            if let Some(result) = result.filter(|result| !result.success) {
                warn!(
                    %client_ip,
                    path = req.path(),
                    retry_after_ms = result.retry_after_ms,
                    "rate limit exceeded"
                );

                let response = too_many_requests(&result);
                return Ok(req.into_response(response).map_into_right_body());
            }

            let mut response = service.call(req).await?;
            if let Some(result) = result {
                let headers = response.headers_mut();
                headers.insert(
                    HeaderName::from_static(RATE_LIMIT_LIMIT_HEADER),
                    HeaderValue::from(result.limit),
                );
                headers.insert(
                    HeaderName::from_static(RATE_LIMIT_REMAINING_HEADER),
                    HeaderValue::from(result.remaining),
                );
            }

            Ok(response.map_into_left_body())
        })
    }
}

fn too_many_requests(result: &RateLimitResult) -> HttpResponse {
    let retry_after = result.retry_after_secs().unwrap_or(1);

    HttpResponse::TooManyRequests()
        .insert_header((RETRY_AFTER, retry_after))
        .insert_header((RATE_LIMIT_LIMIT_HEADER, result.limit))
        .insert_header((RATE_LIMIT_REMAINING_HEADER, 0u32))
        .json(ErrorMessage {
            error: "Too many requests. Please try again later.".to_string(),
        })
}
