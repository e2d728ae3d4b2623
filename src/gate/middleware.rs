use axum::extract::Request;
use axum::response::{IntoResponse, Response};
use std::sync::Arc;
use tower::Layer;
use tower::Service;

use crate::authorizer::decision::MethodArn;
use crate::authorizer::orchestrator::Authorizer;
use super::error::GateRejection;
use super::extract::describe_request;

/// Middleware layer that requires an allowing decision covering the request
#[derive(Clone)]
pub struct RequireAccess {
    authorizer: Arc<Authorizer>,
    method_arn_prefix: Arc<String>,
}

impl RequireAccess {
    /// `method_arn_prefix` names the API stage the wrapped routes belong to
    pub fn new(authorizer: Arc<Authorizer>, method_arn_prefix: impl Into<String>) -> Self {
        Self {
            authorizer,
            method_arn_prefix: Arc::new(method_arn_prefix.into()),
        }
    }
}

impl<S> Layer<S> for RequireAccess {
    type Service = RequireAccessMiddleware<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RequireAccessMiddleware {
            inner,
            authorizer: self.authorizer.clone(),
            method_arn_prefix: self.method_arn_prefix.clone(),
        }
    }
}

#[derive(Clone)]
pub struct RequireAccessMiddleware<S> {
    inner: S,
    authorizer: Arc<Authorizer>,
    method_arn_prefix: Arc<String>,
}

impl<S> Service<Request> for RequireAccessMiddleware<S>
where
    S: Service<Request, Response = Response> + Clone + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = Response;
    type Error = S::Error;
    type Future = std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>> + Send>,
    >;

    fn poll_ready(
        &mut self,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut request: Request) -> Self::Future {
        // Take the service that was driven to readiness, leave a clone behind
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);
        let authorizer = self.authorizer.clone();
        let method_arn_prefix = self.method_arn_prefix.clone();

        Box::pin(async move {
            let description = describe_request(
                &method_arn_prefix,
                request.method(),
                request.uri().path(),
                request.headers(),
            );

            let decision = match authorizer.authorize(&description).await {
                Ok(decision) => decision,
                Err(_) => return Ok(GateRejection::Unauthorized.into_response()),
            };

            let permitted = MethodArn::parse(&description.method_arn)
                .map(|target| decision.permits(&target))
                .unwrap_or(false);
            if !permitted {
                tracing::warn!(
                    principal = %decision.principal_id,
                    method = %request.method(),
                    path = %request.uri().path(),
                    "Decision does not permit request"
                );
                return Ok(GateRejection::Forbidden(format!(
                    "{} {}",
                    request.method(),
                    request.uri().path()
                ))
                .into_response());
            }

            request.extensions_mut().insert(decision);
            inner.call(request).await
        })
    }
}
