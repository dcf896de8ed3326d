use axum::{
    extract::Request,
    response::{IntoResponse, Response},
};
use common::Capability;
use futures::future::BoxFuture;
use std::task::{Context, Poll};
use tower::{Layer, Service};
use tracing::{debug, warn};

use crate::{error::ApiError, identity::AuthSession};

/// Rejects callers that are not authenticated, or that lack `capability`.
///
/// On success the caller's [`common::Identity`] is inserted as a request
/// extension for handlers to pick up with `Extension<Identity>`.
#[derive(Clone)]
pub struct RequireLayer {
    capability: Capability,
}

impl RequireLayer {
    pub fn new(capability: Capability) -> Self {
        Self { capability }
    }

    pub fn authenticated() -> Self {
        Self::new(Capability::TrackTime)
    }

    pub fn admin() -> Self {
        Self::new(Capability::Administer)
    }
}

impl<S> Layer<S> for RequireLayer {
    type Service = RequireService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RequireService {
            inner,
            capability: self.capability,
        }
    }
}

#[derive(Clone)]
pub struct RequireService<S> {
    inner: S,
    capability: Capability,
}

impl<S, B> Service<Request<B>> for RequireService<S>
where
    S: Service<Request<B>, Response = Response> + Clone + Send + 'static,
    S::Future: Send + 'static,
    B: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut request: Request<B>) -> Self::Future {
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);
        let capability = self.capability;

        Box::pin(async move {
            let identity = match request.extensions().get::<AuthSession>() {
                Some(auth) => auth.identity.clone(),
                None => {
                    return Ok(ApiError::InternalFailure(
                        "cannot extract auth session, is AuthLayer enabled?".into(),
                    )
                    .into_response());
                }
            };

            let Some(identity) = identity else {
                debug!("Unauthenticated request to {}", request.uri());
                return Ok(ApiError::Unauthenticated.into_response());
            };

            if !identity.can(capability) {
                warn!(
                    "User {} ({}) denied {:?} on {}",
                    identity.username,
                    identity.role,
                    capability,
                    request.uri()
                );
                return Ok(ApiError::Forbidden.into_response());
            }

            request.extensions_mut().insert(identity);
            inner.call(request).await
        })
    }
}
