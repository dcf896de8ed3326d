use axum::{
    body::Body,
    extract::FromRequestParts,
    http::{Request, request::Parts},
    response::{IntoResponse, Response},
};
use common::Identity;
use futures::future::BoxFuture;
use std::task::{Context, Poll};
use tower::{Layer, Service};
use tower_sessions::Session;
use tracing::{error, info, warn};

use crate::error::ApiError;

/// Session key under which the caller's identity is stored.
pub const IDENTITY_KEY: &str = "identity";

/// The caller's session together with the identity it carries, if any.
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub identity: Option<Identity>,
    pub session: Session,
}

impl AuthSession {
    fn new(session: Session, identity: Option<Identity>) -> Self {
        AuthSession { identity, session }
    }

    /// Binds `identity` to the session. The session id is cycled so a
    /// pre-login cookie never carries an authenticated identity.
    pub async fn login(&mut self, identity: Identity) -> Result<(), ApiError> {
        self.session.cycle_id().await?;
        self.session.insert(IDENTITY_KEY, &identity).await?;

        info!("User {} ({}) logged in", identity.username, identity.id);
        self.identity = Some(identity);
        Ok(())
    }

    pub async fn logout(&mut self) -> Result<(), ApiError> {
        if let Some(identity) = &self.identity {
            info!("Logging out user: {}", identity.username);
        }
        self.session.flush().await?;
        self.identity = None;
        Ok(())
    }
}

impl<S> FromRequestParts<S> for AuthSession
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts.extensions.get::<AuthSession>().cloned().ok_or_else(|| {
            ApiError::InternalFailure("cannot extract auth session, is AuthLayer enabled?".into())
        })
    }
}

/// Resolves the caller's identity from the session and exposes it to the
/// rest of the stack as an [`AuthSession`] extension. Never rejects; the
/// gate layers decide what an absent identity means.
#[derive(Clone, Default)]
pub struct AuthLayer {}

impl AuthLayer {
    pub fn new() -> Self {
        Self {}
    }
}

impl<S> Layer<S> for AuthLayer {
    type Service = AuthService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        AuthService { inner }
    }
}

#[derive(Clone)]
pub struct AuthService<S> {
    inner: S,
}

impl<S> Service<Request<Body>> for AuthService<S>
where
    S: Service<Request<Body>, Response = Response> + Clone + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut request: Request<Body>) -> Self::Future {
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);

        Box::pin(async move {
            let Some(session) = request.extensions().get::<Session>().cloned() else {
                error!("Session extension missing; SessionManagerLayer must wrap AuthLayer");
                return Ok(ApiError::InternalFailure("session layer missing".into()).into_response());
            };

            let identity = session
                .get::<Identity>(IDENTITY_KEY)
                .await
                .unwrap_or_else(|err| {
                    warn!("Failed to load identity from session: {}", err);
                    None
                });

            request
                .extensions_mut()
                .insert(AuthSession::new(session, identity));
            inner.call(request).await
        })
    }
}
