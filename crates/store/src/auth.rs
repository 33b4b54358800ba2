//! Auth gateway: token → user resolution and premium entitlement.
//!
//! Session management itself is the identity provider's problem; this
//! client only asks "who is this token" and "are they premium".

use artio_core::types::UserId;
use async_trait::async_trait;
use serde::Deserialize;

use crate::backend::{Backend, StoreError};

/// The caller identity derived from a verified bearer token.
#[derive(Debug, Clone, Copy)]
pub struct AuthedUser {
    pub id: UserId,
}

#[async_trait]
pub trait AuthGateway: Send + Sync {
    /// Resolve a bearer token to its user. `Ok(None)` means the token
    /// is invalid or expired.
    async fn resolve_user(&self, bearer_token: &str) -> Result<Option<AuthedUser>, StoreError>;

    /// Whether the user currently holds a premium subscription.
    async fn is_premium(&self, user_id: UserId) -> Result<bool, StoreError>;
}

/// [`AuthGateway`] over the identity provider's user endpoint plus the
/// profiles table for the subscription flag.
pub struct HttpAuthGateway {
    backend: Backend,
}

impl HttpAuthGateway {
    pub fn new(backend: Backend) -> Self {
        Self { backend }
    }
}

#[derive(Deserialize)]
struct UserResponse {
    id: UserId,
}

#[derive(Deserialize)]
struct ProfileRow {
    is_premium: bool,
}

#[async_trait]
impl AuthGateway for HttpAuthGateway {
    async fn resolve_user(&self, bearer_token: &str) -> Result<Option<AuthedUser>, StoreError> {
        // The user token (not the service key) authenticates this call.
        let response = self
            .backend
            .http()
            .get(format!("{}/auth/v1/user", self.backend.base_url()))
            .header("apikey", self.backend.service_key())
            .bearer_auth(bearer_token)
            .send()
            .await?;

        if response.status() == reqwest::StatusCode::UNAUTHORIZED
            || response.status() == reqwest::StatusCode::FORBIDDEN
        {
            return Ok(None);
        }

        let response = Backend::ensure_success(response).await?;
        let user: UserResponse = Backend::decode(response).await?;
        Ok(Some(AuthedUser { id: user.id }))
    }

    async fn is_premium(&self, user_id: UserId) -> Result<bool, StoreError> {
        let response = self
            .backend
            .request(
                reqwest::Method::GET,
                &format!("/rest/v1/profiles?id=eq.{user_id}&select=is_premium"),
            )
            .send()
            .await?;

        let response = Backend::ensure_success(response).await?;
        let rows: Vec<ProfileRow> = Backend::decode(response).await?;
        // Missing profile row means no subscription.
        Ok(rows.first().map(|r| r.is_premium).unwrap_or(false))
    }
}
