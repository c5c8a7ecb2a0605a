//! Caller identity supplied by the upstream identity provider.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use common::UserId;

use crate::error::ApiError;

/// Header carrying the authenticated user's id.
pub const USER_ID_HEADER: &str = "x-user-id";

/// The authenticated user making the request.
///
/// Authentication happens upstream; this only reads the verified id from
/// the `x-user-id` header. A missing or malformed id is rejected with 401.
#[derive(Debug, Clone, Copy)]
pub struct AuthenticatedUser(pub UserId);

impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let value = parts
            .headers
            .get(USER_ID_HEADER)
            .ok_or_else(|| ApiError::Unauthenticated(format!("missing {USER_ID_HEADER} header")))?;

        let user_id = value
            .to_str()
            .ok()
            .and_then(|s| s.trim().parse::<UserId>().ok())
            .ok_or_else(|| ApiError::Unauthenticated(format!("malformed {USER_ID_HEADER} header")))?;

        Ok(Self(user_id))
    }
}
