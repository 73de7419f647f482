//! Authentication middleware and extractors.
//!
//! The server never issues tokens; it only verifies bearer JWTs minted by the
//! identity provider. Verification is a pure decode: HS256 signature plus
//! expiry check, yielding the user id from the `sub` claim.

use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts},
};
use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};

use bistro_core::UserId;

use crate::error::AppError;
use crate::state::AppState;

/// JWT claims carried by a bearer token.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// User id.
    pub sub: UserId,
    /// Expiry as a unix timestamp.
    pub exp: usize,
}

/// Extractor that requires a valid bearer token.
///
/// # Example
///
/// ```rust,ignore
/// async fn protected_handler(
///     RequireUser(user_id): RequireUser,
/// ) -> impl IntoResponse {
///     format!("Hello, {user_id}!")
/// }
/// ```
#[derive(Debug)]
pub struct RequireUser(pub UserId);

impl FromRequestParts<AppState> for RequireUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| AppError::Unauthorized("missing Authorization header".to_owned()))?;

        let token = header
            .strip_prefix("Bearer ")
            .ok_or_else(|| AppError::Unauthorized("malformed Authorization header".to_owned()))?;

        let user_id = verify_token(state.config().jwt_secret.expose_secret(), token)?;

        Ok(Self(user_id))
    }
}

/// Verify a bearer token and extract the user id.
///
/// # Errors
///
/// Returns `AppError::Unauthorized` if the signature is invalid, the token
/// is expired, or the claims are malformed.
pub fn verify_token(secret: &str, token: &str) -> Result<UserId, AppError> {
    let validation = Validation::new(Algorithm::HS256);

    let data = jsonwebtoken::decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map_err(|e| AppError::Unauthorized(format!("invalid token: {e}")))?;

    Ok(data.claims.sub)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use jsonwebtoken::{EncodingKey, Header};

    use super::*;

    const SECRET: &str = "test-signing-secret-0123456789abcdef";

    fn mint(secret: &str, exp_offset_secs: i64) -> (UserId, String) {
        let user_id = UserId::generate();
        let exp = usize::try_from(chrono::Utc::now().timestamp() + exp_offset_secs).unwrap();
        let claims = Claims { sub: user_id, exp };
        let token = jsonwebtoken::encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap();
        (user_id, token)
    }

    #[test]
    fn test_valid_token_round_trip() {
        let (user_id, token) = mint(SECRET, 3600);
        assert_eq!(verify_token(SECRET, &token).unwrap(), user_id);
    }

    #[test]
    fn test_expired_token_rejected() {
        let (_, token) = mint(SECRET, -3600);
        assert!(matches!(
            verify_token(SECRET, &token),
            Err(AppError::Unauthorized(_))
        ));
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let (_, token) = mint(SECRET, 3600);
        assert!(matches!(
            verify_token("some-other-secret-0123456789abcdef", &token),
            Err(AppError::Unauthorized(_))
        ));
    }

    #[test]
    fn test_garbage_rejected() {
        assert!(verify_token(SECRET, "not-a-jwt").is_err());
    }
}
