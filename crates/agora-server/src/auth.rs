//! Bearer token verification (HS256 JWT).
//!
//! Tokens carry the user's hex id in an `id` claim and must expire: a token
//! without `exp` is rejected.

use agora_shared::UserId;
use axum::http::HeaderMap;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

use crate::error::ServerError;

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<u64>,
}

#[derive(Clone)]
pub struct TokenVerifier {
    key: DecodingKey,
    validation: Validation,
}

impl TokenVerifier {
    pub fn new(secret: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_required_spec_claims(&["exp"]);
        Self {
            key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }

    /// Decode `token` and return the user it was issued to.
    pub fn verify(&self, token: &str) -> Result<UserId, ServerError> {
        let data = decode::<Claims>(token, &self.key, &self.validation)
            .map_err(|e| ServerError::Unauthorized(format!("invalid token: {e}")))?;
        UserId::from_hex(&data.claims.id)
            .map_err(|e| ServerError::Unauthorized(format!("invalid token subject: {e}")))
    }

    /// Verify `token` and require it to belong to `user`.
    pub fn verify_for(&self, token: Option<&str>, user: UserId) -> Result<(), ServerError> {
        let token = token.ok_or_else(|| ServerError::Unauthorized("missing token".into()))?;
        let subject = self.verify(token)?;
        if subject != user {
            return Err(ServerError::Unauthorized(
                "token does not match userID".into(),
            ));
        }
        Ok(())
    }
}

/// Token from an `Authorization: Bearer ...` header.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use jsonwebtoken::{encode, EncodingKey, Header};

    const SECRET: &str = "test-secret";

    fn in_an_hour() -> Option<u64> {
        Some(jsonwebtoken::get_current_timestamp() + 3600)
    }

    fn token_for(id: &str, secret: &str, exp: Option<u64>) -> String {
        encode(
            &Header::new(Algorithm::HS256),
            &Claims {
                id: id.to_string(),
                exp,
            },
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    #[test]
    fn accepts_matching_token() {
        let verifier = TokenVerifier::new(SECRET);
        let user = UserId::new();
        let token = token_for(&user.to_hex(), SECRET, in_an_hour());

        assert_eq!(verifier.verify(&token).unwrap(), user);
        assert!(verifier.verify_for(Some(&token), user).is_ok());
    }

    #[test]
    fn rejects_other_users_token() {
        let verifier = TokenVerifier::new(SECRET);
        let token = token_for(&UserId::new().to_hex(), SECRET, in_an_hour());
        assert!(matches!(
            verifier.verify_for(Some(&token), UserId::new()),
            Err(ServerError::Unauthorized(_))
        ));
    }

    #[test]
    fn rejects_forged_and_missing_tokens() {
        let verifier = TokenVerifier::new(SECRET);
        let user = UserId::new();
        let forged = token_for(&user.to_hex(), "wrong-secret", in_an_hour());

        assert!(verifier.verify(&forged).is_err());
        assert!(verifier.verify("garbage").is_err());
        assert!(verifier.verify_for(None, user).is_err());
    }

    #[test]
    fn rejects_expired_token() {
        let verifier = TokenVerifier::new(SECRET);
        let user = UserId::new();
        let expired = token_for(&user.to_hex(), SECRET, Some(1_000));
        assert!(verifier.verify(&expired).is_err());
    }

    #[test]
    fn rejects_token_without_expiry() {
        let verifier = TokenVerifier::new(SECRET);
        let user = UserId::new();
        let forever = token_for(&user.to_hex(), SECRET, None);
        assert!(matches!(
            verifier.verify(&forever),
            Err(ServerError::Unauthorized(_))
        ));
        assert!(verifier.verify_for(Some(&forever), user).is_err());
    }

    #[test]
    fn rejects_non_hex_subject() {
        let verifier = TokenVerifier::new(SECRET);
        let token = token_for("not-an-id", SECRET, in_an_hour());
        assert!(verifier.verify(&token).is_err());
    }

    #[test]
    fn reads_bearer_header() {
        let mut headers = HeaderMap::new();
        assert_eq!(bearer_token(&headers), None);

        headers.insert("authorization", HeaderValue::from_static("Bearer abc.def"));
        assert_eq!(bearer_token(&headers), Some("abc.def"));

        headers.insert("authorization", HeaderValue::from_static("Basic xyz"));
        assert_eq!(bearer_token(&headers), None);
    }
}
