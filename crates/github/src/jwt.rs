use std::fmt;

use anyhow::Context;
use issue_bridge_core::{error::WorkflowError, models::AppIdentity};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use time::UtcDateTime;

/// Lifetime of an app credential. GitHub rejects anything longer than ten minutes.
pub const ASSERTION_TTL_SECS: i64 = 600;

#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    pub iat: i64,
    pub exp: i64,
    pub iss: String,
}

/// Signed app credential (RS256 JWT). Lives for one authentication attempt only.
pub struct SignedAssertion {
    pub claims: Claims,
    token: String,
}

impl SignedAssertion {
    pub fn token(&self) -> &str { &self.token }

    pub fn is_valid_at(&self, now: UtcDateTime) -> bool { now.unix_timestamp() < self.claims.exp }
}

impl fmt::Debug for SignedAssertion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignedAssertion")
            .field("claims", &self.claims)
            .field("token", &"***")
            .finish()
    }
}

pub fn sign(identity: &AppIdentity, now: UtcDateTime) -> Result<SignedAssertion, WorkflowError> {
    let key = EncodingKey::from_rsa_pem(identity.private_key.expose().as_bytes())
        .context("Invalid app private key")
        .map_err(WorkflowError::Signing)?;
    let iat = now.unix_timestamp();
    let claims = Claims { iat, exp: iat + ASSERTION_TTL_SECS, iss: identity.app_id.to_string() };
    let token = jsonwebtoken::encode(&Header::new(Algorithm::RS256), &claims, &key)
        .context("Failed to encode app credential")
        .map_err(WorkflowError::Signing)?;
    Ok(SignedAssertion { claims, token })
}

#[cfg(test)]
mod tests {
    use issue_bridge_core::secret::Secret;
    use jsonwebtoken::{DecodingKey, Validation};

    use super::*;
    use crate::test_support::{APP_ID, PUBLIC_KEY, identity};

    fn now() -> UtcDateTime { UtcDateTime::from_unix_timestamp(1_700_000_000).unwrap() }

    #[test]
    fn test_sign_claims() {
        let assertion = sign(&identity(), now()).unwrap();
        assert_eq!(assertion.claims.iat, 1_700_000_000);
        assert_eq!(assertion.claims.exp - assertion.claims.iat, ASSERTION_TTL_SECS);
        assert_eq!(assertion.claims.iss, APP_ID.to_string());
        assert!(assertion.is_valid_at(now()));
        assert!(!assertion.is_valid_at(now() + time::Duration::seconds(ASSERTION_TTL_SECS)));
    }

    #[test]
    fn test_signature_verifies_with_public_key() {
        let assertion = sign(&identity(), now()).unwrap();
        let mut validation = Validation::new(Algorithm::RS256);
        validation.validate_exp = false;
        validation.set_required_spec_claims(&["exp", "iss"]);
        validation.set_issuer(&[APP_ID.to_string()]);
        let key = DecodingKey::from_rsa_pem(PUBLIC_KEY.as_bytes()).unwrap();
        let decoded = jsonwebtoken::decode::<Claims>(assertion.token(), &key, &validation).unwrap();
        assert_eq!(decoded.header.alg, Algorithm::RS256);
        assert_eq!(decoded.claims, assertion.claims);
    }

    #[test]
    fn test_malformed_key() {
        let identity = AppIdentity { app_id: APP_ID, private_key: Secret::new("not a key") };
        let err = sign(&identity, now()).unwrap_err();
        assert!(matches!(err, WorkflowError::Signing(_)));
        assert!(err.to_string().contains("Invalid app private key"));
    }

    #[test]
    fn test_debug_hides_token() {
        let assertion = sign(&identity(), now()).unwrap();
        let debug = format!("{assertion:?}");
        assert!(!debug.contains(assertion.token()));
    }
}
