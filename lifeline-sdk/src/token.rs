//! Bearer-token issuance and verification.
//!
//! Every authenticated Lifeline API call carries a signed bearer token:
//!
//! ```text
//! Authorization: Bearer {base64_claims}.{base64_signature}
//! ```
//!
//! The signature is `HMAC-SHA256(base64_claims, server_secret)` and the
//! claims are a JSON object `{sub, role, iss, aud, iat, exp}`. The
//! algorithm is fixed: nothing unsigned or differently-signed is ever
//! accepted.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::objects::auth::Role;

/// The only signature algorithm tokens are ever signed or verified with.
pub const SIGNING_ALGORITHM: &str = "HMAC-SHA256";

/// Issuer claim stamped into and required of every token.
pub const TOKEN_ISSUER: &str = "lifeline";

/// Audience claim stamped into and required of every token.
pub const TOKEN_AUDIENCE: &str = "lifeline-clients";

/// Token lifetime: 24 hours from issuance.
pub const TOKEN_TTL_SECONDS: i64 = 24 * 60 * 60;

/// Claims carried by a bearer token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessClaims {
    /// Subject: the account id.
    pub sub: Uuid,
    pub role: Role,
    pub iss: String,
    pub aud: String,
    /// Issued-at, unix seconds.
    pub iat: i64,
    /// Expiry, unix seconds.
    pub exp: i64,
}

/// Errors produced by token operations.
#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("empty subject or signing key")]
    EmptyInput,
    #[error("malformed token")]
    Malformed,
    #[error("invalid base64 encoding")]
    InvalidBase64,
    #[error("invalid claims json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("signature mismatch")]
    SignatureMismatch,
    #[error("token expired")]
    Expired,
    #[error("issuer or audience mismatch")]
    ClaimMismatch,
}

impl From<ring::error::Unspecified> for TokenError {
    fn from(_: ring::error::Unspecified) -> Self {
        Self::SignatureMismatch
    }
}

/// Issue a token for `account_id` acting as `role`, valid for
/// [`TOKEN_TTL_SECONDS`].
///
/// Fails with [`TokenError::EmptyInput`] on a nil account id or an empty
/// signing key.
pub fn issue_token(account_id: Uuid, role: Role, key: &[u8]) -> Result<String, TokenError> {
    if account_id.is_nil() || key.is_empty() {
        return Err(TokenError::EmptyInput);
    }
    let now = time::OffsetDateTime::now_utc().unix_timestamp();
    let claims = AccessClaims {
        sub: account_id,
        role,
        iss: TOKEN_ISSUER.to_owned(),
        aud: TOKEN_AUDIENCE.to_owned(),
        iat: now,
        exp: now + TOKEN_TTL_SECONDS,
    };
    sign_claims(&claims, key)
}

/// Encode and sign a claims object into `{payload}.{signature}` form.
pub fn sign_claims(claims: &AccessClaims, key: &[u8]) -> Result<String, TokenError> {
    if key.is_empty() {
        return Err(TokenError::EmptyInput);
    }
    let json = serde_json::to_string(claims)?;
    let payload = fast32::base64::RFC4648_NOPAD.encode(json.as_bytes());
    let signature = ring::hmac::sign(
        &ring::hmac::Key::new(ring::hmac::HMAC_SHA256, key),
        payload.as_bytes(),
    );
    let signature = fast32::base64::RFC4648_NOPAD.encode(signature.as_ref());
    Ok(format!("{payload}.{signature}"))
}

/// Verify a token's signature, freshness, and issuer/audience claims,
/// returning the authenticated claims.
///
/// The HMAC is checked before the payload is even parsed, so a forged
/// token never reaches the JSON layer.
pub fn verify_token(token: &str, key: &[u8]) -> Result<AccessClaims, TokenError> {
    let dot_pos = token.find('.').ok_or(TokenError::Malformed)?;
    let payload = &token[..dot_pos];
    let signature = fast32::base64::RFC4648_NOPAD
        .decode_str(&token[dot_pos + 1..])
        .map_err(|_| TokenError::InvalidBase64)?;

    ring::hmac::verify(
        &ring::hmac::Key::new(ring::hmac::HMAC_SHA256, key),
        payload.as_bytes(),
        &signature,
    )?;

    let claims_json = fast32::base64::RFC4648_NOPAD
        .decode_str(payload)
        .map_err(|_| TokenError::InvalidBase64)?;
    let claims: AccessClaims = serde_json::from_slice(&claims_json)?;

    if claims.iss != TOKEN_ISSUER || claims.aud != TOKEN_AUDIENCE {
        return Err(TokenError::ClaimMismatch);
    }
    if time::OffsetDateTime::now_utc().unix_timestamp() >= claims.exp {
        return Err(TokenError::Expired);
    }
    Ok(claims)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    const KEY: &[u8] = b"test-signing-key-0123456789abcdef";

    #[test]
    fn round_trip_preserves_subject_and_role() {
        let id = Uuid::new_v4();
        let token = issue_token(id, Role::Driver, KEY).unwrap();
        let claims = verify_token(&token, KEY).unwrap();
        assert_eq!(claims.sub, id);
        assert_eq!(claims.role, Role::Driver);
        assert_eq!(claims.exp - claims.iat, TOKEN_TTL_SECONDS);
    }

    #[test]
    fn nil_subject_and_empty_key_are_rejected() {
        assert!(matches!(
            issue_token(Uuid::nil(), Role::Donor, KEY),
            Err(TokenError::EmptyInput)
        ));
        assert!(matches!(
            issue_token(Uuid::new_v4(), Role::Donor, b""),
            Err(TokenError::EmptyInput)
        ));
    }

    #[test]
    fn tampered_payload_fails_signature_check() {
        let token = issue_token(Uuid::new_v4(), Role::Patient, KEY).unwrap();
        let dot = token.find('.').unwrap();
        let forged_claims = fast32::base64::RFC4648_NOPAD.encode(b"{\"sub\":\"x\"}");
        let forged = format!("{forged_claims}{}", &token[dot..]);
        assert!(matches!(
            verify_token(&forged, KEY),
            Err(TokenError::SignatureMismatch)
        ));
    }

    #[test]
    fn wrong_key_fails_signature_check() {
        let token = issue_token(Uuid::new_v4(), Role::Patient, KEY).unwrap();
        assert!(matches!(
            verify_token(&token, b"some-other-key"),
            Err(TokenError::SignatureMismatch)
        ));
    }

    #[test]
    fn expired_token_is_rejected() {
        let now = time::OffsetDateTime::now_utc().unix_timestamp();
        let claims = AccessClaims {
            sub: Uuid::new_v4(),
            role: Role::Donor,
            iss: TOKEN_ISSUER.to_owned(),
            aud: TOKEN_AUDIENCE.to_owned(),
            iat: now - TOKEN_TTL_SECONDS - 10,
            exp: now - 10,
        };
        let token = sign_claims(&claims, KEY).unwrap();
        assert!(matches!(verify_token(&token, KEY), Err(TokenError::Expired)));
    }

    #[test]
    fn issuer_and_audience_are_enforced() {
        let now = time::OffsetDateTime::now_utc().unix_timestamp();
        let claims = AccessClaims {
            sub: Uuid::new_v4(),
            role: Role::Donor,
            iss: "someone-else".to_owned(),
            aud: TOKEN_AUDIENCE.to_owned(),
            iat: now,
            exp: now + 60,
        };
        let token = sign_claims(&claims, KEY).unwrap();
        assert!(matches!(
            verify_token(&token, KEY),
            Err(TokenError::ClaimMismatch)
        ));
    }

    #[test]
    fn garbage_is_malformed() {
        assert!(matches!(
            verify_token("not-a-token", KEY),
            Err(TokenError::Malformed)
        ));
        assert!(matches!(
            verify_token("abc.###", KEY),
            Err(TokenError::InvalidBase64)
        ));
    }
}
