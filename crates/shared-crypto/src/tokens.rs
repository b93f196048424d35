//! Bearer token generation and validation
//!
//! HS256 JWTs signed with the server secret. Implemented directly on
//! `hmac` + `sha2` so the same code runs in every deployment target.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use hmac::{Hmac, Mac};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use sha2::Sha256;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

/// Access token expiry in seconds (7 days)
pub const ACCESS_TOKEN_EXPIRY: u64 = 7 * 24 * 60 * 60;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenError {
    #[error("Invalid token format")]
    Format,

    #[error("Invalid token encoding")]
    Encoding,

    #[error("Invalid token signature")]
    Signature,

    #[error("Unsupported algorithm")]
    Algorithm,

    #[error("Token expired")]
    Expired,

    #[error("Failed to encode token: {0}")]
    Encode(String),
}

/// JWT Header for HS256
#[derive(Debug, Serialize, Deserialize)]
struct JwtHeader {
    alg: String,
    typ: String,
}

impl Default for JwtHeader {
    fn default() -> Self {
        Self {
            alg: "HS256".to_string(),
            typ: "JWT".to_string(),
        }
    }
}

/// JWT claims for access token
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccessTokenClaims {
    /// Subject (user ID)
    pub sub: String,
    pub email: String,
    /// `client`, `attorney` or `admin`
    pub role: String,
    /// Issued at (Unix timestamp)
    pub iat: u64,
    /// Expiration (Unix timestamp)
    pub exp: u64,
}

fn mac_for(secret: &str) -> Result<HmacSha256, TokenError> {
    HmacSha256::new_from_slice(secret.as_bytes()).map_err(|e| TokenError::Encode(e.to_string()))
}

fn encode_jwt<T: Serialize>(claims: &T, secret: &str) -> Result<String, TokenError> {
    let header_json =
        serde_json::to_string(&JwtHeader::default()).map_err(|e| TokenError::Encode(e.to_string()))?;
    let payload_json =
        serde_json::to_string(claims).map_err(|e| TokenError::Encode(e.to_string()))?;

    let signing_input = format!(
        "{}.{}",
        URL_SAFE_NO_PAD.encode(header_json.as_bytes()),
        URL_SAFE_NO_PAD.encode(payload_json.as_bytes())
    );

    let mut mac = mac_for(secret)?;
    mac.update(signing_input.as_bytes());
    let signature_b64 = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());

    Ok(format!("{}.{}", signing_input, signature_b64))
}

fn decode_jwt<T: DeserializeOwned>(token: &str, secret: &str) -> Result<T, TokenError> {
    let parts: Vec<&str> = token.split('.').collect();
    let [header_b64, payload_b64, signature_b64] = parts[..] else {
        return Err(TokenError::Format);
    };

    let signing_input = format!("{}.{}", header_b64, payload_b64);
    let mut mac = mac_for(secret)?;
    mac.update(signing_input.as_bytes());

    let signature = URL_SAFE_NO_PAD
        .decode(signature_b64)
        .map_err(|_| TokenError::Encoding)?;
    mac.verify_slice(&signature)
        .map_err(|_| TokenError::Signature)?;

    let header_bytes = URL_SAFE_NO_PAD
        .decode(header_b64)
        .map_err(|_| TokenError::Encoding)?;
    let header: JwtHeader = serde_json::from_slice(&header_bytes).map_err(|_| TokenError::Format)?;
    if header.alg != "HS256" {
        return Err(TokenError::Algorithm);
    }

    let payload_bytes = URL_SAFE_NO_PAD
        .decode(payload_b64)
        .map_err(|_| TokenError::Encoding)?;
    serde_json::from_slice(&payload_bytes).map_err(|_| TokenError::Format)
}

/// Generate an access token valid for [`ACCESS_TOKEN_EXPIRY`] seconds
pub fn generate_access_token(
    user_id: &str,
    email: &str,
    role: &str,
    secret: &str,
) -> Result<String, TokenError> {
    let now = chrono::Utc::now().timestamp() as u64;
    let claims = AccessTokenClaims {
        sub: user_id.to_string(),
        email: email.to_string(),
        role: role.to_string(),
        iat: now,
        exp: now + ACCESS_TOKEN_EXPIRY,
    };
    encode_jwt(&claims, secret)
}

/// Validate an access token and extract claims
pub fn validate_access_token(token: &str, secret: &str) -> Result<AccessTokenClaims, TokenError> {
    let claims: AccessTokenClaims = decode_jwt(token, secret)?;
    let now = chrono::Utc::now().timestamp() as u64;
    if claims.exp < now {
        return Err(TokenError::Expired);
    }
    Ok(claims)
}

/// Extract the token from an `Authorization: Bearer <token>` header value
pub fn extract_bearer_token(auth_header: Option<&str>) -> Option<&str> {
    auth_header
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_SECRET: &str = "test-secret-key-at-least-32-bytes-long";

    #[test]
    fn test_access_token_generation_and_validation() {
        let token =
            generate_access_token("user-123", "test@example.com", "client", TEST_SECRET).unwrap();
        let claims = validate_access_token(&token, TEST_SECRET).unwrap();

        assert_eq!(claims.sub, "user-123");
        assert_eq!(claims.email, "test@example.com");
        assert_eq!(claims.role, "client");
        assert_eq!(claims.exp - claims.iat, ACCESS_TOKEN_EXPIRY);
    }

    #[test]
    fn test_invalid_token() {
        assert_eq!(
            validate_access_token("invalid-token", TEST_SECRET),
            Err(TokenError::Format)
        );
    }

    #[test]
    fn test_wrong_secret() {
        let token =
            generate_access_token("user-123", "test@example.com", "client", TEST_SECRET).unwrap();
        assert_eq!(
            validate_access_token(&token, "wrong-secret"),
            Err(TokenError::Signature)
        );
    }

    #[test]
    fn test_tampered_payload_is_rejected() {
        let token =
            generate_access_token("user-123", "test@example.com", "client", TEST_SECRET).unwrap();
        let parts: Vec<&str> = token.split('.').collect();
        let forged_claims = AccessTokenClaims {
            sub: "user-123".to_string(),
            email: "test@example.com".to_string(),
            role: "admin".to_string(),
            iat: 0,
            exp: u64::MAX,
        };
        let forged_payload =
            URL_SAFE_NO_PAD.encode(serde_json::to_vec(&forged_claims).unwrap());
        let forged = format!("{}.{}.{}", parts[0], forged_payload, parts[2]);
        assert_eq!(
            validate_access_token(&forged, TEST_SECRET),
            Err(TokenError::Signature)
        );
    }

    #[test]
    fn test_expired_token() {
        let claims = AccessTokenClaims {
            sub: "user-123".to_string(),
            email: "test@example.com".to_string(),
            role: "client".to_string(),
            iat: 1,
            exp: 2,
        };
        let token = encode_jwt(&claims, TEST_SECRET).unwrap();
        assert_eq!(
            validate_access_token(&token, TEST_SECRET),
            Err(TokenError::Expired)
        );
    }

    #[test]
    fn test_extract_bearer_token() {
        assert_eq!(extract_bearer_token(Some("Bearer abc123")), Some("abc123"));
        assert_eq!(extract_bearer_token(Some("Bearer ")), None);
        assert_eq!(extract_bearer_token(Some("abc123")), None);
        assert_eq!(extract_bearer_token(None), None);
    }

    #[test]
    fn test_jwt_format() {
        let token =
            generate_access_token("user-123", "test@example.com", "client", TEST_SECRET).unwrap();
        let parts: Vec<&str> = token.split('.').collect();
        assert_eq!(parts.len(), 3);

        let header_bytes = URL_SAFE_NO_PAD.decode(parts[0]).unwrap();
        let header: JwtHeader = serde_json::from_slice(&header_bytes).unwrap();
        assert_eq!(header.alg, "HS256");
        assert_eq!(header.typ, "JWT");
    }
}
