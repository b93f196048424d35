//! Shared cryptography utilities
//!
//! This crate provides the credential primitives used by the API server:
//! HS256 bearer tokens, payment-webhook signature checks, and password
//! hashing.

pub mod password;
pub mod tokens;
pub mod webhook;

pub use password::{hash_password, validate_password_strength, verify_password, PasswordError};
pub use tokens::{
    extract_bearer_token, generate_access_token, validate_access_token, AccessTokenClaims,
    TokenError,
};
pub use webhook::{
    sign_webhook_payload, verify_webhook_signature, WebhookError, WEBHOOK_TOLERANCE_SECS,
};
