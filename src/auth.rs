use std::{collections::HashSet, fmt, path::Path, sync::Arc};

use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts},
};
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use serde::Deserialize;
use thiserror::Error;

use crate::error::AppError;

/// Claims
///
/// The only payload field this service relies on. Registered claims (`exp`, `nbf`)
/// are validated by `jsonwebtoken` itself when present; everything else is ignored.
#[derive(Debug, Deserialize)]
pub struct Claims {
    pub user_id: Option<String>,
}

/// AuthIdentity
///
/// The verified caller: the `user_id` claim copied verbatim from a token whose
/// signature checked out. Carries no roles; those live in the identity service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthIdentity {
    pub user_id: String,
}

/// BearerToken
///
/// The caller's original `Authorization` header value, kept so it can be forwarded
/// to the identity service. Redacted in debug output.
#[derive(Clone, PartialEq, Eq)]
pub struct BearerToken(String);

impl BearerToken {
    pub fn new(header_value: impl Into<String>) -> Self {
        Self(header_value.into())
    }

    /// The full header value, including the `Bearer ` prefix.
    pub fn header_value(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for BearerToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("BearerToken(<redacted>)")
    }
}

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("missing authorization header")]
    MissingHeader,

    #[error("authorization header is not a bearer token")]
    NotBearer,

    #[error("token rejected: {0}")]
    Rejected(jsonwebtoken::errors::Error),

    #[error("token carries no user_id claim")]
    MissingUserId,

    #[error("{0:?} is not an asymmetric signature algorithm")]
    UnsupportedAlgorithm(Algorithm),

    #[error("cannot read verification key {path}: {source}")]
    KeyFile {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid verification key: {0}")]
    InvalidKey(jsonwebtoken::errors::Error),
}

/// TokenVerifier
///
/// Stateless bearer-token verification against a public key loaded once at startup.
/// Only the configured asymmetric algorithm is accepted, which rules out `none` and
/// HMAC tokens (including ones "signed" with the public key as an HMAC secret).
pub struct TokenVerifier {
    key: DecodingKey,
    validation: Validation,
}

impl TokenVerifier {
    /// Builds a verifier from a PEM-encoded public key.
    pub fn from_pem(algorithm: Algorithm, pem: &[u8]) -> Result<Self, TokenError> {
        let key = match algorithm {
            Algorithm::ES256 | Algorithm::ES384 => DecodingKey::from_ec_pem(pem),
            Algorithm::RS256
            | Algorithm::RS384
            | Algorithm::RS512
            | Algorithm::PS256
            | Algorithm::PS384
            | Algorithm::PS512 => DecodingKey::from_rsa_pem(pem),
            Algorithm::EdDSA => DecodingKey::from_ed_pem(pem),
            other => return Err(TokenError::UnsupportedAlgorithm(other)),
        }
        .map_err(TokenError::InvalidKey)?;

        let mut validation = Validation::new(algorithm);
        // exp/nbf are checked when present but not required.
        validation.required_spec_claims = HashSet::new();
        validation.validate_exp = true;
        validation.validate_nbf = true;
        validation.validate_aud = false;

        Ok(Self { key, validation })
    }

    /// Reads the PEM file at `path`. Called once at process start; failure is fatal there.
    pub fn from_file(algorithm: Algorithm, path: impl AsRef<Path>) -> Result<Self, TokenError> {
        let path = path.as_ref();
        let pem = std::fs::read(path).map_err(|source| TokenError::KeyFile {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_pem(algorithm, &pem)
    }

    /// verify
    ///
    /// Checks a raw `Authorization` header value (`Bearer <jws>`) and returns the
    /// caller identity. Every failure mode collapses into a `TokenError`, which the
    /// HTTP layer reports as 401.
    pub fn verify(&self, authorization: &str) -> Result<AuthIdentity, TokenError> {
        let token = authorization
            .strip_prefix("Bearer ")
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .ok_or(TokenError::NotBearer)?;

        let data =
            decode::<Claims>(token, &self.key, &self.validation).map_err(TokenError::Rejected)?;

        let user_id = data
            .claims
            .user_id
            .filter(|id| !id.is_empty())
            .ok_or(TokenError::MissingUserId)?;

        Ok(AuthIdentity { user_id })
    }
}

/// VerifierState
///
/// Shared, read-only handle to the startup-loaded verifier.
pub type VerifierState = Arc<TokenVerifier>;

/// AuthUser
///
/// Resolved caller of an authenticated request: the verified identity plus the
/// original bearer header for forwarding. Handlers take it as an argument, so the
/// identity travels as a typed value rather than a request-scoped attribute.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub identity: AuthIdentity,
    pub token: BearerToken,
}

/// AuthUser Extractor Implementation
///
/// Rejects with `AppError::InvalidToken` (401) when the header is missing, is not a
/// bearer token, or fails verification. No I/O happens here.
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    VerifierState: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let verifier = VerifierState::from_ref(state);

        let header_value = parts
            .headers
            .get(header::AUTHORIZATION)
            .ok_or(TokenError::MissingHeader)?
            .to_str()
            .map_err(|_| TokenError::NotBearer)?;

        let identity = verifier.verify(header_value)?;

        Ok(AuthUser {
            identity,
            token: BearerToken::new(header_value),
        })
    }
}
