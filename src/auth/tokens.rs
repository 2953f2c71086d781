//! Stateless access/refresh tokens (JWT, HS256).
//!
//! Each kind is signed with its own secret so a leaked access-token key
//! cannot forge refresh tokens or the other way around. Nothing is
//! persisted; possession of a valid signature is the whole credential.

use base64ct::{Base64UrlUnpadded, Encoding};
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use thiserror::Error;
use ulid::Ulid;
use uuid::Uuid;

use super::utils::unix_now;

type HmacSha256 = Hmac<Sha256>;

const DEFAULT_ACCESS_TTL_SECONDS: i64 = 15 * 60;
const DEFAULT_REFRESH_TTL_SECONDS: i64 = 7 * 24 * 60 * 60;

/// Which family of secret and lifetime a token belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TokenKind {
    Access,
    Refresh,
}

impl TokenKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Access => "access",
            Self::Refresh => "refresh",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
struct TokenHeader {
    alg: String,
    typ: String,
}

impl TokenHeader {
    fn hs256() -> Self {
        Self {
            alg: "HS256".to_string(),
            typ: "JWT".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
struct TokenClaims {
    sub: String,
    kind: String,
    iat: i64,
    exp: i64,
    jti: String,
}

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("invalid token format")]
    TokenFormat,
    #[error("invalid base64url encoding")]
    Base64,
    #[error("invalid json")]
    Json(#[from] serde_json::Error),
    #[error("unsupported algorithm: {0}")]
    UnsupportedAlg(String),
    #[error("invalid signing key")]
    Key,
    #[error("invalid signature")]
    InvalidSignature,
    #[error("token expired")]
    Expired,
    #[error("expected {expected} token, found {found}")]
    KindMismatch { expected: &'static str, found: String },
    #[error("invalid subject")]
    InvalidSubject,
}

fn b64e_json<T: Serialize>(value: &T) -> Result<String, TokenError> {
    let json = serde_json::to_vec(value)?;
    Ok(Base64UrlUnpadded::encode_string(&json))
}

fn b64d_json<T: for<'de> Deserialize<'de>>(s: &str) -> Result<T, TokenError> {
    let bytes = Base64UrlUnpadded::decode_vec(s).map_err(|_| TokenError::Base64)?;
    Ok(serde_json::from_slice(&bytes)?)
}

/// Mints and validates the access/refresh token pair.
pub struct TokenIssuer {
    access_secret: SecretString,
    refresh_secret: SecretString,
    access_ttl_seconds: i64,
    refresh_ttl_seconds: i64,
}

impl TokenIssuer {
    #[must_use]
    pub fn new(access_secret: SecretString, refresh_secret: SecretString) -> Self {
        Self {
            access_secret,
            refresh_secret,
            access_ttl_seconds: DEFAULT_ACCESS_TTL_SECONDS,
            refresh_ttl_seconds: DEFAULT_REFRESH_TTL_SECONDS,
        }
    }

    #[must_use]
    pub fn with_access_ttl_seconds(mut self, seconds: i64) -> Self {
        self.access_ttl_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_refresh_ttl_seconds(mut self, seconds: i64) -> Self {
        self.refresh_ttl_seconds = seconds;
        self
    }

    fn secret_for(&self, kind: TokenKind) -> &SecretString {
        match kind {
            TokenKind::Access => &self.access_secret,
            TokenKind::Refresh => &self.refresh_secret,
        }
    }

    fn ttl_for(&self, kind: TokenKind) -> i64 {
        match kind {
            TokenKind::Access => self.access_ttl_seconds,
            TokenKind::Refresh => self.refresh_ttl_seconds,
        }
    }

    /// Mint a short-lived access token for `subject`.
    ///
    /// # Errors
    ///
    /// Returns an error if header/claims encoding or signing fails.
    pub fn issue_access(&self, subject: Uuid) -> Result<String, TokenError> {
        self.issue_at(TokenKind::Access, subject, unix_now())
    }

    /// Mint a long-lived refresh token for `subject`.
    ///
    /// # Errors
    ///
    /// Returns an error if header/claims encoding or signing fails.
    pub fn issue_refresh(&self, subject: Uuid) -> Result<String, TokenError> {
        self.issue_at(TokenKind::Refresh, subject, unix_now())
    }

    /// Mint a token of `kind` with an explicit issue time.
    ///
    /// # Errors
    ///
    /// Returns an error if header/claims encoding or signing fails.
    pub fn issue_at(
        &self,
        kind: TokenKind,
        subject: Uuid,
        now_unix_seconds: i64,
    ) -> Result<String, TokenError> {
        let claims = TokenClaims {
            sub: subject.to_string(),
            kind: kind.as_str().to_string(),
            iat: now_unix_seconds,
            exp: now_unix_seconds + self.ttl_for(kind),
            jti: Ulid::new().to_string(),
        };
        let header_b64 = b64e_json(&TokenHeader::hs256())?;
        let claims_b64 = b64e_json(&claims)?;
        let signing_input = format!("{header_b64}.{claims_b64}");

        let mut mac =
            HmacSha256::new_from_slice(self.secret_for(kind).expose_secret().as_bytes())
                .map_err(|_| TokenError::Key)?;
        mac.update(signing_input.as_bytes());
        let signature = mac.finalize().into_bytes();
        let signature_b64 = Base64UrlUnpadded::encode_string(&signature);

        Ok(format!("{signing_input}.{signature_b64}"))
    }

    /// Validate a token against the current clock and return its subject.
    ///
    /// # Errors
    ///
    /// See [`validate_at`](Self::validate_at).
    pub fn validate(&self, token: &str, expected_kind: TokenKind) -> Result<Uuid, TokenError> {
        self.validate_at(token, expected_kind, unix_now())
    }

    /// Validate a token at an explicit point in time.
    ///
    /// Checks run in order: signature, then expiry, then kind — a token
    /// signed with the wrong family's secret never reaches the kind
    /// check.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - the token is malformed or contains invalid base64/json,
    /// - the signature does not verify under the expected kind's secret,
    /// - the expiry has passed,
    /// - the embedded kind does not match `expected_kind`.
    pub fn validate_at(
        &self,
        token: &str,
        expected_kind: TokenKind,
        now_unix_seconds: i64,
    ) -> Result<Uuid, TokenError> {
        let mut parts = token.split('.');
        let header_b64 = parts.next().ok_or(TokenError::TokenFormat)?;
        let claims_b64 = parts.next().ok_or(TokenError::TokenFormat)?;
        let sig_b64 = parts.next().ok_or(TokenError::TokenFormat)?;
        if parts.next().is_some() {
            return Err(TokenError::TokenFormat);
        }

        let header: TokenHeader = b64d_json(header_b64)?;
        if header.alg != "HS256" {
            return Err(TokenError::UnsupportedAlg(header.alg));
        }

        let signing_input = format!("{header_b64}.{claims_b64}");
        let signature = Base64UrlUnpadded::decode_vec(sig_b64).map_err(|_| TokenError::Base64)?;
        let mut mac = HmacSha256::new_from_slice(
            self.secret_for(expected_kind).expose_secret().as_bytes(),
        )
        .map_err(|_| TokenError::Key)?;
        mac.update(signing_input.as_bytes());
        // Constant-time comparison inside the MAC verification.
        mac.verify_slice(&signature)
            .map_err(|_| TokenError::InvalidSignature)?;

        let claims: TokenClaims = b64d_json(claims_b64)?;
        if claims.exp <= now_unix_seconds {
            return Err(TokenError::Expired);
        }
        if claims.kind != expected_kind.as_str() {
            return Err(TokenError::KindMismatch {
                expected: expected_kind.as_str(),
                found: claims.kind,
            });
        }

        Uuid::parse_str(&claims.sub).map_err(|_| TokenError::InvalidSubject)
    }
}
