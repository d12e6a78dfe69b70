//! Opaque bearer tokens.
//!
//! A [`Token`] is stored under `<scope>:<secret>` with a backend expiry equal
//! to its `expires_at`. Tokens are never updated in place: they are issued,
//! read, and either expire or get revoked.

use std::fmt;
use std::sync::Arc;

use bookshelf_cache::{RecordStore, decode_record, encode_record};
use bookshelf_core::clock::Clock;
use chrono::{DateTime, Duration, Utc};
use metrics::counter;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::error::AuthError;
use crate::keys;
use crate::secret::generate_opaque_token;

/// Namespace a token belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TokenScope {
    #[serde(rename = "access_token")]
    Access,
    #[serde(rename = "refresh_token")]
    Refresh,
}

impl TokenScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenScope::Access => "access_token",
            TokenScope::Refresh => "refresh_token",
        }
    }
}

impl fmt::Display for TokenScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A bearer token and the metadata resolved from it.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    pub user_id: Uuid,
    pub scope: TokenScope,
    pub expires_at: DateTime<Utc>,
    /// The secret handed to the client.
    #[serde(rename = "token")]
    pub plaintext: String,
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Token")
            .field("user_id", &self.user_id)
            .field("scope", &self.scope)
            .field("expires_at", &self.expires_at)
            .finish_non_exhaustive()
    }
}

impl Token {
    /// Lifetime left at `now`; negative once expired.
    pub fn remaining(&self, now: DateTime<Utc>) -> Duration {
        self.expires_at - now
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }

    /// Whether a still-valid token has less than `threshold` lifetime left.
    pub fn needs_renewal(&self, now: DateTime<Utc>, threshold: Duration) -> bool {
        let remaining = self.remaining(now);
        remaining > Duration::zero() && remaining < threshold
    }
}

/// Issues, resolves, and revokes bearer tokens.
#[derive(Clone, Debug)]
pub struct TokenService {
    store: Arc<dyn RecordStore>,
    clock: Arc<dyn Clock>,
}

impl TokenService {
    pub fn new(store: Arc<dyn RecordStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Creates a token for `user_id` valid for `ttl` and persists it.
    ///
    /// # Errors
    ///
    /// - `AuthError::ExpiryOutOfRange` if `ttl` overflows the current time
    /// - `AuthError::Generation` if no secret could be generated
    /// - `AuthError::Storage` if the record could not be written or its expiry set
    #[instrument(skip(self), fields(token.scope = %scope))]
    pub async fn issue_token(
        &self,
        user_id: Uuid,
        ttl: Duration,
        scope: TokenScope,
    ) -> Result<Token, AuthError> {
        let expires_at = self
            .clock
            .now()
            .checked_add_signed(ttl)
            .ok_or(AuthError::ExpiryOutOfRange(ttl))?;

        let token = Token {
            user_id,
            scope,
            expires_at,
            plaintext: generate_opaque_token()?,
        };

        let fields = encode_record(&token)?;
        self.store
            .put(&keys::token(scope, &token.plaintext), fields, token.expires_at)
            .await?;

        counter!("auth_tokens_issued_total", "scope" => scope.as_str()).increment(1);
        debug!(expires_at = %token.expires_at, "Token issued");

        Ok(token)
    }

    /// Looks up the token stored under `scope` and `plaintext`.
    ///
    /// # Errors
    ///
    /// - `AuthError::NotFound` if the token is absent, revoked, or expired
    /// - `AuthError::Storage` on any backend failure
    #[instrument(skip(self, plaintext), fields(token.scope = %scope))]
    pub async fn resolve_token(
        &self,
        scope: TokenScope,
        plaintext: &str,
    ) -> Result<Token, AuthError> {
        let fields = self
            .store
            .get(&keys::token(scope, plaintext))
            .await?
            .ok_or(AuthError::NotFound)?;

        let token: Token = decode_record(fields)?;

        // The backend expiry normally removes the key first; this covers
        // clock drift between the backend and this process.
        if token.scope != scope || token.is_expired(self.clock.now()) {
            return Err(AuthError::NotFound);
        }

        Ok(token)
    }

    /// Deletes the token. Revoking an unknown token succeeds.
    #[instrument(skip(self, plaintext), fields(token.scope = %scope))]
    pub async fn revoke_token(&self, scope: TokenScope, plaintext: &str) -> Result<(), AuthError> {
        self.store.delete(&keys::token(scope, plaintext)).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bookshelf_cache::{CacheError, Fields, MemoryStore};
    use bookshelf_core::clock::ManualClock;

    use crate::secret::OPAQUE_TOKEN_LEN;

    fn service() -> (TokenService, Arc<ManualClock>, Arc<MemoryStore>) {
        let clock = Arc::new(ManualClock::default());
        let store = Arc::new(MemoryStore::new(clock.clone()));
        (TokenService::new(store.clone(), clock.clone()), clock, store)
    }

    #[derive(Debug)]
    struct UnavailableStore;

    #[async_trait]
    impl RecordStore for UnavailableStore {
        async fn put(&self, _: &str, _: Fields, _: DateTime<Utc>) -> Result<(), CacheError> {
            Err(CacheError::Timeout(std::time::Duration::from_secs(5)))
        }

        async fn get(&self, _: &str) -> Result<Option<Fields>, CacheError> {
            Err(CacheError::Timeout(std::time::Duration::from_secs(5)))
        }

        async fn delete(&self, _: &str) -> Result<(), CacheError> {
            Err(CacheError::Timeout(std::time::Duration::from_secs(5)))
        }
    }

    #[tokio::test]
    async fn test_issue_then_resolve() {
        let (tokens, clock, store) = service();
        let user_id = Uuid::new_v4();

        let issued = tokens
            .issue_token(user_id, Duration::hours(2), TokenScope::Access)
            .await
            .unwrap();

        assert_eq!(issued.plaintext.len(), OPAQUE_TOKEN_LEN);
        assert_eq!(issued.expires_at, clock.now() + Duration::hours(2));
        assert_eq!(
            store.expiry_of(&format!("access_token:{}", issued.plaintext)),
            Some(issued.expires_at)
        );

        let resolved = tokens
            .resolve_token(TokenScope::Access, &issued.plaintext)
            .await
            .unwrap();

        assert_eq!(resolved.user_id, user_id);
        assert_eq!(resolved.scope, TokenScope::Access);
        assert_eq!(resolved, issued);
    }

    #[tokio::test]
    async fn test_resolve_after_expiry_is_not_found() {
        let (tokens, clock, _) = service();

        let issued = tokens
            .issue_token(Uuid::new_v4(), Duration::hours(2), TokenScope::Access)
            .await
            .unwrap();

        clock.advance(Duration::hours(2) + Duration::seconds(1));

        let result = tokens
            .resolve_token(TokenScope::Access, &issued.plaintext)
            .await;
        assert!(matches!(result, Err(AuthError::NotFound)));
    }

    #[tokio::test]
    async fn test_negative_ttl_is_never_resolvable() {
        let (tokens, _, _) = service();

        let issued = tokens
            .issue_token(Uuid::new_v4(), Duration::seconds(-1), TokenScope::Refresh)
            .await
            .unwrap();

        let result = tokens
            .resolve_token(TokenScope::Refresh, &issued.plaintext)
            .await;
        assert!(matches!(result, Err(AuthError::NotFound)));
    }

    #[tokio::test]
    async fn test_revoke_is_idempotent() {
        let (tokens, _, _) = service();

        let issued = tokens
            .issue_token(Uuid::new_v4(), Duration::hours(2), TokenScope::Access)
            .await
            .unwrap();

        tokens
            .revoke_token(TokenScope::Access, &issued.plaintext)
            .await
            .unwrap();
        tokens
            .revoke_token(TokenScope::Access, &issued.plaintext)
            .await
            .unwrap();

        let result = tokens
            .resolve_token(TokenScope::Access, &issued.plaintext)
            .await;
        assert!(matches!(result, Err(AuthError::NotFound)));
    }

    #[tokio::test]
    async fn test_scopes_do_not_cross() {
        let (tokens, _, _) = service();

        let refresh = tokens
            .issue_token(Uuid::new_v4(), Duration::days(7), TokenScope::Refresh)
            .await
            .unwrap();

        let result = tokens
            .resolve_token(TokenScope::Access, &refresh.plaintext)
            .await;
        assert!(matches!(result, Err(AuthError::NotFound)));
    }

    #[tokio::test]
    async fn test_storage_failure_is_storage_error() {
        let tokens = TokenService::new(Arc::new(UnavailableStore), Arc::new(ManualClock::default()));

        let issue = tokens
            .issue_token(Uuid::new_v4(), Duration::hours(2), TokenScope::Access)
            .await;
        assert!(matches!(issue, Err(AuthError::Storage(CacheError::Timeout(_)))));

        let resolve = tokens.resolve_token(TokenScope::Access, "ABC").await;
        assert!(matches!(resolve, Err(AuthError::Storage(_))));
    }

    #[tokio::test]
    async fn test_unrepresentable_lifetime_is_rejected() {
        let (tokens, _, _) = service();

        let result = tokens
            .issue_token(Uuid::new_v4(), Duration::days(365 * 300_000), TokenScope::Access)
            .await;
        assert!(matches!(result, Err(AuthError::ExpiryOutOfRange(_))));
    }

    #[test]
    fn test_needs_renewal() {
        let now = Utc::now();
        let token = Token {
            user_id: Uuid::new_v4(),
            scope: TokenScope::Refresh,
            expires_at: now + Duration::hours(48),
            plaintext: "X".repeat(OPAQUE_TOKEN_LEN),
        };

        assert!(token.needs_renewal(now, Duration::hours(72)));
        assert!(!token.needs_renewal(now - Duration::days(5), Duration::hours(72)));
        assert!(!token.needs_renewal(now + Duration::hours(49), Duration::hours(72)));
    }

    #[test]
    fn test_debug_hides_secret() {
        let token = Token {
            user_id: Uuid::nil(),
            scope: TokenScope::Access,
            expires_at: Utc::now(),
            plaintext: "SECRETSECRETSECRETSECRET22".to_string(),
        };

        assert!(!format!("{:?}", token).contains("SECRET"));
    }
}
