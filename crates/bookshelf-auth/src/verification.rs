//! One-time email verification codes.
//!
//! Each email address has at most one live code, stored under
//! `<email>:verification_code`. Issuing a code replaces whatever was there,
//! so only the most recently sent code can ever match.

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
use crate::secret::generate_numeric_code;

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationData {
    pub user_id: Uuid,
    pub email: String,
    pub code: String,
    pub expires_at: DateTime<Utc>,
}

impl fmt::Debug for VerificationData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VerificationData")
            .field("user_id", &self.user_id)
            .field("email", &self.email)
            .field("expires_at", &self.expires_at)
            .finish_non_exhaustive()
    }
}

impl VerificationData {
    /// Exact comparison against a submitted code.
    pub fn matches(&self, code: &str) -> bool {
        self.code == code
    }
}

#[derive(Clone, Debug)]
pub struct VerificationService {
    store: Arc<dyn RecordStore>,
    clock: Arc<dyn Clock>,
}

impl VerificationService {
    pub fn new(store: Arc<dyn RecordStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Generates a fresh code for `email`, replacing any unconsumed one.
    ///
    /// Concurrent calls for the same address race; the last write wins.
    #[instrument(skip(self))]
    pub async fn issue_verification(
        &self,
        user_id: Uuid,
        email: &str,
        ttl: Duration,
    ) -> Result<VerificationData, AuthError> {
        let expires_at = self
            .clock
            .now()
            .checked_add_signed(ttl)
            .ok_or(AuthError::ExpiryOutOfRange(ttl))?;

        let data = VerificationData {
            user_id,
            email: email.to_string(),
            code: generate_numeric_code()?,
            expires_at,
        };

        let fields = encode_record(&data)?;
        self.store
            .put(&keys::verification_code(email), fields, data.expires_at)
            .await?;

        counter!("auth_verification_codes_issued_total").increment(1);
        debug!(expires_at = %data.expires_at, "Verification code issued");

        Ok(data)
    }

    /// Returns the live verification record for `email`.
    ///
    /// # Errors
    ///
    /// - `AuthError::NotFound` if there is no record or it has expired
    /// - `AuthError::Storage` on any backend failure
    #[instrument(skip(self))]
    pub async fn resolve_verification(&self, email: &str) -> Result<VerificationData, AuthError> {
        let fields = self
            .store
            .get(&keys::verification_code(email))
            .await?
            .ok_or(AuthError::NotFound)?;

        let data: VerificationData = decode_record(fields)?;

        if data.expires_at <= self.clock.now() {
            return Err(AuthError::NotFound);
        }

        Ok(data)
    }

    /// Removes the record once its code has been matched. Idempotent.
    #[instrument(skip(self))]
    pub async fn consume_verification(&self, email: &str) -> Result<(), AuthError> {
        self.store.delete(&keys::verification_code(email)).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bookshelf_cache::MemoryStore;
    use bookshelf_core::clock::ManualClock;

    const EMAIL: &str = "a@example.com";

    fn service() -> (VerificationService, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::default());
        let store = Arc::new(MemoryStore::new(clock.clone()));
        (VerificationService::new(store, clock.clone()), clock)
    }

    #[tokio::test]
    async fn test_correct_code_is_consumed() {
        let (verifications, _) = service();
        let user_id = Uuid::new_v4();

        let issued = verifications
            .issue_verification(user_id, EMAIL, Duration::minutes(5))
            .await
            .unwrap();

        let stored = verifications.resolve_verification(EMAIL).await.unwrap();
        assert_eq!(stored.user_id, user_id);
        assert_eq!(stored.email, EMAIL);
        assert!(stored.matches(&issued.code));

        verifications.consume_verification(EMAIL).await.unwrap();

        let result = verifications.resolve_verification(EMAIL).await;
        assert!(matches!(result, Err(AuthError::NotFound)));
    }

    #[tokio::test]
    async fn test_wrong_code_leaves_record() {
        let (verifications, _) = service();

        let issued = verifications
            .issue_verification(Uuid::new_v4(), EMAIL, Duration::minutes(5))
            .await
            .unwrap();
        let wrong = if issued.code == "000000" { "000001" } else { "000000" };

        let stored = verifications.resolve_verification(EMAIL).await.unwrap();
        assert!(!stored.matches(wrong));

        assert!(verifications.resolve_verification(EMAIL).await.is_ok());
    }

    #[tokio::test]
    async fn test_reissue_overwrites_previous_code() {
        let (verifications, _) = service();
        let user_id = Uuid::new_v4();

        let first = verifications
            .issue_verification(user_id, EMAIL, Duration::minutes(5))
            .await
            .unwrap();
        let mut second = verifications
            .issue_verification(user_id, EMAIL, Duration::minutes(5))
            .await
            .unwrap();
        // One-in-a-million collision: reissue until the codes differ.
        while second.code == first.code {
            second = verifications
                .issue_verification(user_id, EMAIL, Duration::minutes(5))
                .await
                .unwrap();
        }

        let stored = verifications.resolve_verification(EMAIL).await.unwrap();
        assert!(stored.matches(&second.code));
        assert!(!stored.matches(&first.code));
    }

    #[tokio::test]
    async fn test_code_expires() {
        let (verifications, clock) = service();

        verifications
            .issue_verification(Uuid::new_v4(), EMAIL, Duration::minutes(5))
            .await
            .unwrap();

        clock.advance(Duration::minutes(5) + Duration::seconds(1));

        let result = verifications.resolve_verification(EMAIL).await;
        assert!(matches!(result, Err(AuthError::NotFound)));
    }

    #[tokio::test]
    async fn test_consume_is_idempotent() {
        let (verifications, _) = service();

        verifications.consume_verification(EMAIL).await.unwrap();
        verifications.consume_verification(EMAIL).await.unwrap();
    }

    #[tokio::test]
    async fn test_unrepresentable_lifetime_is_rejected() {
        let (verifications, _) = service();

        let result = verifications
            .issue_verification(Uuid::new_v4(), EMAIL, Duration::days(365 * 300_000))
            .await;
        assert!(matches!(result, Err(AuthError::ExpiryOutOfRange(_))));

        let stored = verifications.resolve_verification(EMAIL).await;
        assert!(matches!(stored, Err(AuthError::NotFound)));
    }

    #[test]
    fn test_matches_is_exact() {
        let data = VerificationData {
            user_id: Uuid::nil(),
            email: EMAIL.to_string(),
            code: "012345".to_string(),
            expires_at: Utc::now(),
        };

        assert!(data.matches("012345"));
        assert!(!data.matches("12345"));
        assert!(!data.matches(" 012345"));
    }
}
