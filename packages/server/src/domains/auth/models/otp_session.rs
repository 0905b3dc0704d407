use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use thiserror::Error;
use tokio::sync::RwLock;
use twofactor::DeliveryChannel;

use crate::common::PropertyContext;
use crate::kernel::BaseOtpSessionStore;

/// How long a sent code stays verifiable.
pub const OTP_SESSION_TTL_MINUTES: i64 = 10;

/// Failed verifications allowed before a session is discarded.
pub const MAX_VERIFY_ATTEMPTS: u32 = 3;

/// Pending verification for one sent code.
///
/// Lives only in process memory; a restart drops every pending login,
/// which is fine for codes that expire in minutes anyway.
#[derive(Debug, Clone, PartialEq)]
pub struct OtpSession {
    /// Gateway-issued session id.
    pub session_id: String,
    /// International form, e.g. `+919876543210`.
    pub phone_number: String,
    /// Ten local digits as entered.
    pub raw_phone: String,
    pub display_name: Option<String>,
    pub city: Option<String>,
    pub property: PropertyContext,
    pub created_at: DateTime<Utc>,
    pub attempts: u32,
    pub verified: bool,
    pub channel: DeliveryChannel,
}

impl OtpSession {
    pub fn new(
        session_id: String,
        phone_number: String,
        raw_phone: String,
        channel: DeliveryChannel,
    ) -> Self {
        Self {
            session_id,
            phone_number,
            raw_phone,
            display_name: None,
            city: None,
            property: PropertyContext::default(),
            created_at: Utc::now(),
            attempts: 0,
            verified: false,
            channel,
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now.signed_duration_since(self.created_at) >= Duration::minutes(OTP_SESSION_TTL_MINUTES)
    }

    pub fn attempts_exhausted(&self) -> bool {
        self.attempts >= MAX_VERIFY_ATTEMPTS
    }
}

/// Why a verification attempt could not be reserved. The session is gone
/// in every case.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptRefused {
    #[error("session not found")]
    NotFound,
    #[error("session expired")]
    Expired,
    #[error("attempts exhausted")]
    Exhausted,
}

/// Process-local session map.
///
/// Every mutation takes the write lock, so increments and deletes are
/// atomic with respect to each other. Expired entries are swept on each
/// `create` rather than by a background task.
#[derive(Clone, Default)]
pub struct InMemoryOtpSessionStore {
    sessions: Arc<RwLock<HashMap<String, OtpSession>>>,
}

impl InMemoryOtpSessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}

#[async_trait]
impl BaseOtpSessionStore for InMemoryOtpSessionStore {
    async fn create(&self, session: OtpSession) {
        let mut sessions = self.sessions.write().await;
        let now = Utc::now();
        sessions.retain(|_, existing| !existing.is_expired(now));
        sessions.insert(session.session_id.clone(), session);
    }

    async fn get(&self, session_id: &str) -> Option<OtpSession> {
        self.sessions.read().await.get(session_id).cloned()
    }

    async fn increment_attempts(&self, session_id: &str) -> Option<u32> {
        let mut sessions = self.sessions.write().await;
        let session = sessions.get_mut(session_id)?;
        session.attempts += 1;
        Some(session.attempts)
    }

    async fn begin_attempt(
        &self,
        session_id: &str,
        now: DateTime<Utc>,
    ) -> Result<OtpSession, AttemptRefused> {
        let mut sessions = self.sessions.write().await;
        let session = sessions.get_mut(session_id).ok_or(AttemptRefused::NotFound)?;

        if session.is_expired(now) {
            sessions.remove(session_id);
            return Err(AttemptRefused::Expired);
        }
        if session.attempts_exhausted() {
            sessions.remove(session_id);
            return Err(AttemptRefused::Exhausted);
        }

        session.attempts += 1;
        Ok(session.clone())
    }

    async fn delete(&self, session_id: &str) -> Option<OtpSession> {
        self.sessions.write().await.remove(session_id)
    }

    async fn sweep_expired(&self, now: DateTime<Utc>) -> usize {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, session| !session.is_expired(now));
        before - sessions.len()
    }

    async fn count(&self) -> usize {
        self.len().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(id: &str) -> OtpSession {
        OtpSession::new(
            id.to_string(),
            "+919876543210".to_string(),
            "9876543210".to_string(),
            DeliveryChannel::Sms,
        )
    }

    #[tokio::test]
    async fn test_create_starts_fresh() {
        let store = InMemoryOtpSessionStore::new();
        store.create(session("s1")).await;

        let stored = store.get("s1").await.unwrap();
        assert_eq!(stored.attempts, 0);
        assert!(!stored.verified);
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_create_overwrites_same_id() {
        let store = InMemoryOtpSessionStore::new();
        store.create(session("s1")).await;
        store.increment_attempts("s1").await;

        store.create(session("s1")).await;
        assert_eq!(store.get("s1").await.unwrap().attempts, 0);
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_increment_returns_new_count() {
        let store = InMemoryOtpSessionStore::new();
        store.create(session("s1")).await;

        assert_eq!(store.increment_attempts("s1").await, Some(1));
        assert_eq!(store.increment_attempts("s1").await, Some(2));
        assert_eq!(store.increment_attempts("missing").await, None);
    }

    #[tokio::test]
    async fn test_concurrent_increments_are_not_lost() {
        let store = InMemoryOtpSessionStore::new();
        store.create(session("s1")).await;

        let handles: Vec<_> = (0..20)
            .map(|_| {
                let store = store.clone();
                tokio::spawn(async move { store.increment_attempts("s1").await })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(store.get("s1").await.unwrap().attempts, 20);
    }

    #[tokio::test]
    async fn test_begin_attempt_reserves_until_exhausted() {
        let store = InMemoryOtpSessionStore::new();
        store.create(session("s1")).await;
        let now = Utc::now();

        for expected in 1..=MAX_VERIFY_ATTEMPTS {
            let reserved = store.begin_attempt("s1", now).await.unwrap();
            assert_eq!(reserved.attempts, expected);
        }

        assert_eq!(
            store.begin_attempt("s1", now).await,
            Err(AttemptRefused::Exhausted)
        );
        assert!(store.get("s1").await.is_none());
        assert_eq!(
            store.begin_attempt("s1", now).await,
            Err(AttemptRefused::NotFound)
        );
    }

    #[tokio::test]
    async fn test_begin_attempt_removes_expired_session() {
        let store = InMemoryOtpSessionStore::new();
        let mut stale = session("s1");
        stale.created_at = Utc::now() - Duration::minutes(OTP_SESSION_TTL_MINUTES);
        store.sessions.write().await.insert("s1".to_string(), stale);

        assert_eq!(
            store.begin_attempt("s1", Utc::now()).await,
            Err(AttemptRefused::Expired)
        );
        assert!(store.get("s1").await.is_none());
    }

    #[tokio::test]
    async fn test_concurrent_begin_attempt_grants_at_most_max() {
        let store = InMemoryOtpSessionStore::new();
        store.create(session("s1")).await;

        let handles: Vec<_> = (0..20)
            .map(|_| {
                let store = store.clone();
                tokio::spawn(async move { store.begin_attempt("s1", Utc::now()).await })
            })
            .collect();

        let mut granted = 0;
        for handle in handles {
            if handle.await.unwrap().is_ok() {
                granted += 1;
            }
        }

        assert_eq!(granted, MAX_VERIFY_ATTEMPTS);
    }

    #[tokio::test]
    async fn test_delete_claims_once() {
        let store = InMemoryOtpSessionStore::new();
        store.create(session("s1")).await;

        assert!(store.delete("s1").await.is_some());
        assert!(store.delete("s1").await.is_none());
        assert!(store.get("s1").await.is_none());
    }

    #[tokio::test]
    async fn test_create_sweeps_expired_sessions() {
        let store = InMemoryOtpSessionStore::new();
        let mut stale = session("stale");
        stale.created_at = Utc::now() - Duration::minutes(11);
        store.create(stale).await;
        assert_eq!(store.len().await, 1);

        store.create(session("fresh")).await;

        assert!(store.get("stale").await.is_none());
        assert!(store.get("fresh").await.is_some());
    }

    #[tokio::test]
    async fn test_sweep_expired_reports_removed_count() {
        let store = InMemoryOtpSessionStore::new();
        store.create(session("fresh")).await;
        let mut stale = session("stale");
        stale.created_at = Utc::now() - Duration::minutes(30);
        store.create(stale).await;

        assert_eq!(store.sweep_expired(Utc::now()).await, 1);
        assert_eq!(store.len().await, 1);
    }

    #[test]
    fn test_expiry_boundary() {
        let mut s = session("s1");
        let now = Utc::now();
        s.created_at = now - Duration::minutes(OTP_SESSION_TTL_MINUTES) + Duration::seconds(1);
        assert!(!s.is_expired(now));
        s.created_at = now - Duration::minutes(OTP_SESSION_TTL_MINUTES);
        assert!(s.is_expired(now));
    }
}
