// Test doubles for the infrastructure traits.
//
// Compiled into the library so integration tests under tests/ can use them.

use anyhow::{bail, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::types::Json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use twofactor::{DeliveryChannel, GatewayError, OtpDispatch};

use crate::common::{LeadId, UserId};
use crate::domains::auth::models::InMemoryOtpSessionStore;
use crate::domains::auth::JwtService;
use crate::domains::leads::models::{Lead, NewLead};
use crate::domains::user::models::{LoginUpdate, NewUser, User};
use crate::kernel::{BaseLeadRepository, BaseOtpGateway, BaseUserRepository, ServerDeps};

/// Code accepted by [`MockOtpGateway`].
pub const VALID_TEST_CODE: &str = "123456";

// =============================================================================
// Mock OTP Gateway
// =============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum DeliveryMode {
    Deliver(DeliveryChannel),
    Fail,
    Unconfigured,
}

pub struct MockOtpGateway {
    delivery: DeliveryMode,
    verify_unreachable: bool,
    verify_delay: Option<Duration>,
    next_session: AtomicUsize,
    verify_calls: AtomicUsize,
    sent_to: Mutex<Vec<String>>,
}

impl MockOtpGateway {
    /// Delivers over SMS and accepts [`VALID_TEST_CODE`].
    pub fn new() -> Self {
        Self {
            delivery: DeliveryMode::Deliver(DeliveryChannel::Sms),
            verify_unreachable: false,
            verify_delay: None,
            next_session: AtomicUsize::new(1),
            verify_calls: AtomicUsize::new(0),
            sent_to: Mutex::new(Vec::new()),
        }
    }

    /// Both delivery channels fail.
    pub fn failing_delivery() -> Self {
        Self {
            delivery: DeliveryMode::Fail,
            ..Self::new()
        }
    }

    /// Behaves like a gateway with no API key.
    pub fn unconfigured() -> Self {
        Self {
            delivery: DeliveryMode::Unconfigured,
            ..Self::new()
        }
    }

    /// Report delivery over `channel` (e.g. voice after SMS fell through).
    pub fn with_channel(mut self, channel: DeliveryChannel) -> Self {
        self.delivery = DeliveryMode::Deliver(channel);
        self
    }

    /// Verification calls fail with a transport error.
    pub fn with_unreachable_verify(mut self) -> Self {
        self.verify_unreachable = true;
        self
    }

    /// Hold every verification for `delay` before answering.
    pub fn with_verify_delay(mut self, delay: Duration) -> Self {
        self.verify_delay = Some(delay);
        self
    }

    /// Phone numbers codes were sent to.
    pub fn sent_to(&self) -> Vec<String> {
        self.sent_to.lock().unwrap().clone()
    }

    pub fn verify_calls(&self) -> usize {
        self.verify_calls.load(Ordering::SeqCst)
    }
}

impl Default for MockOtpGateway {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BaseOtpGateway for MockOtpGateway {
    async fn request_code(&self, phone: &str) -> Result<OtpDispatch, GatewayError> {
        match self.delivery {
            DeliveryMode::Unconfigured => Err(GatewayError::Configuration(
                "TWOFACTOR_API_KEY is not set".to_string(),
            )),
            DeliveryMode::Fail => Err(GatewayError::AllChannelsFailed {
                failures: vec![
                    (DeliveryChannel::Sms, "HTTP 500: down".to_string()),
                    (DeliveryChannel::Voice, "request timed out".to_string()),
                ],
            }),
            DeliveryMode::Deliver(channel) => {
                self.sent_to.lock().unwrap().push(phone.to_string());
                let n = self.next_session.fetch_add(1, Ordering::SeqCst);
                Ok(OtpDispatch {
                    session_id: format!("mock-session-{}", n),
                    channel,
                })
            }
        }
    }

    async fn verify_code(&self, _session_id: &str, code: &str) -> Result<(), GatewayError> {
        self.verify_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.verify_delay {
            tokio::time::sleep(delay).await;
        }
        if self.delivery == DeliveryMode::Unconfigured {
            return Err(GatewayError::Configuration(
                "TWOFACTOR_API_KEY is not set".to_string(),
            ));
        }
        if self.verify_unreachable {
            return Err(GatewayError::Transport("request timed out".to_string()));
        }
        if code == VALID_TEST_CODE {
            Ok(())
        } else {
            Err(GatewayError::Rejected("OTP Mismatch".to_string()))
        }
    }
}

// =============================================================================
// In-memory User Repository
// =============================================================================

#[derive(Default)]
pub struct InMemoryUserRepository {
    users: Mutex<Vec<User>>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self) -> usize {
        self.users.lock().unwrap().len()
    }

    fn update<F>(&self, id: UserId, apply: F) -> Option<User>
    where
        F: FnOnce(&mut User),
    {
        let mut users = self.users.lock().unwrap();
        let user = users.iter_mut().find(|u| u.id == id)?;
        apply(user);
        Some(user.clone())
    }
}

#[async_trait]
impl BaseUserRepository for InMemoryUserRepository {
    async fn find_by_id(&self, id: UserId) -> Result<Option<User>> {
        Ok(self.users.lock().unwrap().iter().find(|u| u.id == id).cloned())
    }

    async fn find_by_phone_number(&self, phone_number: &str) -> Result<Option<User>> {
        Ok(self
            .users
            .lock()
            .unwrap()
            .iter()
            .find(|u| u.phone_number == phone_number)
            .cloned())
    }

    async fn insert(&self, new: NewUser) -> Result<Option<User>> {
        let mut users = self.users.lock().unwrap();
        if users.iter().any(|u| u.phone_number == new.phone_number) {
            return Ok(None);
        }
        let now = Utc::now();
        let user = User {
            id: UserId::new(),
            name: new.name,
            phone_number: new.phone_number,
            phone: new.phone,
            city: new.city,
            email: None,
            join_date: now,
            last_login: now,
            watchlist: Vec::new(),
            my_properties: Vec::new(),
        };
        users.push(user.clone());
        Ok(Some(user))
    }

    async fn record_login(&self, id: UserId, update: LoginUpdate) -> Result<User> {
        match self.update(id, |user| {
            user.last_login = Utc::now();
            if let Some(name) = update.name {
                user.name = name;
            }
            if let Some(city) = update.city {
                user.city = city;
            }
        }) {
            Some(user) => Ok(user),
            None => bail!("user {} not found", id),
        }
    }

    async fn add_to_watchlist(&self, id: UserId, property_id: &str) -> Result<Option<User>> {
        Ok(self.update(id, |user| {
            if !user.watchlist.iter().any(|p| p == property_id) {
                user.watchlist.push(property_id.to_string());
            }
        }))
    }

    async fn remove_from_watchlist(&self, id: UserId, property_id: &str) -> Result<Option<User>> {
        Ok(self.update(id, |user| user.watchlist.retain(|p| p != property_id)))
    }
}

// =============================================================================
// In-memory Lead Repository
// =============================================================================

#[derive(Default)]
pub struct InMemoryLeadRepository {
    leads: Mutex<Vec<Lead>>,
    fail_writes: bool,
}

impl InMemoryLeadRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every insert fails.
    pub fn failing() -> Self {
        Self {
            fail_writes: true,
            ..Self::default()
        }
    }

    pub fn count(&self) -> usize {
        self.leads.lock().unwrap().len()
    }
}

#[async_trait]
impl BaseLeadRepository for InMemoryLeadRepository {
    async fn insert(&self, new: NewLead) -> Result<Lead> {
        if self.fail_writes {
            bail!("lead store unavailable");
        }
        let lead = Lead {
            id: LeadId::new(),
            user_id: new.user_id,
            name: new.name,
            phone: new.phone,
            email: new.email,
            city: new.city,
            property_id: new.property.property_id,
            property_name: new.property.property_name,
            property_url: new.property.property_url,
            source: new.source,
            status: new.status,
            priority: new.priority,
            notes: Json(new.notes),
            created_at: Utc::now(),
        };
        self.leads.lock().unwrap().push(lead.clone());
        Ok(lead)
    }
}

// =============================================================================
// TestDependencies - Builder for test dependencies
// =============================================================================

pub const TEST_JWT_SECRET: &str = "test_secret_key";
pub const TEST_JWT_ISSUER: &str = "test_issuer";
pub const TEST_DEFAULT_CITY: &str = "Delhi";

#[derive(Clone)]
pub struct TestDependencies {
    pub gateway: Arc<MockOtpGateway>,
    pub otp_sessions: Arc<InMemoryOtpSessionStore>,
    pub users: Arc<InMemoryUserRepository>,
    pub leads: Arc<InMemoryLeadRepository>,
    pub jwt_service: Arc<JwtService>,
}

impl TestDependencies {
    pub fn new() -> Self {
        Self {
            gateway: Arc::new(MockOtpGateway::new()),
            otp_sessions: Arc::new(InMemoryOtpSessionStore::new()),
            users: Arc::new(InMemoryUserRepository::new()),
            leads: Arc::new(InMemoryLeadRepository::new()),
            jwt_service: Arc::new(JwtService::new(
                TEST_JWT_SECRET,
                TEST_JWT_ISSUER.to_string(),
            )),
        }
    }

    /// Set a mock OTP gateway
    pub fn mock_gateway(mut self, gateway: MockOtpGateway) -> Self {
        self.gateway = Arc::new(gateway);
        self
    }

    /// Set a lead repository
    pub fn mock_leads(mut self, leads: InMemoryLeadRepository) -> Self {
        self.leads = Arc::new(leads);
        self
    }

    /// Convert into ServerDeps for testing
    pub fn into_server_deps(self) -> ServerDeps {
        ServerDeps::new(
            self.gateway,
            self.otp_sessions,
            self.users,
            self.leads,
            self.jwt_service,
            TEST_DEFAULT_CITY.to_string(),
        )
    }
}

impl Default for TestDependencies {
    fn default() -> Self {
        Self::new()
    }
}
