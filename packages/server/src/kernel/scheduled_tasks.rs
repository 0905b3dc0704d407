//! Scheduled background tasks using tokio-cron-scheduler.
//!
//! - Expired OTP sessions are swept every minute so abandoned logins
//!   don't accumulate between sends.

use anyhow::Result;
use chrono::Utc;
use std::sync::Arc;
use tokio_cron_scheduler::{Job, JobScheduler};

use crate::kernel::BaseOtpSessionStore;

/// Start all scheduled tasks
pub async fn start_scheduler(otp_sessions: Arc<dyn BaseOtpSessionStore>) -> Result<JobScheduler> {
    let scheduler = JobScheduler::new().await?;

    // OTP session sweep - runs at the top of every minute
    let sweep_job = Job::new_async("0 * * * * *", move |_uuid, _lock| {
        let otp_sessions = otp_sessions.clone();
        Box::pin(async move {
            sweep_otp_sessions(otp_sessions.as_ref()).await;
        })
    })?;

    scheduler.add(sweep_job).await?;
    scheduler.start().await?;

    tracing::info!("Scheduled tasks started (OTP session sweep every minute)");
    Ok(scheduler)
}

async fn sweep_otp_sessions(otp_sessions: &dyn BaseOtpSessionStore) -> usize {
    let removed = otp_sessions.sweep_expired(Utc::now()).await;
    if removed > 0 {
        tracing::debug!(removed, "Swept expired OTP sessions");
    }
    removed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domains::auth::models::{InMemoryOtpSessionStore, OtpSession};
    use chrono::Duration;
    use twofactor::DeliveryChannel;

    #[tokio::test]
    async fn test_sweep_removes_only_expired_sessions() {
        let store = InMemoryOtpSessionStore::new();
        store
            .create(OtpSession::new(
                "fresh".to_string(),
                "+919876543211".to_string(),
                "9876543211".to_string(),
                DeliveryChannel::Sms,
            ))
            .await;

        // create() sweeps before inserting, so the stale entry goes in last
        let mut stale = OtpSession::new(
            "stale".to_string(),
            "+919876543210".to_string(),
            "9876543210".to_string(),
            DeliveryChannel::Sms,
        );
        stale.created_at = Utc::now() - Duration::minutes(11);
        store.create(stale).await;

        assert_eq!(sweep_otp_sessions(&store).await, 1);
        assert!(store.get("fresh").await.is_some());
        assert!(store.get("stale").await.is_none());
    }
}
