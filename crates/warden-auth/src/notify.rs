//! Out-of-band alerts for suspicious IP changes during rotation.
//!
//! Notifications are advisory. [`IpChangeNotifier::notify`] returns
//! immediately; delivery runs as its own task and failures are logged,
//! never reported back to the rotation that triggered them.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use warden_core::models::user::UserId;

use crate::error::AuthError;

/// Payload sent when a session is rotated from a new IP address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IpChangeNotice {
    pub user_id: UserId,
    pub old_ip: String,
    pub new_ip: String,
}

/// Fire-and-forget sink for [`IpChangeNotice`]s.
pub trait IpChangeNotifier: Send + Sync {
    /// Hand off a notice. Must not block and cannot fail.
    fn notify(&self, notice: IpChangeNotice);
}

/// Logs notices without delivering them anywhere.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogIpChangeNotifier;

impl IpChangeNotifier for LogIpChangeNotifier {
    fn notify(&self, notice: IpChangeNotice) {
        warn!(
            user_id = notice.user_id,
            old_ip = %notice.old_ip,
            new_ip = %notice.new_ip,
            "IP change detected (no notification endpoint configured)"
        );
    }
}

/// POSTs notices as JSON to a fixed URL on a background task.
#[derive(Debug, Clone)]
pub struct HttpIpChangeNotifier {
    client: reqwest::Client,
    url: String,
}

impl HttpIpChangeNotifier {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, AuthError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AuthError::Validation(format!("notification client: {e}")))?;

        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

impl IpChangeNotifier for HttpIpChangeNotifier {
    fn notify(&self, notice: IpChangeNotice) {
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            warn!(
                user_id = notice.user_id,
                "No async runtime; IP change notification dropped"
            );
            return;
        };

        let client = self.client.clone();
        let url = self.url.clone();
        handle.spawn(deliver(client, url, notice));
    }
}

async fn deliver(client: reqwest::Client, url: String, notice: IpChangeNotice) {
    match client.post(&url).json(&notice).send().await {
        Ok(res) if res.status().is_success() => {
            info!(user_id = notice.user_id, %url, status = %res.status(), "IP change notification sent");
        }
        Ok(res) => {
            warn!(user_id = notice.user_id, %url, status = %res.status(), "IP change notification rejected");
        }
        Err(e) => {
            warn!(user_id = notice.user_id, %url, error = %e, "IP change notification failed");
        }
    }
}
