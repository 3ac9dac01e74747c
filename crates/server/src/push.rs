//! Expo push delivery. Best-effort: failures are logged, never
//! propagated to the request that triggered them.

use serde_json::json;
use tracing::{debug, warn};

const EXPO_PUSH_URL: &str = "https://exp.host/--/api/v2/push/send";

/// Thin client over the Expo push HTTP API.
#[derive(Clone)]
pub struct PushClient {
    http: reqwest::Client,
}

impl PushClient {
    /// Build a client with its own connection pool.
    pub fn new() -> Self {
        Self {
            http: reqwest::Client::new(),
        }
    }

    /// Send one push message to an Expo token.
    pub async fn send(&self, token: &str, body: &str) {
        if !token.starts_with("ExponentPushToken[") {
            warn!(token, "invalid Expo push token, dropping message");
            return;
        }

        let message = json!({
            "to": token,
            "sound": "default",
            "body": body,
            "data": {},
        });

        match self.http.post(EXPO_PUSH_URL).json(&message).send().await {
            Ok(response) if response.status().is_success() => {
                debug!("push notification sent");
            }
            Ok(response) => {
                warn!(status = %response.status(), "push endpoint rejected message");
            }
            Err(err) => {
                warn!(error = %err, "push delivery failed");
            }
        }
    }
}

impl Default for PushClient {
    fn default() -> Self {
        Self::new()
    }
}
