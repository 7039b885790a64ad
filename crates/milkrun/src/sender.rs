//! Replays sample webhook payloads against a running listener.

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde_json::Value;
use tracing::{error, info, warn};

/// Reads a JSON array of payloads. A missing or undecodable file is reported
/// and yields no payloads.
pub fn load_payloads(path: &Path) -> Vec<Value> {
    let contents = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(err) => {
            error!(path = %path.display(), error = %err, "payload file could not be read");
            return Vec::new();
        }
    };

    match serde_json::from_str::<Vec<Value>>(&contents) {
        Ok(payloads) => payloads,
        Err(err) => {
            error!(path = %path.display(), error = %err, "payload file is not a JSON array");
            Vec::new()
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SendSummary {
    pub accepted: usize,
    pub rejected: usize,
}

/// Posts each payload in order, pausing `delay` between deliveries.
pub async fn send_payloads(url: &str, payloads: &[Value], delay: Duration) -> Result<SendSummary> {
    let client = reqwest::Client::new();
    let mut summary = SendSummary::default();

    for (idx, payload) in payloads.iter().enumerate() {
        if idx > 0 && !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let response = client
            .post(url)
            .json(payload)
            .send()
            .await
            .with_context(|| format!("failed to deliver payload {idx} to {url}"))?;

        let status = response.status();
        if status.is_success() {
            info!(index = idx, %status, "webhook sent successfully");
            summary.accepted += 1;
        } else {
            let body = response.text().await.unwrap_or_default();
            warn!(index = idx, %status, body = %body, "webhook rejected");
            summary.rejected += 1;
        }
    }

    Ok(summary)
}
