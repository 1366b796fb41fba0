//! Cross-chain delivery tracking.
//!
//! A transfer is only known to have crossed once the destination endpoint has
//! executed `lzReceive`. [`ScanTracker`] polls the LayerZero Scan API for the
//! message created by a source transaction until it reports delivery.

use std::time::Duration;

use async_trait::async_trait;
use ethers::types::H256;
use oftb_pathway::Tier;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info, warn};

pub const SCAN_MAINNET_URL: &str = "https://scan.layerzero-api.com/v1";
pub const SCAN_TESTNET_URL: &str = "https://scan-testnet.layerzero-api.com/v1";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TrackerError {
    /// The message reached a terminal state other than delivered.
    #[error("message {status}: {reason}")]
    Failed { status: String, reason: String },

    #[error("message not delivered after {0:?}")]
    Timeout(Duration),

    #[error("scan api error: {0}")]
    Api(String),
}

/// A message executed on the destination chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveredMessage {
    pub src_tx: H256,
    pub dst_eid: u32,
    pub dst_tx: H256,
}

#[async_trait]
pub trait MessageTracker: Send + Sync {
    /// Wait until the message sent by `src_tx` to `dst_eid` is delivered.
    async fn wait_for_delivery(
        &self,
        src_tx: H256,
        dst_eid: u32,
    ) -> Result<DeliveredMessage, TrackerError>;
}

// ═══════════════════════════════════════════════════════════════════════════════
// SCAN API
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Deserialize)]
struct ScanResponse {
    #[serde(default)]
    data: Vec<ScanMessage>,
}

#[derive(Debug, Deserialize)]
struct ScanMessage {
    pathway: Option<ScanPathway>,
    destination: Option<ScanSide>,
    status: Option<ScanStatus>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ScanPathway {
    dst_eid: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct ScanSide {
    tx: Option<ScanTx>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ScanTx {
    tx_hash: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ScanStatus {
    name: String,
    #[serde(default)]
    message: Option<String>,
}

/// State of a message as reported by one scan lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanState {
    /// Not indexed yet, or still in flight.
    Pending(String),
    Delivered(H256),
    Failed { status: String, reason: String },
}

const TERMINAL_FAILURES: &[&str] = &[
    "FAILED",
    "BLOCKED",
    "PAYLOAD_STORED",
    "APPLICATION_BURNED",
    "APPLICATION_SKIPPED",
    "UNRESOLVABLE_COMMAND",
    "MALFORMED_COMMAND",
];

/// Interpret a `/messages/tx/{hash}` body for the message headed to `dst_eid`.
pub fn parse_scan_response(body: &str, dst_eid: u32) -> Result<ScanState, TrackerError> {
    let response: ScanResponse = serde_json::from_str(body)
        .map_err(|e| TrackerError::Api(format!("unexpected response: {e}")))?;

    // one source tx can fan out to several pathways
    let message = response.data.into_iter().find(|m| {
        m.pathway
            .as_ref()
            .and_then(|p| p.dst_eid)
            .map_or(true, |eid| eid == dst_eid)
    });
    let Some(message) = message else {
        return Ok(ScanState::Pending("not indexed".into()));
    };

    let Some(status) = message.status else {
        return Ok(ScanState::Pending("no status".into()));
    };

    if status.name == "DELIVERED" {
        let hash = message
            .destination
            .and_then(|d| d.tx)
            .and_then(|tx| tx.tx_hash)
            .ok_or_else(|| TrackerError::Api("delivered message without destination tx".into()))?;
        let dst_tx = hash
            .parse::<H256>()
            .map_err(|e| TrackerError::Api(format!("invalid destination tx {hash:?}: {e}")))?;
        return Ok(ScanState::Delivered(dst_tx));
    }

    if TERMINAL_FAILURES.contains(&status.name.as_str()) {
        return Ok(ScanState::Failed {
            reason: status.message.unwrap_or_else(|| "no details".into()),
            status: status.name,
        });
    }

    Ok(ScanState::Pending(status.name))
}

/// Polls LayerZero Scan until a message is delivered or fails.
#[derive(Clone, Debug)]
pub struct ScanTracker {
    client: reqwest::Client,
    base_url: String,
    poll_interval: Duration,
    timeout: Duration,
}

impl ScanTracker {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            poll_interval: Duration::from_secs(10),
            timeout: Duration::from_secs(30 * 60),
        }
    }

    /// Tracker against the scan deployment for `tier`.
    pub fn for_tier(tier: Tier) -> Self {
        match tier {
            Tier::Production => Self::new(SCAN_MAINNET_URL),
            Tier::Test => Self::new(SCAN_TESTNET_URL),
        }
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    async fn lookup(&self, src_tx: H256, dst_eid: u32) -> Result<ScanState, TrackerError> {
        let url = format!("{}/messages/tx/{src_tx:?}", self.base_url);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| TrackerError::Api(e.to_string()))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(ScanState::Pending("not indexed".into()));
        }
        if !response.status().is_success() {
            return Err(TrackerError::Api(format!("{url} returned {}", response.status())));
        }

        let body = response
            .text()
            .await
            .map_err(|e| TrackerError::Api(e.to_string()))?;
        parse_scan_response(&body, dst_eid)
    }
}

#[async_trait]
impl MessageTracker for ScanTracker {
    async fn wait_for_delivery(
        &self,
        src_tx: H256,
        dst_eid: u32,
    ) -> Result<DeliveredMessage, TrackerError> {
        let deadline = tokio::time::Instant::now() + self.timeout;
        info!(src_tx = ?src_tx, dst_eid, "waiting for delivery");

        loop {
            match self.lookup(src_tx, dst_eid).await {
                Ok(ScanState::Delivered(dst_tx)) => {
                    info!(src_tx = ?src_tx, dst_tx = ?dst_tx, "message delivered");
                    return Ok(DeliveredMessage {
                        src_tx,
                        dst_eid,
                        dst_tx,
                    });
                }
                Ok(ScanState::Failed { status, reason }) => {
                    return Err(TrackerError::Failed { status, reason });
                }
                Ok(ScanState::Pending(status)) => debug!(%status, "message pending"),
                // scan outages are transient, keep polling until the deadline
                Err(e) => warn!("scan lookup failed: {}", e),
            }

            if tokio::time::Instant::now() + self.poll_interval > deadline {
                return Err(TrackerError::Timeout(self.timeout));
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }
}
