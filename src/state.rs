use std::sync::Arc;

use serde::Serialize;
use tokio_stream::wrappers::WatchStream;
use tracing::debug;

use crate::message::{MessageType, ServerMessage};
use crate::observable::{Observable, Subscription};
use crate::server_client::{request, ClientError, ServerTransport};
use crate::types::{GetInfoResponse, ServerResponse, VersionResponse};

/// Fee rate the server reports when it has no estimate.
pub const FEE_RATE_NOT_SET: f64 = -1.0;
/// Fee rate published instead of [`FEE_RATE_NOT_SET`], in sats/vbyte.
pub const DEFAULT_FEE_RATE: f64 = 1.0;

/// Server-wide facts assembled from several independent fetches.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct WalletState {
    pub version: Option<String>,
    pub short_version: Option<String>,
    pub info: Option<GetInfoResponse>,
    pub dlc_host_address: Option<String>,
    pub fee_estimate: Option<f64>,
}

/// Leftmost `<token>-<token>-<token>` run in `version`, where a token is made
/// of ASCII alphanumerics, `_` and `.`. Falls back to the whole string.
pub fn short_version(version: &str) -> &str {
    let is_token = |c: char| c.is_ascii_alphanumeric() || c == '_' || c == '.';

    let mut runs: Vec<(usize, usize)> = Vec::new();
    let mut start = None;
    for (i, c) in version.char_indices() {
        match (is_token(c), start) {
            (true, None) => start = Some(i),
            (false, Some(s)) => {
                runs.push((s, i));
                start = None;
            }
            _ => {}
        }
    }
    if let Some(s) = start {
        runs.push((s, version.len()));
    }

    let joined_by_dash = |a: (usize, usize), b: (usize, usize)| {
        b.0 == a.1 + 1 && version.as_bytes().get(a.1) == Some(&b'-')
    };

    runs.windows(3)
        .find(|w| joined_by_dash(w[0], w[1]) && joined_by_dash(w[1], w[2]))
        .map(|w| &version[w[0].0..w[2].1])
        .unwrap_or(version)
}

fn normalize_fee_rate(fee: f64) -> f64 {
    if fee == FEE_RATE_NOT_SET {
        DEFAULT_FEE_RATE
    } else {
        fee
    }
}

pub async fn get_info(
    client: &dyn ServerTransport,
) -> Result<ServerResponse<GetInfoResponse>, ClientError> {
    debug!("GetInfo()");
    request(client, ServerMessage::new(MessageType::GetInfo)).await
}

pub async fn get_dlc_host_address(
    client: &dyn ServerTransport,
) -> Result<ServerResponse<String>, ClientError> {
    debug!("GetDLCHostAddress()");
    request(client, ServerMessage::new(MessageType::GetDlcHostAddress)).await
}

pub async fn estimate_fee(client: &dyn ServerTransport) -> Result<ServerResponse<f64>, ClientError> {
    debug!("EstimateFee()");
    request(client, ServerMessage::new(MessageType::EstimateFee)).await
}

/// Process-wide [`WalletState`] snapshot.
#[derive(Clone)]
pub struct WalletStateStore {
    client: Arc<dyn ServerTransport>,
    state: Observable<WalletState>,
}

impl WalletStateStore {
    pub fn new(client: Arc<dyn ServerTransport>) -> Self {
        Self {
            client,
            state: Observable::default(),
        }
    }

    pub fn current(&self) -> Arc<WalletState> {
        self.state.current()
    }

    pub fn stream(&self) -> WatchStream<Arc<WalletState>> {
        self.state.stream()
    }

    pub fn observe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&WalletState) + Send + Sync + 'static,
    {
        self.state.observe(listener)
    }

    pub fn clear(&self) {
        self.state.publish(WalletState::default());
    }

    /// Fetch version, node info, DLC host address and fee estimate
    /// concurrently. Each branch publishes as soon as it lands; the call
    /// fails with the first transport error.
    pub async fn refresh(&self) -> Result<Arc<WalletState>, ClientError> {
        tokio::try_join!(
            self.refresh_version(),
            self.refresh_info(),
            self.refresh_dlc_host_address(),
            self.refresh_fee_estimate(),
        )?;
        let state = self.current();
        debug!(?state, "wallet state refreshed");
        Ok(state)
    }

    pub fn set_version(&self, version: &VersionResponse) {
        let short = short_version(&version.version).to_string();
        debug!(version = %version.version, short_version = %short, "set version");
        self.state.update(|s| {
            s.version = Some(version.version.clone());
            s.short_version = Some(short);
        });
    }

    async fn refresh_version(&self) -> Result<(), ClientError> {
        let resp = crate::server_client::get_version(self.client.as_ref()).await?;
        if let Some(version) = resp.result {
            self.set_version(&version);
        }
        Ok(())
    }

    async fn refresh_info(&self) -> Result<(), ClientError> {
        let resp = get_info(self.client.as_ref()).await?;
        if let Some(info) = resp.result {
            self.state.update(|s| s.info = Some(info));
        }
        Ok(())
    }

    async fn refresh_dlc_host_address(&self) -> Result<(), ClientError> {
        let resp = get_dlc_host_address(self.client.as_ref()).await?;
        if let Some(address) = resp.result {
            self.state.update(|s| s.dlc_host_address = Some(address));
        }
        Ok(())
    }

    async fn refresh_fee_estimate(&self) -> Result<(), ClientError> {
        let resp = estimate_fee(self.client.as_ref()).await?;
        // a zero rate carries no estimate; the previous one stays
        if let Some(fee) = resp.result.filter(|fee| *fee != 0.0) {
            let fee = normalize_fee_rate(fee);
            self.state.update(|s| s.fee_estimate = Some(fee));
        }
        Ok(())
    }
}
