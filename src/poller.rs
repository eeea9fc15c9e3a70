use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tracing::{debug, info};

use crate::message::{MessageType, ServerMessage};
use crate::server_client::ServerTransport;
use crate::types::ServerResponse;

pub const OFFLINE_POLLING_TIME: Duration = Duration::from_millis(5000);

/// Send `probe` until the server answers, sleeping `delay` after every failed
/// attempt. There is no attempt limit.
///
/// Without a probe (or with an empty one) a version query is sent.
pub async fn polling_loop(
    client: &dyn ServerTransport,
    probe: Option<ServerMessage>,
    delay: Duration,
) -> ServerResponse<Value> {
    let probe = probe
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| ServerMessage::new(MessageType::GetVersion));
    let mut attempt: u64 = 0;

    loop {
        attempt += 1;
        match client.send(&probe).await {
            Ok(response) => {
                info!(attempt, method = %probe.method, "server available");
                return response;
            }
            Err(e) => {
                debug!(attempt, error = %e, delay_ms = delay.as_millis() as u64, "server unavailable, retrying");
                tokio::time::sleep(delay).await;
            }
        }
    }
}

/// Single-item stream resolving once [`polling_loop`] succeeds. It does not
/// poll again after that.
pub fn polling_stream(
    client: Arc<dyn ServerTransport>,
    probe: Option<ServerMessage>,
    delay: Duration,
) -> Pin<Box<dyn futures::Stream<Item = ServerResponse<Value>> + Send>> {
    Box::pin(futures::stream::once(async move {
        polling_loop(client.as_ref(), probe, delay).await
    }))
}
