//! WebSocket broadcast functionality.
//!
//! The broadcaster collects a snapshot at a fixed interval and sends it to all
//! connected WebSocket clients. Notifications are forwarded per connection as
//! they occur (see `server`).

use std::time::Duration;

use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use crate::state::DashboardState;
use crate::types::DashboardMessage;

/// Run the broadcaster task until `cancel` fires.
pub async fn run_broadcaster(
    state: DashboardState,
    tx: broadcast::Sender<String>,
    interval_ms: u64,
    cancel: CancellationToken,
) {
    let mut interval = tokio::time::interval(Duration::from_millis(interval_ms.max(1)));

    loop {
        tokio::select! {
            () = cancel.cancelled() => {
                debug!("Broadcaster stopped");
                return;
            }
            _ = interval.tick() => {}
        }

        // skip the work entirely when nobody is listening
        if tx.receiver_count() == 0 {
            continue;
        }

        let msg = DashboardMessage::Update(state.collect_snapshot());
        match serde_json::to_string(&msg) {
            Ok(json) => match tx.send(json) {
                Ok(n) => trace!(receivers = n, "Broadcast update sent"),
                Err(_) => trace!("No WebSocket receivers connected"),
            },
            Err(e) => {
                debug!(error = %e, "Failed to serialize dashboard update");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use plantmon_core::{builtin_hierarchy, UnitTable};
    use plantmon_mqtt::LiveOverlay;

    #[tokio::test]
    async fn test_broadcaster_sends_updates() {
        let state = DashboardState::new(
            Arc::new(builtin_hierarchy().unwrap()),
            Arc::new(LiveOverlay::default()),
            UnitTable::builtin(),
        );
        let (tx, mut rx) = broadcast::channel::<String>(4);
        let cancel = CancellationToken::new();
        let task = tokio::spawn(run_broadcaster(state, tx, 10, cancel.clone()));

        let json = rx.recv().await.unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["type"], "update");
        assert_eq!(value["selected"]["id"], "company-1");
        assert_eq!(value["connection"]["label"], "Not connected");

        cancel.cancel();
        task.await.unwrap();
    }
}
