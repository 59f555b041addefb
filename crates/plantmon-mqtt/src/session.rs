//! Owned broker session.
//!
//! An `OverlaySession` is one open connection bound to a [`LiveOverlay`]:
//! the client is attached on open and an event pump applies broker events in
//! delivery order. Closing (or reconfiguring) disconnects and detaches;
//! dropping the session cancels its tasks.

use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::{mpsc, Mutex as TokioMutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::client::BrokerConnector;
use crate::config::BrokerConfig;
use crate::error::MqttResult;
use crate::event::BrokerEvent;
use crate::overlay::LiveOverlay;

pub struct OverlaySession {
    config: BrokerConfig,
    overlay: Arc<LiveOverlay>,
    connector: Arc<dyn BrokerConnector>,
    cancel: CancellationToken,
    pump: Option<JoinHandle<()>>,
    driver: Option<JoinHandle<()>>,
}

impl OverlaySession {
    /// Validate `config`, connect and start applying events to `overlay`.
    ///
    /// Must be called within a tokio runtime.
    pub fn open(
        connector: Arc<dyn BrokerConnector>,
        config: BrokerConfig,
        overlay: Arc<LiveOverlay>,
    ) -> MqttResult<Self> {
        config.validate()?;
        info!(url = %config.url(), client_id = %config.client_id, "Connecting to MQTT broker");

        let cancel = CancellationToken::new();
        let link = connector.connect(&config, cancel.child_token())?;
        overlay.attach(link.client);
        let pump = tokio::spawn(run_event_pump(
            overlay.clone(),
            link.events,
            cancel.clone(),
        ));

        Ok(Self {
            config,
            overlay,
            connector,
            cancel,
            pump: Some(pump),
            driver: link.driver,
        })
    }

    pub fn config(&self) -> &BrokerConfig {
        &self.config
    }

    pub fn overlay(&self) -> &Arc<LiveOverlay> {
        &self.overlay
    }

    /// Replace the connection when `config` differs from the current one.
    ///
    /// Returns `false` (and keeps the connection) for an equal config. An
    /// invalid config is rejected before the current connection is touched.
    pub async fn reconfigure(&mut self, config: BrokerConfig) -> MqttResult<bool> {
        if config == self.config {
            debug!("Broker config unchanged, keeping connection");
            return Ok(false);
        }
        config.validate()?;
        info!(url = %config.url(), "Reconfiguring MQTT connection");
        self.shutdown().await;
        *self = Self::open(self.connector.clone(), config, self.overlay.clone())?;
        Ok(true)
    }

    /// Disconnect and release the session.
    pub async fn close(mut self) {
        self.shutdown().await;
        info!("MQTT session closed");
    }

    async fn shutdown(&mut self) {
        if let Some(client) = self.overlay.detach() {
            if let Err(e) = client.disconnect().await {
                warn!(error = %e, "Disconnect failed");
            }
        }
        self.cancel.cancel();
        for handle in [self.pump.take(), self.driver.take()].into_iter().flatten() {
            if let Err(e) = handle.await {
                warn!(error = %e, "Session task ended abnormally");
            }
        }
    }
}

impl Drop for OverlaySession {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Shared owner of at most one [`OverlaySession`].
///
/// Lets the dashboard connect, reconfigure or disconnect the broker at
/// runtime while the application keeps the final say on shutdown.
#[derive(Clone)]
pub struct SessionHandle {
    connector: Arc<dyn BrokerConnector>,
    overlay: Arc<LiveOverlay>,
    session: Arc<TokioMutex<Option<OverlaySession>>>,
    current: Arc<RwLock<Option<BrokerConfig>>>,
}

impl SessionHandle {
    pub fn new(connector: Arc<dyn BrokerConnector>, overlay: Arc<LiveOverlay>) -> Self {
        Self {
            connector,
            overlay,
            session: Arc::new(TokioMutex::new(None)),
            current: Arc::new(RwLock::new(None)),
        }
    }

    pub fn overlay(&self) -> &Arc<LiveOverlay> {
        &self.overlay
    }

    /// Config of the open session, if any.
    pub fn current_config(&self) -> Option<BrokerConfig> {
        self.current.read().clone()
    }

    /// Open a session, or reconfigure the open one.
    ///
    /// Returns `false` when the open session already uses `config`.
    pub async fn connect(&self, config: BrokerConfig) -> MqttResult<bool> {
        let mut slot = self.session.lock().await;
        let changed = match slot.as_mut() {
            Some(session) => {
                let result = session.reconfigure(config).await;
                if result.is_err() && !self.overlay.is_attached() {
                    // the old connection was already torn down
                    *slot = None;
                    *self.current.write() = None;
                }
                result?
            }
            None => {
                *slot = Some(OverlaySession::open(
                    self.connector.clone(),
                    config,
                    self.overlay.clone(),
                )?);
                true
            }
        };
        *self.current.write() = slot.as_ref().map(|s| s.config().clone());
        Ok(changed)
    }

    /// Close the open session. Returns `false` when none was open.
    pub async fn disconnect(&self) -> bool {
        let session = self.session.lock().await.take();
        *self.current.write() = None;
        match session {
            Some(session) => {
                session.close().await;
                true
            }
            None => false,
        }
    }
}

async fn run_event_pump(
    overlay: Arc<LiveOverlay>,
    mut events: mpsc::Receiver<BrokerEvent>,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => {
                debug!("Event pump cancelled");
                break;
            }
            event = events.recv() => match event {
                Some(event) => overlay.handle_event(event).await,
                None => {
                    debug!("Broker event stream ended");
                    break;
                }
            },
        }
    }
}
