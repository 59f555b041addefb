//! Application wiring.

use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::task::{JoinError, JoinHandle};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use plantmon_core::{builtin_hierarchy, Hierarchy};
use plantmon_dashboard::{serve, DashboardResult, DashboardState};
use plantmon_mqtt::{BrokerConnector, LiveOverlay, Notifier, RumqttConnector, SessionHandle};

use crate::config::AppConfig;
use crate::error::AppResult;

/// Main application: hierarchy, live overlay, broker session and dashboard.
pub struct Application {
    config: AppConfig,
    hierarchy: Arc<Hierarchy>,
    session: SessionHandle,
    dashboard: DashboardState,
    shutdown: CancellationToken,
}

impl Application {
    /// Build with the rumqttc-backed connector.
    pub fn new(config: AppConfig) -> AppResult<Self> {
        Self::with_connector(config, Arc::new(RumqttConnector))
    }

    pub fn with_connector(config: AppConfig, connector: Arc<dyn BrokerConnector>) -> AppResult<Self> {
        let hierarchy = Arc::new(load_hierarchy(&config)?);
        info!(
            nodes = hierarchy.len(),
            topics = hierarchy.topics().len(),
            root = %hierarchy.root().name,
            "Hierarchy loaded"
        );

        let overlay = Arc::new(LiveOverlay::new(Notifier::default()));
        let session = SessionHandle::new(connector, overlay.clone());
        let dashboard = DashboardState::new(hierarchy.clone(), overlay, config.unit_table())
            .with_session(session.clone());

        Ok(Self {
            config,
            hierarchy,
            session,
            dashboard,
            shutdown: CancellationToken::new(),
        })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn hierarchy(&self) -> &Arc<Hierarchy> {
        &self.hierarchy
    }

    pub fn dashboard_state(&self) -> &DashboardState {
        &self.dashboard
    }

    pub fn session(&self) -> &SessionHandle {
        &self.session
    }

    /// Cancelling this token stops [`run`](Self::run).
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Human-readable startup summary, printed by `--check`.
    pub fn summary(&self) -> String {
        let mut lines = vec![
            format!(
                "hierarchy: {} nodes, root \"{}\"",
                self.hierarchy.len(),
                self.hierarchy.root().name
            ),
            format!(
                "broker: {} (client id {}, connect on start: {})",
                self.config.broker.url(),
                self.config.broker.client_id,
                self.config.connect_on_start
            ),
        ];
        if self.config.dashboard.enabled {
            lines.push(format!(
                "dashboard: http://{} (auth: {})",
                self.config.dashboard.socket_address(),
                self.config.dashboard.auth_enabled()
            ));
        } else {
            lines.push("dashboard: disabled".to_string());
        }
        for (id, topic) in self.hierarchy.topics() {
            lines.push(format!("topic: {id} -> {topic}"));
        }
        lines.join("\n")
    }

    /// Run until Ctrl-C or the shutdown token fires, binding the configured
    /// dashboard address.
    pub async fn run(self) -> AppResult<()> {
        let listener = if self.config.dashboard.enabled {
            let address = self.config.dashboard.socket_address();
            Some(TcpListener::bind(&address).await?)
        } else {
            None
        };
        self.run_with(listener).await
    }

    /// Run on an already bound dashboard listener.
    pub async fn run_on(self, listener: TcpListener) -> AppResult<()> {
        self.run_with(Some(listener)).await
    }

    async fn run_with(self, listener: Option<TcpListener>) -> AppResult<()> {
        info!("Starting application");

        if self.config.connect_on_start {
            // An unreachable broker is reported through the overlay; the
            // dashboard stays usable and can reconfigure it.
            if let Err(e) = self.session.connect(self.config.broker.clone()).await {
                warn!(error = %e, "Broker session not opened");
            }
        }

        let mut server = listener.map(|listener| {
            tokio::spawn(serve(
                listener,
                self.dashboard.clone(),
                self.config.dashboard.clone(),
                self.shutdown.child_token(),
            ))
        });

        let mut result = Ok(());
        let mut server_done = false;
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Shutdown signal received");
            }
            _ = self.shutdown.cancelled() => {
                info!("Shutdown requested");
            }
            joined = wait_server(&mut server) => {
                server_done = true;
                match joined {
                    Ok(Ok(())) => warn!("Dashboard server stopped unexpectedly"),
                    Ok(Err(e)) => {
                        error!(error = %e, "Dashboard server failed");
                        result = Err(e.into());
                    }
                    Err(e) => error!(error = %e, "Dashboard task panicked"),
                }
            }
        }

        info!("Shutting down");
        self.shutdown.cancel();
        if self.session.disconnect().await {
            info!("Broker session closed");
        }
        if let Some(handle) = server.filter(|_| !server_done) {
            match handle.await {
                Ok(Err(e)) => warn!(error = %e, "Dashboard server error during shutdown"),
                Err(e) => warn!(error = %e, "Dashboard task panicked"),
                Ok(Ok(())) => {}
            }
        }
        result
    }
}

/// Pending forever when the dashboard is disabled.
async fn wait_server(
    server: &mut Option<JoinHandle<DashboardResult<()>>>,
) -> Result<DashboardResult<()>, JoinError> {
    match server {
        Some(handle) => handle.await,
        None => std::future::pending().await,
    }
}

fn load_hierarchy(config: &AppConfig) -> AppResult<Hierarchy> {
    match &config.hierarchy_path {
        Some(path) => {
            info!(path = %path, "Loading hierarchy file");
            Ok(Hierarchy::from_file(path)?)
        }
        None => Ok(builtin_hierarchy()?),
    }
}
