//! plantmon-dashboard - browser dashboard for the plant hierarchy.
//!
//! - REST API for the tree, node details, breadcrumb, search and selection
//! - WebSocket for periodic snapshots and toast notifications
//! - Static HTML/JS UI
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                       plantmon process                       │
//! │                                                              │
//! │  ┌──────────────┐   ┌──────────────┐   ┌─────────────────┐   │
//! │  │  Hierarchy   │   │  Selection   │   │   LiveOverlay   │   │
//! │  │   (Arc<>)    │   │ (RwLock<>)   │   │ (Arc<>, MQTT)   │   │
//! │  └──────┬───────┘   └──────┬───────┘   └────────┬────────┘   │
//! │         └──────────────────┼────────────────────┘            │
//! │                            ▼                                 │
//! │  ┌────────────────────────────────────────────────────────┐  │
//! │  │            DashboardState (views + selection)          │  │
//! │  └───────────────────────────┬────────────────────────────┘  │
//! │  ┌───────────────────────────┼────────────────────────────┐  │
//! │  │        axum HTTP server (port 8080)                    │  │
//! │  │  GET  /                 → static HTML/JS               │  │
//! │  │  GET  /api/tree         → hierarchy                    │  │
//! │  │  GET  /api/nodes/{id}   → merged node view             │  │
//! │  │  POST /api/selection    → select + focus live topic    │  │
//! │  │  POST /api/broker       → connect / reconfigure broker │  │
//! │  │  GET  /ws               → snapshots + notifications    │  │
//! │  └────────────────────────────────────────────────────────┘  │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use plantmon_dashboard::{run_server, DashboardConfig, DashboardState};
//!
//! let state = DashboardState::new(hierarchy, overlay, UnitTable::builtin());
//! let shutdown = CancellationToken::new();
//! tokio::spawn(run_server(state, DashboardConfig::default(), shutdown.clone()));
//! ```

mod broadcast;
mod config;
mod error;
mod server;
mod state;
mod types;

pub use config::DashboardConfig;
pub use error::{DashboardError, DashboardResult};
pub use server::{create_router, run_server, serve, AppState};
pub use state::DashboardState;
pub use types::{
    BrokerRequest, BrokerView, ConnectionView, Crumb, DashboardMessage, DashboardSnapshot,
    NodeSummary, NodeView, TreeNodeView,
};
