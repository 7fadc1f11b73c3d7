//! Display manager service entry point.
//!
//! Loads the configuration, initialises logging, and wires the service
//! together before waiting for Ctrl-C.
//!
//! # Architecture
//!
//! ```text
//! main()
//!  └─ load_config()                 -- TOML from the platform config dir
//!  └─ DisplayManagerService::new()  -- topology + display registry
//!       ├─ LoggingAgent             -- registered for every listener type
//!       └─ default physical screen  -- connected from [default_screen]
//!  └─ MoveDragFactory               -- session registry + frame clock
//!       └─ TokioVsyncStation        -- paces move/drag rect updates
//! ```

use std::sync::{Arc, Mutex};

use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use dms_server::application::agent_hub::{AgentRegistry, AgentType, DisplayManagerAgent};
use dms_server::application::display_manager::DisplayManagerService;
use dms_server::application::session_lifecycle::{MoveDragFactory, SessionRegistry};
use dms_server::infrastructure::agents::LoggingAgent;
use dms_server::infrastructure::storage::config::{self, ServiceConfig};
use dms_server::infrastructure::vsync::TokioVsyncStation;

/// Physical render-service id of the built-in panel.
const BUILTIN_PANEL_RS_ID: u64 = 0;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // The config is read before logging starts, so its error is kept for later.
    let (cfg, config_error) = match config::load_config() {
        Ok(cfg) => (cfg, None),
        Err(e) => (ServiceConfig::default(), Some(e)),
    };

    // `RUST_LOG` wins over the configured level.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&cfg.service.log_level)),
        )
        .init();

    if let Some(e) = config_error {
        warn!("failed to load config, using defaults: {e}");
    }
    info!(version = %cfg.service.version, "display manager service starting");

    let hub = Arc::new(AgentRegistry::new());
    let service = DisplayManagerService::new(hub, cfg.fold.capability());

    let logger: Arc<dyn DisplayManagerAgent> = Arc::new(LoggingAgent);
    for agent_type in AgentType::ALL {
        service.register_display_manager_agent(Arc::clone(&logger), agent_type)?;
    }

    let screen = service.on_physical_screen_connect(BUILTIN_PANEL_RS_ID, cfg.default_screen.to_physical_options())?;
    info!(%screen, "built-in panel connected");

    let vsync = Arc::new(TokioVsyncStation::new(cfg.vsync.frame_period())?);
    let gestures = MoveDragFactory::new(
        Arc::new(Mutex::new(SessionRegistry::new())),
        vsync.clone(),
        cfg.drag.hot_zone(),
        cfg.drag.fallback_vpr,
    );
    info!(
        period_ms = vsync.period().as_millis() as u64,
        sessions = gestures.registry().lock().map(|r| r.len()).unwrap_or(0),
        "frame clock started"
    );

    match service.dump() {
        Ok(dump) => info!("initial state: {dump}"),
        Err(e) => warn!("failed to dump state: {e}"),
    }

    info!("display manager service ready.  Press Ctrl-C to exit.");
    tokio::signal::ctrl_c().await?;
    info!("shutdown signal received");

    vsync.destroy();
    service.set_display_state(dms_core::DisplayState::Off);
    info!("display manager service stopped");
    Ok(())
}
