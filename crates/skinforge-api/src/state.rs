use std::sync::Arc;

use skinforge_db::catalog::Catalog;

use crate::config::ServerConfig;
use crate::engine::generator::Generator;
use crate::engine::scheduler::AccountScheduler;

/// Shared application state available to all Axum handlers via
/// `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc`).
#[derive(Clone)]
pub struct AppState {
    /// Storage backend for skins and accounts.
    pub catalog: Arc<dyn Catalog>,
    /// Account pool scheduler; also serves the request-pacing hint.
    pub scheduler: Arc<AccountScheduler>,
    /// The generation engine.
    pub generator: Arc<Generator>,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
}
